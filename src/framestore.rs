//! Frame buffer representation and the three-slot reference rotation.
//!
//! See: * 4.7. Frame store and reordering
//!      * `rust-av-ffv1/src/decoder.rs`'s `Frame` struct (plane vectors,
//!        dimensions, format flags), generalized here from FFV1's up-to-4
//!        plane RGB/YCbCr layout to a fixed 3-plane 4:2:0 layout.
//!      * slot rotation grounded on `original_source/mpeg2dec/libmpeg2/decode.c`'s
//!        `mpeg2_set_buf` (new sink-allocated buffer becomes "current";
//!        `STATE_SEQUENCE` primes `forward`/`backward` ahead of decode).

/// One decoded frame: three planes in 4:2:0 layout, plus the sink-provided
/// opaque identifier used to hand it back on `flip_page`/`draw_frame`.
#[derive(Clone, Default)]
pub struct Frame {
    pub(crate) y: Vec<u8>,
    pub(crate) cb: Vec<u8>,
    pub(crate) cr: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) y_stride: u32,
    pub(crate) c_stride: u32,
    /// Opaque per-frame identifier handed out by the sink at allocation
    /// time and returned to it unchanged at `draw_frame`/`flip_page`.
    pub(crate) id: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, id: u64) -> Self {
        let y_stride = width;
        let c_stride = width / 2;
        Frame {
            y: vec![0; (y_stride * height) as usize],
            cb: vec![0; (c_stride * (height / 2)) as usize],
            cr: vec![0; (c_stride * (height / 2)) as usize],
            width,
            height,
            y_stride,
            c_stride,
            id,
        }
    }

    pub fn y_mut(&mut self) -> &mut [u8] {
        &mut self.y
    }

    pub fn cb_mut(&mut self) -> &mut [u8] {
        &mut self.cb
    }

    pub fn cr_mut(&mut self) -> &mut [u8] {
        &mut self.cr
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub fn cb(&self) -> &[u8] {
        &self.cb
    }

    pub fn cr(&self) -> &[u8] {
        &self.cr
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// The three logical reference slots a decoder owns at all times, per §4.7's
/// invariant that they stay pairwise disjoint between slices of one picture.
#[derive(Default)]
pub struct FrameStore {
    pub(crate) forward: Option<Frame>,
    pub(crate) backward: Option<Frame>,
    pub(crate) current: Option<Frame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly allocated frame as `current`, per `mpeg2_set_buf`.
    pub fn set_current(&mut self, frame: Frame) {
        self.current = Some(frame);
    }

    /// Rotates slots after a non-B picture finishes decoding:
    /// `forward <- backward`, `backward <- current`. Returns the displaced
    /// `forward` frame, which is now due for display, per §4.7.
    pub fn rotate_after_reference_picture(&mut self) -> Option<Frame> {
        let displaced_forward = self.forward.take();
        self.forward = self.backward.take();
        self.backward = self.current.take();
        displaced_forward
    }

    /// Takes the `current` slot for immediate display after a B picture,
    /// without touching `forward`/`backward`.
    pub fn take_b_picture(&mut self) -> Option<Frame> {
        self.current.take()
    }

    /// Flushes the final `backward` frame at end-of-stream, per §4.7.
    pub fn flush(&mut self) -> Option<Frame> {
        self.backward.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_displaces_old_forward() {
        let mut store = FrameStore::new();
        store.forward = Some(Frame::new(16, 16, 1));
        store.backward = Some(Frame::new(16, 16, 2));
        store.current = Some(Frame::new(16, 16, 3));

        let displaced = store.rotate_after_reference_picture().unwrap();
        assert_eq!(displaced.id, 1);
        assert_eq!(store.forward.as_ref().unwrap().id, 2);
        assert_eq!(store.backward.as_ref().unwrap().id, 3);
        assert!(store.current.is_none());
    }

    #[test]
    fn b_picture_is_taken_without_rotation() {
        let mut store = FrameStore::new();
        store.forward = Some(Frame::new(16, 16, 1));
        store.backward = Some(Frame::new(16, 16, 2));
        store.current = Some(Frame::new(16, 16, 3));

        let shown = store.take_b_picture().unwrap();
        assert_eq!(shown.id, 3);
        assert_eq!(store.forward.as_ref().unwrap().id, 1);
        assert_eq!(store.backward.as_ref().unwrap().id, 2);
    }

    #[test]
    fn flush_returns_backward() {
        let mut store = FrameStore::new();
        store.backward = Some(Frame::new(16, 16, 7));
        let flushed = store.flush().unwrap();
        assert_eq!(flushed.id, 7);
    }
}
