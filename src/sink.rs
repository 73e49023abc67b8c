//! The video output capability the decoder drives; implementers provide a
//! display surface, the decoder provides decoded planes.
//!
//! See: * 6.1. Sink (video output) interface
//!      * §9's redesign note formalizing the output side as a capability
//!        interface the decoder holds by value or reference, rather than a
//!        set of free-standing callback function pointers as in the C
//!        original; trait-with-default-methods shape mirrors how the
//!        teacher's `RCT` trait (`jpeg2000rct.rs`) exposes one required
//!        operation per implementer, with the rest derived.

use crate::error::Result;
use crate::framestore::Frame;

bitflags::bitflags! {
    /// Flags passed to `set_frame`, per 6.1.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FrameFlags: u8 {
        const PREDICTION = 0b0001;
        const TOP_FIELD = 0b0010;
        const BOTTOM_FIELD = 0b0100;
        const BOTH_FIELDS = 0b0110;
    }
}

/// Video output capability. The decoder calls these in a fixed order per
/// sequence/picture/slice; pixel storage is owned by the implementer, not
/// the decoder (§5's resource-ownership split).
pub trait Sink {
    /// Called once per sequence with the coded (macroblock-rounded) size.
    /// Failure is fatal and aborts the decode.
    fn setup(&mut self, width: u32, height: u32) -> Result<()>;

    /// Called up to three times per sequence to obtain a frame the decoder
    /// will read and write. `id` is an opaque handle threaded back through
    /// `draw_frame`/`flip_page`.
    fn allocate_frame(&mut self, width: u32, height: u32, id: u64) -> Result<Frame>;

    /// Called once per picture, before slice decoding starts.
    fn set_frame(&mut self, flags: FrameFlags) -> Result<()>;

    /// Called after each slice finishes. Optional: the default does
    /// nothing, for sinks that only care about whole frames.
    fn draw_slice(&mut self, _frame: &Frame, _row: u32) -> Result<()> {
        Ok(())
    }

    /// Called once a frame has reached its display position, in display
    /// (not decode) order.
    fn draw_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Signals the currently drawn frame should be presented now.
    fn flip_page(&mut self) -> Result<()>;

    /// Releases the three frame buffers and any output resources.
    fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_fields_is_top_or_bottom_combined() {
        assert_eq!(
            FrameFlags::BOTH_FIELDS,
            FrameFlags::TOP_FIELD | FrameFlags::BOTTOM_FIELD
        );
    }
}
