//! Top-level decoder: owns the chunker, header state machine, current
//! sequence/picture parameters, slice scratch state, and the frame store,
//! and exposes the incremental `parse()`-per-chunk driver interface.
//!
//! See: * 6.2. Caller (decoder driver) interface
//!      * `rust-av-ffv1/src/decoder.rs`'s `Decoder` struct and
//!        `decode_frame` orchestration (owns config + per-frame scratch,
//!        iterates slices, dispatches by colorspace/bit depth), generalized
//!        to MPEG's incremental `parse()`-per-chunk model described in
//!        `original_source/mpeg2dec/libmpeg2/decode.c`'s `mpeg2_parse`.

use crate::chunker::Chunker;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::framestore::FrameStore;
use crate::header::{
    next_state, HeaderState, PictureCodingExtension, PictureHeader, SequenceExtension,
    SequenceHeader,
};
use crate::bitstream::Reader;
use crate::sink::{FrameFlags, Sink};
use crate::slice::{Slice, SliceContext};

/// State codes returned by `parse()`, mirroring `mpeg2_parse`'s `STATE_*`
/// return values one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Sequence,
    SequenceRepeated,
    Gop,
    Picture,
    Picture2nd,
    Slice1st,
    Slice,
    End,
    Invalid,
}

/// Configuration accepted at construction time, per the "Recognized
/// configuration" table in §6.2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Bitmask selecting optional accelerated IDCT/MC kernels; 0 forces the
    /// portable integer path (the only path this decoder implements).
    pub mm_accel: u32,
}

struct CurrentPicture {
    header: PictureHeader,
    extension: Option<PictureCodingExtension>,
    second_field: bool,
}

/// The top-level MPEG-1/MPEG-2 decoder. Drives a user-supplied [`Sink`]
/// with decoded frames in display order.
pub struct Decoder<S: Sink> {
    sink: S,
    chunker: Chunker,
    state: HeaderState,
    sequence: Option<SequenceHeader>,
    last_sequence: Option<SequenceHeader>,
    sequence_extension: Option<SequenceExtension>,
    picture: Option<CurrentPicture>,
    frames: FrameStore,
    next_frame_id: u64,
    pts_current: Option<u32>,
    pts_pending: Option<u32>,
    skip_next: bool,
    /// Set by `finish_picture` when the picture just finished was one field
    /// of an interlaced pair, so the next `picture_header` reuses its frame
    /// instead of allocating a fresh one, per §4.7.
    expecting_second_field: bool,
}

impl<S: Sink> Decoder<S> {
    /// Creates a decoder bound to `sink`. `config.mm_accel` is accepted for
    /// interface parity but ignored: this decoder only implements the
    /// portable integer IDCT/MC path.
    pub fn new(sink: S, _config: Config) -> Self {
        Decoder {
            sink,
            chunker: Chunker::new(),
            state: HeaderState::Invalid,
            sequence: None,
            last_sequence: None,
            sequence_extension: None,
            picture: None,
            frames: FrameStore::new(),
            next_frame_id: 0,
            pts_current: None,
            pts_pending: None,
            skip_next: false,
            expecting_second_field: false,
        }
    }

    /// Appends more input to be parsed.
    pub fn buffer(&mut self, bytes: &[u8]) {
        self.chunker.feed(bytes);
    }

    /// Binds a presentation timestamp to the next picture header
    /// encountered, per §6.2.
    pub fn pts(&mut self, pts: u32) {
        self.pts_pending = Some(pts);
    }

    /// Requests the next picture be decoded for reference only, not
    /// displayed.
    pub fn skip(&mut self, skip: bool) {
        self.skip_next = skip;
    }

    /// The presentation timestamp bound to the most recently completed
    /// picture, if one was set via `pts` before that picture's header.
    pub fn current_pts(&self) -> Option<u32> {
        self.pts_current
    }

    /// Borrows the sink this decoder drives.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Releases the three frame buffers and any output resources. The
    /// `backward` slot still holds a picture that was never displayed
    /// (display lags decode by one non-B picture); it is drawn here before
    /// the sink is closed.
    pub fn close(&mut self) -> Result<()> {
        if let Some(frame) = self.frames.flush() {
            self.sink.draw_frame(&frame)?;
            self.sink.flip_page()?;
        }
        self.sink.close()
    }

    /// Advances the decoder by one chunk, returning the resulting state, or
    /// `Ok(None)` to mean "need more input" (`-1` in the C interface).
    pub fn parse(&mut self) -> Result<Option<ParseState>> {
        let Some(chunk) = self.chunker.next_chunk() else {
            return Ok(None);
        };

        if self.state == HeaderState::Invalid && chunk.code != SEQUENCE_HEADER_CODE {
            return Ok(Some(ParseState::Invalid));
        }

        if (SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX).contains(&chunk.code) {
            return self.handle_slice(chunk.code, &chunk.data);
        }

        match chunk.code {
            SEQUENCE_HEADER_CODE => self.handle_sequence_header(&chunk.data),
            PICTURE_START_CODE => self.handle_picture_header(&chunk.data),
            EXTENSION_START_CODE => self.handle_extension(&chunk.data),
            SEQUENCE_END_CODE => {
                self.state = HeaderState::End;
                Ok(Some(ParseState::End))
            }
            GROUP_START_CODE => {
                self.state = HeaderState::Gop;
                Ok(Some(ParseState::Gop))
            }
            USER_DATA_START_CODE => Ok(None),
            SEQUENCE_ERROR_CODE => {
                self.state = HeaderState::Invalid;
                Ok(Some(ParseState::Invalid))
            }
            _ => Ok(None),
        }
    }

    fn handle_sequence_header(&mut self, data: &[u8]) -> Result<Option<ParseState>> {
        let header = SequenceHeader::parse(data)?;
        let repeated = self.last_sequence.as_ref().map(|prev| {
            prev.horizontal_size_value == header.horizontal_size_value
                && prev.vertical_size_value == header.vertical_size_value
                && prev.aspect_ratio_information == header.aspect_ratio_information
                && prev.frame_rate_code == header.frame_rate_code
                && prev.vbv_buffer_size_value == header.vbv_buffer_size_value
                && prev.constrained_parameters_flag == header.constrained_parameters_flag
                && prev.intra_quantizer_matrix == header.intra_quantizer_matrix
                && prev.non_intra_quantizer_matrix == header.non_intra_quantizer_matrix
        });

        let width = header.coded_width();
        let height = header.coded_height();
        self.last_sequence = Some(header.clone());
        self.sequence = Some(header);

        if repeated != Some(true) {
            // A genuinely new sequence: (re)prime the sink and the three
            // frame slots, per §4.2's "twice, because prediction references
            // must be primed before the first decoded picture".
            self.sink.setup(width, height)?;
            for _ in 0..2 {
                let id = self.next_frame_id;
                self.next_frame_id += 1;
                let frame = self.sink.allocate_frame(width, height, id)?;
                if self.frames.forward.is_none() {
                    self.frames.forward = Some(frame);
                } else {
                    self.frames.backward = Some(frame);
                }
            }
        }

        self.state = match next_state(SEQUENCE_HEADER_CODE, self.state) {
            Some(s) => s,
            None => HeaderState::Sequence,
        };
        if repeated == Some(true) {
            self.state = HeaderState::SequenceRepeated;
            Ok(Some(ParseState::SequenceRepeated))
        } else {
            Ok(Some(ParseState::Sequence))
        }
    }

    fn handle_extension(&mut self, data: &[u8]) -> Result<Option<ParseState>> {
        if data.is_empty() {
            return Ok(None);
        }
        match data[0] >> 4 {
            SEQUENCE_EXTENSION_ID => {
                self.sequence_extension = Some(SequenceExtension::parse(data)?);
            }
            PICTURE_CODING_EXTENSION_ID => {
                let ext = PictureCodingExtension::parse(data)?;
                if let Some(picture) = self.picture.as_mut() {
                    picture.extension = Some(ext);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_picture_header(&mut self, data: &[u8]) -> Result<Option<ParseState>> {
        let header = PictureHeader::parse(data)?;
        let second_field = self.expecting_second_field;

        let sequence = self
            .sequence
            .as_ref()
            .ok_or_else(|| Error::SequenceError("picture header before sequence header".into()))?;
        let width = sequence.coded_width();
        let height = sequence.coded_height();

        if second_field {
            // Second field of an interlaced pair: the first field's
            // `current` frame is still installed and its other lines are
            // about to be filled in, per §4.7's doubled-stride policy.
            if self.frames.current.is_none() {
                return Err(Error::SliceError(
                    "second field picture header with no first-field frame".into(),
                ));
            }
        } else {
            let id = self.next_frame_id;
            self.next_frame_id += 1;
            let frame = self.sink.allocate_frame(width, height, id)?;
            self.frames.set_current(frame);
        }

        self.picture = Some(CurrentPicture {
            header,
            extension: None,
            second_field,
        });

        self.state = HeaderState::Picture;
        Ok(Some(ParseState::Picture))
    }

    fn handle_slice(&mut self, code: u8, data: &[u8]) -> Result<Option<ParseState>> {
        let sequence = self
            .sequence
            .as_ref()
            .ok_or_else(|| Error::SliceError("slice before sequence header".into()))?;
        let picture = self
            .picture
            .as_ref()
            .ok_or_else(|| Error::SliceError("slice before picture header".into()))?;

        let mb_width = sequence.coded_width() / 16;
        let mb_height = sequence.coded_height() / 16;
        let extension = picture.extension;

        let frame_pred_frame_dct = extension.map(|e| e.frame_pred_frame_dct).unwrap_or(true);
        let q_scale_type = extension.map(|e| e.q_scale_type).unwrap_or(false);
        let intra_dc_precision = extension.map(|e| e.intra_dc_precision).unwrap_or(0);
        let alternate_scan = extension.map(|e| e.alternate_scan).unwrap_or(false);
        let picture_structure = extension
            .map(|e| e.picture_structure)
            .unwrap_or(crate::header::PictureStructure::Frame);
        let forward_f_code = extension
            .map(|e| [e.f_code[0][0].max(0) as u8, e.f_code[0][1].max(0) as u8])
            .unwrap_or([picture.header.forward_f_code, picture.header.forward_f_code]);
        let backward_f_code = extension
            .map(|e| [e.f_code[1][0].max(0) as u8, e.f_code[1][1].max(0) as u8])
            .unwrap_or([
                picture.header.backward_f_code,
                picture.header.backward_f_code,
            ]);

        let ctx = SliceContext {
            picture_type: picture.header.picture_coding_type,
            picture_structure,
            frame_pred_frame_dct,
            q_scale_type,
            intra_dc_precision,
            alternate_scan,
            mpeg1: self.sequence_extension.is_none(),
            forward_f_code,
            backward_f_code,
            intra_quantizer_matrix: &sequence.intra_quantizer_matrix,
            non_intra_quantizer_matrix: &sequence.non_intra_quantizer_matrix,
            mb_width,
            mb_height,
        };

        let was_first_slice = self.state != HeaderState::Slice;
        if was_first_slice {
            let structure = extension
                .map(|e| e.picture_structure)
                .unwrap_or(crate::header::PictureStructure::Frame);
            let field_flags = match structure {
                crate::header::PictureStructure::Frame => FrameFlags::BOTH_FIELDS,
                crate::header::PictureStructure::TopField => FrameFlags::TOP_FIELD,
                crate::header::PictureStructure::BottomField => FrameFlags::BOTTOM_FIELD,
            };
            let flags = if picture.header.picture_coding_type == crate::header::PictureType::B {
                field_flags & !FrameFlags::PREDICTION
            } else {
                field_flags | FrameFlags::PREDICTION
            };
            self.sink.set_frame(flags)?;
        }

        let mut reader = Reader::new(data);
        let mut slice = Slice::new(&ctx, code, &mut reader);

        let forward_snapshot = self.frames.forward.clone();
        let backward_snapshot = self.frames.backward.clone();
        let mut current = self
            .frames
            .current
            .take()
            .ok_or_else(|| Error::SliceError("no current frame allocated".into()))?;

        slice.decode(
            &mut reader,
            &mut current,
            forward_snapshot.as_ref(),
            backward_snapshot.as_ref(),
        )?;
        self.sink.draw_slice(&current, code as u32)?;
        self.frames.current = Some(current);

        self.state = HeaderState::Slice;
        if was_first_slice {
            Ok(Some(ParseState::Slice1st))
        } else {
            Ok(Some(ParseState::Slice))
        }
    }

    /// Finalizes the current picture: delivers it to the sink in display
    /// order and rotates the reference slots. Called by the caller once
    /// `parse()` reports the picture's last slice (detected externally via
    /// the next non-slice start code, per §4.2).
    pub fn finish_picture(&mut self) -> Result<()> {
        let Some(picture) = self.picture.take() else {
            return Ok(());
        };
        let structure = picture
            .extension
            .map(|e| e.picture_structure)
            .unwrap_or(crate::header::PictureStructure::Frame);
        let is_field = structure != crate::header::PictureStructure::Frame;
        let picture_complete = !is_field || picture.second_field;
        self.expecting_second_field = is_field && !picture.second_field;

        // A second field shares its first field's timestamp; only a
        // first-field (or frame) picture consumes the pending pts.
        if !picture.second_field {
            self.pts_current = self.pts_pending.take();
        }

        if !picture_complete {
            // Only the first field of a pair: the frame store's `current`
            // slot is left installed so the second field's slices write
            // into the same buffer, and rotation/display waits until the
            // pair completes, per §4.7 and `decode_reorder_frames`'s
            // `!second_field` guard.
            return Ok(());
        }

        let is_b = picture.header.picture_coding_type == crate::header::PictureType::B;
        let displayed = if is_b {
            self.frames.take_b_picture()
        } else {
            self.frames.rotate_after_reference_picture()
        };
        if let Some(frame) = displayed {
            if !self.skip_next {
                self.sink.draw_frame(&frame)?;
                self.sink.flip_page()?;
            }
        }
        self.skip_next = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framestore::Frame as TestFrame;

    struct NullSink;

    impl Sink for NullSink {
        fn setup(&mut self, _width: u32, _height: u32) -> Result<()> {
            Ok(())
        }
        fn allocate_frame(&mut self, width: u32, height: u32, id: u64) -> Result<TestFrame> {
            Ok(TestFrame::new(width, height, id))
        }
        fn set_frame(&mut self, _flags: FrameFlags) -> Result<()> {
            Ok(())
        }
        fn draw_frame(&mut self, _frame: &TestFrame) -> Result<()> {
            Ok(())
        }
        fn flip_page(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn needs_more_input_when_no_chunk_ready() {
        let mut decoder = Decoder::new(NullSink, Config::default());
        decoder.buffer(&[0, 0]);
        assert_eq!(decoder.parse().unwrap(), None);
    }

    #[test]
    fn invalid_until_sequence_header_seen() {
        let mut decoder = Decoder::new(NullSink, Config::default());
        decoder.buffer(&[0, 0, 1, 0x00, 1, 2, 0, 0, 1, 0xb7]);
        let state = decoder.parse().unwrap();
        assert_eq!(state, Some(ParseState::Invalid));
    }
}
