//! Sequence and picture header parsing, and the top-level header state
//! machine that decides what a chunk's start code means in context.
//!
//! See: * 4.2. Header parser / state machine
//!      * `original_source/mpeg2dec-livid/libmpeg2/header.c` for exact field
//!        bit layout and quantizer matrix loading.
//!      * `original_source/mpeg2dec/libmpeg2/decode.c`'s `mpeg2_parse` for the
//!        `(code, state)` transition table.
//!      * field names cross-checked against the `hawk90-bitvue` MPEG-2 header
//!        structs (`sequence.rs`, `picture.rs`) in `other_examples/`.

use crate::bitstream::Reader;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::tables::{DEFAULT_INTRA_QUANTIZER_MATRIX, DEFAULT_NON_INTRA_QUANTIZER_MATRIX};

/// Picture coding type, as carried by `picture_coding_type` (6.3.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    I,
    P,
    B,
    D,
}

impl PictureType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            I_TYPE => Ok(PictureType::I),
            P_TYPE => Ok(PictureType::P),
            B_TYPE => Ok(PictureType::B),
            D_TYPE => Ok(PictureType::D),
            other => Err(Error::SequenceError(format!(
                "invalid picture_coding_type {other}"
            ))),
        }
    }

    pub fn is_intra(self) -> bool {
        matches!(self, PictureType::I | PictureType::D)
    }
}

/// Picture structure, as carried by `picture_structure` (6.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureStructure {
    TopField,
    BottomField,
    Frame,
}

impl PictureStructure {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            TOP_FIELD => Ok(PictureStructure::TopField),
            BOTTOM_FIELD => Ok(PictureStructure::BottomField),
            FRAME_PICTURE => Ok(PictureStructure::Frame),
            other => Err(Error::SequenceError(format!(
                "invalid picture_structure {other}"
            ))),
        }
    }
}

/// `sequence_header()`, 6.2.2.1.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceHeader {
    pub horizontal_size_value: u16,
    pub vertical_size_value: u16,
    pub aspect_ratio_information: u8,
    pub frame_rate_code: u8,
    pub bit_rate_value: u32,
    pub vbv_buffer_size_value: u16,
    pub constrained_parameters_flag: bool,
    pub intra_quantizer_matrix: [u8; 64],
    pub non_intra_quantizer_matrix: [u8; 64],
}

impl SequenceHeader {
    /// Parses a `sequence_header()` out of `buf`, which starts immediately
    /// after the `sequence_header_code`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 8 {
            return Err(Error::SequenceError("sequence header too short".into()));
        }
        let mut r = Reader::new(buf);
        let horizontal_size_value = r.get_bits(12) as u16;
        let vertical_size_value = r.get_bits(12) as u16;
        let aspect_ratio_information = r.get_bits(4) as u8;
        let frame_rate_code = r.get_bits(4) as u8;
        let bit_rate_value = r.get_bits(18);
        if !r.get_flag() {
            return Err(Error::SequenceError("missing marker_bit".into()));
        }
        let vbv_buffer_size_value = r.get_bits(10) as u16;
        let constrained_parameters_flag = r.get_flag();

        let mut intra_quantizer_matrix = [0u8; 64];
        if r.get_flag() {
            for slot in intra_quantizer_matrix.iter_mut() {
                *slot = r.get_bits(8) as u8;
            }
        } else {
            intra_quantizer_matrix = DEFAULT_INTRA_QUANTIZER_MATRIX;
        }

        let mut non_intra_quantizer_matrix = [0u8; 64];
        if r.get_flag() {
            for slot in non_intra_quantizer_matrix.iter_mut() {
                *slot = r.get_bits(8) as u8;
            }
        } else {
            non_intra_quantizer_matrix = DEFAULT_NON_INTRA_QUANTIZER_MATRIX;
        }

        Ok(SequenceHeader {
            horizontal_size_value,
            vertical_size_value,
            aspect_ratio_information,
            frame_rate_code,
            bit_rate_value,
            vbv_buffer_size_value,
            constrained_parameters_flag,
            intra_quantizer_matrix,
            non_intra_quantizer_matrix,
        })
    }

    /// Width rounded up to a whole number of macroblocks (16 px), per
    /// `header_process_sequence_header`'s `(h_size + 15) & ~15`.
    pub fn coded_width(&self) -> u32 {
        ((self.horizontal_size_value as u32) + 15) & !15
    }

    pub fn coded_height(&self) -> u32 {
        ((self.vertical_size_value as u32) + 15) & !15
    }
}

/// `sequence_extension()`, 6.2.2.3, present only in MPEG-2 streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceExtension {
    pub progressive_sequence: bool,
    pub chroma_format: u8,
    pub horizontal_size_extension: u8,
    pub vertical_size_extension: u8,
}

impl SequenceExtension {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 4 {
            return Err(Error::SequenceError(
                "sequence extension too short".into(),
            ));
        }
        // buf[0] low nibble already identifies this as the sequence
        // extension (SEQUENCE_EXTENSION_ID); the caller strips it.
        let chroma_format = (buf[1] >> 1) & 0x03;
        if chroma_format != 0x01 {
            return Err(Error::SequenceError(
                "only 4:2:0 chroma is supported".into(),
            ));
        }
        let progressive_sequence = (buf[1] >> 3) & 1 != 0;
        let horizontal_size_extension = (buf[1] << 1 & 0x02) | (buf[2] >> 7);
        let vertical_size_extension = (buf[2] >> 5) & 0x03;
        Ok(SequenceExtension {
            progressive_sequence,
            chroma_format,
            horizontal_size_extension,
            vertical_size_extension,
        })
    }
}

/// `picture_header()`, 6.2.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureHeader {
    pub temporal_reference: u16,
    pub picture_coding_type: PictureType,
    pub vbv_delay: u16,
    /// `(forward, backward)` f_code, MPEG-1 only; superseded by the picture
    /// coding extension's per-component f_codes in MPEG-2.
    pub full_pel_forward_vector: bool,
    pub forward_f_code: u8,
    pub full_pel_backward_vector: bool,
    pub backward_f_code: u8,
}

impl PictureHeader {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 4 {
            return Err(Error::SequenceError("picture header too short".into()));
        }
        let mut r = Reader::new(buf);
        let temporal_reference = r.get_bits(10) as u16;
        let picture_coding_type = PictureType::from_u8(r.get_bits(3) as u8)?;
        let vbv_delay = r.get_bits(16) as u16;

        let (full_pel_forward_vector, forward_f_code) =
            if picture_coding_type == PictureType::P || picture_coding_type == PictureType::B {
                (r.get_flag(), r.get_bits(3) as u8)
            } else {
                (false, 0)
            };
        let (full_pel_backward_vector, backward_f_code) =
            if picture_coding_type == PictureType::B {
                (r.get_flag(), r.get_bits(3) as u8)
            } else {
                (false, 0)
            };

        Ok(PictureHeader {
            temporal_reference,
            picture_coding_type,
            vbv_delay,
            full_pel_forward_vector,
            forward_f_code,
            full_pel_backward_vector,
            backward_f_code,
        })
    }
}

/// `picture_coding_extension()`, 6.2.3.1. Mandatory in MPEG-2 streams,
/// absent entirely in MPEG-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureCodingExtension {
    /// `f_code[dir][axis]`, pre-decremented by one per `header.c`'s comment
    /// ("pre subtract 1 for use later in compute_motion_vector").
    pub f_code: [[i8; 2]; 2],
    pub intra_dc_precision: u8,
    pub picture_structure: PictureStructure,
    pub top_field_first: bool,
    pub frame_pred_frame_dct: bool,
    pub concealment_motion_vectors: bool,
    pub q_scale_type: bool,
    pub intra_vlc_format: bool,
    pub alternate_scan: bool,
    pub repeat_first_field: bool,
    pub progressive_frame: bool,
}

impl PictureCodingExtension {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 5 {
            return Err(Error::SequenceError(
                "picture coding extension too short".into(),
            ));
        }
        let f_code = [
            [
                (buf[0] & 0x0f) as i8 - 1,
                (buf[1] >> 4) as i8 - 1,
            ],
            [
                (buf[1] & 0x0f) as i8 - 1,
                (buf[2] >> 4) as i8 - 1,
            ],
        ];
        let picture_structure = PictureStructure::from_u8(buf[2] & 0x03)?;
        let intra_dc_precision = (buf[2] >> 2) & 0x03;
        let top_field_first = buf[3] >> 7 != 0;
        let frame_pred_frame_dct = (buf[3] >> 6) & 1 != 0;
        let concealment_motion_vectors = (buf[3] >> 5) & 1 != 0;
        let q_scale_type = (buf[3] >> 4) & 1 != 0;
        let intra_vlc_format = (buf[3] >> 3) & 1 != 0;
        let alternate_scan = (buf[3] >> 2) & 1 != 0;
        let repeat_first_field = (buf[3] >> 1) & 1 != 0;
        let progressive_frame = buf[4] >> 7 != 0;

        Ok(PictureCodingExtension {
            f_code,
            intra_dc_precision,
            picture_structure,
            top_field_first,
            frame_pred_frame_dct,
            concealment_motion_vectors,
            q_scale_type,
            intra_vlc_format,
            alternate_scan,
            repeat_first_field,
            progressive_frame,
        })
    }
}

/// Decoder state, mirroring `mpeg2_parse`'s `STATE_*` constants. Drives which
/// start codes are legal next and what action they trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    Invalid,
    Sequence,
    SequenceRepeated,
    Gop,
    Picture,
    Picture2nd,
    Slice1st,
    Slice,
    End,
}

/// Decides the next `HeaderState` given the just-seen start code and the
/// state the decoder was in, mirroring the two `RECEIVED(code, state)`
/// switches in `mpeg2_parse`. Returns `None` for an illegal transition
/// (caller must reset to `Invalid` and resync, per §9 OQ1).
pub fn next_state(code: u8, state: HeaderState) -> Option<HeaderState> {
    use HeaderState::*;
    match (code, state) {
        (SEQUENCE_END_CODE, Slice) => Some(End),
        (PICTURE_START_CODE, Gop)
        | (PICTURE_START_CODE, Slice1st)
        | (PICTURE_START_CODE, Slice) => Some(Picture),
        (SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX, Picture) => Some(Slice1st),
        (SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX, Picture2nd) => Some(Slice1st),
        (SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX, Slice1st)
        | (SLICE_START_CODE_MIN..=SLICE_START_CODE_MAX, Slice) => Some(Slice),
        (SEQUENCE_HEADER_CODE, Slice) => Some(Sequence),
        (GROUP_START_CODE, Slice) => Some(Gop),
        (USER_DATA_START_CODE, Sequence)
        | (USER_DATA_START_CODE, Gop)
        | (USER_DATA_START_CODE, Picture)
        | (USER_DATA_START_CODE, Picture2nd)
        | (EXTENSION_START_CODE, Sequence)
        | (EXTENSION_START_CODE, Picture)
        | (EXTENSION_START_CODE, Picture2nd) => Some(state),
        (PICTURE_START_CODE, Sequence) | (GROUP_START_CODE, Sequence) => Some(SequenceRepeated),
        _ if state == Invalid && code == SEQUENCE_HEADER_CODE => Some(Sequence),
        _ if state == Invalid => Some(Invalid),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_sequence_header() {
        // horizontal_size=16, vertical_size=16, aspect=1, frame_rate=1,
        // bit_rate=1, marker, vbv=0, constrained=0, no custom matrices.
        let mut bits = String::new();
        bits.push_str(&format!("{:012b}", 16u32));
        bits.push_str(&format!("{:012b}", 16u32));
        bits.push_str(&format!("{:04b}", 1u32));
        bits.push_str(&format!("{:04b}", 1u32));
        bits.push_str(&format!("{:018b}", 1u32));
        bits.push('1'); // marker_bit
        bits.push_str(&format!("{:010b}", 0u32));
        bits.push('0'); // constrained_parameters_flag
        bits.push('0'); // load_intra_quantiser_matrix
        bits.push('0'); // load_non_intra_quantiser_matrix
        while bits.len() % 8 != 0 {
            bits.push('0');
        }
        let bytes: Vec<u8> = bits
            .as_bytes()
            .chunks(8)
            .map(|c| u8::from_str_radix(std::str::from_utf8(c).unwrap(), 2).unwrap())
            .collect();
        let hdr = SequenceHeader::parse(&bytes).unwrap();
        assert_eq!(hdr.horizontal_size_value, 16);
        assert_eq!(hdr.vertical_size_value, 16);
        assert_eq!(hdr.coded_width(), 16);
        assert_eq!(hdr.intra_quantizer_matrix, DEFAULT_INTRA_QUANTIZER_MATRIX);
    }

    #[test]
    fn state_machine_follows_legal_path() {
        let s = HeaderState::Invalid;
        let s = next_state(SEQUENCE_HEADER_CODE, s).unwrap();
        assert_eq!(s, HeaderState::Sequence);
        let s = next_state(GROUP_START_CODE, HeaderState::Slice).unwrap();
        assert_eq!(s, HeaderState::Gop);
        let s = next_state(PICTURE_START_CODE, s).unwrap();
        assert_eq!(s, HeaderState::Picture);
        let s = next_state(0x05, s).unwrap();
        assert_eq!(s, HeaderState::Slice1st);
    }

    #[test]
    fn illegal_transition_is_none() {
        assert!(next_state(SEQUENCE_HEADER_CODE, HeaderState::Picture).is_none());
    }
}
