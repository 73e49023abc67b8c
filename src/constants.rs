// Internal constants.
pub(crate) const CHUNK_BUFFER_SIZE: usize = 1194 * 1024; // largest legal chunk, with margin
pub(crate) const SLICE_STUFFING_LIMIT: u32 = 128; // cap on MPEG-1 macroblock-address stuffing

// API constants.

// FIXME: Use enum

/// Picture coding types. From 6.3.9 picture_coding_type.
pub const I_TYPE: u8 = 1;
pub const P_TYPE: u8 = 2;
pub const B_TYPE: u8 = 3;
pub const D_TYPE: u8 = 4;

/// Picture structures. From 6.3.10 picture_coding_extension.
pub const TOP_FIELD: u8 = 1;
pub const BOTTOM_FIELD: u8 = 2;
pub const FRAME_PICTURE: u8 = 3;

/// Start codes of note. From 6.2.1 Sequence of start codes.
pub const PICTURE_START_CODE: u8 = 0x00;
pub const USER_DATA_START_CODE: u8 = 0xB2;
pub const SEQUENCE_HEADER_CODE: u8 = 0xB3;
pub const SEQUENCE_ERROR_CODE: u8 = 0xB4;
pub const EXTENSION_START_CODE: u8 = 0xB5;
pub const SEQUENCE_END_CODE: u8 = 0xB7;
pub const GROUP_START_CODE: u8 = 0xB8;
pub const SLICE_START_CODE_MIN: u8 = 0x01;
pub const SLICE_START_CODE_MAX: u8 = 0xAF;

/// Extension start code identifiers. From 6.2.2.3 Extension data.
pub const SEQUENCE_EXTENSION_ID: u8 = 1;
pub const PICTURE_CODING_EXTENSION_ID: u8 = 8;

/// Macroblock mode bits, as returned by `get_macroblock_modes`.
pub const MACROBLOCK_INTRA: u16 = 1;
pub const MACROBLOCK_PATTERN: u16 = 2;
pub const MACROBLOCK_MOTION_FORWARD: u16 = 4;
pub const MACROBLOCK_MOTION_BACKWARD: u16 = 8;
pub const MACROBLOCK_QUANT: u16 = 16;
pub const DCT_TYPE_INTERLACED: u16 = 32;

/// Motion types, multiplied in by `MOTION_TYPE_BASE`.
pub const MOTION_TYPE_BASE: u16 = 64;
pub const MC_FIELD: u16 = 1 * MOTION_TYPE_BASE;
pub const MC_FRAME: u16 = 2 * MOTION_TYPE_BASE;
pub const MC_16X8: u16 = 1 * MOTION_TYPE_BASE;
pub const MC_DMV: u16 = 3 * MOTION_TYPE_BASE;
