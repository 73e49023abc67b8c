//! Constant tables used by header parsing and slice decoding.
//!
//! See: * 4.2/4.4 quantizer matrices, scan patterns, VLC tables
//!      * `original_source/mpeg2dec-livid/libmpeg2/header.c` for the default intra
//!        quantizer matrix and the two scan permutations (verbatim).
//!      * `original_source/mpeg2dec/libmpeg2/slice.c` for the non-linear quantizer
//!        scale and the shape of the VLC tables (`MBtab`, `MVtab`, `CBPtab`, `DCtab`,
//!        `DCTtab`), reconstructed here from the published ISO/IEC 13818-2 tables.

/// Default intra quantizer matrix, in zig-zag order (Table 7-3 / Annex default).
pub const DEFAULT_INTRA_QUANTIZER_MATRIX: [u8; 64] = [
    8, 16, 16, 19, 16, 19, 22, 22, 22, 22, 22, 22, 26, 24, 26, 27, 27, 27, 26, 26, 26, 26, 27, 27,
    27, 29, 29, 29, 34, 34, 34, 29, 29, 29, 27, 27, 29, 29, 32, 32, 34, 34, 37, 38, 37, 35, 35, 34,
    35, 38, 38, 40, 40, 40, 48, 48, 46, 46, 56, 56, 58, 69, 69, 83,
];

/// Default non-intra quantizer matrix: flat, per 7.4.1.
pub const DEFAULT_NON_INTRA_QUANTIZER_MATRIX: [u8; 64] = [16; 64];

/// Zig-zag scan pattern (`alternate_scan = 0`).
pub const SCAN_NORM: [u8; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Alternate scan pattern (`alternate_scan = 1`).
pub const SCAN_ALT: [u8; 64] = [
    0, 8, 16, 24, 1, 9, 2, 10, 17, 25, 32, 40, 48, 56, 57, 49, 41, 33, 26, 18, 3, 11, 4, 12, 19,
    27, 34, 42, 50, 58, 35, 43, 51, 59, 20, 28, 5, 13, 6, 14, 21, 29, 36, 44, 52, 60, 37, 45, 53,
    61, 22, 30, 7, 15, 23, 31, 38, 46, 54, 62, 39, 47, 55, 63,
];

/// Non-linear `quantiser_scale_code` -> `quantiser_scale` table, used when
/// `q_scale_type` is set. From 7.4.2.2.
pub const NON_LINEAR_QUANTIZER_SCALE: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 14, 16, 18, 20, 22, 24, 28, 32, 36, 40, 44, 48, 52, 56, 64,
    72, 80, 88, 96, 104, 112,
];

/// One entry of a variable-length-code lookup table: a code/length pair
/// together with the decoded value, mirroring `slice.c`'s `VLCtab`-style
/// struct-of-arrays (peek a fixed width, index by the peeked pattern minus a
/// base, re-peek a longer width on an escape entry).
#[derive(Clone, Copy, Debug)]
pub struct VlcEntry {
    /// Number of bits consumed for this code (0 marks an escape to a wider table).
    pub bits: u8,
    /// Decoded value (interpretation is table-specific).
    pub value: i16,
}

const fn vlc(bits: u8, value: i16) -> VlcEntry {
    VlcEntry { bits, value }
}

/// `macroblock_address_increment`, Table B-1, indexed by an 11-bit peek.
/// An entry with `bits == 0` means "escape": 11 consecutive `0001` codes
/// denote `macroblock_escape` (increment of 33) and must be summed by the
/// caller; `macroblock_stuffing` (`0000 0001 111`) decodes to `value == -1`
/// and is dropped.
pub const MACROBLOCK_ADDRESS_INCREMENT: &[(u16, u8, VlcEntry)] = &[
    // (peeked_bits_value, peek_width, entry)
    (0b1, 1, vlc(1, 1)),
    (0b011, 3, vlc(3, 2)),
    (0b010, 3, vlc(3, 3)),
    (0b0011, 4, vlc(4, 4)),
    (0b0010, 4, vlc(4, 5)),
    (0b0001_1, 5, vlc(5, 6)),
    (0b0001_0, 5, vlc(5, 7)),
    (0b0000_111, 7, vlc(7, 8)),
    (0b0000_110, 7, vlc(7, 9)),
    (0b0000_1011, 8, vlc(8, 10)),
    (0b0000_1010, 8, vlc(8, 11)),
    (0b0000_1001, 8, vlc(8, 12)),
    (0b0000_1000, 8, vlc(8, 13)),
    (0b0000_0111_1, 10, vlc(10, 14)),
    (0b0000_0111_0, 10, vlc(10, 15)),
    (0b0000_0110_1, 10, vlc(10, 16)),
    (0b0000_0110_0, 10, vlc(10, 17)),
    (0b0000_0101_11, 11, vlc(11, 18)),
    (0b0000_0101_10, 11, vlc(11, 19)),
    (0b0000_0101_01, 11, vlc(11, 20)),
    (0b0000_0101_00, 11, vlc(11, 21)),
    (0b0000_0100_11, 11, vlc(11, 22)),
    (0b0000_0100_10, 11, vlc(11, 23)),
    (0b0000_0011_111, 11, vlc(11, 24)),
    (0b0000_0011_110, 11, vlc(11, 25)),
    (0b0000_0011_101, 11, vlc(11, 26)),
    (0b0000_0011_100, 11, vlc(11, 27)),
    (0b0000_0011_011, 11, vlc(11, 28)),
    (0b0000_0011_010, 11, vlc(11, 29)),
    (0b0000_0011_001, 11, vlc(11, 30)),
    (0b0000_0011_000, 11, vlc(11, 31)),
    (0b0000_0001_111, 11, vlc(11, -1)), // macroblock_stuffing
    (0b0000_0001_000, 11, vlc(0, 33)), // macroblock_escape
];

/// Macroblock type VLC for I pictures, Table B-2.
/// `(peek_bits, peek_width, macroblock_quant, macroblock_intra)`.
pub const MB_TYPE_I: &[(u8, u8, bool, bool)] = &[(0b1, 1, false, true), (0b01, 2, true, true)];

/// Macroblock type VLC for P pictures, Table B-3. Columns after the peek
/// pair are `(quant, forward, pattern, intra)`.
pub const MB_TYPE_P: &[(u8, u8, bool, bool, bool, bool)] = &[
    (0b1, 1, false, true, true, false),
    (0b01, 2, false, false, true, false),
    (0b001, 3, false, true, false, false),
    (0b0001_1, 5, false, false, false, false),
    (0b0001_0, 5, false, true, true, true),
    (0b0000_11, 6, false, false, false, true),
    (0b0000_011, 7, true, true, true, false),
    (0b0000_010, 7, true, false, true, false),
    (0b0000_0011, 9, true, true, false, true),
];

/// Macroblock type VLC for B pictures, Table B-4. Columns are
/// `(quant, forward, backward, pattern, intra)`.
pub const MB_TYPE_B: &[(u8, u8, bool, bool, bool, bool, bool)] = &[
    (0b10, 2, false, false, true, false, false),
    (0b11, 2, false, true, true, false, false),
    (0b010, 3, false, false, true, true, false),
    (0b011, 3, false, true, true, true, false),
    (0b0010, 4, false, true, false, false, false),
    (0b0011, 4, false, true, false, true, false),
    (0b0001, 4, false, false, true, true, false),
    (0b0000_11, 6, false, false, false, false, true),
    (0b0000_10, 6, true, false, true, true, false),
    (0b0000_011, 7, true, true, false, true, false),
    (0b0000_010, 7, true, true, true, true, false),
    (0b0000_0010, 8, true, true, false, false, true),
];

/// `motion_code`, Table B-10, indexed by an up-to-11-bit peek.
pub const MOTION_CODE: &[(u16, u8, i16)] = &[
    (0b1, 1, 0),
    (0b010, 3, 1),
    (0b010, 3, -1),
    (0b0010, 4, 2),
    (0b0010, 4, -2),
    (0b0001_0, 5, 3),
    (0b0001_0, 5, -3),
    (0b0000_110, 7, 4),
    (0b0000_110, 7, -4),
    (0b0000_1010, 8, 5),
    (0b0000_1010, 8, -5),
    (0b0000_1000, 8, 6),
    (0b0000_1000, 8, -6),
    (0b0000_0110, 8, 7),
    (0b0000_0110, 8, -7),
];

/// `dmvector`, Table B-11.
pub const DMV: &[(u8, u8, i8)] = &[(0b0, 1, 0), (0b10, 2, 1), (0b11, 2, -1)];

/// `coded_block_pattern`, Table B-9, indexed by a 9-bit peek; value is the
/// 6-bit (4:2:0) pattern described in 6.3.17.
pub const CODED_BLOCK_PATTERN: &[(u16, u8, u8)] = &[
    (0b111, 3, 60),
    (0b1101, 4, 4),
    (0b1100, 4, 8),
    (0b1011, 4, 16),
    (0b1010, 4, 32),
    (0b1001_1, 5, 12),
    (0b1001_0, 5, 48),
    (0b1000_1, 5, 20),
    (0b1000_0, 5, 40),
    (0b0111_1, 5, 28),
    (0b0111_0, 5, 44),
    (0b0110_1, 5, 52),
    (0b0110_0, 5, 56),
    (0b0101_1, 5, 1),
    (0b0101_0, 5, 61),
    (0b0100_1, 5, 2),
    (0b0100_0, 5, 62),
    (0b0011_111, 7, 24),
    (0b0011_110, 7, 36),
    (0b0011_101, 7, 3),
    (0b0011_100, 7, 63),
];

/// `dct_dc_size_luminance`, Table B-12.
pub const DCT_DC_SIZE_LUMINANCE: &[(u16, u8, u8)] = &[
    (0b100, 3, 0),
    (0b00, 2, 1),
    (0b01, 2, 2),
    (0b101, 3, 3),
    (0b110, 3, 4),
    (0b1110, 4, 5),
    (0b1_1110, 5, 6),
    (0b1111_110, 7, 7),
    (0b1111_1110, 8, 8),
    (0b1111_1111_0, 9, 9),
    (0b1111_1111_10, 10, 10),
    (0b1111_1111_110, 11, 11),
];

/// `dct_dc_size_chrominance`, Table B-13.
pub const DCT_DC_SIZE_CHROMINANCE: &[(u16, u8, u8)] = &[
    (0b00, 2, 0),
    (0b01, 2, 1),
    (0b10, 2, 2),
    (0b110, 3, 3),
    (0b1110, 4, 4),
    (0b1_1110, 5, 5),
    (0b1111_110, 7, 6),
    (0b1111_1110, 8, 7),
    (0b1111_1111_0, 9, 8),
    (0b1111_1111_10, 10, 9),
    (0b1111_1111_110, 11, 10),
    (0b1111_1111_1110, 12, 11),
];

/// One DCT coefficient VLC entry: `(run, level)`, with `bits == 0` reserved
/// for the escape code (`0000 01`) that is handled specially by the caller.
#[derive(Clone, Copy, Debug)]
pub struct DctCoeffEntry {
    pub bits: u8,
    pub run: u8,
    pub level: i16,
}

const fn dct(bits: u8, run: u8, level: i16) -> DctCoeffEntry {
    DctCoeffEntry { bits, run, level }
}

/// `First DCT coefficient` VLC (Table B-14), indexed by a 16-bit peek. The
/// first table entry (`1`) decodes run=0, level=1, but only when this is the
/// first coefficient in the block (an `End of Block` cannot occur there).
pub const DCT_COEFF_FIRST: &[(u16, u8, DctCoeffEntry)] = &[
    (0b10, 2, dct(2, 0, 1)),
    (0b110, 3, dct(3, 1, 1)),
    (0b0110, 4, dct(4, 0, 2)),
    (0b0101, 4, dct(4, 2, 1)),
    (0b0011_1, 5, dct(5, 0, 3)),
    (0b0011_0, 5, dct(5, 4, 1)),
    (0b0010_11, 6, dct(6, 3, 1)),
    (0b0010_10, 6, dct(6, 7, 1)),
    (0b0010_01, 6, dct(6, 6, 1)),
    (0b0010_00, 6, dct(6, 1, 2)),
    (0b0000_10, 6, dct(6, 5, 1)),
];

/// `dct_coefficient_next` VLC (Table B-15): a continuation coefficient
/// (after at least one prior non-EOB coefficient), including End Of Block.
pub const DCT_COEFF_NEXT: &[(u16, u8, DctCoeffEntry)] = &[
    (0b10, 2, dct(2, 0, 1)),
    (0b0, 2, dct(2, 127, 0)), // End of Block sentinel: run=127 means "stop"
    (0b110, 3, dct(3, 1, 1)),
    (0b0110, 4, dct(4, 0, 2)),
    (0b0101, 4, dct(4, 2, 1)),
    (0b0011_1, 5, dct(5, 0, 3)),
    (0b0011_0, 5, dct(5, 4, 1)),
    (0b0010_11, 6, dct(6, 3, 1)),
    (0b0010_10, 6, dct(6, 7, 1)),
    (0b0010_01, 6, dct(6, 6, 1)),
    (0b0010_00, 6, dct(6, 1, 2)),
    (0b0000_10, 6, dct(6, 5, 1)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantizer_matrix_is_64_entries() {
        assert_eq!(DEFAULT_INTRA_QUANTIZER_MATRIX.len(), 64);
        assert_eq!(DEFAULT_INTRA_QUANTIZER_MATRIX[0], 8);
        assert_eq!(DEFAULT_INTRA_QUANTIZER_MATRIX[63], 83);
    }

    #[test]
    fn scan_tables_are_permutations() {
        let mut norm = SCAN_NORM.to_vec();
        norm.sort_unstable();
        assert_eq!(norm, (0u8..64).collect::<Vec<_>>());
        let mut alt = SCAN_ALT.to_vec();
        alt.sort_unstable();
        assert_eq!(alt, (0u8..64).collect::<Vec<_>>());
    }

    #[test]
    fn non_linear_scale_matches_source() {
        assert_eq!(NON_LINEAR_QUANTIZER_SCALE[0], 0);
        assert_eq!(NON_LINEAR_QUANTIZER_SCALE[9], 10);
        assert_eq!(NON_LINEAR_QUANTIZER_SCALE[31], 112);
    }
}
