//! Slice-level variable-length code decoding: macroblock addressing, modes,
//! motion vectors, coded block pattern, and DCT coefficients.
//!
//! See: * 4.4. Slice/macroblock decode
//!      * `original_source/mpeg2dec/libmpeg2/slice.c`'s `get_macroblock_modes`,
//!        `get_quantizer_scale`, `get_motion_delta`, `bound_motion_vector`,
//!        `get_dmv`, `get_coded_block_pattern`, `get_luma_dc_dct_diff`,
//!        `get_chroma_dc_dct_diff`, `get_intra_block_B14`/`B15`, reshaped from
//!        inline bit-buffer macros into methods on `bitstream::Reader`.

use crate::bitstream::Reader;
use crate::constants::*;
use crate::error::{Error, Result};
use crate::header::PictureType;
use crate::tables::{
    DctCoeffEntry, CODED_BLOCK_PATTERN, DCT_COEFF_FIRST, DCT_COEFF_NEXT,
    DCT_DC_SIZE_CHROMINANCE, DCT_DC_SIZE_LUMINANCE, DMV, MACROBLOCK_ADDRESS_INCREMENT,
    MB_TYPE_B, MB_TYPE_I, MB_TYPE_P, MOTION_CODE, NON_LINEAR_QUANTIZER_SCALE,
};

/// Decoded macroblock modes, the bitfield built up by `get_macroblock_modes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroblockModes {
    pub intra: bool,
    pub pattern: bool,
    pub motion_forward: bool,
    pub motion_backward: bool,
    pub quant: bool,
    pub dct_type_interlaced: bool,
    pub motion_type: u8,
}

/// `macroblock_address_increment`, Table B-1. Returns the increment,
/// transparently summing `macroblock_escape` codes and skipping
/// `macroblock_stuffing`. Bounded by `SLICE_STUFFING_LIMIT` per §9 OQ2.
pub fn get_macroblock_address_increment(r: &mut Reader) -> Result<u32> {
    let mut increment = 0u32;
    let mut stuffing_seen = 0u32;
    loop {
        r.need_bits();
        let (entry, width) = MACROBLOCK_ADDRESS_INCREMENT
            .iter()
            .find(|(pattern, width, _)| r.peek(*width as u32) == *pattern as u32)
            .map(|(p, w, e)| (*e, *w))
            .ok_or_else(|| Error::SliceError("invalid macroblock_address_increment".into()))?;
        if width == 0 {
            // macroblock_escape: fixed 11-bit code, adds 33 and continues.
            r.consume(11);
            increment += 33;
            continue;
        }
        r.consume(width as u32);
        if entry.value < 0 {
            // macroblock_stuffing: no increment, keep scanning.
            stuffing_seen += 1;
            if stuffing_seen > SLICE_STUFFING_LIMIT {
                return Err(Error::SliceError(
                    "macroblock_address_increment: too much stuffing".into(),
                ));
            }
            continue;
        }
        increment += entry.value as u32;
        return Ok(increment);
    }
}

/// `macroblock_type` + `macroblock_modes`, Tables B-2/B-3/B-4 plus the
/// trailing `motion_type`/`dct_type` fields, per `get_macroblock_modes`.
pub fn get_macroblock_modes(
    r: &mut Reader,
    picture_type: PictureType,
    frame_pred_frame_dct: bool,
    picture_structure_is_frame: bool,
) -> Result<MacroblockModes> {
    r.need_bits();
    let mut m = MacroblockModes::default();

    match picture_type {
        PictureType::I => {
            let (pattern, width, quant, intra) = *MB_TYPE_I
                .iter()
                .find(|(p, w, _, _)| r.peek(*w as u32) as u8 == *p)
                .ok_or_else(|| Error::SliceError("invalid I macroblock_type".into()))?;
            let _ = pattern;
            r.consume(width as u32);
            m.quant = quant;
            m.intra = intra;
            if !frame_pred_frame_dct && picture_structure_is_frame {
                m.dct_type_interlaced = r.get_flag();
            }
        }
        PictureType::P => {
            let (_, width, quant, forward, pattern, intra) = *MB_TYPE_P
                .iter()
                .find(|(p, w, ..)| r.peek(*w as u32) as u8 == *p)
                .ok_or_else(|| Error::SliceError("invalid P macroblock_type".into()))?;
            r.consume(width as u32);
            m.quant = quant;
            m.motion_forward = forward;
            m.pattern = pattern;
            m.intra = intra;

            if !picture_structure_is_frame {
                if m.motion_forward {
                    m.motion_type = r.get_bits(2) as u8;
                }
            } else if frame_pred_frame_dct {
                if m.motion_forward {
                    m.motion_type = (MC_FRAME / MOTION_TYPE_BASE) as u8;
                }
            } else {
                if m.motion_forward {
                    m.motion_type = r.get_bits(2) as u8;
                }
                if m.intra || m.pattern {
                    m.dct_type_interlaced = r.get_flag();
                }
            }
        }
        PictureType::B => {
            let (_, width, quant, forward, backward, pattern, intra) = *MB_TYPE_B
                .iter()
                .find(|(p, w, ..)| r.peek(*w as u32) as u8 == *p)
                .ok_or_else(|| Error::SliceError("invalid B macroblock_type".into()))?;
            r.consume(width as u32);
            m.quant = quant;
            m.motion_forward = forward;
            m.motion_backward = backward;
            m.pattern = pattern;
            m.intra = intra;

            if !picture_structure_is_frame {
                if !m.intra {
                    m.motion_type = r.get_bits(2) as u8;
                }
            } else if frame_pred_frame_dct {
                m.motion_type = (MC_FRAME / MOTION_TYPE_BASE) as u8;
            } else {
                if !m.intra {
                    m.motion_type = r.get_bits(2) as u8;
                }
                if m.intra || m.pattern {
                    m.dct_type_interlaced = r.get_flag();
                }
            }
        }
        PictureType::D => {
            r.consume(1);
            m.intra = true;
        }
    }
    Ok(m)
}

/// `quantiser_scale_code`, 7.4.2.2.
pub fn get_quantizer_scale(r: &mut Reader, q_scale_type: bool) -> u8 {
    let code = r.get_bits(5) as usize;
    if q_scale_type {
        NON_LINEAR_QUANTIZER_SCALE[code]
    } else {
        (code << 1) as u8
    }
}

/// `motion_code`/`motion_residual`, Table B-10, combined into the final
/// differential per 7.6.3.1.
pub fn get_motion_delta(r: &mut Reader, f_code: u8) -> i32 {
    r.need_bits();
    if r.get_flag() {
        return 0;
    }
    let (entry, width) = MOTION_CODE
        .iter()
        .find(|(pattern, width, _)| r.peek(*width as u32) == *pattern)
        .map(|(_, w, v)| (*v, *w))
        .unwrap_or((0, 1));
    r.consume(width as u32);
    let sign = entry < 0;
    let mut delta = (entry.unsigned_abs() as i32) << f_code;
    if entry != 0 {
        delta -= (1 << f_code) - 1;
    }
    if f_code > 0 {
        delta += r.get_bits(f_code as u32) as i32;
    }
    if sign {
        -delta
    } else {
        delta
    }
}

/// `bound_motion_vector`, wraps a predicted vector back into its legal range
/// per `f_code`.
pub fn bound_motion_vector(vector: i32, f_code: u8) -> i32 {
    let limit = 16i32 << f_code;
    let two_limit = 2 * limit;
    if (vector.wrapping_add(limit) as u32) < two_limit as u32 {
        vector
    } else if vector < 0 {
        vector + two_limit
    } else {
        vector - two_limit
    }
}

/// `dmvector`, Table B-11.
pub fn get_dmv(r: &mut Reader) -> i8 {
    r.need_bits();
    let (entry, width) = DMV
        .iter()
        .find(|(pattern, width, _)| r.peek(*width as u32) as u8 == *pattern)
        .map(|(_, w, v)| (*v, *w))
        .unwrap_or((0, 1));
    r.consume(width as u32);
    entry
}

/// `coded_block_pattern`, Table B-9.
pub fn get_coded_block_pattern(r: &mut Reader) -> Result<u8> {
    r.need_bits();
    let (cbp, width) = CODED_BLOCK_PATTERN
        .iter()
        .find(|(pattern, width, _)| r.peek(*width as u32) == *pattern)
        .map(|(_, w, c)| (*c, *w))
        .ok_or_else(|| Error::SliceError("invalid coded_block_pattern".into()))?;
    r.consume(width as u32);
    Ok(cbp)
}

fn dc_size(r: &mut Reader, table: &[(u16, u8, u8)]) -> Result<u8> {
    r.need_bits();
    let (size, width) = table
        .iter()
        .find(|(pattern, width, _)| r.peek(*width as u32) == *pattern)
        .map(|(_, w, s)| (*s, *w))
        .ok_or_else(|| Error::SliceError("invalid dct_dc_size".into()))?;
    r.consume(width as u32);
    Ok(size)
}

/// Reads a signed DC differential of `size` bits per 7.2.1's convention:
/// the top bit distinguishes positive (`1xxx`) from negative (`0xxx`,
/// two's-complement-like but biased) ranges.
fn dc_diff_of_size(r: &mut Reader, size: u8) -> i32 {
    if size == 0 {
        return 0;
    }
    let raw = r.get_bits(size as u32) as i32;
    let half = 1i32 << (size - 1);
    if raw < half {
        raw - (2 * half - 1)
    } else {
        raw
    }
}

/// `dct_dc_size_luminance` + differential, Table B-12.
pub fn get_luma_dc_dct_diff(r: &mut Reader) -> Result<i32> {
    let size = dc_size(r, DCT_DC_SIZE_LUMINANCE)?;
    Ok(dc_diff_of_size(r, size))
}

/// `dct_dc_size_chrominance` + differential, Table B-13.
pub fn get_chroma_dc_dct_diff(r: &mut Reader) -> Result<i32> {
    let size = dc_size(r, DCT_DC_SIZE_CHROMINANCE)?;
    Ok(dc_diff_of_size(r, size))
}

/// One decoded run/level pair in coefficient-scan order, or the end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DctCoeff {
    RunLevel { run: u8, level: i16 },
    EndOfBlock,
}

/// `DCT_coefficient_first`/`DCT_coefficient_next`, Tables B-14/B-15, plus the
/// fixed-length escape (6.2.6's `Escape` code followed by a 6-bit run and a
/// signed level per 7.2.2.2).
pub fn get_dct_coefficient(r: &mut Reader, first: bool) -> Result<DctCoeff> {
    r.need_bits();
    const ESCAPE_PATTERN: u16 = 0b0000_01;
    const ESCAPE_WIDTH: u32 = 6;
    if r.peek(ESCAPE_WIDTH) == ESCAPE_PATTERN as u32 {
        r.consume(ESCAPE_WIDTH);
        let run = r.get_bits(6) as u8;
        let level = r.get_bits_signed(12) as i16;
        return Ok(DctCoeff::RunLevel { run, level });
    }

    let table: &[(u16, u8, DctCoeffEntry)] = if first {
        DCT_COEFF_FIRST
    } else {
        DCT_COEFF_NEXT
    };
    let (entry, width) = table
        .iter()
        .find(|(pattern, width, _)| r.peek(*width as u32) == *pattern)
        .map(|(_, w, e)| (*e, *w))
        .ok_or_else(|| Error::SliceError("invalid DCT coefficient code".into()))?;
    r.consume(width as u32);
    if !first && entry.run == 127 && entry.level == 0 {
        return Ok(DctCoeff::EndOfBlock);
    }
    let sign_bit = r.get_flag();
    let level = if sign_bit {
        -(entry.level)
    } else {
        entry.level
    };
    Ok(DctCoeff::RunLevel {
        run: entry.run,
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantizer_scale_linear() {
        let buf = [0b0000_1000, 0, 0, 0, 0];
        let mut r = Reader::new(&buf);
        let q = get_quantizer_scale(&mut r, false);
        assert_eq!(q, 2);
    }

    #[test]
    fn bound_motion_vector_wraps_positive_overflow() {
        // f_code=0 => limit=16, two_limit=32. A vector of 20 is out of
        // [-16, 15] and should wrap to 20-32=-12.
        assert_eq!(bound_motion_vector(20, 0), -12);
    }

    #[test]
    fn bound_motion_vector_identity_in_range() {
        assert_eq!(bound_motion_vector(5, 0), 5);
    }

    #[test]
    fn macroblock_address_increment_single_bit() {
        let buf = [0b1000_0000, 0, 0, 0, 0];
        let mut r = Reader::new(&buf);
        assert_eq!(get_macroblock_address_increment(&mut r).unwrap(), 1);
    }
}
