//! Per-slice state and the macroblock decode loop that ties the VLC
//! decoder, inverse DCT, and motion compensation together.
//!
//! See: * 4.4. Slice VLC decoder
//!      * `rust-av-ffv1/src/slice.rs` for shape: plain data structs with
//!        `pub(crate)` fields and `#[derive(Clone, Default)]`.
//!      * `original_source/mpeg2dec/libmpeg2/slice.c`'s per-macroblock
//!        dispatch (mode decode -> quantizer update -> motion vectors ->
//!        coefficient blocks -> reconstruction).

use crate::framestore::Frame;
use crate::header::{PictureStructure, PictureType};
use crate::bitstream::Reader;
use crate::error::{Error, Result};
use crate::idct;
use crate::motion::{self, RefPlane};
use crate::tables::{SCAN_ALT, SCAN_NORM};
use crate::vlc;

/// Raw 2-bit `motion_type` codes, Table B-9/B-10 of 6.3.17.1 (the meaning of
/// `1`/`2` is swapped between frame and field pictures; see
/// `decode_motion_vectors`).
const MOTION_TYPE_FIELD: u8 = 1;
const MOTION_TYPE_FRAME_OR_16X8: u8 = 2;
const MOTION_TYPE_DUAL_PRIME: u8 = 3;

/// Per-slice parameters fixed before the macroblock loop starts.
#[derive(Clone, Default)]
pub struct SliceHeader {
    pub(crate) row: u8,
    pub(crate) quantizer_scale: u8,
    pub(crate) macroblock_address: u32,
}

impl SliceHeader {
    /// Parses `slice_header()` (6.2.4): `quantizer_scale_code` plus any
    /// `extra_bit_slice` fields, which this decoder discards since they
    /// carry no semantics here.
    pub fn parse(r: &mut Reader, row: u8, q_scale_type: bool) -> Self {
        let quantizer_scale = vlc::get_quantizer_scale(r, q_scale_type);
        while r.get_flag() {
            r.get_bits(8);
        }
        SliceHeader {
            row,
            quantizer_scale,
            macroblock_address: 0,
        }
    }
}

/// Per-direction motion predictor memory, `pmv[field][axis]` per §3's data
/// model ("two field predictors x (x,y)").
#[derive(Clone, Copy, Default)]
struct Predictor {
    pmv: [[i32; 2]; 2],
}

/// One direction's decoded motion vector(s) for a macroblock, shaped by
/// `motion_type` per §4.4's table.
#[derive(Clone, Copy)]
enum MotionVectors {
    /// A single vector covering the whole macroblock: `MC_FRAME`, a field
    /// picture's lone `MC_FIELD` vector (carrying its `field_select`), or
    /// the vector dual-prime transmits before deriving its second field.
    Whole {
        field_select: Option<bool>,
        mv: (i32, i32),
    },
    /// Two vectors, each with its own `field_select`: a frame picture's
    /// `MC_FIELD` (field-interleaved halves) or a field picture's
    /// `MC_16X8` (spatial top/bottom halves).
    Halves([(bool, (i32, i32)); 2]),
    /// `MC_DMV`: one coded vector plus the `dmvector` correction used to
    /// derive the opposite-parity-field prediction.
    DualPrime { mv: (i32, i32), dmv: (i32, i32) },
}

/// Resolves which `(field_select, mv)` pair, if any, applies to sub-block
/// `part` of a direction's decoded motion.
fn motion_for_part(m: Option<&MotionVectors>, part: usize) -> Option<(Option<bool>, (i32, i32))> {
    match m {
        None => None,
        Some(MotionVectors::Whole { field_select, mv }) if part == 0 => Some((*field_select, *mv)),
        Some(MotionVectors::Whole { .. }) => None,
        Some(MotionVectors::Halves(parts)) => Some((Some(parts[part].0), parts[part].1)),
        Some(MotionVectors::DualPrime { .. }) => None,
    }
}

/// Which of a frame's three planes a prediction reads from or writes to.
#[derive(Clone, Copy)]
enum PlaneKind {
    Y,
    Cb,
    Cr,
}

/// Addresses `plane` of `frame`, either at full resolution (`field_select =
/// None`, the `MC_FRAME` case) or as one field of it: every other row,
/// stride doubled, height halved, starting at row 0 (top) or row 1
/// (bottom). This is how a macroblock's `MC_FIELD`/`MC_16X8`/`MC_DMV`
/// prediction reads a specific reference field regardless of whether that
/// reference frame was itself coded progressive or interlaced.
fn reference_plane(frame: &Frame, plane: PlaneKind, field_select: Option<bool>) -> RefPlane<'_> {
    let (data, stride, width, height): (&[u8], usize, usize, usize) = match plane {
        PlaneKind::Y => (frame.y(), frame.y_stride as usize, frame.width as usize, frame.height as usize),
        PlaneKind::Cb => (
            frame.cb(),
            frame.c_stride as usize,
            (frame.width / 2) as usize,
            (frame.height / 2) as usize,
        ),
        PlaneKind::Cr => (
            frame.cr(),
            frame.c_stride as usize,
            (frame.width / 2) as usize,
            (frame.height / 2) as usize,
        ),
    };
    match field_select {
        None => RefPlane {
            data,
            stride,
            width,
            height,
        },
        Some(bottom) => {
            let row_offset = if bottom { stride } else { 0 };
            RefPlane {
                data: &data[row_offset.min(data.len())..],
                stride: stride * 2,
                width,
                height: height / 2,
            }
        }
    }
}

/// Parameters threaded into the slice decoder from the active sequence and
/// picture, kept separate from `Slice` because they outlive one slice.
pub struct SliceContext<'a> {
    pub picture_type: PictureType,
    pub picture_structure: PictureStructure,
    pub frame_pred_frame_dct: bool,
    pub q_scale_type: bool,
    pub intra_dc_precision: u8,
    pub alternate_scan: bool,
    pub mpeg1: bool,
    pub forward_f_code: [u8; 2],
    pub backward_f_code: [u8; 2],
    pub intra_quantizer_matrix: &'a [u8; 64],
    pub non_intra_quantizer_matrix: &'a [u8; 64],
    pub mb_width: u32,
    pub mb_height: u32,
}

/// Runs one slice: decodes `slice_header()` then macroblocks until the
/// chunk is exhausted, writing reconstructed samples into `current` and
/// reading prediction samples from `forward`/`backward`.
pub struct Slice<'a> {
    ctx: &'a SliceContext<'a>,
    header: SliceHeader,
    dc_pred: [i32; 3],
    forward_pred: Predictor,
    backward_pred: Predictor,
}

impl<'a> Slice<'a> {
    pub fn new(ctx: &'a SliceContext<'a>, code: u8, r: &mut Reader) -> Self {
        let header = SliceHeader::parse(r, code, ctx.q_scale_type);
        let dc_reset = 1i32 << (ctx.intra_dc_precision + 7);
        Slice {
            ctx,
            header,
            dc_pred: [dc_reset; 3],
            forward_pred: Predictor::default(),
            backward_pred: Predictor::default(),
        }
    }

    fn reset_intra_dc(&mut self) {
        let dc_reset = 1i32 << (self.ctx.intra_dc_precision + 7);
        self.dc_pred = [dc_reset; 3];
    }

    /// `(row_multiplier, row_offset)` mapping a field-local row to its real
    /// row in the shared frame buffer, per §4.7: field pictures interleave
    /// into one store with doubled stride, bottom fields offset by one row.
    fn outer_row_params(&self) -> (usize, usize) {
        match self.ctx.picture_structure {
            PictureStructure::Frame => (1, 0),
            PictureStructure::TopField => (2, 0),
            PictureStructure::BottomField => (2, 1),
        }
    }

    /// Decodes every macroblock in the slice, driving reconstruction into
    /// `current` and reading references from `forward`/`backward`.
    pub fn decode(
        &mut self,
        r: &mut Reader,
        current: &mut Frame,
        forward: Option<&Frame>,
        backward: Option<&Frame>,
    ) -> Result<()> {
        self.header.macroblock_address =
            (self.header.row as u32 - 1) * self.ctx.mb_width;

        loop {
            if r.overrun() {
                break;
            }
            let increment = vlc::get_macroblock_address_increment(r)?;
            if increment > 1 {
                self.skip_macroblocks(increment - 1, current, forward);
            }
            self.decode_macroblock(r, current, forward, backward)?;
            self.header.macroblock_address += 1;

            if self.header.macroblock_address >= self.ctx.mb_width * self.ctx.mb_height {
                break;
            }
        }
        Ok(())
    }

    /// Skipped macroblocks carry no residual: P-pictures predict them with
    /// zero motion, B-pictures reuse the last decoded (forward) motion
    /// vector.
    fn skip_macroblocks(&mut self, count: u32, current: &mut Frame, forward: Option<&Frame>) {
        if self.ctx.picture_type != PictureType::B {
            self.forward_pred.pmv = [[0, 0]; 2];
        }
        // §3: the DC predictor resets after every skipped macroblock. A
        // single reset covers the whole run since it overwrites to a fixed
        // value rather than accumulating.
        self.reset_intra_dc();

        let Some(reference) = forward else {
            self.header.macroblock_address += count;
            return;
        };
        let fwd_mv = (self.forward_pred.pmv[0][0], self.forward_pred.pmv[0][1]);
        let fwd_motion = MotionVectors::Whole {
            field_select: None,
            mv: fwd_mv,
        };

        for _ in 0..count {
            let mb_col = self.header.macroblock_address % self.ctx.mb_width;
            let mb_row = self.header.macroblock_address / self.ctx.mb_width;
            let y_x = (mb_col * 16) as usize;
            let y_y = (mb_row * 16) as usize;

            self.predict_plane(
                Some(&fwd_motion),
                None,
                Some(reference),
                None,
                PlaneKind::Y,
                current.y_mut(),
                current.y_stride as usize,
                y_x,
                y_y,
                16,
            );
            self.predict_plane(
                Some(&fwd_motion),
                None,
                Some(reference),
                None,
                PlaneKind::Cb,
                current.cb_mut(),
                current.c_stride as usize,
                y_x / 2,
                y_y / 2,
                8,
            );
            self.predict_plane(
                Some(&fwd_motion),
                None,
                Some(reference),
                None,
                PlaneKind::Cr,
                current.cr_mut(),
                current.c_stride as usize,
                y_x / 2,
                y_y / 2,
                8,
            );
            self.header.macroblock_address += 1;
        }
    }

    fn scan_table(&self) -> &'static [u8; 64] {
        if self.ctx.alternate_scan {
            &SCAN_ALT
        } else {
            &SCAN_NORM
        }
    }

    fn decode_macroblock(
        &mut self,
        r: &mut Reader,
        current: &mut Frame,
        forward: Option<&Frame>,
        backward: Option<&Frame>,
    ) -> Result<()> {
        let modes = vlc::get_macroblock_modes(
            r,
            self.ctx.picture_type,
            self.ctx.frame_pred_frame_dct,
            self.ctx.picture_structure == PictureStructure::Frame,
        )?;

        if modes.quant {
            self.header.quantizer_scale = vlc::get_quantizer_scale(r, self.ctx.q_scale_type);
        }

        let mb_col = self.header.macroblock_address % self.ctx.mb_width;
        let mb_row = self.header.macroblock_address / self.ctx.mb_width;
        let y_x = (mb_col * 16) as usize;
        let y_y = (mb_row * 16) as usize;

        if !modes.intra {
            self.reset_intra_dc();
            let fwd_motion = if modes.motion_forward {
                Some(self.decode_motion_vectors(r, 0, modes.motion_type))
            } else {
                None
            };
            let bwd_motion = if modes.motion_backward {
                Some(self.decode_motion_vectors(r, 1, modes.motion_type))
            } else {
                None
            };
            self.predict_inter(
                current,
                forward,
                backward,
                y_x,
                y_y,
                fwd_motion.as_ref(),
                bwd_motion.as_ref(),
            );
        }

        let coded_block_pattern = if modes.intra {
            0b111111
        } else if modes.pattern {
            vlc::get_coded_block_pattern(r)?
        } else {
            0
        };

        let (outer_mult, outer_offset) = self.outer_row_params();

        for block_index in 0..6u8 {
            let coded = (coded_block_pattern >> (5 - block_index)) & 1 != 0;
            if !coded && !modes.intra {
                continue;
            }
            let component = if block_index < 4 { 0 } else { block_index - 3 };
            let mut block = [0i32; 64];
            self.decode_block(r, &modes, component, block_index, &mut block)?;

            let (plane, offset, eff_stride): (&mut [u8], usize, usize) =
                if block_index < 4 {
                    let y_stride = current.y_stride as usize;
                    if modes.dct_type_interlaced {
                        // §4.4 "DCT type": the four luma blocks interleave
                        // their own field lines instead of stacking; bottom
                        // blocks start one row down rather than eight.
                        let (bx, bottom) = match block_index {
                            0 => (y_x, false),
                            1 => (y_x + 8, false),
                            2 => (y_x, true),
                            _ => (y_x + 8, true),
                        };
                        let row = y_y + if bottom { 1 } else { 0 };
                        (current.y_mut(), row * y_stride + bx, y_stride * 2)
                    } else {
                        let (bx, by) = match block_index {
                            0 => (y_x, y_y),
                            1 => (y_x + 8, y_y),
                            2 => (y_x, y_y + 8),
                            _ => (y_x + 8, y_y + 8),
                        };
                        let real_by = by * outer_mult + outer_offset;
                        (current.y_mut(), real_by * y_stride + bx, y_stride * outer_mult)
                    }
                } else {
                    let c_stride = current.c_stride as usize;
                    let plane = if block_index == 4 {
                        current.cb_mut()
                    } else {
                        current.cr_mut()
                    };
                    let real_by = (y_y / 2) * outer_mult + outer_offset;
                    (plane, real_by * c_stride + y_x / 2, c_stride * outer_mult)
                };
            if modes.intra {
                idct::put_block(&mut block, &mut plane[offset..], eff_stride);
            } else {
                idct::add_block(&mut block, &mut plane[offset..], eff_stride);
            }
        }

        Ok(())
    }

    /// Decodes one direction's motion vector(s), shaped by `motion_type`
    /// and the picture's structure per §4.4's table. Desyncing the number
    /// of bits read here (rather than the prediction math) is the failure
    /// mode that matters most: every branch must consume exactly what the
    /// encoder wrote even when the resulting prediction is an
    /// approximation.
    fn decode_motion_vectors(&mut self, r: &mut Reader, direction: usize, motion_type: u8) -> MotionVectors {
        let f_code = if direction == 0 {
            self.ctx.forward_f_code
        } else {
            self.ctx.backward_f_code
        };
        let is_frame = self.ctx.picture_structure == PictureStructure::Frame;
        let pred = if direction == 0 {
            &mut self.forward_pred
        } else {
            &mut self.backward_pred
        };

        let mut read_vector = |r: &mut Reader, pred: &mut Predictor, slot: usize| -> (i32, i32) {
            let mut out = [0i32; 2];
            for axis in 0..2 {
                let delta = vlc::get_motion_delta(r, f_code[axis]);
                let raw = pred.pmv[slot][axis] + delta;
                let bounded = vlc::bound_motion_vector(raw, f_code[axis]);
                pred.pmv[slot][axis] = bounded;
                out[axis] = bounded;
            }
            (out[0], out[1])
        };

        match (motion_type, is_frame) {
            (MOTION_TYPE_FIELD, true) => {
                // MC_FIELD in a frame picture: two field-interleaved halves.
                let sel0 = r.get_flag();
                let mv0 = read_vector(r, pred, 0);
                let sel1 = r.get_flag();
                let mv1 = read_vector(r, pred, 1);
                MotionVectors::Halves([(sel0, mv0), (sel1, mv1)])
            }
            (MOTION_TYPE_FIELD, false) => {
                // MC_FIELD in a field picture: one vector, whole macroblock.
                let sel = r.get_flag();
                let mv = read_vector(r, pred, 0);
                pred.pmv[1] = pred.pmv[0];
                MotionVectors::Whole {
                    field_select: Some(sel),
                    mv,
                }
            }
            (MOTION_TYPE_FRAME_OR_16X8, false) => {
                // MC_16X8 in a field picture: a literal top/bottom split.
                let sel0 = r.get_flag();
                let mv0 = read_vector(r, pred, 0);
                let sel1 = r.get_flag();
                let mv1 = read_vector(r, pred, 1);
                MotionVectors::Halves([(sel0, mv0), (sel1, mv1)])
            }
            (MOTION_TYPE_DUAL_PRIME, _) => {
                let mv = read_vector(r, pred, 0);
                pred.pmv[1] = pred.pmv[0];
                let dmv = (vlc::get_dmv(r) as i32, vlc::get_dmv(r) as i32);
                MotionVectors::DualPrime { mv, dmv }
            }
            _ => {
                // MC_FRAME (motion_type == 2 in a frame picture), or the
                // frame_pred_frame_dct-forced case that reads no bits here.
                let mv = read_vector(r, pred, 0);
                pred.pmv[1] = pred.pmv[0];
                MotionVectors::Whole {
                    field_select: None,
                    mv,
                }
            }
        }
    }

    fn predict_inter(
        &self,
        current: &mut Frame,
        forward: Option<&Frame>,
        backward: Option<&Frame>,
        y_x: usize,
        y_y: usize,
        fwd_motion: Option<&MotionVectors>,
        bwd_motion: Option<&MotionVectors>,
    ) {
        self.predict_plane(
            fwd_motion,
            bwd_motion,
            forward,
            backward,
            PlaneKind::Y,
            current.y_mut(),
            current.y_stride as usize,
            y_x,
            y_y,
            16,
        );

        // Chroma motion vectors are approximated as the luma vector applied
        // directly at half resolution (no extra quarter-pel chroma phase).
        let c_x = y_x / 2;
        let c_y = y_y / 2;
        self.predict_plane(
            fwd_motion,
            bwd_motion,
            forward,
            backward,
            PlaneKind::Cb,
            current.cb_mut(),
            current.c_stride as usize,
            c_x,
            c_y,
            8,
        );
        self.predict_plane(
            fwd_motion,
            bwd_motion,
            forward,
            backward,
            PlaneKind::Cr,
            current.cr_mut(),
            current.c_stride as usize,
            c_x,
            c_y,
            8,
        );
    }

    /// Motion-compensates one plane of one macroblock, handling
    /// frame/field/dual-prime motion types uniformly. `dx`/`dy` are the
    /// macroblock's field-local top-left corner; this resolves the real
    /// buffer rows via `outer_row_params` (picture-level field storage) and,
    /// for `MotionVectors::Halves`, an inner split that is field-interleaved
    /// in a frame picture (`MC_FIELD`) or spatially stacked in a field
    /// picture (`MC_16X8`).
    #[allow(clippy::too_many_arguments)]
    fn predict_plane(
        &self,
        fwd_motion: Option<&MotionVectors>,
        bwd_motion: Option<&MotionVectors>,
        forward: Option<&Frame>,
        backward: Option<&Frame>,
        plane: PlaneKind,
        dest: &mut [u8],
        dest_stride: usize,
        dx: usize,
        dy: usize,
        size: usize,
    ) {
        if let Some(MotionVectors::DualPrime { mv, dmv }) = fwd_motion {
            self.predict_dual_prime(*mv, *dmv, forward, plane, dest, dest_stride, dx, dy, size);
            return;
        }

        let frame_picture = self.ctx.picture_structure == PictureStructure::Frame;
        let (outer_mult, outer_offset) = self.outer_row_params();
        let is_split = matches!(fwd_motion, Some(MotionVectors::Halves(_)))
            || matches!(bwd_motion, Some(MotionVectors::Halves(_)));

        let (parts, part_count): ([(usize, usize, usize, usize); 2], usize) = if is_split {
            let half = size / 2;
            if frame_picture {
                // MC_FIELD in a frame picture: the two vectors predict this
                // macroblock's field-interleaved lines, not a spatial split.
                ([(0, half, 2, 0), (0, half, 2, 1)], 2)
            } else {
                // MC_16X8 in a field picture: a literal top/bottom split.
                ([(0, half, 1, 0), (half, half, 1, 0)], 2)
            }
        } else {
            ([(0, size, 1, 0), (0, 0, 1, 0)], 1)
        };

        for (part_index, &(local_row0, rows, inner_mult, inner_offset)) in
            parts[..part_count].iter().enumerate()
        {
            let fwd_part = motion_for_part(fwd_motion, part_index);
            let bwd_part = motion_for_part(bwd_motion, part_index);

            let mut fwd_buf = [0u8; 16 * 16];
            let mut bwd_buf = [0u8; 16 * 16];
            let buf_len = rows * size;

            if let (Some((field_select, mv)), Some(frame)) = (fwd_part, forward) {
                let refp = reference_plane(frame, plane, field_select);
                motion::predict_block(
                    &refp,
                    dx as i32,
                    (dy + local_row0) as i32,
                    mv.0,
                    mv.1,
                    &mut fwd_buf[..buf_len],
                    size,
                    size,
                    rows,
                );
            }
            if let (Some((field_select, mv)), Some(frame)) = (bwd_part, backward) {
                let refp = reference_plane(frame, plane, field_select);
                motion::predict_block(
                    &refp,
                    dx as i32,
                    (dy + local_row0) as i32,
                    mv.0,
                    mv.1,
                    &mut bwd_buf[..buf_len],
                    size,
                    size,
                    rows,
                );
            }

            let have_fwd = fwd_part.is_some();
            let have_bwd = bwd_part.is_some();
            let result: &[u8] = if have_fwd && have_bwd {
                motion::average_predictions(&mut fwd_buf[..buf_len], &bwd_buf[..buf_len], size, size, rows);
                &fwd_buf[..buf_len]
            } else if have_bwd {
                &bwd_buf[..buf_len]
            } else {
                &fwd_buf[..buf_len]
            };

            for row in 0..rows {
                let local_row = local_row0 + row;
                let real_row = local_row * inner_mult + inner_offset;
                let buffer_row = (dy + real_row) * outer_mult + outer_offset;
                let off = buffer_row * dest_stride + dx;
                dest[off..off + size].copy_from_slice(&result[row * size..row * size + size]);
            }
        }
    }

    /// `MC_DMV`: averages a same-parity prediction (the transmitted vector,
    /// unmodified) with an opposite-parity prediction derived from the
    /// transmitted `dmvector` correction via `motion::dual_prime_vector`,
    /// per §4.6. Which field counts as "same parity" follows the current
    /// picture's own structure (top/bottom field), or defaults to the top
    /// field for frame pictures — a simplification noted in DESIGN.md since
    /// `top_field_first` isn't threaded through to the slice layer.
    #[allow(clippy::too_many_arguments)]
    fn predict_dual_prime(
        &self,
        mv: (i32, i32),
        dmv: (i32, i32),
        reference: Option<&Frame>,
        plane: PlaneKind,
        dest: &mut [u8],
        dest_stride: usize,
        dx: usize,
        dy: usize,
        size: usize,
    ) {
        let Some(reference) = reference else {
            return;
        };
        let current_is_bottom = self.ctx.picture_structure == PictureStructure::BottomField;
        let opposite_mv = (
            motion::dual_prime_vector(mv.0, dmv.0, !current_is_bottom),
            motion::dual_prime_vector(mv.1, dmv.1, !current_is_bottom),
        );

        let (outer_mult, outer_offset) = self.outer_row_params();
        let same_field = reference_plane(reference, plane, Some(current_is_bottom));
        let opposite_field = reference_plane(reference, plane, Some(!current_is_bottom));

        let mut same_buf = [0u8; 16 * 16];
        let mut opp_buf = [0u8; 16 * 16];
        let buf_len = size * size;
        motion::predict_block(
            &same_field,
            dx as i32,
            dy as i32,
            mv.0,
            mv.1,
            &mut same_buf[..buf_len],
            size,
            size,
            size,
        );
        motion::predict_block(
            &opposite_field,
            dx as i32,
            dy as i32,
            opposite_mv.0,
            opposite_mv.1,
            &mut opp_buf[..buf_len],
            size,
            size,
            size,
        );
        motion::average_predictions(&mut same_buf[..buf_len], &opp_buf[..buf_len], size, size, size);

        for row in 0..size {
            let buffer_row = (dy + row) * outer_mult + outer_offset;
            let off = buffer_row * dest_stride + dx;
            dest[off..off + size].copy_from_slice(&same_buf[row * size..row * size + size]);
        }
    }

    fn decode_block(
        &mut self,
        r: &mut Reader,
        modes: &vlc::MacroblockModes,
        component: u8,
        block_index: u8,
        block: &mut [i32; 64],
    ) -> Result<()> {
        let scan = self.scan_table();
        let (matrix, is_intra) = if modes.intra {
            (self.ctx.intra_quantizer_matrix, true)
        } else {
            (self.ctx.non_intra_quantizer_matrix, false)
        };
        let qscale = self.header.quantizer_scale as i32;

        let mut index = 0usize;
        if is_intra {
            let diff = if component == 0 {
                vlc::get_luma_dc_dct_diff(r)?
            } else {
                vlc::get_chroma_dc_dct_diff(r)?
            };
            let comp = component as usize;
            self.dc_pred[comp] += diff;
            let shift = 3 - self.dc_pred_shift();
            block[0] = self.dc_pred[comp] << shift;
            index = 1;
        }

        let mut first = !is_intra;
        loop {
            let coeff = vlc::get_dct_coefficient(r, first)?;
            first = false;
            match coeff {
                vlc::DctCoeff::EndOfBlock => break,
                vlc::DctCoeff::RunLevel { run, level } => {
                    index += run as usize + 1;
                    if index >= 64 {
                        return Err(Error::SliceError("DCT coefficient index overflow".into()));
                    }
                    let pos = scan[index - 1] as usize;
                    let weight = matrix[pos] as i32;
                    let mut value = (2 * level as i32 + level.signum() as i32) * qscale * weight;
                    value >>= 4;
                    if self.ctx.mpeg1 {
                        value = oddify(value);
                    }
                    block[pos] = saturate(value);
                }
            }
            if index >= 64 {
                break;
            }
        }

        // End-of-block mismatch control (§3): XOR of all 64 coefficients
        // must be odd; flip the LSB of coefficient 63 if it isn't.
        if !self.ctx.mpeg1 {
            let parity: i32 = block.iter().fold(0, |acc, &v| acc ^ v);
            if parity & 1 == 0 {
                block[63] ^= 1;
            }
        }

        Ok(())
    }

    fn dc_pred_shift(&self) -> u8 {
        self.ctx.intra_dc_precision
    }
}

/// Clips a dequantized coefficient to `[-2048, 2047]`, per `SATURATE`.
fn saturate(value: i32) -> i32 {
    value.clamp(-2048, 2047)
}

/// MPEG-1 "oddification" (`get_mpeg1_intra_block`/`get_mpeg1_non_intra_block`
/// in `slice.c`): forces every dequantized AC coefficient's LSB to 1 by
/// decrementing even values, independent of sign.
fn oddify(value: i32) -> i32 {
    if value & 1 != 0 {
        value
    } else {
        value - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturate_clamps_to_range() {
        assert_eq!(saturate(5000), 2047);
        assert_eq!(saturate(-5000), -2048);
        assert_eq!(saturate(10), 10);
    }

    #[test]
    fn slice_header_parses_quantizer_scale() {
        let buf = [0b0000_1000, 0, 0, 0, 0];
        let mut r = Reader::new(&buf);
        let hdr = SliceHeader::parse(&mut r, 1, false);
        assert_eq!(hdr.quantizer_scale, 2);
        assert_eq!(hdr.row, 1);
    }
}
