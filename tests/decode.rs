//! End-to-end test: hand-builds a minimal MPEG-1 elementary stream (one
//! 16x16 intra frame, flat DC, no AC residual) and decodes it through the
//! public `Decoder`/`Sink` API, asserting the reconstructed planes.

extern crate mpeg2;

use mpeg2::decoder::{Config, Decoder, ParseState};
use mpeg2::error::Result;
use mpeg2::framestore::Frame;
use mpeg2::sink::{FrameFlags, Sink};

/// Packs a string of `'0'`/`'1'` characters into bytes, padding the final
/// byte with zero bits.
fn bits_to_bytes(bits: &str) -> Vec<u8> {
    let mut padded = bits.to_owned();
    while padded.len() % 8 != 0 {
        padded.push('0');
    }
    padded
        .as_bytes()
        .chunks(8)
        .map(|c| u8::from_str_radix(std::str::from_utf8(c).unwrap(), 2).unwrap())
        .collect()
}

fn sequence_header_bytes() -> Vec<u8> {
    let mut bits = String::new();
    bits.push_str(&format!("{:012b}", 16u32)); // horizontal_size_value
    bits.push_str(&format!("{:012b}", 16u32)); // vertical_size_value
    bits.push_str(&format!("{:04b}", 1u32)); // aspect_ratio_information
    bits.push_str(&format!("{:04b}", 1u32)); // frame_rate_code
    bits.push_str(&format!("{:018b}", 1u32)); // bit_rate_value
    bits.push('1'); // marker_bit
    bits.push_str(&format!("{:010b}", 0u32)); // vbv_buffer_size_value
    bits.push('0'); // constrained_parameters_flag
    bits.push('0'); // load_intra_quantiser_matrix
    bits.push('0'); // load_non_intra_quantiser_matrix
    bits_to_bytes(&bits)
}

fn picture_header_bytes() -> Vec<u8> {
    let mut bits = String::new();
    bits.push_str(&format!("{:010b}", 0u32)); // temporal_reference
    bits.push_str(&format!("{:03b}", 1u32)); // picture_coding_type = I
    bits.push_str(&format!("{:016b}", 0u32)); // vbv_delay
    bits_to_bytes(&bits)
}

/// One slice covering the single macroblock of a 16x16 frame: slice header
/// (quantizer_scale_code=1, no extra bits), one intra macroblock with a
/// flat DC (size 0, no differential) and an immediate end-of-block in every
/// one of its six blocks.
fn slice_bytes() -> Vec<u8> {
    let mut bits = String::new();
    bits.push_str("00001"); // quantizer_scale_code = 1
    bits.push('0'); // extra_bit_slice terminator
    bits.push('1'); // macroblock_address_increment = 1
    bits.push('1'); // macroblock_type (I): intra, no quant
    let luma_block = "10000"; // dct_dc_size_luminance=0 (100) + end_of_block (00)
    let chroma_block = "0000"; // dct_dc_size_chrominance=0 (00) + end_of_block (00)
    for _ in 0..4 {
        bits.push_str(luma_block);
    }
    for _ in 0..2 {
        bits.push_str(chroma_block);
    }
    bits_to_bytes(&bits)
}

struct RecordingSink {
    frames: Vec<Frame>,
}

impl Sink for RecordingSink {
    fn setup(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
    fn allocate_frame(&mut self, width: u32, height: u32, id: u64) -> Result<Frame> {
        Ok(Frame::new(width, height, id))
    }
    fn set_frame(&mut self, _flags: FrameFlags) -> Result<()> {
        Ok(())
    }
    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
    fn flip_page(&mut self) -> Result<()> {
        Ok(())
    }
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn drive(decoder: &mut Decoder<RecordingSink>) {
    let mut in_picture = false;
    loop {
        match decoder.parse().unwrap() {
            None => return,
            Some(ParseState::Slice) | Some(ParseState::Slice1st) => in_picture = true,
            Some(state) => {
                if in_picture {
                    decoder.finish_picture().unwrap();
                    in_picture = false;
                }
                if state == ParseState::End {
                    return;
                }
            }
        }
    }
}

#[test]
fn decodes_single_flat_intra_frame() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&[0, 0, 1, 0xB3]);
    stream.extend_from_slice(&sequence_header_bytes());
    stream.extend_from_slice(&[0, 0, 1, 0x00]);
    stream.extend_from_slice(&picture_header_bytes());
    stream.extend_from_slice(&[0, 0, 1, 0x01]);
    stream.extend_from_slice(&slice_bytes());
    stream.extend_from_slice(&[0, 0, 1, 0xB7]);
    stream.extend_from_slice(&[0, 0, 1, 0x00]); // flushes the 0xB7 chunk

    let mut decoder = Decoder::new(RecordingSink { frames: Vec::new() }, Config::default());
    decoder.buffer(&stream);
    drive(&mut decoder);
    decoder.close().unwrap();

    let frames = &decoder.sink().frames;
    assert_eq!(frames.len(), 2, "the priming blank frame, then the decoded one");

    let decoded = &frames[1];
    assert_eq!(decoded.width(), 16);
    assert_eq!(decoded.height(), 16);
    assert!(decoded.y().iter().all(|&v| v == 128));
    assert!(decoded.cb().iter().all(|&v| v == 128));
    assert!(decoded.cr().iter().all(|&v| v == 128));
}
