// mpeg2 crate
extern crate mpeg2;

// rust-av crates
extern crate av_data as data;
extern crate av_format as format;

// Matroska demuxer
extern crate matroska;

use std::fs::File;

use data::params::MediaKind;
use format::buffer::AccReader;
use format::demuxer::{Context, Event};

use matroska::demuxer::MkvDemuxer;

use mpeg2::decoder::{Config, Decoder, ParseState};
use mpeg2::error::Result;
use mpeg2::framestore::Frame;
use mpeg2::sink::{FrameFlags, Sink};

// Discards decoded frames; this harness only measures decode throughput.
struct NullSink;

impl Sink for NullSink {
    fn setup(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
    fn allocate_frame(&mut self, width: u32, height: u32, id: u64) -> Result<Frame> {
        Ok(Frame::new(width, height, id))
    }
    fn set_frame(&mut self, _flags: FrameFlags) -> Result<()> {
        Ok(())
    }
    fn draw_frame(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
    fn flip_page(&mut self) -> Result<()> {
        Ok(())
    }
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn drive(decoder: &mut Decoder<NullSink>) {
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

fn main() -> std::io::Result<()> {
    // Open the matroska file
    let f = std::env::args().nth(1).expect("File path expected");
    let reader = File::open(f).unwrap();

    // Create a buffer of size 4096MB to contain matroska data
    let ar = AccReader::with_capacity(4 * 1024, reader);

    // Set the type of demuxer, in this case, a matroska demuxer
    let mut demuxer = Context::new(Box::new(MkvDemuxer::new()), Box::new(ar));

    // Read matroska headers
    demuxer
        .read_headers()
        .expect("Cannot parse the format headers");

    let mut video_track: Option<usize> = None;
    for (index, stream) in demuxer.info.streams.iter().enumerate() {
        if let Some(MediaKind::Video(_)) = &stream.params.kind {
            if video_track.is_none() {
                video_track = Some(index);
            }
        }
    }
    let video_track = video_track.expect("No video track found in input");

    let mut decoder = Decoder::new(NullSink, Config::default());

    loop {
        match demuxer.read_event() {
            Ok(Event::NewPacket(pkt)) => {
                if pkt.stream_index as usize != video_track {
                    continue;
                }
                decoder.buffer(&pkt.data);
                drive(&mut decoder);
            }
            Ok(Event::Eof) => break,
            _ => break,
        }
    }

    Ok(())
}
