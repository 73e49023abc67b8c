//! This example decodes an MPEG-1/MPEG-2 elementary stream contained in a
//! matroska file and writes the decoded planes as raw planar YUV 4:2:0.

// mpeg2 crate
extern crate mpeg2;

// rust-av crates
extern crate av_data as data;
extern crate av_format as format;

// Matroska demuxer
extern crate matroska;

// CLI crate
extern crate clap;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use data::params::MediaKind;
use format::buffer::{AccReader, Buffered};
use format::demuxer::{Context, Demuxer, Event};

use matroska::demuxer::MkvDemuxer;

use clap::{App, Arg};

use mpeg2::decoder::{Config, Decoder, ParseState};
use mpeg2::error::Result;
use mpeg2::framestore::Frame;
use mpeg2::sink::{FrameFlags, Sink};

/// Writes every delivered frame's planes to a raw YUV 4:2:0 file, in
/// decode-display order.
struct RawSink {
    output: BufWriter<File>,
}

impl RawSink {
    fn new(output: BufWriter<File>) -> Self {
        RawSink { output }
    }
}

impl Sink for RawSink {
    fn setup(&mut self, width: u32, height: u32) -> Result<()> {
        println!("Sequence: {}x{}", width, height);
        Ok(())
    }

    fn allocate_frame(&mut self, width: u32, height: u32, id: u64) -> Result<Frame> {
        Ok(Frame::new(width, height, id))
    }

    fn set_frame(&mut self, _flags: FrameFlags) -> Result<()> {
        Ok(())
    }

    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        self.output.write_all(frame.y()).ok();
        self.output.write_all(frame.cb()).ok();
        self.output.write_all(frame.cr()).ok();
        Ok(())
    }

    fn flip_page(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.output.flush().ok();
        Ok(())
    }
}

// Feeds demuxed packets into the decoder, driving `parse()` until it needs
// more input, and finishes the in-flight picture whenever `parse()` reports
// a transition away from slice data (the caller-side bookkeeping
// `Decoder::finish_picture` documents).
fn drive(decoder: &mut Decoder<RawSink>) -> Result<()> {
    let mut in_picture = false;
    loop {
        match decoder.parse()? {
            None => return Ok(()),
            Some(ParseState::Slice) | Some(ParseState::Slice1st) => in_picture = true,
            Some(state) => {
                if in_picture {
                    decoder.finish_picture()?;
                    in_picture = false;
                }
                if state == ParseState::End {
                    return Ok(());
                }
            }
        }
    }
}

fn main() -> std::io::Result<()> {
    let matches = App::new("mpeg2-decode")
        .about("Decodes an MPEG-1/MPEG-2 elementary stream contained in a matroska file")
        .arg(
            Arg::new("input-path")
                .help("Matroska file to analyze")
                .short('i')
                .long("input")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::new("output-path")
                .help("Output file")
                .short('o')
                .long("output")
                .takes_value(true)
                .required(true),
        )
        .get_matches();

    let input_path = matches.value_of("input-path").map(Path::new).unwrap();
    let output_path = matches.value_of("output-path").map(Path::new).unwrap();

    let reader = File::open(input_path).unwrap();
    let ar = AccReader::with_capacity(4 * 1024, reader);
    let mut demuxer = Context::new(MkvDemuxer::new(), ar);

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

    let output_file = BufWriter::new(File::create(output_path).unwrap());
    let sink = RawSink::new(output_file);
    let mut decoder = Decoder::new(sink, Config::default());

    loop {
        match demuxer.read_event() {
            Ok(Event::NewPacket(pkt)) => {
                if pkt.stream_index as usize != video_track {
                    continue;
                }
                decoder.buffer(&pkt.data);
                if let Some(pts) = pkt.t.pts {
                    decoder.pts(pts as u32);
                }
                drive(&mut decoder).expect("Decode error");
            }
            Ok(Event::Eof) => break,
            Ok(event) => {
                println!("Unsupported event {:?}", event);
            }
            Err(err) => {
                println!("No more events {:?}", err);
                break;
            }
        }
    }

    decoder.close().expect("Error closing decoder");
    println!("Done.");
    Ok(())
}
