pub mod bitstream;
pub mod chunker;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod framestore;
pub mod header;
pub mod idct;
pub mod motion;
pub mod sink;
pub mod slice;
pub mod tables;
pub mod vlc;
