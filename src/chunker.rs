//! Start-code chunker.
//!
//! See: * 4.1. Start-code chunker
//!      * `original_source/mpeg2dec/libmpeg2/decode.c`'s `copy_chunk`, reshaped per
//!        the redesign note on goto-driven state into an explicit state machine so
//!        resumption across `feed` calls is ordinary data.

use crate::constants::{CHUNK_BUFFER_SIZE, SEQUENCE_ERROR_CODE};

/// One complete chunk: the start code byte and the bytes that followed it,
/// up to (not including) the next start code.
pub struct Chunk {
    pub code: u8,
    pub data: Vec<u8>,
}

/// Chunker scans a byte stream for `00 00 01 XX` start codes and yields the
/// bytes between consecutive start codes as whole chunks.
pub struct Chunker {
    buf: Vec<u8>,
    shift: u32,
    pending_code: u8,
    input: Vec<u8>,
    input_pos: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker {
    /// Creates a new chunker with an internal buffer large enough to hold
    /// the largest legal chunk.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(CHUNK_BUFFER_SIZE),
            shift: 0xffff_ff00,
            pending_code: 0xb4,
            input: Vec::new(),
            input_pos: 0,
        }
    }

    /// Appends more input bytes to be scanned.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.input_pos == self.input.len() {
            self.input.clear();
            self.input_pos = 0;
        }
        self.input.extend_from_slice(bytes);
    }

    /// Returns the next complete chunk, or `None` if more input is needed.
    ///
    /// A chunk is only returned once a subsequent start code has been seen
    /// (or the internal buffer overflows, in which case a synthetic
    /// `0xB4` "sequence error" chunk is returned instead and scanning
    /// continues from the overflow point).
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        while self.input_pos < self.input.len() {
            let byte = self.input[self.input_pos];
            self.input_pos += 1;

            if self.shift == 0x0000_0100 {
                // We just found a start code; `byte` is the code.
                let code = std::mem::replace(&mut self.pending_code, byte);
                self.shift = 0xffff_ff00;
                let data = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_BUFFER_SIZE));
                return Some(Chunk { code, data });
            }

            self.shift = (self.shift | byte as u32) << 8;
            self.buf.push(byte);

            if self.buf.len() >= CHUNK_BUFFER_SIZE {
                let code = std::mem::replace(&mut self.pending_code, SEQUENCE_ERROR_CODE);
                let data = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_BUFFER_SIZE));
                self.shift = 0xffff_ff00;
                return Some(Chunk { code, data });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_start_codes() {
        let mut c = Chunker::new();
        c.feed(&[0, 0, 1, 0xb3, 1, 2, 3, 0, 0, 1, 0x00, 4, 5]);
        // The leading `00 00 01` closes the implicit placeholder chunk that
        // precedes the first real start code (no bytes preceded it here).
        let placeholder = c.next_chunk().unwrap();
        assert_eq!(placeholder.code, 0xb4);
        assert!(placeholder.data.is_empty());
        let chunk1 = c.next_chunk().unwrap();
        assert_eq!(chunk1.code, 0xb3);
        assert_eq!(chunk1.data, vec![1, 2, 3]);
        assert!(c.next_chunk().is_none());
        c.feed(&[0, 0, 1, 0xb7]);
        let chunk2 = c.next_chunk().unwrap();
        assert_eq!(chunk2.code, 0x00);
        assert_eq!(chunk2.data, vec![4, 5]);
    }

    #[test]
    fn overflow_emits_synthetic_error_chunk() {
        let mut c = Chunker::new();
        c.feed(&[0, 0, 1, 0xb3]);
        assert!(c.next_chunk().unwrap().code == 0xb4);
        let filler = vec![0xffu8; CHUNK_BUFFER_SIZE + 16];
        c.feed(&filler);
        let chunk = c.next_chunk().unwrap();
        assert_eq!(chunk.code, 0xb3);
        assert_eq!(chunk.data.len(), CHUNK_BUFFER_SIZE);
    }
}
