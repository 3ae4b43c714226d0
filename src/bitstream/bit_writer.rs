// src/bitstream/bit_writer.rs

//! MSB-first bit packer.
//!
//! Bits are shifted into a one-byte accumulator starting from the most
//! significant position. Every completed byte is appended to a chunk buffer,
//! and the chunk is handed to the underlying writer in a single `write_all`
//! once it fills up.

use crate::utils::error::{HuffError, Result};
use std::io::Write;

/// Default size of the chunk buffer, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Largest bit count accepted by a single [`BitWriter::write`] call.
pub const MAX_WRITE_BITS: u32 = 64;

pub struct BitWriter<W: Write> {
    writer: W,
    chunk: Vec<u8>,
    chunk_size: usize,
    acc: u8,     // partially filled byte
    nbits: u8,   // bits held in `acc` (0-7)
    bytes_out: u64,
}

impl<W: Write> BitWriter<W> {
    /// Creates a writer using the default chunk size.
    #[inline]
    pub fn new(writer: W) -> Self {
        Self::with_chunk_size(writer, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a writer that flushes to `writer` every `chunk_size` bytes.
    /// A zero chunk size is treated as one byte.
    pub fn with_chunk_size(writer: W, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        BitWriter {
            writer,
            chunk: Vec::with_capacity(chunk_size),
            chunk_size,
            acc: 0,
            nbits: 0,
            bytes_out: 0,
        }
    }

    /// Writes the low `count` bits of `bits`, most significant first.
    pub fn write(&mut self, bits: u64, count: u32) -> Result<()> {
        if count > MAX_WRITE_BITS {
            return Err(HuffError::InvalidArg(format!(
                "bit count {} exceeds {}",
                count, MAX_WRITE_BITS
            )));
        }

        for i in (0..count).rev() {
            let bit = ((bits >> i) & 1) as u8;
            self.acc = (self.acc << 1) | bit;
            self.nbits += 1;
            if self.nbits == 8 {
                let byte = self.acc;
                self.acc = 0;
                self.nbits = 0;
                self.push_byte(byte)?;
            }
        }
        Ok(())
    }

    fn push_byte(&mut self, byte: u8) -> Result<()> {
        self.chunk.push(byte);
        if self.chunk.len() >= self.chunk_size {
            self.flush_chunk()?;
        }
        Ok(())
    }

    fn flush_chunk(&mut self) -> Result<()> {
        if !self.chunk.is_empty() {
            self.writer.write_all(&self.chunk)?;
            self.bytes_out += self.chunk.len() as u64;
            self.chunk.clear();
        }
        Ok(())
    }

    /// Pads the final partial byte with zero bits, writes out everything that
    /// is buffered and returns the number of padding bits added (0-7).
    pub fn flush(&mut self) -> Result<u8> {
        let mut padding = 0;
        if self.nbits > 0 {
            padding = 8 - self.nbits;
            let byte = self.acc << padding;
            self.acc = 0;
            self.nbits = 0;
            self.chunk.push(byte);
        }
        self.flush_chunk()?;
        self.writer.flush()?;
        Ok(padding)
    }

    /// Number of whole bytes handed to the underlying writer so far.
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_out
    }

    /// Returns the underlying writer. Unflushed bits are discarded, so call
    /// [`flush`](Self::flush) first.
    #[inline]
    pub fn into_inner(self) -> W {
        self.writer
    }
}
