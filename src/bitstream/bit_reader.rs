// src/bitstream/bit_reader.rs

//! MSB-first bit reader.
//!
//! Bytes come either from a memory-mapped view of a file or from a buffered
//! sequential reader. Both sources yield exactly the same bit sequence; the
//! mapped path only avoids per-byte read calls.

use crate::utils::error::Result;
use log::debug;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};

enum Source<R: Read> {
    Mapped { map: Mmap, pos: usize },
    Sequential(BufReader<R>),
    Released,
}

pub struct BitReader<R: Read> {
    source: Source<R>,
    byte: u8,
    remaining: u8, // unread bits left in `byte`
}

impl<R: Read> BitReader<R> {
    /// Creates a reader that pulls bytes sequentially from `reader`.
    #[inline]
    pub fn new(reader: R) -> Self {
        BitReader {
            source: Source::Sequential(BufReader::new(reader)),
            byte: 0,
            remaining: 0,
        }
    }

    /// Reads the next bit.
    ///
    /// Returns `Ok(Some(0 | 1))` for a bit, `Ok(None)` once the source is
    /// exhausted (or released), and `Err` on an I/O failure.
    pub fn read_bit(&mut self) -> Result<Option<u8>> {
        if self.remaining == 0 {
            match self.next_byte()? {
                Some(b) => {
                    self.byte = b;
                    self.remaining = 8;
                }
                None => return Ok(None),
            }
        }
        self.remaining -= 1;
        Ok(Some((self.byte >> self.remaining) & 1))
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        match &mut self.source {
            Source::Mapped { map, pos } => {
                let b = map.get(*pos).copied();
                if b.is_some() {
                    *pos += 1;
                }
                Ok(b)
            }
            Source::Sequential(reader) => {
                let mut buf = [0u8; 1];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => return Ok(None),
                        Ok(_) => return Ok(Some(buf[0])),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Source::Released => Ok(None),
        }
    }

    /// Returns `true` while bytes are served from a memory map.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.source, Source::Mapped { .. })
    }

    /// Unmaps any mapped region and drops the underlying reader. Subsequent
    /// reads report end of stream.
    pub fn release(&mut self) {
        self.source = Source::Released;
        self.remaining = 0;
    }
}

impl BitReader<File> {
    /// Creates a reader over `file`, starting at its current position.
    ///
    /// The file is memory-mapped when possible; if mapping fails the reader
    /// falls back to buffered sequential reads from the same position.
    pub fn from_file(mut file: File) -> Result<Self> {
        let start = file.stream_position()?;

        // SAFETY: the map is read-only and lives no longer than this reader.
        // Concurrent truncation of the file by another process is unsupported.
        let mapped = unsafe { MmapOptions::new().map(&file) };
        let source = match mapped {
            Ok(map) if start <= map.len() as u64 => Source::Mapped {
                map,
                pos: start as usize,
            },
            Ok(_) => Source::Sequential(BufReader::new(file)),
            Err(e) => {
                debug!("memory map unavailable ({}), using sequential reads", e);
                Source::Sequential(BufReader::new(file))
            }
        };

        Ok(BitReader {
            source,
            byte: 0,
            remaining: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Seek, SeekFrom, Write};

    fn collect_bits<R: Read>(reader: &mut BitReader<R>) -> Vec<u8> {
        let mut bits = Vec::new();
        while let Some(bit) = reader.read_bit().unwrap() {
            bits.push(bit);
        }
        bits
    }

    #[test]
    fn reads_msb_first() {
        let mut br = BitReader::new(Cursor::new(vec![0b1010_0001u8]));
        assert_eq!(collect_bits(&mut br), vec![1, 0, 1, 0, 0, 0, 0, 1]);
        assert_eq!(br.read_bit().unwrap(), None);
    }

    #[test]
    fn empty_source_is_end_of_stream() {
        let mut br = BitReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(br.read_bit().unwrap(), None);
    }

    #[test]
    fn mapped_and_sequential_agree() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[0xFF, 0x5A, 0x0F, 0x81]).unwrap();
        file.seek(SeekFrom::Start(1)).unwrap();
        let mut mapped = BitReader::from_file(file.try_clone().unwrap()).unwrap();

        file.seek(SeekFrom::Start(1)).unwrap();
        let mut sequential = BitReader::new(file);

        let a = collect_bits(&mut mapped);
        let b = collect_bits(&mut sequential);
        assert_eq!(a.len(), 24);
        assert_eq!(a, b);
    }

    #[test]
    fn release_ends_stream() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&[0xFF, 0xFF]).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut br = BitReader::from_file(file).unwrap();
        assert_eq!(br.read_bit().unwrap(), Some(1));
        br.release();
        assert!(!br.is_mapped());
        assert_eq!(br.read_bit().unwrap(), None);
    }
}
