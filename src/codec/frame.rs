// src/codec/frame.rs

//! Single-file compressed frames.
//!
//! A frame is laid out as follows (integers little-endian):
//!
//! | offset | field                               | size     |
//! |--------|-------------------------------------|----------|
//! | 0      | magic `"HUF1"`                      | 4        |
//! | 4      | original size                       | 8        |
//! | 12     | code length of each byte value      | 256      |
//! | 268    | padding bits in the last byte (0-7) | 1        |
//! | 269    | packed codes, MSB-first             | variable |
//!
//! The payload carries no end marker: the decoder stops once it has produced
//! `original size` symbols and never looks at the padding bits.

use crate::bitstream::bit_reader::BitReader;
use crate::bitstream::bit_writer::{BitWriter, DEFAULT_CHUNK_SIZE};
use crate::huffman::canonical::{DecodeTable, canonical_codes};
use crate::huffman::tree::{FrequencyTable, HuffmanTree, SYMBOLS};
use crate::utils::error::{HuffError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const FRAME_MAGIC: [u8; 4] = *b"HUF1";
/// Size of the fixed frame header in bytes.
pub const FRAME_HEADER_LEN: u64 = 269;
const PADDING_OFFSET: u64 = 268;

/// Tunables shared by the frame codec and the archive container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Bytes the bit writer buffers before handing them to its sink.
    pub write_chunk_size: usize,
    /// Read compressed files through a memory map when possible.
    pub memory_map: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            write_chunk_size: DEFAULT_CHUNK_SIZE,
            memory_map: true,
        }
    }
}

/// The fixed-size header at the start of every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub original_size: u64,
    pub lengths: [u8; SYMBOLS],
    pub padding_bits: u8,
}

impl FrameHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| HuffError::truncated(e, "frame header"))?;
        if magic != FRAME_MAGIC {
            return Err(HuffError::Format(format!(
                "bad frame magic {:?}",
                String::from_utf8_lossy(&magic)
            )));
        }

        let original_size = reader
            .read_u64::<LittleEndian>()
            .map_err(|e| HuffError::truncated(e, "frame header"))?;
        let mut lengths = [0u8; SYMBOLS];
        reader
            .read_exact(&mut lengths)
            .map_err(|e| HuffError::truncated(e, "code length table"))?;
        let padding_bits = reader
            .read_u8()
            .map_err(|e| HuffError::truncated(e, "frame header"))?;
        if padding_bits > 7 {
            return Err(HuffError::Format(format!(
                "padding bit count {} out of range",
                padding_bits
            )));
        }

        Ok(FrameHeader {
            original_size,
            lengths,
            padding_bits,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&FRAME_MAGIC)?;
        writer.write_u64::<LittleEndian>(self.original_size)?;
        writer.write_all(&self.lengths)?;
        writer.write_u8(self.padding_bits)?;
        Ok(())
    }
}

/// What an encode produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    pub original_size: u64,
    /// Whole frame size, header included.
    pub compressed_size: u64,
    pub padding_bits: u8,
}

/// Encoder and decoder for single-file frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    config: CodecConfig,
}

impl FrameCodec {
    #[inline]
    pub fn new(config: CodecConfig) -> Self {
        FrameCodec { config }
    }

    #[inline]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Writes one frame for `data` at the writer's current position.
    ///
    /// The padding count is only known once the bit writer is flushed, so a
    /// placeholder is written first and patched afterwards. The writer is left
    /// positioned at the end of the frame.
    pub fn encode<W: Write + Seek>(&self, data: &[u8], writer: &mut W) -> Result<EncodeSummary> {
        let start = writer.stream_position()?;
        let original_size = data.len() as u64;

        if data.is_empty() {
            FrameHeader {
                original_size: 0,
                lengths: [0; SYMBOLS],
                padding_bits: 0,
            }
            .write(writer)?;
            return Ok(EncodeSummary {
                original_size: 0,
                compressed_size: FRAME_HEADER_LEN,
                padding_bits: 0,
            });
        }

        let freq = FrequencyTable::from_bytes(data);
        let tree = HuffmanTree::build(&freq)?;
        let lengths = tree.code_lengths()?;
        let codes = canonical_codes(&lengths)?;

        FrameHeader {
            original_size,
            lengths,
            padding_bits: 0,
        }
        .write(writer)?;

        let mut bits = BitWriter::with_chunk_size(&mut *writer, self.config.write_chunk_size);
        for &b in data {
            let code = codes[b as usize];
            bits.write(code.bits, code.length as u32)?;
        }
        let padding_bits = bits.flush()?;
        drop(bits);

        let end = writer.stream_position()?;
        writer.seek(SeekFrom::Start(start + PADDING_OFFSET))?;
        writer.write_u8(padding_bits)?;
        writer.seek(SeekFrom::Start(end))?;

        let summary = EncodeSummary {
            original_size,
            compressed_size: end - start,
            padding_bits,
        };
        debug!(
            "encoded frame: {} symbols used, {} -> {} bytes, {} padding bits",
            freq.active_symbols(),
            summary.original_size,
            summary.compressed_size,
            summary.padding_bits
        );
        Ok(summary)
    }

    /// Encodes `data` into a fresh in-memory frame.
    pub fn encode_to_vec(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.encode(data, &mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Decodes one frame from `reader`, writing the original bytes to
    /// `writer`. Returns the number of bytes produced.
    pub fn decode<R: Read, W: Write>(&self, mut reader: R, writer: W) -> Result<u64> {
        let header = FrameHeader::read(&mut reader)?;
        let mut bits = BitReader::new(reader);
        decode_payload(&header, &mut bits, writer)
    }

    /// Decodes an in-memory frame.
    pub fn decode_to_vec(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(frame);
        let header = FrameHeader::read(&mut cursor)?;

        let size = usize::try_from(header.original_size).map_err(|_| {
            HuffError::Allocation(format!(
                "original size {} does not fit in memory",
                header.original_size
            ))
        })?;
        // Every symbol costs at least the shortest code length in payload
        // bits, so the payload bounds the output regardless of the header.
        let payload_bits = (frame.len() as u64).saturating_sub(FRAME_HEADER_LEN) * 8;
        let shortest = header.lengths.iter().copied().filter(|&l| l > 0).min().unwrap_or(1);
        let bound = usize::try_from(payload_bits / shortest as u64).unwrap_or(usize::MAX);
        let reserve = size.min(bound);

        let mut out = Vec::new();
        out.try_reserve_exact(reserve).map_err(|e| {
            HuffError::Allocation(format!("cannot reserve {} bytes: {}", reserve, e))
        })?;

        let mut bits = BitReader::new(cursor);
        decode_payload(&header, &mut bits, &mut out)?;
        Ok(out)
    }

    /// Compresses the file at `input` into a frame file at `output`.
    pub fn compress_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<EncodeSummary> {
        let data = std::fs::read(input.as_ref())?;
        let mut out = BufWriter::new(File::create(output.as_ref())?);
        let summary = self.encode(&data, &mut out)?;
        out.flush()?;
        info!(
            "compressed {} -> {} ({} -> {} bytes)",
            input.as_ref().display(),
            output.as_ref().display(),
            summary.original_size,
            summary.compressed_size
        );
        Ok(summary)
    }

    /// Decompresses the frame file at `input` into `output`.
    ///
    /// The payload is read through a memory map when the configuration allows
    /// it and the platform supports it.
    pub fn decompress_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<u64> {
        let mut file = File::open(input.as_ref())?;
        let header = FrameHeader::read(&mut file)?;

        let mut bits = if self.config.memory_map {
            BitReader::from_file(file)?
        } else {
            BitReader::new(file)
        };
        debug!(
            "decompressing {} (memory mapped: {})",
            input.as_ref().display(),
            bits.is_mapped()
        );

        let out = File::create(output.as_ref())?;
        let result = decode_payload(&header, &mut bits, out);
        bits.release();
        let written = match result {
            Ok(n) => n,
            Err(e) => {
                let _ = std::fs::remove_file(output.as_ref());
                return Err(e);
            }
        };

        info!(
            "decompressed {} -> {} ({} bytes)",
            input.as_ref().display(),
            output.as_ref().display(),
            written
        );
        Ok(written)
    }
}

/// Rebuilds the canonical codes from `header` and decodes exactly
/// `header.original_size` symbols from `bits`.
fn decode_payload<R: Read, W: Write>(
    header: &FrameHeader,
    bits: &mut BitReader<R>,
    writer: W,
) -> Result<u64> {
    let table = DecodeTable::from_lengths(&header.lengths)?;
    if header.original_size == 0 {
        return Ok(0);
    }
    if table.is_empty() {
        return Err(HuffError::Format(format!(
            "frame declares {} bytes but has no codes",
            header.original_size
        )));
    }

    let mut out = BufWriter::new(writer);
    let mut emitted: u64 = 0;
    let mut value: u64 = 0;
    let mut len: u8 = 0;

    while emitted < header.original_size {
        let Some(bit) = bits.read_bit()? else {
            return Err(HuffError::Format(format!(
                "bit stream ended after {} of {} symbols",
                emitted, header.original_size
            )));
        };

        value = (value << 1) | bit as u64;
        len += 1;
        if len > table.max_len() {
            return Err(HuffError::Format(format!(
                "bit sequence of length {} matches no code (longest is {})",
                len,
                table.max_len()
            )));
        }

        if let Some(symbol) = table.lookup(len, value) {
            out.write_all(&[symbol])?;
            emitted += 1;
            value = 0;
            len = 0;
        }
    }

    out.flush()?;
    Ok(emitted)
}
