//! # Huffman Archive Library
//!
//! Canonical Huffman compression of byte streams, packaged either as a
//! single-file frame or as a multi-file archive of such frames.
//!
//! This library is organized into several modules:
//! - `utils`: Error handling shared by every other module
//! - `bitstream`: MSB-first bit writer and reader
//! - `huffman`: Huffman tree construction and canonical code assignment
//! - `codec`: The single-file `HUF1` frame format
//! - `archive`: The multi-file `HUFF` container (create, list, extract)
//!
//! ```no_run
//! use huff_archive::{CodecConfig, archive};
//!
//! let report = archive::create_archive("docs.huf", &["a.txt", "b.txt"], CodecConfig::default())?;
//! println!("{} files archived", report.entries.len());
//! print!("{}", archive::list_archive("docs.huf")?);
//! # Ok::<(), huff_archive::HuffError>(())
//! ```

// Re-export commonly used types at the crate root
pub use utils::error::{HuffError, Result};

pub mod utils {
    pub mod error;
}

pub mod bitstream {
    pub mod bit_reader;
    pub mod bit_writer;

    pub use self::bit_reader::BitReader;
    pub use self::bit_writer::BitWriter;
}

pub mod huffman {
    pub mod canonical;
    pub mod tree;

    pub use self::canonical::{
        CanonicalEntry, CanonicalRow, Code, CodeTable, DecodeTable, MAX_CODE_LENGTH,
        canonical_codes,
    };
    pub use self::tree::{FrequencyTable, HuffmanTree};
}

pub mod codec {
    pub mod frame;

    pub use self::frame::{CodecConfig, EncodeSummary, FrameCodec, FrameHeader};
}

pub mod archive {
    pub mod container;
    pub mod entry;

    pub use self::container::{
        ArchiveReader, ArchiveWriter, CreateReport, ExtractReport, Listing, MemberFailure,
        Outcome, create_archive, extract_all, extract_one, list_archive,
    };
    pub use self::entry::{ArchiveHeader, FileEntry};
}

// Public API exports
pub use archive::{ArchiveReader, ArchiveWriter, Outcome};
pub use codec::{CodecConfig, FrameCodec};

/// Compresses `data` into a single in-memory frame with the default settings.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    FrameCodec::default().encode_to_vec(data)
}

/// Decodes a single in-memory frame.
pub fn decompress(frame: &[u8]) -> Result<Vec<u8>> {
    FrameCodec::default().decode_to_vec(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress() {
        let data = b"mississippi river";
        let frame = compress(data).unwrap();
        assert_eq!(&frame[..4], b"HUF1");
        assert_eq!(decompress(&frame).unwrap(), data);
    }
}
