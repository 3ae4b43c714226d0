// src/archive/entry.rs

//! On-disk records of the archive container: the fixed header and the file
//! table entries.

use crate::utils::error::{HuffError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const ARCHIVE_MAGIC: [u8; 4] = *b"HUFF";
pub const ARCHIVE_VERSION: u8 = 0x01;
/// Width of the NUL-padded path field of a table entry.
pub const PATH_FIELD_LEN: usize = 4096;
/// Size of the archive header: magic, version and file count.
pub const HEADER_LEN: u64 = 4 + 1 + 4;
/// Size of one file table slot.
pub const ENTRY_LEN: u64 = PATH_FIELD_LEN as u64 + 8 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub version: u8,
    pub file_count: u32,
}

impl ArchiveHeader {
    #[inline]
    pub fn new(file_count: u32) -> Self {
        ArchiveHeader {
            version: ARCHIVE_VERSION,
            file_count,
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| HuffError::truncated(e, "archive header"))?;
        if magic != ARCHIVE_MAGIC {
            return Err(HuffError::Format("not a HUFF archive".to_string()));
        }

        let version = reader
            .read_u8()
            .map_err(|e| HuffError::truncated(e, "archive header"))?;
        if version != ARCHIVE_VERSION {
            return Err(HuffError::Format(format!(
                "unsupported archive version {}",
                version
            )));
        }

        let file_count = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| HuffError::truncated(e, "archive header"))?;

        Ok(ArchiveHeader {
            version,
            file_count,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&ARCHIVE_MAGIC)?;
        writer.write_u8(self.version)?;
        writer.write_u32::<LittleEndian>(self.file_count)?;
        Ok(())
    }
}

/// Metadata of one archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path as given when the archive was created.
    pub path: String,
    pub original_size: u64,
    /// Size of the member's frame, header included.
    pub compressed_size: u64,
    /// Position of the frame, relative to the start of the archive.
    pub data_offset: u64,
}

impl FileEntry {
    /// Checks that `path` fits the fixed-width path field.
    pub fn validate_path(path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(HuffError::InvalidArg("empty member path".to_string()));
        }
        if path.len() >= PATH_FIELD_LEN {
            return Err(HuffError::InvalidArg(format!(
                "path is {} bytes, the limit is {}",
                path.len(),
                PATH_FIELD_LEN - 1
            )));
        }
        if path.contains('\0') {
            return Err(HuffError::InvalidArg(format!(
                "path {:?} contains a NUL byte",
                path
            )));
        }
        Ok(())
    }

    /// Compressed size as a percentage of the original size; 0 for empty files.
    pub fn ratio(&self) -> f64 {
        ratio(self.original_size, self.compressed_size)
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut field = vec![0u8; PATH_FIELD_LEN];
        reader
            .read_exact(&mut field)
            .map_err(|e| HuffError::truncated(e, "file table"))?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(PATH_FIELD_LEN);
        field.truncate(end);
        let path = String::from_utf8(field)
            .map_err(|_| HuffError::Format("member path is not valid UTF-8".to_string()))?;

        let mut sizes = [0u64; 3];
        for v in sizes.iter_mut() {
            *v = reader
                .read_u64::<LittleEndian>()
                .map_err(|e| HuffError::truncated(e, "file table"))?;
        }

        Ok(FileEntry {
            path,
            original_size: sizes[0],
            compressed_size: sizes[1],
            data_offset: sizes[2],
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        Self::validate_path(&self.path)?;
        let mut field = [0u8; PATH_FIELD_LEN];
        field[..self.path.len()].copy_from_slice(self.path.as_bytes());
        writer.write_all(&field)?;
        writer.write_u64::<LittleEndian>(self.original_size)?;
        writer.write_u64::<LittleEndian>(self.compressed_size)?;
        writer.write_u64::<LittleEndian>(self.data_offset)?;
        Ok(())
    }
}

pub(crate) fn ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        100.0 * compressed as f64 / original as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_layout() {
        let mut buf = Vec::new();
        ArchiveHeader::new(3).write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, HEADER_LEN);
        assert_eq!(buf, vec![b'H', b'U', b'F', b'F', 1, 3, 0, 0, 0]);
        assert_eq!(
            ArchiveHeader::read(&mut Cursor::new(&buf)).unwrap(),
            ArchiveHeader::new(3)
        );
    }

    #[test]
    fn header_rejects_bad_magic_and_version() {
        let bad_magic = [b'H', b'U', b'F', b'1', 1, 0, 0, 0, 0];
        assert!(matches!(
            ArchiveHeader::read(&mut Cursor::new(&bad_magic)),
            Err(HuffError::Format(_))
        ));
        let bad_version = [b'H', b'U', b'F', b'F', 2, 0, 0, 0, 0];
        assert!(matches!(
            ArchiveHeader::read(&mut Cursor::new(&bad_version)),
            Err(HuffError::Format(_))
        ));
        assert!(matches!(
            ArchiveHeader::read(&mut Cursor::new(&bad_version[..6])),
            Err(HuffError::Format(_))
        ));
    }

    #[test]
    fn entry_is_fixed_width() {
        let entry = FileEntry {
            path: "docs/readme.txt".to_string(),
            original_size: 1234,
            compressed_size: 700,
            data_offset: 9 + ENTRY_LEN,
        };
        let mut buf = Vec::new();
        entry.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, ENTRY_LEN);
        assert!(buf[15..PATH_FIELD_LEN].iter().all(|&b| b == 0));
        assert_eq!(FileEntry::read(&mut Cursor::new(&buf)).unwrap(), entry);
    }

    #[test]
    fn entry_path_limits() {
        assert!(FileEntry::validate_path(&"a".repeat(PATH_FIELD_LEN - 1)).is_ok());
        assert!(FileEntry::validate_path(&"a".repeat(PATH_FIELD_LEN)).is_err());
        assert!(FileEntry::validate_path("").is_err());
        assert!(FileEntry::validate_path("a\0b").is_err());
    }

    #[test]
    fn ratio_of_empty_file_is_zero() {
        assert_eq!(ratio(0, 269), 0.0);
        assert_eq!(ratio(200, 50), 25.0);
    }
}
