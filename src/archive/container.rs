// src/archive/container.rs

//! Multi-file archive container.
//!
//! An archive is a header, a file table with one fixed-size slot per input,
//! and the members' frames appended one after the other. The table is only
//! known once every member has been compressed, so `ArchiveWriter` writes a
//! zeroed placeholder first and patches it, together with the final file
//! count, at the end.
//!
//! Failures of a single member (unreadable input, encode error, corrupt
//! frame) are logged and collected in the returned report; the remaining
//! members are still processed.

use crate::archive::entry::{ArchiveHeader, ENTRY_LEN, FileEntry, HEADER_LEN, ratio};
use crate::codec::frame::{CodecConfig, FrameCodec};
use crate::utils::error::{HuffError, Result};
use log::{debug, info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

/// Whether every member of an archive operation went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Partial,
}

/// A member that could not be archived or extracted.
#[derive(Debug)]
pub struct MemberFailure {
    pub path: String,
    pub error: HuffError,
}

#[derive(Debug, Default)]
pub struct CreateReport {
    pub entries: Vec<FileEntry>,
    pub failures: Vec<MemberFailure>,
}

impl CreateReport {
    pub fn outcome(&self) -> Outcome {
        if self.failures.is_empty() {
            Outcome::Complete
        } else {
            Outcome::Partial
        }
    }
}

#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Paths written, with their decoded sizes.
    pub extracted: Vec<(PathBuf, u64)>,
    pub failures: Vec<MemberFailure>,
}

impl ExtractReport {
    pub fn outcome(&self) -> Outcome {
        if self.failures.is_empty() {
            Outcome::Complete
        } else {
            Outcome::Partial
        }
    }
}

/// Writes a new archive to any seekable destination.
pub struct ArchiveWriter<W: Write + Seek> {
    writer: W,
    codec: FrameCodec,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    #[inline]
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, CodecConfig::default())
    }

    #[inline]
    pub fn with_config(writer: W, config: CodecConfig) -> Self {
        ArchiveWriter {
            writer,
            codec: FrameCodec::new(config),
        }
    }

    /// Writes a complete archive holding `inputs`, starting at the writer's
    /// current position. Offsets in the table are relative to that position.
    ///
    /// Inputs that cannot be read or compressed are skipped and reported;
    /// errors writing the archive itself abort the whole operation.
    pub fn write_archive<P: AsRef<Path>>(&mut self, inputs: &[P]) -> Result<CreateReport> {
        let slots = u32::try_from(inputs.len()).map_err(|_| {
            HuffError::InvalidArg(format!("too many input files: {}", inputs.len()))
        })?;

        let base = self.writer.stream_position()?;
        ArchiveHeader::new(slots).write(&mut self.writer)?;

        // Placeholder table, patched once all offsets are known.
        let table_pos = self.writer.stream_position()?;
        let placeholder = vec![0u8; ENTRY_LEN as usize];
        for _ in 0..slots {
            self.writer.write_all(&placeholder)?;
        }

        let mut report = CreateReport::default();
        for (i, input) in inputs.iter().enumerate() {
            let input = input.as_ref();
            info!("Compressing [{}/{}]: {}", i + 1, inputs.len(), input.display());

            let frame = match self.compress_member(input) {
                Ok(frame) => frame,
                Err(error) => {
                    warn!("  skipping {}: {}", input.display(), error);
                    report.failures.push(MemberFailure {
                        path: input.display().to_string(),
                        error,
                    });
                    continue;
                }
            };

            let pos = self.writer.stream_position()?;
            self.writer.write_all(&frame.bytes)?;

            let entry = FileEntry {
                path: frame.path,
                original_size: frame.original_size,
                compressed_size: frame.bytes.len() as u64,
                data_offset: pos - base,
            };
            info!(
                "  {} bytes -> {} bytes ({:.2}%)",
                entry.original_size,
                entry.compressed_size,
                entry.ratio()
            );
            report.entries.push(entry);
        }

        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(base))?;
        ArchiveHeader::new(report.entries.len() as u32).write(&mut self.writer)?;
        self.writer.seek(SeekFrom::Start(table_pos))?;
        for entry in &report.entries {
            entry.write(&mut self.writer)?;
        }
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        info!(
            "archive written: {} of {} files, {} bytes",
            report.entries.len(),
            inputs.len(),
            end - base
        );
        Ok(report)
    }

    fn compress_member(&self, input: &Path) -> Result<PendingMember> {
        let path = input
            .to_str()
            .ok_or_else(|| HuffError::InvalidArg(format!("path {:?} is not UTF-8", input)))?
            .to_string();
        FileEntry::validate_path(&path)?;

        let data = fs::read(input)?;
        let bytes = self.codec.encode_to_vec(&data)?;
        Ok(PendingMember {
            path,
            original_size: data.len() as u64,
            bytes,
        })
    }

    #[inline]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

struct PendingMember {
    path: String,
    original_size: u64,
    bytes: Vec<u8>,
}

/// Summary of an archive's table, as printed by `list`.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub version: u8,
    pub entries: Vec<FileEntry>,
}

impl Listing {
    pub fn total_original(&self) -> u64 {
        self.entries.iter().map(|e| e.original_size).sum()
    }

    pub fn total_compressed(&self) -> u64 {
        self.entries.iter().map(|e| e.compressed_size).sum()
    }

    pub fn total_ratio(&self) -> f64 {
        ratio(self.total_original(), self.total_compressed())
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(94);
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Files: {}", self.entries.len())?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<50} {:>15} {:>15} {:>10}",
            "File", "Original", "Compressed", "Ratio"
        )?;
        writeln!(f, "{}", rule)?;
        for e in &self.entries {
            writeln!(
                f,
                "{:<50} {:>13} B {:>13} B {:>9.2}%",
                e.path,
                e.original_size,
                e.compressed_size,
                e.ratio()
            )?;
        }
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "{:<50} {:>13} B {:>13} B {:>9.2}%",
            "TOTAL",
            self.total_original(),
            self.total_compressed(),
            self.total_ratio()
        )
    }
}

/// Reads an existing archive from any seekable source.
pub struct ArchiveReader<R: Read + Seek> {
    reader: R,
    base: u64,
    len: u64,
    header: ArchiveHeader,
    entries: Vec<FileEntry>,
    codec: FrameCodec,
}

impl<R: Read + Seek> ArchiveReader<R> {
    #[inline]
    pub fn open(reader: R) -> Result<Self> {
        Self::with_config(reader, CodecConfig::default())
    }

    /// Parses the header and the file table, starting at the reader's current
    /// position.
    pub fn with_config(mut reader: R, config: CodecConfig) -> Result<Self> {
        let base = reader.stream_position()?;
        let len = reader.seek(SeekFrom::End(0))?.saturating_sub(base);
        reader.seek(SeekFrom::Start(base))?;

        let header = ArchiveHeader::read(&mut reader)?;
        let count = header.file_count as usize;
        if HEADER_LEN + header.file_count as u64 * ENTRY_LEN > len {
            return Err(HuffError::Format(format!(
                "truncated file table: {} entries declared",
                count
            )));
        }

        let mut entries = Vec::new();
        entries.try_reserve_exact(count).map_err(|e| {
            HuffError::Allocation(format!("cannot hold {} table entries: {}", count, e))
        })?;
        for _ in 0..count {
            entries.push(FileEntry::read(&mut reader)?);
        }
        debug!("opened archive: version {}, {} members", header.version, count);

        Ok(ArchiveReader {
            reader,
            base,
            len,
            header,
            entries,
            codec: FrameCodec::new(config),
        })
    }

    #[inline]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    #[inline]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn listing(&self) -> Listing {
        Listing {
            version: self.header.version,
            entries: self.entries.clone(),
        }
    }

    /// Looks up a member by exact path.
    pub fn find(&self, path: &str) -> Result<&FileEntry> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .ok_or_else(|| HuffError::NotFound(format!("'{}' is not in the archive", path)))
    }

    /// Reads the raw frame of `entry`.
    pub fn read_frame(&mut self, entry: &FileEntry) -> Result<Vec<u8>> {
        let in_bounds = entry
            .data_offset
            .checked_add(entry.compressed_size)
            .is_some_and(|end| end <= self.len);
        if !in_bounds {
            return Err(HuffError::Format(format!(
                "data of '{}' lies outside the archive",
                entry.path
            )));
        }

        let size = entry.compressed_size as usize;
        let mut frame = Vec::new();
        frame.try_reserve_exact(size).map_err(|e| {
            HuffError::Allocation(format!("cannot reserve {} bytes: {}", size, e))
        })?;

        self.reader
            .seek(SeekFrom::Start(self.base + entry.data_offset))?;
        (&mut self.reader)
            .take(entry.compressed_size)
            .read_to_end(&mut frame)?;
        if frame.len() != size {
            return Err(HuffError::Format(format!(
                "truncated data for '{}'",
                entry.path
            )));
        }
        Ok(frame)
    }

    /// Decodes `entry` into memory.
    pub fn read_member(&mut self, entry: &FileEntry) -> Result<Vec<u8>> {
        let frame = self.read_frame(entry)?;
        let data = self.codec.decode_to_vec(&frame)?;
        if data.len() as u64 != entry.original_size {
            return Err(HuffError::Format(format!(
                "'{}' decoded to {} bytes, table says {}",
                entry.path,
                data.len(),
                entry.original_size
            )));
        }
        Ok(data)
    }

    /// Decodes `entry` into the file at `dest`. The file is removed again when
    /// decoding fails or yields a size other than the table's.
    pub fn extract_entry(&mut self, entry: &FileEntry, dest: &Path) -> Result<u64> {
        let frame = self.read_frame(entry)?;
        let out = File::create(dest)?;
        let result = self.codec.decode(frame.as_slice(), out).and_then(|n| {
            if n == entry.original_size {
                Ok(n)
            } else {
                Err(HuffError::Format(format!(
                    "'{}' decoded to {} bytes, table says {}",
                    entry.path, n, entry.original_size
                )))
            }
        });
        if result.is_err() {
            let _ = fs::remove_file(dest);
        }
        result
    }

    /// Extracts every member below `output_dir`, recreating the stored
    /// relative paths.
    pub fn extract_all<P: AsRef<Path>>(&mut self, output_dir: P) -> Result<ExtractReport> {
        let output_dir = output_dir.as_ref();
        let entries = self.entries.clone();
        let mut report = ExtractReport::default();

        for (i, entry) in entries.iter().enumerate() {
            info!("Extracting [{}/{}]: {}", i + 1, entries.len(), entry.path);
            match self.extract_below(entry, output_dir) {
                Ok((dest, n)) => {
                    info!("  extracted {} ({} bytes)", dest.display(), n);
                    report.extracted.push((dest, n));
                }
                Err(error) => {
                    warn!("  failed to extract {}: {}", entry.path, error);
                    report.failures.push(MemberFailure {
                        path: entry.path.clone(),
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    fn extract_below(&mut self, entry: &FileEntry, output_dir: &Path) -> Result<(PathBuf, u64)> {
        let dest = member_output_path(output_dir, &entry.path)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let n = self.extract_entry(entry, &dest)?;
        Ok((dest, n))
    }

    /// Extracts the member stored under exactly `member` into `output_dir`,
    /// named after the member's last path component.
    pub fn extract_one<P: AsRef<Path>>(&mut self, member: &str, output_dir: P) -> Result<PathBuf> {
        let entry = self.find(member)?.clone();
        let name = Path::new(&entry.path)
            .file_name()
            .ok_or_else(|| HuffError::Format(format!("member '{}' has no file name", entry.path)))?;

        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;
        let dest = output_dir.join(name);
        info!("Extracting: {} -> {}", entry.path, dest.display());
        self.extract_entry(&entry, &dest)?;
        Ok(dest)
    }

    #[inline]
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Joins a stored member path onto `output_dir`. Root and drive prefixes are
/// dropped; `..` components are refused.
pub fn member_output_path(output_dir: &Path, member: &str) -> Result<PathBuf> {
    let mut dest = output_dir.to_path_buf();
    let mut pushed = false;
    for component in Path::new(member).components() {
        match component {
            Component::Normal(part) => {
                dest.push(part);
                pushed = true;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(HuffError::Format(format!(
                    "member path '{}' escapes the output directory",
                    member
                )));
            }
        }
    }
    if !pushed {
        return Err(HuffError::Format(format!(
            "member path '{}' names no file",
            member
        )));
    }
    Ok(dest)
}

/// Creates the archive at `archive_path` from `inputs`.
pub fn create_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    inputs: &[Q],
    config: CodecConfig,
) -> Result<CreateReport> {
    info!(
        "Creating archive: {} ({} files)",
        archive_path.as_ref().display(),
        inputs.len()
    );
    let file = BufWriter::new(File::create(archive_path.as_ref())?);
    let mut writer = ArchiveWriter::with_config(file, config);
    writer.write_archive(inputs)
}

/// Reads the table of the archive at `archive_path`.
pub fn list_archive<P: AsRef<Path>>(archive_path: P) -> Result<Listing> {
    let file = BufReader::new(File::open(archive_path.as_ref())?);
    Ok(ArchiveReader::open(file)?.listing())
}

/// Extracts every member of the archive at `archive_path` below `output_dir`.
pub fn extract_all<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    config: CodecConfig,
) -> Result<ExtractReport> {
    info!("Extracting archive: {}", archive_path.as_ref().display());
    let file = BufReader::new(File::open(archive_path.as_ref())?);
    ArchiveReader::with_config(file, config)?.extract_all(output_dir)
}

/// Extracts a single member of the archive at `archive_path` into `output_dir`.
pub fn extract_one<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    member: &str,
    output_dir: Q,
    config: CodecConfig,
) -> Result<PathBuf> {
    let file = BufReader::new(File::open(archive_path.as_ref())?);
    ArchiveReader::with_config(file, config)?.extract_one(member, output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_inputs(dir: &Path, files: &[(&str, &[u8])]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|(name, data)| {
                let p = dir.join(name);
                fs::write(&p, data).unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn in_memory_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(
            dir.path(),
            &[
                ("a.txt", b"alpha alpha alpha".as_slice()),
                ("b.bin", [0u8, 1, 2, 3, 255].as_slice()),
            ],
        );

        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()));
        let report = writer.write_archive(&inputs).unwrap();
        assert_eq!(report.outcome(), Outcome::Complete);
        let bytes = writer.into_inner().into_inner();

        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header().file_count, 2);
        let entries = reader.entries().to_vec();
        assert_eq!(entries[0].data_offset, HEADER_LEN + 2 * ENTRY_LEN);
        assert_eq!(
            entries[1].data_offset,
            entries[0].data_offset + entries[0].compressed_size
        );
        assert_eq!(reader.read_member(&entries[0]).unwrap(), b"alpha alpha alpha");
        assert_eq!(reader.read_member(&entries[1]).unwrap(), vec![0u8, 1, 2, 3, 255]);
    }

    #[test]
    fn archive_at_non_zero_offset() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(dir.path(), &[("x", b"xyzzy".as_slice())]);

        let mut cursor = Cursor::new(vec![0xAAu8; 7]);
        cursor.seek(SeekFrom::End(0)).unwrap();
        ArchiveWriter::new(&mut cursor).write_archive(&inputs).unwrap();

        cursor.seek(SeekFrom::Start(7)).unwrap();
        let mut reader = ArchiveReader::open(cursor).unwrap();
        let entry = reader.entries()[0].clone();
        assert_eq!(reader.read_member(&entry).unwrap(), b"xyzzy");
    }

    #[test]
    fn missing_input_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = write_inputs(
            dir.path(),
            &[("one", b"1111".as_slice()), ("three", b"3333".as_slice())],
        );
        inputs.insert(1, dir.path().join("two-does-not-exist"));

        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()));
        let report = writer.write_archive(&inputs).unwrap();
        assert_eq!(report.outcome(), Outcome::Partial);
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, HuffError::Io(_)));

        let reader = ArchiveReader::open(Cursor::new(writer.into_inner().into_inner())).unwrap();
        assert_eq!(reader.header().file_count, 2);
        assert!(reader.entries()[1].path.ends_with("three"));
    }

    #[test]
    fn find_reports_not_found() {
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()));
        writer.write_archive::<&Path>(&[]).unwrap();
        let reader = ArchiveReader::open(Cursor::new(writer.into_inner().into_inner())).unwrap();
        assert!(reader.entries().is_empty());
        assert!(matches!(reader.find("nope"), Err(HuffError::NotFound(_))));
    }

    #[test]
    fn rejects_truncated_table() {
        let mut buf = Vec::new();
        ArchiveHeader::new(2).write(&mut buf).unwrap();
        buf.extend(vec![0u8; ENTRY_LEN as usize]);
        assert!(matches!(
            ArchiveReader::open(Cursor::new(buf)),
            Err(HuffError::Format(_))
        ));
    }

    #[test]
    fn rejects_out_of_bounds_member() {
        let mut buf = Vec::new();
        ArchiveHeader::new(1).write(&mut buf).unwrap();
        FileEntry {
            path: "ghost".to_string(),
            original_size: 10,
            compressed_size: 1000,
            data_offset: HEADER_LEN + ENTRY_LEN,
        }
        .write(&mut buf)
        .unwrap();

        let mut reader = ArchiveReader::open(Cursor::new(buf)).unwrap();
        let entry = reader.entries()[0].clone();
        assert!(matches!(reader.read_frame(&entry), Err(HuffError::Format(_))));
    }

    #[test]
    fn output_paths_stay_inside() {
        let out = Path::new("out");
        assert_eq!(
            member_output_path(out, "dir/file.txt").unwrap(),
            PathBuf::from("out/dir/file.txt")
        );
        assert_eq!(
            member_output_path(out, "/abs/file.txt").unwrap(),
            PathBuf::from("out/abs/file.txt")
        );
        assert_eq!(
            member_output_path(out, "./file.txt").unwrap(),
            PathBuf::from("out/file.txt")
        );
        assert!(member_output_path(out, "../evil").is_err());
        assert!(member_output_path(out, "a/../../evil").is_err());
        assert!(member_output_path(out, "/").is_err());
    }

    #[test]
    fn listing_totals() {
        let listing = Listing {
            version: 1,
            entries: vec![
                FileEntry {
                    path: "a".into(),
                    original_size: 100,
                    compressed_size: 300,
                    data_offset: 0,
                },
                FileEntry {
                    path: "b".into(),
                    original_size: 300,
                    compressed_size: 100,
                    data_offset: 300,
                },
            ],
        };
        assert_eq!(listing.total_original(), 400);
        assert_eq!(listing.total_compressed(), 400);
        assert_eq!(listing.total_ratio(), 100.0);
        let text = listing.to_string();
        assert!(text.contains("Files: 2"));
        assert!(text.lines().last().unwrap().starts_with("TOTAL"));
        assert!(text.contains("300.00%"));
    }
}
