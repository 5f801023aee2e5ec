//! Tar archive extraction.
//!
//! The extractor is format-agnostic: it returns every regular file in the
//! archive, in archive order, and leaves filtering by extension to the
//! caller.

use std::borrow::Cow;
use std::io::Read;

use bytes::Bytes;
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Extension of bulletin files inside the archive.
pub const MARKUP_EXTENSION: &str = ".xml";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Size of a tar header block. Anything shorter cannot be an archive.
const TAR_BLOCK_SIZE: usize = 512;

/// One file extracted from the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Bytes,
}

impl ArchiveEntry {
    /// Whether this entry is a bulletin file.
    pub fn is_markup(&self) -> bool {
        self.name.ends_with(MARKUP_EXTENSION)
    }

    /// Contents decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Extract every regular file from a tar archive.
///
/// A gzip-wrapped archive is decompressed first. A buffer shorter than one
/// header block is rejected rather than read as an empty archive.
pub fn extract_archive(data: &[u8]) -> Result<Vec<ArchiveEntry>> {
    if data.starts_with(&GZIP_MAGIC) {
        let decompressed = decompress_gzip(data)?;
        return read_tar(&decompressed);
    }
    read_tar(data)
}

fn read_tar(data: &[u8]) -> Result<Vec<ArchiveEntry>> {
    if data.len() < TAR_BLOCK_SIZE {
        return Err(IngestionError::ArchiveDecode(format!(
            "archive is {} bytes, shorter than one header block",
            data.len()
        )));
    }

    let mut archive = tar::Archive::new(data);
    let mut entries = Vec::new();

    let iter = archive
        .entries()
        .map_err(|e| IngestionError::ArchiveDecode(e.to_string()))?;

    for entry in iter {
        let mut entry = entry.map_err(|e| IngestionError::ArchiveDecode(e.to_string()))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry
            .path()
            .map_err(|e| IngestionError::ArchiveDecode(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        // The declared size comes from the header; it cannot exceed the input.
        let declared = entry.size();
        if declared > data.len() as u64 {
            return Err(IngestionError::ArchiveDecode(format!(
                "{}: declared size {} exceeds archive size {}",
                name,
                declared,
                data.len()
            )));
        }

        let mut buffer = Vec::new();
        entry
            .read_to_end(&mut buffer)
            .map_err(|e| IngestionError::ArchiveDecode(format!("{}: {}", name, e)))?;

        debug!(file = %name, size = buffer.len(), "Extracted archive entry");
        entries.push(ArchiveEntry {
            name,
            data: Bytes::from(buffer),
        });
    }

    Ok(entries)
}

/// Decompress gzip data.
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| IngestionError::ArchiveDecode(format!("gzip: {}", e)))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{gzip, tar_archive, ArchiveFixture};

    #[test]
    fn test_extracts_in_archive_order() {
        let data = tar_archive(&[
            ("b.xml", "<b/>"),
            ("a.xml", "<a/>"),
            ("notes.txt", "ignored by caller"),
        ]);
        let entries = extract_archive(&data).unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b.xml", "a.xml", "notes.txt"]);
        assert_eq!(entries[0].data.as_ref(), b"<b/>");
    }

    #[test]
    fn test_extractor_keeps_non_markup_entries() {
        let data = tar_archive(&[("readme.txt", "hello")]);
        let entries = extract_archive(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_markup());
    }

    #[test]
    fn test_directories_skipped() {
        let data = ArchiveFixture::new()
            .directory("avisos/")
            .file("avisos/one.xml", "<alert/>")
            .build();
        let entries = extract_archive(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "avisos/one.xml");
        assert!(entries[0].is_markup());
    }

    #[test]
    fn test_gzip_wrapped_archive() {
        let data = gzip(&tar_archive(&[("one.xml", "<alert/>")]));
        let entries = extract_archive(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text(), "<alert/>");
    }

    #[test]
    fn test_invalid_archive_fails() {
        let garbage = vec![b'x'; 1024];
        let err = extract_archive(&garbage).unwrap_err();
        assert!(matches!(err, IngestionError::ArchiveDecode(_)));
    }

    #[test]
    fn test_lossy_text_decoding() {
        let entry = ArchiveEntry {
            name: "latin1.xml".into(),
            data: Bytes::from_static(b"<a>Le\xf3n</a>"),
        };
        assert_eq!(entry.text(), "<a>Le\u{fffd}n</a>");
    }

    #[test]
    fn test_empty_buffer_is_error() {
        let err = extract_archive(&[]).unwrap_err();
        assert!(matches!(err, IngestionError::ArchiveDecode(_)));
    }

    #[test]
    fn test_short_buffer_is_error() {
        assert!(extract_archive(&[0u8; 100]).is_err());
        assert!(extract_archive(&gzip(b"")).is_err());
    }

    /// Single GNU header whose size field is set directly, followed by
    /// two zero blocks.
    fn forged_archive(size_field: [u8; 12]) -> Vec<u8> {
        let mut header = tar::Header::new_gnu();
        header.set_path("huge.xml").unwrap();
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.as_gnu_mut().unwrap().size = size_field;
        header.set_cksum();

        let mut data = header.as_bytes().to_vec();
        data.extend_from_slice(&[0u8; 1024]);
        data
    }

    #[test]
    fn test_base256_size_near_u64_max_is_error() {
        let mut size = [0u8; 12];
        size[0] = 0x80;
        size[4] = 0x80;
        let err = extract_archive(&forged_archive(size)).unwrap_err();
        assert!(matches!(err, IngestionError::ArchiveDecode(_)));
    }

    #[test]
    fn test_declared_size_larger_than_input_is_error() {
        // 4 GiB in base-256
        let mut size = [0u8; 12];
        size[0] = 0x80;
        size[7] = 0x01;
        let err = extract_archive(&forged_archive(size)).unwrap_err();
        assert!(err.to_string().contains("huge.xml"));
    }
}
