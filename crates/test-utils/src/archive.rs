//! In-memory tar archive builders.
//!
//! The alert feed ships bulletins as a tar of XML files. These helpers build
//! equivalent archives without touching the filesystem.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Builder for a tar archive held in memory.
pub struct ArchiveFixture {
    builder: tar::Builder<Vec<u8>>,
}

impl Default for ArchiveFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveFixture {
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    /// Append a regular file.
    pub fn file(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        self.builder
            .append_data(&mut header, name, data)
            .expect("Failed to append file to test archive");
        self
    }

    /// Append a directory entry.
    pub fn directory(mut self, name: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        self.builder
            .append_data(&mut header, name, std::io::empty())
            .expect("Failed to append directory to test archive");
        self
    }

    /// Finish the archive and return its bytes.
    pub fn build(self) -> Vec<u8> {
        self.builder
            .into_inner()
            .expect("Failed to finish test archive")
    }

    /// Finish the archive and gzip it.
    pub fn build_gz(self) -> Vec<u8> {
        gzip(&self.build())
    }
}

/// Gzip-compress a byte buffer.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("Failed to write gzip test data");
    encoder.finish().expect("Failed to finish gzip test data")
}

/// Build a tar archive from `(name, contents)` pairs, in order.
pub fn tar_archive<N: AsRef<str>, D: AsRef<[u8]>>(files: &[(N, D)]) -> Vec<u8> {
    files
        .iter()
        .fold(ArchiveFixture::new(), |archive, (name, data)| {
            archive.file(name.as_ref(), data)
        })
        .build()
}
