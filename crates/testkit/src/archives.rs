//! In-memory archive builders.
//!
//! Every file is written with mode `0o644` so tests can observe the install
//! pipeline setting executable bits.

use std::io::Write;

/// A file placed in a fixture archive.
#[derive(Debug, Clone, Copy)]
pub struct FixtureFile<'a> {
    /// Path inside the archive.
    pub path: &'a str,
    /// File contents.
    pub contents: &'a [u8],
}

impl<'a> FixtureFile<'a> {
    /// A file at `path`.
    #[must_use]
    pub const fn new(path: &'a str, contents: &'a [u8]) -> Self {
        Self { path, contents }
    }
}

fn append_tar<W: Write>(
    builder: &mut tar::Builder<W>,
    files: &[FixtureFile<'_>],
) -> std::io::Result<()> {
    for file in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(file.contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, file.path, file.contents)?;
    }
    Ok(())
}

/// A gzip-compressed tarball containing `files`.
///
/// # Errors
///
/// Only on encoder failure.
pub fn tar_gz(files: &[FixtureFile<'_>]) -> std::io::Result<Vec<u8>> {
    let enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    let mut builder = tar::Builder::new(enc);
    append_tar(&mut builder, files)?;
    builder.into_inner()?.finish()
}

/// An xz-compressed tarball containing `files`.
///
/// # Errors
///
/// Only on encoder failure.
pub fn tar_xz(files: &[FixtureFile<'_>]) -> std::io::Result<Vec<u8>> {
    let enc = xz2::write::XzEncoder::new(Vec::new(), 1);
    let mut builder = tar::Builder::new(enc);
    append_tar(&mut builder, files)?;
    builder.into_inner()?.finish()
}

/// A zip archive containing `files`.
///
/// # Errors
///
/// Only on encoder failure.
pub fn zip(files: &[FixtureFile<'_>]) -> std::io::Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
    for file in files {
        writer
            .start_file(file.path, options)
            .map_err(std::io::Error::other)?;
        writer.write_all(file.contents)?;
    }
    Ok(writer.finish().map_err(std::io::Error::other)?.into_inner())
}
