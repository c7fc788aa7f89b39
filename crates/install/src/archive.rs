//! Archive extraction.
//!
//! One [`Extractor`] per format, selected by the configured archive type tag
//! through an [`ArchiveDispatcher`]. Every extractor keeps entries inside the
//! destination directory and fails on entries that would escape it.

use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use xz2::read::XzDecoder;

use tooldeck_core::{ArchiveKind, Error, Extractor, Result};

fn open(archive: &Path) -> Result<File> {
    File::open(archive).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ArchiveMissing {
                path: archive.to_path_buf(),
            }
        } else {
            Error::io(e, Some(archive.to_path_buf()), "open archive")
        }
    })
}

fn create_dest(dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .map_err(|e| Error::io(e, Some(dest.to_path_buf()), "create extraction directory"))
}

fn unpack_tar<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<()> {
    create_dest(dest)?;
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);

    let entries = tar
        .entries()
        .map_err(|e| Error::extraction(archive, e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::extraction(archive, e.to_string()))?;
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| Error::extraction(archive, e.to_string()))?;
        if !unpacked {
            let name = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(Error::extraction(
                archive,
                format!("entry '{name}' escapes the destination"),
            ));
        }
    }
    Ok(())
}

/// gzip-compressed tarballs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzExtractor;

impl Extractor for TarGzExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file = open(archive)?;
        unpack_tar(GzDecoder::new(file), archive, dest)
    }
}

/// xz-compressed tarballs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarXzExtractor;

impl Extractor for TarXzExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file = open(archive)?;
        unpack_tar(XzDecoder::new(file), archive, dest)
    }
}

/// zip archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file = open(archive)?;
        let mut zip =
            zip::ZipArchive::new(file).map_err(|e| Error::extraction(archive, e.to_string()))?;
        create_dest(dest)?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| Error::extraction(archive, e.to_string()))?;

            let Some(relative) = entry.enclosed_name() else {
                return Err(Error::extraction(
                    archive,
                    format!("entry '{}' escapes the destination", entry.name()),
                ));
            };
            let outpath = dest.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)
                    .map_err(|e| Error::io(e, Some(outpath.clone()), "create directory"))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io(e, Some(parent.to_path_buf()), "create directory"))?;
            }
            let mut out = File::create(&outpath)
                .map_err(|e| Error::io(e, Some(outpath.clone()), "create file"))?;
            std::io::copy(&mut entry, &mut out)
                .map_err(|e| Error::extraction(archive, e.to_string()))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                    .map_err(|e| Error::io(e, Some(outpath.clone()), "set permissions"))?;
            }
        }
        Ok(())
    }
}

/// Maps archive type tags to extractors.
#[derive(Clone)]
pub struct ArchiveDispatcher {
    extractors: HashMap<ArchiveKind, Arc<dyn Extractor>>,
}

impl Default for ArchiveDispatcher {
    fn default() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register(ArchiveKind::TarGz, Arc::new(TarGzExtractor));
        dispatcher.register(ArchiveKind::TarXz, Arc::new(TarXzExtractor));
        dispatcher.register(ArchiveKind::Zip, Arc::new(ZipExtractor));
        dispatcher
    }
}

impl std::fmt::Debug for ArchiveDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.extractors.keys().map(|k| k.tag()).collect();
        kinds.sort_unstable();
        f.debug_struct("ArchiveDispatcher")
            .field("kinds", &kinds)
            .finish()
    }
}

impl ArchiveDispatcher {
    /// A dispatcher with no extractors registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register or replace the extractor for `kind`.
    pub fn register(&mut self, kind: ArchiveKind, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(kind, extractor);
    }

    /// The extractor for a type tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedArchiveType`] for unknown or unregistered tags.
    pub fn extractor(&self, tag: &str) -> Result<Arc<dyn Extractor>> {
        let kind: ArchiveKind = tag.parse()?;
        self.extractors
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::UnsupportedArchiveType {
                tag: tag.to_string(),
            })
    }

    /// Extract `archive` into `dest` on the blocking pool.
    ///
    /// # Errors
    ///
    /// Unsupported tags, missing archives and extraction failures.
    pub async fn extract(&self, tag: &str, archive: &Path, dest: &Path) -> Result<()> {
        let extractor = self.extractor(tag)?;
        debug!(archive = %archive.display(), dest = %dest.display(), %tag, "Extracting");

        let (src, out): (PathBuf, PathBuf) = (archive.to_path_buf(), dest.to_path_buf());
        tokio::task::spawn_blocking(move || extractor.extract(&src, &out))
            .await
            .map_err(|e| Error::extraction(archive, format!("extraction task failed: {e}")))?
    }
}
