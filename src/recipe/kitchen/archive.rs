// src/recipe/kitchen/archive.rs

//! Archive and source file utilities for the Kitchen

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;
use xz2::read::XzDecoder;

/// Download a file from a URL
///
/// `http` and `https` URLs are fetched with a blocking client; `file` URLs
/// are copied from the local filesystem. A single attempt is made.
pub fn download_file(url: &str, dest: &Path, timeout: Duration) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| Error::DownloadError(format!("Invalid url {}: {}", url, e)))?;

    match parsed.scheme() {
        "file" => {
            let path = parsed
                .to_file_path()
                .map_err(|_| Error::DownloadError(format!("Invalid file url: {}", url)))?;
            fs::copy(&path, dest).map_err(|e| {
                Error::DownloadError(format!("Failed to copy {}: {}", path.display(), e))
            })?;
            Ok(())
        }
        "http" | "https" => {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

            let mut response = client
                .get(parsed)
                .send()
                .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

            if !response.status().is_success() {
                return Err(Error::DownloadError(format!(
                    "HTTP {} from {}",
                    response.status(),
                    url
                )));
            }

            let mut file = File::create(dest)?;
            let bytes = io::copy(&mut response, &mut file)
                .map_err(|e| Error::DownloadError(format!("Failed to read response: {e}")))?;
            debug!("Downloaded {} bytes from {}", bytes, url);
            Ok(())
        }
        other => Err(Error::DownloadError(format!(
            "Unsupported url scheme '{}' in {}",
            other, url
        ))),
    }
}

/// Compression applied to a tarball, detected from its file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    TarXz,
    TarZst,
}

impl ArchiveKind {
    /// Detect the archive kind from a file name
    ///
    /// Returns `None` for anything that is not a supported tarball.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
            Some(Self::TarXz)
        } else if filename.ends_with(".tar.zst") || filename.ends_with(".tzst") {
            Some(Self::TarZst)
        } else if filename.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Extract an archive to a destination directory
///
/// Supports: .tar.gz, .tgz, .tar.xz, .txz, .tar.zst, .tzst, .tar.
/// Any other file is copied into `dest` unchanged.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let Some(kind) = ArchiveKind::from_filename(filename) else {
        debug!("{} is not an archive, copying verbatim", filename);
        fs::copy(archive, dest.join(filename))?;
        return Ok(());
    };

    let file = File::open(archive)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", archive.display(), e)))?;

    let reader: Box<dyn Read> = match kind {
        ArchiveKind::Tar => Box::new(file),
        ArchiveKind::TarGz => Box::new(GzDecoder::new(file)),
        ArchiveKind::TarXz => Box::new(XzDecoder::new(file)),
        ArchiveKind::TarZst => Box::new(zstd::stream::read::Decoder::new(file)?),
    };

    unpack_tar(reader, dest)
        .map_err(|e| Error::IoError(format!("Failed to extract {}: {}", filename, e)))
}

/// Unpack a tar stream, refusing entries that would escape `dest`
pub fn unpack_tar<R: Read>(reader: R, dest: &Path) -> io::Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.unpack(dest)
}
