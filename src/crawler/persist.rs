//! Writing downloaded assets into the mirror directory

use crate::url::mirror_path;
use crate::{MirrorError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use url::Url;

/// Creates a directory and any missing parents
///
/// Succeeds if the directory already exists, including when another task
/// creates it concurrently.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(source) => Err(MirrorError::Filesystem {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Writes an asset body to its mirrored location and returns the file path
///
/// A failed write may leave a partial file behind; the next successful
/// download of the same URL overwrites it.
pub async fn write_asset(root: &Path, url: &Url, body: &[u8]) -> Result<PathBuf> {
    let path = mirror_path(root, url);

    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    tokio::fs::write(&path, body)
        .await
        .map_err(|source| MirrorError::Filesystem {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}

/// Prepares the mirror root before a crawl
///
/// With `clean`, everything below the root is deleted first.
pub async fn prepare_mirror_dir(root: &Path, clean: bool) -> Result<()> {
    if clean {
        match tokio::fs::remove_dir_all(root).await {
            Ok(()) => tracing::info!("Removed previous mirror at {}", root.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(MirrorError::Filesystem {
                    path: root.to_path_buf(),
                    source,
                })
            }
        }
    }

    ensure_dir(root).await
}
