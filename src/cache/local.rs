//! Local cache reads
//!
//! The local cache is read-only from this crate's perspective: retrieval
//! probes for a file at the resolved relative path and reads it whole.
//! Either the full byte sequence comes back or a typed not-found naming
//! the artifact and the path that was probed - no partial reads, no
//! decompression, no validation of the bytes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::artifact::ArtifactKind;

/// Result type for cache reads.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors reading an artifact out of the local cache.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{kind} not found in local cache at {}", path.display())]
    NotFound { kind: ArtifactKind, path: PathBuf },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read-only view of one cache root directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether an artifact is present at the given cache-relative path.
    pub fn contains(&self, relative: &Path) -> bool {
        self.root.join(relative).is_file()
    }

    /// Read the full bytes of one artifact.
    pub fn fetch(&self, kind: ArtifactKind, relative: &Path) -> FetchResult<Vec<u8>> {
        let path = self.root.join(relative);
        debug!(kind = kind.as_str(), path = %path.display(), "probing local cache");

        if !path.is_file() {
            return Err(FetchError::NotFound { kind, path });
        }

        let bytes = fs::read(&path).map_err(|source| FetchError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(
            kind = kind.as_str(),
            bytes = bytes.len(),
            path = %path.display(),
            "local cache hit"
        );
        Ok(bytes)
    }
}
