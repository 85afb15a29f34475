//! Build-tree installation
//!
//! Installs fetched artifact bytes into the project's build directory:
//! remove any stale copy, decompress into a hidden staging directory next
//! to the destination, then rename into place so a failed extraction is
//! never observable as an installed artifact. Framework binaries get their
//! executable bit restored after extraction.
//!
//! Destinations are unique per identity/platform/UUID, so concurrent
//! installs of distinct artifacts never touch the same paths.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::artifact::{SymbolUuid, TargetPlatform, VersionMarker};

/// Result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Errors installing an artifact into the build tree.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decompress {entry}: {source}")]
    Archive {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive does not contain expected entry {0}")]
    MissingEntry(String),
}

impl InstallError {
    fn io(path: &Path, source: io::Error) -> Self {
        InstallError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One project build directory, laid out per platform.
///
/// Frameworks, dSYMs and symbol maps land under `<root>/<Platform>/`;
/// version markers land at the root itself.
#[derive(Debug, Clone)]
pub struct BuildTree {
    root: PathBuf,
}

impl BuildTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build sub-directory for one platform.
    pub fn platform_dir(&self, platform: TargetPlatform) -> PathBuf {
        self.root.join(platform.as_str())
    }

    /// Install a zipped framework bundle and mark its binary executable.
    pub fn install_framework(
        &self,
        bytes: &[u8],
        name: &str,
        platform: TargetPlatform,
    ) -> InstallResult<PathBuf> {
        let entry = format!("{name}.framework");
        let installed = self.install_archive(bytes, &entry, platform)?;
        self.mark_executable(&installed.join(name))?;
        Ok(installed)
    }

    /// Install a zipped dSYM bundle.
    pub fn install_dsym(
        &self,
        bytes: &[u8],
        name: &str,
        platform: TargetPlatform,
    ) -> InstallResult<PathBuf> {
        let entry = format!("{name}.framework.dSYM");
        self.install_archive(bytes, &entry, platform)
    }

    /// Install one zipped `.bcsymbolmap`.
    pub fn install_symbol_map(
        &self,
        bytes: &[u8],
        uuid: SymbolUuid,
        platform: TargetPlatform,
    ) -> InstallResult<PathBuf> {
        let entry = format!("{uuid}.bcsymbolmap");
        self.install_archive(bytes, &entry, platform)
    }

    /// Write a bare version-marker file at the build-tree root.
    ///
    /// Markers are not archives; the fetched bytes are written as-is, via a
    /// staging file and rename like everything else.
    pub fn install_version_marker(
        &self,
        bytes: &[u8],
        marker: &VersionMarker,
    ) -> InstallResult<PathBuf> {
        fs::create_dir_all(&self.root).map_err(|e| InstallError::io(&self.root, e))?;

        let dest = self.root.join(format!(".{}.version", marker.repository));
        let staging = self.root.join(format!(".{}.version.partial", marker.repository));

        fs::write(&staging, bytes).map_err(|e| InstallError::io(&staging, e))?;
        fs::rename(&staging, &dest).map_err(|e| InstallError::io(&dest, e))?;
        debug!(path = %dest.display(), "installed version marker");
        Ok(dest)
    }

    /// Install one archive entry under the platform directory.
    ///
    /// Steps: remove any stale copy, extract the archive into a hidden
    /// `.<entry>.partial` sibling, rename the extracted entry over the
    /// destination. On any failure the staging directory is removed and the
    /// destination is left absent, never half-written.
    pub fn install_archive(
        &self,
        bytes: &[u8],
        entry: &str,
        platform: TargetPlatform,
    ) -> InstallResult<PathBuf> {
        let platform_dir = self.platform_dir(platform);
        fs::create_dir_all(&platform_dir).map_err(|e| InstallError::io(&platform_dir, e))?;

        let dest = platform_dir.join(entry);
        remove_existing(&dest)?;

        let staging = platform_dir.join(format!(".{entry}.partial"));
        remove_existing(&staging)?;

        let result = extract_archive(bytes, entry, &staging).and_then(|()| {
            let extracted = staging.join(entry);
            if !extracted.exists() {
                return Err(InstallError::MissingEntry(entry.to_string()));
            }
            fs::rename(&extracted, &dest).map_err(|e| InstallError::io(&dest, e))
        });

        // Staging is scratch space either way.
        if let Err(e) = fs::remove_dir_all(&staging) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %staging.display(), error = %e, "failed to clean staging directory");
            }
        }

        result?;
        debug!(path = %dest.display(), "installed {entry}");
        Ok(dest)
    }

    /// Restore the executable bit on an extracted framework binary.
    fn mark_executable(&self, binary: &Path) -> InstallResult<()> {
        if !binary.exists() {
            // Some frameworks (e.g. resource-only bundles) carry no binary.
            warn!(path = %binary.display(), "no binary to mark executable");
            return Ok(());
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(binary, fs::Permissions::from_mode(0o755))
                .map_err(|e| InstallError::io(binary, e))?;
        }
        Ok(())
    }
}

/// Remove a stale file or directory; absence is not an error.
fn remove_existing(path: &Path) -> InstallResult<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::io(path, e)),
    }
}

/// Extract all entries of a zip archive under `staging`.
fn extract_archive(bytes: &[u8], entry: &str, staging: &Path) -> InstallResult<()> {
    let archive_err = |source| InstallError::Archive {
        entry: entry.to_string(),
        source,
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_err)?;
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(archive_err)?;
        // Skip entries that escape the staging directory.
        let Some(relative) = file.enclosed_name() else {
            warn!(name = file.name(), "skipping unsafe archive entry");
            continue;
        };
        let out_path = staging.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| InstallError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
        }
        let mut contents = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut contents)
            .map_err(|e| InstallError::io(&out_path, e))?;
        fs::write(&out_path, &contents).map_err(|e| InstallError::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                .map_err(|e| InstallError::io(&out_path, e))?;
        }
    }
    Ok(())
}
