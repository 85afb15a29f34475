//! Cache path derivation
//!
//! Layout: `<prefix>/<repo>/<platform>/<artifact-file>`, with the version
//! marker sitting one level up at `<prefix>/<repo>/<marker-file>` because
//! it is platform-independent. Every component of an artifact's identity
//! (name, version, platform, UUID, prefix) appears in its path, so two
//! distinct artifacts can never collide under one cache root.
//!
//! Derivation is pure: the same inputs always produce the same relative
//! path, and the only failure is a framework the repository map does not
//! cover.

use std::path::PathBuf;

use thiserror::Error;

use crate::artifact::{FrameworkIdentity, RepositoryMap, SymbolUuid, TargetPlatform, VersionMarker};

/// Errors deriving a cache path.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("no repository mapping for framework {0}")]
    UnknownFramework(String),
}

/// Path resolver over one repository map and cache prefix.
///
/// Holds no other state; all methods are pure.
#[derive(Debug, Clone)]
pub struct CacheLayout<'a> {
    map: &'a RepositoryMap,
    prefix: &'a str,
}

impl<'a> CacheLayout<'a> {
    pub fn new(map: &'a RepositoryMap, prefix: &'a str) -> Self {
        Self { map, prefix }
    }

    /// Cache-relative path of a zipped framework bundle.
    pub fn framework(
        &self,
        identity: &FrameworkIdentity,
        platform: TargetPlatform,
    ) -> Result<PathBuf, LayoutError> {
        let file = format!("{}.framework-{}.zip", identity.name, identity.version);
        Ok(self.platform_dir(identity, platform)?.join(file))
    }

    /// Cache-relative path of a zipped dSYM bundle.
    pub fn dsym(
        &self,
        identity: &FrameworkIdentity,
        platform: TargetPlatform,
    ) -> Result<PathBuf, LayoutError> {
        let file = format!("{}.framework.dSYM-{}.zip", identity.name, identity.version);
        Ok(self.platform_dir(identity, platform)?.join(file))
    }

    /// Cache-relative path of one zipped `.bcsymbolmap`.
    pub fn symbol_map(
        &self,
        identity: &FrameworkIdentity,
        platform: TargetPlatform,
        uuid: SymbolUuid,
    ) -> Result<PathBuf, LayoutError> {
        let file = format!(
            "{}.{}.bcsymbolmap-{}.zip",
            identity.name, uuid, identity.version
        );
        Ok(self.platform_dir(identity, platform)?.join(file))
    }

    /// Cache-relative path of a bare version-marker file.
    ///
    /// Markers are keyed by repository directly, so this never consults the
    /// framework map and cannot fail.
    pub fn version_marker(&self, marker: &VersionMarker) -> PathBuf {
        let file = format!(".{}.version-{}", marker.repository, marker.version);
        self.prefixed(&marker.repository).join(file)
    }

    fn platform_dir(
        &self,
        identity: &FrameworkIdentity,
        platform: TargetPlatform,
    ) -> Result<PathBuf, LayoutError> {
        let repo = self
            .map
            .repository_for(&identity.name)
            .ok_or_else(|| LayoutError::UnknownFramework(identity.name.clone()))?;
        Ok(self.prefixed(repo).join(platform.as_str()))
    }

    /// `<prefix>/<repo>`, or just `<repo>` when the prefix is empty.
    fn prefixed(&self, repo: &str) -> PathBuf {
        if self.prefix.is_empty() {
            PathBuf::from(repo)
        } else {
            PathBuf::from(self.prefix).join(repo)
        }
    }
}
