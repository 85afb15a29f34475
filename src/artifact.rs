//! Artifact identity model
//!
//! Types naming the things the cache stores: a framework at a version, the
//! platform slice it was built for, the artifact kinds derived from it, and
//! the debug-symbol UUIDs embedded in its binary. All of these are built
//! from the resolved dependency list at the start of a run and are
//! immutable for its duration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One build-artifact family: a framework name plus its resolved version.
///
/// The version is whatever the dependency manifest resolved to - a semantic
/// version or a bare commit string - and is only ever used as an opaque
/// path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameworkIdentity {
    pub name: String,
    pub version: String,
}

impl FrameworkIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for FrameworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Target platform slice of a framework build.
///
/// Closed set; the platform selects a cache sub-path and a build
/// sub-directory and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    Ios,
    MacOs,
    TvOs,
    WatchOs,
    VisionOs,
}

impl TargetPlatform {
    /// All supported platforms, in stable order.
    pub const ALL: [TargetPlatform; 5] = [
        TargetPlatform::Ios,
        TargetPlatform::MacOs,
        TargetPlatform::TvOs,
        TargetPlatform::WatchOs,
        TargetPlatform::VisionOs,
    ];

    /// Canonical directory-name spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Ios => "iOS",
            TargetPlatform::MacOs => "macOS",
            TargetPlatform::TvOs => "tvOS",
            TargetPlatform::WatchOs => "watchOS",
            TargetPlatform::VisionOs => "visionOS",
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a platform name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown platform: {0} (expected iOS, macOS, tvOS, watchOS or visionOS)")]
pub struct PlatformParseError(pub String);

impl FromStr for TargetPlatform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(TargetPlatform::Ios),
            "macos" | "mac" | "osx" => Ok(TargetPlatform::MacOs),
            "tvos" => Ok(TargetPlatform::TvOs),
            "watchos" => Ok(TargetPlatform::WatchOs),
            "visionos" => Ok(TargetPlatform::VisionOs),
            other => Err(PlatformParseError(other.to_string())),
        }
    }
}

/// Kind of cache-addressed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Compiled `.framework` bundle, zipped.
    Framework,
    /// Debug-symbol `.dSYM` bundle, zipped.
    #[serde(rename = "dsym")]
    DSym,
    /// One `.bcsymbolmap` file, zipped, keyed by UUID.
    SymbolMap,
    /// Bare version-marker file recording a resolved dependency version.
    VersionMarker,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Framework => "framework",
            ArtifactKind::DSym => "dSYM",
            ArtifactKind::SymbolMap => "bcsymbolmap",
            ArtifactKind::VersionMarker => "version marker",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debug-info UUID embedded in a compiled binary.
///
/// Displayed uppercase-hyphenated, the spelling `dwarfdump` reports and the
/// spelling used in `.bcsymbolmap` file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolUuid(Uuid);

impl SymbolUuid {
    pub fn parse(s: &str) -> Result<Self, SymbolUuidError> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for SymbolUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Uuid::encode_buffer();
        f.write_str(self.0.hyphenated().encode_upper(&mut buf))
    }
}

impl FromStr for SymbolUuid {
    type Err = SymbolUuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error parsing a debug-symbol UUID.
#[derive(Debug, Error)]
#[error("invalid debug-symbol UUID: {0}")]
pub struct SymbolUuidError(#[from] uuid::Error);

/// Marker recording the resolved version of one source repository,
/// independent of platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMarker {
    pub repository: String,
    pub version: String,
}

impl VersionMarker {
    pub fn new(repository: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            version: version.into(),
        }
    }
}

/// Framework-name to repository-name mapping.
///
/// The cache path of every artifact runs through the name of the repository
/// the framework came from; this map is supplied by the manifest-resolution
/// side and is read-only during a retrieval session. Frameworks produced by
/// a repository of the same name need no explicit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryMap {
    entries: BTreeMap<String, String>,
}

impl RepositoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `framework` is published by `repository`.
    pub fn insert(&mut self, framework: impl Into<String>, repository: impl Into<String>) {
        self.entries.insert(framework.into(), repository.into());
    }

    /// Repository segment for a framework name, if the map knows it.
    pub fn repository_for(&self, framework: &str) -> Option<&str> {
        self.entries.get(framework).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for RepositoryMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
