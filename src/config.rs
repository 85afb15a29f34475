//! Configuration file loading
//!
//! One TOML file supplies everything a retrieval session needs: the cache
//! root and prefix, the repository→frameworks map, and the resolved
//! dependency versions produced by the manifest-resolution side. Example:
//!
//! ```toml
//! [cache]
//! local = "/var/cache/framevault"
//! prefix = "team1"
//!
//! [repositories]
//! RepoA = ["FrameworkA", "FrameworkB"]
//!
//! [dependencies]
//! RepoA = "1.2.0"
//! ```
//!
//! Repositories publishing a single framework of the same name need no
//! `[repositories]` entry.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::artifact::{FrameworkIdentity, RepositoryMap, VersionMarker};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Framevault.toml";

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    cache: RawCache,
    #[serde(default)]
    repositories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawCache {
    local: PathBuf,
    #[serde(default)]
    prefix: String,
}

/// Loaded retrieval-session configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Local cache root directory.
    pub cache_root: PathBuf,
    /// Namespace segment under the cache root; may be empty.
    pub prefix: String,
    /// Framework-name → repository-name map for path derivation.
    pub repository_map: RepositoryMap,
    /// Every framework identity the dependency list resolves to.
    pub frameworks: Vec<FrameworkIdentity>,
    /// One version marker per resolved repository.
    pub markers: Vec<VersionMarker>,
}

impl VaultConfig {
    /// Load and interpret a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    /// Parse config text; `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut repository_map = RepositoryMap::new();
        for (repository, frameworks) in &raw.repositories {
            for framework in frameworks {
                repository_map.insert(framework.clone(), repository.clone());
            }
        }

        let mut frameworks = Vec::new();
        let mut markers = Vec::new();
        for (repository, version) in &raw.dependencies {
            markers.push(VersionMarker::new(repository.clone(), version.clone()));
            match raw.repositories.get(repository) {
                Some(published) => {
                    for framework in published {
                        frameworks.push(FrameworkIdentity::new(framework.clone(), version.clone()));
                    }
                }
                None => {
                    // Single-framework repository of the same name.
                    repository_map.insert(repository.clone(), repository.clone());
                    frameworks.push(FrameworkIdentity::new(repository.clone(), version.clone()));
                }
            }
        }

        Ok(Self {
            cache_root: raw.cache.local,
            prefix: raw.cache.prefix,
            repository_map,
            frameworks,
            markers,
        })
    }
}
