//! framevault - local binary cache for prebuilt Apple-platform frameworks
//!
//! This crate implements the local-cache side of a build-artifact
//! synchronizer: it resolves framework identities to cache paths, fetches
//! zipped framework bundles, dSYMs, bcsymbolmaps and version markers out
//! of a cache directory, and installs them into a project's build tree,
//! collecting per-artifact outcomes so one missing piece never aborts the
//! rest of a run.

pub mod artifact;
pub mod cache;
pub mod config;
pub mod install;
pub mod pipeline;
pub mod symbolmap;

pub use artifact::{ArtifactKind, FrameworkIdentity, SymbolUuid, TargetPlatform, VersionMarker};
pub use cache::{CacheLayout, FetchError, LocalCache};
pub use config::VaultConfig;
pub use install::{BuildTree, InstallError};
pub use pipeline::{RetrievalPipeline, RetrievalRequest, RetrieveError, WorkItem, WorkReport};
pub use symbolmap::{DwarfdumpDiscovery, FailurePolicy, SymbolMapError, UuidDiscovery};
