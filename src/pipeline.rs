//! Retrieval pipeline
//!
//! Turns a retrieval request (framework identities, version markers,
//! platforms) into independent work items - one per artifact kind per
//! framework/platform pair - and runs them through resolve → fetch →
//! install. Items never short-circuit each other: a missing dSYM does not
//! stop the framework next to it, and the full per-item outcome list goes
//! back to the caller, who decides what is fatal.
//!
//! Within one pair the framework installs before its symbol-map batch,
//! because UUID discovery inspects the installed binary. Across pairs
//! there is no ordering requirement; items touch disjoint paths.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::{ArtifactKind, FrameworkIdentity, TargetPlatform, VersionMarker};
use crate::cache::{CacheLayout, LayoutError, LocalCache};
use crate::install::{BuildTree, InstallError};
use crate::symbolmap::{FailurePolicy, SymbolMapBatch, SymbolMapError, UuidDiscovery};

/// Errors from one work item.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Fetch(#[from] crate::cache::FetchError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    SymbolMaps(#[from] SymbolMapError),
}

/// One independently failable unit of retrieval work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Framework {
        identity: FrameworkIdentity,
        platform: TargetPlatform,
    },
    DSym {
        identity: FrameworkIdentity,
        platform: TargetPlatform,
    },
    SymbolMaps {
        identity: FrameworkIdentity,
        platform: TargetPlatform,
    },
    VersionMarker {
        marker: VersionMarker,
    },
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Framework { identity, platform } => {
                write!(f, "{identity} framework ({platform})")
            }
            WorkItem::DSym { identity, platform } => write!(f, "{identity} dSYM ({platform})"),
            WorkItem::SymbolMaps { identity, platform } => {
                write!(f, "{identity} symbol maps ({platform})")
            }
            WorkItem::VersionMarker { marker } => {
                write!(f, "{}@{} version marker", marker.repository, marker.version)
            }
        }
    }
}

/// Per-item outcome of a pipeline run.
#[derive(Debug)]
pub struct WorkReport {
    pub item: WorkItem,
    pub outcome: Result<(), RetrieveError>,
}

/// Presence probe for one cache-addressed artifact (the `list` surface).
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub kind: ArtifactKind,
    pub description: String,
    pub present: bool,
}

/// What one run should retrieve.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub frameworks: Vec<FrameworkIdentity>,
    pub markers: Vec<VersionMarker>,
    pub platforms: Vec<TargetPlatform>,
}

impl RetrievalRequest {
    /// Enumerate the independent work items this request fans out into.
    ///
    /// Pure composition: one framework + dSYM + symbol-map batch per
    /// framework/platform pair, plus one platform-independent version
    /// marker per repository.
    pub fn plan(&self) -> Vec<WorkItem> {
        let mut items = Vec::new();
        for identity in &self.frameworks {
            for &platform in &self.platforms {
                items.push(WorkItem::Framework {
                    identity: identity.clone(),
                    platform,
                });
                items.push(WorkItem::DSym {
                    identity: identity.clone(),
                    platform,
                });
                items.push(WorkItem::SymbolMaps {
                    identity: identity.clone(),
                    platform,
                });
            }
        }
        for marker in &self.markers {
            items.push(WorkItem::VersionMarker {
                marker: marker.clone(),
            });
        }
        items
    }
}

/// The local retrieval-and-install pipeline.
pub struct RetrievalPipeline<'a> {
    cache: &'a LocalCache,
    layout: CacheLayout<'a>,
    tree: &'a BuildTree,
    discovery: &'a dyn UuidDiscovery,
    policy: FailurePolicy,
}

impl<'a> RetrievalPipeline<'a> {
    pub fn new(
        cache: &'a LocalCache,
        layout: CacheLayout<'a>,
        tree: &'a BuildTree,
        discovery: &'a dyn UuidDiscovery,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            cache,
            layout,
            tree,
            discovery,
            policy,
        }
    }

    /// Run every work item of the request, collecting per-item outcomes.
    pub fn run(&self, request: &RetrievalRequest) -> Vec<WorkReport> {
        request
            .plan()
            .into_iter()
            .map(|item| {
                let outcome = self.execute(&item);
                match &outcome {
                    Ok(()) => info!(item = %item, "retrieved"),
                    Err(error) => warn!(item = %item, %error, "retrieval failed"),
                }
                WorkReport { item, outcome }
            })
            .collect()
    }

    /// Probe the cache for every fetchable artifact of the request.
    ///
    /// Symbol maps are excluded: their UUID set is only discoverable from
    /// an installed binary, so there is no path to probe up front.
    pub fn probe(&self, request: &RetrievalRequest) -> Result<Vec<ProbeReport>, LayoutError> {
        let mut reports = Vec::new();
        for item in request.plan() {
            let (kind, relative) = match &item {
                WorkItem::Framework { identity, platform } => (
                    ArtifactKind::Framework,
                    self.layout.framework(identity, *platform)?,
                ),
                WorkItem::DSym { identity, platform } => {
                    (ArtifactKind::DSym, self.layout.dsym(identity, *platform)?)
                }
                WorkItem::SymbolMaps { .. } => continue,
                WorkItem::VersionMarker { marker } => (
                    ArtifactKind::VersionMarker,
                    self.layout.version_marker(marker),
                ),
            };
            reports.push(ProbeReport {
                kind,
                description: item.to_string(),
                present: self.cache.contains(&relative),
            });
        }
        Ok(reports)
    }

    fn execute(&self, item: &WorkItem) -> Result<(), RetrieveError> {
        match item {
            WorkItem::Framework { identity, platform } => {
                let relative = self.layout.framework(identity, *platform)?;
                let bytes = self.cache.fetch(ArtifactKind::Framework, &relative)?;
                self.tree
                    .install_framework(&bytes, &identity.name, *platform)?;
                Ok(())
            }
            WorkItem::DSym { identity, platform } => {
                let relative = self.layout.dsym(identity, *platform)?;
                let bytes = self.cache.fetch(ArtifactKind::DSym, &relative)?;
                self.tree.install_dsym(&bytes, &identity.name, *platform)?;
                Ok(())
            }
            WorkItem::SymbolMaps { identity, platform } => {
                let batch = SymbolMapBatch::new(
                    self.cache,
                    &self.layout,
                    self.tree,
                    self.discovery,
                    self.policy,
                );
                batch.install_all(identity, *platform)?;
                Ok(())
            }
            WorkItem::VersionMarker { marker } => {
                let relative = self.layout.version_marker(marker);
                let bytes = self.cache.fetch(ArtifactKind::VersionMarker, &relative)?;
                self.tree.install_version_marker(&bytes, marker)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{RepositoryMap, SymbolUuid};
    use crate::symbolmap::DiscoveryError;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Discovery that always reports an empty UUID set.
    struct NoUuids;

    impl UuidDiscovery for NoUuids {
        fn discover(&self, _binary: &Path) -> Result<Vec<SymbolUuid>, DiscoveryError> {
            Ok(Vec::new())
        }
    }

    fn request() -> RetrievalRequest {
        RetrievalRequest {
            frameworks: vec![
                FrameworkIdentity::new("FrameworkA", "1.2.0"),
                FrameworkIdentity::new("FrameworkB", "2.0.0"),
            ],
            markers: vec![VersionMarker::new("RepoA", "1.2.0")],
            platforms: vec![TargetPlatform::Ios, TargetPlatform::MacOs],
        }
    }

    #[test]
    fn test_plan_enumerates_every_pair() {
        let items = request().plan();
        // 2 frameworks x 2 platforms x 3 kinds + 1 marker.
        assert_eq!(items.len(), 13);
    }

    #[test]
    fn test_plan_orders_framework_before_symbol_maps() {
        let items = request().plan();
        let framework = items
            .iter()
            .position(|i| {
                matches!(i, WorkItem::Framework { identity, platform }
                    if identity.name == "FrameworkA" && *platform == TargetPlatform::Ios)
            })
            .unwrap();
        let maps = items
            .iter()
            .position(|i| {
                matches!(i, WorkItem::SymbolMaps { identity, platform }
                    if identity.name == "FrameworkA" && *platform == TargetPlatform::Ios)
            })
            .unwrap();
        assert!(framework < maps);
    }

    #[test]
    fn test_failures_do_not_abort_sibling_items() {
        let cache_dir = TempDir::new().unwrap();
        let build_dir = TempDir::new().unwrap();
        let mut map = RepositoryMap::new();
        map.insert("FrameworkA", "RepoA");
        map.insert("FrameworkB", "RepoA");

        // Only the marker exists; every other artifact is missing.
        fs::create_dir_all(cache_dir.path().join("RepoA")).unwrap();
        fs::write(cache_dir.path().join("RepoA/.RepoA.version-1.2.0"), b"1.2.0").unwrap();

        let cache = LocalCache::new(cache_dir.path());
        let layout = CacheLayout::new(&map, "");
        let tree = BuildTree::new(build_dir.path());
        let pipeline =
            RetrievalPipeline::new(&cache, layout, &tree, &NoUuids, FailurePolicy::Strict);

        let reports = pipeline.run(&request());
        assert_eq!(reports.len(), 13);

        // The marker unit succeeded even though everything before it failed.
        let marker_report = reports
            .iter()
            .find(|r| matches!(r.item, WorkItem::VersionMarker { .. }))
            .unwrap();
        assert!(marker_report.outcome.is_ok());
        assert!(build_dir.path().join(".RepoA.version").exists());
    }

    #[test]
    fn test_probe_skips_symbol_maps() {
        let cache_dir = TempDir::new().unwrap();
        let build_dir = TempDir::new().unwrap();
        let mut map = RepositoryMap::new();
        map.insert("FrameworkA", "RepoA");
        map.insert("FrameworkB", "RepoA");

        let cache = LocalCache::new(cache_dir.path());
        let layout = CacheLayout::new(&map, "");
        let tree = BuildTree::new(build_dir.path());
        let pipeline =
            RetrievalPipeline::new(&cache, layout, &tree, &NoUuids, FailurePolicy::Strict);

        let probes = pipeline.probe(&request()).unwrap();
        // 2 frameworks x 2 platforms x 2 probeable kinds + 1 marker.
        assert_eq!(probes.len(), 9);
        assert!(probes.iter().all(|p| !p.present));
    }
}
