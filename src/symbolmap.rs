//! Symbol-map batch retrieval
//!
//! One framework/platform pair owns zero or more `.bcsymbolmap` files,
//! keyed by the debug-info UUIDs embedded in the installed binary. The set
//! is only discoverable at runtime, so installation fans out: discover the
//! UUIDs (fail-fast - nothing can proceed without the set), then run one
//! fetch+install per UUID and collect every per-UUID failure instead of
//! aborting the rest of the batch.
//!
//! Two aggregation policies exist: strict surfaces the collected failures
//! to the caller, best-effort logs them and reports batch success. Both
//! keep every individual failure observable.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex_lite::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifact::{FrameworkIdentity, SymbolUuid, TargetPlatform};
use crate::cache::{CacheLayout, FetchError, LayoutError, LocalCache};
use crate::install::{BuildTree, InstallError};

/// Errors discovering the UUID set for a binary.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no installed binary to inspect at {}", path.display())]
    MissingBinary { path: PathBuf },

    #[error("failed to run {tool} on {}: {source}", path.display())]
    Spawn {
        tool: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed for {}: {stderr}", path.display())]
    Tool {
        tool: &'static str,
        path: PathBuf,
        stderr: String,
    },
}

/// Failure of one UUID's fetch+install.
#[derive(Debug, Error)]
pub enum SymbolMapItemError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Install(#[from] InstallError),
}

/// Collected per-UUID failures from one batch.
#[derive(Debug)]
pub struct PartialFailure {
    /// How many UUIDs the batch attempted.
    pub attempted: usize,
    /// Every failing UUID with its underlying error, in discovery order.
    pub failures: Vec<(SymbolUuid, SymbolMapItemError)>,
}

impl std::fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} symbol maps failed:",
            self.failures.len(),
            self.attempted
        )?;
        for (uuid, error) in &self.failures {
            write!(f, " [{uuid}: {error}]")?;
        }
        Ok(())
    }
}

/// Errors from one symbol-map batch.
#[derive(Debug, Error)]
pub enum SymbolMapError {
    /// UUID discovery failed; fatal to the whole batch.
    #[error("could not discover symbol-map UUIDs: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Some UUIDs failed after all were attempted (strict policy only).
    #[error("{0}")]
    Partial(PartialFailure),
}

/// How a batch treats per-UUID failures once all UUIDs were attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Surface the collected failures to the caller.
    #[default]
    Strict,
    /// Log per-UUID failures and report batch success.
    BestEffort,
}

/// Outcome of a successful batch.
#[derive(Debug, Default)]
pub struct SymbolMapReport {
    /// UUIDs installed on disk.
    pub installed: Vec<SymbolUuid>,
    /// Per-UUID failures tolerated under the best-effort policy.
    pub skipped: Vec<(SymbolUuid, SymbolMapItemError)>,
}

/// Source of the UUID set embedded in a compiled binary.
///
/// Behind a trait so batch behavior is testable without a Mach-O binary
/// and a `dwarfdump` on PATH.
pub trait UuidDiscovery {
    fn discover(&self, binary: &Path) -> Result<Vec<SymbolUuid>, DiscoveryError>;
}

/// Discovery backed by `dwarfdump --uuid`.
///
/// Output lines look like:
/// `UUID: 2DD1BD2B-EB88-3384-A127-1A5B4A94F1A4 (arm64) /path/to/FrameworkA`
#[derive(Debug, Default)]
pub struct DwarfdumpDiscovery;

impl UuidDiscovery for DwarfdumpDiscovery {
    fn discover(&self, binary: &Path) -> Result<Vec<SymbolUuid>, DiscoveryError> {
        if !binary.exists() {
            return Err(DiscoveryError::MissingBinary {
                path: binary.to_path_buf(),
            });
        }

        let output = Command::new("dwarfdump")
            .arg("--uuid")
            .arg(binary)
            .output()
            .map_err(|source| DiscoveryError::Spawn {
                tool: "dwarfdump",
                path: binary.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(DiscoveryError::Tool {
                tool: "dwarfdump",
                path: binary.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_dwarfdump_uuids(&stdout))
    }
}

/// Pull UUIDs out of `dwarfdump --uuid` output.
fn parse_dwarfdump_uuids(stdout: &str) -> Vec<SymbolUuid> {
    let re = Regex::new(
        r"UUID: ([0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12})",
    )
    .unwrap();
    stdout
        .lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| SymbolUuid::parse(m.as_str()).ok())
        .collect()
}

/// Fetch+install of every symbol map belonging to one framework/platform
/// pair.
pub struct SymbolMapBatch<'a> {
    cache: &'a LocalCache,
    layout: &'a CacheLayout<'a>,
    tree: &'a BuildTree,
    discovery: &'a dyn UuidDiscovery,
    policy: FailurePolicy,
}

impl<'a> SymbolMapBatch<'a> {
    pub fn new(
        cache: &'a LocalCache,
        layout: &'a CacheLayout<'a>,
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

    /// Run the whole batch for one framework/platform pair.
    ///
    /// Discovery failure aborts the batch. Per-UUID failures never abort
    /// the remaining UUIDs; what happens to them afterwards is the
    /// policy's call.
    pub fn install_all(
        &self,
        identity: &FrameworkIdentity,
        platform: TargetPlatform,
    ) -> Result<SymbolMapReport, SymbolMapError> {
        let binary = self
            .tree
            .platform_dir(platform)
            .join(format!("{0}.framework/{0}", identity.name));
        let uuids = self.discovery.discover(&binary)?;
        debug!(
            framework = %identity,
            platform = %platform,
            count = uuids.len(),
            "discovered symbol-map UUIDs"
        );

        let attempted = uuids.len();
        let mut report = SymbolMapReport::default();
        let mut failures = Vec::new();
        for uuid in uuids {
            match self.install_one(identity, platform, uuid) {
                Ok(()) => report.installed.push(uuid),
                Err(error) => failures.push((uuid, error)),
            }
        }

        if failures.is_empty() {
            return Ok(report);
        }

        match self.policy {
            FailurePolicy::Strict => Err(SymbolMapError::Partial(PartialFailure {
                attempted,
                failures,
            })),
            FailurePolicy::BestEffort => {
                for (uuid, error) in &failures {
                    warn!(framework = %identity, %uuid, %error, "skipping symbol map");
                }
                report.skipped = failures;
                Ok(report)
            }
        }
    }

    fn install_one(
        &self,
        identity: &FrameworkIdentity,
        platform: TargetPlatform,
        uuid: SymbolUuid,
    ) -> Result<(), SymbolMapItemError> {
        let relative = self.layout.symbol_map(identity, platform, uuid)?;
        let bytes = self.cache.fetch(crate::artifact::ArtifactKind::SymbolMap, &relative)?;
        let dest = self.tree.install_symbol_map(&bytes, uuid, platform)?;
        info!(framework = %identity, %uuid, path = %dest.display(), "installed symbol map");
        Ok(())
    }
}
