//! Symbol-map batch tests through the pipeline
//!
//! The UUID set {U1, U2, U3} is discovered from the installed binary; the
//! cache only holds U1 and U3. Strict policy surfaces an aggregate failure
//! naming exactly U2 while U1 and U3 land on disk; best-effort policy
//! reports batch success with the same on-disk result.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use framevault::artifact::RepositoryMap;
use framevault::cache::{CacheLayout, FetchError};
use framevault::install::BuildTree;
use framevault::pipeline::{RetrievalPipeline, RetrievalRequest, RetrieveError, WorkItem};
use framevault::symbolmap::{
    DiscoveryError, FailurePolicy, SymbolMapError, SymbolMapItemError, UuidDiscovery,
};
use framevault::{FrameworkIdentity, LocalCache, SymbolUuid, TargetPlatform};

struct FixedDiscovery(Vec<SymbolUuid>);

impl UuidDiscovery for FixedDiscovery {
    fn discover(&self, _binary: &Path) -> Result<Vec<SymbolUuid>, DiscoveryError> {
        Ok(self.0.clone())
    }
}

fn uuid(s: &str) -> SymbolUuid {
    SymbolUuid::parse(s).unwrap()
}

fn seed_symbol_map(
    cache_root: &Path,
    layout: &CacheLayout<'_>,
    identity: &FrameworkIdentity,
    u: SymbolUuid,
) {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(format!("{u}.bcsymbolmap"), SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"BCSymbolMap").unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let relative = layout.symbol_map(identity, TargetPlatform::Ios, u).unwrap();
    let absolute = cache_root.join(relative);
    fs::create_dir_all(absolute.parent().unwrap()).unwrap();
    fs::write(absolute, bytes).unwrap();
}

struct Fixture {
    cache_dir: TempDir,
    build_dir: TempDir,
    map: RepositoryMap,
    identity: FrameworkIdentity,
    uuids: [SymbolUuid; 3],
}

fn fixture() -> Fixture {
    let mut map = RepositoryMap::new();
    map.insert("FrameworkA", "RepoA");
    let identity = FrameworkIdentity::new("FrameworkA", "1.2.0");
    let u1 = uuid("11111111-1111-3111-8111-111111111111");
    let u2 = uuid("22222222-2222-3222-8222-222222222222");
    let u3 = uuid("33333333-3333-3333-8333-333333333333");

    let cache_dir = TempDir::new().unwrap();
    {
        let layout = CacheLayout::new(&map, "team1");
        // U2 is deliberately absent.
        seed_symbol_map(cache_dir.path(), &layout, &identity, u1);
        seed_symbol_map(cache_dir.path(), &layout, &identity, u3);
    }

    Fixture {
        cache_dir,
        build_dir: TempDir::new().unwrap(),
        map,
        identity,
        uuids: [u1, u2, u3],
    }
}

fn symbol_map_outcome(
    fixture: &Fixture,
    policy: FailurePolicy,
) -> Result<(), RetrieveError> {
    let layout = CacheLayout::new(&fixture.map, "team1");
    let cache = LocalCache::new(fixture.cache_dir.path());
    let tree = BuildTree::new(fixture.build_dir.path());
    let discovery = FixedDiscovery(fixture.uuids.to_vec());
    let pipeline = RetrievalPipeline::new(&cache, layout, &tree, &discovery, policy);

    let request = RetrievalRequest {
        frameworks: vec![fixture.identity.clone()],
        markers: Vec::new(),
        platforms: vec![TargetPlatform::Ios],
    };
    let mut reports = pipeline.run(&request);
    let position = reports
        .iter()
        .position(|r| matches!(r.item, WorkItem::SymbolMaps { .. }))
        .unwrap();
    reports.swap_remove(position).outcome
}

#[test]
fn test_strict_batch_lists_exactly_the_missing_uuid() {
    let fixture = fixture();
    let [u1, u2, u3] = fixture.uuids;

    let outcome = symbol_map_outcome(&fixture, FailurePolicy::Strict);
    let Err(RetrieveError::SymbolMaps(SymbolMapError::Partial(partial))) = outcome else {
        panic!("expected an aggregate symbol-map failure");
    };

    assert_eq!(partial.attempted, 3);
    let failed: Vec<SymbolUuid> = partial.failures.iter().map(|(u, _)| *u).collect();
    assert_eq!(failed, vec![u2]);
    assert!(matches!(
        partial.failures[0].1,
        SymbolMapItemError::Fetch(FetchError::NotFound { .. })
    ));

    // U1 and U3 are installed despite U2's failure.
    let ios = fixture.build_dir.path().join("iOS");
    assert!(ios.join(format!("{u1}.bcsymbolmap")).exists());
    assert!(ios.join(format!("{u3}.bcsymbolmap")).exists());
    assert!(!ios.join(format!("{u2}.bcsymbolmap")).exists());
}

#[test]
fn test_best_effort_batch_reports_success() {
    let fixture = fixture();
    let [u1, _u2, u3] = fixture.uuids;

    let outcome = symbol_map_outcome(&fixture, FailurePolicy::BestEffort);
    assert!(outcome.is_ok(), "best-effort batch should report success");

    let ios = fixture.build_dir.path().join("iOS");
    assert!(ios.join(format!("{u1}.bcsymbolmap")).exists());
    assert!(ios.join(format!("{u3}.bcsymbolmap")).exists());
}

#[test]
fn test_missing_binary_fails_discovery_through_the_pipeline() {
    let fixture = fixture();

    let layout = CacheLayout::new(&fixture.map, "team1");
    let cache = LocalCache::new(fixture.cache_dir.path());
    let tree = BuildTree::new(fixture.build_dir.path());
    // Real discovery, but no framework was ever installed.
    let discovery = framevault::DwarfdumpDiscovery;
    let pipeline =
        RetrievalPipeline::new(&cache, layout, &tree, &discovery, FailurePolicy::Strict);

    let request = RetrievalRequest {
        frameworks: vec![fixture.identity.clone()],
        markers: Vec::new(),
        platforms: vec![TargetPlatform::Ios],
    };
    let reports = pipeline.run(&request);
    let report = reports
        .iter()
        .find(|r| matches!(r.item, WorkItem::SymbolMaps { .. }))
        .unwrap();
    assert!(matches!(
        report.outcome,
        Err(RetrieveError::SymbolMaps(SymbolMapError::Discovery(
            DiscoveryError::MissingBinary { .. }
        )))
    ));
}
