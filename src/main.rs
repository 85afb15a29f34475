//! framevault CLI
//!
//! Entry point for the `framevault` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use framevault::cache::CacheLayout;
use framevault::config::{VaultConfig, DEFAULT_CONFIG_FILE};
use framevault::install::BuildTree;
use framevault::pipeline::{RetrievalPipeline, RetrievalRequest};
use framevault::symbolmap::{DwarfdumpDiscovery, FailurePolicy};
use framevault::{LocalCache, TargetPlatform};

#[derive(Parser)]
#[command(name = "framevault")]
#[command(about = "Local binary cache for prebuilt Apple-platform frameworks", version)]
struct Cli {
    /// Path to the config file (default: Framevault.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve all cached artifacts and install them into the build tree
    Install {
        /// Platforms to retrieve (default: all)
        #[arg(long, short = 'p')]
        platform: Vec<TargetPlatform>,

        /// Build directory to install into
        #[arg(long, default_value = "Carthage/Build")]
        build_dir: PathBuf,

        /// Log missing symbol maps instead of failing the batch
        #[arg(long)]
        lenient_symbol_maps: bool,
    },

    /// Report which artifacts are present in the local cache
    List {
        /// Platforms to check (default: all)
        #[arg(long, short = 'p')]
        platform: Vec<TargetPlatform>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = match VaultConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Install {
            platform,
            build_dir,
            lenient_symbol_maps,
        } => {
            run_install(&config, platform, build_dir, lenient_symbol_maps);
        }
        Commands::List { platform, json } => {
            run_list(&config, platform, json);
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("framevault={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn make_request(config: &VaultConfig, platforms: Vec<TargetPlatform>) -> RetrievalRequest {
    let platforms = if platforms.is_empty() {
        TargetPlatform::ALL.to_vec()
    } else {
        platforms
    };
    RetrievalRequest {
        frameworks: config.frameworks.clone(),
        markers: config.markers.clone(),
        platforms,
    }
}

fn run_install(
    config: &VaultConfig,
    platforms: Vec<TargetPlatform>,
    build_dir: PathBuf,
    lenient_symbol_maps: bool,
) {
    let request = make_request(config, platforms);
    let cache = LocalCache::new(&config.cache_root);
    let layout = CacheLayout::new(&config.repository_map, &config.prefix);
    let tree = BuildTree::new(build_dir);
    let discovery = DwarfdumpDiscovery;
    let policy = if lenient_symbol_maps {
        FailurePolicy::BestEffort
    } else {
        FailurePolicy::Strict
    };

    let pipeline = RetrievalPipeline::new(&cache, layout, &tree, &discovery, policy);
    let reports = pipeline.run(&request);

    let mut failed = 0usize;
    for report in &reports {
        match &report.outcome {
            Ok(()) => println!("  ok       {}", report.item),
            Err(error) => {
                failed += 1;
                println!("  failed   {}: {}", report.item, error);
            }
        }
    }
    println!(
        "{} of {} artifacts installed",
        reports.len() - failed,
        reports.len()
    );

    if failed > 0 {
        process::exit(2);
    }
}

fn run_list(config: &VaultConfig, platforms: Vec<TargetPlatform>, json: bool) {
    let request = make_request(config, platforms);
    let cache = LocalCache::new(&config.cache_root);
    let layout = CacheLayout::new(&config.repository_map, &config.prefix);
    // List never writes; the build tree and discovery are inert here.
    let tree = BuildTree::new(".");
    let discovery = DwarfdumpDiscovery;

    let pipeline =
        RetrievalPipeline::new(&cache, layout, &tree, &discovery, FailurePolicy::Strict);
    let probes = match pipeline.probe(&request) {
        Ok(probes) => probes,
        Err(e) => {
            eprintln!("Error resolving cache paths: {}", e);
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&probes) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        for probe in &probes {
            let status = if probe.present { "present" } else { "missing" };
            println!("  {:<8} {}", status, probe.description);
        }
    }
}
