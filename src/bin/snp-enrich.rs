//! Runs the enrichment analysis for every SNP file of a dataset
//!
//! ```bash
//! snp-enrich [config.toml]
//! ```
//!
//! Without a configuration file, the default configuration is used.
use std::process::ExitCode;

use tracing::{error, info};

use snp_enrich::logging::init_tracing;
use snp_enrich::pipeline::Pipeline;
use snp_enrich::transport::HttpTransport;
use snp_enrich::{Config, EnrichResult};

fn run(config_path: Option<String>) -> EnrichResult<()> {
    let config = match config_path {
        Some(path) => {
            info!("Reading configuration from {path}");
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    let transport = HttpTransport::new(&config.http)?;
    let mut pipeline = Pipeline::new(&transport, &config)?;
    let summary = pipeline.run()?;

    let stats = pipeline.resolver().stats();
    info!(
        "Finished {} files: {} remote lookups, {} cache hits, {} unresolved SNPs",
        summary.len(),
        stats.remote_lookups,
        stats.cache_hits,
        stats.unresolved
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    if args.next().is_some() {
        eprintln!("Usage: snp-enrich [config.toml]");
        return ExitCode::FAILURE;
    }

    match run(config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
