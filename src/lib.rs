//! SNP to gene mapping and functional enrichment analysis
//!
//! The crate resolves rsIDs to gene symbols through remote variant annotation
//! services, submits the resulting gene sets for enrichment analysis, groups
//! redundant enriched terms by their kappa agreement and renders bar charts of
//! the most significant terms.
//!
//! # Examples
//!
//! ```no_run
//! use snp_enrich::resolver::VariantResolver;
//! use snp_enrich::enrichment::{EnrichmentBackend, GProfiler};
//! use snp_enrich::stats::{cluster_terms, Method};
//! use snp_enrich::transport::HttpTransport;
//! use snp_enrich::Config;
//!
//! let config = Config::default();
//! let transport = HttpTransport::new(&config.http).unwrap();
//!
//! let mut resolver = VariantResolver::new(&transport, &config.resolver);
//! let genes = resolver.genes_from_snps(["rs429358", "rs7412"]);
//!
//! let gprofiler = GProfiler::new(&transport, &config.enrichment);
//! let mut table = gprofiler.enrich(&genes, &config.enrichment.sources);
//! cluster_terms(&mut table, config.enrichment.background_size, 0.65, Method::Average);
//! ```
use std::collections::HashSet;
use thiserror::Error;

pub mod config;
pub mod enrichment;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod stats;
pub mod transport;
pub mod utils;
mod matrix;

pub use config::Config;
pub use enrichment::{EnrichmentRow, EnrichmentTable, Intersection};
pub use resolver::VariantResolver;

/// A set of unique gene symbols
///
/// Symbols are stored exactly as reported by the remote services,
/// no case normalization takes place.
pub type GeneSet = HashSet<String>;

/// Whole genome background size used for kappa and enrichment statistics
pub const DEFAULT_BACKGROUND_SIZE: u64 = 20_000;
/// Number of terms shown in the enrichment bar charts
pub const TOP_TERMS: usize = 10;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("unable to render plot: {0}")]
    Plot(String),
    #[error("statistics error: {0}")]
    Stats(String),
    #[error("invalid gene set library: {0}")]
    Library(String),
    #[error("invalid enrichment table: {0}")]
    Table(String),
}

impl From<toml::de::Error> for EnrichError {
    fn from(err: toml::de::Error) -> Self {
        EnrichError::Config(err.to_string())
    }
}

/// Shortcut for `Result<T, EnrichError>`
pub type EnrichResult<T> = Result<T, EnrichError>;

/// Converts a count into `f64`
///
/// Gene and term counts are far below 2^32, so the conversion is lossless
/// for all realistic inputs. Counts above `u32::MAX` saturate.
fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n.try_into().unwrap_or(u32::MAX);
    intermediate.into()
}

/// Converts a count into `f64`, see [`f64_from_usize`]
fn f64_from_u64(n: u64) -> f64 {
    let intermediate: u32 = n.try_into().unwrap_or(u32::MAX);
    intermediate.into()
}
