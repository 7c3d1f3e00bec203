//! Configuration of the analysis run
//!
//! All values have defaults, so an empty TOML file (or no file at all)
//! results in the standard setup: GRCh37 VEP lookups with MyVariant.info
//! fallback, g:Profiler enrichment with a 20 000 gene background and
//! average-linkage clustering cut at a kappa of 0.35.
//!
//! ```toml
//! [dataset]
//! base_dir = "data/bio"
//! splits = ["train", "test"]
//!
//! [enrichment]
//! sources = ["KEGG", "GO:BP"]
//! background_size = 20000
//!
//! [clustering]
//! threshold = 0.65
//! method = "average"
//! ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::stats::Method;
use crate::transport::RetryPolicy;
use crate::{EnrichError, EnrichResult, DEFAULT_BACKGROUND_SIZE};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

impl Config {
    /// Reads the configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Io`] if the file cannot be read and
    /// [`EnrichError::Config`] if it is not valid TOML or fails validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> EnrichResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses the configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Config`] for invalid TOML or invalid values
    pub fn from_toml_str(content: &str) -> EnrichResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EnrichResult<()> {
        if self.enrichment.background_size == 0 {
            return Err(EnrichError::Config(
                "enrichment.background_size must be larger than 0".to_string(),
            ));
        }
        if !self.clustering.threshold.is_finite() || self.clustering.threshold < 0.0 {
            return Err(EnrichError::Config(format!(
                "clustering.threshold must be a non-negative number, got {}",
                self.clustering.threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request socket timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the Ensembl REST server used for VEP lookups
    #[serde(default = "default_vep_url")]
    pub vep_url: String,
    /// Base URL of the MyVariant.info API
    #[serde(default = "default_myvariant_url")]
    pub myvariant_url: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_vep_url() -> String {
    "https://grch37.rest.ensembl.org".to_string()
}

fn default_myvariant_url() -> String {
    "https://myvariant.info".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            vep_url: default_vep_url(),
            myvariant_url: default_myvariant_url(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Which enrichment backend is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The remote g:Profiler g:GOSt service
    #[default]
    GProfiler,
    /// Local hypergeometric test against a GMT library
    Gmt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_gprofiler_url")]
    pub gprofiler_url: String,
    #[serde(default = "default_organism")]
    pub organism: String,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Size of the whole genome gene universe
    #[serde(default = "default_background_size")]
    pub background_size: u64,
    /// Significance threshold for reported terms
    #[serde(default = "default_user_threshold")]
    pub user_threshold: f64,
    /// GMT gene set library, required for the `gmt` backend
    #[serde(default)]
    pub gmt_path: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_gprofiler_url() -> String {
    "https://biit.cs.ut.ee/gprofiler".to_string()
}

fn default_organism() -> String {
    "hsapiens".to_string()
}

fn default_background_size() -> u64 {
    DEFAULT_BACKGROUND_SIZE
}

fn default_user_threshold() -> f64 {
    0.05
}

fn default_sources() -> Vec<String> {
    ["KEGG", "GO:BP", "REAC", "CP", "CORUM", "WP"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            gprofiler_url: default_gprofiler_url(),
            organism: default_organism(),
            sources: default_sources(),
            background_size: default_background_size(),
            user_threshold: default_user_threshold(),
            gmt_path: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Distance (1 - kappa) at which the dendrogram is cut
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub method: Method,
}

fn default_threshold() -> f64 {
    0.65
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            method: Method::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_splits")]
    pub splits: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Column holding the rsIDs in CSV and TSV files
    #[serde(default = "default_snp_column")]
    pub snp_column: String,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_snp_column() -> String {
    "SNP".to_string()
}

fn default_splits() -> Vec<String> {
    vec!["train".to_string(), "test".to_string(), "validation".to_string()]
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            splits: default_splits(),
            output_dir: default_output_dir(),
            snp_column: default_snp_column(),
        }
    }
}
