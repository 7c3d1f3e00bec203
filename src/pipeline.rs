//! Batch processing of SNP lists
//!
//! The dataset is organized in split directories below a base directory:
//!
//! ```text
//! data/
//! ├── train/
//! │   ├── cohort_a.csv
//! │   └── cohort_b.txt
//! └── test/
//!     └── cohort_c.tsv
//! ```
//!
//! Every file is resolved to genes, enriched and clustered. Results are
//! written to `output_dir/<split>/<stem>_enrichment.csv` and
//! `output_dir/<split>/<stem>_enrichment.png`, and one [`SummaryRow`] per
//! file is collected into `output_dir/summary.csv`.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{BackendKind, Config, EnrichmentConfig};
use crate::enrichment::{EnrichmentBackend, GProfiler, GeneSetLibrary, HypergeomEnrichment};
use crate::report::plot_enrichment_results;
use crate::resolver::VariantResolver;
use crate::stats::cluster_terms;
use crate::transport::Transport;
use crate::{EnrichError, EnrichResult};

/// File extensions that are read as SNP lists
const EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// Overview of the analysis of a single SNP file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub split: String,
    pub file: String,
    /// Number of rsIDs in the file
    pub snps: usize,
    /// Number of distinct genes of all SNPs
    pub genes: usize,
    /// Number of enriched terms
    pub terms: usize,
    /// Number of clusters of redundant terms
    pub clusters: usize,
    /// Name (or ID) of the most significant term
    pub top_term: Option<String>,
    pub top_p_value: Option<f64>,
}

/// Creates the enrichment backend selected in the configuration
///
/// # Errors
///
/// Returns [`EnrichError::Config`] if the GMT backend is selected without
/// a `gmt_path` and an error if the GMT library cannot be read
pub fn build_backend<'a>(
    transport: &'a dyn Transport,
    config: &EnrichmentConfig,
) -> EnrichResult<Box<dyn EnrichmentBackend + 'a>> {
    match config.backend {
        BackendKind::GProfiler => Ok(Box::new(GProfiler::new(transport, config))),
        BackendKind::Gmt => {
            let path = config.gmt_path.as_ref().ok_or_else(|| {
                EnrichError::Config(
                    "enrichment.gmt_path is required for the gmt backend".to_string(),
                )
            })?;
            let library = GeneSetLibrary::from_gmt_file(path)?;
            info!("Loaded {} gene sets from {}", library.len(), path.display());
            Ok(Box::new(HypergeomEnrichment::new(
                library,
                config.background_size,
                config.user_threshold,
            )))
        }
    }
}

/// Reads the rsIDs of a SNP file
///
/// CSV and TSV files are read from the column `snp_column`, matched
/// case-insensitively. If no such column exists, the first column is used.
/// A first line that starts with an rsID is read as data, not as header.
/// All other files contain one rsID per line, blank lines and lines
/// starting with `#` are ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn read_snps<P: AsRef<Path>>(path: P, snp_column: &str) -> EnrichResult<Vec<String>> {
    let path = path.as_ref();
    let delimiter = match extension(path).as_deref() {
        Some("csv") => b',',
        Some("tsv") => b'\t',
        _ => {
            let content = fs::read_to_string(path)?;
            return Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(ToString::to_string)
                .collect());
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut snps = Vec::new();
    let column = match headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(snp_column))
    {
        Some(column) => column,
        None => {
            // a plain list of rsIDs has no header row
            match headers.get(0).map(str::trim) {
                Some(first) if is_rsid(first) => {
                    debug!("{} has no header row", path.display());
                    snps.push(first.to_string());
                }
                _ => warn!(
                    "{} has no column {snp_column}, using the first column",
                    path.display()
                ),
            }
            0
        }
    };

    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(column).map(str::trim) {
            if !value.is_empty() {
                snps.push(value.to_string());
            }
        }
    }
    Ok(snps)
}

/// Returns `true` for identifiers like `rs429358`
fn is_rsid(value: &str) -> bool {
    match (value.get(..2), value.get(2..)) {
        (Some(prefix), Some(number)) => {
            prefix.eq_ignore_ascii_case("rs")
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// Returns all SNP files of a directory, sorted by name
///
/// # Errors
///
/// Returns an error if the directory cannot be read
pub fn dataset_files<P: AsRef<Path>>(dir: P) -> EnrichResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let supported = extension(&path).is_some_and(|ext| EXTENSIONS.contains(&ext.as_str()));
        if path.is_file() && supported {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Writes the summary rows as CSV
///
/// # Errors
///
/// Returns an error if the file cannot be created or written
pub fn write_summary<P: AsRef<Path>>(rows: &[SummaryRow], path: P) -> EnrichResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Runs the complete analysis for all splits of a dataset
///
/// The resolver cache is shared across all files, so SNPs that appear in
/// several files are only looked up once.
pub struct Pipeline<'a> {
    config: &'a Config,
    resolver: VariantResolver<'a>,
    backend: Box<dyn EnrichmentBackend + 'a>,
}

impl<'a> Pipeline<'a> {
    /// Constructs a new pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if the enrichment backend cannot be created,
    /// see [`build_backend`]
    pub fn new(transport: &'a dyn Transport, config: &'a Config) -> EnrichResult<Self> {
        Ok(Self {
            config,
            resolver: VariantResolver::new(transport, &config.resolver),
            backend: build_backend(transport, &config.enrichment)?,
        })
    }

    /// Constructs a pipeline with a custom enrichment backend
    pub fn with_backend(
        transport: &'a dyn Transport,
        config: &'a Config,
        backend: Box<dyn EnrichmentBackend + 'a>,
    ) -> Self {
        Self {
            config,
            resolver: VariantResolver::new(transport, &config.resolver),
            backend,
        }
    }

    /// The resolver used for all files
    pub fn resolver(&self) -> &VariantResolver<'a> {
        &self.resolver
    }

    /// Processes every split and writes `summary.csv`
    ///
    /// Missing split directories are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns the first file system error
    pub fn run(&mut self) -> EnrichResult<Vec<SummaryRow>> {
        let config = self.config;
        let dataset = &config.dataset;
        let mut summary = Vec::new();
        for split in &dataset.splits {
            let dir = dataset.base_dir.join(split);
            if !dir.is_dir() {
                warn!("Split directory {} does not exist, skipping", dir.display());
                continue;
            }
            for file in dataset_files(&dir)? {
                summary.push(self.process_file(split, &file)?);
            }
        }

        fs::create_dir_all(&dataset.output_dir)?;
        let summary_path = dataset.output_dir.join("summary.csv");
        write_summary(&summary, &summary_path)?;
        info!(
            "Processed {} files, summary written to {}",
            summary.len(),
            summary_path.display()
        );
        Ok(summary)
    }

    /// Resolves, enriches and clusters a single SNP file
    ///
    /// A failure to render the chart is logged and does not abort the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or the results
    /// cannot be written
    pub fn process_file(&mut self, split: &str, path: &Path) -> EnrichResult<SummaryRow> {
        let config = self.config;
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Processing {split}/{stem}");

        let snps = read_snps(path, &config.dataset.snp_column)?;
        let genes = self.resolver.genes_from_snps(&snps);

        let mut table = self.backend.enrich(&genes, &config.enrichment.sources);
        table.sort_by_p_value();
        let clusters = cluster_terms(
            &mut table,
            config.enrichment.background_size,
            config.clustering.threshold,
            config.clustering.method,
        );

        let out_dir = config.dataset.output_dir.join(split);
        fs::create_dir_all(&out_dir)?;
        table.to_csv(out_dir.join(format!("{stem}_enrichment.csv")))?;

        let chart = out_dir.join(format!("{stem}_enrichment.png"));
        if let Err(err) = plot_enrichment_results(&table, &format!("{split}: {stem}"), &chart) {
            warn!("Unable to plot {}: {err}", chart.display());
        }

        let top = table.iter().next();
        Ok(SummaryRow {
            split: split.to_string(),
            file: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            snps: snps.len(),
            genes: genes.len(),
            terms: table.len(),
            clusters,
            top_term: top.map(|row| row.term_name.clone().unwrap_or_else(|| row.term_id.clone())),
            top_p_value: top.map(|row| row.p_value),
        })
    }
}
