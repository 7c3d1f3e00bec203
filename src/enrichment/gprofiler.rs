//! Client of the g:Profiler g:GOSt functional profiling service
//!
//! The service reports, per enriched term, one evidence list per query gene.
//! Non-empty evidence lists mark the query genes annotated to the term.
//! The position of each evidence list refers to the Ensembl gene IDs in
//! `meta.genes_metadata.query.<query>.ensgs`, which are mapped back
//! to the submitted gene symbols.
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::EnrichmentConfig;
use crate::enrichment::{EnrichmentBackend, EnrichmentRow, EnrichmentTable, Intersection};
use crate::transport::{RetryPolicy, Transport};
use crate::{EnrichResult, GeneSet};

#[derive(Debug, Deserialize)]
struct GostResponse {
    #[serde(default)]
    result: Vec<GostTerm>,
    #[serde(default)]
    meta: GostMeta,
}

#[derive(Debug, Deserialize)]
struct GostTerm {
    native: String,
    name: Option<String>,
    source: Option<String>,
    p_value: f64,
    #[serde(default)]
    intersections: Vec<Vec<String>>,
    query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GostMeta {
    #[serde(default)]
    genes_metadata: GenesMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct GenesMetadata {
    #[serde(default)]
    query: HashMap<String, QueryMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryMetadata {
    #[serde(default)]
    ensgs: Vec<String>,
    #[serde(default)]
    mapping: HashMap<String, Vec<String>>,
}

impl QueryMetadata {
    /// Returns the submitted symbol for every position of the `ensgs` list
    fn positional_symbols(&self) -> Vec<String> {
        let mut by_ensg: HashMap<&str, Vec<&str>> = HashMap::new();
        for (symbol, ensgs) in &self.mapping {
            for ensg in ensgs {
                by_ensg.entry(ensg.as_str()).or_default().push(symbol.as_str());
            }
        }
        self.ensgs
            .iter()
            .map(|ensg| match by_ensg.get_mut(ensg.as_str()) {
                Some(symbols) => {
                    symbols.sort_unstable();
                    symbols.join(",")
                }
                None => ensg.clone(),
            })
            .collect()
    }
}

impl GostResponse {
    fn into_table(self) -> EnrichmentTable {
        let symbols: HashMap<String, Vec<String>> = self
            .meta
            .genes_metadata
            .query
            .iter()
            .map(|(query, metadata)| (query.clone(), metadata.positional_symbols()))
            .collect();

        let mut table: EnrichmentTable = self
            .result
            .into_iter()
            .map(|term| {
                let query_symbols = term
                    .query
                    .as_ref()
                    .and_then(|query| symbols.get(query))
                    .or_else(|| symbols.values().next());
                let mut genes: GeneSet = GeneSet::new();
                if let Some(query_symbols) = query_symbols {
                    for (evidence, symbol) in term.intersections.iter().zip(query_symbols) {
                        if !evidence.is_empty() {
                            genes.extend(symbol.split(',').map(ToString::to_string));
                        }
                    }
                }
                EnrichmentRow {
                    term_id: term.native,
                    term_name: term.name,
                    source: term.source,
                    p_value: term.p_value,
                    intersection: Some(Intersection::from(&genes)),
                    cluster: None,
                }
            })
            .collect();
        table.sort_by_p_value();
        table
    }
}

/// Runs the enrichment analysis on the g:Profiler web service
///
/// # Examples
///
/// ```no_run
/// use snp_enrich::config::Config;
/// use snp_enrich::enrichment::{EnrichmentBackend, GProfiler};
/// use snp_enrich::transport::HttpTransport;
/// use snp_enrich::GeneSet;
///
/// let config = Config::default();
/// let transport = HttpTransport::new(&config.http).unwrap();
/// let gprofiler = GProfiler::new(&transport, &config.enrichment);
///
/// let genes: GeneSet = ["TP53", "CDK2", "CCNE1"].iter().map(|g| g.to_string()).collect();
/// let table = gprofiler.enrich(&genes, &config.enrichment.sources);
/// for row in &table {
///     println!("{}\t{}", row.term_id, row.p_value);
/// }
/// ```
pub struct GProfiler<'a> {
    transport: &'a dyn Transport,
    url: String,
    organism: String,
    user_threshold: f64,
    retry: RetryPolicy,
}

impl<'a> GProfiler<'a> {
    /// Constructs a new client
    pub fn new(transport: &'a dyn Transport, config: &EnrichmentConfig) -> Self {
        Self {
            transport,
            url: format!(
                "{}/api/gost/profile/",
                config.gprofiler_url.trim_end_matches('/')
            ),
            organism: config.organism.clone(),
            user_threshold: config.user_threshold,
            retry: config.retry,
        }
    }

    fn request_body(&self, genes: &GeneSet, sources: &[String]) -> serde_json::Value {
        let mut query: Vec<&str> = genes.iter().map(String::as_str).collect();
        query.sort_unstable();
        json!({
            "organism": self.organism,
            "query": query,
            "sources": sources,
            "user_threshold": self.user_threshold,
            "all_results": false,
            "ordered": false,
            "no_evidences": false,
            "no_iea": false,
            "domain_scope": "annotated",
        })
    }

    fn submit(&self, body: &serde_json::Value) -> EnrichResult<EnrichmentTable> {
        self.retry.run("g:Profiler", |_| {
            let reply = self.transport.post_json(&self.url, body)?;
            let response: GostResponse = serde_json::from_str(reply.ok_body(&self.url)?)?;
            Ok(response.into_table())
        })
    }
}

impl EnrichmentBackend for GProfiler<'_> {
    fn enrich(&self, genes: &GeneSet, sources: &[String]) -> EnrichmentTable {
        if genes.is_empty() {
            debug!("Empty gene set, skipping g:Profiler request");
            return EnrichmentTable::new();
        }
        let body = self.request_body(genes, sources);
        match self.submit(&body) {
            Ok(table) => {
                info!("g:Profiler reported {} terms for {} genes", table.len(), genes.len());
                table
            }
            Err(err) => {
                warn!("g:Profiler enrichment of {} genes failed: {err}", genes.len());
                EnrichmentTable::new()
            }
        }
    }
}
