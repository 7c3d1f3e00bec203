//! Resolves SNP identifiers (rsIDs) to gene symbols
//!
//! Lookups go to the Ensembl GRCh37 VEP endpoint first. If VEP does not
//! report any genes for the variant, or cannot be reached at all,
//! MyVariant.info is queried as a fallback. Both services are retried
//! according to the configured [`RetryPolicy`].
//!
//! Every result, including empty ones, is cached for the lifetime of the
//! [`VariantResolver`], so each SNP is looked up remotely at most once.
use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::transport::{RetryPolicy, Transport};
use crate::{EnrichResult, GeneSet};

mod myvariant;
mod vep;

/// Counters of the lookups a [`VariantResolver`] performed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStats {
    /// Lookups answered from the cache
    pub cache_hits: usize,
    /// SNPs that were looked up remotely
    pub remote_lookups: usize,
    /// Remote lookups that needed the fallback service
    pub fallback_lookups: usize,
    /// Remote lookups that did not yield any gene
    pub unresolved: usize,
}

/// Maps rsIDs to gene symbols using remote annotation services
///
/// # Examples
///
/// ```no_run
/// use snp_enrich::config::Config;
/// use snp_enrich::resolver::VariantResolver;
/// use snp_enrich::transport::HttpTransport;
///
/// let config = Config::default();
/// let transport = HttpTransport::new(&config.http).unwrap();
/// let mut resolver = VariantResolver::new(&transport, &config.resolver);
///
/// let genes = resolver.resolve("rs429358");
/// // a second lookup is served from the cache
/// assert_eq!(resolver.resolve("rs429358"), genes);
/// assert_eq!(resolver.stats().cache_hits, 1);
/// ```
pub struct VariantResolver<'a> {
    transport: &'a dyn Transport,
    vep_url: String,
    myvariant_url: String,
    retry: RetryPolicy,
    cache: HashMap<String, GeneSet>,
    stats: ResolverStats,
}

impl<'a> VariantResolver<'a> {
    /// Constructs a new resolver with an empty cache
    pub fn new(transport: &'a dyn Transport, config: &ResolverConfig) -> Self {
        Self {
            transport,
            vep_url: config.vep_url.trim_end_matches('/').to_string(),
            myvariant_url: config.myvariant_url.trim_end_matches('/').to_string(),
            retry: config.retry,
            cache: HashMap::new(),
            stats: ResolverStats::default(),
        }
    }

    /// Returns the genes associated with the SNP
    ///
    /// This method never fails. If neither service returns any genes,
    /// the result is an empty set, which is cached like any other result.
    pub fn resolve(&mut self, rsid: &str) -> GeneSet {
        if let Some(genes) = self.cache.get(rsid) {
            debug!("Cache hit for {rsid}");
            self.stats.cache_hits += 1;
            return genes.clone();
        }
        let genes = self.lookup(rsid);
        self.cache.insert(rsid.to_string(), genes.clone());
        genes
    }

    /// Returns the union of genes of all SNPs
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use snp_enrich::config::Config;
    /// use snp_enrich::resolver::VariantResolver;
    /// use snp_enrich::transport::HttpTransport;
    ///
    /// let config = Config::default();
    /// let transport = HttpTransport::new(&config.http).unwrap();
    /// let mut resolver = VariantResolver::new(&transport, &config.resolver);
    ///
    /// let genes = resolver.genes_from_snps(["rs429358", "rs7412", "rs429358"]);
    /// assert!(genes.contains("APOE"));
    /// ```
    pub fn genes_from_snps<I, S>(&mut self, snps: I) -> GeneSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut genes = GeneSet::new();
        let mut count = 0usize;
        for snp in snps {
            count += 1;
            genes.extend(self.resolve(snp.as_ref()));
        }
        info!("Resolved {} SNPs to {} genes", count, genes.len());
        genes
    }

    /// Returns the lookup counters
    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Returns the number of cached SNPs
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Removes all cached results and resets the counters
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.stats = ResolverStats::default();
    }

    fn lookup(&mut self, rsid: &str) -> GeneSet {
        self.stats.remote_lookups += 1;

        match self.fetch_vep(rsid) {
            Ok(genes) if !genes.is_empty() => return genes,
            // an empty annotation list, `[]`, also counts as "no genes" and
            // goes to the fallback
            Ok(_) => debug!("VEP did not report any genes for {rsid}"),
            Err(err) => warn!("VEP lookup of {rsid} failed: {err}"),
        }

        self.stats.fallback_lookups += 1;
        let genes = match self.fetch_myvariant(rsid) {
            Ok(genes) => genes,
            Err(err) => {
                warn!("MyVariant lookup of {rsid} failed: {err}");
                GeneSet::new()
            }
        };
        if genes.is_empty() {
            self.stats.unresolved += 1;
        }
        genes
    }

    fn fetch_vep(&self, rsid: &str) -> EnrichResult<GeneSet> {
        let url = format!(
            "{}/vep/human/id/{rsid}?content-type=application/json",
            self.vep_url
        );
        let headers = [("Content-Type", "application/json")];
        self.retry.run(&format!("VEP {rsid}"), |_| {
            let reply = self.transport.get(&url, &headers)?;
            vep::genes_from_response(reply.ok_body(&url)?)
        })
    }

    fn fetch_myvariant(&self, rsid: &str) -> EnrichResult<GeneSet> {
        let url = format!("{}/v1/variant/{rsid}?fields=gene.symbol", self.myvariant_url);
        self.retry.run(&format!("MyVariant {rsid}"), |_| {
            let reply = self.transport.get(&url, &[])?;
            myvariant::genes_from_response(reply.ok_body(&url)?)
        })
    }
}
