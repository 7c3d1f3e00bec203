//! Local over-representation analysis using the hypergeometric distribution
//!
//! This backend works without network access. The gene sets are read from a
//! GMT file, with one term per line:
//!
//! ```text
//! KEGG:04110<TAB>Cell cycle<TAB>CDK2<TAB>CDK6<TAB>TP53
//! ```
//!
//! The source of a term is the prefix of its ID (`KEGG` above). A requested
//! source such as `GO:BP` selects all terms with the prefix `GO`.
use std::path::Path;

use statrs::distribution::{DiscreteCDF, Hypergeometric};
use tracing::{debug, info};

use crate::enrichment::{EnrichmentBackend, EnrichmentRow, EnrichmentTable, Intersection};
use crate::{f64_from_usize, EnrichError, EnrichResult, GeneSet};

/// A single annotated term of a [`GeneSetLibrary`]
#[derive(Debug, Clone)]
pub struct GeneSetTerm {
    id: String,
    name: String,
    source: String,
    genes: GeneSet,
}

impl GeneSetTerm {
    /// The term ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The name or description of the term
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The annotation source, derived from the ID prefix
    pub fn source(&self) -> &str {
        &self.source
    }

    /// All genes annotated to the term
    pub fn genes(&self) -> &GeneSet {
        &self.genes
    }

    /// Returns `true` if the term belongs to one of the `sources`
    ///
    /// An empty list of sources matches every term
    fn is_in(&self, sources: &[String]) -> bool {
        sources.is_empty()
            || sources.iter().any(|source| {
                source == &self.source || source.split(':').next() == Some(self.source.as_str())
            })
    }
}

/// A collection of annotated gene sets
#[derive(Debug, Clone, Default)]
pub struct GeneSetLibrary {
    terms: Vec<GeneSetTerm>,
}

impl GeneSetLibrary {
    /// Parses a library in GMT format
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Library`] if a line does not contain
    /// at least an ID and a description
    pub fn from_gmt_str(content: &str) -> EnrichResult<Self> {
        let mut terms = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let id = fields.next().map(str::trim).unwrap_or_default();
            let name = fields.next().map(str::trim).ok_or_else(|| {
                EnrichError::Library(format!("line {} has no description", line_no + 1))
            })?;
            if id.is_empty() {
                return Err(EnrichError::Library(format!(
                    "line {} has no term ID",
                    line_no + 1
                )));
            }
            let source = match id.split_once(':') {
                Some((prefix, _)) => prefix.to_string(),
                None => "GMT".to_string(),
            };
            let genes: GeneSet = fields
                .map(str::trim)
                .filter(|gene| !gene.is_empty())
                .map(ToString::to_string)
                .collect();
            terms.push(GeneSetTerm {
                id: id.to_string(),
                name: name.to_string(),
                source,
                genes,
            });
        }
        Ok(Self { terms })
    }

    /// Reads a GMT file, see [`GeneSetLibrary::from_gmt_str`]
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid
    pub fn from_gmt_file<P: AsRef<Path>>(path: P) -> EnrichResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let library = Self::from_gmt_str(&content)?;
        info!("Loaded gene set library with {} terms", library.len());
        Ok(library)
    }

    /// Returns the number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the library does not contain any terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns an iterator of all terms
    pub fn iter(&self) -> std::slice::Iter<'_, GeneSetTerm> {
        self.terms.iter()
    }
}

/// Hypergeometric enrichment against a local [`GeneSetLibrary`]
///
/// p-values are calculated as `P(X >= k)` for the number of query genes `k`
/// annotated to a term and Bonferroni-adjusted by the number of tested terms.
///
/// # Examples
///
/// ```
/// use snp_enrich::enrichment::{EnrichmentBackend, GeneSetLibrary, HypergeomEnrichment};
/// use snp_enrich::GeneSet;
///
/// let library = GeneSetLibrary::from_gmt_str(
///     "KEGG:04110\tCell cycle\tCDK2\tCDK6\tCCNE1\tTP53\n\
///      KEGG:04010\tMAPK signaling\tKRAS\tBRAF\tMAP2K1\n"
/// ).unwrap();
/// let backend = HypergeomEnrichment::new(library, 20_000, 0.05);
///
/// let genes: GeneSet = ["CDK2", "CDK6", "TP53"].iter().map(|g| g.to_string()).collect();
/// let table = backend.enrich(&genes, &[]);
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.iter().next().unwrap().term_id, "KEGG:04110");
/// ```
pub struct HypergeomEnrichment {
    library: GeneSetLibrary,
    background_size: u64,
    threshold: f64,
}

impl HypergeomEnrichment {
    /// Constructs a new backend
    ///
    /// `threshold` is the maximum adjusted p-value of reported terms
    pub fn new(library: GeneSetLibrary, background_size: u64, threshold: f64) -> Self {
        Self {
            library,
            background_size,
            threshold,
        }
    }

    /// Returns the unadjusted p-value `P(X >= observed)`
    fn pvalue(&self, term_size: u64, query_size: u64, observed: u64) -> EnrichResult<f64> {
        let population = self.background_size.max(term_size).max(query_size);
        let hyper = Hypergeometric::new(
            // Number of genes in the genome
            // ==> population
            population,
            // Number of genes annotated to the term
            // ==> successes
            term_size,
            // Number of genes in the query
            // ==> draws
            query_size,
        )
        .map_err(|err| EnrichError::Stats(err.to_string()))?;
        // subtracting 1, because we want to test including observed
        // e.g. "7 or more", but sf by default calculates "more than 7"
        Ok(hyper.sf(observed - 1))
    }
}

impl EnrichmentBackend for HypergeomEnrichment {
    fn enrich(&self, genes: &GeneSet, sources: &[String]) -> EnrichmentTable {
        let mut table = EnrichmentTable::new();
        if genes.is_empty() {
            return table;
        }
        let query_size = genes.len() as u64;
        let tested: Vec<&GeneSetTerm> = self
            .library
            .iter()
            .filter(|term| term.is_in(sources) && !term.genes.is_empty())
            .collect();
        let tests = f64_from_usize(tested.len());

        for term in tested {
            let overlap: GeneSet = term.genes.intersection(genes).cloned().collect();
            if overlap.is_empty() {
                continue;
            }
            let term_size = term.genes.len() as u64;
            let pvalue = match self.pvalue(term_size, query_size, overlap.len() as u64) {
                Ok(pvalue) => pvalue,
                Err(err) => {
                    debug!("Skipping {}: {err}", term.id);
                    continue;
                }
            };
            let adjusted = (pvalue * tests).min(1.0);
            debug!(
                "Term:{}\tPopulation: {}, Successes: {}, Draws: {}, Observed: {}, p: {}",
                term.id,
                self.background_size,
                term.genes.len(),
                query_size,
                overlap.len(),
                adjusted
            );
            if adjusted > self.threshold {
                continue;
            }
            table.push(EnrichmentRow {
                term_id: term.id.clone(),
                term_name: Some(term.name.clone()),
                source: Some(term.source.clone()),
                p_value: adjusted,
                intersection: Some(Intersection::from(&overlap)),
                cluster: None,
            });
        }
        table.sort_by_p_value();
        info!("{} of {} terms are enriched", table.len(), self.library.len());
        table
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GMT: &str = "KEGG:04110\tCell cycle\tCDK2\tCDK6\tCCNE1\tTP53\tRB1\n\
                       KEGG:04010\tMAPK signaling\tKRAS\tBRAF\tMAP2K1\n\
                       GO:0006915\tapoptotic process\tTP53\tBAX\tCASP3\n\
                       \n\
                       CUSTOM1\tno prefix\tTP53\n";

    fn genes(symbols: &[&str]) -> GeneSet {
        symbols.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parse_gmt() {
        let library = GeneSetLibrary::from_gmt_str(GMT).unwrap();
        assert_eq!(library.len(), 4);
        let terms: Vec<&GeneSetTerm> = library.iter().collect();
        assert_eq!(terms[0].source(), "KEGG");
        assert_eq!(terms[0].name(), "Cell cycle");
        assert_eq!(terms[0].genes().len(), 5);
        assert_eq!(terms[2].source(), "GO");
        assert_eq!(terms[3].source(), "GMT");
    }

    #[test]
    fn invalid_gmt() {
        assert!(matches!(
            GeneSetLibrary::from_gmt_str("KEGG:1"),
            Err(EnrichError::Library(_))
        ));
        assert!(GeneSetLibrary::from_gmt_str("\tname\tA").is_err());
    }

    #[test]
    fn source_selection() {
        let library = GeneSetLibrary::from_gmt_str(GMT).unwrap();
        let terms: Vec<&GeneSetTerm> = library.iter().collect();
        assert!(terms[2].is_in(&["GO:BP".to_string()]));
        assert!(!terms[0].is_in(&["GO:BP".to_string()]));
        assert!(terms[0].is_in(&[]));
    }

    #[test]
    fn enriched_terms() {
        let library = GeneSetLibrary::from_gmt_str(GMT).unwrap();
        let backend = HypergeomEnrichment::new(library, 20_000, 0.05);
        let table = backend.enrich(&genes(&["CDK2", "CDK6", "TP53", "BAX"]), &[]);

        let ids: Vec<&str> = table.iter().map(|row| row.term_id.as_str()).collect();
        assert_eq!(ids[0], "KEGG:04110");
        assert!(ids.contains(&"GO:0006915"));
        assert!(!ids.contains(&"KEGG:04010"));

        let first = table.iter().next().unwrap();
        assert_eq!(first.genes(), genes(&["CDK2", "CDK6", "TP53"]));
        assert!(first.p_value < 1e-6);
    }

    #[test]
    fn only_requested_sources() {
        let library = GeneSetLibrary::from_gmt_str(GMT).unwrap();
        let backend = HypergeomEnrichment::new(library, 20_000, 1.0);
        let table = backend.enrich(&genes(&["CDK2", "TP53"]), &["GO:BP".to_string()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().unwrap().term_id, "GO:0006915");
    }

    #[test]
    fn empty_query() {
        let library = GeneSetLibrary::from_gmt_str(GMT).unwrap();
        let backend = HypergeomEnrichment::new(library, 20_000, 1.0);
        assert!(backend.enrich(&GeneSet::new(), &[]).is_empty());
    }

    #[test]
    fn pvalue_single_overlap() {
        let backend = HypergeomEnrichment::new(GeneSetLibrary::default(), 100, 1.0);
        // P(X >= 1) with 1 success in 100, drawing 1
        let p = backend.pvalue(1, 1, 1).unwrap();
        assert!((p - 0.01).abs() < 1e-9);
    }
}
