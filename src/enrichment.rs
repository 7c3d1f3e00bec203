//! Functional enrichment of gene sets
//!
//! An [`EnrichmentBackend`] takes a set of genes and returns an
//! [`EnrichmentTable`] with one row per enriched term. Two backends exist:
//!
//! - [`GProfiler`] submits the genes to the g:Profiler g:GOSt web service
//! - [`HypergeomEnrichment`] runs a local hypergeometric test against a
//!   [`GeneSetLibrary`] read from a GMT file
//!
//! Both backends never fail: if the analysis cannot be performed, the
//! table is empty.
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{EnrichError, EnrichResult, GeneSet};

mod gprofiler;
mod hypergeom;

pub use gprofiler::GProfiler;
pub use hypergeom::{GeneSetLibrary, GeneSetTerm, HypergeomEnrichment};

/// Performs the enrichment analysis of a gene set
pub trait EnrichmentBackend {
    /// Returns the terms that are enriched in `genes`
    ///
    /// Only terms from the requested `sources` are reported. An empty
    /// gene set always results in an empty table.
    fn enrich(&self, genes: &GeneSet, sources: &[String]) -> EnrichmentTable;
}

/// The matched genes of an enriched term
///
/// Depending on the origin of the data, genes are either
/// listed individually or as a single comma separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Intersection {
    Genes(Vec<String>),
    Delimited(String),
}

impl From<&GeneSet> for Intersection {
    fn from(genes: &GeneSet) -> Self {
        let mut genes: Vec<String> = genes.iter().cloned().collect();
        genes.sort_unstable();
        Intersection::Genes(genes)
    }
}

impl Intersection {
    /// Returns the genes as a comma separated string
    pub fn to_delimited(&self) -> String {
        match self {
            Intersection::Genes(genes) => genes.join(","),
            Intersection::Delimited(s) => s.clone(),
        }
    }
}

/// Converts the intersection field of a result row into a [`GeneSet`]
///
/// Delimited strings are split at `,`. Missing values result in an empty set.
///
/// # Examples
///
/// ```
/// use snp_enrich::enrichment::{parse_intersection, Intersection};
///
/// let delimited = Intersection::Delimited("GENE1,GENE2".to_string());
/// let genes = parse_intersection(Some(&delimited));
/// assert_eq!(genes.len(), 2);
/// assert!(genes.contains("GENE1"));
///
/// assert!(parse_intersection(None).is_empty());
///
/// let list = Intersection::Genes(vec!["GENE1".to_string()]);
/// assert_eq!(parse_intersection(Some(&list)).len(), 1);
/// ```
pub fn parse_intersection(value: Option<&Intersection>) -> GeneSet {
    match value {
        Some(Intersection::Delimited(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|gene| !gene.is_empty())
            .map(ToString::to_string)
            .collect(),
        Some(Intersection::Genes(genes)) => genes.iter().cloned().collect(),
        None => GeneSet::new(),
    }
}

/// A single enriched term
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentRow {
    /// Identifier of the term, e.g. `GO:0008150` or `KEGG:04110`
    pub term_id: String,
    /// Name of the term
    pub term_name: Option<String>,
    /// The annotation source, e.g. `GO:BP` or `KEGG`
    pub source: Option<String>,
    pub p_value: f64,
    /// Genes of the query that are annotated to the term
    pub intersection: Option<Intersection>,
    /// Label assigned by [`crate::stats::cluster_terms`]
    pub cluster: Option<usize>,
}

impl EnrichmentRow {
    /// Constructs a new row without source and cluster
    pub fn new(term_id: &str, term_name: &str, p_value: f64, intersection: Intersection) -> Self {
        Self {
            term_id: term_id.to_string(),
            term_name: Some(term_name.to_string()),
            source: None,
            p_value,
            intersection: Some(intersection),
            cluster: None,
        }
    }

    /// Returns the matched genes of the term
    pub fn genes(&self) -> GeneSet {
        parse_intersection(self.intersection.as_ref())
    }

    /// Returns `-log10(p_value)`
    ///
    /// p-values of 0 are clamped to the smallest positive `f64`
    pub fn neg_log10_p(&self) -> f64 {
        -self.p_value.max(f64::MIN_POSITIVE).log10()
    }
}

/// Flat representation of an [`EnrichmentRow`] for CSV output
#[derive(Debug, Serialize)]
struct CsvRecord {
    term_id: String,
    term_name: Option<String>,
    source: Option<String>,
    p_value: f64,
    intersection: Option<String>,
    cluster: Option<usize>,
}

/// Positions of the known columns in the header of a result table
///
/// Several column names are accepted for some fields. If more than one is
/// present, the first name in the list wins.
#[derive(Debug)]
struct Columns {
    term_id: usize,
    term_name: Option<usize>,
    source: Option<usize>,
    p_value: usize,
    intersection: Option<usize>,
    cluster: Option<usize>,
}

impl Columns {
    const TERM_ID: [&'static str; 2] = ["term_id", "native"];
    const TERM_NAME: [&'static str; 2] = ["term_name", "name"];
    const INTERSECTION: [&'static str; 2] = ["intersection", "intersections"];

    fn from_headers(headers: &csv::StringRecord) -> EnrichResult<Self> {
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| headers.iter().position(|header| header.trim() == *name))
        };
        let required = |names: &[&str]| {
            find(names).ok_or_else(|| {
                EnrichError::Table(format!("missing column {}", names.join(" or ")))
            })
        };
        Ok(Self {
            term_id: required(&Self::TERM_ID[..])?,
            term_name: find(&Self::TERM_NAME[..]),
            source: find(&["source"][..]),
            p_value: required(&["p_value"][..])?,
            intersection: find(&Self::INTERSECTION[..]),
            cluster: find(&["cluster"][..]),
        })
    }

    fn row(&self, record: &csv::StringRecord) -> EnrichResult<EnrichmentRow> {
        let line = record.position().map_or(0, csv::Position::line);
        let field = |idx: Option<usize>| {
            idx.and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let term_id = field(Some(self.term_id))
            .ok_or_else(|| EnrichError::Table(format!("missing term_id in line {line}")))?;
        let p_value = field(Some(self.p_value))
            .and_then(|value| value.parse::<f64>().ok())
            .ok_or_else(|| EnrichError::Table(format!("invalid p_value in line {line}")))?;
        let cluster = match field(self.cluster) {
            Some(value) => Some(value.parse::<usize>().map_err(|_| {
                EnrichError::Table(format!("invalid cluster {value} in line {line}"))
            })?),
            None => None,
        };

        Ok(EnrichmentRow {
            term_id: term_id.to_string(),
            term_name: field(self.term_name).map(ToString::to_string),
            source: field(self.source).map(ToString::to_string),
            p_value,
            intersection: field(self.intersection)
                .map(|genes| Intersection::Delimited(genes.to_string())),
            cluster,
        })
    }
}

impl From<&EnrichmentRow> for CsvRecord {
    fn from(row: &EnrichmentRow) -> Self {
        Self {
            term_id: row.term_id.clone(),
            term_name: row.term_name.clone(),
            source: row.source.clone(),
            p_value: row.p_value,
            intersection: row.intersection.as_ref().map(Intersection::to_delimited),
            cluster: row.cluster,
        }
    }
}

/// The result of an enrichment analysis
///
/// # Examples
///
/// ```
/// use snp_enrich::enrichment::{EnrichmentRow, EnrichmentTable, Intersection};
///
/// let mut table = EnrichmentTable::default();
/// let genes = Intersection::Delimited("A,B".to_string());
/// table.push(EnrichmentRow::new("GO:1", "first", 0.01, genes));
/// let genes = Intersection::Delimited("B".to_string());
/// table.push(EnrichmentRow::new("GO:2", "second", 0.0001, genes));
///
/// let top = table.top(1);
/// assert_eq!(top[0].term_id, "GO:2");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentTable {
    rows: Vec<EnrichmentRow>,
}

impl EnrichmentTable {
    /// Constructs a new, empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row to the table
    pub fn push(&mut self, row: EnrichmentRow) {
        self.rows.push(row);
    }

    /// Returns the number of terms
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table does not contain any terms
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over all rows
    pub fn iter(&self) -> std::slice::Iter<'_, EnrichmentRow> {
        self.rows.iter()
    }

    /// Returns an iterator of mutable rows
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, EnrichmentRow> {
        self.rows.iter_mut()
    }

    /// Returns `true` if at least one row has a term name
    pub fn has_term_names(&self) -> bool {
        self.rows.iter().any(|row| row.term_name.is_some())
    }

    /// Sorts the rows by ascending p-value
    pub fn sort_by_p_value(&mut self) {
        self.rows.sort_by(|a, b| a.p_value.total_cmp(&b.p_value));
    }

    /// Returns the `n` most significant rows, ascending by p-value
    pub fn top(&self, n: usize) -> Vec<&EnrichmentRow> {
        let mut rows: Vec<&EnrichmentRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.p_value.total_cmp(&b.p_value));
        rows.truncate(n);
        rows
    }

    /// Returns the matched genes of every row, in table order
    pub fn gene_sets(&self) -> Vec<GeneSet> {
        self.rows.iter().map(EnrichmentRow::genes).collect()
    }

    /// Returns the number of distinct cluster labels
    pub fn cluster_count(&self) -> usize {
        let mut labels: Vec<usize> = self.rows.iter().filter_map(|row| row.cluster).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    /// Reads a table from CSV data
    ///
    /// The term ID is read from a `term_id` or `native` column, the term
    /// name from a `term_name` or `name` column and the intersection from
    /// an `intersection` or `intersections` column. If both alternatives
    /// exist, the first one is used. Empty cells are treated as missing.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Table`] if the `p_value` or term ID column is
    /// missing or holds invalid values, and [`EnrichError::Csv`] for
    /// malformed CSV
    pub fn from_reader<R: Read>(reader: R) -> EnrichResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns = Columns::from_headers(reader.headers()?)?;
        let mut table = Self::new();
        for record in reader.records() {
            table.push(columns.row(&record?)?);
        }
        Ok(table)
    }

    /// Reads a table from a CSV file, see [`EnrichmentTable::from_reader`]
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_csv<P: AsRef<Path>>(path: P) -> EnrichResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Writes the table as CSV
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails
    pub fn to_writer<W: Write>(&self, writer: W) -> EnrichResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(CsvRecord::from(row))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the table to a CSV file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> EnrichResult<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)
    }
}

impl FromIterator<EnrichmentRow> for EnrichmentTable {
    fn from_iter<T: IntoIterator<Item = EnrichmentRow>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EnrichmentTable {
    type Item = &'a EnrichmentRow;
    type IntoIter = std::slice::Iter<'a, EnrichmentRow>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for EnrichmentTable {
    type Item = EnrichmentRow;
    type IntoIter = std::vec::IntoIter<EnrichmentRow>;
    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
