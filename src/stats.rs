//! Similarity of enriched terms and clustering of redundant terms
//!
//! Enrichment analyses often report many terms that describe the same
//! biology and share most of their genes. Terms are compared pairwise using
//! a kappa statistic on their matched genes, relative to the whole genome
//! background. The resulting [`KappaMatrix`] is converted to distances
//! (`1 - kappa`) and used for [hierarchical clustering](`Linkage`).
//!
//! Terms in the same cluster are considered functionally redundant.
//!
//! # Examples
//!
//! ```
//! use snp_enrich::enrichment::{EnrichmentRow, EnrichmentTable, Intersection};
//! use snp_enrich::stats::{cluster_terms, Method};
//!
//! let mut table = EnrichmentTable::new();
//! for (id, genes) in [("A", "TP53,CDK2,CDK6"), ("B", "TP53,CDK2,CDK6"), ("C", "KRAS,BRAF")] {
//!     table.push(EnrichmentRow::new(id, id, 0.01, Intersection::Delimited(genes.to_string())));
//! }
//!
//! let clusters = cluster_terms(&mut table, 20_000, 0.65, Method::Average);
//! assert_eq!(clusters, 2);
//! let labels: Vec<usize> = table.iter().filter_map(|row| row.cluster).collect();
//! assert_eq!(labels, vec![1, 1, 2]);
//! ```

use tracing::debug;

use crate::enrichment::EnrichmentTable;
use crate::matrix::SquareMatrix;
use crate::utils::Combinations;
use crate::{f64_from_u64, f64_from_usize, GeneSet};

mod linkage;
pub use linkage::cluster;
pub use linkage::{Linkage, Method};

/// Calculates the kappa agreement of two gene sets
///
/// Both sets are treated as annotations of the `total` genes of the
/// background. Kappa is `1` for identical sets, around `0` for an
/// overlap expected by chance and negative for less overlap than expected.
///
/// If the expected agreement is `1`, e.g. because both sets are empty,
/// the score is defined as `0`.
///
/// # Examples
///
/// ```
/// use snp_enrich::stats::kappa;
/// use snp_enrich::GeneSet;
///
/// let a: GeneSet = ["TP53".to_string()].into();
/// assert!((kappa(&a, &a, 20_000) - 1.0).abs() < 1e-9);
/// assert_eq!(kappa(&GeneSet::new(), &GeneSet::new(), 20_000), 0.0);
/// ```
pub fn kappa(set_a: &GeneSet, set_b: &GeneSet, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total_f = f64_from_u64(total);
    let size_a = f64_from_usize(set_a.len());
    let size_b = f64_from_usize(set_b.len());

    let n11 = f64_from_usize(set_a.intersection(set_b).count());
    let union = size_a + size_b - n11;
    let n00 = total_f - union;

    let observed = (n11 + n00) / total_f;
    let expected = (size_a / total_f * size_b / total_f)
        + ((total_f - size_a) / total_f * (total_f - size_b) / total_f);

    if 1.0 - expected == 0.0 {
        0.0
    } else {
        (observed - expected) / (1.0 - expected)
    }
}

/// Symmetric matrix of pairwise [`kappa`] scores
///
/// The diagonal holds the kappa score of each set with itself,
/// which is `1` for every non-empty set.
#[derive(Debug)]
pub struct KappaMatrix {
    scores: SquareMatrix<f64>,
}

impl KappaMatrix {
    /// Calculates the scores of all pairs of `sets`
    pub fn new(sets: &[GeneSet], total: u64) -> Self {
        let mut scores = SquareMatrix::new(sets.len());
        for (idx, set) in sets.iter().enumerate() {
            scores.set_symmetric(idx, idx, kappa(set, set, total));
        }
        for (idx1, idx2) in Combinations::new(sets.len()) {
            scores.set_symmetric(idx1, idx2, kappa(&sets[idx1], &sets[idx2], total));
        }
        Self { scores }
    }

    /// Returns the kappa score of the terms `idx1` and `idx2`
    ///
    /// # Panics
    ///
    /// Panics if one of the indices is out of bounds
    pub fn get(&self, idx1: usize, idx2: usize) -> f64 {
        self.scores.get(idx1, idx2)
    }

    /// Returns the distance `1 - kappa` of the terms `idx1` and `idx2`
    ///
    /// # Panics
    ///
    /// Panics if one of the indices is out of bounds
    pub fn distance(&self, idx1: usize, idx2: usize) -> f64 {
        1.0 - self.get(idx1, idx2)
    }

    /// The number of terms
    pub fn len(&self) -> usize {
        self.scores.dim()
    }

    /// Returns `true` if the matrix does not contain any terms
    pub fn is_empty(&self) -> bool {
        self.scores.dim() == 0
    }

    /// Iterates the rows of the matrix
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.scores.rows()
    }
}

/// Clusters the terms of `table` and stores the cluster label in each row
///
/// The dendrogram is cut at the distance `threshold` (`1 - kappa`), so
/// a threshold of `0.65` joins terms with a kappa of at least `0.35`.
/// Returns the number of clusters.
pub fn cluster_terms(
    table: &mut EnrichmentTable,
    total: u64,
    threshold: f64,
    method: Method,
) -> usize {
    if table.is_empty() {
        return 0;
    }
    let kappas = KappaMatrix::new(&table.gene_sets(), total);
    let linkage = Linkage::new(kappas.len(), method, |idx1, idx2| kappas.distance(idx1, idx2));
    let labels = linkage.fcluster(threshold);
    let count = labels.iter().max().copied().unwrap_or_default();
    for (row, label) in table.iter_mut().zip(labels) {
        row.cluster = Some(label);
    }
    debug!("Clustered {} terms into {count} clusters", table.len());
    count
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::enrichment::{EnrichmentRow, Intersection};

    fn set(genes: &[&str]) -> GeneSet {
        genes.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn kappa_empty_sets() {
        assert_eq!(kappa(&set(&[]), &set(&[]), 20_000), 0.0);
    }

    #[test]
    fn kappa_zero_background() {
        assert_eq!(kappa(&set(&["A"]), &set(&["A"]), 0), 0.0);
    }

    #[test]
    fn kappa_identical() {
        let a = set(&["TP53"]);
        assert!((kappa(&a, &a, 20_000) - 1.0).abs() < 1e-9);
        let b = set(&["TP53", "CDK2", "CDK6"]);
        assert!((kappa(&b, &b, 20_000) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn kappa_disjoint() {
        let score = kappa(&set(&["A", "B"]), &set(&["C", "D"]), 20_000);
        assert!(score < 0.0);
        assert!(score > -0.01);
    }

    #[test]
    fn kappa_partial_overlap() {
        let a = set(&["A", "B", "C", "D"]);
        let b = set(&["A", "B", "C", "E"]);
        let score = kappa(&a, &b, 100);
        // Po = 0.98, Pe = 0.04 * 0.04 + 0.96 * 0.96 = 0.9232
        let expected = (0.98 - 0.9232) / (1.0 - 0.9232);
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn kappa_symmetric() {
        let a = set(&["A", "B", "C"]);
        let b = set(&["B", "X"]);
        assert!((kappa(&a, &b, 50) - kappa(&b, &a, 50)).abs() < f64::EPSILON);
    }

    #[test]
    fn matrix() {
        let sets = vec![set(&["A", "B"]), set(&["A", "B"]), set(&[])];
        let m = KappaMatrix::new(&sets, 1000);
        assert_eq!(m.len(), 3);
        assert!((m.get(0, 0) - 1.0).abs() < 1e-9);
        assert!((m.get(0, 1) - 1.0).abs() < 1e-9);
        assert!((m.get(1, 0) - m.get(0, 1)).abs() < f64::EPSILON);
        assert_eq!(m.get(2, 2), 0.0);
        assert!(m.distance(0, 1).abs() < 1e-9);
        assert_eq!(m.rows().count(), 3);
    }

    #[test]
    fn cluster_table() {
        let mut table = EnrichmentTable::new();
        let terms = [
            ("T1", "A,B,C,D"),
            ("T2", "X,Y,Z"),
            ("T3", "A,B,C"),
            ("T4", "X,Y,Z,W"),
            ("T5", "Q"),
        ];
        for (id, genes) in terms {
            table.push(EnrichmentRow::new(
                id,
                id,
                0.001,
                Intersection::Delimited(genes.to_string()),
            ));
        }
        let count = cluster_terms(&mut table, 20_000, 0.65, Method::Average);
        assert_eq!(count, 3);
        let labels: Vec<usize> = table.iter().filter_map(|row| row.cluster).collect();
        assert_eq!(labels, vec![1, 2, 1, 2, 3]);
        assert_eq!(table.cluster_count(), 3);
    }

    #[test]
    fn cluster_empty_table() {
        let mut table = EnrichmentTable::new();
        assert_eq!(cluster_terms(&mut table, 20_000, 0.65, Method::Average), 0);
    }

    #[test]
    fn cluster_single_term() {
        let mut table = EnrichmentTable::new();
        table.push(EnrichmentRow::new("T", "t", 0.1, Intersection::Delimited("A".to_string())));
        assert_eq!(cluster_terms(&mut table, 20_000, 0.65, Method::Single), 1);
        assert_eq!(table.iter().next().unwrap().cluster, Some(1));
    }
}
