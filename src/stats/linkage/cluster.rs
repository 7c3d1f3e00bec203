//! A single merge step of a [`Linkage`](`crate::stats::Linkage`)
//!
//! A cluster joins two nodes, which are either terms or other clusters.

/// A combination of 2 nodes of the dendrogram
///
/// This `struct` is yielded by the [`Linkage::cluster`](`crate::stats::Linkage::cluster`) iterator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cluster {
    idx1: usize,
    idx2: usize,
    distance: f64,
    size: usize,
}

impl Cluster {
    /// Creates a new `Cluster`
    pub(super) fn new(idx1: usize, idx2: usize, distance: f64, size: usize) -> Self {
        Self {
            idx1,
            idx2,
            distance,
            size,
        }
    }

    /// Returns the index of the left hand side node
    pub fn lhs(&self) -> usize {
        self.idx1
    }

    /// Returns the index of the right hand side node
    pub fn rhs(&self) -> usize {
        self.idx2
    }

    /// Returns the distance of the two nodes
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Returns the total number of terms in the cluster
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.size
    }
}
