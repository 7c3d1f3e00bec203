use std::cmp::Ordering;
use std::collections::hash_map;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::f64_from_usize;
use crate::utils::Combinations;
pub mod cluster;

use cluster::Cluster;

/// Distances between all active nodes, keyed by `(lower index, higher index)`
#[derive(Debug, Default)]
struct DistanceMatrix(HashMap<(usize, usize), f64>);

impl DistanceMatrix {
    fn iter(&self) -> hash_map::Iter<'_, (usize, usize), f64> {
        self.0.iter()
    }

    fn insert(&mut self, idx1: usize, idx2: usize, v: f64) -> Option<f64> {
        self.0.insert(key(idx1, idx2), v)
    }

    fn get(&self, idx1: usize, idx2: usize) -> Option<f64> {
        self.0.get(&key(idx1, idx2)).copied()
    }

    fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&(usize, usize), &mut f64) -> bool,
    {
        self.0.retain(f);
    }

    /// Returns the pair with the smallest distance
    ///
    /// Ties are broken by the lower pair of indices
    fn closest(&self) -> Option<((usize, usize), f64)> {
        self.iter()
            .min_by(|a, b| a.1.total_cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(key, dist)| (*key, *dist))
    }
}

fn key(idx1: usize, idx2: usize) -> (usize, usize) {
    match idx1.cmp(&idx2) {
        Ordering::Greater => (idx2, idx1),
        _ => (idx1, idx2),
    }
}

/// How the distance between two clusters is derived from their members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Distance of the closest pair of members
    Single,
    /// Distance of the most distant pair of members
    Complete,
    /// Mean distance of all pairs of members (UPGMA)
    #[default]
    Average,
}

impl Method {
    /// Lance-Williams update of the distance from a merged cluster to
    /// another cluster, given the distances of both merged parts
    fn combine(self, dist1: f64, size1: usize, dist2: f64, size2: usize) -> f64 {
        match self {
            Method::Single => dist1.min(dist2),
            Method::Complete => dist1.max(dist2),
            Method::Average => {
                let size1 = f64_from_usize(size1);
                let size2 = f64_from_usize(size2);
                (size1 * dist1 + size2 * dist2) / (size1 + size2)
            }
        }
    }
}

/// Hierarchical clustering of terms
///
/// Nodes `0..n` are the input terms. Every merge creates a new node,
/// the `i`-th merge has the index `n + i`, so the result can be read like
/// a linkage matrix of other tools.
///
/// # Examples
///
/// ```rust
/// use snp_enrich::stats::{Linkage, Method};
///
/// let distances = [
///     [0.0, 0.1, 0.9],
///     [0.1, 0.0, 0.8],
///     [0.9, 0.8, 0.0],
/// ];
///
/// let linkage = Linkage::new(3, Method::Single, |a, b| distances[a][b]);
/// let mut cluster = linkage.cluster();
/// let first = cluster.next().unwrap();
/// assert_eq!((first.lhs(), first.rhs(), first.len()), (0, 1, 2));
/// let second = cluster.next().unwrap();
/// assert_eq!((second.lhs(), second.rhs(), second.len()), (2, 3, 3));
/// assert!((second.distance() - 0.8).abs() < 1e-9);
/// assert!(cluster.next().is_none());
///
/// assert_eq!(linkage.fcluster(0.5), vec![1, 1, 2]);
/// ```
pub struct Linkage {
    /// Number of members of each node, `None` once the node has been merged
    sizes: Vec<Option<usize>>,
    distance_matrix: DistanceMatrix,
    initial_len: usize,
    method: Method,
    clusters: Vec<Cluster>,
}

impl Linkage {
    /// Performs hierarchical clustering of `len` terms
    ///
    /// `distance` returns the distance between the terms at two indices.
    /// It is called once for every pair.
    pub fn new<F>(len: usize, method: Method, distance: F) -> Self
    where
        F: Fn(usize, usize) -> f64,
    {
        let mut s = Self {
            sizes: vec![Some(1); len],
            distance_matrix: DistanceMatrix::default(),
            initial_len: len,
            method,
            clusters: Vec::with_capacity(len.saturating_sub(1)),
        };
        for (idx1, idx2) in Combinations::new(len) {
            s.distance_matrix.insert(idx1, idx2, distance(idx1, idx2));
        }
        s.next_clusters();
        s
    }

    /// Returns an Iterator of [`Cluster`] references, in the order of merging
    pub fn cluster(&self) -> std::slice::Iter<'_, Cluster> {
        self.clusters.iter()
    }

    /// Returns the number of terms that were clustered
    pub fn len(&self) -> usize {
        self.initial_len
    }

    /// Returns `true` if no terms were clustered
    pub fn is_empty(&self) -> bool {
        self.initial_len == 0
    }

    /// Returns the order of the input terms in the final dendrogram
    ///
    /// Terms that are never merged (only possible with a single term)
    /// are appended at the end.
    pub fn indices(&self) -> Vec<usize> {
        fn leaves(linkage: &Linkage, node: usize, res: &mut Vec<usize>) {
            if node < linkage.initial_len {
                res.push(node);
            } else {
                let cluster = &linkage.clusters[node - linkage.initial_len];
                leaves(linkage, cluster.lhs(), res);
                leaves(linkage, cluster.rhs(), res);
            }
        }

        let mut res = Vec::with_capacity(self.initial_len);
        match self.clusters.len() {
            0 => res.extend(0..self.initial_len),
            n => leaves(self, self.initial_len + n - 1, &mut res),
        }
        res
    }

    /// Assigns a flat cluster label to every term
    ///
    /// Terms are in the same cluster if they are connected through merges with
    /// a distance of at most `threshold`. Labels start at `1` and are numbered
    /// in the order in which they first appear in the input.
    pub fn fcluster(&self, threshold: f64) -> Vec<usize> {
        let mut parents: Vec<usize> = (0..self.initial_len + self.clusters.len()).collect();

        fn root(parents: &[usize], mut node: usize) -> usize {
            while parents[node] != node {
                node = parents[node];
            }
            node
        }

        for (idx, cluster) in self.clusters.iter().enumerate() {
            if cluster.distance() <= threshold {
                let node = self.initial_len + idx;
                let lhs = root(&parents, cluster.lhs());
                let rhs = root(&parents, cluster.rhs());
                parents[lhs] = node;
                parents[rhs] = node;
            }
        }

        let mut labels: HashMap<usize, usize> = HashMap::new();
        (0..self.initial_len)
            .map(|term| {
                let next = labels.len() + 1;
                *labels.entry(root(&parents, term)).or_insert(next)
            })
            .collect()
    }

    /// Iteratively clusters all nodes until only one is left
    ///
    /// - Finds the 2 nodes with smallest distance
    /// - inactivates them and creates a new, merged node
    /// - calculates the distance between the new node and all other active nodes
    /// - appends the `DistanceMatrix` with new distances
    fn next_clusters(&mut self) {
        while let Some(((idx1, idx2), dist)) = self.distance_matrix.closest() {
            let size1 = self.sizes[idx1].take().unwrap_or_default();
            let size2 = self.sizes[idx2].take().unwrap_or_default();
            let new_idx = self.sizes.len();
            self.sizes.push(Some(size1 + size2));
            self.clusters
                .push(Cluster::new(idx1, idx2, dist, size1 + size2));

            // distances from the merged node to all remaining active nodes
            let updates: Vec<(usize, f64)> = self
                .sizes
                .iter()
                .enumerate()
                .take(new_idx)
                .filter(|(_, size)| size.is_some())
                .filter_map(|(other, _)| {
                    let dist1 = self.distance_matrix.get(idx1, other)?;
                    let dist2 = self.distance_matrix.get(idx2, other)?;
                    Some((other, self.method.combine(dist1, size1, dist2, size2)))
                })
                .collect();

            // remove all distance scores that include one of the 2 merged nodes
            self.distance_matrix.retain(|(a, b), _| {
                a != &idx1 && a != &idx2 && b != &idx1 && b != &idx2
            });

            for (other, dist) in updates {
                self.distance_matrix.insert(other, new_idx, dist);
            }
        }
    }
}

impl<'a> IntoIterator for &'a Linkage {
    type Item = &'a Cluster;
    type IntoIter = std::slice::Iter<'a, Cluster>;
    fn into_iter(self) -> Self::IntoIter {
        self.cluster()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // 4 points on a line: 0, 1, 5, 11
    fn line_distance(a: usize, b: usize) -> f64 {
        let pos = [0.0, 1.0, 5.0, 11.0];
        f64::abs(pos[a] - pos[b])
    }

    #[test]
    fn single() {
        let linkage = Linkage::new(4, Method::Single, line_distance);
        let clusters: Vec<&Cluster> = linkage.cluster().collect();
        assert_eq!(clusters.len(), 3);
        assert_eq!((clusters[0].lhs(), clusters[0].rhs()), (0, 1));
        assert!((clusters[0].distance() - 1.0).abs() < 1e-9);
        assert_eq!((clusters[1].lhs(), clusters[1].rhs()), (2, 4));
        assert!((clusters[1].distance() - 4.0).abs() < 1e-9);
        assert_eq!((clusters[2].lhs(), clusters[2].rhs()), (3, 5));
        assert!((clusters[2].distance() - 6.0).abs() < 1e-9);
        assert_eq!(clusters[2].len(), 4);
    }

    #[test]
    fn complete() {
        let linkage = Linkage::new(4, Method::Complete, line_distance);
        let clusters: Vec<&Cluster> = linkage.cluster().collect();
        assert!((clusters[1].distance() - 5.0).abs() < 1e-9);
        assert!((clusters[2].distance() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn average() {
        let linkage = Linkage::new(4, Method::Average, line_distance);
        let clusters: Vec<&Cluster> = linkage.cluster().collect();
        // mean of 5 and 4
        assert!((clusters[1].distance() - 4.5).abs() < 1e-9);
        // mean of 11, 10 and 6
        assert!((clusters[2].distance() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn flat_clusters() {
        let linkage = Linkage::new(4, Method::Single, line_distance);
        assert_eq!(linkage.fcluster(0.5), vec![1, 2, 3, 4]);
        assert_eq!(linkage.fcluster(1.0), vec![1, 1, 2, 3]);
        assert_eq!(linkage.fcluster(4.0), vec![1, 1, 1, 2]);
        assert_eq!(linkage.fcluster(100.0), vec![1, 1, 1, 1]);
    }

    #[test]
    fn leaf_order() {
        let linkage = Linkage::new(4, Method::Single, line_distance);
        assert_eq!(linkage.indices(), vec![3, 2, 0, 1]);
    }

    #[test]
    fn empty_and_single() {
        let empty = Linkage::new(0, Method::Average, line_distance);
        assert!(empty.is_empty());
        assert!(empty.fcluster(1.0).is_empty());
        assert!(empty.indices().is_empty());

        let single = Linkage::new(1, Method::Average, line_distance);
        assert_eq!(single.len(), 1);
        assert_eq!(single.cluster().count(), 0);
        assert_eq!(single.fcluster(1.0), vec![1]);
        assert_eq!(single.indices(), vec![0]);
    }
}
