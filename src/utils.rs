//! Utility structs and methods

/// Iterator of all one-way pairwise combinations of the indices `0..len`
///
/// # Examples
/// ```
/// use snp_enrich::utils::Combinations;
///
/// let mut c = Combinations::new(3);
///
/// assert_eq!(c.next(), Some((0, 1)));
/// assert_eq!(c.next(), Some((0, 2)));
/// assert_eq!(c.next(), Some((1, 2)));
/// assert!(c.next().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Combinations {
    len: usize,
    idx1: usize,
    idx2: usize,
}

impl Combinations {
    /// Creates a new Combinations iterator
    pub fn new(len: usize) -> Self {
        Self {
            len,
            idx1: 0,
            idx2: 1,
        }
    }
}

impl Iterator for Combinations {
    type Item = (usize, usize);
    fn next(&mut self) -> Option<Self::Item> {
        if self.idx2 >= self.len {
            self.idx1 += 1;
            self.idx2 = self.idx1 + 1;
            if self.idx2 >= self.len {
                return None;
            }
        }
        let res = (self.idx1, self.idx2);
        self.idx2 += 1;
        Some(res)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining_row = self.len.saturating_sub(self.idx2);
        let following_rows = self.len.saturating_sub(self.idx1 + 1);
        let rest = following_rows.saturating_sub(1) * following_rows / 2;
        (remaining_row + rest, Some(remaining_row + rest))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn combinations() {
        let c: Vec<(usize, usize)> = Combinations::new(4).collect();
        assert_eq!(c, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn combinations_empty() {
        let mut c = Combinations::new(0);
        assert_eq!(c.next(), None);
        assert_eq!(c.next(), None);
    }

    #[test]
    fn combinations_single() {
        let mut c = Combinations::new(1);
        assert_eq!(c.next(), None);
    }

    #[test]
    fn combinations_two() {
        let mut c = Combinations::new(2);
        assert_eq!(c.next(), Some((0, 1)));
        assert_eq!(c.next(), None);
    }

    #[test]
    fn size_hint() {
        let mut c = Combinations::new(5);
        assert_eq!(c.size_hint(), (10, Some(10)));
        c.next();
        c.next();
        assert_eq!(c.size_hint(), (8, Some(8)));
        assert_eq!(c.count(), 8);
    }
}
