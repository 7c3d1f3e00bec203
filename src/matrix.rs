//! A dense, square matrix with row-major storage
//!
//! Used for pairwise term scores, where rows and columns
//! refer to the same list of terms.
use std::fmt::Debug;

#[derive(Clone, PartialEq)]
pub(crate) struct SquareMatrix<T> {
    dim: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> SquareMatrix<T> {
    /// Creates a `dim` x `dim` matrix filled with `T::default()`
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            dim,
            data: vec![T::default(); dim * dim],
        }
    }

    /// Returns the value at `row`, `col`
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` are out of bounds
    pub(crate) fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.dim && col < self.dim, "index out of bounds");
        self.data[row * self.dim + col]
    }

    /// Sets the value at `row`, `col` and its mirrored position `col`, `row`
    pub(crate) fn set_symmetric(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.dim && col < self.dim, "index out of bounds");
        self.data[row * self.dim + col] = value;
        self.data[col * self.dim + row] = value;
    }

    /// The number of rows (and columns)
    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    /// Iterates the rows of the matrix
    pub(crate) fn rows(&self) -> impl Iterator<Item = &[T]> {
        // `chunks` panics on a size of 0
        self.data.chunks(self.dim.max(1))
    }
}

impl<T: Copy + Default + std::fmt::Display> Debug for SquareMatrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.rows() {
            let v: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
            writeln!(f, "[{}]", v.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_values() {
        let mut m: SquareMatrix<f64> = SquareMatrix::new(3);
        m.set_symmetric(0, 2, 0.5);
        m.set_symmetric(1, 1, 1.0);
        assert!((m.get(2, 0) - 0.5).abs() < f64::EPSILON);
        assert!((m.get(0, 2) - 0.5).abs() < f64::EPSILON);
        assert!((m.get(1, 1) - 1.0).abs() < f64::EPSILON);
        assert!(m.get(0, 1).abs() < f64::EPSILON);
    }

    #[test]
    fn rows() {
        let mut m: SquareMatrix<u8> = SquareMatrix::new(2);
        m.set_symmetric(0, 1, 7);
        let rows: Vec<&[u8]> = m.rows().collect();
        assert_eq!(rows, vec![&[0u8, 7][..], &[7u8, 0][..]]);
    }

    #[test]
    fn empty() {
        let m: SquareMatrix<f64> = SquareMatrix::new(0);
        assert_eq!(m.dim(), 0);
        assert_eq!(m.rows().count(), 0);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn out_of_bounds() {
        let m: SquareMatrix<f64> = SquareMatrix::new(2);
        m.get(2, 0);
    }
}
