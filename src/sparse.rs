//! Sparse matrix assembly.
//!
//! The stuffed constraint matrix is built row by row as coordinate triplets and
//! compressed once at the end.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Row-wise triplet accumulator with a fixed column count.
#[derive(Debug, Clone, Default)]
pub struct TripletMatrix {
    ncols: usize,
    nrows: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl TripletMatrix {
    pub fn new(ncols: usize) -> Self {
        TripletMatrix {
            ncols,
            nrows: 0,
            entries: Vec::new(),
        }
    }

    /// Append a row from `(column, value)` pairs and return its index.
    ///
    /// Zero values and out-of-range columns are skipped.
    pub fn push_row(&mut self, entries: impl IntoIterator<Item = (usize, f64)>) -> usize {
        let row = self.nrows;
        for (col, val) in entries {
            if val != 0.0 && col < self.ncols {
                self.entries.push((row, col, val));
            }
        }
        self.nrows += 1;
        row
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Compress to CSC. Duplicate entries are summed.
    pub fn to_csc(&self) -> CscMatrix<f64> {
        if self.entries.is_empty() {
            return CscMatrix::zeros(self.nrows, self.ncols);
        }
        let mut coo = CooMatrix::new(self.nrows, self.ncols);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        CscMatrix::from(&coo)
    }
}

/// Expand a CSC matrix to dense, for inspection and tests.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_duplicates() {
        let mut m = TripletMatrix::new(2);
        assert_eq!(m.push_row([(1, 1.0), (1, 2.0)]), 0);
        assert_eq!(m.push_row([(0, 4.0), (1, 0.0), (5, 9.0)]), 1);
        assert_eq!(m.nnz(), 3);

        let d = csc_to_dense(&m.to_csc());
        assert_eq!(d[(0, 1)], 3.0);
        assert_eq!(d[(1, 0)], 4.0);
        assert_eq!(d[(1, 1)], 0.0);
    }

    #[test]
    fn test_empty_rows_keep_shape() {
        let mut m = TripletMatrix::new(2);
        m.push_row([]);
        m.push_row([]);
        m.push_row([]);
        let csc = m.to_csc();
        assert_eq!(csc.nnz(), 0);
        assert_eq!(csc.nrows(), 3);
        assert_eq!(csc.ncols(), 2);
    }
}
