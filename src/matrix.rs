//! Square distance matrices.
//!
//! # Layout
//! Entries are stored row-major in a single `Vec<f64>` of length `n * n`.
//! Both halves are kept so that rows can be summed and sliced directly,
//! which is what Neighbor-Joining does on every iteration.
//!
//! ```text
//!        a    b    c
//!   a [ 0.0  2.0  4.0 ]
//!   b [ 2.0  0.0  4.0 ]    data = [0,2,4, 2,0,4, 4,4,0]
//!   c [ 4.0  4.0  0.0 ]
//! ```

use crate::error::{GstarError, Result};

/// Square matrix of pairwise distances, indexed by a [`LabelMap`](crate::labels::LabelMap).
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Creates an `n × n` matrix filled with zeros.
    ///
    /// # Example
    /// ```
    /// # use rust_python_gstar::matrix::DistanceMatrix;
    /// let m = DistanceMatrix::zeros(3);
    /// assert_eq!(m.size(), 3);
    /// assert_eq!(m.get(2, 1), 0.0);
    /// ```
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    /// Builds a matrix from nested rows.
    ///
    /// # Errors
    /// [`GstarError::Dimension`] if any row length differs from the row count.
    ///
    /// # Example
    /// ```
    /// # use rust_python_gstar::matrix::DistanceMatrix;
    /// let m = DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
    /// assert_eq!(m.get(0, 1), 1.0);
    /// assert!(DistanceMatrix::from_rows(vec![vec![0.0, 1.0]]).is_err());
    /// ```
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for row in rows {
            if row.len() != size {
                return Err(GstarError::Dimension {
                    rows: size,
                    cols: row.len(),
                    labels: size,
                });
            }
            data.extend(row);
        }
        Ok(Self { size, data })
    }

    /// Builds a matrix from a flat row-major slice of length `n * n`.
    ///
    /// # Errors
    /// [`GstarError::Dimension`] if the length is not a perfect square.
    pub fn from_flat(data: Vec<f64>) -> Result<Self> {
        let size = (data.len() as f64).sqrt().round() as usize;
        if size * size != data.len() {
            return Err(GstarError::Dimension {
                rows: data.len(),
                cols: 1,
                labels: size,
            });
        }
        Ok(Self { size, data })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.size + j] = value;
    }

    /// Sets both `(i, j)` and `(j, i)`.
    #[inline]
    pub fn set_symmetric(&mut self, i: usize, j: usize, value: f64) {
        self.set(i, j, value);
        self.set(j, i, value);
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// Sum of row `i` (the NJ `R` vector entry).
    pub fn row_sum(&self, i: usize) -> f64 {
        self.row(i).iter().sum()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.size.max(1)).take(self.size)
    }

    /// Entrywise `self += other`.
    ///
    /// # Errors
    /// [`GstarError::Dimension`] if the sizes differ.
    pub fn add_assign(&mut self, other: &DistanceMatrix) -> Result<()> {
        if other.size != self.size {
            return Err(GstarError::Dimension {
                rows: other.size,
                cols: other.size,
                labels: self.size,
            });
        }
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += *b;
        }
        Ok(())
    }

    /// Entrywise division by `divisor`.
    pub fn divide(&mut self, divisor: f64) {
        for value in &mut self.data {
            *value /= divisor;
        }
    }

    /// First `(i, j)` with `|d(i,j) - d(j,i)| > tolerance`, if any.
    pub fn asymmetry(&self, tolerance: f64) -> Option<(usize, usize)> {
        (0..self.size)
            .flat_map(|i| (0..i).map(move |j| (i, j)))
            .find(|&(i, j)| (self.get(i, j) - self.get(j, i)).abs() > tolerance)
    }

    /// First `i` with a non-zero diagonal entry, if any.
    pub fn nonzero_diagonal(&self, tolerance: f64) -> Option<usize> {
        (0..self.size).find(|&i| self.get(i, i).abs() > tolerance)
    }

    /// Copy of the matrix as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DistanceMatrix {
        DistanceMatrix::from_rows(vec![
            vec![0.0, 2.0, 4.0],
            vec![2.0, 0.0, 4.0],
            vec![4.0, 4.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_row_sums() {
        let m = sample();
        assert_eq!(m.row_sum(0), 6.0);
        assert_eq!(m.row_sum(2), 8.0);
        assert_eq!(m.row(1), &[2.0, 0.0, 4.0]);
    }

    #[test]
    fn test_from_flat() {
        let m = DistanceMatrix::from_flat(vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(m.size(), 2);
        assert_eq!(m.get(1, 0), 1.0);
        assert!(matches!(
            DistanceMatrix::from_flat(vec![0.0, 1.0, 1.0]),
            Err(GstarError::Dimension { .. })
        ));
    }

    #[test]
    fn test_average_of_two() {
        let mut acc = DistanceMatrix::zeros(3);
        acc.add_assign(&sample()).unwrap();
        acc.add_assign(&sample()).unwrap();
        acc.divide(2.0);
        assert_eq!(acc, sample());
        assert!(acc.add_assign(&DistanceMatrix::zeros(2)).is_err());
    }

    #[test]
    fn test_symmetry_checks() {
        let mut m = sample();
        assert_eq!(m.asymmetry(1e-12), None);
        assert_eq!(m.nonzero_diagonal(1e-12), None);
        m.set(2, 0, 5.0);
        assert_eq!(m.asymmetry(1e-12), Some((2, 0)));
        m.set_symmetric(1, 1, 0.5);
        assert_eq!(m.nonzero_diagonal(1e-12), Some(1));
    }

    #[test]
    fn test_to_rows_round_trip() {
        let m = sample();
        assert_eq!(DistanceMatrix::from_rows(m.to_rows()).unwrap(), m);
        assert_eq!(DistanceMatrix::zeros(0).to_rows().len(), 0);
    }
}
