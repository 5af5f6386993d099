//! Data
//!
//! Matrix containers shared by the detectors. Public operations take a borrowed
//! [`Matrix`] view, fitted detectors keep their reference in an owned [`DenseMatrix`].
use crate::errors::DriftError;
use serde::{Deserialize, Serialize};

/// Contiguous Column Major Matrix view.
///
/// This structure borrows a dense matrix of values stored in a single contiguous memory block.
/// It follows column-major order (Fortran-style), so each feature is a contiguous slice,
/// which is what the per-feature tests need.
///
/// # Type Parameters
/// * `T` - The numeric type of the data (e.g., `f32`, `f64`).
#[derive(Debug, Clone, Copy)]
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix { data, rows, cols }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        i + j * self.rows
    }

    /// Get access to a row of the data, as an iterator.
    pub fn get_row_iter(&self, row: usize) -> std::iter::StepBy<std::iter::Skip<std::slice::Iter<'a, T>>> {
        self.data.iter().skip(row).step_by(self.rows)
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &'a [T] {
        let start = self.item_index(0, col);
        let data: &'a [T] = self.data;
        &data[start..start + self.rows]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        self.get_row_iter(row).copied().collect()
    }
}

impl<'a> Matrix<'a, f64> {
    /// Check that the view is non-empty, consistent with its buffer and only holds finite values.
    ///
    /// * `name` - Label used in the error message, e.g. "reference" or "batch".
    pub fn validate(&self, name: &str) -> Result<(), DriftError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(DriftError::InvalidInput(format!(
                "{} is empty ({} rows, {} columns)",
                name, self.rows, self.cols
            )));
        }
        let declared = self.rows.checked_mul(self.cols).ok_or_else(|| {
            DriftError::InvalidInput(format!(
                "{} declares {} rows x {} columns, which overflows",
                name, self.rows, self.cols
            ))
        })?;
        if self.data.len() != declared {
            return Err(DriftError::InvalidInput(format!(
                "{} buffer holds {} values, but {} rows x {} columns were declared",
                name,
                self.data.len(),
                self.rows,
                self.cols
            )));
        }
        if let Some(pos) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(DriftError::InvalidInput(format!(
                "{} contains a non-finite value at row {}, column {}",
                name,
                pos % self.rows,
                pos / self.rows
            )));
        }
        Ok(())
    }

    /// Check that the view has the expected number of features.
    pub fn validate_cols(&self, expected: usize, name: &str) -> Result<(), DriftError> {
        if self.cols != expected {
            return Err(DriftError::InvalidInput(format!(
                "{} has {} features, expected {}",
                name, self.cols, expected
            )));
        }
        Ok(())
    }
}

/// Owned column-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    /// Values, column after column.
    pub data: Vec<f64>,
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl DenseMatrix {
    /// Create a new owned matrix from column-major values.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Self {
        DenseMatrix { data, rows, cols }
    }

    /// Build a matrix from a list of rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, DriftError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(DriftError::InvalidInput(format!(
                "row {} has {} values, expected {}",
                i,
                r.len(),
                n_cols
            )));
        }
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for j in 0..n_cols {
            data.extend(rows.iter().map(|r| r[j]));
        }
        Ok(DenseMatrix::new(data, n_rows, n_cols))
    }

    /// Copy a borrowed view.
    pub fn from_matrix(matrix: &Matrix<f64>) -> Self {
        DenseMatrix::new(matrix.data.to_vec(), matrix.rows, matrix.cols)
    }

    /// Borrow as a [`Matrix`] view.
    pub fn view(&self) -> Matrix<'_, f64> {
        Matrix::new(&self.data, self.rows, self.cols)
    }

    /// Get an entire column.
    pub fn col(&self, col: usize) -> &[f64] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    /// Collect the matrix into row vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        let view = self.view();
        (0..self.rows).map(|i| view.get_row(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_row(2), vec![3, 7]);
        assert_eq!(*m.get(0, 1), 5);
    }

    #[test]
    fn test_column() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_col(1), &vec![5, 6, 7]);
    }

    #[test]
    fn test_validate() {
        let v = vec![1.0, 2.0, f64::NAN, 4.0];
        let m = Matrix::new(&v, 2, 2);
        assert!(matches!(m.validate("batch"), Err(DriftError::InvalidInput(_))));

        let v = vec![1.0, 2.0, 3.0];
        let m = Matrix::new(&v, 2, 2);
        assert!(m.validate("batch").is_err());

        let m = Matrix::new(&v[..0], 0, 2);
        assert!(m.validate("batch").is_err());

        let v = vec![1.0, 2.0, 3.0, 4.0];
        let m = Matrix::new(&v, 2, 2);
        assert!(m.validate("batch").is_ok());
        assert!(m.validate_cols(3, "batch").is_err());
    }

    #[test]
    fn test_validate_overflowing_shape() {
        let v = vec![1.0; 4];
        let m = Matrix::new(&v, usize::MAX, 2);
        assert!(matches!(m.validate("batch"), Err(DriftError::InvalidInput(_))));
        let m = Matrix::new(&v, usize::MAX / 2 + 1, 2);
        assert!(matches!(m.validate("batch"), Err(DriftError::InvalidInput(_))));
    }

    #[test]
    fn test_dense_from_rows() {
        let m = DenseMatrix::from_rows(&[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]]).unwrap();
        assert_eq!(m.rows, 3);
        assert_eq!(m.cols, 2);
        assert_eq!(m.col(1), &[10.0, 20.0, 30.0]);
        assert_eq!(m.view().get_row(1), vec![2.0, 20.0]);
        assert_eq!(m.to_rows()[2], vec![3.0, 30.0]);

        assert!(DenseMatrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
