//! Integer matrices for schedule coefficients.
//!
//! Each schedule node keeps its rows in an [`IntMatrix`]. The column Hermite
//! decomposition computed here yields the unimodular change of basis the row
//! solver uses to keep new rows linearly independent of earlier ones.

use crate::utils::errors::{ScheduleResult, SolverError, SolverErrorKind};
use num_integer::Integer;
use serde::{Serialize, Deserialize};
use std::fmt;

/// A dense matrix of machine integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntMatrix {
    data: Vec<Vec<i64>>,
    cols: usize,
}

/// Result of a column Hermite decomposition `A U = H`, with `Q = U^-1`.
#[derive(Debug, Clone)]
pub struct Hermite {
    /// Lower triangular Hermite form
    pub h: IntMatrix,
    /// Unimodular column transformation
    pub u: IntMatrix,
    /// Inverse of `u`
    pub q: IntMatrix,
    /// Number of leading non-zero columns of `h`
    pub rank: usize,
}

fn overflow() -> SolverError {
    SolverError::new(SolverErrorKind::Overflow, "integer overflow in matrix arithmetic")
}

impl IntMatrix {
    /// Create a matrix with the given dimensions, initialized to zero.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { data: vec![vec![0; cols]; rows], cols }
    }

    /// Create an identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut mat = Self::zeros(n, n);
        for i in 0..n {
            mat.data[i][i] = 1;
        }
        mat
    }

    /// Create a matrix from its rows. All rows must have `cols` entries.
    pub fn from_rows(cols: usize, data: Vec<Vec<i64>>) -> Self {
        debug_assert!(data.iter().all(|r| r.len() == cols));
        Self { data, cols }
    }

    /// Get the number of rows.
    pub fn nrows(&self) -> usize {
        self.data.len()
    }

    /// Get the number of columns.
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get an element.
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.data[row][col]
    }

    /// Set an element.
    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        self.data[row][col] = value;
    }

    /// Get a row.
    pub fn row(&self, row: usize) -> &[i64] {
        &self.data[row]
    }

    /// Get a mutable row.
    pub fn row_mut(&mut self, row: usize) -> &mut [i64] {
        &mut self.data[row]
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[i64]> {
        self.data.iter().map(|r| r.as_slice())
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<i64>) {
        assert_eq!(row.len(), self.cols);
        self.data.push(row);
    }

    /// Drop every row from `from` on.
    pub fn truncate_rows(&mut self, from: usize) {
        self.data.truncate(from);
    }

    /// Copy of the columns `start..start + n`.
    pub fn column_block(&self, start: usize, n: usize) -> IntMatrix {
        let data = self.data.iter()
            .map(|r| r[start..start + n].to_vec())
            .collect();
        IntMatrix { data, cols: n }
    }

    /// Transpose the matrix.
    pub fn transpose(&self) -> Self {
        let mut result = Self::zeros(self.cols, self.nrows());
        for (i, row) in self.data.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                result.data[j][i] = v;
            }
        }
        result
    }

    /// Matrix-vector multiplication.
    pub fn mul_vec(&self, vec: &[i64]) -> ScheduleResult<Vec<i64>> {
        assert_eq!(self.cols, vec.len());
        self.data.iter()
            .map(|row| {
                row.iter().zip(vec).try_fold(0i64, |acc, (&a, &b)| {
                    a.checked_mul(b)
                        .and_then(|p| acc.checked_add(p))
                        .ok_or_else(|| overflow().into())
                })
            })
            .collect()
    }

    /// Matrix multiplication.
    pub fn mul(&self, other: &Self) -> ScheduleResult<Self> {
        assert_eq!(self.cols, other.nrows());
        let t = other.transpose();
        let mut data = Vec::with_capacity(self.nrows());
        for row in &self.data {
            data.push(t.mul_vec(row)?);
        }
        Ok(Self { data, cols: other.cols })
    }

    /// Number of leading columns that contain a non-zero entry.
    pub fn initial_non_zero_cols(&self) -> usize {
        (0..self.cols)
            .take_while(|&j| self.data.iter().any(|r| r[j] != 0))
            .count()
    }

    fn sub_scaled_col(&mut self, target: usize, source: usize, factor: i64) -> ScheduleResult<()> {
        for row in &mut self.data {
            let delta = row[source].checked_mul(factor).ok_or_else(overflow)?;
            row[target] = row[target].checked_sub(delta).ok_or_else(overflow)?;
        }
        Ok(())
    }

    fn add_scaled_row(&mut self, target: usize, source: usize, factor: i64) -> ScheduleResult<()> {
        for j in 0..self.cols {
            let delta = self.data[source][j].checked_mul(factor).ok_or_else(overflow)?;
            self.data[target][j] = self.data[target][j].checked_add(delta).ok_or_else(overflow)?;
        }
        Ok(())
    }

    fn swap_cols(&mut self, a: usize, b: usize) {
        for row in &mut self.data {
            row.swap(a, b);
        }
    }

    fn negate_col(&mut self, col: usize) {
        for row in &mut self.data {
            row[col] = -row[col];
        }
    }

    /// Compute the column Hermite form `H = A U` with `U` unimodular.
    ///
    /// Every column operation applied to `H` is applied to `U`; its inverse
    /// is applied to the rows of `Q`, so `Q = U^-1` holds throughout.
    pub fn left_hermite(&self) -> ScheduleResult<Hermite> {
        let m = self.cols;
        let mut h = self.clone();
        let mut u = Self::identity(m);
        let mut q = Self::identity(m);
        let mut col = 0;

        for row in 0..h.nrows() {
            if col >= m {
                break;
            }
            loop {
                let pivot = (col..m)
                    .filter(|&j| h.data[row][j] != 0)
                    .min_by_key(|&j| h.data[row][j].abs());
                let Some(pivot) = pivot else { break };
                if pivot != col {
                    h.swap_cols(col, pivot);
                    u.swap_cols(col, pivot);
                    q.data.swap(col, pivot);
                }
                if h.data[row][col] < 0 {
                    h.negate_col(col);
                    u.negate_col(col);
                    for v in q.data[col].iter_mut() {
                        *v = -*v;
                    }
                }
                let mut done = true;
                for j in (col + 1)..m {
                    if h.data[row][j] == 0 {
                        continue;
                    }
                    let f = h.data[row][j].div_floor(&h.data[row][col]);
                    h.sub_scaled_col(j, col, f)?;
                    u.sub_scaled_col(j, col, f)?;
                    q.add_scaled_row(col, j, f)?;
                    if h.data[row][j] != 0 {
                        done = false;
                    }
                }
                if done {
                    break;
                }
            }
            if h.data[row][col] != 0 {
                col += 1;
            }
        }

        let rank = h.initial_non_zero_cols();
        Ok(Hermite { h, u, q, rank })
    }
}

impl fmt::Display for IntMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for row in &self.data {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "  [{}]", cells.join(", "))?;
        }
        write!(f, "]")
    }
}

/// Compute the GCD of a vector of integers.
pub fn vector_gcd(v: &[i64]) -> i64 {
    v.iter().fold(0, |acc, &x| acc.gcd(&x))
}

/// Compute the LCM of a vector of integers.
pub fn vector_lcm(v: &[i64]) -> i64 {
    v.iter().fold(1, |acc, &x| acc.lcm(&x))
}

/// Extended Euclidean algorithm: returns (gcd, x, y) such that ax + by = gcd.
pub fn extended_gcd(a: i64, b: i64) -> (i64, i64, i64) {
    if b == 0 {
        (a.abs(), a.signum(), 0)
    } else {
        let (g, x, y) = extended_gcd(b, a % b);
        (g, y, x - (a / b) * y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_hermite(a: &IntMatrix) -> Hermite {
        let herm = a.left_hermite().unwrap();
        assert_eq!(a.mul(&herm.u).unwrap(), herm.h);
        assert_eq!(herm.u.mul(&herm.q).unwrap(), IntMatrix::identity(a.ncols()));
        for i in 0..herm.h.nrows() {
            for j in (i + 1)..herm.h.ncols() {
                assert_eq!(herm.h.get(i, j), 0, "H must be lower triangular");
            }
        }
        herm
    }

    #[test]
    fn test_hermite_identity_row() {
        let a = IntMatrix::from_rows(2, vec![vec![1, 0]]);
        let herm = check_hermite(&a);
        assert_eq!(herm.rank, 1);
    }

    #[test]
    fn test_hermite_reduces_gcd() {
        let a = IntMatrix::from_rows(3, vec![vec![4, 6, 0]]);
        let herm = check_hermite(&a);
        assert_eq!(herm.rank, 1);
        assert_eq!(herm.h.get(0, 0), 2);
    }

    #[test]
    fn test_hermite_dependent_rows() {
        let a = IntMatrix::from_rows(3, vec![
            vec![1, 1, 0],
            vec![2, 2, 0],
        ]);
        let herm = check_hermite(&a);
        assert_eq!(herm.rank, 1);
    }

    #[test]
    fn test_hermite_empty() {
        let a = IntMatrix::zeros(0, 3);
        let herm = check_hermite(&a);
        assert_eq!(herm.rank, 0);
        assert_eq!(herm.q, IntMatrix::identity(3));
    }

    #[test]
    fn test_hermite_full_rank() {
        let a = IntMatrix::from_rows(2, vec![
            vec![1, -1],
            vec![3, 5],
        ]);
        let herm = check_hermite(&a);
        assert_eq!(herm.rank, 2);
    }

    #[test]
    fn test_extended_gcd() {
        let (g, x, y) = extended_gcd(12, 8);
        assert_eq!(g, 4);
        assert_eq!(12 * x + 8 * y, 4);
    }

    #[test]
    fn test_vector_gcd() {
        assert_eq!(vector_gcd(&[4, -6, 8]), 2);
        assert_eq!(vector_gcd(&[0, 0]), 0);
        assert_eq!(vector_lcm(&[2, 3, 4]), 12);
    }
}
