//! Linear problems over non-negative columns.
//!
//! Every column is implicitly `>= 0`. Rows are `sum(a_j * x_j) + c >= 0` or
//! `sum(a_j * x_j) + c = 0` with machine-integer data; the solver lifts them
//! to exact rationals.

use std::fmt;
use std::ops::Range;

/// Kind of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// `form >= 0`
    Ge,
    /// `form = 0`
    Eq,
}

/// A sparse linear form `sum(a_j * x_j) + c` over problem columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearForm {
    /// `(column, coefficient)` pairs; a column may appear more than once
    pub terms: Vec<(usize, i64)>,
    /// Constant term
    pub constant: i64,
}

impl LinearForm {
    /// The zero form.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A single column with coefficient one.
    pub fn var(col: usize) -> Self {
        Self { terms: vec![(col, 1)], constant: 0 }
    }

    /// A constant form.
    pub fn constant(value: i64) -> Self {
        Self { terms: Vec::new(), constant: value }
    }

    /// `pos - neg`
    pub fn difference(pos: usize, neg: usize) -> Self {
        Self { terms: vec![(pos, 1), (neg, -1)], constant: 0 }
    }

    /// Add `factor * other` to this form.
    pub fn add_scaled(&mut self, other: &LinearForm, factor: i64) {
        if factor == 0 {
            return;
        }
        self.terms.extend(other.terms.iter().map(|&(c, a)| (c, a * factor)));
        self.constant += other.constant * factor;
    }

    /// `factor * self`
    pub fn scaled(&self, factor: i64) -> Self {
        let mut result = LinearForm::zero();
        result.add_scaled(self, factor);
        result
    }

    /// Merge repeated columns and drop zero coefficients.
    pub fn compact(mut self) -> Self {
        self.terms.sort_by_key(|&(c, _)| c);
        let mut merged: Vec<(usize, i64)> = Vec::with_capacity(self.terms.len());
        for (c, a) in self.terms {
            match merged.last_mut() {
                Some(last) if last.0 == c => last.1 += a,
                _ => merged.push((c, a)),
            }
        }
        merged.retain(|&(_, a)| a != 0);
        self.terms = merged;
        self
    }
}

/// A row of a linear problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// The linear form constrained by this row
    pub form: LinearForm,
    /// Whether the form is `>= 0` or `= 0`
    pub kind: RowKind,
}

impl Row {
    /// `form >= 0`
    pub fn ge(form: LinearForm) -> Self {
        Self { form: form.compact(), kind: RowKind::Ge }
    }

    /// `form = 0`
    pub fn eq(form: LinearForm) -> Self {
        Self { form: form.compact(), kind: RowKind::Eq }
    }

    /// `x_col <= bound`
    pub fn at_most(col: usize, bound: i64) -> Self {
        Self::ge(LinearForm { terms: vec![(col, -1)], constant: bound })
    }

    /// `x_col >= bound`
    pub fn at_least(col: usize, bound: i64) -> Self {
        Self::ge(LinearForm { terms: vec![(col, 1)], constant: -bound })
    }
}

/// A linear problem: columns with integrality flags and a list of rows.
#[derive(Debug, Clone, Default)]
pub struct LinearProblem {
    integer: Vec<bool>,
    rows: Vec<Row>,
}

impl LinearProblem {
    /// Create a problem with `n` columns of the given integrality.
    pub fn new(n: usize, integer: bool) -> Self {
        Self { integer: vec![integer; n], rows: Vec::new() }
    }

    /// Add one column.
    pub fn add_var(&mut self, integer: bool) -> usize {
        self.integer.push(integer);
        self.integer.len() - 1
    }

    /// Add `n` columns.
    pub fn add_vars(&mut self, n: usize, integer: bool) -> Range<usize> {
        let start = self.integer.len();
        self.integer.extend(std::iter::repeat(integer).take(n));
        start..start + n
    }

    /// Add a row and return its index.
    pub fn add_row(&mut self, row: Row) -> usize {
        debug_assert!(row.form.terms.iter().all(|&(c, _)| c < self.integer.len()));
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Number of columns.
    pub fn n_vars(&self) -> usize {
        self.integer.len()
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// All rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Whether the column must take an integer value.
    pub fn is_integer(&self, col: usize) -> bool {
        self.integer[col]
    }

    /// Indices of the integer columns.
    pub fn integer_vars(&self) -> impl Iterator<Item = usize> + '_ {
        self.integer.iter().enumerate().filter(|(_, &i)| i).map(|(c, _)| c)
    }
}

impl fmt::Display for LinearProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} columns, {} rows", self.n_vars(), self.n_rows())?;
        for row in &self.rows {
            let terms: Vec<String> = row.form.terms.iter()
                .map(|(c, a)| format!("{}*x{}", a, c))
                .collect();
            let op = match row.kind {
                RowKind::Ge => ">=",
                RowKind::Eq => "=",
            };
            writeln!(f, "  {} + {} {} 0", terms.join(" + "), row.form.constant, op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact() {
        let form = LinearForm { terms: vec![(2, 1), (0, 3), (2, -1), (1, 0)], constant: 4 };
        let form = form.compact();
        assert_eq!(form.terms, vec![(0, 3)]);
        assert_eq!(form.constant, 4);
    }

    #[test]
    fn test_add_scaled() {
        let mut form = LinearForm::var(0);
        form.add_scaled(&LinearForm::difference(1, 2), -2);
        let form = form.compact();
        assert_eq!(form.terms, vec![(0, 1), (1, -2), (2, 2)]);
    }

    #[test]
    fn test_problem_columns() {
        let mut lp = LinearProblem::new(2, true);
        let r = lp.add_vars(3, false);
        assert_eq!(r, 2..5);
        assert_eq!(lp.integer_vars().collect::<Vec<_>>(), vec![0, 1]);
        let idx = lp.add_row(Row::at_most(4, 7));
        assert_eq!(idx, 0);
        assert_eq!(lp.n_rows(), 1);
    }
}
