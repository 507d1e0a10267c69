//! Exact two-phase primal simplex over rationals.
//!
//! The tableau stores one row per problem row with a slack column for every
//! inequality and an artificial column for every row. Pivoting follows
//! Bland's rule, so the method terminates without any perturbation.

use crate::lp::problem::{Row, RowKind};
use crate::utils::errors::{ScheduleResult, SolverError, SolverErrorKind};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// A linear objective `sum(a_j * x_j)` to be minimized.
pub type Objective = Vec<(usize, i64)>;

pub(crate) struct Tableau {
    /// Row entries followed by the right-hand side in the last position
    rows: Vec<Vec<BigRational>>,
    basis: Vec<usize>,
    is_basic: Vec<bool>,
    banned: Vec<bool>,
    n_struct: usize,
    n_cols: usize,
    first_artificial: usize,
}

fn ratio(v: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(v))
}

impl Tableau {
    /// Lay out `rows` over `n_struct` structural columns with the
    /// artificial basis in place.
    pub(crate) fn build<'a>(n_struct: usize, rows: impl IntoIterator<Item = &'a Row>) -> Self {
        let rows: Vec<&Row> = rows.into_iter().collect();
        let n_slack = rows.iter().filter(|r| r.kind == RowKind::Ge).count();
        let first_artificial = n_struct + n_slack;
        let n_cols = first_artificial + rows.len();

        let mut data = Vec::with_capacity(rows.len());
        let mut basis = Vec::with_capacity(rows.len());
        let mut slack = n_struct;
        for (i, row) in rows.iter().enumerate() {
            let mut entries = vec![BigRational::zero(); n_cols + 1];
            for &(col, a) in &row.form.terms {
                entries[col] += ratio(a);
            }
            if row.kind == RowKind::Ge {
                entries[slack] = -BigRational::one();
                slack += 1;
            }
            entries[n_cols] = ratio(-row.form.constant);
            if entries[n_cols].is_negative() {
                for v in entries.iter_mut() {
                    *v = -&*v;
                }
            }
            entries[first_artificial + i] = BigRational::one();
            data.push(entries);
            basis.push(first_artificial + i);
        }

        let mut is_basic = vec![false; n_cols];
        for &b in &basis {
            is_basic[b] = true;
        }
        Self {
            rows: data,
            basis,
            is_basic,
            banned: vec![false; n_cols],
            n_struct,
            n_cols,
            first_artificial,
        }
    }

    fn pivot(&mut self, r: usize, c: usize) {
        let p = self.rows[r][c].clone();
        for v in self.rows[r].iter_mut() {
            if !v.is_zero() {
                *v = &*v / &p;
            }
        }
        let pivot_row = self.rows[r].clone();
        let support: Vec<usize> = (0..=self.n_cols).filter(|&j| !pivot_row[j].is_zero()).collect();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r || row[c].is_zero() {
                continue;
            }
            let f = row[c].clone();
            for &j in &support {
                row[j] -= &f * &pivot_row[j];
            }
        }
        self.is_basic[self.basis[r]] = false;
        self.is_basic[c] = true;
        self.basis[r] = c;
    }

    fn reduced_costs(&self, cost: &[BigRational]) -> Vec<BigRational> {
        let mut d: Vec<BigRational> = cost.to_vec();
        for (i, row) in self.rows.iter().enumerate() {
            let cb = &cost[self.basis[i]];
            if cb.is_zero() {
                continue;
            }
            for j in 0..self.n_cols {
                if !row[j].is_zero() {
                    d[j] -= cb * &row[j];
                }
            }
        }
        d
    }

    /// Minimize `cost` from the current basic feasible solution.
    fn optimize(&mut self, cost: &[BigRational]) -> ScheduleResult<()> {
        loop {
            let d = self.reduced_costs(cost);
            let entering = (0..self.n_cols)
                .find(|&j| !self.banned[j] && !self.is_basic[j] && d[j].is_negative());
            let Some(e) = entering else {
                return Ok(());
            };

            let mut leaving: Option<(usize, BigRational)> = None;
            for (i, row) in self.rows.iter().enumerate() {
                if !row[e].is_positive() {
                    continue;
                }
                let q = &row[self.n_cols] / &row[e];
                let better = match &leaving {
                    None => true,
                    Some((l, best)) => q < *best || (q == *best && self.basis[i] < self.basis[*l]),
                };
                if better {
                    leaving = Some((i, q));
                }
            }
            match leaving {
                Some((r, _)) => self.pivot(r, e),
                None => {
                    return Err(SolverError::new(
                        SolverErrorKind::Unbounded,
                        "objective is unbounded below",
                    ).into())
                }
            }
        }
    }

    /// Phase one. Returns whether the rows are feasible; on success the
    /// artificial columns are driven out of the basis where possible and
    /// banned from re-entering.
    pub(crate) fn find_feasible(&mut self) -> ScheduleResult<bool> {
        let mut cost = vec![BigRational::zero(); self.n_cols];
        for c in cost.iter_mut().skip(self.first_artificial) {
            *c = BigRational::one();
        }
        self.optimize(&cost)?;

        let infeasible = self.rows.iter().enumerate().any(|(i, row)| {
            self.basis[i] >= self.first_artificial && row[self.n_cols].is_positive()
        });
        if infeasible {
            return Ok(false);
        }

        for r in 0..self.rows.len() {
            if self.basis[r] < self.first_artificial {
                continue;
            }
            let col = (0..self.first_artificial).find(|&j| !self.rows[r][j].is_zero());
            if let Some(c) = col {
                self.pivot(r, c);
            }
        }
        for b in self.banned.iter_mut().skip(self.first_artificial) {
            *b = true;
        }
        Ok(true)
    }

    /// Minimize `objective` and then freeze it at its optimum by banning
    /// every nonbasic column whose reduced cost is positive.
    pub(crate) fn minimize_and_fix(&mut self, objective: &Objective) -> ScheduleResult<()> {
        let mut cost = vec![BigRational::zero(); self.n_cols];
        for &(col, a) in objective {
            cost[col] += ratio(a);
        }
        self.optimize(&cost)?;
        let d = self.reduced_costs(&cost);
        for j in 0..self.n_cols {
            if !self.is_basic[j] && d[j].is_positive() {
                self.banned[j] = true;
            }
        }
        Ok(())
    }

    /// Values of the structural columns in the current basic solution.
    pub(crate) fn solution(&self) -> Vec<BigRational> {
        let mut values = vec![BigRational::zero(); self.n_struct];
        for (i, &b) in self.basis.iter().enumerate() {
            if b < self.n_struct {
                values[b] = self.rows[i][self.n_cols].clone();
            }
        }
        values
    }
}

/// Lexicographically minimize `objectives` over the rational relaxation of
/// `rows`. Returns `None` when the rows are infeasible.
pub fn lexmin<'a>(
    n_struct: usize,
    rows: impl IntoIterator<Item = &'a Row>,
    objectives: &[Objective],
) -> ScheduleResult<Option<Vec<BigRational>>> {
    let mut tableau = Tableau::build(n_struct, rows);
    if !tableau.find_feasible()? {
        return Ok(None);
    }
    for objective in objectives {
        tableau.minimize_and_fix(objective)?;
    }
    Ok(Some(tableau.solution()))
}

/// Whether the rational relaxation of `rows` is feasible.
pub fn is_feasible<'a>(n_struct: usize, rows: impl IntoIterator<Item = &'a Row>) -> ScheduleResult<bool> {
    Tableau::build(n_struct, rows).find_feasible()
}

/// Evaluate an objective at a point.
pub fn evaluate(objective: &Objective, point: &[BigRational]) -> BigRational {
    objective.iter().fold(BigRational::zero(), |acc, &(col, a)| acc + ratio(a) * &point[col])
}
