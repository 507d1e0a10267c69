//! Integer lexicographic minimization.
//!
//! [`integer_lexmin`] runs a depth-first branch and bound on top of the
//! rational simplex. [`non_trivial_lexmin`] additionally requires that,
//! for every [`Region`], at least one of its variable pairs differs from
//! zero, exploring the sign choices of each pair as separate branches.

use crate::lp::problem::{LinearForm, LinearProblem, Row};
use crate::lp::simplex::{self, Objective};
use crate::utils::errors::{ScheduleResult, SolverError, SolverErrorKind};
use log::{debug, trace, warn};
use num_rational::BigRational;
use num_traits::ToPrimitive;

/// Variables that may not all be zero in a solution. Each entry is a
/// `(negative part, positive part)` pair of columns, so a variable is zero
/// when its two parts are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// `(negative, positive)` column pairs
    pub pairs: Vec<(usize, usize)>,
}

impl Region {
    /// Whether every variable of the region is zero at `point`.
    pub fn is_trivial(&self, point: &[BigRational]) -> bool {
        self.pairs.iter().all(|&(neg, pos)| point[neg] == point[pos])
    }
}

/// Result of an integer lexmin.
#[derive(Debug, Clone)]
pub struct IntegerOutcome {
    /// Optimal integer point, if one beats the cutoff
    pub solution: Option<Vec<BigRational>>,
    /// Whether the rational relaxation of the root was already infeasible
    pub relaxation_infeasible: bool,
}

/// Result of a non-trivial lexmin.
#[derive(Debug, Clone)]
pub struct NonTrivialOutcome {
    /// Optimal integer point with every region non-trivial
    pub solution: Option<Vec<BigRational>>,
    /// Index of the problem row that first makes the problem infeasible,
    /// when no solution exists and such a row could be identified
    pub conflict_row: Option<usize>,
}

/// Outcome of an integer feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feasibility {
    /// An integer point exists
    Feasible,
    /// No integer point exists
    Infeasible,
    /// The search gave up
    Unknown,
}

fn objective_values(objectives: &[Objective], point: &[BigRational]) -> Vec<BigRational> {
    objectives.iter().map(|o| simplex::evaluate(o, point)).collect()
}

fn to_bound(value: &BigRational) -> ScheduleResult<i64> {
    value.to_integer().to_i64().ok_or_else(|| {
        SolverError::new(SolverErrorKind::Overflow, "branching bound does not fit in i64").into()
    })
}

/// Lexicographically minimal rational point of `problem` and `extra`.
pub fn rational_lexmin(
    problem: &LinearProblem,
    extra: &[Row],
    objectives: &[Objective],
) -> ScheduleResult<Option<Vec<BigRational>>> {
    simplex::lexmin(problem.n_vars(), problem.rows().iter().chain(extra), objectives)
}

/// Lexicographically minimal point of `problem` and `extra` with every
/// integer column integral.
///
/// Only points whose objective values are lexicographically smaller than
/// `cutoff` are reported.
pub fn integer_lexmin(
    problem: &LinearProblem,
    extra: &[Row],
    objectives: &[Objective],
    cutoff: Option<&[BigRational]>,
    node_limit: usize,
) -> ScheduleResult<IntegerOutcome> {
    let mut stack: Vec<Vec<Row>> = vec![extra.to_vec()];
    let mut best_key: Option<Vec<BigRational>> = cutoff.map(|c| c.to_vec());
    let mut best: Option<Vec<BigRational>> = None;
    let mut relaxation_infeasible = false;
    let mut nodes = 0usize;

    while let Some(rows) = stack.pop() {
        nodes += 1;
        if nodes > node_limit {
            return Err(SolverError::new(
                SolverErrorKind::NodeLimit,
                format!("branch and bound exceeded {} nodes", node_limit),
            ).into());
        }
        let Some(point) = rational_lexmin(problem, &rows, objectives)? else {
            if nodes == 1 {
                relaxation_infeasible = true;
            }
            continue;
        };
        let key = objective_values(objectives, &point);
        if best_key.as_ref().is_some_and(|b| key >= *b) {
            continue;
        }
        let fractional = problem.integer_vars().find(|&c| !point[c].is_integer());
        match fractional {
            None => {
                best_key = Some(key);
                best = Some(point);
            }
            Some(col) => {
                let floor = to_bound(&point[col].floor())?;
                trace!("branching on column {} at {}", col, point[col]);
                let mut up = rows.clone();
                up.push(Row::at_least(col, floor + 1));
                let mut down = rows;
                down.push(Row::at_most(col, floor));
                stack.push(up);
                stack.push(down);
            }
        }
    }

    Ok(IntegerOutcome { solution: best, relaxation_infeasible })
}

struct RegionSearch<'a> {
    problem: &'a LinearProblem,
    objectives: &'a [Objective],
    regions: &'a [Region],
    node_limit: usize,
    best: Option<(Vec<BigRational>, Vec<BigRational>)>,
    first_infeasible: Option<Vec<Row>>,
}

impl RegionSearch<'_> {
    fn explore(&mut self, extra: Vec<Row>) -> ScheduleResult<()> {
        let cutoff = self.best.as_ref().map(|(key, _)| key.clone());
        let outcome = integer_lexmin(
            self.problem, &extra, self.objectives, cutoff.as_deref(), self.node_limit,
        )?;
        let Some(point) = outcome.solution else {
            if outcome.relaxation_infeasible && self.first_infeasible.is_none() {
                self.first_infeasible = Some(extra);
            }
            return Ok(());
        };

        let Some(region) = self.regions.iter().find(|r| r.is_trivial(&point)) else {
            let key = objective_values(self.objectives, &point);
            self.best = Some((key, point));
            return Ok(());
        };

        for (k, &(neg, pos)) in region.pairs.iter().enumerate() {
            let mut prefix = extra.clone();
            for &(n, p) in &region.pairs[..k] {
                prefix.push(Row::eq(LinearForm::difference(p, n)));
            }
            let mut positive = prefix.clone();
            positive.push(Row::ge(LinearForm { terms: vec![(pos, 1), (neg, -1)], constant: -1 }));
            self.explore(positive)?;
            let mut negative = prefix;
            negative.push(Row::ge(LinearForm { terms: vec![(neg, 1), (pos, -1)], constant: -1 }));
            self.explore(negative)?;
        }
        Ok(())
    }
}

/// Index of the first row of `problem` that, together with all earlier
/// rows and `extra`, makes the rational relaxation infeasible.
pub fn first_conflicting_row(problem: &LinearProblem, extra: &[Row]) -> ScheduleResult<Option<usize>> {
    let n = problem.n_vars();
    let rows = problem.rows();
    let feasible_prefix = |len: usize| simplex::is_feasible(n, extra.iter().chain(&rows[..len]));

    if !feasible_prefix(0)? || feasible_prefix(rows.len())? {
        return Ok(None);
    }
    let (mut lo, mut hi) = (0, rows.len());
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if feasible_prefix(mid)? {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(Some(hi - 1))
}

/// Integer lexmin of `problem` subject to every region being non-trivial.
///
/// When no point exists, the outcome names the first problem row that
/// conflicts with the earliest region restriction whose relaxation was
/// infeasible.
pub fn non_trivial_lexmin(
    problem: &LinearProblem,
    objectives: &[Objective],
    regions: &[Region],
    node_limit: usize,
) -> ScheduleResult<NonTrivialOutcome> {
    let mut search = RegionSearch {
        problem,
        objectives,
        regions,
        node_limit,
        best: None,
        first_infeasible: None,
    };
    search.explore(Vec::new())?;

    if let Some((_, point)) = search.best {
        return Ok(NonTrivialOutcome { solution: Some(point), conflict_row: None });
    }
    let conflict_row = match &search.first_infeasible {
        Some(extra) => first_conflicting_row(problem, extra)?,
        None => None,
    };
    debug!("no non-trivial solution, conflicting row {:?}", conflict_row);
    Ok(NonTrivialOutcome { solution: None, conflict_row })
}

/// Check whether `rows` over `n_free` unrestricted integer variables admit
/// an integer point.
///
/// Each free variable `x_k` is split into rational columns `2k` (negative
/// part) and `2k + 1` (positive part); branching happens on the value of
/// `x_k` itself, so bounded systems are always decided.
pub fn integer_feasible(n_free: usize, rows: &[Row], node_limit: usize) -> ScheduleResult<Feasibility> {
    let mut problem = LinearProblem::new(2 * n_free, false);
    for row in rows {
        let mut form = LinearForm::constant(row.form.constant);
        for &(col, a) in &row.form.terms {
            form.terms.push((2 * col + 1, a));
            form.terms.push((2 * col, -a));
        }
        problem.add_row(Row { form: form.compact(), kind: row.kind });
    }

    let mut stack: Vec<Vec<Row>> = vec![Vec::new()];
    let mut nodes = 0usize;
    while let Some(extra) = stack.pop() {
        nodes += 1;
        if nodes > node_limit {
            warn!("integer emptiness check gave up after {} nodes", node_limit);
            return Ok(Feasibility::Unknown);
        }
        let Some(point) = rational_lexmin(&problem, &extra, &[])? else {
            continue;
        };
        let fractional = (0..n_free)
            .map(|k| (k, &point[2 * k + 1] - &point[2 * k]))
            .find(|(_, v)| !v.is_integer());
        let Some((k, value)) = fractional else {
            return Ok(Feasibility::Feasible);
        };
        let floor = to_bound(&value.floor())?;
        let mut up = extra.clone();
        up.push(Row::ge(LinearForm { terms: vec![(2 * k + 1, 1), (2 * k, -1)], constant: -(floor + 1) }));
        let mut down = extra;
        down.push(Row::ge(LinearForm { terms: vec![(2 * k, 1), (2 * k + 1, -1)], constant: floor }));
        stack.push(up);
        stack.push(down);
    }
    Ok(Feasibility::Infeasible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn int(v: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(v))
    }

    #[test]
    fn test_integer_lexmin_rounds_up() {
        // 2x >= 3
        let mut lp = LinearProblem::new(1, true);
        lp.add_row(Row::ge(LinearForm { terms: vec![(0, 2)], constant: -3 }));
        let out = integer_lexmin(&lp, &[], &[vec![(0, 1)]], None, 100).unwrap();
        assert_eq!(out.solution.unwrap(), vec![int(2)]);
        assert!(!out.relaxation_infeasible);
    }

    #[test]
    fn test_integer_lexmin_no_integer_point() {
        // 2x = 1 has a rational solution only
        let mut lp = LinearProblem::new(1, true);
        lp.add_row(Row::eq(LinearForm { terms: vec![(0, 2)], constant: -1 }));
        let out = integer_lexmin(&lp, &[], &[vec![(0, 1)]], None, 100).unwrap();
        assert!(out.solution.is_none());
        assert!(!out.relaxation_infeasible);
    }

    #[test]
    fn test_cutoff_prunes() {
        let lp = LinearProblem::new(1, true);
        let cutoff = vec![int(0)];
        let out = integer_lexmin(&lp, &[], &[vec![(0, 1)]], Some(&cutoff), 100).unwrap();
        assert!(out.solution.is_none());
    }

    #[test]
    fn test_non_trivial_prefers_positive() {
        // t = pos - neg, region {t}, minimize neg + pos
        let lp = LinearProblem::new(2, true);
        let regions = vec![Region { pairs: vec![(0, 1)] }];
        let out = non_trivial_lexmin(&lp, &[vec![(0, 1), (1, 1)], vec![(0, 1)]], &regions, 100).unwrap();
        assert_eq!(out.solution.unwrap(), vec![int(0), int(1)]);
    }

    #[test]
    fn test_non_trivial_second_variable() {
        // t0 forced to zero, t1 free
        let mut lp = LinearProblem::new(4, true);
        lp.add_row(Row::eq(LinearForm::difference(1, 0)));
        let regions = vec![Region { pairs: vec![(0, 1), (2, 3)] }];
        let total: Objective = (0..4).map(|c| (c, 1)).collect();
        let out = non_trivial_lexmin(&lp, &[total], &regions, 100).unwrap();
        let point = out.solution.unwrap();
        assert_eq!(point[0], point[1]);
        assert_ne!(point[2], point[3]);
    }

    #[test]
    fn test_conflicting_row() {
        // columns x, y, z; the region is x - z
        let mut lp = LinearProblem::new(3, true);
        lp.add_row(Row::at_most(2, 0));
        lp.add_row(Row::at_most(0, 5));
        lp.add_row(Row::eq(LinearForm::difference(0, 1)));
        lp.add_row(Row::at_most(1, 0));
        let regions = vec![Region { pairs: vec![(2, 0)] }];
        let out = non_trivial_lexmin(&lp, &[vec![(0, 1)]], &regions, 100).unwrap();
        assert!(out.solution.is_none());
        assert_eq!(out.conflict_row, Some(3));
    }

    #[test]
    fn test_integer_feasible_free_variables() {
        // x + y = 1, x - y = 0 has no integer point
        let rows = vec![
            Row::eq(LinearForm { terms: vec![(0, 1), (1, 1)], constant: -1 }),
            Row::eq(LinearForm { terms: vec![(0, 1), (1, -1)], constant: 0 }),
        ];
        assert_eq!(integer_feasible(2, &rows, 100).unwrap(), Feasibility::Infeasible);
        // x <= -3 is fine for a free variable
        let rows = vec![Row::ge(LinearForm { terms: vec![(0, -1)], constant: -3 })];
        assert_eq!(integer_feasible(1, &rows, 100).unwrap(), Feasibility::Feasible);
        // 1 <= 3x <= 2
        let rows = vec![
            Row::ge(LinearForm { terms: vec![(0, 3)], constant: -1 }),
            Row::ge(LinearForm { terms: vec![(0, -3)], constant: 2 }),
        ];
        assert_eq!(integer_feasible(1, &rows, 100).unwrap(), Feasibility::Infeasible);
    }
}
