//! Emptiness and adjacency tests on relations.
//!
//! Parameters, tag columns and existential locals are all treated as free
//! integer variables, so "empty" means empty for every parameter value.

use crate::lp::{integer_feasible, Feasibility, LinearForm, Row};
use crate::polyhedral::constraint::{Constraint, ConstraintKind, ConstraintSystem};
use crate::polyhedral::expr::AffineExpr;
use crate::polyhedral::map::{BasicRelation, Relation, Side};
use crate::utils::errors::ScheduleResult;
use crate::utils::matrix::IntMatrix;
use log::trace;

/// Branch-and-bound budget for a single emptiness test.
pub const EMPTINESS_NODE_LIMIT: usize = 2000;

/// Columns are `[dims..., params...]`.
fn system_rows(cs: &ConstraintSystem) -> Vec<Row> {
    cs.constraints.iter().map(|c| {
        let mut form = LinearForm::constant(c.expr.constant);
        form.terms.extend(c.expr.coeffs.iter().enumerate().map(|(i, &a)| (i, a)));
        form.terms.extend(c.expr.param_coeffs.iter().enumerate().map(|(i, &a)| (cs.n_dim + i, a)));
        match c.kind {
            ConstraintKind::Inequality => Row::ge(form),
            ConstraintKind::Equality => Row::eq(form),
        }
    }).collect()
}

/// An equality whose coefficients share a factor that does not divide its
/// constant has no integer solution.
fn fails_gcd_test(cs: &ConstraintSystem) -> bool {
    cs.equalities().any(|c| {
        let g = c.expr.linear_gcd();
        if g == 0 {
            c.expr.constant != 0
        } else {
            c.expr.constant % g != 0
        }
    })
}

/// Whether a constraint system has no integer point.
///
/// If the search budget runs out the system is reported non-empty, which
/// only ever keeps more constraints than necessary.
pub fn system_is_empty(cs: &ConstraintSystem) -> ScheduleResult<bool> {
    if cs.is_obviously_empty() || fails_gcd_test(cs) {
        return Ok(true);
    }
    let rows = system_rows(cs);
    let outcome = integer_feasible(cs.n_dim + cs.n_param, &rows, EMPTINESS_NODE_LIMIT)?;
    Ok(outcome == Feasibility::Infeasible)
}

/// Whether a basic relation has no integer point.
pub fn is_empty(basic: &BasicRelation) -> ScheduleResult<bool> {
    system_is_empty(&basic.constraints)
}

/// Whether every disjunct of a relation is empty.
pub fn relation_is_empty(rel: &Relation) -> ScheduleResult<bool> {
    for basic in &rel.disjuncts {
        if !is_empty(basic)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Drop the disjuncts that hold no integer point.
pub fn remove_empty_disjuncts(rel: &Relation) -> ScheduleResult<Relation> {
    let mut disjuncts = Vec::with_capacity(rel.disjuncts.len());
    for basic in &rel.disjuncts {
        if !is_empty(basic)? {
            disjuncts.push(basic.clone());
        }
    }
    Ok(Relation { disjuncts, ..rel.clone() })
}

/// Whether some pair satisfies `sign * (dst_row(y) - src_row(x)) >= 1`.
fn has_distance_beyond(rel: &Relation, src_row: &[i64], dst_row: &[i64], sign: i64) -> ScheduleResult<bool> {
    for basic in &rel.disjuncts {
        let mut test = basic.clone();
        let mut diff = basic.row_distance(src_row, dst_row).scale(sign);
        diff.constant -= 1;
        test.add_constraint(Constraint::ge_zero(diff));
        if !is_empty(&test)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether some pair of the relation is scheduled strictly backwards by the
/// given rows, i.e. `src_row(x) > dst_row(y)`.
pub fn orders_backwards(rel: &Relation, src_row: &[i64], dst_row: &[i64]) -> ScheduleResult<bool> {
    has_distance_beyond(rel, src_row, dst_row, -1)
}

/// Whether every pair of the relation is mapped to the same point by the
/// two schedules.
pub fn is_condition_false(rel: &Relation, src_sched: &IntMatrix, dst_sched: &IntMatrix) -> ScheduleResult<bool> {
    for (src_row, dst_row) in src_sched.rows().zip(dst_sched.rows()) {
        if has_distance_beyond(rel, src_row, dst_row, 1)? || has_distance_beyond(rel, src_row, dst_row, -1)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn side_range(basic: &BasicRelation, side: Side) -> std::ops::Range<usize> {
    match side {
        Side::Source => 0..basic.n_in,
        Side::Destination => basic.n_in..basic.n_in + basic.n_out,
    }
}

/// Whether the `a_side` tuple set of `a` meets the `b_side` tuple set of
/// `b`. Tuples must agree in statement name and tag.
pub fn sides_meet(a: &Relation, a_side: Side, b: &Relation, b_side: Side) -> ScheduleResult<bool> {
    let a_tuple = match a_side {
        Side::Source => &a.src,
        Side::Destination => &a.dst,
    };
    let b_tuple = match b_side {
        Side::Source => &b.src,
        Side::Destination => &b.dst,
    };
    if a_tuple != b_tuple || a.params != b.params {
        return Ok(false);
    }

    for ab in &a.disjuncts {
        for bb in &b.disjuncts {
            let n_dim = ab.n_dim() + bb.n_dim();
            let mut joined = ConstraintSystem::new(n_dim, a.n_param());
            for c in &ab.constraints.constraints {
                joined.add(Constraint::new(c.expr.embed(n_dim, 0), c.kind));
            }
            for c in &bb.constraints.constraints {
                joined.add(Constraint::new(c.expr.embed(n_dim, ab.n_dim()), c.kind));
            }
            for (i, j) in side_range(ab, a_side).zip(side_range(bb, b_side)) {
                let mut eq = AffineExpr::zero(n_dim, a.n_param());
                eq.coeffs[i] = 1;
                eq.coeffs[ab.n_dim() + j] = -1;
                joined.add(Constraint::eq_zero(eq));
            }
            if !system_is_empty(&joined)? {
                trace!("{} meets {}", a_tuple, b_tuple);
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Whether the domain of `a` meets the range of `b`.
pub fn domain_meets_range(a: &Relation, b: &Relation) -> ScheduleResult<bool> {
    sides_meet(a, Side::Source, b, Side::Destination)
}

/// Whether the range of `a` meets the domain of `b`.
pub fn range_meets_domain(a: &Relation, b: &Relation) -> ScheduleResult<bool> {
    sides_meet(a, Side::Destination, b, Side::Source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::map::Tuple;
    use crate::polyhedral::set::IntegerSet;

    #[test]
    fn test_empty_relation() {
        let s = IntegerSet::rectangular("S", &[10]);
        let rel = Relation::translation(&s, &s, &[10]);
        assert!(relation_is_empty(&rel).unwrap());
        let rel = Relation::translation(&s, &s, &[9]);
        assert!(!relation_is_empty(&rel).unwrap());
    }

    #[test]
    fn test_gcd_emptiness() {
        // 2 * x0 = 2 * x1 + 1
        let s = IntegerSet::rectangular("S", &[10]);
        let mut rel = Relation::product(&s, &s);
        let b = &mut rel.disjuncts[0];
        let e = b.dst_var(0).scale(2) - b.src_var(0).scale(2) - b.constant(1);
        b.add_constraint(Constraint::eq_zero(e));
        assert!(remove_empty_disjuncts(&rel).unwrap().disjuncts.is_empty());
    }

    #[test]
    fn test_orders_backwards() {
        let s = IntegerSet::rectangular("S", &[10]);
        let rel = Relation::translation(&s, &s, &[1]);
        // row i: x -> x + 1 goes forward
        assert!(!orders_backwards(&rel, &[0, 1], &[0, 1]).unwrap());
        // row -i: goes backward
        assert!(orders_backwards(&rel, &[0, -1], &[0, -1]).unwrap());
    }

    #[test]
    fn test_condition_false() {
        let s = IntegerSet::rectangular("S", &[10]);
        let rel = Relation::translation(&s, &s, &[0]);
        let sched = IntMatrix::from_rows(2, vec![vec![0, 1]]);
        assert!(is_condition_false(&rel, &sched, &sched).unwrap());
        let rel = Relation::translation(&s, &s, &[1]);
        assert!(!is_condition_false(&rel, &sched, &sched).unwrap());
        let constant = IntMatrix::from_rows(2, vec![vec![3, 0]]);
        assert!(is_condition_false(&rel, &constant, &constant).unwrap());
    }

    #[test]
    fn test_sides_meet() {
        let s = IntegerSet::rectangular("S", &[10]);
        let t = IntegerSet::rectangular("T", &[10]);
        // S -> T with j = i, i < 3, and T -> S with i >= 5
        let mut st = Relation::translation(&s, &t, &[0]);
        let b = &mut st.disjuncts[0];
        let c = Constraint::ge_zero(b.constant(2) - b.src_var(0));
        b.add_constraint(c);
        let mut ts = Relation::translation(&t, &s, &[0]);
        let b = &mut ts.disjuncts[0];
        let c = Constraint::ge_zero(b.src_var(0) - b.constant(5));
        b.add_constraint(c);

        assert!(!range_meets_domain(&st, &ts).unwrap());
        let plain = Relation::translation(&t, &s, &[0]);
        assert!(range_meets_domain(&st, &plain).unwrap());
        assert!(domain_meets_range(&st, &plain).unwrap());
        // different tags never meet
        let mut tagged = plain.with_dummy_tags();
        tagged.src = Tuple::tagged("T", 1, "A", 0);
        assert!(!range_meets_domain(&st, &tagged).unwrap());
    }
}
