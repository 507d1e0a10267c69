//! Affine Farkas coefficient polyhedra.
//!
//! For a basic relation `R`, the coefficient polyhedron describes every
//! affine form that is non-negative on all of `R`. An affine form
//! `c0 + c_p . p + c . v` is non-negative on `{ v : A v + b >= 0 }` exactly
//! when it is a non-negative combination of the constraints plus a
//! non-negative constant:
//!
//! ```text
//! c_k = sum(lambda_i * A_ik)       for every column k
//! c0 >= sum(lambda_i * b_i)        lambda >= 0
//! ```
//!
//! The multipliers `lambda` stay in the polyhedron as extra rational
//! columns; [`CoefficientPolyhedron::plug_into`] substitutes the
//! coefficients by linear forms of an LP and adds the multipliers there.

use crate::lp::{LinearForm, LinearProblem, Row};
use crate::polyhedral::map::BasicRelation;
use crate::polyhedral::operations;
use crate::utils::errors::{ScheduleError, ScheduleResult};
use std::collections::HashMap;
use std::ops::Range;

/// One row of a coefficient polyhedron:
/// `coef . C + mult . lambda (>= 0 | = 0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefRow {
    /// Weights of the coefficient variables
    pub coef: Vec<i64>,
    /// Weights of the multipliers
    pub mult: Vec<i64>,
    /// Whether the row is an equality
    pub equality: bool,
}

/// The set of affine forms that are non-negative on a relation.
///
/// Coefficient variables are laid out as `[c0, c_params..., c_dims...]`.
/// For the inter-statement kind `c_dims` covers the source dims followed by
/// the destination dims; for the intra-statement kind it holds a single
/// distance vector `c_d`, standing for `-c_d` on the source and `+c_d` on
/// the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientPolyhedron {
    /// Number of coefficient variables
    pub dim: usize,
    /// Number of Farkas multipliers
    pub n_mult: usize,
    /// Rows; empty for an empty relation
    pub rows: Vec<CoefRow>,
}

impl CoefficientPolyhedron {
    /// Forms `c0 + c_p . p + c_x . x + c_y . y` that are non-negative on `rel`.
    pub fn inter(rel: &BasicRelation) -> ScheduleResult<Self> {
        let n_param = rel.n_param();
        let dim = 1 + n_param + rel.n_in + rel.n_out;
        if operations::is_empty(rel)? {
            return Ok(Self { dim, n_mult: 0, rows: Vec::new() });
        }
        let coef_of_col = |k: usize| -> Vec<(usize, i64)> {
            if k < rel.n_in + rel.n_out {
                vec![(1 + n_param + k, 1)]
            } else {
                Vec::new()
            }
        };
        Ok(Self::build(rel, dim, coef_of_col))
    }

    /// Distance forms `c0 + c_p . p + c_d . (y - x)` that are non-negative on
    /// a relation between two instances of the same statement.
    pub fn intra(rel: &BasicRelation) -> ScheduleResult<Self> {
        if rel.n_in != rel.n_out {
            return Err(ScheduleError::internal(format!(
                "intra-statement relation with {} source and {} destination dims",
                rel.n_in, rel.n_out,
            )));
        }
        let n_param = rel.n_param();
        let n_var = rel.n_in;
        let dim = 1 + n_param + n_var;
        if operations::is_empty(rel)? {
            return Ok(Self { dim, n_mult: 0, rows: Vec::new() });
        }
        let coef_of_col = |k: usize| -> Vec<(usize, i64)> {
            if k < n_var {
                vec![(1 + n_param + k, -1)]
            } else if k < 2 * n_var {
                vec![(1 + n_param + k - n_var, 1)]
            } else {
                Vec::new()
            }
        };
        Ok(Self::build(rel, dim, coef_of_col))
    }

    /// `coef_of_col(k)` lists the coefficient variables, with signs, whose
    /// combination is the form's coefficient of relation column `k`.
    fn build(rel: &BasicRelation, dim: usize, coef_of_col: impl Fn(usize) -> Vec<(usize, i64)>) -> Self {
        let n_param = rel.n_param();
        let mut inequalities: Vec<(Vec<i64>, Vec<i64>, i64)> = Vec::new();
        for c in &rel.constraints.constraints {
            for e in c.as_inequalities() {
                inequalities.push((e.coeffs, e.param_coeffs, e.constant));
            }
        }
        let n_mult = inequalities.len();
        let mut rows = Vec::with_capacity(1 + n_param + rel.n_dim());

        let mut constant = CoefRow { coef: vec![0; dim], mult: vec![0; n_mult], equality: false };
        constant.coef[0] = 1;
        for (i, (_, _, b)) in inequalities.iter().enumerate() {
            constant.mult[i] = -b;
        }
        rows.push(constant);

        for p in 0..n_param {
            let mut row = CoefRow { coef: vec![0; dim], mult: vec![0; n_mult], equality: true };
            row.coef[1 + p] = 1;
            for (i, (_, params, _)) in inequalities.iter().enumerate() {
                row.mult[i] = -params[p];
            }
            rows.push(row);
        }

        for k in 0..rel.n_dim() {
            let mut row = CoefRow { coef: vec![0; dim], mult: vec![0; n_mult], equality: true };
            for (j, s) in coef_of_col(k) {
                row.coef[j] += s;
            }
            for (i, (coeffs, _, _)) in inequalities.iter().enumerate() {
                row.mult[i] = -coeffs[k];
            }
            rows.push(row);
        }

        Self { dim, n_mult, rows }
    }

    /// Whether the relation was empty, so that every form qualifies.
    pub fn is_universe(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add the rows to `lp`, with coefficient variable `j` replaced by
    /// `mapping[j]` and fresh rational columns for the multipliers.
    /// Returns the indices of the added rows.
    pub fn plug_into(&self, lp: &mut LinearProblem, mapping: &[LinearForm]) -> ScheduleResult<Range<usize>> {
        if mapping.len() != self.dim {
            return Err(ScheduleError::internal(format!(
                "coefficient mapping has {} entries, expected {}",
                mapping.len(), self.dim,
            )));
        }
        let start = lp.n_rows();
        let mult = lp.add_vars(self.n_mult, false);
        for row in &self.rows {
            let mut form = LinearForm::zero();
            for (j, &a) in row.coef.iter().enumerate() {
                form.add_scaled(&mapping[j], a);
            }
            form.terms.extend(row.mult.iter().enumerate()
                .filter(|(_, &a)| a != 0)
                .map(|(i, &a)| (mult.start + i, a)));
            lp.add_row(if row.equality { Row::eq(form) } else { Row::ge(form) });
        }
        Ok(start..lp.n_rows())
    }
}

/// Memoized coefficient polyhedra, keyed by the basic relation.
#[derive(Debug, Default)]
pub struct CoefficientCache {
    intra: HashMap<BasicRelation, CoefficientPolyhedron>,
    inter: HashMap<BasicRelation, CoefficientPolyhedron>,
}

impl CoefficientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intra(&mut self, rel: &BasicRelation) -> ScheduleResult<CoefficientPolyhedron> {
        if let Some(coef) = self.intra.get(rel) {
            return Ok(coef.clone());
        }
        let coef = CoefficientPolyhedron::intra(rel)?;
        self.intra.insert(rel.clone(), coef.clone());
        Ok(coef)
    }

    pub fn inter(&mut self, rel: &BasicRelation) -> ScheduleResult<CoefficientPolyhedron> {
        if let Some(coef) = self.inter.get(rel) {
            return Ok(coef.clone());
        }
        let coef = CoefficientPolyhedron::inter(rel)?;
        self.inter.insert(rel.clone(), coef.clone());
        Ok(coef)
    }

    pub fn len(&self) -> usize {
        self.intra.len() + self.inter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::lexmin::rational_lexmin;
    use crate::polyhedral::map::Relation;
    use crate::polyhedral::set::IntegerSet;

    /// Whether the fixed coefficient vector lies in the polyhedron.
    fn admits(coef: &CoefficientPolyhedron, values: &[i64]) -> bool {
        let mut lp = LinearProblem::new(0, false);
        let mapping: Vec<LinearForm> = values.iter().map(|&v| LinearForm::constant(v)).collect();
        coef.plug_into(&mut lp, &mapping).unwrap();
        rational_lexmin(&lp, &[], &[]).unwrap().is_some()
    }

    #[test]
    fn test_intra_distance() {
        // S[i] -> S[i + 1], 0 <= i < 10: distances are exactly 1
        let s = IntegerSet::rectangular("S", &[10]);
        let rel = Relation::translation(&s, &s, &[1]);
        let coef = CoefficientPolyhedron::intra(&rel.disjuncts[0]).unwrap();
        assert_eq!(coef.dim, 2);
        // c0 = 0, c_d = 1: distance 1 >= 0
        assert!(admits(&coef, &[0, 1]));
        // c0 = 0, c_d = -1: distance -1 < 0
        assert!(!admits(&coef, &[0, -1]));
        // c0 = 1, c_d = -1: 1 - 1 >= 0
        assert!(admits(&coef, &[1, -1]));
    }

    #[test]
    fn test_inter_forms() {
        // S[i] -> T[j] with j = i, 0 <= i < 10
        let s = IntegerSet::rectangular("S", &[10]);
        let t = IntegerSet::rectangular("T", &[10]);
        let rel = Relation::translation(&s, &t, &[0]);
        let coef = CoefficientPolyhedron::inter(&rel.disjuncts[0]).unwrap();
        assert_eq!(coef.dim, 3);
        // j - i >= 0
        assert!(admits(&coef, &[0, -1, 1]));
        // i >= 0 on the domain
        assert!(admits(&coef, &[0, 1, 0]));
        // -j >= 0 fails
        assert!(!admits(&coef, &[0, 0, -1]));
        // 9 - j >= 0 holds
        assert!(admits(&coef, &[9, 0, -1]));
    }

    #[test]
    fn test_empty_relation_is_universe() {
        let s = IntegerSet::rectangular("S", &[10]);
        let rel = Relation::translation(&s, &s, &[20]);
        let coef = CoefficientPolyhedron::intra(&rel.disjuncts[0]).unwrap();
        assert!(coef.is_universe());
        assert!(admits(&coef, &[-5, -3]));
    }

    #[test]
    fn test_cache_reuses_entries() {
        let s = IntegerSet::rectangular("S", &[10]);
        let rel = Relation::translation(&s, &s, &[1]);
        let mut cache = CoefficientCache::new();
        let a = cache.intra(&rel.disjuncts[0]).unwrap();
        let b = cache.intra(&rel.disjuncts[0]).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
    }
}
