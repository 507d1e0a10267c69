//! Affine constraints and their conjunctions.
//!
//! Every constraint is stored in normal form against zero: `expr >= 0` or
//! `expr = 0`. Domains and relation disjuncts are conjunctions of them.

use crate::polyhedral::expr::AffineExpr;
use crate::utils::errors::InputError;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Whether a constraint bounds its expression from below or pins it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// `expr >= 0`
    Inequality,
    /// `expr = 0`
    Equality,
}

/// One affine constraint against zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub expr: AffineExpr,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn new(expr: AffineExpr, kind: ConstraintKind) -> Self {
        Self { expr, kind }
    }

    /// `expr >= 0`
    pub fn ge_zero(expr: AffineExpr) -> Self {
        Self::new(expr, ConstraintKind::Inequality)
    }

    /// `expr = 0`
    pub fn eq_zero(expr: AffineExpr) -> Self {
        Self::new(expr, ConstraintKind::Equality)
    }

    /// `dim >= lower`
    pub fn lower_bound(dim: usize, lower: i64, n_dim: usize, n_param: usize) -> Self {
        let mut expr = AffineExpr::var(dim, n_dim, n_param);
        expr.constant = -lower;
        Self::ge_zero(expr)
    }

    /// `dim < bound`, stored as `bound - 1 - dim >= 0`.
    pub fn strict_upper_bound(dim: usize, bound: i64, n_dim: usize, n_param: usize) -> Self {
        let mut expr = -AffineExpr::var(dim, n_dim, n_param);
        expr.constant = bound - 1;
        Self::ge_zero(expr)
    }

    /// `dim < param`, stored as `param - dim - 1 >= 0`.
    pub fn below_param(dim: usize, param: usize, n_dim: usize, n_param: usize) -> Self {
        let mut expr = AffineExpr::param(param, n_dim, n_param) - AffineExpr::var(dim, n_dim, n_param);
        expr.constant = -1;
        Self::ge_zero(expr)
    }

    pub fn is_equality(&self) -> bool {
        self.kind == ConstraintKind::Equality
    }

    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        let value = self.expr.evaluate(dim_values, param_values);
        if self.is_equality() { value == 0 } else { value >= 0 }
    }

    /// The `>= 0` forms of this constraint; an equality yields both signs.
    pub fn as_inequalities(&self) -> Vec<AffineExpr> {
        if self.is_equality() {
            vec![self.expr.clone(), -self.expr.clone()]
        } else {
            vec![self.expr.clone()]
        }
    }

    pub fn n_dim(&self) -> usize {
        self.expr.n_dim()
    }

    pub fn n_param(&self) -> usize {
        self.expr.n_param()
    }

    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let op = if self.is_equality() { "=" } else { ">=" };
        format!("{} {} 0", self.expr.to_string_with_names(dim_names, param_names), op)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = (0..self.n_dim()).map(|i| format!("d{}", i)).collect();
        let params: Vec<String> = (0..self.n_param()).map(|i| format!("p{}", i)).collect();
        f.write_str(&self.to_string_with_names(&dims, &params))
    }
}

/// A conjunction of constraints sharing one column layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintSystem {
    pub constraints: Vec<Constraint>,
    /// Dimension columns of every constraint
    pub n_dim: usize,
    /// Parameter columns of every constraint
    pub n_param: usize,
}

impl ConstraintSystem {
    pub fn new(n_dim: usize, n_param: usize) -> Self {
        Self { constraints: Vec::new(), n_dim, n_param }
    }

    /// Add a constraint with the system's layout.
    pub fn add(&mut self, constraint: Constraint) {
        debug_assert_eq!((constraint.n_dim(), constraint.n_param()), (self.n_dim, self.n_param));
        self.constraints.push(constraint);
    }

    pub fn equalities(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| c.is_equality())
    }

    pub fn is_satisfied(&self, dim_values: &[i64], param_values: &[i64]) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied(dim_values, param_values))
    }

    /// Whether some constraint is a false constant, which makes the system
    /// empty without any search.
    pub fn is_obviously_empty(&self) -> bool {
        self.constraints.iter().any(|c| {
            c.expr.as_constant()
                .is_some_and(|v| if c.is_equality() { v != 0 } else { v < 0 })
        })
    }

    /// Re-lay the dimensions out over `n_dim` columns (see [`AffineExpr::relayout`]).
    pub fn relayout(&self, n_dim: usize, positions: &[usize]) -> Self {
        let constraints = self.constraints.iter()
            .map(|c| Constraint::new(c.expr.relayout(n_dim, positions), c.kind))
            .collect();
        Self { constraints, n_dim, n_param: self.n_param }
    }

    /// Re-express all constraints over the parameter list `to`.
    pub fn align_params(&self, from: &[String], to: &[String]) -> Result<Self, InputError> {
        let constraints = self.constraints.iter()
            .map(|c| Ok(Constraint::new(c.expr.align_params(from, to)?, c.kind)))
            .collect::<Result<Vec<_>, InputError>>()?;
        Ok(Self { constraints, n_dim: self.n_dim, n_param: to.len() })
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_bounds() {
        let lower = Constraint::lower_bound(0, 2, 2, 0);
        let upper = Constraint::strict_upper_bound(0, 10, 2, 0);
        assert!(lower.is_satisfied(&[2, 0], &[]));
        assert!(!lower.is_satisfied(&[1, 0], &[]));
        assert!(upper.is_satisfied(&[9, 0], &[]));
        assert!(!upper.is_satisfied(&[10, 0], &[]));
    }

    #[test]
    fn test_below_param() {
        let c = Constraint::below_param(0, 0, 1, 1);
        assert!(c.is_satisfied(&[9], &[10]));
        assert!(!c.is_satisfied(&[10], &[10]));
    }

    #[test]
    fn test_equality_splits_into_two_inequalities() {
        let c = Constraint::eq_zero(AffineExpr::var(0, 1, 0) - AffineExpr::constant(3, 1, 0));
        let parts = c.as_inequalities();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|e| e.evaluate(&[3], &[]) == 0));
        assert_eq!(c.to_string_with_names(&["i".to_string()], &[]).ends_with("= 0"), true);
    }

    #[test]
    fn test_false_constant_empties_system() {
        let mut sys = ConstraintSystem::new(2, 0);
        sys.add(Constraint::lower_bound(0, 0, 2, 0));
        sys.add(Constraint::strict_upper_bound(1, 10, 2, 0));
        assert!(sys.is_satisfied(&[0, 9], &[]));
        assert!(!sys.is_satisfied(&[0, 10], &[]));
        assert!(!sys.is_obviously_empty());

        sys.add(Constraint::ge_zero(AffineExpr::constant(-1, 2, 0)));
        assert!(sys.is_obviously_empty());
    }

    #[test]
    fn test_relayout() {
        let mut sys = ConstraintSystem::new(2, 0);
        sys.add(Constraint::lower_bound(1, 4, 2, 0));
        let moved = sys.relayout(3, &[0, 2]);
        assert!(moved.is_satisfied(&[0, 0, 4], &[]));
        assert!(!moved.is_satisfied(&[0, 4, 0], &[]));
    }
}
