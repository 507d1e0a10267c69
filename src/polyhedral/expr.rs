//! Affine expressions for polyhedral representation.
//!
//! An affine expression is a linear combination of variables and parameters
//! plus a constant:
//! `aff(x, p) = c0 + c1*x1 + ... + cn*xn + d1*p1 + ... + dm*pm`

use crate::utils::errors::{InputError, InputErrorKind};
use serde::{Serialize, Deserialize};
use std::fmt;
use std::ops::{Add, Sub, Neg};

/// An affine expression: constant + sum(coeff[i] * var[i]) + sum(param_coeff[j] * param[j])
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffineExpr {
    /// Constant term
    pub constant: i64,
    /// Coefficients for each dimension (index = dimension index)
    pub coeffs: Vec<i64>,
    /// Coefficients for parameters (index = parameter index)
    pub param_coeffs: Vec<i64>,
}

impl AffineExpr {
    /// Create a zero expression.
    pub fn zero(n_dim: usize, n_param: usize) -> Self {
        Self {
            constant: 0,
            coeffs: vec![0; n_dim],
            param_coeffs: vec![0; n_param],
        }
    }

    /// Create a constant expression.
    pub fn constant(value: i64, n_dim: usize, n_param: usize) -> Self {
        Self {
            constant: value,
            ..Self::zero(n_dim, n_param)
        }
    }

    /// Create an expression for a single dimension variable.
    pub fn var(dim: usize, n_dim: usize, n_param: usize) -> Self {
        let mut expr = Self::zero(n_dim, n_param);
        if dim < n_dim {
            expr.coeffs[dim] = 1;
        }
        expr
    }

    /// Create an expression for a parameter.
    pub fn param(param_idx: usize, n_dim: usize, n_param: usize) -> Self {
        let mut expr = Self::zero(n_dim, n_param);
        if param_idx < n_param {
            expr.param_coeffs[param_idx] = 1;
        }
        expr
    }

    /// Build an expression from a schedule row laid out as
    /// `[constant, params..., dims...]`.
    pub fn from_row(row: &[i64], n_param: usize) -> Self {
        Self {
            constant: row[0],
            param_coeffs: row[1..1 + n_param].to_vec(),
            coeffs: row[1 + n_param..].to_vec(),
        }
    }

    /// Check if this is a constant expression.
    pub fn is_constant(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0) &&
        self.param_coeffs.iter().all(|&c| c == 0)
    }

    /// Check if this expression is zero.
    pub fn is_zero(&self) -> bool {
        self.constant == 0 && self.is_constant()
    }

    /// Get the constant value if this is a constant expression.
    pub fn as_constant(&self) -> Option<i64> {
        if self.is_constant() {
            Some(self.constant)
        } else {
            None
        }
    }

    /// Get the number of dimensions.
    pub fn n_dim(&self) -> usize {
        self.coeffs.len()
    }

    /// Get the number of parameters.
    pub fn n_param(&self) -> usize {
        self.param_coeffs.len()
    }

    /// Get coefficient for a dimension.
    pub fn coeff(&self, dim: usize) -> i64 {
        self.coeffs.get(dim).copied().unwrap_or(0)
    }

    /// Get coefficient for a parameter.
    pub fn param_coeff(&self, idx: usize) -> i64 {
        self.param_coeffs.get(idx).copied().unwrap_or(0)
    }

    /// Evaluate the expression given concrete values.
    pub fn evaluate(&self, dim_values: &[i64], param_values: &[i64]) -> i64 {
        let mut result = self.constant;
        for (i, &c) in self.coeffs.iter().enumerate() {
            if let Some(&v) = dim_values.get(i) {
                result += c * v;
            }
        }
        for (i, &c) in self.param_coeffs.iter().enumerate() {
            if let Some(&v) = param_values.get(i) {
                result += c * v;
            }
        }
        result
    }

    /// Scale the expression by a constant.
    pub fn scale(&self, factor: i64) -> Self {
        Self {
            constant: self.constant * factor,
            coeffs: self.coeffs.iter().map(|&c| c * factor).collect(),
            param_coeffs: self.param_coeffs.iter().map(|&c| c * factor).collect(),
        }
    }

    /// Get GCD of the dimension and parameter coefficients.
    pub fn linear_gcd(&self) -> i64 {
        use num_integer::Integer;
        self.coeffs.iter()
            .chain(&self.param_coeffs)
            .fold(0i64, |g, &c| g.gcd(&c))
    }

    /// Re-lay the dimensions out over `n_dim` columns. Dimension `i` of
    /// `self` moves to column `positions[i]`.
    pub fn relayout(&self, n_dim: usize, positions: &[usize]) -> Self {
        debug_assert_eq!(positions.len(), self.coeffs.len());
        let mut coeffs = vec![0; n_dim];
        for (&c, &pos) in self.coeffs.iter().zip(positions) {
            coeffs[pos] += c;
        }
        Self {
            constant: self.constant,
            coeffs,
            param_coeffs: self.param_coeffs.clone(),
        }
    }

    /// Place the dimensions of `self` at `offset` inside `n_dim` columns.
    pub fn embed(&self, n_dim: usize, offset: usize) -> Self {
        let positions: Vec<usize> = (0..self.n_dim()).map(|i| offset + i).collect();
        self.relayout(n_dim, &positions)
    }

    /// Re-express the parameter coefficients, given by name in `from`,
    /// over the parameter list `to`.
    pub fn align_params(&self, from: &[String], to: &[String]) -> Result<Self, InputError> {
        let mut param_coeffs = vec![0; to.len()];
        for (i, &c) in self.param_coeffs.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let name = from.get(i).ok_or_else(|| InputError::new(
                InputErrorKind::UnknownParameter,
                format!("parameter {} has no name", i),
            ))?;
            let pos = to.iter().position(|p| p == name).ok_or_else(|| InputError::new(
                InputErrorKind::UnknownParameter,
                format!("unknown parameter '{}'", name),
            ))?;
            param_coeffs[pos] = c;
        }
        Ok(Self {
            constant: self.constant,
            coeffs: self.coeffs.clone(),
            param_coeffs,
        })
    }

    /// Convert to string with given dimension and parameter names.
    pub fn to_string_with_names(&self, dim_names: &[String], param_names: &[String]) -> String {
        let mut parts = Vec::new();

        let mut push_term = |c: i64, name: &str| {
            if c == 1 {
                parts.push(name.to_string());
            } else if c == -1 {
                parts.push(format!("-{}", name));
            } else {
                parts.push(format!("{}*{}", c, name));
            }
        };

        for (i, &c) in self.coeffs.iter().enumerate() {
            if c != 0 {
                let default_name = format!("d{}", i);
                let name = dim_names.get(i).map(|s| s.as_str()).unwrap_or(&default_name);
                push_term(c, name);
            }
        }

        for (i, &c) in self.param_coeffs.iter().enumerate() {
            if c != 0 {
                let default_name = format!("p{}", i);
                let name = param_names.get(i).map(|s| s.as_str()).unwrap_or(&default_name);
                push_term(c, name);
            }
        }

        if self.constant != 0 || parts.is_empty() {
            parts.push(format!("{}", self.constant));
        }

        parts.join(" + ").replace("+ -", "- ")
    }
}

impl Add for AffineExpr {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        assert_eq!(self.coeffs.len(), other.coeffs.len());
        assert_eq!(self.param_coeffs.len(), other.param_coeffs.len());
        Self {
            constant: self.constant + other.constant,
            coeffs: self.coeffs.iter().zip(&other.coeffs)
                .map(|(&a, &b)| a + b).collect(),
            param_coeffs: self.param_coeffs.iter().zip(&other.param_coeffs)
                .map(|(&a, &b)| a + b).collect(),
        }
    }
}

impl Sub for AffineExpr {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + (-other)
    }
}

impl Neg for AffineExpr {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(-1)
    }
}

impl fmt::Display for AffineExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names: Vec<String> = (0..self.n_dim()).map(|i| format!("d{}", i)).collect();
        let param_names: Vec<String> = (0..self.n_param()).map(|i| format!("p{}", i)).collect();
        write!(f, "{}", self.to_string_with_names(&dim_names, &param_names))
    }
}
