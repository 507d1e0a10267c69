//! Statement spaces.
//!
//! A space names a statement tuple and fixes its layout:
//! - Set dimensions (the iteration vector)
//! - Parameter dimensions (symbolic constants shared by all statements)

use serde::{Serialize, Deserialize};
use std::fmt;

/// The space of a statement's iteration domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Space {
    /// Tuple name identifying the statement
    pub name: String,
    /// Number of set dimensions
    pub n_dim: usize,
    /// Number of parameter dimensions
    pub n_param: usize,
    /// Names of dimensions (optional, for printing)
    #[serde(default)]
    pub dim_names: Vec<String>,
    /// Names of parameters
    #[serde(default)]
    pub param_names: Vec<String>,
}

impl Space {
    /// Create a new set space for the named statement.
    pub fn set(name: impl Into<String>, n_dim: usize) -> Self {
        Self {
            name: name.into(),
            n_dim,
            n_param: 0,
            dim_names: Vec::new(),
            param_names: Vec::new(),
        }
    }

    /// Create a new set space with named parameters.
    pub fn set_with_params(name: impl Into<String>, n_dim: usize, params: &[&str]) -> Self {
        Self::set(name, n_dim)
            .with_param_names(params.iter().map(|p| p.to_string()).collect())
    }

    /// Get the number of set dimensions.
    pub fn dim(&self) -> usize {
        self.n_dim
    }

    /// Set parameter names. This also fixes the parameter count.
    pub fn with_param_names(mut self, names: Vec<String>) -> Self {
        self.n_param = names.len();
        self.param_names = names;
        self
    }

    /// Get the name of a dimension.
    pub fn dim_name(&self, idx: usize) -> Option<&str> {
        self.dim_names.get(idx).map(|s| s.as_str())
    }

    /// Get the name of a parameter.
    pub fn param_name(&self, idx: usize) -> Option<&str> {
        self.param_names.get(idx).map(|s| s.as_str())
    }

    /// Get all dimension names with defaults.
    pub fn all_dim_names(&self) -> Vec<String> {
        (0..self.n_dim)
            .map(|i| {
                self.dim_names.get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("i{}", i))
            })
            .collect()
    }

    /// Get all parameter names with defaults.
    pub fn all_param_names(&self) -> Vec<String> {
        (0..self.n_param)
            .map(|i| {
                self.param_names.get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("p{}", i))
            })
            .collect()
    }

    /// Whether both spaces describe the same statement tuple.
    pub fn same_tuple(&self, other: &Space) -> bool {
        self.name == other.name && self.n_dim == other.n_dim
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.n_param > 0 {
            write!(f, "[{}] -> ", self.all_param_names().join(", "))?;
        }
        write!(f, "{}[{}]", self.name, self.all_dim_names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_space() {
        let space = Space::set("S", 3);
        assert_eq!(space.dim(), 3);
        assert_eq!(space.n_param, 0);
        assert_eq!(format!("{}", space), "S[i0, i1, i2]");
    }

    #[test]
    fn test_with_names() {
        let mut space = Space::set_with_params("S", 2, &["N"]);
        space.dim_names = vec!["i".to_string(), "j".to_string()];
        assert_eq!(space.dim_name(0), Some("i"));
        assert_eq!(space.param_name(0), Some("N"));
        assert_eq!(space.n_param, 1);
        assert_eq!(format!("{}", space), "[N] -> S[i, j]");
    }

    #[test]
    fn test_same_tuple() {
        let a = Space::set("S", 1);
        let mut b = Space::set("S", 1);
        b.dim_names = vec!["k".to_string()];
        assert!(a.same_tuple(&b));
        assert!(!a.same_tuple(&Space::set("T", 1)));
    }
}
