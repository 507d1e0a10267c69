//! Integer sets for statement iteration domains.

use crate::polyhedral::space::Space;
use crate::polyhedral::constraint::{Constraint, ConstraintSystem};
use crate::utils::errors::InputError;
use serde::{Serialize, Deserialize};
use std::fmt;

/// An integer set defined by affine constraints in a named statement space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerSet {
    pub space: Space,
    pub constraints: ConstraintSystem,
}

impl IntegerSet {
    pub fn universe(space: Space) -> Self {
        let constraints = ConstraintSystem::new(space.n_dim, space.n_param);
        Self { space, constraints }
    }

    /// `{ name[i0, ...] : 0 <= ik < bounds[k] }`
    pub fn rectangular(name: &str, bounds: &[i64]) -> Self {
        let n_dim = bounds.len();
        let mut set = Self::universe(Space::set(name, n_dim));
        for (i, &bound) in bounds.iter().enumerate() {
            set.add_constraint(Constraint::lower_bound(i, 0, n_dim, 0));
            set.add_constraint(Constraint::strict_upper_bound(i, bound, n_dim, 0));
        }
        set
    }

    /// `{ name[i0, ...] : 0 <= ik < params[k] }` for the given parameter names.
    pub fn parametric_box(name: &str, params: &[&str]) -> Self {
        let n_dim = params.len();
        let space = Space::set_with_params(name, n_dim, params);
        let mut set = Self::universe(space);
        for i in 0..n_dim {
            set.add_constraint(Constraint::lower_bound(i, 0, n_dim, n_dim));
            set.add_constraint(Constraint::below_param(i, i, n_dim, n_dim));
        }
        set
    }

    pub fn name(&self) -> &str { &self.space.name }
    pub fn dim(&self) -> usize { self.space.n_dim }
    pub fn n_param(&self) -> usize { self.space.n_param }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.add(constraint);
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    pub fn contains(&self, point: &[i64], params: &[i64]) -> bool {
        self.constraints.is_satisfied(point, params)
    }

    pub fn is_obviously_empty(&self) -> bool {
        self.constraints.is_obviously_empty()
    }

    /// Re-express the set over the global parameter list.
    pub fn align_params(&self, params: &[String]) -> Result<Self, InputError> {
        let from = self.space.all_param_names();
        let constraints = self.constraints.align_params(&from, params)?;
        let space = self.space.clone().with_param_names(params.to_vec());
        Ok(Self { space, constraints })
    }
}

impl fmt::Display for IntegerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names = self.space.all_dim_names();
        let param_names = self.space.all_param_names();
        write!(f, "{{ {}", self.space)?;
        if !self.constraints.is_empty() {
            write!(f, " : ")?;
            for (i, c) in self.constraints.constraints.iter().enumerate() {
                if i > 0 { write!(f, " and ")?; }
                write!(f, "{}", c.to_string_with_names(&dim_names, &param_names))?;
            }
        }
        write!(f, " }}")
    }
}

/// The statement domains of a scheduling problem, one set per statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnionSet {
    pub sets: Vec<IntegerSet>,
}

impl UnionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement domain. A second set for an existing tuple is dropped;
    /// only the space of a domain matters for scheduling.
    pub fn add(&mut self, set: IntegerSet) {
        if self.find(set.name()).is_none() {
            self.sets.push(set);
        }
    }

    pub fn with(mut self, set: IntegerSet) -> Self {
        self.add(set);
        self
    }

    pub fn find(&self, name: &str) -> Option<&IntegerSet> {
        self.sets.iter().find(|s| s.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntegerSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl FromIterator<IntegerSet> for UnionSet {
    fn from_iter<T: IntoIterator<Item = IntegerSet>>(iter: T) -> Self {
        let mut union = UnionSet::new();
        for set in iter {
            union.add(set);
        }
        union
    }
}
