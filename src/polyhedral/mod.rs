//! Polyhedral data structures and operations.
//!
//! This module provides what the scheduler needs from the polyhedral model:
//! - Affine expressions and constraints
//! - Statement domains and dependence relations
//! - Affine schedule maps
//! - Emptiness and adjacency tests
//! - Farkas coefficient polyhedra

pub mod space;
pub mod expr;
pub mod constraint;
pub mod set;
pub mod map;
pub mod operations;
pub mod farkas;

pub use space::Space;
pub use expr::AffineExpr;
pub use constraint::{Constraint, ConstraintKind, ConstraintSystem};
pub use set::{IntegerSet, UnionSet};
pub use map::{AffineMap, BasicRelation, Relation, Side, Tag, Tuple, UnionRelation};
pub use farkas::{CoefficientCache, CoefficientPolyhedron};
