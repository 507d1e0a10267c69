//! Multi-dimensional affine schedule construction.
//!
//! [`ScheduleConstraints::compute_schedule`] builds a [`graph::DependenceGraph`]
//! and hands it to the band [`controller`], which adds rows found by the
//! [`row_solver`] band by band, splitting the graph along its components
//! or falling back to [`carry`]ing dependences when no band row exists.

pub mod options;
pub mod constraints;
pub mod graph;
pub mod scc;
pub mod row_solver;
pub mod carry;
pub mod conditional;
pub mod controller;
pub mod assemble;
pub mod band;

pub use options::{FuseStrategy, ScheduleAlgorithm, ScheduleOptions};
pub use constraints::ScheduleConstraints;
pub use graph::{DependenceGraph, EdgeKind};
pub use controller::Scheduler;
pub use assemble::{Schedule, StatementSchedule};
pub use band::Band;
