//! # PolySched - Multi-dimensional Affine Scheduling
//!
//! Computes schedules for polyhedral programs: given statement iteration
//! domains and dependence relations between their instances, find one
//! affine function per statement and schedule dimension such that every
//! validity dependence is respected, organized in permutable bands.
//!
//! - Exact rational and integer lexicographic minimization
//! - Farkas coefficient polyhedra for dependence relations
//! - Band construction with coincidence and proximity optimization
//! - Graph splitting, component decomposition and dependence carrying
//! - Conditional validity constraints
//!
//! ## Architecture
//!
//! ```text
//! ScheduleConstraints → DependenceGraph → Scheduler (bands, splits, carrying) → Schedule → Band forest
//! ```
//!
//! ## Example
//!
//! ```rust
//! use polysched::prelude::*;
//!
//! let s1 = IntegerSet::rectangular("S1", &[10]);
//! let s2 = IntegerSet::rectangular("S2", &[10]);
//! let dep = Relation::translation(&s1, &s2, &[0]);
//!
//! let constraints = ScheduleConstraints::on_domain(UnionSet::new().with(s1).with(s2))
//!     .with_validity(UnionRelation::from(dep));
//! let schedule = polysched::compute_schedule(&constraints, &ScheduleOptions::default())?;
//! assert_eq!(schedule.n_total_row, 2);
//! # Ok::<(), polysched::utils::errors::ScheduleError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod polyhedral;
pub mod lp;
pub mod schedule;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::polyhedral::{
        AffineExpr, AffineMap, Constraint, IntegerSet, Relation, Space, Tuple, UnionRelation, UnionSet,
    };
    pub use crate::schedule::{
        Band, FuseStrategy, Schedule, ScheduleAlgorithm, ScheduleConstraints, ScheduleOptions,
        StatementSchedule,
    };
    pub use crate::utils::errors::*;
}

use schedule::{Schedule, ScheduleConstraints, ScheduleOptions};
use utils::errors::ScheduleResult;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compute a schedule for the given constraints.
pub fn compute_schedule(constraints: &ScheduleConstraints, options: &ScheduleOptions) -> ScheduleResult<Schedule> {
    constraints.compute_schedule(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
