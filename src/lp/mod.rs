//! Exact linear and integer programming.
//!
//! Everything the scheduler needs from a solver: rational lexicographic
//! minimization, integer branch and bound, region-restricted lexmin with
//! conflict reporting, and integer emptiness of free-variable systems.

pub mod problem;
pub mod simplex;
pub mod lexmin;

pub use problem::{LinearForm, LinearProblem, Row, RowKind};
pub use simplex::Objective;
pub use lexmin::{
    integer_feasible, integer_lexmin, non_trivial_lexmin, rational_lexmin,
    Feasibility, IntegerOutcome, NonTrivialOutcome, Region,
};
