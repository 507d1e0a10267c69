//! Error types for the scheduler.
//!
//! Errors are grouped by the layer that produces them. Infeasible rows are
//! not errors: the band controller handles them as ordinary branches.

use thiserror::Error;
use std::fmt;

/// Top-level error type for schedule construction.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A contract inside the scheduler was broken
    #[error("Internal error: {0}")]
    Internal(String),

    /// The constraints admit no schedule
    #[error("No schedule exists: {0}")]
    Unschedulable(#[from] UnschedulableError),

    /// Failure inside the exact arithmetic layer
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// Malformed schedule constraints
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScheduleError {
    /// Build an internal error from a message.
    pub fn internal(message: impl Into<String>) -> Self {
        ScheduleError::Internal(message.into())
    }

    /// Whether this is the "no schedule exists" outcome.
    pub fn is_unschedulable(&self) -> bool {
        matches!(self, ScheduleError::Unschedulable(_))
    }
}

/// The constraints cannot be satisfied by any schedule.
#[derive(Error, Debug, Clone)]
pub struct UnschedulableError {
    /// The error message
    pub message: String,
    /// Which fallback gave up
    pub kind: UnschedulableErrorKind,
}

impl fmt::Display for UnschedulableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl UnschedulableError {
    /// Carrying made no progress.
    pub fn cannot_carry() -> Self {
        Self {
            message: "unable to carry dependences".to_string(),
            kind: UnschedulableErrorKind::CannotCarry,
        }
    }

    /// A carrying row was degenerate and there is nothing left to split.
    pub fn no_non_trivial_solution() -> Self {
        Self {
            message: "unable to construct non-trivial solution".to_string(),
            kind: UnschedulableErrorKind::NoNonTrivialSolution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnschedulableErrorKind {
    /// No dependence could be carried by a single row
    CannotCarry,
    /// The carrying row was trivial on a single component
    NoNonTrivialSolution,
}

/// Error raised by the linear programming layer.
#[derive(Error, Debug, Clone)]
pub struct SolverError {
    /// The error message
    pub message: String,
    /// The kind of solver error
    pub kind: SolverErrorKind,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl SolverError {
    /// Create a solver error of the given kind.
    pub fn new(kind: SolverErrorKind, message: impl Into<String>) -> Self {
        Self { message: message.into(), kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverErrorKind {
    /// Branch and bound exceeded its node budget
    NodeLimit,
    /// A value does not fit in a machine integer
    Overflow,
    /// An objective has no lower bound
    Unbounded,
    /// A problem known to be feasible returned no point
    NoSolution,
}

/// Error in the schedule constraints handed to the scheduler.
#[derive(Error, Debug, Clone)]
pub struct InputError {
    /// The error message
    pub message: String,
    /// The kind of input error
    pub kind: InputErrorKind,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl InputError {
    /// Create an input error of the given kind.
    pub fn new(kind: InputErrorKind, message: impl Into<String>) -> Self {
        Self { message: message.into(), kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputErrorKind {
    /// A parameter name is missing from the global parameter list
    UnknownParameter,
    /// A relation disagrees with its statement's dimension count
    DimensionMismatch,
    /// Constraint rows do not match the declared layout
    MalformedRelation,
}

/// Result type using ScheduleError.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScheduleError::from(UnschedulableError::cannot_carry());
        let s = format!("{}", err);
        assert!(s.contains("unable to carry dependences"));
        assert!(err.is_unschedulable());
    }

    #[test]
    fn test_solver_error_kind() {
        let err = SolverError::new(SolverErrorKind::NodeLimit, "budget exhausted");
        assert_eq!(err.kind, SolverErrorKind::NodeLimit);
        let wrapped: ScheduleError = err.into();
        assert!(!wrapped.is_unschedulable());
        assert!(format!("{}", wrapped).starts_with("Solver error"));
    }
}
