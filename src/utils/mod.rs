//! Utility modules for the scheduler.
//!
//! - Error types
//! - Integer matrices and Hermite normal form

pub mod errors;
pub mod matrix;

// Re-exports
pub use errors::*;
pub use matrix::IntMatrix;
