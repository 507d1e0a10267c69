//! Scheduler configuration.

use serde::{Serialize, Deserialize};

/// Scheduling algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleAlgorithm {
    /// Band-based scheduler: permutable bands first, carrying as a fallback
    #[default]
    Isl,
    /// Feautrier's algorithm: carry as many dependences as possible per row
    Feautrier,
}

/// How eagerly statements are fused into shared bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuseStrategy {
    /// Keep weakly connected statements together
    #[default]
    Max,
    /// Decompose by strongly connected components
    Min,
}

/// Options controlling schedule construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOptions {
    /// Upper bound on the absolute value of every schedule coefficient
    pub max_coefficient: Option<u32>,
    /// Upper bound on the constant term of every row
    pub max_constant_term: Option<u32>,
    /// Split a common factor off the constant term after a carrying row
    pub split_scaled: bool,
    /// Scheduling algorithm
    pub algorithm: ScheduleAlgorithm,
    /// Fusion strategy
    pub fuse: FuseStrategy,
    /// Prefer splitting the graph over closing a band early
    pub maximize_band_depth: bool,
    /// Require the first row of every band to be coincident
    pub outer_coincidence: bool,
    /// Order independent components by a separate row
    pub separate_components: bool,
    /// Branch-and-bound budget per linear problem
    pub branch_node_limit: usize,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            max_coefficient: None,
            max_constant_term: None,
            split_scaled: true,
            algorithm: ScheduleAlgorithm::Isl,
            fuse: FuseStrategy::Max,
            maximize_band_depth: false,
            outer_coincidence: false,
            separate_components: false,
            branch_node_limit: 20_000,
        }
    }
}

impl ScheduleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_coefficient(mut self, bound: u32) -> Self {
        self.max_coefficient = Some(bound);
        self
    }

    pub fn with_max_constant_term(mut self, bound: u32) -> Self {
        self.max_constant_term = Some(bound);
        self
    }

    pub fn with_split_scaled(mut self, enable: bool) -> Self {
        self.split_scaled = enable;
        self
    }

    pub fn with_algorithm(mut self, algo: ScheduleAlgorithm) -> Self {
        self.algorithm = algo;
        self
    }

    pub fn with_fuse(mut self, fuse: FuseStrategy) -> Self {
        self.fuse = fuse;
        self
    }

    pub fn with_maximize_band_depth(mut self, enable: bool) -> Self {
        self.maximize_band_depth = enable;
        self
    }

    pub fn with_outer_coincidence(mut self, enable: bool) -> Self {
        self.outer_coincidence = enable;
        self
    }

    pub fn with_separate_components(mut self, enable: bool) -> Self {
        self.separate_components = enable;
        self
    }

    pub fn with_branch_node_limit(mut self, limit: usize) -> Self {
        self.branch_node_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ScheduleOptions::default();
        assert!(opts.split_scaled);
        assert_eq!(opts.algorithm, ScheduleAlgorithm::Isl);
        assert_eq!(opts.fuse, FuseStrategy::Max);
        assert!(opts.max_coefficient.is_none());
    }

    #[test]
    fn test_builders() {
        let opts = ScheduleOptions::new()
            .with_max_coefficient(2)
            .with_fuse(FuseStrategy::Min)
            .with_algorithm(ScheduleAlgorithm::Feautrier);
        assert_eq!(opts.max_coefficient, Some(2));
        assert_eq!(opts.fuse, FuseStrategy::Min);
        assert_eq!(opts.algorithm, ScheduleAlgorithm::Feautrier);
    }

    #[test]
    fn test_partial_json() {
        let opts: ScheduleOptions = serde_json::from_str(r#"{"fuse": "min", "split_scaled": false}"#).unwrap();
        assert_eq!(opts.fuse, FuseStrategy::Min);
        assert!(!opts.split_scaled);
        assert_eq!(opts.branch_node_limit, 20_000);
    }
}
