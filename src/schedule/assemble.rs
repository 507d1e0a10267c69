//! The computed schedule.

use crate::polyhedral::map::AffineMap;
use crate::polyhedral::space::Space;
use crate::schedule::band::{self, Band};
use crate::schedule::graph::{DependenceGraph, ScheduleNode};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Rows and band structure of one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementSchedule {
    /// Statement space
    pub space: Space,
    /// One output per schedule row
    pub map: AffineMap,
    /// End row of every band
    pub band_end: Vec<usize>,
    /// Band id of every band; statements sharing a band share its id
    pub band_id: Vec<usize>,
    /// Coincidence flag of every row
    pub coincident: Vec<bool>,
}

impl StatementSchedule {
    fn from_node(node: &ScheduleNode) -> Self {
        let mut band_end = Vec::new();
        let mut labels = Vec::new();
        let mut current = None;
        let mut end = node.band.len();
        for (r, &label) in node.band.iter().enumerate() {
            let Some(label) = label else {
                end = r;
                break;
            };
            if current != Some(label) {
                if current.is_some() {
                    band_end.push(r);
                }
                current = Some(label);
                labels.push(label);
            }
        }
        if current.is_some() {
            band_end.push(end);
        }
        let band_id = labels.iter()
            .map(|&l| node.band_id.get(l).copied().unwrap_or(0))
            .collect();

        Self {
            space: node.space.clone(),
            map: AffineMap::from_matrix(node.space.clone(), &node.sched),
            band_end,
            band_id,
            coincident: node.coincident.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.space.name
    }

    /// Number of bands.
    pub fn n_band(&self) -> usize {
        self.band_end.len()
    }

    /// Rows of band `b`.
    pub fn band_range(&self, b: usize) -> Range<usize> {
        let start = if b == 0 { 0 } else { self.band_end[b - 1] };
        start..self.band_end[b]
    }

    /// Schedule time of a statement instance.
    pub fn apply(&self, point: &[i64], params: &[i64]) -> Vec<i64> {
        self.map.apply(point, params)
    }
}

/// A multi-dimensional affine schedule for every statement.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    /// Global parameter names
    pub params: Vec<String>,
    /// Statements in domain order
    pub statements: Vec<StatementSchedule>,
    /// Largest band count over all statements
    pub n_band: usize,
    /// Number of rows of every statement
    pub n_total_row: usize,
    #[serde(skip)]
    forest: OnceCell<Vec<Band>>,
}

impl Schedule {
    pub(crate) fn from_graph(graph: &DependenceGraph) -> Self {
        let statements: Vec<StatementSchedule> = graph.nodes.iter().map(StatementSchedule::from_node).collect();
        Self {
            params: graph.params.clone(),
            n_band: statements.iter().map(|s| s.n_band()).max().unwrap_or(0),
            statements,
            n_total_row: graph.counters.n_total_row,
            forest: OnceCell::new(),
        }
    }

    /// The schedule of an empty domain.
    pub fn empty(params: Vec<String>) -> Self {
        Self { params, statements: Vec::new(), n_band: 0, n_total_row: 0, forest: OnceCell::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statement(&self, name: &str) -> Option<&StatementSchedule> {
        self.statements.iter().find(|s| s.name() == name)
    }

    /// Schedule maps of all statements, padded to a common number of rows.
    pub fn schedule_map(&self) -> Vec<AffineMap> {
        self.statements.iter().map(|s| s.map.padded(self.n_total_row)).collect()
    }

    /// The band forest, built on first use.
    pub fn band_forest(&self) -> &[Band] {
        self.forest.get_or_init(|| band::build_forest(&self.statements))
    }

    /// Every band of the forest, children before parents.
    pub fn bands(&self) -> Vec<&Band> {
        let mut out = Vec::new();
        for root in self.band_forest() {
            root.collect_post_order(&mut out);
        }
        out
    }

    /// Schedule maps rebuilt from the band forest, padded like
    /// [`Schedule::schedule_map`].
    pub fn forest_schedule_map(&self) -> Vec<AffineMap> {
        let forest = self.band_forest();
        self.statements.iter().enumerate()
            .map(|(i, s)| {
                forest.iter()
                    .find_map(|b| b.suffix_of(i))
                    .unwrap_or_else(|| s.map.range_slice(0, 0))
                    .padded(self.n_total_row)
            })
            .collect()
    }
}

impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
            && self.statements == other.statements
            && self.n_band == other.n_band
            && self.n_total_row == other.n_total_row
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.params.is_empty() {
            writeln!(f, "[{}] ->", self.params.join(", "))?;
        }
        for map in self.schedule_map() {
            writeln!(f, "{}", map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_ends_from_labels() {
        let mut node = ScheduleNode::new(Space::set("S", 1));
        node.band = vec![Some(0), Some(0), Some(1), None];
        node.band_id = vec![0, 3];
        node.sched = crate::utils::matrix::IntMatrix::zeros(4, 2);
        node.coincident = vec![true, true, false, false];
        let stmt = StatementSchedule::from_node(&node);
        assert_eq!(stmt.band_end, vec![2, 3]);
        assert_eq!(stmt.band_id, vec![0, 3]);
        assert_eq!(stmt.band_range(1), 2..3);
    }

    #[test]
    fn test_no_bands() {
        let node = ScheduleNode::new(Space::set("S", 0));
        let stmt = StatementSchedule::from_node(&node);
        assert_eq!(stmt.n_band(), 0);
    }
}
