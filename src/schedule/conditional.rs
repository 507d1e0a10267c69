//! Conditional validity checks after a row is found.
//!
//! A conditional validity dependence may be violated by a row only as long
//! as every condition dependence adjacent to it stays local. A violated one
//! turns its adjacent conditions local; if one of them is not already
//! mapped to a single point by the band, the band has to be recomputed.

use crate::polyhedral::map::Relation;
use crate::polyhedral::operations::{domain_meets_range, is_condition_false, orders_backwards, range_meets_domain};
use crate::schedule::graph::{DependenceEdge, DependenceGraph};
use crate::utils::errors::ScheduleResult;
use log::debug;

/// Whether the last row orders some pair of the edge backwards.
fn is_violated(graph: &DependenceGraph, edge: &DependenceEdge) -> ScheduleResult<bool> {
    let src = &graph.nodes[edge.src].sched;
    let dst = &graph.nodes[edge.dst].sched;
    let Some(last) = src.nrows().checked_sub(1) else {
        return Ok(false);
    };
    orders_backwards(&edge.map, src.row(last), dst.row(last))
}

/// Whether a condition edge shares an instance with the violated
/// dependences: its domain meets their sinks or its range meets their
/// sources.
fn is_adjacent(edge: &DependenceEdge, violated: &[Relation]) -> ScheduleResult<bool> {
    for cond in &edge.tagged_condition {
        for val in violated {
            if domain_meets_range(cond, val)? || range_meets_domain(cond, val)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Check the conditional validity edges against the rows found so far.
///
/// Condition edges adjacent to a violated conditional validity edge are
/// marked local. Returns `true` when one of them is not satisfied locally by
/// the current rows, in which case the band must be recomputed.
pub(crate) fn has_violated_conditional_constraint(graph: &mut DependenceGraph) -> ScheduleResult<bool> {
    let mut violated: Vec<Relation> = Vec::new();
    for edge in graph.edges.iter().filter(|e| e.conditional_validity) {
        if is_violated(graph, edge)? {
            violated.extend(edge.tagged_validity.iter().cloned());
        }
    }
    if violated.is_empty() {
        return Ok(false);
    }

    let mut any = false;
    for i in 0..graph.edges.len() {
        let edge = &graph.edges[i];
        if !edge.condition || edge.local || !is_adjacent(edge, &violated)? {
            continue;
        }
        let src = &graph.nodes[edge.src].sched;
        let dst = &graph.nodes[edge.dst].sched;
        let mut satisfied = true;
        for cond in &edge.tagged_condition {
            if !is_condition_false(cond, src, dst)? {
                satisfied = false;
                break;
            }
        }
        debug!(
            "condition {} -> {} becomes local{}",
            graph.nodes[edge.src].name(), graph.nodes[edge.dst].name(),
            if satisfied { "" } else { " and is violated" },
        );
        graph.edges[i].local = true;
        any |= !satisfied;
    }
    Ok(any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::map::UnionRelation;
    use crate::polyhedral::set::{IntegerSet, UnionSet};
    use crate::schedule::graph::EdgeKind;

    /// A single statement with a condition `i -> i + 1` and a conditional
    /// validity `i -> i - 1` over the same instances.
    fn conditional_graph() -> DependenceGraph {
        let s = IntegerSet::rectangular("S", &[10]);
        let condition = UnionRelation::from(Relation::translation(&s, &s, &[1]));
        let conditional = UnionRelation::from(Relation::translation(&s, &s, &[-1]));
        DependenceGraph::build(
            &[], &UnionSet::new().with(s),
            &[(EdgeKind::Condition, &condition), (EdgeKind::ConditionalValidity, &conditional)],
        ).unwrap()
    }

    #[test]
    fn test_violation_marks_condition_local() {
        let mut g = conditional_graph();
        // i: the conditional validity i -> i - 1 runs backwards
        g.append_row(vec![vec![0, 1]], true).unwrap();
        assert!(has_violated_conditional_constraint(&mut g).unwrap());
        let cond = g.edges.iter().find(|e| e.condition).unwrap();
        assert!(cond.local);
        // already local: nothing new to report
        assert!(!has_violated_conditional_constraint(&mut g).unwrap());
    }

    #[test]
    fn test_no_violation() {
        let mut g = conditional_graph();
        // -i respects i -> i - 1
        g.append_row(vec![vec![0, -1]], true).unwrap();
        assert!(!has_violated_conditional_constraint(&mut g).unwrap());
        assert!(g.edges.iter().all(|e| !e.local));
    }

    #[test]
    fn test_local_condition_satisfied_by_constant_row() {
        let mut g = conditional_graph();
        g.append_row(vec![vec![0, 1]], true).unwrap();
        g.reset_band().unwrap();
        g.append_constant_row(|_| 0).unwrap();
        // a constant row violates nothing
        assert!(!has_violated_conditional_constraint(&mut g).unwrap());
    }
}
