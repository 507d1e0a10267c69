//! The band controller.
//!
//! Rows are added to the current band while the row solver finds them. When
//! it fails, the controller falls back, in order, to dropping coincidence,
//! closing the band, splitting the graph along a conflicting component pair
//! and finally carrying dependences with a single row.

use crate::polyhedral::farkas::CoefficientCache;
use crate::schedule::carry;
use crate::schedule::conditional;
use crate::schedule::graph::{ComponentFilter, DependenceGraph};
use crate::schedule::options::{FuseStrategy, ScheduleAlgorithm, ScheduleOptions};
use crate::schedule::row_solver;
use crate::schedule::scc;
use crate::utils::errors::{ScheduleError, ScheduleResult, UnschedulableError};
use log::{debug, info, trace};

/// Drives schedule construction over a dependence graph.
pub struct Scheduler<'a> {
    options: &'a ScheduleOptions,
    cache: CoefficientCache,
}

impl<'a> Scheduler<'a> {
    pub fn new(options: &'a ScheduleOptions) -> Self {
        Self { options, cache: CoefficientCache::new() }
    }

    /// Number of memoized coefficient polyhedra.
    pub fn cached_polyhedra(&self) -> usize {
        self.cache.len()
    }

    /// Schedule the whole graph, decomposing it into components first.
    pub fn compute_schedule(&mut self, graph: &mut DependenceGraph) -> ScheduleResult<()> {
        scc::detect_components(graph, self.options.fuse)?;
        if graph.scc > 1 {
            return self.compute_component_schedule(graph, false);
        }
        self.compute_schedule_wcc(graph)
    }

    /// Schedule a connected graph.
    fn compute_schedule_wcc(&mut self, graph: &mut DependenceGraph) -> ScheduleResult<()> {
        scc::detect_sccs(graph)?;
        graph.compute_maxvar()?;
        trace!("scheduling {} nodes, maxvar {}", graph.nodes.len(), graph.maxvar);

        if self.needs_feautrier_step(graph) {
            return self.carry_dependences(graph);
        }

        graph.clear_local_edges();
        let has_coincidence = graph.has_any_coincidence();
        let check_conditional = graph.has_conditional_pairs();
        let force_coincidence = self.options.outer_coincidence;
        let mut use_coincidence = has_coincidence;

        while graph.counters.n_row < graph.maxvar {
            graph.src_scc = None;
            graph.dst_scc = None;
            let rows = row_solver::solve_row(graph, &mut self.cache, self.options, use_coincidence)?;
            let Some(rows) = rows else {
                let empty = graph.counters.n_total_row == graph.counters.band_start;
                if use_coincidence && (!force_coincidence || !empty) {
                    debug!("no coincident row, retrying without coincidence");
                    use_coincidence = false;
                    continue;
                }
                if !self.options.maximize_band_depth && !empty {
                    return self.compute_next_band(graph);
                }
                if graph.src_scc.is_some() {
                    return self.compute_split_schedule(graph);
                }
                if !empty {
                    return self.compute_next_band(graph);
                }
                return self.carry_dependences(graph);
            };

            let coincident = !has_coincidence || use_coincidence;
            graph.append_row(rows, coincident)?;
            if check_conditional && conditional::has_violated_conditional_constraint(graph)? {
                debug!("conditional validity violated, recomputing band {}", graph.counters.n_band);
                graph.reset_band()?;
                use_coincidence = has_coincidence;
            }
        }

        if graph.counters.n_total_row > graph.counters.band_start {
            graph.next_band();
        }
        self.sort_statements(graph)
    }

    fn needs_feautrier_step(&self, graph: &DependenceGraph) -> bool {
        self.options.algorithm == ScheduleAlgorithm::Feautrier
            && graph.edges.iter().any(|e| e.is_any_validity())
    }

    /// Drop the dependences carried so far and start a new band.
    fn compute_next_band(&mut self, graph: &mut DependenceGraph) -> ScheduleResult<()> {
        graph.update_edges()?;
        graph.next_band();
        self.compute_schedule(graph)
    }

    /// Order the statements of a completed graph by the components of the
    /// dependences that remain.
    fn sort_statements(&mut self, graph: &mut DependenceGraph) -> ScheduleResult<()> {
        if graph.nodes.len() <= 1 {
            return Ok(());
        }
        graph.update_edges()?;
        if graph.edges.is_empty() {
            return Ok(());
        }
        scc::detect_sccs(graph)?;
        graph.append_constant_row(|node| node.scc as i64)
    }

    /// Schedule each component on its own and pad the results to a common
    /// row count.
    fn compute_component_schedule(&mut self, graph: &mut DependenceGraph, force_split: bool) -> ScheduleResult<()> {
        if force_split || self.options.fuse == FuseStrategy::Min || self.options.separate_components {
            graph.split_on_scc()?;
        }
        let n_band = graph.counters.n_band;
        for node in &mut graph.nodes {
            *node.band_id_mut(n_band) += node.scc;
        }

        let orig = graph.counters;
        let mut n_total_row = orig.n_total_row;
        let mut n_band_max = orig.n_band;
        for component in 0..graph.scc {
            self.compute_sub_schedule(graph, ComponentFilter::Exactly(component), true)?;
            n_total_row = n_total_row.max(graph.counters.n_total_row);
            n_band_max = n_band_max.max(graph.counters.n_band);
            graph.counters.n_total_row = orig.n_total_row;
            graph.counters.n_band = orig.n_band;
        }
        graph.counters.n_total_row = n_total_row;
        graph.counters.n_band = n_band_max;
        graph.pad_schedule();
        Ok(())
    }

    /// Split the graph in two along the conflicting component pair, ordering
    /// the halves with a constant row.
    fn compute_split_schedule(&mut self, graph: &mut DependenceGraph) -> ScheduleResult<()> {
        let src_scc = graph.src_scc
            .ok_or_else(|| ScheduleError::internal("split requested without a conflicting component"))?;
        debug!("splitting graph after component {}", src_scc);
        graph.reset_band()?;
        graph.append_constant_row(|node| i64::from(node.scc > src_scc))?;
        graph.next_band();

        let n_before = graph.nodes.iter().filter(|n| n.scc <= src_scc).count();
        let n_band = graph.counters.n_band;
        for node in graph.nodes.iter_mut().filter(|n| n.scc > src_scc) {
            *node.band_id_mut(n_band) = n_before;
        }

        let orig = graph.counters;
        self.compute_sub_schedule(graph, ComponentFilter::AtMost(src_scc), false)?;
        let first = graph.counters;
        graph.counters.n_total_row = orig.n_total_row;
        graph.counters.n_band = orig.n_band;
        self.compute_sub_schedule(graph, ComponentFilter::AtLeast(src_scc + 1), false)?;

        graph.counters.n_total_row = graph.counters.n_total_row.max(first.n_total_row);
        graph.counters.n_band = graph.counters.n_band.max(first.n_band);
        graph.pad_schedule();
        Ok(())
    }

    fn compute_sub_schedule(
        &mut self,
        graph: &mut DependenceGraph,
        filter: ComponentFilter,
        wcc: bool,
    ) -> ScheduleResult<()> {
        let mut sub = graph.extract_sub_graph(filter)?;
        if wcc {
            self.compute_schedule_wcc(&mut sub)?;
        } else {
            self.compute_schedule(&mut sub)?;
        }
        graph.copy_schedule_from(&sub, filter);
        graph.counters.n_total_row = sub.counters.n_total_row;
        graph.counters.n_band = sub.counters.n_band;
        Ok(())
    }

    /// Add a row carrying as many dependences as possible, then continue
    /// with the dependences left.
    fn carry_dependences(&mut self, graph: &mut DependenceGraph) -> ScheduleResult<()> {
        let carry = carry::carry_row(graph, &mut self.cache, self.options)?;
        if carry.trivial {
            if graph.scc > 1 {
                info!("carrying row is degenerate, scheduling {} components separately", graph.scc);
                return self.compute_component_schedule(graph, true);
            }
            return Err(UnschedulableError::no_non_trivial_solution().into());
        }
        graph.append_row(carry.rows, false)?;
        if self.options.split_scaled {
            carry::split_scaled(graph)?;
        }
        self.compute_next_band(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::map::{Relation, UnionRelation};
    use crate::polyhedral::set::{IntegerSet, UnionSet};
    use crate::schedule::graph::EdgeKind;

    fn run(domain: UnionSet, validity: UnionRelation, options: &ScheduleOptions) -> ScheduleResult<DependenceGraph> {
        let mut graph = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)])?;
        let mut scheduler = Scheduler::new(options);
        scheduler.compute_schedule(&mut graph)?;
        Ok(graph)
    }

    #[test]
    fn test_chain_gets_sort_row() {
        let s1 = IntegerSet::rectangular("S1", &[10]);
        let s2 = IntegerSet::rectangular("S2", &[10]);
        let dep = Relation::translation(&s1, &s2, &[0]);
        let graph = run(UnionSet::new().with(s1).with(s2), UnionRelation::from(dep), &ScheduleOptions::default()).unwrap();
        assert_eq!(graph.counters.n_total_row, 2);
        assert_eq!(graph.nodes[0].sched.row(0), &[0, 1]);
        assert_eq!(graph.nodes[1].sched.row(0), &[0, 1]);
        assert_eq!(graph.nodes[0].sched.row(1), &[0, 0]);
        assert_eq!(graph.nodes[1].sched.row(1), &[1, 0]);
        assert_eq!(graph.nodes[0].band, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_independent_statements() {
        let s1 = IntegerSet::rectangular("S1", &[10]);
        let s2 = IntegerSet::rectangular("S2", &[10]);
        let graph = run(UnionSet::new().with(s1).with(s2), UnionRelation::new(), &ScheduleOptions::default()).unwrap();
        assert_eq!(graph.counters.n_total_row, 1);
        assert_eq!(graph.nodes[0].band_id[0], 0);
        assert_eq!(graph.nodes[1].band_id[0], 1);
    }

    #[test]
    fn test_separate_components_adds_order_row() {
        let s1 = IntegerSet::rectangular("S1", &[10]);
        let s2 = IntegerSet::rectangular("S2", &[10]);
        let opts = ScheduleOptions::default().with_separate_components(true);
        let graph = run(UnionSet::new().with(s1).with(s2), UnionRelation::new(), &opts).unwrap();
        assert_eq!(graph.counters.n_total_row, 2);
        assert_eq!(graph.nodes[0].sched.row(0)[0], 0);
        assert_eq!(graph.nodes[1].sched.row(0)[0], 1);
    }

    #[test]
    fn test_unschedulable_cycle() {
        let s = IntegerSet::rectangular("S", &[10]);
        let deps = Relation::translation(&s, &s, &[1]).union(Relation::translation(&s, &s, &[-1]));
        let err = run(UnionSet::new().with(s), UnionRelation::from(deps), &ScheduleOptions::default()).unwrap_err();
        assert!(err.is_unschedulable());
    }
}
