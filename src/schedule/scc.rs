//! Strongly and weakly connected components of the dependence graph.
//!
//! Components are numbered in the order Tarjan's algorithm completes them
//! while following edges backwards, which puts every component after all
//! components it depends on.

use crate::schedule::graph::DependenceGraph;
use crate::schedule::options::FuseStrategy;
use crate::utils::errors::ScheduleResult;
use log::trace;

struct Tarjan<'a, F: Fn(usize, usize) -> bool> {
    n: usize,
    /// `follows(i, j)`: node `i` must come after node `j`
    follows: &'a F,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    component: Vec<usize>,
    n_components: usize,
}

impl<'a, F: Fn(usize, usize) -> bool> Tarjan<'a, F> {
    fn visit(&mut self, i: usize) {
        self.index[i] = Some(self.next_index);
        self.lowlink[i] = self.next_index;
        self.next_index += 1;
        self.stack.push(i);
        self.on_stack[i] = true;

        for j in 0..self.n {
            if j == i || !(self.follows)(i, j) {
                continue;
            }
            match self.index[j] {
                None => {
                    self.visit(j);
                    self.lowlink[i] = self.lowlink[i].min(self.lowlink[j]);
                }
                Some(idx) if self.on_stack[j] => {
                    self.lowlink[i] = self.lowlink[i].min(idx);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[i]) == self.index[i] {
            while let Some(j) = self.stack.pop() {
                self.on_stack[j] = false;
                self.component[j] = self.n_components;
                if j == i {
                    break;
                }
            }
            self.n_components += 1;
        }
    }
}

/// Component id of every node and the number of components.
pub fn components(n: usize, follows: impl Fn(usize, usize) -> bool) -> (Vec<usize>, usize) {
    let mut tarjan = Tarjan {
        n,
        follows: &follows,
        index: vec![None; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::with_capacity(n),
        next_index: 0,
        component: vec![0; n],
        n_components: 0,
    };
    for i in 0..n {
        if tarjan.index[i].is_none() {
            tarjan.visit(i);
        }
    }
    (tarjan.component, tarjan.n_components)
}

fn assign(graph: &mut DependenceGraph, component: Vec<usize>, count: usize) {
    for (node, c) in graph.nodes.iter_mut().zip(component) {
        node.scc = c;
    }
    graph.scc = count;
    let mut sorted: Vec<usize> = (0..graph.nodes.len()).collect();
    sorted.sort_by_key(|&i| graph.nodes[i].scc);
    graph.sorted = sorted;
    trace!("{} components: {:?}", count, graph.nodes.iter().map(|n| n.scc).collect::<Vec<_>>());
}

/// Strongly connected components over validity and conditional validity
/// edges.
pub fn detect_sccs(graph: &mut DependenceGraph) -> ScheduleResult<()> {
    let (component, count) = components(graph.nodes.len(), |i, j| graph.has_validity_edge(j, i));
    assign(graph, component, count);
    Ok(())
}

/// Weakly connected components over edges of any kind.
pub fn detect_wccs(graph: &mut DependenceGraph) -> ScheduleResult<()> {
    let (component, count) = components(graph.nodes.len(), |i, j| {
        graph.has_any_edge(i, j) || graph.has_any_edge(j, i)
    });
    assign(graph, component, count);
    Ok(())
}

/// Components used to decompose the graph before scheduling.
pub fn detect_components(graph: &mut DependenceGraph, fuse: FuseStrategy) -> ScheduleResult<()> {
    match fuse {
        FuseStrategy::Min => detect_sccs(graph),
        FuseStrategy::Max => detect_wccs(graph),
    }
}
