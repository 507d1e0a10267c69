//! Dependence graph for schedule construction.
//!
//! Nodes are statements, edges are dependence relations carrying one or more
//! [`EdgeKind`]s. Nodes and edges live in plain vectors and are referred to
//! by index; the edge table maps `(kind, src, dst)` to the edge index.

use crate::polyhedral::map::Relation;
use crate::polyhedral::operations;
use crate::polyhedral::set::UnionSet;
use crate::polyhedral::map::UnionRelation;
use crate::polyhedral::space::Space;
use crate::utils::errors::{InputError, InputErrorKind, ScheduleError, ScheduleResult};
use crate::utils::matrix::IntMatrix;
use log::{debug, trace};
use std::collections::HashMap;
use std::fmt;

/// Kind of dependence carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Must be respected by every row
    Validity,
    /// Distance should be zero
    Coincidence,
    /// Condition of a conditional validity pair
    Condition,
    /// Validity that may be violated when the adjacent conditions are local
    ConditionalValidity,
    /// Distance to minimize
    Proximity,
}

impl EdgeKind {
    /// All kinds in graph extraction order.
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::Validity,
        EdgeKind::Coincidence,
        EdgeKind::Condition,
        EdgeKind::ConditionalValidity,
        EdgeKind::Proximity,
    ];
}

/// A statement together with the schedule rows found for it so far.
#[derive(Debug, Clone)]
pub struct ScheduleNode {
    /// Statement space
    pub space: Space,
    /// Number of set dimensions
    pub nvar: usize,
    /// Number of parameters
    pub nparam: usize,
    /// Rows laid out as `[constant, params..., dims...]`
    pub sched: IntMatrix,
    /// Rank of the linear part of `sched`
    pub rank: usize,
    /// Change of basis: coefficients are `cmap * t`
    pub cmap: IntMatrix,
    /// Inverse of `cmap`
    pub cinv: IntMatrix,
    /// First LP column of this node in the current problem
    pub start: usize,
    /// Component id from the last component detection
    pub scc: usize,
    /// Band label of every row; `None` for padding
    pub band: Vec<Option<usize>>,
    /// Band id per band number
    pub band_id: Vec<usize>,
    /// Coincidence flag of every row
    pub coincident: Vec<bool>,
}

impl ScheduleNode {
    /// A node without any rows.
    pub fn new(space: Space) -> Self {
        let nvar = space.n_dim;
        let nparam = space.n_param;
        Self {
            space,
            nvar,
            nparam,
            sched: IntMatrix::zeros(0, 1 + nparam + nvar),
            rank: 0,
            cmap: IntMatrix::identity(nvar),
            cinv: IntMatrix::identity(nvar),
            start: 0,
            scc: 0,
            band: Vec::new(),
            band_id: Vec::new(),
            coincident: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.space.name
    }

    /// Number of LP columns used by this node: `c0`, parameter pairs and
    /// variable pairs.
    pub fn n_columns(&self) -> usize {
        1 + 2 * self.nparam + 2 * self.nvar
    }

    /// `(negative, positive)` columns of parameter coefficient `p`.
    pub fn param_pair(&self, p: usize) -> (usize, usize) {
        let neg = self.start + 1 + 2 * p;
        (neg, neg + 1)
    }

    /// `(negative, positive)` columns of variable coefficient `k`. Pairs
    /// are stored from the last dimension to the first.
    pub fn var_pair(&self, k: usize) -> (usize, usize) {
        let neg = self.start + 1 + 2 * self.nparam + 2 * (self.nvar - 1 - k);
        (neg, neg + 1)
    }

    /// Recompute `rank`, `cmap` and `cinv` from the linear part of `sched`.
    pub fn update_cmap(&mut self) -> ScheduleResult<()> {
        let linear = self.sched.column_block(1 + self.nparam, self.nvar);
        let hermite = linear.left_hermite()?;
        self.cmap = hermite.q.transpose();
        self.cinv = hermite.u.transpose();
        self.rank = hermite.rank;
        Ok(())
    }

    /// Band id for band number `b`, growing the table as needed.
    pub fn band_id_mut(&mut self, b: usize) -> &mut usize {
        if self.band_id.len() <= b {
            self.band_id.resize(b + 1, 0);
        }
        &mut self.band_id[b]
    }

    fn push_row(&mut self, row: Vec<i64>, band: Option<usize>, coincident: bool) {
        self.sched.push_row(row);
        self.band.push(band);
        self.coincident.push(coincident);
    }

    fn truncate_rows(&mut self, n: usize) {
        self.sched.truncate_rows(n);
        self.band.truncate(n);
        self.coincident.truncate(n);
    }
}

/// A dependence between two statements.
#[derive(Debug, Clone)]
pub struct DependenceEdge {
    /// Source node index
    pub src: usize,
    /// Destination node index
    pub dst: usize,
    /// Untagged dependence relation
    pub map: Relation,
    /// Tagged condition relations
    pub tagged_condition: Vec<Relation>,
    /// Tagged conditional validity relations
    pub tagged_validity: Vec<Relation>,
    pub validity: bool,
    pub coincidence: bool,
    pub proximity: bool,
    pub condition: bool,
    pub conditional_validity: bool,
    /// Forced to zero distance
    pub local: bool,
    /// First LP row of the validity constraints of an inter-statement edge
    pub start: usize,
    /// One past the last such row
    pub end: usize,
}

impl DependenceEdge {
    fn new(src: usize, dst: usize, map: Relation) -> Self {
        Self {
            src,
            dst,
            map,
            tagged_condition: Vec::new(),
            tagged_validity: Vec::new(),
            validity: false,
            coincidence: false,
            proximity: false,
            condition: false,
            conditional_validity: false,
            local: false,
            start: 0,
            end: 0,
        }
    }

    /// Whether the edge carries the given kind.
    pub fn has(&self, kind: EdgeKind) -> bool {
        match kind {
            EdgeKind::Validity => self.validity,
            EdgeKind::Coincidence => self.coincidence,
            EdgeKind::Condition => self.condition,
            EdgeKind::ConditionalValidity => self.conditional_validity,
            EdgeKind::Proximity => self.proximity,
        }
    }

    fn set(&mut self, kind: EdgeKind) {
        match kind {
            EdgeKind::Validity => self.validity = true,
            EdgeKind::Coincidence => self.coincidence = true,
            EdgeKind::Condition => self.condition = true,
            EdgeKind::ConditionalValidity => self.conditional_validity = true,
            EdgeKind::Proximity => self.proximity = true,
        }
    }

    /// Validity or conditional validity.
    pub fn is_any_validity(&self) -> bool {
        self.validity || self.conditional_validity
    }

    /// Whether source and destination are the same statement.
    pub fn is_intra(&self) -> bool {
        self.src == self.dst
    }

    /// Whether the row solver must keep the distance of this edge at zero.
    pub fn forces_zero(&self, use_coincidence: bool) -> bool {
        self.local || (use_coincidence && self.coincidence)
    }
}

/// Row and band counters shared between a graph and the sub-graphs split off
/// from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandCounters {
    /// Rows found so far that count towards `maxvar`
    pub n_row: usize,
    /// All rows, including constant ones
    pub n_total_row: usize,
    /// Current band number
    pub n_band: usize,
    /// First row of the current band
    pub band_start: usize,
    /// Upper bound on `n_total_row`
    pub max_row: usize,
}

/// Selects the nodes and edges of a sub-graph by component id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentFilter {
    /// Nodes in component `c`; edges inside it
    Exactly(usize),
    /// Nodes in components up to `c`; edges whose destination is there
    AtMost(usize),
    /// Nodes in components from `c`; edges whose source is there
    AtLeast(usize),
}

impl ComponentFilter {
    fn keeps_node(self, scc: usize) -> bool {
        match self {
            ComponentFilter::Exactly(c) => scc == c,
            ComponentFilter::AtMost(c) => scc <= c,
            ComponentFilter::AtLeast(c) => scc >= c,
        }
    }

    fn keeps_edge(self, src_scc: usize, dst_scc: usize) -> bool {
        match self {
            ComponentFilter::Exactly(c) => src_scc == c && dst_scc == c,
            ComponentFilter::AtMost(c) => dst_scc <= c,
            ComponentFilter::AtLeast(c) => src_scc >= c,
        }
    }
}

/// The dependence graph of one (sub-)problem.
#[derive(Debug, Clone)]
pub struct DependenceGraph {
    /// Global parameter names
    pub params: Vec<String>,
    pub nodes: Vec<ScheduleNode>,
    pub edges: Vec<DependenceEdge>,
    node_table: HashMap<String, usize>,
    edge_table: HashMap<(EdgeKind, usize, usize), usize>,
    /// Node indices ordered by component
    pub sorted: Vec<usize>,
    /// Number of rows still needed by the most demanding node
    pub maxvar: usize,
    /// Number of components from the last detection
    pub scc: usize,
    /// Conflicting component pair reported by the row solver
    pub src_scc: Option<usize>,
    pub dst_scc: Option<usize>,
    pub counters: BandCounters,
}

/// A relation of one kind, untagged, together with its tagged pieces.
struct Grouped {
    src: usize,
    dst: usize,
    map: Relation,
    tagged: Vec<Relation>,
}

impl DependenceGraph {
    /// Build the graph from parameter-aligned constraints.
    ///
    /// Relations between statements that are not in the domain are dropped.
    pub fn build(
        params: &[String],
        domain: &UnionSet,
        relations: &[(EdgeKind, &UnionRelation)],
    ) -> ScheduleResult<Self> {
        let nodes: Vec<ScheduleNode> = domain.iter()
            .map(|set| ScheduleNode::new(set.space.clone()))
            .collect();
        let node_table = nodes.iter().enumerate()
            .map(|(i, n)| (n.name().to_string(), i))
            .collect();
        let maxvar = nodes.iter().map(|n| n.nvar).max().unwrap_or(0);
        let counters = BandCounters {
            max_row: nodes.len() + 2 * maxvar,
            ..BandCounters::default()
        };
        let mut graph = Self {
            params: params.to_vec(),
            sorted: (0..nodes.len()).collect(),
            nodes,
            edges: Vec::new(),
            node_table,
            edge_table: HashMap::new(),
            maxvar,
            scc: 0,
            src_scc: None,
            dst_scc: None,
            counters,
        };

        for &(kind, union) in relations {
            for group in graph.group_relations(kind, union)? {
                graph.add_edge(kind, group)?;
            }
        }
        debug!("dependence graph: {} nodes, {} edges", graph.nodes.len(), graph.edges.len());
        Ok(graph)
    }

    /// Untag and group the relations of one kind by statement pair.
    fn group_relations(&self, kind: EdgeKind, union: &UnionRelation) -> ScheduleResult<Vec<Grouped>> {
        let keeps_tags = matches!(kind, EdgeKind::Condition | EdgeKind::ConditionalValidity);
        let mut groups: Vec<Grouped> = Vec::new();
        for rel in union.iter() {
            rel.validate()?;
            let (Some(&src), Some(&dst)) = (self.node_table.get(&rel.src.name), self.node_table.get(&rel.dst.name)) else {
                debug!("skipping {:?} relation {} -> {}: statement not in domain", kind, rel.src.name, rel.dst.name);
                continue;
            };
            if rel.src.n_dim != self.nodes[src].nvar || rel.dst.n_dim != self.nodes[dst].nvar {
                return Err(InputError::new(
                    InputErrorKind::DimensionMismatch,
                    format!("{:?} relation {} -> {} does not match the domain", kind, rel.src, rel.dst),
                ).into());
            }
            let map = rel.untag();
            let tagged = if !keeps_tags {
                None
            } else if rel.is_fully_tagged() {
                Some(rel.clone())
            } else {
                Some(map.with_dummy_tags())
            };
            match groups.iter_mut().find(|g| g.src == src && g.dst == dst) {
                Some(g) => {
                    g.map.disjuncts.extend(map.disjuncts);
                    g.tagged.extend(tagged);
                }
                None => groups.push(Grouped { src, dst, map, tagged: tagged.into_iter().collect() }),
            }
        }
        Ok(groups)
    }

    fn add_edge(&mut self, kind: EdgeKind, group: Grouped) -> ScheduleResult<()> {
        let map = operations::remove_empty_disjuncts(&group.map)?;
        if map.disjuncts.is_empty() {
            trace!("dropping empty {:?} relation {}", kind, group.map);
            return Ok(());
        }
        let existing = self.edges.iter()
            .position(|e| e.src == group.src && e.dst == group.dst && e.map == map);
        let idx = match existing {
            Some(idx) => idx,
            None => {
                self.edges.push(DependenceEdge::new(group.src, group.dst, map));
                self.edges.len() - 1
            }
        };
        let edge = &mut self.edges[idx];
        edge.set(kind);
        match kind {
            EdgeKind::Condition => edge.tagged_condition.extend(group.tagged),
            EdgeKind::ConditionalValidity => edge.tagged_validity.extend(group.tagged),
            _ => {}
        }
        self.insert_edge_entry(kind, idx)
    }

    fn insert_edge_entry(&mut self, kind: EdgeKind, idx: usize) -> ScheduleResult<()> {
        let edge = &self.edges[idx];
        let key = (kind, edge.src, edge.dst);
        match self.edge_table.insert(key, idx) {
            Some(prev) if prev != idx => Err(ScheduleError::internal(format!(
                "more than one {:?} edge between {} and {}",
                kind, self.nodes[edge.src].name(), self.nodes[edge.dst].name(),
            ))),
            _ => Ok(()),
        }
    }

    fn rebuild_edge_table(&mut self) -> ScheduleResult<()> {
        self.edge_table.clear();
        for idx in 0..self.edges.len() {
            for kind in EdgeKind::ALL {
                if self.edges[idx].has(kind) {
                    self.insert_edge_entry(kind, idx)?;
                }
            }
        }
        Ok(())
    }

    /// Whether there is an edge of the given kind from `src` to `dst`.
    pub fn has_edge(&self, kind: EdgeKind, src: usize, dst: usize) -> bool {
        self.edge_table.contains_key(&(kind, src, dst))
    }

    /// Whether there is a validity or conditional validity edge from `src`
    /// to `dst`.
    pub fn has_validity_edge(&self, src: usize, dst: usize) -> bool {
        self.has_edge(EdgeKind::Validity, src, dst)
            || self.has_edge(EdgeKind::ConditionalValidity, src, dst)
    }

    /// Whether there is an edge of any kind from `src` to `dst`.
    pub fn has_any_edge(&self, src: usize, dst: usize) -> bool {
        EdgeKind::ALL.iter().any(|&k| self.has_edge(k, src, dst))
    }

    /// Look up a node by statement name.
    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.node_table.get(name).copied()
    }

    pub fn has_any_coincidence(&self) -> bool {
        self.edges.iter().any(|e| e.coincidence)
    }

    /// Whether both halves of a conditional validity pair are present.
    pub fn has_conditional_pairs(&self) -> bool {
        self.edges.iter().any(|e| e.condition) && self.edges.iter().any(|e| e.conditional_validity)
    }

    pub fn clear_local_edges(&mut self) {
        for edge in &mut self.edges {
            if edge.condition {
                edge.local = false;
            }
        }
    }

    /// Recompute every node's basis and the number of rows still needed.
    pub fn compute_maxvar(&mut self) -> ScheduleResult<()> {
        self.maxvar = 0;
        for node in &mut self.nodes {
            node.update_cmap()?;
            let nvar = node.nvar + self.counters.n_row - node.rank;
            self.maxvar = self.maxvar.max(nvar);
        }
        Ok(())
    }

    /// Whether the node still needs linearly independent rows for the
    /// current band to reach `maxvar`.
    pub fn needs_row(&self, node: &ScheduleNode) -> bool {
        node.nvar + self.counters.n_row >= self.maxvar + node.rank
    }

    fn check_row_capacity(&self) -> ScheduleResult<()> {
        if self.counters.n_total_row >= self.counters.max_row {
            return Err(ScheduleError::internal("too many schedule rows"));
        }
        Ok(())
    }

    /// Append one linear row per node (in node order) to the current band.
    pub fn append_row(&mut self, rows: Vec<Vec<i64>>, coincident: bool) -> ScheduleResult<()> {
        self.check_row_capacity()?;
        if rows.len() != self.nodes.len() {
            return Err(ScheduleError::internal("schedule row count does not match the node count"));
        }
        let n_band = self.counters.n_band;
        for (node, row) in self.nodes.iter_mut().zip(rows) {
            node.push_row(row, Some(n_band), coincident);
            node.update_cmap()?;
        }
        self.counters.n_row += 1;
        self.counters.n_total_row += 1;
        Ok(())
    }

    /// Append a constant row, the value for each node given by `value`.
    pub fn append_constant_row(&mut self, value: impl Fn(&ScheduleNode) -> i64) -> ScheduleResult<()> {
        self.check_row_capacity()?;
        let n_band = self.counters.n_band;
        for node in &mut self.nodes {
            let mut row = vec![0; 1 + node.nparam + node.nvar];
            row[0] = value(node);
            node.push_row(row, Some(n_band), false);
        }
        self.counters.n_total_row += 1;
        Ok(())
    }

    /// Close the current band.
    pub fn next_band(&mut self) {
        self.counters.band_start = self.counters.n_total_row;
        self.counters.n_band += 1;
    }

    /// Drop the rows of the current band.
    pub fn reset_band(&mut self) -> ScheduleResult<()> {
        let drop = self.counters.n_total_row - self.counters.band_start;
        self.counters.n_total_row -= drop;
        self.counters.n_row = self.counters.n_row.saturating_sub(drop);
        let keep = self.counters.band_start;
        for node in &mut self.nodes {
            node.truncate_rows(keep);
            node.update_cmap()?;
        }
        Ok(())
    }

    /// Order the components by a constant row and start a new band.
    pub fn split_on_scc(&mut self) -> ScheduleResult<()> {
        self.append_constant_row(|node| node.scc as i64)?;
        self.next_band();
        Ok(())
    }

    /// Extend every node with zero rows up to `n_total_row`.
    pub fn pad_schedule(&mut self) {
        let n = self.counters.n_total_row;
        for node in &mut self.nodes {
            while node.sched.nrows() < n {
                let cols = node.sched.ncols();
                node.push_row(vec![0; cols], None, false);
            }
        }
    }

    /// Restrict every relation to the pairs that all current rows map to
    /// the same point, and drop the edges with nothing left.
    pub fn update_edges(&mut self) -> ScheduleResult<()> {
        let edges = std::mem::take(&mut self.edges);
        let mut kept = Vec::with_capacity(edges.len());
        for mut edge in edges {
            let src = &self.nodes[edge.src].sched;
            let dst = &self.nodes[edge.dst].sched;
            edge.map = operations::remove_empty_disjuncts(&edge.map.intersect_equal_rows(src, dst))?;
            edge.tagged_condition = restrict_all(&edge.tagged_condition, src, dst)?;
            edge.tagged_validity = restrict_all(&edge.tagged_validity, src, dst)?;
            if edge.map.disjuncts.is_empty() {
                trace!("edge {} -> {} fully carried", self.nodes[edge.src].name(), self.nodes[edge.dst].name());
                continue;
            }
            kept.push(edge);
        }
        self.edges = kept;
        self.rebuild_edge_table()
    }

    /// Copy the nodes and edges selected by `filter` into a new graph.
    pub fn extract_sub_graph(&self, filter: ComponentFilter) -> ScheduleResult<DependenceGraph> {
        let mut index = vec![None; self.nodes.len()];
        let mut nodes = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if filter.keeps_node(node.scc) {
                index[i] = Some(nodes.len());
                nodes.push(node.clone());
            }
        }

        let mut edges = Vec::new();
        for edge in &self.edges {
            if !filter.keeps_edge(self.nodes[edge.src].scc, self.nodes[edge.dst].scc) {
                continue;
            }
            let (Some(src), Some(dst)) = (index[edge.src], index[edge.dst]) else {
                if edge.is_any_validity() {
                    return Err(ScheduleError::internal("backward (conditional) validity edge"));
                }
                continue;
            };
            edges.push(DependenceEdge { src, dst, ..edge.clone() });
        }

        let node_table = nodes.iter().enumerate()
            .map(|(i, n): (usize, &ScheduleNode)| (n.name().to_string(), i))
            .collect();
        let mut sub = DependenceGraph {
            params: self.params.clone(),
            sorted: (0..nodes.len()).collect(),
            nodes,
            edges,
            node_table,
            edge_table: HashMap::new(),
            maxvar: self.maxvar,
            scc: 0,
            src_scc: None,
            dst_scc: None,
            counters: self.counters,
        };
        sub.rebuild_edge_table()?;
        Ok(sub)
    }

    /// Copy the rows of the sub-graph nodes back into the nodes selected by
    /// `filter`.
    pub fn copy_schedule_from(&mut self, sub: &DependenceGraph, filter: ComponentFilter) {
        let targets = self.nodes.iter_mut().filter(|n| filter.keeps_node(n.scc));
        for (node, from) in targets.zip(&sub.nodes) {
            node.sched = from.sched.clone();
            node.rank = from.rank;
            node.cmap = from.cmap.clone();
            node.cinv = from.cinv.clone();
            node.band = from.band.clone();
            node.band_id = from.band_id.clone();
            node.coincident = from.coincident.clone();
        }
    }
}

fn restrict_all(rels: &[Relation], src: &IntMatrix, dst: &IntMatrix) -> ScheduleResult<Vec<Relation>> {
    let mut out = Vec::with_capacity(rels.len());
    for rel in rels {
        let rel = operations::remove_empty_disjuncts(&rel.intersect_equal_rows(src, dst))?;
        if !rel.disjuncts.is_empty() {
            out.push(rel);
        }
    }
    Ok(out)
}

impl fmt::Display for DependenceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph: {} nodes, {} edges", self.nodes.len(), self.edges.len())?;
        for node in &self.nodes {
            writeln!(f, "  {} (scc {}, rank {}, {} rows)", node.space, node.scc, node.rank, node.sched.nrows())?;
        }
        for edge in &self.edges {
            let kinds: Vec<String> = EdgeKind::ALL.iter()
                .filter(|&&k| edge.has(k))
                .map(|k| format!("{:?}", k))
                .collect();
            writeln!(
                f, "  {} -> {} [{}]{}",
                self.nodes[edge.src].name(), self.nodes[edge.dst].name(),
                kinds.join(", "), if edge.local { " local" } else { "" },
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::set::IntegerSet;

    fn chain() -> (UnionSet, UnionRelation) {
        let s1 = IntegerSet::rectangular("S1", &[10]);
        let s2 = IntegerSet::rectangular("S2", &[10]);
        let dep = Relation::translation(&s1, &s2, &[0]);
        (UnionSet::new().with(s1).with(s2), UnionRelation::from(dep))
    }

    #[test]
    fn test_build_merges_identical_relations() {
        let (domain, validity) = chain();
        let graph = DependenceGraph::build(
            &[], &domain,
            &[(EdgeKind::Validity, &validity), (EdgeKind::Coincidence, &validity)],
        ).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.edges[0].validity && graph.edges[0].coincidence);
        assert!(graph.has_validity_edge(0, 1));
        assert!(!graph.has_validity_edge(1, 0));
        assert_eq!(graph.counters.max_row, 4);
    }

    #[test]
    fn test_build_skips_unknown_statements() {
        let (domain, _) = chain();
        let t = IntegerSet::rectangular("T", &[10]);
        let s1 = IntegerSet::rectangular("S1", &[10]);
        let validity = UnionRelation::from(Relation::translation(&s1, &t, &[0]));
        let graph = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_build_rejects_dimension_mismatch() {
        let (domain, _) = chain();
        let wide = IntegerSet::rectangular("S2", &[10, 10]);
        let s1 = IntegerSet::rectangular("S1", &[10]);
        let validity = UnionRelation::from(Relation::product(&s1, &wide));
        let err = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap_err();
        assert!(matches!(err, ScheduleError::Input(_)));
    }

    #[test]
    fn test_condition_relations_get_dummy_tags() {
        let (domain, validity) = chain();
        let graph = DependenceGraph::build(
            &[], &domain,
            &[(EdgeKind::Condition, &validity), (EdgeKind::ConditionalValidity, &validity)],
        ).unwrap();
        let edge = &graph.edges[0];
        assert!(edge.condition && edge.conditional_validity);
        assert_eq!(edge.tagged_condition.len(), 1);
        assert!(edge.tagged_condition[0].is_fully_tagged());
        assert!(graph.has_conditional_pairs());
    }

    #[test]
    fn test_update_edges_removes_carried() {
        let (domain, validity) = chain();
        let mut graph = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap();
        // S1 -> 0, S2 -> 1 separates every pair
        graph.nodes[1].scc = 1;
        graph.append_constant_row(|n| n.scc as i64).unwrap();
        graph.update_edges().unwrap();
        assert!(graph.edges.is_empty());
        assert!(!graph.has_validity_edge(0, 1));
    }

    #[test]
    fn test_update_edges_keeps_uncarried() {
        let (domain, validity) = chain();
        let mut graph = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap();
        graph.append_row(vec![vec![0, 1], vec![0, 1]], true).unwrap();
        graph.update_edges().unwrap();
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.nodes[0].rank, 1);
    }

    #[test]
    fn test_reset_band_and_padding() {
        let (domain, validity) = chain();
        let mut graph = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap();
        graph.append_row(vec![vec![0, 1], vec![0, 1]], true).unwrap();
        graph.reset_band().unwrap();
        assert_eq!(graph.counters.n_total_row, 0);
        assert_eq!(graph.nodes[0].rank, 0);
        graph.counters.n_total_row = 2;
        graph.pad_schedule();
        assert_eq!(graph.nodes[1].sched.nrows(), 2);
        assert_eq!(graph.nodes[1].band, vec![None, None]);
    }

    #[test]
    fn test_extract_sub_graph() {
        let (domain, validity) = chain();
        let mut graph = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap();
        graph.nodes[1].scc = 1;
        let before = graph.extract_sub_graph(ComponentFilter::AtMost(0)).unwrap();
        assert_eq!(before.nodes.len(), 1);
        assert!(before.edges.is_empty());
        let after = graph.extract_sub_graph(ComponentFilter::AtLeast(1)).unwrap();
        assert_eq!(after.nodes.len(), 1);
        assert_eq!(after.nodes[0].name(), "S2");

        // a validity edge pointing back into a dropped component
        graph.nodes[0].scc = 1;
        graph.nodes[1].scc = 0;
        let err = graph.extract_sub_graph(ComponentFilter::AtMost(0)).unwrap_err();
        assert!(matches!(err, ScheduleError::Internal(_)));
    }

    #[test]
    fn test_var_pairs_are_reversed() {
        let mut node = ScheduleNode::new(Space::set("S", 3));
        node.start = 10;
        assert_eq!(node.var_pair(2), (11, 12));
        assert_eq!(node.var_pair(0), (15, 16));
        assert_eq!(node.n_columns(), 7);
    }
}
