//! The integer problem that finds the next row of a band.
//!
//! Column layout:
//!
//! ```text
//! 0           sum of the parameter bound coefficients m_n
//! 1           constant bound m_0
//! 2           sum of all parameter coefficient parts
//! 3           sum of all variable coefficient parts
//! 4..         (negative, positive) parts of m_n, one pair per parameter
//! per node    c_0, parameter pairs, variable pairs from the last dim down
//! ```
//!
//! Variable pairs are expressed in the node's `t` basis when `cmap` is used.
//! Farkas multipliers follow as rational columns. Every integer column is
//! minimized in turn, so the solver prefers small bounds, then small
//! coefficients, then earlier nodes.

use crate::lp::{non_trivial_lexmin, LinearForm, LinearProblem, Objective, Region, Row};
use crate::polyhedral::farkas::CoefficientCache;
use crate::schedule::graph::{DependenceEdge, DependenceGraph, ScheduleNode};
use crate::schedule::options::ScheduleOptions;
use crate::utils::errors::{ScheduleError, ScheduleResult, SolverError, SolverErrorKind};
use log::{debug, trace};
use num_rational::BigRational;
use num_traits::ToPrimitive;

/// Schedule coefficients of one node as linear forms over LP columns.
pub(crate) struct CoefficientForms {
    pub constant: LinearForm,
    pub params: Vec<LinearForm>,
    pub vars: Vec<LinearForm>,
}

impl CoefficientForms {
    pub(crate) fn of(node: &ScheduleNode, use_cmap: bool) -> Self {
        let constant = LinearForm::var(node.start);
        let params = (0..node.nparam)
            .map(|p| {
                let (neg, pos) = node.param_pair(p);
                LinearForm::difference(pos, neg)
            })
            .collect();
        let t: Vec<LinearForm> = (0..node.nvar)
            .map(|k| {
                let (neg, pos) = node.var_pair(k);
                LinearForm::difference(pos, neg)
            })
            .collect();
        let vars = if use_cmap {
            (0..node.nvar)
                .map(|k| {
                    let mut form = LinearForm::zero();
                    for (j, tj) in t.iter().enumerate() {
                        form.add_scaled(tj, node.cmap.get(k, j));
                    }
                    form.compact()
                })
                .collect()
        } else {
            t
        };
        Self { constant, params, vars }
    }
}

/// Coefficient mapping of an intra-statement polyhedron:
/// `[constant, params, scale * c_x]`.
pub(crate) fn intra_mapping(
    forms: &CoefficientForms,
    constant: LinearForm,
    params: &[LinearForm],
    scale: i64,
) -> Vec<LinearForm> {
    let mut mapping = Vec::with_capacity(1 + params.len() + forms.vars.len());
    mapping.push(constant);
    mapping.extend(params.iter().cloned());
    mapping.extend(forms.vars.iter().map(|v| v.scaled(scale)));
    mapping
}

/// Coefficient mapping of an inter-statement polyhedron:
/// `constant + scale * (dst - src)` on the constant and parameter slots,
/// `-scale * src.c_x` and `scale * dst.c_x` on the dimension slots.
pub(crate) fn inter_mapping(
    src: &CoefficientForms,
    dst: &CoefficientForms,
    constant: LinearForm,
    params: &[LinearForm],
    scale: i64,
) -> Vec<LinearForm> {
    let mut mapping = Vec::with_capacity(1 + params.len() + src.vars.len() + dst.vars.len());
    let mut c0 = constant;
    c0.add_scaled(&dst.constant, scale);
    c0.add_scaled(&src.constant, -scale);
    mapping.push(c0);
    for (p, base) in params.iter().enumerate() {
        let mut form = base.clone();
        form.add_scaled(&dst.params[p], scale);
        form.add_scaled(&src.params[p], -scale);
        mapping.push(form);
    }
    mapping.extend(src.vars.iter().map(|v| v.scaled(-scale)));
    mapping.extend(dst.vars.iter().map(|v| v.scaled(scale)));
    mapping
}

/// Add the Farkas rows of every disjunct of `edge` with the given mapping
/// builder. Returns the range of added rows.
pub(crate) fn add_edge_rows(
    lp: &mut LinearProblem,
    cache: &mut CoefficientCache,
    edge: &DependenceEdge,
    mapping: &[LinearForm],
) -> ScheduleResult<std::ops::Range<usize>> {
    let start = lp.n_rows();
    for basic in &edge.map.disjuncts {
        let coef = if edge.is_intra() { cache.intra(basic)? } else { cache.inter(basic)? };
        coef.plug_into(lp, mapping)?;
    }
    Ok(start..lp.n_rows())
}

/// Convert an integral solution value.
pub(crate) fn to_i64(value: &BigRational) -> ScheduleResult<i64> {
    if !value.is_integer() {
        return Err(ScheduleError::internal(format!("non-integral schedule coefficient {}", value)));
    }
    value.to_integer().to_i64().ok_or_else(|| {
        SolverError::new(SolverErrorKind::Overflow, "schedule coefficient does not fit in i64").into()
    })
}

/// Read one schedule row per node out of an integral solution.
pub(crate) fn extract_rows(graph: &DependenceGraph, sol: &[BigRational], use_cmap: bool) -> ScheduleResult<Vec<Vec<i64>>> {
    let mut rows = Vec::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        let mut row = Vec::with_capacity(1 + node.nparam + node.nvar);
        row.push(to_i64(&sol[node.start])?);
        for p in 0..node.nparam {
            let (neg, pos) = node.param_pair(p);
            row.push(to_i64(&(&sol[pos] - &sol[neg]))?);
        }
        let t = (0..node.nvar)
            .map(|k| {
                let (neg, pos) = node.var_pair(k);
                to_i64(&(&sol[pos] - &sol[neg]))
            })
            .collect::<ScheduleResult<Vec<i64>>>()?;
        if use_cmap {
            row.extend(node.cmap.mul_vec(&t)?);
        } else {
            row.extend(t);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Allocate the columns of every node in sorted order, recording their
/// start in the node.
pub(crate) fn allocate_node_columns(graph: &mut DependenceGraph, lp: &mut LinearProblem, integer: bool) {
    let sorted = graph.sorted.clone();
    for i in sorted {
        let cols = lp.add_vars(graph.nodes[i].n_columns(), integer);
        graph.nodes[i].start = cols.start;
    }
}

/// `sum - (sum of the listed columns) = 0`
pub(crate) fn sum_row(sum: usize, cols: impl IntoIterator<Item = usize>) -> Row {
    let mut form = LinearForm::var(sum);
    form.terms.extend(cols.into_iter().map(|c| (c, -1)));
    Row::eq(form)
}

/// Parameter and variable part columns of every node.
pub(crate) fn coefficient_part_columns(graph: &DependenceGraph) -> (Vec<usize>, Vec<usize>) {
    let mut params = Vec::new();
    let mut vars = Vec::new();
    for node in &graph.nodes {
        for p in 0..node.nparam {
            let (neg, pos) = node.param_pair(p);
            params.extend([neg, pos]);
        }
        for k in 0..node.nvar {
            let (neg, pos) = node.var_pair(k);
            vars.extend([neg, pos]);
        }
    }
    (params, vars)
}

struct RowProblem {
    lp: LinearProblem,
    objectives: Vec<Objective>,
    regions: Vec<Region>,
}

/// Bound constant terms by `max_constant_term` and the parameter and
/// variable coefficients by `max_coefficient`. With `use_cmap`, variable
/// coefficients are reached through the node's `cmap` forms.
pub(crate) fn add_bounds(lp: &mut LinearProblem, graph: &DependenceGraph, options: &ScheduleOptions, use_cmap: bool) {
    for node in &graph.nodes {
        if let Some(bound) = options.max_constant_term {
            lp.add_row(Row::at_most(node.start, i64::from(bound)));
        }
        let Some(bound) = options.max_coefficient else {
            continue;
        };
        let bound = i64::from(bound);
        for p in 0..node.nparam {
            let (neg, pos) = node.param_pair(p);
            lp.add_row(Row::at_most(neg, bound));
            lp.add_row(Row::at_most(pos, bound));
        }
        for var in CoefficientForms::of(node, use_cmap).vars {
            let mut upper = var.scaled(-1);
            upper.constant += bound;
            lp.add_row(Row::ge(upper));
            let mut lower = var;
            lower.constant += bound;
            lp.add_row(Row::ge(lower));
        }
    }
}

fn add_validity_rows(
    lp: &mut LinearProblem,
    graph: &mut DependenceGraph,
    cache: &mut CoefficientCache,
    use_coincidence: bool,
) -> ScheduleResult<()> {
    let included = |e: &DependenceEdge| e.validity || e.local || (use_coincidence && e.coincidence);
    let forms: Vec<CoefficientForms> = graph.nodes.iter().map(|n| CoefficientForms::of(n, true)).collect();

    for edge in graph.edges.iter().filter(|e| e.is_intra() && included(e)) {
        let zeros = vec![LinearForm::zero(); graph.params.len()];
        let mapping = intra_mapping(&forms[edge.src], LinearForm::zero(), &zeros, 1);
        add_edge_rows(lp, cache, edge, &mapping)?;
    }
    for edge in graph.edges.iter_mut().filter(|e| !e.is_intra() && included(e)) {
        let zeros = vec![LinearForm::zero(); forms[edge.src].params.len()];
        let mapping = inter_mapping(&forms[edge.src], &forms[edge.dst], LinearForm::zero(), &zeros, 1);
        let rows = add_edge_rows(lp, cache, edge, &mapping)?;
        edge.start = rows.start;
        edge.end = rows.end;
    }
    Ok(())
}

fn add_proximity_rows(
    lp: &mut LinearProblem,
    graph: &DependenceGraph,
    cache: &mut CoefficientCache,
    bound: &(LinearForm, Vec<LinearForm>),
    use_coincidence: bool,
) -> ScheduleResult<()> {
    let forms: Vec<CoefficientForms> = graph.nodes.iter().map(|n| CoefficientForms::of(n, true)).collect();
    let zeros = vec![LinearForm::zero(); graph.params.len()];
    for edge in &graph.edges {
        let zero = edge.forces_zero(use_coincidence);
        if !edge.proximity && !zero {
            continue;
        }
        let (m0, m_n) = if zero { (LinearForm::zero(), &zeros) } else { (bound.0.clone(), &bound.1) };
        // validity bounds the distance from below already, and a forced
        // zero from coincidence alone only caps it
        let lower = if zero { edge.local && !edge.validity } else { !edge.validity };
        let signs: &[i64] = if lower { &[1, -1] } else { &[1] };
        for &s in signs {
            let mapping = if edge.is_intra() {
                intra_mapping(&forms[edge.src], m0.clone(), m_n, -s)
            } else {
                inter_mapping(&forms[edge.src], &forms[edge.dst], m0.clone(), m_n, -s)
            };
            add_edge_rows(lp, cache, edge, &mapping)?;
        }
    }
    Ok(())
}

fn setup_lp(
    graph: &mut DependenceGraph,
    cache: &mut CoefficientCache,
    options: &ScheduleOptions,
    use_coincidence: bool,
) -> ScheduleResult<RowProblem> {
    let n_param = graph.params.len();
    let mut lp = LinearProblem::new(4, true);
    let m_pairs: Vec<(usize, usize)> = (0..n_param)
        .map(|_| {
            let cols = lp.add_vars(2, true);
            (cols.start, cols.start + 1)
        })
        .collect();
    allocate_node_columns(graph, &mut lp, true);
    let n_integer = lp.n_vars();

    lp.add_row(sum_row(0, m_pairs.iter().flat_map(|&(neg, pos)| [neg, pos])));
    let (param_cols, var_cols) = coefficient_part_columns(graph);
    lp.add_row(sum_row(2, param_cols));
    lp.add_row(sum_row(3, var_cols));
    add_bounds(&mut lp, graph, options, true);

    add_validity_rows(&mut lp, graph, cache, use_coincidence)?;
    let m_n = m_pairs.iter().map(|&(neg, pos)| LinearForm::difference(pos, neg)).collect();
    add_proximity_rows(&mut lp, graph, cache, &(LinearForm::var(1), m_n), use_coincidence)?;

    let objectives = (0..n_integer).map(|c| vec![(c, 1)]).collect();
    let regions = graph.sorted.iter()
        .map(|&i| &graph.nodes[i])
        .filter(|node| graph.needs_row(node))
        .map(|node| Region {
            pairs: (node.rank..node.nvar).rev().map(|k| node.var_pair(k)).collect(),
        })
        .collect();
    trace!("row problem: {} columns, {} rows", lp.n_vars(), lp.n_rows());
    Ok(RowProblem { lp, objectives, regions })
}

/// Record the components joined by the inter-statement validity edge that
/// owns the conflicting row.
fn check_conflict(graph: &mut DependenceGraph, row: usize) {
    let conflict = graph.edges.iter()
        .filter(|e| e.validity && !e.is_intra())
        .filter(|e| e.start <= row && row < e.end)
        .map(|e| (graph.nodes[e.src].scc, graph.nodes[e.dst].scc))
        .find(|(src, dst)| src != dst);
    if let Some((src, dst)) = conflict {
        debug!("row {} conflicts on validity edge between components {} and {}", row, src, dst);
        graph.src_scc = Some(src);
        graph.dst_scc = Some(dst);
    }
}

/// Find the next row of the current band, one row per node in node order.
///
/// Returns `None` when no non-trivial row exists; in that case the graph's
/// `src_scc`/`dst_scc` name a conflicting component pair if one was found.
pub(crate) fn solve_row(
    graph: &mut DependenceGraph,
    cache: &mut CoefficientCache,
    options: &ScheduleOptions,
    use_coincidence: bool,
) -> ScheduleResult<Option<Vec<Vec<i64>>>> {
    let problem = setup_lp(graph, cache, options, use_coincidence)?;
    let outcome = non_trivial_lexmin(
        &problem.lp, &problem.objectives, &problem.regions, options.branch_node_limit,
    )?;
    match outcome.solution {
        Some(sol) => Ok(Some(extract_rows(graph, &sol, true)?)),
        None => {
            if let Some(row) = outcome.conflict_row {
                check_conflict(graph, row);
            }
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::map::{Relation, UnionRelation};
    use crate::polyhedral::set::{IntegerSet, UnionSet};
    use crate::schedule::graph::EdgeKind;
    use crate::schedule::scc;

    fn graph(domain: UnionSet, validity: UnionRelation) -> DependenceGraph {
        let mut g = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap();
        scc::detect_sccs(&mut g).unwrap();
        g.compute_maxvar().unwrap();
        g
    }

    #[test]
    fn test_single_statement_row() {
        let s = IntegerSet::rectangular("S", &[10]);
        let mut g = graph(UnionSet::new().with(s.clone()), UnionRelation::from(Relation::translation(&s, &s, &[1])));
        let mut cache = CoefficientCache::new();
        let rows = solve_row(&mut g, &mut cache, &ScheduleOptions::default(), false).unwrap().unwrap();
        assert_eq!(rows, vec![vec![0, 1]]);
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_reversed_dependence_row_is_respected() {
        // S[i] -> S[i - 1]: only decreasing rows are valid
        let s = IntegerSet::rectangular("S", &[10]);
        let mut g = graph(UnionSet::new().with(s.clone()), UnionRelation::from(Relation::translation(&s, &s, &[-1])));
        let mut cache = CoefficientCache::new();
        let rows = solve_row(&mut g, &mut cache, &ScheduleOptions::default(), false).unwrap().unwrap();
        assert_eq!(rows, vec![vec![0, -1]]);
    }

    #[test]
    fn test_no_row_for_bidirectional_dependence() {
        let s = IntegerSet::rectangular("S", &[10]);
        let deps = Relation::translation(&s, &s, &[1]).union(Relation::translation(&s, &s, &[-1]));
        let mut g = graph(UnionSet::new().with(s), UnionRelation::from(deps));
        let mut cache = CoefficientCache::new();
        let rows = solve_row(&mut g, &mut cache, &ScheduleOptions::default(), false).unwrap();
        assert!(rows.is_none());
        assert!(g.src_scc.is_none());
    }

    #[test]
    fn test_constant_bound_limits_offset() {
        // T must run after S with j = i
        let s = IntegerSet::rectangular("S", &[10]);
        let t = IntegerSet::rectangular("T", &[10]);
        let dep = Relation::translation(&s, &t, &[0]);
        let mut g = graph(UnionSet::new().with(s).with(t), UnionRelation::from(dep));
        let mut cache = CoefficientCache::new();
        let opts = ScheduleOptions::default().with_max_constant_term(0);
        let rows = solve_row(&mut g, &mut cache, &opts, false).unwrap().unwrap();
        assert_eq!(rows[0][0], 0);
        assert_eq!(rows[1][0], 0);
        assert!(rows[1][1] >= rows[0][1]);
    }

    #[test]
    fn test_proximity_bounds_both_directions() {
        // S[i] -> T[9 - i] as proximity only: the best rows make the distance zero
        let s = IntegerSet::rectangular("S", &[10]);
        let t = IntegerSet::rectangular("T", &[10]);
        let mut rel = Relation::product(&s, &t);
        let basic = &mut rel.disjuncts[0];
        let mirror = basic.dst_var(0) + basic.src_var(0) - basic.constant(9);
        basic.add_constraint(crate::polyhedral::constraint::Constraint::eq_zero(mirror));
        let proximity = UnionRelation::from(rel);
        let domain = UnionSet::new().with(s).with(t);
        let mut g = DependenceGraph::build(&[], &domain, &[(EdgeKind::Proximity, &proximity)]).unwrap();
        scc::detect_sccs(&mut g).unwrap();
        g.compute_maxvar().unwrap();

        let mut cache = CoefficientCache::new();
        let rows = solve_row(&mut g, &mut cache, &ScheduleOptions::default(), false).unwrap().unwrap();
        for i in 0..10 {
            let s_time = rows[0][0] + rows[0][1] * i;
            let t_time = rows[1][0] + rows[1][1] * (9 - i);
            assert_eq!(t_time - s_time, 0);
        }
    }

    #[test]
    fn test_inter_mapping_layout() {
        let mut a = ScheduleNode::new(crate::polyhedral::space::Space::set("A", 1));
        a.start = 0;
        let mut b = ScheduleNode::new(crate::polyhedral::space::Space::set("B", 1));
        b.start = 3;
        let fa = CoefficientForms::of(&a, false);
        let fb = CoefficientForms::of(&b, false);
        let mapping = inter_mapping(&fa, &fb, LinearForm::zero(), &[], 1);
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping[0].clone().compact().terms, vec![(0, -1), (3, 1)]);
        assert_eq!(mapping[1].clone().compact().terms, vec![(1, 1), (2, -1)]);
    }
}
