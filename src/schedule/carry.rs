//! Rows that carry as many validity dependences as possible.
//!
//! Every disjunct of every (conditional) validity edge gets a column
//! `0 <= e_i <= 1` and its schedule distance must be at least `e_i`. The
//! rational lexmin first maximizes the number of carried disjuncts, then
//! keeps the coefficients small. Schedule coefficients are plain (no `cmap`)
//! and the solution is scaled to integers afterwards.

use crate::lp::{rational_lexmin, LinearForm, LinearProblem, Objective, Row};
use crate::polyhedral::farkas::CoefficientCache;
use crate::schedule::graph::DependenceGraph;
use crate::schedule::options::ScheduleOptions;
use crate::schedule::row_solver::{
    add_bounds, allocate_node_columns, coefficient_part_columns, extract_rows, inter_mapping, intra_mapping,
    sum_row, CoefficientForms,
};
use crate::utils::errors::{ScheduleError, ScheduleResult, UnschedulableError};
use crate::utils::matrix::vector_gcd;
use log::{debug, trace};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::One;

/// A carrying row for every node.
#[derive(Debug, Clone)]
pub(crate) struct CarryRow {
    /// One row per node, in node order
    pub rows: Vec<Vec<i64>>,
    /// Whether the row adds nothing new for some node that still needs rows
    pub trivial: bool,
}

fn count_validity_disjuncts(graph: &DependenceGraph) -> usize {
    graph.edges.iter()
        .filter(|e| e.is_any_validity())
        .map(|e| e.map.disjuncts.len())
        .sum()
}

/// Multiply the solution by the common denominator of its values.
fn scale_to_integers(sol: &[BigRational]) -> Vec<BigRational> {
    let lcm = sol.iter().fold(BigInt::one(), |acc, v| acc.lcm(v.denom()));
    let factor = BigRational::from_integer(lcm);
    sol.iter().map(|v| v * &factor).collect()
}

fn is_any_trivial(graph: &DependenceGraph, rows: &[Vec<i64>]) -> ScheduleResult<bool> {
    for (node, row) in graph.nodes.iter().zip(rows) {
        if !graph.needs_row(node) {
            continue;
        }
        let linear = &row[1 + node.nparam..];
        let t = node.cinv.mul_vec(linear)?;
        if t[node.rank..].iter().all(|&v| v == 0) {
            trace!("carrying row is trivial for {}", node.name());
            return Ok(true);
        }
    }
    Ok(false)
}

/// Compute a row that carries as many dependences as possible.
pub(crate) fn carry_row(
    graph: &mut DependenceGraph,
    cache: &mut CoefficientCache,
    options: &ScheduleOptions,
) -> ScheduleResult<CarryRow> {
    let n_edge = count_validity_disjuncts(graph);
    let mut lp = LinearProblem::new(3, false);
    let e_cols = lp.add_vars(n_edge, false);
    allocate_node_columns(graph, &mut lp, false);
    let n_cols = lp.n_vars();

    let mut carried = LinearForm::var(0);
    carried.terms.extend(e_cols.clone().map(|c| (c, 1)));
    carried.constant = -(n_edge as i64);
    lp.add_row(Row::eq(carried));
    let (param_cols, var_cols) = coefficient_part_columns(graph);
    lp.add_row(sum_row(1, param_cols));
    lp.add_row(sum_row(2, var_cols));
    for c in e_cols.clone() {
        lp.add_row(Row::at_most(c, 1));
    }
    add_bounds(&mut lp, graph, options, false);

    let forms: Vec<CoefficientForms> = graph.nodes.iter().map(|n| CoefficientForms::of(n, false)).collect();
    let zeros = vec![LinearForm::zero(); graph.params.len()];
    let mut e = e_cols.start;
    for edge in graph.edges.iter().filter(|e| e.is_any_validity()) {
        for basic in &edge.map.disjuncts {
            let minus_e = LinearForm::var(e).scaled(-1);
            let (coef, mapping) = if edge.is_intra() {
                (cache.intra(basic)?, intra_mapping(&forms[edge.src], minus_e, &zeros, 1))
            } else {
                (cache.inter(basic)?, inter_mapping(&forms[edge.src], &forms[edge.dst], minus_e, &zeros, 1))
            };
            coef.plug_into(&mut lp, &mapping)?;
            e += 1;
        }
    }

    let objectives: Vec<Objective> = (0..n_cols).map(|c| vec![(c, 1)]).collect();
    let sol = rational_lexmin(&lp, &[], &objectives)?
        .ok_or_else(|| ScheduleError::internal("carrying problem is infeasible"))?;

    if sol[0] >= BigRational::from_integer(BigInt::from(n_edge)) {
        return Err(UnschedulableError::cannot_carry().into());
    }
    debug!("carrying {} of {} dependences", BigRational::from_integer(BigInt::from(n_edge)) - &sol[0], n_edge);

    let scaled = scale_to_integers(&sol);
    let rows = extract_rows(graph, &scaled, false)?;
    let trivial = is_any_trivial(graph, &rows)?;
    Ok(CarryRow { rows, trivial })
}

/// Split the common factor off the constant term of the last row.
///
/// If the non-constant coefficients of the last row share a factor `g > 1`
/// over all nodes, a new band gets a row holding `c0 mod g` and the last
/// row is divided by `g`, its constant rounded down.
pub(crate) fn split_scaled(graph: &mut DependenceGraph) -> ScheduleResult<()> {
    if graph.nodes.len() <= 1 || graph.counters.n_total_row == 0 {
        return Ok(());
    }
    let row = graph.counters.n_total_row - 1;
    let g = graph.nodes.iter().fold(0i64, |g, n| g.gcd(&vector_gcd(&n.sched.row(row)[1..])));
    if g <= 1 {
        return Ok(());
    }
    debug!("splitting factor {} off the constant term", g);

    graph.next_band();
    graph.append_constant_row(|n| n.sched.get(row, 0).mod_floor(&g))?;
    for node in &mut graph.nodes {
        let c0 = node.sched.get(row, 0);
        node.sched.set(row, 0, c0.div_floor(&g));
        for col in 1..node.sched.ncols() {
            let v = node.sched.get(row, col);
            node.sched.set(row, col, v / g);
        }
        node.update_cmap()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::map::{Relation, UnionRelation};
    use crate::polyhedral::set::{IntegerSet, UnionSet};
    use crate::schedule::graph::EdgeKind;
    use crate::schedule::scc;
    use crate::utils::errors::UnschedulableErrorKind;

    fn graph(domain: UnionSet, validity: UnionRelation) -> DependenceGraph {
        let mut g = DependenceGraph::build(&[], &domain, &[(EdgeKind::Validity, &validity)]).unwrap();
        scc::detect_sccs(&mut g).unwrap();
        g.compute_maxvar().unwrap();
        g
    }

    #[test]
    fn test_carries_chain() {
        let s = IntegerSet::rectangular("S", &[10]);
        let t = IntegerSet::rectangular("T", &[10]);
        let dep = Relation::translation(&s, &t, &[0]);
        let mut g = graph(UnionSet::new().with(s).with(t), UnionRelation::from(dep));
        let mut cache = CoefficientCache::new();
        let carry = carry_row(&mut g, &mut cache, &ScheduleOptions::default()).unwrap();
        // T runs after S on every pair
        for i in 0..10 {
            let s_time = carry.rows[0][0] + carry.rows[0][1] * i;
            let t_time = carry.rows[1][0] + carry.rows[1][1] * i;
            assert!(t_time >= s_time + 1);
        }
    }

    #[test]
    fn test_cannot_carry_bidirectional() {
        let s = IntegerSet::rectangular("S", &[10]);
        let deps = Relation::translation(&s, &s, &[1]).union(Relation::translation(&s, &s, &[-1]));
        let mut g = graph(UnionSet::new().with(s), UnionRelation::from(deps));
        let mut cache = CoefficientCache::new();
        let err = carry_row(&mut g, &mut cache, &ScheduleOptions::default()).unwrap_err();
        match err {
            ScheduleError::Unschedulable(e) => assert_eq!(e.kind, UnschedulableErrorKind::CannotCarry),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_scale_to_integers() {
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        let third = BigRational::new(BigInt::from(2), BigInt::from(3));
        let scaled = scale_to_integers(&[half, third]);
        assert_eq!(scaled[0], BigRational::from_integer(BigInt::from(3)));
        assert_eq!(scaled[1], BigRational::from_integer(BigInt::from(4)));
    }

    #[test]
    fn test_split_scaled() {
        let s = IntegerSet::rectangular("S", &[10]);
        let t = IntegerSet::rectangular("T", &[10]);
        let mut g = graph(UnionSet::new().with(s).with(t), UnionRelation::new());
        g.append_row(vec![vec![3, 2], vec![-1, 4]], false).unwrap();
        split_scaled(&mut g).unwrap();
        assert_eq!(g.counters.n_total_row, 2);
        assert_eq!(g.nodes[0].sched.row(0), &[1, 1]);
        assert_eq!(g.nodes[0].sched.row(1), &[1, 0]);
        assert_eq!(g.nodes[1].sched.row(0), &[-1, 2]);
        assert_eq!(g.nodes[1].sched.row(1), &[1, 0]);
        assert_eq!(g.nodes[1].band, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_split_scaled_skips_coprime() {
        let s = IntegerSet::rectangular("S", &[10]);
        let t = IntegerSet::rectangular("T", &[10]);
        let mut g = graph(UnionSet::new().with(s).with(t), UnionRelation::new());
        g.append_row(vec![vec![3, 2], vec![1, 3]], false).unwrap();
        split_scaled(&mut g).unwrap();
        assert_eq!(g.counters.n_total_row, 1);
    }
}
