//! Relations between statement instances and affine schedule maps.
//!
//! A [`BasicRelation`] is a conjunction of constraints over the columns
//! `[source dims, source tag dims, destination dims, destination tag dims,
//! existential locals]` plus parameters. A [`Relation`] is a union of basic
//! relations between one source tuple and one destination tuple.

use crate::polyhedral::space::Space;
use crate::polyhedral::expr::AffineExpr;
use crate::polyhedral::constraint::{Constraint, ConstraintSystem};
use crate::polyhedral::set::IntegerSet;
use crate::utils::errors::{InputError, InputErrorKind};
use crate::utils::matrix::IntMatrix;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Name of the synthetic tag attached to untagged condition relations.
pub const DUMMY_TAG: &str = "__dummy";

/// An access tag attached to a relation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name (usually the access reference)
    pub name: String,
    /// Number of tag dimensions
    pub n_dim: usize,
}

/// One endpoint of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    /// Statement name
    pub name: String,
    /// Number of statement dimensions
    pub n_dim: usize,
    /// Optional access tag
    #[serde(default)]
    pub tag: Option<Tag>,
}

impl Tuple {
    pub fn new(name: impl Into<String>, n_dim: usize) -> Self {
        Self { name: name.into(), n_dim, tag: None }
    }

    pub fn tagged(name: impl Into<String>, n_dim: usize, tag: impl Into<String>, tag_dim: usize) -> Self {
        Self {
            name: name.into(),
            n_dim,
            tag: Some(Tag { name: tag.into(), n_dim: tag_dim }),
        }
    }

    /// Statement dims plus tag dims.
    pub fn total_dim(&self) -> usize {
        self.n_dim + self.tag.as_ref().map_or(0, |t| t.n_dim)
    }

    /// The tuple with its tag removed.
    pub fn untagged(&self) -> Tuple {
        Tuple::new(self.name.clone(), self.n_dim)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "[{}[{}] -> {}[{}]]", self.name, self.n_dim, tag.name, tag.n_dim),
            None => write!(f, "{}[{}]", self.name, self.n_dim),
        }
    }
}

/// Which endpoint of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The domain side
    Source,
    /// The range side
    Destination,
}

/// A conjunction of affine constraints relating source and destination points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicRelation {
    /// Source columns (statement plus tag dims)
    pub n_in: usize,
    /// Destination columns (statement plus tag dims)
    pub n_out: usize,
    /// Existentially quantified columns
    #[serde(default)]
    pub n_local: usize,
    /// Constraints over `n_in + n_out + n_local` dims
    pub constraints: ConstraintSystem,
}

impl BasicRelation {
    /// The relation containing every pair.
    pub fn universe(n_in: usize, n_out: usize, n_param: usize) -> Self {
        Self {
            n_in,
            n_out,
            n_local: 0,
            constraints: ConstraintSystem::new(n_in + n_out, n_param),
        }
    }

    /// Total number of columns.
    pub fn n_dim(&self) -> usize {
        self.n_in + self.n_out + self.n_local
    }

    pub fn n_param(&self) -> usize {
        self.constraints.n_param
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.add(constraint);
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    /// Expression for a source column.
    pub fn src_var(&self, i: usize) -> AffineExpr {
        AffineExpr::var(i, self.n_dim(), self.n_param())
    }

    /// Expression for a destination column.
    pub fn dst_var(&self, i: usize) -> AffineExpr {
        AffineExpr::var(self.n_in + i, self.n_dim(), self.n_param())
    }

    /// Expression for a parameter.
    pub fn param(&self, p: usize) -> AffineExpr {
        AffineExpr::param(p, self.n_dim(), self.n_param())
    }

    /// Constant expression in this relation's layout.
    pub fn constant(&self, value: i64) -> AffineExpr {
        AffineExpr::constant(value, self.n_dim(), self.n_param())
    }

    /// Restrict the source statement dims to the given domain.
    pub fn restrict_source(&mut self, domain: &IntegerSet) {
        let n_dim = self.n_dim();
        for c in &domain.constraints.constraints {
            self.add_constraint(Constraint::new(c.expr.embed(n_dim, 0), c.kind));
        }
    }

    /// Restrict the destination statement dims to the given domain.
    pub fn restrict_destination(&mut self, domain: &IntegerSet) {
        let n_dim = self.n_dim();
        for c in &domain.constraints.constraints {
            self.add_constraint(Constraint::new(c.expr.embed(n_dim, self.n_in), c.kind));
        }
    }

    /// Evaluate a schedule row (`[constant, params..., dims...]`) on one side,
    /// as an expression over this relation's columns. Only the statement dims
    /// of that side appear; tag dims follow them and are left untouched.
    pub fn row_expr(&self, row: &[i64], side: Side) -> AffineExpr {
        let n_param = self.n_param();
        let stmt = AffineExpr::from_row(row, n_param);
        let offset = match side {
            Side::Source => 0,
            Side::Destination => self.n_in,
        };
        stmt.embed(self.n_dim(), offset)
    }

    /// `dst_row(y) - src_row(x)` over this relation's columns.
    pub fn row_distance(&self, src_row: &[i64], dst_row: &[i64]) -> AffineExpr {
        self.row_expr(dst_row, Side::Destination) - self.row_expr(src_row, Side::Source)
    }

    /// Move tag columns into the existential locals.
    fn untag(&self, src: &Tuple, dst: &Tuple) -> BasicRelation {
        let src_tag = src.total_dim() - src.n_dim;
        let dst_tag = dst.total_dim() - dst.n_dim;
        let n_in = src.n_dim;
        let n_out = dst.n_dim;
        let n_local = src_tag + dst_tag + self.n_local;
        let mut positions = Vec::with_capacity(self.n_dim());
        positions.extend(0..src.n_dim);
        positions.extend((0..src_tag).map(|i| n_in + n_out + i));
        positions.extend((0..dst.n_dim).map(|i| n_in + i));
        positions.extend((0..dst_tag).map(|i| n_in + n_out + src_tag + i));
        positions.extend((0..self.n_local).map(|i| n_in + n_out + src_tag + dst_tag + i));
        BasicRelation {
            n_in,
            n_out,
            n_local,
            constraints: self.constraints.relayout(n_in + n_out + n_local, &positions),
        }
    }

    fn validate(&self, src: &Tuple, dst: &Tuple, n_param: usize) -> Result<(), InputError> {
        if self.n_in != src.total_dim() || self.n_out != dst.total_dim() {
            return Err(InputError::new(
                InputErrorKind::DimensionMismatch,
                format!("disjunct of {} -> {} has {} -> {} columns", src, dst, self.n_in, self.n_out),
            ));
        }
        let cs = &self.constraints;
        let well_formed = cs.n_dim == self.n_dim()
            && cs.n_param == n_param
            && cs.constraints.iter().all(|c| c.n_dim() == cs.n_dim && c.n_param() == cs.n_param);
        if !well_formed {
            return Err(InputError::new(
                InputErrorKind::MalformedRelation,
                format!("constraints of {} -> {} do not match the relation layout", src, dst),
            ));
        }
        Ok(())
    }
}

/// A union of basic relations between two tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Source tuple
    pub src: Tuple,
    /// Destination tuple
    pub dst: Tuple,
    /// Parameter names
    #[serde(default)]
    pub params: Vec<String>,
    /// Disjuncts; the relation is their union
    pub disjuncts: Vec<BasicRelation>,
}

impl Relation {
    /// The empty relation.
    pub fn empty(src: Tuple, dst: Tuple, params: Vec<String>) -> Self {
        Self { src, dst, params, disjuncts: Vec::new() }
    }

    /// A relation with one unconstrained disjunct.
    pub fn universe(src: Tuple, dst: Tuple, params: Vec<String>) -> Self {
        let basic = BasicRelation::universe(src.total_dim(), dst.total_dim(), params.len());
        Self { src, dst, params, disjuncts: vec![basic] }
    }

    /// Every pair of instances of the two domains, in either order of execution.
    pub fn product(src: &IntegerSet, dst: &IntegerSet) -> Self {
        let params = src.space.all_param_names();
        let mut basic = BasicRelation::universe(src.dim(), dst.dim(), params.len());
        basic.restrict_source(src);
        basic.restrict_destination(dst);
        Self {
            src: Tuple::new(src.name(), src.dim()),
            dst: Tuple::new(dst.name(), dst.dim()),
            params,
            disjuncts: vec![basic],
        }
    }

    /// `{ x -> x + offsets : x in src, x + offsets in dst }`.
    ///
    /// Both domains must have the same dimension and parameters.
    pub fn translation(src: &IntegerSet, dst: &IntegerSet, offsets: &[i64]) -> Self {
        assert_eq!(src.dim(), dst.dim());
        assert_eq!(offsets.len(), src.dim());
        let mut rel = Self::product(src, dst);
        let basic = &mut rel.disjuncts[0];
        for (k, &d) in offsets.iter().enumerate() {
            let eq = basic.dst_var(k) - basic.src_var(k) - basic.constant(d);
            basic.add_constraint(Constraint::eq_zero(eq));
        }
        rel
    }

    /// Number of parameters.
    pub fn n_param(&self) -> usize {
        self.params.len()
    }

    /// Whether the relation has no disjunct that could hold a point.
    pub fn is_plain_empty(&self) -> bool {
        self.disjuncts.iter().all(|b| b.constraints.is_obviously_empty())
    }

    pub fn add_disjunct(&mut self, basic: BasicRelation) {
        self.disjuncts.push(basic);
    }

    pub fn with_disjunct(mut self, basic: BasicRelation) -> Self {
        self.add_disjunct(basic);
        self
    }

    /// A fresh disjunct in this relation's layout, not yet added.
    pub fn new_disjunct(&self) -> BasicRelation {
        BasicRelation::universe(self.src.total_dim(), self.dst.total_dim(), self.n_param())
    }

    /// Union with a relation between the same tuples.
    pub fn union(mut self, other: Relation) -> Relation {
        debug_assert_eq!(self.src, other.src);
        debug_assert_eq!(self.dst, other.dst);
        self.disjuncts.extend(other.disjuncts);
        self
    }

    /// Whether either endpoint carries an access tag.
    pub fn is_tagged(&self) -> bool {
        self.src.tag.is_some() || self.dst.tag.is_some()
    }

    /// Whether both endpoints carry an access tag.
    pub fn is_fully_tagged(&self) -> bool {
        self.src.tag.is_some() && self.dst.tag.is_some()
    }

    /// The relation between statement instances, with tag columns projected
    /// into existential locals.
    pub fn untag(&self) -> Relation {
        if !self.is_tagged() {
            return self.clone();
        }
        Relation {
            src: self.src.untagged(),
            dst: self.dst.untagged(),
            params: self.params.clone(),
            disjuncts: self.disjuncts.iter().map(|b| b.untag(&self.src, &self.dst)).collect(),
        }
    }

    /// Attach the zero-dimensional synthetic tag to both endpoints of an
    /// untagged relation.
    pub fn with_dummy_tags(&self) -> Relation {
        let tag = Some(Tag { name: DUMMY_TAG.to_string(), n_dim: 0 });
        Relation {
            src: Tuple { tag: tag.clone(), ..self.src.untagged() },
            dst: Tuple { tag, ..self.dst.untagged() },
            params: self.params.clone(),
            disjuncts: self.disjuncts.clone(),
        }
    }

    /// Re-express the relation over the global parameter list.
    pub fn align_params(&self, params: &[String]) -> Result<Relation, InputError> {
        let disjuncts = self.disjuncts.iter()
            .map(|b| Ok(BasicRelation {
                constraints: b.constraints.align_params(&self.params, params)?,
                ..b.clone()
            }))
            .collect::<Result<Vec<_>, InputError>>()?;
        Ok(Relation {
            src: self.src.clone(),
            dst: self.dst.clone(),
            params: params.to_vec(),
            disjuncts,
        })
    }

    /// Check every disjunct against the declared tuples.
    pub fn validate(&self) -> Result<(), InputError> {
        for b in &self.disjuncts {
            b.validate(&self.src, &self.dst, self.n_param())?;
        }
        Ok(())
    }

    /// Keep only the pairs on which every source row equals the matching
    /// destination row. Rows are laid out as `[constant, params..., dims...]`.
    pub fn intersect_equal_rows(&self, src_rows: &IntMatrix, dst_rows: &IntMatrix) -> Relation {
        let disjuncts = self.disjuncts.iter()
            .map(|b| {
                let mut b = b.clone();
                for (s, d) in src_rows.rows().zip(dst_rows.rows()) {
                    let eq = b.row_distance(s, d);
                    b.add_constraint(Constraint::eq_zero(eq));
                }
                b
            })
            .collect();
        Relation { disjuncts, ..self.clone() }
    }

    /// Check whether a point pair belongs to the relation. Tag and local
    /// columns are not searched, so this is only meaningful for relations
    /// without them.
    pub fn contains(&self, x: &[i64], y: &[i64], params: &[i64]) -> bool {
        let point: Vec<i64> = x.iter().chain(y).copied().collect();
        self.disjuncts.iter()
            .filter(|b| b.n_local == 0 && b.n_in == x.len() && b.n_out == y.len())
            .any(|b| b.constraints.is_satisfied(&point, params))
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} -> {}", self.src, self.dst)?;
        for (i, b) in self.disjuncts.iter().enumerate() {
            write!(f, "{}", if i == 0 { " : " } else { "; " })?;
            let parts: Vec<String> = b.constraints.constraints.iter()
                .map(|c| c.to_string_with_names(&[], &self.params))
                .collect();
            write!(f, "{}", parts.join(" and "))?;
        }
        write!(f, " }}")
    }
}

/// A collection of relations, at most one per (source, destination) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnionRelation {
    pub relations: Vec<Relation>,
}

impl UnionRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation, merging its disjuncts into an existing relation
    /// between the same tuples.
    pub fn add(&mut self, rel: Relation) {
        match self.relations.iter_mut().find(|r| r.src == rel.src && r.dst == rel.dst) {
            Some(existing) => existing.disjuncts.extend(rel.disjuncts),
            None => self.relations.push(rel),
        }
    }

    pub fn with(mut self, rel: Relation) -> Self {
        self.add(rel);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn align_params(&self, params: &[String]) -> Result<UnionRelation, InputError> {
        let relations = self.relations.iter()
            .map(|r| r.align_params(params))
            .collect::<Result<Vec<_>, InputError>>()?;
        Ok(UnionRelation { relations })
    }
}

impl From<Relation> for UnionRelation {
    fn from(rel: Relation) -> Self {
        UnionRelation::new().with(rel)
    }
}

impl FromIterator<Relation> for UnionRelation {
    fn from_iter<T: IntoIterator<Item = Relation>>(iter: T) -> Self {
        let mut union = UnionRelation::new();
        for rel in iter {
            union.add(rel);
        }
        union
    }
}

/// The schedule of one statement: an affine map from its iteration space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffineMap {
    pub space: Space,
    /// Output expressions (one per schedule dimension)
    pub outputs: Vec<AffineExpr>,
}

impl AffineMap {
    /// Create from output expressions.
    pub fn from_outputs(space: Space, outputs: Vec<AffineExpr>) -> Self {
        Self { space, outputs }
    }

    /// Build the map whose outputs are the rows of a schedule matrix.
    pub fn from_matrix(space: Space, rows: &IntMatrix) -> Self {
        let n_param = space.n_param;
        let outputs = rows.rows().map(|r| AffineExpr::from_row(r, n_param)).collect();
        Self { space, outputs }
    }

    /// Get input dimensions.
    pub fn n_in(&self) -> usize { self.space.n_dim }

    /// Get output dimensions.
    pub fn n_out(&self) -> usize { self.outputs.len() }

    /// Get number of parameters.
    pub fn n_param(&self) -> usize { self.space.n_param }

    /// Apply the map to a point.
    pub fn apply(&self, input: &[i64], params: &[i64]) -> Vec<i64> {
        self.outputs.iter()
            .map(|expr| expr.evaluate(input, params))
            .collect()
    }

    /// The outputs `start..end` as a map of their own.
    pub fn range_slice(&self, start: usize, end: usize) -> AffineMap {
        AffineMap::from_outputs(self.space.clone(), self.outputs[start..end].to_vec())
    }

    /// Append the outputs of another map on the same space.
    pub fn concat(mut self, other: &AffineMap) -> AffineMap {
        self.outputs.extend(other.outputs.iter().cloned());
        self
    }

    /// Extend with zero outputs up to `n_out` dimensions.
    pub fn padded(&self, n_out: usize) -> AffineMap {
        let mut outputs = self.outputs.clone();
        while outputs.len() < n_out {
            outputs.push(AffineExpr::zero(self.n_in(), self.n_param()));
        }
        AffineMap::from_outputs(self.space.clone(), outputs)
    }
}

impl fmt::Display for AffineMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dim_names = self.space.all_dim_names();
        let param_names = self.space.all_param_names();
        let outputs: Vec<String> = self.outputs.iter()
            .map(|e| e.to_string_with_names(&dim_names, &param_names))
            .collect();
        write!(f, "{{ {} -> [{}] }}", self.space, outputs.join(", "))
    }
}
