//! Band forest view of a schedule.
//!
//! A band is a group of consecutive rows shared by a set of statements.
//! Statements that share a band at one level are split into child bands at
//! the next level by their band ids.

use crate::polyhedral::map::AffineMap;
use crate::schedule::assemble::StatementSchedule;
use serde::Serialize;
use std::fmt;

/// A node of the band forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Band {
    /// Statement indices, in schedule order
    pub members: Vec<usize>,
    /// First row of the band
    pub start: usize,
    /// Number of rows; zero for a leaf placeholder
    pub len: usize,
    /// Coincidence flag per row
    pub coincident: Vec<bool>,
    /// Partial schedule per member
    pub partial: Vec<AffineMap>,
    pub children: Vec<Band>,
}

impl Band {
    /// Whether this is a leaf standing for a statement with no rows left.
    pub fn is_placeholder(&self) -> bool {
        self.len == 0
    }

    /// Rows `start..start + len`.
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }

    /// Schedule of `member` from this band down to its leaf.
    pub fn suffix_of(&self, member: usize) -> Option<AffineMap> {
        let k = self.members.iter().position(|&m| m == member)?;
        let own = self.partial[k].clone();
        match self.children.iter().find_map(|c| c.suffix_of(member)) {
            Some(rest) => Some(own.concat(&rest)),
            None => Some(own),
        }
    }

    /// Suffix schedule of every member, in member order.
    pub fn suffix_schedule(&self) -> Vec<AffineMap> {
        self.members.iter().filter_map(|&m| self.suffix_of(m)).collect()
    }

    pub(crate) fn collect_post_order<'a>(&'a self, out: &mut Vec<&'a Band>) {
        for child in &self.children {
            child.collect_post_order(out);
        }
        out.push(self);
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        let flags: String = self.coincident.iter().map(|&c| if c { 'C' } else { '-' }).collect();
        writeln!(f, "{}band rows {}..{} [{}] members {:?}", pad, self.start, self.start + self.len, flags, self.members)?;
        for map in &self.partial {
            writeln!(f, "{}  {}", pad, map)?;
        }
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Build the forest over all statements.
pub(crate) fn build_forest(statements: &[StatementSchedule]) -> Vec<Band> {
    let active: Vec<usize> = (0..statements.len()).collect();
    construct_band_list(statements, 0, &active, &[])
}

/// Bands at level `band_nr` of the active statements. `ancestors` holds the
/// row ranges of the enclosing bands, outermost first.
fn construct_band_list(
    statements: &[StatementSchedule],
    band_nr: usize,
    active: &[usize],
    ancestors: &[(usize, usize)],
) -> Vec<Band> {
    let mut bands = Vec::new();
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for &i in active {
        let stmt = &statements[i];
        if stmt.n_band() <= band_nr {
            bands.push(placeholder(stmt, i));
            continue;
        }
        let id = stmt.band_id[band_nr];
        match groups.iter_mut().find(|(g, _)| *g == id) {
            Some((_, members)) => members.push(i),
            None => groups.push((id, vec![i])),
        }
    }
    for (_, members) in groups {
        bands.push(construct_band(statements, band_nr, members, ancestors));
    }
    sort_siblings(statements, &mut bands, ancestors);
    bands
}

fn placeholder(stmt: &StatementSchedule, index: usize) -> Band {
    let start = stmt.band_end.last().copied().unwrap_or(0);
    Band {
        members: vec![index],
        start,
        len: 0,
        coincident: Vec::new(),
        partial: vec![stmt.map.range_slice(start, start)],
        children: Vec::new(),
    }
}

fn construct_band(
    statements: &[StatementSchedule],
    band_nr: usize,
    members: Vec<usize>,
    ancestors: &[(usize, usize)],
) -> Band {
    let first = &statements[members[0]];
    let rows = first.band_range(band_nr);
    let partial = members.iter()
        .map(|&i| statements[i].map.range_slice(rows.start, rows.end))
        .collect();
    let coincident = first.coincident[rows.clone()].to_vec();
    let children = if members.iter().any(|&i| statements[i].n_band() > band_nr + 1) {
        let mut inner = ancestors.to_vec();
        inner.push((rows.start, rows.len()));
        construct_band_list(statements, band_nr + 1, &members, &inner)
    } else {
        Vec::new()
    };
    Band { members, start: rows.start, len: rows.len(), coincident, partial, children }
}

/// Order siblings by the constant the nearest single-row ancestor assigns
/// to them, when that constant tells every sibling apart.
fn sort_siblings(statements: &[StatementSchedule], bands: &mut [Band], ancestors: &[(usize, usize)]) {
    if bands.len() < 2 {
        return;
    }
    let Some(&(row, _)) = ancestors.iter().rev().find(|&&(_, len)| len == 1) else {
        return;
    };
    let keys: Option<Vec<i64>> = bands.iter()
        .map(|b| statements[b.members[0]].map.outputs.get(row).and_then(|e| e.as_constant()))
        .collect();
    let Some(keys) = keys else {
        return;
    };
    let mut distinct = keys.clone();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() != keys.len() {
        return;
    }
    let mut keyed: Vec<(i64, Band)> = keys.into_iter().zip(bands.iter().cloned()).collect();
    keyed.sort_by_key(|(k, _)| *k);
    for (slot, (_, band)) in bands.iter_mut().zip(keyed) {
        *slot = band;
    }
}
