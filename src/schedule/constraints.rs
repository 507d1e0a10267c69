//! Schedule constraints: the input of schedule construction.

use crate::polyhedral::map::UnionRelation;
use crate::polyhedral::set::UnionSet;
use crate::schedule::assemble::Schedule;
use crate::schedule::controller::Scheduler;
use crate::schedule::graph::{DependenceGraph, EdgeKind};
use crate::schedule::options::ScheduleOptions;
use crate::utils::errors::ScheduleResult;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Statement domains together with the dependences a schedule must
/// respect or should optimize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConstraints {
    /// Parameter names, in the order used by the result; parameters found
    /// only in the domain or relations are appended
    #[serde(default)]
    pub params: Vec<String>,
    pub domain: UnionSet,
    /// Dependences that must be respected
    #[serde(default)]
    pub validity: UnionRelation,
    /// Dependences whose distance should be zero
    #[serde(default)]
    pub coincidence: UnionRelation,
    /// Dependences whose distance should be small
    #[serde(default)]
    pub proximity: UnionRelation,
    /// Conditions of the conditional validity pairs
    #[serde(default)]
    pub condition: UnionRelation,
    /// Validity that only holds where adjacent conditions are not local
    #[serde(default)]
    pub conditional_validity: UnionRelation,
}

impl ScheduleConstraints {
    /// Constraints over `domain` without any dependences.
    pub fn on_domain(domain: UnionSet) -> Self {
        Self { domain, ..Self::default() }
    }

    /// Validity and proximity in one go, everything else empty.
    pub fn from_validity_proximity(domain: UnionSet, validity: UnionRelation, proximity: UnionRelation) -> Self {
        Self::on_domain(domain).with_validity(validity).with_proximity(proximity)
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_validity(mut self, validity: UnionRelation) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_coincidence(mut self, coincidence: UnionRelation) -> Self {
        self.coincidence = coincidence;
        self
    }

    pub fn with_proximity(mut self, proximity: UnionRelation) -> Self {
        self.proximity = proximity;
        self
    }

    /// Set the condition and conditional validity relations together.
    pub fn with_conditional_validity(mut self, condition: UnionRelation, conditional_validity: UnionRelation) -> Self {
        self.condition = condition;
        self.conditional_validity = conditional_validity;
        self
    }

    fn relations(&self) -> [(EdgeKind, &UnionRelation); 5] {
        [
            (EdgeKind::Validity, &self.validity),
            (EdgeKind::Coincidence, &self.coincidence),
            (EdgeKind::Condition, &self.condition),
            (EdgeKind::ConditionalValidity, &self.conditional_validity),
            (EdgeKind::Proximity, &self.proximity),
        ]
    }

    /// Every parameter name in use, explicit ones first.
    pub fn all_params(&self) -> Vec<String> {
        let mut params = self.params.clone();
        let mut add = |name: String| {
            if !params.contains(&name) {
                params.push(name);
            }
        };
        for set in self.domain.iter() {
            set.space.all_param_names().into_iter().for_each(&mut add);
        }
        for (_, union) in self.relations() {
            for rel in union.iter() {
                rel.params.iter().cloned().for_each(&mut add);
            }
        }
        params
    }

    /// Re-express the domain and every relation over one parameter list.
    pub fn align_params(&self) -> ScheduleResult<ScheduleConstraints> {
        let params = self.all_params();
        let domain = self.domain.iter()
            .map(|set| set.align_params(&params))
            .collect::<Result<UnionSet, _>>()?;
        Ok(ScheduleConstraints {
            domain,
            validity: self.validity.align_params(&params)?,
            coincidence: self.coincidence.align_params(&params)?,
            proximity: self.proximity.align_params(&params)?,
            condition: self.condition.align_params(&params)?,
            conditional_validity: self.conditional_validity.align_params(&params)?,
            params,
        })
    }

    /// Compute a schedule respecting these constraints.
    pub fn compute_schedule(&self, options: &ScheduleOptions) -> ScheduleResult<Schedule> {
        let aligned = self.align_params()?;
        info!(
            "computing schedule for {} statements over {} parameters",
            aligned.domain.len(), aligned.params.len(),
        );
        if aligned.domain.is_empty() {
            return Ok(Schedule::empty(aligned.params));
        }

        let mut graph = DependenceGraph::build(&aligned.params, &aligned.domain, &aligned.relations())?;
        let mut scheduler = Scheduler::new(options);
        scheduler.compute_schedule(&mut graph)?;
        debug!(
            "schedule has {} rows, {} coefficient polyhedra computed",
            graph.counters.n_total_row, scheduler.cached_polyhedra(),
        );
        Ok(Schedule::from_graph(&graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyhedral::map::Relation;
    use crate::polyhedral::set::IntegerSet;

    #[test]
    fn test_params_are_collected_in_order() {
        let a = IntegerSet::parametric_box("A", &["N"]);
        let b = IntegerSet::parametric_box("B", &["M"]);
        let sc = ScheduleConstraints::on_domain(UnionSet::new().with(a).with(b))
            .with_params(vec!["M".to_string()]);
        assert_eq!(sc.all_params(), vec!["M".to_string(), "N".to_string()]);
        let aligned = sc.align_params().unwrap();
        assert!(aligned.domain.iter().all(|s| s.n_param() == 2));
    }

    #[test]
    fn test_empty_domain() {
        let sc = ScheduleConstraints::default();
        let schedule = sc.compute_schedule(&ScheduleOptions::default()).unwrap();
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let s = IntegerSet::rectangular("S", &[4]);
        let sc = ScheduleConstraints::on_domain(UnionSet::new().with(s.clone()))
            .with_validity(UnionRelation::from(Relation::translation(&s, &s, &[1])));
        let json = serde_json::to_string(&sc).unwrap();
        let back: ScheduleConstraints = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sc);
    }

    #[test]
    fn test_missing_relations_default_to_empty() {
        let s = IntegerSet::rectangular("S", &[4]);
        let json = format!(r#"{{"domain": {}}}"#, serde_json::to_string(&UnionSet::new().with(s)).unwrap());
        let sc: ScheduleConstraints = serde_json::from_str(&json).unwrap();
        assert!(sc.validity.is_empty());
        let schedule = sc.compute_schedule(&ScheduleOptions::default()).unwrap();
        assert_eq!(schedule.n_total_row, 1);
    }
}
