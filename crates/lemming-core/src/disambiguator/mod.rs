//! Landmark-driven plan disambiguation.
//!
//! Two stateless protocols over a hashed plan set:
//!
//! - **selection**: one static view listing every landmark whose achievers
//!   split the plan set, with prior selections applied as filters;
//! - **build**: an incremental walk (forward from the initial state or
//!   backward from the goal) that presents one decision at a time and narrows
//!   the live plans with each selection until one or none remain.
//!
//! A plan's *choice* for a landmark is the first action of the plan that
//! achieves it, or [`NOT_ACHIEVED`] when it has none. A landmark is a
//! *decision point* for a set of plans when those choices split the set into
//! two or more groups.
//!
//! Both entry points return `Ok(None)` when the landmarks or plans are
//! inconsistent with the task; [`handle_flow_output`] turns that into an
//! unprocessable error.

mod build;
pub mod graph;
mod selection;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{LemmingError, Result};
use crate::fingerprint::{normalize_action, PlanFingerprint};
use crate::landmarks::LandmarkGraph;
use crate::pddl::Domain;
use crate::types::{Plan, PlanningTask};

pub use build::generate_build_view;
pub use graph::{PlanGraph, PlanGraphEdge, PlanGraphNode};
pub use selection::generate_select_view;

/// Stand-in action for a plan that has already ended at a step decision.
pub const END_OF_PLAN: &str = "<end-of-plan>";

/// Stand-in achiever for a plan that never uses one of a landmark's
/// achievers (the landmark holds initially or its achiever list is partial).
pub const NOT_ACHIEVED: &str = "<not-achieved>";

// ─── Wire types ───────────────────────────────────────────────

/// One prior user choice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionInfo {
    /// Landmark the choice was made for; `None` means "the current decision".
    #[serde(default)]
    pub landmark_id: Option<usize>,
    /// Set when answering a step decision of the build flow.
    #[serde(default)]
    pub step: Option<usize>,
    pub selected_first_achiever: String,
    /// Optional extra filter: keep only these plans.
    #[serde(default)]
    pub selected_plan_hashes: Vec<String>,
}

/// One option presented to the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceInfo {
    pub landmark_id: Option<usize>,
    pub step: Option<usize>,
    pub facts: Vec<String>,
    pub first_achiever: String,
    pub plan_hashes: Vec<String>,
    pub is_available_for_choice: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDisambiguatorInput {
    #[serde(default)]
    pub selection_infos: Vec<SelectionInfo>,
    #[serde(default)]
    pub landmarks: LandmarkGraph,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub plans: Vec<Plan>,
}

impl PlanDisambiguatorInput {
    pub fn check_domain_problem(&self) -> bool {
        self.planning_task().check_domain_problem()
    }

    pub fn planning_task(&self) -> PlanningTask {
        PlanningTask::new(self.domain.clone(), self.problem.clone())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    #[default]
    Selection,
    BuildForward,
    BuildBackward,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    /// More than one plan is live; `choice_infos` holds the next options.
    #[default]
    Choosing,
    /// Exactly one plan is live.
    Resolved,
    /// The selections exclude every plan.
    DeadEnd,
    /// There were no plans to begin with.
    NoPlans,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDisambiguatorOutput {
    pub view: ViewKind,
    pub status: FlowStatus,
    pub plans: Vec<Plan>,
    pub choice_infos: Vec<ChoiceInfo>,
    pub selected_plan_hash: Option<String>,
    pub plan_graph: PlanGraph,
}

impl PlanDisambiguatorOutput {
    fn no_plans(view: ViewKind) -> Self {
        Self {
            view,
            status: FlowStatus::NoPlans,
            ..Default::default()
        }
    }
}

/// Build traversal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn view(self) -> ViewKind {
        match self {
            Self::Forward => ViewKind::BuildForward,
            Self::Backward => ViewKind::BuildBackward,
        }
    }
}

/// Map an absent flow output to an unprocessable-request error.
pub fn handle_flow_output(
    output: Option<PlanDisambiguatorOutput>,
) -> Result<PlanDisambiguatorOutput> {
    output.ok_or_else(|| {
        LemmingError::Unprocessable(
            "landmark or plan data is inconsistent with the given domain/problem".into(),
        )
    })
}

// ─── Shared context ───────────────────────────────────────────

/// Hashed, deduplicated plans plus each plan's choice per landmark.
pub(crate) struct Context<'a> {
    plans: Vec<Plan>,
    graph: &'a LandmarkGraph,
    /// `choices[landmark id][plan index]` = (normalized achiever, position)
    choices: HashMap<usize, Vec<Option<(String, usize)>>>,
}

impl<'a> Context<'a> {
    /// Validate the input against its task. `Ok(None)` flags inconsistent
    /// data; a domain that does not parse is an error.
    pub(crate) fn prepare(input: &'a PlanDisambiguatorInput) -> Result<Option<Self>> {
        input.planning_task().require_non_empty()?;
        let domain = Domain::parse(&input.domain)?;

        if let Err(err) = input.landmarks.validate() {
            tracing::warn!(error = %err, "landmark graph rejected");
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let mut plans = Vec::with_capacity(input.plans.len());
        for plan in &input.plans {
            let fingerprint = PlanFingerprint::from_plan(plan);
            if let Some(declared) = &plan.hash {
                if *declared != fingerprint.hash {
                    tracing::warn!(
                        declared = %declared,
                        computed = fingerprint.short(),
                        "plan hash mismatch"
                    );
                    return Ok(None);
                }
            }
            let computed = fingerprint.hash;
            if let Some(action) = plan.actions.iter().find(|a| !matches_domain(&domain, a)) {
                tracing::warn!(action = %action, "plan action not in domain");
                return Ok(None);
            }
            if seen.insert(computed.clone()) {
                let mut plan = plan.clone();
                plan.hash = Some(computed);
                plans.push(plan);
            }
        }

        for landmark in &input.landmarks.landmarks {
            let achievers = landmark.possible_achievers.iter().chain(&landmark.first_achievers);
            if let Some(action) = achievers.into_iter().find(|a| !matches_domain(&domain, a)) {
                tracing::warn!(landmark = landmark.id, action = %action, "landmark achiever not in domain");
                return Ok(None);
            }
        }

        let choices = input
            .landmarks
            .landmarks
            .iter()
            .map(|landmark| {
                let pool = if landmark.possible_achievers.is_empty() {
                    &landmark.first_achievers
                } else {
                    &landmark.possible_achievers
                };
                let achievers: HashSet<String> = pool.iter().map(|a| normalize_action(a)).collect();
                let per_plan = plans
                    .iter()
                    .map(|plan| {
                        plan.actions.iter().enumerate().find_map(|(pos, action)| {
                            let action = normalize_action(action);
                            achievers.contains(&action).then_some((action, pos))
                        })
                    })
                    .collect();
                (landmark.id, per_plan)
            })
            .collect();

        tracing::debug!(
            plans = plans.len(),
            landmarks = input.landmarks.landmarks.len(),
            "disambiguation context ready"
        );
        Ok(Some(Self {
            plans,
            graph: &input.landmarks,
            choices,
        }))
    }

    pub(crate) fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub(crate) fn plan(&self, index: usize) -> &Plan {
        &self.plans[index]
    }

    pub(crate) fn hash(&self, index: usize) -> &str {
        self.plans[index].hash.as_deref().unwrap_or_default()
    }

    pub(crate) fn hashes(&self, indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| self.hash(i).to_string()).collect()
    }

    pub(crate) fn choice(&self, landmark: usize, plan: usize) -> Option<&(String, usize)> {
        self.choices.get(&landmark)?.get(plan)?.as_ref()
    }

    /// A plan's achiever for `landmark`, [`NOT_ACHIEVED`] if it has none.
    pub(crate) fn achiever(&self, landmark: usize, plan: usize) -> &str {
        self.choice(landmark, plan)
            .map(|(achiever, _)| achiever.as_str())
            .unwrap_or(NOT_ACHIEVED)
    }

    /// Plans in `among` grouped by their achiever for `landmark`; every plan
    /// lands in exactly one group.
    pub(crate) fn groups(&self, landmark: usize, among: &[usize]) -> BTreeMap<String, Vec<usize>> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for &plan in among {
            groups
                .entry(self.achiever(landmark, plan).to_string())
                .or_default()
                .push(plan);
        }
        groups
    }

    pub(crate) fn is_decision(&self, landmark: usize, among: &[usize]) -> bool {
        self.groups(landmark, among).len() >= 2
    }

    pub(crate) fn facts(&self, landmark: usize) -> Vec<String> {
        self.graph
            .get(landmark)
            .map(|l| l.facts.clone())
            .unwrap_or_default()
    }

    /// Landmark ids in traversal order for `live`.
    ///
    /// Kahn's algorithm over the ordering edges (reversed for backward),
    /// picking among ready landmarks by mean achiever position in `live`
    /// (earliest first forward, latest first backward), then by id.
    pub(crate) fn traversal_order(&self, live: &[usize], direction: Direction) -> Vec<usize> {
        let mean: HashMap<usize, f64> = self
            .graph
            .landmarks
            .iter()
            .map(|l| {
                let positions: Vec<usize> = live
                    .iter()
                    .filter_map(|&p| self.choice(l.id, p).map(|(_, pos)| *pos))
                    .collect();
                let key = if positions.is_empty() {
                    match direction {
                        Direction::Forward => f64::INFINITY,
                        Direction::Backward => f64::NEG_INFINITY,
                    }
                } else {
                    positions.iter().sum::<usize>() as f64 / positions.len() as f64
                };
                (l.id, key)
            })
            .collect();

        let mut indegree: HashMap<usize, usize> = self.graph.landmarks.iter().map(|l| (l.id, 0)).collect();
        let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut edges = HashSet::new();
        for ordering in &self.graph.orderings {
            let (from, to) = match direction {
                Direction::Forward => (ordering.from, ordering.to),
                Direction::Backward => (ordering.to, ordering.from),
            };
            if edges.insert((from, to)) {
                successors.entry(from).or_default().push(to);
                *indegree.entry(to).or_default() += 1;
            }
        }

        let mut ready: Vec<usize> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(indegree.len());
        while !ready.is_empty() {
            let best = (0..ready.len())
                .min_by(|&x, &y| {
                    let (a, b) = (ready[x], ready[y]);
                    let by_position = match direction {
                        Direction::Forward => mean[&a].total_cmp(&mean[&b]),
                        Direction::Backward => mean[&b].total_cmp(&mean[&a]),
                    };
                    by_position.then(a.cmp(&b))
                })
                .unwrap_or_default();
            let id = ready.swap_remove(best);
            order.push(id);
            for &next in successors.get(&id).into_iter().flatten() {
                if let Some(d) = indegree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(next);
                    }
                }
            }
        }
        order
    }
}

/// `"(name a b)"` names a domain action with matching arity.
fn matches_domain(domain: &Domain, action: &str) -> bool {
    let normalized = normalize_action(action);
    let mut parts = normalized.split_whitespace();
    let Some(name) = parts.next() else {
        return false;
    };
    domain
        .action(name)
        .is_some_and(|schema| schema.params.len() == parts.count())
}

/// `(achiever)` as shown to users; sentinels stay bare.
pub(crate) fn display_action(normalized: &str) -> String {
    if normalized == END_OF_PLAN || normalized == NOT_ACHIEVED {
        normalized.to_string()
    } else {
        format!("({})", normalized)
    }
}

/// Keep only the plans whose hash is listed, when a list is given.
pub(crate) fn restrict_to_hashes(ctx: &Context<'_>, live: &mut Vec<usize>, hashes: &[String]) {
    if hashes.is_empty() {
        return;
    }
    live.retain(|&p| hashes.iter().any(|h| h == ctx.hash(p)));
}
