//! Relaxed-planning-graph landmark extraction.
//!
//! All three methods work on the delete relaxation of the grounded task.
//! Facts true initially are only kept when they are also goals. Orderings
//! are only emitted from a landmark that first appears in an earlier relaxed
//! layer than its successor, so the result is acyclic by construction.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::graph::{Landmark, LandmarkGraph, LandmarkKind, LandmarkOrdering, OrderingKind};
use super::{LandmarkCategory, LandmarkExtractor};
use crate::error::Result;
use crate::pddl::GroundTask;

/// Disjunctive landmarks larger than this are not worth presenting.
const MAX_DISJUNCTION: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct RelaxedLandmarkExtractor;

impl LandmarkExtractor for RelaxedLandmarkExtractor {
    fn extract(&self, task: &GroundTask, category: LandmarkCategory) -> Result<LandmarkGraph> {
        let mut builder = Builder::new(task);
        if !builder.goal_reachable(&builder.layers.iter().map(Option::is_some).collect::<Vec<_>>()) {
            tracing::debug!("goal is relaxed-unreachable, no landmarks");
            return Ok(LandmarkGraph::default());
        }
        match category {
            LandmarkCategory::Rhw => builder.rhw(),
            LandmarkCategory::Zg => builder.zg(),
            LandmarkCategory::Exhaust => builder.exhaust(),
        }
        Ok(builder.finish())
    }
}

struct Candidate {
    facts: Vec<usize>,
    kind: LandmarkKind,
}

struct Builder<'a> {
    task: &'a GroundTask,
    layers: Vec<Option<u32>>,
    candidates: Vec<Candidate>,
    by_facts: HashMap<Vec<usize>, usize>,
    edges: BTreeSet<(usize, usize, OrderingKind)>,
}

impl<'a> Builder<'a> {
    fn new(task: &'a GroundTask) -> Self {
        Self {
            task,
            layers: task.relaxed_layers(&[]),
            candidates: Vec::new(),
            by_facts: HashMap::new(),
            edges: BTreeSet::new(),
        }
    }

    fn goal_reachable(&self, reach: &[bool]) -> bool {
        self.task.goal_pos.iter().all(|&g| reach[g])
    }

    fn is_goal(&self, fact: usize) -> bool {
        self.task.goal_pos.contains(&fact)
    }

    /// Candidate index and whether it was newly created.
    fn add(&mut self, mut facts: Vec<usize>, kind: LandmarkKind) -> (usize, bool) {
        facts.sort_unstable();
        facts.dedup();
        if let Some(&idx) = self.by_facts.get(&facts) {
            return (idx, false);
        }
        let idx = self.candidates.len();
        self.by_facts.insert(facts.clone(), idx);
        self.candidates.push(Candidate { facts, kind });
        (idx, true)
    }

    fn layer(&self, candidate: usize) -> u32 {
        self.candidates[candidate]
            .facts
            .iter()
            .filter_map(|&f| self.layers[f])
            .min()
            .unwrap_or(u32::MAX)
    }

    fn order(&mut self, from: usize, to: usize, kind: OrderingKind) {
        if from != to && self.layer(from) < self.layer(to) {
            self.edges.insert((from, to, kind));
        }
    }

    fn adders(&self, facts: &[usize]) -> Vec<usize> {
        self.task
            .actions
            .iter()
            .enumerate()
            .filter(|(_, a)| facts.iter().any(|&f| a.may_add(f)))
            .map(|(i, _)| i)
            .collect()
    }

    fn exclusion_mask(&self, actions: &[usize]) -> Vec<bool> {
        let mut mask = vec![false; self.task.actions.len()];
        for &a in actions {
            mask[a] = true;
        }
        mask
    }

    /// Relaxed reachability with every adder of `facts` removed.
    fn reachable_without(&self, facts: &[usize]) -> Vec<bool> {
        let mask = self.exclusion_mask(&self.adders(facts));
        self.task.relaxed_reachable(&mask)
    }

    /// Adders applicable before any of `facts` can be reached.
    fn first_achievers(&self, facts: &[usize]) -> Vec<usize> {
        let adders = self.adders(facts);
        let reach = self.task.relaxed_reachable(&self.exclusion_mask(&adders));
        adders
            .into_iter()
            .filter(|&a| self.task.actions[a].pre_pos.iter().all(|&p| reach[p]))
            .collect()
    }

    fn keep_fact(&self, fact: usize) -> bool {
        self.layers[fact].is_some() && (!self.task.is_initial(fact) || self.is_goal(fact))
    }

    fn exhaust(&mut self) {
        let task = self.task;
        for &g in &task.goal_pos {
            self.add(vec![g], LandmarkKind::Fact);
        }
        for fact in 0..task.facts.len() {
            if !self.keep_fact(fact) || self.is_goal(fact) {
                continue;
            }
            if !self.goal_reachable(&self.reachable_without(&[fact])) {
                self.add(vec![fact], LandmarkKind::Fact);
            }
        }
        self.natural_orderings_by_exclusion();
    }

    fn natural_orderings_by_exclusion(&mut self) {
        for from in 0..self.candidates.len() {
            let facts = self.candidates[from].facts.clone();
            if facts.iter().all(|&f| self.task.is_initial(f)) {
                continue;
            }
            let reach = self.reachable_without(&facts);
            for to in 0..self.candidates.len() {
                if to != from && self.candidates[to].facts.iter().all(|&f| !reach[f]) {
                    self.order(from, to, OrderingKind::Natural);
                }
            }
        }
    }

    fn zg(&mut self) {
        let task = self.task;
        let mut labels: Vec<Option<BTreeSet<usize>>> = vec![None; task.facts.len()];
        for &f in &task.init_facts {
            labels[f] = Some(BTreeSet::from([f]));
        }
        loop {
            let mut changed = false;
            for action in &task.actions {
                let Some(pre_label) = union_of(&labels, &action.pre_pos) else {
                    continue;
                };
                let mut effects: Vec<(usize, BTreeSet<usize>)> =
                    action.add.iter().map(|&f| (f, pre_label.clone())).collect();
                for ce in &action.conditional {
                    if let Some(cond_label) = union_of(&labels, &ce.cond_pos) {
                        let joined: BTreeSet<usize> = pre_label.union(&cond_label).copied().collect();
                        effects.extend(ce.add.iter().map(|&f| (f, joined.clone())));
                    }
                }
                for (fact, mut candidate) in effects {
                    candidate.insert(fact);
                    let next = match &labels[fact] {
                        None => candidate,
                        Some(old) => {
                            let mut kept: BTreeSet<usize> =
                                old.intersection(&candidate).copied().collect();
                            kept.insert(fact);
                            kept
                        }
                    };
                    if labels[fact].as_ref() != Some(&next) {
                        labels[fact] = Some(next);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let mut facts: BTreeSet<usize> = BTreeSet::new();
        for &g in &task.goal_pos {
            if let Some(label) = &labels[g] {
                facts.extend(label.iter().copied());
            }
        }
        let kept: Vec<usize> = facts.into_iter().filter(|&f| self.keep_fact(f)).collect();
        let mut ids: BTreeMap<usize, usize> = BTreeMap::new();
        for fact in kept {
            ids.insert(fact, self.add(vec![fact], LandmarkKind::Fact).0);
        }
        for (&fact, &to) in &ids {
            if let Some(label) = &labels[fact] {
                for before in label {
                    if let Some(&from) = ids.get(before) {
                        self.order(from, to, OrderingKind::Natural);
                    }
                }
            }
        }
    }

    fn rhw(&mut self) {
        let task = self.task;
        let mut queue = VecDeque::new();
        for &g in &task.goal_pos {
            queue.push_back(self.add(vec![g], LandmarkKind::Fact).0);
        }
        while let Some(current) = queue.pop_front() {
            if self.candidates[current].kind == LandmarkKind::Disjunctive {
                continue;
            }
            let facts = self.candidates[current].facts.clone();
            if facts.iter().all(|&f| task.is_initial(f)) {
                continue;
            }
            let achievers = self.first_achievers(&facts);
            let Some((first, rest)) = achievers.split_first() else {
                continue;
            };

            let mut shared: BTreeSet<usize> = task.actions[*first].pre_pos.iter().copied().collect();
            for &a in rest {
                let pre: BTreeSet<usize> = task.actions[a].pre_pos.iter().copied().collect();
                shared = shared.intersection(&pre).copied().collect();
            }
            for &p in &shared {
                if task.is_initial(p) {
                    continue;
                }
                let (idx, created) = self.add(vec![p], LandmarkKind::Fact);
                self.order(idx, current, OrderingKind::GreedyNecessary);
                if created {
                    queue.push_back(idx);
                }
            }

            // one precondition per achiever sharing a predicate
            let mut groups: BTreeMap<&str, (usize, BTreeSet<usize>)> = BTreeMap::new();
            for &a in &achievers {
                let mut preds_here: BTreeSet<&str> = BTreeSet::new();
                for &p in &task.actions[a].pre_pos {
                    if shared.contains(&p) {
                        continue;
                    }
                    let pred = predicate_of(&task.facts[p]);
                    let entry = groups.entry(pred).or_insert_with(|| (0, BTreeSet::new()));
                    entry.1.insert(p);
                    if preds_here.insert(pred) {
                        entry.0 += 1;
                    }
                }
            }
            for (covered, members) in groups.into_values() {
                let members: Vec<usize> = members.into_iter().collect();
                if covered != achievers.len()
                    || members.len() < 2
                    || members.len() > MAX_DISJUNCTION
                    || members.iter().any(|&f| task.is_initial(f) || self.by_facts.contains_key(&vec![f]))
                {
                    continue;
                }
                let (idx, _) = self.add(members, LandmarkKind::Disjunctive);
                self.order(idx, current, OrderingKind::GreedyNecessary);
            }
        }
    }

    fn finish(self) -> LandmarkGraph {
        let task = self.task;
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        order.sort_by_key(|&c| {
            let names: Vec<&str> = self.candidates[c]
                .facts
                .iter()
                .map(|&f| task.facts[f].as_str())
                .collect();
            (self.layer(c), names)
        });
        let mut new_id = vec![0; self.candidates.len()];
        for (id, &c) in order.iter().enumerate() {
            new_id[c] = id;
        }

        let landmarks = order
            .iter()
            .enumerate()
            .map(|(id, &c)| {
                let candidate = &self.candidates[c];
                let names = |actions: Vec<usize>| -> Vec<String> {
                    actions
                        .into_iter()
                        .map(|a| task.actions[a].name.clone())
                        .collect()
                };
                Landmark {
                    id,
                    kind: candidate.kind,
                    facts: candidate.facts.iter().map(|&f| task.facts[f].clone()).collect(),
                    first_achievers: names(self.first_achievers(&candidate.facts)),
                    possible_achievers: names(self.adders(&candidate.facts)),
                    is_initial: candidate.facts.iter().any(|&f| task.is_initial(f)),
                    is_goal: candidate.facts.iter().any(|&f| task.goal_pos.contains(&f)),
                }
            })
            .collect();

        let mut orderings: Vec<LandmarkOrdering> = self
            .edges
            .iter()
            .map(|&(from, to, kind)| LandmarkOrdering {
                from: new_id[from],
                to: new_id[to],
                kind,
            })
            .collect();
        orderings.sort_by_key(|o| (o.from, o.to));
        LandmarkGraph {
            landmarks,
            orderings,
        }
    }
}

fn union_of(labels: &[Option<BTreeSet<usize>>], facts: &[usize]) -> Option<BTreeSet<usize>> {
    let mut out = BTreeSet::new();
    for &f in facts {
        out.extend(labels[f].as_ref()?.iter().copied());
    }
    Some(out)
}

/// `"(at a b)"` → `"at"`.
fn predicate_of(fact: &str) -> &str {
    fact.trim_start_matches('(')
        .trim_end_matches(')')
        .split_whitespace()
        .next()
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::extract_landmarks;
    use crate::pddl::{Domain, Problem};
    use crate::types::PlanningTask;
    use proptest::prelude::*;

    const DOMAIN: &str = r#"
    (define (domain post)
      (:requirements :strips :negative-preconditions)
      (:predicates (drafted) (sent) (checked) (archived) (via-slack) (via-gmail))
      (:action draft :parameters () :precondition (not (drafted)) :effect (drafted))
      (:action slack :parameters () :precondition (drafted) :effect (and (sent) (via-slack)))
      (:action gmail :parameters () :precondition (drafted) :effect (and (sent) (via-gmail)))
      (:action review :parameters () :precondition (drafted) :effect (checked))
      (:action archive :parameters () :precondition (and (sent) (checked)) :effect (archived)))
    "#;

    const PROBLEM: &str = "(define (problem p) (:domain post) (:init) (:goal (archived)))";

    fn ground() -> GroundTask {
        GroundTask::new(&Domain::parse(DOMAIN).unwrap(), &Problem::parse(PROBLEM).unwrap())
            .unwrap()
    }

    fn facts(graph: &LandmarkGraph) -> Vec<String> {
        let mut out: Vec<String> = graph
            .landmarks
            .iter()
            .filter(|l| l.kind == LandmarkKind::Fact)
            .map(|l| l.facts[0].clone())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn all_methods_find_the_fact_landmarks() {
        let task = ground();
        for category in LandmarkCategory::ALL {
            let graph = RelaxedLandmarkExtractor.extract(&task, category).unwrap();
            graph.validate().unwrap();
            assert_eq!(
                facts(&graph),
                vec!["(archived)", "(checked)", "(drafted)", "(sent)"],
                "{category}"
            );
        }
    }

    #[test]
    fn achievers_are_recorded() {
        let graph = RelaxedLandmarkExtractor
            .extract(&ground(), LandmarkCategory::Exhaust)
            .unwrap();
        let sent = graph.landmarks.iter().find(|l| l.facts == ["(sent)"]).unwrap();
        assert_eq!(sent.possible_achievers, vec!["(slack)", "(gmail)"]);
        assert_eq!(sent.first_achievers, vec!["(slack)", "(gmail)"]);
        let goal = graph.landmarks.iter().find(|l| l.facts == ["(archived)"]).unwrap();
        assert!(goal.is_goal && !goal.is_initial);
    }

    #[test]
    fn orderings_follow_causal_chain() {
        let graph = RelaxedLandmarkExtractor
            .extract(&ground(), LandmarkCategory::Rhw)
            .unwrap();
        let id = |fact: &str| graph.landmarks.iter().find(|l| l.facts == [fact]).unwrap().id;
        let order = graph.topological_order().unwrap();
        let pos = |fact: &str| order.iter().position(|&i| i == id(fact)).unwrap();
        assert!(pos("(drafted)") < pos("(sent)"));
        assert!(pos("(sent)") < pos("(archived)"));
        assert!(graph
            .orderings
            .iter()
            .any(|o| o.from == id("(sent)") && o.to == id("(archived)")));
    }

    #[test]
    fn rhw_finds_disjunctive_landmarks() {
        let domain = r#"
        (define (domain courier)
          (:requirements :strips :typing)
          (:types van)
          (:predicates (ready ?v - van) (delivered))
          (:action prepare :parameters (?v - van) :precondition () :effect (ready ?v))
          (:action deliver :parameters (?v - van) :precondition (ready ?v) :effect (delivered)))
        "#;
        let problem = "(define (problem p) (:domain courier) (:objects v1 v2 - van) (:init) (:goal (delivered)))";
        let task = PlanningTask::new(domain, problem);
        let graph = extract_landmarks(&RelaxedLandmarkExtractor, &task, "lm_rhw").unwrap();
        let disjunctive: Vec<&Landmark> = graph
            .landmarks
            .iter()
            .filter(|l| l.kind == LandmarkKind::Disjunctive)
            .collect();
        assert_eq!(disjunctive.len(), 1);
        assert_eq!(disjunctive[0].facts, vec!["(ready v1)", "(ready v2)"]);
    }

    #[test]
    fn unreachable_goal_has_no_landmarks() {
        let problem = "(define (problem p) (:domain post) (:init) (:goal (and (archived) (not (drafted)))))";
        let goal_unreachable = "(define (problem p) (:domain post) (:init) (:goal (missing)))";
        let task = PlanningTask::new(DOMAIN, problem);
        assert!(!extract_landmarks(&RelaxedLandmarkExtractor, &task, "zg")
            .unwrap()
            .is_empty());
        let task = PlanningTask::new(DOMAIN, goal_unreachable);
        assert!(extract_landmarks(&RelaxedLandmarkExtractor, &task, "zg")
            .unwrap()
            .is_empty());
    }

    /// A chain domain `step-i: (p_i) -> (p_{i+1})` with optional shortcuts.
    fn chain_task(length: usize, shortcuts: &[(usize, usize)]) -> PlanningTask {
        let mut preds = String::new();
        let mut actions = String::new();
        for i in 0..=length {
            preds.push_str(&format!("(p{i}) "));
        }
        for i in 0..length {
            actions.push_str(&format!(
                "(:action step{i} :parameters () :precondition (p{i}) :effect (p{}))\n",
                i + 1
            ));
        }
        for (n, &(from, to)) in shortcuts.iter().enumerate() {
            actions.push_str(&format!(
                "(:action jump{n} :parameters () :precondition (p{from}) :effect (p{to}))\n"
            ));
        }
        PlanningTask::new(
            format!("(define (domain chain) (:predicates {preds}) {actions})"),
            format!("(define (problem c) (:domain chain) (:init (p0)) (:goal (p{length})))"),
        )
    }

    proptest! {
        #[test]
        fn extracted_orderings_are_acyclic(
            length in 1usize..7,
            raw in prop::collection::vec((0usize..7, 0usize..7), 0..5),
        ) {
            let shortcuts: Vec<(usize, usize)> = raw
                .into_iter()
                .map(|(a, b)| (a % (length + 1), b % (length + 1)))
                .collect();
            let task = chain_task(length, &shortcuts);
            for category in LandmarkCategory::ALL {
                let graph = extract_landmarks(&RelaxedLandmarkExtractor, &task, category.as_str()).unwrap();
                prop_assert!(graph.validate().is_ok());
                prop_assert!(graph.landmarks.iter().any(|l| l.is_goal));
            }
        }
    }
}
