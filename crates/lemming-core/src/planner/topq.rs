//! In-process top-quality search over a grounded task.
//!
//! Uniform-cost best-first enumeration of cycle-free paths. Every search node
//! is a distinct path, so goal nodes come off the queue in plan-cost order and
//! the first `max_plans` of them are the cheapest cycle-free plans. States are
//! not merged across paths: a prefix that dead-ends in a cycle must not use up
//! another prefix's turn at the same state. `max_expansions` is the only
//! bound on the frontier.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{PlanSearch, TopQConfig};
use crate::error::Result;
use crate::pddl::{self, GroundTask, State};
use crate::types::{Plan, PlanningTask};

const COST_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct GroundedTopQ {
    config: TopQConfig,
}

struct Node {
    state: State,
    parent: Option<usize>,
    action: Option<usize>,
    g: f64,
}

struct Entry {
    g: f64,
    seq: usize,
    node: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // min-heap on cost, FIFO among equal costs
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .g
            .total_cmp(&self.g)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl GroundedTopQ {
    pub fn new(config: TopQConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TopQConfig {
        &self.config
    }

    /// Enumerate plans for an already grounded task, cheapest first.
    pub fn search_ground(&self, task: &GroundTask) -> Vec<Plan> {
        let quality = self.config.quality();
        let max_plans = self.config.max_plans;
        if max_plans == 0 {
            return Vec::new();
        }

        let mut nodes = vec![Node {
            state: task.initial_state(),
            parent: None,
            action: None,
            g: 0.0,
        }];
        let mut heap = BinaryHeap::new();
        heap.push(Entry {
            g: 0.0,
            seq: 0,
            node: 0,
        });
        let mut seq = 1;
        let mut plans = Vec::new();
        let mut best: Option<f64> = None;
        let mut expansions = 0usize;

        while let Some(entry) = heap.pop() {
            if let Some(best) = best {
                if entry.g > best * quality + COST_EPSILON {
                    break;
                }
            }
            if task.is_goal(&nodes[entry.node].state) {
                plans.push(Plan::new(extract_path(task, &nodes, entry.node), entry.g));
                best.get_or_insert(entry.g);
                if plans.len() >= max_plans {
                    break;
                }
                continue;
            }

            if expansions >= self.config.max_expansions {
                tracing::warn!(
                    expansions,
                    found = plans.len(),
                    "top-q search hit the expansion limit"
                );
                break;
            }
            expansions += 1;

            for (index, action) in task.actions.iter().enumerate() {
                let parent = &nodes[entry.node];
                if !action.applicable(&parent.state) {
                    continue;
                }
                let next = action.apply(&parent.state);
                if on_path(&nodes, entry.node, &next) {
                    continue;
                }
                let g = parent.g + action.cost;
                nodes.push(Node {
                    state: next,
                    parent: Some(entry.node),
                    action: Some(index),
                    g,
                });
                heap.push(Entry {
                    g,
                    seq,
                    node: nodes.len() - 1,
                });
                seq += 1;
            }
        }

        tracing::debug!(expansions, plans = plans.len(), ?best, "top-q search finished");
        plans
    }
}

fn on_path(nodes: &[Node], mut at: usize, state: &State) -> bool {
    loop {
        if &nodes[at].state == state {
            return true;
        }
        match nodes[at].parent {
            Some(parent) => at = parent,
            None => return false,
        }
    }
}

fn extract_path(task: &GroundTask, nodes: &[Node], mut at: usize) -> Vec<String> {
    let mut actions = Vec::new();
    while let (Some(action), Some(parent)) = (nodes[at].action, nodes[at].parent) {
        actions.push(task.actions[action].name.clone());
        at = parent;
    }
    actions.reverse();
    actions
}

impl PlanSearch for GroundedTopQ {
    fn name(&self) -> &str {
        "grounded-topq"
    }

    fn search_topq(&self, task: &PlanningTask) -> Result<Vec<Plan>> {
        let ground = pddl::ground_task(task)?;
        tracing::info!(
            actions = ground.actions.len(),
            facts = ground.facts.len(),
            "searching top-q plans"
        );
        Ok(self.search_ground(&ground))
    }
}
