//! Merged plan trees for the build views.
//!
//! The forward view merges common prefixes, the backward view common
//! suffixes. Every node and edge carries the hashes of the plans through it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fingerprint::normalize_action;
use crate::types::Plan;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanGraphNode {
    pub id: usize,
    /// Steps from the root (plan start forward, plan end backward).
    pub depth: usize,
    pub plan_hashes: Vec<String>,
    /// Some plan starts (backward) or ends (forward) here.
    pub is_terminal: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanGraphEdge {
    pub from: usize,
    pub to: usize,
    pub action: String,
    pub plan_hashes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanGraph {
    pub nodes: Vec<PlanGraphNode>,
    pub edges: Vec<PlanGraphEdge>,
}

impl PlanGraph {
    pub fn prefix_tree<'a>(plans: impl IntoIterator<Item = &'a Plan>) -> Self {
        Self::build(plans, false)
    }

    pub fn suffix_tree<'a>(plans: impl IntoIterator<Item = &'a Plan>) -> Self {
        Self::build(plans, true)
    }

    fn build<'a>(plans: impl IntoIterator<Item = &'a Plan>, reversed: bool) -> Self {
        let mut graph = PlanGraph::default();
        let mut children: HashMap<(usize, String), usize> = HashMap::new();
        let mut plans = plans.into_iter().peekable();
        if plans.peek().is_none() {
            return graph;
        }
        graph.nodes.push(PlanGraphNode::default());

        for plan in plans {
            let hash = plan.hash.clone().unwrap_or_default();
            let mut at = 0;
            graph.nodes[0].plan_hashes.push(hash.clone());
            let steps: Box<dyn Iterator<Item = &String>> = if reversed {
                Box::new(plan.actions.iter().rev())
            } else {
                Box::new(plan.actions.iter())
            };
            for action in steps {
                let key = (at, normalize_action(action));
                let next = match children.get(&key) {
                    Some(&child) => {
                        if let Some(edge) = graph.edges.iter_mut().find(|e| e.from == at && e.to == child) {
                            edge.plan_hashes.push(hash.clone());
                        }
                        child
                    }
                    None => {
                        let child = graph.nodes.len();
                        graph.nodes.push(PlanGraphNode {
                            id: child,
                            depth: graph.nodes[at].depth + 1,
                            plan_hashes: Vec::new(),
                            is_terminal: false,
                        });
                        graph.edges.push(PlanGraphEdge {
                            from: at,
                            to: child,
                            action: action.clone(),
                            plan_hashes: vec![hash.clone()],
                        });
                        children.insert(key, child);
                        child
                    }
                };
                graph.nodes[next].plan_hashes.push(hash.clone());
                at = next;
            }
            graph.nodes[at].is_terminal = true;
        }
        graph
    }
}
