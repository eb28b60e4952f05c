//! Landmark graph value objects and structural validation.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::{LemmingError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    /// A single fact.
    #[default]
    Fact,
    /// At least one of `facts` must hold at some point.
    Disjunctive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingKind {
    /// `from` must hold at some point before `to` first holds.
    #[default]
    Natural,
    /// `from` must hold immediately before `to` is first achieved.
    GreedyNecessary,
}

/// A fact (or disjunction of facts) every plan must make true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: usize,
    #[serde(default)]
    pub kind: LandmarkKind,
    pub facts: Vec<String>,
    /// Grounded actions that can make the landmark true for the first time.
    #[serde(default)]
    pub first_achievers: Vec<String>,
    /// Every grounded action that adds one of `facts`.
    #[serde(default)]
    pub possible_achievers: Vec<String>,
    #[serde(default)]
    pub is_initial: bool,
    #[serde(default)]
    pub is_goal: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkOrdering {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub kind: OrderingKind,
}

/// Landmarks with their ordering edges. Orderings form a partial order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkGraph {
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub orderings: Vec<LandmarkOrdering>,
}

impl LandmarkGraph {
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.id == id)
    }

    /// Check ids are unique, orderings reference known landmarks, and the
    /// orderings are acyclic.
    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Landmark ids in an order compatible with every ordering edge.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let mut graph: DiGraph<usize, OrderingKind> = DiGraph::new();
        let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();
        for landmark in &self.landmarks {
            if nodes.insert(landmark.id, graph.add_node(landmark.id)).is_some() {
                return Err(LemmingError::Unprocessable(format!(
                    "duplicate landmark id {}",
                    landmark.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for ordering in &self.orderings {
            let (Some(&from), Some(&to)) = (nodes.get(&ordering.from), nodes.get(&ordering.to))
            else {
                return Err(LemmingError::Unprocessable(format!(
                    "ordering {} -> {} references an unknown landmark",
                    ordering.from, ordering.to
                )));
            };
            if seen.insert((ordering.from, ordering.to)) {
                graph.add_edge(from, to, ordering.kind);
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(|n| graph[n]).collect())
            .map_err(|cycle| LemmingError::LandmarkCycle(graph[cycle.node_id()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark(id: usize, fact: &str) -> Landmark {
        Landmark {
            id,
            kind: LandmarkKind::Fact,
            facts: vec![fact.to_string()],
            first_achievers: Vec::new(),
            possible_achievers: Vec::new(),
            is_initial: false,
            is_goal: false,
        }
    }

    fn ordering(from: usize, to: usize) -> LandmarkOrdering {
        LandmarkOrdering {
            from,
            to,
            kind: OrderingKind::Natural,
        }
    }

    #[test]
    fn chain_is_valid_and_ordered() {
        let graph = LandmarkGraph {
            landmarks: vec![landmark(2, "(c)"), landmark(0, "(a)"), landmark(1, "(b)")],
            orderings: vec![ordering(0, 1), ordering(1, 2)],
        };
        assert_eq!(graph.topological_order().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn cycle_is_rejected() {
        let graph = LandmarkGraph {
            landmarks: vec![landmark(0, "(a)"), landmark(1, "(b)")],
            orderings: vec![ordering(0, 1), ordering(1, 0)],
        };
        assert!(matches!(graph.validate(), Err(LemmingError::LandmarkCycle(_))));
    }

    #[test]
    fn unknown_reference_is_unprocessable() {
        let graph = LandmarkGraph {
            landmarks: vec![landmark(0, "(a)")],
            orderings: vec![ordering(0, 7)],
        };
        assert!(matches!(graph.validate(), Err(LemmingError::Unprocessable(_))));
    }

    #[test]
    fn duplicate_ids_are_unprocessable() {
        let graph = LandmarkGraph {
            landmarks: vec![landmark(0, "(a)"), landmark(0, "(b)")],
            orderings: Vec::new(),
        };
        assert!(matches!(graph.validate(), Err(LemmingError::Unprocessable(_))));
    }

    #[test]
    fn wire_format_uses_snake_case_kinds() {
        let json = serde_json::json!({
            "landmarks": [{"id": 0, "kind": "disjunctive", "facts": ["(a)", "(b)"]}],
            "orderings": []
        });
        let graph: LandmarkGraph = serde_json::from_value(json).unwrap();
        assert_eq!(graph.landmarks[0].kind, LandmarkKind::Disjunctive);
        let back = serde_json::to_value(&graph).unwrap();
        assert_eq!(back["landmarks"][0]["kind"], "disjunctive");
    }
}
