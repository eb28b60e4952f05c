//! Plan fingerprinting for deduplication and cross-request identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::types::Plan;

/// Content-addressed fingerprint of a plan's action sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanFingerprint {
    /// SHA-256 of the normalised action sequence, hex encoded.
    pub hash: String,
}

impl PlanFingerprint {
    pub fn from_plan(plan: &Plan) -> Self {
        Self::compute(&plan.actions)
    }

    /// Hash an ordered action sequence.
    ///
    /// Each action is normalised with [`normalize_action`] and written
    /// length-prefixed, so `["a b", "c"]` and `["a", "b c"]` never collide.
    pub fn compute<S: AsRef<str>>(actions: &[S]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((actions.len() as u64).to_le_bytes());
        for action in actions {
            let normalized = normalize_action(action.as_ref());
            hasher.update((normalized.len() as u64).to_le_bytes());
            hasher.update(normalized.as_bytes());
        }
        Self {
            hash: hex::encode(hasher.finalize()),
        }
    }

    /// First 16 hex chars, for log lines.
    pub fn short(&self) -> &str {
        &self.hash[..16.min(self.hash.len())]
    }
}

/// Canonical text of one grounded action: `"(Pick-Up  A)"` → `"pick-up a"`.
pub fn normalize_action(action: &str) -> String {
    let trimmed = action.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    inner
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Attach hashes to every plan and drop repeated action sequences,
/// keeping first occurrences in order.
pub fn hash_plans(plans: Vec<Plan>) -> Vec<Plan> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(plans.len());
    for plan in plans {
        let plan = plan.with_hash();
        if let Some(hash) = &plan.hash {
            if !seen.insert(hash.clone()) {
                tracing::debug!(hash = %hash, "dropping duplicate plan");
                continue;
            }
        }
        out.push(plan);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plan(actions: &[&str]) -> Plan {
        Plan::new(actions.iter().map(|s| s.to_string()).collect(), 0.0)
    }

    #[test]
    fn fingerprint_deterministic() {
        let fp1 = PlanFingerprint::from_plan(&plan(&["(draft m1)", "(slack m1)"]));
        let fp2 = PlanFingerprint::from_plan(&plan(&["(draft m1)", "(slack m1)"]));
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn fingerprint_ignores_formatting() {
        let fp1 = PlanFingerprint::compute(&["(Draft  M1)"]);
        let fp2 = PlanFingerprint::compute(&["draft m1"]);
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn fingerprint_depends_on_order() {
        let fp1 = PlanFingerprint::compute(&["(slack m1)", "(gmail m1)"]);
        let fp2 = PlanFingerprint::compute(&["(gmail m1)", "(slack m1)"]);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn fingerprint_respects_action_boundaries() {
        let fp1 = PlanFingerprint::compute(&["a b", "c"]);
        let fp2 = PlanFingerprint::compute(&["a", "b c"]);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn fingerprint_short() {
        let fp = PlanFingerprint::compute(&["(draft m1)"]);
        assert_eq!(fp.short().len(), 16);
    }

    #[test]
    fn hash_plans_dedupes_in_order() {
        let plans = vec![
            plan(&["(a)", "(b)"]),
            plan(&["(b)", "(a)"]),
            plan(&["(A)", "(B)"]),
        ];
        let hashed = hash_plans(plans);
        assert_eq!(hashed.len(), 2);
        assert_eq!(hashed[0].actions, vec!["(a)", "(b)"]);
        assert!(hashed.iter().all(|p| p.hash.is_some()));
    }

    fn action() -> impl Strategy<Value = String> {
        ("[a-z]{1,6}", prop::collection::vec("[a-z0-9]{1,4}", 0..3))
            .prop_map(|(name, args)| format!("({} {})", name, args.join(" ")))
    }

    proptest! {
        #[test]
        fn equal_sequences_equal_hashes(actions in prop::collection::vec(action(), 0..8)) {
            let copy = actions.clone();
            prop_assert_eq!(
                PlanFingerprint::compute(&actions),
                PlanFingerprint::compute(&copy)
            );
        }

        #[test]
        fn distinct_sequences_distinct_hashes(
            plans in prop::collection::hash_set(prop::collection::vec(action(), 0..6), 1..64)
        ) {
            let normalized: HashSet<Vec<String>> = plans
                .iter()
                .map(|p| p.iter().map(|a| normalize_action(a)).collect())
                .collect();
            let hashes: HashSet<String> = plans
                .iter()
                .map(|p| PlanFingerprint::compute(p).hash)
                .collect();
            prop_assert_eq!(hashes.len(), normalized.len());
        }
    }
}
