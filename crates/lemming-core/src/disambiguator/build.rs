//! Incremental build views (forward from the initial state, backward from
//! the goal).
//!
//! Selections are replayed from scratch on every request. Each round
//! computes the next decision for the live plans, checks the selection
//! against the presented choices, and narrows the live set. When no landmark
//! splits the live plans any more, the first step at which they diverge
//! becomes the decision.

use std::collections::BTreeMap;

use super::{
    display_action, restrict_to_hashes, ChoiceInfo, Context, Direction, FlowStatus,
    PlanDisambiguatorInput, PlanDisambiguatorOutput, PlanGraph, END_OF_PLAN,
};
use crate::error::{LemmingError, Result};
use crate::fingerprint::normalize_action;
use crate::types::Plan;

struct Choice {
    achiever: String,
    plans: Vec<usize>,
}

/// What the user has to decide next.
struct Decision {
    landmark: Option<usize>,
    step: Option<usize>,
    options: Vec<Choice>,
}

impl Decision {
    fn describe(&self) -> String {
        match (self.landmark, self.step) {
            (Some(id), _) => format!("landmark {}", id),
            (None, Some(step)) => format!("step {}", step),
            (None, None) => "no decision".to_string(),
        }
    }

    fn matching(&self, selection: &super::SelectionInfo) -> Result<&Choice> {
        let mismatch = match (self.landmark, selection.landmark_id) {
            (Some(expected), Some(given)) => expected != given,
            (None, Some(_)) => true,
            _ => false,
        } || match (self.step, selection.step) {
            (Some(expected), Some(given)) => expected != given,
            (None, Some(_)) => true,
            _ => false,
        };
        if mismatch {
            return Err(LemmingError::InvalidSelection(format!(
                "selection answers a different decision than {}",
                self.describe()
            )));
        }

        let wanted = normalize_action(&selection.selected_first_achiever);
        self.options
            .iter()
            .find(|c| c.achiever == wanted)
            .ok_or_else(|| {
                LemmingError::InvalidSelection(format!(
                    "`{}` is not a choice at {}",
                    selection.selected_first_achiever,
                    self.describe()
                ))
            })
    }

    fn infos(&self, ctx: &Context<'_>, live: &[usize]) -> Vec<ChoiceInfo> {
        let facts = self.landmark.map(|id| ctx.facts(id)).unwrap_or_default();
        self.options
            .iter()
            .map(|choice| ChoiceInfo {
                landmark_id: self.landmark,
                step: self.step,
                facts: facts.clone(),
                first_achiever: display_action(&choice.achiever),
                plan_hashes: ctx.hashes(&choice.plans),
                is_available_for_choice: choice.plans.iter().any(|p| live.contains(p)),
            })
            .collect()
    }
}

/// Build view in the given direction.
pub fn generate_build_view(
    input: &PlanDisambiguatorInput,
    direction: Direction,
) -> Result<Option<PlanDisambiguatorOutput>> {
    let Some(ctx) = Context::prepare(input)? else {
        return Ok(None);
    };
    let view = direction.view();
    if ctx.plan_count() == 0 {
        if !input.selection_infos.is_empty() {
            return Err(LemmingError::InvalidSelection(
                "there are no plans to select from".into(),
            ));
        }
        return Ok(Some(PlanDisambiguatorOutput::no_plans(view)));
    }

    let all: Vec<usize> = (0..ctx.plan_count()).collect();
    let mut live = all.clone();
    for (round, selection) in input.selection_infos.iter().enumerate() {
        if live.len() <= 1 {
            return Err(LemmingError::InvalidSelection(format!(
                "selection {} arrives after the flow has ended",
                round
            )));
        }
        let decision = next_decision(&ctx, &all, &live, direction);
        let choice = decision.matching(selection)?;
        live.retain(|p| choice.plans.contains(p));
        restrict_to_hashes(&ctx, &mut live, &selection.selected_plan_hashes);
        tracing::debug!(round, decision = %decision.describe(), live = live.len(), "applied selection");
    }

    let status = match live.len() {
        0 => FlowStatus::DeadEnd,
        1 => FlowStatus::Resolved,
        _ => FlowStatus::Choosing,
    };
    let choice_infos = if status == FlowStatus::Choosing {
        next_decision(&ctx, &all, &live, direction).infos(&ctx, &live)
    } else {
        Vec::new()
    };
    let plans: Vec<Plan> = live.iter().map(|&p| ctx.plan(p).clone()).collect();
    let plan_graph = match direction {
        Direction::Forward => PlanGraph::prefix_tree(&plans),
        Direction::Backward => PlanGraph::suffix_tree(&plans),
    };
    tracing::info!(?view, ?status, live = plans.len(), "build view generated");

    Ok(Some(PlanDisambiguatorOutput {
        view,
        status,
        selected_plan_hash: (status == FlowStatus::Resolved)
            .then(|| plans.first().and_then(|p| p.hash.clone()))
            .flatten(),
        plans,
        choice_infos,
        plan_graph,
    }))
}

/// The first landmark in traversal order that splits `live`; choices are
/// drawn from `all` so that excluded options stay visible.
fn next_decision(ctx: &Context<'_>, all: &[usize], live: &[usize], direction: Direction) -> Decision {
    for id in ctx.traversal_order(live, direction) {
        if ctx.is_decision(id, live) {
            return Decision {
                landmark: Some(id),
                step: None,
                options: into_choices(ctx.groups(id, all)),
            };
        }
    }
    step_decision(ctx, live, direction)
}

/// First step (counted from the end when going backward) at which the live
/// plans differ. A plan shorter than the step shows [`END_OF_PLAN`].
fn step_decision(ctx: &Context<'_>, live: &[usize], direction: Direction) -> Decision {
    let longest = live.iter().map(|&p| ctx.plan(p).len()).max().unwrap_or(0);
    for step in 0..=longest {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for &p in live {
            groups
                .entry(action_at(ctx.plan(p), step, direction))
                .or_default()
                .push(p);
        }
        if groups.len() >= 2 {
            return Decision {
                landmark: None,
                step: Some(step),
                options: into_choices(groups),
            };
        }
    }
    Decision {
        landmark: None,
        step: None,
        options: Vec::new(),
    }
}

fn action_at(plan: &Plan, step: usize, direction: Direction) -> String {
    let index = match direction {
        Direction::Forward => Some(step),
        Direction::Backward => plan.actions.len().checked_sub(step + 1),
    };
    index
        .and_then(|i| plan.actions.get(i))
        .map(|a| normalize_action(a))
        .unwrap_or_else(|| END_OF_PLAN.to_string())
}

fn into_choices(groups: BTreeMap<String, Vec<usize>>) -> Vec<Choice> {
    groups
        .into_iter()
        .map(|(achiever, plans)| Choice { achiever, plans })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{input, plan, select};
    use super::super::{SelectionInfo, ViewKind, NOT_ACHIEVED};
    use super::*;
    use crate::landmarks::LandmarkGraph;
    use pretty_assertions::assert_eq;

    fn achievers(output: &PlanDisambiguatorOutput) -> Vec<(String, bool)> {
        output
            .choice_infos
            .iter()
            .map(|c| (c.first_achiever.clone(), c.is_available_for_choice))
            .collect()
    }

    fn forward(selections: Vec<SelectionInfo>) -> Result<PlanDisambiguatorOutput> {
        let output = generate_build_view(&input(selections), Direction::Forward)?;
        super::super::handle_flow_output(output)
    }

    #[test]
    fn no_plans_is_a_terminal_state() {
        let mut input = input(Vec::new());
        input.plans.clear();
        let output = generate_build_view(&input, Direction::Forward).unwrap().unwrap();
        assert_eq!(output.status, FlowStatus::NoPlans);
        assert_eq!(output.view, ViewKind::BuildForward);
        assert!(output.plans.is_empty() && output.choice_infos.is_empty());
    }

    #[test]
    fn forward_starts_at_the_earliest_landmark() {
        let output = forward(Vec::new()).unwrap();
        assert_eq!(output.status, FlowStatus::Choosing);
        assert_eq!(output.choice_infos[0].landmark_id, Some(0));
        assert_eq!(
            achievers(&output),
            vec![("(draft)".to_string(), true), ("(note)".to_string(), true)]
        );
        assert_eq!(output.choice_infos[0].facts, vec!["(drafted)".to_string()]);
        assert_eq!(output.plan_graph.nodes[0].plan_hashes.len(), 4);
    }

    #[test]
    fn backward_starts_next_to_the_goal() {
        let output = generate_build_view(&input(Vec::new()), Direction::Backward)
            .unwrap()
            .unwrap();
        assert_eq!(output.view, ViewKind::BuildBackward);
        assert_eq!(output.choice_infos[0].landmark_id, Some(1));
        assert_eq!(
            achievers(&output),
            vec![("(gmail)".to_string(), true), ("(slack)".to_string(), true)]
        );
        // suffix tree: every plan ends with archive
        assert_eq!(output.plan_graph.edges[0].action, "(archive)");
        assert_eq!(output.plan_graph.edges[0].plan_hashes.len(), 4);
    }

    #[test]
    fn selections_narrow_to_one_plan() {
        let output = forward(vec![select(Some(0), "(draft)"), select(None, "slack")]).unwrap();
        assert_eq!(output.status, FlowStatus::Resolved);
        assert_eq!(output.plans.len(), 1);
        assert_eq!(output.plans[0].actions[1], "(slack)");
        assert_eq!(output.selected_plan_hash, output.plans[0].hash);
        assert!(output.choice_infos.is_empty());
        assert_eq!(output.plan_graph.nodes.len(), 4);
    }

    #[test]
    fn excluded_choices_stay_visible_and_lead_to_a_dead_end() {
        let mut base = input(Vec::new());
        base.plans = vec![
            plan(&["(draft)", "(slack)", "(archive)"]),
            plan(&["(draft)", "(gmail)", "(archive)"]),
            plan(&["(note)", "(sms)", "(archive)"]),
        ];
        base.selection_infos = vec![select(Some(0), "(draft)")];
        let output = generate_build_view(&base, Direction::Forward).unwrap().unwrap();
        assert_eq!(
            achievers(&output),
            vec![
                ("(gmail)".to_string(), true),
                ("(slack)".to_string(), true),
                ("(sms)".to_string(), false),
            ]
        );

        base.selection_infos.push(select(Some(1), "(sms)"));
        let output = generate_build_view(&base, Direction::Forward).unwrap().unwrap();
        assert_eq!(output.status, FlowStatus::DeadEnd);
        assert!(output.plans.is_empty());
        assert_eq!(output.selected_plan_hash, None);

        base.selection_infos.push(select(None, "(gmail)"));
        assert!(matches!(
            generate_build_view(&base, Direction::Forward),
            Err(LemmingError::InvalidSelection(_))
        ));
    }

    #[test]
    fn selection_must_be_a_presented_choice() {
        assert!(matches!(
            forward(vec![select(None, "(archive)")]),
            Err(LemmingError::InvalidSelection(_))
        ));
        assert!(matches!(
            forward(vec![select(Some(1), "(slack)")]),
            Err(LemmingError::InvalidSelection(_))
        ));
    }

    #[test]
    fn falls_back_to_the_first_diverging_step() {
        let mut base = input(Vec::new());
        base.landmarks = LandmarkGraph::default();
        base.plans = vec![plan(&["(draft)"]), plan(&["(draft)", "(note)"])];
        let output = generate_build_view(&base, Direction::Forward).unwrap().unwrap();
        assert_eq!(output.choice_infos[0].landmark_id, None);
        assert_eq!(output.choice_infos[0].step, Some(1));
        assert_eq!(
            achievers(&output),
            vec![(END_OF_PLAN.to_string(), true), ("(note)".to_string(), true)]
        );

        base.selection_infos = vec![SelectionInfo {
            step: Some(1),
            selected_first_achiever: END_OF_PLAN.to_string(),
            ..Default::default()
        }];
        let output = generate_build_view(&base, Direction::Forward).unwrap().unwrap();
        assert_eq!(output.status, FlowStatus::Resolved);
        assert_eq!(output.plans[0].actions, vec!["(draft)".to_string()]);
    }

    #[test]
    fn backward_steps_count_from_the_end() {
        let mut base = input(Vec::new());
        base.landmarks = LandmarkGraph::default();
        base.plans = vec![
            plan(&["(draft)", "(slack)", "(archive)"]),
            plan(&["(draft)", "(gmail)", "(archive)"]),
        ];
        let output = generate_build_view(&base, Direction::Backward).unwrap().unwrap();
        assert_eq!(output.choice_infos[0].step, Some(1));
        assert_eq!(
            achievers(&output),
            vec![("(gmail)".to_string(), true), ("(slack)".to_string(), true)]
        );
    }

    #[test]
    fn hash_filter_narrows_further() {
        let target = input(Vec::new()).plans[3].hash.clone().unwrap();
        let output = forward(vec![SelectionInfo {
            landmark_id: Some(0),
            selected_first_achiever: "(note)".into(),
            selected_plan_hashes: vec![target.clone()],
            ..Default::default()
        }])
        .unwrap();
        assert_eq!(output.status, FlowStatus::Resolved);
        assert_eq!(output.selected_plan_hash, Some(target));
    }

    #[test]
    fn plans_missing_a_listed_achiever_stay_reachable() {
        let mut base = input(Vec::new());
        base.plans = vec![
            plan(&["(draft)", "(slack)", "(archive)"]),
            plan(&["(draft)", "(gmail)", "(archive)"]),
            plan(&["(draft)", "(sms)", "(archive)"]),
        ];
        let sent = &mut base.landmarks.landmarks[1];
        sent.first_achievers = vec!["(slack)".into(), "(gmail)".into()];
        sent.possible_achievers = sent.first_achievers.clone();

        let output = generate_build_view(&base, Direction::Forward).unwrap().unwrap();
        assert_eq!(output.choice_infos[0].landmark_id, Some(1));
        assert_eq!(
            achievers(&output),
            vec![
                (NOT_ACHIEVED.to_string(), true),
                ("(gmail)".to_string(), true),
                ("(slack)".to_string(), true),
            ]
        );
        let covered: usize = output.choice_infos.iter().map(|c| c.plan_hashes.len()).sum();
        assert_eq!(covered, 3);

        base.selection_infos = vec![select(Some(1), NOT_ACHIEVED)];
        let output = generate_build_view(&base, Direction::Forward).unwrap().unwrap();
        assert_eq!(output.status, FlowStatus::Resolved);
        assert_eq!(output.plans[0].actions[1], "(sms)");
    }
}
