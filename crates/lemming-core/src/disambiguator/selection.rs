//! Full-set selection view.

use super::{
    display_action, restrict_to_hashes, ChoiceInfo, Context, Direction, FlowStatus,
    PlanDisambiguatorInput, PlanDisambiguatorOutput, PlanGraph, ViewKind,
};
use crate::error::{LemmingError, Result};
use crate::fingerprint::normalize_action;

/// Every decision landmark of the whole plan set, with prior selections
/// applied as filters.
///
/// Live plans come back ordered by the achievers they use along the
/// landmark order, then by hash, so identical input gives identical output.
pub fn generate_select_view(
    input: &PlanDisambiguatorInput,
) -> Result<Option<PlanDisambiguatorOutput>> {
    let Some(ctx) = Context::prepare(input)? else {
        return Ok(None);
    };
    if ctx.plan_count() == 0 {
        if !input.selection_infos.is_empty() {
            return Err(LemmingError::InvalidSelection(
                "there are no plans to select from".into(),
            ));
        }
        return Ok(Some(PlanDisambiguatorOutput::no_plans(ViewKind::Selection)));
    }

    let all: Vec<usize> = (0..ctx.plan_count()).collect();
    let decisions: Vec<usize> = ctx
        .traversal_order(&all, Direction::Forward)
        .into_iter()
        .filter(|&id| ctx.is_decision(id, &all))
        .collect();

    let mut live = all.clone();
    for selection in &input.selection_infos {
        let wanted = normalize_action(&selection.selected_first_achiever);
        let candidates: Vec<usize> = match selection.landmark_id {
            Some(id) if decisions.contains(&id) => vec![id],
            Some(id) => {
                return Err(LemmingError::InvalidSelection(format!(
                    "landmark {} is not a decision point",
                    id
                )))
            }
            None => decisions.clone(),
        };
        let group = candidates.iter().find_map(|&id| {
            ctx.groups(id, &live)
                .remove(&wanted)
                .filter(|plans| !plans.is_empty())
        });
        let Some(group) = group else {
            return Err(LemmingError::InvalidSelection(format!(
                "`{}` is not an available choice",
                selection.selected_first_achiever
            )));
        };
        live = group;
        restrict_to_hashes(&ctx, &mut live, &selection.selected_plan_hashes);
    }

    let choice_infos: Vec<ChoiceInfo> = decisions
        .iter()
        .flat_map(|&id| {
            let facts = ctx.facts(id);
            let live = &live;
            let ctx = &ctx;
            ctx.groups(id, &all).into_iter().map(move |(achiever, plans)| ChoiceInfo {
                landmark_id: Some(id),
                step: None,
                facts: facts.clone(),
                first_achiever: display_action(&achiever),
                plan_hashes: ctx.hashes(&plans),
                is_available_for_choice: plans.iter().any(|p| live.contains(p)),
            })
        })
        .collect();

    let signature = |plan: usize| -> Vec<String> {
        decisions
            .iter()
            .map(|&id| ctx.achiever(id, plan).to_string())
            .collect()
    };
    live.sort_by(|&a, &b| {
        signature(a)
            .cmp(&signature(b))
            .then_with(|| ctx.hash(a).cmp(ctx.hash(b)))
    });

    let status = match live.len() {
        0 => FlowStatus::DeadEnd,
        1 => FlowStatus::Resolved,
        _ => FlowStatus::Choosing,
    };
    let plans: Vec<_> = live.iter().map(|&p| ctx.plan(p).clone()).collect();
    tracing::info!(
        decisions = decisions.len(),
        live = plans.len(),
        ?status,
        "selection view generated"
    );

    Ok(Some(PlanDisambiguatorOutput {
        view: ViewKind::Selection,
        status,
        selected_plan_hash: (status == FlowStatus::Resolved)
            .then(|| plans.first().and_then(|p| p.hash.clone()))
            .flatten(),
        plan_graph: PlanGraph::prefix_tree(&plans),
        plans,
        choice_infos,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{input, plan, select};
    use super::super::NOT_ACHIEVED;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_every_decision_landmark() {
        let output = generate_select_view(&input(Vec::new())).unwrap().unwrap();
        assert_eq!(output.view, ViewKind::Selection);
        assert_eq!(output.status, FlowStatus::Choosing);
        let listed: Vec<(Option<usize>, &str)> = output
            .choice_infos
            .iter()
            .map(|c| (c.landmark_id, c.first_achiever.as_str()))
            .collect();
        assert_eq!(
            listed,
            vec![
                (Some(0), "(draft)"),
                (Some(0), "(note)"),
                (Some(1), "(gmail)"),
                (Some(1), "(slack)"),
            ]
        );
        assert!(output.choice_infos.iter().all(|c| c.is_available_for_choice));
        assert_eq!(output.choice_infos[0].plan_hashes.len(), 2);
    }

    #[test]
    fn plans_are_ordered_by_choices_then_hash() {
        let output = generate_select_view(&input(Vec::new())).unwrap().unwrap();
        let order: Vec<Vec<String>> = output.plans.iter().map(|p| p.actions.clone()).collect();
        assert_eq!(order[0][..2], ["(draft)".to_string(), "(gmail)".to_string()]);
        assert_eq!(order[3][..2], ["(note)".to_string(), "(slack)".to_string()]);
    }

    #[test]
    fn selections_filter_and_flag_availability() {
        let output = generate_select_view(&input(vec![select(None, "(note)")]))
            .unwrap()
            .unwrap();
        assert_eq!(output.plans.len(), 2);
        let available: Vec<bool> = output
            .choice_infos
            .iter()
            .map(|c| c.is_available_for_choice)
            .collect();
        assert_eq!(available, vec![false, true, true, true]);

        let output = generate_select_view(&input(vec![
            select(None, "(note)"),
            select(Some(1), "(slack)"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(output.status, FlowStatus::Resolved);
        assert_eq!(
            output.plans[0].actions,
            vec!["(note)".to_string(), "(slack)".to_string(), "(archive)".to_string()]
        );
        assert_eq!(output.selected_plan_hash, output.plans[0].hash);
    }

    #[test]
    fn unavailable_or_unknown_selection_is_rejected() {
        let mut narrowed = input(vec![select(None, "(note)"), select(None, "(draft)")]);
        assert!(matches!(
            generate_select_view(&narrowed),
            Err(LemmingError::InvalidSelection(_))
        ));
        narrowed.selection_infos = vec![select(Some(2), "(archive)")];
        assert!(matches!(
            generate_select_view(&narrowed),
            Err(LemmingError::InvalidSelection(_))
        ));
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let request = input(vec![select(None, "(slack)")]);
        let first = generate_select_view(&request).unwrap();
        let second = generate_select_view(&request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn single_plan_is_resolved_without_choices() {
        let mut request = input(Vec::new());
        request.plans = vec![plan(&["(draft)", "(slack)", "(archive)"])];
        let output = generate_select_view(&request).unwrap().unwrap();
        assert_eq!(output.status, FlowStatus::Resolved);
        assert!(output.choice_infos.is_empty());
    }

    #[test]
    fn plans_without_an_achiever_get_their_own_option() {
        let mut request = input(Vec::new());
        request.plans = vec![
            plan(&["(draft)", "(slack)", "(archive)"]),
            plan(&["(draft)", "(sms)", "(archive)"]),
        ];
        let sent = &mut request.landmarks.landmarks[1];
        sent.first_achievers = vec!["(slack)".into()];
        sent.possible_achievers = vec!["(slack)".into()];

        let output = generate_select_view(&request).unwrap().unwrap();
        let listed: Vec<&str> = output
            .choice_infos
            .iter()
            .map(|c| c.first_achiever.as_str())
            .collect();
        assert_eq!(listed, vec![NOT_ACHIEVED, "(slack)"]);

        request.selection_infos = vec![select(Some(1), NOT_ACHIEVED)];
        let output = generate_select_view(&request).unwrap().unwrap();
        assert_eq!(output.status, FlowStatus::Resolved);
        assert_eq!(output.plans[0].actions[1], "(sms)");
    }

    #[test]
    fn empty_plan_set_is_a_view_not_an_error() {
        let mut request = input(Vec::new());
        request.plans.clear();
        let output = generate_select_view(&request).unwrap().unwrap();
        assert_eq!(output.status, FlowStatus::NoPlans);
    }
}
