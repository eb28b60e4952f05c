//! Temporal goal compilation.
//!
//! Rewrites a domain/problem pair so that every plan of the result satisfies
//! the given DECLARE formulas. Both tools only add fluents, preconditions
//! and (conditional) effects to existing actions, so plans of the compiled
//! task use the original action names.
//!
//! ```text
//!  formulas ──► bind activities ──► Lf2f (one DFA per formula)
//!                                └─► P4p  (monitoring fluents)
//!                                           │
//!                Domain/Problem ◄── Compilation (fluents, pre/eff, init, goal)
//! ```

pub mod automaton;
pub mod pattern;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LemmingError, Result};
use crate::ltl::DeclareFormula;
use crate::pddl::model::{and, conjuncts};
use crate::pddl::{self, Action, Domain, Predicate, Problem, SExpr};
use crate::types::{LTLFormula, PlanningTask};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCompiler {
    /// Automaton product: one DFA per formula tracked by state fluents.
    Lf2f,
    /// DECLARE patterns compiled directly into monitoring fluents.
    P4p,
}

impl ToolCompiler {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf2f => "lf2f",
            Self::P4p => "p4p",
        }
    }
}

impl fmt::Display for ToolCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCompiler {
    type Err = LemmingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lf2f" => Ok(Self::Lf2f),
            "p4p" => Ok(Self::P4p),
            _ => Err(LemmingError::InvalidTool(s.to_string())),
        }
    }
}

// ─── Activity binding ─────────────────────────────────────────

/// What counts as an occurrence of an activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The named action schema executes.
    Action(String),
    /// An action whose effect adds the named predicate executes.
    Adds(String),
}

impl Event {
    pub fn fires(&self, action: &Action) -> bool {
        match self {
            Event::Action(name) => action.name == *name,
            Event::Adds(pred) => adds_predicate(action, pred),
        }
    }
}

fn adds_predicate(action: &Action, pred: &str) -> bool {
    action
        .effect
        .as_ref()
        .map(conjuncts)
        .unwrap_or_default()
        .iter()
        .any(|e| e.head() == Some(pred))
}

/// Which of a formula's activities an action schema is an occurrence of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Label {
    pub a: bool,
    pub b: bool,
}

/// A formula with its activities resolved against a domain.
#[derive(Clone, Debug)]
pub struct Binding {
    pub formula: DeclareFormula,
    pub a: Event,
    pub b: Event,
}

impl Binding {
    pub fn label(&self, action: &Action) -> Label {
        Label {
            a: self.a.fires(action),
            b: self.formula.template.arity() == 2 && self.b.fires(action),
        }
    }
}

/// Resolve an activity to an action schema, else to a predicate some action adds.
pub fn resolve_activity(domain: &Domain, activity: &str, formula: &DeclareFormula) -> Result<Event> {
    if let Some(action) = domain.actions.iter().find(|a| pddl::same_name(&a.name, activity)) {
        return Ok(Event::Action(action.name.clone()));
    }
    if let Some(pred) = domain
        .predicates
        .iter()
        .find(|p| pddl::same_name(&p.name, activity))
    {
        if domain.actions.iter().any(|a| adds_predicate(a, &pred.name)) {
            return Ok(Event::Adds(pred.name.clone()));
        }
    }
    Err(LemmingError::UnresolvedProposition {
        activity: activity.to_string(),
        formula: formula.to_string(),
    })
}

pub fn bind(domain: &Domain, formula: &DeclareFormula) -> Result<Binding> {
    Ok(Binding {
        formula: formula.clone(),
        a: resolve_activity(domain, formula.a(), formula)?,
        b: resolve_activity(domain, formula.b(), formula)?,
    })
}

// ─── Compilation result ───────────────────────────────────────

/// Additions a tool makes to the task, applied by [`Compilation::apply`].
#[derive(Debug)]
pub struct Compilation {
    prefix: String,
    predicates: Vec<String>,
    /// Extra preconditions and effects, indexed like `domain.actions`.
    pre: Vec<Vec<SExpr>>,
    eff: Vec<Vec<SExpr>>,
    init: Vec<SExpr>,
    goal: Vec<SExpr>,
}

impl Compilation {
    fn new(domain: &Domain) -> Self {
        Self {
            prefix: fluent_prefix(domain),
            predicates: Vec::new(),
            pre: vec![Vec::new(); domain.actions.len()],
            eff: vec![Vec::new(); domain.actions.len()],
            init: Vec::new(),
            goal: Vec::new(),
        }
    }

    /// Declare a 0-ary fluent `(<prefix>-<suffix>)` and return it.
    fn fluent(&mut self, suffix: &str) -> SExpr {
        let name = format!("{}-{}", self.prefix, suffix);
        if !self.predicates.contains(&name) {
            self.predicates.push(name.clone());
        }
        SExpr::call(&name, &[])
    }

    fn apply(self, domain: &Domain, problem: &Problem) -> (Domain, Problem) {
        let mut domain = domain.clone();
        let mut problem = problem.clone();
        let mut negative = false;
        let mut conditional = false;

        for name in self.predicates {
            domain.predicates.push(Predicate {
                name,
                params: Vec::new(),
            });
        }
        for ((action, pre), eff) in domain.actions.iter_mut().zip(self.pre).zip(self.eff) {
            if !pre.is_empty() {
                negative |= pre.iter().any(|p| p.head() == Some("not"));
                let mut parts = action.precondition.as_ref().map(conjuncts).unwrap_or_default();
                parts.extend(pre);
                action.precondition = Some(and(parts));
            }
            if !eff.is_empty() {
                conditional |= eff.iter().any(|e| e.head() == Some("when"));
                negative |= eff.iter().any(has_negative_condition);
                let mut parts = action.effect.as_ref().map(conjuncts).unwrap_or_default();
                parts.extend(eff);
                action.effect = Some(and(parts));
            }
        }
        negative |= self.goal.iter().any(|g| g.head() == Some("not"));

        if negative {
            domain.require(":negative-preconditions");
        }
        if conditional {
            domain.require(":conditional-effects");
        }
        problem.init.extend(self.init);
        let mut goal = problem.goal_conjuncts();
        goal.extend(self.goal);
        problem.goal = and(goal);
        (domain, problem)
    }
}

fn has_negative_condition(effect: &SExpr) -> bool {
    match (effect.head(), effect.as_list()) {
        (Some("when"), Some(items)) => items
            .get(1)
            .map(|cond| conjuncts(cond).iter().any(|c| c.head() == Some("not")))
            .unwrap_or(false),
        _ => false,
    }
}

/// `ltl`, or `ltl<N>` if the domain already uses names starting with `ltl-`.
fn fluent_prefix(domain: &Domain) -> String {
    let taken = |prefix: &str| {
        let dash = format!("{}-", prefix);
        domain.predicates.iter().any(|p| p.name.starts_with(&dash))
    };
    let mut prefix = "ltl".to_string();
    let mut n = 1;
    while taken(&prefix) {
        prefix = format!("ltl{}", n);
        n += 1;
    }
    prefix
}

pub(crate) fn when(cond: Vec<SExpr>, effects: Vec<SExpr>) -> SExpr {
    SExpr::list(vec![SExpr::atom("when"), and(cond), and(effects)])
}

// ─── Entry points ─────────────────────────────────────────────

/// Compile `formulas` (at least one) into the task with `tool`.
pub fn compile(
    domain: &Domain,
    problem: &Problem,
    formulas: &[DeclareFormula],
    tool: ToolCompiler,
) -> Result<(Domain, Problem)> {
    if formulas.is_empty() {
        return Err(LemmingError::InvalidInput("no formulas to compile".to_string()));
    }
    let bindings = formulas
        .iter()
        .map(|f| bind(domain, f))
        .collect::<Result<Vec<_>>>()?;
    let compilation = match tool {
        ToolCompiler::Lf2f => automaton::compile(domain, &bindings),
        ToolCompiler::P4p => pattern::compile(domain, &bindings)?,
    };
    tracing::debug!(
        %tool,
        formulas = formulas.len(),
        fluents = compilation.predicates.len(),
        "compiled temporal goal"
    );
    Ok(compilation.apply(domain, problem))
}

/// Parse the ranked formulas and compile a textual task.
pub fn compile_task(
    task: &PlanningTask,
    formulas: &[LTLFormula],
    tool: ToolCompiler,
) -> Result<PlanningTask> {
    task.require_non_empty()?;
    let parsed = formulas
        .iter()
        .map(|f| f.formula.parse::<DeclareFormula>())
        .collect::<Result<Vec<_>>>()?;
    let (domain, problem) = pddl::parse_task(task)?;
    let (domain, problem) = compile(&domain, &problem, &parsed, tool)?;
    Ok(PlanningTask::new(domain.to_pddl(), problem.to_pddl()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{GroundedTopQ, PlanSearch, TopQConfig};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    pub(crate) const DOMAIN: &str = r#"
    (define (domain notify)
      (:requirements :strips)
      (:predicates (drafted) (sent) (pinged) (emailed) (archived))
      (:action draft :parameters () :precondition () :effect (drafted))
      (:action slack :parameters () :precondition (drafted) :effect (and (sent) (pinged)))
      (:action gmail :parameters () :precondition (drafted) :effect (and (sent) (emailed)))
      (:action archive :parameters () :precondition (sent) :effect (archived)))
    "#;

    pub(crate) const PROBLEM: &str =
        "(define (problem n) (:domain notify) (:init) (:goal (archived)))";

    fn formula(text: &str) -> DeclareFormula {
        text.parse().unwrap()
    }

    fn plans_for(formulas: &[&str], tool: ToolCompiler, quality_bound: f64) -> BTreeSet<Vec<String>> {
        let domain = Domain::parse(DOMAIN).unwrap();
        let problem = Problem::parse(PROBLEM).unwrap();
        let formulas: Vec<DeclareFormula> = formulas.iter().map(|f| formula(f)).collect();
        let (d, p) = compile(&domain, &problem, &formulas, tool).unwrap();
        let planner = GroundedTopQ::new(TopQConfig {
            quality_bound,
            max_plans: 50,
            ..TopQConfig::default()
        });
        planner
            .search_topq(&PlanningTask::new(d.to_pddl(), p.to_pddl()))
            .unwrap()
            .into_iter()
            .map(|p| p.actions)
            .collect()
    }

    #[test]
    fn tools_parse() {
        assert_eq!("LF2F".parse::<ToolCompiler>().unwrap(), ToolCompiler::Lf2f);
        assert!(matches!(
            "ltl2pddl".parse::<ToolCompiler>(),
            Err(LemmingError::InvalidTool(_))
        ));
    }

    #[test]
    fn activities_bind_to_actions_then_predicates() {
        let domain = Domain::parse(DOMAIN).unwrap();
        let f = formula("Response Slack Emailed");
        let binding = bind(&domain, &f).unwrap();
        assert_eq!(binding.a, Event::Action("slack".into()));
        assert_eq!(binding.b, Event::Adds("emailed".into()));
    }

    #[test]
    fn unknown_activity_is_unresolved() {
        let domain = Domain::parse(DOMAIN).unwrap();
        let err = bind(&domain, &formula("Existence Teams")).unwrap_err();
        assert!(matches!(
            err,
            LemmingError::UnresolvedProposition { ref activity, .. } if activity == "Teams"
        ));
    }

    #[test]
    fn compiled_plans_satisfy_the_constraint() {
        for tool in [ToolCompiler::Lf2f, ToolCompiler::P4p] {
            let plans = plans_for(&["Absence Gmail"], tool, 2.0);
            assert!(!plans.is_empty(), "{tool}");
            assert!(plans.iter().all(|p| !p.contains(&"(gmail)".to_string())), "{tool}");

            let plans = plans_for(&["Response Slack Gmail"], tool, 2.0);
            for plan in &plans {
                if let Some(i) = plan.iter().position(|a| a == "(slack)") {
                    assert!(plan[i..].contains(&"(gmail)".to_string()), "{tool}: {plan:?}");
                }
            }
        }
    }

    #[test]
    fn both_tools_yield_the_same_optimal_plans() {
        for formulas in [
            vec!["Precedence Slack Gmail"],
            vec!["Existence Gmail", "Absence Slack"],
            vec!["ExclusiveChoice Slack Gmail"],
            vec!["Succession Slack Gmail"],
        ] {
            assert_eq!(
                plans_for(&formulas, ToolCompiler::Lf2f, 1.0),
                plans_for(&formulas, ToolCompiler::P4p, 1.0),
                "{formulas:?}"
            );
        }
    }

    #[test]
    fn compilation_is_deterministic() {
        let task = PlanningTask::new(DOMAIN, PROBLEM);
        let formulas = vec![LTLFormula {
            user_prompt: "whenever slack then gmail".into(),
            formula: "Response Slack Gmail".into(),
            description: String::new(),
            confidence: 0.9,
        }];
        for tool in [ToolCompiler::Lf2f, ToolCompiler::P4p] {
            let first = compile_task(&task, &formulas, tool).unwrap();
            let second = compile_task(&task, &formulas, tool).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn fluent_prefix_avoids_domain_names() {
        let text = DOMAIN.replacen("(archived))", "(archived) (ltl-x))", 1);
        let domain = Domain::parse(&text).unwrap();
        assert_eq!(fluent_prefix(&domain), "ltl1");
    }

    #[test]
    fn no_formulas_is_invalid_input() {
        let domain = Domain::parse(DOMAIN).unwrap();
        let problem = Problem::parse(PROBLEM).unwrap();
        assert!(matches!(
            compile(&domain, &problem, &[], ToolCompiler::Lf2f),
            Err(LemmingError::InvalidInput(_))
        ));
    }
}
