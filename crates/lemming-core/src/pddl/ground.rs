//! Grounding of the STRIPS fragment with negative literals, equality,
//! conditional effects and `total-cost` action costs.
//!
//! Ground actions are pruned by relaxed reachability from the initial state.

use std::collections::{HashMap, HashSet};

use super::model::{Domain, Problem, OBJECT_TYPE};
use super::sexpr::SExpr;
use crate::error::{LemmingError, Result};

/// Upper bound on ground actions before the task is rejected as too large.
pub const MAX_GROUND_ACTIONS: usize = 100_000;

// ─── State ────────────────────────────────────────────────────

/// A set of true facts, as a bitset over fact indices.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct State(Vec<u64>);

impl State {
    pub fn empty(fact_count: usize) -> Self {
        State(vec![0; fact_count.div_ceil(64)])
    }

    pub fn contains(&self, fact: usize) -> bool {
        self.0
            .get(fact / 64)
            .is_some_and(|word| word & (1 << (fact % 64)) != 0)
    }

    pub fn insert(&mut self, fact: usize) {
        if let Some(word) = self.0.get_mut(fact / 64) {
            *word |= 1 << (fact % 64);
        }
    }

    pub fn remove(&mut self, fact: usize) {
        if let Some(word) = self.0.get_mut(fact / 64) {
            *word &= !(1 << (fact % 64));
        }
    }
}

// ─── Ground actions ───────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalEffect {
    pub cond_pos: Vec<usize>,
    pub cond_neg: Vec<usize>,
    pub add: Vec<usize>,
    pub del: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundAction {
    /// `(name arg1 arg2 ...)`
    pub name: String,
    pub pre_pos: Vec<usize>,
    pub pre_neg: Vec<usize>,
    pub add: Vec<usize>,
    pub del: Vec<usize>,
    pub conditional: Vec<ConditionalEffect>,
    pub cost: f64,
}

impl GroundAction {
    pub fn applicable(&self, state: &State) -> bool {
        self.pre_pos.iter().all(|&f| state.contains(f))
            && self.pre_neg.iter().all(|&f| !state.contains(f))
    }

    /// Successor state. Conditions are evaluated on `state`; deletes happen
    /// before adds.
    pub fn apply(&self, state: &State) -> State {
        let fired: Vec<&ConditionalEffect> = self
            .conditional
            .iter()
            .filter(|ce| {
                ce.cond_pos.iter().all(|&f| state.contains(f))
                    && ce.cond_neg.iter().all(|&f| !state.contains(f))
            })
            .collect();
        let mut next = state.clone();
        for &f in self.del.iter().chain(fired.iter().flat_map(|ce| ce.del.iter())) {
            next.remove(f);
        }
        for &f in self.add.iter().chain(fired.iter().flat_map(|ce| ce.add.iter())) {
            next.insert(f);
        }
        next
    }

    /// True if some (possibly conditional) effect adds `fact`.
    pub fn may_add(&self, fact: usize) -> bool {
        self.add.contains(&fact) || self.conditional.iter().any(|ce| ce.add.contains(&fact))
    }
}

// ─── Ground task ──────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct GroundTask {
    /// Fact names in `(pred arg ...)` form, indexed by fact id.
    pub facts: Vec<String>,
    index: HashMap<String, usize>,
    pub init_facts: Vec<usize>,
    pub actions: Vec<GroundAction>,
    pub goal_pos: Vec<usize>,
    pub goal_neg: Vec<usize>,
}

#[derive(Clone, Debug)]
enum Lit {
    Atom {
        positive: bool,
        pred: String,
        args: Vec<String>,
    },
    Eq {
        positive: bool,
        a: String,
        b: String,
    },
}

#[derive(Clone, Debug)]
enum CostTerm {
    Number(f64),
    Function(Vec<String>),
}

#[derive(Clone, Debug, Default)]
struct LiftedEffect {
    unconditional: Vec<Lit>,
    conditional: Vec<(Vec<Lit>, Vec<Lit>)>,
    cost: Option<CostTerm>,
}

fn literal(items: &[SExpr], positive: bool) -> Result<Lit> {
    let pred = items
        .first()
        .and_then(SExpr::as_atom)
        .ok_or_else(|| LemmingError::Parse(format!("bad literal `{}`", SExpr::List(items.to_vec()))))?;
    let mut args = Vec::with_capacity(items.len().saturating_sub(1));
    for arg in &items[1..] {
        match arg {
            SExpr::Atom(a) => args.push(a.clone()),
            SExpr::List(_) => {
                return Err(LemmingError::UnsupportedFeature(format!(
                    "numeric expression in `{}`",
                    SExpr::List(items.to_vec())
                )))
            }
        }
    }
    if pred == "=" {
        if args.len() != 2 {
            return Err(LemmingError::Parse("`=` takes two arguments".to_string()));
        }
        return Ok(Lit::Eq {
            positive,
            a: args[0].clone(),
            b: args[1].clone(),
        });
    }
    if matches!(pred, "<" | ">" | "<=" | ">=") {
        return Err(LemmingError::UnsupportedFeature(format!("comparison `{}`", pred)));
    }
    Ok(Lit::Atom {
        positive,
        pred: pred.to_string(),
        args,
    })
}

fn flatten_condition(expr: &SExpr, out: &mut Vec<Lit>) -> Result<()> {
    let items = match expr {
        SExpr::List(items) => items,
        SExpr::Atom(a) => return Err(LemmingError::Parse(format!("bare atom `{}` in condition", a))),
    };
    match items.first().and_then(SExpr::as_atom) {
        None if items.is_empty() => Ok(()),
        Some("and") => items[1..].iter().try_for_each(|i| flatten_condition(i, out)),
        Some("not") => {
            let inner = items
                .get(1)
                .and_then(SExpr::as_list)
                .ok_or_else(|| LemmingError::Parse(format!("bad negation `{}`", expr)))?;
            if matches!(inner.first().and_then(SExpr::as_atom), Some("and" | "or" | "not")) {
                return Err(LemmingError::UnsupportedFeature(format!("complex negation `{}`", expr)));
            }
            out.push(literal(inner, false)?);
            Ok(())
        }
        Some(op @ ("or" | "imply" | "forall" | "exists" | "when")) => Err(
            LemmingError::UnsupportedFeature(format!("`{}` in condition", op)),
        ),
        Some(_) => {
            out.push(literal(items, true)?);
            Ok(())
        }
        None => Err(LemmingError::Parse(format!("bad condition `{}`", expr))),
    }
}

fn flatten_simple_effects(expr: &SExpr, out: &mut Vec<Lit>) -> Result<()> {
    match (expr.head(), expr.as_list()) {
        (Some("and"), Some(items)) => items[1..]
            .iter()
            .try_for_each(|e| flatten_simple_effects(e, out)),
        (Some("when" | "forall" | "increase"), _) => Err(LemmingError::UnsupportedFeature(
            format!("nested effect `{}`", expr),
        )),
        _ => flatten_condition(expr, out),
    }
}

fn flatten_effect(expr: &SExpr, eff: &mut LiftedEffect) -> Result<()> {
    let items = expr
        .as_list()
        .ok_or_else(|| LemmingError::Parse(format!("bad effect `{}`", expr)))?;
    match expr.head() {
        None if items.is_empty() => Ok(()),
        Some("and") => items[1..].iter().try_for_each(|e| flatten_effect(e, eff)),
        Some("when") => {
            let (cond, body) = match items {
                [_, cond, body] => (cond, body),
                _ => return Err(LemmingError::Parse(format!("bad `when` `{}`", expr))),
            };
            let mut conds = Vec::new();
            flatten_condition(cond, &mut conds)?;
            let mut effects = Vec::new();
            flatten_simple_effects(body, &mut effects)?;
            eff.conditional.push((conds, effects));
            Ok(())
        }
        Some("increase") => {
            let (target, amount) = match items {
                [_, target, amount] => (target, amount),
                _ => return Err(LemmingError::Parse(format!("bad `increase` `{}`", expr))),
            };
            if target.head() != Some("total-cost") {
                return Err(LemmingError::UnsupportedFeature(format!("numeric fluent `{}`", target)));
            }
            let term = match amount {
                SExpr::Atom(n) => CostTerm::Number(
                    n.parse()
                        .map_err(|_| LemmingError::Parse(format!("bad cost `{}`", n)))?,
                ),
                SExpr::List(parts) => CostTerm::Function(
                    parts
                        .iter()
                        .map(|p| p.as_atom().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| LemmingError::UnsupportedFeature(format!("cost `{}`", amount)))?,
                ),
            };
            eff.cost = Some(term);
            Ok(())
        }
        Some(op @ ("forall" | "decrease" | "assign")) => Err(LemmingError::UnsupportedFeature(
            format!("`{}` in effect", op),
        )),
        _ => flatten_condition(expr, &mut eff.unconditional),
    }
}

fn fact_key(pred: &str, args: &[&str]) -> String {
    if args.is_empty() {
        format!("({})", pred)
    } else {
        format!("({} {})", pred, args.join(" "))
    }
}

struct Grounder<'a> {
    facts: Vec<String>,
    index: HashMap<String, usize>,
    init_keys: HashSet<String>,
    static_preds: HashSet<&'a str>,
    functions: HashMap<String, f64>,
    use_costs: bool,
}

impl<'a> Grounder<'a> {
    fn intern(&mut self, key: String) -> usize {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.facts.len();
        self.index.insert(key.clone(), i);
        self.facts.push(key);
        i
    }

    fn resolve<'b>(arg: &'b str, binding: &HashMap<&str, &'b str>) -> Result<&'b str> {
        if arg.starts_with('?') {
            binding
                .get(arg)
                .copied()
                .ok_or_else(|| LemmingError::Parse(format!("unbound variable `{}`", arg)))
        } else {
            Ok(arg)
        }
    }

    /// Evaluate a literal that does not depend on the state.
    /// `None` means the literal is a fluent and must be kept.
    fn eval_static(&self, lit: &Lit, binding: &HashMap<&str, &str>) -> Result<Option<bool>> {
        match lit {
            Lit::Eq { positive, a, b } => {
                let same = Self::resolve(a, binding)? == Self::resolve(b, binding)?;
                Ok(Some(same == *positive))
            }
            Lit::Atom {
                positive,
                pred,
                args,
            } if self.static_preds.contains(pred.as_str()) => {
                let args = args
                    .iter()
                    .map(|a| Self::resolve(a, binding))
                    .collect::<Result<Vec<_>>>()?;
                let holds = self.init_keys.contains(&fact_key(pred, &args));
                Ok(Some(holds == *positive))
            }
            Lit::Atom { .. } => Ok(None),
        }
    }

    fn ground_lit(&mut self, lit: &Lit, binding: &HashMap<&str, &str>) -> Result<(bool, usize)> {
        match lit {
            Lit::Atom {
                positive,
                pred,
                args,
            } => {
                let args = args
                    .iter()
                    .map(|a| Self::resolve(a, binding))
                    .collect::<Result<Vec<_>>>()?;
                Ok((*positive, self.intern(fact_key(pred, &args))))
            }
            Lit::Eq { .. } => Err(LemmingError::UnsupportedFeature("equality in effect".to_string())),
        }
    }

    /// Split conditions into fluent literals; `None` if a static one fails.
    fn ground_conditions(
        &mut self,
        lits: &[Lit],
        binding: &HashMap<&str, &str>,
    ) -> Result<Option<(Vec<usize>, Vec<usize>)>> {
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        for lit in lits {
            match self.eval_static(lit, binding)? {
                Some(true) => {}
                Some(false) => return Ok(None),
                None => {
                    let (positive, f) = self.ground_lit(lit, binding)?;
                    if positive {
                        pos.push(f);
                    } else {
                        neg.push(f);
                    }
                }
            }
        }
        Ok(Some((pos, neg)))
    }

    fn cost(&self, eff: &LiftedEffect, binding: &HashMap<&str, &str>) -> Result<f64> {
        if !self.use_costs {
            return Ok(1.0);
        }
        match &eff.cost {
            None => Ok(0.0),
            Some(CostTerm::Number(n)) => Ok(*n),
            Some(CostTerm::Function(parts)) => {
                let (name, args) = parts
                    .split_first()
                    .ok_or_else(|| LemmingError::Parse("empty cost function".to_string()))?;
                let args = args
                    .iter()
                    .map(|a| Self::resolve(a, binding))
                    .collect::<Result<Vec<_>>>()?;
                let key = fact_key(name, &args);
                self.functions
                    .get(&key)
                    .copied()
                    .ok_or_else(|| LemmingError::Parse(format!("no initial value for {}", key)))
            }
        }
    }
}

fn is_subtype(ty: &str, target: &str, parents: &HashMap<&str, &str>) -> bool {
    if target == OBJECT_TYPE {
        return true;
    }
    let mut cur = ty;
    for _ in 0..64 {
        if cur == target {
            return true;
        }
        match parents.get(cur) {
            Some(&p) if p != cur => cur = p,
            _ => return false,
        }
    }
    false
}

fn referenced_params(lit: &Lit, params: &[&str]) -> Option<usize> {
    let args: Vec<&str> = match lit {
        Lit::Atom { args, .. } => args.iter().map(String::as_str).collect(),
        Lit::Eq { a, b, .. } => vec![a.as_str(), b.as_str()],
    };
    args.iter()
        .filter_map(|a| params.iter().position(|p| p == a))
        .max()
}

impl GroundTask {
    pub fn new(domain: &Domain, problem: &Problem) -> Result<Self> {
        let mut fluent_preds: HashSet<String> = HashSet::new();
        let mut lifted = Vec::with_capacity(domain.actions.len());
        for action in &domain.actions {
            let mut pre = Vec::new();
            if let Some(p) = &action.precondition {
                flatten_condition(p, &mut pre)?;
            }
            let mut eff = LiftedEffect::default();
            if let Some(e) = &action.effect {
                flatten_effect(e, &mut eff)?;
            }
            for lit in eff
                .unconditional
                .iter()
                .chain(eff.conditional.iter().flat_map(|(_, e)| e.iter()))
            {
                if let Lit::Atom { pred, .. } = lit {
                    fluent_preds.insert(pred.clone());
                }
            }
            lifted.push((action, pre, eff));
        }

        let static_preds: HashSet<&str> = domain
            .predicates
            .iter()
            .map(|p| p.name.as_str())
            .filter(|p| !fluent_preds.contains(*p))
            .collect();

        let mut init_atoms = Vec::new();
        let mut functions = HashMap::new();
        for fact in &problem.init {
            let items = fact
                .as_list()
                .ok_or_else(|| LemmingError::Parse(format!("bad init fact `{}`", fact)))?;
            if fact.head() == Some("=") {
                if let [_, SExpr::List(term), SExpr::Atom(value)] = items {
                    let parts: Vec<&str> = term.iter().filter_map(SExpr::as_atom).collect();
                    if let Some((name, args)) = parts.split_first() {
                        let v: f64 = value
                            .parse()
                            .map_err(|_| LemmingError::Parse(format!("bad number `{}`", value)))?;
                        functions.insert(fact_key(name, args), v);
                    }
                    continue;
                }
                return Err(LemmingError::Parse(format!("bad init assignment `{}`", fact)));
            }
            let args: Vec<&str> = items[1..].iter().filter_map(SExpr::as_atom).collect();
            let pred = fact
                .head()
                .ok_or_else(|| LemmingError::Parse(format!("bad init fact `{}`", fact)))?;
            init_atoms.push(fact_key(pred, &args));
        }

        let mut g = Grounder {
            facts: Vec::new(),
            index: HashMap::new(),
            init_keys: init_atoms.iter().cloned().collect(),
            static_preds,
            functions,
            use_costs: problem.metric.is_some(),
        };
        let init_facts: Vec<usize> = init_atoms.into_iter().map(|k| g.intern(k)).collect();

        let parents: HashMap<&str, &str> = domain
            .types
            .iter()
            .map(|t| (t.name.as_str(), t.ty.as_str()))
            .collect();
        let mut objects: Vec<(&str, &str)> = Vec::new();
        for obj in problem.objects.iter().chain(domain.constants.iter()) {
            if !objects.iter().any(|(n, _)| *n == obj.name) {
                objects.push((obj.name.as_str(), obj.ty.as_str()));
            }
        }

        let mut actions = Vec::new();
        for (action, pre, eff) in &lifted {
            let params: Vec<&str> = action.params.iter().map(|p| p.name.as_str()).collect();
            let candidates: Vec<Vec<&str>> = action
                .params
                .iter()
                .map(|p| {
                    objects
                        .iter()
                        .filter(|(_, ty)| is_subtype(ty, &p.ty, &parents))
                        .map(|(n, _)| *n)
                        .collect()
                })
                .collect();

            // static checks keyed by the deepest parameter they need
            let mut checks: Vec<Vec<&Lit>> = vec![Vec::new(); params.len() + 1];
            for lit in pre {
                let is_static = match lit {
                    Lit::Eq { .. } => true,
                    Lit::Atom { pred, .. } => g.static_preds.contains(pred.as_str()),
                };
                if is_static {
                    let level = referenced_params(lit, &params).map_or(0, |i| i + 1);
                    checks[level].push(lit);
                }
            }

            let mut bindings: Vec<Vec<&str>> = Vec::new();
            let empty = HashMap::new();
            let mut root_ok = true;
            for lit in &checks[0] {
                if g.eval_static(lit, &empty)? != Some(true) {
                    root_ok = false;
                }
            }
            if root_ok {
                enumerate(&g, &params, &candidates, &checks, &mut Vec::new(), &mut bindings)?;
            }

            for values in bindings {
                let binding: HashMap<&str, &str> =
                    params.iter().copied().zip(values.iter().copied()).collect();
                let Some((pre_pos, pre_neg)) = g.ground_conditions(pre, &binding)? else {
                    continue;
                };
                let mut add = Vec::new();
                let mut del = Vec::new();
                for lit in &eff.unconditional {
                    let (positive, f) = g.ground_lit(lit, &binding)?;
                    if positive {
                        add.push(f);
                    } else {
                        del.push(f);
                    }
                }
                let mut conditional = Vec::new();
                for (conds, effects) in &eff.conditional {
                    let Some((cond_pos, cond_neg)) = g.ground_conditions(conds, &binding)? else {
                        continue;
                    };
                    let mut ce = ConditionalEffect {
                        cond_pos,
                        cond_neg,
                        add: Vec::new(),
                        del: Vec::new(),
                    };
                    for lit in effects {
                        let (positive, f) = g.ground_lit(lit, &binding)?;
                        if positive {
                            ce.add.push(f);
                        } else {
                            ce.del.push(f);
                        }
                    }
                    conditional.push(ce);
                }
                let name = if values.is_empty() {
                    format!("({})", action.name)
                } else {
                    format!("({} {})", action.name, values.join(" "))
                };
                actions.push(GroundAction {
                    name,
                    pre_pos,
                    pre_neg,
                    add,
                    del,
                    conditional,
                    cost: g.cost(eff, &binding)?,
                });
                if actions.len() > MAX_GROUND_ACTIONS {
                    return Err(LemmingError::UnsupportedFeature(format!(
                        "more than {} ground actions",
                        MAX_GROUND_ACTIONS
                    )));
                }
            }
        }

        let mut goal_lits = Vec::new();
        flatten_condition(&problem.goal, &mut goal_lits)?;
        let mut goal_pos = Vec::new();
        let mut goal_neg = Vec::new();
        let empty = HashMap::new();
        for lit in &goal_lits {
            match lit {
                Lit::Eq { positive, a, b } => {
                    if (a == b) != *positive {
                        // never true; an uninterned fact makes the goal unreachable
                        goal_pos.push(g.intern(format!("(= {} {})", a, b)));
                    }
                }
                Lit::Atom { .. } => {
                    let (positive, f) = g.ground_lit(lit, &empty)?;
                    if positive {
                        goal_pos.push(f);
                    } else {
                        goal_neg.push(f);
                    }
                }
            }
        }

        let mut task = GroundTask {
            facts: g.facts,
            index: g.index,
            init_facts,
            actions,
            goal_pos,
            goal_neg,
        };
        task.prune_unreachable();
        tracing::debug!(
            facts = task.facts.len(),
            actions = task.actions.len(),
            "grounded task"
        );
        Ok(task)
    }

    /// Drop actions whose positive preconditions are relaxed-unreachable.
    fn prune_unreachable(&mut self) {
        let reach = self.relaxed_reachable(&[]);
        self.actions
            .retain(|a| a.pre_pos.iter().all(|&f| reach[f]));
    }

    /// Relaxed exploration ignoring deletes and negative conditions.
    /// Actions whose index is in `excluded` never fire.
    pub fn relaxed_reachable(&self, excluded: &[bool]) -> Vec<bool> {
        self.relaxed_layers(excluded)
            .into_iter()
            .map(|l| l.is_some())
            .collect()
    }

    /// Layer at which each fact first becomes relaxed-reachable.
    pub fn relaxed_layers(&self, excluded: &[bool]) -> Vec<Option<u32>> {
        let mut layer: Vec<Option<u32>> = vec![None; self.facts.len()];
        for &f in &self.init_facts {
            layer[f] = Some(0);
        }
        let mut depth = 0;
        loop {
            let reached: Vec<bool> = layer.iter().map(Option::is_some).collect();
            let mut new_facts = Vec::new();
            for (i, action) in self.actions.iter().enumerate() {
                if excluded.get(i).copied().unwrap_or(false)
                    || !action.pre_pos.iter().all(|&f| reached[f])
                {
                    continue;
                }
                new_facts.extend(action.add.iter().copied().filter(|&f| !reached[f]));
                for ce in &action.conditional {
                    if ce.cond_pos.iter().all(|&f| reached[f]) {
                        new_facts.extend(ce.add.iter().copied().filter(|&f| !reached[f]));
                    }
                }
            }
            if new_facts.is_empty() {
                return layer;
            }
            depth += 1;
            for f in new_facts {
                layer[f].get_or_insert(depth);
            }
        }
    }

    pub fn fact_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn initial_state(&self) -> State {
        let mut state = State::empty(self.facts.len());
        for &f in &self.init_facts {
            state.insert(f);
        }
        state
    }

    pub fn is_goal(&self, state: &State) -> bool {
        self.goal_pos.iter().all(|&f| state.contains(f))
            && self.goal_neg.iter().all(|&f| !state.contains(f))
    }

    /// Indices of actions that may add `fact`.
    pub fn achievers(&self, fact: usize) -> Vec<usize> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.may_add(fact))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_initial(&self, fact: usize) -> bool {
        self.init_facts.contains(&fact)
    }
}

fn enumerate<'a>(
    g: &Grounder<'_>,
    params: &[&str],
    candidates: &[Vec<&'a str>],
    checks: &[Vec<&Lit>],
    current: &mut Vec<&'a str>,
    out: &mut Vec<Vec<&'a str>>,
) -> Result<()> {
    let depth = current.len();
    if depth == params.len() {
        out.push(current.clone());
        if out.len() > MAX_GROUND_ACTIONS {
            return Err(LemmingError::UnsupportedFeature(format!(
                "more than {} ground actions",
                MAX_GROUND_ACTIONS
            )));
        }
        return Ok(());
    }
    for &obj in &candidates[depth] {
        current.push(obj);
        let binding: HashMap<&str, &str> = params
            .iter()
            .copied()
            .zip(current.iter().copied())
            .collect();
        let mut ok = true;
        for lit in &checks[depth + 1] {
            if g.eval_static(lit, &binding)? != Some(true) {
                ok = false;
                break;
            }
        }
        if ok {
            enumerate(g, params, candidates, checks, current, out)?;
        }
        current.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = r#"
    (define (domain lights)
      (:requirements :strips :typing :negative-preconditions :conditional-effects)
      (:types switch room)
      (:predicates (on ?s - switch) (lit ?r - room) (wired ?s - switch ?r - room))
      (:action flip-on
        :parameters (?s - switch ?r - room)
        :precondition (and (wired ?s ?r) (not (on ?s)))
        :effect (and (on ?s) (when (wired ?s ?r) (lit ?r))))
      (:action flip-off
        :parameters (?s - switch)
        :precondition (on ?s)
        :effect (not (on ?s))))
    "#;

    const PROBLEM: &str = r#"
    (define (problem p) (:domain lights)
      (:objects s1 s2 - switch kitchen hall - room)
      (:init (wired s1 kitchen))
      (:goal (and (lit kitchen) (not (on s2)))))
    "#;

    fn task() -> GroundTask {
        GroundTask::new(&Domain::parse(DOMAIN).unwrap(), &Problem::parse(PROBLEM).unwrap()).unwrap()
    }

    #[test]
    fn static_preconditions_prune_groundings() {
        let task = task();
        let names: Vec<&str> = task.actions.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"(flip-on s1 kitchen)"));
        assert!(!names.iter().any(|n| n.starts_with("(flip-on s2")));
        // flip-off s2 needs (on s2), which nothing reachable adds
        assert!(!names.contains(&"(flip-off s2)"));
    }

    #[test]
    fn conditional_effects_fire_on_pre_state() {
        let task = task();
        let flip = task
            .actions
            .iter()
            .find(|a| a.name == "(flip-on s1 kitchen)")
            .unwrap();
        let s0 = task.initial_state();
        assert!(flip.applicable(&s0));
        let s1 = flip.apply(&s0);
        assert!(task.is_goal(&s1));
        assert!(!flip.applicable(&s1));
    }

    #[test]
    fn relaxed_layers_follow_dependencies() {
        let task = task();
        let layers = task.relaxed_layers(&[]);
        let lit = task.fact_index("(lit kitchen)").unwrap();
        let wired = task.fact_index("(wired s1 kitchen)").unwrap();
        assert_eq!(layers[wired], Some(0));
        assert_eq!(layers[lit], Some(1));
    }

    #[test]
    fn state_bitset_operations() {
        let mut s = State::empty(130);
        s.insert(0);
        s.insert(129);
        assert!(s.contains(129) && s.contains(0));
        s.remove(129);
        assert!(!s.contains(129));
    }

    #[test]
    fn rejects_disjunctive_preconditions() {
        let domain = Domain::parse(
            "(define (domain d) (:predicates (p) (q)) \
             (:action a :parameters () :precondition (or (p) (q)) :effect (p)))",
        )
        .unwrap();
        let problem =
            Problem::parse("(define (problem x) (:domain d) (:init) (:goal (p)))").unwrap();
        assert!(matches!(
            GroundTask::new(&domain, &problem),
            Err(LemmingError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn nested_conditional_effects_are_unsupported() {
        let domain = Domain::parse(
            "(define (domain d) (:predicates (p) (q) (r)) \
             (:action a :parameters () :precondition () \
              :effect (when (p) (and (q) (when (q) (r))))))",
        )
        .unwrap();
        let problem =
            Problem::parse("(define (problem x) (:domain d) (:init (p)) (:goal (q)))").unwrap();
        assert!(matches!(
            GroundTask::new(&domain, &problem),
            Err(LemmingError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn action_costs_come_from_init_functions() {
        let domain = Domain::parse(
            "(define (domain roads) (:requirements :action-costs) \
             (:predicates (at ?l) (road ?a ?b)) (:functions (total-cost) (len ?a ?b)) \
             (:action drive :parameters (?a ?b) :precondition (and (at ?a) (road ?a ?b)) \
              :effect (and (not (at ?a)) (at ?b) (increase (total-cost) (len ?a ?b)))))",
        )
        .unwrap();
        let problem = Problem::parse(
            "(define (problem r) (:domain roads) (:objects x y) \
             (:init (at x) (road x y) (= (len x y) 7) (= (total-cost) 0)) \
             (:goal (at y)) (:metric minimize (total-cost)))",
        )
        .unwrap();
        let task = GroundTask::new(&domain, &problem).unwrap();
        let drive = task.actions.iter().find(|a| a.name == "(drive x y)").unwrap();
        assert_eq!(drive.cost, 7.0);
    }
}
