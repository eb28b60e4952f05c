//! `lf2f`: automaton-product compilation.
//!
//! Each formula becomes a small DFA over the events `a`, `b` and "other".
//! State `s` of formula `i` is the fluent `(<prefix>-q<i>-<s>)`, acceptance is
//! `(<prefix>-acc<i>)`. Since an action schema's label is fixed, its effect on
//! each automaton is a set of `when` effects keyed by the current state;
//! transitions into the rejecting sink become negative preconditions.

use super::{when, Binding, Compilation, Label};
use crate::ltl::DeclareTemplate;
use crate::pddl::model::not;
use crate::pddl::{Domain, SExpr};

/// Automaton for one template. State 0 is initial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dfa {
    pub template: DeclareTemplate,
}

impl Dfa {
    pub fn new(template: DeclareTemplate) -> Self {
        Self { template }
    }

    pub fn states(&self) -> usize {
        use DeclareTemplate::*;
        match self.template {
            Absence => 1,
            Existence | Init | End | Response | Precedence | ChainResponse | ChainPrecedence => 2,
            ExistenceTwo | RespondedExistence | Succession | NotCoExistence | ExclusiveChoice => 3,
        }
    }

    pub fn accepting(&self, state: usize) -> bool {
        use DeclareTemplate::*;
        match self.template {
            Existence | Init | End => state == 1,
            ExistenceTwo => state == 2,
            Absence | Response | ChainResponse => state == 0,
            RespondedExistence => state != 1,
            Precedence | ChainPrecedence => true,
            Succession => state != 2,
            NotCoExistence => true,
            ExclusiveChoice => state != 0,
        }
    }

    /// Successor of `state` on an event; `None` is the rejecting sink.
    pub fn step(&self, state: usize, label: Label) -> Option<usize> {
        use DeclareTemplate::*;
        let Label { a, b } = label;
        match self.template {
            Existence => Some(if a { 1 } else { state }),
            ExistenceTwo => Some(if a { (state + 1).min(2) } else { state }),
            Absence => (!a).then_some(0),
            Init => match state {
                0 if a => Some(1),
                0 => None,
                _ => Some(1),
            },
            End => Some(usize::from(a)),
            RespondedExistence => match state {
                _ if b => Some(2),
                2 => Some(2),
                _ if a => Some(1),
                s => Some(s),
            },
            Response => Some(match state {
                _ if b => 0,
                _ if a => 1,
                s => s,
            }),
            Precedence => match state {
                0 if a => Some(1),
                0 if b => None,
                s => Some(s),
            },
            Succession => match state {
                0 if a && b => Some(1),
                0 if a => Some(2),
                0 if b => None,
                0 => Some(0),
                _ if b => Some(1),
                _ if a => Some(2),
                s => Some(s),
            },
            ChainResponse => match state {
                1 if !b => None,
                _ => Some(usize::from(a)),
            },
            // b is only allowed directly after a, and never first
            ChainPrecedence => {
                if b && state == 0 {
                    None
                } else {
                    Some(usize::from(a))
                }
            }
            NotCoExistence | ExclusiveChoice => match (state, a, b) {
                (_, true, true) => None,
                (2, true, _) | (1, _, true) => None,
                (0, true, _) => Some(1),
                (0, _, true) => Some(2),
                (s, _, _) => Some(s),
            },
        }
    }

    /// Run the automaton over a sequence of labels; `None` if it hits the sink.
    pub fn run(&self, labels: impl IntoIterator<Item = Label>) -> Option<usize> {
        labels
            .into_iter()
            .try_fold(0, |state, label| self.step(state, label))
    }
}

pub(super) fn compile(domain: &Domain, bindings: &[Binding]) -> Compilation {
    let mut out = Compilation::new(domain);
    for (i, binding) in bindings.iter().enumerate() {
        let dfa = Dfa::new(binding.formula.template);
        let states: Vec<SExpr> = (0..dfa.states())
            .map(|s| out.fluent(&format!("q{}-{}", i, s)))
            .collect();
        let acc = out.fluent(&format!("acc{}", i));

        out.init.push(states[0].clone());
        if dfa.accepting(0) {
            out.init.push(acc.clone());
        }
        out.goal.push(acc.clone());

        for (index, action) in domain.actions.iter().enumerate() {
            let label = binding.label(action);
            for (s, fluent) in states.iter().enumerate() {
                match dfa.step(s, label) {
                    None => out.pre[index].push(not(fluent.clone())),
                    Some(t) if t == s => {}
                    Some(t) => {
                        let mut effects = vec![not(fluent.clone()), states[t].clone()];
                        match (dfa.accepting(s), dfa.accepting(t)) {
                            (false, true) => effects.push(acc.clone()),
                            (true, false) => effects.push(not(acc.clone())),
                            _ => {}
                        }
                        out.eff[index].push(when(vec![fluent.clone()], effects));
                    }
                }
            }
        }
    }
    out
}
