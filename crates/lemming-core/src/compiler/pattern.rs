//! `p4p`: DECLARE patterns compiled into monitoring fluents.
//!
//! Each template has a hand-written encoding using `seen`, `pending` and
//! `violated` style fluents. Chain templates need to observe the very next
//! action, which this encoding cannot express.

use super::{when, Binding, Compilation, Label, ToolCompiler};
use crate::error::{LemmingError, Result};
use crate::ltl::DeclareTemplate;
use crate::pddl::model::not;
use crate::pddl::Domain;

pub(super) fn compile(domain: &Domain, bindings: &[Binding]) -> Result<Compilation> {
    if let Some(chain) = bindings.iter().find(|b| b.formula.template.is_chain()) {
        return Err(unsupported(chain.formula.template));
    }
    let mut out = Compilation::new(domain);
    for (i, binding) in bindings.iter().enumerate() {
        let labels: Vec<Label> = domain.actions.iter().map(|a| binding.label(a)).collect();
        encode(&mut out, i, binding.formula.template, &labels)?;
    }
    Ok(out)
}

fn encode(
    out: &mut Compilation,
    i: usize,
    template: DeclareTemplate,
    labels: &[Label],
) -> Result<()> {
    use DeclareTemplate::*;
    match template {
        Existence => {
            let seen = out.fluent(&format!("seen-a{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.a {
                    out.eff[k].push(seen.clone());
                }
            }
            out.goal.push(seen);
        }
        ExistenceTwo => {
            let once = out.fluent(&format!("once{}", i));
            let twice = out.fluent(&format!("twice{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.a {
                    out.eff[k].push(once.clone());
                    out.eff[k].push(when(vec![once.clone()], vec![twice.clone()]));
                }
            }
            out.goal.push(twice);
        }
        Absence => {
            let violated = out.fluent(&format!("violated{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.a {
                    out.eff[k].push(violated.clone());
                }
            }
            out.goal.push(not(violated));
        }
        Init => {
            let started = out.fluent(&format!("started{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.a {
                    out.eff[k].push(started.clone());
                } else {
                    out.pre[k].push(started.clone());
                }
            }
            out.goal.push(started);
        }
        End => {
            let last = out.fluent(&format!("last{}", i));
            for (k, l) in labels.iter().enumerate() {
                out.eff[k].push(if l.a { last.clone() } else { not(last.clone()) });
            }
            out.goal.push(last);
        }
        RespondedExistence => {
            let seen_b = out.fluent(&format!("seen-b{}", i));
            let pending = out.fluent(&format!("pending{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.b {
                    out.eff[k].push(seen_b.clone());
                    out.eff[k].push(not(pending.clone()));
                } else if l.a {
                    out.eff[k].push(when(vec![not(seen_b.clone())], vec![pending.clone()]));
                }
            }
            out.goal.push(not(pending));
        }
        Response => {
            let pending = out.fluent(&format!("pending{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.b {
                    out.eff[k].push(not(pending.clone()));
                } else if l.a {
                    out.eff[k].push(pending.clone());
                }
            }
            out.goal.push(not(pending));
        }
        Precedence => {
            let seen_a = out.fluent(&format!("seen-a{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.a {
                    out.eff[k].push(seen_a.clone());
                } else if l.b {
                    out.pre[k].push(seen_a.clone());
                }
            }
        }
        Succession => {
            let seen_a = out.fluent(&format!("seen-a{}", i));
            let pending = out.fluent(&format!("pending{}", i));
            for (k, l) in labels.iter().enumerate() {
                if l.a {
                    out.eff[k].push(seen_a.clone());
                }
                match (l.a, l.b) {
                    (true, false) => out.eff[k].push(pending.clone()),
                    (false, true) => {
                        out.pre[k].push(seen_a.clone());
                        out.eff[k].push(not(pending.clone()));
                    }
                    (true, true) => out.eff[k].push(not(pending.clone())),
                    (false, false) => {}
                }
            }
            out.goal.push(not(pending));
        }
        NotCoExistence | ExclusiveChoice => {
            let seen_a = out.fluent(&format!("seen-a{}", i));
            let seen_b = out.fluent(&format!("seen-b{}", i));
            let violated = out.fluent(&format!("violated{}", i));
            let chosen = (template == ExclusiveChoice).then(|| out.fluent(&format!("chosen{}", i)));
            for (k, l) in labels.iter().enumerate() {
                match (l.a, l.b) {
                    (true, true) => out.eff[k].push(violated.clone()),
                    (true, false) => {
                        out.pre[k].push(not(seen_b.clone()));
                        out.eff[k].push(seen_a.clone());
                    }
                    (false, true) => {
                        out.pre[k].push(not(seen_a.clone()));
                        out.eff[k].push(seen_b.clone());
                    }
                    (false, false) => continue,
                }
                if let Some(chosen) = &chosen {
                    out.eff[k].push(chosen.clone());
                }
            }
            out.goal.push(not(violated));
            if let Some(chosen) = chosen {
                out.goal.push(chosen);
            }
        }
        ChainResponse | ChainPrecedence => return Err(unsupported(template)),
    }
    Ok(())
}

fn unsupported(template: DeclareTemplate) -> LemmingError {
    LemmingError::UnsupportedTool {
        tool: ToolCompiler::P4p.to_string(),
        template: template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{compile as compile_task, tests::DOMAIN, tests::PROBLEM, ToolCompiler};
    use crate::error::LemmingError;
    use crate::ltl::DeclareFormula;
    use crate::pddl::{Domain, Problem};

    #[test]
    fn chain_templates_are_unsupported() {
        let domain = Domain::parse(DOMAIN).unwrap();
        let problem = Problem::parse(PROBLEM).unwrap();
        let formula: DeclareFormula = "ChainResponse Slack Gmail".parse().unwrap();
        let err = compile_task(&domain, &problem, &[formula.clone()], ToolCompiler::P4p).unwrap_err();
        assert!(matches!(err, LemmingError::UnsupportedTool { .. }));
        // the automaton tool handles them
        assert!(compile_task(&domain, &problem, &[formula], ToolCompiler::Lf2f).is_ok());
    }

    #[test]
    fn chain_template_anywhere_rejects_the_whole_set() {
        let domain = Domain::parse(DOMAIN).unwrap();
        let problem = Problem::parse(PROBLEM).unwrap();
        let formulas: Vec<DeclareFormula> = ["Existence Slack", "ChainPrecedence Slack Gmail"]
            .iter()
            .map(|f| f.parse().unwrap())
            .collect();
        match compile_task(&domain, &problem, &formulas, ToolCompiler::P4p) {
            Err(LemmingError::UnsupportedTool { tool, template }) => {
                assert_eq!(tool, "p4p");
                assert!(template.starts_with("Chain"));
            }
            other => panic!("expected UnsupportedTool, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn response_adds_pending_fluent_and_negative_goal() {
        let domain = Domain::parse(DOMAIN).unwrap();
        let problem = Problem::parse(PROBLEM).unwrap();
        let formula: DeclareFormula = "Response Slack Gmail".parse().unwrap();
        let (d, p) = compile_task(&domain, &problem, &[formula], ToolCompiler::P4p).unwrap();
        assert!(d.predicate("ltl-pending0").is_some());
        assert!(d.requirements.contains(&":negative-preconditions".to_string()));
        assert_eq!(p.goal.to_string(), "(and (archived) (not (ltl-pending0)))");
    }
}
