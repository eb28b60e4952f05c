//! Adapter for an external top-q planner binary.
//!
//! The task is written to `domain.pddl`/`problem.pddl` in a fresh temporary
//! directory, the planner runs with that directory as its working directory,
//! and every `sas_plan*` file it leaves behind (typically under
//! `found_plans/`) is read back. The directory is removed on return.
//!
//! Arguments may contain the placeholders `{domain}`, `{problem}`, `{k}` and
//! `{q}`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{PlanSearch, TopQConfig};
use crate::error::{LemmingError, Result};
use crate::fingerprint::hash_plans;
use crate::pddl;
use crate::types::{Plan, PlanningTask};

#[derive(Debug, Clone)]
pub struct ExternalTopQ {
    program: PathBuf,
    args: Vec<String>,
    config: TopQConfig,
}

impl ExternalTopQ {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, config: TopQConfig) -> Self {
        Self {
            program: program.into(),
            args,
            config,
        }
    }

    /// Build from a whitespace-separated command line, e.g.
    /// `"topq-planner {domain} {problem} {k} {q}"`.
    pub fn from_command_line(line: &str, config: TopQConfig) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| LemmingError::InvalidInput("empty planner command".to_string()))?;
        Ok(Self::new(program, parts.collect(), config))
    }

    fn expand_args(&self, domain: &Path, problem: &Path) -> Vec<String> {
        let k = self.config.max_plans.to_string();
        let q = self.config.quality().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{domain}", &domain.to_string_lossy())
                    .replace("{problem}", &problem.to_string_lossy())
                    .replace("{k}", &k)
                    .replace("{q}", &q)
            })
            .collect()
    }

    /// Bound a raw plan list: dedupe, order by cost, apply quality and count.
    fn select(&self, plans: Vec<Plan>) -> Vec<Plan> {
        let mut plans = hash_plans(plans);
        plans.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        if let Some(best) = plans.first().map(|p| p.cost) {
            let bound = best * self.config.quality() + 1e-9;
            plans.retain(|p| p.cost <= bound);
        }
        plans.truncate(self.config.max_plans);
        plans
    }
}

impl PlanSearch for ExternalTopQ {
    fn name(&self) -> &str {
        "external-topq"
    }

    fn search_topq(&self, task: &PlanningTask) -> Result<Vec<Plan>> {
        // malformed PDDL fails here, not inside the planner
        pddl::parse_task(task)?;

        let workdir = tempfile::tempdir()?;
        let domain_path = workdir.path().join("domain.pddl");
        let problem_path = workdir.path().join("problem.pddl");
        fs::write(&domain_path, &task.domain)?;
        fs::write(&problem_path, &task.problem)?;

        let args = self.expand_args(&domain_path, &problem_path);
        tracing::info!(program = %self.program.display(), ?args, "running external planner");
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(workdir.path())
            .output()
            .map_err(|e| {
                LemmingError::Planner(format!("failed to start {}: {}", self.program.display(), e))
            })?;

        let mut plans = Vec::new();
        for path in collect_plan_files(workdir.path())? {
            let text = fs::read_to_string(&path)?;
            let plan = parse_plan_file(&text);
            if !plan.is_empty() {
                plans.push(plan);
            }
        }

        if !output.status.success() && plans.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LemmingError::Planner(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let plans = self.select(plans);
        tracing::debug!(plans = plans.len(), "external planner finished");
        Ok(plans)
    }
}

/// All `sas_plan*` files below `dir`, ordered by their numeric suffix.
fn collect_plan_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("sas_plan"))
            {
                found.push(path);
            }
        }
    }
    found.sort_by_key(|p| {
        let suffix = p
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse::<u64>().ok())
            .unwrap_or(0);
        (suffix, p.clone())
    });
    Ok(found)
}

/// Read a plan in the usual `sas_plan` layout: one `(action args)` per line,
/// an optional `; cost = N (...)` trailer. Without a trailer the cost is the
/// plan length.
pub fn parse_plan_file(text: &str) -> Plan {
    let mut actions = Vec::new();
    let mut cost = None;
    for line in text.lines().map(str::trim) {
        if line.starts_with('(') {
            actions.push(line.to_lowercase());
        } else if let Some(rest) = line.strip_prefix(';') {
            if let Some(value) = rest.trim().strip_prefix("cost =") {
                cost = value
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse::<f64>().ok());
            }
        }
    }
    let cost = cost.unwrap_or(actions.len() as f64);
    Plan::new(actions, cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOMAIN: &str = "(define (domain d) (:predicates (p)) \
                          (:action a :parameters () :precondition () :effect (p)))";
    const PROBLEM: &str = "(define (problem x) (:domain d) (:init) (:goal (p)))";

    #[test]
    fn parses_plan_with_cost_trailer() {
        let plan = parse_plan_file("(Draft M1)\n(slack m1)\n; cost = 7 (general cost)\n");
        assert_eq!(plan.actions, vec!["(draft m1)", "(slack m1)"]);
        assert_eq!(plan.cost, 7.0);
    }

    #[test]
    fn plan_without_trailer_costs_its_length() {
        let plan = parse_plan_file("(a)\n(b)\n");
        assert_eq!(plan.cost, 2.0);
    }

    #[test]
    fn placeholders_are_expanded() {
        let planner = ExternalTopQ::from_command_line(
            "planner --k {k} --q {q} {domain} {problem}",
            TopQConfig {
                max_plans: 5,
                quality_bound: 1.5,
                ..TopQConfig::default()
            },
        )
        .unwrap();
        let args = planner.expand_args(Path::new("/w/domain.pddl"), Path::new("/w/problem.pddl"));
        assert_eq!(
            args,
            vec!["--k", "5", "--q", "1.5", "/w/domain.pddl", "/w/problem.pddl"]
        );
    }

    #[test]
    fn empty_command_line_is_rejected() {
        assert!(matches!(
            ExternalTopQ::from_command_line("  ", TopQConfig::default()),
            Err(LemmingError::InvalidInput(_))
        ));
    }

    #[test]
    fn plan_files_are_found_recursively_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("found_plans");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("sas_plan.2"), "(b)\n").unwrap();
        fs::write(nested.join("sas_plan.1"), "(a)\n").unwrap();
        fs::write(dir.path().join("other.txt"), "x").unwrap();
        let files = collect_plan_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["sas_plan.1", "sas_plan.2"]);
    }

    #[test]
    fn selection_applies_quality_and_dedup() {
        let planner = ExternalTopQ::new("unused", Vec::new(), TopQConfig::default());
        let plans = planner.select(vec![
            Plan::new(vec!["(b)".into(), "(c)".into()], 2.0),
            Plan::new(vec!["(a)".into()], 1.0),
            Plan::new(vec!["(A)".into()], 1.0),
        ]);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].actions, vec!["(a)"]);
    }

    #[cfg(unix)]
    #[test]
    fn runs_planner_in_scoped_directory() {
        let script = "mkdir -p found_plans && printf '(a)\\n; cost = 1 (unit cost)\\n' > found_plans/sas_plan.1";
        let planner = ExternalTopQ::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            TopQConfig::default(),
        );
        let plans = planner
            .search_topq(&PlanningTask::new(DOMAIN, PROBLEM))
            .unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].hash.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn failing_planner_without_plans_is_a_planner_error() {
        let planner = ExternalTopQ::new(
            "sh",
            vec!["-c".to_string(), "exit 3".to_string()],
            TopQConfig::default(),
        );
        assert!(matches!(
            planner.search_topq(&PlanningTask::new(DOMAIN, PROBLEM)),
            Err(LemmingError::Planner(_))
        ));
    }
}
