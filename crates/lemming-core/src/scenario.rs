//! Scenario fixtures on disk.
//!
//! ```text
//! <data>/<name>/domain.pddl    required
//! <data>/<name>/problem.pddl   required
//! <data>/<name>/plans.json     optional, `[Plan]` or `{"plans": [Plan]}`
//! <data>/<name>/prompt.json    optional, PromptConfig or `[Translation]`
//! ```
//!
//! Optional files that are missing or broken degrade to empty with a warning.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{LemmingError, Result};
use crate::fingerprint::hash_plans;
use crate::ltl::PromptConfig;
use crate::types::{LemmingTask, Plan, PlanningTask};

pub const DOMAIN_FILE: &str = "domain.pddl";
pub const PROBLEM_FILE: &str = "problem.pddl";
pub const PLANS_FILE: &str = "plans.json";
pub const PROMPT_FILE: &str = "prompt.json";

#[derive(Deserialize)]
#[serde(untagged)]
enum PlansFile {
    List(Vec<Plan>),
    Wrapped { plans: Vec<Plan> },
}

/// Read-only view of the scenario data directory.
#[derive(Debug, Clone)]
pub struct ScenarioStore {
    root: PathBuf,
}

impl ScenarioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the sub-directories that carry a domain file, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().join(DOMAIN_FILE).is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        debug!(count = names.len(), root = %self.root.display(), "listed scenarios");
        Ok(names)
    }

    /// Domain, problem, stored plans and prompts of one scenario.
    pub fn load(&self, name: &str) -> Result<LemmingTask> {
        let dir = self.scenario_dir(name)?;
        let domain = read_required(&dir.join(DOMAIN_FILE))?;
        let problem = read_required(&dir.join(PROBLEM_FILE))?;
        let plans = load_plans(&dir.join(PLANS_FILE));
        let nl_prompts = load_prompt(&dir.join(PROMPT_FILE))
            .map(|p| p.examples)
            .unwrap_or_default();
        info!(
            scenario = name,
            plans = plans.len(),
            prompts = nl_prompts.len(),
            "loaded scenario"
        );
        Ok(LemmingTask {
            planning_task: PlanningTask::new(domain, problem),
            plans,
            nl_prompts,
        })
    }

    /// The scenario's prompt configuration, or the default prompt when it
    /// has none.
    pub fn prompt_config(&self, name: &str) -> Result<PromptConfig> {
        let dir = self.scenario_dir(name)?;
        Ok(load_prompt(&dir.join(PROMPT_FILE)).unwrap_or_default())
    }

    /// Resolve a client-supplied relative path; it must exist and stay
    /// inside the data directory.
    pub fn resolve_path(&self, relative: &str) -> Result<PathBuf> {
        let candidate = Path::new(relative.trim());
        if relative.trim().is_empty() || candidate.is_absolute() {
            return Err(LemmingError::InvalidInput(format!(
                "`{}` is not a relative data path",
                relative
            )));
        }
        let root = self.root.canonicalize()?;
        let resolved = root.join(candidate).canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => LemmingError::NotFound(relative.to_string()),
            _ => LemmingError::Io(e),
        })?;
        if !resolved.starts_with(&root) {
            return Err(LemmingError::InvalidInput(format!(
                "`{}` escapes the data directory",
                relative
            )));
        }
        Ok(resolved)
    }

    /// Read a domain/problem pair given as data-relative paths.
    pub fn read_task(&self, domain: &str, problem: &str) -> Result<PlanningTask> {
        let domain = read_required(&self.resolve_path(domain)?)?;
        let problem = read_required(&self.resolve_path(problem)?)?;
        Ok(PlanningTask::new(domain, problem))
    }

    fn scenario_dir(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        let legal = !name.trim().is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0'])
            && matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !legal {
            return Err(LemmingError::InvalidInput(format!(
                "illegal scenario name `{}`",
                name
            )));
        }
        Ok(self.root.join(name))
    }
}

fn read_required(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LemmingError::NotFound(path.display().to_string()),
        _ => LemmingError::Io(e),
    })
}

fn load_plans(path: &Path) -> Vec<Plan> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "no stored plans");
            return Vec::new();
        }
    };
    match serde_json::from_str::<PlansFile>(&text) {
        Ok(PlansFile::List(plans)) | Ok(PlansFile::Wrapped { plans }) => hash_plans(plans),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable plans file");
            Vec::new()
        }
    }
}

fn load_prompt(path: &Path) -> Option<PromptConfig> {
    match PromptConfig::load(path) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "no usable prompt config");
            None
        }
    }
}
