//! Error taxonomy for the Lemming pipeline.
//!
//! Every stage reports through [`LemmingError`]. Variants fall into four
//! families (see [`ErrorKind`]) so that callers can tell "you asked wrong"
//! from "we couldn't compute it" from "a backend fell over". Empty results
//! (no formulas, no plans, no landmarks) are never errors.

use thiserror::Error;

/// Coarse classification of a [`LemmingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is wrong (empty task, unknown category, bad selection).
    ClientInput,
    /// A stage could not produce a value for structurally valid input.
    Unprocessable,
    /// The translator or planner backend failed.
    ExternalFault,
    /// Bug or environment failure inside the service.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientInput => "client_input",
            Self::Unprocessable => "unprocessable",
            Self::ExternalFault => "external_fault",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum LemmingError {
    #[error("domain or problem is empty")]
    EmptyTask,

    #[error("invalid landmark category: {0}")]
    InvalidCategory(String),

    #[error("invalid compiler tool: {0}")]
    InvalidTool(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("PDDL parse error: {0}")]
    Parse(String),

    #[error("unsupported PDDL feature: {0}")]
    UnsupportedFeature(String),

    #[error("unresolved proposition `{activity}` in formula `{formula}`")]
    UnresolvedProposition { activity: String, formula: String },

    #[error("tool `{tool}` cannot encode template `{template}`")]
    UnsupportedTool { tool: String, template: String },

    #[error("landmark orderings contain a cycle through landmark {0}")]
    LandmarkCycle(usize),

    #[error("unprocessable entity: {0}")]
    Unprocessable(String),

    #[error("translation failed: {0}")]
    Translation(String),

    #[error("planner failed: {0}")]
    Planner(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LemmingError>;

impl LemmingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyTask
            | Self::InvalidCategory(_)
            | Self::InvalidTool(_)
            | Self::InvalidSelection(_)
            | Self::InvalidInput(_)
            | Self::NotFound(_) => ErrorKind::ClientInput,
            Self::Parse(_)
            | Self::UnsupportedFeature(_)
            | Self::UnresolvedProposition { .. }
            | Self::UnsupportedTool { .. }
            | Self::LandmarkCycle(_)
            | Self::Unprocessable(_) => ErrorKind::Unprocessable,
            Self::Translation(_) | Self::Planner(_) => ErrorKind::ExternalFault,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            _ => match self.kind() {
                ErrorKind::ClientInput => 400,
                ErrorKind::Unprocessable => 422,
                ErrorKind::ExternalFault => 502,
                ErrorKind::Internal => 500,
            },
        }
    }
}
