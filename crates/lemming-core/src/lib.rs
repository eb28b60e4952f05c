//! Lemming core: temporal goal compilation and landmark-driven plan
//! disambiguation.
//!
//! ```text
//! utterance ──► ltl::FormulaRanker ──► ranked LTLFormula
//!                                          │ (user picks)
//!                                          ▼
//! PlanningTask ──────────────────► compiler (lf2f | p4p) ──► compiled task
//!     │                                                          │
//!     │                                        planner::PlanSearch (top-q)
//!     │                                                          │
//!     │                                       fingerprint::hash_plans
//!     ▼                                                          ▼
//! landmarks::LandmarkExtractor ──► LandmarkGraph ──► disambiguator ◄── plans
//!                                                         │
//!                                     selection view | build forward/backward
//! ```
//!
//! Every stage is synchronous except the translator call. No stage keeps
//! state between requests; the plan hash is the only identity a client
//! carries from one call to the next.

pub mod compiler;
pub mod disambiguator;
pub mod error;
pub mod fingerprint;
pub mod landmarks;
pub mod ltl;
pub mod pddl;
pub mod pipeline;
pub mod planner;
pub mod scenario;
pub mod types;

pub use error::{ErrorKind, LemmingError, Result};
pub use types::{
    LTLFormula, LemmingTask, Ltl2PddlRequest, Plan, PlannerResponseModel, PlanningTask,
    Translation,
};
