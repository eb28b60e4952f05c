//! Natural language → DECLARE formulas.
//!
//! ```text
//! utterance ──► FormulaRanker ──► Translator (OpenAI | cue phrases)
//!                    │                 ▲
//!                    │                 └── PromptConfig (few-shot, fingerprinted)
//!                    ▼
//!            Vec<LTLFormula> (confidence desc)
//! ```

pub mod cue;
pub mod openai;
pub mod prompt;
pub mod ranker;
pub mod template;

pub use cue::CuePhraseTranslator;
pub use openai::OpenAiTranslator;
pub use prompt::PromptConfig;
pub use ranker::{FormulaRanker, Translator};
pub use template::{DeclareFormula, DeclareTemplate};
