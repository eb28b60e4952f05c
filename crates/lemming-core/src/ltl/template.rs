//! DECLARE templates and formulas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LemmingError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeclareTemplate {
    Existence,
    ExistenceTwo,
    Absence,
    Init,
    End,
    RespondedExistence,
    Response,
    Precedence,
    Succession,
    ChainResponse,
    ChainPrecedence,
    NotCoExistence,
    ExclusiveChoice,
}

impl DeclareTemplate {
    pub const ALL: [DeclareTemplate; 13] = [
        Self::Existence,
        Self::ExistenceTwo,
        Self::Absence,
        Self::Init,
        Self::End,
        Self::RespondedExistence,
        Self::Response,
        Self::Precedence,
        Self::Succession,
        Self::ChainResponse,
        Self::ChainPrecedence,
        Self::NotCoExistence,
        Self::ExclusiveChoice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Existence => "Existence",
            Self::ExistenceTwo => "ExistenceTwo",
            Self::Absence => "Absence",
            Self::Init => "Init",
            Self::End => "End",
            Self::RespondedExistence => "RespondedExistence",
            Self::Response => "Response",
            Self::Precedence => "Precedence",
            Self::Succession => "Succession",
            Self::ChainResponse => "ChainResponse",
            Self::ChainPrecedence => "ChainPrecedence",
            Self::NotCoExistence => "NotCoExistence",
            Self::ExclusiveChoice => "ExclusiveChoice",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Existence | Self::ExistenceTwo | Self::Absence | Self::Init | Self::End => 1,
            _ => 2,
        }
    }

    /// Templates constraining what happens *immediately* next.
    pub fn is_chain(self) -> bool {
        matches!(self, Self::ChainResponse | Self::ChainPrecedence)
    }

    /// Description with `{A}`/`{B}` placeholders.
    pub fn description(self) -> &'static str {
        match self {
            Self::Existence => "{A} happens at least once.",
            Self::ExistenceTwo => "{A} happens at least twice.",
            Self::Absence => "{A} never happens.",
            Self::Init => "The first thing to happen is {A}.",
            Self::End => "The last thing to happen is {A}.",
            Self::RespondedExistence => "If {A} happens, {B} happens as well.",
            Self::Response => "Whenever {A} happens, {B} happens afterward.",
            Self::Precedence => "{B} happens only if {A} has happened before.",
            Self::Succession => {
                "Whenever {A} happens, {B} happens afterward, and {B} happens only after {A}."
            }
            Self::ChainResponse => "Whenever {A} happens, {B} happens immediately after.",
            Self::ChainPrecedence => "{B} happens only immediately after {A}.",
            Self::NotCoExistence => "{A} and {B} never both happen.",
            Self::ExclusiveChoice => "Exactly one of {A} and {B} happens.",
        }
    }
}

impl fmt::Display for DeclareTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeclareTemplate {
    type Err = LemmingError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let key = if key == "existence2" { "existencetwo".to_string() } else { key };
        Self::ALL
            .into_iter()
            .find(|t| t.name().to_lowercase() == key)
            .ok_or_else(|| LemmingError::InvalidInput(format!("unknown DECLARE template `{}`", s)))
    }
}

/// A template applied to concrete activity names.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclareFormula {
    pub template: DeclareTemplate,
    pub activities: Vec<String>,
}

impl DeclareFormula {
    pub fn new(template: DeclareTemplate, activities: Vec<String>) -> Result<Self> {
        if activities.len() != template.arity() {
            return Err(LemmingError::InvalidInput(format!(
                "{} takes {} activit{}, got {}",
                template,
                template.arity(),
                if template.arity() == 1 { "y" } else { "ies" },
                activities.len()
            )));
        }
        if let Some(bad) = activities.iter().find(|a| a.is_empty()) {
            return Err(LemmingError::InvalidInput(format!("empty activity `{}`", bad)));
        }
        Ok(Self {
            template,
            activities,
        })
    }

    pub fn a(&self) -> &str {
        &self.activities[0]
    }

    /// Second activity; the first one for unary templates.
    pub fn b(&self) -> &str {
        self.activities.get(1).unwrap_or(&self.activities[0])
    }

    pub fn describe(&self) -> String {
        self.template
            .description()
            .replace("{A}", self.a())
            .replace("{B}", self.b())
    }
}

impl fmt::Display for DeclareFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.template)?;
        for activity in &self.activities {
            write!(f, " {}", activity)?;
        }
        Ok(())
    }
}

/// Accepts `Response Slack Gmail` and `Response(Slack, Gmail)`.
impl FromStr for DeclareFormula {
    type Err = LemmingError;

    fn from_str(s: &str) -> Result<Self> {
        let cleaned = s.replace(['(', ')', ','], " ");
        let mut parts = cleaned.split_whitespace();
        let template: DeclareTemplate = parts
            .next()
            .ok_or_else(|| LemmingError::InvalidInput("empty formula".to_string()))?
            .parse()?;
        DeclareFormula::new(template, parts.map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_both_formula_spellings() {
        let plain: DeclareFormula = "Response Slack Gmail".parse().unwrap();
        let call: DeclareFormula = "response(Slack, Gmail)".parse().unwrap();
        assert_eq!(plain, call);
        assert_eq!(plain.to_string(), "Response Slack Gmail");
    }

    #[test]
    fn arity_is_checked() {
        assert!("Existence Slack Gmail".parse::<DeclareFormula>().is_err());
        assert!("Response Slack".parse::<DeclareFormula>().is_err());
        assert!("Eventually Slack".parse::<DeclareFormula>().is_err());
    }

    #[test]
    fn description_fills_placeholders() {
        let f: DeclareFormula = "Precedence Draft Slack".parse().unwrap();
        assert_eq!(f.describe(), "Slack happens only if Draft has happened before.");
    }

    #[test]
    fn template_names_round_trip() {
        for t in DeclareTemplate::ALL {
            assert_eq!(t.name().parse::<DeclareTemplate>().unwrap(), t);
        }
        assert_eq!(
            "existence2".parse::<DeclareTemplate>().unwrap(),
            DeclareTemplate::ExistenceTwo
        );
    }
}
