//! Structured PDDL domain and problem, read from and written back to text.
//!
//! Conditions and effects stay as [`SExpr`] trees; only the declarations the
//! compiler and grounder need are broken out into fields.

use std::fmt::Write as _;

use super::sexpr::{parse_one, SExpr};
use crate::error::{LemmingError, Result};

pub const OBJECT_TYPE: &str = "object";

/// A name with its declared type (`?x - block`, `a - block`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedName {
    pub name: String,
    pub ty: String,
}

impl TypedName {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub name: String,
    pub params: Vec<TypedName>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub params: Vec<TypedName>,
    pub precondition: Option<SExpr>,
    pub effect: Option<SExpr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub requirements: Vec<String>,
    pub types: Vec<TypedName>,
    pub constants: Vec<TypedName>,
    pub predicates: Vec<Predicate>,
    /// `:functions` section kept verbatim.
    pub functions: Option<SExpr>,
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub name: String,
    pub domain: String,
    pub requirements: Vec<String>,
    pub objects: Vec<TypedName>,
    pub init: Vec<SExpr>,
    pub goal: SExpr,
    pub metric: Option<SExpr>,
}

fn parse_err(msg: impl Into<String>) -> LemmingError {
    LemmingError::Parse(msg.into())
}

/// Split `(define (<kind> <name>) sections...)` into name and sections.
fn define_block<'a>(expr: &'a SExpr, kind: &str) -> Result<(String, &'a [SExpr])> {
    let items = expr
        .as_list()
        .ok_or_else(|| parse_err("expected (define ...)"))?;
    if items.first().and_then(SExpr::as_atom) != Some("define") {
        return Err(parse_err("expected (define ...)"));
    }
    let header = items
        .get(1)
        .and_then(SExpr::as_list)
        .ok_or_else(|| parse_err(format!("expected ({} <name>)", kind)))?;
    match header {
        [SExpr::Atom(k), SExpr::Atom(name)] if k == kind => Ok((name.clone(), &items[2..])),
        _ => Err(parse_err(format!("expected ({} <name>)", kind))),
    }
}

fn section(expr: &SExpr) -> Result<(&str, &[SExpr])> {
    let items = expr
        .as_list()
        .ok_or_else(|| parse_err(format!("expected a section, found `{}`", expr)))?;
    match items.split_first() {
        Some((SExpr::Atom(key), rest)) if key.starts_with(':') => Ok((key.as_str(), rest)),
        _ => Err(parse_err(format!("expected a section, found `{}`", expr))),
    }
}

fn atoms(items: &[SExpr], what: &str) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| {
            item.as_atom()
                .map(str::to_string)
                .ok_or_else(|| parse_err(format!("expected atom in {}, found `{}`", what, item)))
        })
        .collect()
}

/// Parse `a b - t c - u d` into typed names; untyped names default to `object`.
pub fn parse_typed_list(items: &[SExpr]) -> Result<Vec<TypedName>> {
    let mut out = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        match item {
            SExpr::Atom(a) if a == "-" => {
                let ty = match iter.next() {
                    Some(SExpr::Atom(t)) => t.clone(),
                    Some(SExpr::List(l)) if l.first().and_then(SExpr::as_atom) == Some("either") => {
                        return Err(LemmingError::UnsupportedFeature(
                            "either types".to_string(),
                        ))
                    }
                    _ => return Err(parse_err("expected a type after `-`")),
                };
                if pending.is_empty() {
                    return Err(parse_err(format!("type `{}` has no names", ty)));
                }
                out.extend(pending.drain(..).map(|n| TypedName::new(n, ty.clone())));
            }
            SExpr::Atom(a) => pending.push(a.clone()),
            SExpr::List(_) => return Err(parse_err(format!("unexpected `{}` in typed list", item))),
        }
    }
    out.extend(pending.into_iter().map(|n| TypedName::new(n, OBJECT_TYPE)));
    Ok(out)
}

fn parse_action(items: &[SExpr]) -> Result<Action> {
    let (name, rest) = match items.split_first() {
        Some((SExpr::Atom(name), rest)) => (name.clone(), rest),
        _ => return Err(parse_err("expected action name")),
    };
    let mut action = Action {
        name,
        params: Vec::new(),
        precondition: None,
        effect: None,
    };
    let mut iter = rest.iter();
    while let Some(key) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| parse_err(format!("missing value for `{}` in {}", key, action.name)))?;
        match key.as_atom() {
            Some(":parameters") => {
                let list = value
                    .as_list()
                    .ok_or_else(|| parse_err("expected parameter list"))?;
                action.params = parse_typed_list(list)?;
            }
            Some(":precondition") => action.precondition = non_empty(value),
            Some(":effect") => action.effect = non_empty(value),
            _ => {
                return Err(parse_err(format!(
                    "unexpected `{}` in action {}",
                    key, action.name
                )))
            }
        }
    }
    Ok(action)
}

fn non_empty(expr: &SExpr) -> Option<SExpr> {
    match expr {
        SExpr::List(items) if items.is_empty() => None,
        other => Some(other.clone()),
    }
}

impl Domain {
    pub fn parse(text: &str) -> Result<Self> {
        let expr = parse_one(text).map_err(LemmingError::Parse)?;
        let (name, sections) = define_block(&expr, "domain")?;
        let mut domain = Domain {
            name,
            requirements: Vec::new(),
            types: Vec::new(),
            constants: Vec::new(),
            predicates: Vec::new(),
            functions: None,
            actions: Vec::new(),
        };
        for sec in sections {
            let (key, body) = section(sec)?;
            match key {
                ":requirements" => domain.requirements = atoms(body, ":requirements")?,
                ":types" => domain.types = parse_typed_list(body)?,
                ":constants" => domain.constants = parse_typed_list(body)?,
                ":predicates" => {
                    for pred in body {
                        match pred.as_list().and_then(|l| l.split_first()) {
                            Some((SExpr::Atom(name), params)) => domain.predicates.push(Predicate {
                                name: name.clone(),
                                params: parse_typed_list(params)?,
                            }),
                            _ => return Err(parse_err(format!("bad predicate `{}`", pred))),
                        }
                    }
                }
                ":functions" => domain.functions = Some(sec.clone()),
                ":action" => domain.actions.push(parse_action(body)?),
                other => {
                    return Err(LemmingError::UnsupportedFeature(format!(
                        "domain section {}",
                        other
                    )))
                }
            }
        }
        Ok(domain)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn predicate(&self, name: &str) -> Option<&Predicate> {
        self.predicates.iter().find(|p| p.name == name)
    }

    /// Add a requirement flag unless already declared.
    pub fn require(&mut self, flag: &str) {
        if !self.requirements.iter().any(|r| r == flag) {
            self.requirements.push(flag.to_string());
        }
    }

    pub fn to_pddl(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "(define (domain {})", self.name);
        if !self.requirements.is_empty() {
            let _ = writeln!(out, "  (:requirements {})", self.requirements.join(" "));
        }
        if !self.types.is_empty() {
            let _ = writeln!(out, "  (:types {})", typed_list_text(&self.types));
        }
        if !self.constants.is_empty() {
            let _ = writeln!(out, "  (:constants {})", typed_list_text(&self.constants));
        }
        out.push_str("  (:predicates\n");
        for pred in &self.predicates {
            if pred.params.is_empty() {
                let _ = writeln!(out, "    ({})", pred.name);
            } else {
                let _ = writeln!(out, "    ({} {})", pred.name, typed_list_text(&pred.params));
            }
        }
        out.push_str("  )\n");
        if let Some(functions) = &self.functions {
            let _ = writeln!(out, "  {}", functions);
        }
        for action in &self.actions {
            let _ = writeln!(out, "  (:action {}", action.name);
            let _ = writeln!(out, "    :parameters ({})", typed_list_text(&action.params));
            if let Some(pre) = &action.precondition {
                let _ = writeln!(out, "    :precondition {}", pre);
            }
            if let Some(eff) = &action.effect {
                let _ = writeln!(out, "    :effect {}", eff);
            }
            out.push_str("  )\n");
        }
        out.push_str(")\n");
        out
    }
}

impl Problem {
    pub fn parse(text: &str) -> Result<Self> {
        let expr = parse_one(text).map_err(LemmingError::Parse)?;
        let (name, sections) = define_block(&expr, "problem")?;
        let mut domain = None;
        let mut requirements = Vec::new();
        let mut objects = Vec::new();
        let mut init = Vec::new();
        let mut goal = None;
        let mut metric = None;
        for sec in sections {
            let (key, body) = section(sec)?;
            match key {
                ":domain" => domain = atoms(body, ":domain")?.into_iter().next(),
                ":requirements" => requirements = atoms(body, ":requirements")?,
                ":objects" => objects = parse_typed_list(body)?,
                ":init" => init = body.to_vec(),
                ":goal" => {
                    goal = Some(
                        body.first()
                            .cloned()
                            .ok_or_else(|| parse_err("empty :goal"))?,
                    )
                }
                ":metric" => metric = Some(SExpr::List(body.to_vec())),
                other => {
                    return Err(LemmingError::UnsupportedFeature(format!(
                        "problem section {}",
                        other
                    )))
                }
            }
        }
        Ok(Problem {
            name,
            domain: domain.ok_or_else(|| parse_err("problem has no :domain"))?,
            requirements,
            objects,
            init,
            goal: goal.ok_or_else(|| parse_err("problem has no :goal"))?,
            metric,
        })
    }

    /// The goal as a flat list of conjuncts.
    pub fn goal_conjuncts(&self) -> Vec<SExpr> {
        conjuncts(&self.goal)
    }

    pub fn to_pddl(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "(define (problem {})", self.name);
        let _ = writeln!(out, "  (:domain {})", self.domain);
        if !self.requirements.is_empty() {
            let _ = writeln!(out, "  (:requirements {})", self.requirements.join(" "));
        }
        if !self.objects.is_empty() {
            let _ = writeln!(out, "  (:objects {})", typed_list_text(&self.objects));
        }
        out.push_str("  (:init\n");
        for fact in &self.init {
            let _ = writeln!(out, "    {}", fact);
        }
        out.push_str("  )\n");
        let _ = writeln!(out, "  (:goal {})", self.goal);
        if let Some(SExpr::List(items)) = &self.metric {
            let body: Vec<String> = items.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "  (:metric {})", body.join(" "));
        }
        out.push_str(")\n");
        out
    }
}

/// Flatten nested `(and ...)` into its conjuncts.
pub fn conjuncts(expr: &SExpr) -> Vec<SExpr> {
    match expr {
        SExpr::List(items) if items.first().and_then(SExpr::as_atom) == Some("and") => {
            items[1..].iter().flat_map(conjuncts).collect()
        }
        SExpr::List(items) if items.is_empty() => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Build `(and ...)` from conjuncts, collapsing the trivial cases.
pub fn and(mut parts: Vec<SExpr>) -> SExpr {
    match parts.len() {
        0 => SExpr::List(vec![SExpr::atom("and")]),
        1 => parts.remove(0),
        _ => {
            let mut items = vec![SExpr::atom("and")];
            items.extend(parts);
            SExpr::List(items)
        }
    }
}

pub fn not(expr: SExpr) -> SExpr {
    SExpr::List(vec![SExpr::atom("not"), expr])
}

fn typed_list_text(items: &[TypedName]) -> String {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < items.len() {
        let ty = &items[i].ty;
        let mut j = i;
        while j < items.len() && &items[j].ty == ty {
            parts.push(items[j].name.clone());
            j += 1;
        }
        if ty != OBJECT_TYPE || items.iter().any(|t| t.ty != OBJECT_TYPE) {
            parts.push("-".to_string());
            parts.push(ty.clone());
        }
        i = j;
    }
    parts.join(" ")
}
