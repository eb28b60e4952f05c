//! S-expression reader for PDDL source.
//!
//! PDDL is case-insensitive, so atoms are lower-cased on the way in.
//! Comments run from `;` to end of line.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{all_consuming, cut, map, value},
    error::{context, ContextError, ParseError as NomParseError, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn atom(s: impl Into<String>) -> Self {
        SExpr::Atom(s.into())
    }

    pub fn list(items: Vec<SExpr>) -> Self {
        SExpr::List(items)
    }

    /// `(head args...)` with every argument an atom.
    pub fn call(head: &str, args: &[&str]) -> Self {
        let mut items = vec![SExpr::atom(head)];
        items.extend(args.iter().map(|a| SExpr::atom(*a)));
        SExpr::List(items)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) => Some(s),
            SExpr::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            SExpr::Atom(_) => None,
        }
    }

    /// The leading atom of a list, if any.
    pub fn head(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExpr::as_atom)
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(s) => write!(f, "{}", s),
            SExpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Deepest list nesting the reader accepts.
pub const MAX_DEPTH: usize = 64;

/// Parse every top-level expression in `input`.
pub fn parse_sexprs(input: &str) -> Result<Vec<SExpr>, String> {
    check_depth(input)?;
    match all_consuming(document::<VerboseError<&str>>)(input) {
        Ok((_, exprs)) => Ok(exprs),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(nom::error::convert_error(input, e))
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete input".to_string()),
    }
}

/// Parse exactly one top-level expression.
pub fn parse_one(input: &str) -> Result<SExpr, String> {
    let mut exprs = parse_sexprs(input)?;
    match exprs.len() {
        1 => Ok(exprs.remove(0)),
        0 => Err("expected one s-expression, found none".to_string()),
        n => Err(format!("expected one s-expression, found {}", n)),
    }
}

/// Reject over-deep nesting before the recursive reader sees it.
fn check_depth(input: &str) -> Result<(), String> {
    let mut depth = 0usize;
    for (line_no, line) in input.lines().enumerate() {
        let code = line.split(';').next().unwrap_or_default();
        for c in code.chars() {
            match c {
                '(' => {
                    depth += 1;
                    if depth > MAX_DEPTH {
                        return Err(format!(
                            "line {}: lists nested deeper than {} levels",
                            line_no + 1,
                            MAX_DEPTH
                        ));
                    }
                }
                ')' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    Ok(())
}

fn document<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Vec<SExpr>, E> {
    delimited(skip, many0(terminated(sexpr, skip)), skip)(input)
}

fn skip<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char(';'), take_while(|c| c != '\n'))),
        ))),
    )(input)
}

fn sexpr<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, SExpr, E> {
    alt((list, atom))(input)
}

fn list<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, SExpr, E> {
    map(
        delimited(
            char('('),
            many0(preceded(skip, sexpr)),
            preceded(skip, cut(context("closing parenthesis", char(')')))),
        ),
        SExpr::List,
    )(input)
}

fn atom<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, SExpr, E> {
    map(
        take_while1(|c: char| !c.is_whitespace() && c != '(' && c != ')' && c != ';'),
        |s: &str| SExpr::Atom(s.to_lowercase()),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_lists() {
        let expr = parse_one("(and (On A B) (not (clear ?x)))").unwrap();
        assert_eq!(
            expr,
            SExpr::list(vec![
                SExpr::atom("and"),
                SExpr::call("on", &["a", "b"]),
                SExpr::list(vec![SExpr::atom("not"), SExpr::call("clear", &["?x"])]),
            ])
        );
    }

    #[test]
    fn skips_comments() {
        let exprs = parse_sexprs("; header\n(a) ; trailing\n(b)\n").unwrap();
        assert_eq!(exprs.len(), 2);
    }

    #[test]
    fn display_is_compact() {
        let expr = parse_one("(  at   ?r   room-1 )").unwrap();
        assert_eq!(expr.to_string(), "(at ?r room-1)");
    }

    #[test]
    fn unbalanced_input_is_an_error() {
        assert!(parse_sexprs("(define (domain x)").is_err());
        assert!(parse_sexprs("(a))").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |depth: usize| format!("{}{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_one(&nested(MAX_DEPTH)).is_ok());
        let err = parse_one(&nested(200_000)).unwrap_err();
        assert!(err.contains("nested deeper"));
        // parentheses inside comments do not count
        let commented = format!("; {}\n(a)", "(".repeat(MAX_DEPTH + 1));
        assert!(parse_one(&commented).is_ok());
    }

    #[test]
    fn empty_list() {
        assert_eq!(parse_one("()").unwrap(), SExpr::List(vec![]));
    }
}
