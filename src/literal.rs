//! Parsing of logical form literals, as written in grammar files.
//!
//! Single letters are variables (`x` individual, `P` functional),
//! capitalized words are symbols. `f(a,b)` is sugar for `f(a)(b)`.
//! Connectives bind `!` tighter than `&&` tighter than `||`, binary ones
//! associate to the left.

use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::error::{MontagueError, Result};
use crate::logic::LogicalForm;

#[derive(Parser)]
#[grammar = "literal.pest"]
struct LiteralParser;

// ------------- Connectives -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Connective {
    Not,
    And,
    Or,
}

impl Connective {
    fn priority(self) -> u8 {
        match self {
            Connective::Not => 2,
            Connective::And => 1,
            Connective::Or => 0,
        }
    }
}

fn fold(operands: &mut Vec<LogicalForm>, connectives: &mut Vec<Connective>) -> Result<()> {
    let missing = || MontagueError::Invariant("connective without operand".into());
    let connective = connectives.pop().ok_or_else(missing)?;
    let rhs = operands.pop().ok_or_else(missing)?;
    let folded = match connective {
        Connective::Not => LogicalForm::not(rhs),
        Connective::And => LogicalForm::and(operands.pop().ok_or_else(missing)?, rhs),
        Connective::Or => LogicalForm::or(operands.pop().ok_or_else(missing)?, rhs),
    };
    operands.push(folded);
    Ok(())
}

// ------------- Tree walk -------------
pub fn parse_logical_form(source: &str) -> Result<LogicalForm> {
    let mut pairs = LiteralParser::parse(Rule::logical_form, source).map_err(|e| {
        let (line, col) = match e.line_col {
            LineColLocation::Pos(position) => position,
            LineColLocation::Span(start, _) => start,
        };
        MontagueError::Parse {
            message: format!("'{}': {}", source, e.variant.message()),
            line: Some(line),
            col: Some(col),
        }
    })?;
    let root = first_inner(next_pair(&mut pairs)?)?;
    build(root)
}

fn next_pair<'i>(pairs: &mut impl Iterator<Item = Pair<'i, Rule>>) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| MontagueError::Invariant("literal parse tree is truncated".into()))
}

fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>> {
    next_pair(&mut pair.into_inner())
}

fn build(pair: Pair<Rule>) -> Result<LogicalForm> {
    match pair.as_rule() {
        Rule::expression | Rule::parenthesized => build(first_inner(pair)?),
        Rule::lambda => {
            let mut inner = pair.into_inner();
            let bound = next_pair(&mut inner)?.as_str().to_string();
            let body = build(next_pair(&mut inner)?)?;
            Ok(LogicalForm::lambda(bound, body))
        }
        Rule::formula => build_formula(pair),
        Rule::application => {
            let mut inner = pair.into_inner();
            let mut node = build(next_pair(&mut inner)?)?;
            for arguments in inner {
                for argument in arguments.into_inner() {
                    node = LogicalForm::apply(node, build(argument)?);
                }
            }
            Ok(node)
        }
        Rule::symbol => Ok(LogicalForm::symbol(pair.as_str())),
        Rule::variable => Ok(LogicalForm::variable(pair.as_str())),
        other => Err(MontagueError::Invariant(format!(
            "unexpected {:?} in literal parse tree",
            other
        ))),
    }
}

fn build_formula(pair: Pair<Rule>) -> Result<LogicalForm> {
    let mut operands: Vec<LogicalForm> = Vec::new();
    let mut connectives: Vec<Connective> = Vec::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::operand => {
                for piece in part.into_inner() {
                    match piece.as_rule() {
                        // prefix, so there is nothing to its left to fold yet
                        Rule::negation => connectives.push(Connective::Not),
                        _ => operands.push(build(piece)?),
                    }
                }
            }
            Rule::and | Rule::or => {
                let connective = if part.as_rule() == Rule::and {
                    Connective::And
                } else {
                    Connective::Or
                };
                while connectives
                    .last()
                    .is_some_and(|top| top.priority() >= connective.priority())
                {
                    fold(&mut operands, &mut connectives)?;
                }
                connectives.push(connective);
            }
            other => {
                return Err(MontagueError::Invariant(format!(
                    "unexpected {:?} in formula",
                    other
                )));
            }
        }
    }
    while !connectives.is_empty() {
        fold(&mut operands, &mut connectives)?;
    }
    match (operands.pop(), operands.is_empty()) {
        (Some(formula), true) => Ok(formula),
        _ => Err(MontagueError::Invariant("unbalanced formula".into())),
    }
}

impl std::str::FromStr for LogicalForm {
    type Err = MontagueError;

    fn from_str(s: &str) -> Result<Self> {
        parse_logical_form(s)
    }
}
