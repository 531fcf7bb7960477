//! The question-answering session behind the command loop and the server.
//!
//! A [`Session`] takes one line at a time. Lines starting with a dot are
//! service commands, anything else is parsed as a sentence, reduced,
//! translated to SQL and run against the [`Persistor`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::earley::Chart;
use crate::error::Result;
use crate::forest::Parse;
use crate::grammar::{DEFAULT_START, Grammar, tokenize};
use crate::persist::Persistor;
use crate::settings::Settings;
use crate::sql::translate;

pub const BUILTIN_GRAMMAR: &str = include_str!("../grammars/food.grammar");

pub const HELP: &str = "\
Ask on some of your favourite food.
There are a few service commands:

  .init     Creates all tables
  .fini     Drops all tables
  .clear    Deletes all rows
  .dump     Dumps all tables
  .debug    Enables/disables NLP debugging
  .trace    Enables/disables SQL tracing
";

const OKAY: &str = "Okay.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Okay,
    NoParse,
    Ambiguous,
}

/// What the session has to say about one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub status: Status,
    /// Human readable output, one entry per line.
    pub lines: Vec<String>,
    /// SQL run for the line, in order.
    pub statements: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Reply {
    fn new(status: Status, lines: Vec<String>) -> Self {
        Self {
            status,
            lines,
            statements: Vec::new(),
            rows: Vec::new(),
        }
    }
    fn okay(mut lines: Vec<String>) -> Self {
        lines.push(OKAY.to_string());
        Self::new(Status::Okay, lines)
    }
}

pub struct Session {
    grammar: Arc<Grammar>,
    persistor: Persistor,
    start: String,
    debug: bool,
    trace: bool,
    max_derivations: usize,
}

impl Session {
    pub fn new(grammar: Arc<Grammar>, persistor: Persistor) -> Self {
        Self {
            grammar,
            persistor,
            start: DEFAULT_START.to_string(),
            debug: true,
            trace: true,
            max_derivations: 16,
        }
    }

    pub fn with_settings(grammar: Arc<Grammar>, persistor: Persistor, settings: &Settings) -> Self {
        Self {
            grammar,
            persistor,
            start: settings.grammar.start.clone(),
            debug: settings.session.debug,
            trace: settings.session.trace,
            max_derivations: settings.session.max_derivations,
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }
    pub fn persistor(&self) -> &Persistor {
        &self.persistor
    }
    pub fn debug(&self) -> bool {
        self.debug
    }
    pub fn trace(&self) -> bool {
        self.trace
    }

    pub fn execute(&mut self, line: &str) -> Result<Reply> {
        let line = line.trim();
        match line {
            "" => Ok(Reply::new(Status::Okay, Vec::new())),
            ".init" => {
                self.persistor.create_tables()?;
                Ok(Reply::okay(Vec::new()))
            }
            ".fini" => {
                self.persistor.drop_tables()?;
                Ok(Reply::okay(Vec::new()))
            }
            ".clear" => {
                self.persistor.clear_tables()?;
                Ok(Reply::okay(Vec::new()))
            }
            ".debug" => {
                self.debug = !self.debug;
                let state = if self.debug { "enabled" } else { "disabled" };
                Ok(Reply::okay(vec![format!("NLP debugging {}.", state)]))
            }
            ".trace" => {
                self.trace = !self.trace;
                let state = if self.trace { "enabled" } else { "disabled" };
                Ok(Reply::okay(vec![format!("SQL tracing {}.", state)]))
            }
            ".dump" => {
                let lines = self
                    .persistor
                    .dump()?
                    .into_iter()
                    .map(|fact| {
                        format!(
                            ": {}({}, {})",
                            fact.relation,
                            fact.arg0.as_deref().unwrap_or("NULL"),
                            fact.arg1.as_deref().unwrap_or("NULL")
                        )
                    })
                    .collect();
                Ok(Reply::okay(lines))
            }
            _ => self.answer(line),
        }
    }

    fn answer(&self, sentence: &str) -> Result<Reply> {
        let tokens = tokenize(sentence);
        if tokens.join(" ") == "what is the meaning of life" {
            return Ok(Reply::okay(vec!["42.".to_string()]));
        }

        let chart = Chart::build(&self.grammar, &self.start, &tokens)?;
        // two are enough to tell an ambiguous sentence apart
        let parses: Vec<Parse> = chart
            .derivations()
            .take(self.max_derivations.max(2))
            .collect();
        debug!(sentence, items = chart.item_count(), parses = parses.len(), "sentence charted");

        match parses.len() {
            0 => {
                warn!(sentence, "no parse");
                Ok(Reply::new(
                    Status::NoParse,
                    vec!["(!) Unable to parse query.".to_string()],
                ))
            }
            1 => self.evaluate(sentence, &parses[0]),
            n => {
                warn!(sentence, parses = n, "ambiguous sentence");
                let mut lines = vec!["(!) Query is ambiguous.".to_string()];
                lines.extend(parses.iter().map(|parse| format!("     {}", parse.tree.bracketed())));
                Ok(Reply::new(Status::Ambiguous, lines))
            }
        }
    }

    fn evaluate(&self, sentence: &str, parse: &Parse) -> Result<Reply> {
        let reduced = parse.semantics.beta_reduce();
        let mut lines = Vec::new();
        if self.debug {
            lines.push(format!("T= {}", sentence));
            lines.push(format!("Q= {}", parse.tree.bracketed()));
            lines.push(format!("S= {}", parse.semantics));
            lines.push(format!("S= {}", reduced));
        }
        let statements = translate(&reduced)?;
        let mut rows = Vec::new();
        for statement in &statements {
            if self.trace {
                lines.push(format!("< {}", statement));
            }
            for row in self.persistor.execute(statement)? {
                lines.push(format!(": {}", row.join(" ")));
                rows.push(row);
            }
        }
        info!(sentence, semantics = %reduced, statements = statements.len(), rows = rows.len(), "sentence answered");
        let mut reply = Reply::okay(lines);
        reply.statements = statements;
        reply.rows = rows;
        Ok(reply)
    }
}
