//! Montague – Earley parsing with compositional lambda-calculus semantics.
//!
//! A sentence is parsed with a general context-free [`grammar::Grammar`]
//! whose productions each carry a logical form template. Every derivation
//! of the sentence comes back paired with the logical form composed along
//! it, in the style of Montague grammar:
//! * A [`logic::LogicalForm`] is an immutable lambda-calculus / first-order
//!   logic term supporting free-variable computation, capture-avoiding
//!   substitution and beta-reduction.
//! * A [`grammar::Production`] binds the semantics of its non-terminals to
//!   variables of its template (`VP:\y.Likes(y,o) -> likes NP:o`).
//! * The [`earley::Chart`] recognizes any context-free grammar, ambiguous
//!   and recursive ones included, in cubic time.
//! * The [`forest`] module walks the chart's backlinks lazily, so each
//!   distinct derivation is produced exactly once and only on demand.
//!
//! ## Modules
//! * [`logic`] – The logical form AST and its transformations.
//! * [`literal`] – Parser for the logical form literal syntax (`literal.pest`).
//! * [`grammar`] – Rules, productions, the grammar builder and the grammar file loader.
//! * [`earley`] – Chart construction.
//! * [`forest`] – Derivation trees and lazy forest extraction.
//! * [`sql`] – Translation of reduced logical forms into SQL for the demo schema.
//! * [`persist`] – SQLite storage for the demo schema.
//! * [`interface`] – The question-answering session used by the binary and the server.
//! * [`settings`] – Layered configuration.
//! * [`server`] – HTTP endpoint for the session.
//!
//! ## Grammar Files
//! One production per line, `LHS:SEMANTICS -> TERM:slot ...`. Lowercase
//! words are terminals, uppercase words (plus `_`, `/`, `\`) are
//! non-terminals. `!->` marks a production whose slots are substituted
//! without alpha-conversion. A line holding a single non-terminal names
//! the start rule.
//!
//! ## Quick Start
//! ```
//! use montague::grammar::load_grammar;
//! let grammar = load_grammar(r"
//!     S:V(n) -> NP:n VP:V
//!     VP:\y.Likes(y,o) -> likes NP:o
//!     NP:John -> john
//!     NP:Mary -> mary
//! ").unwrap();
//! let parses = grammar.parse("S", "John likes Mary").unwrap();
//! assert_eq!(parses.len(), 1);
//! assert_eq!(parses[0].semantics.beta_reduce().to_string(), "Likes(John,Mary)");
//! assert_eq!(parses[0].tree.bracketed(), "[S [NP john] [VP likes [NP mary]]]");
//! ```

pub mod error;
pub mod logic;
pub mod literal;
pub mod grammar;
pub mod earley;
pub mod forest;
pub mod sql;
pub mod persist;
pub mod interface;
pub mod settings;
pub mod server;
