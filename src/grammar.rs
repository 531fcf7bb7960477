use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// used to keep the one-to-one mapping between rule names and their arena slots
use bimap::BiMap;

// grammar tokens are classified by these, so compile them once
use lazy_static::lazy_static;
use regex::Regex;

use tracing::debug;

use crate::error::{MontagueError, Result};
use crate::literal::parse_logical_form;
use crate::logic::{Bindings, LogicalForm};

lazy_static! {
    static ref TERMINAL: Regex = Regex::new(r"^[a-z]+$").unwrap();
    static ref NON_TERMINAL: Regex = Regex::new(r"^[A-Z_/\\]+$").unwrap();
}

pub const DEFAULT_START: &str = "S";

// ------------- Term -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// Matched against a (lowercased) token by text.
    Terminal(String),
    /// Matched by identity of the rule.
    NonTerminal(RuleId),
}

impl Term {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Term::Terminal(_))
    }
    pub fn rule(&self) -> Option<RuleId> {
        match self {
            Term::NonTerminal(id) => Some(*id),
            Term::Terminal(_) => None,
        }
    }
}

// ------------- Production -------------
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Production {
    semantics: LogicalForm,
    terms: Vec<(Term, Option<String>)>,
    safe_bindings: bool,
}

impl Production {
    pub fn new(semantics: LogicalForm, terms: Vec<(Term, Option<String>)>, safe_bindings: bool) -> Self {
        Self {
            semantics,
            terms,
            safe_bindings,
        }
    }
    pub fn semantics(&self) -> &LogicalForm {
        &self.semantics
    }
    pub fn safe_bindings(&self) -> bool {
        self.safe_bindings
    }
    pub fn len(&self) -> usize {
        self.terms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
    pub fn term(&self, index: usize) -> Option<&Term> {
        self.terms.get(index).map(|(term, _)| term)
    }
    pub fn slot(&self, index: usize) -> Option<&str> {
        self.terms.get(index).and_then(|(_, slot)| slot.as_deref())
    }
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter().map(|(term, _)| term)
    }
    /// Non-terminal terms, left to right.
    pub fn rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.terms().filter_map(Term::rule)
    }

    /// The template with every slot replaced by the semantics of the
    /// derivation that filled it. `children` line up with the non-terminal
    /// terms of this production; terminals contribute no value.
    pub fn compose<'a>(&self, children: impl IntoIterator<Item = &'a LogicalForm>) -> LogicalForm {
        let mut bindings = Bindings::default();
        let slots = self
            .terms
            .iter()
            .filter(|(term, _)| !term.is_terminal())
            .map(|(_, slot)| slot);
        for (slot, semantics) in slots.zip(children) {
            if let Some(slot) = slot {
                bindings.insert(slot.clone(), semantics.clone());
            }
        }
        self.semantics.substitute_bindings(&bindings, self.safe_bindings)
    }
}

// ------------- Rule -------------
#[derive(Debug)]
pub struct Rule {
    name: String,
    productions: Vec<Arc<Production>>,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn productions(&self) -> &[Arc<Production>] {
        &self.productions
    }
}

// ------------- Grammar -------------
/// An immutable arena of rules. Rules refer to each other through
/// [`RuleId`]s, so recursion needs no reference cycles.
#[derive(Debug)]
pub struct Grammar {
    rules: Vec<Rule>,
    names: BiMap<String, RuleId>,
    start: RuleId,
}

impl Grammar {
    /// Panics if `id` was not issued for this grammar.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.names.get_by_left(name).copied()
    }
    pub fn rule_name(&self, id: RuleId) -> Option<&str> {
        self.names.get_by_right(&id).map(String::as_str)
    }
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, rule)| (RuleId(i), rule))
    }
    pub fn start(&self) -> RuleId {
        self.start
    }
    pub fn len(&self) -> usize {
        self.rules.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn fmt_production(&self, f: &mut fmt::Formatter, production: &Production) -> fmt::Result {
        if !production.semantics.is_empty() {
            write!(f, " (:{})", production.semantics)?;
        }
        for (term, slot) in &production.terms {
            match term {
                Term::Terminal(text) => write!(f, " {}", text)?,
                Term::NonTerminal(id) => write!(f, " {}", self.rule(*id).name)?,
            }
            if let Some(slot) = slot {
                write!(f, ":{}", slot)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rule in &self.rules {
            write!(f, "{} ->", rule.name)?;
            for (i, production) in rule.productions.iter().enumerate() {
                if i > 0 {
                    f.write_str(" |")?;
                }
                self.fmt_production(f, production)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ------------- Builder -------------
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<Rule>,
    names: BiMap<String, RuleId>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, declaring the rule on first mention.
    pub fn declare(&mut self, name: &str) -> RuleId {
        if let Some(id) = self.names.get_by_left(name) {
            return *id;
        }
        let id = RuleId(self.rules.len());
        self.rules.push(Rule {
            name: name.to_string(),
            productions: Vec::new(),
        });
        self.names.insert(name.to_string(), id);
        id
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.names.get_by_left(name).copied()
    }

    pub fn add(&mut self, lhs: RuleId, production: Production) -> Result<()> {
        let rule = self
            .rules
            .get_mut(lhs.0)
            .ok_or_else(|| MontagueError::Invariant(format!("no rule with id {}", lhs.0)))?;
        rule.productions.push(Arc::new(production));
        Ok(())
    }

    /// Shorthand for code-built grammars, e.g.
    /// `.production("VP", r"\y.Likes(y,o)", "likes NP:o")`.
    ///
    /// Right-hand tokens that look like non-terminals become rule
    /// references, anything else is a terminal matched case-insensitively.
    /// An empty `semantics` means the production carries none.
    pub fn production(mut self, lhs: &str, semantics: &str, rhs: &str) -> Result<Self> {
        let semantics = if semantics.trim().is_empty() {
            LogicalForm::Empty
        } else {
            parse_logical_form(semantics)?
        };
        let lhs = self.declare(lhs);
        let mut terms = Vec::new();
        for token in rhs.split_whitespace() {
            let (text, annotation) = split_annotation(token);
            let slot = match annotation {
                Some((_, binding)) => Some(slot_name(binding).ok_or_else(|| MontagueError::Parse {
                    message: format!("'{}' is not a variable binding", token),
                    line: None,
                    col: None,
                })?),
                None => None,
            };
            let term = if NON_TERMINAL.is_match(text) {
                Term::NonTerminal(self.declare(text))
            } else {
                Term::Terminal(text.to_lowercase())
            };
            terms.push((term, slot));
        }
        self.add(lhs, Production::new(semantics, terms, true))?;
        Ok(self)
    }

    pub fn build(self, start: &str) -> Result<Grammar> {
        if let Some(rule) = self.rules.iter().find(|rule| rule.productions.is_empty()) {
            return Err(MontagueError::UndefinedRule(rule.name.clone()));
        }
        let start = self
            .rule_id(start)
            .ok_or_else(|| MontagueError::UndefinedStartRule(start.to_string()))?;
        Ok(Grammar {
            rules: self.rules,
            names: self.names,
            start,
        })
    }
}

// ------------- Loader -------------
/// Splits `NP:x` into `("NP", Some((':', "x")))`. A separator in first
/// position does not count.
fn split_annotation(token: &str) -> (&str, Option<(char, &str)>) {
    match token.char_indices().find(|(_, c)| *c == ':' || *c == '=') {
        Some((0, _)) | None => (token, None),
        Some((i, separator)) => (&token[..i], Some((separator, &token[i + 1..]))),
    }
}

/// Accepts `x`, `=x` and `:x` after the separator, as long as `x` is a
/// variable of the literal syntax.
fn slot_name(binding: &str) -> Option<String> {
    let binding = binding
        .strip_prefix('=')
        .or_else(|| binding.strip_prefix(':'))
        .unwrap_or(binding);
    match parse_logical_form(binding) {
        Ok(LogicalForm::Variable(name)) => Some(name),
        _ => None,
    }
}

fn malformed(line: usize, message: impl Into<String>) -> MontagueError {
    MontagueError::GrammarLoad {
        line,
        message: message.into(),
    }
}

/// Loads a grammar from its line-oriented source, e.g.
///
/// ```text
/// # comment
/// S:V(n) -> NP:n VP:V
/// VP:\y.Likes(y,o) -> likes NP:o
/// NP:John -> john
/// NP:Mary -> mary
/// S
/// ```
///
/// A single-token line names the start rule (the last one wins, `S` when
/// there is none). `!->` declares a production whose slots are substituted
/// without renaming bound variables.
pub fn load_grammar(source: &str) -> Result<Grammar> {
    let mut builder = GrammarBuilder::new();
    let mut first_mention: HashMap<RuleId, usize> = HashMap::new();
    let mut start: Option<String> = None;
    let mut productions = 0usize;

    for (index, raw) in source.lines().enumerate() {
        let n = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        for part in &parts {
            let (term, _) = split_annotation(part);
            let known = TERMINAL.is_match(term)
                || NON_TERMINAL.is_match(term)
                || *part == "->"
                || *part == "!->";
            if !known {
                return Err(malformed(
                    n,
                    format!(
                        "Unable to determine whether term '{}' is a terminal or a non-terminal",
                        term
                    ),
                ));
            }
        }

        if parts.len() == 1 {
            if builder.rule_id(parts[0]).is_none() {
                return Err(malformed(n, format!("Unknown non-terminal '{}'", parts[0])));
            }
            start = Some(parts[0].to_string());
            continue;
        }

        let safe_bindings = match parts[1] {
            "->" => true,
            "!->" => false,
            _ => return Err(malformed(n, "Second part should be either '->' or '!->'")),
        };

        let (lhs, annotation) = split_annotation(parts[0]);
        if !NON_TERMINAL.is_match(lhs) {
            return Err(malformed(n, "Left-hand side has to be a non-terminal"));
        }
        let semantics = match annotation {
            None => LogicalForm::Empty,
            Some((':', literal)) => {
                let literal = literal.strip_prefix(':').unwrap_or(literal);
                parse_logical_form(literal).map_err(|_| {
                    malformed(
                        n,
                        format!("Unable to parse semantic expression for term '{}'", lhs),
                    )
                })?
            }
            Some(_) => {
                return Err(malformed(
                    n,
                    "Semantics for left-hand side should be either logic expression or nothing",
                ));
            }
        };

        let id = builder.declare(lhs);
        first_mention.entry(id).or_insert(n);

        let mut terms = Vec::with_capacity(parts.len() - 2);
        for part in &parts[2..] {
            let (text, annotation) = split_annotation(part);
            let slot = match annotation {
                None => None,
                Some((_, binding)) => Some(slot_name(binding).ok_or_else(|| {
                    malformed(
                        n,
                        "Semantics for right-hand side should be only variable bindings",
                    )
                })?),
            };
            let term = if NON_TERMINAL.is_match(text) {
                let id = builder.declare(text);
                first_mention.entry(id).or_insert(n);
                Term::NonTerminal(id)
            } else if TERMINAL.is_match(text) {
                Term::Terminal(text.to_string())
            } else {
                return Err(malformed(n, format!("'{}' cannot appear on a right-hand side", text)));
            };
            terms.push((term, slot));
        }

        builder.add(id, Production::new(semantics, terms, safe_bindings))?;
        productions += 1;
    }

    // report the earliest mention of a rule that never got a production
    let undefined = builder
        .rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.productions.is_empty())
        .filter_map(|(i, rule)| first_mention.get(&RuleId(i)).map(|line| (*line, rule.name.clone())))
        .min();
    if let Some((line, name)) = undefined {
        return Err(malformed(line, format!("Undefined non-terminal '{}'", name)));
    }

    let start = start.unwrap_or_else(|| DEFAULT_START.to_string());
    let grammar = builder.build(&start)?;
    debug!(rules = grammar.len(), productions, start = %start, "grammar loaded");
    Ok(grammar)
}

/// Case-folds and splits a sentence the way terminals are matched.
pub fn tokenize(sentence: &str) -> Vec<String> {
    sentence.split_whitespace().map(str::to_lowercase).collect()
}
