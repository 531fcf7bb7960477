//! Logical forms: a small lambda calculus over first-order formulas.
//!
//! A [`LogicalForm`] is an immutable value. Every transformation
//! ([`LogicalForm::substitute`], [`LogicalForm::substitute_bindings`],
//! [`LogicalForm::beta_reduce`]) returns a new form and shares untouched
//! subtrees through `Arc`.
//!
//! The canonical rendering produced by `Display` is accepted by
//! [`crate::literal::parse_logical_form`], so `parse(render(x)) == x`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

// bindings are keyed by short variable names, so a fast non-cryptographic hash will do
use seahash::SeaHasher;

pub type SemanticHasher = BuildHasherDefault<SeaHasher>;

/// Slot name to logical form, as used when composing a production's semantics.
pub type Bindings = HashMap<String, LogicalForm, SemanticHasher>;

/// Appended to a bound variable that has to be renamed during substitution.
pub const FRESH_MARKER: char = '\'';

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum LogicalForm {
    Empty,
    Symbol(String),
    Variable(String),
    Application(Arc<LogicalForm>, Arc<LogicalForm>),
    Lambda(String, Arc<LogicalForm>),
    Negation(Arc<LogicalForm>),
    And(Arc<LogicalForm>, Arc<LogicalForm>),
    Or(Arc<LogicalForm>, Arc<LogicalForm>),
}

use LogicalForm::*;

impl LogicalForm {
    pub fn symbol(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }
    pub fn variable(name: impl Into<String>) -> Self {
        Variable(name.into())
    }
    pub fn apply(function: LogicalForm, argument: LogicalForm) -> Self {
        Application(Arc::new(function), Arc::new(argument))
    }
    pub fn lambda(variable: impl Into<String>, body: LogicalForm) -> Self {
        Lambda(variable.into(), Arc::new(body))
    }
    pub fn not(body: LogicalForm) -> Self {
        Negation(Arc::new(body))
    }
    pub fn and(lhs: LogicalForm, rhs: LogicalForm) -> Self {
        And(Arc::new(lhs), Arc::new(rhs))
    }
    pub fn or(lhs: LogicalForm, rhs: LogicalForm) -> Self {
        Or(Arc::new(lhs), Arc::new(rhs))
    }
    pub fn is_empty(&self) -> bool {
        matches!(self, Empty)
    }

    pub fn free_variables(&self) -> BTreeSet<String> {
        match self {
            Empty | Symbol(_) => BTreeSet::new(),
            Variable(name) => BTreeSet::from([name.clone()]),
            Lambda(bound, body) => {
                let mut free = body.free_variables();
                free.remove(bound);
                free
            }
            Negation(body) => body.free_variables(),
            Application(lhs, rhs) | And(lhs, rhs) | Or(lhs, rhs) => {
                let mut free = lhs.free_variables();
                free.extend(rhs.free_variables());
                free
            }
        }
    }

    /// Same answer as `free_variables().contains(name)` without building the set.
    pub fn occurs_free(&self, name: &str) -> bool {
        match self {
            Empty | Symbol(_) => false,
            Variable(variable) => variable == name,
            Lambda(bound, body) => bound != name && body.occurs_free(name),
            Negation(body) => body.occurs_free(name),
            Application(lhs, rhs) | And(lhs, rhs) | Or(lhs, rhs) => {
                lhs.occurs_free(name) || rhs.occurs_free(name)
            }
        }
    }

    /// Replaces the free occurrences of `variable` with `replacement`.
    ///
    /// With `capture_avoiding` set, a lambda whose bound variable is free in
    /// the replacement is alpha-converted first: the bound name gets
    /// [`FRESH_MARKER`]s appended until it clashes with nothing.
    pub fn substitute(
        &self,
        variable: &str,
        replacement: &LogicalForm,
        capture_avoiding: bool,
    ) -> LogicalForm {
        match self {
            Empty | Symbol(_) => self.clone(),
            Variable(name) => {
                if name == variable {
                    replacement.clone()
                } else {
                    self.clone()
                }
            }
            Lambda(bound, body) => {
                if bound == variable {
                    // shadowed
                    return self.clone();
                }
                if capture_avoiding && replacement.occurs_free(bound) {
                    let mut fresh = bound.clone();
                    while fresh == variable
                        || replacement.occurs_free(&fresh)
                        || body.occurs_free(&fresh)
                    {
                        fresh.push(FRESH_MARKER);
                    }
                    let renamed = body.substitute(bound, &Variable(fresh.clone()), true);
                    return LogicalForm::lambda(
                        fresh,
                        renamed.substitute(variable, replacement, capture_avoiding),
                    );
                }
                LogicalForm::lambda(
                    bound.clone(),
                    body.substitute(variable, replacement, capture_avoiding),
                )
            }
            Application(function, argument) => LogicalForm::apply(
                function.substitute(variable, replacement, capture_avoiding),
                argument.substitute(variable, replacement, capture_avoiding),
            ),
            Negation(body) => {
                LogicalForm::not(body.substitute(variable, replacement, capture_avoiding))
            }
            And(lhs, rhs) => LogicalForm::and(
                lhs.substitute(variable, replacement, capture_avoiding),
                rhs.substitute(variable, replacement, capture_avoiding),
            ),
            Or(lhs, rhs) => LogicalForm::or(
                lhs.substitute(variable, replacement, capture_avoiding),
                rhs.substitute(variable, replacement, capture_avoiding),
            ),
        }
    }

    /// Substitutes every free variable that has an entry in `bindings`.
    ///
    /// Each bound expression is itself resolved against `bindings` before it
    /// is substituted in. A variable is never resolved inside its own
    /// expression, so self-referencing bindings terminate.
    pub fn substitute_bindings(&self, bindings: &Bindings, capture_avoiding: bool) -> LogicalForm {
        let mut resolving = Vec::new();
        self.resolve(bindings, capture_avoiding, &mut resolving)
    }

    fn resolve(
        &self,
        bindings: &Bindings,
        capture_avoiding: bool,
        resolving: &mut Vec<String>,
    ) -> LogicalForm {
        let mut node = self.clone();
        for variable in self.free_variables() {
            if resolving.contains(&variable) {
                continue;
            }
            if let Some(expression) = bindings.get(&variable) {
                resolving.push(variable.clone());
                let expression = expression.resolve(bindings, capture_avoiding, resolving);
                resolving.pop();
                node = node.substitute(&variable, &expression, capture_avoiding);
            }
        }
        node
    }

    /// Normalizes bottom-up. Redexes are contracted with the plain
    /// (non-capture-avoiding) substitution. Terms without a normal form
    /// make this recurse forever.
    pub fn beta_reduce(&self) -> LogicalForm {
        match self {
            Empty | Symbol(_) | Variable(_) => self.clone(),
            Application(function, argument) => {
                let function = function.beta_reduce();
                let argument = argument.beta_reduce();
                match &function {
                    Lambda(bound, body) => body.substitute(bound, &argument, false).beta_reduce(),
                    _ => LogicalForm::apply(function, argument),
                }
            }
            Lambda(bound, body) => LogicalForm::lambda(bound.clone(), body.beta_reduce()),
            Negation(body) => LogicalForm::not(body.beta_reduce()),
            And(lhs, rhs) => LogicalForm::and(lhs.beta_reduce(), rhs.beta_reduce()),
            Or(lhs, rhs) => LogicalForm::or(lhs.beta_reduce(), rhs.beta_reduce()),
        }
    }

    /// `f(a)(b)` becomes `(f, [a, b])`; anything else is its own head.
    pub fn uncurry_application(&self) -> (&LogicalForm, Vec<&LogicalForm>) {
        let mut head = self;
        let mut arguments = Vec::new();
        while let Application(function, argument) = head {
            arguments.push(argument.as_ref());
            head = function.as_ref();
        }
        arguments.reverse();
        (head, arguments)
    }

    /// `\x.\y.body` becomes `([x, y], body)`.
    pub fn uncurry_lambda(&self) -> (Vec<&str>, &LogicalForm) {
        let mut body = self;
        let mut variables = Vec::new();
        while let Lambda(bound, inner) = body {
            variables.push(bound.as_str());
            body = inner.as_ref();
        }
        (variables, body)
    }

    fn fmt_application(&self, f: &mut fmt::Formatter, function: &LogicalForm, argument: &LogicalForm) -> fmt::Result {
        let (head, arguments) = self.uncurry_application();
        if arguments.iter().all(|a| is_functional_variable(a)) {
            write!(f, "({})", head)?;
            for a in arguments {
                write!(f, "({})", a)?;
            }
            Ok(())
        } else if matches!(head, Symbol(_) | Variable(_)) {
            let joined: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
            write!(f, "{}({})", head, joined.join(","))
        } else {
            match function {
                And(..) | Or(..) | Negation(_) => write!(f, "({})", function)?,
                _ => write!(f, "{}", function)?,
            }
            match argument {
                Lambda(..) => write!(f, "{}", argument),
                _ => write!(f, "({})", argument),
            }
        }
    }
}

fn is_functional_variable(form: &LogicalForm) -> bool {
    match form {
        Variable(name) => !name.chars().any(|c| c.is_lowercase()),
        _ => false,
    }
}

impl fmt::Display for LogicalForm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Empty => Ok(()),
            Symbol(name) | Variable(name) => write!(f, "{}", name),
            Application(function, argument) => self.fmt_application(f, function, argument),
            Lambda(bound, body) => write!(f, "(\\{}.{})", bound, body),
            Negation(body) => match body.as_ref() {
                And(..) | Or(..) => write!(f, "!({})", body),
                _ => write!(f, "!{}", body),
            },
            // formulas fold left-associatively with && binding tighter than ||
            And(lhs, rhs) => {
                match lhs.as_ref() {
                    Or(..) => write!(f, "({})", lhs)?,
                    _ => write!(f, "{}", lhs)?,
                }
                f.write_str(" && ")?;
                match rhs.as_ref() {
                    And(..) | Or(..) => write!(f, "({})", rhs),
                    _ => write!(f, "{}", rhs),
                }
            }
            Or(lhs, rhs) => {
                write!(f, "{} || ", lhs)?;
                match rhs.as_ref() {
                    Or(..) => write!(f, "({})", rhs),
                    _ => write!(f, "{}", rhs),
                }
            }
        }
    }
}
