//! Lazy enumeration of the parse forest recorded in a [`Chart`].
//!
//! Nothing is materialized up front: [`Chart::derivations`] hands out a
//! boxed iterator chain that follows backlinks on demand, so taking the
//! first few derivations of a highly ambiguous sentence stays cheap.

use std::fmt;
use std::iter;
use std::sync::Arc;

use crate::earley::{Chart, Item};
use crate::grammar::{Production, Term};
use crate::logic::LogicalForm;

type Forest<'c, T> = Box<dyn Iterator<Item = T> + 'c>;

// ------------- Derivation -------------
/// A completed item together with one choice of sub-derivation for each of
/// its non-terminals.
#[derive(Debug, PartialEq, Eq)]
pub struct Derivation {
    name: String,
    production: Arc<Production>,
    span: (usize, usize),
    semantics: LogicalForm,
    children: Vec<Arc<Derivation>>,
}

impl Derivation {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn production(&self) -> &Arc<Production> {
        &self.production
    }
    /// Token positions `[start, end)` covered by this node.
    pub fn span(&self) -> (usize, usize) {
        self.span
    }
    /// The production's template with the children's semantics substituted in.
    pub fn semantics(&self) -> &LogicalForm {
        &self.semantics
    }
    pub fn children(&self) -> &[Arc<Derivation>] {
        &self.children
    }

    /// The terminal yield, left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a str>) {
        let mut children = self.children.iter();
        for term in self.production.terms() {
            match term {
                Term::Terminal(text) => leaves.push(text),
                Term::NonTerminal(_) => {
                    if let Some(child) = children.next() {
                        child.collect_leaves(leaves);
                    }
                }
            }
        }
    }

    /// Labelled brackets, e.g. `[S [NP john] [VP likes [NP mary]]]`.
    pub fn bracketed(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}", self.name)?;
        let mut children = self.children.iter();
        for term in self.production.terms() {
            match term {
                Term::Terminal(text) => write!(f, " {}", text)?,
                Term::NonTerminal(_) => {
                    if let Some(child) = children.next() {
                        write!(f, " {}", child)?;
                    }
                }
            }
        }
        f.write_str("]")
    }
}

/// One reading of a sentence: the derivation rooted at the start rule and
/// the semantics composed along it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parse {
    pub semantics: LogicalForm,
    pub tree: Arc<Derivation>,
}

// ------------- Extraction -------------
impl<'g> Chart<'g> {
    /// Every derivation of the whole input, in backlink order. Empty when
    /// the input did not parse.
    pub fn derivations(&self) -> Forest<'_, Parse> {
        let Some(top) = self.completed_top() else {
            return Box::new(iter::empty());
        };
        let end = self.columns().len() - 1;
        Box::new(self.trees(top, end).filter_map(|root| {
            root.children.first().map(|tree| Parse {
                semantics: root.semantics.clone(),
                tree: tree.clone(),
            })
        }))
    }

    /// Every derivation of the completed `item` ending in column `end`.
    pub fn trees(&self, item: Item, end: usize) -> Forest<'_, Arc<Derivation>> {
        let production = self.production(&item).clone();
        let name = self.name(item.lhs).to_string();
        Box::new(self.children(item, end).map(move |children| {
            let semantics = production.compose(children.iter().map(|child| &child.semantics));
            Arc::new(Derivation {
                name: name.clone(),
                production: production.clone(),
                span: (item.start, end),
                semantics,
                children,
            })
        }))
    }

    /// Every sequence of sub-derivations for the terms left of `item`'s dot.
    fn children(&self, item: Item, end: usize) -> Forest<'_, Vec<Arc<Derivation>>> {
        let links = match self.columns().get(end).and_then(|column| column.backlinks(&item)) {
            Some(links) if !links.is_empty() => links,
            // predicted items were reached by nothing
            _ => return Box::new(iter::once(Vec::new())),
        };
        Box::new(links.iter().flat_map(move |link| {
            let sequences: Forest<'_, Vec<Arc<Derivation>>> = match link.cause {
                None => self.children(link.predecessor, end - 1),
                Some(cause) => Box::new(self.children(link.predecessor, cause.start).flat_map(
                    move |prefix| {
                        self.trees(cause, end).map(move |tree| {
                            let mut children = prefix.clone();
                            children.push(tree);
                            children
                        })
                    },
                )),
            };
            sequences
        }))
    }
}
