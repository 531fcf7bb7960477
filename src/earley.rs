//! The Earley chart.
//!
//! For `n` tokens the chart has `n + 1` columns. Column 0 is seeded with a
//! synthetic top item for `γ -> start:S`, and every column is then worked
//! off as a FIFO queue of items, predicting, scanning and completing until
//! nothing new appears. Each item remembers every way it was reached as a
//! [`Backlink`], which is what [`crate::forest`] walks to enumerate the
//! derivations.

use std::collections::VecDeque;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

// columns must iterate in insertion order while still offering fast membership
use indexmap::{IndexMap, IndexSet};
use seahash::SeaHasher;

use tracing::{debug, trace};

use crate::error::{MontagueError, Result};
use crate::forest::Parse;
use crate::grammar::{Grammar, Production, RuleId, Term, tokenize};
use crate::logic::LogicalForm;

pub type ChartHasher = BuildHasherDefault<SeaHasher>;

/// Name given to the synthetic top rule in derivations.
pub const TOP_NAME: &str = "γ";
// slot the start rule's semantics is bound to in the top production
const TOP_SLOT: &str = "S";

// ------------- Item -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lhs {
    Top,
    Rule(RuleId),
}

/// A dotted production. The column an item sits in is its end position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Item {
    pub lhs: Lhs,
    /// Index into the productions of the rule (always 0 for the top item).
    pub alternative: usize,
    pub start: usize,
    pub dot: usize,
}

impl Item {
    fn top() -> Self {
        Self {
            lhs: Lhs::Top,
            alternative: 0,
            start: 0,
            dot: 0,
        }
    }
    fn advance(self) -> Self {
        Self {
            dot: self.dot + 1,
            ..self
        }
    }
}

/// How an item came to be: `predecessor` with its dot moved over either a
/// token (`cause` is `None`) or over the completed item `cause`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Backlink {
    pub predecessor: Item,
    pub cause: Option<Item>,
}

// ------------- Column -------------
#[derive(Debug)]
pub struct Column {
    index: usize,
    token: Option<String>,
    items: IndexMap<Item, IndexSet<Backlink, ChartHasher>, ChartHasher>,
}

impl Column {
    fn new(index: usize, token: Option<String>) -> Self {
        Self {
            index,
            token,
            items: IndexMap::default(),
        }
    }
    pub fn index(&self) -> usize {
        self.index
    }
    /// The token consumed to reach this column, `None` for column 0.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.keys()
    }
    pub fn contains(&self, item: &Item) -> bool {
        self.items.contains_key(item)
    }
    pub fn backlinks(&self, item: &Item) -> Option<&IndexSet<Backlink, ChartHasher>> {
        self.items.get(item)
    }

    /// Returns whether the item is new to this column.
    fn insert(&mut self, item: Item, backlink: Option<Backlink>) -> bool {
        let mut added = false;
        let links = self.items.entry(item).or_insert_with(|| {
            added = true;
            IndexSet::default()
        });
        if let Some(backlink) = backlink {
            links.insert(backlink);
        }
        added
    }
}

// ------------- Chart -------------
#[derive(Debug)]
pub struct Chart<'g> {
    grammar: &'g Grammar,
    start: RuleId,
    top: Arc<Production>,
    columns: Vec<Column>,
}

impl<'g> Chart<'g> {
    /// Runs the recognizer to completion over `tokens`.
    pub fn build(grammar: &'g Grammar, start: &str, tokens: &[String]) -> Result<Self> {
        let start_id = grammar
            .rule_id(start)
            .ok_or_else(|| MontagueError::UndefinedStartRule(start.to_string()))?;
        let top = Arc::new(Production::new(
            LogicalForm::variable(TOP_SLOT),
            vec![(Term::NonTerminal(start_id), Some(TOP_SLOT.to_string()))],
            true,
        ));
        let mut columns = Vec::with_capacity(tokens.len() + 1);
        columns.push(Column::new(0, None));
        for (i, token) in tokens.iter().enumerate() {
            columns.push(Column::new(i + 1, Some(token.clone())));
        }
        let mut chart = Self {
            grammar,
            start: start_id,
            top,
            columns,
        };
        chart.columns[0].insert(Item::top(), None);
        for i in 0..chart.columns.len() {
            chart.process(i);
            trace!(column = i, items = chart.columns[i].len(), "column done");
        }
        debug!(
            tokens = tokens.len(),
            items = chart.item_count(),
            complete = chart.is_complete(),
            "chart built"
        );
        Ok(chart)
    }

    fn process(&mut self, i: usize) {
        let mut queue: VecDeque<Item> = self.columns[i].items.keys().copied().collect();
        while let Some(item) = queue.pop_front() {
            match self.next_term(&item).cloned() {
                None => self.complete(i, item, &mut queue),
                Some(Term::NonTerminal(rule)) => self.predict(i, item, rule, &mut queue),
                Some(Term::Terminal(text)) => self.scan(i, item, &text),
            }
        }
    }

    fn complete(&mut self, i: usize, item: Item, queue: &mut VecDeque<Item>) {
        let Lhs::Rule(rule) = item.lhs else {
            return;
        };
        let waiting: Vec<Item> = self.columns[item.start]
            .items
            .keys()
            .filter(|candidate| self.next_term(candidate) == Some(&Term::NonTerminal(rule)))
            .copied()
            .collect();
        for predecessor in waiting {
            let backlink = Backlink {
                predecessor,
                cause: Some(item),
            };
            if self.columns[i].insert(predecessor.advance(), Some(backlink)) {
                queue.push_back(predecessor.advance());
            }
        }
    }

    fn predict(&mut self, i: usize, item: Item, rule: RuleId, queue: &mut VecDeque<Item>) {
        let alternatives = self.grammar.rule(rule).productions().len();
        for alternative in 0..alternatives {
            let predicted = Item {
                lhs: Lhs::Rule(rule),
                alternative,
                start: i,
                dot: 0,
            };
            if self.columns[i].insert(predicted, None) {
                queue.push_back(predicted);
            }
        }
        // a nullable rule may already have completed here, before `item` arrived
        let completed: Vec<Item> = self.columns[i]
            .items
            .keys()
            .filter(|done| done.lhs == Lhs::Rule(rule) && done.start == i && self.is_done(done))
            .copied()
            .collect();
        for cause in completed {
            let backlink = Backlink {
                predecessor: item,
                cause: Some(cause),
            };
            if self.columns[i].insert(item.advance(), Some(backlink)) {
                queue.push_back(item.advance());
            }
        }
    }

    fn scan(&mut self, i: usize, item: Item, text: &str) {
        let Some(next) = self.columns.get_mut(i + 1) else {
            return;
        };
        if next.token.as_deref() == Some(text) {
            next.insert(
                item.advance(),
                Some(Backlink {
                    predecessor: item,
                    cause: None,
                }),
            );
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }
    pub fn start(&self) -> RuleId {
        self.start
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn item_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    pub fn production(&self, item: &Item) -> &Arc<Production> {
        match item.lhs {
            Lhs::Top => &self.top,
            Lhs::Rule(rule) => &self.grammar.rule(rule).productions()[item.alternative],
        }
    }
    pub fn name(&self, lhs: Lhs) -> &str {
        match lhs {
            Lhs::Top => TOP_NAME,
            Lhs::Rule(rule) => self.grammar.rule(rule).name(),
        }
    }
    fn next_term(&self, item: &Item) -> Option<&Term> {
        self.production(item).term(item.dot)
    }
    fn is_done(&self, item: &Item) -> bool {
        item.dot >= self.production(item).len()
    }

    /// The completed top item, which only exists if the whole input parsed.
    pub(crate) fn completed_top(&self) -> Option<Item> {
        let done = Item::top().advance();
        self.columns.last().filter(|column| column.contains(&done)).map(|_| done)
    }
    pub fn is_complete(&self) -> bool {
        self.completed_top().is_some()
    }
}

/// Every derivation of `tokens` from `start`, each with its composed
/// semantics. No parse is an empty list, not an error.
pub fn parse(grammar: &Grammar, start: &str, tokens: &[String]) -> Result<Vec<Parse>> {
    let chart = Chart::build(grammar, start, tokens)?;
    Ok(chart.derivations().collect())
}

impl Grammar {
    pub fn chart(&self, start: &str, sentence: &str) -> Result<Chart<'_>> {
        Chart::build(self, start, &tokenize(sentence))
    }
    pub fn parse(&self, start: &str, sentence: &str) -> Result<Vec<Parse>> {
        parse(self, start, &tokenize(sentence))
    }
}
