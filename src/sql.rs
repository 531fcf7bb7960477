//! Translation of reduced logical forms into SQLite statements over the
//! demo schema (see [`crate::persist::RELATIONS`]).
//!
//! The shape of the form decides the kind of statement:
//!
//! | form                               | statement                         |
//! |------------------------------------|-----------------------------------|
//! | `Distinctselect(\x.\y.R(x,y))`     | `SELECT DISTINCT arg1 FROM r`     |
//! | `Count(\x.…)`, `Sum(\x.…)`         | aggregate over the joined body    |
//! | `\x.R(A,B)` with constant `A`, `B` | `YES`/`NO` existence check        |
//! | `R(A,B)`, `… && …`                 | one `INSERT` per relation         |
//! | `\x.…`                             | `SELECT` of the variables         |

use indexmap::IndexMap;

use crate::error::{MontagueError, Result};
use crate::logic::LogicalForm;
use crate::persist::table_for;

/// A column of an aliased relation occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Column {
    alias: String,
    index: usize,
}

impl Column {
    fn name(&self) -> String {
        format!("arg{}", self.index)
    }
    fn qualified(&self) -> String {
        format!("{}.arg{}", self.alias, self.index)
    }
}

#[derive(Clone, Debug)]
enum Value {
    Constant(String),
    Column(Column),
}

impl Value {
    fn render(&self) -> String {
        match self {
            Value::Constant(literal) => literal.clone(),
            Value::Column(column) => column.qualified(),
        }
    }
}

fn constant(name: &str) -> String {
    match name {
        "Ten" => "10".to_string(),
        "Twenty" => "20".to_string(),
        _ => format!("'{}'", name.replace('\'', "''")),
    }
}

fn relation_of(form: &LogicalForm) -> Result<&'static str> {
    match form.uncurry_application().0 {
        LogicalForm::Symbol(name) => table_for(name),
        other => Err(MontagueError::Translation(format!(
            "Unable to deduce table name from '{}'",
            other
        ))),
    }
}

/// Relation occurrences and the constraints between them, gathered from a
/// conjunction of atoms.
#[derive(Debug, Default)]
struct Joins {
    // (table, alias)
    tables: Vec<(&'static str, String)>,
    variables: IndexMap<String, Vec<Column>>,
    constraints: Vec<(Column, Value)>,
}

impl Joins {
    fn visit(&mut self, form: &LogicalForm) -> Result<()> {
        match form {
            LogicalForm::Application(..) => {
                let (_, arguments) = form.uncurry_application();
                let table = relation_of(form)?;
                let alias = format!("alias{}_{}", self.tables.len(), table);
                self.tables.push((table, alias.clone()));
                for (index, argument) in arguments.into_iter().enumerate() {
                    let column = Column {
                        alias: alias.clone(),
                        index,
                    };
                    match argument {
                        LogicalForm::Symbol(name) => {
                            self.constraints.push((column, Value::Constant(constant(name))))
                        }
                        LogicalForm::Variable(name) => {
                            self.variables.entry(name.clone()).or_default().push(column)
                        }
                        other => {
                            return Err(MontagueError::Translation(format!(
                                "Unsupported argument '{}'",
                                other
                            )));
                        }
                    }
                }
                Ok(())
            }
            LogicalForm::And(lhs, rhs) => {
                self.visit(lhs)?;
                self.visit(rhs)
            }
            LogicalForm::Negation(_) => Err(MontagueError::Translation(
                "'Not' clauses are not supported currently".into(),
            )),
            LogicalForm::Or(..) => Err(MontagueError::Translation(
                "'Or' clauses are not supported currently".into(),
            )),
            other => Err(MontagueError::Translation(format!(
                "Unsupported node '{}'",
                other
            ))),
        }
    }

    /// Equates consecutive occurrences of each variable.
    fn induce_variable_constraints(&mut self) {
        for columns in self.variables.values() {
            for pair in columns.windows(2) {
                self.constraints
                    .push((pair[0].clone(), Value::Column(pair[1].clone())));
            }
        }
    }

    fn from_clause(&self) -> String {
        self.tables
            .iter()
            .map(|(table, alias)| format!("{} AS {}", table, alias))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn where_clause(&self) -> String {
        if self.constraints.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = self
            .constraints
            .iter()
            .map(|(column, value)| format!("{} = {}", column.qualified(), value.render()))
            .collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    fn projection(&self, aggregate: Option<&str>) -> Result<String> {
        if self.variables.is_empty() {
            return Err(MontagueError::Translation("Nothing to select".into()));
        }
        let results: Vec<String> = self
            .variables
            .iter()
            .map(|(variable, columns)| {
                let column = columns[0].qualified();
                match aggregate {
                    Some(function) => format!("{}({}) AS {}", function, column, variable),
                    None => format!("{} AS {}", column, variable),
                }
            })
            .collect();
        Ok(results.join(", "))
    }
}

// ------------- Classification -------------
fn aggregate_of(form: &LogicalForm) -> Option<(&str, &LogicalForm)> {
    match form {
        LogicalForm::Application(function, argument) => match (function.as_ref(), argument.as_ref()) {
            (LogicalForm::Symbol(name), LogicalForm::Lambda(..)) => Some((name.as_str(), argument.as_ref())),
            _ => None,
        },
        _ => None,
    }
}

fn is_existence_check(form: &LogicalForm) -> bool {
    let (variables, body) = form.uncurry_lambda();
    if variables.is_empty() || !matches!(body, LogicalForm::Application(..)) {
        return false;
    }
    let (_, arguments) = body.uncurry_application();
    arguments.len() >= 2 && arguments.iter().all(|a| matches!(a, LogicalForm::Symbol(_)))
}

/// Turns a beta-normal logical form into the statements to run, in order.
pub fn translate(form: &LogicalForm) -> Result<Vec<String>> {
    if let Some((function, lambda)) = aggregate_of(form) {
        match function {
            "Distinctselect" => return distinct_select(lambda),
            "Count" => return aggregate(lambda, "COUNT"),
            "Sum" => return aggregate(lambda, "SUM"),
            _ => {}
        }
    }
    if is_existence_check(form) {
        return existence_check(form);
    }
    match form {
        LogicalForm::Application(..)
        | LogicalForm::Negation(_)
        | LogicalForm::And(..)
        | LogicalForm::Or(..) => insert(form),
        LogicalForm::Lambda(..) => select(form),
        _ => Err(MontagueError::Translation(format!(
            "Unable to determine SQL query type for '{}'; probably expression is too complex",
            form
        ))),
    }
}

fn distinct_select(lambda: &LogicalForm) -> Result<Vec<String>> {
    let (_, body) = lambda.uncurry_lambda();
    Ok(vec![format!("SELECT DISTINCT arg1 FROM {}", relation_of(body)?)])
}

fn aggregate(lambda: &LogicalForm, function: &str) -> Result<Vec<String>> {
    let (variables, body) = lambda.uncurry_lambda();
    if variables.len() == 2 {
        return Ok(vec![format!(
            "SELECT COUNT(DISTINCT arg0) FROM {}",
            relation_of(body)?
        )]);
    }
    let mut joins = Joins::default();
    joins.visit(body)?;
    joins.induce_variable_constraints();
    Ok(vec![format!(
        "SELECT {} FROM {}{}",
        joins.projection(Some(function))?,
        joins.from_clause(),
        joins.where_clause()
    )])
}

fn existence_check(form: &LogicalForm) -> Result<Vec<String>> {
    let (_, body) = form.uncurry_lambda();
    let mut joins = Joins::default();
    joins.visit(body)?;
    joins.induce_variable_constraints();
    Ok(vec![format!(
        "SELECT CASE WHEN count(*)=0 THEN 'NO' ELSE 'YES' END FROM {}{}",
        joins.from_clause(),
        joins.where_clause()
    )])
}

fn insert(form: &LogicalForm) -> Result<Vec<String>> {
    let mut joins = Joins::default();
    joins.visit(form)?;
    let mut inserted: IndexMap<&str, Vec<(String, String)>> = IndexMap::new();
    for (table, _) in &joins.tables {
        if inserted.insert(*table, Vec::new()).is_some() {
            return Err(MontagueError::Translation(
                "Expression is too complex to be converted into a single insert statement".into(),
            ));
        }
    }
    for (column, value) in &joins.constraints {
        let table = joins
            .tables
            .iter()
            .find(|(_, alias)| *alias == column.alias)
            .map(|(table, _)| *table)
            .ok_or_else(|| MontagueError::Invariant(format!("unknown alias {}", column.alias)))?;
        inserted
            .entry(table)
            .or_default()
            .push((column.name(), value.render()));
    }
    Ok(inserted
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(table, values)| {
            let (columns, values): (Vec<String>, Vec<String>) = values.into_iter().unzip();
            format!(
                "INSERT INTO {}({}) VALUES ({})",
                table,
                columns.join(", "),
                values.join(", ")
            )
        })
        .collect())
}

fn select(form: &LogicalForm) -> Result<Vec<String>> {
    let (_, body) = form.uncurry_lambda();
    let mut joins = Joins::default();
    joins.visit(body)?;
    joins.induce_variable_constraints();
    Ok(vec![format!(
        "SELECT {} FROM {}{}",
        joins.projection(None)?,
        joins.from_clause(),
        joins.where_clause()
    )])
}
