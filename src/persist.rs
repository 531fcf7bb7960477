// used for persistence
use rusqlite::Connection;
use rusqlite::types::ValueRef;

use tracing::debug;

use crate::error::{MontagueError, Result};

/// Relations of the demo schema and the tables backing them. Every table
/// has two text columns, `arg0` and `arg1`.
pub const RELATIONS: [(&str, &str); 4] = [
    ("Consists", "my_consists"),
    ("Is", "my_is"),
    ("Takes", "my_takes"),
    ("Have", "my_have"),
];

pub fn table_for(relation: &str) -> Result<&'static str> {
    RELATIONS
        .iter()
        .find(|(name, _)| *name == relation)
        .map(|(_, table)| *table)
        .ok_or_else(|| MontagueError::Translation(format!("Unknown relation '{}'", relation)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

impl PersistenceMode {
    pub fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(path) => PersistenceMode::File(path.to_string()),
            None => PersistenceMode::InMemory,
        }
    }
}

/// A stored fact, as listed by [`Persistor::dump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub relation: &'static str,
    pub arg0: Option<String>,
    pub arg1: Option<String>,
}

// ------------- Persistence -------------
pub struct Persistor {
    db: Connection,
}

impl Persistor {
    pub fn new(mode: &PersistenceMode) -> Result<Self> {
        let db = match mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        debug!(?mode, "persistence opened");
        Ok(Self { db })
    }

    fn for_each_table(&self, template: &str) -> Result<()> {
        for (_, table) in RELATIONS {
            let statement = template.replace("{table}", table);
            self.db.execute_batch(&statement)?;
        }
        Ok(())
    }

    pub fn create_tables(&self) -> Result<()> {
        self.for_each_table("create table if not exists {table} (arg0 text, arg1 text);")
    }

    pub fn drop_tables(&self) -> Result<()> {
        self.for_each_table("drop table if exists {table};")
    }

    pub fn clear_tables(&self) -> Result<()> {
        self.for_each_table("delete from {table};")
    }

    pub fn dump(&self) -> Result<Vec<Fact>> {
        let mut facts = Vec::new();
        for (relation, table) in RELATIONS {
            let mut statement = self
                .db
                .prepare(&format!("select arg0, arg1 from {} order by rowid", table))?;
            let rows = statement.query_map([], |row| {
                Ok(Fact {
                    relation,
                    arg0: row.get(0)?,
                    arg1: row.get(1)?,
                })
            })?;
            for fact in rows {
                facts.push(fact?);
            }
        }
        Ok(facts)
    }

    /// Runs one statement and returns its rows rendered as text.
    pub fn execute(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut statement = self.db.prepare(sql)?;
        let width = statement.column_count();
        if width == 0 {
            let changed = statement.execute([])?;
            debug!(changed, "statement executed");
            return Ok(Vec::new());
        }
        let mut rows = statement.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(render(row.get_ref(i)?)?);
            }
            result.push(values);
        }
        debug!(rows = result.len(), "query executed");
        Ok(result)
    }
}

fn render(value: ValueRef) -> Result<String> {
    Ok(match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|e| MontagueError::Persistence(e.to_string()))?,
        ValueRef::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    })
}
