use thiserror::Error;

#[derive(Error, Debug)]
pub enum MontagueError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Malformed line #{line}: {message}")]
    GrammarLoad { line: usize, message: String },
    #[error("Undefined non-terminal '{0}'")]
    UndefinedRule(String),
    #[error("Unknown start rule '{0}'")]
    UndefinedStartRule(String),
    #[error("Translation error: {0}")]
    Translation(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, MontagueError>;

// Helper conversions
impl From<rusqlite::Error> for MontagueError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<config::ConfigError> for MontagueError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<std::io::Error> for MontagueError {
    fn from(e: std::io::Error) -> Self { Self::Execution(e.to_string()) }
}
