//! Layered configuration.
//!
//! `defaults/montague.default.toml` is embedded into the binary. On top of it
//! the [`Loader`] stacks configuration files, `MONTAGUE__*` environment
//! variables and explicit overrides, in the order they are added.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

const DEFAULT_TOML: &str = include_str!("../defaults/montague.default.toml");

/// Optional file picked up from the working directory by the binary.
pub const LOCAL_FILE: &str = "montague.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub grammar: GrammarSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrammarSettings {
    /// Grammar source file; the built-in demo grammar when absent.
    pub path: Option<String>,
    pub start: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; an in-memory database when absent.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub debug: bool,
    pub trace: bool,
    /// Upper bound on derivations listed for an ambiguous sentence.
    pub max_derivations: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub enabled: bool,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Missing files are an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// `MONTAGUE__SESSION__DEBUG=false` overrides `session.debug`.
    pub fn with_environment(mut self) -> Self {
        let source = Environment::with_prefix("MONTAGUE")
            .separator("__")
            .try_parsing(true);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Settings> {
        Ok(self.builder.build()?.try_deserialize()?)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<Settings> {
    Loader::new().build()
}
