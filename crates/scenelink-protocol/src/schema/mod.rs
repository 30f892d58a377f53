//! Command schema registry.
//!
//! The registry is built once from the embedded `command_schema.json`,
//! checked for internal consistency, and shared read-only for the lifetime of
//! the process. The original document text is retained so the HTTP proxy can
//! serve it byte-for-byte; the executor and the proxy therefore never disagree
//! about which commands exist.

mod types;
mod validate;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::errors::{SchemaError, ValidationError};

pub use self::types::{CommandSpec, ParamSpec, ParamType, TypeSpec, json_type_name};

use self::types::SchemaDocument;

/// Schema document compiled into the binary.
pub const COMMAND_SCHEMA_JSON: &str = include_str!("../../schema/command_schema.json");

static BUILTIN: OnceCell<SchemaRegistry> = OnceCell::new();

/// Immutable table of command specifications.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: String,
    commands: IndexMap<String, CommandSpec>,
    source: String,
}

impl SchemaRegistry {
    /// Returns the process-wide registry built from [`COMMAND_SCHEMA_JSON`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the embedded document fails to parse or
    /// violates a consistency rule. The failure is not cached, so each caller
    /// observes it.
    pub fn builtin() -> Result<&'static Self, SchemaError> {
        BUILTIN.get_or_try_init(|| Self::from_json(COMMAND_SCHEMA_JSON))
    }

    /// Parses and checks a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] for malformed documents and one of the
    /// consistency variants when a command's declarations contradict each
    /// other.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(text).map_err(SchemaError::Parse)?;
        let mut commands = document.commands;
        for (name, spec) in &mut commands {
            spec.name.clone_from(name);
            validate::check_spec(spec)?;
        }
        Ok(Self {
            version: document.schema_version,
            commands,
            source: text.to_owned(),
        })
    }

    /// Returns the schema version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the document text the registry was built from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Looks up a command by name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownCommand`] when `name` is not
    /// registered.
    pub fn lookup(&self, name: &str) -> Result<&CommandSpec, ValidationError> {
        self.commands
            .get(name)
            .ok_or_else(|| ValidationError::unknown_command(name))
    }

    /// Returns `true` when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Returns every registered command name in sorted order.
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterates over the specifications in document order.
    pub fn specs(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    /// Validates `params` against the named command and fills in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for unknown commands, missing or unknown
    /// parameters, and type mismatches.
    pub fn validate(
        &self,
        name: &str,
        params: &serde_json::Map<String, Value>,
    ) -> Result<serde_json::Map<String, Value>, ValidationError> {
        let spec = self.lookup(name)?;
        validate::normalise(spec, params)
    }

    /// Returns the JSON description of a single command.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownCommand`] when `name` is not
    /// registered.
    pub fn describe(&self, name: &str) -> Result<Value, ValidationError> {
        let spec = self.lookup(name)?;
        Ok(serde_json::to_value(spec).unwrap_or(Value::Null))
    }
}

impl CommandSpec {
    /// Validates `params` against this command and fills in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] on the first violation found: required
    /// parameters are checked in declaration order, then supplied keys in
    /// input order.
    pub fn validate(
        &self,
        params: &serde_json::Map<String, Value>,
    ) -> Result<serde_json::Map<String, Value>, ValidationError> {
        validate::normalise(self, params)
    }
}
