//! Naming conventions.
//!
//! A [`Translator`] maps logical table and column names from the schema to
//! the physical identifiers used in SQL. Translators are pure: they never
//! fail and never touch the database. Unmapped names pass through.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Maps logical names to physical SQL identifiers.
pub trait Translator: Send + Sync {
    /// Physical name of a table.
    fn sql_table(&self, table: &str) -> String;

    /// Physical name of a column of `table`.
    fn sql_column(&self, table: &str, column: &str) -> String;
}

impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn sql_table(&self, table: &str) -> String {
        (**self).sql_table(table)
    }

    fn sql_column(&self, table: &str, column: &str) -> String {
        (**self).sql_column(table, column)
    }
}

/// Uses logical names unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Translator for Identity {
    fn sql_table(&self, table: &str) -> String {
        table.to_string()
    }

    fn sql_column(&self, _table: &str, column: &str) -> String {
        column.to_string()
    }
}

/// Lower-cases every name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lower;

impl Translator for Lower {
    fn sql_table(&self, table: &str) -> String {
        table.to_lowercase()
    }

    fn sql_column(&self, _table: &str, column: &str) -> String {
        column.to_lowercase()
    }
}

/// `BlogPost` becomes `blog_post`, `UserID` becomes `user_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Snake;

impl Translator for Snake {
    fn sql_table(&self, table: &str) -> String {
        table.to_case(Case::Snake)
    }

    fn sql_column(&self, _table: &str, column: &str) -> String {
        column.to_case(Case::Snake)
    }
}

/// Snake-cased names with pluralized tables: `BlogPost` becomes `blog_posts`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rails;

impl Translator for Rails {
    fn sql_table(&self, table: &str) -> String {
        pluralize(&table.to_case(Case::Snake))
    }

    fn sql_column(&self, _table: &str, column: &str) -> String {
        column.to_case(Case::Snake)
    }
}

/// Prepends fixed prefixes to table and column names.
#[derive(Debug, Clone, Default)]
pub struct Prefix {
    /// Prefix for table names.
    pub table_prefix: String,
    /// Prefix for column names.
    pub column_prefix: String,
}

impl Prefix {
    /// Creates a prefixing translator.
    #[must_use]
    pub fn new(table_prefix: impl Into<String>, column_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
            column_prefix: column_prefix.into(),
        }
    }
}

impl Translator for Prefix {
    fn sql_table(&self, table: &str) -> String {
        format!("{}{table}", self.table_prefix)
    }

    fn sql_column(&self, _table: &str, column: &str) -> String {
        format!("{}{column}", self.column_prefix)
    }
}

/// Explicit per-name overrides on top of an optional fallback strategy.
#[derive(Clone, Default)]
pub struct Overrides {
    tables: HashMap<String, String>,
    columns: HashMap<String, HashMap<String, String>>,
    fallback: Option<Arc<dyn Translator>>,
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("tables", &self.tables)
            .field("columns", &self.columns)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Overrides {
    /// Creates an empty override set with no fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `fallback` for names without an override.
    #[must_use]
    pub fn fallback(mut self, fallback: Arc<dyn Translator>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Maps a logical table to a fixed physical name.
    #[must_use]
    pub fn table(mut self, logical: impl Into<String>, physical: impl Into<String>) -> Self {
        self.tables.insert(logical.into(), physical.into());
        self
    }

    /// Maps a logical column of `table` to a fixed physical name.
    #[must_use]
    pub fn column(
        mut self,
        table: impl Into<String>,
        logical: impl Into<String>,
        physical: impl Into<String>,
    ) -> Self {
        self.columns
            .entry(table.into())
            .or_default()
            .insert(logical.into(), physical.into());
        self
    }
}

impl Translator for Overrides {
    fn sql_table(&self, table: &str) -> String {
        if let Some(name) = self.tables.get(table) {
            return name.clone();
        }
        match &self.fallback {
            Some(fallback) => fallback.sql_table(table),
            None => table.to_string(),
        }
    }

    fn sql_column(&self, table: &str, column: &str) -> String {
        if let Some(name) = self.columns.get(table).and_then(|cols| cols.get(column)) {
            return name.clone();
        }
        match &self.fallback {
            Some(fallback) => fallback.sql_column(table, column),
            None => column.to_string(),
        }
    }
}

/// Built-in naming strategies, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// [`Identity`].
    #[default]
    Identity,
    /// [`Lower`].
    Lower,
    /// [`Snake`].
    Snake,
    /// [`Rails`].
    Rails,
    /// [`Prefix`], with prefixes taken from configuration.
    Prefix,
}

impl FromStr for NamingStrategy {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" | "none" => Ok(Self::Identity),
            "lower" | "lowercase" => Ok(Self::Lower),
            "snake" | "underscore" => Ok(Self::Snake),
            "rails" => Ok(Self::Rails),
            "prefix" => Ok(Self::Prefix),
            other => Err(ReconcileError::Config(format!(
                "unknown naming strategy '{other}'"
            ))),
        }
    }
}

/// English pluralization good enough for table names.
fn pluralize(name: &str) -> String {
    let ends_with_consonant_y = name.ends_with('y')
        && !name[..name.len() - 1].ends_with(|c: char| "aeiou".contains(c));

    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        format!("{name}es")
    } else if ends_with_consonant_y {
        format!("{}ies", &name[..name.len() - 1])
    } else {
        format!("{name}s")
    }
}
