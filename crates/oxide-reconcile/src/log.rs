//! Decision log.
//!
//! Every check the engine makes and every statement it executes is recorded
//! as a [`Decision`]. Decisions always go to `tracing`; a [`DecisionSink`]
//! can additionally collect them (tests, reports). The default sink discards.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

/// A single check or action taken during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Asked whether a table exists.
    TableChecked {
        /// Logical table name.
        table: String,
        /// Answer.
        exists: bool,
    },
    /// Asked whether a column exists.
    ColumnChecked {
        /// Logical table name.
        table: String,
        /// Logical column name.
        column: String,
        /// Answer.
        exists: bool,
    },
    /// The table is missing and will be created.
    TableNew {
        /// Logical table name.
        table: String,
    },
    /// The table exists but lacks at least `column`.
    TableModified {
        /// Logical table name.
        table: String,
        /// First missing column found.
        column: String,
    },
    /// The table matches the schema.
    TableCurrent {
        /// Logical table name.
        table: String,
    },
    /// Creation postponed until its parents exist.
    TableDeferred {
        /// Logical table name.
        table: String,
        /// Parents not created yet.
        waiting_on: Vec<String>,
    },
    /// A table was created.
    TableCreated {
        /// Logical table name.
        table: String,
        /// Statement executed.
        sql: String,
    },
    /// A column was added to an existing table.
    ColumnAdded {
        /// Logical table name.
        table: String,
        /// Logical column name.
        column: String,
        /// Statement executed.
        sql: String,
    },
    /// Asked whether an index exists.
    IndexChecked {
        /// Logical table name.
        table: String,
        /// Logical column names of the index.
        columns: Vec<String>,
        /// Name of the matching index, if found.
        found: Option<String>,
    },
    /// An index was created.
    IndexCreated {
        /// Logical table name.
        table: String,
        /// Generated index name.
        index: String,
        /// Statement executed.
        sql: String,
    },
    /// A modified table finished reconciliation.
    TableUpdated {
        /// Logical table name.
        table: String,
    },
}

impl Decision {
    /// The statement executed for this decision, if it wrote anything.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::TableCreated { sql, .. }
            | Self::ColumnAdded { sql, .. }
            | Self::IndexCreated { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Whether this decision changed the database.
    #[must_use]
    pub fn is_write(&self) -> bool {
        self.sql().is_some()
    }

    /// The logical table this decision is about.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::TableChecked { table, .. }
            | Self::ColumnChecked { table, .. }
            | Self::TableNew { table }
            | Self::TableModified { table, .. }
            | Self::TableCurrent { table }
            | Self::TableDeferred { table, .. }
            | Self::TableCreated { table, .. }
            | Self::ColumnAdded { table, .. }
            | Self::IndexChecked { table, .. }
            | Self::IndexCreated { table, .. }
            | Self::TableUpdated { table } => table,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableChecked { table, exists } => {
                write!(f, "table {table}: exists={exists}")
            }
            Self::ColumnChecked {
                table,
                column,
                exists,
            } => write!(f, "column {table}.{column}: exists={exists}"),
            Self::TableNew { table } => write!(f, "table {table}: new"),
            Self::TableModified { table, column } => {
                write!(f, "table {table}: modified (missing {column})")
            }
            Self::TableCurrent { table } => write!(f, "table {table}: up to date"),
            Self::TableDeferred { table, waiting_on } => {
                write!(f, "table {table}: waiting on {}", waiting_on.join(", "))
            }
            Self::TableCreated { sql, .. }
            | Self::ColumnAdded { sql, .. }
            | Self::IndexCreated { sql, .. } => f.write_str(sql),
            Self::IndexChecked {
                table,
                columns,
                found,
            } => match found {
                Some(name) => write!(f, "index {table}({}): found {name}", columns.join(", ")),
                None => write!(f, "index {table}({}): missing", columns.join(", ")),
            },
            Self::TableUpdated { table } => write!(f, "table {table}: updated"),
        }
    }
}

/// Receives decisions as they are made.
pub trait DecisionSink: Send + Sync {
    /// Records one decision.
    fn record(&self, decision: &Decision);
}

/// Drops every decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl DecisionSink for Discard {
    fn record(&self, _decision: &Decision) {}
}

/// Keeps every decision in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    decisions: Mutex<Vec<Decision>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded decisions.
    #[must_use]
    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the statements executed, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.decisions()
            .iter()
            .filter_map(|d| d.sql().map(str::to_string))
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.decisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DecisionSink for MemorySink {
    fn record(&self, decision: &Decision) {
        self.decisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(decision.clone());
    }
}

/// Cloneable handle shared by the driver and the alterer.
#[derive(Clone)]
pub struct DecisionLog {
    sink: Arc<dyn DecisionSink>,
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new(Arc::new(Discard))
    }
}

impl fmt::Debug for DecisionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionLog").finish_non_exhaustive()
    }
}

impl DecisionLog {
    /// Creates a log writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn DecisionSink>) -> Self {
        Self { sink }
    }

    /// Records a decision and emits it as a tracing event.
    pub fn record(&self, decision: Decision) {
        if decision.is_write() {
            info!(table = %decision.table(), "{decision}");
        } else {
            debug!(table = %decision.table(), "{decision}");
        }
        self.sink.record(&decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_is_default() {
        let log = DecisionLog::default();
        log.record(Decision::TableNew {
            table: "User".to_string(),
        });
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = Arc::new(MemorySink::new());
        let log = DecisionLog::new(sink.clone());

        log.record(Decision::TableChecked {
            table: "User".to_string(),
            exists: false,
        });
        log.record(Decision::TableCreated {
            table: "User".to_string(),
            sql: "CREATE TABLE user(id INTEGER)".to_string(),
        });

        assert_eq!(sink.decisions().len(), 2);
        assert_eq!(sink.statements(), vec!["CREATE TABLE user(id INTEGER)"]);

        sink.clear();
        assert!(sink.decisions().is_empty());
    }

    #[test]
    fn test_memory_sink_survives_poisoned_lock() {
        let sink = Arc::new(MemorySink::new());
        let poisoner = Arc::clone(&sink);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.decisions.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(sink.decisions.is_poisoned());

        let log = DecisionLog::new(sink.clone());
        log.record(Decision::TableNew {
            table: "User".to_string(),
        });
        assert_eq!(sink.decisions().len(), 1);

        sink.clear();
        assert!(sink.decisions().is_empty());
    }

    #[test]
    fn test_display() {
        let d = Decision::TableDeferred {
            table: "Post".to_string(),
            waiting_on: vec!["User".to_string()],
        };
        assert_eq!(d.to_string(), "table Post: waiting on User");
        assert!(!d.is_write());
        assert_eq!(d.table(), "Post");
    }
}
