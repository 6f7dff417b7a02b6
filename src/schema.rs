//! Read-only input description: tables, indexes, and their statistics.
//!
//! These types describe what the planner is told about the schema and its
//! cardinalities; the planner never mutates them and never goes looking
//! for more. No I/O, no stats collection: that is a caller's job.

use crate::bitmask::Bitmask;
use crate::logest::{self, LogEst};

/// Per-prefix statistics for an index: row count and, for each prefix
/// length `k` (1-indexed column position), the estimated number of
/// distinct values and the average number of rows per value.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub row_count: LogEst,
    /// `distinct_logest[k-1]` is the distinct-value estimate for the
    /// first `k` columns of the index.
    pub distinct_logest: Vec<LogEst>,
}

impl IndexStats {
    pub fn new(row_count: LogEst, distinct_logest: Vec<LogEst>) -> Self {
        IndexStats {
            row_count,
            distinct_logest,
        }
    }

    /// Estimated rows matching an equality lookup on the first `prefix`
    /// columns: `row_count / distinct(prefix)`, expressed directly in log
    /// space as a subtraction.
    pub fn rows_for_prefix(&self, prefix: usize) -> Option<LogEst> {
        if prefix == 0 {
            return Some(self.row_count);
        }
        self.distinct_logest
            .get(prefix - 1)
            .map(|&distinct| logest::sub(self.row_count, distinct).max(0))
    }

    /// Distinct-value estimate for the first `prefix` columns, if known.
    pub fn distinct_for_prefix(&self, prefix: usize) -> Option<LogEst> {
        if prefix == 0 {
            return None;
        }
        self.distinct_logest.get(prefix - 1).copied()
    }
}

/// One column of an index: which table column it projects, and whether it
/// is sorted ascending or descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexColumn {
    pub table_column: usize,
    pub descending: bool,
}

impl IndexColumn {
    pub fn asc(table_column: usize) -> Self {
        IndexColumn {
            table_column,
            descending: false,
        }
    }
}

/// An index available on a table.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub is_primary_key: bool,
    pub stats: Option<IndexStats>,
}

impl IndexInfo {
    pub fn new(name: impl Into<String>, columns: Vec<IndexColumn>) -> Self {
        IndexInfo {
            name: name.into(),
            columns,
            unique: false,
            is_primary_key: false,
            stats: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.unique = true;
        self.is_primary_key = true;
        self
    }

    pub fn with_stats(mut self, stats: IndexStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of `table_column` within this index's column list, if it
    /// appears.
    pub fn position_of(&self, table_column: usize) -> Option<usize> {
        self.columns.iter().position(|c| c.table_column == table_column)
    }

    /// Does every column this index carries cover `needed`? Used to decide
    /// the IDX_ONLY flag.
    pub fn covers(&self, needed: &[usize]) -> bool {
        needed
            .iter()
            .all(|col| self.columns.iter().any(|c| c.table_column == *col))
    }
}

/// A table participating in the query. `cursor` is this table's position
/// in the FROM list and doubles as its identity for `Bitmask` purposes.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub cursor: usize,
    pub row_count: LogEst,
    pub columns: Vec<String>,
    pub indexes: Vec<IndexInfo>,
    /// Column acting as the rowid/INTEGER PRIMARY KEY alias, if any.
    pub rowid_alias: Option<usize>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, cursor: usize, row_count: i64, columns: Vec<String>) -> Self {
        TableInfo {
            name: name.into(),
            cursor,
            row_count: logest::from_int(row_count),
            columns,
            indexes: Vec::new(),
            rowid_alias: None,
        }
    }

    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_rowid_alias(mut self, column: usize) -> Self {
        self.rowid_alias = Some(column);
        self
    }

    pub fn mask(&self) -> Bitmask {
        Bitmask::for_cursor(self.cursor)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}
