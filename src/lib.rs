//! A cost-based relational query planner: given table/index statistics and
//! a conjunctive WHERE expression, produce an execution plan (access
//! method per table, join order) minimizing estimated cost.
//!
//! The planner is pure and synchronous: no I/O, no clocks, no logging.
//! Callers own the SQL parser, execution engine, and storage layer; this
//! crate only decides *how* to answer a query, never runs one.

pub mod bitmask;
pub mod cost;
pub mod error;
pub mod explain;
pub mod expr;
pub mod logest;
pub mod planner;
pub mod schema;
pub mod where_loop;
pub mod where_path;
pub mod where_term;

pub use error::{Error, ErrorCode, Result};
pub use explain::explain;
pub use expr::{ColumnRef, CompareOp, Expr, Literal, RightHandSide};
pub use planner::{analyse_expression, plan, select_best_index, validate, Planner, WhereInfo};
pub use schema::{IndexColumn, IndexInfo, IndexStats, TableInfo};
pub use where_loop::{WhereLoop, WhereLoopFlags};
pub use where_path::WherePath;
pub use where_term::{TermOp, WhereClause, WhereTerm, WhereTermFlags};
