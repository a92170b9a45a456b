//! Grid request compilation.
//!
//! This module provides:
//! - GridRequest: the inbound filter/sort/window/selection model
//! - ColumnResolver: column ids to columns, relation chains and JSON paths
//! - FilterCompiler / SortCompiler / SelectionFilter / PaginationWindow
//! - GridQueryBuilder: runs every stage and executes through a RowSource

mod builder;
mod column;
mod filter;
mod hooks;
mod operator;
mod pagination;
mod relation;
mod request;
mod response;
mod scope;
mod selection;
mod sort;
mod source;
mod subject;

pub use builder::{ALL_COLUMNS, GridQueryBuilder};
pub use column::{ColumnPath, ColumnResolver, RelationStep};
pub use filter::{FilterCompiler, compile_entry};
pub use hooks::{
    ColumnDefinition, CustomFilterHook, ExportColumns, FormatterContext, ValueFormatter,
    ValueResolver,
};
pub use operator::{BoolOperator, DateOperator, FilterKind, NumberOperator, TextOperator};
pub use pagination::PaginationWindow;
pub use request::{
    CombinatorFilter, ExportFormat, FilterNode, GridRequest, LeafFilter, RowModel,
    SortDirection, SortModelEntry,
};
pub use response::{ExportHandoff, GridOutcome, GridResponse};
pub use scope::{CompiledQuery, OrderTerm, QueryScope};
pub use selection::{SelectionFilter, SelectionMode};
pub use sort::SortCompiler;
pub use source::{PgRowSource, RowSource};
pub use subject::{ParentScope, Subject};
