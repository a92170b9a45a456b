//! Grid query compiler.
//!
//! Turns the filter, sort, row-window and selection model a data grid sends
//! into PostgreSQL statements over a declared entity schema, and executes
//! them for pages, totals and distinct value listings.

pub mod config;
pub mod error;
pub mod grid;
pub mod schema;

pub use error::{GridError, GridResult};
pub use grid::{GridOutcome, GridQueryBuilder, GridRequest, GridResponse, RowSource, Subject};
pub use schema::{EntitySchema, SchemaRegistry, load_schema};
