//! Typed table store for the tessera server
//!
//! # Features
//! - Closed five-kind cell value model with one shared coercion policy
//! - Schema-validated tables with tree (parent key) support
//! - Per-table reader/writer locking for concurrent protocol adapters
//! - JSON and binary RPC codecs with identical value semantics

pub mod coerce;
pub mod error;
pub mod seed;
pub mod store;
pub mod table;
pub mod types;
pub mod wire;

pub use coerce::{coerce, WireValue};
pub use error::{CellError, ErrorKind, SchemaError};
pub use store::DataStore;
pub use table::{ColumnDef, Row, Table, TableBuilder, TableInfo};
pub use types::{ColumnType, Value, ValueKind};
