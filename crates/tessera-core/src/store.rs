//! In-memory table store
//!
//! The set of tables is fixed at construction. Each table sits behind its own
//! RwLock: reads of one table run concurrently, and an update holds the write
//! lock from lookup through mutation so no reader ever sees a half-applied write.

use crate::error::CellError;
use crate::table::{ColumnDef, Table, TableInfo};
use crate::types::Value;
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Owner of every table
pub struct DataStore {
    tables: BTreeMap<String, RwLock<Table>>,
}

impl DataStore {
    /// Create a store owning the given tables. A later table replaces an
    /// earlier one with the same id.
    pub fn new(tables: impl IntoIterator<Item = Table>) -> Self {
        let tables = tables
            .into_iter()
            .map(|t| (t.id().to_string(), RwLock::new(t)))
            .collect();
        Self { tables }
    }

    /// Handle and name of every table, ordered by id
    pub fn list_tables(&self) -> Vec<TableInfo> {
        self.tables.values().map(|t| t.read().info()).collect()
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Read access to a table.
    ///
    /// The guard blocks writers to this table; drop it before any await point.
    pub fn table(&self, table_id: &str) -> Result<RwLockReadGuard<'_, Table>, CellError> {
        self.tables
            .get(table_id)
            .map(|t| t.read())
            .ok_or_else(|| CellError::table_not_found(table_id))
    }

    /// Owned copy of a table
    pub fn snapshot(&self, table_id: &str) -> Result<Table, CellError> {
        self.table(table_id).map(|t| t.clone())
    }

    /// Replace one cell with an already-typed value.
    ///
    /// Checks, in order: table, column, primary key, editable flag, row.
    pub fn update_cell(
        &self,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        value: Value,
    ) -> Result<(), CellError> {
        self.update_cell_with(table_id, row_id, column_id, |_| Ok(value))
    }

    /// Replace one cell, decoding the value against the resolved column.
    ///
    /// `decode` runs under the table's write lock after the column lookup and
    /// before the read-only and row checks, so a type error on a read-only
    /// column reports the type error.
    pub fn update_cell_with<F>(
        &self,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        decode: F,
    ) -> Result<(), CellError>
    where
        F: FnOnce(&ColumnDef) -> Result<Value, CellError>,
    {
        let result = self.apply(table_id, row_id, column_id, decode);
        match &result {
            Ok(()) => debug!(table_id, row_id, column_id, "Cell updated"),
            Err(e) => warn!(table_id, row_id, column_id, error = %e, "Cell update rejected"),
        }
        result
    }

    fn apply<F>(
        &self,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        decode: F,
    ) -> Result<(), CellError>
    where
        F: FnOnce(&ColumnDef) -> Result<Value, CellError>,
    {
        let lock = self
            .tables
            .get(table_id)
            .ok_or_else(|| CellError::table_not_found(table_id))?;
        let mut table = lock.write();

        let column = table
            .column(column_id)
            .ok_or_else(|| CellError::ColumnNotFound {
                column_id: column_id.to_string(),
            })?;

        let value = decode(column)?;

        if column.is_primary {
            return Err(CellError::PrimaryKeyReadOnly {
                column_id: column_id.to_string(),
            });
        }
        if !column.is_editable {
            return Err(CellError::ColumnReadOnly {
                column_id: column_id.to_string(),
            });
        }

        let is_parent_key = table.parent_key() == Some(column_id);
        let row = table.row_mut(row_id).ok_or_else(|| CellError::RowNotFound {
            row_id: row_id.to_string(),
        })?;

        if is_parent_key {
            let parent_id = match &value {
                Value::Absent => None,
                other => Some(other.to_string()),
            };
            row.set_parent_id(parent_id);
        }
        row.set_cell(column_id, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::TableBuilder;
    use crate::types::ColumnType;
    use std::sync::Arc;
    use std::thread;

    fn store() -> DataStore {
        let people = TableBuilder::new("people", "People")
            .primary_key("id")
            .parent_key("pid")
            .column(ColumnDef::new("id", "ID", ColumnType::String, 80).primary().editable())
            .column(ColumnDef::new("pid", "Parent", ColumnType::String, 80).editable())
            .column(ColumnDef::new("name", "Name", ColumnType::String, 200).editable())
            .column(ColumnDef::new("note", "Note", ColumnType::String, 200))
            .column(ColumnDef::new("score", "Score", ColumnType::Number, 80).editable())
            .row([("id", "1".into()), ("name", "A".into())])
            .row([("id", "2".into()), ("pid", "1".into()), ("name", "B".into())])
            .build()
            .unwrap();
        let flat = TableBuilder::new("flat", "Flat")
            .primary_key("k")
            .column(ColumnDef::new("k", "K", ColumnType::String, 80).primary())
            .build()
            .unwrap();
        DataStore::new([people, flat])
    }

    fn kind(r: Result<(), CellError>) -> ErrorKind {
        r.unwrap_err().kind()
    }

    #[test]
    fn test_list_tables_ordered() {
        let store = store();
        let ids: Vec<_> = store.list_tables().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["flat", "people"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_and_read_back() {
        let store = store();
        store
            .update_cell("people", "1", "name", Value::from("Z"))
            .unwrap();
        let table = store.table("people").unwrap();
        assert_eq!(table.row("1").unwrap().cell("name"), &Value::from("Z"));
        assert_eq!(table.row("2").unwrap().cell("name"), &Value::from("B"));
    }

    #[test]
    fn test_update_inserts_missing_cell() {
        let store = store();
        store.update_cell("people", "1", "score", Value::Integer(3)).unwrap();
        assert_eq!(
            store.snapshot("people").unwrap().row("1").unwrap().cell("score"),
            &Value::Integer(3)
        );
    }

    #[test]
    fn test_validation_order() {
        let store = store();
        assert_eq!(
            kind(store.update_cell("nope", "x", "x", Value::Absent)),
            ErrorKind::TableNotFound
        );
        assert_eq!(
            kind(store.update_cell("people", "x", "ghost", Value::Absent)),
            ErrorKind::ColumnNotFound
        );
        // primary beats missing row
        assert_eq!(
            kind(store.update_cell("people", "x", "id", Value::from("9"))),
            ErrorKind::PrimaryKeyReadOnly
        );
        assert_eq!(
            kind(store.update_cell("people", "x", "note", Value::from("n"))),
            ErrorKind::ColumnReadOnly
        );
        assert_eq!(
            kind(store.update_cell("people", "x", "name", Value::from("n"))),
            ErrorKind::RowNotFound
        );
    }

    #[test]
    fn test_primary_rejected_even_if_editable() {
        let store = store();
        let before = store.snapshot("people").unwrap();
        assert_eq!(
            kind(store.update_cell("people", "1", "id", Value::from("99"))),
            ErrorKind::PrimaryKeyReadOnly
        );
        assert_eq!(store.snapshot("people").unwrap(), before);
    }

    #[test]
    fn test_decode_error_precedes_read_only() {
        let store = store();
        let r = store.update_cell_with("people", "1", "note", |_| {
            Err(CellError::MissingValue)
        });
        assert_eq!(kind(r), ErrorKind::MissingValue);
    }

    #[test]
    fn test_parent_key_update_moves_row() {
        let store = store();
        store.update_cell("people", "2", "pid", Value::Absent).unwrap();
        assert_eq!(store.table("people").unwrap().row("2").unwrap().parent_id(), None);

        store.update_cell("people", "1", "pid", Value::from("2")).unwrap();
        assert_eq!(
            store.table("people").unwrap().row("1").unwrap().parent_id(),
            Some("2")
        );
    }

    #[test]
    fn test_concurrent_updates_same_table() {
        let store = Arc::new(store());
        let mut handles = Vec::new();

        for (row, name) in [("1", "left"), ("2", "right")] {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    store
                        .update_cell("people", row, "score", Value::Integer(i))
                        .unwrap();
                    store
                        .update_cell("people", row, "name", Value::from(name))
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let table = store.table("people").unwrap();
        assert_eq!(table.row("1").unwrap().cell("name"), &Value::from("left"));
        assert_eq!(table.row("2").unwrap().cell("name"), &Value::from("right"));
        assert_eq!(table.row("1").unwrap().cell("score"), &Value::Integer(499));
        assert_eq!(table.row("2").unwrap().cell("score"), &Value::Integer(499));
        assert_eq!(table.row("2").unwrap().parent_id(), Some("1"));
    }
}
