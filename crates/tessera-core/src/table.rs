//! Column descriptors, rows and tables
//!
//! A [`Table`] can only be built through [`TableBuilder`], which checks the
//! schema invariants once so the store never has to.

use crate::coerce::{coerce, WireValue};
use crate::error::SchemaError;
use crate::types::{ColumnType, Value};
use std::collections::{BTreeMap, HashSet};

static ABSENT: Value = Value::Absent;

/// Static metadata for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub id: String,
    pub title: String,
    pub column_type: ColumnType,
    pub width: i32,
    pub is_tree: bool,
    pub is_pinned: bool,
    pub is_editable: bool,
    pub is_primary: bool,
}

impl ColumnDef {
    /// Create a plain column with every flag unset
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        column_type: ColumnType,
        width: i32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            column_type,
            width,
            is_tree: false,
            is_pinned: false,
            is_editable: false,
            is_primary: false,
        }
    }

    pub fn tree(mut self) -> Self {
        self.is_tree = true;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.is_pinned = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.is_editable = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Whether clients may write this column.
    ///
    /// A primary column is never writable, whatever its stored editable flag says.
    pub fn is_writable(&self) -> bool {
        self.is_editable && !self.is_primary
    }
}

/// One data record
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: String,
    parent_id: Option<String>,
    cells: BTreeMap<String, Value>,
}

impl Row {
    /// Primary key value
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Primary key of the parent row, if this row is nested
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Cell content; columns without an entry read as absent
    pub fn cell(&self, column_id: &str) -> &Value {
        self.cells.get(column_id).unwrap_or(&ABSENT)
    }

    /// Stored cells in column id order
    pub fn cells(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn set_cell(&mut self, column_id: &str, value: Value) {
        self.cells.insert(column_id.to_string(), value);
    }

    pub(crate) fn set_parent_id(&mut self, parent_id: Option<String>) {
        self.parent_id = parent_id;
    }
}

/// Handle and display name of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
}

/// A named schema plus its rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    id: String,
    name: String,
    primary_key: String,
    parent_key: String,
    schema: Vec<ColumnDef>,
    rows: Vec<Row>,
}

impl Table {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Parent-reference column id, or `None` for a flat table
    pub fn parent_key(&self) -> Option<&str> {
        if self.parent_key.is_empty() {
            None
        } else {
            Some(&self.parent_key)
        }
    }

    /// Columns in display order
    pub fn columns(&self) -> &[ColumnDef] {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column(&self, column_id: &str) -> Option<&ColumnDef> {
        self.schema.iter().find(|c| c.id == column_id)
    }

    pub fn row(&self, row_id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    pub(crate) fn row_mut(&mut self, row_id: &str) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.id == row_id)
    }

    pub fn info(&self) -> TableInfo {
        TableInfo {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Builder that validates a table definition
#[derive(Debug, Clone)]
pub struct TableBuilder {
    id: String,
    name: String,
    primary_key: String,
    parent_key: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<(String, Value)>>,
}

impl TableBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary_key: String::new(),
            parent_key: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column_id: impl Into<String>) -> Self {
        self.primary_key = column_id.into();
        self
    }

    /// Column holding the parent row's primary key; leave unset for a flat table
    pub fn parent_key(mut self, column_id: impl Into<String>) -> Self {
        self.parent_key = column_id.into();
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a row given as (column id, value) pairs
    pub fn row<'a, I>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        self.rows
            .push(cells.into_iter().map(|(k, v)| (k.to_string(), v)).collect());
        self
    }

    /// Validate the definition and produce the table.
    ///
    /// Cell values go through the same coercion as client updates, so a whole
    /// number seeded into a currency column is stored as a real.
    pub fn build(self) -> Result<Table, SchemaError> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.id.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.id.clone()));
            }
        }

        if !seen.contains(self.primary_key.as_str()) {
            return Err(SchemaError::UnknownPrimaryKey(self.primary_key.clone()));
        }
        if !self.parent_key.is_empty() && !seen.contains(self.parent_key.as_str()) {
            return Err(SchemaError::UnknownParentKey(self.parent_key.clone()));
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        let mut row_ids = HashSet::new();

        for (index, raw) in self.rows.into_iter().enumerate() {
            let mut cells = BTreeMap::new();
            for (column_id, value) in raw {
                let column = self
                    .columns
                    .iter()
                    .find(|c| c.id == column_id)
                    .ok_or_else(|| SchemaError::UnknownCellColumn {
                        row: index,
                        column: column_id.clone(),
                    })?;
                let value = coerce(WireValue::from(&value), column).map_err(|source| {
                    SchemaError::InvalidCell {
                        row: index,
                        column: column_id.clone(),
                        source,
                    }
                })?;
                cells.insert(column_id, value);
            }

            let id = match cells.get(&self.primary_key) {
                Some(Value::Text(id)) => id.clone(),
                _ => return Err(SchemaError::MissingPrimaryKey(index)),
            };

            let parent_id = if self.parent_key.is_empty() {
                None
            } else {
                match cells.get(&self.parent_key) {
                    None | Some(Value::Absent) => None,
                    Some(Value::Text(parent)) => Some(parent.clone()),
                    Some(_) => {
                        return Err(SchemaError::InvalidParentReference {
                            row: index,
                            column: self.parent_key.clone(),
                        })
                    }
                }
            };

            if !row_ids.insert(id.clone()) {
                return Err(SchemaError::DuplicateRow(id));
            }

            rows.push(Row {
                id,
                parent_id,
                cells,
            });
        }

        Ok(Table {
            id: self.id,
            name: self.name,
            primary_key: self.primary_key,
            parent_key: self.parent_key,
            schema: self.columns,
            rows,
        })
    }
}
