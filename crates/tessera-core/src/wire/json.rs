//! JSON representation of tables, rows and cell values

use crate::coerce::{coerce, WireValue};
use crate::error::CellError;
use crate::table::{ColumnDef, Table, TableInfo};
use crate::types::{ColumnType, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

const REQUIRED_FIELDS: &str = "row_id, column_id and value are required";

/// Entry of the table listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub id: String,
    pub name: String,
}

impl From<TableInfo> for TableEntry {
    fn from(info: TableInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
        }
    }
}

/// Table schema payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaPayload {
    pub table_id: String,
    pub name: String,
    pub primary_key: String,
    /// Empty for a flat table
    pub parent_key: String,
    pub columns: Vec<ColumnPayload>,
}

/// One column of a [`SchemaPayload`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPayload {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub width: i32,
    #[serde(rename = "isTreeColumn")]
    pub is_tree: bool,
    pub is_pinned: bool,
    pub is_editable: bool,
    pub is_primary: bool,
}

impl From<&ColumnDef> for ColumnPayload {
    fn from(column: &ColumnDef) -> Self {
        Self {
            id: column.id.clone(),
            title: column.title.clone(),
            column_type: column.column_type,
            width: column.width,
            is_tree: column.is_tree,
            is_pinned: column.is_pinned,
            is_editable: column.is_writable(),
            is_primary: column.is_primary,
        }
    }
}

/// Body of a cell update request
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub row_id: String,
    pub column_id: String,
    pub value: JsonValue,
}

impl UpdateRequest {
    /// Parse a raw request body.
    ///
    /// `value` must be present but may be `null`; the id fields must be strings.
    pub fn parse(body: &[u8]) -> Result<Self, CellError> {
        Self::from_json(parse_body(body)?)
    }

    /// Extract the request fields from an already-parsed body
    pub fn from_json(body: JsonValue) -> Result<Self, CellError> {
        let required = || CellError::InvalidRequestShape(REQUIRED_FIELDS.to_string());
        let mut object = match body {
            JsonValue::Object(map) => map,
            _ => return Err(required()),
        };

        let row_id = take_string(&mut object, "row_id").ok_or_else(required)?;
        let column_id = take_string(&mut object, "column_id").ok_or_else(required)?;
        let value = object.remove("value").ok_or_else(required)?;

        Ok(Self {
            row_id,
            column_id,
            value,
        })
    }
}

/// Parse a request body as JSON, rejecting anything that is not valid JSON
pub fn parse_body(body: &[u8]) -> Result<JsonValue, CellError> {
    serde_json::from_slice(body)
        .map_err(|_| CellError::InvalidRequestShape("invalid json".to_string()))
}

fn take_string(object: &mut Map<String, JsonValue>, key: &str) -> Option<String> {
    match object.remove(key) {
        Some(JsonValue::String(s)) => Some(s),
        _ => None,
    }
}

/// Lower a JSON value into its wire shape
pub fn wire_value(json: &JsonValue) -> WireValue<'_> {
    match json {
        JsonValue::Null => WireValue::Null,
        JsonValue::Bool(b) => WireValue::Bool(*b),
        JsonValue::String(s) => WireValue::Text(s),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => WireValue::Int(i),
            None => WireValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::Array(_) => WireValue::Unsupported("array"),
        JsonValue::Object(_) => WireValue::Unsupported("object"),
    }
}

/// Decode a JSON value for the given column
pub fn decode_value(json: &JsonValue, column: &ColumnDef) -> Result<Value, CellError> {
    coerce(wire_value(json), column)
}

/// Encode a cell value; non-finite reals become `null`
pub fn encode_value(value: &Value) -> JsonValue {
    match value {
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Integer(n) => JsonValue::Number((*n).into()),
        Value::Real(x) => Number::from_f64(*x).map_or(JsonValue::Null, JsonValue::Number),
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Absent => JsonValue::Null,
    }
}

pub fn encode_table_list(tables: Vec<TableInfo>) -> Vec<TableEntry> {
    tables.into_iter().map(TableEntry::from).collect()
}

pub fn encode_schema(table: &Table) -> SchemaPayload {
    SchemaPayload {
        table_id: table.id().to_string(),
        name: table.name().to_string(),
        primary_key: table.primary_key().to_string(),
        parent_key: table.parent_key().unwrap_or_default().to_string(),
        columns: table.columns().iter().map(ColumnPayload::from).collect(),
    }
}

/// Encode every row as a flat object.
///
/// Each object carries the primary key and parent key (or `null`) under their
/// column ids, so a record is self-describing without the schema.
pub fn encode_rows(table: &Table) -> Vec<JsonValue> {
    table
        .rows()
        .iter()
        .map(|row| {
            let mut object = Map::new();
            object.insert(
                table.primary_key().to_string(),
                JsonValue::String(row.id().to_string()),
            );
            if let Some(parent_key) = table.parent_key() {
                let parent = row
                    .parent_id()
                    .map_or(JsonValue::Null, |p| JsonValue::String(p.to_string()));
                object.insert(parent_key.to_string(), parent);
            }
            for (column_id, value) in row.cells() {
                object.insert(column_id.to_string(), encode_value(value));
            }
            JsonValue::Object(object)
        })
        .collect()
}
