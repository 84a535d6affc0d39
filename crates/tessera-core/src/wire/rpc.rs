//! Binary RPC protocol
//!
//! Every message is framed as `code(1) | len(4, big-endian) | payload`. For
//! requests the code is a [`Command`], for responses a [`Status`].
//!
//! Strings are `len(4) | utf8`. Cell values carry a one-byte kind tag, with a
//! dedicated tag for a value field that was sent without a kind.

use crate::coerce::{coerce, WireValue};
use crate::error::CellError;
use crate::table::{ColumnDef, Table, TableInfo};
use crate::types::{ColumnType, Value};
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

/// Frame header size: code(1) + len(4)
pub const HEADER_LEN: usize = 5;

pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024; // 64MB

/// Protocol error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid command: {0}")]
    InvalidCommand(u8),

    #[error("Invalid status: {0}")]
    InvalidStatus(u8),

    #[error("Invalid value type: {0}")]
    InvalidValueType(u8),

    #[error("Invalid column type: {0}")]
    InvalidColumnType(u8),

    #[error("Payload too large: {0} bytes (max 64MB)")]
    PayloadTooLarge(u32),

    #[error("Invalid UTF-8 string")]
    InvalidUtf8,

    #[error("Unexpected end of data")]
    UnexpectedEof,
}

/// Command codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping = 0x01,
    ListTables = 0x02,
    GetSchema = 0x03,
    GetData = 0x04,
    UpdateCell = 0x05,
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x01 => Ok(Command::Ping),
            0x02 => Ok(Command::ListTables),
            0x03 => Ok(Command::GetSchema),
            0x04 => Ok(Command::GetData),
            0x05 => Ok(Command::UpdateCell),
            _ => Err(ProtocolError::InvalidCommand(byte)),
        }
    }
}

/// Response status codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0x00,
    /// Addressed table does not exist; payload is the message
    NotFound = 0x01,
    /// Malformed request; payload is the message
    Error = 0x02,
}

impl TryFrom<u8> for Status {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::NotFound),
            0x02 => Ok(Status::Error),
            _ => Err(ProtocolError::InvalidStatus(byte)),
        }
    }
}

/// Value kind tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    Unset = 0x00,
    Null = 0x01,
    String = 0x02,
    Int = 0x03,
    Double = 0x04,
    Bool = 0x05,
}

/// Cell value as carried on the binary wire
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    /// Value field without a kind
    Unset,
    Null,
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl RpcValue {
    /// Lower into the shared wire shape
    pub fn wire(&self) -> WireValue<'_> {
        match self {
            RpcValue::Unset => WireValue::Unset,
            RpcValue::Null => WireValue::Null,
            RpcValue::String(s) => WireValue::Text(s),
            RpcValue::Int(n) => WireValue::Int(*n),
            RpcValue::Double(x) => WireValue::Real(*x),
            RpcValue::Bool(b) => WireValue::Bool(*b),
        }
    }
}

impl From<&Value> for RpcValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Text(s) => RpcValue::String(s.clone()),
            Value::Integer(n) => RpcValue::Int(*n),
            Value::Real(x) => RpcValue::Double(*x),
            Value::Boolean(b) => RpcValue::Bool(*b),
            Value::Absent => RpcValue::Null,
        }
    }
}

/// Decode an RPC value for the given column
pub fn decode_value(value: &RpcValue, column: &ColumnDef) -> Result<Value, CellError> {
    coerce(value.wire(), column)
}

fn column_type_code(t: ColumnType) -> u8 {
    match t {
        ColumnType::String => 0,
        ColumnType::Number => 1,
        ColumnType::Currency => 2,
        ColumnType::Bool => 3,
    }
}

fn column_type_from_code(code: u8) -> Result<ColumnType, ProtocolError> {
    match code {
        0 => Ok(ColumnType::String),
        1 => Ok(ColumnType::Number),
        2 => Ok(ColumnType::Currency),
        3 => Ok(ColumnType::Bool),
        _ => Err(ProtocolError::InvalidColumnType(code)),
    }
}

const FLAG_TREE: u8 = 0b0001;
const FLAG_PINNED: u8 = 0b0010;
const FLAG_EDITABLE: u8 = 0b0100;
const FLAG_PRIMARY: u8 = 0b1000;

// ----------------------------------------------------------------------------
// Framing
// ----------------------------------------------------------------------------

/// Build a frame from a code byte and payload
pub fn write_frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(code);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

pub fn write_request(cmd: Command, payload: &[u8]) -> Vec<u8> {
    write_frame(cmd as u8, payload)
}

pub fn write_response(status: Status, payload: &[u8]) -> Vec<u8> {
    write_frame(status as u8, payload)
}

/// Parse a frame header into its code byte and payload length
pub fn parse_header(header: &[u8; HEADER_LEN]) -> Result<(u8, usize), ProtocolError> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge(len));
    }
    Ok((header[0], len as usize))
}

/// Read a complete request from bytes
pub fn read_request(data: &[u8]) -> Result<(Command, &[u8]), ProtocolError> {
    let header: &[u8; HEADER_LEN] = data
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(ProtocolError::UnexpectedEof)?;
    let (code, len) = parse_header(header)?;
    let cmd = Command::try_from(code)?;
    let payload = data
        .get(HEADER_LEN..HEADER_LEN + len)
        .ok_or(ProtocolError::UnexpectedEof)?;
    Ok((cmd, payload))
}

// ----------------------------------------------------------------------------
// Primitive encoding
// ----------------------------------------------------------------------------

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn put_value(buf: &mut Vec<u8>, value: &RpcValue) {
    match value {
        RpcValue::Unset => buf.push(ValueTag::Unset as u8),
        RpcValue::Null => buf.push(ValueTag::Null as u8),
        RpcValue::String(s) => {
            buf.push(ValueTag::String as u8);
            put_str(buf, s);
        }
        RpcValue::Int(n) => {
            buf.push(ValueTag::Int as u8);
            buf.extend_from_slice(&n.to_be_bytes());
        }
        RpcValue::Double(x) => {
            buf.push(ValueTag::Double as u8);
            buf.extend_from_slice(&x.to_be_bytes());
        }
        RpcValue::Bool(b) => {
            buf.push(ValueTag::Bool as u8);
            buf.push(u8::from(*b));
        }
    }
}

/// Cursor over a payload
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self.pos.checked_add(n).ok_or(ProtocolError::UnexpectedEof)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(ProtocolError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String, ProtocolError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Element count, bounded by the bytes left so a bad count cannot
    /// trigger a huge allocation
    fn count(&mut self) -> Result<usize, ProtocolError> {
        let count = self.u32()? as usize;
        if count > self.data.len() - self.pos {
            return Err(ProtocolError::UnexpectedEof);
        }
        Ok(count)
    }

    fn value(&mut self) -> Result<RpcValue, ProtocolError> {
        let tag = self.u8()?;
        match tag {
            0x00 => Ok(RpcValue::Unset),
            0x01 => Ok(RpcValue::Null),
            0x02 => Ok(RpcValue::String(self.string()?)),
            0x03 => Ok(RpcValue::Int(self.i64()?)),
            0x04 => Ok(RpcValue::Double(self.f64()?)),
            0x05 => Ok(RpcValue::Bool(self.u8()? != 0)),
            _ => Err(ProtocolError::InvalidValueType(tag)),
        }
    }
}

/// Encode a single value
pub fn encode_value(value: &RpcValue) -> Vec<u8> {
    let mut buf = Vec::new();
    put_value(&mut buf, value);
    buf
}

/// Decode a single value, returning it with the bytes consumed
pub fn decode_rpc_value(data: &[u8]) -> Result<(RpcValue, usize), ProtocolError> {
    let mut reader = Reader::new(data);
    let value = reader.value()?;
    Ok((value, reader.pos))
}

// ----------------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------------

/// Payload of GetSchema and GetData
pub fn encode_table_id(table_id: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + table_id.len());
    put_str(&mut buf, table_id);
    buf
}

pub fn decode_table_id(payload: &[u8]) -> Result<String, ProtocolError> {
    Reader::new(payload).string()
}

/// UpdateCell request
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCellRequest {
    pub table_id: String,
    pub row_id: String,
    pub column_id: String,
    pub value: RpcValue,
}

impl UpdateCellRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_str(&mut buf, &self.table_id);
        put_str(&mut buf, &self.row_id);
        put_str(&mut buf, &self.column_id);
        put_value(&mut buf, &self.value);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(payload);
        Ok(Self {
            table_id: reader.string()?,
            row_id: reader.string()?,
            column_id: reader.string()?,
            value: reader.value()?,
        })
    }
}

// ----------------------------------------------------------------------------
// Responses
// ----------------------------------------------------------------------------

/// UpdateCell result envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCellResponse {
    pub ok: bool,
    /// Empty when `ok`
    pub error_message: String,
}

impl UpdateCellResponse {
    pub fn success() -> Self {
        Self {
            ok: true,
            error_message: String::new(),
        }
    }

    pub fn failure(err: &CellError) -> Self {
        Self {
            ok: false,
            error_message: err.to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![u8::from(self.ok)];
        put_str(&mut buf, &self.error_message);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(payload);
        Ok(Self {
            ok: reader.u8()? != 0,
            error_message: reader.string()?,
        })
    }
}

pub fn encode_table_list(tables: &[TableInfo]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(tables.len() as u32).to_be_bytes());
    for t in tables {
        put_str(&mut buf, &t.id);
        put_str(&mut buf, &t.name);
    }
    buf
}

pub fn decode_table_list(payload: &[u8]) -> Result<Vec<TableInfo>, ProtocolError> {
    let mut reader = Reader::new(payload);
    let count = reader.count()?;
    let mut tables = Vec::with_capacity(count);
    for _ in 0..count {
        tables.push(TableInfo {
            id: reader.string()?,
            name: reader.string()?,
        });
    }
    Ok(tables)
}

/// Column as carried in a schema response
#[derive(Debug, Clone, PartialEq)]
pub struct RpcColumn {
    pub id: String,
    pub title: String,
    pub column_type: ColumnType,
    pub width: i32,
    pub is_tree: bool,
    pub is_pinned: bool,
    pub is_editable: bool,
    pub is_primary: bool,
}

impl From<&ColumnDef> for RpcColumn {
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

impl RpcColumn {
    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.is_tree {
            flags |= FLAG_TREE;
        }
        if self.is_pinned {
            flags |= FLAG_PINNED;
        }
        if self.is_editable {
            flags |= FLAG_EDITABLE;
        }
        if self.is_primary {
            flags |= FLAG_PRIMARY;
        }
        flags
    }
}

/// GetSchema response
#[derive(Debug, Clone, PartialEq)]
pub struct RpcSchema {
    pub table_id: String,
    pub name: String,
    pub primary_key: String,
    pub parent_key: String,
    pub columns: Vec<RpcColumn>,
}

impl From<&Table> for RpcSchema {
    fn from(table: &Table) -> Self {
        Self {
            table_id: table.id().to_string(),
            name: table.name().to_string(),
            primary_key: table.primary_key().to_string(),
            parent_key: table.parent_key().unwrap_or_default().to_string(),
            columns: table.columns().iter().map(RpcColumn::from).collect(),
        }
    }
}

impl RpcSchema {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_str(&mut buf, &self.table_id);
        put_str(&mut buf, &self.name);
        put_str(&mut buf, &self.primary_key);
        put_str(&mut buf, &self.parent_key);
        buf.extend_from_slice(&(self.columns.len() as u32).to_be_bytes());
        for column in &self.columns {
            put_str(&mut buf, &column.id);
            put_str(&mut buf, &column.title);
            buf.push(column_type_code(column.column_type));
            buf.extend_from_slice(&column.width.to_be_bytes());
            buf.push(column.flags());
        }
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(payload);
        let table_id = reader.string()?;
        let name = reader.string()?;
        let primary_key = reader.string()?;
        let parent_key = reader.string()?;

        let count = reader.count()?;
        let mut columns = Vec::with_capacity(count);
        for _ in 0..count {
            let id = reader.string()?;
            let title = reader.string()?;
            let column_type = column_type_from_code(reader.u8()?)?;
            let width = reader.i32()?;
            let flags = reader.u8()?;
            columns.push(RpcColumn {
                id,
                title,
                column_type,
                width,
                is_tree: flags & FLAG_TREE != 0,
                is_pinned: flags & FLAG_PINNED != 0,
                is_editable: flags & FLAG_EDITABLE != 0,
                is_primary: flags & FLAG_PRIMARY != 0,
            });
        }

        Ok(Self {
            table_id,
            name,
            primary_key,
            parent_key,
            columns,
        })
    }
}

/// Row as carried in a GetData response.
///
/// `cells` also holds the primary key and parent key (null when the row has no
/// parent) under their column ids.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub cells: BTreeMap<String, RpcValue>,
}

/// Rows of a table in wire form
pub fn rows_from_table(table: &Table) -> Vec<RpcRow> {
    table
        .rows()
        .iter()
        .map(|row| {
            let mut cells = BTreeMap::new();
            cells.insert(
                table.primary_key().to_string(),
                RpcValue::String(row.id().to_string()),
            );
            if let Some(parent_key) = table.parent_key() {
                let parent = row
                    .parent_id()
                    .map_or(RpcValue::Null, |p| RpcValue::String(p.to_string()));
                cells.insert(parent_key.to_string(), parent);
            }
            for (column_id, value) in row.cells() {
                cells.insert(column_id.to_string(), RpcValue::from(value));
            }
            RpcRow {
                id: row.id().to_string(),
                parent_id: row.parent_id().map(str::to_string),
                cells,
            }
        })
        .collect()
}

pub fn encode_rows(rows: &[RpcRow]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(rows.len() as u32).to_be_bytes());
    for row in rows {
        put_str(&mut buf, &row.id);
        match &row.parent_id {
            Some(parent) => {
                buf.push(1);
                put_str(&mut buf, parent);
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(&(row.cells.len() as u32).to_be_bytes());
        for (key, value) in &row.cells {
            put_str(&mut buf, key);
            put_value(&mut buf, value);
        }
    }
    buf
}

pub fn decode_rows(payload: &[u8]) -> Result<Vec<RpcRow>, ProtocolError> {
    let mut reader = Reader::new(payload);
    let count = reader.count()?;
    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        let id = reader.string()?;
        let parent_id = match reader.u8()? {
            0 => None,
            _ => Some(reader.string()?),
        };
        let cell_count = reader.count()?;
        let mut cells = BTreeMap::new();
        for _ in 0..cell_count {
            let key = reader.string()?;
            let value = reader.value()?;
            cells.insert(key, value);
        }
        rows.push(RpcRow {
            id,
            parent_id,
            cells,
        });
    }
    Ok(rows)
}
