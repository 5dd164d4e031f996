use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::datatype::ColumnType;
use crate::errors::{ChainbaseError, Result};

/// Column description as it appears on the wire: a name and the remote type
/// name. Order within a metadata list is significant and defines column order
/// in the assembled table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub datatype: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: datatype.into(),
        }
    }
}

/// A column in an assembled table: its name plus the mapped target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub datatype: ColumnType,
}

/// A single cell value.
///
/// `Raw` carries a wire value untouched, either because its column mapped to
/// [`ColumnType::Unknown`] or because the caller asked for uncoerced rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int64(i64),
    UInt8(u8),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    Timestamp(NaiveDateTime),
    Raw(JsonValue),
}

/// Raw result rows, in the two shapes the wire protocols produce them.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    /// Each row maps column names to values (data warehouse endpoint).
    Named(Vec<Map<String, JsonValue>>),
    /// Each row lists values positionally, aligned with metadata (execution
    /// endpoint).
    Positional(Vec<Vec<JsonValue>>),
}

/// Whether assembly coerces cell values into their mapped column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Coerce each cell per its column's type; `Unknown` columns stay raw.
    Typed,
    /// Leave every cell raw; columns still carry their mapped types.
    Raw,
}

/// Typed tabular query result: ordered columns plus row data.
///
/// Every row has exactly one value per column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Assemble a table from mapped columns and raw rows.
    ///
    /// Named rows are read by column name; a missing key becomes `Null`.
    /// Positional rows must match the column count exactly.
    pub fn try_new(columns: Vec<Column>, rows: Rows, coercion: Coercion) -> Result<Self> {
        let rows = match rows {
            Rows::Named(rows) => rows
                .into_iter()
                .map(|mut row| {
                    columns
                        .iter()
                        .map(|col| {
                            let raw = row.remove(&col.name).unwrap_or(JsonValue::Null);
                            cell(col, raw, coercion)
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?,
            Rows::Positional(rows) => rows
                .into_iter()
                .map(|row| {
                    if row.len() != columns.len() {
                        return Err(ChainbaseError::RowWidth {
                            expected: columns.len(),
                            actual: row.len(),
                        });
                    }
                    row.into_iter()
                        .zip(columns.iter())
                        .map(|(raw, col)| cell(col, raw, coercion))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

fn cell(col: &Column, raw: JsonValue, coercion: Coercion) -> Result<Value> {
    match coercion {
        Coercion::Typed => coerce_value(col, raw),
        Coercion::Raw => Ok(match raw {
            JsonValue::Null => Value::Null,
            other => Value::Raw(other),
        }),
    }
}

fn coerce_value(col: &Column, raw: JsonValue) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if col.datatype == ColumnType::Unknown {
        return Ok(Value::Raw(raw));
    }

    let coerced = match col.datatype {
        ColumnType::Unknown => unreachable!(),
        ColumnType::Int64 => as_i64(&raw).map(Value::Int64),
        ColumnType::UInt8 => as_u64(&raw).and_then(|v| u8::try_from(v).ok()).map(Value::UInt8),
        ColumnType::UInt32 => as_u64(&raw)
            .and_then(|v| u32::try_from(v).ok())
            .map(Value::UInt32),
        ColumnType::UInt64 => as_u64(&raw).map(Value::UInt64),
        ColumnType::Float32 => as_f64(&raw).map(|v| Value::Float32(v as f32)),
        ColumnType::Float64 => as_f64(&raw).map(Value::Float64),
        ColumnType::Utf8 => match &raw {
            JsonValue::String(s) => Some(Value::Utf8(s.clone())),
            other => Some(Value::Utf8(other.to_string())),
        },
        ColumnType::Timestamp => raw.as_str().and_then(parse_timestamp).map(Value::Timestamp),
    };

    coerced.ok_or_else(|| ChainbaseError::InvalidColumnValue {
        column: col.name.clone(),
        value: raw.to_string(),
    })
}

// Numeric cells arrive either as JSON numbers or as decimal strings,
// depending on the endpoint and the column's width.

fn as_i64(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_u64(raw: &JsonValue) -> Option<u64> {
    match raw {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_f64(raw: &JsonValue) -> Option<f64> {
    match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}
