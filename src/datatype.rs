use std::fmt::Display;

use tracing::debug;

use crate::table::{Column, ColumnMeta};

/// Target type vocabulary that remote column types are mapped onto.
///
/// `Unknown` means the remote type has no mapping; values in such columns are
/// carried through untyped rather than failing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    UInt8,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    Timestamp,
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int64 => "Int64",
            Self::UInt8 => "UInt8",
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Utf8 => "Utf8",
            Self::Timestamp => "Timestamp",
            Self::Unknown => "Unknown",
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a data warehouse column type name.
///
/// Exact string match, with the nullable/parameterized variants the warehouse
/// actually emits listed explicitly. 256-bit integers and arrays have no
/// in-process representation and stay untyped.
pub fn dw_column_type(remote: &str) -> ColumnType {
    match remote {
        "Int8" | "Int32" | "Int64" => ColumnType::Int64,
        "UInt8" => ColumnType::UInt8,
        "UInt32" => ColumnType::UInt32,
        "UInt64" => ColumnType::UInt64,
        "Float32" => ColumnType::Float32,
        "Float64" | "Nullable(Float64)" => ColumnType::Float64,
        "Decimal(76, 0)" | "Decimal(38, 0)" => ColumnType::Float64,
        "String" | "Nullable(String)" => ColumnType::Utf8,
        "DateTime" | "Nullable(DateTime)" | "DateTime64(3)" => ColumnType::Timestamp,
        "UInt256" | "Nullable(UInt256)" => ColumnType::Unknown,
        "Array(String)" | "Array(UInt32)" | "Array(UInt256)" | "Array(Array(String))" => {
            ColumnType::Unknown
        }
        other => {
            debug!(%other, "unmapped data warehouse column type");
            ColumnType::Unknown
        }
    }
}

/// Map an execution API column type name.
///
/// "varchar" may carry a length parameter, e.g. "varchar(255)"; it
/// canonicalizes to the bare key before lookup.
pub fn alpha_column_type(remote: &str) -> ColumnType {
    let normalized = if remote.starts_with("varchar") {
        "varchar"
    } else {
        remote
    };

    match normalized {
        "bigint" | "integer" => ColumnType::Int64,
        "varchar" => ColumnType::Utf8,
        "timestamp" => ColumnType::Timestamp,
        other => {
            debug!(%other, "unmapped execution api column type");
            ColumnType::Unknown
        }
    }
}

/// Apply a per-dialect type lookup to column metadata, preserving order.
pub fn map_columns(meta: &[ColumnMeta], lookup: impl Fn(&str) -> ColumnType) -> Vec<Column> {
    meta.iter()
        .map(|m| Column {
            name: m.name.clone(),
            datatype: lookup(&m.datatype),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dw_integers() {
        assert_eq!(dw_column_type("Int8"), ColumnType::Int64);
        assert_eq!(dw_column_type("Int64"), ColumnType::Int64);
        assert_eq!(dw_column_type("UInt8"), ColumnType::UInt8);
        assert_eq!(dw_column_type("UInt64"), ColumnType::UInt64);
    }

    #[test]
    fn dw_unrepresentable_types_stay_untyped() {
        assert_eq!(dw_column_type("UInt256"), ColumnType::Unknown);
        assert_eq!(dw_column_type("Nullable(UInt256)"), ColumnType::Unknown);
        assert_eq!(dw_column_type("Array(Array(String))"), ColumnType::Unknown);
    }

    #[test]
    fn dw_timestamps() {
        assert_eq!(dw_column_type("DateTime"), ColumnType::Timestamp);
        assert_eq!(dw_column_type("DateTime64(3)"), ColumnType::Timestamp);
    }

    #[test]
    fn dw_decimals_downgrade_to_float() {
        assert_eq!(dw_column_type("Decimal(76, 0)"), ColumnType::Float64);
    }

    #[test]
    fn dw_unrecognized_does_not_fail() {
        assert_eq!(dw_column_type("Map(String, String)"), ColumnType::Unknown);
    }

    #[test]
    fn alpha_varchar_normalizes() {
        assert_eq!(alpha_column_type("varchar"), ColumnType::Utf8);
        assert_eq!(alpha_column_type("varchar(255)"), ColumnType::Utf8);
    }

    #[test]
    fn alpha_known_types() {
        assert_eq!(alpha_column_type("bigint"), ColumnType::Int64);
        assert_eq!(alpha_column_type("integer"), ColumnType::Int64);
        assert_eq!(alpha_column_type("timestamp"), ColumnType::Timestamp);
    }

    #[test]
    fn alpha_unrecognized_does_not_fail() {
        assert_eq!(alpha_column_type("real"), ColumnType::Unknown);
    }

    #[test]
    fn map_columns_preserves_order() {
        let meta = vec![
            ColumnMeta::new("block", "Int64"),
            ColumnMeta::new("hash", "String"),
            ColumnMeta::new("value", "UInt256"),
        ];
        let columns = map_columns(&meta, dw_column_type);
        let got: Vec<_> = columns.iter().map(|c| (c.name.as_str(), c.datatype)).collect();
        assert_eq!(
            got,
            vec![
                ("block", ColumnType::Int64),
                ("hash", ColumnType::Utf8),
                ("value", ColumnType::Unknown),
            ]
        );
    }
}
