//! Type registry & converters (spec §4.1).
//!
//! Maps the closed set of declared column type names onto a small number of
//! type families, and each family onto a `&str -> CellValue` converter.
//! Families are grouped further into comparability classes used by the
//! predicate compiler to decide whether two operands may be compared.

use std::fmt;

use chrono::NaiveDate;

use crate::error::EngineError;

/// A converted cell. The raw CSV text is the only persisted representation;
/// this is what a value becomes after a column's converter runs on it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Date(NaiveDate),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Boolean(v) => write!(f, "{v}"),
            CellValue::String(v) => write!(f, "{v}"),
            CellValue::Date(v) => write!(f, "{v}"),
            CellValue::Null => write!(f, "null"),
        }
    }
}

/// A family grouping of the declared type names named in spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    String,
    Integer,
    Float,
    Boolean,
    Temporal,
    Null,
}

/// The comparability classes derived from families (spec §3): two operands
/// may only be compared when they share a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparabilityClass {
    /// INTEGER ∪ FLOAT ∪ BOOLEAN
    Numeric,
    /// STRING ∪ TEMPORAL — literals for these families are quoted in SQL and
    /// must be parsed by the column's own converter, never cast numerically.
    Quoted,
}

impl TypeFamily {
    /// Normalizes a declared type name (spec §3's closed set) to its family.
    /// Unknown names are rejected by the caller with `EngineError::Validation`
    /// at catalog-load time or `convert` time.
    pub fn normalize(name: &str) -> Option<TypeFamily> {
        match name.to_ascii_uppercase().as_str() {
            "VARCHAR" | "TEXT" | "CHAR" => Some(TypeFamily::String),
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" | "TINYINT" => Some(TypeFamily::Integer),
            "FLOAT" | "DOUBLE" | "DECIMAL" | "DEC" => Some(TypeFamily::Float),
            "BOOLEAN" | "BOOL" => Some(TypeFamily::Boolean),
            "DATE" | "DATETIME" | "TIMESTAMP" => Some(TypeFamily::Temporal),
            "NULL" => Some(TypeFamily::Null),
            _ => None,
        }
    }

    pub fn comparability_class(self) -> ComparabilityClass {
        match self {
            TypeFamily::Integer | TypeFamily::Float | TypeFamily::Boolean => {
                ComparabilityClass::Numeric
            }
            TypeFamily::String | TypeFamily::Temporal => ComparabilityClass::Quoted,
            TypeFamily::Null => ComparabilityClass::Quoted,
        }
    }

    /// `STRINGLIKE` from spec §3: string family only, used when comparing
    /// two QUOTED-class columns to require they both additionally be strings
    /// (date vs string would still fail downstream when the converter runs).
    pub fn is_stringlike(self) -> bool {
        matches!(self, TypeFamily::String)
    }
}

/// Resolves a declared type name against the family table, failing with
/// `UnknownType` semantics folded into `EngineError::Validation` — the
/// engine-facing surface only distinguishes Validation vs DataAccess, so an
/// unknown declared type (a catalog authoring bug, not a client mistake in
/// the row-streaming path) is reported as a data-access error when
/// encountered while building converters for a scan.
pub fn family_of(declared_type: &str) -> Result<TypeFamily, EngineError> {
    TypeFamily::normalize(declared_type)
        .ok_or_else(|| EngineError::data_access(format!("unknown column type: {declared_type}")))
}

/// Converts one raw CSV cell to its typed value per the declared type's
/// family rules (spec §4.1). Used by the Scan iterator; conversion failure
/// here causes the calling row to be silently dropped (spec §4.3 point 4),
/// never an error surfaced to the client.
pub fn convert(text: &str, declared_type: &str) -> Result<CellValue, EngineError> {
    let family = family_of(declared_type)?;
    convert_family(text, family)
}

fn convert_family(text: &str, family: TypeFamily) -> Result<CellValue, EngineError> {
    match family {
        TypeFamily::String => Ok(CellValue::String(text.to_string())),
        TypeFamily::Integer => text
            .parse::<i64>()
            .map(CellValue::Integer)
            .map_err(|_| EngineError::data_access(format!("invalid integer: {text}"))),
        TypeFamily::Float => text
            .parse::<f64>()
            .map(CellValue::Float)
            .map_err(|_| EngineError::data_access(format!("invalid float: {text}"))),
        TypeFamily::Boolean => match text {
            "TRUE" => Ok(CellValue::Boolean(true)),
            "FALSE" => Ok(CellValue::Boolean(false)),
            _ => Err(EngineError::data_access(format!("invalid boolean: {text}"))),
        },
        TypeFamily::Temporal => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(CellValue::Date)
            .map_err(|_| EngineError::data_access(format!("invalid date (YYYY-MM-DD): {text}"))),
        TypeFamily::Null => {
            if text.eq_ignore_ascii_case("null") {
                Ok(CellValue::Null)
            } else {
                Err(EngineError::data_access(format!("invalid null: {text}")))
            }
        }
    }
}

/// Strips one pair of surrounding single quotes from a SQL string literal.
/// Only applies to literals parsed out of SQL text, never to raw CSV cells
/// (spec §4.1).
pub fn strip_literal_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// A per-column converter, precomputed once per schema (spec §4.1
/// `converters_for`).
pub struct Converter {
    pub family: TypeFamily,
}

pub fn converters_for(column_types: &[String]) -> Result<Vec<Converter>, EngineError> {
    column_types
        .iter()
        .map(|t| family_of(t).map(|family| Converter { family }))
        .collect()
}

impl Converter {
    pub fn convert(&self, text: &str) -> Result<CellValue, EngineError> {
        convert_family(text, self.family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_all_families() {
        assert_eq!(TypeFamily::normalize("VARCHAR"), Some(TypeFamily::String));
        assert_eq!(TypeFamily::normalize("bigint"), Some(TypeFamily::Integer));
        assert_eq!(TypeFamily::normalize("DOUBLE"), Some(TypeFamily::Float));
        assert_eq!(TypeFamily::normalize("BOOL"), Some(TypeFamily::Boolean));
        assert_eq!(TypeFamily::normalize("TIMESTAMP"), Some(TypeFamily::Temporal));
        assert_eq!(TypeFamily::normalize("NULL"), Some(TypeFamily::Null));
        assert_eq!(TypeFamily::normalize("NOPE"), None);
    }

    #[test]
    fn converts_each_family() {
        assert_eq!(convert("hello", "VARCHAR").unwrap(), CellValue::String("hello".into()));
        assert_eq!(convert("42", "INT").unwrap(), CellValue::Integer(42));
        assert_eq!(convert("3.5", "FLOAT").unwrap(), CellValue::Float(3.5));
        assert_eq!(convert("TRUE", "BOOL").unwrap(), CellValue::Boolean(true));
        assert!(convert("true", "BOOL").is_err());
        assert_eq!(
            convert("2020-01-02", "DATE").unwrap(),
            CellValue::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap())
        );
        assert_eq!(convert("NuLL", "NULL").unwrap(), CellValue::Null);
        assert!(convert("abc", "INT").is_err());
        assert!(convert("x", "NOTATYPE").is_err());
    }

    #[test]
    fn strips_single_quote_pair() {
        assert_eq!(strip_literal_quotes("'abc'"), "abc");
        assert_eq!(strip_literal_quotes("abc"), "abc");
        assert_eq!(strip_literal_quotes("'"), "'");
    }
}
