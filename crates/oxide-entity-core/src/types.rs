//! Abstract column types and their dialect-native counterparts.

use core::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseTypeError;

/// Database-independent column types an entity can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Two-byte integer.
    #[serde(alias = "int2")]
    SmallInt,
    /// Four-byte integer.
    #[serde(alias = "int", alias = "int4")]
    Integer,
    /// Eight-byte integer.
    #[serde(alias = "int8")]
    BigInt,
    /// Single-precision float.
    #[serde(alias = "real")]
    Float,
    /// Double-precision float.
    Double,
    /// Exact numeric with precision and scale.
    #[serde(alias = "numeric")]
    Decimal,
    /// Boolean.
    #[serde(alias = "bool")]
    Boolean,
    /// Fixed-length string.
    Char,
    /// Variable-length string.
    #[serde(alias = "string")]
    Varchar,
    /// Unbounded text.
    Text,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp without time zone.
    #[serde(alias = "datetime")]
    Timestamp,
    /// Timestamp with time zone.
    TimestampTz,
    /// 128-bit universally unique identifier.
    Uuid,
    /// IPv4 address.
    Inet4,
    /// IPv6 address.
    Inet6,
    /// JSON document.
    Json,
    /// Binary JSON document.
    Jsonb,
    /// Enumerated string values.
    Enum,
    /// Binary large object.
    #[serde(alias = "bytea", alias = "binary")]
    Blob,
}

impl ColumnType {
    /// Every abstract type, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Float,
        Self::Double,
        Self::Decimal,
        Self::Boolean,
        Self::Char,
        Self::Varchar,
        Self::Text,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::TimestampTz,
        Self::Uuid,
        Self::Inet4,
        Self::Inet6,
        Self::Json,
        Self::Jsonb,
        Self::Enum,
        Self::Blob,
    ];

    /// Returns the canonical lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Uuid => "uuid",
            Self::Inet4 => "inet4",
            Self::Inet6 => "inet6",
            Self::Json => "json",
            Self::Jsonb => "jsonb",
            Self::Enum => "enum",
            Self::Blob => "blob",
        }
    }

    /// Returns `true` for integer types usable with increment generation.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }

    /// Returns `true` for types whose values are textual on the wire.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Char | Self::Varchar | Self::Text | Self::Uuid | Self::Inet4 | Self::Inet6 | Self::Enum
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let ty = match lowered.as_str() {
            "smallint" | "int2" => Self::SmallInt,
            "integer" | "int" | "int4" => Self::Integer,
            "bigint" | "int8" => Self::BigInt,
            "float" | "real" => Self::Float,
            "double" => Self::Double,
            "decimal" | "numeric" => Self::Decimal,
            "boolean" | "bool" => Self::Boolean,
            "char" => Self::Char,
            "varchar" | "string" => Self::Varchar,
            "text" => Self::Text,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" | "datetime" => Self::Timestamp,
            "timestamptz" => Self::TimestampTz,
            "uuid" => Self::Uuid,
            "inet4" => Self::Inet4,
            "inet6" => Self::Inet6,
            "json" => Self::Json,
            "jsonb" => Self::Jsonb,
            "enum" => Self::Enum,
            "blob" | "bytea" | "binary" => Self::Blob,
            _ => return Err(ParseTypeError(s.to_string())),
        };
        Ok(ty)
    }
}

/// How a column value is generated when the caller leaves it empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStrategy {
    /// Database auto-increment.
    Increment,
    /// Random (v4) uuid assigned before insert.
    Uuid,
}

/// Length modifier of a native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeLength {
    /// Explicit character/byte count.
    Fixed(u32),
    /// The dialect's maximum (`MAX`).
    Max,
}

impl fmt::Display for TypeLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Max => f.write_str("MAX"),
        }
    }
}

/// Which modifiers a native type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierRules {
    /// Accepts `(length)`.
    pub length: bool,
    /// Accepts `(precision, ...)`.
    pub precision: bool,
    /// Accepts `(..., scale)`.
    pub scale: bool,
}

impl ModifierRules {
    /// No modifiers at all (fixed-width types).
    pub const NONE: Self = Self {
        length: false,
        precision: false,
        scale: false,
    };
    /// Length only.
    pub const LENGTH: Self = Self {
        length: true,
        precision: false,
        scale: false,
    };
    /// Precision and scale.
    pub const NUMERIC: Self = Self {
        length: false,
        precision: true,
        scale: true,
    };
    /// Precision only (fractional seconds, float bits).
    pub const PRECISION: Self = Self {
        length: false,
        precision: true,
        scale: false,
    };
}

/// A dialect-native column type with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeType {
    /// Native type name, lower-case (`varchar`, `uuid`, `inet6`).
    pub name: String,
    /// Length modifier.
    pub length: Option<TypeLength>,
    /// Precision modifier.
    pub precision: Option<u32>,
    /// Scale modifier.
    pub scale: Option<u32>,
}

impl NativeType {
    /// Creates a native type without modifiers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: None,
            precision: None,
            scale: None,
        }
    }

    /// Creates a native type with a fixed length.
    #[must_use]
    pub fn with_length(name: impl Into<String>, length: u32) -> Self {
        Self {
            length: Some(TypeLength::Fixed(length)),
            ..Self::new(name)
        }
    }

    /// Creates a native type whose length is the dialect maximum.
    #[must_use]
    pub fn with_max_length(name: impl Into<String>) -> Self {
        Self {
            length: Some(TypeLength::Max),
            ..Self::new(name)
        }
    }

    /// Creates a native type with precision and scale.
    #[must_use]
    pub fn with_precision(name: impl Into<String>, precision: u32, scale: Option<u32>) -> Self {
        Self {
            precision: Some(precision),
            scale,
            ..Self::new(name)
        }
    }

    /// Parses an introspected type string such as `varchar(36)`,
    /// `DECIMAL(10, 2)` or `nvarchar(MAX)`.
    pub fn parse(input: &str) -> Result<Self, ParseTypeError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_ ]*?)\s*(?:\(\s*([^,()]+?)\s*(?:,\s*(\d+)\s*)?\))?\s*$")
                .expect("static type pattern is valid")
        });
        let caps = pattern
            .captures(input)
            .ok_or_else(|| ParseTypeError(input.to_string()))?;
        let name = caps[1].to_ascii_lowercase();
        let mut native = Self::new(name);
        match (caps.get(2), caps.get(3)) {
            (Some(first), Some(second)) => {
                native.precision = Some(parse_number(first.as_str(), input)?);
                native.scale = Some(parse_number(second.as_str(), input)?);
            }
            (Some(first), None) => {
                let first = first.as_str();
                if first.eq_ignore_ascii_case("max") {
                    native.length = Some(TypeLength::Max);
                } else if is_numeric_type(&native.name) {
                    native.precision = Some(parse_number(first, input)?);
                } else {
                    native.length = Some(TypeLength::Fixed(parse_number(first, input)?));
                }
            }
            _ => {}
        }
        Ok(native)
    }

    /// Renders the type as it appears in DDL.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match (self.length, self.precision, self.scale) {
            (Some(len), _, _) => format!("{}({len})", self.name),
            (None, Some(p), Some(s)) => format!("{}({p},{s})", self.name),
            (None, Some(p), None) => format!("{}({p})", self.name),
            (None, None, _) => self.name.clone(),
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn parse_number(text: &str, input: &str) -> Result<u32, ParseTypeError> {
    text.trim()
        .parse()
        .map_err(|_| ParseTypeError(input.to_string()))
}

fn is_numeric_type(name: &str) -> bool {
    matches!(
        name,
        "decimal" | "numeric" | "number" | "dec" | "float" | "double" | "real" | "datetime2" | "time" | "timestamp"
    )
}

/// Result of mapping an abstract type onto a dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// The native type, including the modifiers it needs by default.
    pub native: NativeType,
    /// Set when a documented fallback replaced an unavailable native type.
    pub fallback: Option<String>,
}

impl MappedType {
    /// A mapping onto the dialect's own native type.
    #[must_use]
    pub const fn native(native: NativeType) -> Self {
        Self {
            native,
            fallback: None,
        }
    }

    /// Returns `true` when the mapping is a substitution.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_parses_aliases() {
        assert_eq!("INT".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("bool".parse::<ColumnType>().unwrap(), ColumnType::Boolean);
        assert_eq!("datetime".parse::<ColumnType>().unwrap(), ColumnType::Timestamp);
        assert!("geometry".parse::<ColumnType>().is_err());
    }

    #[test]
    fn column_type_deserializes_from_config() {
        let ty: ColumnType = serde_json::from_str("\"inet6\"").unwrap();
        assert_eq!(ty, ColumnType::Inet6);
        let ty: ColumnType = serde_json::from_str("\"int\"").unwrap();
        assert_eq!(ty, ColumnType::Integer);
    }

    #[test]
    fn native_type_parse_variants() {
        assert_eq!(
            NativeType::parse("varchar(36)").unwrap(),
            NativeType::with_length("varchar", 36)
        );
        assert_eq!(
            NativeType::parse("DECIMAL(10, 2)").unwrap(),
            NativeType::with_precision("decimal", 10, Some(2))
        );
        assert_eq!(
            NativeType::parse("nvarchar(MAX)").unwrap(),
            NativeType::with_max_length("nvarchar")
        );
        assert_eq!(NativeType::parse("uuid").unwrap(), NativeType::new("uuid"));
        assert_eq!(
            NativeType::parse("double precision").unwrap(),
            NativeType::new("double precision")
        );
        assert!(NativeType::parse("varchar(abc)").is_err());
    }

    #[test]
    fn native_type_renders() {
        assert_eq!(NativeType::with_length("varchar", 255).to_sql(), "varchar(255)");
        assert_eq!(
            NativeType::with_precision("decimal", 10, Some(2)).to_sql(),
            "decimal(10,2)"
        );
        assert_eq!(NativeType::with_max_length("nvarchar").to_sql(), "nvarchar(MAX)");
        assert_eq!(NativeType::new("inet6").to_sql(), "inet6");
    }
}
