//! Positional row values copied between databases.
//!
//! Rows are opaque to the pipeline: no schema is looked up, each column is
//! decoded from whatever type the source reports and re-bound with the same
//! type on insert.

use crate::error::{ETLError, Result};
use crate::watermark::NaiveTimeZone;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::types::{PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use std::fmt;
use uuid::Uuid;

pub type Row = Vec<Value>;
pub type RowBatch = Vec<Row>;

/// PostgreSQL column types the pipeline can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    Numeric,
    Money,
    Text,
    /// The single-byte `"char"` type.
    Char,
    Bytes,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    Uuid,
    Json,
    Array(ElementKind),
}

/// Element types of the one-dimensional arrays the pipeline can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Bool,
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    Numeric,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
}

impl ColumnKind {
    /// Map a driver type name (`INT4`, `TIMESTAMPTZ`, `TEXT[]`, ...) to a kind.
    pub fn from_type_name(name: &str) -> Option<Self> {
        if let Some(element) = name.strip_suffix("[]") {
            return ElementKind::from_type_name(element).map(ColumnKind::Array);
        }
        let kind = match name {
            "BOOL" => ColumnKind::Bool,
            "INT2" => ColumnKind::SmallInt,
            "INT4" => ColumnKind::Int,
            "INT8" => ColumnKind::BigInt,
            "FLOAT4" => ColumnKind::Real,
            "FLOAT8" => ColumnKind::Double,
            "NUMERIC" => ColumnKind::Numeric,
            "MONEY" => ColumnKind::Money,
            // CHAR is `bpchar`; the quoted one is the internal single-byte type
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => ColumnKind::Text,
            "\"CHAR\"" => ColumnKind::Char,
            "BYTEA" => ColumnKind::Bytes,
            "DATE" => ColumnKind::Date,
            "TIME" => ColumnKind::Time,
            "TIMETZ" => ColumnKind::TimeTz,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            "INTERVAL" => ColumnKind::Interval,
            "UUID" => ColumnKind::Uuid,
            "JSON" | "JSONB" => ColumnKind::Json,
            _ => return None,
        };
        Some(kind)
    }
}

impl ElementKind {
    fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "BOOL" => ElementKind::Bool,
            "INT2" => ElementKind::SmallInt,
            "INT4" => ElementKind::Int,
            "INT8" => ElementKind::BigInt,
            "FLOAT4" => ElementKind::Real,
            "FLOAT8" => ElementKind::Double,
            "NUMERIC" => ElementKind::Numeric,
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => ElementKind::Text,
            "DATE" => ElementKind::Date,
            "TIMESTAMP" => ElementKind::Timestamp,
            "TIMESTAMPTZ" => ElementKind::TimestampTz,
            "UUID" => ElementKind::Uuid,
            _ => return None,
        };
        Some(kind)
    }
}

/// A one-dimensional array value; elements may be NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Bool(Vec<Option<bool>>),
    SmallInt(Vec<Option<i16>>),
    Int(Vec<Option<i32>>),
    BigInt(Vec<Option<i64>>),
    Real(Vec<Option<f32>>),
    Double(Vec<Option<f64>>),
    Numeric(Vec<Option<Decimal>>),
    Text(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    TimestampTz(Vec<Option<DateTime<Utc>>>),
    Uuid(Vec<Option<Uuid>>),
}

impl Array {
    pub fn element_kind(&self) -> ElementKind {
        match self {
            Array::Bool(_) => ElementKind::Bool,
            Array::SmallInt(_) => ElementKind::SmallInt,
            Array::Int(_) => ElementKind::Int,
            Array::BigInt(_) => ElementKind::BigInt,
            Array::Real(_) => ElementKind::Real,
            Array::Double(_) => ElementKind::Double,
            Array::Numeric(_) => ElementKind::Numeric,
            Array::Text(_) => ElementKind::Text,
            Array::Date(_) => ElementKind::Date,
            Array::Timestamp(_) => ElementKind::Timestamp,
            Array::TimestampTz(_) => ElementKind::TimestampTz,
            Array::Uuid(_) => ElementKind::Uuid,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::Bool(v) => v.len(),
            Array::SmallInt(v) => v.len(),
            Array::Int(v) => v.len(),
            Array::BigInt(v) => v.len(),
            Array::Real(v) => v.len(),
            Array::Double(v) => v.len(),
            Array::Numeric(v) => v.len(),
            Array::Text(v) => v.len(),
            Array::Date(v) => v.len(),
            Array::Timestamp(v) => v.len(),
            Array::TimestampTz(v) => v.len(),
            Array::Uuid(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_elements<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[Option<T>],
    quote: bool,
) -> fmt::Result {
    write!(f, "{{")?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        match item {
            None => write!(f, "NULL")?,
            Some(v) if quote => write!(f, "'{}'", v.to_string().replace('\'', "\\'"))?,
            Some(v) => write!(f, "{}", v)?,
        }
    }
    write!(f, "}}")
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Array::Bool(v) => write_elements(f, v, false),
            Array::SmallInt(v) => write_elements(f, v, false),
            Array::Int(v) => write_elements(f, v, false),
            Array::BigInt(v) => write_elements(f, v, false),
            Array::Real(v) => write_elements(f, v, false),
            Array::Double(v) => write_elements(f, v, false),
            Array::Numeric(v) => write_elements(f, v, false),
            Array::Text(v) => write_elements(f, v, true),
            Array::Date(v) => write_elements(f, v, false),
            Array::Timestamp(v) => write_elements(f, v, false),
            Array::TimestampTz(v) => write_elements(f, v, false),
            Array::Uuid(v) => write_elements(f, v, false),
        }
    }
}

/// A single column value.
///
/// `Null` keeps the kind of the column it came from so the INSERT on the
/// other side binds a NULL of the right type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(ColumnKind),
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Numeric(Decimal),
    Money(PgMoney),
    Text(String),
    Char(i8),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeTz(PgTimeTz<NaiveTime, FixedOffset>),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval(PgInterval),
    Uuid(Uuid),
    Json(serde_json::Value),
    Array(Array),
}

impl Value {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Null(kind) => *kind,
            Value::Bool(_) => ColumnKind::Bool,
            Value::SmallInt(_) => ColumnKind::SmallInt,
            Value::Int(_) => ColumnKind::Int,
            Value::BigInt(_) => ColumnKind::BigInt,
            Value::Real(_) => ColumnKind::Real,
            Value::Double(_) => ColumnKind::Double,
            Value::Numeric(_) => ColumnKind::Numeric,
            Value::Money(_) => ColumnKind::Money,
            Value::Text(_) => ColumnKind::Text,
            Value::Char(_) => ColumnKind::Char,
            Value::Bytes(_) => ColumnKind::Bytes,
            Value::Date(_) => ColumnKind::Date,
            Value::Time(_) => ColumnKind::Time,
            Value::TimeTz(_) => ColumnKind::TimeTz,
            Value::Timestamp(_) => ColumnKind::Timestamp,
            Value::TimestampTz(_) => ColumnKind::TimestampTz,
            Value::Interval(_) => ColumnKind::Interval,
            Value::Uuid(_) => ColumnKind::Uuid,
            Value::Json(_) => ColumnKind::Json,
            Value::Array(array) => ColumnKind::Array(array.element_kind()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Point in time carried by a timestamp column. Zoned values already
    /// are instants; naive ones are read as wall-clock time in `zone`.
    pub fn instant(&self, zone: NaiveTimeZone) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(zone.to_utc(*ts)),
            Value::TimestampTz(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Numeric(v) => write!(f, "{}", v),
            Value::Money(v) => write!(f, "{}", v.to_decimal(2)),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "\\'")),
            Value::Char(v) => write!(f, "'{}'", *v as u8 as char),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::TimeTz(v) => write!(f, "{}{}", v.time, v.offset),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::TimestampTz(v) => write!(f, "{}", v),
            Value::Interval(v) => write!(
                f,
                "{} months {} days {} us",
                v.months, v.days, v.microseconds
            ),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
            Value::Array(v) => write!(f, "{}", v),
        }
    }
}

/// Render a row as `(v1, v2, ...)`.
pub fn format_row(row: &[Value]) -> String {
    let values: Vec<String> = row.iter().map(ToString::to_string).collect();
    format!("({})", values.join(", "))
}

/// Render a batch as `[(..), (..)]`, one line, the way it is echoed to stdout.
pub fn format_batch(batch: &[Row]) -> String {
    let rows: Vec<String> = batch.iter().map(|row| format_row(row)).collect();
    format!("[{}]", rows.join(", "))
}

/// Decode every column of a driver row.
pub fn decode_row(row: &PgRow) -> Result<Row> {
    (0..row.columns().len())
        .map(|idx| decode_column(row, idx))
        .collect()
}

fn decode_column(row: &PgRow, idx: usize) -> Result<Value> {
    let column = &row.columns()[idx];
    let type_name = column.type_info().name();
    let kind = ColumnKind::from_type_name(type_name).ok_or_else(|| {
        ETLError::Extract(format!(
            "Unsupported type {} for column {}",
            type_name,
            column.name()
        ))
    })?;

    let decoded = match kind {
        ColumnKind::Bool => row.try_get::<Option<bool>, _>(idx).map(|v| v.map(Value::Bool)),
        ColumnKind::SmallInt => row.try_get::<Option<i16>, _>(idx).map(|v| v.map(Value::SmallInt)),
        ColumnKind::Int => row.try_get::<Option<i32>, _>(idx).map(|v| v.map(Value::Int)),
        ColumnKind::BigInt => row.try_get::<Option<i64>, _>(idx).map(|v| v.map(Value::BigInt)),
        ColumnKind::Real => row.try_get::<Option<f32>, _>(idx).map(|v| v.map(Value::Real)),
        ColumnKind::Double => row.try_get::<Option<f64>, _>(idx).map(|v| v.map(Value::Double)),
        ColumnKind::Numeric => row.try_get::<Option<Decimal>, _>(idx).map(|v| v.map(Value::Numeric)),
        ColumnKind::Money => row.try_get::<Option<PgMoney>, _>(idx).map(|v| v.map(Value::Money)),
        ColumnKind::Text => row.try_get::<Option<String>, _>(idx).map(|v| v.map(Value::Text)),
        ColumnKind::Char => row.try_get::<Option<i8>, _>(idx).map(|v| v.map(Value::Char)),
        ColumnKind::Bytes => row.try_get::<Option<Vec<u8>>, _>(idx).map(|v| v.map(Value::Bytes)),
        ColumnKind::Date => row.try_get::<Option<NaiveDate>, _>(idx).map(|v| v.map(Value::Date)),
        ColumnKind::Time => row.try_get::<Option<NaiveTime>, _>(idx).map(|v| v.map(Value::Time)),
        ColumnKind::TimeTz => row
            .try_get::<Option<PgTimeTz<NaiveTime, FixedOffset>>, _>(idx)
            .map(|v| v.map(Value::TimeTz)),
        ColumnKind::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(Value::Timestamp)),
        ColumnKind::TimestampTz => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map(Value::TimestampTz)),
        ColumnKind::Interval => row
            .try_get::<Option<PgInterval>, _>(idx)
            .map(|v| v.map(Value::Interval)),
        ColumnKind::Uuid => row.try_get::<Option<Uuid>, _>(idx).map(|v| v.map(Value::Uuid)),
        ColumnKind::Json => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .map(|v| v.map(Value::Json)),
        ColumnKind::Array(element) => decode_array(row, idx, element).map(|v| v.map(Value::Array)),
    }
    .map_err(|e| ETLError::Extract(format!("Failed to decode column {}: {}", column.name(), e)))?;

    Ok(decoded.unwrap_or(Value::Null(kind)))
}

fn decode_array(row: &PgRow, idx: usize, element: ElementKind) -> sqlx::Result<Option<Array>> {
    Ok(match element {
        ElementKind::Bool => row.try_get::<Option<Vec<Option<bool>>>, _>(idx)?.map(Array::Bool),
        ElementKind::SmallInt => row.try_get::<Option<Vec<Option<i16>>>, _>(idx)?.map(Array::SmallInt),
        ElementKind::Int => row.try_get::<Option<Vec<Option<i32>>>, _>(idx)?.map(Array::Int),
        ElementKind::BigInt => row.try_get::<Option<Vec<Option<i64>>>, _>(idx)?.map(Array::BigInt),
        ElementKind::Real => row.try_get::<Option<Vec<Option<f32>>>, _>(idx)?.map(Array::Real),
        ElementKind::Double => row.try_get::<Option<Vec<Option<f64>>>, _>(idx)?.map(Array::Double),
        ElementKind::Numeric => row.try_get::<Option<Vec<Option<Decimal>>>, _>(idx)?.map(Array::Numeric),
        ElementKind::Text => row.try_get::<Option<Vec<Option<String>>>, _>(idx)?.map(Array::Text),
        ElementKind::Date => row.try_get::<Option<Vec<Option<NaiveDate>>>, _>(idx)?.map(Array::Date),
        ElementKind::Timestamp => row
            .try_get::<Option<Vec<Option<NaiveDateTime>>>, _>(idx)?
            .map(Array::Timestamp),
        ElementKind::TimestampTz => row
            .try_get::<Option<Vec<Option<DateTime<Utc>>>>, _>(idx)?
            .map(Array::TimestampTz),
        ElementKind::Uuid => row.try_get::<Option<Vec<Option<Uuid>>>, _>(idx)?.map(Array::Uuid),
    })
}

/// Bind one value as the next positional parameter of `query`.
pub fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null(kind) => bind_null(query, *kind),
        Value::Bool(v) => query.bind(*v),
        Value::SmallInt(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::BigInt(v) => query.bind(*v),
        Value::Real(v) => query.bind(*v),
        Value::Double(v) => query.bind(*v),
        Value::Numeric(v) => query.bind(*v),
        Value::Money(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Char(v) => query.bind(*v),
        Value::Bytes(v) => query.bind(v.clone()),
        Value::Date(v) => query.bind(*v),
        Value::Time(v) => query.bind(*v),
        Value::TimeTz(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::TimestampTz(v) => query.bind(*v),
        Value::Interval(v) => query.bind(v.clone()),
        Value::Uuid(v) => query.bind(*v),
        Value::Json(v) => query.bind(v.clone()),
        Value::Array(v) => bind_array(query, v),
    }
}

fn bind_array<'q>(query: Query<'q, Postgres, PgArguments>, array: &Array) -> Query<'q, Postgres, PgArguments> {
    match array {
        Array::Bool(v) => query.bind(v.clone()),
        Array::SmallInt(v) => query.bind(v.clone()),
        Array::Int(v) => query.bind(v.clone()),
        Array::BigInt(v) => query.bind(v.clone()),
        Array::Real(v) => query.bind(v.clone()),
        Array::Double(v) => query.bind(v.clone()),
        Array::Numeric(v) => query.bind(v.clone()),
        Array::Text(v) => query.bind(v.clone()),
        Array::Date(v) => query.bind(v.clone()),
        Array::Timestamp(v) => query.bind(v.clone()),
        Array::TimestampTz(v) => query.bind(v.clone()),
        Array::Uuid(v) => query.bind(v.clone()),
    }
}

fn bind_null<'q>(
    query: Query<'q, Postgres, PgArguments>,
    kind: ColumnKind,
) -> Query<'q, Postgres, PgArguments> {
    match kind {
        ColumnKind::Bool => query.bind(None::<bool>),
        ColumnKind::SmallInt => query.bind(None::<i16>),
        ColumnKind::Int => query.bind(None::<i32>),
        ColumnKind::BigInt => query.bind(None::<i64>),
        ColumnKind::Real => query.bind(None::<f32>),
        ColumnKind::Double => query.bind(None::<f64>),
        ColumnKind::Numeric => query.bind(None::<Decimal>),
        ColumnKind::Money => query.bind(None::<PgMoney>),
        ColumnKind::Text => query.bind(None::<String>),
        ColumnKind::Char => query.bind(None::<i8>),
        ColumnKind::Bytes => query.bind(None::<Vec<u8>>),
        ColumnKind::Date => query.bind(None::<NaiveDate>),
        ColumnKind::Time => query.bind(None::<NaiveTime>),
        ColumnKind::TimeTz => query.bind(None::<PgTimeTz<NaiveTime, FixedOffset>>),
        ColumnKind::Timestamp => query.bind(None::<NaiveDateTime>),
        ColumnKind::TimestampTz => query.bind(None::<DateTime<Utc>>),
        ColumnKind::Interval => query.bind(None::<PgInterval>),
        ColumnKind::Uuid => query.bind(None::<Uuid>),
        ColumnKind::Json => query.bind(None::<serde_json::Value>),
        ColumnKind::Array(element) => match element {
            ElementKind::Bool => query.bind(None::<Vec<Option<bool>>>),
            ElementKind::SmallInt => query.bind(None::<Vec<Option<i16>>>),
            ElementKind::Int => query.bind(None::<Vec<Option<i32>>>),
            ElementKind::BigInt => query.bind(None::<Vec<Option<i64>>>),
            ElementKind::Real => query.bind(None::<Vec<Option<f32>>>),
            ElementKind::Double => query.bind(None::<Vec<Option<f64>>>),
            ElementKind::Numeric => query.bind(None::<Vec<Option<Decimal>>>),
            ElementKind::Text => query.bind(None::<Vec<Option<String>>>),
            ElementKind::Date => query.bind(None::<Vec<Option<NaiveDate>>>),
            ElementKind::Timestamp => query.bind(None::<Vec<Option<NaiveDateTime>>>),
            ElementKind::TimestampTz => query.bind(None::<Vec<Option<DateTime<Utc>>>>),
            ElementKind::Uuid => query.bind(None::<Vec<Option<Uuid>>>),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_map_to_kinds() {
        assert_eq!(ColumnKind::from_type_name("INT4"), Some(ColumnKind::Int));
        assert_eq!(ColumnKind::from_type_name("VARCHAR"), Some(ColumnKind::Text));
        assert_eq!(ColumnKind::from_type_name("CHAR"), Some(ColumnKind::Text));
        assert_eq!(ColumnKind::from_type_name("\"CHAR\""), Some(ColumnKind::Char));
        assert_eq!(ColumnKind::from_type_name("JSONB"), Some(ColumnKind::Json));
        assert_eq!(ColumnKind::from_type_name("TIMESTAMPTZ"), Some(ColumnKind::TimestampTz));
        assert_eq!(ColumnKind::from_type_name("INTERVAL"), Some(ColumnKind::Interval));
        assert_eq!(ColumnKind::from_type_name("TIMETZ"), Some(ColumnKind::TimeTz));
        assert_eq!(ColumnKind::from_type_name("MONEY"), Some(ColumnKind::Money));
        assert_eq!(ColumnKind::from_type_name("TSVECTOR"), None);
    }

    #[test]
    fn array_type_names_carry_their_element() {
        assert_eq!(
            ColumnKind::from_type_name("INT4[]"),
            Some(ColumnKind::Array(ElementKind::Int))
        );
        assert_eq!(
            ColumnKind::from_type_name("VARCHAR[]"),
            Some(ColumnKind::Array(ElementKind::Text))
        );
        assert_eq!(
            ColumnKind::from_type_name("TIMESTAMPTZ[]"),
            Some(ColumnKind::Array(ElementKind::TimestampTz))
        );
        // no nested or exotic element types
        assert_eq!(ColumnKind::from_type_name("JSONB[]"), None);
        assert_eq!(ColumnKind::from_type_name("INTERVAL[]"), None);
    }

    #[test]
    fn arrays_know_their_kind_and_print_nulls() {
        let value = Value::Array(Array::Int(vec![Some(1), None, Some(3)]));
        assert_eq!(value.kind(), ColumnKind::Array(ElementKind::Int));
        assert_eq!(value.to_string(), "{1, NULL, 3}");

        let tags = Value::Array(Array::Text(vec![Some("a".into()), Some("it's".into())]));
        assert_eq!(tags.to_string(), "{'a', 'it\\'s'}");
        assert!(Array::Uuid(Vec::new()).is_empty());
    }

    #[test]
    fn interval_money_and_char_display() {
        let interval = Value::Interval(PgInterval {
            months: 1,
            days: 2,
            microseconds: 3_000_000,
        });
        assert_eq!(interval.kind(), ColumnKind::Interval);
        assert_eq!(interval.to_string(), "1 months 2 days 3000000 us");
        assert_eq!(Value::Money(PgMoney(1234)).to_string(), "12.34");
        assert_eq!(Value::Char(b'x' as i8).to_string(), "'x'");
    }

    #[test]
    fn null_remembers_its_kind() {
        let value = Value::Null(ColumnKind::BigInt);
        assert!(value.is_null());
        assert_eq!(value.kind(), ColumnKind::BigInt);
        assert_eq!(Value::Text("x".into()).kind(), ColumnKind::Text);
    }

    #[test]
    fn batch_formats_like_a_list_of_tuples() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let batch = vec![
            vec![Value::Int(1), Value::Text("alice".into()), Value::Timestamp(ts)],
            vec![Value::Int(2), Value::Null(ColumnKind::Text), Value::Timestamp(ts)],
        ];
        assert_eq!(
            format_batch(&batch),
            "[(1, 'alice', 2024-03-01 12:30:00), (2, NULL, 2024-03-01 12:30:00)]"
        );
        assert_eq!(format_batch(&[]), "[]");
    }

    #[test]
    fn zoned_timestamps_are_instants_in_any_zone() {
        let ts = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        assert_eq!(Value::TimestampTz(ts).instant(NaiveTimeZone::Utc), Some(ts));
        assert_eq!(Value::TimestampTz(ts).instant(NaiveTimeZone::Local), Some(ts));
        assert_eq!(Value::Int(3).instant(NaiveTimeZone::Utc), None);
    }

    #[test]
    fn naive_timestamps_are_read_in_the_given_zone() {
        let ts = DateTime::<Utc>::from_timestamp(1_709_280_000, 0).unwrap();
        let wall_utc = Value::Timestamp(ts.naive_utc());
        assert_eq!(wall_utc.instant(NaiveTimeZone::Utc), Some(ts));

        let wall_local = Value::Timestamp(ts.with_timezone(&chrono::Local).naive_local());
        assert_eq!(wall_local.instant(NaiveTimeZone::Local), Some(ts));
    }
}
