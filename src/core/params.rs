/// Parameter Value Module
///
/// Host values that can be passed into SQL statements. The set is a closed
/// tagged variant so the binder's dispatch stays exhaustive; the one
/// designated extension variant (`StringArray`) exists for dialect-specific
/// payloads and is only bindable where a dialect installs a bind hook.
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A host value to be bound as a statement parameter.
///
/// Unknown host types are rejected at the `From` boundary at compile time;
/// there is no silent coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// Dialect-specific extension payload (e.g. Oracle array binds).
    /// Fails with an unhandled-type error on dialects without a hook for it.
    StringArray(Vec<String>),
}

impl ParamValue {
    /// Human-readable kind name, used in unhandled-type diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "boolean",
            ParamValue::TinyInt(_) => "tinyint",
            ParamValue::SmallInt(_) => "smallint",
            ParamValue::Int(_) => "int",
            ParamValue::BigInt(_) => "bigint",
            ParamValue::Text(_) => "text",
            ParamValue::Date(_) => "date",
            ParamValue::Time(_) => "time",
            ParamValue::Timestamp(_) => "timestamp",
            ParamValue::StringArray(_) => "string array",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i8> for ParamValue {
    fn from(v: i8) -> Self {
        ParamValue::TinyInt(v)
    }
}

impl From<i16> for ParamValue {
    fn from(v: i16) -> Self {
        ParamValue::SmallInt(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::BigInt(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(v: NaiveDate) -> Self {
        ParamValue::Date(v)
    }
}

impl From<NaiveTime> for ParamValue {
    fn from(v: NaiveTime) -> Self {
        ParamValue::Time(v)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(v: NaiveDateTime) -> Self {
        ParamValue::Timestamp(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::StringArray(v)
    }
}

impl<T> From<Option<T>> for ParamValue
where
    T: Into<ParamValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => ParamValue::Null,
        }
    }
}
