/// Parameter Binder Module
///
/// Type-directed conversion of host values into native bind calls. The
/// dispatch order is fixed (null → boolean → integer widths → string →
/// date/time/timestamp) and first match wins; anything the built-in cases
/// decline goes to the dialect's extension hook, and an unhandled value is
/// a hard failure naming the kind and the 1-based parameter index.
use crate::core::{ParamValue, Result, SqlGateError};
use crate::dialect::{BindHook, Dialect};
use crate::driver::Statement;
use crate::recognizer::ErrorRecognizer;

/// Binds `ParamValue`s onto prepared statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct ParameterBinder {
    recognizer: ErrorRecognizer,
    hook: Option<BindHook>,
}

impl ParameterBinder {
    pub fn for_dialect(dialect: &Dialect) -> Self {
        ParameterBinder {
            recognizer: dialect.recognizer(),
            hook: dialect.bind_hook,
        }
    }

    /// Binds one value at the given 1-based index.
    ///
    /// Native bind failures are classified through the dialect's
    /// recognizer; a hook failure is already classified and propagates
    /// unchanged.
    pub fn bind(&self, stmt: &mut dyn Statement, index: usize, value: &ParamValue) -> Result<()> {
        let outcome = match value {
            ParamValue::Null => stmt.bind_null(index),
            ParamValue::Bool(v) => stmt.bind_bool(index, *v),
            ParamValue::TinyInt(v) => stmt.bind_i8(index, *v),
            ParamValue::SmallInt(v) => stmt.bind_i16(index, *v),
            ParamValue::Int(v) => stmt.bind_i32(index, *v),
            ParamValue::BigInt(v) => stmt.bind_i64(index, *v),
            ParamValue::Text(v) => stmt.bind_text(index, v),
            ParamValue::Date(v) => stmt.bind_date(index, *v),
            ParamValue::Time(v) => stmt.bind_time(index, *v),
            ParamValue::Timestamp(v) => stmt.bind_timestamp(index, *v),
            extension @ ParamValue::StringArray(_) => {
                if let Some(hook) = self.hook {
                    if hook(stmt, index, extension)? {
                        return Ok(());
                    }
                }
                return Err(SqlGateError::UnhandledType {
                    type_name: extension.kind_name(),
                    index,
                });
            }
        };

        outcome.map_err(|e| self.recognizer.recognize(e))
    }

    /// Binds values positionally, 1-based, stopping at the first failure.
    pub fn bind_all(&self, stmt: &mut dyn Statement, values: &[ParamValue]) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            self.bind(stmt, i + 1, value)?;
        }
        Ok(())
    }
}
