/// Dialect Module
///
/// A dialect is a capability bundle injected into the generic session and
/// recognizer: its error-code table, an optional parameter bind hook for
/// vendor-specific payloads, and the statement-preparation options it
/// needs. Vendor variation lives in these bundles, not in subclasses.
use crate::core::{ParamValue, Result};
use crate::driver::{Statement, StatementOptions};
use crate::recognizer::{ErrorKind, ErrorRecognizer};

/// Identifies a relational backend family.
///
/// Built-in tags cover the supported vendors; new tags may be introduced
/// alongside runtime driver-definition registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialectTag(pub &'static str);

impl DialectTag {
    pub const POSTGRES: DialectTag = DialectTag("postgres");
    pub const ORACLE: DialectTag = DialectTag("oracle");
    pub const MSSQL: DialectTag = DialectTag("mssql");
    pub const MYSQL: DialectTag = DialectTag("mysql");
    pub const HSQL: DialectTag = DialectTag("hsql");

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for DialectTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dialect-specific bind extension.
///
/// Receives values the built-in dispatch declined. Returns `Ok(true)` when
/// the value was bound, `Ok(false)` to decline, or a classified error when
/// a vendor-specific encoding fails (which propagates unchanged).
pub type BindHook = fn(&mut dyn Statement, usize, &ParamValue) -> Result<bool>;

// Vendor duplicate-key codes. PostgreSQL reports a five-char SQLSTATE
// rather than a numeric vendor code, so its numeric table stays empty and
// everything classifies as Unknown.
const POSTGRES_ERROR_CODES: &[(i32, ErrorKind)] = &[];
const ORACLE_ERROR_CODES: &[(i32, ErrorKind)] = &[(1, ErrorKind::DuplicateKey)];
const MSSQL_ERROR_CODES: &[(i32, ErrorKind)] = &[
    (2601, ErrorKind::DuplicateKey),
    (2627, ErrorKind::DuplicateKey),
];
const MYSQL_ERROR_CODES: &[(i32, ErrorKind)] = &[(1062, ErrorKind::DuplicateKey)];
const HSQL_ERROR_CODES: &[(i32, ErrorKind)] = &[(-104, ErrorKind::DuplicateKey)];

/// Capability bundle for one backend family.
#[derive(Debug, Clone)]
pub struct Dialect {
    pub tag: DialectTag,
    /// Vendor error-code table consumed by the recognizer.
    pub error_codes: &'static [(i32, ErrorKind)],
    /// Extension hook for parameter kinds the built-in dispatch declines.
    pub bind_hook: Option<BindHook>,
    /// Options applied when the session prepares query statements.
    pub statement_options: StatementOptions,
}

impl Dialect {
    pub fn new(tag: DialectTag, error_codes: &'static [(i32, ErrorKind)]) -> Self {
        Dialect {
            tag,
            error_codes,
            bind_hook: None,
            statement_options: StatementOptions::default(),
        }
    }

    pub fn with_bind_hook(mut self, hook: BindHook) -> Self {
        self.bind_hook = Some(hook);
        self
    }

    /// The recognizer for this dialect's code table.
    pub fn recognizer(&self) -> ErrorRecognizer {
        ErrorRecognizer::new(self.error_codes)
    }

    pub fn postgres() -> Self {
        Dialect::new(DialectTag::POSTGRES, POSTGRES_ERROR_CODES)
    }

    pub fn oracle() -> Self {
        Dialect::new(DialectTag::ORACLE, ORACLE_ERROR_CODES).with_bind_hook(oracle_bind_hook)
    }

    pub fn mssql() -> Self {
        Dialect::new(DialectTag::MSSQL, MSSQL_ERROR_CODES)
    }

    pub fn mysql() -> Self {
        Dialect::new(DialectTag::MYSQL, MYSQL_ERROR_CODES)
    }

    pub fn hsql() -> Self {
        Dialect::new(DialectTag::HSQL, HSQL_ERROR_CODES)
    }
}

/// Oracle accepts string-array payloads through its native array bind.
fn oracle_bind_hook(stmt: &mut dyn Statement, index: usize, value: &ParamValue) -> Result<bool> {
    match value {
        ParamValue::StringArray(items) => {
            stmt.bind_string_array(index, items)
                .map_err(|e| ErrorRecognizer::new(ORACLE_ERROR_CODES).recognize(e))?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
