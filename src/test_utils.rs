/// Test Utilities Module
///
/// Two driver stand-ins back the test suites: an in-memory recording
/// driver whose connections log every lifecycle call and echo bound
/// parameters back as a result row, and a SQLite adapter over `rusqlite`
/// for end-to-end coverage against a real engine.
use crate::core::{NativeError, NativeResult, ParamValue, Result};
use crate::dialect::{Dialect, DialectTag};
use crate::driver::{Connection, Driver, Rows, Statement, StatementOptions};
use crate::recognizer::ErrorKind;
use crate::registry::{register_driver_def, register_driver_factory, DriverDef};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Once};

/// Installs a tracing subscriber that writes to the test harness's
/// captured output. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Shared, thread-safe event log for asserting call sequences.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Statement that records binds in a map and replays them as one row.
pub struct MemoryStatement {
    log: EventLog,
    bound: BTreeMap<usize, ParamValue>,
    bind_failure: Option<NativeError>,
}

impl MemoryStatement {
    pub fn new(log: EventLog) -> Self {
        MemoryStatement {
            log,
            bound: BTreeMap::new(),
            bind_failure: None,
        }
    }

    /// Makes every bind call fail with the given native error.
    pub fn failing_binds(mut self, code: i32, message: &str) -> Self {
        self.bind_failure = Some(NativeError::new(code, message));
        self
    }

    pub fn bound(&self, index: usize) -> Option<ParamValue> {
        self.bound.get(&index).cloned()
    }

    fn store(&mut self, index: usize, value: ParamValue) -> NativeResult<()> {
        if let Some(failure) = &self.bind_failure {
            return Err(failure.clone());
        }
        self.bound.insert(index, value);
        Ok(())
    }
}

impl Statement for MemoryStatement {
    fn bind_null(&mut self, index: usize) -> NativeResult<()> {
        self.store(index, ParamValue::Null)
    }

    fn bind_bool(&mut self, index: usize, value: bool) -> NativeResult<()> {
        self.store(index, ParamValue::Bool(value))
    }

    fn bind_i8(&mut self, index: usize, value: i8) -> NativeResult<()> {
        self.store(index, ParamValue::TinyInt(value))
    }

    fn bind_i16(&mut self, index: usize, value: i16) -> NativeResult<()> {
        self.store(index, ParamValue::SmallInt(value))
    }

    fn bind_i32(&mut self, index: usize, value: i32) -> NativeResult<()> {
        self.store(index, ParamValue::Int(value))
    }

    fn bind_i64(&mut self, index: usize, value: i64) -> NativeResult<()> {
        self.store(index, ParamValue::BigInt(value))
    }

    fn bind_text(&mut self, index: usize, value: &str) -> NativeResult<()> {
        self.store(index, ParamValue::Text(value.to_string()))
    }

    fn bind_date(&mut self, index: usize, value: NaiveDate) -> NativeResult<()> {
        self.store(index, ParamValue::Date(value))
    }

    fn bind_time(&mut self, index: usize, value: NaiveTime) -> NativeResult<()> {
        self.store(index, ParamValue::Time(value))
    }

    fn bind_timestamp(&mut self, index: usize, value: NaiveDateTime) -> NativeResult<()> {
        self.store(index, ParamValue::Timestamp(value))
    }

    fn bind_string_array(&mut self, index: usize, values: &[String]) -> NativeResult<()> {
        self.store(index, ParamValue::StringArray(values.to_vec()))
    }

    fn execute_query<'s>(&'s mut self) -> NativeResult<Box<dyn Rows + 's>> {
        self.log.push("execute_query");
        let row: Vec<ParamValue> = self.bound.values().cloned().collect();
        Ok(Box::new(MemoryRows {
            log: self.log.clone(),
            row: if row.is_empty() { None } else { Some(row) },
            position: 0,
        }))
    }

    fn execute_update(&mut self) -> NativeResult<u64> {
        self.log.push("execute_update");
        Ok(1)
    }
}

impl Drop for MemoryStatement {
    fn drop(&mut self) {
        self.log.push("close statement");
    }
}

/// At most one row: the statement's bound parameters in index order.
struct MemoryRows {
    log: EventLog,
    row: Option<Vec<ParamValue>>,
    position: usize,
}

impl Rows for MemoryRows {
    fn advance(&mut self) -> NativeResult<bool> {
        if self.row.is_some() && self.position == 0 {
            self.position = 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn get(&self, column: usize) -> NativeResult<ParamValue> {
        self.row
            .as_ref()
            .filter(|_| self.position == 1)
            .and_then(|row| row.get(column))
            .cloned()
            .ok_or_else(|| NativeError::new(0, format!("no column {} in current row", column)))
    }

    fn column_count(&self) -> usize {
        self.row.as_ref().map(|row| row.len()).unwrap_or(0)
    }
}

impl Drop for MemoryRows {
    fn drop(&mut self) {
        self.log.push("close rows");
    }
}

/// Connection whose transaction calls only touch the event log, with
/// per-call failure injection.
pub struct MemoryConnection {
    log: EventLog,
    commit_failure: Option<NativeError>,
    rollback_failure: Option<NativeError>,
    auto_commit_restore_failure: Option<NativeError>,
}

impl MemoryConnection {
    pub fn new(log: EventLog) -> Self {
        MemoryConnection {
            log,
            commit_failure: None,
            rollback_failure: None,
            auto_commit_restore_failure: None,
        }
    }

    pub fn fail_commit(mut self, code: i32, message: &str) -> Self {
        self.commit_failure = Some(NativeError::new(code, message));
        self
    }

    pub fn fail_rollback(mut self, code: i32, message: &str) -> Self {
        self.rollback_failure = Some(NativeError::new(code, message));
        self
    }

    /// Makes `set_auto_commit(true)` fail; disabling still succeeds.
    pub fn fail_auto_commit_restore(mut self, code: i32, message: &str) -> Self {
        self.auto_commit_restore_failure = Some(NativeError::new(code, message));
        self
    }
}

impl Connection for MemoryConnection {
    fn set_auto_commit(&mut self, enabled: bool) -> NativeResult<()> {
        self.log.push(format!("set_auto_commit({})", enabled));
        if enabled {
            if let Some(failure) = &self.auto_commit_restore_failure {
                return Err(failure.clone());
            }
        }
        Ok(())
    }

    fn commit(&mut self) -> NativeResult<()> {
        self.log.push("commit");
        match &self.commit_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    fn rollback(&mut self) -> NativeResult<()> {
        self.log.push("rollback");
        match &self.rollback_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        _options: &StatementOptions,
    ) -> NativeResult<Box<dyn Statement + 'c>> {
        self.log.push(format!("prepare:{}", sql));
        Ok(Box::new(MemoryStatement::new(self.log.clone())))
    }

    fn close(&mut self) -> NativeResult<()> {
        self.log.push("close connection");
        Ok(())
    }
}

/// Driver producing `MemoryConnection`s with private logs; used where a
/// test only needs a working end-to-end path.
pub struct MemoryDriver;

impl Driver for MemoryDriver {
    fn connect(&self, _connection_string: &str) -> NativeResult<Box<dyn Connection>> {
        Ok(Box::new(MemoryConnection::new(EventLog::default())))
    }
}

pub fn memory_driver_factory() -> Result<Box<dyn Driver>> {
    Ok(Box::new(MemoryDriver))
}

// SQLite extended result codes for unique and primary-key violations.
const SQLITE_ERROR_CODES: &[(i32, ErrorKind)] = &[
    (1555, ErrorKind::DuplicateKey),
    (2067, ErrorKind::DuplicateKey),
];

pub const SQLITE_TAG: DialectTag = DialectTag("sqlite");

pub fn sqlite_dialect() -> Dialect {
    Dialect::new(SQLITE_TAG, SQLITE_ERROR_CODES)
}

/// Registers the SQLite dialect row and its in-process factory once per
/// test binary.
pub fn register_sqlite_driver() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        register_driver_def(
            DriverDef::new(
                SQLITE_TAG,
                r"^jdbc:sqlite:.*$",
                r"^libsqlite_driver\.(so|dylib|dll)$",
                "sqlite_driver_entry",
            )
            .expect("sqlite driver definition"),
        );
        register_driver_factory("sqlite_driver_entry", sqlite_driver_factory);
    });
}

pub fn sqlite_driver_factory() -> Result<Box<dyn Driver>> {
    Ok(Box::new(SqliteDriver))
}

fn sqlite_native_error(e: rusqlite::Error) -> NativeError {
    match e {
        rusqlite::Error::SqliteFailure(ffi_err, message) => NativeError::new(
            ffi_err.extended_code,
            message.unwrap_or_else(|| ffi_err.to_string()),
        ),
        other => NativeError::new(0, other.to_string()),
    }
}

/// SQLite driver over `rusqlite`. Connection strings follow the built-in
/// scheme shape: `jdbc:sqlite::memory:` or `jdbc:sqlite:/path/to/file`.
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn connect(&self, connection_string: &str) -> NativeResult<Box<dyn Connection>> {
        let target = connection_string
            .strip_prefix("jdbc:sqlite:")
            .ok_or_else(|| NativeError::new(0, "not a sqlite connection string"))?;
        let conn = if target == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(target)
        }
        .map_err(sqlite_native_error)?;
        Ok(Box::new(SqliteConnection { conn: Some(conn) }))
    }
}

struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    fn conn(&self) -> NativeResult<&rusqlite::Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| NativeError::new(0, "connection is closed"))
    }
}

impl Connection for SqliteConnection {
    /// SQLite has no auto-commit switch; the JDBC shape is emulated with
    /// explicit BEGIN/COMMIT, so enabling auto-commit mid-transaction
    /// commits, as a JDBC driver would.
    fn set_auto_commit(&mut self, enabled: bool) -> NativeResult<()> {
        let conn = self.conn()?;
        if enabled {
            if !conn.is_autocommit() {
                conn.execute_batch("COMMIT").map_err(sqlite_native_error)?;
            }
        } else if conn.is_autocommit() {
            conn.execute_batch("BEGIN").map_err(sqlite_native_error)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> NativeResult<()> {
        self.conn()?
            .execute_batch("COMMIT")
            .map_err(sqlite_native_error)
    }

    fn rollback(&mut self) -> NativeResult<()> {
        self.conn()?
            .execute_batch("ROLLBACK")
            .map_err(sqlite_native_error)
    }

    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        _options: &StatementOptions,
    ) -> NativeResult<Box<dyn Statement + 'c>> {
        let stmt = self
            .conn
            .as_ref()
            .ok_or_else(|| NativeError::new(0, "connection is closed"))?
            .prepare(sql)
            .map_err(sqlite_native_error)?;
        Ok(Box::new(SqliteStatement { stmt }))
    }

    fn close(&mut self) -> NativeResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| sqlite_native_error(e)),
            None => Ok(()),
        }
    }
}

struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
}

impl SqliteStatement<'_> {
    fn bind(&mut self, index: usize, value: impl rusqlite::ToSql) -> NativeResult<()> {
        self.stmt
            .raw_bind_parameter(index, value)
            .map_err(sqlite_native_error)
    }
}

impl Statement for SqliteStatement<'_> {
    fn bind_null(&mut self, index: usize) -> NativeResult<()> {
        self.bind(index, rusqlite::types::Null)
    }

    fn bind_bool(&mut self, index: usize, value: bool) -> NativeResult<()> {
        self.bind(index, value)
    }

    fn bind_i8(&mut self, index: usize, value: i8) -> NativeResult<()> {
        self.bind(index, value)
    }

    fn bind_i16(&mut self, index: usize, value: i16) -> NativeResult<()> {
        self.bind(index, value)
    }

    fn bind_i32(&mut self, index: usize, value: i32) -> NativeResult<()> {
        self.bind(index, value)
    }

    fn bind_i64(&mut self, index: usize, value: i64) -> NativeResult<()> {
        self.bind(index, value)
    }

    fn bind_text(&mut self, index: usize, value: &str) -> NativeResult<()> {
        self.bind(index, value)
    }

    // Temporal values are stored in SQLite's canonical text shapes.
    fn bind_date(&mut self, index: usize, value: NaiveDate) -> NativeResult<()> {
        self.bind(index, value.format("%Y-%m-%d").to_string())
    }

    fn bind_time(&mut self, index: usize, value: NaiveTime) -> NativeResult<()> {
        self.bind(index, value.format("%H:%M:%S").to_string())
    }

    fn bind_timestamp(&mut self, index: usize, value: NaiveDateTime) -> NativeResult<()> {
        self.bind(index, value.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    fn execute_query<'s>(&'s mut self) -> NativeResult<Box<dyn Rows + 's>> {
        let columns = self.stmt.column_count();
        Ok(Box::new(SqliteRows {
            rows: self.stmt.raw_query(),
            current: Vec::new(),
            columns,
        }))
    }

    fn execute_update(&mut self) -> NativeResult<u64> {
        self.stmt
            .raw_execute()
            .map(|n| n as u64)
            .map_err(sqlite_native_error)
    }
}

struct SqliteRows<'s> {
    rows: rusqlite::Rows<'s>,
    current: Vec<ParamValue>,
    columns: usize,
}

impl Rows for SqliteRows<'_> {
    fn advance(&mut self) -> NativeResult<bool> {
        match self.rows.next() {
            Ok(Some(row)) => {
                let mut current = Vec::with_capacity(self.columns);
                for i in 0..self.columns {
                    let value = row.get_ref(i).map_err(sqlite_native_error)?;
                    current.push(match value {
                        rusqlite::types::ValueRef::Null => ParamValue::Null,
                        rusqlite::types::ValueRef::Integer(v) => ParamValue::BigInt(v),
                        rusqlite::types::ValueRef::Text(v) => {
                            ParamValue::Text(String::from_utf8_lossy(v).into_owned())
                        }
                        other => {
                            return Err(NativeError::new(
                                0,
                                format!("unsupported column type {:?} at column {}", other, i),
                            ))
                        }
                    });
                }
                self.current = current;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(sqlite_native_error(e)),
        }
    }

    fn get(&self, column: usize) -> NativeResult<ParamValue> {
        self.current
            .get(column)
            .cloned()
            .ok_or_else(|| NativeError::new(0, format!("no column {} in current row", column)))
    }

    fn column_count(&self) -> usize {
        self.columns
    }
}
