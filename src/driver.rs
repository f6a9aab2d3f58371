/// Driver Seam Module
///
/// The trait surface a vendor driver implements. The rest of the crate is
/// agnostic to how a driver was obtained — compiled in and registered as a
/// factory, or resolved from a dynamic library found on the search path —
/// because both roads end in a `Box<dyn Driver>`.
///
/// The execution model is synchronous: every call blocks on the underlying
/// connection on the calling thread.
use crate::core::{NativeResult, ParamValue, Result};

/// A loaded vendor driver. Drivers are stateless connection factories and
/// are cached for the process lifetime, so they must be shareable across
/// threads.
pub trait Driver: Send + Sync {
    /// Opens a new connection for the given connection string.
    fn connect(&self, connection_string: &str) -> NativeResult<Box<dyn Connection>>;
}

/// Options applied when preparing a statement.
///
/// Mirrors the cursor discipline the session requires for queries: a
/// forward-only read-only cursor whose lifetime is bound to the
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementOptions {
    pub forward_only: bool,
    pub read_only: bool,
    pub close_cursors_at_commit: bool,
}

impl Default for StatementOptions {
    fn default() -> Self {
        StatementOptions {
            forward_only: true,
            read_only: true,
            close_cursors_at_commit: true,
        }
    }
}

/// One live database connection.
///
/// A connection is driven by exactly one session at a time; it carries no
/// internal locking. Transaction control works JDBC-style: the session
/// disables auto-commit, does its work, then commits or rolls back and
/// restores auto-commit.
pub trait Connection {
    fn set_auto_commit(&mut self, enabled: bool) -> NativeResult<()>;

    fn commit(&mut self) -> NativeResult<()>;

    fn rollback(&mut self) -> NativeResult<()>;

    /// Prepares a statement. The statement borrows the connection and must
    /// be dropped before the next prepare.
    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        options: &StatementOptions,
    ) -> NativeResult<Box<dyn Statement + 'c>>;

    /// Releases the underlying connection.
    fn close(&mut self) -> NativeResult<()>;
}

/// A prepared statement with native per-type bind calls.
///
/// Parameter indexes are 1-based, matching SQL placeholder numbering.
/// The binder dispatches a `ParamValue` onto exactly one of these calls;
/// `bind_string_array` is the extension point for dialects with array
/// binds and declines by default.
pub trait Statement {
    fn bind_null(&mut self, index: usize) -> NativeResult<()>;
    fn bind_bool(&mut self, index: usize, value: bool) -> NativeResult<()>;
    fn bind_i8(&mut self, index: usize, value: i8) -> NativeResult<()>;
    fn bind_i16(&mut self, index: usize, value: i16) -> NativeResult<()>;
    fn bind_i32(&mut self, index: usize, value: i32) -> NativeResult<()>;
    fn bind_i64(&mut self, index: usize, value: i64) -> NativeResult<()>;
    fn bind_text(&mut self, index: usize, value: &str) -> NativeResult<()>;
    fn bind_date(&mut self, index: usize, value: chrono::NaiveDate) -> NativeResult<()>;
    fn bind_time(&mut self, index: usize, value: chrono::NaiveTime) -> NativeResult<()>;
    fn bind_timestamp(&mut self, index: usize, value: chrono::NaiveDateTime) -> NativeResult<()>;

    fn bind_string_array(&mut self, index: usize, _values: &[String]) -> NativeResult<()> {
        Err(crate::core::NativeError::new(
            0,
            format!("this driver has no array bind for parameter {}", index),
        ))
    }

    /// Executes the statement and returns its result stream. The stream
    /// borrows the statement and must be dropped before the statement.
    fn execute_query<'s>(&'s mut self) -> NativeResult<Box<dyn Rows + 's>>;

    /// Executes a data/DDL command and returns the affected row count.
    fn execute_update(&mut self) -> NativeResult<u64>;
}

/// A forward-only stream of result rows.
pub trait Rows {
    /// Advances to the next row. Returns `false` when the stream is
    /// exhausted.
    fn advance(&mut self) -> NativeResult<bool>;

    /// Reads a column of the current row, 0-based.
    fn get(&self, column: usize) -> NativeResult<ParamValue>;

    fn column_count(&self) -> usize;
}

/// Callback that consumes a result stream and produces the query result.
///
/// `expect_many_rows` is a hint forwarded to statement preparation; drivers
/// may use it to size fetches.
pub trait RowsCollector<S> {
    fn expect_many_rows(&self) -> bool {
        true
    }

    fn collect(&mut self, rows: &mut dyn Rows) -> Result<S>;
}

impl<S, F> RowsCollector<S> for F
where
    F: FnMut(&mut dyn Rows) -> Result<S>,
{
    fn collect(&mut self, rows: &mut dyn Rows) -> Result<S> {
        self(rows)
    }
}
