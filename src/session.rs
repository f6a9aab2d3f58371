/// Session Module
///
/// One connection, driven from one thread at a time, with an explicit
/// transaction state machine layered on top. The asymmetric failure
/// policy: failures on the forward path (begin, statement work, commit)
/// are raised after classification, while failures during cleanup
/// (rollback, restoring auto-commit) are logged and swallowed so the
/// original error keeps priority.
use crate::binder::ParameterBinder;
use crate::core::{ParamValue, Result};
use crate::dialect::Dialect;
use crate::driver::{Connection, RowsCollector, StatementOptions};
use crate::recognizer::ErrorRecognizer;

/// Transaction position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    Idle,
    Active,
}

enum ConnectionHandle<'a> {
    /// The session opened this connection and closes it.
    Owned(Box<dyn Connection>),
    /// Caller-supplied connection; its lifecycle stays with the caller.
    Borrowed(&'a mut dyn Connection),
}

impl ConnectionHandle<'_> {
    fn get(&mut self) -> &mut dyn Connection {
        match self {
            ConnectionHandle::Owned(conn) => conn.as_mut(),
            ConnectionHandle::Borrowed(conn) => &mut **conn,
        }
    }
}

/// A working session over one connection.
///
/// Queries run through collectors, commands return affected-row counts,
/// and `in_transaction` wraps an operation with commit-on-success and
/// rollback on every other exit, unwinding included.
pub struct Session<'a> {
    conn: ConnectionHandle<'a>,
    dialect: Dialect,
    recognizer: ErrorRecognizer,
    binder: ParameterBinder,
    state: TransactionState,
}

impl<'a> Session<'a> {
    /// A session that owns its connection and closes it on `close`.
    pub fn owned(conn: Box<dyn Connection>, dialect: Dialect) -> Session<'static> {
        Session {
            conn: ConnectionHandle::Owned(conn),
            recognizer: dialect.recognizer(),
            binder: ParameterBinder::for_dialect(&dialect),
            dialect,
            state: TransactionState::Idle,
        }
    }

    /// A session over a caller-owned connection. `close` leaves the
    /// connection open.
    pub fn borrowed(conn: &'a mut dyn Connection, dialect: Dialect) -> Session<'a> {
        Session {
            conn: ConnectionHandle::Borrowed(conn),
            recognizer: dialect.recognizer(),
            binder: ParameterBinder::for_dialect(&dialect),
            dialect,
            state: TransactionState::Idle,
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.state
    }

    /// Starts a transaction by disabling auto-commit.
    ///
    /// Nested transactions are not supported; beginning while one is
    /// active is a caller error.
    pub fn begin_transaction(&mut self) -> Result<()> {
        debug_assert!(
            self.state == TransactionState::Idle,
            "begin_transaction while a transaction is active"
        );
        let recognizer = self.recognizer;
        self.conn
            .get()
            .set_auto_commit(false)
            .map_err(|e| recognizer.recognize(e))?;
        self.state = TransactionState::Active;
        Ok(())
    }

    /// Commits the active transaction and restores auto-commit.
    ///
    /// A failed commit is rolled back before the classified commit error
    /// is raised. A failure to restore auto-commit after a successful
    /// commit is logged and swallowed: the work is durable, and raising
    /// would misreport it as lost.
    pub fn commit(&mut self) -> Result<()> {
        let recognizer = self.recognizer;
        if let Err(e) = self.conn.get().commit() {
            let commit_error = recognizer.recognize(e);
            self.rollback();
            return Err(commit_error);
        }
        if let Err(e) = self.conn.get().set_auto_commit(true) {
            tracing::warn!(error = %e, "could not restore auto-commit after commit");
        }
        self.state = TransactionState::Idle;
        Ok(())
    }

    /// Rolls back the active transaction and restores auto-commit.
    ///
    /// Never raises: rollback runs on failure paths where an earlier
    /// error already has priority, so its own failures only get logged.
    pub fn rollback(&mut self) {
        if let Err(e) = self.conn.get().rollback() {
            tracing::error!(error = %e, "rollback failed, connection state is suspect");
        }
        if let Err(e) = self.conn.get().set_auto_commit(true) {
            tracing::warn!(error = %e, "could not restore auto-commit after rollback");
        }
        self.state = TransactionState::Idle;
    }

    /// Runs `op` inside a transaction.
    ///
    /// Commits when `op` returns `Ok`; rolls back exactly once on every
    /// other exit, including panics unwinding through `op`.
    pub fn in_transaction<R, F>(&mut self, op: F) -> Result<R>
    where
        F: FnOnce(&mut Session<'a>) -> Result<R>,
    {
        self.begin_transaction()?;
        let mut guard = RollbackGuard {
            session: self,
            armed: true,
        };
        let value = op(&mut *guard.session)?;
        let committed = guard.session.commit();
        // commit already rolled back on its own failure path
        guard.armed = false;
        committed?;
        Ok(value)
    }

    /// Prepares, binds, executes a query and feeds the rows to the
    /// collector. Resources release in reverse order of acquisition:
    /// rows before the statement, the statement before returning.
    pub fn process_query<S>(
        &mut self,
        query_text: &str,
        params: &[ParamValue],
        collector: &mut dyn RowsCollector<S>,
    ) -> Result<S> {
        let recognizer = self.recognizer;
        tracing::trace!(
            dialect = %self.dialect.tag,
            expect_many_rows = collector.expect_many_rows(),
            "preparing query"
        );
        let Session {
            conn,
            binder,
            dialect,
            ..
        } = self;
        let mut stmt = conn
            .get()
            .prepare(query_text, &dialect.statement_options)
            .map_err(|e| recognizer.recognize(e))?;
        binder.bind_all(stmt.as_mut(), params)?;
        {
            let mut rows = stmt
                .execute_query()
                .map_err(|e| recognizer.recognize(e))?;
            collector.collect(rows.as_mut())
        }
    }

    /// Prepares, binds and executes a data or DDL command, returning the
    /// affected row count.
    pub fn process_command(&mut self, command_text: &str, params: &[ParamValue]) -> Result<u64> {
        let recognizer = self.recognizer;
        let Session {
            conn,
            binder,
            dialect,
            ..
        } = self;
        let options = StatementOptions {
            read_only: false,
            ..dialect.statement_options
        };
        let mut stmt = conn
            .get()
            .prepare(command_text, &options)
            .map_err(|e| recognizer.recognize(e))?;
        binder.bind_all(stmt.as_mut(), params)?;
        stmt.execute_update().map_err(|e| recognizer.recognize(e))
    }

    /// Fluent query entry point.
    pub fn query(&mut self, text: impl Into<String>) -> QueryRunner<'_, 'a> {
        QueryRunner {
            session: self,
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Fluent command entry point.
    pub fn command(&mut self, text: impl Into<String>) -> CommandRunner<'_, 'a> {
        CommandRunner {
            session: self,
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Fluent script entry point: a list of parameterless commands run in
    /// order, stopping at the first failure.
    pub fn script<I, T>(&mut self, commands: I) -> ScriptRunner<'_, 'a>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        ScriptRunner {
            session: self,
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    /// Ends the session. An owned connection is closed (close failures
    /// are logged, not raised); a borrowed one is handed back untouched.
    pub fn close(self) {
        if let ConnectionHandle::Owned(mut conn) = self.conn {
            if let Err(e) = conn.close() {
                tracing::warn!(error = %e, "closing connection failed");
            }
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.dialect.tag)
            .field("state", &self.state)
            .finish()
    }
}

/// Rolls the session back when dropped while still armed. Covers error
/// returns and panics with a single cleanup path.
struct RollbackGuard<'g, 'a> {
    session: &'g mut Session<'a>,
    armed: bool,
}

impl Drop for RollbackGuard<'_, '_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.rollback();
        }
    }
}

/// Builder for one parameterized query.
pub struct QueryRunner<'s, 'a> {
    session: &'s mut Session<'a>,
    text: String,
    params: Vec<ParamValue>,
}

impl QueryRunner<'_, '_> {
    pub fn with_param(mut self, value: impl Into<ParamValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn with_params(mut self, values: impl IntoIterator<Item = ParamValue>) -> Self {
        self.params.extend(values);
        self
    }

    pub fn run<S>(self, collector: &mut dyn RowsCollector<S>) -> Result<S> {
        self.session.process_query(&self.text, &self.params, collector)
    }
}

/// Builder for one parameterized command.
pub struct CommandRunner<'s, 'a> {
    session: &'s mut Session<'a>,
    text: String,
    params: Vec<ParamValue>,
}

impl CommandRunner<'_, '_> {
    pub fn with_param(mut self, value: impl Into<ParamValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn with_params(mut self, values: impl IntoIterator<Item = ParamValue>) -> Self {
        self.params.extend(values);
        self
    }

    pub fn run(self) -> Result<u64> {
        self.session.process_command(&self.text, &self.params)
    }
}

/// Runner for an ordered list of parameterless commands.
pub struct ScriptRunner<'s, 'a> {
    session: &'s mut Session<'a>,
    commands: Vec<String>,
}

impl ScriptRunner<'_, '_> {
    pub fn run(self) -> Result<()> {
        for command in &self.commands {
            self.session.process_command(command, &[])?;
        }
        Ok(())
    }
}
