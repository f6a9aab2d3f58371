/// Facade Module
///
/// The entry point callers hold: one dialect plus one connection string,
/// bound to a driver registry. Facades are cheap and reusable; each
/// `connect` resolves the driver through the registry (cached after the
/// first load) and yields an owned session.
use crate::core::Result;
use crate::dialect::Dialect;
use crate::driver::Connection;
use crate::recognizer::ErrorRecognizer;
use crate::registry::DriverRegistry;
use crate::session::Session;
use std::sync::Arc;

/// Access point for one database, combining a dialect with a connection
/// string.
pub struct Facade {
    dialect: Dialect,
    registry: Arc<DriverRegistry>,
    connection_string: String,
}

impl Facade {
    pub fn new(
        dialect: Dialect,
        registry: Arc<DriverRegistry>,
        connection_string: impl Into<String>,
    ) -> Self {
        Facade {
            dialect,
            registry,
            connection_string: connection_string.into(),
        }
    }

    pub fn postgres(registry: Arc<DriverRegistry>, connection_string: impl Into<String>) -> Self {
        Facade::new(Dialect::postgres(), registry, connection_string)
    }

    pub fn oracle(registry: Arc<DriverRegistry>, connection_string: impl Into<String>) -> Self {
        Facade::new(Dialect::oracle(), registry, connection_string)
    }

    pub fn mssql(registry: Arc<DriverRegistry>, connection_string: impl Into<String>) -> Self {
        Facade::new(Dialect::mssql(), registry, connection_string)
    }

    pub fn mysql(registry: Arc<DriverRegistry>, connection_string: impl Into<String>) -> Self {
        Facade::new(Dialect::mysql(), registry, connection_string)
    }

    pub fn hsql(registry: Arc<DriverRegistry>, connection_string: impl Into<String>) -> Self {
        Facade::new(Dialect::hsql(), registry, connection_string)
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// The recognizer callers can use to classify native errors they
    /// handle themselves.
    pub fn error_recognizer(&self) -> ErrorRecognizer {
        self.dialect.recognizer()
    }

    /// Opens a new connection and wraps it in an owned session.
    pub fn connect(&self) -> Result<Session<'static>> {
        let loaded = self.registry.obtain_driver(&self.connection_string)?;
        tracing::debug!(
            dialect = %self.dialect.tag,
            "opening connection"
        );
        let conn = loaded
            .driver()
            .connect(&self.connection_string)
            .map_err(|e| self.error_recognizer().recognize(e))?;
        Ok(Session::owned(conn, self.dialect.clone()))
    }

    /// Wraps a caller-owned connection in a borrowed session. The caller
    /// keeps responsibility for closing the connection.
    pub fn open_session<'c>(&self, conn: &'c mut dyn Connection) -> Session<'c> {
        Session::borrowed(conn, self.dialect.clone())
    }

    /// Runs `op` in a fresh session over a fresh connection, closing the
    /// connection on every exit path before returning `op`'s result.
    pub fn in_session<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut Session<'static>) -> Result<R>,
    {
        let mut session = self.connect()?;
        let result = op(&mut session);
        session.close();
        result
    }
}

impl std::fmt::Debug for Facade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("dialect", &self.dialect.tag)
            .field("connection_string", &self.connection_string)
            .finish()
    }
}
