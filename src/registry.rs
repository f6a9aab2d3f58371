/// Driver Registry Module
///
/// Maps connection strings to dialects and loads vendor drivers on demand.
/// Definitions live in a process-wide append-only list seeded with the
/// built-in rows; resolution walks the list in order and the first match
/// wins. A resolved driver is loaded at most once per dialect and cached
/// for the process lifetime.
///
/// Two loader strategies are tried in order:
/// 1. a driver factory registered in this process (`register_driver_factory`);
/// 2. a dynamic library found in the registry's search directories whose
///    file name matches the definition's library-name pattern and which
///    exports the definition's entry-point symbol.
use crate::core::{Result, SqlGateError};
use crate::dialect::DialectTag;
use crate::driver::Driver;
use libloading::Library;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Environment variable naming the initial driver search directory.
pub const DRIVERS_PATH_VAR: &str = "SQLGATE_DRIVERS_PATH";

/// One row of the dialect table: how to recognize a connection string for
/// a backend and where its driver comes from.
#[derive(Debug, Clone)]
pub struct DriverDef {
    pub dialect: DialectTag,
    pub connection_string_pattern: Regex,
    pub library_name_pattern: Regex,
    /// Symbol a driver library exports, and the key a process-registered
    /// factory is looked up under.
    pub entry_point: String,
}

impl DriverDef {
    pub fn new(
        dialect: DialectTag,
        connection_string_pattern: &str,
        library_name_pattern: &str,
        entry_point: impl Into<String>,
    ) -> Result<Self> {
        let connection_string_pattern = Regex::new(connection_string_pattern)
            .map_err(|e| SqlGateError::Config(format!("bad connection-string pattern: {}", e)))?;
        let library_name_pattern = Regex::new(library_name_pattern)
            .map_err(|e| SqlGateError::Config(format!("bad library-name pattern: {}", e)))?;
        Ok(DriverDef {
            dialect,
            connection_string_pattern,
            library_name_pattern,
            entry_point: entry_point.into(),
        })
    }
}

/// Signature of the entry point a dynamically loaded driver library
/// exports under the symbol named in its `DriverDef`.
///
/// Driver libraries must be built with the same toolchain as the host;
/// the boxed trait object crosses the library boundary as a Rust type.
/// A construction failure is reported through `Err` and is fatal — the
/// registry does not retry other search directories after one.
pub type DriverEntry = unsafe fn() -> std::result::Result<Box<dyn Driver>, String>;

/// An in-process driver factory, the analog of a driver that is already
/// linked into the program.
pub type DriverFactory = fn() -> Result<Box<dyn Driver>>;

fn built_in_defs() -> Vec<std::sync::Arc<DriverDef>> {
    let rows = [
        (
            DialectTag::POSTGRES,
            r"^jdbc:postgresql:.*$",
            r"^(lib)?postgres_driver.*\.(so|dylib|dll)$",
            "postgres_driver_entry",
        ),
        (
            DialectTag::ORACLE,
            r"^jdbc:oracle:.*$",
            r"^(lib)?oracle_driver.*\.(so|dylib|dll)$",
            "oracle_driver_entry",
        ),
        (
            DialectTag::MSSQL,
            r"^jdbc:sqlserver:.*$",
            r"^(lib)?mssql_driver.*\.(so|dylib|dll)$",
            "mssql_driver_entry",
        ),
        (
            DialectTag::MSSQL,
            r"^jdbc:jtds:sqlserver:.*$",
            r"^(lib)?jtds_driver.*\.(so|dylib|dll)$",
            "jtds_driver_entry",
        ),
        (
            DialectTag::MYSQL,
            r"^jdbc:mysql:.*$",
            r"^(lib)?mysql_driver.*\.(so|dylib|dll)$",
            "mysql_driver_entry",
        ),
        (
            DialectTag::HSQL,
            r"^jdbc:hsqldb:.*$",
            r"^(lib)?hsql_driver.*\.(so|dylib|dll)$",
            "hsql_driver_entry",
        ),
    ];

    rows.iter()
        .map(|(tag, cs, lib, entry)| {
            std::sync::Arc::new(
                DriverDef::new(*tag, cs, lib, *entry).expect("built-in driver definition"),
            )
        })
        .collect()
}

// Process-wide dialect table. Built-in rows are seeded before any user
// registration can observe the list; registration is append-only.
static DRIVER_DEFS: Lazy<RwLock<Vec<std::sync::Arc<DriverDef>>>> =
    Lazy::new(|| RwLock::new(built_in_defs()));

// Process-registered driver factories, keyed by entry-point identifier.
static DRIVER_FACTORIES: Lazy<RwLock<HashMap<String, DriverFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Appends a dialect row to the process-wide table. Rows registered here
/// are matched after the built-in rows, in registration order.
pub fn register_driver_def(def: DriverDef) {
    if let Ok(mut defs) = DRIVER_DEFS.write() {
        defs.push(std::sync::Arc::new(def));
    }
}

/// Registers an in-process factory for the given entry-point identifier.
/// Loading for any definition naming that entry point will use the factory
/// instead of scanning the search directories.
pub fn register_driver_factory(entry_point: impl Into<String>, factory: DriverFactory) {
    if let Ok(mut factories) = DRIVER_FACTORIES.write() {
        factories.insert(entry_point.into(), factory);
    }
}

/// Resolves a connection string against the dialect table. First match
/// wins; `None` when no row matches.
pub fn resolve_dialect(connection_string: &str) -> Option<std::sync::Arc<DriverDef>> {
    let defs = DRIVER_DEFS.read().ok()?;
    defs.iter()
        .find(|def| def.connection_string_pattern.is_match(connection_string))
        .cloned()
}

/// A driver loaded for a dialect, cached for the process lifetime.
///
/// When the driver came from a dynamic library, the library handle is kept
/// alongside it. The cache never evicts entries, so code loaded this way
/// stays mapped for as long as any connection may reference it.
pub struct LoadedDriver {
    def: std::sync::Arc<DriverDef>,
    // Declaration order matters: the driver must drop before the library
    // that contains its code.
    driver: Box<dyn Driver>,
    _library: Option<Library>,
}

impl LoadedDriver {
    pub fn def(&self) -> &DriverDef {
        &self.def
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

impl std::fmt::Debug for LoadedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedDriver")
            .field("dialect", &self.def.dialect)
            .field("dynamic", &self._library.is_some())
            .finish()
    }
}

/// Resolves connection strings to cached vendor drivers.
///
/// The search-directory set and the driver cache are shared process-wide
/// state in the sense of the contract: directory mutation is serialized
/// under a lock, and a racing load is harmless because driver instances
/// are stateless factories — last write wins with no torn state.
pub struct DriverRegistry {
    search_dirs: Mutex<Vec<PathBuf>>,
    loaded: RwLock<HashMap<DialectTag, std::sync::Arc<LoadedDriver>>>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverRegistry {
    /// Creates a registry, seeding the search path from `SQLGATE_DRIVERS_PATH`
    /// when that names an existing directory.
    pub fn new() -> Self {
        let registry = DriverRegistry {
            search_dirs: Mutex::new(Vec::new()),
            loaded: RwLock::new(HashMap::new()),
        };

        if let Ok(path) = std::env::var(DRIVERS_PATH_VAR) {
            let dir = PathBuf::from(&path);
            if dir.is_dir() {
                registry.add_search_directory(dir);
            } else {
                tracing::warn!(
                    "{} points at {:?}, which is not a directory; ignoring",
                    DRIVERS_PATH_VAR,
                    path
                );
            }
        }

        registry
    }

    /// Appends a directory to the search path. Duplicates are ignored and
    /// insertion order is preserved.
    pub fn add_search_directory(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if let Ok(mut dirs) = self.search_dirs.lock() {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }

    /// Snapshot of the current search path, in registration order.
    pub fn search_directories(&self) -> Vec<PathBuf> {
        self.search_dirs
            .lock()
            .map(|dirs| dirs.clone())
            .unwrap_or_default()
    }

    /// Resolves the dialect for a connection string and returns its driver,
    /// loading it on first demand.
    pub fn obtain_driver(&self, connection_string: &str) -> Result<std::sync::Arc<LoadedDriver>> {
        let def = resolve_dialect(connection_string).ok_or_else(|| {
            SqlGateError::Driver(format!(
                "no dialect matches connection string: {}",
                connection_string
            ))
        })?;

        if let Ok(loaded) = self.loaded.read() {
            if let Some(found) = loaded.get(&def.dialect) {
                return Ok(found.clone());
            }
        }

        let driver = std::sync::Arc::new(self.load_driver(&def, connection_string)?);

        // A concurrent load of the same dialect may race to this insert;
        // drivers are stateless, so last write wins safely.
        if let Ok(mut loaded) = self.loaded.write() {
            loaded.insert(def.dialect, driver.clone());
        }

        Ok(driver)
    }

    fn load_driver(
        &self,
        def: &std::sync::Arc<DriverDef>,
        connection_string: &str,
    ) -> Result<LoadedDriver> {
        // WAY 1: a factory already present in this process.
        let factory = DRIVER_FACTORIES
            .read()
            .ok()
            .and_then(|factories| factories.get(&def.entry_point).copied());
        if let Some(factory) = factory {
            tracing::debug!("loading {} driver from registered factory", def.dialect);
            let driver = factory()?;
            return Ok(LoadedDriver {
                def: def.clone(),
                driver,
                _library: None,
            });
        }

        // WAY 2: scan the search directories for a matching library.
        for dir in self.search_directories() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("skipping unreadable driver directory {:?}: {}", dir, e);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let matches = entry
                    .file_name()
                    .to_str()
                    .map(|name| def.library_name_pattern.is_match(name))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
                if let Some(loaded) = self.load_from_library(def, &path)? {
                    return Ok(loaded);
                }
            }
        }

        Err(SqlGateError::Driver(format!(
            "no driver found for connection string: {}",
            connection_string
        )))
    }

    /// Attempts one candidate library. `Ok(None)` means "not usable, keep
    /// scanning" (unloadable file, missing symbol); an entry point that
    /// runs but fails is fatal and never retried elsewhere.
    fn load_from_library(
        &self,
        def: &std::sync::Arc<DriverDef>,
        path: &Path,
    ) -> Result<Option<LoadedDriver>> {
        let library = match unsafe { Library::new(path) } {
            Ok(library) => library,
            Err(e) => {
                tracing::warn!("skipping unloadable driver candidate {:?}: {}", path, e);
                return Ok(None);
            }
        };

        let entry: DriverEntry = match unsafe { library.get::<DriverEntry>(def.entry_point.as_bytes()) }
        {
            Ok(symbol) => *symbol,
            Err(_) => {
                tracing::debug!(
                    "candidate {:?} does not export {}; continuing scan",
                    path,
                    def.entry_point
                );
                return Ok(None);
            }
        };

        match unsafe { entry() } {
            Ok(driver) => {
                tracing::debug!("loaded {} driver from {:?}", def.dialect, path);
                Ok(Some(LoadedDriver {
                    def: def.clone(),
                    driver,
                    _library: Some(library),
                }))
            }
            Err(message) => Err(SqlGateError::Driver(format!(
                "failed to instantiate {} driver from {:?}: {}",
                def.dialect, path, message
            ))),
        }
    }
}
