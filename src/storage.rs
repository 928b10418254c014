use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::game::{GemCount, GemKind};
use crate::session::SessionSnapshot;

pub const GEMS_KEY: &str = "matebuf_gems";
pub const GAME_STATE_KEY: &str = "matebuf_game_state";
pub const BEST_TIME_KEY: &str = "matebuf_best_time";

/// Raw key-value medium holding JSON-encoded records
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// SQLite-backed key-value table
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database file and its table
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn })
    }
}

impl StorageBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-process map; `set_failing(true)` makes every call fail like an
/// unavailable medium.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<HashMap<String, String>>,
    failing: Cell<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.get() {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

// Lets a test keep a handle on the backend it hands to a store.
impl<B: StorageBackend + ?Sized> StorageBackend for std::rc::Rc<B> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// The game's three persisted records: gem counts, the session snapshot, and
/// the best completion time.
///
/// Every operation is best effort. A failing or corrupt medium reads as
/// "absent" and writes are dropped; both are logged and never returned.
pub struct GameStore {
    backend: Box<dyn StorageBackend>,
}

impl GameStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "failed to read from storage");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            warn!(key, error = %e, "failed to write to storage");
        }
    }

    fn delete(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            warn!(key, error = %e, "failed to clear storage");
        }
    }

    fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.write(key, &json),
            Err(e) => warn!(key, error = %e, "failed to encode value"),
        }
    }

    pub fn load_gems(&self) -> GemCount {
        let Some(raw) = self.read(GEMS_KEY) else {
            return GemCount::default();
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "stored gems are malformed, starting from zero");
            GemCount::default()
        })
    }

    pub fn save_gems(&self, gems: &GemCount) {
        self.write_json(GEMS_KEY, gems);
    }

    /// Returns the collection with one more `kind`, writing it through
    pub fn add_gem(&self, kind: GemKind, gems: &GemCount) -> GemCount {
        let updated = gems.with_added(kind);
        self.save_gems(&updated);
        debug!(gem = %kind, total = updated.get(kind), "gem collected");
        updated
    }

    pub fn load_snapshot(&self) -> Option<SessionSnapshot> {
        let raw = self.read(GAME_STATE_KEY)?;

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "stored session is malformed, discarding it");
                self.delete(GAME_STATE_KEY);
                None
            }
        }
    }

    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) {
        self.write_json(GAME_STATE_KEY, snapshot);
    }

    pub fn clear_snapshot(&self) {
        self.delete(GAME_STATE_KEY);
    }

    /// Anything other than a non-negative JSON integer that fits in an
    /// `i64` counts as absent
    pub fn load_best_time(&self) -> Option<u64> {
        let raw = self.read(BEST_TIME_KEY)?;

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                let best = value.as_u64().filter(|ms| i64::try_from(*ms).is_ok());
                if best.is_none() {
                    warn!(stored = %value, "stored best time is not a number of milliseconds");
                }
                best
            }
            Err(e) => {
                warn!(error = %e, "stored best time is malformed");
                None
            }
        }
    }

    pub fn save_best_time(&self, best_ms: u64) {
        self.write_json(BEST_TIME_KEY, &best_ms);
    }

    /// Wipe the collection, the best time, and any saved session
    pub fn reset_all(&self) {
        for key in [GEMS_KEY, GAME_STATE_KEY, BEST_TIME_KEY] {
            self.delete(key);
        }
    }
}
