use directories::ProjectDirs;
use log::warn;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOKEN_KEY: &str = "dw_token";
pub const AGENT_ID_KEY: &str = "dw_agent_id";
pub const ROLE_KEY: &str = "dw_role";
pub const VISITOR_ID_KEY: &str = "dw_widget_customer_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("no data directory available")]
    NoDataDir,
}

pub fn default_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("dev", "supportdesk", "SupportDesk")?;
    Some(proj.data_dir().join("local_store.sqlite"))
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// String key/value store that outlives the process, the client's equivalent
/// of browser local storage. Values never expire.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub fn open_default() -> Result<Self, StoreError> {
        let path = default_path().ok_or(StoreError::NoDataDir)?;
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        ensure_dir(path)?;
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS local_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM local_store WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO local_store (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM local_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Reads a key, treating storage failures as absence.
    pub fn read(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Ok(v) => v.filter(|s| !s.is_empty()),
            Err(e) => {
                warn!("[store] failed to read {}: {}", key, e);
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    pub fn agent_id(&self) -> Option<String> {
        self.read(AGENT_ID_KEY)
    }

    pub fn role(&self) -> Option<String> {
        self.read(ROLE_KEY)
    }

    pub fn save_credentials(&self, token: &str, agent_id: i64, role: &str) -> Result<(), StoreError> {
        self.set(TOKEN_KEY, token)?;
        self.set(AGENT_ID_KEY, &agent_id.to_string())?;
        self.set(ROLE_KEY, role)
    }

    pub fn clear_credentials(&self) -> Result<(), StoreError> {
        for key in [TOKEN_KEY, AGENT_ID_KEY, ROLE_KEY] {
            self.remove(key)?;
        }
        Ok(())
    }
}
