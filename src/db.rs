use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{PosError, PosResult};

pub const TABLES: &str = "tables";
pub const ORDERS: &str = "orders";
pub const PAYMENTS: &str = "payments";
pub const WASTES: &str = "wastes";
pub const TRANSACTIONS: &str = "transactions";
pub const INVENTORY: &str = "inventory";
pub const INGREDIENTS: &str = "ingredients";
pub const PRODUCTS: &str = "products";
pub const CATEGORIES: &str = "categories";
pub const CATEGORY_SETTINGS: &str = "category_settings";
pub const SETTINGS: &str = "settings";
pub const RESERVATIONS: &str = "reservations";
pub const INVENTORY_REPORT: &str = "inventory_last_report";

const LEGACY_CATEGORY_SETTINGS: &str = "categorySettings";

/// Key-value document store: every collection is one JSON blob.
pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> PosResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened store");

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> PosResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn initialize(&self) -> PosResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS collections (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            ",
        )?;

        // Run migrations on the same connection to avoid re-locking
        Self::migrate_conn(&conn)?;

        Ok(())
    }

    fn migrate_conn(conn: &Connection) -> PosResult<()> {
        let legacy: Option<String> = conn
            .query_row(
                "SELECT value FROM collections WHERE key = ?1",
                [LEGACY_CATEGORY_SETTINGS],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(value) = legacy {
            debug!("Migrating legacy category settings key");
            conn.execute(
                "INSERT OR IGNORE INTO collections (key, value) VALUES (?1, ?2)",
                params![CATEGORY_SETTINGS, value],
            )?;
            conn.execute(
                "DELETE FROM collections WHERE key = ?1",
                [LEGACY_CATEGORY_SETTINGS],
            )?;
        }

        Ok(())
    }

    fn lock(&self) -> PosResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PosError::Validation(format!("store lock poisoned: {e}")))
    }

    pub fn load_raw(&self, key: &str) -> PosResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM collections WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn save_raw(&self, key: &str, value: &str) -> PosResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> PosResult<Option<T>> {
        match self.load_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PosResult<()> {
        let json = serde_json::to_string(value)?;
        self.save_raw(key, &json)
    }

    /// Rewrites several collections in one SQLite transaction.
    pub fn save_documents(&self, documents: &[(&str, String)]) -> PosResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, json) in documents {
            tx.execute(
                "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, json],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn keys(&self) -> PosResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM collections ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}
