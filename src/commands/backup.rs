use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::db;
use crate::error::{PosError, PosResult};
use crate::models::{InventoryProduct, Order, Payment, Settings, Table, Transaction, WasteItem};
use crate::pos::Pos;

pub const BACKUP_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct BackupData {
    pub tables: Vec<Table>,
    pub orders: Vec<Order>,
    pub payments: Vec<Payment>,
    pub wastes: Vec<WasteItem>,
    pub transactions: Vec<Transaction>,
    /// Kept verbatim; the till does not interpret reservations.
    pub reservations: Vec<Value>,
    pub inventory: Vec<InventoryProduct>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackupDocument {
    pub version: String,
    pub timestamp: i64,
    pub date: String,
    pub data: BackupData,
}

impl BackupDocument {
    pub fn read(path: &Path) -> PosResult<Self> {
        let text = fs::read_to_string(path)?;
        let document: BackupDocument = serde_json::from_str(&text)?;
        if document.version.trim().is_empty() {
            return Err(PosError::Validation(format!(
                "{} is not a till backup",
                path.display()
            )));
        }
        Ok(document)
    }
}

impl Pos {
    fn reservations(&self) -> PosResult<Vec<Value>> {
        Ok(self.db().load(db::RESERVATIONS)?.unwrap_or_default())
    }

    pub fn backup_document(&self) -> PosResult<BackupDocument> {
        let state = self.state();
        let now = Local::now();
        Ok(BackupDocument {
            version: BACKUP_VERSION.to_string(),
            timestamp: now.timestamp_millis(),
            date: now.format("%d.%m.%Y %H:%M:%S").to_string(),
            data: BackupData {
                tables: state.tables.clone(),
                orders: state.orders.clone(),
                payments: state.payments.clone(),
                wastes: state.wastes.clone(),
                transactions: state.transactions.clone(),
                reservations: self.reservations()?,
                inventory: state.inventory.clone(),
            },
        })
    }

    /// Writes a full backup into `dir` and records the backup time.
    pub fn create_backup(&mut self, dir: &Path) -> PosResult<PathBuf> {
        let document = self.backup_document()?;
        fs::create_dir_all(dir)?;

        let now = Local::now();
        let path = dir.join(format!(
            "Pub_Backup_{}_{}.json",
            now.format("%d_%m_%Y"),
            now.format("%H-%M-%S")
        ));
        fs::write(&path, serde_json::to_string_pretty(&document)?)?;

        let stamp = document.timestamp;
        self.commit(|state| {
            state.settings.last_backup_time = Some(stamp);
            Ok(())
        })?;

        info!(
            path = %path.display(),
            orders = document.data.orders.len(),
            payments = document.data.payments.len(),
            "Backup written"
        );
        Ok(path)
    }

    pub fn restore_backup(&mut self, path: &Path) -> PosResult<()> {
        let document = BackupDocument::read(path)?;
        self.restore_document(document)
    }

    /// Replaces every collection the backup carries. The catalog, ingredients
    /// and settings stay as they are.
    pub fn restore_document(&mut self, document: BackupDocument) -> PosResult<()> {
        let BackupData {
            tables,
            orders,
            payments,
            wastes,
            transactions,
            reservations,
            inventory,
        } = document.data;

        let mut state = self.state().clone();
        state.tables = tables;
        state.orders = orders;
        state.payments = payments;
        state.wastes = wastes;
        state.transactions = transactions;
        state.inventory = inventory;

        let reservations = serde_json::to_string(&reservations)?;
        self.replace_state(state, &[(db::RESERVATIONS, reservations)])?;

        info!(
            version = %document.version,
            tables = self.state().tables.len(),
            orders = self.state().orders.len(),
            "Backup restored"
        );
        Ok(())
    }

    pub fn set_auto_backup(&mut self, enabled: bool) -> PosResult<Settings> {
        self.commit(|state| {
            state.settings.auto_backup_enabled = enabled;
            Ok(state.settings.clone())
        })
    }

    /// Best-effort backup on exit when auto-backup is on. Failures are logged,
    /// never returned.
    pub fn shutdown(&mut self, backup_dir: &Path) -> Option<PathBuf> {
        if !self.state().settings.auto_backup_enabled {
            info!("Auto-backup disabled, skipping exit backup");
            return None;
        }

        match self.create_backup(backup_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, dir = %backup_dir.display(), "Exit backup failed");
                None
            }
        }
    }
}
