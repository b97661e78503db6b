use std::sync::mpsc::{self, Receiver, Sender};

use chrono::Local;
use tracing::{debug, info};

use crate::config::PosConfig;
use crate::db::Database;
use crate::error::PosResult;
use crate::models::{Order, OrderItem, Table};
use crate::state::PosState;

/// Catalog change notification delivered to subscribers after a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    ProductsChanged,
    CategoriesChanged,
    IngredientsChanged,
    StockChanged,
}

/// The till: owns the store, the live snapshot and the catalog subscribers.
/// All writes go through the command methods in `commands`.
pub struct Pos {
    db: Database,
    state: PosState,
    subscribers: Vec<Sender<CatalogEvent>>,
}

impl Pos {
    pub fn open(config: &PosConfig) -> PosResult<Self> {
        let db = Database::open(&config.database_path())?;
        Self::with_database(db)
    }

    pub fn open_in_memory() -> PosResult<Self> {
        Self::with_database(Database::open_in_memory()?)
    }

    pub fn with_database(db: Database) -> PosResult<Self> {
        db.initialize()?;
        let state = PosState::load(&db)?;
        info!(
            tables = state.tables.len(),
            orders = state.orders.len(),
            products = state.products.len(),
            "Loaded till state"
        );

        Ok(Pos {
            db,
            state,
            subscribers: Vec::new(),
        })
    }

    pub fn state(&self) -> &PosState {
        &self.state
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub fn table(&self, table_id: &str) -> PosResult<&Table> {
        self.state.table(table_id)
    }

    pub fn table_number(&self, table_id: &str) -> PosResult<u32> {
        self.state.table_number(table_id)
    }

    pub fn table_id(&self, table_number: u32) -> PosResult<&str> {
        self.state.table_id(table_number)
    }

    pub fn orders_for_table(&self, table_id: &str) -> PosResult<Vec<&Order>> {
        let number = self.state.table_number(table_id)?;
        Ok(self.state.orders_for(number).collect())
    }

    pub fn unpaid_items(&self, table_id: &str) -> PosResult<Vec<&OrderItem>> {
        let number = self.state.table_number(table_id)?;
        Ok(self.state.unpaid_items(number))
    }

    /// Applies `f` to a copy of the snapshot. The copy is persisted and swapped in
    /// only when `f` succeeds, so a failed command leaves everything untouched.
    pub(crate) fn commit<R>(
        &mut self,
        f: impl FnOnce(&mut PosState) -> PosResult<R>,
    ) -> PosResult<R> {
        let mut draft = self.state.clone();
        let result = f(&mut draft)?;
        draft.persist(&self.db)?;
        self.state = draft;
        Ok(result)
    }

    /// Replaces the live snapshot wholesale (backup restore). `extra` documents
    /// are written in the same store transaction.
    pub(crate) fn replace_state(
        &mut self,
        state: PosState,
        extra: &[(&str, String)],
    ) -> PosResult<()> {
        let mut documents: Vec<(&str, String)> = state.documents()?;
        documents.extend(extra.iter().cloned());
        self.db.save_documents(&documents)?;
        self.state = state;
        Ok(())
    }

    pub fn subscribe(&mut self) -> Receiver<CatalogEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn publish(&mut self, event: CatalogEvent) {
        debug!(?event, subscribers = self.subscribers.len(), "Publishing catalog event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Epoch milliseconds plus the `HH:MM` display time.
pub(crate) fn stamp() -> (i64, String) {
    let now = Local::now();
    (now.timestamp_millis(), now.format("%H:%M").to_string())
}

pub(crate) fn today_label() -> String {
    Local::now().format("%d.%m.%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_commit_leaves_state_untouched() {
        let mut pos = Pos::open_in_memory().unwrap();
        let before = pos.state().clone();

        let result: PosResult<()> = pos.commit(|state| {
            state.tables[0].open_bill(50.0);
            Err(crate::error::PosError::Validation("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(pos.state(), &before);
    }

    #[test]
    fn test_commit_persists_snapshot() {
        let mut pos = Pos::open_in_memory().unwrap();
        pos.commit(|state| {
            state.tables[0].open_bill(50.0);
            Ok(())
        })
        .unwrap();

        let reloaded = PosState::load(pos.db()).unwrap();
        assert_eq!(&reloaded, pos.state());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut pos = Pos::open_in_memory().unwrap();
        let live = pos.subscribe();
        drop(pos.subscribe());

        pos.publish(CatalogEvent::StockChanged);

        assert_eq!(pos.subscribers.len(), 1);
        assert_eq!(live.try_recv().unwrap(), CatalogEvent::StockChanged);
    }
}
