use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, Database};
use crate::error::{PosError, PosResult};
use crate::models::{
    Category, CategorySettingsMap, Ingredient, InventoryProduct, InventoryReport, Order,
    OrderItem, Payment, Product, Settings, Table, Transaction, WasteItem,
};
use crate::seed;

/// The whole working set of the till. Commands mutate a copy of it and the copy
/// replaces the original only when the command succeeds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PosState {
    pub tables: Vec<Table>,
    pub orders: Vec<Order>,
    pub payments: Vec<Payment>,
    pub wastes: Vec<WasteItem>,
    pub transactions: Vec<Transaction>,
    pub inventory: Vec<InventoryProduct>,
    pub ingredients: Vec<Ingredient>,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub category_settings: CategorySettingsMap,
    pub settings: Settings,
    /// Last stock count snapshot, if one was ever taken.
    pub inventory_report: Option<InventoryReport>,
}

impl Default for PosState {
    fn default() -> Self {
        PosState {
            tables: seed::default_tables(),
            orders: Vec::new(),
            payments: Vec::new(),
            wastes: Vec::new(),
            transactions: Vec::new(),
            inventory: seed::default_inventory(),
            ingredients: seed::default_ingredients(),
            products: seed::default_products(),
            categories: seed::default_categories(),
            category_settings: seed::default_category_settings(),
            settings: Settings::default(),
            inventory_report: None,
        }
    }
}

impl PosState {
    /// Loads every collection, falling back to the seeded default for keys that
    /// were never written.
    pub fn load(db: &Database) -> PosResult<Self> {
        let defaults = PosState::default();
        Ok(PosState {
            tables: db.load(db::TABLES)?.unwrap_or(defaults.tables),
            orders: db.load(db::ORDERS)?.unwrap_or(defaults.orders),
            payments: db.load(db::PAYMENTS)?.unwrap_or(defaults.payments),
            wastes: db.load(db::WASTES)?.unwrap_or(defaults.wastes),
            transactions: db.load(db::TRANSACTIONS)?.unwrap_or(defaults.transactions),
            inventory: db.load(db::INVENTORY)?.unwrap_or(defaults.inventory),
            ingredients: db.load(db::INGREDIENTS)?.unwrap_or(defaults.ingredients),
            products: db.load(db::PRODUCTS)?.unwrap_or(defaults.products),
            categories: db.load(db::CATEGORIES)?.unwrap_or(defaults.categories),
            category_settings: db
                .load(db::CATEGORY_SETTINGS)?
                .unwrap_or(defaults.category_settings),
            settings: db.load(db::SETTINGS)?.unwrap_or(defaults.settings),
            inventory_report: db
                .load::<Option<InventoryReport>>(db::INVENTORY_REPORT)?
                .flatten(),
        })
    }

    /// Rewrites every collection wholesale.
    pub fn persist(&self, db: &Database) -> PosResult<()> {
        db.save_documents(&self.documents()?)
    }

    /// Every collection serialized under its store key.
    pub fn documents(&self) -> PosResult<Vec<(&'static str, String)>> {
        Ok(vec![
            (db::TABLES, serde_json::to_string(&self.tables)?),
            (db::ORDERS, serde_json::to_string(&self.orders)?),
            (db::PAYMENTS, serde_json::to_string(&self.payments)?),
            (db::WASTES, serde_json::to_string(&self.wastes)?),
            (db::TRANSACTIONS, serde_json::to_string(&self.transactions)?),
            (db::INVENTORY, serde_json::to_string(&self.inventory)?),
            (db::INGREDIENTS, serde_json::to_string(&self.ingredients)?),
            (db::PRODUCTS, serde_json::to_string(&self.products)?),
            (db::CATEGORIES, serde_json::to_string(&self.categories)?),
            (db::CATEGORY_SETTINGS, serde_json::to_string(&self.category_settings)?),
            (db::SETTINGS, serde_json::to_string(&self.settings)?),
            (db::INVENTORY_REPORT, serde_json::to_string(&self.inventory_report)?),
        ])
    }

    // -----------------------------------------------------------------------
    // Table lookups
    // -----------------------------------------------------------------------

    pub fn table(&self, table_id: &str) -> PosResult<&Table> {
        self.tables
            .iter()
            .find(|t| t.id == table_id)
            .ok_or_else(|| PosError::TableNotFound(table_id.to_string()))
    }

    pub fn table_mut(&mut self, table_id: &str) -> PosResult<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| PosError::TableNotFound(table_id.to_string()))
    }

    pub fn table_by_number_mut(&mut self, number: u32) -> PosResult<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.number == number)
            .ok_or_else(|| PosError::TableNotFound(format!("#{number}")))
    }

    pub fn table_number(&self, table_id: &str) -> PosResult<u32> {
        self.table(table_id).map(|t| t.number)
    }

    pub fn table_id(&self, number: u32) -> PosResult<&str> {
        self.tables
            .iter()
            .find(|t| t.number == number)
            .map(|t| t.id.as_str())
            .ok_or_else(|| PosError::TableNotFound(format!("#{number}")))
    }

    // -----------------------------------------------------------------------
    // Order lookups
    // -----------------------------------------------------------------------

    pub fn orders_for(&self, table_number: u32) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(move |order| order.table_number == table_number)
    }

    pub fn unpaid_items(&self, table_number: u32) -> Vec<&OrderItem> {
        self.orders_for(table_number)
            .flat_map(|order| order.unpaid_items())
            .collect()
    }

    pub fn unpaid_total(&self, table_number: u32) -> f64 {
        self.unpaid_items(table_number).iter().map(|item| item.price).sum()
    }

    pub fn order(&self, order_id: Uuid) -> PosResult<&Order> {
        self.orders
            .iter()
            .find(|o| o.id == order_id)
            .ok_or(PosError::OrderNotFound(order_id))
    }

    /// Drops orders whose item list became empty.
    pub fn prune_empty_orders(&mut self) {
        self.orders.retain(|order| !order.order_items.is_empty());
    }

    // -----------------------------------------------------------------------
    // Catalog lookups
    // -----------------------------------------------------------------------

    pub fn product_by_name(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn inventory_by_name_mut(&mut self, name: &str) -> Option<&mut InventoryProduct> {
        self.inventory.iter_mut().find(|p| p.name == name)
    }
}
