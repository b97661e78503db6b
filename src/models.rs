use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Amounts below half a cent count as settled.
pub const MONEY_EPSILON: f64 = 0.005;

pub fn is_zero(amount: f64) -> bool {
    amount.abs() < MONEY_EPSILON
}

pub fn sum_prices<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> f64 {
    items.into_iter().map(|item| item.price).sum()
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableShape {
    Round,
    Square,
    Rectangle,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub number: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub shape: TableShape,
    pub occupied: bool,
    #[serde(default)]
    pub reserved: bool,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    #[serde(default)]
    pub current_bill: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<u32>,
}

impl Table {
    pub fn new(id: &str, number: u32, name: &str, shape: TableShape, position: Position) -> Self {
        Table {
            id: id.to_string(),
            number,
            name: name.to_string(),
            shape,
            occupied: false,
            reserved: false,
            position,
            guests: None,
            current_bill: 0.0,
            z_index: None,
        }
    }

    /// Adds to the running bill and seats the table.
    pub fn open_bill(&mut self, amount: f64) {
        self.current_bill += amount;
        self.occupied = true;
        self.reserved = false;
    }

    /// Takes `amount` off the bill (floored at zero). A table whose bill reaches
    /// zero is vacated.
    pub fn reduce_bill(&mut self, amount: f64) {
        self.current_bill = (self.current_bill - amount).max(0.0);
        if is_zero(self.current_bill) {
            self.vacate();
        }
    }

    pub fn vacate(&mut self) {
        self.current_bill = 0.0;
        self.occupied = false;
        self.reserved = false;
        self.guests = None;
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Preparing,
    Served,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub is_paid: bool,
}

impl OrderItem {
    pub fn new(name: &str, price: f64) -> Self {
        OrderItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            is_paid: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub table_number: u32,
    pub order_items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub time: String,
    pub timestamp: i64,
    pub total_amount: f64,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_from: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_to: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_note: Option<String>,
}

impl Order {
    pub fn recompute_total(&mut self) {
        self.total_amount = sum_prices(&self.order_items);
    }

    /// Comma separated item names, as shown in activity feeds.
    pub fn summary(&self) -> String {
        self.order_items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn unpaid_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.order_items.iter().filter(|item| !item.is_paid)
    }
}

/// One cart line: `quantity` units of a product at `price` each.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CartLine {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(name: &str, price: f64, quantity: u32) -> Self {
        CartLine {
            name: name.to_string(),
            price,
            quantity,
        }
    }
}

/// Expands cart lines into one order item per purchased unit.
pub fn expand_cart(lines: &[CartLine]) -> Vec<OrderItem> {
    lines
        .iter()
        .flat_map(|line| (0..line.quantity).map(move |_| OrderItem::new(&line.name, line.price)))
        .collect()
}

// ---------------------------------------------------------------------------
// Payments, wastes, transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub table_number: u32,
    pub table_id: String,
    pub total_amount: f64,
    pub cash_amount: f64,
    pub card_amount: f64,
    pub is_partial: bool,
    #[serde(default)]
    pub discount_percent: f64,
    pub timestamp: i64,
    pub time: String,
    /// Items this payment marked paid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paid_items: Vec<Uuid>,
    /// Amount taken off the bill when it differs from `total_amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_reduction: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum WasteKind {
    /// Spoilage or loss written off from the payment screen.
    Waste,
    /// Cancellation of an active, unpaid order line.
    Delete,
}

impl WasteKind {
    pub fn label(&self) -> &'static str {
        match self {
            WasteKind::Waste => "ZAYİ/FİRE",
            WasteKind::Delete => "AKTİF İPTAL",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteItem {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub table_number: u32,
    pub timestamp: i64,
    pub time: String,
    pub reason: String,
    #[serde(rename = "type")]
    pub kind: WasteKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Payment,
    Order,
    Waste,
    Delete,
}

/// Reference to a revertible ledger entry.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntryRef {
    Order(Uuid),
    Payment(Uuid),
    Waste(Uuid),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub timestamp: i64,
    pub time: String,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub table_number: u32,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<EntryRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wastes: Vec<WasteItem>,
}

// ---------------------------------------------------------------------------
// Catalog and stock
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub ingredient_id: String,
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub is_cocktail: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipe: Vec<RecipeLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Product {
    pub fn new(id: &str, name: &str, price: f64, category: &str) -> Self {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price,
            category: category.to_string(),
            is_cocktail: false,
            recipe: Vec::new(),
            supplier: None,
            current_stock: None,
            min_stock: None,
            unit: None,
        }
    }

    pub fn with_recipe(mut self, recipe: Vec<RecipeLine>) -> Self {
        self.is_cocktail = true;
        self.recipe = recipe;
        self
    }

    /// Recipe products consume ingredients instead of their own unit stock.
    pub fn uses_recipe(&self) -> bool {
        self.is_cocktail && !self.recipe.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryProduct {
    pub id: String,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
    pub min_stock: i64,
    pub unit: String,
    pub supplier: String,
    pub last_restocked: String,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngredientType {
    Alcohol,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub unit: String,
    pub supplier: String,
    pub last_restocked: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: IngredientType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySettings {
    pub show_in_menu: bool,
    pub show_in_inventory: bool,
    #[serde(default)]
    pub requires_ingredients: bool,
}

impl Default for CategorySettings {
    fn default() -> Self {
        CategorySettings {
            show_in_menu: true,
            show_in_inventory: true,
            requires_ingredients: false,
        }
    }
}

pub type CategorySettingsMap = BTreeMap<String, CategorySettings>;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Critical,
    Low,
    Normal,
}

impl StockStatus {
    /// Critical at or below the minimum, low up to one and a half times it.
    pub fn of(current: f64, min: f64) -> Self {
        if current <= min {
            StockStatus::Critical
        } else if current <= min * 1.5 {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }
}

/// Low-stock line shared by unit-counted goods and ingredients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LowStock {
    pub id: String,
    pub name: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub unit: String,
    pub status: StockStatus,
}

/// Stock count snapshot taken from the inventory screen. Unit stock of
/// cocktails is left out; their ingredients are counted instead.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InventoryReport {
    pub timestamp: i64,
    pub date: String,
    pub products: BTreeMap<String, i64>,
    pub ingredients: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub before: f64,
    pub now: f64,
    pub used: f64,
}

/// Stock movement between the last inventory report and now.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockChanges {
    pub report_date: String,
    pub products: Vec<StockChange>,
    pub ingredients: Vec<StockChange>,
    pub products_before: f64,
    pub products_now: f64,
    pub products_used: f64,
    pub ingredients_before: f64,
    pub ingredients_now: f64,
    pub ingredients_used: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub auto_backup_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_time: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_backup_enabled: true,
            last_backup_time: None,
        }
    }
}
