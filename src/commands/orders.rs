//! Order engine: placing orders, cancelling and writing off items, moving
//! items between tables.
//!
//! Stock is checked for the whole cart before anything is decremented, so a
//! shortage on any line rejects the order without side effects.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PosError, PosResult};
use crate::models::{
    expand_cart, sum_prices, CartLine, EntryRef, Order, OrderItem, OrderStatus, Transaction,
    TransactionKind, WasteItem, WasteKind,
};
use crate::pos::{stamp, today_label, Pos};
use crate::state::PosState;

// ---------------------------------------------------------------------------
// Stock reservation
// ---------------------------------------------------------------------------

/// Stock an order will consume, aggregated per ingredient and per inventory row.
#[derive(Debug, Default)]
pub(crate) struct StockPlan {
    ingredients: Vec<(usize, f64)>,
    units: Vec<(usize, i64)>,
}

impl StockPlan {
    pub(crate) fn for_items(state: &PosState, items: &[OrderItem]) -> Self {
        let mut plan = StockPlan::default();

        for item in items {
            match state.product_by_name(&item.name) {
                Some(product) if product.uses_recipe() => {
                    for line in &product.recipe {
                        match state.ingredients.iter().position(|i| i.id == line.ingredient_id) {
                            Some(idx) => add(&mut plan.ingredients, idx, line.amount),
                            None => warn!(
                                product = %product.name,
                                ingredient = %line.ingredient_id,
                                "Recipe ingredient not found, skipping"
                            ),
                        }
                    }
                }
                _ => {
                    // Items without an inventory row are not stock tracked
                    if let Some(idx) = state.inventory.iter().position(|p| p.name == item.name) {
                        add(&mut plan.units, idx, 1);
                    }
                }
            }
        }

        plan
    }

    pub(crate) fn check(&self, state: &PosState) -> PosResult<()> {
        for &(idx, required) in &self.ingredients {
            let ingredient = &state.ingredients[idx];
            if ingredient.current_stock < required {
                return Err(PosError::InsufficientStock {
                    item: ingredient.name.clone(),
                    required,
                    available: ingredient.current_stock,
                    unit: ingredient.unit.clone(),
                });
            }
        }
        for &(idx, required) in &self.units {
            let row = &state.inventory[idx];
            if row.current_stock < required {
                return Err(PosError::InsufficientStock {
                    item: row.name.clone(),
                    required: required as f64,
                    available: row.current_stock as f64,
                    unit: row.unit.clone(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn consume(&self, state: &mut PosState) {
        for &(idx, amount) in &self.ingredients {
            let ingredient = &mut state.ingredients[idx];
            ingredient.current_stock = (ingredient.current_stock - amount).max(0.0);
        }
        for &(idx, units) in &self.units {
            let row = &mut state.inventory[idx];
            row.current_stock = (row.current_stock - units).max(0);
        }
    }

    pub(crate) fn restore(&self, state: &mut PosState) {
        for &(idx, amount) in &self.ingredients {
            state.ingredients[idx].current_stock += amount;
        }
        for &(idx, units) in &self.units {
            state.inventory[idx].current_stock += units;
        }
    }
}

fn add<T: std::ops::AddAssign + Copy>(totals: &mut Vec<(usize, T)>, idx: usize, amount: T) {
    match totals.iter_mut().find(|(i, _)| *i == idx) {
        Some((_, total)) => *total += amount,
        None => totals.push((idx, amount)),
    }
}

// ---------------------------------------------------------------------------
// Shared mutations
// ---------------------------------------------------------------------------

/// Removes the selected unpaid items from a table's orders, recomputing totals
/// and dropping orders left empty. Returns the removed items.
pub(crate) fn take_unpaid_items(
    state: &mut PosState,
    table_number: u32,
    item_ids: &[Uuid],
) -> Vec<OrderItem> {
    let mut taken = Vec::new();

    for order in state.orders.iter_mut().filter(|o| o.table_number == table_number) {
        let before = order.order_items.len();
        let (moved, kept): (Vec<_>, Vec<_>) = order
            .order_items
            .drain(..)
            .partition(|item| !item.is_paid && item_ids.contains(&item.id));
        order.order_items = kept;
        if order.order_items.len() != before {
            order.recompute_total();
        }
        taken.extend(moved);
    }

    state.prune_empty_orders();
    taken
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn log_transaction(
    state: &mut PosState,
    kind: TransactionKind,
    table_number: u32,
    amount: f64,
    description: String,
    details: String,
    subject: Option<EntryRef>,
    wastes: Vec<WasteItem>,
) -> Transaction {
    let (timestamp, time) = stamp();
    let transaction = Transaction {
        id: Uuid::new_v4(),
        kind,
        timestamp,
        time,
        date: today_label(),
        description,
        amount,
        table_number,
        details,
        subject,
        wastes,
    };
    state.transactions.insert(0, transaction.clone());
    transaction
}

fn require_reason(reason: &str) -> PosResult<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(PosError::Validation("a reason is required".into()));
    }
    Ok(reason.to_string())
}

fn new_waste(item: &OrderItem, table_number: u32, reason: &str, kind: WasteKind) -> WasteItem {
    let (timestamp, time) = stamp();
    WasteItem {
        id: Uuid::new_v4(),
        name: item.name.clone(),
        price: item.price,
        table_number,
        timestamp,
        time,
        reason: reason.to_string(),
        kind,
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Full,
    Partial,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub mode: TransferMode,
    pub amount: f64,
    pub orders: Vec<Uuid>,
}

impl Pos {
    /// Places one order for `table_id`. Each cart line becomes `quantity`
    /// individual items so they can later be paid or cancelled one by one.
    pub fn place_order(
        &mut self,
        table_id: &str,
        cart: &[CartLine],
        note: Option<&str>,
    ) -> PosResult<Order> {
        let items = expand_cart(cart);
        if items.is_empty() {
            return Err(PosError::EmptyOrder);
        }
        if let Some(line) = cart.iter().find(|line| line.price < 0.0) {
            return Err(PosError::Validation(format!("negative price for {}", line.name)));
        }

        let order = self.commit(|state| {
            let table_number = state.table_number(table_id)?;

            let plan = StockPlan::for_items(state, &items);
            plan.check(state)?;
            plan.consume(state);

            let (timestamp, time) = stamp();
            let order = Order {
                id: Uuid::new_v4(),
                table_number,
                total_amount: sum_prices(&items),
                order_items: items,
                status: OrderStatus::Preparing,
                time,
                timestamp,
                is_transfer: false,
                transfer_from: None,
                transfer_to: None,
                order_note: note
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            };

            state.table_mut(table_id)?.open_bill(order.total_amount);
            state.orders.push(order.clone());
            log_transaction(
                state,
                TransactionKind::Order,
                table_number,
                order.total_amount,
                format!("Sipariş - Masa {table_number}"),
                order.summary(),
                Some(EntryRef::Order(order.id)),
                Vec::new(),
            );

            Ok(order)
        })?;

        info!(
            order_id = %order.id,
            table = %table_id,
            items = order.order_items.len(),
            total = %order.total_amount,
            "Order placed"
        );
        Ok(order)
    }

    /// Cancels one unpaid item of an active order and returns its unit to stock.
    pub fn delete_order_item(
        &mut self,
        table_id: &str,
        item_id: Uuid,
        reason: &str,
    ) -> PosResult<WasteItem> {
        let reason = require_reason(reason)?;

        let waste = self.commit(|state| {
            let table_number = state.table_number(table_id)?;
            let item = take_unpaid_items(state, table_number, &[item_id])
                .into_iter()
                .next()
                .ok_or(PosError::ItemNotFound(item_id))?;

            state.table_mut(table_id)?.reduce_bill(item.price);

            let waste = new_waste(&item, table_number, &reason, WasteKind::Delete);
            state.wastes.push(waste.clone());

            // Recipe ingredients are not given back on cancellation
            if let Some(row) = state.inventory_by_name_mut(&item.name) {
                row.current_stock += 1;
            }

            log_transaction(
                state,
                TransactionKind::Delete,
                table_number,
                item.price,
                format!("Ürün Silme - Masa {table_number}"),
                format!("{} (₺{}) - {}", item.name, item.price, reason),
                Some(EntryRef::Waste(waste.id)),
                vec![waste.clone()],
            );

            Ok(waste)
        })?;

        info!(waste_id = %waste.id, table = %table_id, item = %waste.name, "Order item deleted");
        Ok(waste)
    }

    /// Writes off several unpaid items of a table as waste. Stock is not restored.
    pub fn waste_items(
        &mut self,
        table_id: &str,
        item_ids: &[Uuid],
        reason: &str,
    ) -> PosResult<Transaction> {
        if item_ids.is_empty() {
            return Err(PosError::Validation("no items selected".into()));
        }
        let reason = require_reason(reason)?;

        let transaction = self.commit(|state| {
            let table_number = state.table_number(table_id)?;
            if let Some(missing) = item_ids
                .iter()
                .find(|id| !state.unpaid_items(table_number).iter().any(|item| item.id == **id))
            {
                return Err(PosError::ItemNotFound(*missing));
            }

            let removed = take_unpaid_items(state, table_number, item_ids);
            let amount = sum_prices(&removed);
            state.table_mut(table_id)?.reduce_bill(amount);

            let wastes: Vec<WasteItem> = removed
                .iter()
                .map(|item| new_waste(item, table_number, &reason, WasteKind::Waste))
                .collect();
            state.wastes.extend(wastes.iter().cloned());

            let details = wastes
                .iter()
                .map(|w| format!("{} (₺{}) - {}", w.name, w.price, w.reason))
                .collect::<Vec<_>>()
                .join(", ");

            Ok(log_transaction(
                state,
                TransactionKind::Waste,
                table_number,
                amount,
                format!("İptal - Masa {table_number}"),
                details,
                None,
                wastes,
            ))
        })?;

        info!(
            transaction_id = %transaction.id,
            table = %table_id,
            items = transaction.wastes.len(),
            amount = %transaction.amount,
            "Items written off"
        );
        Ok(transaction)
    }

    /// Moves items to another table. Selecting as many items as the source has
    /// unpaid moves its whole tab: orders are re-pointed in place. Otherwise the
    /// selected items are gathered into one new order on the target.
    pub fn transfer_items(
        &mut self,
        source_id: &str,
        target_id: &str,
        item_ids: &[Uuid],
    ) -> PosResult<TransferOutcome> {
        if item_ids.is_empty() {
            return Err(PosError::InvalidTransferSelection("no items selected".into()));
        }
        if source_id == target_id {
            return Err(PosError::InvalidTransferSelection(
                "source and target are the same table".into(),
            ));
        }

        let outcome = self.commit(|state| {
            let source_number = state.table_number(source_id)?;
            let target_number = state.table_number(target_id)?;
            let (timestamp, time) = stamp();

            let unpaid = state.unpaid_items(source_number);
            if let Some(missing) = item_ids.iter().find(|id| !unpaid.iter().any(|i| i.id == **id)) {
                return Err(PosError::ItemNotFound(*missing));
            }
            let unpaid_count = unpaid.len();
            if item_ids.len() == unpaid_count {
                let amount = state.table(source_id)?.current_bill;
                let mut moved = Vec::new();
                for order in state.orders.iter_mut().filter(|o| o.table_number == source_number) {
                    order.table_number = target_number;
                    order.is_transfer = true;
                    order.transfer_from = Some(source_number);
                    order.transfer_to = Some(target_number);
                    order.timestamp = timestamp;
                    order.time = time.clone();
                    moved.push(order.id);
                }

                state.table_mut(source_id)?.vacate();
                state.table_mut(target_id)?.open_bill(amount);

                return Ok(TransferOutcome {
                    mode: TransferMode::Full,
                    amount,
                    orders: moved,
                });
            }

            let items = take_unpaid_items(state, source_number, item_ids);
            let amount = sum_prices(&items);
            let order = Order {
                id: Uuid::new_v4(),
                table_number: target_number,
                order_items: items,
                status: OrderStatus::Preparing,
                time,
                timestamp,
                total_amount: amount,
                is_transfer: true,
                transfer_from: Some(source_number),
                transfer_to: Some(target_number),
                order_note: None,
            };
            let order_id = order.id;
            state.orders.push(order);

            state.table_mut(source_id)?.reduce_bill(amount);
            state.table_mut(target_id)?.open_bill(amount);

            Ok(TransferOutcome {
                mode: TransferMode::Partial,
                amount,
                orders: vec![order_id],
            })
        })?;

        info!(
            source = %source_id,
            target = %target_id,
            mode = ?outcome.mode,
            amount = %outcome.amount,
            "Items transferred"
        );
        Ok(outcome)
    }

    pub fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> PosResult<Order> {
        self.commit(|state| {
            let order = state
                .orders
                .iter_mut()
                .find(|o| o.id == order_id)
                .ok_or(PosError::OrderNotFound(order_id))?;
            order.status = status;
            Ok(order.clone())
        })
    }

    pub fn toggle_order_status(&mut self, order_id: Uuid) -> PosResult<Order> {
        let next = match self.state().order(order_id)?.status {
            OrderStatus::Preparing => OrderStatus::Served,
            OrderStatus::Served => OrderStatus::Preparing,
        };
        self.set_order_status(order_id, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, IngredientType, Product, RecipeLine};

    fn stock_of(pos: &Pos, name: &str) -> i64 {
        pos.state()
            .inventory
            .iter()
            .find(|p| p.name == name)
            .unwrap()
            .current_stock
    }

    fn add_vodka_cocktail(pos: &mut Pos, vodka_stock: f64, cl_per_drink: f64) {
        pos.commit(|state| {
            state.ingredients.push(Ingredient {
                id: "ing-test-vodka".into(),
                name: "TEST VOTKA".into(),
                current_stock: vodka_stock,
                min_stock: 0.0,
                unit: "cl".into(),
                supplier: "Test".into(),
                last_restocked: "01.01.2025".into(),
                price: 2.0,
                kind: IngredientType::Alcohol,
            });
            state.products.push(
                Product::new("x1", "VOTKA TONİK", 80.0, "kokteyller").with_recipe(vec![
                    RecipeLine {
                        ingredient_id: "ing-test-vodka".into(),
                        amount: cl_per_drink,
                    },
                ]),
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_place_order_expands_units_and_opens_bill() {
        let mut pos = Pos::open_in_memory().unwrap();

        let order = pos
            .place_order("bar1", &[CartLine::new("EFES PİLSEN", 45.0, 2)], Some("  soğuk  "))
            .unwrap();

        assert_eq!(order.order_items.len(), 2);
        assert_ne!(order.order_items[0].id, order.order_items[1].id);
        assert_eq!(order.total_amount, 90.0);
        assert_eq!(order.table_number, 1);
        assert_eq!(order.order_note.as_deref(), Some("soğuk"));

        let table = pos.table("bar1").unwrap();
        assert_eq!(table.current_bill, 90.0);
        assert!(table.occupied);
        assert_eq!(stock_of(&pos, "EFES PİLSEN"), 46);
        assert_eq!(pos.state().transactions[0].kind, TransactionKind::Order);
    }

    #[test]
    fn test_place_order_clears_reservation() {
        let mut pos = Pos::open_in_memory().unwrap();
        pos.toggle_reservation("bar2").unwrap();

        pos.place_order("bar2", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();

        let table = pos.table("bar2").unwrap();
        assert!(table.occupied);
        assert!(!table.reserved);
    }

    #[test]
    fn test_unit_shortage_rejects_whole_order() {
        let mut pos = Pos::open_in_memory().unwrap();
        let before = pos.state().clone();

        // AMSTERDAM has 12 in stock
        let err = pos
            .place_order(
                "bar1",
                &[CartLine::new("EFES PİLSEN", 45.0, 1), CartLine::new("AMSTERDAM", 70.0, 13)],
                None,
            )
            .unwrap_err();

        match err {
            PosError::InsufficientStock { item, required, available, .. } => {
                assert_eq!(item, "AMSTERDAM");
                assert_eq!(required, 13.0);
                assert_eq!(available, 12.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pos.state(), &before);
    }

    #[test]
    fn test_recipe_shortage_leaves_ingredients_untouched() {
        let mut pos = Pos::open_in_memory().unwrap();
        add_vodka_cocktail(&mut pos, 5.0, 6.0);
        let orders_before = pos.state().orders.len();

        let err = pos
            .place_order("bar1", &[CartLine::new("VOTKA TONİK", 80.0, 1)], None)
            .unwrap_err();

        assert!(matches!(err, PosError::InsufficientStock { .. }));
        assert_eq!(pos.state().orders.len(), orders_before);
        let vodka = pos.state().ingredients.iter().find(|i| i.id == "ing-test-vodka").unwrap();
        assert_eq!(vodka.current_stock, 5.0);
    }

    #[test]
    fn test_recipe_requirement_is_aggregated_across_units() {
        let mut pos = Pos::open_in_memory().unwrap();
        add_vodka_cocktail(&mut pos, 10.0, 6.0);

        // One drink fits, two do not
        let err = pos
            .place_order("bar1", &[CartLine::new("VOTKA TONİK", 80.0, 2)], None)
            .unwrap_err();
        assert!(matches!(err, PosError::InsufficientStock { required, .. } if required == 12.0));

        pos.place_order("bar1", &[CartLine::new("VOTKA TONİK", 80.0, 1)], None).unwrap();
        let vodka = pos.state().ingredients.iter().find(|i| i.id == "ing-test-vodka").unwrap();
        assert_eq!(vodka.current_stock, 4.0);
    }

    #[test]
    fn test_untracked_item_places_without_stock() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos
            .place_order("bar1", &[CartLine::new("GÜNÜN ÇORBASI", 30.0, 1)], None)
            .unwrap();
        assert_eq!(order.total_amount, 30.0);
    }

    #[test]
    fn test_empty_cart_and_unknown_table() {
        let mut pos = Pos::open_in_memory().unwrap();
        assert!(matches!(pos.place_order("bar1", &[], None), Err(PosError::EmptyOrder)));
        assert!(matches!(
            pos.place_order("bar1", &[CartLine::new("TUBORG", 45.0, 0)], None),
            Err(PosError::EmptyOrder)
        ));
        assert!(matches!(
            pos.place_order("teras1", &[CartLine::new("TUBORG", 45.0, 1)], None),
            Err(PosError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_delete_item_restores_unit_and_logs_waste() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos
            .place_order("bar1", &[CartLine::new("EFES PİLSEN", 45.0, 2)], None)
            .unwrap();

        let waste = pos
            .delete_order_item("bar1", order.order_items[0].id, "Yanlış sipariş")
            .unwrap();

        assert_eq!(waste.kind, WasteKind::Delete);
        assert_eq!(pos.table("bar1").unwrap().current_bill, 45.0);
        assert_eq!(stock_of(&pos, "EFES PİLSEN"), 47);
        let remaining = pos.state().order(order.id).unwrap();
        assert_eq!(remaining.order_items.len(), 1);
        assert_eq!(remaining.total_amount, 45.0);
        assert_eq!(pos.state().transactions[0].kind, TransactionKind::Delete);
    }

    #[test]
    fn test_deleting_last_item_drops_order_and_vacates() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos.place_order("bar1", &[CartLine::new("CORONA", 65.0, 1)], None).unwrap();

        pos.delete_order_item("bar1", order.order_items[0].id, "Müşteri vazgeçti")
            .unwrap();

        assert!(pos.state().order(order.id).is_err());
        let table = pos.table("bar1").unwrap();
        assert_eq!(table.current_bill, 0.0);
        assert!(!table.occupied);
    }

    #[test]
    fn test_delete_requires_reason_and_unpaid_item() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos.place_order("bar1", &[CartLine::new("CORONA", 65.0, 1)], None).unwrap();
        let item = order.order_items[0].id;

        assert!(matches!(
            pos.delete_order_item("bar1", item, "   "),
            Err(PosError::Validation(_))
        ));
        assert!(matches!(
            pos.delete_order_item("bar2", item, "x"),
            Err(PosError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_waste_items_batch() {
        let mut pos = Pos::open_in_memory().unwrap();
        let first = pos.place_order("bar1", &[CartLine::new("EFES PİLSEN", 45.0, 2)], None).unwrap();
        let second = pos.place_order("bar1", &[CartLine::new("NACHOS SUPREME", 65.0, 1)], None).unwrap();
        let stock_before = stock_of(&pos, "EFES PİLSEN");

        let transaction = pos
            .waste_items(
                "bar1",
                &[first.order_items[0].id, second.order_items[0].id],
                "Döküldü / Kırıldı",
            )
            .unwrap();

        assert_eq!(transaction.kind, TransactionKind::Waste);
        assert_eq!(transaction.wastes.len(), 2);
        assert_eq!(transaction.amount, 110.0);
        assert!(transaction.wastes.iter().all(|w| w.kind == WasteKind::Waste));
        assert_eq!(pos.table("bar1").unwrap().current_bill, 45.0);
        assert_eq!(stock_of(&pos, "EFES PİLSEN"), stock_before);
        assert!(pos.state().order(second.id).is_err());
        assert_eq!(pos.state().wastes.len(), 2);
    }

    #[test]
    fn test_waste_rejects_foreign_item_without_side_effects() {
        let mut pos = Pos::open_in_memory().unwrap();
        let mine = pos.place_order("bar1", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();
        let other = pos.place_order("bar2", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();
        let before = pos.state().clone();

        let err = pos
            .waste_items("bar1", &[mine.order_items[0].id, other.order_items[0].id], "Bozuk / Bayat")
            .unwrap_err();

        assert!(matches!(err, PosError::ItemNotFound(id) if id == other.order_items[0].id));
        assert_eq!(pos.state(), &before);
    }

    #[test]
    fn test_full_transfer_repoints_orders() {
        let mut pos = Pos::open_in_memory().unwrap();
        let first = pos.place_order("bar1", &[CartLine::new("BBQ KABURGA", 120.0, 1)], None).unwrap();
        let item_ids: Vec<Uuid> = first.order_items.iter().map(|i| i.id).collect();

        let outcome = pos.transfer_items("bar1", "bistro1", &item_ids).unwrap();

        assert_eq!(outcome.mode, TransferMode::Full);
        assert_eq!(outcome.amount, 120.0);
        let source = pos.table("bar1").unwrap();
        assert_eq!(source.current_bill, 0.0);
        assert!(!source.occupied);
        let target = pos.table("bistro1").unwrap();
        assert_eq!(target.current_bill, 120.0);
        assert!(target.occupied);

        let moved = pos.state().order(first.id).unwrap();
        assert_eq!(moved.table_number, 5);
        assert!(moved.is_transfer);
        assert_eq!(moved.transfer_from, Some(1));
        assert_eq!(moved.transfer_to, Some(5));
        assert_eq!(pos.state().orders.len(), 1);
    }

    #[test]
    fn test_partial_transfer_creates_one_order() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos.place_order("bar1", &[CartLine::new("HEINEKEN", 60.0, 3)], None).unwrap();
        pos.place_order("bistro1", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();

        let outcome = pos
            .transfer_items("bar1", "bistro1", &[order.order_items[0].id, order.order_items[1].id])
            .unwrap();

        assert_eq!(outcome.mode, TransferMode::Partial);
        assert_eq!(outcome.amount, 120.0);
        assert_eq!(pos.table("bar1").unwrap().current_bill, 60.0);
        assert_eq!(pos.table("bistro1").unwrap().current_bill, 165.0);

        let created = pos.state().order(outcome.orders[0]).unwrap();
        assert_eq!(created.table_number, 5);
        assert_eq!(created.order_items.len(), 2);
        assert_eq!(created.total_amount, 120.0);
        assert_eq!(pos.state().order(order.id).unwrap().total_amount, 60.0);
    }

    #[test]
    fn test_transfer_selection_errors() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos.place_order("bar1", &[CartLine::new("TUBORG", 45.0, 2)], None).unwrap();
        let id = order.order_items[0].id;

        assert!(matches!(
            pos.transfer_items("bar1", "bar2", &[]),
            Err(PosError::InvalidTransferSelection(_))
        ));
        assert!(matches!(
            pos.transfer_items("bar1", "bar1", &[id]),
            Err(PosError::InvalidTransferSelection(_))
        ));
        assert!(matches!(
            pos.transfer_items("bar1", "bar2", &[Uuid::new_v4()]),
            Err(PosError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_transfer_rejects_any_unknown_or_paid_item() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos.place_order("bar1", &[CartLine::new("TUBORG", 45.0, 3)], None).unwrap();
        let ids: Vec<Uuid> = order.order_items.iter().map(|i| i.id).collect();
        pos.pay_partial("bar1", crate::commands::payments::Tender::cash(45.0), &[ids[0]], 0.0)
            .unwrap();
        let before = pos.state().clone();

        let stranger = Uuid::new_v4();
        assert!(matches!(
            pos.transfer_items("bar1", "bar2", &[ids[1], stranger]),
            Err(PosError::ItemNotFound(id)) if id == stranger
        ));
        assert!(matches!(
            pos.transfer_items("bar1", "bar2", &[ids[0], ids[1]]),
            Err(PosError::ItemNotFound(id)) if id == ids[0]
        ));
        assert_eq!(pos.state(), &before);
    }

    #[test]
    fn test_toggle_order_status() {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos.place_order("bar1", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();

        assert_eq!(pos.toggle_order_status(order.id).unwrap().status, OrderStatus::Served);
        assert_eq!(pos.toggle_order_status(order.id).unwrap().status, OrderStatus::Preparing);
        assert!(pos.toggle_order_status(Uuid::new_v4()).is_err());
    }
}
