//! Activity ledger and revert.
//!
//! The ledger view is derived from the live orders, payments and wastes rather
//! than from the logged transactions, so a reverted entry disappears from it
//! without any bookkeeping. Logged transactions are kept alongside for export
//! and for reverting a whole waste batch at once.

use chrono::{DateTime, Duration, Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::commands::orders::StockPlan;
use crate::error::{PosError, PosResult};
use crate::models::{
    sum_prices, EntryRef, Order, OrderItem, OrderStatus, Payment, Transaction, TransactionKind,
    WasteItem, WasteKind,
};
use crate::pos::{stamp, Pos};
use crate::state::PosState;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    OrderAdded,
    TableTransfer,
    PaymentFull,
    PaymentPartial,
    WasteItem,
}

impl LedgerAction {
    pub fn label(&self) -> &'static str {
        match self {
            LedgerAction::OrderAdded => "Sipariş Eklendi",
            LedgerAction::TableTransfer => "Masa Transferi",
            LedgerAction::PaymentFull => "Tam Ödeme",
            LedgerAction::PaymentPartial => "Kısmi Ödeme",
            LedgerAction::WasteItem => "ZAYİ / İPTAL",
        }
    }

    pub fn is_payment(&self) -> bool {
        matches!(self, LedgerAction::PaymentFull | LedgerAction::PaymentPartial)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub subject: EntryRef,
    pub action: LedgerAction,
    pub timestamp: i64,
    pub time: String,
    pub table_number: u32,
    pub amount: f64,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_kind: Option<WasteKind>,
}

impl LedgerEntry {
    fn from_order(order: &Order) -> Self {
        let (action, details) = if order.is_transfer {
            let from = order.transfer_from.unwrap_or(order.table_number);
            (
                LedgerAction::TableTransfer,
                format!("Masa {from} → Masa {}", order.table_number),
            )
        } else {
            (LedgerAction::OrderAdded, order.summary())
        };

        LedgerEntry {
            subject: EntryRef::Order(order.id),
            action,
            timestamp: order.timestamp,
            time: order.time.clone(),
            table_number: order.table_number,
            amount: order.total_amount,
            details,
            waste_kind: None,
        }
    }

    fn from_payment(payment: &Payment) -> Self {
        let mut parts = Vec::new();
        if payment.cash_amount > 0.0 {
            parts.push(format!("Nakit: ₺{}", payment.cash_amount));
        }
        if payment.card_amount > 0.0 {
            parts.push(format!("Kart: ₺{}", payment.card_amount));
        }

        LedgerEntry {
            subject: EntryRef::Payment(payment.id),
            action: if payment.is_partial {
                LedgerAction::PaymentPartial
            } else {
                LedgerAction::PaymentFull
            },
            timestamp: payment.timestamp,
            time: payment.time.clone(),
            table_number: payment.table_number,
            amount: payment.total_amount,
            details: parts.join(" "),
            waste_kind: None,
        }
    }

    fn from_waste(waste: &WasteItem) -> Self {
        LedgerEntry {
            subject: EntryRef::Waste(waste.id),
            action: LedgerAction::WasteItem,
            timestamp: waste.timestamp,
            time: waste.time.clone(),
            table_number: waste.table_number,
            amount: waste.price,
            details: format!("{}: {} ({})", waste.kind.label(), waste.name, waste.reason),
            waste_kind: Some(waste.kind),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerPeriod {
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl LedgerPeriod {
    /// Earliest timestamp (epoch millis) inside the period, `None` for all time.
    pub fn since(&self, now: DateTime<Local>) -> Option<i64> {
        match self {
            LedgerPeriod::Today => Some(start_of_day(now)),
            LedgerPeriod::Week => Some((now - Duration::days(7)).timestamp_millis()),
            LedgerPeriod::Month => Some((now - Duration::days(30)).timestamp_millis()),
            LedgerPeriod::All => None,
        }
    }
}

fn start_of_day(now: DateTime<Local>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .map(|midnight| midnight.timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LedgerFilter {
    pub period: LedgerPeriod,
    pub search: Option<String>,
}

impl LedgerFilter {
    fn matches(&self, entry: &LedgerEntry, since: Option<i64>) -> bool {
        if since.is_some_and(|since| entry.timestamp < since) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => {
                let query = query.to_lowercase();
                entry.details.to_lowercase().contains(&query)
                    || entry.table_number.to_string().contains(&query)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total: usize,
    pub today: usize,
    pub payment_total: f64,
}

/// Newest-first ledger view over `state` as of `now`.
pub fn ledger_entries(
    state: &PosState,
    filter: &LedgerFilter,
    now: DateTime<Local>,
) -> Vec<LedgerEntry> {
    let since = filter.period.since(now);
    let mut entries: Vec<LedgerEntry> = state
        .orders
        .iter()
        .map(LedgerEntry::from_order)
        .chain(state.payments.iter().map(LedgerEntry::from_payment))
        .chain(state.wastes.iter().map(LedgerEntry::from_waste))
        .filter(|entry| filter.matches(entry, since))
        .collect();

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

pub fn ledger_stats(entries: &[LedgerEntry], now: DateTime<Local>) -> LedgerStats {
    let midnight = start_of_day(now);
    LedgerStats {
        total: entries.len(),
        today: entries.iter().filter(|e| e.timestamp >= midnight).count(),
        payment_total: entries
            .iter()
            .filter(|e| e.action.is_payment())
            .map(|e| e.amount)
            .sum(),
    }
}

// ---------------------------------------------------------------------------
// Revert
// ---------------------------------------------------------------------------

fn revert_payment(state: &mut PosState, payment_id: Uuid) -> PosResult<()> {
    let idx = state
        .payments
        .iter()
        .position(|p| p.id == payment_id)
        .ok_or_else(|| PosError::RevertTargetNotFound(format!("payment {payment_id}")))?;
    let payment = state.payments.remove(idx);

    let table = state.table_by_number_mut(payment.table_number)?;
    table.current_bill += payment.bill_reduction.unwrap_or(payment.total_amount);
    table.occupied = true;

    // Only the lines this payment settled; earlier tabs stay paid
    for item in state
        .orders
        .iter_mut()
        .flat_map(|o| o.order_items.iter_mut())
        .filter(|item| payment.paid_items.contains(&item.id))
    {
        item.is_paid = false;
    }
    Ok(())
}

fn revert_order(state: &mut PosState, order_id: Uuid) -> PosResult<()> {
    let idx = state
        .orders
        .iter()
        .position(|o| o.id == order_id)
        .ok_or_else(|| PosError::RevertTargetNotFound(format!("order {order_id}")))?;
    let order = state.orders.remove(idx);

    StockPlan::for_items(state, &order.order_items).restore(state);
    // Lines already paid are no longer on the bill
    state
        .table_by_number_mut(order.table_number)?
        .reduce_bill(sum_prices(order.unpaid_items()));
    Ok(())
}

fn revert_waste(state: &mut PosState, waste_id: Uuid) -> PosResult<()> {
    let idx = state
        .wastes
        .iter()
        .position(|w| w.id == waste_id)
        .ok_or_else(|| PosError::RevertTargetNotFound(format!("waste {waste_id}")))?;
    let waste = state.wastes.remove(idx);

    let (timestamp, time) = stamp();
    state.orders.push(Order {
        id: Uuid::new_v4(),
        table_number: waste.table_number,
        order_items: vec![OrderItem::new(&waste.name, waste.price)],
        status: OrderStatus::Preparing,
        time,
        timestamp,
        total_amount: waste.price,
        is_transfer: false,
        transfer_from: None,
        transfer_to: None,
        order_note: None,
    });
    state
        .table_by_number_mut(waste.table_number)?
        .open_bill(waste.price);

    // Undo the unit handed back when the item was cancelled
    if waste.kind == WasteKind::Delete {
        if let Some(row) = state.inventory_by_name_mut(&waste.name) {
            row.current_stock = (row.current_stock - 1).max(0);
        }
    }

    let mut emptied = Vec::new();
    for transaction in state.transactions.iter_mut() {
        let before = transaction.wastes.len();
        transaction.wastes.retain(|w| w.id != waste_id);
        if transaction.wastes.len() != before {
            transaction.amount = (transaction.amount - waste.price).max(0.0);
            if transaction.wastes.is_empty() {
                emptied.push(transaction.id);
            }
        }
    }
    state.transactions.retain(|t| !emptied.contains(&t.id));
    Ok(())
}

fn revert_entry(state: &mut PosState, target: EntryRef) -> PosResult<()> {
    match target {
        EntryRef::Payment(id) => revert_payment(state, id)?,
        EntryRef::Order(id) => revert_order(state, id)?,
        EntryRef::Waste(id) => revert_waste(state, id)?,
    }
    state.transactions.retain(|t| t.subject != Some(target));
    Ok(())
}

impl Pos {
    pub fn ledger(&self, filter: &LedgerFilter) -> Vec<LedgerEntry> {
        ledger_entries(self.state(), filter, Local::now())
    }

    pub fn ledger_stats(&self, filter: &LedgerFilter) -> LedgerStats {
        let now = Local::now();
        ledger_stats(&ledger_entries(self.state(), filter, now), now)
    }

    /// Inverts one ledger entry in a single step.
    pub fn revert(&mut self, target: EntryRef) -> PosResult<()> {
        self.commit(|state| revert_entry(state, target))?;
        info!(?target, "Ledger entry reverted");
        Ok(())
    }

    /// Reverts a logged transaction: every waste it carries, or its subject.
    pub fn revert_transaction(&mut self, transaction_id: Uuid) -> PosResult<()> {
        self.commit(|state| {
            let transaction = state
                .transactions
                .iter()
                .find(|t| t.id == transaction_id)
                .cloned()
                .ok_or_else(|| {
                    PosError::RevertTargetNotFound(format!("transaction {transaction_id}"))
                })?;

            if !transaction.wastes.is_empty() {
                for waste in &transaction.wastes {
                    revert_entry(state, EntryRef::Waste(waste.id))?;
                }
            } else {
                let subject = transaction.subject.ok_or_else(|| {
                    PosError::RevertTargetNotFound(format!(
                        "transaction {transaction_id} has nothing to revert"
                    ))
                })?;
                revert_entry(state, subject)?;
            }

            state.transactions.retain(|t| t.id != transaction_id);
            Ok(())
        })?;

        info!(%transaction_id, "Transaction reverted");
        Ok(())
    }

    /// Logged transactions of the given kind, newest first.
    pub fn transactions_of(&self, kind: TransactionKind) -> Vec<&Transaction> {
        self.state().transactions.iter().filter(|t| t.kind == kind).collect()
    }
}
