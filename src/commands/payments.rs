use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::commands::orders::log_transaction;
use crate::error::{PosError, PosResult};
use crate::models::{is_zero, EntryRef, Payment, TransactionKind, MONEY_EPSILON};
use crate::pos::{stamp, Pos};
use crate::state::PosState;

pub const MIN_SPLIT_PERSONS: u32 = 2;
pub const MAX_SPLIT_PERSONS: u32 = 6;

/// Cash and card parts of one payment.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Tender {
    pub cash: f64,
    pub card: f64,
}

impl Tender {
    pub fn new(cash: f64, card: f64) -> Self {
        Tender { cash, card }
    }

    pub fn cash(amount: f64) -> Self {
        Tender::new(amount, 0.0)
    }

    pub fn card(amount: f64) -> Self {
        Tender::new(0.0, amount)
    }

    pub fn total(&self) -> f64 {
        self.cash + self.card
    }

    fn validate(&self) -> PosResult<()> {
        if self.cash < 0.0 || self.card < 0.0 || !self.total().is_finite() {
            return Err(PosError::Validation("tender amounts must be non-negative".into()));
        }
        Ok(())
    }
}

impl std::ops::Add for Tender {
    type Output = Tender;

    fn add(self, other: Tender) -> Tender {
        Tender::new(self.cash + other.cash, self.card + other.card)
    }
}

/// What the payment screen shows before money changes hands.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuote {
    pub current_bill: f64,
    pub unpaid_total: f64,
    pub selected_total: f64,
    /// Selected total (or unpaid total without a selection), capped at the bill.
    pub effective_total: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
    pub amount_due: f64,
}

fn validate_discount(discount_percent: f64) -> PosResult<f64> {
    if !(0.0..=100.0).contains(&discount_percent) {
        return Err(PosError::Validation(format!(
            "discount must be between 0 and 100, got {discount_percent}"
        )));
    }
    Ok(discount_percent)
}

fn build_quote(
    state: &PosState,
    table_id: &str,
    selection: &[Uuid],
    discount_percent: f64,
) -> PosResult<PaymentQuote> {
    let discount_percent = validate_discount(discount_percent)?;
    let table = state.table(table_id)?;
    let unpaid = state.unpaid_items(table.number);

    if let Some(missing) = selection.iter().find(|id| !unpaid.iter().any(|item| item.id == **id)) {
        return Err(PosError::ItemNotFound(*missing));
    }

    let unpaid_total: f64 = unpaid.iter().map(|item| item.price).sum();
    let selected_total: f64 = unpaid
        .iter()
        .filter(|item| selection.contains(&item.id))
        .map(|item| item.price)
        .sum();

    let base = if selection.is_empty() { unpaid_total } else { selected_total };
    let effective_total = base.min(table.current_bill);
    let discount_amount = effective_total * discount_percent / 100.0;

    Ok(PaymentQuote {
        current_bill: table.current_bill,
        unpaid_total,
        selected_total,
        effective_total,
        discount_percent,
        discount_amount,
        amount_due: effective_total - discount_amount,
    })
}

fn check_not_exceeding(paid: f64, balance: f64) -> PosResult<()> {
    if paid > balance + MONEY_EPSILON {
        return Err(PosError::PaymentExceedsBalance {
            paid,
            balance,
            overage: paid - balance,
        });
    }
    Ok(())
}

fn check_covers(paid: f64, required: f64) -> PosResult<()> {
    if paid + MONEY_EPSILON < required {
        return Err(PosError::PaymentBelowRequired { paid, required });
    }
    Ok(())
}

/// Marks the table's unpaid items in `selection` paid, or all of them when
/// `selection` is `None`. Returns the ids that changed.
fn mark_paid(state: &mut PosState, table_number: u32, selection: Option<&[Uuid]>) -> Vec<Uuid> {
    let mut marked = Vec::new();
    for order in state.orders.iter_mut().filter(|o| o.table_number == table_number) {
        for item in order.order_items.iter_mut().filter(|item| !item.is_paid) {
            if selection.map_or(true, |ids| ids.contains(&item.id)) {
                item.is_paid = true;
                marked.push(item.id);
            }
        }
    }
    marked
}

fn new_payment(
    table_id: &str,
    table_number: u32,
    total_amount: f64,
    tender: Tender,
    is_partial: bool,
    discount_percent: f64,
) -> Payment {
    let (timestamp, time) = stamp();
    Payment {
        id: Uuid::new_v4(),
        table_number,
        table_id: table_id.to_string(),
        total_amount,
        cash_amount: tender.cash,
        card_amount: tender.card,
        is_partial,
        discount_percent,
        timestamp,
        time,
        paid_items: Vec::new(),
        bill_reduction: None,
    }
}

/// Stores the payment and logs its transaction.
fn record_payment(state: &mut PosState, payment: Payment) -> Payment {
    state.payments.push(payment.clone());
    let table_number = payment.table_number;

    let description = if payment.is_partial {
        format!("Ara Ödeme - Masa {table_number}")
    } else {
        format!("Ödeme - Masa {table_number}")
    };
    log_transaction(
        state,
        TransactionKind::Payment,
        table_number,
        payment.total_amount,
        description,
        format!(
            "Nakit: ₺{:.2}, Kart: ₺{:.2}",
            payment.cash_amount, payment.card_amount
        ),
        Some(EntryRef::Payment(payment.id)),
        Vec::new(),
    );

    payment
}

/// Closes the whole tab: every item paid, table vacated, one non-partial payment
/// for the full bill.
fn settle(
    state: &mut PosState,
    table_id: &str,
    tender: Tender,
    discount_percent: f64,
) -> PosResult<Payment> {
    let table = state.table_mut(table_id)?;
    let number = table.number;
    let bill = table.current_bill;
    table.vacate();

    let mut payment = new_payment(table_id, number, bill, tender, false, discount_percent);
    payment.paid_items = mark_paid(state, number, None);
    Ok(record_payment(state, payment))
}

/// Split-bill progress for one table. Shares are collected person by person;
/// nothing is committed until the last person covers the remainder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SplitSession {
    pub table_id: String,
    pub bill: f64,
    pub persons: u32,
    pub collected: Vec<Tender>,
}

impl SplitSession {
    /// Suggested share for each person.
    pub fn per_person(&self) -> f64 {
        self.bill / self.persons as f64
    }

    /// 1-based number of the person paying next.
    pub fn current_person(&self) -> u32 {
        self.collected.len() as u32 + 1
    }

    pub fn is_last_person(&self) -> bool {
        self.current_person() == self.persons
    }

    pub fn is_complete(&self) -> bool {
        self.collected.len() as u32 >= self.persons
    }

    pub fn collected_total(&self) -> f64 {
        self.collected.iter().map(Tender::total).sum()
    }

    pub fn remaining(&self) -> f64 {
        self.bill - self.collected_total()
    }

    fn aggregate(&self) -> Tender {
        self.collected.iter().copied().fold(Tender::default(), |acc, t| acc + t)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum SplitProgress {
    NextPerson { person: u32, remaining: f64 },
    Settled { payment: Payment },
}

impl Pos {
    pub fn quote(
        &self,
        table_id: &str,
        selection: &[Uuid],
        discount_percent: f64,
    ) -> PosResult<PaymentQuote> {
        build_quote(self.state(), table_id, selection, discount_percent)
    }

    /// Settles the table in one go. The tender must cover the discounted amount
    /// due and may not exceed the open bill.
    pub fn pay_full(
        &mut self,
        table_id: &str,
        tender: Tender,
        discount_percent: f64,
    ) -> PosResult<Payment> {
        tender.validate()?;

        let payment = self.commit(|state| {
            let quote = build_quote(state, table_id, &[], discount_percent)?;
            if is_zero(quote.current_bill) {
                return Err(PosError::Validation(format!("table {table_id} has no open bill")));
            }
            check_not_exceeding(tender.total(), quote.current_bill)?;
            check_covers(tender.total(), quote.amount_due)?;

            settle(state, table_id, tender, quote.discount_percent)
        })?;

        info!(
            payment_id = %payment.id,
            table = %table_id,
            total = %payment.total_amount,
            cash = %payment.cash_amount,
            card = %payment.card_amount,
            "Full payment recorded"
        );
        Ok(payment)
    }

    /// Takes a partial payment. Without a selection it is a plain amount off the
    /// bill and must stay below the amount due; with a selection the listed items
    /// are marked paid and the tender must cover their discounted total.
    pub fn pay_partial(
        &mut self,
        table_id: &str,
        tender: Tender,
        selection: &[Uuid],
        discount_percent: f64,
    ) -> PosResult<Payment> {
        tender.validate()?;
        let paid = tender.total();

        let payment = self.commit(|state| {
            let quote = build_quote(state, table_id, selection, discount_percent)?;
            check_not_exceeding(paid, quote.current_bill)?;
            let number = state.table_number(table_id)?;
            let mut paid_items = Vec::new();

            if selection.is_empty() {
                if paid <= 0.0 || paid + MONEY_EPSILON >= quote.amount_due {
                    return Err(PosError::Validation(format!(
                        "partial payment must be above 0 and below {:.2}",
                        quote.amount_due
                    )));
                }
                state.table_mut(table_id)?.reduce_bill(paid);
            } else {
                check_covers(paid, quote.amount_due)?;
                paid_items = mark_paid(state, number, Some(selection));

                let nothing_left = state.unpaid_items(number).is_empty();
                let table = state.table_mut(table_id)?;
                table.reduce_bill(paid);
                if nothing_left {
                    table.vacate();
                }
            }

            if is_zero(state.table(table_id)?.current_bill) {
                paid_items.extend(mark_paid(state, number, None));
            }

            let mut payment =
                new_payment(table_id, number, paid, tender, true, quote.discount_percent);
            let taken = quote.current_bill - state.table(table_id)?.current_bill;
            if (taken - paid).abs() >= MONEY_EPSILON {
                payment.bill_reduction = Some(taken);
            }
            payment.paid_items = paid_items;
            Ok(record_payment(state, payment))
        })?;

        info!(
            payment_id = %payment.id,
            table = %table_id,
            amount = %payment.total_amount,
            items = selection.len(),
            "Partial payment recorded"
        );
        Ok(payment)
    }

    pub fn start_split(&self, table_id: &str, persons: u32) -> PosResult<SplitSession> {
        if !(MIN_SPLIT_PERSONS..=MAX_SPLIT_PERSONS).contains(&persons) {
            return Err(PosError::Validation(format!(
                "split needs {MIN_SPLIT_PERSONS} to {MAX_SPLIT_PERSONS} persons, got {persons}"
            )));
        }
        let bill = self.table(table_id)?.current_bill;
        if is_zero(bill) {
            return Err(PosError::Validation(format!("table {table_id} has no open bill")));
        }

        Ok(SplitSession {
            table_id: table_id.to_string(),
            bill,
            persons,
            collected: Vec::new(),
        })
    }

    /// Collects the current person's share. Anyone but the last person may pay
    /// any positive amount; the last person must cover what is left, after which
    /// the table is settled with the aggregate cash and card.
    pub fn pay_split_share(
        &mut self,
        session: &mut SplitSession,
        tender: Tender,
    ) -> PosResult<SplitProgress> {
        tender.validate()?;
        if session.is_complete() {
            return Err(PosError::Validation("split payment already settled".into()));
        }

        let bill = self.table(&session.table_id)?.current_bill;
        if (bill - session.bill).abs() >= MONEY_EPSILON {
            return Err(PosError::Validation(format!(
                "bill changed from {:.2} to {:.2} during split payment",
                session.bill, bill
            )));
        }

        let paid = tender.total();
        if !session.is_last_person() {
            if paid <= 0.0 {
                return Err(PosError::Validation("share must be above 0".into()));
            }
            session.collected.push(tender);
            info!(
                table = %session.table_id,
                person = session.collected.len(),
                paid = %paid,
                "Split share collected"
            );
            return Ok(SplitProgress::NextPerson {
                person: session.current_person(),
                remaining: session.remaining(),
            });
        }

        check_covers(paid, session.remaining())?;

        let total = session.aggregate() + tender;
        let table_id = session.table_id.clone();
        let payment = self.commit(|state| settle(state, &table_id, total, 0.0))?;
        session.collected.push(tender);

        info!(
            payment_id = %payment.id,
            table = %table_id,
            persons = session.persons,
            cash = %total.cash,
            card = %total.card,
            "Split payment settled"
        );
        Ok(SplitProgress::Settled { payment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartLine;

    fn pos_with_efes(quantity: u32) -> (Pos, Vec<Uuid>) {
        let mut pos = Pos::open_in_memory().unwrap();
        let order = pos
            .place_order("bar1", &[CartLine::new("EFES PİLSEN", 45.0, quantity)], None)
            .unwrap();
        let ids = order.order_items.iter().map(|i| i.id).collect();
        (pos, ids)
    }

    #[test]
    fn test_full_payment_vacates_table() {
        let (mut pos, _) = pos_with_efes(2);

        let payment = pos.pay_full("bar1", Tender::new(50.0, 40.0), 0.0).unwrap();

        assert!(!payment.is_partial);
        assert_eq!(payment.total_amount, 90.0);
        assert_eq!(payment.cash_amount, 50.0);
        assert_eq!(payment.card_amount, 40.0);
        let table = pos.table("bar1").unwrap();
        assert_eq!(table.current_bill, 0.0);
        assert!(!table.occupied);
        assert!(pos.unpaid_items("bar1").unwrap().is_empty());
        assert_eq!(pos.state().transactions[0].subject, Some(EntryRef::Payment(payment.id)));
    }

    #[test]
    fn test_full_payment_bounds() {
        let (mut pos, _) = pos_with_efes(2);

        let err = pos.pay_full("bar1", Tender::cash(100.0), 0.0).unwrap_err();
        assert!(matches!(err, PosError::PaymentExceedsBalance { overage, .. } if overage == 10.0));

        let err = pos.pay_full("bar1", Tender::card(80.0), 0.0).unwrap_err();
        assert!(matches!(err, PosError::PaymentBelowRequired { required, .. } if required == 90.0));

        assert_eq!(pos.table("bar1").unwrap().current_bill, 90.0);
        assert!(pos.state().payments.is_empty());
    }

    #[test]
    fn test_full_payment_with_discount() {
        let (mut pos, _) = pos_with_efes(2);

        let payment = pos.pay_full("bar1", Tender::cash(81.0), 10.0).unwrap();

        assert_eq!(payment.total_amount, 90.0);
        assert_eq!(payment.discount_percent, 10.0);
        assert!(!pos.table("bar1").unwrap().occupied);
    }

    #[test]
    fn test_full_payment_needs_open_bill() {
        let mut pos = Pos::open_in_memory().unwrap();
        assert!(matches!(
            pos.pay_full("bar1", Tender::cash(0.0), 0.0),
            Err(PosError::Validation(_))
        ));
    }

    #[test]
    fn test_discount_range() {
        let (pos, _) = pos_with_efes(1);
        assert!(matches!(pos.quote("bar1", &[], 101.0), Err(PosError::Validation(_))));
        assert!(matches!(pos.quote("bar1", &[], -1.0), Err(PosError::Validation(_))));
        assert_eq!(pos.quote("bar1", &[], 100.0).unwrap().amount_due, 0.0);
    }

    #[test]
    fn test_quote_selection() {
        let (pos, ids) = pos_with_efes(3);

        let quote = pos.quote("bar1", &ids[..2], 20.0).unwrap();
        assert_eq!(quote.unpaid_total, 135.0);
        assert_eq!(quote.selected_total, 90.0);
        assert_eq!(quote.effective_total, 90.0);
        assert_eq!(quote.discount_amount, 18.0);
        assert_eq!(quote.amount_due, 72.0);

        assert!(matches!(
            pos.quote("bar1", &[Uuid::new_v4()], 0.0),
            Err(PosError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_amount_partial_payment() {
        let (mut pos, _) = pos_with_efes(2);

        let payment = pos.pay_partial("bar1", Tender::cash(30.0), &[], 0.0).unwrap();

        assert!(payment.is_partial);
        assert_eq!(payment.total_amount, 30.0);
        let table = pos.table("bar1").unwrap();
        assert_eq!(table.current_bill, 60.0);
        assert!(table.occupied);
        assert_eq!(pos.unpaid_items("bar1").unwrap().len(), 2);
    }

    #[test]
    fn test_amount_partial_must_stay_below_due() {
        let (mut pos, _) = pos_with_efes(2);

        assert!(matches!(
            pos.pay_partial("bar1", Tender::cash(90.0), &[], 0.0),
            Err(PosError::Validation(_))
        ));
        assert!(matches!(
            pos.pay_partial("bar1", Tender::cash(0.0), &[], 0.0),
            Err(PosError::Validation(_))
        ));
        assert!(matches!(
            pos.pay_partial("bar1", Tender::cash(95.0), &[], 0.0),
            Err(PosError::PaymentExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_item_partial_marks_selected_items() {
        let (mut pos, ids) = pos_with_efes(3);

        pos.pay_partial("bar1", Tender::card(45.0), &ids[..1], 0.0).unwrap();

        let unpaid = pos.unpaid_items("bar1").unwrap();
        assert_eq!(unpaid.len(), 2);
        assert!(unpaid.iter().all(|item| item.id != ids[0]));
        assert_eq!(pos.table("bar1").unwrap().current_bill, 90.0);
    }

    #[test]
    fn test_item_partial_overpay_reduces_bill_by_paid() {
        let (mut pos, ids) = pos_with_efes(3);

        pos.pay_partial("bar1", Tender::cash(50.0), &ids[..1], 0.0).unwrap();

        assert_eq!(pos.table("bar1").unwrap().current_bill, 85.0);
    }

    #[test]
    fn test_item_partial_below_discounted_total() {
        let (mut pos, ids) = pos_with_efes(2);

        let err = pos.pay_partial("bar1", Tender::cash(40.0), &ids[..1], 0.0).unwrap_err();
        assert!(matches!(err, PosError::PaymentBelowRequired { .. }));

        pos.pay_partial("bar1", Tender::cash(40.5), &ids[..1], 10.0).unwrap();
    }

    #[test]
    fn test_item_partial_paying_last_items_closes_table() {
        let (mut pos, ids) = pos_with_efes(2);

        pos.pay_partial("bar1", Tender::cash(72.0), &ids, 20.0).unwrap();

        let table = pos.table("bar1").unwrap();
        assert_eq!(table.current_bill, 0.0);
        assert!(!table.occupied);
        assert!(pos.unpaid_items("bar1").unwrap().is_empty());
    }

    #[test]
    fn test_split_payment_sequence() {
        let (mut pos, _) = pos_with_efes(2);

        let mut session = pos.start_split("bar1", 3).unwrap();
        assert_eq!(session.per_person(), 30.0);

        let progress = pos.pay_split_share(&mut session, Tender::cash(20.0)).unwrap();
        assert_eq!(progress, SplitProgress::NextPerson { person: 2, remaining: 70.0 });

        pos.pay_split_share(&mut session, Tender::card(40.0)).unwrap();

        let err = pos.pay_split_share(&mut session, Tender::cash(29.0)).unwrap_err();
        assert!(matches!(err, PosError::PaymentBelowRequired { required, .. } if required == 30.0));
        assert!(pos.table("bar1").unwrap().occupied);

        let payment = match pos.pay_split_share(&mut session, Tender::new(10.0, 20.0)).unwrap() {
            SplitProgress::Settled { payment } => payment,
            other => panic!("expected settlement, got {other:?}"),
        };
        assert_eq!(payment.cash_amount, 30.0);
        assert_eq!(payment.card_amount, 60.0);
        assert_eq!(payment.total_amount, 90.0);
        assert!(!payment.is_partial);
        assert!(session.is_complete());

        let table = pos.table("bar1").unwrap();
        assert_eq!(table.current_bill, 0.0);
        assert!(!table.occupied);
        assert!(matches!(
            pos.pay_split_share(&mut session, Tender::cash(1.0)),
            Err(PosError::Validation(_))
        ));
    }

    #[test]
    fn test_split_last_person_may_overpay() {
        let (mut pos, _) = pos_with_efes(2);
        let mut session = pos.start_split("bar1", 2).unwrap();

        pos.pay_split_share(&mut session, Tender::cash(45.0)).unwrap();
        let progress = pos.pay_split_share(&mut session, Tender::cash(50.0)).unwrap();

        assert!(matches!(progress, SplitProgress::Settled { ref payment } if payment.cash_amount == 95.0));
    }

    #[test]
    fn test_split_person_count_and_zero_share() {
        let (mut pos, _) = pos_with_efes(2);
        assert!(pos.start_split("bar1", 1).is_err());
        assert!(pos.start_split("bar1", 7).is_err());
        assert!(pos.start_split("bar2", 2).is_err());

        let mut session = pos.start_split("bar1", 2).unwrap();
        assert!(matches!(
            pos.pay_split_share(&mut session, Tender::default()),
            Err(PosError::Validation(_))
        ));
        assert_eq!(session.current_person(), 1);
    }

    #[test]
    fn test_split_detects_changed_bill() {
        let (mut pos, _) = pos_with_efes(2);
        let mut session = pos.start_split("bar1", 2).unwrap();

        pos.place_order("bar1", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();

        assert!(matches!(
            pos.pay_split_share(&mut session, Tender::cash(10.0)),
            Err(PosError::Validation(_))
        ));
    }
}
