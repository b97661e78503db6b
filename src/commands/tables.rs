use tracing::info;

use crate::error::{PosError, PosResult};
use crate::models::{is_zero, Position, Table, TableShape};
use crate::pos::Pos;
use crate::state::PosState;

const NEW_TABLE_POSITION: Position = Position { x: 400.0, y: 300.0 };

fn top_z_index(state: &PosState) -> u32 {
    state.tables.iter().filter_map(|t| t.z_index).max().unwrap_or(0) + 1
}

/// Next unused table number. Numbers still referenced by orders, payments,
/// wastes or transactions of removed tables are never handed out again.
fn next_table_number(state: &PosState) -> u32 {
    let used = state
        .tables
        .iter()
        .map(|t| t.number)
        .chain(state.orders.iter().flat_map(|o| {
            [Some(o.table_number), o.transfer_from, o.transfer_to]
                .into_iter()
                .flatten()
        }))
        .chain(state.payments.iter().map(|p| p.table_number))
        .chain(state.wastes.iter().map(|w| w.table_number))
        .chain(state.transactions.iter().map(|t| t.table_number));
    used.max().unwrap_or(0) + 1
}

fn non_empty(value: &str, what: &str) -> PosResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PosError::Validation(format!("{what} cannot be empty")));
    }
    Ok(value.to_string())
}

impl Pos {
    /// Adds a table on top of the floor plan. It takes the next table number so
    /// orders and payments can address it.
    pub fn add_table(&mut self, name: &str, shape: TableShape) -> PosResult<Table> {
        let name = non_empty(name, "table name")?;

        let table = self.commit(|state| {
            let number = next_table_number(state);
            let mut table = Table::new(
                &format!("table-{number}"),
                number,
                &name,
                shape,
                NEW_TABLE_POSITION,
            );
            table.z_index = Some(top_z_index(state));
            state.tables.push(table.clone());
            Ok(table)
        })?;

        info!(table = %table.id, number = table.number, "Table added");
        Ok(table)
    }

    pub fn remove_table(&mut self, table_id: &str) -> PosResult<()> {
        self.commit(|state| {
            let table = state.table(table_id)?;
            if table.occupied || !is_zero(table.current_bill) {
                return Err(PosError::TableInUse(table_id.to_string()));
            }
            state.tables.retain(|t| t.id != table_id);
            Ok(())
        })?;

        info!(table = %table_id, "Table removed");
        Ok(())
    }

    pub fn rename_table(&mut self, table_id: &str, name: &str) -> PosResult<Table> {
        let name = non_empty(name, "table name")?;
        self.commit(|state| {
            let table = state.table_mut(table_id)?;
            table.name = name;
            Ok(table.clone())
        })
    }

    /// Empty tables become reserved, reserved tables become free again. Tables
    /// with an open bill cannot be toggled.
    pub fn toggle_reservation(&mut self, table_id: &str) -> PosResult<Table> {
        let table = self.commit(|state| {
            let table = state.table_mut(table_id)?;
            if !is_zero(table.current_bill) {
                return Err(PosError::TableInUse(table_id.to_string()));
            }
            if table.reserved {
                table.reserved = false;
                table.occupied = false;
            } else {
                table.reserved = true;
                table.occupied = true;
            }
            Ok(table.clone())
        })?;

        info!(table = %table_id, reserved = table.reserved, "Reservation toggled");
        Ok(table)
    }

    pub fn set_guests(&mut self, table_id: &str, guests: Option<u32>) -> PosResult<Table> {
        self.commit(|state| {
            let table = state.table_mut(table_id)?;
            table.guests = guests.filter(|g| *g > 0);
            Ok(table.clone())
        })
    }

    pub fn move_table(&mut self, table_id: &str, position: Position) -> PosResult<Table> {
        self.commit(|state| {
            let table = state.table_mut(table_id)?;
            table.position = position;
            Ok(table.clone())
        })
    }

    pub fn bring_to_front(&mut self, table_id: &str) -> PosResult<Table> {
        self.commit(|state| {
            let z = top_z_index(state);
            let table = state.table_mut(table_id)?;
            table.z_index = Some(z);
            Ok(table.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartLine;

    #[test]
    fn test_add_table_extends_numbering() {
        let mut pos = Pos::open_in_memory().unwrap();

        let table = pos.add_table("  Teras 1 ", TableShape::Square).unwrap();

        assert_eq!(table.number, 16);
        assert_eq!(table.name, "Teras 1");
        assert_eq!(table.z_index, Some(1));
        assert_eq!(pos.table_number(&table.id).unwrap(), 16);
        assert_eq!(pos.table_id(16).unwrap(), table.id);

        pos.place_order(&table.id, &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();
        assert_eq!(pos.state().orders[0].table_number, 16);
    }

    #[test]
    fn test_new_table_never_reuses_removed_number() {
        let mut pos = Pos::open_in_memory().unwrap();
        pos.place_order("duvar3", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();
        pos.pay_full("duvar3", crate::commands::payments::Tender::cash(45.0), 0.0)
            .unwrap();

        pos.remove_table("duvar3").unwrap();
        let table = pos.add_table("Teras", TableShape::Round).unwrap();

        assert_eq!(table.number, 16);
        assert_eq!(table.id, "table-16");
        assert!(pos.orders_for_table(&table.id).unwrap().is_empty());

        // Nothing refers to 16 yet, so it is free again
        pos.remove_table(&table.id).unwrap();
        assert_eq!(pos.add_table("Bahçe", TableShape::Square).unwrap().number, 16);
    }

    #[test]
    fn test_add_table_requires_name() {
        let mut pos = Pos::open_in_memory().unwrap();
        assert!(matches!(
            pos.add_table("   ", TableShape::Round),
            Err(PosError::Validation(_))
        ));
    }

    #[test]
    fn test_remove_table_refused_while_in_use() {
        let mut pos = Pos::open_in_memory().unwrap();
        pos.place_order("bar1", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();
        pos.toggle_reservation("bar2").unwrap();

        assert!(matches!(pos.remove_table("bar1"), Err(PosError::TableInUse(_))));
        assert!(matches!(pos.remove_table("bar2"), Err(PosError::TableInUse(_))));

        pos.remove_table("bar3").unwrap();
        assert!(matches!(pos.table("bar3"), Err(PosError::TableNotFound(_))));
        assert_eq!(pos.state().tables.len(), 14);
    }

    #[test]
    fn test_toggle_reservation_cycle() {
        let mut pos = Pos::open_in_memory().unwrap();

        let reserved = pos.toggle_reservation("orta1").unwrap();
        assert!(reserved.reserved && reserved.occupied);

        let free = pos.toggle_reservation("orta1").unwrap();
        assert!(!free.reserved && !free.occupied);

        pos.place_order("orta1", &[CartLine::new("TUBORG", 45.0, 1)], None).unwrap();
        assert!(matches!(pos.toggle_reservation("orta1"), Err(PosError::TableInUse(_))));
    }

    #[test]
    fn test_bring_to_front_and_guests() {
        let mut pos = Pos::open_in_memory().unwrap();
        pos.bring_to_front("bar1").unwrap();
        let top = pos.bring_to_front("bar2").unwrap();
        assert_eq!(top.z_index, Some(2));

        assert_eq!(pos.set_guests("bar1", Some(4)).unwrap().guests, Some(4));
        assert_eq!(pos.set_guests("bar1", Some(0)).unwrap().guests, None);

        let moved = pos.move_table("bar1", Position { x: 10.0, y: 20.0 }).unwrap();
        assert_eq!(moved.position, Position { x: 10.0, y: 20.0 });
        assert_eq!(pos.rename_table("bar1", "Bar Köşe").unwrap().name, "Bar Köşe");
    }
}
