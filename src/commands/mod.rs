pub mod backup;
pub mod categories;
pub mod ledger;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reports;
pub mod tables;
