pub mod api;
pub mod deposit;
pub mod ledger;
