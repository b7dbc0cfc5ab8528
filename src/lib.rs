//! PriveBank PIX deposits: AbacatePay charges, webhook ingress and
//! exactly-once wallet settlement.

pub mod app;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;
