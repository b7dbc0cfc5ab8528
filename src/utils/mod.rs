pub mod money;
pub mod tax_id;
