pub mod inventory;
pub mod removal;
