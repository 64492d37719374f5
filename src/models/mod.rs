pub mod api_key;
pub mod inventory;
pub mod restock;
pub mod role;
pub mod schedule;
pub mod user;
