pub mod activity;
pub mod alerts;
pub mod api_keys;
pub mod health;
pub mod inventory;
pub mod restocks;
pub mod roles;
pub mod schedules;
pub mod scopes;
pub mod shifts;
pub mod users;
