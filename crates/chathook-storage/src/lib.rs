// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - DbEventStore: implements EventStore for deduplicated event persistence
// - DbTurnStore: implements TurnStore for conversation history

pub mod event_store;
pub mod models;
pub mod repositories;
pub mod turn_store;

pub use event_store::DbEventStore;
pub use models::*;
pub use repositories::Database;
pub use turn_store::DbTurnStore;
