// Core traits for pluggable backends
//
// These traits let the pipeline run against different backends:
// - In-memory implementations for examples and testing
// - Postgres implementations (chathook-storage) for production

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::event::{NewEvent, ProcessedEvent, StoredEvent};
use crate::turn::Turn;

// ============================================================================
// EventStore - deduplicated inbound event persistence
// ============================================================================

/// Outcome of an event insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row was written
    Inserted,
    /// A row with this id already existed; nothing was written
    DuplicateId,
}

/// Append-only, primary-key-deduplicated store of processed events.
///
/// The id uniqueness constraint is the single source of truth for
/// at-most-once acceptance: `insert` must reject duplicate ids
/// atomically even under concurrent calls. `find` is an optimization
/// for the common redelivery case, not the correctness mechanism.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Look up an event by delivery id
    async fn find(&self, id: &str) -> Result<Option<StoredEvent>>;

    /// Insert a new event row; duplicate ids are a no-op
    async fn insert(&self, event: NewEvent) -> Result<InsertOutcome>;

    /// List stored events, newest first
    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>>;
}

// ============================================================================
// TurnStore - conversation history persistence
// ============================================================================

/// Store for conversation turns, ordered per session.
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Append a turn to a session's history
    async fn append(&self, session_id: Uuid, turn: Turn) -> Result<()>;

    /// Load a session's history in append order
    async fn load(&self, session_id: Uuid) -> Result<Vec<Turn>>;

    /// Count turns in a session
    async fn count(&self, session_id: Uuid) -> Result<usize> {
        Ok(self.load(session_id).await?.len())
    }
}

// ============================================================================
// PayloadProcessor - black-box processing of validated payloads
// ============================================================================

/// Payload-specific processing invoked by the ingestion handler after
/// dedup lookup and before persistence. May fail; a failure means the
/// event row is not written and the sender is expected to redeliver.
#[async_trait]
pub trait PayloadProcessor: Send + Sync {
    async fn process(&self, kind: &str, payload: &serde_json::Value) -> Result<ProcessedEvent>;
}

// Arc forwarding so trait objects can back the generic handler types

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    async fn find(&self, id: &str) -> Result<Option<StoredEvent>> {
        (**self).find(id).await
    }

    async fn insert(&self, event: NewEvent) -> Result<InsertOutcome> {
        (**self).insert(event).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>> {
        (**self).list(limit).await
    }
}

#[async_trait]
impl<T: TurnStore + ?Sized> TurnStore for std::sync::Arc<T> {
    async fn append(&self, session_id: Uuid, turn: Turn) -> Result<()> {
        (**self).append(session_id, turn).await
    }

    async fn load(&self, session_id: Uuid) -> Result<Vec<Turn>> {
        (**self).load(session_id).await
    }

    async fn count(&self, session_id: Uuid) -> Result<usize> {
        (**self).count(session_id).await
    }
}

#[async_trait]
impl<T: PayloadProcessor + ?Sized> PayloadProcessor for std::sync::Arc<T> {
    async fn process(&self, kind: &str, payload: &serde_json::Value) -> Result<ProcessedEvent> {
        (**self).process(kind, payload).await
    }
}
