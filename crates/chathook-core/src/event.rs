// Inbound event types
//
// An Event is one persisted record of a processed inbound notification.
// Rows are created exactly once by the ingestion handler, never mutated,
// never deleted (retention is an external concern).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A stored inbound event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StoredEvent {
    /// Sender-supplied delivery identifier; unique across the table
    pub id: String,
    /// Notification kind (e.g., "push", "issue")
    pub kind: String,
    /// Notification action, when the sender distinguishes one
    pub action: Option<String>,
    /// Display title
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub actor: Option<String>,
    /// Opaque original body, retained for replay/debugging
    pub payload: serde_json::Value,
    /// Event time, used for display ordering
    pub occurred_at: DateTime<Utc>,
    /// When the store accepted the row
    pub received_at: DateTime<Utc>,
}

/// Input for inserting a new event row
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub id: String,
    pub kind: String,
    pub action: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub actor: Option<String>,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Display/audit fields derived from a payload by the processor
#[derive(Debug, Clone, Default)]
pub struct ProcessedEvent {
    pub action: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub actor: Option<String>,
    /// Event time; defaults to arrival time when the payload carries none
    pub occurred_at: Option<DateTime<Utc>>,
}
