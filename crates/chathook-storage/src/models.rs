// Database models (internal, may differ from core types)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use chathook_core::{ContentPart, StoredEvent, Turn, TurnRole};

// ============================================
// Event models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: String,
    pub kind: String,
    pub action: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub actor: Option<String>,
    pub payload: sqlx::types::Json<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        StoredEvent {
            id: row.id,
            kind: row.kind,
            action: row.action,
            title: row.title,
            description: row.description,
            url: row.url,
            actor: row.actor,
            payload: row.payload.0,
            occurred_at: row.occurred_at,
            received_at: row.received_at,
        }
    }
}

// ============================================
// Turn models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct TurnRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sequence: i64,
    pub role: String,
    pub content: sqlx::types::Json<Vec<ContentPart>>,
    pub created_at: DateTime<Utc>,
}

impl From<TurnRow> for Turn {
    fn from(row: TurnRow) -> Self {
        Turn {
            id: row.id,
            role: TurnRole::from(row.role.as_str()),
            content: row.content.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTurnRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: String,
    pub content: Vec<ContentPart>,
    pub created_at: DateTime<Utc>,
}

impl CreateTurnRow {
    pub fn from_turn(session_id: Uuid, turn: &Turn) -> Self {
        Self {
            id: turn.id,
            session_id,
            role: turn.role.to_string(),
            content: turn.content.clone(),
            created_at: turn.created_at,
        }
    }
}
