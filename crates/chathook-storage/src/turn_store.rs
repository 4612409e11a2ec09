// Database-backed TurnStore implementation
//
// Turn.content is Vec<ContentPart> in both core and storage, so content
// passes through as JSONB without conversion.

use async_trait::async_trait;
use uuid::Uuid;

use chathook_core::{PipelineError, Result, Turn, TurnStore};

use crate::models::CreateTurnRow;
use crate::repositories::Database;

/// Database-backed turn store
#[derive(Clone)]
pub struct DbTurnStore {
    db: Database,
}

impl DbTurnStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TurnStore for DbTurnStore {
    async fn append(&self, session_id: Uuid, turn: Turn) -> Result<()> {
        self.db
            .create_turn(CreateTurnRow::from_turn(session_id, &turn))
            .await
            .map_err(|e| PipelineError::store(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Vec<Turn>> {
        let rows = self
            .db
            .list_turns(session_id)
            .await
            .map_err(|e| PipelineError::store(e.to_string()))?;
        Ok(rows.into_iter().map(Turn::from).collect())
    }

    async fn count(&self, session_id: Uuid) -> Result<usize> {
        let count = self
            .db
            .count_turns(session_id)
            .await
            .map_err(|e| PipelineError::store(e.to_string()))?;
        Ok(count as usize)
    }
}
