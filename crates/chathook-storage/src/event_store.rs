// Database-backed EventStore implementation

use async_trait::async_trait;

use chathook_core::{
    EventStore, InsertOutcome, NewEvent, PipelineError, Result, StoredEvent,
};

use crate::repositories::Database;

/// Database-backed event store
#[derive(Clone)]
pub struct DbEventStore {
    db: Database,
}

impl DbEventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for DbEventStore {
    async fn find(&self, id: &str) -> Result<Option<StoredEvent>> {
        let row = self
            .db
            .get_event(id)
            .await
            .map_err(|e| PipelineError::store(e.to_string()))?;
        Ok(row.map(StoredEvent::from))
    }

    async fn insert(&self, event: NewEvent) -> Result<InsertOutcome> {
        self.db
            .insert_event(event)
            .await
            .map_err(|e| PipelineError::store(e.to_string()))
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>> {
        let rows = self
            .db
            .list_events(limit as i64)
            .await
            .map_err(|e| PipelineError::store(e.to_string()))?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }
}
