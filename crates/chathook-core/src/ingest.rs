// Ingestion handler
//
// Orchestrates dedup lookup, payload processing, and persistence for
// one inbound webhook delivery. Signature verification happens at the
// HTTP boundary before this handler runs.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::Result;
use crate::event::NewEvent;
use crate::traits::{EventStore, InsertOutcome, PayloadProcessor};

/// Outcome of handling one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Event was processed and stored
    Processed,
    /// A delivery with this id was already accepted; no side effects
    AlreadyProcessed,
}

/// Handles one inbound webhook delivery end to end
pub struct IngestionHandler<S, P>
where
    S: EventStore,
    P: PayloadProcessor,
{
    store: S,
    processor: P,
}

impl<S, P> IngestionHandler<S, P>
where
    S: EventStore,
    P: PayloadProcessor,
{
    pub fn new(store: S, processor: P) -> Self {
        Self { store, processor }
    }

    /// Handle one delivery.
    ///
    /// The existence check short-circuits redeliveries cheaply; the
    /// store's id constraint settles concurrent races. If processing
    /// fails no row is written, so a retry with the same delivery id
    /// is reprocessed rather than skipped.
    pub async fn handle(
        &self,
        delivery_id: &str,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<IngestOutcome> {
        if self.store.find(delivery_id).await?.is_some() {
            debug!(delivery_id = %delivery_id, "Duplicate delivery, skipping");
            return Ok(IngestOutcome::AlreadyProcessed);
        }

        let processed = self.processor.process(kind, &payload).await?;

        let event = NewEvent {
            id: delivery_id.to_string(),
            kind: kind.to_string(),
            action: processed.action,
            title: processed.title,
            description: processed.description,
            url: processed.url,
            actor: processed.actor,
            payload,
            occurred_at: processed.occurred_at.unwrap_or_else(Utc::now),
        };

        match self.store.insert(event).await? {
            InsertOutcome::Inserted => {
                info!(delivery_id = %delivery_id, kind = %kind, "Event stored");
                Ok(IngestOutcome::Processed)
            }
            InsertOutcome::DuplicateId => {
                // Lost a race with a concurrent delivery of the same id
                debug!(delivery_id = %delivery_id, "Duplicate insert rejected by store");
                Ok(IngestOutcome::AlreadyProcessed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::memory::{FailingProcessor, InMemoryEventStore, RecordingProcessor};
    use serde_json::json;

    #[tokio::test]
    async fn first_delivery_is_processed_and_stored() {
        let store = InMemoryEventStore::new();
        let handler = IngestionHandler::new(store.clone(), RecordingProcessor::new());

        let outcome = handler
            .handle("abc123", "push", json!({"ref": "main"}))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Processed);
        let stored = store.find("abc123").await.unwrap().unwrap();
        assert_eq!(stored.kind, "push");
    }

    #[tokio::test]
    async fn second_delivery_is_idempotent() {
        let store = InMemoryEventStore::new();
        let processor = RecordingProcessor::new();
        let handler = IngestionHandler::new(store.clone(), processor.clone());

        let payload = json!({"ref": "main"});
        let first = handler.handle("abc123", "push", payload.clone()).await.unwrap();
        let second = handler.handle("abc123", "push", payload).await.unwrap();

        assert_eq!(first, IngestOutcome::Processed);
        assert_eq!(second, IngestOutcome::AlreadyProcessed);
        assert_eq!(store.len().await, 1);
        // The processor must not run for the duplicate
        assert_eq!(processor.call_count().await, 1);
    }

    #[tokio::test]
    async fn processing_failure_writes_no_row_and_retry_succeeds() {
        let store = InMemoryEventStore::new();

        {
            let handler = IngestionHandler::new(store.clone(), FailingProcessor::new("parse error"));
            let err = handler
                .handle("evt-1", "push", json!({}))
                .await
                .unwrap_err();
            assert!(matches!(err, PipelineError::PayloadProcessing(_)));
        }

        // No partial failure recorded as success
        assert_eq!(store.len().await, 0);

        // Redelivery with the same id is reprocessed, not skipped
        let handler = IngestionHandler::new(store.clone(), RecordingProcessor::new());
        let outcome = handler.handle("evt-1", "push", json!({})).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Processed);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_deliveries_store_exactly_one_row() {
        let store = InMemoryEventStore::new();
        let payload = json!({"n": 1});

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let payload = payload.clone();
            handles.push(tokio::spawn(async move {
                let handler = IngestionHandler::new(store, RecordingProcessor::new());
                handler.handle("race-1", "push", payload).await.unwrap()
            }));
        }

        let mut processed = 0;
        for handle in handles {
            if handle.await.unwrap() == IngestOutcome::Processed {
                processed += 1;
            }
        }

        assert_eq!(processed, 1);
        assert_eq!(store.len().await, 1);
    }
}
