// Default payload processor
//
// Derives display/audit fields from common webhook payload shapes
// (GitHub-style). Unknown shapes still produce a usable title from the
// event kind; a payload is only rejected when a field it does carry is
// malformed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use chathook_core::{PayloadProcessor, PipelineError, ProcessedEvent, Result};

#[derive(Debug, Default, Clone)]
pub struct StandardProcessor;

impl StandardProcessor {
    pub fn new() -> Self {
        Self
    }

    fn string_at<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a str> {
        keys.iter()
            .find_map(|key| payload.get(key).and_then(Value::as_str))
    }
}

#[async_trait]
impl PayloadProcessor for StandardProcessor {
    async fn process(&self, kind: &str, payload: &Value) -> Result<ProcessedEvent> {
        let action = Self::string_at(payload, &["action"]).map(str::to_string);

        let title = Self::string_at(payload, &["title"])
            .map(str::to_string)
            .or_else(|| {
                payload
                    .pointer("/issue/title")
                    .or_else(|| payload.pointer("/pull_request/title"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| match &action {
                Some(action) => format!("{kind} {action}"),
                None => format!("{kind} event"),
            });

        let description = Self::string_at(payload, &["description", "body"]).map(str::to_string);

        let url = Self::string_at(payload, &["html_url", "url"])
            .or_else(|| {
                payload
                    .pointer("/issue/html_url")
                    .or_else(|| payload.pointer("/pull_request/html_url"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string);

        let actor = payload
            .pointer("/sender/login")
            .or_else(|| payload.pointer("/actor"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let occurred_at = match Self::string_at(payload, &["timestamp", "occurred_at"]) {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| {
                        PipelineError::processing(format!("invalid timestamp {raw:?}: {e}"))
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(ProcessedEvent {
            action,
            title,
            description,
            url,
            actor,
            occurred_at,
        })
    }
}
