// Shared response types

use serde::Serialize;
use utoipa::ToSchema;

/// Generic list envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T: ToSchema> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: ToSchema> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}
