// Repository layer for database operations

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use chathook_core::{InsertOutcome, NewEvent};

use crate::models::{CreateTurnRow, EventRow, TurnRow};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run embedded migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Events
    // ============================================

    /// Insert an event row. The primary key settles concurrent inserts
    /// of the same id; the loser sees zero rows affected.
    pub async fn insert_event(&self, event: NewEvent) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO events (id, kind, action, title, description, url, actor, payload, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&event.id)
        .bind(&event.kind)
        .bind(&event.action)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.url)
        .bind(&event.actor)
        .bind(sqlx::types::Json(&event.payload))
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(id = %event.id, "Insert hit an existing event id");
            Ok(InsertOutcome::DuplicateId)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    pub async fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, kind, action, title, description, url, actor, payload, occurred_at, received_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_events(&self, limit: i64) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, kind, action, title, description, url, actor, payload, occurred_at, received_at
            FROM events
            ORDER BY occurred_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Turns
    // ============================================

    pub async fn create_turn(&self, input: CreateTurnRow) -> Result<TurnRow> {
        // Get next sequence number for this session
        let row = sqlx::query_as::<_, TurnRow>(
            r#"
            INSERT INTO turns (id, session_id, sequence, role, content, created_at)
            VALUES ($1, $2, COALESCE((SELECT MAX(sequence) + 1 FROM turns WHERE session_id = $2), 1), $3, $4, $5)
            RETURNING id, session_id, sequence, role, content, created_at
            "#,
        )
        .bind(input.id)
        .bind(input.session_id)
        .bind(&input.role)
        .bind(sqlx::types::Json(&input.content))
        .bind(input.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_turns(&self, session_id: Uuid) -> Result<Vec<TurnRow>> {
        let rows = sqlx::query_as::<_, TurnRow>(
            r#"
            SELECT id, session_id, sequence, role, content, created_at
            FROM turns
            WHERE session_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_turns(&self, session_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM turns WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
