use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::{models::TrainingSessionRow, pagination::LimitOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "cancelled" => Ok(SessionStatus::Cancelled),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateSessionData {
    pub club_id: Uuid,
    pub coach_id: Uuid,
    pub title: String,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
}

/// Full replacement of the editable schedule fields.
#[derive(Debug, Clone)]
pub struct UpdateSessionData {
    pub title: String,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub club_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<SessionStatus>,
}

const SESSION_COLUMNS: &str = "id, club_id, coach_id, title, session_date, start_time, end_time, location, status, cancellation_reason, cancelled_at, created_at, updated_at";

pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    data: CreateSessionData,
) -> SqlxResult<TrainingSessionRow> {
    sqlx::query_as::<_, TrainingSessionRow>(&format!(
        r#"
        INSERT INTO training_sessions (club_id, coach_id, title, session_date, start_time, end_time, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {SESSION_COLUMNS}
        "#
    ))
    .bind(data.club_id)
    .bind(data.coach_id)
    .bind(data.title)
    .bind(data.session_date)
    .bind(data.start_time)
    .bind(data.end_time)
    .bind(data.location)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<TrainingSessionRow>> {
    sqlx::query_as::<_, TrainingSessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM training_sessions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Row-locking read; used before edits, cancellation and leave/attendance writes.
pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<TrainingSessionRow>> {
    sqlx::query_as::<_, TrainingSessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM training_sessions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn list<'e>(
    executor: impl PgExecutor<'e>,
    filter: SessionFilter,
    page: Option<LimitOffset>,
) -> SqlxResult<Vec<TrainingSessionRow>> {
    let p = page.unwrap_or_default();

    // Dynamic WHERE using COALESCE-style optional binds to keep a single prepared statement
    sqlx::query_as::<_, TrainingSessionRow>(&format!(
        r#"
        SELECT {SESSION_COLUMNS}
        FROM training_sessions
        WHERE ($1::uuid IS NULL OR club_id = $1)
          AND ($2::date IS NULL OR session_date >= $2)
          AND ($3::date IS NULL OR session_date <= $3)
          AND ($4::session_status IS NULL OR status = $4)
        ORDER BY session_date ASC, start_time ASC, id ASC
        LIMIT $5 OFFSET $6
        "#
    ))
    .bind(filter.club_id)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.status)
    .bind(p.limit)
    .bind(p.offset)
    .fetch_all(executor)
    .await
}

pub async fn count<'e>(executor: impl PgExecutor<'e>, filter: SessionFilter) -> SqlxResult<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM training_sessions
        WHERE ($1::uuid IS NULL OR club_id = $1)
          AND ($2::date IS NULL OR session_date >= $2)
          AND ($3::date IS NULL OR session_date <= $3)
          AND ($4::session_status IS NULL OR status = $4)
        "#,
    )
    .bind(filter.club_id)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.status)
    .fetch_one(executor)
    .await
}

pub async fn update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    data: UpdateSessionData,
) -> SqlxResult<TrainingSessionRow> {
    sqlx::query_as::<_, TrainingSessionRow>(&format!(
        r#"
        UPDATE training_sessions
        SET title = $2, session_date = $3, start_time = $4, end_time = $5, location = $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {SESSION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(data.title)
    .bind(data.session_date)
    .bind(data.start_time)
    .bind(data.end_time)
    .bind(data.location)
    .fetch_one(executor)
    .await
}

pub async fn cancel<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    reason: Option<String>,
) -> SqlxResult<TrainingSessionRow> {
    sqlx::query_as::<_, TrainingSessionRow>(&format!(
        r#"
        UPDATE training_sessions
        SET status = 'cancelled', cancellation_reason = $2, cancelled_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING {SESSION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(reason)
    .fetch_one(executor)
    .await
}
