use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::LeaveRequestRow;

/// Partial unique index guarding one pending request per (session, member).
pub const ONE_PENDING_LEAVE_INDEX: &str = "leave_requests_one_pending";

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "leave_status", rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for LeaveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            _ => Err(format!("Unknown leave status: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateLeaveRequest {
    pub session_id: Uuid,
    pub member_id: Uuid,
    pub club_id: Uuid,
    pub reason: String,
    pub requested_by: Uuid,
}

const LEAVE_COLUMNS: &str = "id, session_id, member_id, club_id, reason, status, requested_by, reviewed_by, reviewed_at, created_at, updated_at";

pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    data: CreateLeaveRequest,
) -> SqlxResult<LeaveRequestRow> {
    sqlx::query_as::<_, LeaveRequestRow>(&format!(
        r#"
        INSERT INTO leave_requests (session_id, member_id, club_id, reason, requested_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {LEAVE_COLUMNS}
        "#
    ))
    .bind(data.session_id)
    .bind(data.member_id)
    .bind(data.club_id)
    .bind(data.reason)
    .bind(data.requested_by)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<LeaveRequestRow>> {
    sqlx::query_as::<_, LeaveRequestRow>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<LeaveRequestRow>> {
    sqlx::query_as::<_, LeaveRequestRow>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn find_pending<'e>(
    executor: impl PgExecutor<'e>,
    session_id: Uuid,
    member_id: Uuid,
) -> SqlxResult<Option<LeaveRequestRow>> {
    sqlx::query_as::<_, LeaveRequestRow>(&format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        WHERE session_id = $1 AND member_id = $2 AND status = 'pending'
        "#
    ))
    .bind(session_id)
    .bind(member_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_session<'e>(
    executor: impl PgExecutor<'e>,
    session_id: Uuid,
) -> SqlxResult<Vec<LeaveRequestRow>> {
    sqlx::query_as::<_, LeaveRequestRow>(&format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        WHERE session_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub async fn list_by_member<'e>(
    executor: impl PgExecutor<'e>,
    member_id: Uuid,
) -> SqlxResult<Vec<LeaveRequestRow>> {
    sqlx::query_as::<_, LeaveRequestRow>(&format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        WHERE member_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(member_id)
    .fetch_all(executor)
    .await
}

/// Record the single review decision. The caller holds the row lock and has checked `pending`.
pub async fn decide<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: LeaveStatus,
    reviewed_by: Uuid,
    reviewed_at: DateTime<Utc>,
) -> SqlxResult<LeaveRequestRow> {
    sqlx::query_as::<_, LeaveRequestRow>(&format!(
        r#"
        UPDATE leave_requests
        SET status = $2, reviewed_by = $3, reviewed_at = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING {LEAVE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .bind(reviewed_by)
    .bind(reviewed_at)
    .fetch_one(executor)
    .await
}
