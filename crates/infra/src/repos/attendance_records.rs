use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::AttendanceRecordRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            _ => Err(format!("Unknown attendance status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "attendance_method", rename_all = "snake_case")]
pub enum AttendanceMethod {
    Coach,
    SelfCheckIn,
    LeaveApproval,
}

impl AttendanceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceMethod::Coach => "coach",
            AttendanceMethod::SelfCheckIn => "self_check_in",
            AttendanceMethod::LeaveApproval => "leave_approval",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteAttendance {
    pub session_id: Uuid,
    pub member_id: Uuid,
    pub club_id: Uuid,
    pub status: AttendanceStatus,
    /// `None` keeps whatever check-in time the record already has.
    pub check_in_time: Option<DateTime<Utc>>,
    pub method: AttendanceMethod,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UpsertedAttendance {
    #[sqlx(flatten)]
    pub record: AttendanceRecordRow,
    pub inserted: bool,
}

/// Raw counts behind the attendance statistics projection.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct AttendanceCounts {
    pub total_records: i64,
    pub present_records: i64,
    pub present_in_month: i64,
}

const ATTENDANCE_COLUMNS: &str = "id, session_id, member_id, club_id, status, check_in_time, method, notes, recorded_by, created_at, updated_at";

/// Insert or update the single record for (session, member).
///
/// Relies on the `attendance_records_session_member` unique constraint, so
/// concurrent writers converge on one row instead of failing.
pub async fn upsert<'e>(
    executor: impl PgExecutor<'e>,
    data: WriteAttendance,
) -> SqlxResult<UpsertedAttendance> {
    sqlx::query_as::<_, UpsertedAttendance>(&format!(
        r#"
        INSERT INTO attendance_records
            (session_id, member_id, club_id, status, check_in_time, method, notes, recorded_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT ON CONSTRAINT attendance_records_session_member DO UPDATE
        SET status = EXCLUDED.status,
            check_in_time = COALESCE(EXCLUDED.check_in_time, attendance_records.check_in_time),
            method = EXCLUDED.method,
            notes = COALESCE(EXCLUDED.notes, attendance_records.notes),
            recorded_by = EXCLUDED.recorded_by,
            updated_at = NOW()
        RETURNING {ATTENDANCE_COLUMNS}, (xmax = 0) AS inserted
        "#
    ))
    .bind(data.session_id)
    .bind(data.member_id)
    .bind(data.club_id)
    .bind(data.status)
    .bind(data.check_in_time)
    .bind(data.method)
    .bind(data.notes)
    .bind(data.recorded_by)
    .fetch_one(executor)
    .await
}

/// Insert only when no record exists yet. Returns `None` when the pair was already recorded.
pub async fn insert_if_absent<'e>(
    executor: impl PgExecutor<'e>,
    data: WriteAttendance,
) -> SqlxResult<Option<AttendanceRecordRow>> {
    sqlx::query_as::<_, AttendanceRecordRow>(&format!(
        r#"
        INSERT INTO attendance_records
            (session_id, member_id, club_id, status, check_in_time, method, notes, recorded_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT ON CONSTRAINT attendance_records_session_member DO NOTHING
        RETURNING {ATTENDANCE_COLUMNS}
        "#
    ))
    .bind(data.session_id)
    .bind(data.member_id)
    .bind(data.club_id)
    .bind(data.status)
    .bind(data.check_in_time)
    .bind(data.method)
    .bind(data.notes)
    .bind(data.recorded_by)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_session_and_member<'e>(
    executor: impl PgExecutor<'e>,
    session_id: Uuid,
    member_id: Uuid,
) -> SqlxResult<Option<AttendanceRecordRow>> {
    sqlx::query_as::<_, AttendanceRecordRow>(&format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE session_id = $1 AND member_id = $2"
    ))
    .bind(session_id)
    .bind(member_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_session<'e>(
    executor: impl PgExecutor<'e>,
    session_id: Uuid,
) -> SqlxResult<Vec<AttendanceRecordRow>> {
    sqlx::query_as::<_, AttendanceRecordRow>(&format!(
        r#"
        SELECT {ATTENDANCE_COLUMNS}
        FROM attendance_records
        WHERE session_id = $1
        ORDER BY created_at ASC
        "#
    ))
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub async fn list_by_member<'e>(
    executor: impl PgExecutor<'e>,
    member_id: Uuid,
) -> SqlxResult<Vec<AttendanceRecordRow>> {
    sqlx::query_as::<_, AttendanceRecordRow>(&format!(
        r#"
        SELECT {ATTENDANCE_COLUMNS}
        FROM attendance_records
        WHERE member_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(member_id)
    .fetch_all(executor)
    .await
}

/// Count a member's records straight from the ledger; `[month_start, month_end)` bounds the
/// monthly figure by session date.
pub async fn counts_for_member<'e>(
    executor: impl PgExecutor<'e>,
    member_id: Uuid,
    month_start: NaiveDate,
    month_end: NaiveDate,
) -> SqlxResult<AttendanceCounts> {
    sqlx::query_as::<_, AttendanceCounts>(
        r#"
        SELECT COUNT(*) AS total_records,
               COUNT(*) FILTER (WHERE a.status = 'present') AS present_records,
               COUNT(*) FILTER (
                   WHERE a.status = 'present'
                     AND s.session_date >= $2
                     AND s.session_date < $3
               ) AS present_in_month
        FROM attendance_records a
        JOIN training_sessions s ON s.id = a.session_id
        WHERE a.member_id = $1
        "#,
    )
    .bind(member_id)
    .bind(month_start)
    .bind(month_end)
    .fetch_one(executor)
    .await
}
