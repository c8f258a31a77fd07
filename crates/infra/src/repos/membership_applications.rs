use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{ApplicationActivity, DocumentRef, MembershipApplicationRow, PersonalInfo};
use crate::pagination::LimitOffset;

/// Partial unique index guarding one open application per (member, club).
pub const ONE_OPEN_APPLICATION_INDEX: &str = "membership_applications_one_open";

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    InfoRequested,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::InfoRequested => "info_requested",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "info_requested" => Ok(ApplicationStatus::InfoRequested),
            _ => Err(format!("Unknown application status: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateApplication {
    pub member_id: Uuid,
    pub club_id: Uuid,
    pub personal_info: PersonalInfo,
    pub documents: Vec<DocumentRef>,
    pub first_activity: ApplicationActivity,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub club_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}

/// Status change written by a review. Review metadata is only set for terminal decisions.
#[derive(Debug, Clone)]
pub struct ApplicationTransition {
    pub status: ApplicationStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub activity: ApplicationActivity,
}

const APPLICATION_COLUMNS: &str = "id, member_id, club_id, personal_info, documents, status, reviewed_by, reviewed_at, review_notes, activity_log, submitted_at, updated_at";

pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    data: CreateApplication,
) -> SqlxResult<MembershipApplicationRow> {
    sqlx::query_as::<_, MembershipApplicationRow>(&format!(
        r#"
        INSERT INTO membership_applications (member_id, club_id, personal_info, documents, activity_log)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {APPLICATION_COLUMNS}
        "#
    ))
    .bind(data.member_id)
    .bind(data.club_id)
    .bind(Json(data.personal_info))
    .bind(Json(data.documents))
    .bind(Json(vec![data.first_activity]))
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<MembershipApplicationRow>> {
    sqlx::query_as::<_, MembershipApplicationRow>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM membership_applications WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Lock the application row so concurrent reviewers serialize on it.
pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<MembershipApplicationRow>> {
    sqlx::query_as::<_, MembershipApplicationRow>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM membership_applications WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// The application still awaiting a decision (`pending` or `info_requested`), if any.
pub async fn find_open<'e>(
    executor: impl PgExecutor<'e>,
    member_id: Uuid,
    club_id: Uuid,
) -> SqlxResult<Option<MembershipApplicationRow>> {
    sqlx::query_as::<_, MembershipApplicationRow>(&format!(
        r#"
        SELECT {APPLICATION_COLUMNS}
        FROM membership_applications
        WHERE member_id = $1 AND club_id = $2 AND status IN ('pending', 'info_requested')
        LIMIT 1
        "#
    ))
    .bind(member_id)
    .bind(club_id)
    .fetch_optional(executor)
    .await
}

pub async fn list<'e>(
    executor: impl PgExecutor<'e>,
    filter: ApplicationFilter,
    page: Option<LimitOffset>,
) -> SqlxResult<Vec<MembershipApplicationRow>> {
    let p = page.unwrap_or_default();

    sqlx::query_as::<_, MembershipApplicationRow>(&format!(
        r#"
        SELECT {APPLICATION_COLUMNS}
        FROM membership_applications
        WHERE ($1::uuid IS NULL OR club_id = $1)
          AND ($2::uuid IS NULL OR member_id = $2)
          AND ($3::application_status IS NULL OR status = $3)
        ORDER BY submitted_at DESC, id ASC
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(filter.club_id)
    .bind(filter.member_id)
    .bind(filter.status)
    .bind(p.limit)
    .bind(p.offset)
    .fetch_all(executor)
    .await
}

pub async fn count<'e>(
    executor: impl PgExecutor<'e>,
    filter: ApplicationFilter,
) -> SqlxResult<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM membership_applications
        WHERE ($1::uuid IS NULL OR club_id = $1)
          AND ($2::uuid IS NULL OR member_id = $2)
          AND ($3::application_status IS NULL OR status = $3)
        "#,
    )
    .bind(filter.club_id)
    .bind(filter.member_id)
    .bind(filter.status)
    .fetch_one(executor)
    .await
}

/// Apply a review outcome and append its activity entry in one statement.
pub async fn apply_transition<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    transition: ApplicationTransition,
) -> SqlxResult<MembershipApplicationRow> {
    sqlx::query_as::<_, MembershipApplicationRow>(&format!(
        r#"
        UPDATE membership_applications
        SET status = $2,
            reviewed_by = $3,
            reviewed_at = $4,
            review_notes = $5,
            activity_log = activity_log || $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {APPLICATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(transition.status)
    .bind(transition.reviewed_by)
    .bind(transition.reviewed_at)
    .bind(transition.review_notes)
    .bind(Json(vec![transition.activity]))
    .fetch_one(executor)
    .await
}

/// Move an `info_requested` application back to `pending` with a fresh snapshot.
pub async fn resubmit<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    personal_info: PersonalInfo,
    documents: Vec<DocumentRef>,
    activity: ApplicationActivity,
) -> SqlxResult<MembershipApplicationRow> {
    sqlx::query_as::<_, MembershipApplicationRow>(&format!(
        r#"
        UPDATE membership_applications
        SET status = 'pending',
            personal_info = $2,
            documents = $3,
            activity_log = activity_log || $4,
            submitted_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {APPLICATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(Json(personal_info))
    .bind(Json(documents))
    .bind(Json(vec![activity]))
    .fetch_one(executor)
    .await
}
