use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::{models::MemberRow, pagination::LimitOffset};

pub const MEMBERS_IDENTITY_KEY: &str = "members_identity_id_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "access_flag", rename_all = "snake_case")]
pub enum AccessFlag {
    Pending,
    Active,
    Rejected,
    Suspended,
}

impl AccessFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessFlag::Pending => "pending",
            AccessFlag::Active => "active",
            AccessFlag::Rejected => "rejected",
            AccessFlag::Suspended => "suspended",
        }
    }
}

impl FromStr for AccessFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AccessFlag::Pending),
            "active" => Ok(AccessFlag::Active),
            "rejected" => Ok(AccessFlag::Rejected),
            "suspended" => Ok(AccessFlag::Suspended),
            _ => Err(format!("Unknown access flag: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMember {
    pub identity_id: Uuid,
    pub club_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub health_notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub club_id: Option<Uuid>,
    pub access_flag: Option<AccessFlag>,
}

const MEMBER_COLUMNS: &str = "id, identity_id, club_id, access_flag, full_name, email, phone, health_notes, created_at, updated_at";

/// New members always start in `pending`; the flag is not part of the insert.
pub async fn create<'e>(
    executor: impl PgExecutor<'e>,
    data: CreateMember,
) -> SqlxResult<MemberRow> {
    sqlx::query_as::<_, MemberRow>(&format!(
        r#"
        INSERT INTO members (identity_id, club_id, full_name, email, phone, health_notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(data.identity_id)
    .bind(data.club_id)
    .bind(data.full_name)
    .bind(data.email)
    .bind(data.phone)
    .bind(data.health_notes)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<MemberRow>> {
    sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Same as [`get_by_id`] but takes a row lock for the rest of the transaction.
pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<MemberRow>> {
    sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_identity<'e>(
    executor: impl PgExecutor<'e>,
    identity_id: Uuid,
) -> SqlxResult<Option<MemberRow>> {
    sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE identity_id = $1"
    ))
    .bind(identity_id)
    .fetch_optional(executor)
    .await
}

pub async fn list<'e>(
    executor: impl PgExecutor<'e>,
    filter: MemberFilter,
    page: Option<LimitOffset>,
) -> SqlxResult<Vec<MemberRow>> {
    let p = page.unwrap_or_default();

    sqlx::query_as::<_, MemberRow>(&format!(
        r#"
        SELECT {MEMBER_COLUMNS}
        FROM members
        WHERE ($1::uuid IS NULL OR club_id = $1)
          AND ($2::access_flag IS NULL OR access_flag = $2)
        ORDER BY full_name ASC, id ASC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(filter.club_id)
    .bind(filter.access_flag)
    .bind(p.limit)
    .bind(p.offset)
    .fetch_all(executor)
    .await
}

pub async fn count<'e>(executor: impl PgExecutor<'e>, filter: MemberFilter) -> SqlxResult<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM members
        WHERE ($1::uuid IS NULL OR club_id = $1)
          AND ($2::access_flag IS NULL OR access_flag = $2)
        "#,
    )
    .bind(filter.club_id)
    .bind(filter.access_flag)
    .fetch_one(executor)
    .await
}

/// Write the access flag. Only the membership review workflow calls this.
pub async fn set_access_flag<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    flag: AccessFlag,
) -> SqlxResult<MemberRow> {
    sqlx::query_as::<_, MemberRow>(&format!(
        r#"
        UPDATE members
        SET access_flag = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(flag)
    .fetch_one(executor)
    .await
}
