use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::AuditLogRow;
use crate::pagination::LimitOffset;

/// Advisory lock key serializing audit appends (ASCII "AUDITLOG").
const AUDIT_APPEND_LOCK_KEY: i64 = 0x4155_4449_544c_4f47;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "actor_role", rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Coach,
    Member,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Coach => "coach",
            ActorRole::Member => "member",
        }
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorRole::Admin),
            "coach" => Ok(ActorRole::Coach),
            "member" => Ok(ActorRole::Member),
            _ => Err(format!("Unknown actor role: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub club_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub prev_hash: String,
    pub entry_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub club_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

const AUDIT_COLUMNS: &str = "seq, id, actor_id, actor_role, action_type, entity_type, entity_id, club_id, details, occurred_at, prev_hash, entry_hash";

/// Take the transaction-scoped append lock. Held until commit or rollback, so the
/// tail read by [`latest`] stays the tail until this transaction's entry lands.
pub async fn acquire_append_lock<'e>(executor: impl PgExecutor<'e>) -> SqlxResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(AUDIT_APPEND_LOCK_KEY)
        .execute(executor)
        .await?;
    Ok(())
}

/// Most recently appended entry.
pub async fn latest<'e>(executor: impl PgExecutor<'e>) -> SqlxResult<Option<AuditLogRow>> {
    sqlx::query_as::<_, AuditLogRow>(&format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY seq DESC LIMIT 1"
    ))
    .fetch_optional(executor)
    .await
}

pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    entry: NewAuditEntry,
) -> SqlxResult<AuditLogRow> {
    sqlx::query_as::<_, AuditLogRow>(&format!(
        r#"
        INSERT INTO audit_log
            (actor_id, actor_role, action_type, entity_type, entity_id, club_id, details,
             occurred_at, prev_hash, entry_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {AUDIT_COLUMNS}
        "#
    ))
    .bind(entry.actor_id)
    .bind(entry.actor_role)
    .bind(entry.action_type)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.club_id)
    .bind(entry.details)
    .bind(entry.occurred_at)
    .bind(entry.prev_hash)
    .bind(entry.entry_hash)
    .fetch_one(executor)
    .await
}

/// List entries newest first.
pub async fn list<'e>(
    executor: impl PgExecutor<'e>,
    filter: AuditFilter,
    page: Option<LimitOffset>,
) -> SqlxResult<Vec<AuditLogRow>> {
    let p = page.unwrap_or_default();

    sqlx::query_as::<_, AuditLogRow>(&format!(
        r#"
        SELECT {AUDIT_COLUMNS}
        FROM audit_log
        WHERE ($1::uuid IS NULL OR actor_id = $1)
          AND ($2::text IS NULL OR entity_type = $2)
          AND ($3::uuid IS NULL OR club_id = $3)
          AND ($4::timestamptz IS NULL OR occurred_at >= $4)
          AND ($5::timestamptz IS NULL OR occurred_at <= $5)
        ORDER BY occurred_at DESC, seq DESC
        LIMIT $6 OFFSET $7
        "#
    ))
    .bind(filter.actor_id)
    .bind(filter.entity_type)
    .bind(filter.club_id)
    .bind(filter.from)
    .bind(filter.to)
    .bind(p.limit)
    .bind(p.offset)
    .fetch_all(executor)
    .await
}

pub async fn count<'e>(executor: impl PgExecutor<'e>, filter: AuditFilter) -> SqlxResult<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM audit_log
        WHERE ($1::uuid IS NULL OR actor_id = $1)
          AND ($2::text IS NULL OR entity_type = $2)
          AND ($3::uuid IS NULL OR club_id = $3)
          AND ($4::timestamptz IS NULL OR occurred_at >= $4)
          AND ($5::timestamptz IS NULL OR occurred_at <= $5)
        "#,
    )
    .bind(filter.actor_id)
    .bind(filter.entity_type)
    .bind(filter.club_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_one(executor)
    .await
}

/// Whole chain in append order, for hash verification.
pub async fn list_chain<'e>(executor: impl PgExecutor<'e>) -> SqlxResult<Vec<AuditLogRow>> {
    sqlx::query_as::<_, AuditLogRow>(&format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY seq ASC"
    ))
    .fetch_all(executor)
    .await
}
