use async_graphql::{InputObject, SimpleObject, ID};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use infra::models::AuditLogRow;

use crate::gql::types::Role;

use super::service::ChainReport;

#[derive(SimpleObject, Clone, Debug)]
pub struct AuditLogEntry {
    pub id: ID,
    pub seq: i64,
    pub actor_id: ID,
    pub actor_role: Role,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: ID,
    pub club_id: Option<ID>,
    pub details: async_graphql::Json<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
    pub entry_hash: String,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        Self {
            id: row.id.into(),
            seq: row.seq,
            actor_id: row.actor_id.into(),
            actor_role: row.actor_role.into(),
            action_type: row.action_type,
            entity_type: row.entity_type,
            entity_id: row.entity_id.into(),
            club_id: row.club_id.map(Into::into),
            details: async_graphql::Json(row.details),
            occurred_at: row.occurred_at,
            entry_hash: row.entry_hash,
        }
    }
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct AuditLogFilterInput {
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub club_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct ChainVerification {
    pub intact: bool,
    pub entries_checked: i32,
    pub first_broken_seq: Option<i64>,
}

impl From<ChainReport> for ChainVerification {
    fn from(report: ChainReport) -> Self {
        Self {
            intact: report.is_intact(),
            entries_checked: report.entries_checked as i32,
            first_broken_seq: report.first_broken_seq,
        }
    }
}
