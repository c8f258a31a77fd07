//! Append-only audit recorder.
//!
//! Appends run inside the caller's transaction behind a transaction-scoped advisory
//! lock, so entries land in a single total order. Each entry gets a server-assigned
//! timestamp that never goes backwards and a SHA-256 link to its predecessor.

use chrono::{DateTime, SubsecRound, Utc};
use infra::models::AuditLogRow;
use infra::repos::{audit_log, ActorRole, NewAuditEntry};
use sha2::{Digest, Sha256};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::auth::Actor;

/// `prev_hash` of the very first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ClubCreated,
    CoachAssigned,
    MemberProvisioned,
    ApplicationSubmitted,
    ApplicationResubmitted,
    ApplicationInfoRequested,
    ApplicationApproved,
    ApplicationRejected,
    SessionCreated,
    SessionUpdated,
    SessionCancelled,
    AttendanceMarked,
    AttendanceCheckedIn,
    LeaveRequested,
    LeaveApproved,
    LeaveRejected,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClubCreated => "club_created",
            Self::CoachAssigned => "coach_assigned",
            Self::MemberProvisioned => "member_provisioned",
            Self::ApplicationSubmitted => "application_submitted",
            Self::ApplicationResubmitted => "application_resubmitted",
            Self::ApplicationInfoRequested => "application_info_requested",
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationRejected => "application_rejected",
            Self::SessionCreated => "session_created",
            Self::SessionUpdated => "session_updated",
            Self::SessionCancelled => "session_cancelled",
            Self::AttendanceMarked => "attendance_marked",
            Self::AttendanceCheckedIn => "attendance_checked_in",
            Self::LeaveRequested => "leave_requested",
            Self::LeaveApproved => "leave_approved",
            Self::LeaveRejected => "leave_rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Club,
    Coach,
    Member,
    Application,
    Session,
    Attendance,
    LeaveRequest,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Club => "club",
            Self::Coach => "coach",
            Self::Member => "member",
            Self::Application => "membership_application",
            Self::Session => "training_session",
            Self::Attendance => "attendance_record",
            Self::LeaveRequest => "leave_request",
        }
    }
}

/// One mutating action, before the recorder stamps and chains it.
#[derive(Debug, Clone)]
pub struct AuditDraft {
    pub actor_id: Uuid,
    pub actor_role: ActorRole,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub club_id: Option<Uuid>,
    pub details: serde_json::Value,
}

impl AuditDraft {
    pub fn new(
        actor: &Actor,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: Uuid,
        club_id: Option<Uuid>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            actor_id: actor.identity_id,
            actor_role: actor.role,
            action,
            entity_type,
            entity_id,
            club_id,
            details,
        }
    }
}

/// Append `draft` to the audit log using the caller's transaction connection.
pub async fn record(conn: &mut PgConnection, draft: AuditDraft) -> sqlx::Result<AuditLogRow> {
    audit_log::acquire_append_lock(&mut *conn).await?;
    let tail = audit_log::latest(&mut *conn).await?;

    let occurred_at = next_timestamp(tail.as_ref().map(|row| row.occurred_at), Utc::now());
    let prev_hash = tail
        .map(|row| row.entry_hash)
        .unwrap_or_else(|| GENESIS_HASH.to_string());
    let entry_hash = entry_hash(
        &prev_hash,
        draft.actor_id,
        draft.actor_role,
        draft.action.as_str(),
        draft.entity_type.as_str(),
        draft.entity_id,
        draft.club_id,
        &draft.details,
        occurred_at,
    );

    let row = audit_log::insert(
        &mut *conn,
        NewAuditEntry {
            actor_id: draft.actor_id,
            actor_role: draft.actor_role,
            action_type: draft.action.as_str().to_string(),
            entity_type: draft.entity_type.as_str().to_string(),
            entity_id: draft.entity_id,
            club_id: draft.club_id,
            details: draft.details,
            occurred_at,
            prev_hash,
            entry_hash,
        },
    )
    .await?;

    tracing::debug!(
        seq = row.seq,
        action = %row.action_type,
        entity_type = %row.entity_type,
        entity_id = %row.entity_id,
        "audit entry appended"
    );

    Ok(row)
}

/// Timestamp for the next entry: now, at database precision, but never earlier than the tail.
pub fn next_timestamp(tail: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match tail {
        Some(tail) if tail > now => tail,
        _ => now,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn entry_hash(
    prev_hash: &str,
    actor_id: Uuid,
    actor_role: ActorRole,
    action_type: &str,
    entity_type: &str,
    entity_id: Uuid,
    club_id: Option<Uuid>,
    details: &serde_json::Value,
    occurred_at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        prev_hash.to_string(),
        actor_id.to_string(),
        actor_role.as_str().to_string(),
        action_type.to_string(),
        entity_type.to_string(),
        entity_id.to_string(),
        club_id.map(|id| id.to_string()).unwrap_or_default(),
        canonical_json(details),
        occurred_at.timestamp_micros().to_string(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

/// JSON with object keys sorted at every level. JSONB does not preserve key order,
/// so hashes are computed over this form.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::Value::String(k.clone()),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        serde_json::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub entries_checked: usize,
    /// Sequence number of the first entry whose link, hash or timestamp is wrong.
    pub first_broken_seq: Option<i64>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.first_broken_seq.is_none()
    }
}

/// Walk entries in append order and recompute every link.
pub fn verify_chain(rows: &[AuditLogRow]) -> ChainReport {
    let mut expected_prev = GENESIS_HASH.to_string();
    let mut last_time: Option<DateTime<Utc>> = None;

    for row in rows {
        let recomputed = entry_hash(
            &row.prev_hash,
            row.actor_id,
            row.actor_role,
            &row.action_type,
            &row.entity_type,
            row.entity_id,
            row.club_id,
            &row.details,
            row.occurred_at,
        );
        let out_of_order = last_time.is_some_and(|t| row.occurred_at < t);

        if row.prev_hash != expected_prev || row.entry_hash != recomputed || out_of_order {
            return ChainReport {
                entries_checked: rows.len(),
                first_broken_seq: Some(row.seq),
            };
        }

        expected_prev = row.entry_hash.clone();
        last_time = Some(row.occurred_at);
    }

    ChainReport {
        entries_checked: rows.len(),
        first_broken_seq: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn chain(len: usize) -> Vec<AuditLogRow> {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut rows: Vec<AuditLogRow> = Vec::new();
        let mut prev = GENESIS_HASH.to_string();

        for i in 0..len {
            let actor_id = Uuid::new_v4();
            let entity_id = Uuid::new_v4();
            let details = json!({ "index": i, "new_status": "approved", "old_status": "pending" });
            let occurred_at = start + Duration::seconds(i as i64);
            let hash = entry_hash(
                &prev,
                actor_id,
                ActorRole::Coach,
                "application_approved",
                "membership_application",
                entity_id,
                None,
                &details,
                occurred_at,
            );
            rows.push(AuditLogRow {
                seq: i as i64 + 1,
                id: Uuid::new_v4(),
                actor_id,
                actor_role: ActorRole::Coach,
                action_type: "application_approved".into(),
                entity_type: "membership_application".into(),
                entity_id,
                club_id: None,
                details,
                occurred_at,
                prev_hash: prev.clone(),
                entry_hash: hash.clone(),
            });
            prev = hash;
        }
        rows
    }

    #[test]
    fn timestamps_never_move_backwards() {
        let now = Utc::now();
        let ahead = now + Duration::seconds(5);
        assert_eq!(next_timestamp(Some(ahead), now), ahead);

        let behind = now - Duration::seconds(5);
        assert_eq!(next_timestamp(Some(behind), now), now.trunc_subsecs(6));
        assert_eq!(next_timestamp(None, now), now.trunc_subsecs(6));
    }

    #[test]
    fn entry_hash_is_lowercase_hex_sha256() {
        let rows = chain(1);
        let hash = &rows[0].entry_hash;
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn canonical_json_ignores_key_order() {
        let a = json!({ "b": 1, "a": { "y": true, "x": [1, 2] } });
        let b = json!({ "a": { "x": [1, 2], "y": true }, "b": 1 });
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn intact_chain_verifies() {
        let rows = chain(5);
        let report = verify_chain(&rows);
        assert!(report.is_intact());
        assert_eq!(report.entries_checked, 5);
    }

    #[test]
    fn tampered_details_break_the_chain() {
        let mut rows = chain(4);
        rows[2].details = json!({ "index": 2, "new_status": "rejected" });
        assert_eq!(verify_chain(&rows).first_broken_seq, Some(3));
    }

    #[test]
    fn removed_entry_breaks_the_chain() {
        let mut rows = chain(4);
        rows.remove(1);
        assert_eq!(verify_chain(&rows).first_broken_seq, Some(3));
    }
}
