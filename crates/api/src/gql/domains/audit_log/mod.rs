pub mod resolvers;
pub mod service;
pub mod types;

pub use resolvers::AuditLogQuery;
pub use service::{record, AuditAction, AuditDraft, EntityType};

use infra::models::AuditLogRow;
use sqlx::{Postgres, Transaction};

use crate::gql::subscriptions::publish_club_event;

/// Commit a workflow transaction, then hand its audit entry to the notification fan-out.
/// Nothing is published for a transaction that fails to commit.
pub async fn commit_and_publish(
    tx: Transaction<'_, Postgres>,
    entry: &AuditLogRow,
) -> sqlx::Result<()> {
    tx.commit().await?;
    publish_club_event(entry);
    Ok(())
}
