use async_graphql::{Context, Object, Result};

use crate::auth::guard::{authorize, scoped_club, Action, Resource};
use crate::auth::permissions::{current_actor, require_admin};
use crate::gql::error::{DomainError, DomainResultExt};
use crate::gql::types::{
    AuditLogEntry, AuditLogFilterInput, ChainVerification, PaginatedResponse, PaginationInput,
};
use crate::state::AppState;
use infra::repos::{audit_log, AuditFilter};

use super::service::verify_chain;

#[derive(Default)]
pub struct AuditLogQuery;

#[Object]
impl AuditLogQuery {
    /// Audit entries, newest first. Administrators see every club, coaches their own.
    async fn audit_log(
        &self,
        ctx: &Context<'_>,
        filter: Option<AuditLogFilterInput>,
        pagination: Option<PaginationInput>,
    ) -> Result<PaginatedResponse<AuditLogEntry>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let filter = filter.unwrap_or_default();

        let club_id = scoped_club(&actor, filter.club_id).extend_err()?;
        authorize(&actor, &Resource::AuditLog { club_id }, Action::Read).extend_err()?;

        let repo_filter = AuditFilter {
            actor_id: filter.actor_id,
            entity_type: filter.entity_type,
            club_id,
            from: filter.from,
            to: filter.to,
        };
        let page = pagination.unwrap_or_default().to_limit_offset();

        let (rows, total_count) = tokio::try_join!(
            audit_log::list(&state.db, repo_filter.clone(), Some(page)),
            audit_log::count(&state.db, repo_filter)
        )
        .map_err(DomainError::from)
        .extend_err()?;

        let items = rows.into_iter().map(AuditLogEntry::from).collect();
        Ok(PaginatedResponse::new(items, total_count, page))
    }

    /// Recompute the hash chain over the whole log (administrators only)
    async fn verify_audit_chain(&self, ctx: &Context<'_>) -> Result<ChainVerification> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        require_admin(&actor).extend_err()?;

        let rows = audit_log::list_chain(&state.db)
            .await
            .map_err(DomainError::from)
            .extend_err()?;
        let report = verify_chain(&rows);
        if let Some(seq) = report.first_broken_seq {
            tracing::error!(seq, "audit chain verification failed");
        }

        Ok(report.into())
    }
}
