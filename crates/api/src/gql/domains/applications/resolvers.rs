use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::guard::{authorize, scoped_club, Action, Resource};
use crate::auth::permissions::{current_actor, require_member_id};
use crate::gql::error::{DomainError, DomainResultExt, OptionExt};
use crate::gql::types::{
    ApplicationFilterInput, MembershipApplication, PaginatedResponse, PaginationInput,
    ResubmitApplicationInput, ReviewApplicationInput, SubmitApplicationInput,
};
use crate::state::AppState;
use infra::repos::{membership_applications, ActorRole, ApplicationFilter};

use super::service;

#[derive(Default)]
pub struct ApplicationQuery;

#[Object]
impl ApplicationQuery {
    async fn application(&self, ctx: &Context<'_>, id: Uuid) -> Result<MembershipApplication> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;

        let row = membership_applications::get_by_id(&state.db, id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        authorize(
            &actor,
            &Resource::Application {
                club_id: row.club_id,
                member_id: row.member_id,
            },
            Action::Read,
        )
        .extend_err()?;

        Ok(row.into())
    }

    /// Applications of a club, newest first (coaches and administrators)
    async fn applications(
        &self,
        ctx: &Context<'_>,
        filter: Option<ApplicationFilterInput>,
        pagination: Option<PaginationInput>,
    ) -> Result<PaginatedResponse<MembershipApplication>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        if actor.role == ActorRole::Member {
            return Err(DomainError::Forbidden).extend_err();
        }
        let filter = filter.unwrap_or_default();
        let club_id = scoped_club(&actor, filter.club_id).extend_err()?;

        let repo_filter = ApplicationFilter {
            club_id,
            member_id: None,
            status: filter.status.map(Into::into),
        };
        let page = pagination.unwrap_or_default().to_limit_offset();

        let (rows, total_count) = tokio::try_join!(
            membership_applications::list(&state.db, repo_filter.clone(), Some(page)),
            membership_applications::count(&state.db, repo_filter)
        )
        .map_err(DomainError::from)
        .extend_err()?;

        let items = rows.into_iter().map(MembershipApplication::from).collect();
        Ok(PaginatedResponse::new(items, total_count, page))
    }

    /// The caller's own applications
    async fn my_applications(&self, ctx: &Context<'_>) -> Result<Vec<MembershipApplication>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let member_id = require_member_id(&actor).extend_err()?;

        let filter = ApplicationFilter {
            club_id: actor.club_id,
            member_id: Some(member_id),
            status: None,
        };
        let rows = membership_applications::list(&state.db, filter, None)
            .await
            .map_err(DomainError::from)
            .extend_err()?;
        Ok(rows.into_iter().map(MembershipApplication::from).collect())
    }
}

#[derive(Default)]
pub struct ApplicationMutation;

#[Object]
impl ApplicationMutation {
    /// Apply to join a club. Fails with DUPLICATE_APPLICATION while another one is open.
    async fn submit_application(
        &self,
        ctx: &Context<'_>,
        input: SubmitApplicationInput,
    ) -> Result<MembershipApplication> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::submit(&state.db, &actor, input, Utc::now())
            .await
            .extend_err()?;
        Ok(row.into())
    }

    /// Approve, reject or ask the applicant for more information
    async fn review_application(
        &self,
        ctx: &Context<'_>,
        input: ReviewApplicationInput,
    ) -> Result<MembershipApplication> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::review(
            &state.db,
            &actor,
            input.application_id,
            input.decision,
            input.notes,
            Utc::now(),
        )
        .await
        .extend_err()?;
        Ok(row.into())
    }

    /// Answer an information request with an updated snapshot
    async fn resubmit_application(
        &self,
        ctx: &Context<'_>,
        input: ResubmitApplicationInput,
    ) -> Result<MembershipApplication> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::resubmit(&state.db, &actor, input, Utc::now())
            .await
            .extend_err()?;
        Ok(row.into())
    }
}
