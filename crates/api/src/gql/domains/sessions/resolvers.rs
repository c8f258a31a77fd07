use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::guard::{authorize, scoped_club, Action, Resource};
use crate::auth::permissions::current_actor;
use crate::gql::error::{DomainError, DomainResultExt, OptionExt};
use crate::gql::types::{
    CancelSessionInput, CreateSessionInput, PaginatedResponse, PaginationInput,
    SessionFilterInput, TrainingSession, UpdateSessionInput,
};
use crate::state::AppState;
use infra::repos::{training_sessions, SessionFilter};

use super::service;

#[derive(Default)]
pub struct SessionQuery;

#[Object]
impl SessionQuery {
    /// Sessions of a club in schedule order
    async fn sessions(
        &self,
        ctx: &Context<'_>,
        filter: Option<SessionFilterInput>,
        pagination: Option<PaginationInput>,
    ) -> Result<PaginatedResponse<TrainingSession>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let filter = filter.unwrap_or_default();
        let club_id = scoped_club(&actor, filter.club_id).extend_err()?;

        let repo_filter = SessionFilter {
            club_id,
            from: filter.from,
            to: filter.to,
            status: filter.status.map(Into::into),
        };
        let page = pagination.unwrap_or_default().to_limit_offset();

        let (rows, total_count) = tokio::try_join!(
            training_sessions::list(&state.db, repo_filter.clone(), Some(page)),
            training_sessions::count(&state.db, repo_filter)
        )
        .map_err(DomainError::from)
        .extend_err()?;

        let items = rows.into_iter().map(TrainingSession::from).collect();
        Ok(PaginatedResponse::new(items, total_count, page))
    }

    async fn session(&self, ctx: &Context<'_>, id: Uuid) -> Result<TrainingSession> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;

        let row = training_sessions::get_by_id(&state.db, id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        authorize(
            &actor,
            &Resource::Session {
                club_id: row.club_id,
                coach_id: row.coach_id,
            },
            Action::Read,
        )
        .extend_err()?;

        Ok(row.into())
    }
}

#[derive(Default)]
pub struct SessionMutation;

#[Object]
impl SessionMutation {
    async fn create_session(
        &self,
        ctx: &Context<'_>,
        input: CreateSessionInput,
    ) -> Result<TrainingSession> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::create_session(&state.db, &actor, input, Utc::now())
            .await
            .extend_err()?;
        Ok(row.into())
    }

    /// Replace the schedule of a session that has not started yet
    async fn update_session(
        &self,
        ctx: &Context<'_>,
        input: UpdateSessionInput,
    ) -> Result<TrainingSession> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::update_session(&state.db, &actor, input, Utc::now())
            .await
            .extend_err()?;
        Ok(row.into())
    }

    /// Cancel a session more than two hours before it starts
    async fn cancel_session(
        &self,
        ctx: &Context<'_>,
        input: CancelSessionInput,
    ) -> Result<TrainingSession> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::cancel_session(&state.db, &actor, input, Utc::now())
            .await
            .extend_err()?;
        Ok(row.into())
    }
}
