use async_graphql::{Context, Object, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::guard::{authorize, Action, Resource};
use crate::auth::permissions::{current_actor, require_member_id};
use crate::gql::error::{DomainError, DomainResultExt, OptionExt};
use crate::gql::types::{LeaveRequest, RequestLeaveInput, ReviewLeaveInput};
use crate::state::AppState;
use infra::repos::{leave_requests, training_sessions, ActorRole};

use super::service;

#[derive(Default)]
pub struct LeaveRequestQuery;

#[Object]
impl LeaveRequestQuery {
    async fn leave_request(&self, ctx: &Context<'_>, id: Uuid) -> Result<LeaveRequest> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;

        let request = leave_requests::get_by_id(&state.db, id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        let session = training_sessions::get_by_id(&state.db, request.session_id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        authorize(
            &actor,
            &Resource::LeaveRequest {
                club_id: request.club_id,
                member_id: request.member_id,
                coach_id: session.coach_id,
            },
            Action::Read,
        )
        .extend_err()?;

        Ok(request.into())
    }

    /// Leave requests filed against a session. Members only see their own.
    async fn session_leave_requests(
        &self,
        ctx: &Context<'_>,
        session_id: Uuid,
    ) -> Result<Vec<LeaveRequest>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;

        let session = training_sessions::get_by_id(&state.db, session_id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        authorize(
            &actor,
            &Resource::Session {
                club_id: session.club_id,
                coach_id: session.coach_id,
            },
            Action::Read,
        )
        .extend_err()?;

        let rows = leave_requests::list_by_session(&state.db, session.id)
            .await
            .map_err(DomainError::from)
            .extend_err()?;

        Ok(rows
            .into_iter()
            .filter(|r| actor.role != ActorRole::Member || actor.member_id == Some(r.member_id))
            .map(LeaveRequest::from)
            .collect())
    }

    async fn my_leave_requests(&self, ctx: &Context<'_>) -> Result<Vec<LeaveRequest>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let member_id = require_member_id(&actor).extend_err()?;

        let rows = leave_requests::list_by_member(&state.db, member_id)
            .await
            .map_err(DomainError::from)
            .extend_err()?;
        Ok(rows.into_iter().map(LeaveRequest::from).collect())
    }
}

#[derive(Default)]
pub struct LeaveRequestMutation;

#[Object]
impl LeaveRequestMutation {
    /// Ask to be excused from a session of your club
    async fn request_leave(
        &self,
        ctx: &Context<'_>,
        input: RequestLeaveInput,
    ) -> Result<LeaveRequest> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::request_leave(&state.db, &actor, input, Utc::now())
            .await
            .extend_err()?;
        Ok(row.into())
    }

    /// Approve or reject a pending leave request (owning coach or administrator)
    async fn review_leave_request(
        &self,
        ctx: &Context<'_>,
        input: ReviewLeaveInput,
    ) -> Result<LeaveRequest> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let row = service::review_leave(
            &state.db,
            &actor,
            input.request_id,
            input.decision,
            Utc::now(),
        )
        .await
        .extend_err()?;
        Ok(row.into())
    }
}
