use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use crate::auth::guard::{authorize, scoped_club, Action, Resource};
use crate::auth::permissions::current_actor;
use crate::gql::error::{DomainError, DomainResultExt, OptionExt};
use crate::gql::types::{AssignCoachInput, Club, Coach, CreateClubInput};
use crate::state::AppState;
use infra::repos::{clubs, coaches};

use super::service;

#[derive(Default)]
pub struct ClubQuery;

#[Object]
impl ClubQuery {
    /// Clubs visible to the caller: every club for administrators, otherwise their own
    async fn clubs(&self, ctx: &Context<'_>) -> Result<Vec<Club>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let club_id = scoped_club(&actor, None).extend_err()?;

        let rows = clubs::list(&state.db, club_id)
            .await
            .map_err(DomainError::from)
            .extend_err()?;
        Ok(rows.into_iter().map(Club::from).collect())
    }

    async fn club(&self, ctx: &Context<'_>, id: Uuid) -> Result<Club> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        authorize(&actor, &Resource::Club { club_id: id }, Action::Read).extend_err()?;

        let row = clubs::get_by_id(&state.db, id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        Ok(row.into())
    }

    async fn club_coaches(&self, ctx: &Context<'_>, club_id: Option<Uuid>) -> Result<Vec<Coach>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let club_id = scoped_club(&actor, club_id)
            .and_then(|scoped| scoped.ok_or_else(|| DomainError::validation("clubId is required")))
            .extend_err()?;
        authorize(&actor, &Resource::Club { club_id }, Action::Read).extend_err()?;

        let rows = coaches::list_by_club(&state.db, club_id)
            .await
            .map_err(DomainError::from)
            .extend_err()?;
        Ok(rows.into_iter().map(Coach::from).collect())
    }
}

#[derive(Default)]
pub struct ClubMutation;

#[Object]
impl ClubMutation {
    /// Create a club (administrators only)
    async fn create_club(&self, ctx: &Context<'_>, input: CreateClubInput) -> Result<Club> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let club = service::create_club(&state.db, &actor, input)
            .await
            .extend_err()?;
        Ok(club.into())
    }

    /// Bind an identity to a club as its coach (administrators only)
    async fn assign_coach(&self, ctx: &Context<'_>, input: AssignCoachInput) -> Result<Coach> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let coach = service::assign_coach(&state.db, &actor, input)
            .await
            .extend_err()?;
        Ok(coach.into())
    }
}
