use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use crate::auth::guard::{authorize, scoped_club, Action, Resource};
use crate::auth::permissions::current_actor;
use crate::gql::error::{DomainError, DomainResultExt, OptionExt};
use crate::gql::types::{
    Me, Member, MemberFilterInput, PaginatedResponse, PaginationInput, ProvisionMemberInput,
};
use crate::state::AppState;
use infra::repos::{coaches, members, ActorRole, MemberFilter};

use super::service;

#[derive(Default)]
pub struct MemberQuery;

#[Object]
impl MemberQuery {
    /// The authenticated caller with their member or coach profile
    async fn me(&self, ctx: &Context<'_>) -> Result<Me> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;

        let member = match actor.member_id {
            Some(id) => members::get_by_id(&state.db, id)
                .await
                .map_err(DomainError::from)
                .extend_err()?,
            None => None,
        };
        let coach = match actor.coach_id {
            Some(id) => coaches::get_by_id(&state.db, id)
                .await
                .map_err(DomainError::from)
                .extend_err()?,
            None => None,
        };

        Ok(Me {
            identity_id: actor.identity_id.into(),
            role: actor.role.into(),
            club_id: actor.club_id.map(Into::into),
            member: member.map(Member::from),
            coach: coach.map(Into::into),
        })
    }

    /// Members of a club (coaches and administrators)
    async fn club_members(
        &self,
        ctx: &Context<'_>,
        filter: Option<MemberFilterInput>,
        pagination: Option<PaginationInput>,
    ) -> Result<PaginatedResponse<Member>> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        if actor.role == ActorRole::Member {
            return Err(DomainError::Forbidden).extend_err();
        }
        let filter = filter.unwrap_or_default();
        let club_id = scoped_club(&actor, filter.club_id).extend_err()?;

        let repo_filter = MemberFilter {
            club_id,
            access_flag: filter.access_flag.map(Into::into),
        };
        let page = pagination.unwrap_or_default().to_limit_offset();

        let (rows, total_count) = tokio::try_join!(
            members::list(&state.db, repo_filter.clone(), Some(page)),
            members::count(&state.db, repo_filter)
        )
        .map_err(DomainError::from)
        .extend_err()?;

        let items = rows.into_iter().map(Member::from).collect();
        Ok(PaginatedResponse::new(items, total_count, page))
    }

    async fn member(&self, ctx: &Context<'_>, id: Uuid) -> Result<Member> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;

        let row = members::get_by_id(&state.db, id)
            .await
            .map_err(DomainError::from)
            .and_then(|row| row.or_not_found())
            .extend_err()?;
        authorize(
            &actor,
            &Resource::Member {
                club_id: row.club_id,
                member_id: row.id,
            },
            Action::Read,
        )
        .extend_err()?;

        Ok(row.into())
    }
}

#[derive(Default)]
pub struct MemberMutation;

#[Object]
impl MemberMutation {
    /// Create the caller's member profile in `PENDING` state
    async fn provision_member_profile(
        &self,
        ctx: &Context<'_>,
        input: ProvisionMemberInput,
    ) -> Result<Member> {
        let state = ctx.data::<AppState>()?;
        let actor = current_actor(ctx).await.extend_err()?;
        let member = service::provision_member_profile(&state.db, &actor, input)
            .await
            .extend_err()?;
        Ok(member.into())
    }
}
