use async_graphql::Context;
use infra::repos::{coaches, members, ActorRole};
use uuid::Uuid;

use crate::auth::{Actor, Claims};
use crate::gql::error::{DomainError, DomainResult};
use crate::state::AppState;

/// Build the [`Actor`] for the authenticated caller.
///
/// Role and club come from the verified token; member and coach ids are resolved
/// from the profiles bound to the identity. A profile in a different club than the
/// token claims is ignored so it can never widen the caller's scope.
pub async fn current_actor(ctx: &Context<'_>) -> DomainResult<Actor> {
    let claims = ctx
        .data::<Claims>()
        .map_err(|_| DomainError::Unauthenticated)?;
    let state = ctx
        .data::<AppState>()
        .map_err(|_| DomainError::Unauthenticated)?;

    actor_from_claims(state, claims).await
}

pub async fn actor_from_claims(state: &AppState, claims: &Claims) -> DomainResult<Actor> {
    let identity_id = Uuid::parse_str(&claims.sub).map_err(|_| DomainError::Unauthenticated)?;
    let role: ActorRole = claims
        .role
        .parse()
        .map_err(|_| DomainError::Unauthenticated)?;
    let club_id = match claims.club_id.as_deref() {
        Some(raw) if !raw.is_empty() => {
            Some(Uuid::parse_str(raw).map_err(|_| DomainError::Unauthenticated)?)
        }
        _ => None,
    };

    let mut actor = Actor {
        identity_id,
        role,
        club_id,
        member_id: None,
        coach_id: None,
    };

    match role {
        ActorRole::Member => {
            if let Some(member) = members::get_by_identity(&state.db, identity_id).await? {
                if club_id.is_none() || club_id == Some(member.club_id) {
                    actor.club_id = Some(member.club_id);
                    actor.member_id = Some(member.id);
                }
            }
        }
        ActorRole::Coach => {
            if let Some(coach) = coaches::get_by_identity(&state.db, identity_id).await? {
                if club_id.is_none() || club_id == Some(coach.club_id) {
                    actor.club_id = Some(coach.club_id);
                    actor.coach_id = Some(coach.id);
                }
            }
        }
        ActorRole::Admin => {}
    }

    Ok(actor)
}

/// Administrators only.
pub fn require_admin(actor: &Actor) -> DomainResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}

/// The caller's member id, or `Forbidden` when the identity has no member profile.
pub fn require_member_id(actor: &Actor) -> DomainResult<Uuid> {
    match (actor.role, actor.member_id) {
        (ActorRole::Member, Some(member_id)) => Ok(member_id),
        _ => Err(DomainError::Forbidden),
    }
}
