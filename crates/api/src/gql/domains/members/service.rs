use infra::models::MemberRow;
use infra::repos::members::MEMBERS_IDENTITY_KEY;
use infra::repos::{clubs, members, ActorRole, CreateMember};
use serde_json::json;
use sqlx::PgPool;

use crate::auth::Actor;
use crate::gql::domains::audit_log::{self, AuditAction, AuditDraft, EntityType};
use crate::gql::domains::clubs::service::required_text;
use crate::gql::error::{ConflictReason, DomainError, DomainResult, OptionExt};

use super::types::ProvisionMemberInput;

/// A member identity creates its own profile. The profile always starts `pending`;
/// only an approved application activates it.
pub async fn provision_member_profile(
    pool: &PgPool,
    actor: &Actor,
    input: ProvisionMemberInput,
) -> DomainResult<MemberRow> {
    if actor.role != ActorRole::Member {
        return Err(DomainError::Forbidden);
    }
    if actor.member_id.is_some() {
        return Err(DomainError::Conflict(ConflictReason::DuplicateMemberProfile));
    }
    // A token bound to a club may only provision into that club
    if actor.club_id.is_some_and(|club_id| club_id != input.club_id) {
        return Err(DomainError::Forbidden);
    }
    let full_name = required_text(&input.full_name, "Full name")?;

    let mut tx = pool.begin().await?;
    clubs::get_by_id(&mut *tx, input.club_id)
        .await?
        .or_not_found()?;

    let member = members::create(
        &mut *tx,
        CreateMember {
            identity_id: actor.identity_id,
            club_id: input.club_id,
            full_name,
            email: input.email,
            phone: input.phone,
            health_notes: input.health_notes,
        },
    )
    .await
    .map_err(|e| {
        DomainError::from_unique(e, MEMBERS_IDENTITY_KEY, ConflictReason::DuplicateMemberProfile)
    })?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::MemberProvisioned,
            EntityType::Member,
            member.id,
            Some(member.club_id),
            json!({ "access_flag": member.access_flag.as_str() }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(member_id = %member.id, club_id = %member.club_id, "member profile provisioned");
    Ok(member)
}
