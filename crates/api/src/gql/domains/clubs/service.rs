use infra::models::{ClubRow, CoachRow};
use infra::repos::coaches::COACHES_IDENTITY_KEY;
use infra::repos::{clubs, coaches, CreateClub, CreateCoach};
use serde_json::json;
use sqlx::PgPool;

use crate::auth::permissions::require_admin;
use crate::auth::Actor;
use crate::gql::domains::audit_log::{self, AuditAction, AuditDraft, EntityType};
use crate::gql::error::{ConflictReason, DomainError, DomainResult, OptionExt};

use super::types::{AssignCoachInput, CreateClubInput};

pub(crate) fn required_text(value: &str, field: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub async fn create_club(
    pool: &PgPool,
    actor: &Actor,
    input: CreateClubInput,
) -> DomainResult<ClubRow> {
    require_admin(actor)?;
    let name = required_text(&input.name, "Club name")?;
    let sport_category = required_text(&input.sport_category, "Sport category")?;

    let mut tx = pool.begin().await?;
    let club = clubs::create(
        &mut *tx,
        CreateClub {
            name,
            sport_category,
        },
    )
    .await?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::ClubCreated,
            EntityType::Club,
            club.id,
            Some(club.id),
            json!({ "name": club.name, "sport_category": club.sport_category }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(club_id = %club.id, "club created");
    Ok(club)
}

pub async fn assign_coach(
    pool: &PgPool,
    actor: &Actor,
    input: AssignCoachInput,
) -> DomainResult<CoachRow> {
    require_admin(actor)?;
    let display_name = required_text(&input.display_name, "Display name")?;

    let mut tx = pool.begin().await?;
    clubs::get_by_id(&mut *tx, input.club_id)
        .await?
        .or_not_found()?;

    let coach = coaches::create(
        &mut *tx,
        CreateCoach {
            identity_id: input.identity_id,
            club_id: input.club_id,
            display_name,
        },
    )
    .await
    .map_err(|e| {
        DomainError::from_unique(e, COACHES_IDENTITY_KEY, ConflictReason::DuplicateCoach)
    })?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::CoachAssigned,
            EntityType::Coach,
            coach.id,
            Some(coach.club_id),
            json!({ "identity_id": coach.identity_id, "display_name": coach.display_name }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(coach_id = %coach.id, club_id = %coach.club_id, "coach assigned");
    Ok(coach)
}
