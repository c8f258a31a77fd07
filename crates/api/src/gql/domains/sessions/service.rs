use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use infra::models::TrainingSessionRow;
use infra::repos::{
    coaches, training_sessions, ActorRole, CreateSessionData, SessionStatus, UpdateSessionData,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::{authorize, Action, Resource};
use crate::auth::Actor;
use crate::gql::domains::audit_log::{self, AuditAction, AuditDraft, EntityType};
use crate::gql::domains::clubs::service::required_text;
use crate::gql::error::{DomainError, DomainResult, InvalidStateReason, OptionExt};

use super::types::{CancelSessionInput, CreateSessionInput, UpdateSessionInput};

/// Sessions can only be cancelled while more than this many hours remain before the start.
pub const CANCELLATION_LEAD_HOURS: i64 = 2;

/// True when strictly more than `hours` remain between `now` and the session start.
pub fn starts_more_than(session: &TrainingSessionRow, now: DateTime<Utc>, hours: i64) -> bool {
    session.starts_at() - now > Duration::hours(hours)
}

pub fn validate_schedule(
    session_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    today: NaiveDate,
) -> DomainResult<()> {
    if start_time >= end_time {
        return Err(DomainError::validation("Start time must be before end time"));
    }
    if session_date < today {
        return Err(DomainError::validation("Session date cannot be in the past"));
    }
    Ok(())
}

pub fn ensure_editable(session: &TrainingSessionRow, now: DateTime<Utc>) -> DomainResult<()> {
    if session.status == SessionStatus::Cancelled {
        return Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled));
    }
    if session.starts_at() <= now {
        return Err(DomainError::InvalidState(InvalidStateReason::SessionStarted));
    }
    Ok(())
}

pub fn ensure_cancellable(session: &TrainingSessionRow, now: DateTime<Utc>) -> DomainResult<()> {
    if session.status == SessionStatus::Cancelled {
        return Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled));
    }
    if !starts_more_than(session, now, CANCELLATION_LEAD_HOURS) {
        return Err(DomainError::InvalidState(
            InvalidStateReason::CancellationWindowClosed,
        ));
    }
    Ok(())
}

/// Coach who will own a new session. Coaches always own what they create.
pub fn resolve_owner(actor: &Actor, requested: Option<Uuid>) -> DomainResult<Uuid> {
    match actor.role {
        ActorRole::Coach => {
            let own = actor.coach_id.ok_or(DomainError::Forbidden)?;
            match requested {
                Some(coach_id) if coach_id != own => Err(DomainError::Forbidden),
                _ => Ok(own),
            }
        }
        ActorRole::Admin => {
            requested.ok_or_else(|| DomainError::validation("coachId is required"))
        }
        ActorRole::Member => Err(DomainError::Forbidden),
    }
}

fn schedule_json(session: &TrainingSessionRow) -> serde_json::Value {
    json!({
        "title": session.title,
        "session_date": session.session_date,
        "start_time": session.start_time,
        "end_time": session.end_time,
        "location": session.location,
    })
}

pub async fn create_session(
    pool: &PgPool,
    actor: &Actor,
    input: CreateSessionInput,
    now: DateTime<Utc>,
) -> DomainResult<TrainingSessionRow> {
    let coach_id = resolve_owner(actor, input.coach_id)?;
    authorize(
        actor,
        &Resource::Session {
            club_id: input.club_id,
            coach_id,
        },
        Action::Write,
    )?;

    let title = required_text(&input.title, "Title")?;
    validate_schedule(
        input.session_date,
        input.start_time,
        input.end_time,
        now.date_naive(),
    )?;

    let mut tx = pool.begin().await?;
    let coach = coaches::get_by_id(&mut *tx, coach_id)
        .await?
        .or_not_found()?;
    if coach.club_id != input.club_id {
        return Err(DomainError::NotFound);
    }

    let session = training_sessions::create(
        &mut *tx,
        CreateSessionData {
            club_id: input.club_id,
            coach_id,
            title,
            session_date: input.session_date,
            start_time: input.start_time,
            end_time: input.end_time,
            location: input.location,
        },
    )
    .await?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::SessionCreated,
            EntityType::Session,
            session.id,
            Some(session.club_id),
            json!({ "coach_id": coach_id, "schedule": schedule_json(&session) }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(
        session_id = %session.id,
        club_id = %session.club_id,
        "training session created"
    );
    Ok(session)
}

pub async fn update_session(
    pool: &PgPool,
    actor: &Actor,
    input: UpdateSessionInput,
    now: DateTime<Utc>,
) -> DomainResult<TrainingSessionRow> {
    let mut tx = pool.begin().await?;
    let current = training_sessions::get_for_update(&mut *tx, input.session_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::Session {
            club_id: current.club_id,
            coach_id: current.coach_id,
        },
        Action::Write,
    )?;
    ensure_editable(&current, now)?;

    let title = required_text(&input.title, "Title")?;
    validate_schedule(
        input.session_date,
        input.start_time,
        input.end_time,
        now.date_naive(),
    )?;

    let updated = training_sessions::update(
        &mut *tx,
        current.id,
        UpdateSessionData {
            title,
            session_date: input.session_date,
            start_time: input.start_time,
            end_time: input.end_time,
            location: input.location,
        },
    )
    .await?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::SessionUpdated,
            EntityType::Session,
            updated.id,
            Some(updated.club_id),
            json!({ "before": schedule_json(&current), "after": schedule_json(&updated) }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(session_id = %updated.id, "training session updated");
    Ok(updated)
}

pub async fn cancel_session(
    pool: &PgPool,
    actor: &Actor,
    input: CancelSessionInput,
    now: DateTime<Utc>,
) -> DomainResult<TrainingSessionRow> {
    let mut tx = pool.begin().await?;
    let current = training_sessions::get_for_update(&mut *tx, input.session_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::Session {
            club_id: current.club_id,
            coach_id: current.coach_id,
        },
        Action::Write,
    )?;
    ensure_cancellable(&current, now)?;

    let reason = input
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let cancelled = training_sessions::cancel(&mut *tx, current.id, reason.clone()).await?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::SessionCancelled,
            EntityType::Session,
            cancelled.id,
            Some(cancelled.club_id),
            json!({
                "old_status": current.status.as_str(),
                "new_status": cancelled.status.as_str(),
                "reason": reason,
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(session_id = %cancelled.id, "training session cancelled");
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_at(start: DateTime<Utc>) -> TrainingSessionRow {
        let end = start + Duration::hours(1);
        TrainingSessionRow {
            id: Uuid::new_v4(),
            club_id: Uuid::new_v4(),
            coach_id: Uuid::new_v4(),
            title: "Sprint drills".into(),
            session_date: start.date_naive(),
            start_time: start.time(),
            end_time: end.time(),
            location: Some("Track 2".into()),
            status: SessionStatus::Scheduled,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: start - Duration::days(7),
            updated_at: start - Duration::days(7),
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn cancellation_needs_more_than_two_hours() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let session = session_at(start);

        let err = ensure_cancellable(&session, start - Duration::minutes(90)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidState(InvalidStateReason::CancellationWindowClosed)
        ));
        assert!(ensure_cancellable(&session, start - Duration::hours(2)).is_err());
        assert!(ensure_cancellable(&session, start - Duration::hours(3)).is_ok());
    }

    #[test]
    fn cancelled_sessions_stay_cancelled() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let mut session = session_at(start);
        session.status = SessionStatus::Cancelled;

        let now = start - Duration::days(1);
        assert!(matches!(
            ensure_cancellable(&session, now),
            Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled))
        ));
        assert!(matches!(
            ensure_editable(&session, now),
            Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled))
        ));
    }

    #[test]
    fn started_sessions_cannot_be_edited() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let session = session_at(start);
        assert!(ensure_editable(&session, start - Duration::minutes(5)).is_ok());
        assert!(matches!(
            ensure_editable(&session, start),
            Err(DomainError::InvalidState(InvalidStateReason::SessionStarted))
        ));
    }

    #[test]
    fn schedule_validation() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(validate_schedule(today, t(10, 0), t(11, 0), today).is_ok());
        assert!(validate_schedule(today, t(11, 0), t(11, 0), today).is_err());
        assert!(validate_schedule(today, t(12, 0), t(11, 0), today).is_err());

        let yesterday = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let err = validate_schedule(yesterday, t(10, 0), t(11, 0), today).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("past")));
    }

    #[test]
    fn coaches_own_what_they_create() {
        let coach_id = Uuid::new_v4();
        let coach = Actor {
            identity_id: Uuid::new_v4(),
            role: ActorRole::Coach,
            club_id: Some(Uuid::new_v4()),
            member_id: None,
            coach_id: Some(coach_id),
        };
        assert_eq!(resolve_owner(&coach, None).unwrap(), coach_id);
        assert_eq!(resolve_owner(&coach, Some(coach_id)).unwrap(), coach_id);
        assert!(resolve_owner(&coach, Some(Uuid::new_v4())).is_err());

        let admin = Actor {
            role: ActorRole::Admin,
            club_id: None,
            coach_id: None,
            ..coach
        };
        assert!(matches!(
            resolve_owner(&admin, None),
            Err(DomainError::Validation(_))
        ));
        let named = Uuid::new_v4();
        assert_eq!(resolve_owner(&admin, Some(named)).unwrap(), named);
    }
}
