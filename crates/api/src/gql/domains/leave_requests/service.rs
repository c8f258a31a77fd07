use chrono::{DateTime, Utc};
use infra::models::{LeaveRequestRow, TrainingSessionRow};
use infra::repos::{
    attendance_records, leave_requests, members, training_sessions, AccessFlag, AttendanceMethod,
    AttendanceStatus, CreateLeaveRequest, LeaveStatus, SessionStatus, WriteAttendance,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::{authorize, Action, Resource};
use crate::auth::permissions::require_member_id;
use crate::auth::Actor;
use crate::gql::domains::audit_log::{self, AuditAction, AuditDraft, EntityType};
use crate::gql::domains::clubs::service::required_text;
use crate::gql::domains::sessions::service::starts_more_than;
use crate::gql::error::{ConflictReason, DomainError, DomainResult, InvalidStateReason, OptionExt};

use super::types::{LeaveDecision, RequestLeaveInput};

/// Leave must be requested while more than this many hours remain before the session.
pub const LEAVE_NOTICE_HOURS: i64 = 2;

/// State checks for a new leave request, in the order they are reported.
///
/// An existing attendance record wins over the notice window so that a member who
/// already checked in is told so, even right before the start.
pub fn check_leave_request(
    session: &TrainingSessionRow,
    now: DateTime<Utc>,
    has_attendance: bool,
    has_pending: bool,
) -> DomainResult<()> {
    if session.status == SessionStatus::Cancelled {
        return Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled));
    }
    if has_attendance {
        return Err(DomainError::InvalidState(InvalidStateReason::AlreadyCheckedIn));
    }
    if has_pending {
        return Err(DomainError::Conflict(ConflictReason::DuplicateRequest));
    }
    if !starts_more_than(session, now, LEAVE_NOTICE_HOURS) {
        return Err(DomainError::InvalidState(
            InvalidStateReason::LeaveNoticeWindowClosed,
        ));
    }
    Ok(())
}

/// A request is decided once. Requests against a cancelled session can only be rejected.
pub fn check_leave_review(
    current: LeaveStatus,
    session: &TrainingSessionRow,
    decision: LeaveDecision,
) -> DomainResult<()> {
    if current != LeaveStatus::Pending {
        return Err(DomainError::InvalidState(InvalidStateReason::AlreadyReviewed));
    }
    if decision == LeaveDecision::Approve && session.status == SessionStatus::Cancelled {
        return Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled));
    }
    Ok(())
}

fn decision_status(decision: LeaveDecision) -> (LeaveStatus, AuditAction) {
    match decision {
        LeaveDecision::Approve => (LeaveStatus::Approved, AuditAction::LeaveApproved),
        LeaveDecision::Reject => (LeaveStatus::Rejected, AuditAction::LeaveRejected),
    }
}

pub async fn request_leave(
    pool: &PgPool,
    actor: &Actor,
    input: RequestLeaveInput,
    now: DateTime<Utc>,
) -> DomainResult<LeaveRequestRow> {
    let member_id = require_member_id(actor)?;
    let reason = required_text(&input.reason, "Reason")?;

    let mut tx = pool.begin().await?;
    let session = training_sessions::get_for_update(&mut *tx, input.session_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::LeaveRequest {
            club_id: session.club_id,
            member_id,
            coach_id: session.coach_id,
        },
        Action::Write,
    )?;

    let member = members::get_by_id(&mut *tx, member_id)
        .await?
        .or_not_found()?;
    if member.access_flag != AccessFlag::Active {
        return Err(DomainError::InvalidState(InvalidStateReason::MembershipInactive));
    }

    let has_attendance =
        attendance_records::get_by_session_and_member(&mut *tx, session.id, member_id)
            .await?
            .is_some();
    let has_pending = leave_requests::find_pending(&mut *tx, session.id, member_id)
        .await?
        .is_some();
    check_leave_request(&session, now, has_attendance, has_pending)?;

    let request = leave_requests::create(
        &mut *tx,
        CreateLeaveRequest {
            session_id: session.id,
            member_id,
            club_id: session.club_id,
            reason,
            requested_by: actor.identity_id,
        },
    )
    .await
    .map_err(|e| {
        DomainError::from_unique(
            e,
            leave_requests::ONE_PENDING_LEAVE_INDEX,
            ConflictReason::DuplicateRequest,
        )
    })?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::LeaveRequested,
            EntityType::LeaveRequest,
            request.id,
            Some(request.club_id),
            json!({
                "session_id": session.id,
                "member_id": member_id,
                "new_status": request.status.as_str(),
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(request_id = %request.id, session_id = %session.id, "leave requested");
    Ok(request)
}

/// Approve or reject a pending request. Approval writes an excused record unless the
/// member already has one for the session.
pub async fn review_leave(
    pool: &PgPool,
    actor: &Actor,
    request_id: Uuid,
    decision: LeaveDecision,
    now: DateTime<Utc>,
) -> DomainResult<LeaveRequestRow> {
    let mut tx = pool.begin().await?;
    let current = leave_requests::get_for_update(&mut *tx, request_id)
        .await?
        .or_not_found()?;
    let session = training_sessions::get_for_update(&mut *tx, current.session_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::LeaveRequest {
            club_id: current.club_id,
            member_id: current.member_id,
            coach_id: session.coach_id,
        },
        Action::Review,
    )?;
    check_leave_review(current.status, &session, decision)?;

    let (status, action) = decision_status(decision);
    let decided =
        leave_requests::decide(&mut *tx, current.id, status, actor.identity_id, now).await?;

    let attendance_created = if status == LeaveStatus::Approved {
        attendance_records::insert_if_absent(
            &mut *tx,
            WriteAttendance {
                session_id: session.id,
                member_id: decided.member_id,
                club_id: decided.club_id,
                status: AttendanceStatus::Excused,
                check_in_time: None,
                method: AttendanceMethod::LeaveApproval,
                notes: Some(format!("Leave approved: {}", decided.reason)),
                recorded_by: Some(actor.identity_id),
            },
        )
        .await?
        .is_some()
    } else {
        false
    };

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            action,
            EntityType::LeaveRequest,
            decided.id,
            Some(decided.club_id),
            json!({
                "session_id": session.id,
                "member_id": decided.member_id,
                "old_status": current.status.as_str(),
                "new_status": decided.status.as_str(),
                "attendance_created": attendance_created,
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(
        request_id = %decided.id,
        status = decided.status.as_str(),
        attendance_created,
        "leave request reviewed"
    );
    Ok(decided)
}
