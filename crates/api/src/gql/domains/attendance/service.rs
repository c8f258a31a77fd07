use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use infra::models::AttendanceRecordRow;
use infra::repos::{
    attendance_records, members, training_sessions, AccessFlag, AttendanceCounts,
    AttendanceMethod, AttendanceStatus, SessionStatus, WriteAttendance,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::{authorize, Action, Resource};
use crate::auth::permissions::require_member_id;
use crate::auth::Actor;
use crate::gql::domains::audit_log::{self, AuditAction, AuditDraft, EntityType};
use crate::gql::error::{DomainError, DomainResult, InvalidStateReason, OptionExt};

use super::types::{AttendanceStats, MarkAttendanceInput};

/// Derive the statistics projection from raw ledger counts.
pub fn compute_stats(counts: AttendanceCounts) -> AttendanceStats {
    let attendance_rate = if counts.total_records == 0 {
        0.0
    } else {
        (counts.present_records as f64 / counts.total_records as f64 * 100.0).clamp(0.0, 100.0)
    };

    AttendanceStats {
        total_records: counts.total_records,
        total_attendance: counts.present_records,
        monthly_attendance: counts.present_in_month,
        attendance_rate,
    }
}

/// `[first day of month, first day of next month)` for the month containing `today`.
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.with_day(1).unwrap_or(today);
    let end = start
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// Coach (or administrator) records the outcome for one member of one session.
///
/// Upserts on `(session, member)`, so repeated marks converge on a single record.
/// The check-in time is never set here; only self check-in stamps it.
pub async fn mark_attendance(
    pool: &PgPool,
    actor: &Actor,
    input: MarkAttendanceInput,
) -> DomainResult<AttendanceRecordRow> {
    let mut tx = pool.begin().await?;
    let session = training_sessions::get_by_id(&mut *tx, input.session_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::Attendance {
            club_id: session.club_id,
            member_id: input.member_id,
            coach_id: session.coach_id,
        },
        Action::Write,
    )?;

    // A member of another club is reported exactly like a missing one
    let member = members::get_by_id(&mut *tx, input.member_id)
        .await?
        .filter(|m| m.club_id == session.club_id)
        .or_not_found()?;
    if session.status == SessionStatus::Cancelled {
        return Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled));
    }

    let previous =
        attendance_records::get_by_session_and_member(&mut *tx, session.id, member.id).await?;
    let status = AttendanceStatus::from(input.status);
    let notes = input
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let upserted = attendance_records::upsert(
        &mut *tx,
        WriteAttendance {
            session_id: session.id,
            member_id: member.id,
            club_id: session.club_id,
            status,
            check_in_time: None,
            method: AttendanceMethod::Coach,
            notes,
            recorded_by: Some(actor.identity_id),
        },
    )
    .await?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::AttendanceMarked,
            EntityType::Attendance,
            upserted.record.id,
            Some(upserted.record.club_id),
            json!({
                "session_id": session.id,
                "member_id": member.id,
                "old_status": previous.as_ref().map(|r| r.status.as_str()),
                "new_status": upserted.record.status.as_str(),
                "inserted": upserted.inserted,
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(
        session_id = %session.id,
        member_id = %member.id,
        status = status.as_str(),
        inserted = upserted.inserted,
        "attendance marked"
    );
    Ok(upserted.record)
}

/// Self-service check-in by an active member, stamped with the current time.
pub async fn check_in(
    pool: &PgPool,
    actor: &Actor,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> DomainResult<AttendanceRecordRow> {
    let member_id = require_member_id(actor)?;

    let mut tx = pool.begin().await?;
    let session = training_sessions::get_by_id(&mut *tx, session_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::Attendance {
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
    if session.status == SessionStatus::Cancelled {
        return Err(DomainError::InvalidState(InvalidStateReason::SessionCancelled));
    }

    let previous =
        attendance_records::get_by_session_and_member(&mut *tx, session.id, member_id).await?;
    let upserted = attendance_records::upsert(
        &mut *tx,
        WriteAttendance {
            session_id: session.id,
            member_id,
            club_id: session.club_id,
            status: AttendanceStatus::Present,
            check_in_time: Some(now),
            method: AttendanceMethod::SelfCheckIn,
            notes: None,
            recorded_by: Some(actor.identity_id),
        },
    )
    .await?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::AttendanceCheckedIn,
            EntityType::Attendance,
            upserted.record.id,
            Some(upserted.record.club_id),
            json!({
                "session_id": session.id,
                "member_id": member_id,
                "old_status": previous.as_ref().map(|r| r.status.as_str()),
                "new_status": upserted.record.status.as_str(),
                "check_in_time": now,
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(session_id = %session.id, member_id = %member_id, "member checked in");
    Ok(upserted.record)
}

pub async fn member_stats(
    pool: &PgPool,
    member_id: Uuid,
    today: NaiveDate,
) -> DomainResult<AttendanceStats> {
    let (month_start, month_end) = month_bounds(today);
    let counts =
        attendance_records::counts_for_member(pool, member_id, month_start, month_end).await?;
    Ok(compute_stats(counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(total: i64, present: i64, month: i64) -> AttendanceCounts {
        AttendanceCounts {
            total_records: total,
            present_records: present,
            present_in_month: month,
        }
    }

    #[test]
    fn no_records_means_zero_rate() {
        let stats = compute_stats(AttendanceCounts::default());
        assert_eq!(stats.total_attendance, 0);
        assert_eq!(stats.attendance_rate, 0.0);
    }

    #[test]
    fn rate_is_share_of_present_records() {
        let stats = compute_stats(counts(8, 6, 2));
        assert_eq!(stats.total_records, 8);
        assert_eq!(stats.total_attendance, 6);
        assert_eq!(stats.monthly_attendance, 2);
        assert_eq!(stats.attendance_rate, 75.0);
    }

    #[test]
    fn rate_stays_within_bounds() {
        for (total, present) in [(1, 1), (3, 0), (7, 3), (1000, 999)] {
            let rate = compute_stats(counts(total, present, 0)).attendance_rate;
            assert!((0.0..=100.0).contains(&rate), "{rate}");
        }
        // Inconsistent input still cannot escape the range
        assert_eq!(compute_stats(counts(2, 5, 0)).attendance_rate, 100.0);
    }

    #[test]
    fn month_bounds_cover_the_calendar_month() {
        let (start, end) = month_bounds(NaiveDate::from_ymd_opt(2025, 2, 17).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        let (start, end) = month_bounds(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }
}
