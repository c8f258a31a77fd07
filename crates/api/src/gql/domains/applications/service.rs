//! Membership application lifecycle.
//!
//! ```text
//! pending ──approve──▶ approved
//!    │  └──reject───▶ rejected
//!    └──request info──▶ info_requested ──resubmit──▶ pending
//! ```
//!
//! `approved` and `rejected` are terminal. Approval is the only place in the service
//! that activates a member's access flag.

use chrono::{DateTime, Utc};
use infra::models::{
    ApplicationActivity, ApplicationActivityKind, DocumentRef, MembershipApplicationRow,
    PersonalInfo,
};
use infra::repos::membership_applications::ONE_OPEN_APPLICATION_INDEX;
use infra::repos::{
    members, membership_applications, AccessFlag, ApplicationStatus, ApplicationTransition,
    CreateApplication,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::{authorize, Action, Resource};
use crate::auth::permissions::require_member_id;
use crate::auth::Actor;
use crate::gql::domains::audit_log::{self, AuditAction, AuditDraft, EntityType};
use crate::gql::error::{ConflictReason, DomainError, DomainResult, InvalidStateReason, OptionExt};

use super::types::{ResubmitApplicationInput, ReviewDecision, SubmitApplicationInput};

pub const MAX_DOCUMENTS: usize = 10;
pub const MAX_DOCUMENT_BYTES: i64 = 10 * 1024 * 1024;

pub fn validate_personal_info(info: &PersonalInfo) -> DomainResult<()> {
    if info.full_name.trim().is_empty() {
        return Err(DomainError::validation("Full name must not be empty"));
    }
    Ok(())
}

pub fn validate_documents(documents: &[DocumentRef]) -> DomainResult<()> {
    if documents.len() > MAX_DOCUMENTS {
        return Err(DomainError::validation(format!(
            "At most {MAX_DOCUMENTS} documents may be attached"
        )));
    }
    for doc in documents {
        if doc.url.trim().is_empty() || doc.file_name.trim().is_empty() {
            return Err(DomainError::validation(
                "Documents need both a url and a file name",
            ));
        }
        if doc.file_size <= 0 || doc.file_size > MAX_DOCUMENT_BYTES {
            return Err(DomainError::validation(format!(
                "{} must be between 1 byte and 10 MiB",
                doc.file_name
            )));
        }
    }
    Ok(())
}

fn non_empty(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Outcome of a review decision before anything is written.
#[derive(Debug, Clone)]
pub struct ReviewPlan {
    pub transition: ApplicationTransition,
    pub action: AuditAction,
    /// Set when the member's access flag must become `active`.
    pub activate_member: bool,
}

pub fn plan_review(
    current: ApplicationStatus,
    decision: ReviewDecision,
    notes: Option<&str>,
    reviewer: Uuid,
    now: DateTime<Utc>,
) -> DomainResult<ReviewPlan> {
    if current.is_terminal() {
        return Err(DomainError::InvalidState(InvalidStateReason::AlreadyReviewed));
    }
    let notes = non_empty(notes);

    let activity = |kind: ApplicationActivityKind| ApplicationActivity {
        at: now,
        actor_id: reviewer,
        kind,
        note: notes.clone(),
    };

    let plan = match decision {
        ReviewDecision::Approve => ReviewPlan {
            transition: ApplicationTransition {
                status: ApplicationStatus::Approved,
                reviewed_by: Some(reviewer),
                reviewed_at: Some(now),
                review_notes: notes.clone(),
                activity: activity(ApplicationActivityKind::Approved),
            },
            action: AuditAction::ApplicationApproved,
            activate_member: true,
        },
        ReviewDecision::Reject => {
            if notes.is_none() {
                return Err(DomainError::validation("A rejection reason is required"));
            }
            ReviewPlan {
                transition: ApplicationTransition {
                    status: ApplicationStatus::Rejected,
                    reviewed_by: Some(reviewer),
                    reviewed_at: Some(now),
                    review_notes: notes.clone(),
                    activity: activity(ApplicationActivityKind::Rejected),
                },
                action: AuditAction::ApplicationRejected,
                activate_member: false,
            }
        }
        ReviewDecision::RequestInfo => {
            if current != ApplicationStatus::Pending {
                return Err(DomainError::InvalidState(
                    InvalidStateReason::InfoAlreadyRequested,
                ));
            }
            if notes.is_none() {
                return Err(DomainError::validation(
                    "Say what information is missing",
                ));
            }
            // Review metadata is reserved for final decisions
            ReviewPlan {
                transition: ApplicationTransition {
                    status: ApplicationStatus::InfoRequested,
                    reviewed_by: None,
                    reviewed_at: None,
                    review_notes: None,
                    activity: activity(ApplicationActivityKind::InfoRequested),
                },
                action: AuditAction::ApplicationInfoRequested,
                activate_member: false,
            }
        }
    };

    Ok(plan)
}

pub async fn submit(
    pool: &PgPool,
    actor: &Actor,
    input: SubmitApplicationInput,
    now: DateTime<Utc>,
) -> DomainResult<MembershipApplicationRow> {
    let member_id = require_member_id(actor)?;
    authorize(
        actor,
        &Resource::Application {
            club_id: input.club_id,
            member_id,
        },
        Action::Write,
    )?;

    let personal_info = PersonalInfo::from(input.personal_info);
    let documents: Vec<DocumentRef> = input.documents.into_iter().map(Into::into).collect();
    validate_personal_info(&personal_info)?;
    validate_documents(&documents)?;

    let mut tx = pool.begin().await?;
    // Serializes concurrent submissions by the same member
    members::get_for_update(&mut *tx, member_id)
        .await?
        .or_not_found()?;

    if membership_applications::find_open(&mut *tx, member_id, input.club_id)
        .await?
        .is_some()
    {
        return Err(DomainError::Conflict(ConflictReason::DuplicateApplication));
    }

    let document_count = documents.len();
    let application = membership_applications::create(
        &mut *tx,
        CreateApplication {
            member_id,
            club_id: input.club_id,
            personal_info,
            documents,
            first_activity: ApplicationActivity {
                at: now,
                actor_id: actor.identity_id,
                kind: ApplicationActivityKind::Submitted,
                note: None,
            },
        },
    )
    .await
    .map_err(|e| {
        DomainError::from_unique(
            e,
            ONE_OPEN_APPLICATION_INDEX,
            ConflictReason::DuplicateApplication,
        )
    })?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::ApplicationSubmitted,
            EntityType::Application,
            application.id,
            Some(application.club_id),
            json!({
                "member_id": member_id,
                "old_status": null,
                "new_status": application.status.as_str(),
                "document_count": document_count,
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(
        application_id = %application.id,
        member_id = %member_id,
        club_id = %application.club_id,
        "membership application submitted"
    );
    Ok(application)
}

pub async fn review(
    pool: &PgPool,
    actor: &Actor,
    application_id: Uuid,
    decision: ReviewDecision,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> DomainResult<MembershipApplicationRow> {
    let mut tx = pool.begin().await?;

    // The row lock makes a concurrent second reviewer wait, then see the terminal status
    let current = membership_applications::get_for_update(&mut *tx, application_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::Application {
            club_id: current.club_id,
            member_id: current.member_id,
        },
        Action::Review,
    )?;

    let plan = plan_review(
        current.status,
        decision,
        notes.as_deref(),
        actor.identity_id,
        now,
    )?;

    let updated =
        membership_applications::apply_transition(&mut *tx, application_id, plan.transition)
            .await?;

    let mut access_flag = None;
    if plan.activate_member {
        let member = members::get_for_update(&mut *tx, current.member_id)
            .await?
            .or_not_found()?;
        if member.access_flag != AccessFlag::Active {
            members::set_access_flag(&mut *tx, member.id, AccessFlag::Active).await?;
            access_flag = Some((member.access_flag, AccessFlag::Active));
        }
    }

    let access_change = access_flag.map(|(from, to)| {
        json!({ "from": from.as_str(), "to": to.as_str() })
    });
    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            plan.action,
            EntityType::Application,
            updated.id,
            Some(updated.club_id),
            json!({
                "member_id": updated.member_id,
                "old_status": current.status.as_str(),
                "new_status": updated.status.as_str(),
                "notes": updated.review_notes.clone().or(notes),
                "access_flag": access_change,
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(
        application_id = %updated.id,
        old_status = current.status.as_str(),
        new_status = updated.status.as_str(),
        "membership application reviewed"
    );
    Ok(updated)
}

pub async fn resubmit(
    pool: &PgPool,
    actor: &Actor,
    input: ResubmitApplicationInput,
    now: DateTime<Utc>,
) -> DomainResult<MembershipApplicationRow> {
    let member_id = require_member_id(actor)?;

    let mut tx = pool.begin().await?;
    let current = membership_applications::get_for_update(&mut *tx, input.application_id)
        .await?
        .or_not_found()?;
    authorize(
        actor,
        &Resource::Application {
            club_id: current.club_id,
            member_id: current.member_id,
        },
        Action::Write,
    )?;
    if current.member_id != member_id {
        return Err(DomainError::Forbidden);
    }
    if current.status != ApplicationStatus::InfoRequested {
        return Err(DomainError::InvalidState(InvalidStateReason::NotAwaitingInfo));
    }

    let personal_info = PersonalInfo::from(input.personal_info);
    let documents: Vec<DocumentRef> = input.documents.into_iter().map(Into::into).collect();
    validate_personal_info(&personal_info)?;
    validate_documents(&documents)?;

    let document_count = documents.len();
    let updated = membership_applications::resubmit(
        &mut *tx,
        current.id,
        personal_info,
        documents,
        ApplicationActivity {
            at: now,
            actor_id: actor.identity_id,
            kind: ApplicationActivityKind::Resubmitted,
            note: None,
        },
    )
    .await
    .map_err(|e| {
        DomainError::from_unique(
            e,
            ONE_OPEN_APPLICATION_INDEX,
            ConflictReason::DuplicateApplication,
        )
    })?;

    let entry = audit_log::record(
        &mut *tx,
        AuditDraft::new(
            actor,
            AuditAction::ApplicationResubmitted,
            EntityType::Application,
            updated.id,
            Some(updated.club_id),
            json!({
                "member_id": member_id,
                "old_status": current.status.as_str(),
                "new_status": updated.status.as_str(),
                "document_count": document_count,
            }),
        ),
    )
    .await?;
    audit_log::commit_and_publish(tx, &entry).await?;

    tracing::info!(application_id = %updated.id, "membership application resubmitted");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use infra::models::DocumentKind;

    fn doc(size: i64) -> DocumentRef {
        DocumentRef {
            kind: DocumentKind::MedicalCertificate,
            url: "https://files.example.org/cert.pdf".into(),
            file_name: "cert.pdf".into(),
            file_size: size,
        }
    }

    #[test]
    fn approval_stamps_review_metadata_and_activates() {
        let reviewer = Uuid::new_v4();
        let now = Utc::now();
        let plan = plan_review(
            ApplicationStatus::Pending,
            ReviewDecision::Approve,
            Some("Welcome aboard"),
            reviewer,
            now,
        )
        .unwrap();

        assert_eq!(plan.transition.status, ApplicationStatus::Approved);
        assert_eq!(plan.transition.reviewed_by, Some(reviewer));
        assert_eq!(plan.transition.reviewed_at, Some(now));
        assert_eq!(plan.transition.review_notes.as_deref(), Some("Welcome aboard"));
        assert_eq!(plan.action, AuditAction::ApplicationApproved);
        assert!(plan.activate_member);
    }

    #[test]
    fn info_requested_applications_can_still_be_decided() {
        let plan = plan_review(
            ApplicationStatus::InfoRequested,
            ReviewDecision::Approve,
            None,
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(plan.transition.status, ApplicationStatus::Approved);
    }

    #[test]
    fn rejection_requires_reason_and_never_activates() {
        let err = plan_review(
            ApplicationStatus::Pending,
            ReviewDecision::Reject,
            Some("   "),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let plan = plan_review(
            ApplicationStatus::Pending,
            ReviewDecision::Reject,
            Some("Medical certificate expired"),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(plan.transition.status, ApplicationStatus::Rejected);
        assert!(plan.transition.reviewed_at.is_some());
        assert!(!plan.activate_member);
    }

    #[test]
    fn terminal_applications_report_already_reviewed() {
        for status in [ApplicationStatus::Approved, ApplicationStatus::Rejected] {
            for decision in [
                ReviewDecision::Approve,
                ReviewDecision::Reject,
                ReviewDecision::RequestInfo,
            ] {
                let err = plan_review(status, decision, Some("note"), Uuid::new_v4(), Utc::now())
                    .unwrap_err();
                assert!(matches!(
                    err,
                    DomainError::InvalidState(InvalidStateReason::AlreadyReviewed)
                ));
            }
        }
    }

    #[test]
    fn request_info_leaves_review_metadata_empty() {
        let plan = plan_review(
            ApplicationStatus::Pending,
            ReviewDecision::RequestInfo,
            Some("Please attach a photo"),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(plan.transition.status, ApplicationStatus::InfoRequested);
        assert!(plan.transition.reviewed_by.is_none());
        assert!(plan.transition.reviewed_at.is_none());
        assert_eq!(
            plan.transition.activity.note.as_deref(),
            Some("Please attach a photo")
        );

        let err = plan_review(
            ApplicationStatus::InfoRequested,
            ReviewDecision::RequestInfo,
            Some("again"),
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidState(InvalidStateReason::InfoAlreadyRequested)
        ));
    }

    #[test]
    fn document_limits() {
        assert!(validate_documents(&[doc(1), doc(MAX_DOCUMENT_BYTES)]).is_ok());
        assert!(validate_documents(&[doc(0)]).is_err());
        assert!(validate_documents(&[doc(MAX_DOCUMENT_BYTES + 1)]).is_err());
        assert!(validate_documents(&vec![doc(10); MAX_DOCUMENTS + 1]).is_err());

        let mut nameless = doc(10);
        nameless.file_name = " ".into();
        assert!(validate_documents(&[nameless]).is_err());
    }

    #[test]
    fn personal_info_needs_a_name() {
        let info = PersonalInfo {
            full_name: "".into(),
            date_of_birth: None,
            phone: None,
            email: None,
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            health_notes: None,
        };
        assert!(validate_personal_info(&info).is_err());
        assert!(validate_personal_info(&PersonalInfo {
            full_name: "Ana Lima".into(),
            ..info
        })
        .is_ok());
    }
}
