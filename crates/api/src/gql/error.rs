//! Error taxonomy shared by every club operation.
//!
//! `Forbidden` and `NotFound` deliberately render the same message and code so a
//! caller cannot probe for entities outside their club. Everything else carries its
//! specific reason so the actor can correct the input.

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Message shown for both `Forbidden` and `NotFound`.
pub const NOT_AVAILABLE: &str = "Not available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidStateReason {
    AlreadyReviewed,
    AlreadyCheckedIn,
    CancellationWindowClosed,
    LeaveNoticeWindowClosed,
    SessionCancelled,
    MembershipInactive,
    NotAwaitingInfo,
    InfoAlreadyRequested,
    SessionStarted,
}

impl InvalidStateReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyReviewed => "ALREADY_REVIEWED",
            Self::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            Self::CancellationWindowClosed => "CANCELLATION_WINDOW_CLOSED",
            Self::LeaveNoticeWindowClosed => "LEAVE_NOTICE_WINDOW_CLOSED",
            Self::SessionCancelled => "SESSION_CANCELLED",
            Self::MembershipInactive => "MEMBERSHIP_INACTIVE",
            Self::NotAwaitingInfo => "NOT_AWAITING_INFO",
            Self::InfoAlreadyRequested => "INFO_ALREADY_REQUESTED",
            Self::SessionStarted => "SESSION_STARTED",
        }
    }
}

impl std::fmt::Display for InvalidStateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::AlreadyReviewed => "This request has already been reviewed",
            Self::AlreadyCheckedIn => "Attendance has already been recorded for this session",
            Self::CancellationWindowClosed => {
                "Sessions can only be cancelled more than 2 hours before they start"
            }
            Self::LeaveNoticeWindowClosed => {
                "Leave must be requested more than 2 hours before the session starts"
            }
            Self::SessionCancelled => "This session has been cancelled",
            Self::MembershipInactive => "Club membership is not active",
            Self::NotAwaitingInfo => "This application is not waiting for more information",
            Self::InfoAlreadyRequested => "More information has already been requested",
            Self::SessionStarted => "This session has already started",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    DuplicateApplication,
    DuplicateRequest,
    DuplicateMemberProfile,
    DuplicateCoach,
}

impl ConflictReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateApplication => "DUPLICATE_APPLICATION",
            Self::DuplicateRequest => "DUPLICATE_REQUEST",
            Self::DuplicateMemberProfile => "DUPLICATE_MEMBER_PROFILE",
            Self::DuplicateCoach => "DUPLICATE_COACH",
        }
    }
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::DuplicateApplication => "An application for this club is already pending",
            Self::DuplicateRequest => "A leave request for this session is already pending",
            Self::DuplicateMemberProfile => "A member profile already exists for this account",
            Self::DuplicateCoach => "A coach profile already exists for this account",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{}", NOT_AVAILABLE)]
    Forbidden,

    #[error("{}", NOT_AVAILABLE)]
    NotFound,

    #[error("{0}")]
    InvalidState(InvalidStateReason),

    #[error("{0}")]
    Conflict(ConflictReason),

    #[error("{0}")]
    Validation(String),

    #[error("Internal database error")]
    Database(#[from] sqlx::Error),
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Map a unique violation on `constraint` to `Conflict(reason)`.
    /// Anything else stays a database error.
    pub fn from_unique(err: sqlx::Error, constraint: &str, reason: ConflictReason) -> Self {
        if infra::db::is_unique_violation(&err, constraint) {
            DomainError::Conflict(reason)
        } else {
            DomainError::Database(err)
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Unauthenticated => "UNAUTHENTICATED",
            DomainError::Forbidden | DomainError::NotFound => "NOT_AVAILABLE",
            DomainError::InvalidState(_) => "INVALID_STATE",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::Database(_) => "INTERNAL",
        }
    }

    fn reason(&self) -> Option<&'static str> {
        match self {
            DomainError::InvalidState(r) => Some(r.code()),
            DomainError::Conflict(r) => Some(r.code()),
            _ => None,
        }
    }
}

impl ErrorExtensions for DomainError {
    fn extend(&self) -> async_graphql::Error {
        if let DomainError::Database(e) = self {
            // Log the real error server-side; clients only see the generic message
            tracing::error!("Database error: {e}");
        }
        let code = self.code();
        let reason = self.reason();
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", code);
            if let Some(reason) = reason {
                ext.set("reason", reason);
            }
        })
    }
}

/// Turn an optional row into `NotFound`.
pub trait OptionExt<T> {
    fn or_not_found(self) -> DomainResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self) -> DomainResult<T> {
        self.ok_or(DomainError::NotFound)
    }
}

/// Convert a domain result into a GraphQL result with `code`/`reason` extensions.
pub trait DomainResultExt<T> {
    fn extend_err(self) -> async_graphql::Result<T>;
}

impl<T> DomainResultExt<T> for DomainResult<T> {
    fn extend_err(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_and_not_found_are_indistinguishable() {
        let forbidden = DomainError::Forbidden.extend();
        let not_found = DomainError::NotFound.extend();

        assert_eq!(forbidden.message, not_found.message);
        assert_eq!(forbidden.message, NOT_AVAILABLE);
        assert_eq!(DomainError::Forbidden.code(), DomainError::NotFound.code());
    }

    #[test]
    fn invalid_state_carries_specific_reason() {
        let err = DomainError::InvalidState(InvalidStateReason::AlreadyReviewed);
        assert_eq!(err.code(), "INVALID_STATE");
        assert_eq!(err.to_string(), "This request has already been reviewed");

        let gql = err.extend();
        let ext = gql.extensions.expect("extensions set");
        assert!(ext.get("reason").is_some());
    }

    #[test]
    fn conflict_reasons_are_distinct_from_invalid_state() {
        let duplicate = DomainError::Conflict(ConflictReason::DuplicateRequest);
        let checked_in = DomainError::InvalidState(InvalidStateReason::AlreadyCheckedIn);
        assert_ne!(duplicate.code(), checked_in.code());
        assert_ne!(duplicate.to_string(), checked_in.to_string());
    }

    #[test]
    fn non_unique_errors_are_not_conflicts() {
        let err = DomainError::from_unique(
            sqlx::Error::RowNotFound,
            "leave_requests_one_pending",
            ConflictReason::DuplicateRequest,
        );
        assert!(matches!(err, DomainError::Database(_)));
    }

    #[test]
    fn database_errors_hide_details() {
        let err = DomainError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.to_string(), "Internal database error");
        assert_eq!(err.code(), "INTERNAL");
    }
}
