use async_graphql::{Enum, InputObject, OutputType, SimpleObject};
use infra::pagination::{LimitOffset, DEFAULT_PAGE_SIZE};
use infra::repos::ActorRole;

pub use crate::gql::domains::applications::types::{
    ApplicationActivityEntry, ApplicationFilterInput, ApplicationStatus, DocumentInput,
    DocumentKind, DocumentRef, MembershipApplication, PersonalInfo, PersonalInfoInput,
    ResubmitApplicationInput, ReviewApplicationInput, ReviewDecision, SubmitApplicationInput,
};
pub use crate::gql::domains::attendance::types::{
    AttendanceMethod, AttendanceRecord, AttendanceStats, AttendanceStatus, MarkAttendanceInput,
};
pub use crate::gql::domains::audit_log::types::{
    AuditLogEntry, AuditLogFilterInput, ChainVerification,
};
pub use crate::gql::domains::clubs::types::{AssignCoachInput, Club, Coach, CreateClubInput};
pub use crate::gql::domains::leave_requests::types::{
    LeaveDecision, LeaveRequest, LeaveStatus, RequestLeaveInput, ReviewLeaveInput,
};
pub use crate::gql::domains::members::types::{
    AccessFlag, Me, Member, MemberFilterInput, ProvisionMemberInput,
};
pub use crate::gql::domains::sessions::types::{
    CancelSessionInput, CreateSessionInput, SessionFilterInput, SessionStatus, TrainingSession,
    UpdateSessionInput,
};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub enum Role {
    #[graphql(name = "ADMIN")]
    Admin,
    #[graphql(name = "COACH")]
    Coach,
    #[graphql(name = "MEMBER")]
    Member,
}

impl From<ActorRole> for Role {
    fn from(role: ActorRole) -> Self {
        match role {
            ActorRole::Admin => Role::Admin,
            ActorRole::Coach => Role::Coach,
            ActorRole::Member => Role::Member,
        }
    }
}

#[derive(InputObject, Clone, Copy, Debug, Default)]
pub struct PaginationInput {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl PaginationInput {
    pub fn to_limit_offset(&self) -> LimitOffset {
        LimitOffset::new(
            self.limit.map_or(DEFAULT_PAGE_SIZE, i64::from),
            self.offset.unwrap_or(0) as i64,
        )
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(concrete(name = "PaginatedMembers", params(Member)))]
#[graphql(concrete(name = "PaginatedApplications", params(MembershipApplication)))]
#[graphql(concrete(name = "PaginatedSessions", params(TrainingSession)))]
#[graphql(concrete(name = "PaginatedAuditLog", params(AuditLogEntry)))]
pub struct PaginatedResponse<T: OutputType> {
    pub items: Vec<T>,
    pub total_count: i32,
    pub page_size: i32,
    pub offset: i32,
    pub has_next_page: bool,
}

impl<T: OutputType> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total_count: i64, page: LimitOffset) -> Self {
        let page_size = items.len() as i32;
        let offset = page.offset as i32;
        let total_count = total_count as i32;
        Self {
            items,
            total_count,
            page_size,
            offset,
            has_next_page: (offset + page_size) < total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let page = PaginationInput::default().to_limit_offset();
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset, 0);

        let page = PaginationInput {
            limit: Some(10_000),
            offset: Some(-3),
        }
        .to_limit_offset();
        assert_eq!(page.limit, infra::pagination::MAX_PAGE_SIZE);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn has_next_page_tracks_remaining_rows() {
        let page = LimitOffset::new(2, 0);
        let response = PaginatedResponse::new(vec![1, 2], 5, page);
        assert!(response.has_next_page);

        let page = LimitOffset::new(2, 4);
        let response = PaginatedResponse::new(vec![5], 5, page);
        assert!(!response.has_next_page);
    }
}
