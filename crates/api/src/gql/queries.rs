use async_graphql::MergedObject;

use crate::gql::domains::applications::ApplicationQuery;
use crate::gql::domains::attendance::AttendanceQuery;
use crate::gql::domains::audit_log::AuditLogQuery;
use crate::gql::domains::clubs::ClubQuery;
use crate::gql::domains::leave_requests::LeaveRequestQuery;
use crate::gql::domains::members::MemberQuery;
use crate::gql::domains::sessions::SessionQuery;

#[derive(MergedObject, Default)]
pub struct QueryRoot(
    ApplicationQuery,
    AttendanceQuery,
    AuditLogQuery,
    ClubQuery,
    LeaveRequestQuery,
    MemberQuery,
    SessionQuery,
);
