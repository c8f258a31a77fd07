use async_graphql::MergedObject;

use crate::gql::domains::applications::ApplicationMutation;
use crate::gql::domains::attendance::AttendanceMutation;
use crate::gql::domains::clubs::ClubMutation;
use crate::gql::domains::leave_requests::LeaveRequestMutation;
use crate::gql::domains::members::MemberMutation;
use crate::gql::domains::sessions::SessionMutation;

#[derive(MergedObject, Default)]
pub struct MutationRoot(
    ApplicationMutation,
    AttendanceMutation,
    ClubMutation,
    LeaveRequestMutation,
    MemberMutation,
    SessionMutation,
);
