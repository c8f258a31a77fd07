use async_graphql::dataloader::DataLoader;
use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject, ID};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use infra::models::LeaveRequestRow;
use infra::repos::LeaveStatus as LeaveStatusRow;

use crate::gql::loaders::MemberLoader;
use crate::gql::types::Member;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum LeaveStatus {
    #[graphql(name = "PENDING")]
    Pending,
    #[graphql(name = "APPROVED")]
    Approved,
    #[graphql(name = "REJECTED")]
    Rejected,
}

impl From<LeaveStatusRow> for LeaveStatus {
    fn from(status: LeaveStatusRow) -> Self {
        match status {
            LeaveStatusRow::Pending => LeaveStatus::Pending,
            LeaveStatusRow::Approved => LeaveStatus::Approved,
            LeaveStatusRow::Rejected => LeaveStatus::Rejected,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum LeaveDecision {
    #[graphql(name = "APPROVE")]
    Approve,
    #[graphql(name = "REJECT")]
    Reject,
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct LeaveRequest {
    pub id: ID,
    pub session_id: ID,
    pub member_id: ID,
    pub club_id: ID,
    pub reason: String,
    pub status: LeaveStatus,
    pub requested_by: ID,
    pub reviewed_by: Option<ID>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LeaveRequestRow> for LeaveRequest {
    fn from(row: LeaveRequestRow) -> Self {
        Self {
            id: row.id.into(),
            session_id: row.session_id.into(),
            member_id: row.member_id.into(),
            club_id: row.club_id.into(),
            reason: row.reason,
            status: row.status.into(),
            requested_by: row.requested_by.into(),
            reviewed_by: row.reviewed_by.map(Into::into),
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[ComplexObject]
impl LeaveRequest {
    async fn member(&self, ctx: &Context<'_>) -> Result<Option<Member>> {
        let loader = ctx.data::<DataLoader<MemberLoader>>()?;
        let member_id = Uuid::parse_str(self.member_id.as_str())?;
        let row = loader.load_one(member_id).await?;
        Ok(row.map(Member::from))
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct RequestLeaveInput {
    pub session_id: Uuid,
    pub reason: String,
}

#[derive(InputObject, Clone, Debug)]
pub struct ReviewLeaveInput {
    pub request_id: Uuid,
    pub decision: LeaveDecision,
}
