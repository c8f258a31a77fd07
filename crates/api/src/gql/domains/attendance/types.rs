use async_graphql::dataloader::DataLoader;
use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject, ID};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use infra::models::AttendanceRecordRow;
use infra::repos::{
    AttendanceMethod as AttendanceMethodRow, AttendanceStatus as AttendanceStatusRow,
};

use crate::gql::loaders::MemberLoader;
use crate::gql::types::Member;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum AttendanceStatus {
    #[graphql(name = "PRESENT")]
    Present,
    #[graphql(name = "ABSENT")]
    Absent,
    #[graphql(name = "LATE")]
    Late,
    #[graphql(name = "EXCUSED")]
    Excused,
}

impl From<AttendanceStatusRow> for AttendanceStatus {
    fn from(status: AttendanceStatusRow) -> Self {
        match status {
            AttendanceStatusRow::Present => AttendanceStatus::Present,
            AttendanceStatusRow::Absent => AttendanceStatus::Absent,
            AttendanceStatusRow::Late => AttendanceStatus::Late,
            AttendanceStatusRow::Excused => AttendanceStatus::Excused,
        }
    }
}

impl From<AttendanceStatus> for AttendanceStatusRow {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Present => AttendanceStatusRow::Present,
            AttendanceStatus::Absent => AttendanceStatusRow::Absent,
            AttendanceStatus::Late => AttendanceStatusRow::Late,
            AttendanceStatus::Excused => AttendanceStatusRow::Excused,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum AttendanceMethod {
    #[graphql(name = "COACH")]
    Coach,
    #[graphql(name = "SELF_CHECK_IN")]
    SelfCheckIn,
    #[graphql(name = "LEAVE_APPROVAL")]
    LeaveApproval,
}

impl From<AttendanceMethodRow> for AttendanceMethod {
    fn from(method: AttendanceMethodRow) -> Self {
        match method {
            AttendanceMethodRow::Coach => AttendanceMethod::Coach,
            AttendanceMethodRow::SelfCheckIn => AttendanceMethod::SelfCheckIn,
            AttendanceMethodRow::LeaveApproval => AttendanceMethod::LeaveApproval,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct AttendanceRecord {
    pub id: ID,
    pub session_id: ID,
    pub member_id: ID,
    pub club_id: ID,
    pub status: AttendanceStatus,
    pub check_in_time: Option<DateTime<Utc>>,
    pub method: AttendanceMethod,
    pub notes: Option<String>,
    pub recorded_by: Option<ID>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AttendanceRecordRow> for AttendanceRecord {
    fn from(row: AttendanceRecordRow) -> Self {
        Self {
            id: row.id.into(),
            session_id: row.session_id.into(),
            member_id: row.member_id.into(),
            club_id: row.club_id.into(),
            status: row.status.into(),
            check_in_time: row.check_in_time,
            method: row.method.into(),
            notes: row.notes,
            recorded_by: row.recorded_by.map(Into::into),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[ComplexObject]
impl AttendanceRecord {
    async fn member(&self, ctx: &Context<'_>) -> Result<Option<Member>> {
        let loader = ctx.data::<DataLoader<MemberLoader>>()?;
        let member_id = Uuid::parse_str(self.member_id.as_str())?;
        let row = loader.load_one(member_id).await?;
        Ok(row.map(Member::from))
    }
}

/// Figures recomputed from the ledger on every read.
#[derive(SimpleObject, Clone, Copy, Debug, PartialEq)]
pub struct AttendanceStats {
    pub total_records: i64,
    /// Number of `PRESENT` records
    pub total_attendance: i64,
    /// `PRESENT` records for sessions in the current calendar month (UTC)
    pub monthly_attendance: i64,
    /// Percentage of records that are `PRESENT`, 0 when there are none
    pub attendance_rate: f64,
}

#[derive(InputObject, Clone, Debug)]
pub struct MarkAttendanceInput {
    pub session_id: Uuid,
    pub member_id: Uuid,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}
