use async_graphql::dataloader::DataLoader;
use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject, ID};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use infra::models::TrainingSessionRow;
use infra::repos::SessionStatus as SessionStatusRow;

use crate::gql::loaders::CoachLoader;
use crate::gql::types::Coach;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum SessionStatus {
    #[graphql(name = "SCHEDULED")]
    Scheduled,
    #[graphql(name = "CANCELLED")]
    Cancelled,
}

impl From<SessionStatusRow> for SessionStatus {
    fn from(status: SessionStatusRow) -> Self {
        match status {
            SessionStatusRow::Scheduled => SessionStatus::Scheduled,
            SessionStatusRow::Cancelled => SessionStatus::Cancelled,
        }
    }
}

impl From<SessionStatus> for SessionStatusRow {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Scheduled => SessionStatusRow::Scheduled,
            SessionStatus::Cancelled => SessionStatusRow::Cancelled,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct TrainingSession {
    pub id: ID,
    pub club_id: ID,
    pub coach_id: ID,
    pub title: String,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Scheduled start in UTC
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub status: SessionStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TrainingSessionRow> for TrainingSession {
    fn from(row: TrainingSessionRow) -> Self {
        Self {
            starts_at: row.starts_at(),
            id: row.id.into(),
            club_id: row.club_id.into(),
            coach_id: row.coach_id.into(),
            title: row.title,
            session_date: row.session_date,
            start_time: row.start_time,
            end_time: row.end_time,
            location: row.location,
            status: row.status.into(),
            cancellation_reason: row.cancellation_reason,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[ComplexObject]
impl TrainingSession {
    async fn coach(&self, ctx: &Context<'_>) -> Result<Option<Coach>> {
        let loader = ctx.data::<DataLoader<CoachLoader>>()?;
        let coach_id = Uuid::parse_str(self.coach_id.as_str())?;
        let row = loader.load_one(coach_id).await?;
        Ok(row.map(Coach::from))
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct CreateSessionInput {
    pub club_id: Uuid,
    /// Defaults to the calling coach; administrators must name one
    pub coach_id: Option<Uuid>,
    pub title: String,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
}

#[derive(InputObject, Clone, Debug)]
pub struct UpdateSessionInput {
    pub session_id: Uuid,
    pub title: String,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
}

#[derive(InputObject, Clone, Debug)]
pub struct CancelSessionInput {
    pub session_id: Uuid,
    pub reason: Option<String>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct SessionFilterInput {
    pub club_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<SessionStatus>,
}
