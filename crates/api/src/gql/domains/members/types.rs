use async_graphql::dataloader::DataLoader;
use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject, ID};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use infra::models::MemberRow;
use infra::repos::AccessFlag as AccessFlagRow;

use crate::gql::loaders::ClubLoader;
use crate::gql::types::{Club, Coach, Role};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum AccessFlag {
    #[graphql(name = "PENDING")]
    Pending,
    #[graphql(name = "ACTIVE")]
    Active,
    #[graphql(name = "REJECTED")]
    Rejected,
    #[graphql(name = "SUSPENDED")]
    Suspended,
}

impl From<AccessFlagRow> for AccessFlag {
    fn from(flag: AccessFlagRow) -> Self {
        match flag {
            AccessFlagRow::Pending => AccessFlag::Pending,
            AccessFlagRow::Active => AccessFlag::Active,
            AccessFlagRow::Rejected => AccessFlag::Rejected,
            AccessFlagRow::Suspended => AccessFlag::Suspended,
        }
    }
}

impl From<AccessFlag> for AccessFlagRow {
    fn from(flag: AccessFlag) -> Self {
        match flag {
            AccessFlag::Pending => AccessFlagRow::Pending,
            AccessFlag::Active => AccessFlagRow::Active,
            AccessFlag::Rejected => AccessFlagRow::Rejected,
            AccessFlag::Suspended => AccessFlagRow::Suspended,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct Member {
    pub id: ID,
    pub identity_id: ID,
    pub club_id: ID,
    pub access_flag: AccessFlag,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub health_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id.into(),
            identity_id: row.identity_id.into(),
            club_id: row.club_id.into(),
            access_flag: row.access_flag.into(),
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            health_notes: row.health_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[ComplexObject]
impl Member {
    async fn club(&self, ctx: &Context<'_>) -> Result<Option<Club>> {
        let loader = ctx.data::<DataLoader<ClubLoader>>()?;
        let club_id = Uuid::parse_str(self.club_id.as_str())?;
        let row = loader.load_one(club_id).await?;
        Ok(row.map(Club::from))
    }
}

/// The authenticated caller and the profile bound to their identity.
#[derive(SimpleObject, Clone, Debug)]
pub struct Me {
    pub identity_id: ID,
    pub role: Role,
    pub club_id: Option<ID>,
    pub member: Option<Member>,
    pub coach: Option<Coach>,
}

#[derive(InputObject, Clone, Debug)]
pub struct ProvisionMemberInput {
    pub club_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub health_notes: Option<String>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct MemberFilterInput {
    pub club_id: Option<Uuid>,
    pub access_flag: Option<AccessFlag>,
}
