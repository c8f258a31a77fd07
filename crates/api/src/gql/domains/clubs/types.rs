use async_graphql::{InputObject, SimpleObject, ID};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use infra::models::{ClubRow, CoachRow};

#[derive(SimpleObject, Clone, Debug)]
pub struct Club {
    pub id: ID,
    pub name: String,
    pub sport_category: String,
    pub created_at: DateTime<Utc>,
}

impl From<ClubRow> for Club {
    fn from(row: ClubRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            sport_category: row.sport_category,
            created_at: row.created_at,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct Coach {
    pub id: ID,
    pub identity_id: ID,
    pub club_id: ID,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<CoachRow> for Coach {
    fn from(row: CoachRow) -> Self {
        Self {
            id: row.id.into(),
            identity_id: row.identity_id.into(),
            club_id: row.club_id.into(),
            display_name: row.display_name,
            created_at: row.created_at,
        }
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct CreateClubInput {
    pub name: String,
    pub sport_category: String,
}

#[derive(InputObject, Clone, Debug)]
pub struct AssignCoachInput {
    /// Account id issued by the identity provider
    pub identity_id: Uuid,
    pub club_id: Uuid,
    pub display_name: String,
}
