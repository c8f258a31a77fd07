use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

use crate::models::ClubRow;

#[derive(Debug, Clone)]
pub struct CreateClub {
    pub name: String,
    pub sport_category: String,
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateClub) -> SqlxResult<ClubRow> {
    sqlx::query_as::<_, ClubRow>(
        r#"
        INSERT INTO clubs (name, sport_category)
        VALUES ($1, $2)
        RETURNING id, name, sport_category, created_at, updated_at
        "#,
    )
    .bind(data.name)
    .bind(data.sport_category)
    .fetch_one(executor)
    .await
}

/// List clubs, optionally narrowed to a single club id.
pub async fn list<'e>(
    executor: impl PgExecutor<'e>,
    club_id: Option<Uuid>,
) -> SqlxResult<Vec<ClubRow>> {
    sqlx::query_as::<_, ClubRow>(
        r#"
        SELECT id, name, sport_category, created_at, updated_at
        FROM clubs
        WHERE ($1::uuid IS NULL OR id = $1)
        ORDER BY name ASC
        "#,
    )
    .bind(club_id)
    .fetch_all(executor)
    .await
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> SqlxResult<Option<ClubRow>> {
    sqlx::query_as::<_, ClubRow>(
        r#"
        SELECT id, name, sport_category, created_at, updated_at
        FROM clubs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}
