use sqlx::{PgExecutor, Result as SqlxResult};
use uuid::Uuid;

use crate::models::CoachRow;

pub const COACHES_IDENTITY_KEY: &str = "coaches_identity_id_key";

#[derive(Debug, Clone)]
pub struct CreateCoach {
    pub identity_id: Uuid,
    pub club_id: Uuid,
    pub display_name: String,
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, data: CreateCoach) -> SqlxResult<CoachRow> {
    sqlx::query_as::<_, CoachRow>(
        r#"
        INSERT INTO coaches (identity_id, club_id, display_name)
        VALUES ($1, $2, $3)
        RETURNING id, identity_id, club_id, display_name, created_at, updated_at
        "#,
    )
    .bind(data.identity_id)
    .bind(data.club_id)
    .bind(data.display_name)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<CoachRow>> {
    sqlx::query_as::<_, CoachRow>(
        "SELECT id, identity_id, club_id, display_name, created_at, updated_at FROM coaches WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_identity<'e>(
    executor: impl PgExecutor<'e>,
    identity_id: Uuid,
) -> SqlxResult<Option<CoachRow>> {
    sqlx::query_as::<_, CoachRow>(
        "SELECT id, identity_id, club_id, display_name, created_at, updated_at FROM coaches WHERE identity_id = $1",
    )
    .bind(identity_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_by_club<'e>(
    executor: impl PgExecutor<'e>,
    club_id: Uuid,
) -> SqlxResult<Vec<CoachRow>> {
    sqlx::query_as::<_, CoachRow>(
        r#"
        SELECT id, identity_id, club_id, display_name, created_at, updated_at
        FROM coaches
        WHERE club_id = $1
        ORDER BY display_name ASC
        "#,
    )
    .bind(club_id)
    .fetch_all(executor)
    .await
}
