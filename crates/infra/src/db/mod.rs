use sqlx::PgPool;

pub type Db = PgPool;

pub async fn ping(pool: &Db) -> Result<(), sqlx::Error> {
    let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// True when `err` is a unique violation raised by the named constraint or index.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err.as_database_error() {
        Some(db_err) => db_err.is_unique_violation() && db_err.constraint() == Some(constraint),
        None => false,
    }
}
