//! Reference data queries: pick-list entries and user profiles

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::UserProfile;

/// All pick-list ids
pub async fn emopick_ids(pool: &PgPool) -> Result<Vec<i32>, StoreError> {
    let ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM emopicks")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// All profile ids
pub async fn profile_ids(pool: &PgPool) -> Result<Vec<Uuid>, StoreError> {
    let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM profiles")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Get one profile by id
pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
    let profile = sqlx::query_as::<_, UserProfile>(
        "SELECT id, nombre, role_tier, mesa_numero FROM profiles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}
