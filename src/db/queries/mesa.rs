//! Polling table queries

use sqlx::PgPool;

use crate::error::StoreError;
use crate::types::TableStats;

/// All table numbers
pub async fn list_numbers(pool: &PgPool) -> Result<Vec<i32>, StoreError> {
    let numbers: Vec<i32> = sqlx::query_scalar("SELECT numero FROM mesas ORDER BY numero")
        .fetch_all(pool)
        .await?;
    Ok(numbers)
}

/// Count enrolled and voted rows for one table straight from the roll
pub async fn count_for(pool: &PgPool, numero: i32) -> Result<TableStats, StoreError> {
    let (total_electores, total_votantes): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE voto_emitido)
        FROM padron
        WHERE mesa_numero = $1
        "#,
    )
    .bind(numero)
    .fetch_one(pool)
    .await?;

    Ok(TableStats {
        numero,
        total_electores,
        total_votantes,
    })
}

/// Overwrite the cached aggregates of one table
pub async fn write_stats(pool: &PgPool, stats: &TableStats) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE mesas
        SET total_electores = $2, total_votantes = $3, updated_at = NOW()
        WHERE numero = $1
        "#,
    )
    .bind(stats.numero)
    .bind(stats.total_electores)
    .bind(stats.total_votantes)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("mesa {}", stats.numero)));
    }
    Ok(())
}
