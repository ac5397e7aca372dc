//! Roll (padron) database queries

use std::collections::HashSet;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::StoreError;
use crate::types::{ExportFilter, RollRecord, RollRow, VoteMark};

const ROLL_COLUMNS: &str = r#"
    p.documento, p.apellido, p.nombre, p.sexo, p.clase, p.domicilio,
    p.mesa_numero, p.orden, p.nuevo_elector, p.voto_obligatorio, p.observaciones,
    p.emopick_id, p.pick_observacion, p.pick_verificado, p.voto_emitido, p.fecha_voto,
    p.voto_registrado_por, p.pick_registrado_por, p.voto_verificado_por,
    e.nombre AS emopick_nombre
"#;

const ROLL_FROM: &str = "FROM padron p LEFT JOIN emopicks e ON e.id = p.emopick_id";

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::boolean IS NULL OR p.voto_emitido = $1)
      AND ($2::int IS NULL OR p.emopick_id = $2)
      AND ($3::int IS NULL OR p.mesa_numero >= $3)
      AND ($4::int IS NULL OR p.mesa_numero <= $4)
      AND ($5::int IS NULL OR p.clase >= $5)
      AND ($6::int IS NULL OR p.clase <= $6)
"#;

const ROLL_ORDER: &str = "ORDER BY p.mesa_numero ASC NULLS LAST, p.orden ASC NULLS LAST, p.documento ASC";

/// Which of the given document numbers already exist
pub async fn existing_documents(pool: &PgPool, documentos: &[i64]) -> Result<HashSet<i64>, StoreError> {
    let rows: Vec<i64> = sqlx::query_scalar("SELECT documento FROM padron WHERE documento = ANY($1)")
        .bind(documentos)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().collect())
}

/// Insert-or-update a batch of records keyed by documento, in one statement
pub async fn upsert_batch(pool: &PgPool, records: &[RollRecord]) -> Result<(), StoreError> {
    if records.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        INSERT INTO padron (
            documento, apellido, nombre, sexo, clase, domicilio, mesa_numero, orden,
            nuevo_elector, voto_obligatorio, observaciones, emopick_id, pick_observacion,
            pick_verificado, voto_emitido, fecha_voto,
            voto_registrado_por, pick_registrado_por, voto_verificado_por
        )
        "#,
    );

    builder.push_values(records, |mut row, r| {
        row.push_bind(r.documento)
            .push_bind(r.apellido.clone())
            .push_bind(r.nombre.clone())
            .push_bind(r.sexo.clone())
            .push_bind(r.clase)
            .push_bind(r.domicilio.clone())
            .push_bind(r.mesa_numero)
            .push_bind(r.orden)
            .push_bind(r.nuevo_elector)
            .push_bind(r.voto_obligatorio)
            .push_bind(r.observaciones.clone())
            .push_bind(r.emopick_id)
            .push_bind(r.pick_observacion.clone())
            .push_bind(r.pick_verificado)
            .push_bind(r.voto_emitido)
            .push_bind(r.fecha_voto)
            .push_bind(r.voto_registrado_por)
            .push_bind(r.pick_registrado_por)
            .push_bind(r.voto_verificado_por);
    });

    builder.push(
        r#"
        ON CONFLICT (documento) DO UPDATE SET
            apellido = EXCLUDED.apellido,
            nombre = EXCLUDED.nombre,
            sexo = EXCLUDED.sexo,
            clase = EXCLUDED.clase,
            domicilio = EXCLUDED.domicilio,
            mesa_numero = EXCLUDED.mesa_numero,
            orden = EXCLUDED.orden,
            nuevo_elector = EXCLUDED.nuevo_elector,
            voto_obligatorio = EXCLUDED.voto_obligatorio,
            observaciones = EXCLUDED.observaciones,
            emopick_id = EXCLUDED.emopick_id,
            pick_observacion = EXCLUDED.pick_observacion,
            pick_verificado = EXCLUDED.pick_verificado,
            voto_emitido = EXCLUDED.voto_emitido,
            fecha_voto = EXCLUDED.fecha_voto,
            voto_registrado_por = EXCLUDED.voto_registrado_por,
            pick_registrado_por = EXCLUDED.pick_registrado_por,
            voto_verificado_por = EXCLUDED.voto_verificado_por,
            updated_at = NOW()
        "#,
    );

    builder.build().execute(pool).await?;
    Ok(())
}

/// Count rows matching an export filter
pub async fn count_filtered(pool: &PgPool, filter: &ExportFilter) -> Result<i64, StoreError> {
    let sql = format!("SELECT COUNT(*) FROM padron p {FILTER_CLAUSE}");
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(filter.vote_status.as_flag())
        .bind(filter.emopick_id)
        .bind(filter.mesa_from)
        .bind(filter.mesa_to)
        .bind(filter.clase_from)
        .bind(filter.clase_to)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Fetch one page of rows matching an export filter, in table/order sequence
pub async fn fetch_filtered_page(
    pool: &PgPool,
    filter: &ExportFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<RollRow>, StoreError> {
    let sql = format!("SELECT {ROLL_COLUMNS} {ROLL_FROM} {FILTER_CLAUSE} {ROLL_ORDER} LIMIT $7 OFFSET $8");
    let rows = sqlx::query_as::<_, RollRow>(&sql)
        .bind(filter.vote_status.as_flag())
        .bind(filter.emopick_id)
        .bind(filter.mesa_from)
        .bind(filter.mesa_to)
        .bind(filter.clase_from)
        .bind(filter.clase_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Escape LIKE wildcards in user-supplied text
fn like_prefix(text: &str) -> String {
    let escaped = text
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

/// Search voters by document number or name prefix
pub async fn search(
    pool: &PgPool,
    documento: Option<i64>,
    name_prefix: Option<&str>,
    mesa_numero: Option<i32>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<RollRow>, i64), StoreError> {
    const SEARCH_CLAUSE: &str = r#"
        WHERE ($1::bigint IS NULL OR p.documento = $1)
          AND ($2::text IS NULL OR lower(p.apellido) LIKE $2 OR lower(p.nombre) LIKE $2)
          AND ($3::int IS NULL OR p.mesa_numero = $3)
    "#;

    let pattern = name_prefix.map(like_prefix);

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM padron p {SEARCH_CLAUSE}"))
        .bind(documento)
        .bind(pattern.as_deref())
        .bind(mesa_numero)
        .fetch_one(pool)
        .await?;

    let sql = format!("SELECT {ROLL_COLUMNS} {ROLL_FROM} {SEARCH_CLAUSE} {ROLL_ORDER} LIMIT $4 OFFSET $5");
    let rows = sqlx::query_as::<_, RollRow>(&sql)
        .bind(documento)
        .bind(pattern.as_deref())
        .bind(mesa_numero)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

/// Get a single roll row
pub async fn get(pool: &PgPool, documento: i64) -> Result<Option<RollRow>, StoreError> {
    let sql = format!("SELECT {ROLL_COLUMNS} {ROLL_FROM} WHERE p.documento = $1");
    let row = sqlx::query_as::<_, RollRow>(&sql)
        .bind(documento)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Set or clear the vote fields of one voter; returns false when no row matched
pub async fn set_vote(pool: &PgPool, documento: i64, mark: Option<VoteMark>) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE padron
        SET voto_emitido = $2,
            fecha_voto = $3,
            voto_registrado_por = $4,
            updated_at = NOW()
        WHERE documento = $1
        "#,
    )
    .bind(documento)
    .bind(mark.is_some())
    .bind(mark.map(|m| m.at))
    .bind(mark.map(|m| m.by))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
