//! Conversion of validated raw records into typed roll records

use chrono::{DateTime, Utc};

use crate::error::PipelineError;
use crate::types::columns::*;
use crate::types::{RawRecord, RollRecord};

use super::rules::{parse_bool, parse_int, parse_timestamp, parse_uuid_v4};

fn text(record: &RawRecord, field: &str) -> String {
    record.non_empty(field).unwrap_or_default().to_string()
}

fn int(record: &RawRecord, field: &str) -> Option<i32> {
    record.non_empty(field).and_then(parse_int)
}

fn flag(record: &RawRecord, field: &str) -> bool {
    record.non_empty(field).and_then(parse_bool).unwrap_or(false)
}

/// Build a typed record. Invalid optional values become `None`/defaults;
/// a missing or unparseable `documento` fails.
///
/// `voto_emitido` and `fecha_voto` are kept consistent: no vote clears the
/// timestamp, a vote without one gets `run_started`.
pub fn normalize(
    record: &RawRecord,
    row: u32,
    run_started: DateTime<Utc>,
) -> Result<RollRecord, PipelineError> {
    let documento = record
        .non_empty(DOCUMENTO)
        .and_then(parse_int::<i64>)
        .filter(|d| *d > 0)
        .ok_or_else(|| PipelineError::Normalize {
            row,
            reason: format!("documento inválido: '{}'", record.value(DOCUMENTO)),
        })?;

    let voto_emitido = flag(record, VOTO_EMITIDO);
    let fecha_voto = if voto_emitido {
        Some(
            record
                .non_empty(FECHA_VOTO)
                .and_then(parse_timestamp)
                .unwrap_or(run_started),
        )
    } else {
        None
    };

    Ok(RollRecord {
        documento,
        apellido: text(record, APELLIDO),
        nombre: text(record, NOMBRE),
        sexo: record.non_empty(SEXO).map(str::to_uppercase),
        clase: int(record, CLASE),
        domicilio: text(record, DOMICILIO),
        mesa_numero: int(record, MESA_NUMERO),
        orden: int(record, ORDEN),
        nuevo_elector: flag(record, NUEVO_ELECTOR),
        voto_obligatorio: flag(record, VOTO_OBLIGATORIO),
        observaciones: text(record, OBSERVACIONES),
        emopick_id: int(record, EMOPICK_ID),
        pick_observacion: text(record, PICK_OBSERVACION),
        pick_verificado: flag(record, PICK_VERIFICADO),
        voto_emitido,
        fecha_voto,
        voto_registrado_por: record.non_empty(VOTO_REGISTRADO_POR).and_then(parse_uuid_v4),
        pick_registrado_por: record.non_empty(PICK_REGISTRADO_POR).and_then(parse_uuid_v4),
        voto_verificado_por: record.non_empty(VOTO_VERIFICADO_POR).and_then(parse_uuid_v4),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap()
    }

    fn base() -> RawRecord {
        [
            ("documento", "12345678"),
            ("apellido", " GARCIA "),
            ("nombre", "JUAN"),
            ("sexo", "m"),
            ("clase", "1985"),
            ("domicilio", "CALLE 1"),
            ("mesa_numero", "1000"),
            ("orden", ""),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_typed_fields_and_defaults() {
        let rec = normalize(&base(), 2, started()).unwrap();
        assert_eq!(rec.documento, 12345678);
        assert_eq!(rec.apellido, "GARCIA");
        assert_eq!(rec.sexo.as_deref(), Some("M"));
        assert_eq!(rec.clase, Some(1985));
        assert_eq!(rec.mesa_numero, Some(1000));
        assert_eq!(rec.orden, None);
        assert_eq!(rec.observaciones, "");
        assert!(!rec.nuevo_elector);
        assert!(!rec.voto_emitido);
        assert_eq!(rec.fecha_voto, None);
        assert_eq!(rec.voto_registrado_por, None);
    }

    #[test]
    fn test_booleans_are_strict() {
        let mut raw = base();
        raw.insert("voto_obligatorio", "quizás");
        raw.insert("nuevo_elector", "Sí");
        let rec = normalize(&raw, 2, started()).unwrap();
        assert!(!rec.voto_obligatorio);
        assert!(rec.nuevo_elector);
    }

    #[test]
    fn test_empty_sexo_is_none() {
        let mut raw = base();
        raw.insert("sexo", "");
        assert_eq!(normalize(&raw, 2, started()).unwrap().sexo, None);
    }

    #[test]
    fn test_missing_documento_is_hard_failure() {
        let mut raw = base();
        raw.insert("documento", "abc");
        match normalize(&raw, 9, started()) {
            Err(PipelineError::Normalize { row, .. }) => assert_eq!(row, 9),
            other => panic!("expected Normalize error, got {:?}", other),
        }
    }

    #[test]
    fn test_vote_without_timestamp_gets_run_start() {
        let mut raw = base();
        raw.insert("voto_emitido", "1");
        let rec = normalize(&raw, 2, started()).unwrap();
        assert!(rec.voto_emitido);
        assert_eq!(rec.fecha_voto, Some(started()));
    }

    #[test]
    fn test_timestamp_without_vote_is_cleared() {
        let mut raw = base();
        raw.insert("voto_emitido", "no");
        raw.insert("fecha_voto", "2025-10-26 09:30:00");
        let rec = normalize(&raw, 2, started()).unwrap();
        assert_eq!(rec.fecha_voto, None);
    }

    #[test]
    fn test_vote_timestamp_kept_as_utc() {
        let mut raw = base();
        raw.insert("voto_emitido", "true");
        raw.insert("fecha_voto", "2025-10-26T06:30:00-03:00");
        let rec = normalize(&raw, 2, started()).unwrap();
        assert_eq!(rec.fecha_voto, Some(Utc.with_ymd_and_hms(2025, 10, 26, 9, 30, 0).unwrap()));
    }
}
