//! Roll (padrón) record types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Column names shared by import files, exports and the `padron` table.
pub mod columns {
    pub const DOCUMENTO: &str = "documento";
    pub const APELLIDO: &str = "apellido";
    pub const NOMBRE: &str = "nombre";
    pub const SEXO: &str = "sexo";
    pub const CLASE: &str = "clase";
    pub const DOMICILIO: &str = "domicilio";
    pub const MESA_NUMERO: &str = "mesa_numero";
    pub const ORDEN: &str = "orden";
    pub const NUEVO_ELECTOR: &str = "nuevo_elector";
    pub const VOTO_OBLIGATORIO: &str = "voto_obligatorio";
    pub const OBSERVACIONES: &str = "observaciones";
    pub const EMOPICK_ID: &str = "emopick_id";
    pub const PICK_OBSERVACION: &str = "pick_observacion";
    pub const PICK_VERIFICADO: &str = "pick_verificado";
    pub const VOTO_EMITIDO: &str = "voto_emitido";
    pub const FECHA_VOTO: &str = "fecha_voto";
    pub const VOTO_REGISTRADO_POR: &str = "voto_registrado_por";
    pub const PICK_REGISTRADO_POR: &str = "pick_registrado_por";
    pub const VOTO_VERIFICADO_POR: &str = "voto_verificado_por";
}

use columns::*;

/// Columns that must all be present in an import header row.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    DOCUMENTO, APELLIDO, NOMBRE, SEXO, CLASE, DOMICILIO, MESA_NUMERO, ORDEN,
];

/// Columns an import file may carry in addition to the required ones.
pub const OPTIONAL_COLUMNS: [&str; 11] = [
    NUEVO_ELECTOR,
    VOTO_OBLIGATORIO,
    OBSERVACIONES,
    EMOPICK_ID,
    PICK_OBSERVACION,
    PICK_VERIFICADO,
    VOTO_EMITIDO,
    FECHA_VOTO,
    VOTO_REGISTRADO_POR,
    PICK_REGISTRADO_POR,
    VOTO_VERIFICADO_POR,
];

pub const BOOLEAN_COLUMNS: [&str; 4] = [VOTO_EMITIDO, PICK_VERIFICADO, NUEVO_ELECTOR, VOTO_OBLIGATORIO];

pub const USER_REF_COLUMNS: [&str; 3] = [VOTO_REGISTRADO_POR, PICK_REGISTRADO_POR, VOTO_VERIFICADO_POR];

/// Full column set in file order: required first, then optional.
pub fn all_columns() -> impl Iterator<Item = &'static str> {
    REQUIRED_COLUMNS.into_iter().chain(OPTIONAL_COLUMNS)
}

/// One parsed input row: header name -> raw cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Trimmed value, or `None` when the column is absent or blank.
    pub fn non_empty(&self, field: &str) -> Option<&str> {
        self.get(field).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Raw value for reports; absent columns read as "".
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Column-typed roll record, as stored in `padron`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RollRecord {
    pub documento: i64,
    pub apellido: String,
    pub nombre: String,
    pub sexo: Option<String>,
    pub clase: Option<i32>,
    pub domicilio: String,
    pub mesa_numero: Option<i32>,
    pub orden: Option<i32>,
    pub nuevo_elector: bool,
    pub voto_obligatorio: bool,
    pub observaciones: String,
    pub emopick_id: Option<i32>,
    pub pick_observacion: String,
    pub pick_verificado: bool,
    pub voto_emitido: bool,
    pub fecha_voto: Option<DateTime<Utc>>,
    pub voto_registrado_por: Option<Uuid>,
    pub pick_registrado_por: Option<Uuid>,
    pub voto_verificado_por: Option<Uuid>,
}

#[cfg(test)]
impl RollRecord {
    /// Minimal valid record for tests.
    pub fn sample(documento: i64, mesa_numero: Option<i32>) -> Self {
        Self {
            documento,
            apellido: "GARCIA".to_string(),
            nombre: "JUAN".to_string(),
            sexo: Some("M".to_string()),
            clase: Some(1985),
            domicilio: "CALLE FALSA 123".to_string(),
            mesa_numero,
            orden: Some(1),
            nuevo_elector: false,
            voto_obligatorio: false,
            observaciones: String::new(),
            emopick_id: None,
            pick_observacion: String::new(),
            pick_verificado: false,
            voto_emitido: false,
            fecha_voto: None,
            voto_registrado_por: None,
            pick_registrado_por: None,
            voto_verificado_por: None,
        }
    }
}

/// A stored roll record with its pick-list label joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RollRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: RollRecord,
    pub emopick_nombre: Option<String>,
}

/// Vote attribution written when a vote is marked at a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteMark {
    pub at: DateTime<Utc>,
    pub by: Uuid,
}

/// Voter search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub mesa_numero: Option<i32>,
    #[serde(default = "default_page_size")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_page_size() -> i64 {
    50
}

/// Request to mark or unmark a vote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub documento: i64,
    #[serde(default = "default_cast")]
    pub cast: bool,
}

fn default_cast() -> bool {
    true
}
