//! NATS message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::error::PipelineError;

/// Generic request wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<T> {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub token: Option<String>,  // JWT access token
    pub payload: T,
}

#[cfg(test)]
impl<T> Request<T> {
    pub fn with_token(token: String, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            token: Some(token),
            payload,
        }
    }
}

/// Generic success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(request_id: Uuid, payload: T) -> Self {
        Self {
            id: request_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(request_id: Uuid, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: request_id,
            timestamp: Utc::now(),
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Map a pipeline failure to its wire code, keeping the numbers a client
    /// needs to render ceiling and confirmation prompts.
    pub fn from_pipeline(request_id: Uuid, err: &PipelineError) -> Self {
        let mut response = Self::new(request_id, err.code(), err.to_string());
        response.error.details = match err {
            PipelineError::ExportCeiling { ceiling, actual } => Some(serde_json::json!({
                "ceiling": ceiling,
                "actual": actual,
            })),
            PipelineError::ConfirmationRequired { count, threshold } => Some(serde_json::json!({
                "count": count,
                "threshold": threshold,
            })),
            PipelineError::Batch { batch, batches, .. } => Some(serde_json::json!({
                "batch": batch,
                "batches": batches,
            })),
            PipelineError::Store(_) => Some(serde_json::json!({
                "hint": "Reintente la operación; si el problema persiste contacte al administrador",
            })),
            _ => None,
        };
        response
    }
}

/// Empty payload (`{}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyPayload {}

/// List response with pagination info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_ceiling_error_carries_details() {
        let err = PipelineError::ExportCeiling { ceiling: 350_000, actual: 400_000 };
        let response = ErrorResponse::from_pipeline(Uuid::nil(), &err);
        assert_eq!(response.error.code, "EXPORT_CEILING");
        let details = response.error.details.unwrap();
        assert_eq!(details["actual"], 400_000);
    }

    #[test]
    fn test_store_error_carries_retry_hint() {
        let err = PipelineError::Store(StoreError::Backend("connection reset".to_string()));
        let response = ErrorResponse::from_pipeline(Uuid::nil(), &err);
        assert_eq!(response.error.code, "STORE_ERROR");
        assert!(response.error.message.contains("connection reset"));
        assert!(response.error.details.is_some());
    }

    #[test]
    fn test_request_deserializes_without_token() {
        let json = format!(
            r#"{{"id":"{}","timestamp":"2026-10-17T10:00:00Z","payload":{{}}}}"#,
            Uuid::new_v4()
        );
        let request: Request<EmptyPayload> = serde_json::from_str(&json).unwrap();
        assert!(request.token.is_none());
    }
}
