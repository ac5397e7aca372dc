//! Roll import handlers: template download, validation and commit

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use base64::Engine;
use futures::StreamExt;
use tracing::{error, info};

use super::{accept, respond};
use crate::services::import_processor::ImportProcessor;
use crate::services::roll_import::{error_report_csv, template_csv, RollImporter, TEMPLATE_FILENAME};
use crate::types::{
    EmptyPayload, ErrorResponse, FileResponse, ImportUploadRequest, SuccessResponse,
    ValidationResponse, TIER_SUPERVISOR,
};

/// Handle pickpad.import.template
pub async fn handle_template(client: Client, mut subscriber: Subscriber, jwt_secret: Arc<String>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some((reply, request, session)) = accept::<EmptyPayload>(&client, &msg, &jwt_secret).await? else {
            continue;
        };

        if let Err(e) = session.require_tier(TIER_SUPERVISOR, "Descargar la plantilla") {
            respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?;
            continue;
        }

        match template_csv() {
            Ok(bytes) => {
                let file = FileResponse::from_bytes(TEMPLATE_FILENAME, "text/csv; charset=utf-8", &bytes);
                respond(&client, reply, &SuccessResponse::new(request.id, file)).await?;
            }
            Err(e) => {
                error!("Failed to build import template: {}", e);
                respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?;
            }
        }
    }

    Ok(())
}

/// Handle pickpad.import.validate
pub async fn handle_validate(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    importer: Arc<RollImporter>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some((reply, request, session)) =
            accept::<ImportUploadRequest>(&client, &msg, &jwt_secret).await?
        else {
            continue;
        };

        if let Err(e) = session.require_tier(TIER_SUPERVISOR, "Importar el padrón") {
            respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?;
            continue;
        }

        let file = match request.payload.into_file() {
            Ok(file) => file,
            Err(e) => {
                let error = ErrorResponse::new(request.id, "INVALID_REQUEST", format!("Invalid base64: {}", e));
                respond(&client, reply, &error).await?;
                continue;
            }
        };

        let result = match importer.validate(&file).await {
            Ok(outcome) if outcome.is_clean() => Ok(ValidationResponse {
                outcome,
                error_report_base64: None,
            }),
            Ok(outcome) => error_report_csv(&outcome.issues).map(|report| ValidationResponse {
                outcome,
                error_report_base64: Some(base64::engine::general_purpose::STANDARD.encode(report)),
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => {
                info!(
                    "Validated {} for {}: {} issues",
                    file.filename, session.user_id, response.outcome.issue_count
                );
                respond(&client, reply, &SuccessResponse::new(request.id, response)).await?;
            }
            Err(e) => {
                respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?;
            }
        }
    }

    Ok(())
}

/// Handle pickpad.import.commit. Replies with the job id right away; the
/// import itself reports on the job status subject.
pub async fn handle_commit(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    processor: Arc<ImportProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some((reply, request, session)) =
            accept::<ImportUploadRequest>(&client, &msg, &jwt_secret).await?
        else {
            continue;
        };

        if let Err(e) = session.require_tier(TIER_SUPERVISOR, "Importar el padrón") {
            respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?;
            continue;
        }

        let job_id = request.id;
        match request.payload.into_file() {
            Ok(file) => {
                let submitted = processor.submit_job(job_id, file, session);
                respond(&client, reply, &SuccessResponse::new(job_id, submitted)).await?;
            }
            Err(e) => {
                let error = ErrorResponse::new(job_id, "INVALID_REQUEST", format!("Invalid base64: {}", e));
                respond(&client, reply, &error).await?;
            }
        }
    }

    Ok(())
}
