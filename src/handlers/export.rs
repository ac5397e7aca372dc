//! Roll export handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;

use super::{accept, respond};
use crate::services::export_processor::ExportProcessor;
use crate::types::{ErrorResponse, ExportDownload, ExportRequest, FileResponse, SuccessResponse};

/// Handle pickpad.export.count
pub async fn handle_count(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    processor: Arc<ExportProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some((reply, request, session)) = accept::<ExportRequest>(&client, &msg, &jwt_secret).await? else {
            continue;
        };

        match processor.exporter().preflight(&request.payload.filter, &session).await {
            Ok(preflight) => {
                respond(&client, reply, &SuccessResponse::new(request.id, preflight)).await?;
            }
            Err(e) => {
                respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?;
            }
        }
    }

    Ok(())
}

/// Handle pickpad.export.run. Progress goes to the export job status subject
/// for the request id; the file is the reply.
pub async fn handle_run(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    processor: Arc<ExportProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some((reply, request, session)) = accept::<ExportRequest>(&client, &msg, &jwt_secret).await? else {
            continue;
        };

        match processor.run_job(request.id, &request.payload, &session).await {
            Ok(file) => {
                let payload = ExportDownload {
                    file: FileResponse::from_bytes(file.filename, file.content_type, &file.bytes),
                    rows: file.rows,
                };
                respond(&client, reply, &SuccessResponse::new(request.id, payload)).await?;
            }
            Err(e) => {
                respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?;
            }
        }
    }

    Ok(())
}
