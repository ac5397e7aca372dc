//! Ping handler for health checks

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::store::RollStore;
use crate::types::ErrorResponse;

#[derive(Debug, Serialize, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PongResponse {
    message: String,
    store: String,
    version: String,
    timestamp: String,
}

/// Handle ping messages. No authentication.
pub async fn handle_ping(client: Client, mut subscriber: Subscriber, store: Arc<dyn RollStore>) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received ping message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                error!("Ping message without reply subject");
                continue;
            }
        };

        // Accept a bare payload or an empty body
        let request: PingRequest = if msg.payload.is_empty() {
            PingRequest { message: None }
        } else {
            match serde_json::from_slice(&msg.payload) {
                Ok(req) => req,
                Err(e) => {
                    error!("Failed to parse ping request: {}", e);
                    let error = ErrorResponse::new(
                        uuid::Uuid::nil(),
                        "INVALID_REQUEST",
                        format!("Failed to parse request: {}", e),
                    );
                    let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                    continue;
                }
            }
        };

        let response = PongResponse {
            message: request.message.map(|m| format!("Pong: {}", m)).unwrap_or_else(|| "Pong".to_string()),
            store: store.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        client.publish(reply, serde_json::to_vec(&response)?.into()).await?;
        debug!("Sent pong response");
    }

    Ok(())
}
