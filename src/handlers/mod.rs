//! NATS message handlers

pub mod export;
pub mod import;
pub mod ping;
pub mod roll;

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Message};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::select;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::services::export_processor::ExportProcessor;
use crate::services::import_processor::ImportProcessor;
use crate::services::roll_export::RollExporter;
use crate::services::roll_import::{ImportOptions, RollImporter};
use crate::services::votes::VoteService;
use crate::store::RollStore;
use crate::types::{ErrorResponse, Request, Session};

/// Serialize and publish a reply. Publish failures are logged, not fatal.
pub(crate) async fn respond<T: Serialize>(client: &Client, reply: String, body: &T) -> Result<()> {
    let bytes = serde_json::to_vec(body)?;
    if let Err(e) = client.publish(reply, bytes.into()).await {
        warn!("Failed to publish reply: {}", e);
    }
    Ok(())
}

/// Decode an envelope and authenticate its caller. On failure the error
/// reply has already been sent and `None` is returned.
pub(crate) async fn accept<T: DeserializeOwned>(
    client: &Client,
    msg: &Message,
    jwt_secret: &str,
) -> Result<Option<(String, Request<T>, Session)>> {
    let Some(reply) = msg.reply.as_ref().map(|r| r.to_string()) else {
        warn!("Message on {} without reply subject", msg.subject);
        return Ok(None);
    };

    let request: Request<T> = match serde_json::from_slice(&msg.payload) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse request on {}: {}", msg.subject, e);
            let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
            respond(client, reply, &error).await?;
            return Ok(None);
        }
    };

    let session = match auth::extract_session(&request, jwt_secret) {
        Ok(session) => session,
        Err(e) => {
            warn!("Unauthorized request on {}: {}", msg.subject, e);
            let error = ErrorResponse::new(request.id, "UNAUTHORIZED", "Authentication required");
            respond(client, reply, &error).await?;
            return Ok(None);
        }
    };

    Ok(Some((reply, request, session)))
}

/// Start all message handlers
pub async fn start_handlers(client: Client, store: Arc<dyn RollStore>, config: &Config) -> Result<()> {
    info!("Starting message handlers (store: {})...", store.name());

    let jwt_secret = Arc::new(config.require_jwt_secret()?.to_string());
    let importer = Arc::new(RollImporter::new(
        Arc::clone(&store),
        ImportOptions {
            batch_pause: config.batch_pause,
            ..Default::default()
        },
    ));
    let import_processor = Arc::new(ImportProcessor::new(client.clone(), Arc::clone(&importer)));
    let export_processor = Arc::new(ExportProcessor::new(
        client.clone(),
        RollExporter::new(Arc::clone(&store)),
    ));
    let votes = Arc::new(VoteService::new(Arc::clone(&store)));

    // Subscribe to all subjects
    let ping_sub = client.subscribe("pickpad.ping").await?;
    let template_sub = client.subscribe("pickpad.import.template").await?;
    let validate_sub = client.subscribe("pickpad.import.validate").await?;
    let commit_sub = client.subscribe("pickpad.import.commit").await?;
    let export_count_sub = client.subscribe("pickpad.export.count").await?;
    let export_run_sub = client.subscribe("pickpad.export.run").await?;
    let search_sub = client.subscribe("pickpad.roll.search").await?;
    let vote_sub = client.subscribe("pickpad.roll.vote").await?;

    info!("Subscribed to NATS subjects");

    let ping_handle = tokio::spawn(ping::handle_ping(client.clone(), ping_sub, Arc::clone(&store)));
    let template_handle = tokio::spawn(import::handle_template(
        client.clone(),
        template_sub,
        Arc::clone(&jwt_secret),
    ));
    let validate_handle = tokio::spawn(import::handle_validate(
        client.clone(),
        validate_sub,
        Arc::clone(&jwt_secret),
        Arc::clone(&importer),
    ));
    let commit_handle = tokio::spawn(import::handle_commit(
        client.clone(),
        commit_sub,
        Arc::clone(&jwt_secret),
        Arc::clone(&import_processor),
    ));
    let export_count_handle = tokio::spawn(export::handle_count(
        client.clone(),
        export_count_sub,
        Arc::clone(&jwt_secret),
        Arc::clone(&export_processor),
    ));
    let export_run_handle = tokio::spawn(export::handle_run(
        client.clone(),
        export_run_sub,
        Arc::clone(&jwt_secret),
        Arc::clone(&export_processor),
    ));
    let search_handle = tokio::spawn(roll::handle_search(
        client.clone(),
        search_sub,
        Arc::clone(&jwt_secret),
        Arc::clone(&votes),
    ));
    let vote_handle = tokio::spawn(roll::handle_vote(client, vote_sub, jwt_secret, votes));

    info!("All handlers started");

    // Wait for any handler to finish (which means an error occurred)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = template_handle => {
            error!("Import template handler finished: {:?}", result);
        }
        result = validate_handle => {
            error!("Import validate handler finished: {:?}", result);
        }
        result = commit_handle => {
            error!("Import commit handler finished: {:?}", result);
        }
        result = export_count_handle => {
            error!("Export count handler finished: {:?}", result);
        }
        result = export_run_handle => {
            error!("Export run handler finished: {:?}", result);
        }
        result = search_handle => {
            error!("Roll search handler finished: {:?}", result);
        }
        result = vote_handle => {
            error!("Roll vote handler finished: {:?}", result);
        }
    }

    Ok(())
}
