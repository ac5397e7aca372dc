//! Voter search and vote marking handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;

use super::{accept, respond};
use crate::services::votes::VoteService;
use crate::types::{ErrorResponse, SearchRequest, SuccessResponse, VoteRequest};

/// Handle pickpad.roll.search
pub async fn handle_search(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    votes: Arc<VoteService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some((reply, request, session)) = accept::<SearchRequest>(&client, &msg, &jwt_secret).await? else {
            continue;
        };

        match votes.search(&request.payload, &session).await {
            Ok(page) => respond(&client, reply, &SuccessResponse::new(request.id, page)).await?,
            Err(e) => respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?,
        }
    }

    Ok(())
}

/// Handle pickpad.roll.vote (`cast: false` clears the vote)
pub async fn handle_vote(
    client: Client,
    mut subscriber: Subscriber,
    jwt_secret: Arc<String>,
    votes: Arc<VoteService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some((reply, request, session)) = accept::<VoteRequest>(&client, &msg, &jwt_secret).await? else {
            continue;
        };

        let VoteRequest { documento, cast } = request.payload;
        let result = if cast {
            votes.mark_vote(documento, &session).await
        } else {
            votes.unmark_vote(documento, &session).await
        };

        match result {
            Ok(row) => respond(&client, reply, &SuccessResponse::new(request.id, row)).await?,
            Err(e) => respond(&client, reply, &ErrorResponse::from_pipeline(request.id, &e)).await?,
        }
    }

    Ok(())
}
