/// Broker push endpoint
use crate::{error::Result, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use refrain_core::InboundMessage;

/// POST /internal/events/:topic
///
/// The body is the record value as published on `topic`. It is decoded and
/// validated here, then handed to the ingress workers. The 202 is only sent
/// once a worker has applied the message. A full ingress queue answers 503
/// so the bridge redelivers later.
pub async fn receive(
    Path(topic): Path<String>,
    State(app_state): State<AppState>,
    body: String,
) -> Result<StatusCode> {
    let message = InboundMessage::decode(&topic, &body, &app_state.topics)?;
    tracing::debug!(topic = %topic, kind = message.kind(), "Received inbound message");

    app_state.ingress_queue.process(message).await?;
    Ok(StatusCode::ACCEPTED)
}
