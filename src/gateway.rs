use axum::{
    body::Bytes,
    extract::State,
    Extension, Json,
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::auth::Identity;
use crate::controller::CompletionTransport;
use crate::conversation::Turn;
use crate::error::GatewayError;
use crate::gemini::CompletionModel;

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionReply {
    pub content: String,
}

/// Join turn contents with newlines. Roles are not carried into the prompt.
pub fn flatten_prompt(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(Turn::content)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a request body into turns, rejecting anything but a non-empty
/// `messages` array of well-formed turns.
pub fn parse_messages(body: &[u8]) -> Result<Vec<Turn>, GatewayError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Request body is not JSON");
        GatewayError::MalformedRequest
    })?;

    match value.get("messages") {
        Some(Value::Array(items)) if !items.is_empty() => {}
        _ => return Err(GatewayError::MalformedRequest),
    }

    let request: CompletionRequest = serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "Request messages are malformed");
        GatewayError::MalformedRequest
    })?;
    Ok(request.messages)
}

/// The flatten-then-generate step shared by the HTTP endpoint and the pages.
#[derive(Clone)]
pub struct Gateway {
    model: Arc<dyn CompletionModel>,
}

impl Gateway {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    #[instrument(skip_all, fields(turns = turns.len()))]
    pub async fn complete_turns(&self, turns: &[Turn]) -> Result<String, GatewayError> {
        if turns.is_empty() {
            return Err(GatewayError::MalformedRequest);
        }
        let prompt = flatten_prompt(turns);
        self.model.generate(&prompt).await.map_err(|e| {
            error!(error = %e, "[CONVERSATION_ERROR]");
            GatewayError::from(e)
        })
    }
}

impl CompletionTransport for Gateway {
    fn complete<'a>(&'a self, turns: &'a [Turn]) -> BoxFuture<'a, Result<String, GatewayError>> {
        Box::pin(self.complete_turns(turns))
    }
}

/// `POST /api/code`
///
/// The caller must be signed in before the body is even looked at.
pub async fn completion_handler(
    State(gateway): State<Gateway>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Json<CompletionReply>, GatewayError> {
    let user = identity.user().ok_or(GatewayError::Unauthorized)?;
    let turns = parse_messages(&body)?;
    info!(%user, turns = turns.len(), "Completion requested");

    let content = gateway.complete_turns(&turns).await?;
    Ok(Json(CompletionReply { content }))
}
