use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use curabot_discord::verify::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use curabot_discord::{EventContext, InteractionDispatcher, InteractionEvent, InteractionVerifier};
use serde_json::json;
use tracing::{info, warn};

#[derive(Clone)]
pub struct InteractionState {
    verifier: Arc<InteractionVerifier>,
    dispatcher: Arc<InteractionDispatcher>,
}

impl InteractionState {
    pub fn new(verifier: InteractionVerifier, dispatcher: Arc<InteractionDispatcher>) -> Self {
        Self { verifier: Arc::new(verifier), dispatcher }
    }
}

pub fn router(state: InteractionState) -> Router {
    Router::new().route("/interactions", post(handle_interaction)).with_state(state)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Verifies, parses and dispatches one webhook delivery. Deferred work is spawned before the
/// initial response is written and never awaited here.
pub async fn handle_interaction(
    State(state): State<InteractionState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let verified = state.verifier.verify(
        header_str(&headers, SIGNATURE_HEADER),
        header_str(&headers, TIMESTAMP_HEADER),
        &body,
    );
    if let Err(error) = verified {
        warn!(event_name = "http.interactions.unauthorized", error = %error, "rejected interaction signature");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let ctx = EventContext::generate();
    let event = match InteractionEvent::from_slice(&body) {
        Ok(event) => event,
        Err(error) => {
            warn!(
                event_name = "http.interactions.malformed",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "could not parse interaction"
            );
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "malformed interaction" })))
                .into_response();
        }
    };

    match state.dispatcher.dispatch(event, &ctx).await {
        Ok(outcome) => {
            info!(
                event_name = "http.interactions.responded",
                correlation_id = %ctx.correlation_id,
                response_type = outcome.response.type_code(),
                deferred = outcome.deferred.is_some(),
                "interaction answered"
            );
            if let Some(task) = outcome.deferred {
                state.dispatcher.spawn_deferred(task, ctx);
            }
            Json(outcome.response).into_response()
        }
        Err(error) => {
            warn!(
                event_name = "http.interactions.rejected",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "interaction rejected"
            );
            (StatusCode::BAD_REQUEST, Json(json!({ "error": error.marker() }))).into_response()
        }
    }
}
