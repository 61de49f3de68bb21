use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use erabee_slack::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use erabee_slack::{InboundEvent, InvocationResponse};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::warn;

use crate::handler::InvocationHandler;
use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<InvocationHandler>,
    pub signing_secret: Option<SecretString>,
}

pub fn router(state: AppState) -> Router {
    let skill_count = state.handler.skill_count();
    Router::new()
        .route("/invoke", post(invoke))
        .route("/slack/events", post(slack_events))
        .with_state(state)
        .merge(health::router(skill_count))
}

/// Takes a raw invocation event and returns the response envelope as JSON.
pub async fn invoke(
    State(state): State<AppState>,
    Json(event): Json<Value>,
) -> Json<InvocationResponse> {
    Json(state.handler.handle(&InboundEvent::new(event)).await)
}

/// Slack Events API delivery. Headers are folded into the event so retry
/// suppression sees them.
pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.signing_secret {
        let timestamp = header_str(&headers, TIMESTAMP_HEADER);
        let signature = header_str(&headers, SIGNATURE_HEADER);
        let now = Utc::now().timestamp();
        if let Err(error) =
            signature::verify(secret.expose_secret(), timestamp, &body, signature, now)
        {
            warn!(event_name = "ingress.slack.signature_rejected", error = %error, "rejected request");
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": error.to_string() })))
                .into_response();
        }
    }

    let raw_body = String::from_utf8_lossy(&body);
    let pairs = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)))
        .collect::<Vec<_>>();
    let event = InboundEvent::from_http(pairs, &raw_body);

    into_http(state.handler.handle(&event).await)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn into_http(response: InvocationResponse) -> Response {
    let status = response
        .status_code
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);
    let mut http = Response::new(Body::from(response.body));
    *http.status_mut() = status;

    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) =
            (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
        {
            http.headers_mut().insert(name, value);
        }
    }
    http
}
