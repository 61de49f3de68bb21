use std::collections::BTreeMap;

use erabee_core::config::SlackConfig;
use erabee_core::{Invocation, ReplyTarget};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::commands::parse_mention;

pub const RETRY_HEADER: &str = "X-Slack-Retry-Num";
pub const SCHEDULER_SOURCE: &str = "aws.events";
pub const URL_VERIFICATION: &str = "url_verification";

const CORS_ALLOW_HEADERS: &str = "X-Requested-With, Origin, X-Csrftoken, Content-Type, Accept";
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("webhook body is not valid JSON: {0}")]
    InvalidBody(String),
    #[error("webhook body has unsupported shape: {0}")]
    UnsupportedBody(&'static str),
}

/// A raw inbound event: either a scheduler signal or a webhook delivery of
/// the shape `{ source?, body?, headers? }`.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    raw: Value,
}

impl InboundEvent {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Folds an HTTP delivery (headers plus raw body) into the event shape.
    pub fn from_http<'a, I>(headers: I, body: &str) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_owned(), Value::String(value.to_owned())))
            .collect::<serde_json::Map<_, _>>();
        Self::new(json!({ "body": body, "headers": headers }))
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn is_scheduled(&self) -> bool {
        self.raw.get("source").and_then(Value::as_str) == Some(SCHEDULER_SOURCE)
    }

    pub fn body_is_string(&self) -> bool {
        matches!(self.raw.get("body"), Some(Value::String(_)))
    }

    pub fn has_retry_header(&self) -> bool {
        let Some(headers) = self.raw.get("headers").and_then(Value::as_object) else {
            return false;
        };

        headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(RETRY_HEADER))
            .any(|(_, value)| is_truthy(value))
    }

    /// The Slack payload carried in `body`, if any. String bodies are parsed
    /// as JSON; object bodies are taken as they are.
    pub fn webhook(&self) -> Result<Option<WebhookRequest>, EventParseError> {
        let payload = match self.raw.get("body") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(body)) if body.trim().is_empty() => return Ok(None),
            Some(Value::String(body)) => serde_json::from_str::<EventCallback>(body)
                .map_err(|error| EventParseError::InvalidBody(error.to_string()))?,
            Some(body @ Value::Object(_)) => serde_json::from_value::<EventCallback>(body.clone())
                .map_err(|error| EventParseError::InvalidBody(error.to_string()))?,
            Some(_) => return Err(EventParseError::UnsupportedBody("expected string or object")),
        };

        Ok(Some(WebhookRequest { payload, retry: self.has_retry_header() }))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct EventCallback {
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default, rename = "type")]
    pub slack_type: Option<String>,
    #[serde(default)]
    pub event: Option<MessageEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookRequest {
    pub payload: EventCallback,
    pub retry: bool,
}

impl WebhookRequest {
    pub fn is_retry(&self) -> bool {
        self.retry
    }

    pub fn is_url_verification(&self) -> bool {
        self.payload.slack_type.as_deref() == Some(URL_VERIFICATION)
    }

    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            channel: self.payload.event.as_ref().and_then(|event| event.channel.clone()),
            challenge: self.payload.challenge.clone(),
            slack_type: self.payload.slack_type.clone(),
        }
    }

    /// `None` when the message carries no method token.
    pub fn invocation(&self) -> Option<Invocation> {
        let text = self.payload.event.as_ref()?.text.as_deref()?;
        let (method, args) = parse_mention(text)?;
        Some(Invocation::new(method, args, self.reply_target()))
    }
}

/// What the entry point hands back to whoever delivered the event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl InvocationResponse {
    /// Canned reply for Slack's retried deliveries. Shaped like a handshake
    /// reply whether or not the original request was one. `channel` is the
    /// event's own channel and stays null when the event carried none.
    pub fn retry_acknowledgement(reply: &ReplyTarget, slack: &SlackConfig) -> Self {
        let body = json!({
            "token": slack.api_token_value(),
            "channel": reply.channel,
            "challenge": reply.challenge,
            "type": reply.slack_type,
            "username": slack.username,
        });

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_owned(), JSON_CONTENT_TYPE.to_owned());
        Self { status_code: "200".to_owned(), body: body.to_string(), headers }
    }

    pub fn challenge_response(challenge: &str) -> Self {
        let mut response = Self::final_response(&json!({ "challenge": challenge }));
        response.headers.remove("Access-Control-Allow-Origin");
        response.headers.remove("Access-Control-Allow-Headers");
        response
    }

    pub fn final_response(payload: &Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_owned(), JSON_CONTENT_TYPE.to_owned());
        headers.insert("Access-Control-Allow-Origin".to_owned(), "*".to_owned());
        headers.insert("Access-Control-Allow-Headers".to_owned(), CORS_ALLOW_HEADERS.to_owned());
        Self { status_code: "200".to_owned(), body: payload.to_string(), headers }
    }

    /// `{event, token}` echo used when the body is not a plain string.
    pub fn event_echo(event: &InboundEvent, slack: &SlackConfig) -> Self {
        Self::final_response(&json!({ "event": event.raw(), "token": slack.api_token_value() }))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
