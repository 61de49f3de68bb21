//! Slack Web API calls used by the bot: post, search and delete.

use std::time::Duration;

use async_trait::async_trait;
use erabee_core::config::SlackConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::messages::OutgoingMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack {method} request failed: {message}")]
    Transport { method: &'static str, message: String },
    #[error("slack {method} returned http status {status}")]
    Status { method: &'static str, status: u16 },
    #[error("slack {method} failed: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack {method} requires slack.user_token")]
    MissingUserToken { method: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackOkResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackSearchResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: SlackSearchMessages,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackSearchMessages {
    #[serde(default)]
    matches: Vec<SlackSearchMatch>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackSearchMatch {
    ts: String,
    channel: SlackSearchChannel,
    #[serde(default)]
    username: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackSearchChannel {
    id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// One hit from `search.messages`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchMatch {
    pub ts: String,
    pub channel_id: String,
    pub username: String,
    pub text: String,
}

/// The shared "send message" seam. Skills only ever talk to Slack through it.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<PostedMessage, SlackApiError>;
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
    user_token: Option<SecretString>,
}

impl SlackApiClient {
    pub fn new(config: &SlackConfig, timeout: Duration) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SlackApiError::Transport { method: "client", message: error.to_string() })?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            user_token: config.user_token.clone(),
        })
    }

    pub async fn post_message(
        &self,
        message: &OutgoingMessage,
    ) -> Result<PostedMessage, SlackApiError> {
        const METHOD: &str = "chat.postMessage";
        info!(
            event_name = "egress.slack.post_message",
            channel = %message.channel,
            text_len = message.text.chars().count(),
            "sending slack message"
        );

        let request = self
            .http
            .post(format!("{}/{METHOD}", self.api_base))
            .bearer_auth(self.bot_token.expose_secret())
            .json(message);
        let response: SlackChatMessageResponse = send_json(METHOD, request).await?;

        if !response.ok {
            return Err(api_error(METHOD, response.error));
        }

        Ok(PostedMessage {
            channel: response.channel.unwrap_or_else(|| message.channel.clone()),
            ts: response.ts.unwrap_or_default(),
        })
    }

    /// Oldest first. `search.messages` only accepts user tokens.
    pub async fn search_messages(&self, query: &str) -> Result<Vec<SearchMatch>, SlackApiError> {
        const METHOD: &str = "search.messages";
        let user_token =
            self.user_token.as_ref().ok_or(SlackApiError::MissingUserToken { method: METHOD })?;

        let request = self
            .http
            .get(format!("{}/{METHOD}", self.api_base))
            .bearer_auth(user_token.expose_secret())
            .query(&[("query", query), ("sort", "timestamp"), ("sort_dir", "asc")]);
        let response: SlackSearchResponse = send_json(METHOD, request).await?;

        if !response.ok {
            return Err(api_error(METHOD, response.error));
        }

        Ok(response
            .messages
            .matches
            .into_iter()
            .map(|hit| SearchMatch {
                ts: hit.ts,
                channel_id: hit.channel.id,
                username: hit.username,
                text: hit.text,
            })
            .collect())
    }

    pub async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackApiError> {
        const METHOD: &str = "chat.delete";
        let request = self
            .http
            .post(format!("{}/{METHOD}", self.api_base))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&json!({ "channel": channel, "ts": ts }));
        let response: SlackOkResponse = send_json(METHOD, request).await?;

        if !response.ok {
            return Err(api_error(METHOD, response.error));
        }

        Ok(())
    }
}

#[async_trait]
impl MessageSink for SlackApiClient {
    async fn send(&self, message: OutgoingMessage) -> Result<PostedMessage, SlackApiError> {
        match self.post_message(&message).await {
            Ok(posted) => {
                debug!(
                    event_name = "egress.slack.post_message.ok",
                    channel = %posted.channel,
                    ts = %posted.ts,
                    "slack message posted"
                );
                Ok(posted)
            }
            Err(error) => {
                warn!(
                    event_name = "egress.slack.post_message.failed",
                    channel = %message.channel,
                    error = %error,
                    "slack message was not delivered"
                );
                Err(error)
            }
        }
    }
}

async fn send_json<T>(
    method: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, SlackApiError>
where
    T: DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|error| SlackApiError::Transport { method, message: error.to_string() })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SlackApiError::Status { method, status: status.as_u16() });
    }

    response
        .json::<T>()
        .await
        .map_err(|error| SlackApiError::Transport { method, message: error.to_string() })
}

fn api_error(method: &'static str, error: Option<String>) -> SlackApiError {
    SlackApiError::Api { method, error: error.unwrap_or_else(|| "unknown error".to_string()) }
}
