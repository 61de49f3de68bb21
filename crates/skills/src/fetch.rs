use std::time::Duration;

use erabee_core::config::HttpConfig;
use erabee_core::SkillError;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Character encoding of a source's response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    ShiftJis,
}

impl Charset {
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::ShiftJis => "Shift_JIS",
        }
    }
}

pub type QueryParams = Vec<(&'static str, String)>;

/// Shared HTTP client. Every request carries the configured desktop browser
/// User-Agent, since several sources refuse unknown agents.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, SkillError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| SkillError::Configuration(format!("http client: {error}")))?;
        Ok(Self { client })
    }

    pub async fn get_bytes(
        &self,
        origin: &str,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Vec<u8>, SkillError> {
        debug!(event_name = "egress.http.get", origin, url, param_count = query.len(), "GET");

        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|error| SkillError::fetch(origin, error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SkillError::fetch(origin, format!("http status {}", status.as_u16())));
        }

        let bytes = response.bytes().await.map_err(|error| SkillError::fetch(origin, error))?;
        Ok(bytes.to_vec())
    }

    pub async fn get_text(
        &self,
        origin: &str,
        url: &str,
        query: &[(&'static str, String)],
        charset: Charset,
    ) -> Result<String, SkillError> {
        let bytes = self.get_bytes(origin, url, query).await?;
        decode(origin, &bytes, charset)
    }

    pub async fn get_json<T>(
        &self,
        origin: &str,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, SkillError>
    where
        T: DeserializeOwned,
    {
        let text = self.get_text(origin, url, query, Charset::Utf8).await?;
        serde_json::from_str(&text).map_err(|error| SkillError::parse(origin, error))
    }
}

pub fn decode(origin: &str, bytes: &[u8], charset: Charset) -> Result<String, SkillError> {
    let decode_error =
        || SkillError::Decode { origin: origin.to_owned(), encoding: charset.label() };

    match charset {
        Charset::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| decode_error()),
        Charset::ShiftJis => {
            let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
            if had_errors {
                return Err(decode_error());
            }
            Ok(text.into_owned())
        }
    }
}
