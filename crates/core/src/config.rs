use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/79.0.3945.88 Safari/537.36";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub hotpepper: ProviderConfig,
    pub jalan: ProviderConfig,
    pub location: LocationConfig,
    pub digest: DigestConfig,
    pub http: HttpConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub user_token: Option<SecretString>,
    pub api_token: Option<SecretString>,
    pub channel: String,
    pub username: String,
    pub search_query: String,
    pub signing_secret: Option<SecretString>,
    pub api_base: String,
}

/// Credentials and endpoint of a third-party search API.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct LocationConfig {
    pub default_lat: String,
    pub default_lng: String,
}

#[derive(Clone, Debug)]
pub struct DigestConfig {
    pub enabled: bool,
    pub run_at: String,
    pub retention_days: u32,
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_user_token: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_api_base: Option<String>,
    pub slack_signing_secret: Option<String>,
    pub hotpepper_api_key: Option<String>,
    pub hotpepper_base_url: Option<String>,
    pub jalan_api_key: Option<String>,
    pub jalan_base_url: Option<String>,
    pub digest_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                bot_token: String::new().into(),
                user_token: None,
                api_token: None,
                channel: String::new(),
                username: "slackbot".to_string(),
                search_query: "from:@slackbot".to_string(),
                signing_secret: None,
                api_base: "https://slack.com/api".to_string(),
            },
            hotpepper: ProviderConfig {
                api_key: None,
                base_url: "http://webservice.recruit.co.jp/hotpepper/gourmet/v1/".to_string(),
            },
            jalan: ProviderConfig {
                api_key: None,
                base_url: "http://jws.jalan.net/APIAdvance/HotelSearch/V1/".to_string(),
            },
            location: LocationConfig {
                default_lat: "35.6736".to_string(),
                default_lng: "139.7414".to_string(),
            },
            digest: DigestConfig {
                enabled: true,
                run_at: "12:00".to_string(),
                retention_days: 14,
            },
            http: HttpConfig { user_agent: DEFAULT_USER_AGENT.to_string(), timeout_secs: 30 },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl DigestConfig {
    /// Wall-clock time (JST) at which the daily digest fires.
    pub fn run_at_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.run_at.trim(), "%H:%M").map_err(|_| {
            ConfigError::Validation(format!(
                "digest.run_at must be formatted as HH:MM, got `{}`",
                self.run_at
            ))
        })
    }
}

impl SlackConfig {
    /// Legacy API token echoed in outgoing payloads, empty when unset.
    pub fn api_token_value(&self) -> String {
        self.api_token.as_ref().map(|token| token.expose_secret().to_owned()).unwrap_or_default()
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("erabee.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(value) = slack.bot_token {
                self.slack.bot_token = secret_value(value);
            }
            if let Some(value) = slack.user_token {
                self.slack.user_token = Some(secret_value(value));
            }
            if let Some(value) = slack.api_token {
                self.slack.api_token = Some(secret_value(value));
            }
            if let Some(channel) = slack.channel {
                self.slack.channel = channel;
            }
            if let Some(username) = slack.username {
                self.slack.username = username;
            }
            if let Some(search_query) = slack.search_query {
                self.slack.search_query = search_query;
            }
            if let Some(value) = slack.signing_secret {
                self.slack.signing_secret = Some(secret_value(value));
            }
            if let Some(api_base) = slack.api_base {
                self.slack.api_base = api_base;
            }
        }

        if let Some(provider) = patch.hotpepper {
            provider.apply_to(&mut self.hotpepper);
        }
        if let Some(provider) = patch.jalan {
            provider.apply_to(&mut self.jalan);
        }

        if let Some(location) = patch.location {
            if let Some(default_lat) = location.default_lat {
                self.location.default_lat = default_lat;
            }
            if let Some(default_lng) = location.default_lng {
                self.location.default_lng = default_lng;
            }
        }

        if let Some(digest) = patch.digest {
            if let Some(enabled) = digest.enabled {
                self.digest.enabled = enabled;
            }
            if let Some(run_at) = digest.run_at {
                self.digest.run_at = run_at;
            }
            if let Some(retention_days) = digest.retention_days {
                self.digest.retention_days = retention_days;
            }
        }

        if let Some(http) = patch.http {
            if let Some(user_agent) = http.user_agent {
                self.http.user_agent = user_agent;
            }
            if let Some(timeout_secs) = http.timeout_secs {
                self.http.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ERABEE_SLACK_BOT_TOKEN") {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("ERABEE_SLACK_USER_TOKEN") {
            self.slack.user_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("ERABEE_SLACK_API_TOKEN") {
            self.slack.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("ERABEE_SLACK_CHANNEL") {
            self.slack.channel = value;
        }
        if let Some(value) = read_env("ERABEE_SLACK_USERNAME") {
            self.slack.username = value;
        }
        if let Some(value) = read_env("ERABEE_SLACK_SEARCH_QUERY") {
            self.slack.search_query = value;
        }
        if let Some(value) = read_env("ERABEE_SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("ERABEE_SLACK_API_BASE") {
            self.slack.api_base = value;
        }

        if let Some(value) = read_env("ERABEE_HOTPEPPER_API_KEY") {
            self.hotpepper.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ERABEE_HOTPEPPER_BASE_URL") {
            self.hotpepper.base_url = value;
        }
        if let Some(value) = read_env("ERABEE_JALAN_API_KEY") {
            self.jalan.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ERABEE_JALAN_BASE_URL") {
            self.jalan.base_url = value;
        }

        if let Some(value) = read_env("ERABEE_LOCATION_DEFAULT_LAT") {
            self.location.default_lat = value;
        }
        if let Some(value) = read_env("ERABEE_LOCATION_DEFAULT_LNG") {
            self.location.default_lng = value;
        }

        if let Some(value) = read_env("ERABEE_DIGEST_ENABLED") {
            self.digest.enabled = parse_bool("ERABEE_DIGEST_ENABLED", &value)?;
        }
        if let Some(value) = read_env("ERABEE_DIGEST_RUN_AT") {
            self.digest.run_at = value;
        }
        if let Some(value) = read_env("ERABEE_DIGEST_RETENTION_DAYS") {
            self.digest.retention_days = parse_u32("ERABEE_DIGEST_RETENTION_DAYS", &value)?;
        }

        if let Some(value) = read_env("ERABEE_HTTP_USER_AGENT") {
            self.http.user_agent = value;
        }
        if let Some(value) = read_env("ERABEE_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_u64("ERABEE_HTTP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ERABEE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ERABEE_SERVER_PORT") {
            self.server.port = parse_u16("ERABEE_SERVER_PORT", &value)?;
        }

        let log_level = read_env("ERABEE_LOGGING_LEVEL").or_else(|| read_env("ERABEE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ERABEE_LOGGING_FORMAT").or_else(|| read_env("ERABEE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(bot_token);
        }
        if let Some(user_token) = overrides.slack_user_token {
            self.slack.user_token = Some(secret_value(user_token));
        }
        if let Some(channel) = overrides.slack_channel {
            self.slack.channel = channel;
        }
        if let Some(api_base) = overrides.slack_api_base {
            self.slack.api_base = api_base;
        }
        if let Some(signing_secret) = overrides.slack_signing_secret {
            self.slack.signing_secret = Some(secret_value(signing_secret));
        }
        if let Some(api_key) = overrides.hotpepper_api_key {
            self.hotpepper.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.hotpepper_base_url {
            self.hotpepper.base_url = base_url;
        }
        if let Some(api_key) = overrides.jalan_api_key {
            self.jalan.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.jalan_base_url {
            self.jalan.base_url = base_url;
        }
        if let Some(enabled) = overrides.digest_enabled {
            self.digest.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_provider("hotpepper", &self.hotpepper)?;
        validate_provider("jalan", &self.jalan)?;
        validate_location(&self.location)?;
        validate_digest(&self.digest)?;
        validate_http(&self.http)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("erabee.toml"), PathBuf::from("config/erabee.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") && !bot_token.starts_with("xoxp-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used an app-level token instead of an OAuth token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-` or `xoxp-`{hint}"
        )));
    }

    if let Some(user_token) = &slack.user_token {
        if !user_token.expose_secret().starts_with("xoxp-") {
            return Err(ConfigError::Validation(
                "slack.user_token must be a user OAuth token starting with `xoxp-` (search.messages rejects bot tokens)".to_string(),
            ));
        }
    }

    if slack.channel.trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.channel is required; digest skills post there".to_string(),
        ));
    }

    if slack.username.trim().is_empty() {
        return Err(ConfigError::Validation("slack.username must not be empty".to_string()));
    }

    if !slack.api_base.starts_with("http://") && !slack.api_base.starts_with("https://") {
        return Err(ConfigError::Validation(
            "slack.api_base must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_provider(name: &str, provider: &ProviderConfig) -> Result<(), ConfigError> {
    if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{name}.base_url must start with http:// or https://"
        )));
    }

    let blank_key =
        provider.api_key.as_ref().map(|key| key.expose_secret().trim().is_empty()).unwrap_or(false);
    if blank_key {
        return Err(ConfigError::Validation(format!("{name}.api_key must not be blank when set")));
    }

    Ok(())
}

fn validate_location(location: &LocationConfig) -> Result<(), ConfigError> {
    for (key, value) in
        [("location.default_lat", &location.default_lat), ("location.default_lng", &location.default_lng)]
    {
        if value.trim().parse::<f64>().is_err() {
            return Err(ConfigError::Validation(format!(
                "{key} must be a decimal coordinate, got `{value}`"
            )));
        }
    }

    Ok(())
}

fn validate_digest(digest: &DigestConfig) -> Result<(), ConfigError> {
    digest.run_at_time()?;

    if digest.retention_days == 0 {
        return Err(ConfigError::Validation(
            "digest.retention_days must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_http(http: &HttpConfig) -> Result<(), ConfigError> {
    if http.timeout_secs == 0 || http.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "http.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if http.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation("http.user_agent must not be empty".to_string()));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    hotpepper: Option<ProviderPatch>,
    jalan: Option<ProviderPatch>,
    location: Option<LocationPatch>,
    digest: Option<DigestPatch>,
    http: Option<HttpPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    user_token: Option<String>,
    api_token: Option<String>,
    channel: Option<String>,
    username: Option<String>,
    search_query: Option<String>,
    signing_secret: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderPatch {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl ProviderPatch {
    fn apply_to(self, provider: &mut ProviderConfig) {
        if let Some(api_key) = self.api_key {
            provider.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = self.base_url {
            provider.base_url = base_url;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LocationPatch {
    default_lat: Option<String>,
    default_lng: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DigestPatch {
    enabled: Option<bool>,
    run_at: Option<String>,
    retention_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpPatch {
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
