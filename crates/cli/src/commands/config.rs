use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use erabee_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(key, value, source(key, env_keys)));
    };

    push(
        "slack.bot_token",
        &redact_token(config.slack.bot_token.expose_secret()),
        &["ERABEE_SLACK_BOT_TOKEN"],
    );
    push(
        "slack.user_token",
        &config
            .slack
            .user_token
            .as_ref()
            .map(|token| redact_token(token.expose_secret()))
            .unwrap_or_else(|| "<unset>".to_string()),
        &["ERABEE_SLACK_USER_TOKEN"],
    );
    push("slack.api_token", presence(config.slack.api_token.as_ref()), &["ERABEE_SLACK_API_TOKEN"]);
    push("slack.channel", &config.slack.channel, &["ERABEE_SLACK_CHANNEL"]);
    push("slack.username", &config.slack.username, &["ERABEE_SLACK_USERNAME"]);
    push("slack.search_query", &config.slack.search_query, &["ERABEE_SLACK_SEARCH_QUERY"]);
    push(
        "slack.signing_secret",
        presence(config.slack.signing_secret.as_ref()),
        &["ERABEE_SLACK_SIGNING_SECRET"],
    );
    push("slack.api_base", &config.slack.api_base, &["ERABEE_SLACK_API_BASE"]);

    push(
        "hotpepper.api_key",
        presence(config.hotpepper.api_key.as_ref()),
        &["ERABEE_HOTPEPPER_API_KEY"],
    );
    push("hotpepper.base_url", &config.hotpepper.base_url, &["ERABEE_HOTPEPPER_BASE_URL"]);
    push("jalan.api_key", presence(config.jalan.api_key.as_ref()), &["ERABEE_JALAN_API_KEY"]);
    push("jalan.base_url", &config.jalan.base_url, &["ERABEE_JALAN_BASE_URL"]);

    push("location.default_lat", &config.location.default_lat, &["ERABEE_LOCATION_DEFAULT_LAT"]);
    push("location.default_lng", &config.location.default_lng, &["ERABEE_LOCATION_DEFAULT_LNG"]);

    push("digest.enabled", &config.digest.enabled.to_string(), &["ERABEE_DIGEST_ENABLED"]);
    push("digest.run_at", &config.digest.run_at, &["ERABEE_DIGEST_RUN_AT"]);
    push(
        "digest.retention_days",
        &config.digest.retention_days.to_string(),
        &["ERABEE_DIGEST_RETENTION_DAYS"],
    );

    push("http.user_agent", &config.http.user_agent, &["ERABEE_HTTP_USER_AGENT"]);
    push("http.timeout_secs", &config.http.timeout_secs.to_string(), &["ERABEE_HTTP_TIMEOUT_SECS"]);

    push("server.bind_address", &config.server.bind_address, &["ERABEE_SERVER_BIND_ADDRESS"]);
    push("server.port", &config.server.port.to_string(), &["ERABEE_SERVER_PORT"]);

    push("logging.level", &config.logging.level, &["ERABEE_LOGGING_LEVEL", "ERABEE_LOG_LEVEL"]);
    push(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["ERABEE_LOGGING_FORMAT", "ERABEE_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["erabee.toml", "config/erabee.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn presence(secret: Option<&SecretString>) -> &'static str {
    if secret.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
