use std::sync::Arc;
use std::time::Duration;

use erabee_core::config::{AppConfig, ConfigError, LoadOptions};
use erabee_core::SkillError;
use erabee_skills::{SkillContext, SlackRetentionCleaner};
use erabee_slack::{MessageSink, SlackApiClient, SlackApiError};
use thiserror::Error;
use tracing::info;

use crate::handler::InvocationHandler;
use crate::routes::AppState;

pub struct Application {
    pub config: Arc<AppConfig>,
    pub handler: Arc<InvocationHandler>,
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState {
            handler: self.handler.clone(),
            signing_secret: self.config.slack.signing_secret.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client setup failed: {0}")]
    Slack(#[source] SlackApiError),
    #[error("skill context setup failed: {0}")]
    Skills(#[source] SkillError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = Arc::new(config);

    let timeout = Duration::from_secs(config.http.timeout_secs);
    let client = SlackApiClient::new(&config.slack, timeout).map_err(BootstrapError::Slack)?;
    let sink: Arc<dyn MessageSink> = Arc::new(client.clone());
    let ctx = SkillContext::new(config.clone(), sink).map_err(BootstrapError::Skills)?;
    let cleaner = Arc::new(SlackRetentionCleaner::new(
        client,
        config.slack.search_query.clone(),
        config.digest.retention_days,
    ));

    let handler = Arc::new(InvocationHandler::new(config.clone(), ctx, cleaner));
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        skill_count = handler.skill_count(),
        "skills registered"
    );

    Ok(Application { config, handler })
}

#[cfg(test)]
mod tests {
    use erabee_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[test]
    fn bootstrap_fails_fast_without_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_bot_token: Some("xapp-wrong-kind".to_owned()),
                slack_channel: Some("C0DEFAULT".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.bot_token"));
    }

    #[test]
    fn bootstrap_registers_every_skill() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_bot_token: Some("xoxb-test".to_owned()),
                slack_channel: Some("C0DEFAULT".to_owned()),
                slack_signing_secret: Some("shh".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.handler.skill_count(), 14);
        assert!(app.state().signing_secret.is_some());
    }
}
