use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use erabee_core::config::AppConfig;
use erabee_core::domain::clock::jst;
use erabee_slack::{MessageSink, OutgoingMessage, PostedMessage, SlackApiError};

use crate::context::{Endpoints, SkillContext};

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().expect("lock sent messages").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|message| message.text).collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, message: OutgoingMessage) -> Result<PostedMessage, SlackApiError> {
        let posted = PostedMessage { channel: message.channel.clone(), ts: "1.0".to_owned() };
        self.sent.lock().expect("lock sent messages").push(message);
        Ok(posted)
    }
}

/// 2024-03-06 12:00 JST, a Wednesday.
pub fn noon_jst() -> DateTime<FixedOffset> {
    jst().with_ymd_and_hms(2024, 3, 6, 12, 0, 0).single().expect("valid JST time")
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.slack.channel = "C0DEFAULT".to_owned();
    config.hotpepper.api_key = Some("hp-key".to_owned().into());
    config.jalan.api_key = Some("jalan-key".to_owned().into());
    config
}

/// Context wired to a mock server at `base`, with a pinned clock and seed.
pub fn context_for(base: &str, config: AppConfig) -> (SkillContext, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let ctx = SkillContext::new(Arc::new(config), sink.clone())
        .expect("skill context")
        .with_endpoints(Endpoints::rooted_at(base))
        .with_fixed_now(noon_jst())
        .with_rng_seed(42);
    (ctx, sink)
}

pub fn shift_jis(text: &str) -> Vec<u8> {
    let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(text);
    bytes.into_owned()
}
