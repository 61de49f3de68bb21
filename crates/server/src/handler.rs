//! The invocation entry point: one inbound event in, one response out.

use std::sync::Arc;

use erabee_core::config::AppConfig;
use erabee_core::{Invocation, SkillError};
use erabee_skills::digest::{DigestReport, DigestRunner, RetentionCleaner};
use erabee_skills::yahoo::sample_topics;
use erabee_skills::{default_router, SkillContext, SkillRouter};
use erabee_slack::cleanup::CleanupReport;
use erabee_slack::{InboundEvent, InvocationResponse, RouteOutcome, SlackApiError};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct InvocationHandler {
    config: Arc<AppConfig>,
    router: SkillRouter,
    ctx: SkillContext,
    cleaner: Arc<dyn RetentionCleaner>,
    digest: DigestRunner,
}

impl InvocationHandler {
    pub fn new(
        config: Arc<AppConfig>,
        ctx: SkillContext,
        cleaner: Arc<dyn RetentionCleaner>,
    ) -> Self {
        Self { config, router: default_router(), ctx, cleaner, digest: DigestRunner::default() }
    }

    pub fn skill_count(&self) -> usize {
        self.router.skill_count()
    }

    pub fn knows(&self, method: &str) -> bool {
        self.router.contains(method)
    }

    pub async fn run_digest(&self) -> DigestReport {
        self.digest.run(&self.router, &self.ctx, self.cleaner.as_ref()).await
    }

    /// Runs a single skill outside of any inbound event. Unlike `handle`,
    /// skill errors are returned to the caller.
    pub async fn invoke(&self, invocation: &Invocation) -> Result<RouteOutcome, SkillError> {
        self.router.route(&self.ctx, invocation).await
    }

    pub async fn run_cleanup(&self) -> Result<CleanupReport, SlackApiError> {
        self.cleaner.clean(&self.ctx.now()).await
    }

    /// Handles one event. Failures inside skills are logged and never change
    /// the response; only retried deliveries and handshakes short-circuit.
    pub async fn handle(&self, event: &InboundEvent) -> InvocationResponse {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "invocation.start",
            correlation_id = %correlation_id,
            scheduled = event.is_scheduled(),
            "invocation received"
        );

        if event.is_scheduled() {
            let report = self.run_digest().await;
            info!(
                event_name = "invocation.digest.finish",
                correlation_id = %correlation_id,
                failed = report.failed_skills(),
                deleted = report.deleted,
                "scheduled digest finished"
            );
        }

        match event.webhook() {
            Ok(Some(webhook)) => {
                if webhook.is_url_verification() {
                    if let Some(challenge) = webhook.payload.challenge.as_deref() {
                        info!(
                            event_name = "invocation.url_verification",
                            correlation_id = %correlation_id,
                            "answering url verification"
                        );
                        return InvocationResponse::challenge_response(challenge);
                    }
                }

                if webhook.is_retry() {
                    info!(
                        event_name = "invocation.retry.suppressed",
                        correlation_id = %correlation_id,
                        "ignoring retried delivery"
                    );
                    return InvocationResponse::retry_acknowledgement(
                        &webhook.reply_target(),
                        &self.config.slack,
                    );
                }

                match webhook.invocation() {
                    Some(invocation) => match self.router.route(&self.ctx, &invocation).await {
                        Ok(RouteOutcome::Dispatched) => {}
                        Ok(RouteOutcome::Ignored) => debug!(
                            event_name = "invocation.method.unknown",
                            correlation_id = %correlation_id,
                            method = %invocation.method,
                            "no skill for method"
                        ),
                        Err(skill_error) => error!(
                            event_name = "invocation.skill.failed",
                            correlation_id = %correlation_id,
                            method = %invocation.method,
                            error_class = skill_error.error_class(),
                            error = %skill_error,
                            "skill failed"
                        ),
                    },
                    None => debug!(
                        event_name = "invocation.method.missing",
                        correlation_id = %correlation_id,
                        "message carries no method"
                    ),
                }
            }
            Ok(None) => {}
            Err(parse_error) => warn!(
                event_name = "invocation.body.invalid",
                correlation_id = %correlation_id,
                error = %parse_error,
                "could not read webhook body"
            ),
        }

        let response = self.final_response(event, &correlation_id).await;
        info!(event_name = "invocation.finish", correlation_id = %correlation_id, "invocation done");
        response
    }

    async fn final_response(
        &self,
        event: &InboundEvent,
        correlation_id: &str,
    ) -> InvocationResponse {
        if !event.body_is_string() {
            return InvocationResponse::event_echo(event, &self.config.slack);
        }

        let topics = match sample_topics(&self.ctx).await {
            Ok(topics) => topics,
            Err(sample_error) => {
                warn!(
                    event_name = "invocation.sample.failed",
                    correlation_id,
                    error = %sample_error,
                    "could not build sample payload"
                );
                Vec::new()
            }
        };
        InvocationResponse::final_response(&json!(topics))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use erabee_core::config::AppConfig;
    use erabee_core::domain::clock::jst;
    use erabee_core::{Invocation, ReplyTarget};
    use erabee_skills::{Endpoints, RetentionCleaner, SkillContext};
    use erabee_slack::cleanup::CleanupReport;
    use erabee_slack::{
        InboundEvent, MessageSink, OutgoingMessage, PostedMessage, RouteOutcome, SlackApiError,
    };
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    use super::InvocationHandler;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn send(&self, message: OutgoingMessage) -> Result<PostedMessage, SlackApiError> {
            let posted = PostedMessage { channel: message.channel.clone(), ts: "1.0".to_owned() };
            self.sent.lock().expect("lock sent").push(message);
            Ok(posted)
        }
    }

    #[derive(Default)]
    struct CountingCleaner {
        runs: Mutex<usize>,
    }

    #[async_trait]
    impl RetentionCleaner for CountingCleaner {
        async fn clean(
            &self,
            _now: &DateTime<FixedOffset>,
        ) -> Result<CleanupReport, SlackApiError> {
            *self.runs.lock().expect("lock runs") += 1;
            Ok(CleanupReport::default())
        }
    }

    struct Fixture {
        handler: InvocationHandler,
        sink: Arc<RecordingSink>,
        cleaner: Arc<CountingCleaner>,
    }

    fn fixture(base: &str) -> Fixture {
        let mut config = AppConfig::default();
        config.slack.channel = "C0DEFAULT".to_owned();
        config.slack.api_token = Some("legacy-token".to_owned().into());
        let config = Arc::new(config);

        let sink = Arc::new(RecordingSink::default());
        let cleaner = Arc::new(CountingCleaner::default());
        let now = jst().with_ymd_and_hms(2024, 3, 6, 12, 0, 0).single().expect("time");
        let ctx = SkillContext::new(config.clone(), sink.clone())
            .expect("context")
            .with_endpoints(Endpoints::rooted_at(base))
            .with_fixed_now(now);

        Fixture { handler: InvocationHandler::new(config, ctx, cleaner.clone()), sink, cleaner }
    }

    fn mention(text: &str) -> Value {
        json!({
            "type": "event_callback",
            "challenge": "abc",
            "event": {"type": "app_mention", "text": text, "channel": "C42"}
        })
    }

    #[tokio::test]
    async fn dispatches_mention_and_echoes_object_body() {
        let fixture = fixture("http://127.0.0.1:1");
        let event = InboundEvent::new(json!({"body": mention("<@U0BOT>\u{3000}help")}));

        let response = fixture.handler.handle(&event).await;

        let sent = fixture.sink.sent.lock().expect("lock sent").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel, "C42");
        assert!(sent[0].text.starts_with("メソッド一覧 "));

        let body: Value = serde_json::from_str(&response.body).expect("json body");
        assert_eq!(body["token"], "legacy-token");
        assert_eq!(body["event"]["body"]["event"]["channel"], "C42");
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    }

    #[tokio::test]
    async fn retried_delivery_is_acknowledged_without_dispatch() {
        let fixture = fixture("http://127.0.0.1:1");
        let event = InboundEvent::new(json!({
            "body": mention("<@U0BOT> help"),
            "headers": {"x-slack-retry-num": "1"}
        }));

        let response = fixture.handler.handle(&event).await;

        assert!(fixture.sink.sent.lock().expect("lock sent").is_empty());
        let body: Value = serde_json::from_str(&response.body).expect("json body");
        assert_eq!(
            body,
            json!({
                "token": "legacy-token",
                "channel": "C42",
                "challenge": "abc",
                "type": "event_callback",
                "username": "slackbot"
            })
        );
        assert!(!response.headers.contains_key("Access-Control-Allow-Origin"));
    }

    #[tokio::test]
    async fn unknown_method_sends_nothing() {
        let fixture = fixture("http://127.0.0.1:1");
        let event = InboundEvent::new(json!({"body": mention("<@U0BOT> dance now")}));

        let response = fixture.handler.handle(&event).await;

        assert!(fixture.sink.sent.lock().expect("lock sent").is_empty());
        assert_eq!(response.status_code, "200");
    }

    #[tokio::test]
    async fn url_verification_returns_challenge() {
        let fixture = fixture("http://127.0.0.1:1");
        let event = InboundEvent::new(json!({
            "body": {"type": "url_verification", "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"}
        }));

        let response = fixture.handler.handle(&event).await;

        let body: Value = serde_json::from_str(&response.body).expect("json body");
        assert_eq!(body["challenge"], "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P");
    }

    #[tokio::test]
    async fn string_body_returns_yahoo_sample() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(
                    r#"<ul class="topicsList_main"><li><a href="https://news.yahoo.co.jp/pickup/1">見出し</a></li></ul>"#,
                );
            })
            .await;
        let fixture = fixture(&server.base_url());
        let event = InboundEvent::new(json!({"body": mention("<@U0BOT> dance").to_string()}));

        let response = fixture.handler.handle(&event).await;

        let body: Value = serde_json::from_str(&response.body).expect("json body");
        assert_eq!(body, json!([{"title": "見出し", "url": "https://news.yahoo.co.jp/pickup/1"}]));
    }

    #[tokio::test]
    async fn failed_sample_falls_back_to_empty_list() {
        let fixture = fixture("http://127.0.0.1:1");
        let event = InboundEvent::new(json!({"body": ""}));

        let response = fixture.handler.handle(&event).await;

        assert_eq!(response.body, "[]");
    }

    #[tokio::test]
    async fn scheduler_signal_runs_digest_and_cleanup() {
        let fixture = fixture("http://127.0.0.1:1");
        let event = InboundEvent::new(json!({"source": "aws.events"}));

        let response = fixture.handler.handle(&event).await;

        assert_eq!(*fixture.cleaner.runs.lock().expect("lock runs"), 1);
        let body: Value = serde_json::from_str(&response.body).expect("json body");
        assert_eq!(body["event"]["source"], "aws.events");
    }

    #[tokio::test]
    async fn invoke_reports_skill_errors_to_the_caller() {
        let fixture = fixture("http://127.0.0.1:1");

        let help = fixture
            .handler
            .invoke(&Invocation::new("help", vec!["qiita".to_owned()], ReplyTarget::channel("C7")))
            .await
            .expect("help runs");
        assert_eq!(help, RouteOutcome::Dispatched);

        let unknown =
            fixture.handler.invoke(&Invocation::scheduled("dance")).await.expect("ignored");
        assert_eq!(unknown, RouteOutcome::Ignored);
        assert!(!fixture.handler.knows("dance"));

        let qiita = fixture.handler.invoke(&Invocation::scheduled("qiita")).await;
        assert!(qiita.is_err());

        fixture.handler.run_cleanup().await.expect("cleanup");
        assert_eq!(*fixture.cleaner.runs.lock().expect("lock runs"), 1);
        assert_eq!(fixture.sink.sent.lock().expect("lock sent").len(), 1);
    }
}
