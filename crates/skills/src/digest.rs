//! Daily digest: the news skills in a fixed order, then retention cleanup.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use erabee_core::Invocation;
use erabee_slack::cleanup::{delete_old_publications, CleanupReport};
use erabee_slack::{RouteOutcome, SlackApiClient, SlackApiError};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::SkillContext;
use crate::SkillRouter;

/// Skills run by the digest, in order.
pub const DIGEST_SKILLS: [&str; 6] =
    ["ait", "itmediaRanking", "itmediaYesterday", "zdJapan", "weeklyReport", "noticeAlert"];

#[async_trait]
pub trait RetentionCleaner: Send + Sync {
    async fn clean(&self, now: &DateTime<FixedOffset>) -> Result<CleanupReport, SlackApiError>;
}

/// Deletes the bot's messages found by `search.messages` once they fall out
/// of the retention window.
pub struct SlackRetentionCleaner {
    client: SlackApiClient,
    query: String,
    retention_days: u32,
}

impl SlackRetentionCleaner {
    pub fn new(client: SlackApiClient, query: impl Into<String>, retention_days: u32) -> Self {
        Self { client, query: query.into(), retention_days }
    }
}

#[async_trait]
impl RetentionCleaner for SlackRetentionCleaner {
    async fn clean(&self, now: &DateTime<FixedOffset>) -> Result<CleanupReport, SlackApiError> {
        delete_old_publications(&self.client, &self.query, self.retention_days, now).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DigestEntry {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DigestReport {
    pub skills: Vec<DigestEntry>,
    pub deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,
}

impl DigestReport {
    pub fn failed_skills(&self) -> usize {
        self.skills.iter().filter(|entry| !entry.ok).count()
    }
}

pub struct DigestRunner {
    skills: Vec<String>,
}

impl DigestRunner {
    pub fn new<I, S>(skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { skills: skills.into_iter().map(Into::into).collect() }
    }

    /// Runs every skill to completion, one after another. A failing skill is
    /// logged and the next one still runs; cleanup always runs last.
    pub async fn run(
        &self,
        router: &SkillRouter,
        ctx: &SkillContext,
        cleaner: &dyn RetentionCleaner,
    ) -> DigestReport {
        info!(event_name = "digest.start", skill_count = self.skills.len(), "digest started");
        let mut report = DigestReport::default();

        for name in &self.skills {
            let invocation = Invocation::scheduled(name.as_str());
            let entry = match router.route(ctx, &invocation).await {
                Ok(RouteOutcome::Dispatched) => {
                    DigestEntry { name: name.clone(), ok: true, error: None }
                }
                Ok(RouteOutcome::Ignored) => {
                    warn!(event_name = "digest.skill.missing", skill = %name, "skill not registered");
                    DigestEntry {
                        name: name.clone(),
                        ok: false,
                        error: Some("skill is not registered".to_owned()),
                    }
                }
                Err(skill_error) => {
                    error!(
                        event_name = "digest.skill.failed",
                        skill = %name,
                        error_class = skill_error.error_class(),
                        error = %skill_error,
                        "digest skill failed"
                    );
                    DigestEntry {
                        name: name.clone(),
                        ok: false,
                        error: Some(skill_error.to_string()),
                    }
                }
            };
            report.skills.push(entry);
        }

        match cleaner.clean(&ctx.now()).await {
            Ok(cleanup) => report.deleted = cleanup.deleted,
            Err(cleanup_error) => {
                error!(
                    event_name = "digest.cleanup.failed",
                    error = %cleanup_error,
                    "retention cleanup failed"
                );
                report.cleanup_error = Some(cleanup_error.to_string());
            }
        }

        info!(
            event_name = "digest.finish",
            failed = report.failed_skills(),
            deleted = report.deleted,
            "digest finished"
        );
        report
    }
}

impl Default for DigestRunner {
    fn default() -> Self {
        Self::new(DIGEST_SKILLS)
    }
}
