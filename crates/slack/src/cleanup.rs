//! Retention cleanup: deletes the bot's own messages once they are older than
//! the configured window.

use chrono::{DateTime, Duration, TimeZone};
use tracing::{info, warn};

use crate::api::{SearchMatch, SlackApiClient, SlackApiError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub matched: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Matches whose `ts` falls strictly before `now - retention_days`.
/// Unparsable timestamps are never considered expired.
pub fn expired_matches<'a, Tz>(
    matches: &'a [SearchMatch],
    now: &DateTime<Tz>,
    retention_days: u32,
) -> Vec<&'a SearchMatch>
where
    Tz: TimeZone,
{
    let limit = now.clone() - Duration::days(i64::from(retention_days));
    let limit_secs = limit.timestamp() as f64 + f64::from(limit.timestamp_subsec_micros()) / 1e6;

    matches
        .iter()
        .filter(|hit| hit.ts.trim().parse::<f64>().map(|ts| ts < limit_secs).unwrap_or(false))
        .collect()
}

pub async fn delete_old_publications<Tz>(
    client: &SlackApiClient,
    query: &str,
    retention_days: u32,
    now: &DateTime<Tz>,
) -> Result<CleanupReport, SlackApiError>
where
    Tz: TimeZone,
{
    let matches = client.search_messages(query).await?;
    let expired = expired_matches(&matches, now, retention_days);
    let mut report = CleanupReport { matched: matches.len(), ..CleanupReport::default() };

    for hit in expired {
        match client.delete_message(&hit.channel_id, &hit.ts).await {
            Ok(()) => {
                info!(
                    event_name = "cleanup.message.deleted",
                    channel = %hit.channel_id,
                    ts = %hit.ts,
                    username = %hit.username,
                    "deleted expired message"
                );
                report.deleted += 1;
            }
            Err(error) => {
                warn!(
                    event_name = "cleanup.message.delete_failed",
                    channel = %hit.channel_id,
                    ts = %hit.ts,
                    error = %error,
                    "could not delete expired message"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        event_name = "cleanup.finish",
        matched = report.matched,
        deleted = report.deleted,
        failed = report.failed,
        retention_days,
        "cleanup finished"
    );
    Ok(report)
}
