//! Fires the daily digest at a fixed JST wall-clock time.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use cron::Schedule;
use erabee_core::domain::clock::now_jst;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::handler::InvocationHandler;

/// Every day at `run_at`, to the second.
pub fn daily_schedule(run_at: NaiveTime) -> Result<Schedule, cron::error::Error> {
    let expr = format!("{} {} {} * * *", run_at.second(), run_at.minute(), run_at.hour());
    Schedule::from_str(&expr)
}

/// The first fire strictly after `now`, in `now`'s offset.
pub fn next_run_after(
    schedule: &Schedule,
    now: &DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    schedule.after(now).next()
}

pub fn spawn(handler: Arc<InvocationHandler>, schedule: Schedule) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = now_jst();
            let Some(next) = next_run_after(&schedule, &now) else {
                error!(event_name = "scheduler.digest.exhausted", "schedule has no further runs");
                return;
            };
            info!(
                event_name = "scheduler.digest.next",
                next_run = %next.to_rfc3339(),
                "digest scheduled"
            );

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let report = handler.run_digest().await;
            if report.failed_skills() > 0 || report.cleanup_error.is_some() {
                warn!(
                    event_name = "scheduler.digest.partial",
                    failed = report.failed_skills(),
                    cleanup_error = report.cleanup_error.as_deref().unwrap_or(""),
                    "digest finished with failures"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone};
    use erabee_core::domain::clock::jst;

    use super::{daily_schedule, next_run_after};

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).expect("noon")
    }

    #[test]
    fn runs_later_today_when_time_has_not_passed() {
        let schedule = daily_schedule(noon()).expect("schedule");
        let now = jst().with_ymd_and_hms(2024, 3, 6, 9, 30, 0).single().expect("time");

        let next = next_run_after(&schedule, &now).expect("next run");

        assert_eq!(next, jst().with_ymd_and_hms(2024, 3, 6, 12, 0, 0).single().expect("time"));
    }

    #[test]
    fn runs_tomorrow_once_time_has_passed() {
        let schedule = daily_schedule(noon()).expect("schedule");
        let now = jst().with_ymd_and_hms(2024, 2, 29, 12, 0, 0).single().expect("time");

        let next = next_run_after(&schedule, &now).expect("next run");

        assert_eq!(next, jst().with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("time"));
    }

    #[test]
    fn fires_at_the_configured_minute_in_jst() {
        let run_at = NaiveTime::from_hms_opt(8, 45, 0).expect("time");
        let schedule = daily_schedule(run_at).expect("schedule");
        let now = jst().with_ymd_and_hms(2024, 12, 31, 23, 0, 0).single().expect("time");

        let next = next_run_after(&schedule, &now).expect("next run");

        assert_eq!(next, jst().with_ymd_and_hms(2025, 1, 1, 8, 45, 0).single().expect("time"));
        assert_eq!(next.offset(), now.offset());
    }
}
