//! JPCERT/CC front page: the Weekly Report and the recent alert lists.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use erabee_core::domain::clock::{iso_date, noon_cutoff, yesterday};
use erabee_core::{Invocation, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use crate::context::SkillContext;
use crate::fetch::Charset;
use crate::html::{first_in, require_first, selector, text_of};

pub const NOTICE_HEADER: &str = "【 JPCERT の直近の注意喚起 】";
pub const VULNERABILITY_HEADER: &str = "【 JPCERT の直近の脆弱性関連情報 】";

const ORIGIN: &str = "jpcert";
const NOTICE_SECTION: &str = "注意喚起";
const VULNERABILITY_SECTION: &str = "脆弱性関連情報";
const PUBLISHED_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeeklyReport {
    /// Issue label as shown on the page, e.g. `2024-03-06号`.
    pub issue: String,
    pub url: String,
    pub topics: Vec<String>,
}

impl WeeklyReport {
    pub fn message(&self) -> MessageBuilder {
        MessageBuilder::new()
            .header(format!("【 JPCERT の Weekly Report {} 】", self.issue))
            .line(self.url.as_str())
            .lines(self.topics.iter().enumerate().map(|(index, topic)| {
                format!("{}. {topic}", index + 1)
            }))
            .footer("\n")
    }
}

/// The Weekly Report linked from the front page, if it is dated `today`.
pub fn parse_weekly_report(
    html: &str,
    base: &str,
    today: &str,
) -> Result<Option<WeeklyReport>, SkillError> {
    let document = Html::parse_document(html);
    let link = require_first(ORIGIN, &document, "a.fl")?;
    let issue = text_of(link);
    if issue.replace('号', "") != today {
        debug!(event_name = "skill.jpcert.weekly.stale", issue = %issue, today, "no report today");
        return Ok(None);
    }

    let href = link.value().attr("href").unwrap_or_default();
    let contents = require_first(ORIGIN, &document, "div.contents")?;
    let items = selector(ORIGIN, "li")?;
    let topics = contents.select(&items).map(text_of).collect();

    Ok(Some(WeeklyReport {
        issue,
        url: format!("{}{href}", base.trim_end_matches('/')),
        topics,
    }))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoticeDigest {
    pub notices: Vec<String>,
    pub vulnerabilities: Vec<String>,
}

struct Entry {
    published: String,
    title: String,
    href: String,
}

/// Alert lines for the noon digest. Notices dated today are listed plainly,
/// notices dated yesterday as links. Vulnerability notes count when published
/// at or after 11:59:59 yesterday.
pub fn parse_notice_alert(
    html: &str,
    base: &str,
    now: &DateTime<FixedOffset>,
) -> Result<NoticeDigest, SkillError> {
    let document = Html::parse_document(html);
    let containers = selector(ORIGIN, "div.container")?;
    let heading = selector(ORIGIN, "h3")?;
    let base = base.trim_end_matches('/');

    let today = iso_date(now.date_naive());
    let previous_day = yesterday(now);
    let previous = iso_date(previous_day);
    let cutoff = noon_cutoff(previous_day)
        .ok_or_else(|| SkillError::parse(ORIGIN, "invalid cutoff time"))?;

    let mut digest = NoticeDigest::default();
    for container in document.select(&containers) {
        let Some(title) = first_in(container, &heading).map(text_of) else {
            continue;
        };

        if title == NOTICE_SECTION {
            for entry in section_entries(container)? {
                let link = format!("{base}{}", entry.href);
                if entry.published.contains(&today) {
                    digest.notices.push(format!("{today} {} {link}", entry.title));
                }
                if entry.published.contains(&previous) {
                    digest.notices.push(format!("{previous} <{link}|{}>", entry.title));
                }
            }
        } else if title == VULNERABILITY_SECTION {
            for entry in section_entries(container)? {
                let published = entry.published.trim();
                let Ok(published_at) = NaiveDateTime::parse_from_str(published, PUBLISHED_FORMAT)
                else {
                    debug!(
                        event_name = "skill.jpcert.date.unparsable",
                        published,
                        "skipping entry"
                    );
                    continue;
                };
                if published_at >= cutoff {
                    digest.vulnerabilities.push(format!("<{}|{}>", entry.href, entry.title));
                }
            }
        }
    }

    Ok(digest)
}

fn section_entries(container: ElementRef<'_>) -> Result<Vec<Entry>, SkillError> {
    let items = selector(ORIGIN, "ul.list>li")?;
    let anchors = selector(ORIGIN, "a")?;
    let left = selector(ORIGIN, "span.left_area")?;
    let right = selector(ORIGIN, "span.right_area")?;

    Ok(container
        .select(&items)
        .filter_map(|item| {
            let anchor = first_in(item, &anchors)?;
            Some(Entry {
                published: first_in(anchor, &left).map(text_of)?,
                title: first_in(anchor, &right).map(text_of)?,
                href: anchor.value().attr("href").unwrap_or_default().to_owned(),
            })
        })
        .collect())
}

pub struct WeeklyReportSkill;

#[async_trait]
impl SkillHandler<SkillContext> for WeeklyReportSkill {
    fn name(&self) -> &'static str {
        "weeklyReport"
    }

    fn description(&self) -> &'static str {
        "JPCERT から Weekly Report を取得します。"
    }

    async fn run(&self, ctx: &SkillContext, _invocation: &Invocation) -> Result<(), SkillError> {
        let html =
            ctx.fetcher.get_text(ORIGIN, &ctx.endpoints.jpcert_base, &[], Charset::Utf8).await?;
        let today = iso_date(ctx.now().date_naive());

        if let Some(report) = parse_weekly_report(&html, &ctx.endpoints.jpcert_base, &today)? {
            ctx.send(report.message()).await?;
        }
        Ok(())
    }
}

pub struct NoticeAlertSkill;

#[async_trait]
impl SkillHandler<SkillContext> for NoticeAlertSkill {
    fn name(&self) -> &'static str {
        "noticeAlert"
    }

    fn description(&self) -> &'static str {
        "当日発表の注意喚起もしくは脆弱性関連情報を取得します。"
    }

    async fn run(&self, ctx: &SkillContext, _invocation: &Invocation) -> Result<(), SkillError> {
        let html =
            ctx.fetcher.get_text(ORIGIN, &ctx.endpoints.jpcert_base, &[], Charset::Utf8).await?;
        let digest = parse_notice_alert(&html, &ctx.endpoints.jpcert_base, &ctx.now())?;
        info!(
            event_name = "skill.jpcert.alerts",
            notices = digest.notices.len(),
            vulnerabilities = digest.vulnerabilities.len(),
            "collected alerts"
        );

        if !digest.notices.is_empty() {
            ctx.send(MessageBuilder::new().header(NOTICE_HEADER).lines(digest.notices)).await?;
        }
        if !digest.vulnerabilities.is_empty() {
            let message =
                MessageBuilder::new().header(VULNERABILITY_HEADER).lines(digest.vulnerabilities);
            ctx.send(message).await?;
        }
        Ok(())
    }
}
