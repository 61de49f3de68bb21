use async_trait::async_trait;
use chrono::NaiveDate;
use erabee_core::domain::clock::{iso_date, yesterday};
use erabee_core::{Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use scraper::Html;

use crate::context::SkillContext;
use crate::fetch::Charset;
use crate::html::{first_anchor, first_in, selector, text_of};

pub const HEADER: &str = "【 ZDNet Japanの昨日のニュース一覧 】";
pub const NO_NEWS_YESTERDAY: &str = "ZDNet Japanの昨日のニュースはありませんでした。";

const ORIGIN: &str = "zdnet";
const LATEST_SECTION_TITLE: &str = "最新記事一覧";

/// Entries of the "latest articles" module updated on `day`.
pub fn parse_latest(html: &str, base: &str, day: NaiveDate) -> Result<Vec<Listing>, SkillError> {
    let document = Html::parse_document(html);
    let modules = selector(ORIGIN, "div.pg-mod")?;
    let title = selector(ORIGIN, "h2.ttl-line-center>span")?;
    let items = selector(ORIGIN, "ul>li")?;
    let updated = selector(ORIGIN, "p.txt-update")?;
    let anchors = selector(ORIGIN, "a")?;
    let wanted = iso_date(day);
    let base = base.trim_end_matches('/');

    let Some(latest) = document.select(&modules).find(|module| {
        first_in(*module, &title).is_some_and(|span| text_of(span).trim() == LATEST_SECTION_TITLE)
    }) else {
        return Ok(Vec::new());
    };

    Ok(latest
        .select(&items)
        .filter(|item| {
            first_in(*item, &updated).is_some_and(|stamp| text_of(stamp).contains(&wanted))
        })
        .filter_map(|item| first_anchor(item, &anchors, |href| format!("{base}{href}")))
        .collect())
}

pub struct ZdJapanSkill;

#[async_trait]
impl SkillHandler<SkillContext> for ZdJapanSkill {
    fn name(&self) -> &'static str {
        "zdJapan"
    }

    fn description(&self) -> &'static str {
        "ZDNet Japan の昨日のニュースを取得します。"
    }

    async fn run(&self, ctx: &SkillContext, _invocation: &Invocation) -> Result<(), SkillError> {
        let base = ctx.endpoints.zdnet_base.trim_end_matches('/');
        let url = format!("{base}/archives/");
        let html = ctx.fetcher.get_text(ORIGIN, &url, &[], Charset::Utf8).await?;
        let articles = parse_latest(&html, base, yesterday(&ctx.now()))?;

        let message = if articles.is_empty() {
            MessageBuilder::new().line(NO_NEWS_YESTERDAY)
        } else {
            MessageBuilder::new()
                .header(HEADER)
                .lines(articles.iter().map(Listing::to_slack_link))
        };
        ctx.send(message).await?;
        Ok(())
    }
}
