//! ITmedia NEWS: today's ranking and yesterday's archive. Both pages are
//! served as Shift_JIS.

use async_trait::async_trait;
use chrono::NaiveDate;
use erabee_core::domain::clock::{japanese_date, year_month_code, yesterday};
use erabee_core::{Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use scraper::Html;
use tracing::info;

use crate::context::SkillContext;
use crate::fetch::Charset;
use crate::html::{first_anchor, has_class, require_first, selector, text_of};

pub const RANKING_HEADER: &str = "【 ITmedia NEWSの本日のランキング10件 】";
pub const YESTERDAY_HEADER: &str = "【 ITmediaの昨日のニュース一覧 】";
pub const NO_NEWS_YESTERDAY: &str = "ITmediaの昨日のニュースはありませんでした。";

const ORIGIN: &str = "itmedia";
const RANKING_LIMIT: usize = 10;

pub fn parse_ranking(html: &str) -> Result<Vec<Listing>, SkillError> {
    let document = Html::parse_document(html);
    let ranking = require_first(ORIGIN, &document, "div#Ranking")?;
    let entries = selector(ORIGIN, "div.colBoxIndexRight")?;
    let anchors = selector(ORIGIN, "a")?;

    Ok(ranking
        .select(&entries)
        .filter_map(|entry| first_anchor(entry, &anchors, str::to_owned))
        .take(RANKING_LIMIT)
        .collect())
}

/// Articles listed under the `{Y}年{M}月{D}日` subhead of the monthly archive.
/// Links there are protocol-relative.
pub fn parse_archive_day(html: &str, day: NaiveDate) -> Result<Vec<Listing>, SkillError> {
    let document = Html::parse_document(html);
    let backnumber = require_first(ORIGIN, &document, "div.colBoxBacknumber")?;
    let blocks_selector = selector(ORIGIN, "div.colBoxInner>div")?;
    let items = selector(ORIGIN, "ul>li")?;
    let anchors = selector(ORIGIN, "a")?;
    let wanted = japanese_date(day);

    let blocks = backnumber.select(&blocks_selector).collect::<Vec<_>>();
    let Some(position) = blocks
        .iter()
        .position(|block| has_class(*block, "colBoxSubhead") && text_of(*block).trim() == wanted)
    else {
        return Ok(Vec::new());
    };
    let Some(articles) = blocks.get(position + 1) else {
        return Ok(Vec::new());
    };

    Ok(articles
        .select(&items)
        .filter_map(|item| first_anchor(item, &anchors, |href| format!("https:{href}")))
        .collect())
}

pub struct RankingSkill;

#[async_trait]
impl SkillHandler<SkillContext> for RankingSkill {
    fn name(&self) -> &'static str {
        "itmediaRanking"
    }

    fn description(&self) -> &'static str {
        "ITmedia NEWS の本日のランキングを取得します。"
    }

    async fn run(&self, ctx: &SkillContext, _invocation: &Invocation) -> Result<(), SkillError> {
        let html = ctx
            .fetcher
            .get_text(ORIGIN, &ctx.endpoints.itmedia_ranking, &[], Charset::ShiftJis)
            .await?;
        let ranking = parse_ranking(&html)?;

        let message = MessageBuilder::new()
            .header(RANKING_HEADER)
            .lines(ranking.iter().map(Listing::to_slack_link));
        ctx.send(message).await?;
        Ok(())
    }
}

pub struct YesterdaySkill;

#[async_trait]
impl SkillHandler<SkillContext> for YesterdaySkill {
    fn name(&self) -> &'static str {
        "itmediaYesterday"
    }

    fn description(&self) -> &'static str {
        "ITmedia の昨日のニュースをお伝えします。"
    }

    async fn run(&self, ctx: &SkillContext, _invocation: &Invocation) -> Result<(), SkillError> {
        let day = yesterday(&ctx.now());
        let url = format!(
            "{}/{}.html",
            ctx.endpoints.itmedia_archive.trim_end_matches('/'),
            year_month_code(day)
        );
        info!(event_name = "skill.itmedia.archive", day = %day, url = %url, "reading archive");

        let html = ctx.fetcher.get_text(ORIGIN, &url, &[], Charset::ShiftJis).await?;
        let articles = parse_archive_day(&html, day)?;

        let message = if articles.is_empty() {
            MessageBuilder::new().line(NO_NEWS_YESTERDAY)
        } else {
            MessageBuilder::new()
                .header(YESTERDAY_HEADER)
                .lines(articles.iter().map(Listing::to_slack_link))
        };
        ctx.send(message).await?;
        Ok(())
    }
}
