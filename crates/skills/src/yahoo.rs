//! Yahoo! News top stories. Also provides the sample payload returned to
//! plain invocations of the entry point.

use async_trait::async_trait;
use erabee_core::{Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use scraper::Html;

use crate::context::SkillContext;
use crate::fetch::Charset;
use crate::html::{require_first, selector, text_of};

pub const HEADER: &str = "主要なニュースをお伝えします";

const ORIGIN: &str = "yahoo";

pub fn parse_topics(html: &str) -> Result<Vec<Listing>, SkillError> {
    let document = Html::parse_document(html);
    let list = require_first(ORIGIN, &document, "ul.topicsList_main")?;
    let anchors = selector(ORIGIN, "li>a")?;

    Ok(list
        .select(&anchors)
        .map(|anchor| {
            Listing::new(text_of(anchor), anchor.value().attr("href").unwrap_or_default())
        })
        .collect())
}

/// Current top stories, fetched without posting anything.
pub async fn sample_topics(ctx: &SkillContext) -> Result<Vec<Listing>, SkillError> {
    let html = ctx.fetcher.get_text(ORIGIN, &ctx.endpoints.yahoo_news, &[], Charset::Utf8).await?;
    parse_topics(&html)
}

pub struct YahooSkill;

#[async_trait]
impl SkillHandler<SkillContext> for YahooSkill {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn description(&self) -> &'static str {
        "Yahoo!ニュースの主要なニュースを取得します。"
    }

    async fn run(&self, ctx: &SkillContext, invocation: &Invocation) -> Result<(), SkillError> {
        let topics = sample_topics(ctx).await?;
        let message = MessageBuilder::new()
            .header(HEADER)
            .lines(topics.iter().map(Listing::to_slack_link))
            .reply_to(&invocation.reply);
        ctx.send(message).await?;
        Ok(())
    }
}
