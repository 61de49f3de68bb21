//! Event feed of the Kanto IT Software health insurance society.

use async_trait::async_trait;
use erabee_core::{Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};

use crate::context::SkillContext;
use crate::fetch::Charset;

pub const HEADER: &str = "関東ITソフトウェア健康保険組合のイベント情報です";

const ORIGIN: &str = "its-kenpo";

/// `<item>` entries of the RSS channel as title and link.
pub fn parse_events(xml: &str) -> Result<Vec<Listing>, SkillError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|error| SkillError::parse(ORIGIN, error))?;
    let channel = document
        .root_element()
        .children()
        .find(|node| node.is_element())
        .ok_or_else(|| SkillError::parse(ORIGIN, "feed has no channel element"))?;

    let events = channel
        .children()
        .filter(|node| node.is_element())
        .filter(|node| node.tag_name().name().to_ascii_lowercase().contains("item"))
        .filter_map(|item| {
            let title = element_text(item, "title")?;
            let link = element_text(item, "link")?;
            Some(Listing::new(title, link))
        })
        .collect();

    Ok(events)
}

fn element_text(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
        .and_then(|child| child.text())
        .map(|text| text.trim().to_owned())
}

pub struct ItsEventsSkill;

#[async_trait]
impl SkillHandler<SkillContext> for ItsEventsSkill {
    fn name(&self) -> &'static str {
        "itsEvents"
    }

    fn description(&self) -> &'static str {
        "関東ITソフトウェア健康保険組合のイベント情報を返します。"
    }

    async fn run(&self, ctx: &SkillContext, invocation: &Invocation) -> Result<(), SkillError> {
        let xml =
            ctx.fetcher.get_text(ORIGIN, &ctx.endpoints.its_kenpo_rss, &[], Charset::Utf8).await?;
        let events = parse_events(&xml)?;

        let message = MessageBuilder::new()
            .header(HEADER)
            .lines(events.iter().map(Listing::to_slack_link))
            .reply_to(&invocation.reply);
        ctx.send(message).await?;
        Ok(())
    }
}
