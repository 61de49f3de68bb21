use async_trait::async_trait;
use erabee_core::{link_lines, Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use serde::Deserialize;

use crate::context::SkillContext;
use crate::fetch::QueryParams;

const ORIGIN: &str = "qiita";

#[derive(Debug, Deserialize)]
struct QiitaItem {
    title: String,
    url: String,
}

pub struct QiitaSkill;

#[async_trait]
impl SkillHandler<SkillContext> for QiitaSkill {
    fn name(&self) -> &'static str {
        "qiita"
    }

    fn description(&self) -> &'static str {
        "Qiita の新着記事を3つ教えてくれます。"
    }

    async fn run(&self, ctx: &SkillContext, invocation: &Invocation) -> Result<(), SkillError> {
        let params: QueryParams = vec![("page", "1".to_owned()), ("per_page", "3".to_owned())];
        let items: Vec<QiitaItem> =
            ctx.fetcher.get_json(ORIGIN, &ctx.endpoints.qiita_items, &params).await?;

        let listings =
            items.into_iter().map(|item| Listing::new(item.title, item.url)).collect::<Vec<_>>();
        ctx.send(MessageBuilder::new().line(link_lines(&listings)).reply_to(&invocation.reply))
            .await?;
        Ok(())
    }
}
