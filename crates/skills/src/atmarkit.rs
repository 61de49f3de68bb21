//! @IT daily ranking. The feed is Shift_JIS JSONP with single-quoted strings.

use async_trait::async_trait;
use erabee_core::{Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use serde::Deserialize;
use serde_json::Value;

use crate::context::SkillContext;
use crate::fetch::Charset;

pub const HEADER: &str = "【 アットマークITの本日の総合ランキング10件 】";

const ORIGIN: &str = "atmarkit";
const CALLBACK: &str = "rankingindex(";
const RANKING_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct RankingIndex {
    #[serde(default)]
    data: Vec<Value>,
}

/// Turns the JSONP payload into plain JSON. Every `)` is dropped and single
/// quotes become double quotes, so titles containing either are mangled the
/// same way the feed's own consumers see them.
pub fn unwrap_jsonp(payload: &str) -> String {
    payload.replace(CALLBACK, "").replace(')', "").replace('\'', "\"")
}

pub fn parse_ranking(payload: &str) -> Result<Vec<Listing>, SkillError> {
    let index: RankingIndex = serde_json::from_str(&unwrap_jsonp(payload))
        .map_err(|error| SkillError::parse(ORIGIN, error))?;

    Ok(index
        .data
        .iter()
        .filter(|item| is_present(item))
        .filter_map(|item| {
            let title = item.get("title")?.as_str()?.replace(' ', "");
            let link = item.get("link")?.as_str()?;
            Some(Listing::new(title, link))
        })
        .take(RANKING_LIMIT)
        .collect())
}

fn is_present(item: &Value) -> bool {
    match item {
        Value::Null => false,
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

pub struct AitSkill;

#[async_trait]
impl SkillHandler<SkillContext> for AitSkill {
    fn name(&self) -> &'static str {
        "ait"
    }

    fn description(&self) -> &'static str {
        "アットマークITの本日の総合ランキングを返します。"
    }

    async fn run(&self, ctx: &SkillContext, _invocation: &Invocation) -> Result<(), SkillError> {
        let payload = ctx
            .fetcher
            .get_text(ORIGIN, &ctx.endpoints.atmarkit_ranking, &[], Charset::ShiftJis)
            .await?;
        let ranking = parse_ranking(&payload)?;

        let message =
            MessageBuilder::new().header(HEADER).lines(ranking.iter().map(Listing::to_slack_link));
        ctx.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use erabee_core::Invocation;
    use erabee_slack::SkillHandler;
    use httpmock::prelude::*;

    use super::{parse_ranking, unwrap_jsonp, AitSkill};
    use crate::testing::{context_for, shift_jis, test_config};

    fn feed(count: usize) -> String {
        let mut items = vec!["null".to_owned()];
        items.extend((1..=count).map(|rank| {
            format!("{{'title':'記事 {rank} の タイトル','link':'https://atmarkit.itmedia.co.jp/ait/articles/{rank}.html'}}")
        }));
        format!("rankingindex({{'data':[{}]}})", items.join(","))
    }

    #[test]
    fn jsonp_wrapper_and_quotes_are_normalized() {
        assert_eq!(unwrap_jsonp("rankingindex({'data':[]})"), r#"{"data":[]}"#);
    }

    #[test]
    fn skips_empty_entries_strips_spaces_and_limits_to_ten() {
        let ranking = parse_ranking(&feed(12)).expect("ranking");

        assert_eq!(ranking.len(), 10);
        assert_eq!(ranking[0].title, "記事1のタイトル");
        assert_eq!(ranking[0].url, "https://atmarkit.itmedia.co.jp/ait/articles/1.html");
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let error = parse_ranking("rankingindex({'data': [").unwrap_err();
        assert_eq!(error.error_class(), "parse");
    }

    #[tokio::test]
    async fn skill_decodes_shift_jis_feed() {
        let server = MockServer::start_async().await;
        let body = shift_jis(&feed(2));
        server
            .mock_async(|when, then| {
                when.method(GET).path("/json/ait/rss_rankindex_all_day.json");
                then.status(200).body(body.clone());
            })
            .await;

        let (ctx, sink) = context_for(&server.base_url(), test_config());
        AitSkill.run(&ctx, &Invocation::scheduled("ait")).await.expect("run");

        let sent = sink.messages();
        assert_eq!(sent[0].channel, "C0DEFAULT");
        assert_eq!(
            sent[0].text,
            "【 アットマークITの本日の総合ランキング10件 】\n\
             <https://atmarkit.itmedia.co.jp/ait/articles/1.html|記事1のタイトル>\n\
             <https://atmarkit.itmedia.co.jp/ait/articles/2.html|記事2のタイトル>"
        );
    }
}
