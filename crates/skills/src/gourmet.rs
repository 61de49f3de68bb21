//! HotPepper gourmet search: `lunch`, `nomitai` and `kissa`.

use async_trait::async_trait;
use erabee_core::config::LocationConfig;
use erabee_core::{Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::context::SkillContext;
use crate::fetch::{Charset, QueryParams};
use crate::NO_RESULTS;

pub const HOTPEPPER_FOOTER: &str =
    "　　Powered by <https://webservice.recruit.co.jp/|ホットペッパー Webサービス>";

const ORIGIN: &str = "hotpepper";
const KANTO_SERVICE_AREA: &str = "SS10";
const GENRE_IZAKAYA: &str = "G001";
const GENRE_CAFE: &str = "G014";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GourmetProfile {
    Lunch,
    Nomitai,
    Kissa,
}

impl GourmetProfile {
    pub fn name(self) -> &'static str {
        match self {
            Self::Lunch => "lunch",
            Self::Nomitai => "nomitai",
            Self::Kissa => "kissa",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Lunch => {
                "ランチ営業しているお店を探します。\n\
                 引数なし、または1つの場合はデフォルト座標の近くで探します。\n\
                 引数を2つ以上渡すと、それらをキーワードにして探します。キーワードには場所も使えます。"
            }
            Self::Nomitai => {
                "飲みに行くお店を決めてくれます。\n\
                 引数なしの場合はデフォルト座標の近くの居酒屋を探します。\n\
                 引数が1つの場合はデフォルト座標の近くでキーワード検索します。\n\
                 引数を2つ以上渡すと、範囲を絞ってキーワード検索します。"
            }
            Self::Kissa => {
                "喫茶店を探します。\n\
                 引数なしの場合はデフォルト座標の近くで探します。\n\
                 引数を渡すと、それらをキーワードにして探します。"
            }
        }
    }

    fn base_range(self) -> &'static str {
        match self {
            Self::Lunch => "3",
            Self::Nomitai => "5",
            Self::Kissa => "2",
        }
    }

    /// Whether the default coordinates are sent for this many arguments.
    fn uses_default_location(self, arg_count: usize) -> bool {
        match self {
            Self::Lunch | Self::Nomitai => arg_count <= 1,
            Self::Kissa => arg_count == 0,
        }
    }
}

/// Query parameters for a search, excluding the API key.
pub fn search_params(
    profile: GourmetProfile,
    args: &[String],
    location: &LocationConfig,
) -> QueryParams {
    let mut range = profile.base_range();
    if profile == GourmetProfile::Nomitai && args.len() >= 2 {
        range = "3";
    }

    let mut params: QueryParams = vec![
        ("large_service_area", KANTO_SERVICE_AREA.to_owned()),
        ("range", range.to_owned()),
        ("order", "2".to_owned()),
        ("type", "lite".to_owned()),
        ("format", "json".to_owned()),
        ("count", "100".to_owned()),
    ];

    match profile {
        GourmetProfile::Lunch => params.push(("lunch", "1".to_owned())),
        GourmetProfile::Kissa => params.push(("genre", GENRE_CAFE.to_owned())),
        GourmetProfile::Nomitai if args.is_empty() => {
            params.push(("genre", GENRE_IZAKAYA.to_owned()));
        }
        GourmetProfile::Nomitai => {}
    }

    if profile.uses_default_location(args.len()) {
        params.push(("lat", location.default_lat.clone()));
        params.push(("lng", location.default_lng.clone()));
    }
    if !args.is_empty() {
        params.push(("keyword", args.join(" ")));
    }

    params
}

#[derive(Debug, Deserialize)]
struct GourmetResponse {
    results: GourmetResults,
}

#[derive(Debug, Deserialize)]
struct GourmetResults {
    shop: Option<Vec<Shop>>,
    #[serde(default)]
    error: Vec<GourmetApiError>,
}

/// In-band API error, e.g. an invalid key (`code` 2000).
#[derive(Debug, Deserialize)]
struct GourmetApiError {
    #[serde(default)]
    code: serde_json::Value,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Shop {
    name: String,
    urls: ShopUrls,
}

#[derive(Debug, Deserialize)]
struct ShopUrls {
    pc: String,
}

pub fn parse_shops(body: &str) -> Result<Vec<Listing>, SkillError> {
    let response: GourmetResponse =
        serde_json::from_str(body).map_err(|error| SkillError::parse(ORIGIN, error))?;
    if let Some(error) = response.results.error.first() {
        return Err(SkillError::parse(
            ORIGIN,
            format!("api error {}: {}", error.code, error.message),
        ));
    }

    let shops =
        response.results.shop.ok_or_else(|| SkillError::parse(ORIGIN, "results.shop is missing"))?;
    Ok(shops
        .into_iter()
        .map(|shop| Listing::new(shop.name, shop.urls.pc))
        .collect())
}

/// Picked shop (or the fixed "no results" line) followed by the attribution.
pub fn shop_message(choice: Option<&Listing>) -> MessageBuilder {
    let line = choice.map(Listing::to_slack_link).unwrap_or_else(|| NO_RESULTS.to_owned());
    MessageBuilder::new().line(line).footer(HOTPEPPER_FOOTER)
}

pub struct GourmetSkill {
    profile: GourmetProfile,
}

impl GourmetSkill {
    pub fn new(profile: GourmetProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SkillHandler<SkillContext> for GourmetSkill {
    fn name(&self) -> &'static str {
        self.profile.name()
    }

    fn description(&self) -> &'static str {
        self.profile.description()
    }

    async fn run(&self, ctx: &SkillContext, invocation: &Invocation) -> Result<(), SkillError> {
        let provider = &ctx.config.hotpepper;
        let api_key = provider
            .api_key
            .as_ref()
            .ok_or_else(|| SkillError::Configuration("hotpepper.api_key is not set".to_owned()))?;

        let mut params: QueryParams = vec![("key", api_key.expose_secret().to_owned())];
        params.extend(search_params(self.profile, &invocation.args, &ctx.config.location));

        let body = ctx
            .fetcher
            .get_text(ORIGIN, &provider.base_url, &params, Charset::Utf8)
            .await?;
        let shops = parse_shops(&body)?;
        debug!(
            event_name = "skill.gourmet.results",
            skill = self.profile.name(),
            shop_count = shops.len(),
            "hotpepper search finished"
        );

        ctx.send(shop_message(ctx.choose(&shops)).reply_to(&invocation.reply)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use erabee_core::config::AppConfig;
    use erabee_core::{Invocation, ReplyTarget};
    use erabee_slack::SkillHandler;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{parse_shops, search_params, GourmetProfile, GourmetSkill, HOTPEPPER_FOOTER};
    use crate::testing::{context_for, test_config};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn lookup<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(name, _)| *name == key).map(|(_, value)| value.as_str())
    }

    #[test]
    fn lunch_with_one_keyword_keeps_default_coordinates() {
        let location = AppConfig::default().location;
        let params = search_params(GourmetProfile::Lunch, &args(&["新宿"]), &location);

        assert_eq!(lookup(&params, "keyword"), Some("新宿"));
        assert_eq!(lookup(&params, "lat"), Some(location.default_lat.as_str()));
        assert_eq!(lookup(&params, "lng"), Some(location.default_lng.as_str()));
        assert_eq!(lookup(&params, "lunch"), Some("1"));
        assert_eq!(lookup(&params, "range"), Some("3"));
        assert_eq!(lookup(&params, "large_service_area"), Some("SS10"));
        assert_eq!(lookup(&params, "count"), Some("100"));
    }

    #[test]
    fn lunch_with_two_keywords_drops_coordinates() {
        let location = AppConfig::default().location;
        let params = search_params(GourmetProfile::Lunch, &args(&["新宿", "カレー"]), &location);

        assert_eq!(lookup(&params, "keyword"), Some("新宿 カレー"));
        assert_eq!(lookup(&params, "lat"), None);
        assert_eq!(lookup(&params, "lng"), None);
    }

    #[test]
    fn nomitai_variants() {
        let location = AppConfig::default().location;

        let none = search_params(GourmetProfile::Nomitai, &[], &location);
        assert_eq!(lookup(&none, "genre"), Some("G001"));
        assert_eq!(lookup(&none, "range"), Some("5"));
        assert!(lookup(&none, "lat").is_some());
        assert_eq!(lookup(&none, "keyword"), None);
        assert_eq!(lookup(&none, "lunch"), None);

        let one = search_params(GourmetProfile::Nomitai, &args(&["焼き鳥"]), &location);
        assert_eq!(lookup(&one, "genre"), None);
        assert_eq!(lookup(&one, "range"), Some("5"));
        assert!(lookup(&one, "lat").is_some());

        let two = search_params(GourmetProfile::Nomitai, &args(&["渋谷", "焼き鳥"]), &location);
        assert_eq!(lookup(&two, "range"), Some("3"));
        assert_eq!(lookup(&two, "lat"), None);
        assert_eq!(lookup(&two, "keyword"), Some("渋谷 焼き鳥"));
    }

    #[test]
    fn kissa_uses_coordinates_only_without_arguments() {
        let location = AppConfig::default().location;

        let none = search_params(GourmetProfile::Kissa, &[], &location);
        assert_eq!(lookup(&none, "genre"), Some("G014"));
        assert_eq!(lookup(&none, "range"), Some("2"));
        assert!(lookup(&none, "lat").is_some());

        let one = search_params(GourmetProfile::Kissa, &args(&["神保町"]), &location);
        assert_eq!(lookup(&one, "lat"), None);
        assert_eq!(lookup(&one, "keyword"), Some("神保町"));
    }

    #[test]
    fn parses_shops_and_rejects_missing_list() {
        let body = json!({"results": {"shop": [
            {"name": "そば処", "urls": {"pc": "https://www.hotpepper.jp/strJ001/"}}
        ]}})
        .to_string();
        let shops = parse_shops(&body).expect("shops");
        assert_eq!(shops[0].title, "そば処");

        let missing = parse_shops(r#"{"results": {"results_available": 0}}"#).unwrap_err();
        assert_eq!(missing.error_class(), "parse");
    }

    #[test]
    fn api_error_body_is_a_parse_error() {
        let body = json!({"results": {"error": [
            {"code": 2000, "message": "APIキーまたはIPアドレスの認証エラーです"}
        ]}})
        .to_string();

        let error = parse_shops(&body).unwrap_err();
        assert_eq!(error.error_class(), "parse");
        assert!(error.to_string().contains("api error 2000"));
    }

    #[tokio::test]
    async fn lunch_request_sends_key_keyword_and_default_coordinates() {
        let server = MockServer::start_async().await;
        let mut config = test_config();
        config.hotpepper.base_url = server.url("/hotpepper/gourmet/v1/");
        let location = config.location.clone();

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/hotpepper/gourmet/v1/")
                    .query_param("key", "hp-key")
                    .query_param("keyword", "新宿")
                    .query_param("lat", location.default_lat.as_str())
                    .query_param("lng", location.default_lng.as_str())
                    .query_param("lunch", "1");
                then.status(200).json_body(json!({"results": {"shop": [
                    {"name": "新宿食堂", "urls": {"pc": "https://example.com/shop"}}
                ]}}));
            })
            .await;

        let (ctx, sink) = context_for(&server.base_url(), config);
        let invocation =
            Invocation::new("lunch", vec!["新宿".to_owned()], ReplyTarget::channel("C42"));
        GourmetSkill::new(GourmetProfile::Lunch).run(&ctx, &invocation).await.expect("run");

        mock.assert_async().await;
        let sent = sink.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel, "C42");
        assert_eq!(sent[0].text, format!("<https://example.com/shop|新宿食堂>{HOTPEPPER_FOOTER}"));
    }

    #[tokio::test]
    async fn zero_results_emit_fixed_message_and_attribution() {
        let server = MockServer::start_async().await;
        let mut config = test_config();
        config.hotpepper.base_url = server.url("/gourmet");
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gourmet");
                then.status(200).json_body(json!({"results": {"shop": []}}));
            })
            .await;

        let (ctx, sink) = context_for(&server.base_url(), config);
        GourmetSkill::new(GourmetProfile::Nomitai)
            .run(&ctx, &Invocation::scheduled("nomitai"))
            .await
            .expect("run");

        assert_eq!(
            sink.texts(),
            vec![
                "検索結果がありません　　Powered by <https://webservice.recruit.co.jp/|ホットペッパー Webサービス>"
                    .to_owned()
            ]
        );
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        let mut config = test_config();
        config.hotpepper.api_key = None;
        let (ctx, sink) = context_for("http://127.0.0.1:9", config);

        let error = GourmetSkill::new(GourmetProfile::Kissa)
            .run(&ctx, &Invocation::scheduled("kissa"))
            .await
            .unwrap_err();

        assert_eq!(error.error_class(), "configuration");
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn api_error_posts_nothing() {
        let server = MockServer::start_async().await;
        let mut config = test_config();
        config.hotpepper.base_url = server.url("/gourmet");
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gourmet");
                then.status(200).json_body(json!({"results": {"error": [
                    {"code": 2000, "message": "APIキーまたはIPアドレスの認証エラーです"}
                ]}}));
            })
            .await;

        let (ctx, sink) = context_for(&server.base_url(), config);
        let error = GourmetSkill::new(GourmetProfile::Lunch)
            .run(&ctx, &Invocation::scheduled("lunch"))
            .await
            .unwrap_err();

        assert_eq!(error.error_class(), "parse");
        assert!(sink.messages().is_empty());
    }
}
