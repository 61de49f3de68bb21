//! Jalan hotel search: `yasumitai`.

use async_trait::async_trait;
use erabee_core::{Invocation, Listing, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};
use secrecy::ExposeSecret;

use crate::context::SkillContext;
use crate::fetch::{Charset, QueryParams};
use crate::NO_RESULTS;

pub const JALAN_FOOTER: &str =
    "　　<https://www.jalan.net/jw/jwp0000/jww0001.do/|じゃらん Web サービス>";

const ORIGIN: &str = "jalan";

/// JIS X 0401 order; the position (1-based) is the prefecture code.
pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県", "栃木県", "群馬県",
    "茨城県", "埼玉県", "千葉県", "東京都", "神奈川県", "山梨県", "長野県", "新潟県", "富山県",
    "石川県", "福井県", "静岡県", "岐阜県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府",
    "兵庫県", "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県", "徳島県",
    "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県", "熊本県", "大分県", "宮崎県",
    "鹿児島県", "沖縄県",
];

pub fn prefecture_code(number: usize) -> String {
    format!("{:06}", number * 10_000)
}

/// Prefecture whose name contains `hint`, first match in JIS order.
pub fn find_prefecture(hint: &str) -> Option<usize> {
    if hint.is_empty() {
        return None;
    }
    PREFECTURES.iter().position(|name| name.contains(hint)).map(|index| index + 1)
}

/// Root children whose tag contains `hotel`, read as name and detail URL.
pub fn parse_hotels(xml: &str) -> Result<Vec<Listing>, SkillError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|error| SkillError::parse(ORIGIN, error))?;

    let hotels = document
        .root_element()
        .children()
        .filter(|node| node.is_element())
        .filter(|node| node.tag_name().name().to_ascii_lowercase().contains("hotel"))
        .filter_map(|hotel| {
            let name = child_text(hotel, "HotelName")?;
            let url = child_text(hotel, "HotelDetailURL")?;
            Some(Listing::new(name, url))
        })
        .collect();

    Ok(hotels)
}

fn child_text(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
        .and_then(|child| child.text())
        .map(|text| text.trim().to_owned())
}

pub struct HotelSkill;

#[async_trait]
impl SkillHandler<SkillContext> for HotelSkill {
    fn name(&self) -> &'static str {
        "yasumitai"
    }

    fn description(&self) -> &'static str {
        "たまには旅行もいいですね。ランダムな宿を紹介します。\n\
         引数に都道府県名を渡すと、その都道府県の宿から選びます。"
    }

    async fn run(&self, ctx: &SkillContext, invocation: &Invocation) -> Result<(), SkillError> {
        let provider = &ctx.config.jalan;
        let api_key = provider
            .api_key
            .as_ref()
            .ok_or_else(|| SkillError::Configuration("jalan.api_key is not set".to_owned()))?;

        let random = ctx.pick_between(1, PREFECTURES.len() as u32) as usize;
        let number = invocation
            .args
            .first()
            .and_then(|hint| find_prefecture(hint))
            .unwrap_or(random);

        let params: QueryParams = vec![
            ("key", api_key.expose_secret().to_owned()),
            ("pref", prefecture_code(number)),
        ];
        let body = ctx.fetcher.get_text(ORIGIN, &provider.base_url, &params, Charset::Utf8).await?;
        let hotels = parse_hotels(&body)?;

        let line = ctx
            .choose(&hotels)
            .map(Listing::to_slack_link)
            .unwrap_or_else(|| NO_RESULTS.to_owned());
        let message =
            MessageBuilder::new().line(line).footer(JALAN_FOOTER).reply_to(&invocation.reply);
        ctx.send(message).await?;
        Ok(())
    }
}
