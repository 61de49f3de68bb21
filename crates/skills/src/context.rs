use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, FixedOffset};
use erabee_core::config::AppConfig;
use erabee_core::domain::clock::now_jst;
use erabee_core::SkillError;
use erabee_slack::{MessageBuilder, MessageSink, PostedMessage};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::fetch::HttpFetcher;

/// Fixed source URLs. Overridable so tests can point skills at a mock server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub qiita_items: String,
    pub its_kenpo_rss: String,
    pub yahoo_news: String,
    pub itmedia_ranking: String,
    pub itmedia_archive: String,
    pub zdnet_base: String,
    pub jpcert_base: String,
    pub atmarkit_ranking: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            qiita_items: "https://qiita.com/api/v2/items".to_owned(),
            its_kenpo_rss: "https://www.its-kenpo.or.jp/NEWS/event_rss.xml".to_owned(),
            yahoo_news: "https://news.yahoo.co.jp".to_owned(),
            itmedia_ranking: "https://www.itmedia.co.jp/news/subtop/ranking/".to_owned(),
            itmedia_archive: "https://www.itmedia.co.jp/news/subtop/archive".to_owned(),
            zdnet_base: "https://japan.zdnet.com".to_owned(),
            jpcert_base: "https://www.jpcert.or.jp".to_owned(),
            atmarkit_ranking: "https://www.atmarkit.co.jp/json/ait/rss_rankindex_all_day.json"
                .to_owned(),
        }
    }
}

impl Endpoints {
    /// Every source rooted at `base`, keeping each default path.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            qiita_items: format!("{base}/api/v2/items"),
            its_kenpo_rss: format!("{base}/NEWS/event_rss.xml"),
            yahoo_news: base.to_owned(),
            itmedia_ranking: format!("{base}/news/subtop/ranking/"),
            itmedia_archive: format!("{base}/news/subtop/archive"),
            zdnet_base: base.to_owned(),
            jpcert_base: base.to_owned(),
            atmarkit_ranking: format!("{base}/json/ait/rss_rankindex_all_day.json"),
        }
    }
}

/// Everything a skill needs for one run: read-only configuration, the Slack
/// sink, the HTTP fetcher, the clock and a random source.
pub struct SkillContext {
    pub config: Arc<AppConfig>,
    pub fetcher: HttpFetcher,
    pub endpoints: Endpoints,
    sink: Arc<dyn MessageSink>,
    fixed_now: Option<DateTime<FixedOffset>>,
    rng: Mutex<StdRng>,
}

impl SkillContext {
    pub fn new(config: Arc<AppConfig>, sink: Arc<dyn MessageSink>) -> Result<Self, SkillError> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self {
            config,
            fetcher,
            endpoints: Endpoints::default(),
            sink,
            fixed_now: None,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Pins the clock; every `now()` returns this instant.
    pub fn with_fixed_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Current JST time.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.fixed_now.unwrap_or_else(now_jst)
    }

    pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        items.choose(&mut *rng)
    }

    /// Uniform integer in `low..=high`.
    pub fn pick_between(&self, low: u32, high: u32) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(low..=high)
    }

    pub async fn send(&self, message: MessageBuilder) -> Result<PostedMessage, SkillError> {
        let outgoing = message.build(&self.config.slack);
        self.sink.send(outgoing).await.map_err(|error| SkillError::Delivery(error.to_string()))
    }
}
