//! Skills for erabee
//!
//! Each skill reads one external source and posts a single Slack message.
//!
//! - **Gourmet** (`gourmet`) - HotPepper search: `lunch`, `nomitai`, `kissa`
//! - **Hotel** (`hotel`) - Jalan hotel search: `yasumitai`
//! - **Feeds** (`qiita`, `its_kenpo`, `yahoo`) - replies to the invoking channel
//! - **News** (`itmedia`, `zdnet`, `jpcert`, `atmarkit`) - digest sources
//! - **Help** (`help`) - method list and descriptions
//! - **Digest** (`digest`) - scheduled run of the news skills plus cleanup

pub mod atmarkit;
pub mod context;
pub mod digest;
pub mod fetch;
pub mod gourmet;
pub mod help;
pub mod hotel;
pub mod html;
pub mod itmedia;
pub mod its_kenpo;
pub mod jpcert;
pub mod qiita;
pub mod yahoo;
pub mod zdnet;

#[cfg(test)]
mod testing;

use std::collections::BTreeMap;

use erabee_slack::CommandRouter;

pub use context::{Endpoints, SkillContext};
pub use digest::{
    DigestEntry, DigestReport, DigestRunner, RetentionCleaner, SlackRetentionCleaner,
    DIGEST_SKILLS,
};
pub use fetch::{Charset, HttpFetcher};

/// Posted when a search returns nothing.
pub const NO_RESULTS: &str = "検索結果がありません";

pub type SkillRouter = CommandRouter<SkillContext>;

/// Router with every skill registered under its method name.
pub fn default_router() -> SkillRouter {
    let mut router = SkillRouter::new();
    router.register(gourmet::GourmetSkill::new(gourmet::GourmetProfile::Lunch));
    router.register(gourmet::GourmetSkill::new(gourmet::GourmetProfile::Nomitai));
    router.register(gourmet::GourmetSkill::new(gourmet::GourmetProfile::Kissa));
    router.register(hotel::HotelSkill);
    router.register(qiita::QiitaSkill);
    router.register(its_kenpo::ItsEventsSkill);
    router.register(yahoo::YahooSkill);
    router.register(itmedia::RankingSkill);
    router.register(itmedia::YesterdaySkill);
    router.register(zdnet::ZdJapanSkill);
    router.register(jpcert::WeeklyReportSkill);
    router.register(jpcert::NoticeAlertSkill);
    router.register(atmarkit::AitSkill);

    let catalogue = router
        .names()
        .into_iter()
        .filter_map(|name| router.describe(name).map(|description| (name.to_owned(), description)))
        .collect::<BTreeMap<_, _>>();
    router.register(help::HelpSkill::new(catalogue));
    router
}
