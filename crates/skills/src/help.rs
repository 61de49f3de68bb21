use std::collections::BTreeMap;

use async_trait::async_trait;
use erabee_core::{Invocation, SkillError};
use erabee_slack::{MessageBuilder, SkillHandler};

use crate::context::SkillContext;

pub const NAME: &str = "help";
pub const DESCRIPTION: &str = "メソッド一覧を返します。メソッド名を渡すとその説明を返します。";
pub const LIST_PREFIX: &str = "メソッド一覧 ";

/// Lists the registered skills, or describes one of them.
pub struct HelpSkill {
    catalogue: BTreeMap<String, &'static str>,
}

impl HelpSkill {
    /// `catalogue` maps every other skill name to its description; `help`
    /// itself is always added.
    pub fn new(mut catalogue: BTreeMap<String, &'static str>) -> Self {
        catalogue.insert(NAME.to_owned(), DESCRIPTION);
        Self { catalogue }
    }

    pub fn reply_text(&self, args: &[String]) -> String {
        if let Some(description) = args.first().and_then(|name| self.catalogue.get(name)) {
            return (*description).to_owned();
        }

        let names = self.catalogue.keys().map(String::as_str).collect::<Vec<_>>();
        format!("{LIST_PREFIX}{}", names.join(", "))
    }
}

#[async_trait]
impl SkillHandler<SkillContext> for HelpSkill {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn run(&self, ctx: &SkillContext, invocation: &Invocation) -> Result<(), SkillError> {
        let message =
            MessageBuilder::new().line(self.reply_text(&invocation.args)).reply_to(&invocation.reply);
        ctx.send(message).await?;
        Ok(())
    }
}
