use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use erabee_core::{Invocation, SkillError};
use tracing::{debug, info, warn};

/// Replace full-width spaces and split the mention on ASCII spaces.
///
/// The first token is the bot mention and is dropped. Returns `None` when no
/// method token follows it.
pub fn parse_mention(text: &str) -> Option<(String, Vec<String>)> {
    let normalized = text.replace('\u{3000}', " ");
    let mut tokens = normalized.split(' ').filter(|token| !token.is_empty());

    let _mention = tokens.next()?;
    let method = tokens.next()?.to_owned();
    let args = tokens.map(str::to_owned).collect();
    Some((method, args))
}

/// A named command reachable from a Slack mention or the digest schedule.
#[async_trait]
pub trait SkillHandler<C>: Send + Sync
where
    C: Send + Sync,
{
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn run(&self, ctx: &C, invocation: &Invocation) -> Result<(), SkillError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched,
    Ignored,
}

pub struct CommandRouter<C> {
    skills: BTreeMap<String, Arc<dyn SkillHandler<C>>>,
}

impl<C> CommandRouter<C>
where
    C: Send + Sync,
{
    pub fn new() -> Self {
        Self { skills: BTreeMap::new() }
    }

    pub fn register<H>(&mut self, skill: H)
    where
        H: SkillHandler<C> + 'static,
    {
        let name = skill.name().to_owned();
        if self.skills.insert(name.clone(), Arc::new(skill)).is_some() {
            warn!(event_name = "router.skill.replaced", skill = %name, "skill registered twice");
        }
    }

    pub async fn route(
        &self,
        ctx: &C,
        invocation: &Invocation,
    ) -> Result<RouteOutcome, SkillError> {
        let Some(skill) = self.skills.get(&invocation.method) else {
            debug!(
                event_name = "router.skill.unknown",
                method = %invocation.method,
                "ignoring unknown method"
            );
            return Ok(RouteOutcome::Ignored);
        };

        info!(
            event_name = "skill.start",
            skill = skill.name(),
            arg_count = invocation.args.len(),
            "skill started"
        );
        skill.run(ctx, invocation).await?;
        info!(event_name = "skill.finish", skill = skill.name(), "skill finished");

        Ok(RouteOutcome::Dispatched)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    pub fn describe(&self, name: &str) -> Option<&'static str> {
        self.skills.get(name).map(|skill| skill.description())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }
}

impl<C> Default for CommandRouter<C>
where
    C: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
