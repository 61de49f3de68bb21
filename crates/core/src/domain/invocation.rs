use serde::{Deserialize, Serialize};

/// Where a skill's reply goes. An empty target means the configured default channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub channel: Option<String>,
    pub challenge: Option<String>,
    pub slack_type: Option<String>,
}

impl ReplyTarget {
    pub fn default_channel() -> Self {
        Self::default()
    }

    pub fn channel(channel: impl Into<String>) -> Self {
        Self { channel: Some(channel.into()), ..Self::default() }
    }

    pub fn resolve_channel<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.channel.as_deref().filter(|channel| !channel.trim().is_empty()).unwrap_or(fallback)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub method: String,
    pub args: Vec<String>,
    pub reply: ReplyTarget,
}

impl Invocation {
    pub fn new(method: impl Into<String>, args: Vec<String>, reply: ReplyTarget) -> Self {
        Self { method: method.into(), args, reply }
    }

    /// Digest-style invocation: no arguments, default channel.
    pub fn scheduled(method: impl Into<String>) -> Self {
        Self::new(method, Vec::new(), ReplyTarget::default_channel())
    }
}
