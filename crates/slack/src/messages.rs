use erabee_core::config::SlackConfig;
use erabee_core::domain::invocation::ReplyTarget;
use serde::Serialize;

/// JSON body posted to `chat.postMessage`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub channel: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub slack_type: Option<String>,
}

pub struct MessageBuilder {
    header: Option<String>,
    lines: Vec<String>,
    footer: Option<String>,
    reply: ReplyTarget,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self { header: None, lines: Vec::new(), footer: None, reply: ReplyTarget::default_channel() }
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Appended directly after the body, without a line break.
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn reply_to(mut self, reply: &ReplyTarget) -> Self {
        self.reply = reply.clone();
        self
    }

    pub fn text(&self) -> String {
        let mut text = String::new();
        if let Some(header) = &self.header {
            text.push_str(header);
            text.push('\n');
        }
        text.push_str(&self.lines.join("\n"));
        if let Some(footer) = &self.footer {
            text.push_str(footer);
        }
        text
    }

    pub fn build(self, slack: &SlackConfig) -> OutgoingMessage {
        let text = self.text();
        OutgoingMessage {
            text,
            token: slack.api_token_value(),
            channel: self.reply.resolve_channel(&slack.channel).to_owned(),
            username: slack.username.clone(),
            challenge: self.reply.challenge,
            slack_type: self.reply.slack_type,
        }
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}
