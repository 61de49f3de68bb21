//! Slack integration for erabee
//!
//! - **Web API** (`api`) - `chat.postMessage`, `search.messages`, `chat.delete`
//! - **Messages** (`messages`) - outgoing payloads and their text layout
//! - **Commands** (`commands`) - mention parsing and the skill router
//! - **Events** (`events`) - inbound event envelope, retry suppression, responses
//! - **Signatures** (`signature`) - `X-Slack-Signature` verification
//! - **Cleanup** (`cleanup`) - deletes the bot's expired messages
//!
//! # Architecture
//!
//! ```text
//! Inbound event → InboundEvent → WebhookRequest → CommandRouter → Skill
//!                                                                   ↓
//!                                     chat.postMessage ← MessageSink
//! ```

pub mod api;
pub mod cleanup;
pub mod commands;
pub mod events;
pub mod messages;
pub mod signature;

pub use api::{MessageSink, PostedMessage, SearchMatch, SlackApiClient, SlackApiError};
pub use commands::{CommandRouter, RouteOutcome, SkillHandler};
pub use events::{InboundEvent, InvocationResponse, WebhookRequest};
pub use messages::{MessageBuilder, OutgoingMessage};
