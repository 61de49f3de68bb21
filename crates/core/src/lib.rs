pub mod config;
pub mod domain;
pub mod errors;

pub use domain::invocation::{Invocation, ReplyTarget};
pub use domain::listing::{link_lines, Listing};
pub use errors::SkillError;
