pub mod clock;
pub mod invocation;
pub mod listing;
