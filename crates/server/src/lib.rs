//! HTTP surface for erabee: the invocation handler, its routes, health and
//! the daily digest scheduler.

pub mod bootstrap;
pub mod handler;
pub mod health;
pub mod routes;
pub mod scheduler;
