//! Cache-aside access layer for posts.
//!
//! Reads consult a volatile cache before the durable Postgres store and
//! populate it with a bounded TTL; writes go to the store first and then
//! invalidate cache entries according to the configured policy.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
