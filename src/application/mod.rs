//! Application services and the ports they depend on.

pub mod cache;
pub mod error;
pub mod posts;
pub mod repos;
