//! Cache-aside access to posts.
//!
//! [`PostService`] reads through the cache port and keeps it coherent after
//! mutations. [`Traced`] and [`Deadline`] wrap any [`PostAccess`] with
//! observability and a per-call deadline.

mod access;
mod commands;
mod deadline;
mod queries;
mod service;
mod traced;
mod types;

pub use access::PostAccess;
pub use deadline::Deadline;
pub use service::PostService;
pub use traced::{METRIC_OPERATION_ERRORS, METRIC_OPERATION_MS, Traced};
pub use types::{
    CachePolicy, CreatePostInput, ErrorContext, InvalidationPolicy, MAX_TITLE_CHARS, PostError,
    PostErrorKind, PostIdInput, PostSlugInput, PostTitleInput, UpdatePostInput,
};
