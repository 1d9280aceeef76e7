use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::application::cache::{CacheError, DEFAULT_CACHE_TTL};
use crate::application::repos::{CreatePostParams, RepoError, UpdatePostParams};
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugError, derive_slug, validate_slug};

pub const MAX_TITLE_CHARS: usize = 255;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    /// Derived from the title when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    pub content: String,
}

impl CreatePostInput {
    /// Validate and project into the insert payload. A missing slug is
    /// replaced by the base slug derived from the title.
    pub fn validate(self) -> Result<CreatePostParams, DomainError> {
        let title = validate_title(&self.title)?;
        let content = ensure_non_empty(self.content, "content")?;
        let slug = match self.slug {
            Some(slug) => checked_slug(slug)?,
            None => derive_slug(&title).map_err(|err| {
                DomainError::validation("slug", format!("cannot derive slug from title: {err}"))
            })?,
        };

        Ok(CreatePostParams {
            title,
            slug,
            content,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePostInput {
    pub id: i64,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
}

impl UpdatePostInput {
    pub fn validate(self) -> Result<UpdatePostParams, DomainError> {
        let id = ensure_positive_id(self.id)?;
        if self.title.is_none() && self.slug.is_none() && self.content.is_none() {
            return Err(DomainError::validation(
                "body",
                "at least one of title, slug or content is required",
            ));
        }

        Ok(UpdatePostParams {
            id,
            title: self.title.as_deref().map(validate_title).transpose()?,
            slug: self.slug.map(checked_slug).transpose()?,
            content: self
                .content
                .map(|content| ensure_non_empty(content, "content"))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PostIdInput {
    pub id: i64,
}

impl PostIdInput {
    pub fn validate(self) -> Result<i64, DomainError> {
        ensure_positive_id(self.id)
    }
}

#[derive(Debug, Clone)]
pub struct PostTitleInput {
    pub title: String,
}

impl PostTitleInput {
    pub fn validate(self) -> Result<String, DomainError> {
        validate_title(&self.title)
    }
}

#[derive(Debug, Clone)]
pub struct PostSlugInput {
    pub slug: String,
}

impl PostSlugInput {
    pub fn validate(self) -> Result<String, DomainError> {
        checked_slug(self.slug)
    }
}

fn validate_title(title: &str) -> Result<String, DomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("title", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("must be at most {MAX_TITLE_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn checked_slug(slug: String) -> Result<String, DomainError> {
    match validate_slug(&slug) {
        Ok(()) => Ok(slug),
        Err(SlugError::EmptyInput) => Err(DomainError::validation("slug", "must not be empty")),
        Err(err) => Err(DomainError::validation(
            "slug",
            format!("must be lowercase words joined by single hyphens ({err})"),
        )),
    }
}

fn ensure_non_empty(value: String, field: &'static str) -> Result<String, DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(value)
}

fn ensure_positive_id(id: i64) -> Result<i64, DomainError> {
    if id <= 0 {
        return Err(DomainError::validation("id", "must be a positive integer"));
    }
    Ok(id)
}

/// Which cache entries a mutation purges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationPolicy {
    /// Update leaves every entry in place; delete purges only the id entry.
    /// Title and slug entries go stale until their TTL expires.
    #[default]
    IdOnly,
    /// Read the stored record before the write and purge its id, title and
    /// slug entries (plus the new title/slug after an update).
    AllKeys,
}

impl InvalidationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidationPolicy::IdOnly => "id_only",
            InvalidationPolicy::AllKeys => "all_keys",
        }
    }
}

impl FromStr for InvalidationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id_only" | "id-only" => Ok(InvalidationPolicy::IdOnly),
            "all_keys" | "all-keys" => Ok(InvalidationPolicy::AllKeys),
            other => Err(format!(
                "unknown invalidation policy `{other}` (expected id_only or all_keys)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub invalidation: InvalidationPolicy,
    /// Surface cache population and invalidation failures to the caller
    /// instead of only logging them.
    pub strict_writes: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            invalidation: InvalidationPolicy::IdOnly,
            strict_writes: true,
        }
    }
}

/// Which operation failed and at which step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorContext {
    pub operation: &'static str,
    pub stage: &'static str,
}

impl ErrorContext {
    pub const fn new(operation: &'static str, stage: &'static str) -> Self {
        Self { operation, stage }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "posts.{}.{}", self.operation, self.stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostErrorKind {
    Validation,
    NotFound,
    Store,
    Cache,
    Timeout,
}

impl PostErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PostErrorKind::Validation => "validation",
            PostErrorKind::NotFound => "not_found",
            PostErrorKind::Store => "store",
            PostErrorKind::Cache => "cache",
            PostErrorKind::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("{context}: {cause}")]
    Validation {
        context: ErrorContext,
        cause: DomainError,
    },
    #[error("{context}: post not found")]
    NotFound { context: ErrorContext },
    #[error("{context}: {cause}")]
    Store {
        context: ErrorContext,
        cause: RepoError,
    },
    #[error("{context}: {cause}")]
    Cache {
        context: ErrorContext,
        cause: CacheError,
    },
    #[error("{context}: deadline of {millis}ms exceeded", millis = after.as_millis())]
    Timeout {
        context: ErrorContext,
        after: Duration,
    },
}

impl PostError {
    pub fn validation(context: ErrorContext, cause: DomainError) -> Self {
        Self::Validation { context, cause }
    }

    pub fn not_found(context: ErrorContext) -> Self {
        Self::NotFound { context }
    }

    /// Wrap a store failure; a store-level `NotFound` keeps its meaning.
    pub fn store(context: ErrorContext, cause: RepoError) -> Self {
        match cause {
            RepoError::NotFound => Self::NotFound { context },
            cause => Self::Store { context, cause },
        }
    }

    pub fn cache(context: ErrorContext, cause: CacheError) -> Self {
        Self::Cache { context, cause }
    }

    pub fn timeout(context: ErrorContext, after: Duration) -> Self {
        Self::Timeout { context, after }
    }

    pub fn kind(&self) -> PostErrorKind {
        match self {
            PostError::Validation { .. } => PostErrorKind::Validation,
            PostError::NotFound { .. } => PostErrorKind::NotFound,
            PostError::Store { .. } => PostErrorKind::Store,
            PostError::Cache { .. } => PostErrorKind::Cache,
            PostError::Timeout { .. } => PostErrorKind::Timeout,
        }
    }

    pub fn context(&self) -> ErrorContext {
        match self {
            PostError::Validation { context, .. }
            | PostError::NotFound { context }
            | PostError::Store { context, .. }
            | PostError::Cache { context, .. }
            | PostError::Timeout { context, .. } => *context,
        }
    }
}
