//! Cache port for post lookups.
//!
//! Entries are keyed by the lookup dimension (id, title or slug) and hold a
//! full [`PostRecord`] copy. `Ok(None)` is the only absence signal; adapters
//! never encode a miss as a default-valued record.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::PostRecord;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
/// Longest TTL adapters honour; longer requests are clamped to it.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostCacheKey {
    Id(i64),
    Title(String),
    Slug(String),
}

impl PostCacheKey {
    pub fn dimension(&self) -> &'static str {
        match self {
            PostCacheKey::Id(_) => "id",
            PostCacheKey::Title(_) => "title",
            PostCacheKey::Slug(_) => "slug",
        }
    }

    /// Every key under which `post` may be cached.
    pub fn all_for(post: &PostRecord) -> [PostCacheKey; 3] {
        [
            PostCacheKey::Id(post.id),
            PostCacheKey::Title(post.title.clone()),
            PostCacheKey::Slug(post.slug.clone()),
        ]
    }
}

impl fmt::Display for PostCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostCacheKey::Id(id) => write!(f, "post:id:{id}"),
            PostCacheKey::Title(title) => write!(f, "post:title:{title}"),
            PostCacheKey::Slug(slug) => write!(f, "post:slug:{slug}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out")]
    Timeout,
    #[error("cache entry `{key}` could not be decoded: {message}")]
    Corrupt { key: String, message: String },
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

#[async_trait]
pub trait PostCache: Send + Sync {
    async fn get(&self, key: &PostCacheKey) -> Result<Option<PostRecord>, CacheError>;

    async fn set(
        &self,
        key: &PostCacheKey,
        ttl: Duration,
        post: &PostRecord,
    ) -> Result<(), CacheError>;

    async fn delete(&self, key: &PostCacheKey) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    #[test]
    fn keys_render_with_dimension_prefix() {
        assert_eq!(PostCacheKey::Id(42).to_string(), "post:id:42");
        assert_eq!(
            PostCacheKey::Title("Hello".to_string()).to_string(),
            "post:title:Hello"
        );
        assert_eq!(
            PostCacheKey::Slug("hello".to_string()).to_string(),
            "post:slug:hello"
        );
    }

    #[test]
    fn all_for_covers_every_dimension() {
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: 7,
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            content: "body".to_string(),
            created_at: now,
            updated_at: now,
        };

        let dimensions: Vec<_> = PostCacheKey::all_for(&post)
            .iter()
            .map(PostCacheKey::dimension)
            .collect();
        assert_eq!(dimensions, ["id", "title", "slug"]);
    }

    #[test]
    fn default_ttl_is_one_hour() {
        assert_eq!(DEFAULT_CACHE_TTL.as_secs(), 3600);
    }
}
