use std::future::Future;

use tracing::{debug, warn};

use crate::application::cache::PostCacheKey;
use crate::application::repos::RepoError;
use crate::domain::entities::PostRecord;

use super::service::PostService;
use super::types::{ErrorContext, PostError, PostIdInput, PostSlugInput, PostTitleInput};

impl PostService {
    pub async fn list_posts(&self) -> Result<Vec<PostRecord>, PostError> {
        self.reader
            .list_posts()
            .await
            .map_err(|err| PostError::store(ErrorContext::new("find_all", "query"), err))
    }

    pub async fn post_by_id(&self, input: PostIdInput) -> Result<PostRecord, PostError> {
        const OP: &str = "find_by_id";
        let id = input
            .validate()
            .map_err(|err| PostError::validation(ErrorContext::new(OP, "validate"), err))?;

        self.read_through(OP, PostCacheKey::Id(id), || self.reader.find_by_id(id))
            .await
    }

    pub async fn post_by_title(&self, input: PostTitleInput) -> Result<PostRecord, PostError> {
        const OP: &str = "find_by_title";
        let title = input
            .validate()
            .map_err(|err| PostError::validation(ErrorContext::new(OP, "validate"), err))?;

        self.read_through(OP, PostCacheKey::Title(title.clone()), || {
            self.reader.find_by_title(&title)
        })
        .await
    }

    pub async fn post_by_slug(&self, input: PostSlugInput) -> Result<PostRecord, PostError> {
        const OP: &str = "find_by_slug";
        let slug = input
            .validate()
            .map_err(|err| PostError::validation(ErrorContext::new(OP, "validate"), err))?;

        self.read_through(OP, PostCacheKey::Slug(slug.clone()), || {
            self.reader.find_by_slug(&slug)
        })
        .await
    }

    /// Cache-aside read shared by every keyed lookup.
    ///
    /// A cache read failure is logged and treated as a miss. A store miss is
    /// `NotFound` and leaves the cache untouched.
    async fn read_through<F, Fut>(
        &self,
        operation: &'static str,
        key: PostCacheKey,
        load: F,
    ) -> Result<PostRecord, PostError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<PostRecord>, RepoError>> + Send,
    {
        match self.cache.get(&key).await {
            Ok(Some(post)) => {
                debug!(
                    target = "postcache::posts",
                    operation,
                    key = %key,
                    "served from cache"
                );
                return Ok(post);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target = "postcache::posts",
                    operation,
                    key = %key,
                    error = %err,
                    "cache read failed; falling back to store"
                );
            }
        }

        let post = load()
            .await
            .map_err(|err| PostError::store(ErrorContext::new(operation, "query"), err))?
            .ok_or_else(|| PostError::not_found(ErrorContext::new(operation, "query")))?;

        if let Err(err) = self.cache.set(&key, self.policy.ttl, &post).await {
            if self.policy.strict_writes {
                return Err(PostError::cache(
                    ErrorContext::new(operation, "populate"),
                    err,
                ));
            }
            warn!(
                target = "postcache::posts",
                operation,
                key = %key,
                error = %err,
                "cache population failed"
            );
        }

        Ok(post)
    }
}
