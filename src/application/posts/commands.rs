use tracing::warn;

use crate::application::cache::PostCacheKey;
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::{UniqueSlugError, unique_slug};

use super::service::PostService;
use super::types::{
    CreatePostInput, ErrorContext, InvalidationPolicy, PostError, PostIdInput, UpdatePostInput,
};

impl PostService {
    /// Insert a post. The cache is not touched.
    pub async fn create_post(&self, input: CreatePostInput) -> Result<PostRecord, PostError> {
        const OP: &str = "create";
        let derive_slug = input.slug.is_none();
        let mut params = input
            .validate()
            .map_err(|err| PostError::validation(ErrorContext::new(OP, "validate"), err))?;

        if derive_slug {
            params.slug = self.free_slug(&params.slug).await?;
        }

        self.writer
            .create_post(params)
            .await
            .map_err(|err| PostError::store(ErrorContext::new(OP, "write"), err))
    }

    pub async fn update_post(&self, input: UpdatePostInput) -> Result<PostRecord, PostError> {
        const OP: &str = "update";
        let params = input
            .validate()
            .map_err(|err| PostError::validation(ErrorContext::new(OP, "validate"), err))?;

        let previous = match self.policy.invalidation {
            InvalidationPolicy::IdOnly => None,
            InvalidationPolicy::AllKeys => Some(self.prefetch(OP, params.id).await?),
        };

        let updated = self
            .writer
            .update_post(params)
            .await
            .map_err(|err| PostError::store(ErrorContext::new(OP, "write"), err))?;

        if let Some(previous) = previous {
            let mut keys = PostCacheKey::all_for(&previous).to_vec();
            for key in PostCacheKey::all_for(&updated) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            self.invalidate(OP, &keys).await?;
        }

        Ok(updated)
    }

    pub async fn delete_post(&self, input: PostIdInput) -> Result<(), PostError> {
        const OP: &str = "delete";
        let id = input
            .validate()
            .map_err(|err| PostError::validation(ErrorContext::new(OP, "validate"), err))?;

        let keys = match self.policy.invalidation {
            InvalidationPolicy::IdOnly => vec![PostCacheKey::Id(id)],
            InvalidationPolicy::AllKeys => PostCacheKey::all_for(&self.prefetch(OP, id).await?)
                .to_vec(),
        };

        self.writer
            .delete_post(id)
            .await
            .map_err(|err| PostError::store(ErrorContext::new(OP, "write"), err))?;

        self.invalidate(OP, &keys).await
    }

    /// Read the stored record ahead of a mutation so its secondary keys are known.
    async fn prefetch(&self, operation: &'static str, id: i64) -> Result<PostRecord, PostError> {
        let context = ErrorContext::new(operation, "prefetch");
        self.reader
            .find_by_id(id)
            .await
            .map_err(|err| PostError::store(context, err))?
            .ok_or_else(|| PostError::not_found(context))
    }

    /// Delete every key, then report the first failure if writes are strict.
    async fn invalidate(
        &self,
        operation: &'static str,
        keys: &[PostCacheKey],
    ) -> Result<(), PostError> {
        let mut first_failure = None;

        for key in keys {
            if let Err(err) = self.cache.delete(key).await {
                warn!(
                    target = "postcache::posts",
                    operation,
                    key = %key,
                    error = %err,
                    "cache invalidation failed"
                );
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) if self.policy.strict_writes => Err(PostError::cache(
                ErrorContext::new(operation, "invalidate"),
                err,
            )),
            _ => Ok(()),
        }
    }

    /// Suffix a derived slug until no stored post uses it.
    async fn free_slug(&self, base: &str) -> Result<String, PostError> {
        let context = ErrorContext::new("create", "slug");
        let reader = self.reader.clone();

        unique_slug(base, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_some())
            }
        })
        .await
        .map_err(|err| match err {
            UniqueSlugError::Exhausted { .. } => {
                PostError::validation(context, DomainError::validation("slug", err.to_string()))
            }
            UniqueSlugError::Lookup(err) => PostError::store(context, err),
        })
    }
}
