use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::domain::entities::PostRecord;

use super::access::PostAccess;
use super::types::{
    CreatePostInput, ErrorContext, PostError, PostIdInput, PostSlugInput, PostTitleInput,
    UpdatePostInput,
};

/// Bounds each whole operation of the wrapped [`PostAccess`], cache and store
/// steps included. On expiry the in-flight future is dropped.
#[derive(Debug, Clone)]
pub struct Deadline<A> {
    inner: A,
    after: Duration,
}

impl<A> Deadline<A> {
    pub fn new(inner: A, after: Duration) -> Self {
        Self { inner, after }
    }

    pub fn after(&self) -> Duration {
        self.after
    }

    async fn bounded<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, PostError>
    where
        Fut: Future<Output = Result<T, PostError>> + Send,
    {
        match timeout(self.after, fut).await {
            Ok(result) => result,
            Err(_) => Err(PostError::timeout(
                ErrorContext::new(operation, "deadline"),
                self.after,
            )),
        }
    }
}

#[async_trait]
impl<A> PostAccess for Deadline<A>
where
    A: PostAccess,
{
    async fn create(&self, input: CreatePostInput) -> Result<PostRecord, PostError> {
        self.bounded("create", self.inner.create(input)).await
    }

    async fn find_all(&self) -> Result<Vec<PostRecord>, PostError> {
        self.bounded("find_all", self.inner.find_all()).await
    }

    async fn find_by_id(&self, input: PostIdInput) -> Result<PostRecord, PostError> {
        self.bounded("find_by_id", self.inner.find_by_id(input)).await
    }

    async fn find_by_title(&self, input: PostTitleInput) -> Result<PostRecord, PostError> {
        self.bounded("find_by_title", self.inner.find_by_title(input))
            .await
    }

    async fn find_by_slug(&self, input: PostSlugInput) -> Result<PostRecord, PostError> {
        self.bounded("find_by_slug", self.inner.find_by_slug(input))
            .await
    }

    async fn update(&self, input: UpdatePostInput) -> Result<PostRecord, PostError> {
        self.bounded("update", self.inner.update(input)).await
    }

    async fn delete(&self, input: PostIdInput) -> Result<(), PostError> {
        self.bounded("delete", self.inner.delete(input)).await
    }
}
