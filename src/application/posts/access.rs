use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::PostRecord;

use super::types::{
    CreatePostInput, PostError, PostIdInput, PostSlugInput, PostTitleInput, UpdatePostInput,
};

/// The post operations exposed to callers.
///
/// Implemented by [`super::PostService`] and by the decorators that wrap it,
/// so a composed stack is used exactly like the bare service.
#[async_trait]
pub trait PostAccess: Send + Sync {
    async fn create(&self, input: CreatePostInput) -> Result<PostRecord, PostError>;

    async fn find_all(&self) -> Result<Vec<PostRecord>, PostError>;

    async fn find_by_id(&self, input: PostIdInput) -> Result<PostRecord, PostError>;

    async fn find_by_title(&self, input: PostTitleInput) -> Result<PostRecord, PostError>;

    async fn find_by_slug(&self, input: PostSlugInput) -> Result<PostRecord, PostError>;

    async fn update(&self, input: UpdatePostInput) -> Result<PostRecord, PostError>;

    async fn delete(&self, input: PostIdInput) -> Result<(), PostError>;
}

#[async_trait]
impl<T> PostAccess for Arc<T>
where
    T: PostAccess + ?Sized,
{
    async fn create(&self, input: CreatePostInput) -> Result<PostRecord, PostError> {
        (**self).create(input).await
    }

    async fn find_all(&self) -> Result<Vec<PostRecord>, PostError> {
        (**self).find_all().await
    }

    async fn find_by_id(&self, input: PostIdInput) -> Result<PostRecord, PostError> {
        (**self).find_by_id(input).await
    }

    async fn find_by_title(&self, input: PostTitleInput) -> Result<PostRecord, PostError> {
        (**self).find_by_title(input).await
    }

    async fn find_by_slug(&self, input: PostSlugInput) -> Result<PostRecord, PostError> {
        (**self).find_by_slug(input).await
    }

    async fn update(&self, input: UpdatePostInput) -> Result<PostRecord, PostError> {
        (**self).update(input).await
    }

    async fn delete(&self, input: PostIdInput) -> Result<(), PostError> {
        (**self).delete(input).await
    }
}
