use std::sync::Arc;

use async_trait::async_trait;

use crate::application::cache::PostCache;
use crate::application::repos::{PostsRepo, PostsWriteRepo};
use crate::domain::entities::PostRecord;

use super::access::PostAccess;
use super::types::{
    CachePolicy, CreatePostInput, PostError, PostIdInput, PostSlugInput, PostTitleInput,
    UpdatePostInput,
};

#[derive(Clone)]
pub struct PostService {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) cache: Arc<dyn PostCache>,
    pub(crate) policy: CachePolicy,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        cache: Arc<dyn PostCache>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }
}

#[async_trait]
impl PostAccess for PostService {
    async fn create(&self, input: CreatePostInput) -> Result<PostRecord, PostError> {
        self.create_post(input).await
    }

    async fn find_all(&self) -> Result<Vec<PostRecord>, PostError> {
        self.list_posts().await
    }

    async fn find_by_id(&self, input: PostIdInput) -> Result<PostRecord, PostError> {
        self.post_by_id(input).await
    }

    async fn find_by_title(&self, input: PostTitleInput) -> Result<PostRecord, PostError> {
        self.post_by_title(input).await
    }

    async fn find_by_slug(&self, input: PostSlugInput) -> Result<PostRecord, PostError> {
        self.post_by_slug(input).await
    }

    async fn update(&self, input: UpdatePostInput) -> Result<PostRecord, PostError> {
        self.update_post(input).await
    }

    async fn delete(&self, input: PostIdInput) -> Result<(), PostError> {
        self.delete_post(input).await
    }
}
