#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use postcache::application::cache::{CacheError, PostCache, PostCacheKey};
use postcache::application::posts::{CachePolicy, PostService};
use postcache::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use postcache::domain::entities::PostRecord;
use postcache::infra::cache::MemoryPostCache;

/// In-memory durable store that counts reads and can be made to fail or hang.
#[derive(Default)]
pub struct MemoryPosts {
    posts: Mutex<BTreeMap<i64, PostRecord>>,
    next_id: AtomicUsize,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    stall: AtomicBool,
}

impl MemoryPosts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn stall(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    pub async fn stored(&self, id: i64) -> Option<PostRecord> {
        self.posts.lock().await.get(&id).cloned()
    }

    async fn read<F>(&self, matches: F) -> Result<Option<PostRecord>, RepoError>
    where
        F: Fn(&PostRecord) -> bool + Send,
    {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            pending::<()>().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection refused".to_string()));
        }
        Ok(self
            .posts
            .lock()
            .await
            .values()
            .find(|post| matches(post))
            .cloned())
    }

    fn conflict(
        posts: &BTreeMap<i64, PostRecord>,
        skip: Option<i64>,
        title: &str,
        slug: &str,
    ) -> Option<RepoError> {
        let others = posts.values().filter(|post| Some(post.id) != skip);
        for post in others {
            if post.title == title {
                return Some(RepoError::Duplicate {
                    constraint: "posts_title_key".to_string(),
                });
            }
            if post.slug == slug {
                return Some(RepoError::Duplicate {
                    constraint: "posts_slug_key".to_string(),
                });
            }
        }
        None
    }
}

#[async_trait]
impl PostsRepo for MemoryPosts {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.posts.lock().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        self.read(|post| post.id == id).await
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<PostRecord>, RepoError> {
        let title = title.to_string();
        self.read(move |post| post.title == title).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let slug = slug.to_string();
        self.read(move |post| post.slug == slug).await
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryPosts {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().await;
        if let Some(err) = Self::conflict(&posts, None, &params.title, &params.slug) {
            return Err(err);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id,
            title: params.title,
            slug: params.slug,
            content: params.content,
            created_at: now,
            updated_at: now,
        };
        posts.insert(id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().await;
        let mut post = posts.get(&params.id).cloned().ok_or(RepoError::NotFound)?;

        if let Some(title) = params.title {
            post.title = title;
        }
        if let Some(slug) = params.slug {
            post.slug = slug;
        }
        if let Some(content) = params.content {
            post.content = content;
        }
        if let Some(err) = Self::conflict(&posts, Some(post.id), &post.title, &post.slug) {
            return Err(err);
        }

        post.updated_at = OffsetDateTime::now_utc();
        posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        self.posts
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

/// Wraps the memory cache with switchable failures and a log of operations.
pub struct FlakyCache {
    pub inner: MemoryPostCache,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    sets: AtomicUsize,
    deleted: Mutex<Vec<PostCacheKey>>,
}

impl FlakyCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryPostCache::new(64),
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            sets: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub async fn deleted(&self) -> Vec<PostCacheKey> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl PostCache for FlakyCache {
    async fn get(&self, key: &PostCacheKey) -> Result<Option<PostRecord>, CacheError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable("connection reset by peer"));
        }
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &PostCacheKey,
        ttl: Duration,
        post: &PostRecord,
    ) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::Timeout);
        }
        self.inner.set(key, ttl, post).await
    }

    async fn delete(&self, key: &PostCacheKey) -> Result<(), CacheError> {
        self.deleted.lock().await.push(key.clone());
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable("connection reset by peer"));
        }
        self.inner.delete(key).await
    }
}

pub fn service(
    posts: &Arc<MemoryPosts>,
    cache: &Arc<FlakyCache>,
    policy: CachePolicy,
) -> PostService {
    PostService::new(posts.clone(), posts.clone(), cache.clone(), policy)
}
