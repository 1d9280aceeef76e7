use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::{Instrument, debug, field, info_span, warn};

use crate::domain::entities::PostRecord;

use super::access::PostAccess;
use super::types::{
    CreatePostInput, PostError, PostErrorKind, PostIdInput, PostSlugInput, PostTitleInput,
    UpdatePostInput,
};

pub const METRIC_OPERATION_MS: &str = "postcache_operation_ms";
pub const METRIC_OPERATION_ERRORS: &str = "postcache_operation_error_total";

/// Runs every operation of the wrapped [`PostAccess`] inside a
/// `posts.operation` span and records its latency and failures.
#[derive(Debug, Clone)]
pub struct Traced<A> {
    inner: A,
}

impl<A> Traced<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

async fn observe<T, Fut>(operation: &'static str, fut: Fut) -> Result<T, PostError>
where
    Fut: Future<Output = Result<T, PostError>> + Send,
{
    let span = info_span!("posts.operation", operation, outcome = field::Empty);
    let started_at = Instant::now();
    let result = fut.instrument(span.clone()).await;

    histogram!(METRIC_OPERATION_MS, "operation" => operation)
        .record(started_at.elapsed().as_secs_f64() * 1000.0);

    match &result {
        Ok(_) => {
            span.record("outcome", "ok");
        }
        Err(err) => {
            let kind = err.kind();
            span.record("outcome", kind.as_str());
            counter!(
                METRIC_OPERATION_ERRORS,
                "operation" => operation,
                "kind" => kind.as_str()
            )
            .increment(1);

            match kind {
                PostErrorKind::Validation | PostErrorKind::NotFound => debug!(
                    parent: &span,
                    target = "postcache::posts",
                    operation,
                    kind = kind.as_str(),
                    error = %err,
                    "post operation rejected"
                ),
                _ => warn!(
                    parent: &span,
                    target = "postcache::posts",
                    operation,
                    kind = kind.as_str(),
                    error = %err,
                    "post operation failed"
                ),
            }
        }
    }

    result
}

#[async_trait]
impl<A> PostAccess for Traced<A>
where
    A: PostAccess,
{
    async fn create(&self, input: CreatePostInput) -> Result<PostRecord, PostError> {
        observe("create", self.inner.create(input)).await
    }

    async fn find_all(&self) -> Result<Vec<PostRecord>, PostError> {
        observe("find_all", self.inner.find_all()).await
    }

    async fn find_by_id(&self, input: PostIdInput) -> Result<PostRecord, PostError> {
        observe("find_by_id", self.inner.find_by_id(input)).await
    }

    async fn find_by_title(&self, input: PostTitleInput) -> Result<PostRecord, PostError> {
        observe("find_by_title", self.inner.find_by_title(input)).await
    }

    async fn find_by_slug(&self, input: PostSlugInput) -> Result<PostRecord, PostError> {
        observe("find_by_slug", self.inner.find_by_slug(input)).await
    }

    async fn update(&self, input: UpdatePostInput) -> Result<PostRecord, PostError> {
        observe("update", self.inner.update(input)).await
    }

    async fn delete(&self, input: PostIdInput) -> Result<(), PostError> {
        observe("delete", self.inner.delete(input)).await
    }
}
