//! Metric names emitted by the cache adapter and the tracing decorator.

mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;

use postcache::application::cache::{PostCache, PostCacheKey};
use postcache::application::posts::{
    CachePolicy, CreatePostInput, METRIC_OPERATION_ERRORS, METRIC_OPERATION_MS, PostAccess,
    PostIdInput, PostService, Traced,
};
use postcache::infra::cache::{
    METRIC_CACHE_EVICT, METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS,
    MemoryPostCache,
};
use postcache::infra::telemetry;

use support::MemoryPosts;

#[tokio::test(start_paused = true)]
async fn cache_and_operation_metrics_are_emitted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let posts = MemoryPosts::new();
    let cache = Arc::new(MemoryPostCache::new(1));
    let access = Traced::new(PostService::new(
        posts.clone(),
        posts.clone(),
        cache.clone(),
        CachePolicy {
            ttl: Duration::from_secs(10),
            ..CachePolicy::default()
        },
    ));

    let first = access
        .create(CreatePostInput {
            title: "One".to_string(),
            slug: Some("one".to_string()),
            content: "body".to_string(),
        })
        .await
        .expect("create");
    let second = access
        .create(CreatePostInput {
            title: "Two".to_string(),
            slug: Some("two".to_string()),
            content: "body".to_string(),
        })
        .await
        .expect("create");

    // miss + populate, then hit
    access
        .find_by_id(PostIdInput { id: first.id })
        .await
        .expect("miss");
    access
        .find_by_id(PostIdInput { id: first.id })
        .await
        .expect("hit");

    // capacity of one: caching the second post evicts the first
    access
        .find_by_id(PostIdInput { id: second.id })
        .await
        .expect("evicting read");

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(
        cache.get(&PostCacheKey::Id(second.id)).await.expect("get"),
        None
    );

    access
        .find_by_id(PostIdInput { id: 404 })
        .await
        .expect_err("not found");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        METRIC_CACHE_HIT,
        METRIC_CACHE_MISS,
        METRIC_CACHE_EXPIRED,
        METRIC_CACHE_EVICT,
        METRIC_OPERATION_MS,
        METRIC_OPERATION_ERRORS,
    ];
    for name in expected {
        assert!(names.contains(name), "missing metric {name}");
    }
}
