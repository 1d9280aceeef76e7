use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::posts::{METRIC_OPERATION_ERRORS, METRIC_OPERATION_MS};
use crate::config::{LogFormat, LoggingSettings};

use super::cache::{METRIC_CACHE_EVICT, METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
use super::error::InfraError;

/// Applied below the configured level unless `RUST_LOG` names the target.
const QUIET_TARGETS: &[&str] = &["sqlx::query=warn"];

const COUNTERS: &[(&str, &str)] = &[
    (METRIC_CACHE_HIT, "Post cache lookups answered from the cache."),
    (METRIC_CACHE_MISS, "Post cache lookups that found no live entry."),
    (
        METRIC_CACHE_EXPIRED,
        "Post cache entries dropped on read after their TTL elapsed.",
    ),
    (METRIC_CACHE_EVICT, "Post cache entries evicted due to capacity."),
    (
        METRIC_OPERATION_ERRORS,
        "Failed post operations by operation and error kind.",
    ),
];

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber. JSON output includes the enclosing
/// `http.request` and `posts.operation` spans; compact output reports span
/// close timings instead.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn env_filter(logging: &LoggingSettings) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let explicit = std::env::var("RUST_LOG").unwrap_or_default();
    for quiet in QUIET_TARGETS {
        let target = quiet.split('=').next().unwrap_or_default();
        if explicit.contains(target) {
            continue;
        }
        if let Ok(directive) = quiet.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Register descriptions with whichever metrics recorder is installed.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(*name, Unit::Count, *description);
        }
        describe_histogram!(
            METRIC_OPERATION_MS,
            Unit::Milliseconds,
            "Post operation latency in milliseconds."
        );
    });
}
