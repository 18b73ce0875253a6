//! `tracing` integration.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata};
use tracing_subscriber::layer::{Context, Filter};

use crate::RateLimitFilter;

/// Per-layer filter that drops repeated ERROR events.
///
/// An event's trace is its callsite (target and source location) followed by
/// its message and fields. Events below ERROR always pass.
///
/// ```
/// use std::sync::Arc;
/// use elmenu_ratelimit::{DedupFilter, RateLimitConfig, RateLimitFilter};
/// use tracing_subscriber::{Layer, layer::SubscriberExt};
///
/// let limiter = Arc::new(RateLimitFilter::new(RateLimitConfig::default()));
/// let subscriber = tracing_subscriber::registry()
///     .with(tracing_subscriber::fmt::layer().with_filter(DedupFilter::new(limiter)));
/// # drop(subscriber);
/// ```
#[derive(Clone)]
pub struct DedupFilter {
    limiter: Arc<RateLimitFilter>,
}

impl DedupFilter {
    /// Wrap a shared rate limiter.
    #[must_use]
    pub fn new(limiter: Arc<RateLimitFilter>) -> Self {
        Self { limiter }
    }
}

impl<S> Filter<S> for DedupFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        if *event.metadata().level() != Level::ERROR {
            return true;
        }
        self.limiter.permit(&render_event(event))
    }
}

fn render_event(event: &Event<'_>) -> String {
    let meta = event.metadata();
    let mut visitor = TraceVisitor(format!("{} {}", meta.target(), meta.name()));
    event.record(&mut visitor);
    visitor.0
}

struct TraceVisitor(String);

impl Visit for TraceVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "\n{value:?}");
        } else {
            let _ = write!(self.0, "\n{}={value:?}", field.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    use elmenu_cache::{Clock, ManualClock};
    use tracing_subscriber::Layer;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::RateLimitConfig;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    struct BufferWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> MakeWriter<'a> for SharedBuffer {
        type Writer = BufferWriter;

        fn make_writer(&'a self) -> Self::Writer {
            BufferWriter(Arc::clone(&self.0))
        }
    }

    impl io::Write for BufferWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(limiter: Arc<RateLimitFilter>, emit: impl FnOnce()) -> Vec<String> {
        let sink = SharedBuffer::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(sink.clone())
                .with_ansi(false)
                .without_time()
                .with_filter(DedupFilter::new(limiter)),
        );

        tracing::subscriber::with_default(subscriber, emit);

        let bytes = sink.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn limiter() -> (Arc<RateLimitFilter>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimitFilter::new(RateLimitConfig::default())
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        (Arc::new(limiter), clock)
    }

    #[test]
    fn test_repeated_error_is_logged_once() {
        let (limiter, _clock) = limiter();

        let lines = capture(limiter, || {
            for _ in 0..3 {
                tracing::error!("menu store unavailable");
            }
        });

        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("menu store unavailable"));
    }

    #[test]
    fn test_warnings_are_not_deduplicated() {
        let (limiter, _clock) = limiter();

        let lines = capture(limiter, || {
            for _ in 0..3 {
                tracing::warn!("cache unavailable");
            }
        });

        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_errors_with_different_fields_are_distinct() {
        let (limiter, _clock) = limiter();

        let lines = capture(limiter, || {
            for lang in ["en", "de", "en"] {
                tracing::error!(lang, "render failed");
            }
        });

        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_error_is_logged_again_after_window() {
        let (limiter, clock) = limiter();

        let lines = capture(limiter, || {
            for _ in 0..2 {
                tracing::error!("menu store unavailable");
                clock.advance(Duration::from_secs(10));
            }
        });

        assert_eq!(lines.len(), 2);
    }
}
