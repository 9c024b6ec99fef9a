//! Tracing layer that records the events limiters emit.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing_subscriber::Layer;

/// Mock layer that captures events for testing.
///
/// Install it on a registry with `tracing::subscriber::with_default` or
/// `set_default` and assert on what a limiter logged.
///
/// # Examples
///
/// ```
/// use composite_limiter::infrastructure::mocks::MockCaptureLayer;
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let capture = MockCaptureLayer::new();
/// let subscriber = tracing_subscriber::registry().with(capture.clone());
///
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::debug!(rate = 2.0, "wait cancelled");
/// });
///
/// assert_eq!(capture.count(), 1);
/// assert_eq!(capture.messages(), vec!["wait cancelled".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct MockCaptureLayer {
    captured: Arc<Mutex<Vec<CapturedEvent>>>,
}

/// Captured event information.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl MockCaptureLayer {
    /// Create a new mock capture layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured events.
    pub fn get_captured(&self) -> Vec<CapturedEvent> {
        self.events().clone()
    }

    /// Get the count of captured events.
    pub fn count(&self) -> usize {
        self.events().len()
    }

    /// Messages of all captured events, in order.
    pub fn messages(&self) -> Vec<String> {
        self.events().iter().map(|e| e.message.clone()).collect()
    }

    /// Whether any captured event's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.message.contains(needle))
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.events().clear();
    }

    fn events(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        self.captured.lock().expect(
            "MockCaptureLayer mutex poisoned - a test thread panicked while holding the lock",
        )
    }
}

impl<S> Layer<S> for MockCaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        self.events().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl tracing::field::Visit for EventVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info};
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_mock_capture_layer() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!("test message");
            debug!(constituent = 2, "second event");
        });

        assert_eq!(capture.count(), 2);
        let events = capture.get_captured();
        assert_eq!(events[0].level, Level::INFO);
        assert_eq!(events[0].message, "test message");
        assert_eq!(events[1].fields.get("constituent").map(String::as_str), Some("2"));
        assert!(capture.contains("second"));

        capture.clear();
        assert_eq!(capture.count(), 0);
    }
}
