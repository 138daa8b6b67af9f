//! Recording notification dispatcher for tests and embedded use.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::job::ports::notification::{LifecycleEvent, NotificationDispatcher};

/// Dispatcher that records every emitted event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    events: Arc<RwLock<Vec<LifecycleEvent>>>,
}

impl RecordingDispatcher {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, event: LifecycleEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}
