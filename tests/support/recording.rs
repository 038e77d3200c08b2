use std::sync::{Arc, Mutex};
use std::time::Duration;

use filmfetch_core::fetch::{FetchEvent, FetchReporter};

/// Captures every event so tests can assert on attempts and backoff.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<FetchEvent>>,
}

impl RecordingReporter {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Backoff delays for `url`, in the order they were scheduled.
    pub fn retry_delays(&self, url: &str) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FetchEvent::RetryScheduled {
                    url: retried, delay, ..
                } if retried == url => Some(delay),
                _ => None,
            })
            .collect()
    }

    pub fn retry_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, FetchEvent::RetryScheduled { .. }))
            .count()
    }

    pub fn succeeded_indices(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FetchEvent::Succeeded {
                    index: Some(index), ..
                } => Some(index),
                _ => None,
            })
            .collect()
    }
}

impl FetchReporter for RecordingReporter {
    fn report(&self, event: &FetchEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
