//! A `Subscriber` that records every call it receives, for asserting on the
//! exact sequence of sink events a scenario produces (spec §8 S4-S7).

use std::sync::{Arc, Mutex};

use rsocket_core::{Payload, RSocketError, Subscriber};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Next(Option<Vec<u8>>, bool),
    Complete,
    Error(String),
    Cancel,
    RequestN(u32),
}

#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder::default()
    }

    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Subscriber for Recorder {
    fn on_next(&mut self, payload: Payload, is_completion: bool) {
        let data = payload.data().as_ref().map(|d| d.to_vec());
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Next(data, is_completion));
    }

    fn on_complete(&mut self) {
        self.events.lock().unwrap().push(RecordedEvent::Complete);
    }

    fn on_error(&mut self, error: RSocketError) {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Error(error.to_string()));
    }

    fn on_cancel(&mut self) {
        self.events.lock().unwrap().push(RecordedEvent::Cancel);
    }

    fn on_request_n(&mut self, n: u32) {
        self.events.lock().unwrap().push(RecordedEvent::RequestN(n));
    }
}

/// Polls `events.snapshot().len() >= count` until it's true or `timeout`
/// elapses, for waiting on an async round trip over the in-process
/// transport without a fixed sleep.
pub async fn wait_for_events(recorder: &Recorder, count: usize, timeout: std::time::Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if recorder.snapshot().len() >= count {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting for {} events, got {:?}",
                count,
                recorder.snapshot()
            );
        }
        tokio::time::delay_for(std::time::Duration::from_millis(5)).await;
    }
}
