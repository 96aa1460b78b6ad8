//! Push-based sink contract handed to the connection by a requester/responder
//! (spec §4.6, and the capability-set redesign called for in §9's Design
//! Notes in place of the source's protocol-conformance objects).

use crate::error::RSocketError;
use crate::payload::Payload;

/// Single-consumer, push-based sink. A sink belongs to exactly one stream
/// for its whole lifecycle; never share one across streams (§9).
pub trait Subscriber: Send {
    fn on_next(&mut self, payload: Payload, is_completion: bool);
    fn on_complete(&mut self);
    fn on_error(&mut self, error: RSocketError);
    fn on_cancel(&mut self);
    fn on_request_n(&mut self, n: u32);
}

/// Wraps a `Subscriber` and enforces the terminal-exactness invariant
/// (spec §8 property 4): once `on_complete`/`on_error`/`on_cancel` has fired
/// once, every later call of any kind is silently dropped.
pub struct TerminatingSubscriber<S: Subscriber> {
    inner: S,
    terminated: bool,
}

impl<S: Subscriber> TerminatingSubscriber<S> {
    pub fn new(inner: S) -> TerminatingSubscriber<S> {
        TerminatingSubscriber {
            inner,
            terminated: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<S: Subscriber> Subscriber for TerminatingSubscriber<S> {
    fn on_next(&mut self, payload: Payload, is_completion: bool) {
        if self.terminated {
            return;
        }
        if is_completion {
            self.terminated = true;
        }
        self.inner.on_next(payload, is_completion);
    }

    fn on_complete(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.inner.on_complete();
    }

    fn on_error(&mut self, error: RSocketError) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.inner.on_error(error);
    }

    fn on_cancel(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.inner.on_cancel();
    }

    fn on_request_n(&mut self, n: u32) {
        if self.terminated {
            return;
        }
        self.inner.on_request_n(n);
    }
}

impl Subscriber for Box<dyn Subscriber> {
    fn on_next(&mut self, payload: Payload, is_completion: bool) {
        (**self).on_next(payload, is_completion)
    }

    fn on_complete(&mut self) {
        (**self).on_complete()
    }

    fn on_error(&mut self, error: RSocketError) {
        (**self).on_error(error)
    }

    fn on_cancel(&mut self) {
        (**self).on_cancel()
    }

    fn on_request_n(&mut self, n: u32) {
        (**self).on_request_n(n)
    }
}

/// Sink that drops everything; used as the post-cancellation no-op a stale
/// stream handle's sink decays into (spec §4 ownership note).
pub struct NoopSubscriber;

impl Subscriber for NoopSubscriber {
    fn on_next(&mut self, _payload: Payload, _is_completion: bool) {}
    fn on_complete(&mut self) {}
    fn on_error(&mut self, _error: RSocketError) {}
    fn on_cancel(&mut self) {}
    fn on_request_n(&mut self, _n: u32) {}
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Next(Option<Vec<u8>>, bool),
        Complete,
        Error(String),
        Cancel,
        RequestN(u32),
    }

    #[derive(Clone)]
    pub struct RecordingSubscriber {
        pub events: Arc<Mutex<Vec<Event>>>,
    }

    impl RecordingSubscriber {
        pub fn new() -> RecordingSubscriber {
            RecordingSubscriber {
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Subscriber for RecordingSubscriber {
        fn on_next(&mut self, payload: Payload, is_completion: bool) {
            let data = payload.data().as_ref().map(|d| d.to_vec());
            self.events.lock().unwrap().push(Event::Next(data, is_completion));
        }

        fn on_complete(&mut self) {
            self.events.lock().unwrap().push(Event::Complete);
        }

        fn on_error(&mut self, error: RSocketError) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Error(error.to_string()));
        }

        fn on_cancel(&mut self) {
            self.events.lock().unwrap().push(Event::Cancel);
        }

        fn on_request_n(&mut self, n: u32) {
            self.events.lock().unwrap().push(Event::RequestN(n));
        }
    }

    #[test]
    fn swallows_everything_after_first_terminal() {
        let recorder = RecordingSubscriber::new();
        let events = recorder.events.clone();
        let mut sink = TerminatingSubscriber::new(recorder);
        sink.on_complete();
        sink.on_error(RSocketError::Other("late".into()));
        sink.on_cancel();
        assert_eq!(events.lock().unwrap().as_slice(), &[Event::Complete]);
    }
}
