use super::{Half, Incoming, StreamEntry};
use crate::frame::Frame;
use crate::sink::Subscriber;

/// Fire-and-forget, responder side: a single logical payload (after
/// fragment reassembly), delivered once, both halves close immediately
/// (spec §4.5 "Fire-and-forget"). The requester side never gets a
/// `StreamEntry` at all — it closes both halves and is reaped synchronously
/// when the request is emitted.
pub fn on_inbound(_stream_id: u32, entry: &mut StreamEntry, event: Incoming) -> Vec<Frame> {
    if entry.is_terminated() {
        return Vec::new();
    }
    if let Some(payload) = event.into_payload() {
        entry.sink.on_next(payload, true);
    }
    entry.local_half = Half::Closed;
    entry.remote_half = Half::Closed;
    Vec::new()
}
