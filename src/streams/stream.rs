use super::{Half, Incoming, StreamEntry};
use crate::error::RSocketError;
use crate::frame::Frame;
use crate::sink::Subscriber;

/// Request/stream: zero or more NEXT, then one terminal (COMPLETE or
/// ERROR); REQUEST_N/CANCEL flow the other way at any time while the
/// remote half is open (spec §4.5 "Request / Stream").
pub fn on_inbound(_stream_id: u32, entry: &mut StreamEntry, event: Incoming) -> Vec<Frame> {
    if entry.is_terminated() {
        return Vec::new();
    }
    match event {
        Incoming::Payload {
            payload,
            has_next,
            has_complete,
        } => {
            if has_complete {
                entry.remote_half = Half::Closed;
                entry.local_half = Half::Closed;
            }
            if has_next {
                entry.sink.on_next(payload, has_complete);
            } else if has_complete {
                entry.sink.on_complete();
            }
            Vec::new()
        }
        Incoming::Error { code, message } => {
            entry.remote_half = Half::Closed;
            entry.local_half = Half::Closed;
            entry.sink.on_error(RSocketError::WireError(code, message));
            Vec::new()
        }
        Incoming::Cancel => {
            entry.local_half = Half::Closed;
            entry.remote_half = Half::Closed;
            entry.sink.on_cancel();
            Vec::new()
        }
        Incoming::RequestN(n) => {
            entry.grant_demand(n);
            entry.sink.on_request_n(n);
            Vec::new()
        }
    }
}
