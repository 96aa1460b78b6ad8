use super::{Half, Incoming, StreamEntry};
use crate::error::{ErrorCode, RSocketError};
use crate::frame::{Error as ErrorBody, Frame};
use crate::sink::Subscriber;

/// Request/response: a single NEXT+COMPLETE or ERROR terminates the remote
/// half; CANCEL terminates both (spec §4.5 "Request / Response").
pub fn on_inbound(stream_id: u32, entry: &mut StreamEntry, event: Incoming) -> Vec<Frame> {
    if entry.is_terminated() {
        return Vec::new();
    }
    match event {
        Incoming::Payload {
            payload,
            has_complete,
            ..
        } => {
            if has_complete {
                entry.remote_half = Half::Closed;
                entry.local_half = Half::Closed;
                entry.sink.on_next(payload, true);
                Vec::new()
            } else {
                protocol_violation(stream_id, entry)
            }
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
        Incoming::RequestN(_) => Vec::new(),
    }
}

fn protocol_violation(stream_id: u32, entry: &mut StreamEntry) -> Vec<Frame> {
    entry.local_half = Half::Closed;
    entry.remote_half = Half::Closed;
    entry.sink.on_error(RSocketError::WireError(
        ErrorCode::Canceled,
        "payload without COMPLETE on request/response".to_owned(),
    ));
    vec![ErrorBody::build_frame(
        stream_id,
        ErrorCode::Canceled.as_u32(),
        "payload without COMPLETE on request/response",
    )]
}
