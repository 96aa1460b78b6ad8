//! Demultiplexer (component C2): the first decision point after decode —
//! does this frame belong to the connection itself (stream 0) or to a data
//! stream (spec §4.2)?

use crate::frame::{self, Frame};

/// Where one decoded frame should be routed next.
pub enum Destination {
    /// Stream 0 traffic: SETUP, LEASE, KEEPALIVE, METADATA_PUSH, ERROR,
    /// RESUME/RESUME_OK. Handled by the connection state machine (C3).
    Connection(Frame),
    /// Traffic for a non-zero stream id. Handled by the stream registry (C4).
    Stream(u32, Frame),
}

/// Classifies a decoded frame by its stream id and type. Does not look
/// anything up in the registry — that's the caller's job once it knows
/// which table to consult.
pub fn demux(frame: Frame) -> Destination {
    let stream_id = frame.stream_id();
    if stream_id == 0 && frame::is_connection_frame(frame.frame_type()) {
        Destination::Connection(frame)
    } else {
        Destination::Stream(stream_id, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Error, Keepalive};

    #[test]
    fn stream_zero_keepalive_routes_to_connection() {
        let frame = Keepalive::build_frame(true, 0, None);
        match demux(frame) {
            Destination::Connection(_) => (),
            Destination::Stream(..) => panic!("expected Connection destination"),
        }
    }

    #[test]
    fn nonzero_stream_error_routes_to_stream() {
        let frame = Error::build_frame(7, crate::frame::ERR_APPLICATION, "boom");
        match demux(frame) {
            Destination::Stream(id, _) => assert_eq!(id, 7),
            Destination::Connection(_) => panic!("expected Stream destination"),
        }
    }
}
