//! Per-stream state machines (component C5).
//!
//! Each interaction kind gets its own module with one function,
//! `on_inbound`, that advances a `StreamEntry`'s halves given an already
//! fragment-reassembled `Incoming` event and returns whatever frames the
//! connection must write back (e.g. an `ERROR(CANCELED)` on a protocol
//! violation). Sink callbacks are invoked directly as a side effect; callers
//! never see them.

pub mod channel;
pub mod fnf;
pub mod request_response;
pub mod stream;

use crate::error::ErrorCode;
use crate::frame::{Body, Frame};
use crate::payload::Payload;
use crate::sink::{Subscriber, TerminatingSubscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    RequestResponse,
    RequestStream,
    RequestChannel,
    FireAndForget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Open,
    Closed,
}

/// In-flight reassembly state for a stream currently receiving `FOLLOWS`
/// fragments (spec §3 "Fragmentation").
pub struct FragmentAssembly {
    pub payload: Payload,
}

/// One live stream's full state (spec §3 "Stream state"). Owned exclusively
/// by the registry for the stream's lifetime.
pub struct StreamEntry {
    pub kind: Kind,
    pub epoch: u64,
    pub local_half: Half,
    pub remote_half: Half,
    /// Remaining NEXT frames we're allowed to emit (responder side).
    pub outbound_demand: u32,
    pub fragment: Option<FragmentAssembly>,
    pub sink: TerminatingSubscriber<Box<dyn Subscriber>>,
}

impl StreamEntry {
    pub fn new(kind: Kind, epoch: u64, sink: Box<dyn Subscriber>) -> StreamEntry {
        StreamEntry {
            kind,
            epoch,
            local_half: Half::Open,
            remote_half: Half::Open,
            outbound_demand: 0,
            fragment: None,
            sink: TerminatingSubscriber::new(sink),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.local_half == Half::Closed && self.remote_half == Half::Closed
    }

    /// Saturating grant of additional demand, clamped at `2^31 - 1`
    /// (spec §3 "inboundDemand ... saturates").
    pub fn grant_demand(&mut self, n: u32) {
        self.outbound_demand = self
            .outbound_demand
            .saturating_add(n)
            .min(crate::frame::REQUEST_MAX);
    }

    /// Consumes one unit of outbound demand for an emitted NEXT payload.
    /// Returns `false` (demand left untouched) if none was available —
    /// callers must treat that as "do not send".
    pub fn take_demand(&mut self) -> bool {
        if self.outbound_demand == 0 {
            return false;
        }
        self.outbound_demand -= 1;
        true
    }
}

/// One already-demultiplexed, already fragment-reassembled inbound event.
/// Extracting this from the wire `Frame` up front means reassembly only
/// ever has to merge `Payload` values, never reconstruct a fake `Frame`.
pub enum Incoming {
    Payload {
        payload: Payload,
        has_next: bool,
        has_complete: bool,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    Cancel,
    RequestN(u32),
}

impl Incoming {
    /// Extracts the fields relevant to fragmentation/dispatch from a decoded
    /// frame already known to be addressed to a data stream.
    pub fn from_frame(frame: Frame) -> Incoming {
        let has_next = frame.has_next();
        let has_complete = frame.has_complete();
        match frame.into_body() {
            Body::Payload(p) => Incoming::Payload {
                payload: p.into_payload(),
                has_next,
                has_complete,
            },
            Body::RequestFNF(r) => Incoming::Payload {
                payload: r.into_payload(),
                has_next: true,
                has_complete: true,
            },
            Body::RequestResponse(r) => Incoming::Payload {
                payload: r.into_payload(),
                has_next,
                has_complete,
            },
            Body::RequestStream(r) => Incoming::Payload {
                payload: r.into_payload(),
                has_next,
                has_complete,
            },
            Body::RequestChannel(r) => Incoming::Payload {
                payload: r.into_payload(),
                has_next,
                has_complete,
            },
            Body::Error(e) => Incoming::Error {
                code: ErrorCode::from_u32(e.code()),
                message: e.message(),
            },
            Body::Cancel => Incoming::Cancel,
            Body::RequestN(n) => Incoming::RequestN(n.n()),
            _ => Incoming::Payload {
                payload: Payload::default(),
                has_next: false,
                has_complete: false,
            },
        }
    }

    /// True when this event is one that can carry `FOLLOWS` fragments.
    pub fn is_fragmentable(&self) -> bool {
        matches!(self, Incoming::Payload { .. })
    }

    pub fn into_payload(self) -> Option<Payload> {
        match self {
            Incoming::Payload { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Dispatches one reassembled inbound event to the per-kind transition
/// function.
pub fn dispatch_inbound(stream_id: u32, entry: &mut StreamEntry, event: Incoming) -> Vec<Frame> {
    match entry.kind {
        Kind::RequestResponse => request_response::on_inbound(stream_id, entry, event),
        Kind::RequestStream => stream::on_inbound(stream_id, entry, event),
        Kind::RequestChannel => channel::on_inbound(stream_id, entry, event),
        Kind::FireAndForget => fnf::on_inbound(stream_id, entry, event),
    }
}
