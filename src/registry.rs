//! Stream registry (component C4): id allocation, the live-stream table,
//! frame routing and reaping.

use std::collections::HashMap;

use crate::error::RSocketResult;
use crate::frame::{Frame, REQUEST_MAX};
use crate::sink::Subscriber;
use crate::stream_id::{Role, StreamIdGenerator};
use crate::streams::{self, FragmentAssembly, Half, Incoming, Kind, StreamEntry};

/// Outcome of routing one inbound frame to the registry.
pub enum RouteOutcome {
    /// Frames the connection must now write back (may be empty).
    Handled(Vec<Frame>),
    /// The stream id isn't (or is no longer) registered: a late frame.
    NotFound(Frame),
}

pub struct StreamRegistry {
    entries: HashMap<u32, StreamEntry>,
    generator: StreamIdGenerator,
    next_epoch: u64,
    max_concurrent: Option<usize>,
}

impl StreamRegistry {
    pub fn new(role: Role, max_concurrent: Option<usize>) -> StreamRegistry {
        StreamRegistry {
            entries: HashMap::new(),
            generator: StreamIdGenerator::new(role),
            next_epoch: 1,
            max_concurrent,
        }
    }

    pub fn role(&self) -> Role {
        self.generator.role()
    }

    pub fn is_own_parity(&self, id: u32) -> bool {
        self.generator.is_own_parity(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_over_capacity(&self) -> bool {
        self.max_concurrent
            .map_or(false, |max| self.entries.len() >= max)
    }

    /// Mints the next id this role may use. Exhaustion is fatal to the
    /// connection (spec §4.4).
    pub fn allocate_id(&mut self) -> RSocketResult<u32> {
        let in_use: std::collections::HashSet<u32> = self.entries.keys().copied().collect();
        let id = self.generator.next(&in_use)?;
        debug_assert!(id <= REQUEST_MAX);
        Ok(id)
    }

    /// Mints an epoch without creating an entry, for callers that must build
    /// a `WireSink` tagged with it *before* the entry's final sink exists
    /// (the responder invocation path in the connection: the sink handed to
    /// the responder and the sink it hands back both need the same epoch).
    pub fn mint_epoch(&mut self) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        epoch
    }

    /// Registers a new stream entry under a freshly minted epoch and returns it.
    pub fn insert(&mut self, stream_id: u32, kind: Kind, sink: Box<dyn Subscriber>) -> u64 {
        let epoch = self.mint_epoch();
        self.insert_with_epoch(stream_id, kind, epoch, sink);
        epoch
    }

    /// Registers a new stream entry under a previously minted epoch.
    pub fn insert_with_epoch(&mut self, stream_id: u32, kind: Kind, epoch: u64, sink: Box<dyn Subscriber>) {
        self.entries
            .insert(stream_id, StreamEntry::new(kind, epoch, sink));
    }

    /// Closes just the local half (our sending direction) if `epoch` still
    /// matches, reaping the entry if that leaves both halves closed.
    pub fn close_local_half(&mut self, stream_id: u32, epoch: u64) {
        if let Some(entry) = self.entries.get_mut(&stream_id) {
            if entry.epoch == epoch {
                entry.local_half = Half::Closed;
            }
        }
        self.reap_if_terminated(stream_id);
    }

    /// Closes just the remote half (their sending direction) if `epoch`
    /// still matches, reaping the entry if that leaves both halves closed.
    pub fn close_remote_half(&mut self, stream_id: u32, epoch: u64) {
        if let Some(entry) = self.entries.get_mut(&stream_id) {
            if entry.epoch == epoch {
                entry.remote_half = Half::Closed;
            }
        }
        self.reap_if_terminated(stream_id);
    }

    /// Removes a stream outright (ERROR/CANCEL are unconditionally terminal),
    /// provided `epoch` still matches — a stale handle is a no-op.
    pub fn remove(&mut self, stream_id: u32, epoch: u64) {
        if self.epoch_matches(stream_id, epoch) {
            self.entries.remove(&stream_id);
        }
    }

    pub fn get(&self, stream_id: u32) -> Option<&StreamEntry> {
        self.entries.get(&stream_id)
    }

    pub fn get_mut(&mut self, stream_id: u32) -> Option<&mut StreamEntry> {
        self.entries.get_mut(&stream_id)
    }

    pub fn epoch_matches(&self, stream_id: u32, epoch: u64) -> bool {
        self.entries
            .get(&stream_id)
            .map_or(false, |e| e.epoch == epoch)
    }

    fn reap_if_terminated(&mut self, stream_id: u32) {
        let done = self
            .entries
            .get(&stream_id)
            .map_or(false, |e| e.is_terminated());
        if done {
            self.entries.remove(&stream_id);
        }
    }

    /// Routes one already-demuxed frame addressed to `stream_id` through
    /// fragmentation reassembly (if applicable) and the per-kind state
    /// machine, reaping the entry afterward if both halves closed.
    pub fn route_inbound(&mut self, stream_id: u32, frame: Frame) -> RouteOutcome {
        if !self.entries.contains_key(&stream_id) {
            return RouteOutcome::NotFound(frame);
        }
        let follows = frame.has_follows();
        let event = Incoming::from_frame(frame);

        let entry = self.entries.get_mut(&stream_id).unwrap();
        let ready = accumulate(entry, follows, event);

        let outgoing = match ready {
            Some(event) => streams::dispatch_inbound(stream_id, entry, event),
            None => Vec::new(),
        };

        self.reap_if_terminated(stream_id);
        RouteOutcome::Handled(outgoing)
    }

    /// Removes every stream unconditionally (used on connection close: every
    /// live stream gets a synthetic error and is discarded by the caller).
    pub fn drain(&mut self) -> Vec<(u32, StreamEntry)> {
        self.entries.drain().collect()
    }
}

/// Buffers `event` into `entry.fragment` while `follows` is set; returns the
/// fully reassembled event once a non-`FOLLOWS` frame completes the
/// sequence (or immediately, for non-fragmentable events).
fn accumulate(entry: &mut StreamEntry, follows: bool, event: Incoming) -> Option<Incoming> {
    let (incoming_payload, has_next, has_complete) = match event {
        Incoming::Payload {
            payload,
            has_next,
            has_complete,
        } => (payload, has_next, has_complete),
        other => return Some(other),
    };

    let combined = match entry.fragment.take() {
        Some(mut assembly) => {
            assembly.payload.append_fragment(incoming_payload);
            assembly.payload
        }
        None => incoming_payload,
    };

    if follows {
        entry.fragment = Some(FragmentAssembly { payload: combined });
        None
    } else {
        Some(Incoming::Payload {
            payload: combined,
            has_next,
            has_complete,
        })
    }
}
