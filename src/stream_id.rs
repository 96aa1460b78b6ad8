//! Stream-id allocation (spec §3 StreamID, §4.4).
//!
//! Client ids are odd, server ids are even; both start their counter at the
//! first value of the right parity and step by two. Allocation skips ids
//! still present in the registry (can happen if there's a long-lived low
//! numbered stream and the counter wrapped once already) and refuses once
//! the 31-bit space is exhausted.

use std::collections::HashSet;

use crate::error::{RSocketError, RSocketResult};
use crate::frame::REQUEST_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

pub struct StreamIdGenerator {
    next: u32,
    role: Role,
}

impl StreamIdGenerator {
    pub fn new(role: Role) -> StreamIdGenerator {
        StreamIdGenerator {
            next: match role {
                Role::Client => 1,
                Role::Server => 2,
            },
            role,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// True for the ids this role is allowed to mint (used to parity-check
    /// ids observed on the wire from the peer).
    pub fn is_own_parity(&self, id: u32) -> bool {
        match self.role {
            Role::Client => id % 2 == 1,
            Role::Server => id % 2 == 0,
        }
    }

    pub fn next(&mut self, in_use: &HashSet<u32>) -> RSocketResult<u32> {
        loop {
            if self.next > REQUEST_MAX {
                return Err(RSocketError::Other(
                    "stream id space exhausted".to_owned(),
                ));
            }
            let candidate = self.next;
            self.next = self.next.saturating_add(2);
            if !in_use.contains(&candidate) {
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_odd() {
        let mut gen = StreamIdGenerator::new(Role::Client);
        let in_use = HashSet::new();
        assert_eq!(gen.next(&in_use).unwrap(), 1);
        assert_eq!(gen.next(&in_use).unwrap(), 3);
        assert_eq!(gen.next(&in_use).unwrap(), 5);
    }

    #[test]
    fn server_ids_are_even() {
        let mut gen = StreamIdGenerator::new(Role::Server);
        let in_use = HashSet::new();
        assert_eq!(gen.next(&in_use).unwrap(), 2);
        assert_eq!(gen.next(&in_use).unwrap(), 4);
    }

    #[test]
    fn skips_ids_still_in_use() {
        let mut gen = StreamIdGenerator::new(Role::Client);
        let mut in_use = HashSet::new();
        in_use.insert(3u32);
        assert_eq!(gen.next(&in_use).unwrap(), 1);
        assert_eq!(gen.next(&in_use).unwrap(), 5);
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut gen = StreamIdGenerator {
            next: REQUEST_MAX,
            role: Role::Client,
        };
        let in_use = HashSet::new();
        assert!(gen.next(&in_use).is_ok());
        assert!(gen.next(&in_use).is_err());
    }
}
