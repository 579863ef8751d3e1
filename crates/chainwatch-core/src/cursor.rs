//! Poll cursor: the next block number that has not been scanned yet.

use serde::{Deserialize, Serialize};

/// The poller's position in the chain.
///
/// Only moves forward: an attempt to advance to a lower block is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    next_block: u64,
}

impl Cursor {
    /// Create a cursor whose first scan starts at `next_block`.
    pub fn new(next_block: u64) -> Self {
        Self { next_block }
    }

    /// The next block to scan (inclusive lower bound of the next fetch).
    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Mark every block up to and including `head` as scanned.
    ///
    /// Returns `true` if the cursor moved.
    pub fn advance_past(&mut self, head: u64) -> bool {
        let next = head.saturating_add(1);
        if next > self.next_block {
            self.next_block = next;
            true
        } else {
            false
        }
    }

    /// The inclusive range still to scan given the current `head`,
    /// or `None` if the cursor is already past it.
    pub fn pending_range(&self, head: u64) -> Option<(u64, u64)> {
        (head >= self.next_block).then_some((self.next_block, head))
    }
}
