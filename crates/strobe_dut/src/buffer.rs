//! Byte-lane storage shared by the input and output sides of a model.

use std::collections::VecDeque;

/// One stored byte with the framing and tags of the word it arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Lane {
    byte: u8,
    last: bool,
    tdest: u64,
    tuser: u64,
}

/// A word ready to present on the output bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OutWord {
    pub bytes: Vec<u8>,
    pub last: bool,
    pub tdest: u64,
    pub tuser: u64,
    /// Stored lanes the word consumes when accepted.
    pub lanes: usize,
}

/// Bounded queue of byte lanes, filled a whole input word at a time and
/// drained a whole output word at a time.
#[derive(Debug)]
pub(crate) struct LaneBuffer {
    lanes: VecDeque<Lane>,
    capacity: usize,
    in_width: usize,
    out_width: usize,
}

impl LaneBuffer {
    pub fn new(capacity: usize, in_width: u32, out_width: u32) -> Self {
        Self {
            lanes: VecDeque::with_capacity(capacity),
            capacity,
            in_width: in_width as usize,
            out_width: out_width as usize,
        }
    }

    /// True if a whole input word fits.
    pub fn can_accept(&self) -> bool {
        self.capacity - self.lanes.len() >= self.in_width
    }

    pub fn push_word(&mut self, bytes: &[u8], last: bool, tdest: u64, tuser: u64) {
        let count = bytes.len();
        self.lanes.extend(bytes.iter().enumerate().map(|(i, &byte)| Lane {
            byte,
            last: last && i + 1 == count,
            tdest,
            tuser,
        }));
    }

    /// Returns the head output word once it is complete: a full word, or a
    /// shorter run ending on the last byte of a frame (zero-padded).
    pub fn head_word(&self) -> Option<OutWord> {
        let first = self.lanes.front()?;
        let mut bytes = Vec::with_capacity(self.out_width);
        let mut last = false;
        for lane in self.lanes.iter().take(self.out_width) {
            bytes.push(lane.byte);
            if lane.last {
                last = true;
                break;
            }
        }
        if !last && bytes.len() < self.out_width {
            return None;
        }
        let lanes = bytes.len();
        bytes.resize(self.out_width, 0);
        Some(OutWord {
            bytes,
            last,
            tdest: first.tdest,
            tuser: first.tuser,
            lanes,
        })
    }

    pub fn pop(&mut self, lanes: usize) {
        self.lanes.drain(..lanes.min(self.lanes.len()));
    }

    /// Occupancy in input words, rounded up.
    pub fn occupancy(&self) -> u64 {
        self.lanes.len().div_ceil(self.in_width) as u64
    }

    pub fn clear(&mut self) {
        self.lanes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}
