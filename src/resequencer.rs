//! Resequencing strategies that reconstruct a monotonic sequence from an
//! unordered stream of [`Event`]s.
//!
//! Both strategies share the same contract: [`Resequencer::accept`] takes
//! one incoming event and may push zero or more ordered events to `out`;
//! [`Resequencer::flush`] drains whatever remains buffered, in ascending
//! order, and always empties the buffer.

use std::collections::HashMap;

use crate::event::Event;

pub trait Resequencer: Send {
    /// Accept an incoming event, possibly emitting one or more ordered
    /// events to `out`.
    fn accept(&mut self, event: Event, out: &mut Vec<Event>);

    /// Emit any remaining buffered events in ascending order and empty the
    /// buffer. Safe to call more than once; a second call is a no-op.
    fn flush(&mut self, out: &mut Vec<Event>);
}

/// Buffers events until `capacity` have accumulated, then sorts and emits
/// the whole batch at once.
///
/// Strictly FIFO across batches: the relation between an event emitted late
/// in one batch and one emitted early in the next is not globally
/// monotonic. This only behaves correctly when the upstream's jitter window
/// is smaller than `capacity`.
pub struct BatchResequencer {
    capacity: usize,
    buffer: Vec<Event>,
}

impl BatchResequencer {
    pub fn new(capacity: usize) -> Self {
        BatchResequencer {
            capacity,
            buffer: Vec::with_capacity(capacity),
        }
    }
}

impl Resequencer for BatchResequencer {
    fn accept(&mut self, event: Event, out: &mut Vec<Event>) {
        self.buffer.push(event);

        if self.buffer.len() == self.capacity {
            self.buffer.sort();
            out.append(&mut self.buffer);
        }
    }

    fn flush(&mut self, out: &mut Vec<Event>) {
        if self.buffer.is_empty() {
            return;
        }

        self.buffer.sort();
        out.append(&mut self.buffer);
    }
}

/// Holds incoming events keyed by sequence number and releases the longest
/// contiguous run starting at `last_emitted + 1` as soon as it forms.
///
/// Between calls to `accept`, the buffer never holds a key `<= last_emitted`:
/// every contiguous run is drained immediately.
pub struct StreamResequencer {
    buffer: HashMap<u64, Event>,
    last_emitted: u64,
}

impl StreamResequencer {
    pub fn new(start_index: u64) -> Self {
        StreamResequencer {
            buffer: HashMap::new(),
            last_emitted: start_index,
        }
    }
}

impl Resequencer for StreamResequencer {
    fn accept(&mut self, event: Event, out: &mut Vec<Event>) {
        // Last-write-wins: the source is expected not to duplicate
        // sequences, but a replacement is tolerated rather than rejected.
        self.buffer.insert(event.sequence(), event);

        while let Some(next) = self.buffer.remove(&(self.last_emitted + 1)) {
            self.last_emitted += 1;
            out.push(next);
        }
    }

    fn flush(&mut self, out: &mut Vec<Event>) {
        if self.buffer.is_empty() {
            return;
        }

        let mut remaining: Vec<Event> = self.buffer.drain().map(|(_, e)| e).collect();
        remaining.sort();
        out.append(&mut remaining);
    }
}

/// Build the resequencer named by `kind`, case-insensitively matching
/// `"batch"` or `"stream"`; anything else defaults to the stream
/// resequencer.
pub fn new_resequencer(kind: &str, capacity: usize, start_index: u64) -> Box<dyn Resequencer> {
    match kind.to_lowercase().as_str() {
        "batch" => Box::new(BatchResequencer::new(capacity)),
        _ => Box::new(StreamResequencer::new(start_index)),
    }
}
