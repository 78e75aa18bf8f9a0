//! Event scheduler contract and the queue used by the scenario runner.
//!
//! Channel models never consume events; they only produce them through the
//! [`EventSink`] trait, fire-and-forget. The binary-heap [`EventQueue`] is
//! the concrete sink the runner drains in time order; tests use a plain
//! `Vec<ScheduledEvent>`, which also implements the trait, to record what a
//! model scheduled.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::types::{NetworkMessage, NodeId, SimNanos};

/// Event kinds the channel layer produces. Receive and interference events
/// always come in start/end pairs; the end time strictly follows the start
/// time by the message's transmission duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEventKind {
    ReceiveStart,
    ReceiveEnd,
    InterferenceStart,
    InterferenceEnd,
}

/// A scheduled future event targeted at one node.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub time: SimNanos,
    pub kind: NetworkEventKind,
    pub target: NodeId,
    pub message: NetworkMessage,
}

/// Sink for events produced by a channel model.
///
/// Once scheduled, an event cannot be retracted: a transmission computed as
/// successful stays successful even if the sender is destroyed before the
/// receive time. Consumers of receive events have to tolerate that.
pub trait EventSink {
    fn schedule(&mut self, time: SimNanos, kind: NetworkEventKind, target: NodeId, message: NetworkMessage);
}

/// Recording sink: appends events in scheduling order. Used by tests to
/// inspect exactly what a model produced.
impl EventSink for Vec<ScheduledEvent> {
    fn schedule(&mut self, time: SimNanos, kind: NetworkEventKind, target: NodeId, message: NetworkMessage) {
        self.push(ScheduledEvent { time, kind, target, message });
    }
}

/// Key ordering the heap: by time, ties broken by insertion sequence so
/// that events scheduled first at the same timestamp also drain first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    time: SimNanos,
    seq: u64,
}

struct QueueEntry {
    key: QueueKey,
    event: ScheduledEvent,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Time-ordered event queue backed by a binary heap.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    /// Remove and return the earliest scheduled event.
    pub fn pop_next(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop().map(|Reverse(entry)| entry.event)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl EventSink for EventQueue {
    fn schedule(&mut self, time: SimNanos, kind: NetworkEventKind, target: NodeId, message: NetworkMessage) {
        let key = QueueKey { time, seq: self.next_seq };
        self.next_seq += 1;
        self.heap.push(Reverse(QueueEntry {
            key,
            event: ScheduledEvent { time, kind, target, message },
        }));
    }
}
