//! Deterministic event queue driving simulated time.
//!
//! Events are ordered by `(time, kind priority, insertion sequence)`. When
//! several events share a timestamp, completions that hand resources back
//! are applied before the re-evaluation trigger, and the sequence number
//! settles any remaining tie in insertion order.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

/// What happens when an event fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A running mission finished.
    MissionComplete {
        /// Name of the mission.
        mission: String,
    },
    /// The building queue finished its upgrade.
    BuildingComplete,
    /// The research queue finished its technology.
    ResearchComplete,
    /// The training queue finished its unit.
    TrainingComplete,
    /// Re-evaluate every idle queue.
    StateChanged,
}

impl EventKind {
    /// Ordering priority among events at the same time, lowest first.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::MissionComplete { .. } => 0,
            Self::BuildingComplete => 1,
            Self::ResearchComplete => 2,
            Self::TrainingComplete => 3,
            Self::StateChanged => 10,
        }
    }
}

/// An event with its position in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Simulated time in seconds.
    pub time: u64,
    /// Event payload.
    pub kind: EventKind,
    /// Insertion sequence, unique within one queue.
    pub seq: u64,
}

impl ScheduledEvent {
    fn key(&self) -> (u64, u8, u64) {
        (self.time, self.kind.priority(), self.seq)
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-priority queue of scheduled events.
///
/// The insertion counter belongs to the queue, so two queues fed the same
/// pushes always pop in the same order.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
    /// Times at which a state-changed event is pending.
    state_changed_at: BTreeSet<u64>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event.
    pub fn push(&mut self, time: u64, kind: EventKind) {
        if kind == EventKind::StateChanged {
            self.state_changed_at.insert(time);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledEvent { time, kind, seq }));
    }

    /// Schedule a state-changed event unless one is already pending at `time`.
    ///
    /// Returns whether an event was added.
    pub fn push_state_changed_if_absent(&mut self, time: u64) -> bool {
        if self.state_changed_at.contains(&time) {
            return false;
        }
        self.push(time, EventKind::StateChanged);
        true
    }

    /// Remove and return the earliest event, or `None` when empty.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        let Reverse(event) = self.heap.pop()?;
        if event.kind == EventKind::StateChanged {
            self.state_changed_at.remove(&event.time);
        }
        Some(event)
    }

    /// The earliest event without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.heap.peek().map(|Reverse(e)| e)
    }

    /// Drop every pending event. The sequence counter keeps counting.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.state_changed_at.clear();
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pending events in pop order, for inspection.
    #[must_use]
    pub fn sorted(&self) -> Vec<&ScheduledEvent> {
        let mut events: Vec<&ScheduledEvent> = self.heap.iter().map(|Reverse(e)| e).collect();
        events.sort();
        events
    }
}
