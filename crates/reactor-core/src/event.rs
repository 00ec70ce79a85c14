//! Typed reactor events with pre-allocated ring buffers.
//!
//! Events are emitted by player actions and by the resolution routine, then
//! delivered in batch to passive listeners at the end of each tick (or on
//! demand via [`EventBus::deliver`]). Each event kind has its own
//! [`EventBuffer`] with a configurable capacity.
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::component::ComponentId;
use crate::grid::GridPosition;

/// Ticks are counted from engine creation.
pub type Ticks = u64;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A reactor event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ComponentPlaced {
        position: GridPosition,
        component: ComponentId,
        tick: Ticks,
    },
    ComponentCleared {
        position: GridPosition,
        component: ComponentId,
        refund: f64,
        tick: Ticks,
    },
    ComponentDepleted {
        position: GridPosition,
        component: ComponentId,
        replaced: bool,
        tick: Ticks,
    },
    ComponentExploded {
        position: GridPosition,
        component: ComponentId,
        heat: f64,
        tick: Ticks,
    },
    ParticlesGenerated {
        position: GridPosition,
        amount: f64,
        tick: Ticks,
    },
    PowerSold {
        amount: f64,
        tick: Ticks,
    },
    Meltdown {
        heat: f64,
        tick: Ticks,
    },
    MeltdownRecovered {
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ComponentPlaced,
    ComponentCleared,
    ComponentDepleted,
    ComponentExploded,
    ParticlesGenerated,
    PowerSold,
    Meltdown,
    MeltdownRecovered,
}

const EVENT_KIND_COUNT: usize = 8;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ComponentPlaced { .. } => EventKind::ComponentPlaced,
            Event::ComponentCleared { .. } => EventKind::ComponentCleared,
            Event::ComponentDepleted { .. } => EventKind::ComponentDepleted,
            Event::ComponentExploded { .. } => EventKind::ComponentExploded,
            Event::ParticlesGenerated { .. } => EventKind::ParticlesGenerated,
            Event::PowerSold { .. } => EventKind::PowerSold,
            Event::Meltdown { .. } => EventKind::Meltdown,
            Event::MeltdownRecovered { .. } => EventKind::MeltdownRecovered,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer. When full, the oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position.
    head: usize,
    len: usize,
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Events written since creation, including dropped ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events lost to overwrites.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// One ring buffer per event kind, passive listeners, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppressed kinds are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op for suppressed kinds.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a passive listener, called in registration order on delivery.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Buffered events of one kind, oldest first.
    pub fn events(&self, kind: EventKind) -> Vec<&Event> {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.iter().collect())
            .unwrap_or_default()
    }

    /// Number of buffered events of one kind.
    pub fn count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()].as_ref().map_or(0, |b| b.len())
    }

    /// Deliver every buffered event to its listeners, then clear the buffers.
    /// Kinds without listeners keep their events for polling.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] || self.listeners[idx].is_empty() {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.iter().cloned().collect();
            buffer.clear();
            for event in &events {
                for listener in &mut self.listeners[idx] {
                    listener(event);
                }
            }
        }
    }
}
