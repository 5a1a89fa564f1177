//! Typing indicator debounce for the duochat runtime
//!
//! Each sender is either Idle or Typing towards one recipient. A Typing entry
//! carries a countdown; when it runs out the sender returns to Idle and a
//! synthetic cleared indicator is handed to the `TypingSink`.
//!
//! Countdowns are tokens made of a generation number and a task handle. Every
//! re-arm installs a new generation and aborts the previous task, and an expiring
//! task only clears the entry if its generation still matches. A timer racing a
//! send or a disconnect for the same sender therefore resolves on the map entry
//! lock: whichever removes the entry first wins and the other finds nothing.
//!
//! The sink is called with the sender's entry locked, both for inbound
//! indicators and for synthetic clears, so a stale clear can never overtake a
//! newer indicator on its way to the recipient.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use duochat_core::{TypingConfig, TypingNotice, UserId};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

// ----------------------------------------------------------------------------
// Sink
// ----------------------------------------------------------------------------

/// Receives every indicator the coordinator lets through
///
/// Implementations must not call back into the coordinator.
pub trait TypingSink: Send + Sync + 'static {
    /// An inbound indicator, explicit clears included
    fn typing_forwarded(&self, notice: &TypingNotice);

    /// Synthetic clear after a countdown ran out
    fn typing_expired(&self, notice: TypingNotice);
}

// ----------------------------------------------------------------------------
// Typing Coordinator
// ----------------------------------------------------------------------------

struct TypingSlot {
    to: UserId,
    text: String,
    expires_at: Instant,
    generation: u64,
    timer: JoinHandle<()>,
}

/// Per-sender typing state machine
pub struct TypingCoordinator {
    slots: Arc<DashMap<UserId, TypingSlot>>,
    window: Duration,
    generation: AtomicU64,
    sink: Arc<dyn TypingSink>,
    stats: TypingCounters,
}

impl TypingCoordinator {
    pub fn new(config: &TypingConfig, sink: Arc<dyn TypingSink>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            window: config.inactivity_window(),
            generation: AtomicU64::new(0),
            sink,
            stats: TypingCounters::default(),
        }
    }

    /// Record a typing event, hand it to the sink and (re)arm the countdown
    ///
    /// An empty text is an explicit clear: the sender goes Idle and no
    /// synthetic clear follows.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_typing(&self, notice: &TypingNotice) -> TypingTransition {
        // Held until the state change is in place
        let entry = self.slots.entry(notice.from.clone());
        self.sink.typing_forwarded(notice);

        if notice.is_clear() {
            let was_typing = match entry {
                Entry::Occupied(occupied) => {
                    let (_, slot) = occupied.remove_entry();
                    slot.timer.abort();
                    self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Entry::Vacant(_) => false,
            };
            return TypingTransition::Cleared { was_typing };
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let expires_at = Instant::now() + self.window;
        // Spawned under the entry lock so the timer cannot observe the map
        // before its own slot is in place
        let timer = self.arm(notice.from.clone(), generation, expires_at);
        let slot = TypingSlot {
            to: notice.to.clone(),
            text: notice.text.clone(),
            expires_at,
            generation,
            timer,
        };

        let replaced = match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(slot);
                previous.timer.abort();
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                false
            }
        };

        self.stats.armed.fetch_add(1, Ordering::Relaxed);
        trace!(from = %notice.from, to = %notice.to, generation, "typing countdown armed");
        TypingTransition::Typing { replaced }
    }

    /// A message from `from` to `to` supersedes the indicator
    pub fn on_send_completes(&self, from: &UserId, to: &UserId) -> bool {
        match self.slots.remove_if(from, |_, slot| &slot.to == to) {
            Some((_, slot)) => {
                slot.timer.abort();
                self.stats.superseded.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// The sender's session went away
    pub fn on_disconnect(&self, identity: &UserId) -> bool {
        self.cancel(identity)
    }

    /// Current state for `from`, `None` when Idle
    pub fn state_of(&self, from: &UserId) -> Option<TypingState> {
        self.slots.get(from).map(|slot| TypingState {
            from: from.clone(),
            to: slot.to.clone(),
            text: slot.text.clone(),
            expires_at: slot.expires_at,
        })
    }

    /// Number of senders currently Typing
    pub fn active_count(&self) -> usize {
        self.slots.len()
    }

    pub fn statistics(&self) -> TypingStatistics {
        TypingStatistics {
            armed: self.stats.armed.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
            superseded: self.stats.superseded.load(Ordering::Relaxed),
            cancelled: self.stats.cancelled.load(Ordering::Relaxed),
        }
    }

    fn cancel(&self, identity: &UserId) -> bool {
        match self.slots.remove(identity) {
            Some((_, slot)) => {
                slot.timer.abort();
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn arm(&self, from: UserId, generation: u64, deadline: Instant) -> JoinHandle<()> {
        let slots = Arc::clone(&self.slots);
        let sink = Arc::clone(&self.sink);
        let expired = Arc::clone(&self.stats.expired);

        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let Entry::Occupied(occupied) = slots.entry(from.clone()) else {
                // Sent or disconnected first
                return;
            };
            if occupied.get().generation != generation {
                // Re-armed
                return;
            }

            let to = occupied.get().to.clone();
            expired.fetch_add(1, Ordering::Relaxed);
            debug!(from = %from, to = %to, "typing indicator expired");
            sink.typing_expired(TypingNotice::cleared(from, to));
            occupied.remove();
        })
    }
}

impl Drop for TypingCoordinator {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            slot.timer.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Result of feeding a typing event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingTransition {
    /// Sender is Typing; `replaced` when an earlier countdown was cancelled
    Typing { replaced: bool },
    /// Sender is Idle after an explicit clear
    Cleared { was_typing: bool },
}

/// Snapshot of one sender's Typing state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingState {
    pub from: UserId,
    pub to: UserId,
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
struct TypingCounters {
    armed: AtomicU64,
    expired: Arc<AtomicU64>,
    superseded: AtomicU64,
    cancelled: AtomicU64,
}

/// Counters describing typing activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypingStatistics {
    /// Countdowns armed or re-armed
    pub armed: u64,
    /// Countdowns that ran out and emitted a synthetic clear
    pub expired: u64,
    /// Indicators ended by a message send
    pub superseded: u64,
    /// Indicators ended by an explicit clear or a disconnect
    pub cancelled: u64,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
