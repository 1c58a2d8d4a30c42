//! Request sequencing and cancellation
//!
//! Every cycle draws a monotonically increasing [`Generation`]. Starting a
//! new cycle invalidates all older ones: an in-flight exchange is abandoned
//! and a late response is discarded. Closing the sequencer (viewer teardown)
//! invalidates everything.

use tokio::sync::watch;

/// Monotonic request sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signal {
    latest: Generation,
    closed: bool,
}

/// Why a ticket stopped being current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// A newer cycle started
    Superseded { latest: Generation },
    /// The sequencer was closed
    Closed,
}

/// Issues generations and broadcasts invalidation
#[derive(Debug)]
pub struct Sequencer {
    tx: watch::Sender<Signal>,
}

impl Sequencer {
    /// Create an open sequencer; the first ticket is generation 1
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Signal {
            latest: Generation(0),
            closed: false,
        });
        Self { tx }
    }

    /// Issue the next generation, invalidating all earlier tickets
    ///
    /// Returns `None` once closed.
    pub fn issue(&self) -> Option<Ticket> {
        let mut issued = None;
        self.tx.send_if_modified(|signal| {
            if signal.closed {
                return false;
            }
            signal.latest = Generation(signal.latest.0 + 1);
            issued = Some(signal.latest);
            true
        });
        let generation = issued?;
        Some(Ticket {
            generation,
            rx: self.tx.subscribe(),
        })
    }

    /// Most recently issued generation
    #[must_use]
    pub fn latest(&self) -> Generation {
        self.tx.borrow().latest
    }

    /// Whether `generation` is the latest and the sequencer is open
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        let signal = *self.tx.borrow();
        !signal.closed && signal.latest == generation
    }

    /// Whether the sequencer was closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.borrow().closed
    }

    /// Invalidate every ticket and refuse new ones; idempotent
    pub fn close(&self) {
        self.tx.send_if_modified(|signal| {
            let changed = !signal.closed;
            signal.closed = true;
            changed
        });
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// A cycle's claim on one generation
#[derive(Debug)]
pub struct Ticket {
    generation: Generation,
    rx: watch::Receiver<Signal>,
}

impl Ticket {
    /// Generation this ticket was issued for
    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Resolve once this ticket is no longer current
    pub async fn invalidated(&mut self) -> Invalidation {
        loop {
            let signal = *self.rx.borrow_and_update();
            if signal.closed {
                return Invalidation::Closed;
            }
            if signal.latest != self.generation {
                return Invalidation::Superseded {
                    latest: signal.latest,
                };
            }
            if self.rx.changed().await.is_err() {
                return Invalidation::Closed;
            }
        }
    }
}
