use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::warn;

use crate::callstack::CallStack;

// EVENT TRANSPORT
// ================================================================================================

/// Bounded, lock-free channel carrying completed [`CallStack`] snapshots from the probe side to
/// the user-space consumer (SPEC_FULL.md §4.4).
///
/// One [`Transport`] is shared by every CPU; each holds only the cheap [`Sender`] half, so
/// sending never blocks the probe-side hot path. When the bound is hit the oldest-style channel
/// here simply drops the newest record and counts it, matching "never block the kernel side".
pub struct Transport {
    tx: Sender<Box<CallStack>>,
    rx: Receiver<Box<CallStack>>,
}

impl Transport {
    /// `capacity` is the number of completed stacks the channel can hold before the consumer
    /// falls behind and records start being dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// A cheap, cloneable handle for one CPU's probe-side engine to push completed stacks with.
    pub fn sender(&self) -> TransportSender {
        TransportSender { tx: self.tx.clone(), dropped: 0 }
    }

    /// Blocks the calling (consumer) thread until a record is available or every sender has been
    /// dropped, in which case `None` is returned.
    pub fn recv(&self) -> Option<Box<CallStack>> {
        self.rx.recv().ok()
    }

    /// Non-blocking drain, for consumers that poll on a timeout or alongside other work.
    pub fn try_recv(&self) -> Option<Box<CallStack>> {
        self.rx.try_recv().ok()
    }
}

/// Per-CPU handle used to push a completed [`CallStack`] onto the shared [`Transport`].
///
/// Kept separate from [`Transport`] so each CPU's engine can own one without sharing mutable
/// state with any other CPU.
pub struct TransportSender {
    tx: Sender<Box<CallStack>>,
    /// Running count of records dropped because the channel was full, surfaced at shutdown
    /// (SPEC_FULL.md §5 "Backpressure").
    pub dropped: u64,
}

impl TransportSender {
    /// Attempts to hand off a completed stack. Never blocks: on a full channel the record is
    /// dropped and `dropped` is incremented instead.
    pub fn send(&mut self, record: Box<CallStack>) {
        match self.tx.try_send(record) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                warn!(total_dropped = self.dropped, "event transport full, dropping record");
            },
            Err(TrySendError::Disconnected(_)) => {
                warn!("event transport receiver gone, dropping record");
            },
        }
    }
}
