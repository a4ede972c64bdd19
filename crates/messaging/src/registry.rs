//! Correlation registry: outstanding requests keyed by correlation id.
//!
//! # Lifecycle of a pending wait
//!
//! ```text
//!             deliver (before deadline)
//!   Created ─────────────────────────────▶ Delivered ─┐
//!      │                                              │ release
//!      │ deadline passes                              ▼
//!      └─────────────────────────────────▶ Expired ──▶ Released
//! ```
//!
//! - [`CorrelationRegistry::create_wait`] inserts a `Created` entry and hands
//!   back a [`WaitHandle`]; the registry owns the entry, the caller only
//!   holds the handle.
//! - [`CorrelationRegistry::deliver`] is called from the receive path. It
//!   looks up the entry for the packet's correlation id and, if it is still
//!   `Created`, moves the packet into the entry's one-shot channel.
//! - [`WaitHandle::wait`] resolves with the packet, or marks the entry
//!   `Expired` at the deadline and returns [`MessagingError::Timeout`].
//! - Releasing removes the entry whatever its state. It is idempotent, and
//!   dropping the handle releases too, so cancelled futures cannot leak
//!   entries.
//!
//! # Concurrency
//!
//! The map is a [`DashMap`]: every insert, lookup and remove takes the
//! shard lock. No lock is held while signalling the waiter. Each entry also
//! carries a sequence number so a stale handle never releases a newer wait
//! that reuses the same id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use corelib::Packet;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{MessagingError, Result};

/// Deadline used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// State of one pending wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitState {
    /// Registered, no reply yet.
    Created,
    /// A matching packet arrived before the deadline.
    Delivered,
    /// The deadline passed without a match.
    Expired,
    /// Removed from the registry. Terminal.
    Released,
}

/// Registry-owned record of one outstanding request.
#[derive(Debug)]
struct PendingWait {
    seq: u64,
    deadline: Instant,
    state: WaitState,
    signal: Option<oneshot::Sender<Packet>>,
}

#[derive(Debug, Default)]
struct Inner {
    waits: DashMap<String, PendingWait>,
    next_seq: AtomicU64,
}

/// Process-wide table of outstanding requests.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct CorrelationRegistry {
    inner: Arc<Inner>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wait for `correlation_id` expiring `timeout` from now.
    ///
    /// # Errors
    ///
    /// [`MessagingError::DuplicateCorrelationId`] if a wait for the same id
    /// has not been released yet.
    pub fn create_wait(
        &self,
        correlation_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<WaitHandle> {
        let correlation_id = correlation_id.into();
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE);

        match self.inner.waits.entry(correlation_id.clone()) {
            Entry::Occupied(_) => {
                debug!(%correlation_id, "rejecting duplicate correlation id");
                Err(MessagingError::DuplicateCorrelationId(correlation_id))
            }
            Entry::Vacant(slot) => {
                let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
                let (signal, receiver) = oneshot::channel();
                slot.insert(PendingWait {
                    seq,
                    deadline,
                    state: WaitState::Created,
                    signal: Some(signal),
                });
                trace!(%correlation_id, seq, ?timeout, "wait created");
                Ok(WaitHandle {
                    registry: self.clone(),
                    correlation_id,
                    seq,
                    deadline,
                    timeout,
                    receiver: Some(receiver),
                })
            }
        }
    }

    /// Offer an inbound packet to the wait with the same correlation id.
    ///
    /// Returns `true` if a `Created` wait took the packet. Every other case
    /// (no entry, already delivered, expired, released, waiter gone) is a
    /// silent no-op returning `false`.
    pub fn deliver(&self, packet: Packet) -> bool {
        let correlation_id = packet.correlation_id().to_string();
        let Some(mut wait) = self.inner.waits.get_mut(&correlation_id) else {
            trace!(%correlation_id, "no wait for packet");
            return false;
        };
        if wait.state != WaitState::Created {
            trace!(%correlation_id, state = ?wait.state, "wait no longer accepts packets");
            return false;
        }
        if Instant::now() >= wait.deadline {
            wait.state = WaitState::Expired;
            wait.signal = None;
            return false;
        }
        let Some(signal) = wait.signal.take() else {
            return false;
        };

        // Signal under the shard lock: the state flip and the send are one
        // step as seen by `expire`. A oneshot send never blocks.
        let kind = packet.kind();
        match signal.send(packet) {
            Ok(()) => {
                wait.state = WaitState::Delivered;
                drop(wait);
                debug!(%correlation_id, %kind, "reply delivered");
                true
            }
            Err(_) => {
                drop(wait);
                trace!(%correlation_id, "waiter dropped before delivery");
                false
            }
        }
    }

    /// Remove the wait behind `handle`, whatever its state.
    pub fn release(&self, handle: &WaitHandle) {
        self.remove(&handle.correlation_id, handle.seq);
    }

    fn remove(&self, correlation_id: &str, seq: u64) {
        if self
            .inner
            .waits
            .remove_if(correlation_id, |_, wait| wait.seq == seq)
            .is_some()
        {
            trace!(%correlation_id, seq, "wait released");
        }
    }

    /// Mark the wait `Expired` if nothing was delivered. Returns the state
    /// the entry ended up in.
    fn expire(&self, correlation_id: &str, seq: u64) -> WaitState {
        match self.inner.waits.get_mut(correlation_id) {
            Some(mut wait) if wait.seq == seq => {
                if wait.state == WaitState::Created {
                    wait.state = WaitState::Expired;
                    wait.signal = None;
                }
                wait.state
            }
            _ => WaitState::Released,
        }
    }

    fn state_of(&self, correlation_id: &str, seq: u64) -> WaitState {
        match self.inner.waits.get(correlation_id) {
            Some(wait) if wait.seq == seq => wait.state,
            _ => WaitState::Released,
        }
    }

    /// State of the wait registered under `correlation_id`, if any.
    pub fn state(&self, correlation_id: &str) -> Option<WaitState> {
        self.inner.waits.get(correlation_id).map(|wait| wait.state)
    }

    pub fn contains(&self, correlation_id: &str) -> bool {
        self.inner.waits.contains_key(correlation_id)
    }

    /// Number of entries not yet released.
    pub fn len(&self) -> usize {
        self.inner.waits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.waits.is_empty()
    }

    /// Drop every entry whose deadline has passed. Returns how many went.
    ///
    /// Only needed for handles that are leaked without being dropped; normal
    /// callers release on their own.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.waits.len();
        self.inner.waits.retain(|_, wait| wait.deadline > now);
        let purged = before.saturating_sub(self.inner.waits.len());
        if purged > 0 {
            debug!(purged, "purged expired waits");
        }
        purged
    }
}

/// Caller's handle on a pending wait.
///
/// Dropping the handle releases the wait.
#[derive(Debug)]
pub struct WaitHandle {
    registry: CorrelationRegistry,
    correlation_id: String,
    seq: u64,
    deadline: Instant,
    timeout: Duration,
    receiver: Option<oneshot::Receiver<Packet>>,
}

impl WaitHandle {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Current state of this wait as seen by the registry.
    pub fn state(&self) -> WaitState {
        self.registry.state_of(&self.correlation_id, self.seq)
    }

    /// Block until the reply arrives or the deadline passes.
    ///
    /// A handle can be waited on once; later calls report a timeout.
    ///
    /// # Errors
    ///
    /// [`MessagingError::Timeout`] if no packet was delivered in time.
    pub async fn wait(&mut self) -> Result<Packet> {
        let Some(mut receiver) = self.receiver.take() else {
            return Err(self.timeout_error());
        };

        match tokio::time::timeout_at(self.deadline, &mut receiver).await {
            Ok(Ok(packet)) => Ok(packet),
            // Sender dropped without a packet: the entry expired or was purged.
            Ok(Err(_)) => Err(self.timeout_error()),
            Err(_) => {
                // A delivery can land between the timer firing and the entry
                // being marked expired; take it if so. The sender is gone from
                // the entry by then, so this resolves without blocking.
                match self.registry.expire(&self.correlation_id, self.seq) {
                    WaitState::Delivered => receiver.await.map_err(|_| self.timeout_error()),
                    _ => {
                        debug!(correlation_id = %self.correlation_id, timeout = ?self.timeout, "wait expired");
                        Err(self.timeout_error())
                    }
                }
            }
        }
    }

    /// Release the wait now rather than on drop.
    pub fn release(self) {
        // Drop does the work.
    }

    fn timeout_error(&self) -> MessagingError {
        MessagingError::Timeout {
            correlation_id: self.correlation_id.clone(),
            after: self.timeout,
        }
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        self.registry.remove(&self.correlation_id, self.seq);
    }
}
