//! Inbound buffer handoff
//!
//! The transport's receive callback runs outside the control loop and must do
//! as little as possible: copy the bytes, record sender and length, mark the
//! slot ready. The slot holds one datagram; a newer arrival overwrites an
//! undrained one, which is counted as dropped. Every interpretation of the
//! bytes happens in the control loop after [`Mailbox::take`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::codec;
use crate::contracts::{PacketKind, PeerAddress};
use crate::errors::ValidationError;
use crate::transport::ReceiveCallback;
use crate::MAILBOX_CAPACITY;

/// A datagram captured by the receive callback
///
/// Bytes beyond [`MAILBOX_CAPACITY`] are not kept, but the true wire length
/// is, so an oversized datagram still fails size validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram {
    sender: PeerAddress,
    len: usize,
    bytes: [u8; MAILBOX_CAPACITY],
}

impl Datagram {
    pub fn capture(sender: PeerAddress, data: &[u8]) -> Self {
        let mut bytes = [0u8; MAILBOX_CAPACITY];
        let kept = data.len().min(MAILBOX_CAPACITY);
        bytes[..kept].copy_from_slice(&data[..kept]);
        Self {
            sender,
            len: data.len(),
            bytes,
        }
    }

    pub fn sender(&self) -> PeerAddress {
        self.sender
    }

    /// Length of the datagram as received
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Captured bytes (at most [`MAILBOX_CAPACITY`])
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len.min(MAILBOX_CAPACITY)]
    }

    /// Validate against `kind` using the received length
    pub fn check(&self, kind: PacketKind) -> Result<(), ValidationError> {
        codec::check_len(self.len, kind)?;
        codec::check(self.bytes(), kind)
    }
}

#[derive(Default)]
struct Inner {
    slot: Mutex<Option<Datagram>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Single-slot, overwrite-latest mailbox shared by the receive callback and
/// the control loop
#[derive(Clone, Default)]
pub struct Mailbox {
    inner: Arc<Inner>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a datagram, replacing any undrained one
    pub fn publish(&self, sender: PeerAddress, data: &[u8]) {
        let datagram = Datagram::capture(sender, data);
        let replaced = self.inner.slot.lock().replace(datagram);
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        if let Some(stale) = replaced {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(%sender, stale_from = %stale.sender(), "undrained datagram overwritten");
        }
    }

    /// Drain the slot; `None` when nothing is ready
    pub fn take(&self) -> Option<Datagram> {
        self.inner.slot.lock().take()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.slot.lock().is_some()
    }

    /// Datagrams published since creation
    pub fn published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Datagrams overwritten before they were drained
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Receive callback that publishes into this mailbox
    pub fn receive_callback(&self) -> ReceiveCallback {
        let mailbox = self.clone();
        Box::new(move |sender, data| mailbox.publish(sender, data))
    }
}
