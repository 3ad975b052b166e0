//! ACK Manager module - response emission and bookkeeping
//!
//! Every command the receiver sees is answered by exactly one Response: Ok
//! when it was applied, Error when it was rejected. The controller tallies
//! what comes back. There is no retransmission; a lost response is simply
//! superseded by the next command.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::contracts::{PeerAddress, ResponsePacket, ResponseStatus};
use crate::errors::TransportError;
use crate::transport::{RadioTransport, SendCompleteCallback};

/// AckManager - sends Response packets
pub struct AckManager;

impl AckManager {
    /// Send a Response carrying `status` to `dest`
    ///
    /// Failures are logged and returned; the caller never retries.
    pub fn send_status<T: RadioTransport>(
        transport: &mut T,
        dest: &PeerAddress,
        status: ResponseStatus,
    ) -> Result<(), TransportError> {
        let bytes = ResponsePacket::new(status).encode();
        match transport.send(dest, &bytes) {
            Ok(()) => {
                debug!(%dest, ?status, "response sent");
                Ok(())
            }
            Err(err) => {
                warn!(%dest, ?status, error = %err, "response send failed");
                Err(err)
            }
        }
    }

    /// Send Response{Ok} (command applied, or discovery acknowledged)
    pub fn send_ok<T: RadioTransport>(
        transport: &mut T,
        dest: &PeerAddress,
    ) -> Result<(), TransportError> {
        Self::send_status(transport, dest, ResponseStatus::Ok)
    }

    /// Send Response{Error} (command rejected)
    pub fn send_error<T: RadioTransport>(
        transport: &mut T,
        dest: &PeerAddress,
    ) -> Result<(), TransportError> {
        Self::send_status(transport, dest, ResponseStatus::Error)
    }
}

/// Controller-side count of responses received after pairing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseTally {
    pub ok: u64,
    pub error: u64,
    /// Datagrams that failed Response validation
    pub invalid: u64,
    pub last: Option<ResponseStatus>,
}

impl ResponseTally {
    pub fn record(&mut self, status: ResponseStatus) {
        match status {
            ResponseStatus::Ok => self.ok += 1,
            ResponseStatus::Error => self.error += 1,
        }
        self.last = Some(status);
    }

    pub fn record_invalid(&mut self) {
        self.invalid += 1;
    }

    /// Valid responses of either status
    pub fn total(&self) -> u64 {
        self.ok + self.error
    }
}

/// Send-complete counters fed by the transport's completion callback
///
/// Purely diagnostic: nothing in the protocol waits on these.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStats {
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Completion callback to install on a transport
    pub fn send_complete_callback(&self) -> SendCompleteCallback {
        let stats = self.clone();
        Box::new(move |dest, success| {
            if success {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
            } else {
                stats.failed.fetch_add(1, Ordering::Relaxed);
            }
            debug!(%dest, success, "send complete");
        })
    }
}
