//! Simulated radio medium
//!
//! Stations attach to a shared [`Air`] by hardware address. Delivery follows
//! the rules of a peer-table radio link:
//! - sender and receiver must share a channel
//! - the destination is the receiver's address or the broadcast address
//! - the receiver's peer table holds the broadcast address (discovery mode)
//!   or the sender
//!
//! Receive callbacks run on the sending context, outside the medium's lock,
//! so from the receiver's point of view they arrive preemptively.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::{RadioTransport, ReceiveCallback, SendCompleteCallback};
use crate::contracts::{Channel, PeerAddress};
use crate::errors::TransportError;
use crate::BROADCAST_ADDRESS;

/// Largest datagram the medium carries
pub const AIR_MTU: usize = 250;

/// Frames kept in the log by default; older ones are evicted first
pub const FRAME_LOG_CAPACITY: usize = 1024;

type SharedReceive = Arc<dyn Fn(PeerAddress, &[u8]) + Send + Sync>;
type SharedSendComplete = Arc<dyn Fn(PeerAddress, bool) + Send + Sync>;

/// One transmission as seen by the medium
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub from: PeerAddress,
    pub to: PeerAddress,
    pub channel: Channel,
    pub bytes: Vec<u8>,
    /// Number of stations whose receive callback saw this frame
    pub delivered: usize,
}

#[derive(Default)]
struct Station {
    channel: Option<Channel>,
    peers: HashMap<PeerAddress, Channel>,
    on_receive: Option<SharedReceive>,
    on_send_complete: Option<SharedSendComplete>,
}

impl Station {
    fn accepts(
        &self,
        own: &PeerAddress,
        from: &PeerAddress,
        to: &PeerAddress,
        channel: Channel,
    ) -> bool {
        self.channel == Some(channel)
            && (to.is_broadcast() || to == own)
            && (self.peers.contains_key(&BROADCAST_ADDRESS) || self.peers.contains_key(from))
    }
}

struct AirState {
    stations: HashMap<PeerAddress, Station>,
    frames: VecDeque<Frame>,
    frame_log_capacity: usize,
    loss: f64,
    rng: StdRng,
}

/// Shared radio medium; clones refer to the same air
#[derive(Clone)]
pub struct Air {
    state: Arc<Mutex<AirState>>,
}

impl Air {
    /// Lossless medium
    pub fn new() -> Self {
        Self::with_loss(0.0, 0)
    }

    /// Medium dropping each delivery with probability `loss`
    ///
    /// `loss` is clamped to [0, 1]; `seed` makes the drop pattern reproducible.
    pub fn with_loss(loss: f64, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(AirState {
                stations: HashMap::new(),
                frames: VecDeque::new(),
                frame_log_capacity: FRAME_LOG_CAPACITY,
                loss: loss.clamp(0.0, 1.0),
                rng: StdRng::seed_from_u64(seed),
            })),
        }
    }

    /// Keep at most `capacity` frames in the log; zero disables logging
    pub fn with_frame_log(self, capacity: usize) -> Self {
        {
            let mut state = self.state.lock();
            state.frame_log_capacity = capacity;
            let excess = state.frames.len().saturating_sub(capacity);
            state.frames.drain(..excess);
        }
        self
    }

    /// Attach a station with `address`, replacing any station already there
    pub fn attach(&self, address: PeerAddress) -> AirTransport {
        self.state.lock().stations.insert(address, Station::default());
        AirTransport {
            air: self.clone(),
            address,
        }
    }

    /// Every frame transmitted so far, oldest first
    pub fn frames(&self) -> Vec<Frame> {
        self.state.lock().frames.iter().cloned().collect()
    }

    /// Frames transmitted by `from`
    pub fn frames_from(&self, from: &PeerAddress) -> Vec<Frame> {
        self.state
            .lock()
            .frames
            .iter()
            .filter(|frame| frame.from == *from)
            .cloned()
            .collect()
    }

    pub fn clear_frames(&self) {
        self.state.lock().frames.clear();
    }

    /// Put raw bytes on the air as if `from` had sent them, bypassing any
    /// sender-side checks. Returns the number of stations reached.
    pub fn inject(
        &self,
        from: PeerAddress,
        to: PeerAddress,
        channel: Channel,
        bytes: &[u8],
    ) -> usize {
        self.transmit(from, to, channel, bytes)
    }

    fn transmit(
        &self,
        from: PeerAddress,
        to: PeerAddress,
        channel: Channel,
        bytes: &[u8],
    ) -> usize {
        let receivers: Vec<SharedReceive> = {
            let mut state = self.state.lock();
            let AirState {
                stations,
                frames,
                frame_log_capacity,
                loss,
                rng,
            } = &mut *state;

            let mut receivers = Vec::new();
            for (address, station) in stations.iter() {
                if *address == from || !station.accepts(address, &from, &to, channel) {
                    continue;
                }
                let Some(callback) = &station.on_receive else {
                    continue;
                };
                if *loss > 0.0 && rng.gen_bool(*loss) {
                    trace!(%from, %to, %address, "frame lost");
                    continue;
                }
                receivers.push(Arc::clone(callback));
            }

            if *frame_log_capacity > 0 {
                if frames.len() == *frame_log_capacity {
                    frames.pop_front();
                }
                frames.push_back(Frame {
                    from,
                    to,
                    channel,
                    bytes: bytes.to_vec(),
                    delivered: receivers.len(),
                });
            }
            receivers
        };

        for callback in &receivers {
            callback(from, bytes);
        }
        receivers.len()
    }
}

impl Default for Air {
    fn default() -> Self {
        Self::new()
    }
}

/// A station's handle onto the shared medium
pub struct AirTransport {
    air: Air,
    address: PeerAddress,
}

impl AirTransport {
    fn with_station<R>(
        &self,
        f: impl FnOnce(&mut Station) -> Result<R, TransportError>,
    ) -> Result<R, TransportError> {
        let mut state = self.air.state.lock();
        let station = state
            .stations
            .get_mut(&self.address)
            .ok_or(TransportError::Unreachable(self.address))?;
        f(station)
    }

    /// Whether `peer` is currently in this station's peer table
    pub fn has_peer(&self, peer: &PeerAddress) -> bool {
        self.with_station(|station| Ok(station.peers.contains_key(peer)))
            .unwrap_or(false)
    }

    /// Current peer table, sorted by address
    pub fn peers(&self) -> Vec<(PeerAddress, Channel)> {
        let mut peers: Vec<(PeerAddress, Channel)> = self
            .with_station(|station| Ok(station.peers.iter().map(|(a, c)| (*a, *c)).collect()))
            .unwrap_or_default();
        peers.sort();
        peers
    }

    /// Channel the station is bound to, if initialized
    pub fn channel(&self) -> Option<Channel> {
        self.with_station(|station| Ok(station.channel)).ok().flatten()
    }
}

impl RadioTransport for AirTransport {
    fn initialize(&mut self, channel: Channel, peer: PeerAddress) -> Result<(), TransportError> {
        self.with_station(|station| {
            station.channel = Some(channel);
            Ok(())
        })?;
        self.add_peer(peer, channel)
    }

    fn add_peer(&mut self, peer: PeerAddress, channel: Channel) -> Result<(), TransportError> {
        self.with_station(|station| {
            if station.peers.contains_key(&peer) {
                return Err(TransportError::PeerExists(peer));
            }
            station.peers.insert(peer, channel);
            Ok(())
        })
    }

    fn remove_peer(&mut self, peer: &PeerAddress) -> Result<(), TransportError> {
        self.with_station(|station| {
            station
                .peers
                .remove(peer)
                .map(|_| ())
                .ok_or(TransportError::PeerNotFound(*peer))
        })
    }

    fn send(&mut self, dest: &PeerAddress, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > AIR_MTU {
            return Err(TransportError::PayloadTooLarge {
                len: bytes.len(),
                max: AIR_MTU,
            });
        }

        let (channel, on_send_complete) = self.with_station(|station| {
            let channel = station.channel.ok_or(TransportError::NotInitialized)?;
            if !station.peers.contains_key(dest) {
                return Err(TransportError::PeerNotFound(*dest));
            }
            Ok((channel, station.on_send_complete.clone()))
        })?;

        let delivered = self.air.transmit(self.address, *dest, channel, bytes);
        if let Some(callback) = on_send_complete {
            callback(*dest, dest.is_broadcast() || delivered > 0);
        }
        Ok(())
    }

    fn on_receive(&mut self, callback: ReceiveCallback) {
        let callback: SharedReceive = Arc::from(callback);
        let _ = self.with_station(|station| {
            station.on_receive = Some(callback);
            Ok(())
        });
    }

    fn on_send_complete(&mut self, callback: SendCompleteCallback) {
        let callback: SharedSendComplete = Arc::from(callback);
        let _ = self.with_station(|station| {
            station.on_send_complete = Some(callback);
            Ok(())
        });
    }

    fn local_address(&self) -> PeerAddress {
        self.address
    }
}
