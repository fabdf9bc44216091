use std::{fmt, sync::mpsc::Sender};

use log::debug;

use super::error::ConnectionFault;

/// Handle the pool assigns to a connection slot.
///
/// The id is stable across reconnects: the connection replacing a defunct one
/// keeps the id of the slot it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single link to one cluster node, owned by the transport layer.
///
/// Implementations report their health through the [`HealthNotifier`] they were
/// built with. `close` is called once the pool stops using the connection.
pub trait Connection: Send + Sync + 'static {
    fn close(&self) {}
}

#[derive(Debug)]
pub(crate) enum Signal {
    Ready,
    Defunct(ConnectionFault),
}

#[derive(Debug)]
pub(crate) enum PoolEvent {
    Health {
        id: ConnectionId,
        generation: u64,
        signal: Signal,
    },
    /// The pool stored the connection built for `generation`.
    Attached { id: ConnectionId, generation: u64 },
    Shutdown,
}

/// Health channel from one connection back to its pool.
///
/// Cloneable and usable from any thread. Signals sent after the connection was
/// replaced, or after the pool was dropped, are discarded.
#[derive(Debug, Clone)]
pub struct HealthNotifier {
    id: ConnectionId,
    generation: u64,
    sender: Sender<PoolEvent>,
}

impl HealthNotifier {
    pub(crate) fn new(id: ConnectionId, generation: u64, sender: Sender<PoolEvent>) -> Self {
        Self {
            id,
            generation,
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Reports that the connection finished connecting and can carry requests.
    pub fn ready(&self) {
        self.send(Signal::Ready);
    }

    /// Reports that the connection failed and can no longer be used.
    pub fn defunct(&self, fault: ConnectionFault) {
        self.send(Signal::Defunct(fault));
    }

    fn send(&self, signal: Signal) {
        let event = PoolEvent::Health {
            id: self.id,
            generation: self.generation,
            signal,
        };
        if self.sender.send(event).is_err() {
            debug!("{}: pool is gone, dropping health signal", self.id);
        }
    }
}
