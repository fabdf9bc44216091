//! Self-healing client connection pool.
//!
//! A [`ClientPool`] keeps a set of connection slots alive. Connections themselves
//! belong to the transport layer: the pool only creates them through an injected
//! client callback, listens to the ready/defunct signals they send through their
//! [`HealthNotifier`], and replaces failed ones until a slot's reconnect budget
//! runs out.
//!
//! # Slot Lifecycle
//!
//! ```text
//! Connecting ──ready + attached──▶ Ready
//!     ▲  │                           │
//!     │  └─────────fault─────────────┤
//!     │                              ▼
//!     └──────budget left────── (fault handled) ──budget spent──▶ removed
//! ```
//!
//! A slot becomes ready only when its connection has signalled ready *and* the
//! client callback has returned it, whichever happens last, so a ready slot
//! always has a connection to hand out. The ready callback fires once per
//! successful connect and the defunct callback once per fault, including the
//! final one that exhausts the budget. Exhaustion is reported only through the
//! defunct callback's [`Recovery`] argument.
//!
//! # Concurrency
//!
//! Health signals from every connection are funneled through one channel into a
//! supervisor thread that applies all transitions in arrival order. Reconnects
//! run as jobs on a small set of reconnect workers, so a slot that keeps failing
//! never grows the stack and never holds up other slots' transitions.
//!
//! # See Also
//!
//! - [`ClientPoolFactory`]: the usual way to build a pool.
//! - [`protocol`](crate::protocol): the frames carried by pooled connections.
mod client_pool;
mod connection;
mod factory;
mod workers;

pub use client_pool::{
    ClientCallback, ClientPool, DEFAULT_RECONNECT_WORKERS, DefunctCallback, LogCallback,
    PoolOptions, ReadyCallback, Recovery, SlotState,
};
pub use connection::{Connection, ConnectionId, HealthNotifier};
pub use error::{ConnectionFault, PoolError};
pub use factory::ClientPoolFactory;

pub mod error {
    use std::io;

    use thiserror::Error;

    use super::ConnectionId;
    use crate::protocol::TransportError;

    /// Reason a connection reports itself defunct.
    #[derive(Debug, Error)]
    pub enum ConnectionFault {
        #[error("socket error: {0}")]
        Io(#[from] io::Error),

        #[error("protocol error: {0}")]
        Protocol(String),

        #[error("connection closed")]
        Closed,
    }

    impl From<TransportError> for ConnectionFault {
        fn from(value: TransportError) -> Self {
            match value {
                TransportError::Io(e) => ConnectionFault::Io(e),
                other => ConnectionFault::Protocol(other.to_string()),
            }
        }
    }

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    pub enum PoolError {
        #[error("{id} gave up after {attempts} reconnect attempts")]
        ReconnectBudgetExhausted { id: ConnectionId, attempts: usize },
    }
}
