pub mod pool;
pub mod protocol;

pub use pool::{ClientPool, ClientPoolFactory, Connection, ConnectionId, HealthNotifier};
pub use protocol::{AnyMessage, Consistency, EventMessage, Message, Opcode, QueryMessage};
