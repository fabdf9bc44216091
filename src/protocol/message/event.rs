use std::{
    fmt,
    net::{IpAddr, SocketAddr},
};

use log::{debug, trace};

use super::Message;
use crate::protocol::{
    Opcode,
    error::CodecError,
    primitive::{read_inet, read_string},
};

const TOPOLOGY_CHANGE: &str = "TOPOLOGY_CHANGE";
const STATUS_CHANGE: &str = "STATUS_CHANGE";
const SCHEMA_CHANGE: &str = "SCHEMA_CHANGE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventType {
    #[default]
    Unknown,
    Topology,
    Status,
    Schema,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TopologyChange {
    #[default]
    Unknown,
    AddNode,
    RemoveNode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusChange {
    #[default]
    Unknown,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaChange {
    #[default]
    Unknown,
    Created,
    Dropped,
    Updated,
}

impl From<&str> for TopologyChange {
    fn from(value: &str) -> Self {
        match value {
            "NEW_NODE" => TopologyChange::AddNode,
            "REMOVED_NODE" => TopologyChange::RemoveNode,
            _ => TopologyChange::Unknown,
        }
    }
}

impl From<&str> for StatusChange {
    fn from(value: &str) -> Self {
        match value {
            "UP" => StatusChange::Up,
            "DOWN" => StatusChange::Down,
            _ => StatusChange::Unknown,
        }
    }
}

impl From<&str> for SchemaChange {
    fn from(value: &str) -> Self {
        match value {
            "CREATED" => SchemaChange::Created,
            "DROPPED" => SchemaChange::Dropped,
            "UPDATED" => SchemaChange::Updated,
            _ => SchemaChange::Unknown,
        }
    }
}

/// Server-pushed cluster or schema notification.
///
/// Which change field is meaningful depends on [`EventMessage::event_type`]; the
/// other two stay `Unknown`. Events only travel from server to client, so
/// `prepare` yields an empty body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventMessage {
    event_type: EventType,
    topology_change: TopologyChange,
    status_change: StatusChange,
    schema_change: SchemaChange,
    ip: Option<IpAddr>,
    port: i32,
    keyspace: String,
    column_family: String,
}

impl EventMessage {
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn topology_change(&self) -> TopologyChange {
        self.topology_change
    }

    pub fn status_change(&self) -> StatusChange {
        self.status_change
    }

    pub fn schema_change(&self) -> SchemaChange {
        self.schema_change
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn port(&self) -> i32 {
        self.port
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn column_family(&self) -> &str {
        &self.column_family
    }

    /// Node address carried by topology and status events.
    pub fn address(&self) -> Option<SocketAddr> {
        let port = u16::try_from(self.port).ok()?;
        self.ip.map(|ip| SocketAddr::new(ip, port))
    }

    fn decode(mut body: &[u8]) -> Result<Self, CodecError> {
        let mut event = EventMessage::default();
        let tag = read_string(&mut body)?;

        match tag.as_str() {
            TOPOLOGY_CHANGE => {
                event.event_type = EventType::Topology;
                let change = read_string(&mut body)?;
                let (ip, port) = read_inet(&mut body)?;
                event.topology_change = change.as_str().into();
                event.ip = Some(ip);
                event.port = port;
            }
            STATUS_CHANGE => {
                event.event_type = EventType::Status;
                let change = read_string(&mut body)?;
                let (ip, port) = read_inet(&mut body)?;
                event.status_change = change.as_str().into();
                event.ip = Some(ip);
                event.port = port;
            }
            SCHEMA_CHANGE => {
                event.event_type = EventType::Schema;
                let change = read_string(&mut body)?;
                event.keyspace = read_string(&mut body)?;
                event.column_family = read_string(&mut body)?;
                event.schema_change = change.as_str().into();
            }
            other => {
                // Newer servers may push categories this client does not know.
                debug!("ignoring unrecognized event '{other}'");
                return Ok(event);
            }
        }

        if !body.is_empty() {
            trace!("{} trailing bytes after {tag} event", body.len());
        }
        Ok(event)
    }
}

impl Message for EventMessage {
    fn opcode(&self) -> Opcode {
        Opcode::Event
    }

    fn consume(&mut self, body: &[u8]) -> Result<(), CodecError> {
        *self = EventMessage::default();
        *self = Self::decode(body)?;
        Ok(())
    }

    fn prepare(&mut self) -> Result<&[u8], CodecError> {
        debug!("EVENT frames are server-to-client only; preparing an empty body");
        let empty: &[u8] = &[];
        Ok(empty)
    }

    fn size(&self) -> usize {
        0
    }
}

impl fmt::Display for EventMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.event_type {
            EventType::Topology => write!(
                f,
                "EVENT {TOPOLOGY_CHANGE} {:?} {}:{}",
                self.topology_change,
                display_ip(self.ip),
                self.port
            ),
            EventType::Status => write!(
                f,
                "EVENT {STATUS_CHANGE} {:?} {}:{}",
                self.status_change,
                display_ip(self.ip),
                self.port
            ),
            EventType::Schema => write!(
                f,
                "EVENT {SCHEMA_CHANGE} {:?} {}.{}",
                self.schema_change, self.keyspace, self.column_family
            ),
            EventType::Unknown => write!(f, "EVENT UNKNOWN"),
        }
    }
}

fn display_ip(ip: Option<IpAddr>) -> String {
    ip.map(|ip| ip.to_string()).unwrap_or_default()
}
