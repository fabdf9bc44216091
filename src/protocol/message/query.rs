use std::fmt;

use bytes::BytesMut;

use super::Message;
use crate::protocol::{
    Consistency, Opcode,
    error::CodecError,
    primitive::{read_long_string, read_short, write_long_string, write_short},
};

/// Client-issued statement.
///
/// The body is `[long string]` query text followed by a `[short]` consistency
/// level. `prepare` rebuilds the body from scratch each time, so repeated calls
/// yield identical bytes.
#[derive(Debug, Clone, Default)]
pub struct QueryMessage {
    query: String,
    consistency: Consistency,
    buffer: BytesMut,
}

impl QueryMessage {
    pub fn new(query: impl Into<String>, consistency: Consistency) -> Self {
        Self {
            query: query.into(),
            consistency,
            buffer: BytesMut::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    pub fn set_consistency(&mut self, consistency: Consistency) {
        self.consistency = consistency;
    }

    fn decode(mut body: &[u8]) -> Result<(String, Consistency), CodecError> {
        let query = read_long_string(&mut body)?;
        let consistency = Consistency::try_from(read_short(&mut body)?)?;
        Ok((query, consistency))
    }
}

impl Message for QueryMessage {
    fn opcode(&self) -> Opcode {
        Opcode::Query
    }

    fn consume(&mut self, body: &[u8]) -> Result<(), CodecError> {
        self.buffer.clear();
        self.query.clear();
        self.consistency = Consistency::default();

        let (query, consistency) = Self::decode(body)?;
        self.query = query;
        self.consistency = consistency;
        Ok(())
    }

    fn prepare(&mut self) -> Result<&[u8], CodecError> {
        self.buffer.clear();
        self.buffer.reserve(4 + self.query.len() + 2);
        write_long_string(&mut self.buffer, &self.query)?;
        write_short(&mut self.buffer, self.consistency.into());
        Ok(&self.buffer[..])
    }

    fn size(&self) -> usize {
        self.buffer.len()
    }
}

// The outbound buffer is derived state.
impl PartialEq for QueryMessage {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.consistency == other.consistency
    }
}

impl Eq for QueryMessage {}

impl fmt::Display for QueryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QUERY {:?} {}", self.query, self.consistency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_layout() {
        let mut query = QueryMessage::new("USE ks", Consistency::Quorum);
        let body = query.prepare().unwrap().to_vec();

        assert_eq!(
            body,
            vec![0, 0, 0, 6, b'U', b'S', b'E', b' ', b'k', b's', 0x00, 0x04]
        );
        assert_eq!(query.size(), body.len());
    }

    #[test]
    fn prepare_is_idempotent() {
        let mut query = QueryMessage::new("select * from system.local", Consistency::One);
        let first = query.prepare().unwrap().to_vec();
        let second = query.prepare().unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(query.size(), first.len());
    }

    #[test]
    fn prepare_follows_setters() {
        let mut query = QueryMessage::default();
        assert_eq!(query.size(), 0);

        query.set_query("select now() from system.local");
        query.set_consistency(Consistency::LocalOne);
        let body = query.prepare().unwrap().to_vec();

        let mut echoed = QueryMessage::default();
        echoed.consume(&body).unwrap();
        assert_eq!(echoed.query(), "select now() from system.local");
        assert_eq!(echoed.consistency(), Consistency::LocalOne);
    }

    #[test]
    fn round_trip() {
        let inputs = vec![
            ("", Consistency::Any),
            ("select * from ks.t where id = 1", Consistency::Quorum),
            ("insert into ks.t (id, name) values (1, 'żółw')", Consistency::EachQuorum),
        ];

        for (text, consistency) in inputs {
            let mut query = QueryMessage::new(text, consistency);
            let body = query.prepare().unwrap().to_vec();

            let mut echoed = QueryMessage::default();
            echoed.consume(&body).unwrap();
            assert_eq!(echoed, query);
        }
    }

    #[test]
    fn truncated_body_leaves_defaults() {
        let mut query = QueryMessage::new("select * from t", Consistency::All);
        let body = query.prepare().unwrap().to_vec();

        let mut echoed = QueryMessage::new("stale", Consistency::Three);
        let err = echoed.consume(&body[..body.len() - 1]).unwrap_err();

        assert!(matches!(err, CodecError::TruncatedInput { .. }));
        assert_eq!(echoed.query(), "");
        assert_eq!(echoed.consistency(), Consistency::default());
    }

    #[test]
    fn every_prefix_is_truncated() {
        let body = QueryMessage::new("select * from ks.t", Consistency::LocalQuorum)
            .prepare()
            .unwrap()
            .to_vec();

        for cut in 0..body.len() {
            let mut query = QueryMessage::new("stale", Consistency::Three);
            let err = query.consume(&body[..cut]).unwrap_err();

            assert!(
                matches!(err, CodecError::TruncatedInput { .. }),
                "cut at {cut}: {err:?}"
            );
            assert_eq!(query, QueryMessage::default(), "cut at {cut}");
        }
    }

    #[test]
    fn consume_discards_prepared_body() {
        let mut query = QueryMessage::new("select * from system.peers", Consistency::All);
        query.prepare().unwrap();
        assert_ne!(query.size(), 0);

        let body = QueryMessage::new("USE ks", Consistency::One)
            .prepare()
            .unwrap()
            .to_vec();
        query.consume(&body).unwrap();
        assert_eq!(query.size(), 0);

        query.prepare().unwrap();
        assert_eq!(query.size(), body.len());

        query.consume(&body[..3]).unwrap_err();
        assert_eq!(query.size(), 0);
    }

    #[test]
    fn query_longer_than_a_short_string() {
        let text = format!("select * from t where v = '{}'", "a".repeat(70_000));
        let mut query = QueryMessage::new(text.as_str(), Consistency::Quorum);
        let body = query.prepare().unwrap().to_vec();
        assert_eq!(body.len(), 4 + text.len() + 2);

        let mut echoed = QueryMessage::default();
        echoed.consume(&body).unwrap();
        assert_eq!(echoed.query(), text);
    }

    #[test]
    #[should_panic(expected = "UnknownConsistency(99)")]
    fn unknown_consistency() {
        let mut body = vec![0, 0, 0, 0];
        body.extend_from_slice(&99u16.to_be_bytes());
        QueryMessage::default().consume(&body).unwrap();
    }

    #[test]
    fn display() {
        let query = QueryMessage::new("select 1", Consistency::Two);
        assert_eq!(query.to_string(), "QUERY \"select 1\" TWO");
    }
}
