use log::Level;

use super::{
    ClientPool, Connection, ConnectionFault, ConnectionId, HealthNotifier, PoolOptions,
    Recovery,
};

/// Named constructors for [`ClientPool`].
///
/// All three build the same pool; they differ only in which optional settings
/// are supplied. Without a logger, pool diagnostics go to the `log` facade only.
/// Without a reconnect limit, failed slots are reconnected indefinitely.
pub struct ClientPoolFactory;

impl ClientPoolFactory {
    pub fn create_client_pool<C, F, R, D>(client: F, ready: R, defunct: D) -> ClientPool<C>
    where
        C: Connection,
        F: Fn(HealthNotifier) -> C + Send + Sync + 'static,
        R: Fn(ConnectionId) + Send + Sync + 'static,
        D: Fn(ConnectionId, &ConnectionFault, &Recovery) + Send + Sync + 'static,
    {
        ClientPool::new(PoolOptions::new(client, ready, defunct))
    }

    pub fn create_client_pool_with_logger<C, F, R, D, L>(
        client: F,
        ready: R,
        defunct: D,
        log: L,
    ) -> ClientPool<C>
    where
        C: Connection,
        F: Fn(HealthNotifier) -> C + Send + Sync + 'static,
        R: Fn(ConnectionId) + Send + Sync + 'static,
        D: Fn(ConnectionId, &ConnectionFault, &Recovery) + Send + Sync + 'static,
        L: Fn(Level, &str) + Send + Sync + 'static,
    {
        ClientPool::new(PoolOptions::new(client, ready, defunct).with_logger(log))
    }

    pub fn create_client_pool_with_reconnect_limit<C, F, R, D, L>(
        client: F,
        ready: R,
        defunct: D,
        log: L,
        reconnect_limit: usize,
    ) -> ClientPool<C>
    where
        C: Connection,
        F: Fn(HealthNotifier) -> C + Send + Sync + 'static,
        R: Fn(ConnectionId) + Send + Sync + 'static,
        D: Fn(ConnectionId, &ConnectionFault, &Recovery) + Send + Sync + 'static,
        L: Fn(Level, &str) + Send + Sync + 'static,
    {
        ClientPool::new(
            PoolOptions::new(client, ready, defunct)
                .with_logger(log)
                .with_reconnect_limit(reconnect_limit),
        )
    }
}
