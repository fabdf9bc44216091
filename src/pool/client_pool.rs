use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use log::{Level, debug, log, trace};

use super::{
    connection::{Connection, ConnectionId, HealthNotifier, PoolEvent, Signal},
    error::{ConnectionFault, PoolError},
    workers::ReconnectWorkers,
};

/// Builds a new connection for the slot named by the notifier.
pub type ClientCallback<C> = Arc<dyn Fn(HealthNotifier) -> C + Send + Sync>;
pub type ReadyCallback = Arc<dyn Fn(ConnectionId) + Send + Sync>;
pub type DefunctCallback = Arc<dyn Fn(ConnectionId, &ConnectionFault, &Recovery) + Send + Sync>;
pub type LogCallback = Arc<dyn Fn(Level, &str) + Send + Sync>;

pub const DEFAULT_RECONNECT_WORKERS: usize = 4;

/// Externally visible state of a slot.
///
/// A fault moves a slot straight back to `Connecting` or removes it, so there is
/// no observable defunct state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Waiting for the current connection to report ready and be attached.
    Connecting,
    Ready,
}

/// What the pool does about a fault, passed to the defunct callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// A replacement connection is being created; `attempt` counts from 1.
    Reconnecting { attempt: usize },
    /// The slot was removed from the pool.
    Failed(PoolError),
}

/// Everything a [`ClientPool`] is built from.
pub struct PoolOptions<C> {
    pub client_callback: ClientCallback<C>,
    pub ready_callback: ReadyCallback,
    pub defunct_callback: DefunctCallback,
    pub log_callback: Option<LogCallback>,
    /// Reconnect attempts allowed per failed slot; `None` retries forever.
    pub reconnect_limit: Option<usize>,
    pub reconnect_workers: usize,
}

impl<C: Connection> PoolOptions<C> {
    pub fn new<F, R, D>(client: F, ready: R, defunct: D) -> Self
    where
        F: Fn(HealthNotifier) -> C + Send + Sync + 'static,
        R: Fn(ConnectionId) + Send + Sync + 'static,
        D: Fn(ConnectionId, &ConnectionFault, &Recovery) + Send + Sync + 'static,
    {
        Self {
            client_callback: Arc::new(client),
            ready_callback: Arc::new(ready),
            defunct_callback: Arc::new(defunct),
            log_callback: None,
            reconnect_limit: None,
            reconnect_workers: DEFAULT_RECONNECT_WORKERS,
        }
    }

    pub fn with_logger<L>(mut self, log: L) -> Self
    where
        L: Fn(Level, &str) + Send + Sync + 'static,
    {
        self.log_callback = Some(Arc::new(log));
        self
    }

    pub fn with_reconnect_limit(mut self, limit: usize) -> Self {
        self.reconnect_limit = Some(limit);
        self
    }

    pub fn with_reconnect_workers(mut self, workers: usize) -> Self {
        self.reconnect_workers = workers;
        self
    }
}

struct Slot<C> {
    generation: u64,
    state: SlotState,
    attempts: usize,
    ready_signalled: bool,
    connection: Option<Arc<C>>,
}

impl<C> Slot<C> {
    fn connecting(generation: u64, attempts: usize) -> Self {
        Self {
            generation,
            state: SlotState::Connecting,
            attempts,
            ready_signalled: false,
            connection: None,
        }
    }

    /// Ready needs both the connection's own signal and the attached connection.
    fn can_promote(&self, generation: u64) -> bool {
        self.generation == generation
            && self.state == SlotState::Connecting
            && self.ready_signalled
            && self.connection.is_some()
    }
}

type Slots<C> = Arc<Mutex<HashMap<ConnectionId, Slot<C>>>>;

fn lock<C>(slots: &Slots<C>) -> MutexGuard<'_, HashMap<ConnectionId, Slot<C>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stores a freshly built connection in its slot, unless the slot moved on, and
/// tells the supervisor so a pending ready signal can complete.
fn attach<C: Connection>(
    slots: &Slots<C>,
    events: &Sender<PoolEvent>,
    id: ConnectionId,
    generation: u64,
    connection: C,
) {
    let connection = Arc::new(connection);
    let attached = match lock(slots).get_mut(&id) {
        Some(slot) if slot.generation == generation => {
            slot.connection = Some(Arc::clone(&connection));
            true
        }
        _ => false,
    };

    if !attached {
        debug!("{id}: generation {generation} superseded before attach, closing it");
        connection.close();
        return;
    }
    if events.send(PoolEvent::Attached { id, generation }).is_err() {
        debug!("{id}: pool is shutting down, attach not reported");
    }
}

/// Writes pool diagnostics to the `log` facade and the optional log callback.
#[derive(Clone)]
struct Reporter(Option<LogCallback>);

impl Reporter {
    fn report(&self, level: Level, message: fmt::Arguments<'_>) {
        log!(level, "{message}");
        if let Some(callback) = &self.0 {
            callback(level, &message.to_string());
        }
    }
}

/// A managed set of connections that replaces failed members.
///
/// Create one with [`ClientPoolFactory`](super::ClientPoolFactory) or
/// [`ClientPool::new`]. Dropping the pool stops its supervisor and closes every
/// connection it still holds.
pub struct ClientPool<C: Connection> {
    slots: Slots<C>,
    next_id: AtomicU64,
    client_callback: ClientCallback<C>,
    events: Sender<PoolEvent>,
    reporter: Reporter,
    reconnect_limit: Option<usize>,
    supervisor: Option<JoinHandle<()>>,
}

impl<C: Connection> ClientPool<C> {
    pub fn new(options: PoolOptions<C>) -> Self {
        let (events, receiver) = mpsc::channel();
        let slots: Slots<C> = Arc::new(Mutex::new(HashMap::new()));
        let reporter = Reporter(options.log_callback);

        let supervisor = Supervisor {
            slots: Arc::clone(&slots),
            client_callback: Arc::clone(&options.client_callback),
            ready_callback: options.ready_callback,
            defunct_callback: options.defunct_callback,
            reporter: reporter.clone(),
            reconnect_limit: options.reconnect_limit,
            events: events.clone(),
            workers: ReconnectWorkers::new(options.reconnect_workers),
        };
        debug!("started {} reconnect workers", supervisor.workers.len());
        let handle = thread::spawn(move || supervisor.run(receiver));

        Self {
            slots,
            next_id: AtomicU64::new(0),
            client_callback: options.client_callback,
            events,
            reporter,
            reconnect_limit: options.reconnect_limit,
            supervisor: Some(handle),
        }
    }

    /// Opens a new slot and builds its first connection.
    ///
    /// Returns as soon as the client callback hands back the connection; its
    /// connect proceeds on its own and is announced through the ready callback.
    pub fn add_client(&self) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.slots).insert(id, Slot::connecting(0, 0));
        self.reporter
            .report(Level::Debug, format_args!("{id}: connecting"));

        let notifier = HealthNotifier::new(id, 0, self.events.clone());
        let connection = (self.client_callback)(notifier);
        attach(&self.slots, &self.events, id, 0, connection);
        id
    }

    /// Number of slots whose connection is ready.
    pub fn size(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| slot.state == SlotState::Ready)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of slots in any state.
    pub fn slot_count(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn slot_state(&self, id: ConnectionId) -> Option<SlotState> {
        lock(&self.slots).get(&id).map(|slot| slot.state)
    }

    pub fn reconnect_limit(&self) -> Option<usize> {
        self.reconnect_limit
    }

    /// The connection backing `id`, if that slot is ready.
    pub fn connection(&self, id: ConnectionId) -> Option<Arc<C>> {
        lock(&self.slots)
            .get(&id)
            .filter(|slot| slot.state == SlotState::Ready)
            .and_then(|slot| slot.connection.clone())
    }

    pub fn ready_connections(&self) -> Vec<(ConnectionId, Arc<C>)> {
        let mut ready: Vec<_> = lock(&self.slots)
            .iter()
            .filter(|(_, slot)| slot.state == SlotState::Ready)
            .filter_map(|(id, slot)| slot.connection.clone().map(|c| (*id, c)))
            .collect();
        ready.sort_by_key(|(id, _)| *id);
        ready
    }
}

impl<C: Connection> Drop for ClientPool<C> {
    fn drop(&mut self) {
        let _ = self.events.send(PoolEvent::Shutdown);
        if let Some(handle) = self.supervisor.take() {
            if handle.join().is_err() {
                self.reporter
                    .report(Level::Warn, format_args!("pool supervisor panicked"));
            }
        }

        let remaining: Vec<_> = lock(&self.slots)
            .drain()
            .filter_map(|(_, slot)| slot.connection)
            .collect();
        self.reporter.report(
            Level::Debug,
            format_args!("closing {} pooled connections", remaining.len()),
        );
        for connection in remaining {
            connection.close();
        }
    }
}

/// Single consumer of health signals; owns every slot state transition.
struct Supervisor<C: Connection> {
    slots: Slots<C>,
    client_callback: ClientCallback<C>,
    ready_callback: ReadyCallback,
    defunct_callback: DefunctCallback,
    reporter: Reporter,
    reconnect_limit: Option<usize>,
    events: Sender<PoolEvent>,
    workers: ReconnectWorkers,
}

impl<C: Connection> Supervisor<C> {
    fn run(self, receiver: Receiver<PoolEvent>) {
        for event in receiver.iter() {
            match event {
                PoolEvent::Health {
                    id,
                    generation,
                    signal: Signal::Ready,
                } => self.on_ready(id, generation),
                PoolEvent::Health {
                    id,
                    generation,
                    signal: Signal::Defunct(fault),
                } => self.on_defunct(id, generation, fault),
                PoolEvent::Attached { id, generation } => self.promote(id, generation),
                PoolEvent::Shutdown => break,
            }
        }
        debug!("pool supervisor stopped");
    }

    fn on_ready(&self, id: ConnectionId, generation: u64) {
        let accepted = match lock(&self.slots).get_mut(&id) {
            Some(slot) if slot.generation == generation && slot.state == SlotState::Connecting => {
                slot.ready_signalled = true;
                true
            }
            _ => false,
        };

        if !accepted {
            debug!("{id}: ignoring ready signal from generation {generation}");
            return;
        }
        self.promote(id, generation);
    }

    /// Marks the slot ready once it is both signalled and attached, in either order.
    fn promote(&self, id: ConnectionId, generation: u64) {
        let promoted = match lock(&self.slots).get_mut(&id) {
            Some(slot) if slot.can_promote(generation) => {
                slot.state = SlotState::Ready;
                slot.attempts = 0;
                true
            }
            _ => false,
        };

        if !promoted {
            trace!("{id}: generation {generation} not ready yet");
            return;
        }
        self.reporter.report(Level::Info, format_args!("{id}: ready"));
        (self.ready_callback)(id);
    }

    fn on_defunct(&self, id: ConnectionId, generation: u64, fault: ConnectionFault) {
        let (retired, recovery) = {
            let mut slots = lock(&self.slots);
            let Some(slot) = slots.get_mut(&id) else {
                debug!("{id}: ignoring fault for a removed slot: {fault}");
                return;
            };
            // A repeated fault from the same connection finds the generation moved on.
            if slot.generation != generation {
                debug!("{id}: ignoring fault from generation {generation}: {fault}");
                return;
            }

            let retired = slot.connection.take();
            let budget_left = self
                .reconnect_limit
                .is_none_or(|limit| slot.attempts < limit);

            if budget_left {
                *slot = Slot::connecting(generation + 1, slot.attempts + 1);
                (retired, Recovery::Reconnecting {
                    attempt: slot.attempts,
                })
            } else {
                let attempts = slot.attempts;
                slots.remove(&id);
                (
                    retired,
                    Recovery::Failed(PoolError::ReconnectBudgetExhausted { id, attempts }),
                )
            }
        };

        if let Some(connection) = retired {
            connection.close();
        }

        match &recovery {
            Recovery::Reconnecting { attempt } => self.reporter.report(
                Level::Warn,
                format_args!("{id}: defunct ({fault}), reconnect attempt {attempt}"),
            ),
            Recovery::Failed(err) => self
                .reporter
                .report(Level::Warn, format_args!("{id}: defunct ({fault}), {err}")),
        }
        (self.defunct_callback)(id, &fault, &recovery);

        if let Recovery::Reconnecting { .. } = recovery {
            self.schedule_reconnect(id, generation + 1);
        }
    }

    fn schedule_reconnect(&self, id: ConnectionId, generation: u64) {
        let slots = Arc::clone(&self.slots);
        let client = Arc::clone(&self.client_callback);
        let events = self.events.clone();

        self.workers.submit(move || {
            let notifier = HealthNotifier::new(id, generation, events.clone());
            let connection = client(notifier);
            attach(&slots, &events, id, generation, connection);
        });
    }
}
