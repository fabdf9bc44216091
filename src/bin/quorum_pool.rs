use std::{
    collections::HashSet,
    error::Error,
    io::Read,
    net::{Shutdown, SocketAddr, TcpStream},
    sync::{Arc, Mutex, PoisonError, mpsc},
    thread,
    time::Duration,
};

use clap::Parser;
use log::debug;
use quorum::{
    ClientPoolFactory, Connection, ConnectionId, HealthNotifier,
    pool::{ConnectionFault, Recovery},
};

#[derive(Debug, Parser)]
#[command(version, about = "Keep a set of TCP connections to one node alive", long_about = None)]
struct Cli {
    /// Node to connect to
    address: SocketAddr,
    /// Number of pooled connections
    #[arg(short = 'n', long, default_value_t = 2)]
    connections: usize,
    /// Reconnect attempts per failed connection; unbounded when omitted
    #[arg(short, long)]
    reconnect_limit: Option<usize>,
    /// Delay before each reconnect, in milliseconds
    #[arg(long, default_value_t = 1000)]
    backoff_ms: u64,
    /// Connect timeout, in milliseconds
    #[arg(long, default_value_t = 5000)]
    connect_timeout_ms: u64,
    /// Echo pool diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Default)]
struct Link {
    stream: Option<TcpStream>,
    closed: bool,
}

/// Plain TCP link; ready once connected, defunct when the socket fails or closes.
struct TcpConnection {
    link: Arc<Mutex<Link>>,
}

impl TcpConnection {
    fn open(
        address: SocketAddr,
        delay: Duration,
        timeout: Duration,
        notifier: HealthNotifier,
    ) -> Self {
        let link = Arc::new(Mutex::new(Link::default()));
        let shared = Arc::clone(&link);

        thread::spawn(move || {
            thread::sleep(delay);
            let connected = TcpStream::connect_timeout(&address, timeout)
                .and_then(|s| s.try_clone().map(|reader| (s, reader)));
            let (writer, reader) = match connected {
                Ok(pair) => pair,
                Err(e) => return notifier.defunct(e.into()),
            };

            {
                let mut link = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if link.closed {
                    debug!("{}: closed while connecting, dropping socket", notifier.id());
                    let _ = writer.shutdown(Shutdown::Both);
                    return;
                }
                link.stream = Some(writer);
            }
            notifier.ready();
            watch(reader, &notifier);
        });

        Self { link }
    }
}

fn watch(mut reader: TcpStream, notifier: &HealthNotifier) {
    let mut buf = [0; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return notifier.defunct(ConnectionFault::Closed),
            Ok(n) => debug!("{}: discarding {n} unsolicited bytes", notifier.id()),
            Err(e) => return notifier.defunct(e.into()),
        }
    }
}

impl Connection for TcpConnection {
    fn close(&self) {
        let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        link.closed = true;
        if let Some(stream) = link.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let address = cli.address;
    let backoff = Duration::from_millis(cli.backoff_ms);
    let timeout = Duration::from_millis(cli.connect_timeout_ms);
    let verbose = cli.verbose;

    let seen = Mutex::new(HashSet::new());
    let client = move |notifier: HealthNotifier| {
        let reconnect = seen
            .lock()
            .map(|mut seen| !seen.insert(notifier.id()))
            .unwrap_or(true);
        let delay = if reconnect { backoff } else { Duration::ZERO };
        TcpConnection::open(address, delay, timeout, notifier)
    };
    let ready = |id: ConnectionId| println!("{id} ready");
    let defunct = |id: ConnectionId, fault: &ConnectionFault, recovery: &Recovery| {
        match recovery {
            Recovery::Reconnecting { attempt } => {
                println!("{id} defunct ({fault}), retry #{attempt}")
            }
            Recovery::Failed(err) => println!("{id} defunct ({fault}), {err}"),
        }
    };
    let log = move |level: log::Level, line: &str| {
        if verbose {
            eprintln!("[pool {level}] {line}");
        }
    };

    let pool = match cli.reconnect_limit {
        Some(limit) => ClientPoolFactory::create_client_pool_with_reconnect_limit(
            client, ready, defunct, log, limit,
        ),
        None => ClientPoolFactory::create_client_pool_with_logger(client, ready, defunct, log),
    };
    for _ in 0..cli.connections {
        pool.add_client();
    }

    let (stop, stopped) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop.send(());
    })?;
    stopped.recv()?;

    println!(
        "shutting down with {} of {} connections ready",
        pool.size(),
        pool.slot_count()
    );
    drop(pool);
    Ok(())
}
