use std::{
    sync::{Arc, Mutex, PoisonError, mpsc},
    thread::{self, JoinHandle},
};

use log::{debug, trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;
type Queue = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Fixed set of threads that build replacement connections.
///
/// Jobs are taken in submission order by whichever worker is idle. Dropping the
/// set lets queued jobs finish and then joins every worker.
#[derive(Debug)]
pub(crate) struct ReconnectWorkers {
    handles: Vec<(usize, JoinHandle<()>)>,
    queue: Option<mpsc::Sender<Job>>,
}

impl ReconnectWorkers {
    /// Starts `count` workers; at least one is always started.
    pub(crate) fn new(count: usize) -> Self {
        let (queue, receiver) = mpsc::channel::<Job>();
        let receiver: Queue = Arc::new(Mutex::new(receiver));

        let handles = (0..count.max(1))
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                (index, thread::spawn(move || work(index, receiver)))
            })
            .collect();

        Self {
            handles,
            queue: Some(queue),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let queued = self
            .queue
            .as_ref()
            .is_some_and(|queue| queue.send(Box::new(job)).is_ok());
        if !queued {
            warn!("reconnect workers are stopped, dropping job");
        }
    }
}

fn work(index: usize, receiver: Queue) {
    loop {
        // The lock is released before the job runs so other workers keep pulling.
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        let Ok(job) = next else {
            debug!("reconnect worker {index} stopping");
            return;
        };
        trace!("reconnect worker {index} picked up a job");
        job();
    }
}

impl Drop for ReconnectWorkers {
    fn drop(&mut self) {
        drop(self.queue.take());

        for (index, handle) in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("reconnect worker {index} panicked");
            }
        }
    }
}
