//! Work queues futures run their producers, transforms and callbacks on.
//!
use crate::Error;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{ReentrantMutex, RwLock};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};
use tracing::{debug, error, trace};

/// A unit of work submitted to a [`Queue`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs submitted tasks, now or later, on some thread.
pub trait Queue: Send + Sync + 'static {
    fn submit(&self, task: Task);

    /// Runs `task` with no other task of this queue running alongside it.
    fn submit_exclusive(&self, task: Task);

    fn label(&self) -> &str;
}

impl fmt::Debug for dyn Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Queue").field(&self.label()).finish()
    }
}

enum Job {
    Shared(Task),
    Exclusive(Task),
}

/// A fixed set of worker threads fed from one channel.
///
/// A pool with a single worker is a serial queue.
pub struct ThreadPool {
    label: String,
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(
        label: &str,
        workers: usize,
        stack_size: Option<usize>,
    ) -> Result<Self, Error> {
        let (sender, receiver) = unbounded();
        let barrier = Arc::new(RwLock::new(()));
        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let name = format!("{label}-{index}");
            let mut builder = thread::Builder::new().name(name.clone());
            if let Some(size) = stack_size {
                builder = builder.stack_size(size);
            }
            let receiver = receiver.clone();
            let barrier = barrier.clone();
            let handle = builder
                .spawn(move || work(receiver, barrier))
                .map_err(|source| Error::Spawn {
                    name,
                    source: Arc::new(source),
                })?;
            handles.push(handle);
        }
        debug!(label, workers = handles.len(), "started thread pool");
        Ok(Self {
            label: label.to_owned(),
            sender: Some(sender),
            workers: handles,
        })
    }

    /// A pool with exactly one worker: tasks run one at a time in submission order.
    pub fn serial(label: &str, stack_size: Option<usize>) -> Result<Self, Error> {
        Self::new(label, 1, stack_size)
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    fn send(&self, job: Job) {
        // The sender is only taken in drop, and every worker holds a receiver
        // until then.
        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                error!(label = %self.label, "thread pool has no workers left, task dropped");
            }
        }
    }
}

impl Queue for ThreadPool {
    fn submit(&self, task: Task) {
        self.send(Job::Shared(task))
    }

    fn submit_exclusive(&self, task: Task) {
        self.send(Job::Exclusive(task))
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("label", &self.label)
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl Drop for ThreadPool {
    /// Closes the channel. Workers finish whatever is queued, then exit.
    fn drop(&mut self) {
        drop(self.sender.take());
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // The last handle to a pool may be released by one of its own tasks.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!(label = %self.label, "worker thread panicked");
            }
        }
        debug!(label = %self.label, "stopped thread pool");
    }
}

fn work(receiver: Receiver<Job>, barrier: Arc<RwLock<()>>) {
    trace!("worker started");
    while let Ok(job) = receiver.recv() {
        match job {
            // Recursive read so a shared task blocked on a future never keeps
            // the task that resolves it from starting.
            Job::Shared(task) => {
                let _shared = barrier.read_recursive();
                run(task);
            }
            Job::Exclusive(task) => {
                let _exclusive = barrier.write();
                run(task);
            }
        }
    }
    trace!("worker stopped");
}

fn run(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let reason = crate::Abandoned::from_panic(payload);
        error!(%reason, "task panicked");
    }
}

/// Runs every task immediately on the submitting thread.
#[derive(Default)]
pub struct Inline {
    exclusive: ReentrantMutex<()>,
}

impl Inline {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Queue for Inline {
    fn submit(&self, task: Task) {
        run(task)
    }

    fn submit_exclusive(&self, task: Task) {
        let _exclusive = self.exclusive.lock();
        run(task)
    }

    fn label(&self) -> &str {
        "inline"
    }
}
