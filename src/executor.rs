use crate::{
    catch::Catch,
    queue::{Inline, Queue, ThreadPool},
    slot::{self, Slot},
    Config, Error, Future,
};
use std::{fmt, sync::Arc};

/// The queues futures schedule their work on.
///
/// Every future keeps the executor it was created with, and every future
/// derived from it inherits the same one. Cloning is cheap.
#[derive(Clone)]
pub struct Executor {
    default: Arc<dyn Queue>,
    main: Arc<dyn Queue>,
}

impl Executor {
    /// Spawns a background pool and a serial main queue.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let default = ThreadPool::new(&config.thread_name, config.workers, config.stack_size)?;
        let main = ThreadPool::serial(&config.main_thread_name, config.stack_size)?;
        Ok(Self::with_queues(Arc::new(default), Arc::new(main)))
    }

    /// Runs everything on the submitting thread.
    pub fn inline() -> Self {
        Self::with_queues(Arc::new(Inline::new()), Arc::new(Inline::new()))
    }

    pub fn with_queues(default: Arc<dyn Queue>, main: Arc<dyn Queue>) -> Self {
        Self { default, main }
    }

    pub fn default_queue(&self) -> &Arc<dyn Queue> {
        &self.default
    }

    pub fn main_queue(&self) -> &Arc<dyn Queue> {
        &self.main
    }

    /// Runs `task` on the default queue. Its error, if any, goes to the
    /// returned [`Catch`].
    pub fn execute<F>(&self, task: F) -> Catch
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        self.execute_on(&self.default, task)
    }

    pub fn execute_on<F>(&self, queue: &Arc<dyn Queue>, task: F) -> Catch
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        let (router, catch) = Catch::pair(Some(queue.clone()));
        queue.submit(Box::new(move || router.route(run(task))));
        catch
    }

    /// Runs `task` on `queue` and blocks until it returns its value.
    ///
    /// Calling this from `queue` itself deadlocks when the queue is serial.
    ///
    /// # Panics
    ///
    /// Panics if `task` panicked.
    pub fn sync_on<T, F>(&self, queue: &Arc<dyn Queue>, task: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        Future::from_slot(self, Slot::with_producer(queue.clone(), task)).wait()
    }

    /// Wraps `callback` so that every call runs it on `queue` instead of the
    /// calling thread.
    pub fn bind_on<A, F>(&self, queue: &Arc<dyn Queue>, callback: F) -> impl Fn(A) + Send + Sync
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        let queue = queue.clone();
        let callback = Arc::new(callback);
        move |arg| {
            let callback = callback.clone();
            queue.submit(Box::new(move || callback(arg)));
        }
    }

    /// Runs `task` exclusively on `queue`. Callbacks attached to the returned
    /// [`Catch`] run on `queue` too.
    pub fn barrier<F>(&self, queue: &Arc<dyn Queue>, task: F) -> Catch
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        let (router, catch) = Catch::pair(Some(queue.clone()));
        queue.submit_exclusive(Box::new(move || router.route(run(task))));
        catch
    }
}

fn run<F>(task: F) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), Error>,
{
    slot::catch(task).map_err(Error::from).and_then(|result| result)
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("default", &self.default.label())
            .field("main", &self.main.label())
            .finish()
    }
}
