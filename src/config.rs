use std::{num::NonZeroUsize, thread};

const FALLBACK_WORKERS: usize = 4;

/// Settings for the queues an [`Executor`](crate::Executor) spawns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Worker threads in the default background pool.
    pub workers: usize,
    /// Name prefix of the background pool's threads.
    pub thread_name: String,
    /// Name of the serial "main" queue's thread.
    pub main_thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(FALLBACK_WORKERS),
            thread_name: "promise-worker".to_owned(),
            main_thread_name: "promise-main".to_owned(),
            stack_size: None,
        }
    }
}

impl Config {
    /// Values below one are raised to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_main_thread_name(mut self, name: impl Into<String>) -> Self {
        self.main_thread_name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}
