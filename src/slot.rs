//! The write-once cell behind [`Future`](crate::Future) and
//! [`FailableFuture`](crate::FailableFuture).
//!
//! A slot is resolved at most once. Readers either find the value already
//! published (lock-free), block on a condition variable, register a waker, or
//! register a continuation that runs right after publication.
use crate::{queue::Queue, Abandoned};
use parking_lot::{Condvar, Mutex};
use std::{
    mem,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, OnceLock},
    task::{Context, Poll, Waker},
};
use tracing::{debug, trace};

/// What a slot resolves to: the produced value, or the reason there is none.
pub type Outcome<T> = Result<T, Abandoned>;

type Start<T> = Box<dyn FnOnce(Arc<Slot<T>>) + Send>;
type Continuation<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

enum Phase<T> {
    NotStarted(Start<T>),
    Running,
    Resolved,
}

struct Inner<T> {
    phase: Phase<T>,
    continuations: Vec<Continuation<T>>,
    wakers: Vec<Waker>,
}

pub struct Slot<T> {
    value: OnceLock<Outcome<T>>,
    inner: Mutex<Inner<T>>,
    resolved: Condvar,
}

impl<T> Slot<T>
where
    T: Send + Sync + 'static,
{
    fn with_phase(phase: Phase<T>) -> Arc<Self> {
        Arc::new(Slot {
            value: OnceLock::new(),
            inner: Mutex::new(Inner {
                phase,
                continuations: vec![],
                wakers: vec![],
            }),
            resolved: Condvar::new(),
        })
    }

    /// An unresolved slot written from outside; starting it does nothing.
    pub fn pending() -> Arc<Self> {
        Self::with_phase(Phase::Running)
    }

    pub fn resolved(value: T) -> Arc<Self> {
        let slot = Self::with_phase(Phase::Resolved);
        let _ = slot.value.set(Ok(value));
        slot
    }

    /// An unresolved slot whose `start` action runs once, on the thread that
    /// first calls [`start`](Self::start). The action is handed the slot and
    /// must eventually publish into it.
    pub fn deferred<F>(start: F) -> Arc<Self>
    where
        F: FnOnce(Arc<Slot<T>>) + Send + 'static,
    {
        Self::with_phase(Phase::NotStarted(Box::new(start)))
    }

    /// A lazy slot whose producer runs on `queue` once the slot is started.
    pub fn with_producer<F>(queue: Arc<dyn Queue>, producer: F) -> Arc<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self::deferred(move |slot| {
            queue.submit(Box::new(move || {
                slot.publish(catch(producer));
            }))
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn peek(&self) -> Option<&Outcome<T>> {
        self.value.get()
    }

    /// Moves `NotStarted` to `Running` and runs the start action. Idempotent.
    pub fn start(self: &Arc<Self>) {
        if self.is_resolved() {
            return;
        }
        let start = {
            let mut inner = self.inner.lock();
            match mem::replace(&mut inner.phase, Phase::Running) {
                Phase::NotStarted(start) => start,
                phase => {
                    inner.phase = phase;
                    return;
                }
            }
        };
        trace!("starting producer");
        start(self.clone());
    }

    /// Resolves the slot. Returns `false`, and drops `outcome`, if the slot
    /// was already resolved.
    pub fn publish(&self, outcome: Outcome<T>) -> bool {
        let (phase, continuations, wakers) = {
            let mut inner = self.inner.lock();
            if self.value.set(outcome).is_err() {
                debug!("ignoring write to a resolved slot");
                return false;
            }
            self.resolved.notify_all();
            (
                mem::replace(&mut inner.phase, Phase::Resolved),
                mem::take(&mut inner.continuations),
                mem::take(&mut inner.wakers),
            )
        };
        // An unstarted producer may own resolvers whose drop locks this slot.
        drop(phase);
        trace!(
            continuations = continuations.len(),
            wakers = wakers.len(),
            "slot resolved"
        );
        if let Some(outcome) = self.value.get() {
            for continuation in continuations {
                continuation(outcome);
            }
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn abandon(&self, reason: Abandoned) -> bool {
        self.publish(Err(reason))
    }

    /// Runs `continuation` once the slot resolves: right away on this thread
    /// if it already has, otherwise on the thread that publishes.
    pub fn subscribe<F>(&self, continuation: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        {
            let mut inner = self.inner.lock();
            if !self.is_resolved() {
                inner.continuations.push(Box::new(continuation));
                return;
            }
        }
        if let Some(outcome) = self.value.get() {
            continuation(outcome);
        }
    }
}

impl<T> Slot<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Blocks until the slot resolves, starting the producer if nobody has.
    pub fn wait(self: &Arc<Self>) -> Outcome<T> {
        if let Some(outcome) = self.value.get() {
            return outcome.clone();
        }
        self.start();
        let mut inner = self.inner.lock();
        loop {
            if let Some(outcome) = self.value.get() {
                return outcome.clone();
            }
            self.resolved.wait(&mut inner);
        }
    }

    pub fn poll_wait(self: &Arc<Self>, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        if let Some(outcome) = self.value.get() {
            return Poll::Ready(outcome.clone());
        }
        self.start();
        let mut inner = self.inner.lock();
        match self.value.get() {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }

    /// A lazy slot fed from this one. Starting it starts `self`; once `self`
    /// resolves, `transform` runs on `queue`.
    pub fn derive<R, F>(self: &Arc<Self>, queue: Arc<dyn Queue>, transform: F) -> Arc<Slot<R>>
    where
        R: Send + Sync + 'static,
        F: FnOnce(Outcome<T>) -> Outcome<R> + Send + 'static,
    {
        let parent = self.clone();
        Slot::deferred(move |child: Arc<Slot<R>>| {
            parent.start();
            parent.subscribe(move |outcome| forward(queue, outcome.clone(), Some(child), transform));
        })
    }

    /// Like [`derive`](Self::derive), but `transform` runs whenever `self`
    /// resolves, whether or not the derived slot is ever started.
    pub fn observe<R, F>(self: &Arc<Self>, queue: Arc<dyn Queue>, transform: F) -> Arc<Slot<R>>
    where
        R: Send + Sync + 'static,
        F: FnOnce(Outcome<T>) -> Outcome<R> + Send + 'static,
    {
        let parent = self.clone();
        // Once started, the child is owned by the parent until it resolves.
        let child = Slot::<R>::deferred(move |child| {
            parent.subscribe(move |_| drop(child));
            parent.start();
        });
        // The parent only holds the unstarted child weakly, so dropping both
        // handles frees both, producer included.
        let target = Arc::downgrade(&child);
        self.subscribe(move |outcome| {
            forward(queue, outcome.clone(), target.upgrade(), transform)
        });
        child
    }
}

/// Runs `transform` on `queue` and publishes into `child` if it is still
/// around. The transform runs either way.
fn forward<T, R, F>(
    queue: Arc<dyn Queue>,
    outcome: Outcome<T>,
    child: Option<Arc<Slot<R>>>,
    transform: F,
) where
    T: Send + 'static,
    R: Send + Sync + 'static,
    F: FnOnce(Outcome<T>) -> Outcome<R> + Send + 'static,
{
    queue.submit(Box::new(move || {
        let outcome = catch(move || transform(outcome)).and_then(|outcome| outcome);
        if let Some(child) = child {
            child.publish(outcome);
        }
    }));
}

/// Runs user code, turning a panic into [`Abandoned::Panicked`].
pub(crate) fn catch<R>(f: impl FnOnce() -> R) -> Outcome<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(Abandoned::from_panic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{Inline, ThreadPool};
    use futures::executor::block_on;
    use std::{
        future::poll_fn,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    fn pool() -> Arc<dyn Queue> {
        Arc::new(ThreadPool::new("slot-test", 4, None).unwrap())
    }

    #[test]
    fn test_first_write_wins() {
        let slot = Slot::<i32>::pending();
        assert!(slot.publish(Ok(1)));
        assert!(!slot.publish(Ok(2)));
        assert!(!slot.abandon(Abandoned::Dropped));
        assert_eq!(slot.wait(), Ok(1));
    }

    #[test]
    fn test_many_waiters_wake() {
        let slot = Slot::<String>::pending();
        let waiters: Vec<_> = (0..16)
            .map(|_| {
                let slot = slot.clone();
                thread::spawn(move || slot.wait())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        slot.publish(Ok("🍓".to_owned()));
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Ok("🍓".to_owned()));
        }
        // Late readers take the fast path.
        assert_eq!(slot.wait(), Ok("🍓".to_owned()));
    }

    #[test]
    fn test_producer_is_lazy() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let slot = Slot::with_producer(pool(), move || {
            flag.store(true, Ordering::SeqCst);
            5
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(slot.wait(), Ok(5));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_producer_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let slot = Slot::with_producer(pool(), move || counter.fetch_add(1, Ordering::SeqCst));
        for _ in 0..5 {
            slot.start();
        }
        let readers: Vec<_> = (0..5)
            .map(|_| {
                let slot = slot.clone();
                thread::spawn(move || slot.wait())
            })
            .collect();
        for reader in readers {
            assert_eq!(reader.join().unwrap(), Ok(0));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_producer_abandons() {
        let slot = Slot::<i32>::with_producer(Arc::new(Inline::new()), || panic!("no value"));
        assert_eq!(
            slot.wait(),
            Err(Abandoned::Panicked(Arc::from("no value")))
        );
    }

    #[test]
    fn test_subscribe_before_and_after() {
        let slot = Slot::<i32>::pending();
        let seen = Arc::new(AtomicUsize::new(0));
        let before = seen.clone();
        slot.subscribe(move |outcome| {
            assert_eq!(outcome, &Ok(3));
            before.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        slot.publish(Ok(3));
        let after = seen.clone();
        slot.subscribe(move |_| {
            after.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_derive_waits_for_parent() {
        let parent = Slot::<i32>::pending();
        let child = parent.derive(pool(), |outcome| outcome.map(|v| v * 2));
        let reader = {
            let child = child.clone();
            thread::spawn(move || child.wait())
        };
        thread::sleep(Duration::from_millis(10));
        assert!(!child.is_resolved());
        parent.publish(Ok(21));
        assert_eq!(reader.join().unwrap(), Ok(42));
    }

    #[test]
    fn test_observe_fires_without_start() {
        let parent = Slot::<i32>::pending();
        let child = parent.observe(Arc::new(Inline::new()), |outcome| outcome.map(|v| v + 1));
        parent.publish(Ok(1));
        assert_eq!(child.peek(), Some(&Ok(2)));
    }

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observe_releases_unstarted_parent() {
        let drops = Arc::new(AtomicUsize::new(0));
        let tracked = Tracked(drops.clone());
        let parent = Slot::with_producer(pool(), move || {
            let _tracked = &tracked;
            1
        });
        let child = parent.observe(pool(), |outcome| outcome);
        drop(parent);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(child);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observe_keeps_started_child() {
        let (tx, rx) = std::sync::mpsc::channel();
        let parent = Slot::<i32>::pending();
        let child = parent.observe(pool(), |outcome| outcome.map(|v| v * 3));
        child.start();
        child.subscribe(move |outcome| tx.send(outcome.clone()).unwrap());
        // Only the parent keeps the child alive now.
        drop(child);
        parent.publish(Ok(4));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(Ok(12)));
    }

    #[test]
    fn test_observe_runs_for_dropped_child() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let parent = Slot::<i32>::pending();
        drop(parent.observe(Arc::new(Inline::new()), move |outcome| {
            counter.fetch_add(1, Ordering::SeqCst);
            outcome
        }));
        parent.publish(Ok(1));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_poll_wait() {
        let slot = Slot::<i32>::pending();
        let writer = {
            let slot = slot.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                slot.publish(Ok(9));
            })
        };
        let value = block_on(poll_fn(|cx| slot.poll_wait(cx)));
        writer.join().expect("The writer thread has panicked");
        assert_eq!(value, Ok(9));
    }
}
