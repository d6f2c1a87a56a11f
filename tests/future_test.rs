#[cfg(test)]
mod tests {
    use promise_slot::{continuation, Config, Error, Executor, FailableFuture, Future};
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        thread,
        time::{Duration, Instant},
    };

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    fn executor() -> Executor {
        Executor::new(&Config::default().with_workers(4)).unwrap()
    }

    #[test]
    fn test_map_doubles() {
        let executor = executor();
        assert_eq!(Future::new(&executor, || 21).map(|v| v * 2).wait(), 42);
    }

    #[test]
    fn test_failure_flows_through_map() {
        let executor = executor();
        let result = FailableFuture::<i32>::new(&executor, || Err(Error::new(Boom)))
            .map(Ok)
            .wait();
        assert_eq!(result.unwrap_err().downcast_ref::<Boom>(), Some(&Boom));
    }

    #[test]
    fn test_then_on_queue_does_not_block() {
        let executor = executor();
        let sink = Arc::new(Mutex::new(Vec::new()));
        let writer = sink.clone();
        let (resolver, gate) = Future::<()>::pair(&executor);
        let queue = executor.main_queue().clone();
        // Hold the main queue so the callback cannot run before we check.
        queue.submit(Box::new(move || gate.wait()));
        let started = Instant::now();
        let _catch = FailableFuture::value(&executor, 5).then_on(&queue, move |x| {
            writer.lock().unwrap().push(x);
            Ok(())
        });
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(sink.lock().unwrap().is_empty());
        resolver.put(());
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(*sink.lock().unwrap(), vec![5]);
    }

    #[test]
    fn test_many_blocked_readers() {
        let executor = executor();
        let (resolver, future) = Future::<String>::pair(&executor);
        let woken = Arc::new(AtomicUsize::new(0));
        let readers: Vec<_> = (0..32)
            .map(|_| {
                let future = future.clone();
                let woken = woken.clone();
                thread::spawn(move || {
                    let value = future.wait();
                    woken.fetch_add(1, Ordering::SeqCst);
                    value
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(woken.load(Ordering::SeqCst), 0);
        resolver.put("🍓".into());
        for reader in readers {
            assert_eq!(reader.join().expect("The reader thread has panicked"), "🍓");
        }
        assert_eq!(woken.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn test_never_awaited_never_runs() {
        let executor = executor();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let future = FailableFuture::new(&executor, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(())
        });
        let _mapped = future.map(Ok).recover(());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        future.start();
        future.wait().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sibling_maps_share_parent() {
        let executor = executor();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let parent = Future::new(&executor, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            10
        });
        let a = parent.map(|v| v + 1);
        let b = parent.map(|v| v * 2);
        assert_eq!((a.wait(), b.wait()), (11, 20));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_round_trip() {
        let executor = executor();
        let value = continuation::promise_optional::<_, Boom, _>(&executor, |done| {
            done(Some("v"), None)
        });
        assert_eq!(value.wait().unwrap(), "v");
        let error = continuation::promise_optional::<&str, _, _>(&executor, |done| {
            done(None, Some(Boom))
        });
        assert_eq!(error.wait().unwrap_err().downcast_ref::<Boom>(), Some(&Boom));
        let neither = continuation::promise_optional::<&str, Boom, _>(&executor, |done| {
            done(None, None)
        });
        assert!(matches!(neither.wait(), Err(Error::NoElements)));
    }

    #[test]
    fn test_catch_before_and_after() {
        let executor = executor();
        let calls = Arc::new(AtomicUsize::new(0));

        let (resolver, pending) = FailableFuture::<i32>::pair(&executor);
        let before = pending.then(|_| Ok(()));
        let counter = calls.clone();
        before.on_error(move |e| {
            assert_eq!(e.downcast_ref::<Boom>(), Some(&Boom));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        resolver.fail(Error::new(Boom));
        before.wait();

        let after = FailableFuture::<i32>::error(&executor, Error::new(Boom)).then(|_| Ok(()));
        assert!(after.wait().is_some());
        let counter = calls.clone();
        after.on_error(move |e| {
            assert_eq!(e.downcast_ref::<Boom>(), Some(&Boom));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while calls.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_await_in_async_block() {
        let executor = executor();
        let doubled = Future::new(&executor, || 4).map(|v| v * 2);
        let failed = FailableFuture::<i32>::error(&executor, Error::NoElements);
        let (value, error) = futures::executor::block_on(async move {
            (doubled.await, failed.await)
        });
        assert_eq!(value, 8);
        assert!(matches!(error, Err(Error::NoElements)));
    }
}
