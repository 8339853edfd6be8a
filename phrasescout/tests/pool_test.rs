use anyhow::Result;
use phrasescout::{Job, SearchError, SearchResult, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Records how many jobs run at once
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
}

struct Tracked {
    gauge: Arc<Gauge>,
    order: Arc<Mutex<Vec<usize>>>,
    index: usize,
    hold: Duration,
    fail: bool,
}

impl Job for Tracked {
    type Output = usize;

    fn name(&self) -> &'static str {
        "tracked"
    }

    fn run(self) -> SearchResult<usize> {
        self.order.lock().unwrap().push(self.index);
        let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.hold);
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            panic!("tracked job {} failed", self.index);
        }
        self.gauge.finished.fetch_add(1, Ordering::SeqCst);
        Ok(self.index)
    }
}

struct Fixture {
    gauge: Arc<Gauge>,
    order: Arc<Mutex<Vec<usize>>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            gauge: Arc::new(Gauge::default()),
            order: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn job(&self, index: usize, hold_ms: u64) -> Tracked {
        Tracked {
            gauge: Arc::clone(&self.gauge),
            order: Arc::clone(&self.order),
            index,
            hold: Duration::from_millis(hold_ms),
            fail: false,
        }
    }

    fn failing(&self, index: usize) -> Tracked {
        Tracked {
            fail: true,
            ..self.job(index, 1)
        }
    }
}

#[test]
fn test_capacity_bound() -> Result<()> {
    for capacity in [1usize, 2, 8] {
        let fixture = Fixture::new();
        let pool = WorkerPool::new(Some(capacity))?;
        assert_eq!(pool.capacity(), capacity);

        let handles = (0..capacity * 4)
            .map(|i| pool.run(fixture.job(i, 10)))
            .collect::<SearchResult<Vec<_>>>()?;
        for handle in handles {
            handle.wait()?;
        }

        let peak = fixture.gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= capacity, "peak {} exceeded capacity {}", peak, capacity);
        assert!(pool.metrics().get_stats().peak_running <= capacity as u64);
        assert_eq!(fixture.gauge.finished.load(Ordering::SeqCst), capacity * 4);
    }
    Ok(())
}

#[test]
fn test_fifo_start_order() -> Result<()> {
    let fixture = Fixture::new();
    let pool = WorkerPool::new(Some(1))?;

    let handles = (0..10)
        .map(|i| pool.run(fixture.job(i, 1)))
        .collect::<SearchResult<Vec<_>>>()?;
    for handle in handles {
        handle.wait()?;
    }

    assert_eq!(*fixture.order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_fault_isolation() -> Result<()> {
    let fixture = Fixture::new();
    let pool = WorkerPool::new(Some(2))?;

    let handles = (0..8)
        .map(|i| {
            if i % 3 == 0 {
                pool.run(fixture.failing(i))
            } else {
                pool.run(fixture.job(i, 2))
            }
        })
        .collect::<SearchResult<Vec<_>>>()?;

    let mut failures = 0;
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.wait() {
            Ok(value) => assert_eq!(value, i),
            Err(SearchError::ExecutionFailure { task, .. }) => {
                assert_eq!(task, "tracked");
                assert_eq!(i % 3, 0);
                failures += 1;
            }
            Err(e) => panic!("unexpected error for task {}: {}", i, e),
        }
    }
    assert_eq!(failures, 3);

    // No slot is left marked busy
    assert_eq!(pool.running(), 0);
    assert_eq!(pool.live_units(), 2);
    let after = pool.run(fixture.job(99, 1))?;
    assert_eq!(after.wait()?, 99);
    Ok(())
}

#[test]
fn test_graceful_shutdown_completes_everything() -> Result<()> {
    let fixture = Fixture::new();
    let pool = WorkerPool::new(Some(2))?;

    let handles = (0..12)
        .map(|i| pool.run(fixture.job(i, 5)))
        .collect::<SearchResult<Vec<_>>>()?;
    pool.shutdown(true);

    assert_eq!(fixture.gauge.finished.load(Ordering::SeqCst), 12);
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.wait()?, i);
    }
    assert!(matches!(
        pool.run(fixture.job(100, 1)),
        Err(SearchError::PoolClosed)
    ));
    assert_eq!(pool.live_units(), 0);
    Ok(())
}

#[test]
fn test_forced_shutdown_completes_nothing_further() -> Result<()> {
    let fixture = Fixture::new();
    let pool = WorkerPool::new(Some(2))?;

    let handles = (0..10)
        .map(|i| pool.run(fixture.job(i, 200)))
        .collect::<SearchResult<Vec<_>>>()?;
    while pool.running() < 2 {
        thread::sleep(Duration::from_millis(1));
    }

    let cancelled = pool.shutdown_now();
    assert_eq!(cancelled, 10);

    for handle in handles {
        match handle.wait() {
            Err(SearchError::TaskAborted(_)) | Err(SearchError::PoolClosed) => {}
            other => panic!("expected abort or rejection, got {:?}", other),
        }
    }

    // Aborted units may still be sleeping; nothing queued ever starts
    thread::sleep(Duration::from_millis(260));
    assert_eq!(fixture.order.lock().unwrap().len(), 2);
    assert!(matches!(
        pool.run(fixture.job(100, 1)),
        Err(SearchError::PoolClosed)
    ));

    // Late results of aborted tasks are not counted as finished work
    let stats = pool.metrics().get_stats();
    assert_eq!(stats.started, 2);
    assert_eq!(stats.aborted, 2);
    assert_eq!(stats.rejected, 8);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.failed, 0);
    Ok(())
}

#[test]
fn test_saturation_timeout() -> Result<()> {
    let fixture = Fixture::new();
    let pool = WorkerPool::new(Some(1))?;

    let blocker = pool.run(fixture.job(0, 200))?;
    let waiting = pool.run_with_queue_timeout(fixture.job(1, 1), Duration::from_millis(30))?;

    match waiting.wait() {
        Err(SearchError::PoolSaturationTimeout(budget)) => {
            assert_eq!(budget, Duration::from_millis(30))
        }
        other => panic!("expected saturation timeout, got {:?}", other),
    }
    assert_eq!(blocker.wait()?, 0);

    // The withdrawn task never ran
    assert_eq!(*fixture.order.lock().unwrap(), vec![0]);
    Ok(())
}
