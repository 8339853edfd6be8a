//! Bounded worker pool.
//!
//! A fixed set of execution units, one OS thread each, pulls tasks from a
//! shared FIFO queue. The queue, the per-unit bookkeeping and the lifecycle
//! phase live behind a single mutex; a condition variable on the same mutex
//! wakes idle units when work arrives or the pool starts shutting down.
//!
//! Each submission gets its own one-shot channel, so callers only ever wait on
//! their own result. A task that panics is reported to its caller as
//! [`SearchError::ExecutionFailure`] and the unit goes back to idle.
//!
//! # Shutdown
//!
//! * [`WorkerPool::shutdown_graceful`] runs everything already queued, then
//!   joins the units.
//! * [`WorkerPool::cancel_pending`] lets running tasks finish and rejects the
//!   queue with [`SearchError::PoolClosed`].
//! * [`WorkerPool::shutdown_now`] rejects the queue and aborts running tasks;
//!   their callers get [`SearchError::TaskAborted`] straight away and late
//!   results are discarded.

pub mod handle;
pub mod task;

pub use handle::{MatchHandle, TaskHandle, TextHandle};
pub use task::{ExtractRequest, Job, MatchRequest, Task, TaskOutput};

use crossbeam_channel::{bounded, Sender};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::errors::{SearchError, SearchResult};
use crate::metrics::PoolMetrics;
use crate::results::Match;
use crate::search::matcher::SearchSpec;

/// Upper bound on the number of execution units
pub const MAX_CAPACITY: usize = 100;

/// Resolves the requested capacity to a unit count in `[1, MAX_CAPACITY]`.
///
/// Without a request, half the available parallelism is used.
pub fn resolve_capacity(requested: Option<usize>) -> usize {
    requested
        .unwrap_or_else(|| num_cpus::get() / 2)
        .clamp(1, MAX_CAPACITY)
}

/// Identifier of a submitted task, unique within one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Reply<O> = Sender<SearchResult<O>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    /// Not accepting; units exit once the queue is empty
    Draining,
    /// Not accepting; units exit as soon as they are idle
    Closed,
}

struct QueuedTask<J: Job> {
    id: TaskId,
    job: J,
    reply: Reply<J::Output>,
    queue_deadline: Option<(Instant, Duration)>,
}

struct RunningTask<O> {
    id: TaskId,
    name: &'static str,
    reply: Reply<O>,
}

struct Unit<O> {
    running: Option<RunningTask<O>>,
    alive: bool,
}

struct PoolState<J: Job> {
    phase: Phase,
    queue: VecDeque<QueuedTask<J>>,
    units: Vec<Unit<J::Output>>,
    next_id: u64,
    /// Set by `shutdown_now`; busy units are no longer waited for
    detached: bool,
}

impl<J: Job> PoolState<J> {
    fn live_count(&self) -> usize {
        self.units.iter().filter(|u| u.alive).count()
    }

    fn running_count(&self) -> usize {
        self.units.iter().filter(|u| u.running.is_some()).count()
    }

    /// Rejects every queued task with `PoolClosed`
    fn reject_queue(&mut self) -> usize {
        let rejected = self.queue.len();
        for task in self.queue.drain(..) {
            let _ = task.reply.send(Err(SearchError::PoolClosed));
        }
        rejected
    }
}

pub(crate) struct Shared<J: Job> {
    state: Mutex<PoolState<J>>,
    work_available: Condvar,
    unit_exited: Condvar,
    metrics: PoolMetrics,
}

impl<J: Job> Shared<J> {
    /// Removes a still-queued task. Returns false once a unit has picked it up.
    pub(crate) fn withdraw(&self, id: TaskId) -> bool {
        let mut state = self.state.lock();
        match state.queue.iter().position(|t| t.id == id) {
            Some(pos) => {
                state.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

/// A pool of `capacity` execution units running jobs of type `J`
pub struct WorkerPool<J: Job> {
    shared: Arc<Shared<J>>,
    capacity: usize,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl<J: Job> WorkerPool<J> {
    /// Starts a pool. See [`resolve_capacity`] for how `capacity` is clamped.
    pub fn new(capacity: Option<usize>) -> SearchResult<Self> {
        let capacity = resolve_capacity(capacity);
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                phase: Phase::Open,
                queue: VecDeque::new(),
                units: (0..capacity)
                    .map(|_| Unit {
                        running: None,
                        alive: true,
                    })
                    .collect(),
                next_id: 0,
                detached: false,
            }),
            work_available: Condvar::new(),
            unit_exited: Condvar::new(),
            metrics: PoolMetrics::new(),
        });

        let mut threads = Vec::with_capacity(capacity);
        for index in 0..capacity {
            let unit_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("phrasescout-unit-{}", index))
                .spawn(move || unit_loop(unit_shared, index));
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    error!("Failed to start pool unit {}: {}", index, e);
                    shared.state.lock().phase = Phase::Closed;
                    shared.work_available.notify_all();
                    return Err(SearchError::IoError(e));
                }
            }
        }

        info!("Started worker pool with {} units", capacity);
        Ok(Self {
            shared,
            capacity,
            threads: Mutex::new(threads),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> &PoolMetrics {
        self.shared.metrics()
    }

    /// Number of tasks currently executing
    pub fn running(&self) -> usize {
        self.shared.state.lock().running_count()
    }

    /// Number of tasks waiting for a unit
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Number of units whose thread has not exited yet
    pub fn live_units(&self) -> usize {
        self.shared.state.lock().live_count()
    }

    /// Whether the pool still accepts submissions
    pub fn is_open(&self) -> bool {
        self.shared.state.lock().phase == Phase::Open
    }

    /// Queues a job and returns a handle to its result
    pub fn run(&self, job: J) -> SearchResult<TaskHandle<J>> {
        self.enqueue(job, None)
    }

    /// Like [`run`](Self::run), but the task fails with
    /// [`SearchError::PoolSaturationTimeout`] if no unit picks it up within
    /// `budget`.
    pub fn run_with_queue_timeout(&self, job: J, budget: Duration) -> SearchResult<TaskHandle<J>> {
        self.enqueue(job, Some(budget))
    }

    fn enqueue(&self, job: J, budget: Option<Duration>) -> SearchResult<TaskHandle<J>> {
        let name = job.name();
        let (reply, receiver) = bounded(1);
        let queue_deadline = budget.map(|b| (Instant::now() + b, b));

        let id = {
            let mut state = self.shared.state.lock();
            if state.phase != Phase::Open {
                return Err(SearchError::PoolClosed);
            }
            state.next_id += 1;
            let id = TaskId(state.next_id);
            state.queue.push_back(QueuedTask {
                id,
                job,
                reply,
                queue_deadline,
            });
            self.shared.metrics.record_submitted(state.queue.len());
            id
        };
        self.shared.work_available.notify_one();

        trace!("Queued task {} ({})", id, name);
        Ok(TaskHandle::new(
            id,
            name,
            receiver,
            Arc::clone(&self.shared),
            queue_deadline,
        ))
    }

    /// `true` drains the queue, `false` aborts everything outstanding
    pub fn shutdown(&self, graceful: bool) {
        if graceful {
            self.shutdown_graceful();
        } else {
            self.shutdown_now();
        }
    }

    /// Stops accepting work, runs every queued task and joins the units
    pub fn shutdown_graceful(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.phase == Phase::Open {
                state.phase = Phase::Draining;
                info!("Draining worker pool, {} tasks queued", state.queue.len());
            }
        }
        self.shared.work_available.notify_all();
        self.join_units();
    }

    /// Stops accepting work, rejects queued tasks and waits for running ones.
    ///
    /// Returns how many queued tasks were rejected.
    pub fn cancel_pending(&self) -> usize {
        let rejected = {
            let mut state = self.shared.state.lock();
            state.phase = Phase::Closed;
            state.reject_queue()
        };
        self.shared.work_available.notify_all();
        self.shared.metrics.record_rejected(rejected);
        info!("Cancelled {} queued tasks", rejected);
        self.join_units();
        rejected
    }

    /// Stops accepting work, rejects queued tasks and aborts running ones.
    ///
    /// Units still busy are detached; whatever they produce is dropped.
    /// Returns how many tasks were rejected or aborted.
    pub fn shutdown_now(&self) -> usize {
        let (rejected, aborted) = {
            let mut state = self.shared.state.lock();
            state.phase = Phase::Closed;
            state.detached = true;
            let rejected = state.reject_queue();
            let mut aborted = 0;
            for unit in state.units.iter_mut() {
                if let Some(task) = unit.running.take() {
                    debug!("Aborting task {} ({})", task.id, task.name);
                    let _ = task.reply.send(Err(SearchError::TaskAborted(task.name.to_string())));
                    aborted += 1;
                }
            }
            (rejected, aborted)
        };
        self.shared.work_available.notify_all();
        self.shared.metrics.record_rejected(rejected);
        self.shared.metrics.record_aborted(aborted);
        info!(
            "Forced worker pool shutdown: {} queued rejected, {} running aborted",
            rejected, aborted
        );

        // Idle units exit on their own once woken
        self.threads.lock().clear();
        self.shared.unit_exited.notify_all();
        rejected + aborted
    }

    /// Joins the units, or waits for the caller already joining them
    fn join_units(&self) {
        let threads: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in threads {
            if handle.join().is_err() {
                warn!("Pool unit exited abnormally");
            }
        }

        let mut state = self.shared.state.lock();
        while !state.detached && state.live_count() > 0 {
            self.shared.unit_exited.wait(&mut state);
        }
        debug!("All pool units joined");
    }
}

impl<J: Job> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        if self.is_open() {
            self.shutdown_graceful();
        }
    }
}

impl<J: Job> fmt::Debug for WorkerPool<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity)
            .field("phase", &state.phase)
            .field("queued", &state.queue.len())
            .field("running", &state.running_count())
            .finish()
    }
}

/// Convenience submissions for the built-in task kinds
impl WorkerPool<Task> {
    /// Validates the request, then queues it.
    ///
    /// Invalid searches or options fail here, before anything is dispatched.
    pub fn submit_match(&self, request: MatchRequest) -> SearchResult<MatchHandle> {
        request.validate()?;
        self.run(Task::MatchText(request)).map(MatchHandle)
    }

    pub fn submit_match_with_queue_timeout(
        &self,
        request: MatchRequest,
        budget: Duration,
    ) -> SearchResult<MatchHandle> {
        request.validate()?;
        self.run_with_queue_timeout(Task::MatchText(request), budget)
            .map(MatchHandle)
    }

    pub fn submit_extract(&self, request: ExtractRequest) -> SearchResult<TextHandle> {
        self.run(Task::ExtractText(request)).map(TextHandle)
    }

    /// Runs a match on the pool and waits for it
    pub fn match_text(
        &self,
        text: impl Into<String>,
        searches: Vec<SearchSpec>,
        exact: bool,
    ) -> SearchResult<Vec<Match>> {
        self.submit_match(MatchRequest::new(text, searches, exact))?
            .wait()
    }
}

fn unit_loop<J: Job>(shared: Arc<Shared<J>>, index: usize) {
    trace!("Pool unit {} started", index);
    loop {
        let (id, job) = {
            let mut state = shared.state.lock();
            loop {
                if state.phase == Phase::Closed {
                    state.units[index].alive = false;
                    shared.unit_exited.notify_all();
                    trace!("Pool unit {} stopped", index);
                    return;
                }
                if let Some(task) = state.queue.pop_front() {
                    if let Some((deadline, budget)) = task.queue_deadline {
                        if Instant::now() >= deadline {
                            warn!("Task {} expired in the queue", task.id);
                            shared.metrics.record_timed_out();
                            let _ = task.reply.send(Err(SearchError::PoolSaturationTimeout(budget)));
                            continue;
                        }
                    }
                    let QueuedTask { id, job, reply, .. } = task;
                    state.units[index].running = Some(RunningTask {
                        id,
                        name: job.name(),
                        reply,
                    });
                    let running = state.running_count();
                    shared.metrics.record_started(running);
                    break (id, job);
                }
                if state.phase == Phase::Draining {
                    state.units[index].alive = false;
                    shared.unit_exited.notify_all();
                    trace!("Pool unit {} drained", index);
                    return;
                }
                shared.work_available.wait(&mut state);
            }
        };

        let name = job.name();
        debug!("Unit {} running task {} ({})", index, id, name);
        let result = match panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Task {} ({}) panicked: {}", id, name, message);
                Err(SearchError::execution_failure(name, message))
            }
        };
        // An aborted task was already counted by `shutdown_now`
        let reply = {
            let mut state = shared.state.lock();
            let reply = state.units[index].running.take();
            if reply.is_some() {
                shared.metrics.record_finished(result.is_ok());
            }
            reply
        };
        match reply {
            Some(task) => {
                // The caller may have stopped waiting
                let _ = task.reply.send(result);
            }
            None => debug!("Discarded result of aborted task {}", id),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
