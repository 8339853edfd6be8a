use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use super::task::{Task, TaskOutput};
use super::{Job, Shared, TaskId};
use crate::errors::{SearchError, SearchResult};
use crate::results::Match;

/// Pending result of a submitted task.
///
/// Waiting consumes the handle. Dropping it without waiting leaves the task to
/// run; its result is discarded.
pub struct TaskHandle<J: Job> {
    id: TaskId,
    name: &'static str,
    receiver: Receiver<SearchResult<J::Output>>,
    shared: Arc<Shared<J>>,
    queue_budget: Option<(Instant, Duration)>,
}

impl<J: Job> TaskHandle<J> {
    pub(crate) fn new(
        id: TaskId,
        name: &'static str,
        receiver: Receiver<SearchResult<J::Output>>,
        shared: Arc<Shared<J>>,
        queue_budget: Option<(Instant, Duration)>,
    ) -> Self {
        Self {
            id,
            name,
            receiver,
            shared,
            queue_budget,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Blocks until the task completes, fails or is rejected
    pub fn wait(self) -> SearchResult<J::Output> {
        self.wait_inner(None)
    }

    /// Blocks for at most `timeout`.
    ///
    /// A task still queued when the budget runs out is withdrawn; one already
    /// running is left to finish and its result dropped.
    pub fn wait_timeout(self, timeout: Duration) -> SearchResult<J::Output> {
        self.wait_inner(Some(timeout))
    }

    /// Returns the result if it is already available
    pub fn try_wait(&self) -> Option<SearchResult<J::Output>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.lost())),
        }
    }

    fn lost(&self) -> SearchError {
        SearchError::execution_failure(self.name, "worker dropped the task without a result")
    }

    fn wait_inner(self, timeout: Option<Duration>) -> SearchResult<J::Output> {
        let task_deadline = timeout.map(|t| Instant::now() + t);
        let mut queue_budget = self.queue_budget;

        loop {
            let next_deadline = match (queue_budget.map(|(at, _)| at), task_deadline) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            let received = match next_deadline {
                Some(deadline) => self.receiver.recv_deadline(deadline),
                None => self
                    .receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(result) => return result,
                Err(RecvTimeoutError::Disconnected) => return Err(self.lost()),
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();

                    if let Some((deadline, budget)) = queue_budget {
                        if now >= deadline {
                            if self.shared.withdraw(self.id) {
                                self.shared.metrics.record_timed_out();
                                warn!("Task {} ({}) gave up waiting for a unit", self.id, self.name);
                                return Err(SearchError::PoolSaturationTimeout(budget));
                            }
                            // Already running, only the task deadline applies now
                            queue_budget = None;
                        }
                    }

                    if let (Some(deadline), Some(timeout)) = (task_deadline, timeout) {
                        if now >= deadline {
                            self.shared.withdraw(self.id);
                            return Err(SearchError::task_timeout(self.name, timeout));
                        }
                    }
                }
            }
        }
    }
}

impl<J: Job> std::fmt::Debug for TaskHandle<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Handle for a [`Task::MatchText`] submission
#[derive(Debug)]
pub struct MatchHandle(pub(crate) TaskHandle<Task>);

impl MatchHandle {
    pub fn id(&self) -> TaskId {
        self.0.id()
    }

    pub fn wait(self) -> SearchResult<Vec<Match>> {
        self.0.wait().and_then(TaskOutput::into_matches)
    }

    pub fn wait_timeout(self, timeout: Duration) -> SearchResult<Vec<Match>> {
        self.0.wait_timeout(timeout).and_then(TaskOutput::into_matches)
    }
}

/// Handle for a [`Task::ExtractText`] submission
#[derive(Debug)]
pub struct TextHandle(pub(crate) TaskHandle<Task>);

impl TextHandle {
    pub fn id(&self) -> TaskId {
        self.0.id()
    }

    pub fn wait(self) -> SearchResult<String> {
        self.0.wait().and_then(TaskOutput::into_text)
    }

    pub fn wait_timeout(self, timeout: Duration) -> SearchResult<String> {
        self.0.wait_timeout(timeout).and_then(TaskOutput::into_text)
    }
}
