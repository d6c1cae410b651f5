use std::sync::Arc;
use std::time::Duration;

use taskview_shared::{api::SummaryRequest, Task};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::backend::TaskBackend;

pub const SUMMARY_DEBOUNCE: Duration = Duration::from_secs(1);

/// Shown in place of a summary when generation fails.
pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate summary at this time.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPhase {
    Idle,
    /// Waiting out the debounce delay.
    Pending,
    InFlight,
}

/// Identity of a request: the task ids of both groups, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TaskSetKey {
    project: Vec<String>,
    other: Vec<String>,
}

impl TaskSetKey {
    fn of(project_tasks: &[Task], other_tasks: &[Task]) -> Self {
        let ids = |tasks: &[Task]| -> Vec<String> {
            tasks.iter().map(|t| t.id.clone()).collect()
        };
        Self {
            project: ids(project_tasks),
            other: ids(other_tasks),
        }
    }
}

#[derive(Debug)]
struct State {
    phase: SummaryPhase,
    summary: Option<String>,
    last_key: Option<TaskSetKey>,
    /// Bumped per accepted request; results of older generations are dropped.
    generation: u64,
}

/// Debounced, cancellable "can I finish all this today" summaries.
///
/// A new request replaces a pending one and cancels one in flight, so only
/// the latest task set ever produces a visible summary.
pub struct SummaryCoordinator<B> {
    backend: Arc<B>,
    debounce: Duration,
    state: Arc<Mutex<State>>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl<B: TaskBackend + 'static> SummaryCoordinator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            debounce: SUMMARY_DEBOUNCE,
            state: Arc::new(Mutex::new(State {
                phase: SummaryPhase::Idle,
                summary: None,
                last_key: None,
                generation: 0,
            })),
            cancel: None,
            handle: None,
        }
    }

    pub async fn phase(&self) -> SummaryPhase {
        self.state.lock().await.phase
    }

    pub async fn summary(&self) -> Option<String> {
        self.state.lock().await.summary.clone()
    }

    /// Asks for a summary of the given tasks.
    ///
    /// Requests for the same task ids as the previous one are ignored.
    /// `immediate` skips the debounce and waits for the result.
    pub async fn request(
        &mut self,
        project_tasks: Vec<Task>,
        other_tasks: Vec<Task>,
        immediate: bool,
    ) {
        let key = TaskSetKey::of(&project_tasks, &other_tasks);
        let generation = {
            let mut state = self.state.lock().await;
            if state.last_key.as_ref() == Some(&key) {
                tracing::debug!("Summary already requested for these tasks");
                return;
            }
            state.last_key = Some(key);
            state.generation += 1;
            state.phase = if immediate {
                SummaryPhase::InFlight
            } else {
                SummaryPhase::Pending
            };
            state.generation
        };

        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());

        let job = Job {
            state: self.state.clone(),
            token,
            generation,
            request: SummaryRequest {
                project_tasks,
                other_tasks,
            },
            delay: (!immediate).then_some(self.debounce),
        };
        let handle = tokio::spawn(job.run(self.backend.clone()));

        if immediate {
            self.handle = None;
            if let Err(e) = handle.await {
                tracing::error!("Summary task failed: {}", e);
            }
        } else {
            self.handle = Some(handle);
        }
    }

    /// Waits until the latest scheduled request has finished or been dropped.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Summary task failed: {}", e);
            }
        }
    }
}

struct Job {
    state: Arc<Mutex<State>>,
    token: CancellationToken,
    generation: u64,
    request: SummaryRequest,
    delay: Option<Duration>,
}

impl Job {
    async fn run<B: TaskBackend>(self, backend: Arc<B>) {
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let mut state = self.state.lock().await;
            if state.generation != self.generation {
                return;
            }
            state.phase = SummaryPhase::InFlight;
        }

        let result = tokio::select! {
            _ = self.token.cancelled() => {
                tracing::debug!(generation = self.generation, "Summary request superseded");
                return;
            }
            result = backend.summarize(&self.request) => result,
        };

        let mut state = self.state.lock().await;
        if state.generation != self.generation {
            return;
        }
        state.summary = Some(match result {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Error generating summary: {}", e);
                SUMMARY_UNAVAILABLE.to_string()
            }
        });
        state.phase = SummaryPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::fake::{raw, FakeBackend};

    fn task(id: &str) -> Task {
        Task::from_raw(raw(id, None), "Work", "Reports")
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_requests_collapse_into_one() {
        let backend = Arc::new(FakeBackend::default());
        let mut summaries = SummaryCoordinator::new(backend.clone());

        summaries.request(vec![task("1")], vec![], false).await;
        assert_eq!(summaries.phase().await, SummaryPhase::Pending);
        summaries
            .request(vec![task("1")], vec![task("2")], false)
            .await;
        summaries.settle().await;

        assert_eq!(backend.calls(), vec!["summarize 1,2"]);
        assert_eq!(summaries.summary().await.as_deref(), Some("summary of 1,2"));
        assert_eq!(summaries.phase().await, SummaryPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn same_task_ids_are_ignored() {
        let backend = Arc::new(FakeBackend::default());
        let mut summaries = SummaryCoordinator::new(backend.clone());

        summaries.request(vec![task("1")], vec![], true).await;
        summaries.request(vec![task("1")], vec![], true).await;
        summaries.request(vec![task("1")], vec![], false).await;
        summaries.settle().await;

        assert_eq!(backend.count("summarize"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_discards_in_flight_result() {
        let backend = Arc::new(FakeBackend::default());
        *backend.summary_delay.lock().unwrap() = Some(Duration::from_secs(5));
        let mut summaries = SummaryCoordinator::new(backend.clone());

        summaries.request(vec![task("1")], vec![], false).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(summaries.phase().await, SummaryPhase::InFlight);

        summaries.request(vec![task("2")], vec![], true).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(backend.calls(), vec!["summarize 1", "summarize 2"]);
        assert_eq!(summaries.summary().await.as_deref(), Some("summary of 2"));
        assert_eq!(summaries.phase().await, SummaryPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_shows_fallback_text() {
        let backend = Arc::new(FakeBackend::default());
        *backend.fail_summary.lock().unwrap() = true;
        let mut summaries = SummaryCoordinator::new(backend.clone());

        summaries.request(vec![], vec![task("3")], true).await;
        assert_eq!(summaries.summary().await.as_deref(), Some(SUMMARY_UNAVAILABLE));
        assert_eq!(summaries.phase().await, SummaryPhase::Idle);
    }
}
