// Background suggestion tasks.
//
// A suggestion is an independent, slow, fallible side effect. It must never
// gate sketch generation, so each request runs on its own thread and hands
// its result back over an `mpsc` channel:
//
// - `SuggestionTask::spawn()` starts the worker and returns immediately.
// - `poll()` checks for a finished result without blocking.
// - `wait(timeout)` blocks up to `timeout`; on expiry the task is marked
//   cancelled and `TimedOut` is returned.
// - `cancel()` marks the task cancelled. The worker skips the call if it has
//   not started yet and discards the result if it has.
//
// A blocking HTTP call cannot be interrupted mid-flight; cancellation only
// guarantees the caller never sees a stale result. The backend's own request
// timeout bounds how long an abandoned worker lingers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backend::{CompletionBackend, SuggestError};
use crate::prompt::IdeaPrompt;

/// What the caller gets back from a suggestion task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionOutcome {
    Ready(String),
    Failed(SuggestError),
    TimedOut,
    Cancelled,
}

impl SuggestionOutcome {
    /// User-facing one-line status for non-ready outcomes.
    pub fn status_message(&self) -> Option<String> {
        match self {
            SuggestionOutcome::Ready(_) => None,
            SuggestionOutcome::Failed(e) => Some(format!("Suggestion unavailable: {e}")),
            SuggestionOutcome::TimedOut => {
                Some("Suggestion unavailable: the language model did not answer in time".into())
            }
            SuggestionOutcome::Cancelled => Some("Suggestion cancelled".into()),
        }
    }
}

pub struct SuggestionTask {
    inbox: Receiver<Result<String, SuggestError>>,
    cancelled: Arc<AtomicBool>,
    _worker: JoinHandle<()>,
}

impl SuggestionTask {
    /// Start a suggestion request on a background thread.
    pub fn spawn(backend: Arc<dyn CompletionBackend>, prompt: IdeaPrompt) -> Self {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_worker = cancelled.clone();

        let worker = thread::spawn(move || {
            if cancelled_worker.load(Ordering::SeqCst) {
                return;
            }
            let result = backend.complete(&prompt);
            if cancelled_worker.load(Ordering::SeqCst) {
                return;
            }
            // The receiver may already be gone if the caller gave up.
            let _ = tx.send(result);
        });

        SuggestionTask {
            inbox: rx,
            cancelled,
            _worker: worker,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Non-blocking check. `None` while the worker is still running.
    pub fn poll(&self) -> Option<SuggestionOutcome> {
        if self.is_cancelled() {
            return Some(SuggestionOutcome::Cancelled);
        }
        match self.inbox.try_recv() {
            Ok(result) => Some(outcome_of(result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(SuggestionOutcome::Failed(SuggestError::TaskAborted))
            }
        }
    }

    /// Block for at most `timeout` waiting for the result.
    pub fn wait(self, timeout: Duration) -> SuggestionOutcome {
        if self.is_cancelled() {
            return SuggestionOutcome::Cancelled;
        }
        match self.inbox.recv_timeout(timeout) {
            Ok(result) => outcome_of(result),
            Err(RecvTimeoutError::Timeout) => {
                self.cancel();
                SuggestionOutcome::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => {
                if self.is_cancelled() {
                    SuggestionOutcome::Cancelled
                } else {
                    SuggestionOutcome::Failed(SuggestError::TaskAborted)
                }
            }
        }
    }
}

fn outcome_of(result: Result<String, SuggestError>) -> SuggestionOutcome {
    match result {
        Ok(text) => SuggestionOutcome::Ready(text),
        Err(e) => SuggestionOutcome::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct FixedBackend(Result<String, SuggestError>);

    impl CompletionBackend for FixedBackend {
        fn complete(&self, _prompt: &IdeaPrompt) -> Result<String, SuggestError> {
            self.0.clone()
        }
    }

    struct SlowBackend {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl CompletionBackend for SlowBackend {
        fn complete(&self, prompt: &IdeaPrompt) -> Result<String, SuggestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            Ok(format!("idea for {}", prompt.genre))
        }
    }

    fn prompt() -> IdeaPrompt {
        IdeaPrompt::new("Rock", "Intro", 140, "E Minor")
    }

    #[test]
    fn ready_result_is_returned() {
        let backend = Arc::new(FixedBackend(Ok("C - G - Am - F".into())));
        let task = SuggestionTask::spawn(backend, prompt());
        assert_eq!(
            task.wait(Duration::from_secs(5)),
            SuggestionOutcome::Ready("C - G - Am - F".into())
        );
    }

    #[test]
    fn backend_error_is_recoverable_outcome() {
        let backend = Arc::new(FixedBackend(Err(SuggestError::QuotaExceeded)));
        let task = SuggestionTask::spawn(backend, prompt());
        let outcome = task.wait(Duration::from_secs(5));
        assert_eq!(outcome, SuggestionOutcome::Failed(SuggestError::QuotaExceeded));
        assert!(outcome.status_message().unwrap().contains("quota"));
    }

    #[test]
    fn slow_backend_times_out_without_blocking() {
        let backend = Arc::new(SlowBackend {
            delay: Duration::from_millis(500),
            calls: AtomicUsize::new(0),
        });
        let start = Instant::now();
        let task = SuggestionTask::spawn(backend, prompt());
        assert_eq!(
            task.wait(Duration::from_millis(20)),
            SuggestionOutcome::TimedOut
        );
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn cancelled_task_reports_cancelled() {
        let backend = Arc::new(SlowBackend {
            delay: Duration::from_millis(100),
            calls: AtomicUsize::new(0),
        });
        let task = SuggestionTask::spawn(backend, prompt());
        task.cancel();
        assert_eq!(task.poll(), Some(SuggestionOutcome::Cancelled));
        assert_eq!(
            task.wait(Duration::from_secs(1)),
            SuggestionOutcome::Cancelled
        );
    }

    #[test]
    fn poll_eventually_sees_result() {
        let backend = Arc::new(SlowBackend {
            delay: Duration::from_millis(10),
            calls: AtomicUsize::new(0),
        });
        let task = SuggestionTask::spawn(backend.clone(), prompt());
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = loop {
            if let Some(outcome) = task.poll() {
                break outcome;
            }
            assert!(Instant::now() < deadline, "suggestion never finished");
            thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(outcome, SuggestionOutcome::Ready("idea for Rock".into()));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
