//! Session state container.
//!
//! One `Session` holds everything a results view observes: the current
//! request and result, the agent steps, the global progress signal and the
//! chat transcript. It is shared (cheaply cloned) between the orchestrator
//! and the chat handler and published through a `tokio::sync::watch`
//! channel so consumers can render every transition.
//!
//! Every run-scoped mutation carries the [`RunId`] captured when the run
//! started; a mutation from a superseded run is silently dropped.

use crate::models::{AgentStep, AnalysisRequest, AnalysisResult, ChatMessage};
use crate::pipeline;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Identity of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Snapshot of the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub run_id: RunId,
    pub current_request: Option<AnalysisRequest>,
    pub current_result: Option<AnalysisResult>,
    /// Backend job id while a remote analysis is being polled.
    pub analysis_id: Option<String>,
    pub steps: Vec<AgentStep>,
    pub is_analyzing: bool,
    /// Global progress in percent.
    pub progress: f64,
    pub messages: Vec<ChatMessage>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            run_id: RunId(0),
            current_request: None,
            current_result: None,
            analysis_id: None,
            steps: pipeline::initial_steps(),
            is_analyzing: false,
            progress: 0.0,
            messages: Vec::new(),
        }
    }

    /// Raise global progress; it never moves backwards within a run.
    pub(crate) fn raise_progress(&mut self, value: f64) {
        let value = value.clamp(0.0, 100.0);
        if value > self.progress {
            self.progress = value;
        }
    }

    pub(crate) fn reset_steps(&mut self) {
        self.steps = pipeline::initial_steps();
    }

    /// Number of steps completed so far.
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == crate::models::StepStatus::Completed)
            .count()
    }
}

/// Shared handle to one session.
#[derive(Clone)]
pub struct Session {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::new());
        Self { tx: Arc::new(tx) }
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Receive a notification on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn current_run(&self) -> RunId {
        self.tx.borrow().run_id
    }

    pub fn is_current(&self, run: RunId) -> bool {
        self.current_run() == run
    }

    /// Wait until no analysis is in flight and return the stored result.
    pub async fn wait_for_completion(&self) -> Option<AnalysisResult> {
        let mut rx = self.subscribe();
        // Bound to a local so the borrow guard drops before `rx`
        let result = match rx.wait_for(|state| !state.is_analyzing).await {
            Ok(state) => state.current_result.clone(),
            Err(_) => None,
        };
        result
    }

    /// Open a new run: supersede the previous one and reset all run-scoped
    /// state, including the transcript.
    pub(crate) fn begin_run(&self, request: AnalysisRequest) -> RunId {
        let mut run = RunId(0);
        self.tx.send_modify(|state| {
            state.run_id = RunId(state.run_id.0 + 1);
            state.current_request = Some(request);
            state.current_result = None;
            state.analysis_id = None;
            state.reset_steps();
            state.is_analyzing = true;
            state.progress = 0.0;
            state.messages.clear();
            run = state.run_id;
        });
        run
    }

    /// Clear everything and supersede any in-flight run.
    pub(crate) fn clear(&self) {
        self.tx.send_modify(|state| {
            let next = RunId(state.run_id.0 + 1);
            *state = SessionState::new();
            state.run_id = next;
        });
    }

    /// Apply `f` only if `run` is still the active run.
    ///
    /// Returns `false` when the run has been superseded; callers should stop.
    pub(crate) fn update_run(&self, run: RunId, f: impl FnOnce(&mut SessionState)) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if state.run_id != run {
                return false;
            }
            f(state);
            applied = true;
            true
        });
        applied
    }

    /// Append a message to the transcript regardless of run state.
    pub(crate) fn push_message(&self, message: ChatMessage) {
        self.tx.send_modify(|state| state.messages.push(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisType;

    fn request(name: &str) -> AnalysisRequest {
        AnalysisRequest::new(name, [AnalysisType::Market], None).unwrap()
    }

    #[test]
    fn test_begin_run_resets_state() {
        let session = Session::new();
        session.push_message(ChatMessage::user("hello"));

        let run = session.begin_run(request("Aspirin"));
        let state = session.snapshot();
        assert_eq!(state.run_id, run);
        assert!(state.is_analyzing);
        assert_eq!(state.progress, 0.0);
        assert!(state.messages.is_empty());
        assert_eq!(state.steps.len(), pipeline::STAGE_COUNT);
    }

    #[test]
    fn test_stale_run_updates_are_dropped() {
        let session = Session::new();
        let first = session.begin_run(request("Aspirin"));
        let second = session.begin_run(request("Metformin"));
        assert_ne!(first, second);

        assert!(!session.update_run(first, |s| s.progress = 50.0));
        assert_eq!(session.snapshot().progress, 0.0);
        assert!(session.update_run(second, |s| s.raise_progress(20.0)));
        assert_eq!(session.snapshot().progress, 20.0);
    }

    #[test]
    fn test_progress_never_regresses() {
        let session = Session::new();
        let run = session.begin_run(request("Aspirin"));
        session.update_run(run, |s| s.raise_progress(40.0));
        session.update_run(run, |s| s.raise_progress(10.0));
        assert_eq!(session.snapshot().progress, 40.0);
    }

    #[test]
    fn test_clear_supersedes_run() {
        let session = Session::new();
        let run = session.begin_run(request("Aspirin"));
        session.clear();
        let state = session.snapshot();
        assert!(!session.is_current(run));
        assert!(!state.is_analyzing);
        assert!(state.current_request.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_completion_returns_when_idle() {
        let session = Session::new();
        let run = session.begin_run(request("Aspirin"));

        let waiter = session.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_completion().await });

        session.update_run(run, |s| {
            s.current_result = Some(crate::catalog::sample_result());
            s.is_analyzing = false;
        });

        let result = handle.await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_wait_for_completion_after_clear() {
        let session = Session::new();
        session.begin_run(request("Aspirin"));

        let waiter = session.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_completion().await });

        session.clear();

        assert!(handle.await.unwrap().is_none());
        assert!(session.wait_for_completion().await.is_none());
    }
}
