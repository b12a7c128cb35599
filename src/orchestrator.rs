//! Analysis orchestration state machine.
//!
//! The orchestrator owns the lifecycle of the single in-flight analysis.
//! `start` resets the session synchronously and spawns one task keyed by a
//! fresh [`RunId`]. That task either simulates the seven agent steps
//! locally, or submits the job to the backend and polls it, mirroring the
//! backend's steps until it completes, errors or times out. Every remote
//! failure degrades to the local simulation.
//!
//! Tasks are never aborted. A superseded task notices on its next commit
//! (the session rejects mutations from a stale run) and exits.

use crate::api::{AnalysisService, AnalysisSummary, RemoteStatus};
use crate::catalog;
use crate::chat;
use crate::error::Result;
use crate::models::{AnalysisRequest, AnalysisResult, AnalysisType, StepStatus};
use crate::normalize;
use crate::pipeline::{self, STAGES};
use crate::session::{RunId, Session, SessionState};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Timing knobs for simulation, polling and the local chat responder.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Simulated duration per pipeline stage; missing entries use the
    /// stage default.
    pub step_durations: Vec<Duration>,
    /// Number of equal progress increments per simulated stage.
    pub progress_ticks: u32,
    pub poll_interval: Duration,
    /// Absolute limit on a remote analysis, counted from the start call.
    pub remote_timeout: Duration,
    /// Artificial latency of the local chat responder.
    pub chat_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            step_durations: pipeline::default_durations(),
            progress_ticks: 10,
            poll_interval: Duration::from_millis(1000),
            remote_timeout: Duration::from_secs(120),
            chat_delay: Duration::from_millis(1500),
        }
    }
}

impl Timing {
    /// Millisecond-scale timing for tests and demos.
    pub fn fast() -> Self {
        Self {
            step_durations: vec![Duration::from_millis(1); pipeline::STAGE_COUNT],
            progress_ticks: 10,
            poll_interval: Duration::from_millis(5),
            remote_timeout: Duration::from_secs(5),
            chat_delay: Duration::from_millis(1),
        }
    }

    pub fn step_duration(&self, index: usize) -> Duration {
        self.step_durations
            .get(index)
            .copied()
            .unwrap_or_else(|| Duration::from_millis(STAGES[index].duration_ms))
    }
}

/// Drives analysis runs against a [`Session`].
pub struct AnalysisOrchestrator {
    session: Session,
    backend: Option<Arc<dyn AnalysisService>>,
    timing: Timing,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator. `backend` is `Some` in remote mode; the mode
    /// is fixed for the orchestrator's lifetime.
    pub fn new(
        session: Session,
        backend: Option<Arc<dyn AnalysisService>>,
        timing: Timing,
    ) -> Self {
        Self {
            session,
            backend,
            timing,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_remote(&self) -> bool {
        self.backend.is_some()
    }

    /// Start a new analysis, superseding any run in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, request: AnalysisRequest) -> RunId {
        let run = self.session.begin_run(request.clone());
        info!(
            "Starting {} for {} ({} mode)",
            run,
            request.molecule_name(),
            if self.is_remote() { "remote" } else { "local" }
        );

        let task = RunTask {
            session: self.session.clone(),
            backend: self.backend.clone(),
            timing: self.timing.clone(),
            run,
            request,
        };
        tokio::spawn(task.execute());

        run
    }

    /// Validate the inputs and start an analysis.
    pub fn start_with(
        &self,
        molecule_name: &str,
        analysis_types: &[AnalysisType],
        additional_context: Option<String>,
    ) -> Result<RunId> {
        let request = AnalysisRequest::new(
            molecule_name,
            analysis_types.iter().copied(),
            additional_context,
        )?;
        Ok(self.start(request))
    }

    /// Clear all session state. In-flight network calls settle on their own
    /// and their results are discarded.
    pub fn reset(&self) {
        self.session.clear();
        info!("Session reset");
    }

    /// Past analyses from the backend; always empty in local mode.
    pub async fn history(&self, limit: usize, offset: usize) -> Result<Vec<AnalysisSummary>> {
        match &self.backend {
            Some(backend) => backend.list(limit, offset).await,
            None => Ok(Vec::new()),
        }
    }

    /// Wait for the current run to finish and return its result.
    pub async fn wait_for_completion(&self) -> Option<AnalysisResult> {
        self.session.wait_for_completion().await
    }
}

enum PollOutcome {
    Completed(Value),
    Failed(String),
    TimedOut,
    Superseded,
}

/// One spawned analysis run.
struct RunTask {
    session: Session,
    backend: Option<Arc<dyn AnalysisService>>,
    timing: Timing,
    run: RunId,
    request: AnalysisRequest,
}

impl RunTask {
    async fn execute(self) {
        match self.backend.clone() {
            Some(backend) => self.run_remote(backend.as_ref()).await,
            None => self.run_local().await,
        }
    }

    /// Apply a mutation if this run is still current.
    fn commit(&self, f: impl FnOnce(&mut SessionState)) -> bool {
        let applied = self.session.update_run(self.run, f);
        if !applied {
            debug!("{} superseded, stopping", self.run);
        }
        applied
    }

    /// Store the result and open the transcript in one transition.
    fn finish(&self, result: AnalysisResult) {
        let welcome = chat::welcome_message(&result);
        let insights = result.insights.len();
        let now = Utc::now();

        let committed = self.commit(move |state| {
            for step in state.steps.iter_mut() {
                if step.status != StepStatus::Completed {
                    step.complete(now);
                }
            }
            state.current_result = Some(result);
            state.is_analyzing = false;
            state.progress = 100.0;
            state.messages.push(welcome);
        });

        if committed {
            info!(
                "{} completed for {} with {} insights",
                self.run,
                self.request.molecule_name(),
                insights
            );
        }
    }

    /// Run all seven stages locally, then build the result from local data.
    async fn run_local(&self) {
        let ticks = self.timing.progress_ticks.max(1);
        let molecule = self.request.molecule_name().to_string();

        let reset = self.commit(|state| {
            state.reset_steps();
            state.analysis_id = None;
        });
        if !reset {
            return;
        }

        for (index, stage) in STAGES.iter().enumerate() {
            let increment = self.timing.step_duration(index) / ticks;
            let now = Utc::now();

            let begun = self.commit(|state| {
                state.steps[index].begin(now);
                let completed = state.completed_steps();
                state.raise_progress(pipeline::overall_progress(completed, 0.0));
            });
            if !begun {
                return;
            }
            debug!("{}: {} in progress", self.run, stage.name);

            for tick in 1..=ticks {
                tokio::time::sleep(increment).await;
                let step_progress = f64::from(tick) * 100.0 / f64::from(ticks);

                let advanced = self.commit(|state| {
                    state.steps[index].progress = step_progress;
                    let completed = state.completed_steps();
                    state.raise_progress(pipeline::overall_progress(completed, step_progress));
                });
                if !advanced {
                    return;
                }
            }

            let now = Utc::now();
            let output = format!("{} finished for {}", stage.name, molecule);
            let completed = self.commit(|state| {
                state.steps[index].complete(now);
                state.steps[index].output = Some(output);
                let completed = state.completed_steps();
                state.raise_progress(pipeline::overall_progress(completed, 0.0));
            });
            if !completed {
                return;
            }
        }

        self.finish(catalog::local_result(&self.request));
    }

    /// Submit to the backend and poll; fall back to local simulation on any
    /// failure.
    async fn run_remote(&self, backend: &dyn AnalysisService) {
        let deadline = Instant::now() + self.timing.remote_timeout;

        let started = backend
            .start(
                self.request.molecule_name(),
                self.request.analysis_types(),
                self.request.additional_context(),
            )
            .await;

        let analysis_id = match started {
            Ok(response) if !response.analysis_id.is_empty() => response.analysis_id,
            Ok(_) => {
                warn!("Backend accepted the analysis without an id, simulating locally");
                return self.run_local().await;
            }
            Err(e) => {
                warn!("Failed to start remote analysis, simulating locally: {}", e);
                return self.run_local().await;
            }
        };

        info!("{} submitted as remote analysis {}", self.run, analysis_id);
        if !self.commit(|state| state.analysis_id = Some(analysis_id.clone())) {
            return;
        }

        match self.poll(backend, &analysis_id, deadline).await {
            PollOutcome::Completed(results) => {
                let result = normalize::normalize_result(
                    &results,
                    self.request.molecule_name(),
                    &analysis_id,
                );
                self.finish(result);
            }
            PollOutcome::Failed(reason) => {
                error!(
                    "Remote analysis {} failed, simulating locally: {}",
                    analysis_id, reason
                );
                self.run_local().await;
            }
            PollOutcome::TimedOut => {
                warn!(
                    "Remote analysis {} timed out after {:?}, simulating locally",
                    analysis_id, self.timing.remote_timeout
                );
                self.run_local().await;
            }
            PollOutcome::Superseded => {}
        }
    }

    /// Poll until a terminal state. The interval and the deadline live in
    /// this one loop, so both are dropped together on return.
    async fn poll(
        &self,
        backend: &dyn AnalysisService,
        analysis_id: &str,
        deadline: Instant,
    ) -> PollOutcome {
        let period = self.timing.poll_interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let timeout = tokio::time::sleep_until(deadline);
        tokio::pin!(timeout);

        loop {
            tokio::select! {
                _ = &mut timeout => return PollOutcome::TimedOut,
                _ = interval.tick() => {}
            }

            if !self.session.is_current(self.run) {
                return PollOutcome::Superseded;
            }

            let polled = tokio::select! {
                _ = &mut timeout => return PollOutcome::TimedOut,
                polled = backend.get(analysis_id) => polled,
            };

            let status = match polled {
                Ok(status) => status,
                Err(e) => {
                    debug!("Poll of {} failed, retrying: {}", analysis_id, e);
                    continue;
                }
            };

            match status.status {
                RemoteStatus::Completed => {
                    return match status.results {
                        Some(results) => PollOutcome::Completed(results),
                        None => PollOutcome::Failed("completed without results".to_string()),
                    };
                }
                RemoteStatus::Error => {
                    return PollOutcome::Failed(
                        status.error.unwrap_or_else(|| "unspecified error".to_string()),
                    );
                }
                RemoteStatus::Pending | RemoteStatus::Processing => {
                    let now = Utc::now();
                    let mirrored = self.commit(|state| {
                        normalize::mirror_steps(&mut state.steps, &status.steps, now);
                        state.raise_progress(status.progress);
                    });
                    if !mirrored {
                        return PollOutcome::Superseded;
                    }
                }
            }
        }
    }
}
