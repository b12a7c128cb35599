//! The fixed seven-stage agent pipeline.
//!
//! Step order, display names and default simulated durations live here,
//! together with the global progress formula the progress view binds to.

use crate::models::AgentStep;
use std::time::Duration;

/// Static definition of one pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct StageDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Default wall-clock duration of the simulated stage, in milliseconds.
    pub duration_ms: u64,
}

/// Pipeline stages in execution order.
pub const STAGES: [StageDef; 7] = [
    StageDef {
        id: "coordination",
        name: "Query Coordinator",
        description: "Parsing the research query and dispatching specialist agents",
        duration_ms: 1500,
    },
    StageDef {
        id: "clinical",
        name: "Clinical Trials Agent",
        description: "Searching clinical trial registries and outcomes",
        duration_ms: 2000,
    },
    StageDef {
        id: "market",
        name: "Market Intelligence Agent",
        description: "Analyzing market size, share and competitors",
        duration_ms: 1800,
    },
    StageDef {
        id: "patent",
        name: "Patent Analyzer",
        description: "Reviewing patent protection and expiry",
        duration_ms: 1600,
    },
    StageDef {
        id: "regulatory",
        name: "Regulatory Scanner",
        description: "Checking FDA and EMA approval status",
        duration_ms: 1700,
    },
    StageDef {
        id: "safety",
        name: "Safety Profiler",
        description: "Collecting adverse events and label warnings",
        duration_ms: 1900,
    },
    StageDef {
        id: "synthesis",
        name: "Insight Synthesizer",
        description: "Generating insights from all agent outputs",
        duration_ms: 2200,
    },
];

/// Number of pipeline stages.
pub const STAGE_COUNT: usize = STAGES.len();

/// Build a freshly reset step list (all pending, progress 0).
pub fn initial_steps() -> Vec<AgentStep> {
    STAGES
        .iter()
        .map(|stage| AgentStep::new(stage.id, stage.name, stage.description))
        .collect()
}

/// Default per-stage durations.
pub fn default_durations() -> Vec<Duration> {
    STAGES
        .iter()
        .map(|stage| Duration::from_millis(stage.duration_ms))
        .collect()
}

/// Global progress in percent:
/// `(completed_steps + current_step_fraction) / total_steps * 100`.
///
/// `current_step_progress` is the running step's own progress in `[0, 100]`.
pub fn overall_progress(completed_steps: usize, current_step_progress: f64) -> f64 {
    let fraction = (current_step_progress / 100.0).clamp(0.0, 1.0);
    (completed_steps as f64 + fraction) / STAGE_COUNT as f64 * 100.0
}

/// Lowercased first word of a step name, used to match backend step names.
pub fn match_key(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}
