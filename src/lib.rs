//! PharmAssist core
//!
//! Client-side core of a multi-agent pharmaceutical research assistant.
//! [`AnalysisOrchestrator`] drives a seven-stage analysis either as a local
//! simulation or against a remote backend (with fallback to simulation), and
//! [`ChatHandler`] answers questions about the completed result. Both operate
//! on one shared [`Session`].

pub mod api;
pub mod catalog;
pub mod chat;
pub mod error;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod session;

pub use api::{AnalysisService, ChatService, HttpBackend};
pub use chat::ChatHandler;
pub use error::{Error, Result};
pub use models::{AnalysisRequest, AnalysisResult, AnalysisType, ChatMessage};
pub use orchestrator::{AnalysisOrchestrator, Timing};
pub use session::{RunId, Session, SessionState};
