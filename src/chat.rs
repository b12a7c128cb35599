//! Conversational query handler.
//!
//! Owns the chat transcript of the active analysis. Each user message gets
//! exactly one assistant reply, either from the remote chat service or from
//! the local keyword responder, which interpolates live fields from the
//! current result.

use crate::api::ChatService;
use crate::models::{AnalysisResult, ChatMessage};
use crate::session::{RunId, Session};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Topic recognized by the local responder, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Market,
    Clinical,
    Patent,
    Competitor,
}

const TOPIC_KEYWORDS: [(Topic, &[&str]); 4] = [
    (Topic::Market, &["market", "growth", "revenue"]),
    (Topic::Clinical, &["clinical", "trial", "study"]),
    (Topic::Patent, &["patent", "expire", "protection", "ip"]),
    (
        Topic::Competitor,
        &["competitor", "competition", "alternative", "safety", "side-effect"],
    ),
];

/// Classify a message by case-insensitive substring match; the first
/// matching topic in priority order wins.
pub fn classify(text: &str) -> Option<Topic> {
    let lowered = text.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(topic, _)| *topic)
}

/// Format a USD amount in billions, e.g. `$21.5B`.
pub fn format_billions(usd: f64) -> String {
    format!("${:.1}B", usd / 1_000_000_000.0)
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

/// Produce the local responder's reply for `text`.
pub fn local_reply(text: &str, result: Option<&AnalysisResult>) -> String {
    let Some(result) = result else {
        return "Run an analysis first, then ask me about market size, clinical trials, \
                patent protection or competitors."
            .to_string();
    };

    let name = &result.molecule_data.name;
    let market = &result.market_data;
    let patent = &result.patent_info;
    let regulatory = &result.regulatory_status;

    match classify(text) {
        Some(Topic::Market) => format!(
            "The market for {} is valued at {} and growing at {:.1}% per year, \
             with {} holding a {:.1}% market share.",
            name,
            format_billions(market.market_size),
            market.growth_rate,
            name,
            market.market_share
        ),
        Some(Topic::Clinical) => {
            let phases: Vec<String> = result
                .clinical_trials
                .iter()
                .map(|t| format!("{} ({}, {})", t.title, t.phase, t.status))
                .collect();
            format!(
                "{} has {} clinical trials on record: {}. FDA status: {}, EMA status: {}. \
                 Approved indications: {}.",
                name,
                result.clinical_trials.len(),
                join_or(&phases, "none found"),
                regulatory.fda,
                regulatory.ema,
                join_or(&regulatory.approved_indications, "none listed")
            )
        }
        Some(Topic::Patent) => format!(
            "The key patent for {} is {} (\"{}\"), currently {}, with expiry on {}.",
            name, patent.patent_number, patent.title, patent.status, patent.expiry_date
        ),
        Some(Topic::Competitor) => {
            let competitors: Vec<String> = market
                .competitors
                .iter()
                .map(|c| format!("{} ({:.1}% share)", c.name, c.market_share))
                .collect();
            format!(
                "The main competitors to {} are {}.",
                name,
                join_or(&competitors, "not identified yet")
            )
        }
        None => format!(
            "I can help you explore the analysis of {}. Ask me about market size and growth, \
             clinical trials, patent protection, or competitors.",
            name
        ),
    }
}

/// The assistant message that opens the transcript of a completed analysis.
pub fn welcome_message(result: &AnalysisResult) -> ChatMessage {
    ChatMessage::assistant(format!(
        "I've completed the analysis of {}. I found {} key insights across market, clinical, \
         patent and regulatory data. What would you like to know?",
        result.molecule_name,
        result.insights.len()
    ))
}

/// Backend conversation state, scoped to the run it was started in.
#[derive(Debug, Default)]
struct Conversation {
    run: Option<RunId>,
    conversation_id: Option<String>,
    suggested_questions: Vec<String>,
}

/// Produces assistant replies and appends them to the session transcript.
pub struct ChatHandler {
    session: Session,
    backend: Option<Arc<dyn ChatService>>,
    reply_delay: Duration,
    conversation: Mutex<Conversation>,
}

impl ChatHandler {
    /// Create a handler. `backend` is `Some` in remote mode.
    pub fn new(
        session: Session,
        backend: Option<Arc<dyn ChatService>>,
        reply_delay: Duration,
    ) -> Self {
        Self {
            session,
            backend,
            reply_delay,
            conversation: Mutex::new(Conversation::default()),
        }
    }

    /// The current transcript.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.session.read(|state| state.messages.clone())
    }

    /// Follow-up questions suggested by the last remote reply of the
    /// current run.
    pub fn suggested_questions(&self) -> Vec<String> {
        let run = self.session.current_run();
        self.conversation
            .lock()
            .ok()
            .filter(|c| c.run == Some(run))
            .map(|c| c.suggested_questions.clone())
            .unwrap_or_default()
    }

    /// Drop the backend conversation when a new run or a reset superseded
    /// the one it belongs to.
    fn sync_conversation(&self, run: RunId) {
        if let Ok(mut conversation) = self.conversation.lock() {
            if conversation.run != Some(run) {
                debug!("Starting a new backend conversation for {}", run);
                *conversation = Conversation {
                    run: Some(run),
                    ..Conversation::default()
                };
            }
        }
    }

    /// Append the user's message, then produce and append one reply.
    ///
    /// Returns the reply, or `None` when a new analysis started (or the
    /// session was reset) while the reply was being produced; the stale
    /// reply is discarded in that case.
    pub async fn send(&self, text: &str) -> Option<ChatMessage> {
        self.session.push_message(ChatMessage::user(text));
        let run = self.session.current_run();
        self.sync_conversation(run);

        let reply = match &self.backend {
            Some(backend) => match self.remote_reply(backend.as_ref(), run, text).await {
                Some(reply) => reply,
                None => self.local_message(text).await,
            },
            None => self.local_message(text).await,
        };

        let committed = self
            .session
            .update_run(run, |state| state.messages.push(reply.clone()));
        if !committed {
            debug!("Discarding chat reply for superseded {}", run);
            return None;
        }
        Some(reply)
    }

    async fn remote_reply(
        &self,
        backend: &dyn ChatService,
        run: RunId,
        text: &str,
    ) -> Option<ChatMessage> {
        let analysis_id = self.session.read(|state| {
            state
                .analysis_id
                .clone()
                .or_else(|| state.current_result.as_ref().map(|r| r.id.clone()))
        });
        let conversation_id = self
            .conversation
            .lock()
            .ok()
            .and_then(|c| c.conversation_id.clone());

        match backend
            .send(text, analysis_id.as_deref(), conversation_id.as_deref())
            .await
        {
            Ok(reply) => {
                info!("Received chat reply from backend");
                if let Ok(mut conversation) = self.conversation.lock() {
                    // A reply for a superseded run must not seed the new conversation
                    if conversation.run == Some(run) {
                        if reply.conversation_id.is_some() {
                            conversation.conversation_id = reply.conversation_id.clone();
                        }
                        conversation.suggested_questions = reply.suggested_questions.clone();
                    }
                }
                Some(ChatMessage::assistant(reply.content).with_sources(reply.sources))
            }
            Err(e) => {
                warn!("Chat backend failed, using local responder: {}", e);
                None
            }
        }
    }

    async fn local_message(&self, text: &str) -> ChatMessage {
        tokio::time::sleep(self.reply_delay).await;
        let content = self
            .session
            .read(|state| local_reply(text, state.current_result.as_ref()));
        ChatMessage::assistant(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatReply;
    use crate::catalog;
    use crate::error::{Error, Result};
    use crate::models::{AnalysisRequest, AnalysisType, ChatRole, ChatSource};
    use async_trait::async_trait;

    struct FixedChat {
        fail: bool,
        conversation_ids: Mutex<Vec<Option<String>>>,
    }

    impl FixedChat {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                conversation_ids: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatService for FixedChat {
        async fn send(
            &self,
            message: &str,
            analysis_id: Option<&str>,
            conversation_id: Option<&str>,
        ) -> Result<ChatReply> {
            self.conversation_ids
                .lock()
                .unwrap()
                .push(conversation_id.map(String::from));
            if self.fail {
                return Err(Error::Api {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(ChatReply {
                content: format!("remote: {} [{}]", message, analysis_id.unwrap_or("-")),
                sources: vec![ChatSource {
                    title: "FDA Drug Database".to_string(),
                    url: "https://www.fda.gov/drugs".to_string(),
                    source_type: "regulatory".to_string(),
                }],
                suggested_questions: vec!["What about safety?".to_string()],
                conversation_id: Some("conv-1".to_string()),
            })
        }
    }

    fn session_with_result(mutate: impl FnOnce(&mut AnalysisResult)) -> Session {
        let session = Session::new();
        let request = AnalysisRequest::new("Aspirin", [AnalysisType::Market], None).unwrap();
        let run = session.begin_run(request.clone());
        let mut result = catalog::local_result(&request);
        mutate(&mut result);
        session.update_run(run, |state| {
            state.current_result = Some(result);
            state.is_analyzing = false;
        });
        session
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            classify("What's the market growth and any clinical trials?"),
            Some(Topic::Market)
        );
        assert_eq!(classify("Any ongoing STUDY?"), Some(Topic::Clinical));
        assert_eq!(classify("When does it expire?"), Some(Topic::Patent));
        assert_eq!(classify("What are the side-effect concerns?"), Some(Topic::Competitor));
        assert_eq!(classify("hello there"), None);
    }

    #[test]
    fn test_format_billions() {
        assert_eq!(format_billions(21_500_000_000.0), "$21.5B");
        assert_eq!(format_billions(0.0), "$0.0B");
    }

    #[test]
    fn test_local_reply_interpolates_result() {
        let mut result = catalog::sample_result();
        result.patent_info.expiry_date = "2035-03-20".to_string();

        let reply = local_reply("When does the patent expire?", Some(&result));
        assert!(reply.contains("2035-03-20"));
        assert!(reply.contains(&result.patent_info.patent_number));

        let reply = local_reply("market size?", Some(&result));
        assert!(reply.contains("$21.5B"));
        assert!(reply.contains("28.3%"));

        let reply = local_reply("who are the competitors", Some(&result));
        assert!(reply.contains("Tirzepatide (24.1% share)"));

        let reply = local_reply("tell me something", Some(&result));
        assert!(reply.contains("Ask me about"));
    }

    #[test]
    fn test_local_reply_without_result() {
        assert!(local_reply("market?", None).starts_with("Run an analysis first"));
    }

    #[tokio::test]
    async fn test_send_local_appends_user_then_reply() {
        let session = session_with_result(|r| r.patent_info.expiry_date = "2035-03-20".to_string());
        let handler = ChatHandler::new(session.clone(), None, Duration::from_millis(5));

        let reply = handler.send("When does the patent expire?").await.unwrap();
        assert!(reply.content.contains("2035-03-20"));

        let messages = handler.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_send_remote_uses_backend_reply() {
        let session = session_with_result(|r| r.id = "analysis-7".to_string());
        let handler = ChatHandler::new(
            session,
            Some(Arc::new(FixedChat::new(false))),
            Duration::from_millis(5),
        );

        let reply = handler.send("Is it approved?").await.unwrap();
        assert_eq!(reply.content, "remote: Is it approved? [analysis-7]");
        assert_eq!(reply.sources.as_ref().map(|s| s.len()), Some(1));
        assert_eq!(handler.suggested_questions(), vec!["What about safety?"]);
    }

    #[tokio::test]
    async fn test_conversation_restarts_with_new_run() {
        let session = session_with_result(|_| {});
        let backend = Arc::new(FixedChat::new(false));
        let handler = ChatHandler::new(
            session.clone(),
            Some(backend.clone() as Arc<dyn ChatService>),
            Duration::from_millis(5),
        );

        handler.send("Is it approved?").await.unwrap();
        handler.send("Any label warnings?").await.unwrap();
        assert_eq!(handler.suggested_questions(), vec!["What about safety?"]);

        let request = AnalysisRequest::new("Metformin", [AnalysisType::Market], None).unwrap();
        session.begin_run(request);
        assert!(handler.suggested_questions().is_empty());

        handler.send("Is it approved?").await.unwrap();
        session.clear();
        assert!(handler.suggested_questions().is_empty());
        handler.send("Is it approved?").await;

        let seen = backend.conversation_ids.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![None, Some("conv-1".to_string()), None, None]
        );
    }

    #[tokio::test]
    async fn test_send_remote_failure_falls_back() {
        let session = session_with_result(|_| {});
        let handler = ChatHandler::new(
            session,
            Some(Arc::new(FixedChat::new(true))),
            Duration::from_millis(5),
        );

        let reply = handler.send("Who are the competitors?").await.unwrap();
        assert!(reply.content.starts_with("The main competitors"));
        assert_eq!(handler.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_discarded_after_reset() {
        let session = session_with_result(|_| {});
        let handler = ChatHandler::new(session.clone(), None, Duration::from_millis(50));

        let resetter = session.clone();
        let reset = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            resetter.clear();
        });

        assert!(handler.send("market?").await.is_none());
        reset.await.unwrap();
        assert!(handler.messages().is_empty());
    }

    #[test]
    fn test_welcome_message_mentions_molecule() {
        let request = AnalysisRequest::new("Aspirin", [AnalysisType::Market], None).unwrap();
        let result = catalog::local_result(&request);
        let message = welcome_message(&result);
        assert_eq!(message.role, ChatRole::Assistant);
        assert!(message.content.contains("Aspirin"));
        assert!(message.content.contains("5 key insights"));
    }
}
