//! Chat engine
//!
//! The ChatEngine runs one widget turn end to end:
//! 1. Validates the visitor message and resolves the session token
//! 2. Loads (or creates) the session's conversation
//! 3. Asks the responder for a reply and any new contact details
//! 4. Persists both messages and the updated lead state in one transaction
//! 5. Reports conversations that just became leads

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::conversation::VisitorMeta;
use crate::notify::{LeadEvent, LeadNotifier};

use super::responder::{Intent, Responder};
use super::sessions::SessionLocks;
use super::store::{ConversationStore, StoreError};

/// Request from the chat widget
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The visitor's message
    #[serde(default)]
    pub message: String,

    /// Session token from a previous turn; a new one is issued when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Reply for the chat widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    #[serde(skip)]
    pub intent: Option<Intent>,
}

/// Errors from the chat engine
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message required")]
    MessageRequired,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub struct ChatEngine {
    responder: Arc<Responder>,
    store: Arc<ConversationStore>,
    notifier: Arc<dyn LeadNotifier>,
    sessions: SessionLocks,
}

impl ChatEngine {
    pub fn new(
        responder: Arc<Responder>,
        store: Arc<ConversationStore>,
        notifier: Arc<dyn LeadNotifier>,
    ) -> Self {
        Self {
            responder,
            store,
            notifier,
            sessions: SessionLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Process a chat request and return the bot's reply
    pub async fn chat(
        &self,
        request: ChatRequest,
        meta: VisitorMeta,
    ) -> Result<ChatResponse, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::MessageRequired);
        }

        let session_id = request
            .session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let guard = self.sessions.acquire(&session_id).await;

        let (mut conversation, created) = self.store.get_or_create(&session_id, &meta).await?;
        if created {
            tracing::debug!(session_id = %session_id, "Started chat conversation");
        }

        let reply = self.responder.respond(message, &conversation.contact());
        let became_lead = conversation.apply_contact(&reply.extracted);

        self.store
            .record_turn(&conversation, message, &reply.text)
            .await?;

        drop(guard);

        tracing::debug!(
            conversation_id = conversation.id,
            intent = ?reply.intent,
            "Answered chat message"
        );

        if became_lead {
            self.report_lead(LeadEvent::new(&conversation, message));
        }

        Ok(ChatResponse {
            response: reply.text,
            session_id,
            intent: Some(reply.intent),
        })
    }

    fn report_lead(&self, event: LeadEvent) {
        let notifier = Arc::clone(&self.notifier);

        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&event).await {
                tracing::warn!(
                    notifier = notifier.name(),
                    conversation_id = event.conversation_id,
                    "Failed to report lead: {}",
                    e
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::replies::builtin;
    use crate::conversation::Role;
    use crate::notify::NotifyError;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<LeadEvent>);

    #[async_trait]
    impl LeadNotifier for ChannelNotifier {
        fn name(&self) -> &'static str {
            "channel"
        }

        async fn notify(&self, event: &LeadEvent) -> Result<(), NotifyError> {
            let _ = self.0.send(event.clone());
            Ok(())
        }
    }

    async fn engine() -> (ChatEngine, mpsc::UnboundedReceiver<LeadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Arc::new(ConversationStore::new_in_memory().await.unwrap());
        let engine = ChatEngine::new(
            Arc::new(Responder::default()),
            store,
            Arc::new(ChannelNotifier(tx)),
        );
        (engine, rx)
    }

    fn request(message: &str, session_id: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (engine, _rx) = engine().await;

        for msg in ["", "   ", "\n\t"] {
            let err = engine.chat(request(msg, None), VisitorMeta::default()).await.unwrap_err();
            assert!(matches!(err, ChatError::MessageRequired));
            assert_eq!(err.to_string(), "message required");
        }

        let page = engine.store().list(Default::default(), 1).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_new_session_is_issued() {
        let (engine, _rx) = engine().await;

        let first = engine.chat(request("hello", None), VisitorMeta::default()).await.unwrap();
        assert_eq!(first.response, builtin::GREETING);
        assert!(uuid::Uuid::parse_str(&first.session_id).is_ok());

        let blank = engine.chat(request("hello", Some("  ")), VisitorMeta::default()).await.unwrap();
        assert_ne!(blank.session_id, first.session_id);
    }

    #[tokio::test]
    async fn test_turns_are_recorded_in_order() {
        let (engine, _rx) = engine().await;

        engine.chat(request("hello", Some("s1")), VisitorMeta::default()).await.unwrap();
        engine.chat(request("pricing?", Some("s1")), VisitorMeta::default()).await.unwrap();

        let conv = engine.store().find_by_session("s1").await.unwrap().unwrap();
        let messages = engine.store().messages(conv.id).await.unwrap();
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();

        assert_eq!(roles, [Role::User, Role::Bot, Role::User, Role::Bot]);
        assert_eq!(messages[2].content, "pricing?");
        assert_eq!(messages[3].content, builtin::PRICING);
    }

    #[tokio::test]
    async fn test_contact_makes_lead_once() {
        let (engine, mut rx) = engine().await;

        engine
            .chat(request("reach me at owner@mycafe.com please", Some("lead")), VisitorMeta::default())
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.email.as_deref(), Some("owner@mycafe.com"));
        assert_eq!(event.session_id, "lead");

        // Same email again, then a different one: nothing changes, no new event
        engine
            .chat(request("owner@mycafe.com", Some("lead")), VisitorMeta::default())
            .await
            .unwrap();
        engine
            .chat(request("or other@cafe.in", Some("lead")), VisitorMeta::default())
            .await
            .unwrap();

        let conv = engine.store().find_by_session("lead").await.unwrap().unwrap();
        assert!(conv.is_lead);
        assert_eq!(conv.visitor_email.as_deref(), Some("owner@mycafe.com"));

        // A phone number on an existing lead is recorded but not re-announced
        engine
            .chat(request("call +91 98765 43210", Some("lead")), VisitorMeta::default())
            .await
            .unwrap();
        let conv = engine.store().find_by_session("lead").await.unwrap().unwrap();
        assert_eq!(conv.visitor_phone.as_deref(), Some("+91 98765 43210"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unrecognized_input_is_not_a_lead() {
        let (engine, mut rx) = engine().await;

        let reply = engine
            .chat(request("asdkjasdkj", Some("quiet")), VisitorMeta::default())
            .await
            .unwrap();
        assert_eq!(reply.response, builtin::DEFAULT);
        assert_eq!(reply.intent, Some(Intent::Fallback));

        let conv = engine.store().find_by_session("quiet").await.unwrap().unwrap();
        assert!(!conv.is_lead);
        assert!(conv.contact().is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_turns_same_session() {
        let (engine, _rx) = engine().await;
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine
                    .chat(request(&format!("message {i}"), Some("busy")), VisitorMeta::default())
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let page = engine.store().list(Default::default(), 1).await.unwrap();
        assert_eq!(page.total, 1);

        let conv = engine.store().find_by_session("busy").await.unwrap().unwrap();
        let messages = engine.store().messages(conv.id).await.unwrap();
        assert_eq!(messages.len(), 16);

        // Every visitor message is immediately followed by its reply
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Bot);
        }
    }
}
