//! Lead notifications
//!
//! When a chat turn turns a conversation into a lead for the first time the
//! engine hands a [`LeadEvent`] to a [`LeadNotifier`]. Notifiers are
//! best-effort: a failure is logged by the caller and never fails the turn.

mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::conversation::Conversation;

pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Webhook rejected lead: {0}")]
    Rejected(String),
}

/// A conversation that has just disclosed contact details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadEvent {
    pub conversation_id: i64,
    pub session_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// The visitor message the details were found in
    pub message: String,
    pub detected_at: DateTime<Utc>,
}

impl LeadEvent {
    pub fn new(conversation: &Conversation, message: &str) -> Self {
        Self {
            conversation_id: conversation.id,
            session_id: conversation.session_id.clone(),
            email: conversation.visitor_email.clone(),
            phone: conversation.visitor_phone.clone(),
            message: message.to_string(),
            detected_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait LeadNotifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn notify(&self, event: &LeadEvent) -> Result<(), NotifyError>;
}

/// Writes each lead to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl LeadNotifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, event: &LeadEvent) -> Result<(), NotifyError> {
        tracing::info!(
            conversation_id = event.conversation_id,
            session_id = %event.session_id,
            email = event.email.as_deref().unwrap_or("-"),
            phone = event.phone.as_deref().unwrap_or("-"),
            "New chat lead"
        );
        Ok(())
    }
}

/// Pick the notifier the site config asks for
pub fn from_config(site: &SiteConfig) -> Arc<dyn LeadNotifier> {
    match &site.notifications.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}
