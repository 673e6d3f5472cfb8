//! Conversation types and lead bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "bot" => Role::Bot,
            _ => Role::User,
        }
    }
}

/// A single chat turn as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Contact fields a visitor has disclosed so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactDetails {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }
}

/// Request metadata captured when a session first talks to the bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitorMeta {
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// A chat session and the visitor state accumulated across its turns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub session_id: String,
    pub visitor_name: Option<String>,
    pub visitor_email: Option<String>,
    pub visitor_phone: Option<String>,
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub is_lead: bool,
    pub is_resolved: bool,
    pub admin_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn contact(&self) -> ContactDetails {
        ContactDetails {
            email: self.visitor_email.clone(),
            phone: self.visitor_phone.clone(),
        }
    }

    /// Record newly extracted contact fields.
    ///
    /// Fields already set are left alone and the lead flag only ever moves
    /// to true. Returns whether this call turned the conversation into a lead.
    pub fn apply_contact(&mut self, extracted: &ContactDetails) -> bool {
        let mut recorded = false;

        if self.visitor_email.is_none() {
            if let Some(email) = &extracted.email {
                self.visitor_email = Some(email.clone());
                recorded = true;
            }
        }

        if self.visitor_phone.is_none() {
            if let Some(phone) = &extracted.phone {
                self.visitor_phone = Some(phone.clone());
                recorded = true;
            }
        }

        let was_lead = self.is_lead;
        if recorded {
            self.is_lead = true;
        }
        !was_lead && self.is_lead
    }
}

/// A conversation with its full message history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Row shown in the dashboard conversation list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub message_count: i64,
}
