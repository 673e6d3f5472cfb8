//! Keyword-matching chatbot responder
//!
//! Maps a visitor message to one of a fixed set of intents and returns the
//! canned reply for it. Rules are tried in priority order and the first one
//! with a keyword contained anywhere in the lower-cased message wins. Plain
//! substring containment is intentional: "hi" also matches "this", and the
//! replies visitors see depend on that.
//!
//! The rule table is built once from [`CompanyInfo`] and never mutated, so a
//! single [`Responder`] can be shared across request handlers behind an `Arc`.

use serde::{Deserialize, Serialize};

use crate::config::{replies, CompanyInfo};
use crate::conversation::ContactDetails;

use super::contact;

/// What the visitor is asking about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Pricing,
    Demo,
    Features,
    QrOrdering,
    KitchenDisplay,
    Support,
    Contact,
    CafeName,
    Thanks,
    Goodbye,
    Fallback,
}

/// Keyword groups in priority order
const KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Greeting, &["hi", "hello", "hey", "good morning", "good evening"]),
    (Intent::Pricing, &["price", "cost", "pricing", "how much", "rate", "fees"]),
    (Intent::Demo, &["demo", "trial", "try", "test"]),
    (Intent::Features, &["feature", "what can", "capabilities", "does it"]),
    (Intent::QrOrdering, &["qr", "scan"]),
    (Intent::KitchenDisplay, &["kitchen", "kot"]),
    (Intent::Support, &["support", "help", "problem", "issue"]),
    (Intent::Contact, &["contact", "phone", "call", "whatsapp", "email"]),
    (Intent::CafeName, &["my cafe", "cafe name", "my restaurant"]),
    (Intent::Thanks, &["thank", "thanks", "thx"]),
    (Intent::Goodbye, &["bye", "goodbye", "see you"]),
];

#[derive(Debug, Clone)]
struct Rule {
    intent: Intent,
    keywords: &'static [&'static str],
    reply: String,
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Result of answering one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub intent: Intent,
    pub text: String,
    /// Contact fields found in the message that weren't already known
    pub extracted: ContactDetails,
}

#[derive(Debug, Clone)]
pub struct Responder {
    rules: Vec<Rule>,
    fallback: String,
}

impl Responder {
    pub fn new(company: &CompanyInfo) -> Self {
        let rules = KEYWORDS
            .iter()
            .map(|&(intent, keywords)| Rule {
                intent,
                keywords,
                reply: reply_for(intent, company),
            })
            .collect();

        Self {
            rules,
            fallback: replies::builtin::DEFAULT.to_string(),
        }
    }

    /// Classify a message into an intent and its reply text
    pub fn classify(&self, message: &str) -> (Intent, &str) {
        let lowered = message.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| (rule.intent, rule.reply.as_str()))
            .unwrap_or((Intent::Fallback, self.fallback.as_str()))
    }

    /// Answer a message and pick out any new contact details.
    ///
    /// Never fails: anything unrecognised gets the fallback reply. Rejecting
    /// empty input is up to the caller.
    pub fn respond(&self, message: &str, known: &ContactDetails) -> Reply {
        let (intent, text) = self.classify(message);

        Reply {
            intent,
            text: text.to_string(),
            extracted: contact::extract(message, known),
        }
    }
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(&CompanyInfo::default())
    }
}

fn reply_for(intent: Intent, company: &CompanyInfo) -> String {
    use replies::builtin;

    match intent {
        Intent::Greeting => builtin::GREETING.to_string(),
        Intent::Pricing => builtin::PRICING.to_string(),
        Intent::Demo => builtin::DEMO.to_string(),
        Intent::Features => builtin::FEATURES.to_string(),
        Intent::QrOrdering => builtin::QR_ORDERING.to_string(),
        Intent::KitchenDisplay => builtin::KITCHEN_DISPLAY.to_string(),
        Intent::Support => builtin::SUPPORT.to_string(),
        Intent::Contact => replies::contact(company),
        Intent::CafeName => builtin::CAFE_NAME.to_string(),
        Intent::Thanks => builtin::THANKS.to_string(),
        Intent::Goodbye => builtin::GOODBYE.to_string(),
        Intent::Fallback => builtin::DEFAULT.to_string(),
    }
}
