//! Contact detail extraction from free-text chat messages

use once_cell::sync::Lazy;
use regex::Regex;

use crate::conversation::ContactDetails;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("email pattern is valid"));

// Indian mobile: optional +91, ten digits starting 6-9, split 5+5 at most once
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+91[\s-]?)?[6-9]\d{4}[\s-]?\d{5}").expect("phone pattern is valid")
});

/// First email-looking substring in `text`
pub fn find_email(text: &str) -> Option<&str> {
    EMAIL_RE.find(text).map(|m| m.as_str())
}

/// First Indian mobile number in `text`, separators kept as typed
pub fn find_phone(text: &str) -> Option<&str> {
    PHONE_RE.find(text).map(|m| m.as_str())
}

/// Extract contact fields that are not already known.
///
/// Known fields are never reported again, so applying the result can't
/// overwrite what a visitor told us earlier.
pub fn extract(text: &str, known: &ContactDetails) -> ContactDetails {
    ContactDetails {
        email: match known.email {
            Some(_) => None,
            None => find_email(text).map(str::to_string),
        },
        phone: match known.phone {
            Some(_) => None,
            None => find_phone(text).map(str::to_string),
        },
    }
}
