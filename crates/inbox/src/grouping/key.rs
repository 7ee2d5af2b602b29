//! Group key resolution
//!
//! Every message maps to exactly one [`GroupKey`]. When the backend threaded
//! the message, the key is its thread id. Otherwise a fallback key is
//! synthesized from the normalized subject and the two addresses.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{GroupKey, Message};

/// Reply/forward markers stripped from the front of a subject (lowercase)
const REPLY_MARKERS: [&str; 3] = ["re:", "fwd:", "fw:"];

/// Separator between the parts of a fallback key
///
/// Genuine thread ids that contain it are classified as fallback, which is
/// the safe direction.
pub const FALLBACK_SEPARATOR: char = '-';

/// How the two addresses are ordered inside a fallback key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOrder {
    /// Addresses sorted, so a reply groups with the message it answers
    #[default]
    Canonical,
    /// Literal `from-to` order; replies with swapped addresses split off
    Directional,
}

impl FromStr for KeyOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canonical" => Ok(KeyOrder::Canonical),
            "directional" => Ok(KeyOrder::Directional),
            other => Err(anyhow::anyhow!("Unknown key order: {}", other)),
        }
    }
}

/// Strip any run of leading `Re:` / `Fwd:` / `FW:` markers and trim
///
/// Matching is ASCII case-insensitive and tolerates whitespace between
/// repeated markers, so `"RE: fwd:  Re:Quote "` becomes `"Quote"`.
pub fn normalize_subject(subject: &str) -> String {
    let mut rest = subject.trim_start();
    while let Some(stripped) = strip_marker(rest) {
        rest = stripped.trim_start();
    }
    rest.trim().to_string()
}

fn strip_marker(s: &str) -> Option<&str> {
    REPLY_MARKERS.iter().find_map(|marker| {
        let head = s.get(..marker.len())?;
        head.eq_ignore_ascii_case(marker).then(|| &s[marker.len()..])
    })
}

/// Resolve a message's group key with the default [`KeyOrder`]
pub fn resolve(message: &Message) -> GroupKey {
    resolve_with(message, KeyOrder::default())
}

/// Resolve a message's group key
pub fn resolve_with(message: &Message, order: KeyOrder) -> GroupKey {
    if let Some(thread_id) = message.genuine_thread_id() {
        return GroupKey::new(thread_id.as_str());
    }

    let subject = normalize_subject(&message.subject);
    let (first, second) = address_pair(&message.from_email, &message.to_email, order);
    GroupKey(format!(
        "{subject}{sep}{first}{sep}{second}",
        sep = FALLBACK_SEPARATOR
    ))
}

fn address_pair<'a>(from: &'a str, to: &'a str, order: KeyOrder) -> (&'a str, &'a str) {
    match order {
        KeyOrder::Directional => (from, to),
        KeyOrder::Canonical => {
            let from_key = (from.to_ascii_lowercase(), from);
            let to_key = (to.to_ascii_lowercase(), to);
            if from_key <= to_key { (from, to) } else { (to, from) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(subject: &str, from: &str, to: &str) -> Message {
        Message::builder(1)
            .subject(subject)
            .from(from)
            .to(to)
            .build()
    }

    #[test]
    fn test_normalize_strips_markers() {
        assert_eq!(normalize_subject("Re: Quote"), "Quote");
        assert_eq!(normalize_subject("FW: Quote"), "Quote");
        assert_eq!(normalize_subject("fwd:Quote"), "Quote");
        assert_eq!(normalize_subject("RE: fwd:  Re:Quote "), "Quote");
        assert_eq!(normalize_subject("  Quote  "), "Quote");
    }

    #[test]
    fn test_normalize_keeps_inner_markers() {
        assert_eq!(normalize_subject("Quote Re: pricing"), "Quote Re: pricing");
        assert_eq!(normalize_subject("Regarding pricing"), "Regarding pricing");
        assert_eq!(normalize_subject("Fwdx: hi"), "Fwdx: hi");
    }

    #[test]
    fn test_normalize_empty_and_marker_only() {
        assert_eq!(normalize_subject(""), "");
        assert_eq!(normalize_subject("Re:"), "");
        assert_eq!(normalize_subject("Re: Re: "), "");
    }

    #[test]
    fn test_normalize_non_ascii_subject() {
        assert_eq!(normalize_subject("Ré: café"), "Ré: café");
        assert_eq!(normalize_subject("Re: café"), "café");
    }

    #[test]
    fn test_thread_id_wins() {
        let mut msg = message("Re: Anything", "a@x.com", "b@y.com");
        msg.thread_id = Some("thread42".into());
        assert_eq!(resolve(&msg).as_str(), "thread42");
    }

    #[test]
    fn test_empty_thread_id_falls_back() {
        let mut msg = message("Hello", "a@x.com", "b@y.com");
        msg.thread_id = Some("".into());
        assert_eq!(resolve(&msg).as_str(), "Hello-a@x.com-b@y.com");
    }

    #[test]
    fn test_canonical_order_groups_replies() {
        let original = message("Quote", "a@x.com", "b@y.com");
        let reply = message("Re: Quote", "b@y.com", "a@x.com");
        assert_eq!(resolve(&original), resolve(&reply));
        assert_eq!(resolve(&reply).as_str(), "Quote-a@x.com-b@y.com");
    }

    #[test]
    fn test_directional_order_is_literal() {
        let original = message("Quote", "a@x.com", "b@y.com");
        let reply = message("Re: Quote", "b@y.com", "a@x.com");
        let a = resolve_with(&original, KeyOrder::Directional);
        let b = resolve_with(&reply, KeyOrder::Directional);
        assert_eq!(a.as_str(), "Quote-a@x.com-b@y.com");
        assert_eq!(b.as_str(), "Quote-b@y.com-a@x.com");
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_subject_and_addresses_still_group() {
        let a = message("", "", "");
        let b = message("Re:", "", "");
        assert_eq!(resolve(&a), resolve(&b));
        assert_eq!(resolve(&a).as_str(), "--");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let msg = message("Re: Quote", "b@y.com", "a@x.com");
        assert_eq!(resolve(&msg), resolve(&msg.clone()));
    }

    #[test]
    fn test_key_order_from_str() {
        assert_eq!("Canonical".parse::<KeyOrder>().unwrap(), KeyOrder::Canonical);
        assert_eq!("directional".parse::<KeyOrder>().unwrap(), KeyOrder::Directional);
        assert!("sorted".parse::<KeyOrder>().is_err());
    }
}
