//! Stable identifiers that tie feed events to the events we created for them.

use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::SyncError;
use crate::event::SourceEvent;

/// How a feed event's identity key is derived, per configured feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdFormat {
    /// The feed's own UID (`id_format = ""` or `"uid"`)
    #[default]
    Uid,
    /// SHA-256 of the event's URL, for feeds that reuse UIDs across bookings
    UrlDigest,
}

impl FromStr for IdFormat {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "uid" => Ok(IdFormat::Uid),
            "url" => Ok(IdFormat::UrlDigest),
            other => Err(SyncError::UnknownIdFormat(other.to_string())),
        }
    }
}

impl IdFormat {
    pub fn resolve(&self, event: &SourceEvent) -> String {
        match self {
            IdFormat::Uid => event.uid.clone(),
            IdFormat::UrlDigest => sha256_hex(event.url.as_deref().unwrap_or_default()),
        }
    }
}

/// Tag marking every event created for the feed at `feed_url`.
pub fn owner_tag(feed_url: &str) -> String {
    sha256_hex(feed_url)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(uid: &str, url: Option<&str>) -> SourceEvent {
        let now = Utc::now();
        SourceEvent {
            uid: uid.to_string(),
            url: url.map(str::to_string),
            summary: "Booking".to_string(),
            location: String::new(),
            description: String::new(),
            start: now,
            end: now,
            all_day: false,
        }
    }

    #[test]
    fn test_uid_format_returns_uid_unchanged() {
        let format: IdFormat = "".parse().unwrap();
        assert_eq!(format.resolve(&event("abc@feed", None)), "abc@feed");
        assert_eq!("uid".parse::<IdFormat>().unwrap(), IdFormat::Uid);
    }

    #[test]
    fn test_url_format_hashes_url() {
        let format: IdFormat = "url".parse().unwrap();
        let key = format.resolve(&event("same-uid", Some("https://example.com/booking/1")));

        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let other = format.resolve(&event("same-uid", Some("https://example.com/booking/2")));
        assert_ne!(key, other);
    }

    #[test]
    fn test_sha256_of_empty_string() {
        assert_eq!(
            owner_tag(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        match "guid".parse::<IdFormat>() {
            Err(SyncError::UnknownIdFormat(f)) => assert_eq!(f, "guid"),
            other => panic!("Expected UnknownIdFormat, got {:?}", other),
        }
    }
}
