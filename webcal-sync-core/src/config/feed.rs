//! Per-feed configuration.

use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::identity::{self, IdFormat};

/// One `[[feeds]]` entry in config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub url: String,

    /// Destination color applied to every mirrored event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,

    /// "" or "uid" to key events by UID, "url" to key them by a digest of their URL
    #[serde(default)]
    pub id_format: String,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        FeedConfig {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Parse the configured id format. Kept as a string in the file so one
    /// bad feed entry fails that feed only.
    pub fn id_format(&self) -> SyncResult<IdFormat> {
        self.id_format.parse()
    }

    pub fn owner_tag(&self) -> String {
        identity::owner_tag(&self.url)
    }
}
