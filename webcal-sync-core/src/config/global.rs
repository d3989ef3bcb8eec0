//! Global webcal-sync configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;
use crate::error::{SyncError, SyncResult};

static DEFAULT_CALENDAR_ID: &str = "primary";

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

/// Configuration at ~/.config/webcal-sync/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Destination calendar every feed is mirrored into
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

impl Config {
    pub fn base_dir() -> SyncResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("webcal-sync"))
    }

    pub fn config_path() -> SyncResult<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Load from the default location
    pub fn load() -> SyncResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            return Err(SyncError::Config(format!(
                "No config found at {}.\n\n\
                Create it with:\n\n\
                calendar_id = \"primary\"\n\n\
                [[feeds]]\n\
                url = \"https://example.com/calendar.ics\"\n\
                color_id = \"5\"",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Feeds whose URL matches `filter`, or all feeds when there is none.
    pub fn select_feeds(&self, filter: Option<&str>) -> SyncResult<Vec<FeedConfig>> {
        match filter {
            Some(url) => match self.feeds.iter().find(|f| f.url == url) {
                Some(feed) => Ok(vec![feed.clone()]),
                None => {
                    let available: Vec<_> = self.feeds.iter().map(|f| f.url.as_str()).collect();
                    Err(SyncError::Config(format!(
                        "Feed '{}' not found. Available: {}",
                        url,
                        available.join(", ")
                    )))
                }
            },
            None => Ok(self.feeds.clone()),
        }
    }
}
