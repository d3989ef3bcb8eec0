//! OAuth client credentials and on-disk location of the Google destination.
//!
//! Everything lives next to the main config, under `<config dir>/webcal-sync/google/`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use webcal_sync_core::config::Config;

const CREDENTIALS_FILE: &str = "app_config.toml";

/// Directory holding the Google credentials and session
pub fn base_dir() -> Result<PathBuf> {
    Ok(Config::base_dir()?.join("google"))
}

/// OAuth client of the user's own Google Cloud project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn load() -> Result<Self> {
        Self::load_from(&base_dir()?.join(CREDENTIALS_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "No Google OAuth client configured.\n\n\
                Create a Desktop OAuth client with the Calendar API enabled, then write {}:\n\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let creds: Credentials = toml::from_str(&contents)
            .with_context(|| format!("Invalid OAuth client in {}", path.display()))?;

        if creds.client_id.trim().is_empty() || creds.client_secret.trim().is_empty() {
            anyhow::bail!(
                "{} needs both client_id and client_secret",
                path.display()
            );
        }

        Ok(creds)
    }
}
