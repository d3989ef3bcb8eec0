//! The stored Google session (access + refresh token) used for API calls

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use google_calendar::{AccessToken, Client};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::app_config::{Credentials, base_dir};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl From<&AccessToken> for Session {
    fn from(tokens: &AccessToken) -> Self {
        Session {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
        }
    }
}

impl Session {
    pub fn path() -> Result<PathBuf> {
        Ok(base_dir()?.join("session.toml"))
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Load the session and refresh it if expired
    pub async fn load_valid() -> Result<Self> {
        let path = Self::path()?;
        let mut session = Self::load_from(&path)?;

        if session.is_expired() {
            tracing::debug!("Access token expired, refreshing");
            session.refresh().await?;
            session.save_to(&path)?;
        }

        Ok(session)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Google session not found. Run `webcal-sync auth` first.");
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Google session from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse Google session from {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize session")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write session to {}", path.display()))?;

        // Owner-only, the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    async fn refresh(&mut self) -> Result<()> {
        let creds = Credentials::load()?;

        let client = Client::new(
            creds.client_id,
            creds.client_secret,
            String::new(),
            self.access_token.clone(),
            self.refresh_token.clone(),
        );

        let mut tokens = client
            .refresh_access_token()
            .await
            .context("Failed to refresh token")?;

        // Google typically doesn't return a new refresh_token on refresh
        if tokens.refresh_token.is_empty() {
            tokens.refresh_token = self.refresh_token.clone();
        }

        *self = Session::from(&tokens);
        Ok(())
    }
}
