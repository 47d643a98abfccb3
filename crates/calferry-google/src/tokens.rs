//! Persistence for OAuth tokens between runs.
//!
//! The token cache is a single JSON file. Writes go through a sibling temp
//! file followed by a rename, so a crash mid-write never leaves a truncated
//! cache, and on Unix the file is chmodded to owner-only before it lands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GcalError, GcalResult};

/// Slack subtracted from the reported lifetime, so a token is refreshed
/// shortly before Google would start rejecting it.
const EXPIRY_SLACK_SECS: i64 = 60;

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs - EXPIRY_SLACK_SECS))
}

/// An OAuth token set as returned by the consent flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Bearer token sent with API requests.
    pub access_token: String,

    /// Long-lived token used to mint new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token stops being usable, slack already applied.
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes the user consented to.
    pub scopes: Vec<String>,

    /// When the access token was last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// True once the token is within the slack window of its expiry.
    /// Tokens without a recorded expiry are treated as still valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// True if every required scope was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Swaps in a freshly refreshed access token.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expiry_from(expires_in_secs);
        self.last_refresh = Utc::now();
    }
}

/// The on-disk token cache plus its in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    cached: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Reads the cache file, if one exists.
    ///
    /// Returns `Ok(false)` when there is no file, which is the normal
    /// first-run case.
    pub fn load(&self) -> GcalResult<bool> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token cache at {:?}", self.path);
                return Ok(false);
            }
            Err(e) => {
                return Err(GcalError::configuration(format!(
                    "cannot read token cache {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            GcalError::configuration(format!(
                "token cache {} is corrupt: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("loaded tokens from {:?}", self.path);
        *self.cached.write().unwrap() = Some(tokens);
        Ok(true)
    }

    /// Writes the in-memory tokens to disk.
    pub fn save(&self) -> GcalResult<()> {
        let guard = self.cached.read().unwrap();
        let tokens = guard
            .as_ref()
            .ok_or_else(|| GcalError::internal("no tokens to save"))?;
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| GcalError::internal(format!("token serialization failed: {}", e)))?;
        drop(guard);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_error("create directory for", e))?;
        }

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, &content).map_err(|e| self.write_error("write", e))?;

        // Lock down the staging file so the secret is never readable,
        // not even briefly.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staging, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.write_error("restrict", e))?;
        }

        fs::rename(&staging, &self.path).map_err(|e| self.write_error("replace", e))?;
        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    fn write_error(&self, verb: &str, e: std::io::Error) -> GcalError {
        GcalError::configuration(format!(
            "cannot {} token cache {}: {}",
            verb,
            self.path.display(),
            e
        ))
    }

    /// A snapshot of the current tokens, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.cached.read().unwrap().clone()
    }

    /// Replaces the tokens and persists them.
    pub fn set(&self, tokens: TokenInfo) -> GcalResult<()> {
        *self.cached.write().unwrap() = Some(tokens);
        self.save()
    }

    /// Updates just the access token and persists the result.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> GcalResult<()> {
        {
            let mut guard = self.cached.write().unwrap();
            let tokens = guard
                .as_mut()
                .ok_or_else(|| GcalError::internal("no tokens to update"))?;
            tokens.update_access_token(access_token, expires_in_secs);
        }
        self.save()
    }

    /// Drops the tokens from memory and deletes the cache file.
    pub fn clear(&self) -> GcalResult<()> {
        *self.cached.write().unwrap() = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("cleared tokens at {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_error("remove", e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when loaded tokens exist and have not expired.
    pub fn has_valid_tokens(&self) -> bool {
        self.cached
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|t| !t.is_expired())
    }

    /// True when the consent flow has to run again: no tokens at all, or
    /// tokens granted for a narrower scope set than we now need.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        !self
            .cached
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|t| t.has_scopes(required_scopes))
    }
}
