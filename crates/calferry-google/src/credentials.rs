//! OAuth credentials and Google connection configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{GcalError, GcalResult};
use crate::oauth::OAuthClient;
use crate::tokens::TokenStorage;

/// OAuth 2.0 client credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret; Google requires
/// registered applications for API access.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports the Cloud Console download format (with an `installed` or `web`
/// section) and a flat format with the fields at root level.
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> GcalResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GcalError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> GcalResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json)
            .map_err(|e| GcalError::configuration(format!("failed to parse credentials JSON: {}", e)))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(GcalError::configuration(
            "credentials file must contain an 'installed'/'web' section or \
             'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the credentials look correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Settings for the loopback redirect used during browser sign-in.
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Ports to try for the redirect listener, inclusive on both ends.
    pub port_range: (u16, u16),

    /// How long to wait for the user to finish the consent page.
    pub consent_timeout: Duration,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            port_range: (8080, 8090),
            consent_timeout: Duration::from_secs(300),
        }
    }
}

/// Connection settings for the Google Calendar target.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Path to the token cache.
    ///
    /// Defaults to `~/.local/share/calferry/google-tokens.json`.
    pub token_path: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// Loopback redirect settings for browser sign-in.
    pub loopback: LoopbackConfig,

    /// OAuth scopes to request. Importing needs write access.
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// The read/write calendar scope importing requires.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration with defaults for everything but the
    /// credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback: LoopbackConfig::default(),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    /// Returns the default token cache path.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calferry")
            .join("google-tokens.json")
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GcalResult<()> {
        self.credentials.validate().map_err(GcalError::configuration)
    }

    /// Returns a fresh access token, refreshing or (when `interactive`)
    /// running the browser consent flow as needed. Tokens are cached at
    /// [`GoogleConfig::token_path`].
    pub async fn ensure_access_token(&self, interactive: bool) -> GcalResult<String> {
        let storage = TokenStorage::new(&self.token_path);
        let _ = storage.load();
        let oauth = OAuthClient::new(self.credentials.clone(), self.timeout);

        if !storage.needs_reauth(&self.scopes)
            && let Some(tokens) = storage.get()
        {
            if !tokens.is_expired() {
                return Ok(tokens.access_token);
            }

            match tokens.refresh_token.as_deref() {
                Some(refresh) => match oauth.refresh_token(refresh).await {
                    Ok((access, expires_in)) => {
                        storage.update_access_token(&access, expires_in)?;
                        return Ok(access);
                    }
                    Err(e) if interactive => {
                        warn!("token refresh failed, re-authenticating: {}", e);
                    }
                    Err(e) => return Err(e),
                },
                None if !interactive => {
                    return Err(GcalError::authentication(
                        "no refresh token - run 'calferry auth' to re-authenticate",
                    ));
                }
                None => {}
            }
        } else if !interactive {
            return Err(GcalError::authentication(
                "not authenticated - run 'calferry auth' first",
            ));
        }

        let tokens = oauth
            .authorize(&self.scopes, &self.loopback)
            .await?;
        let access = tokens.access_token.clone();
        storage.set(tokens)?;
        Ok(access)
    }

    /// Removes any cached tokens.
    pub fn clear_tokens(&self) -> GcalResult<()> {
        TokenStorage::new(&self.token_path).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_installed_format() {
        let json = r#"{
            "installed": {
                "client_id": "test.apps.googleusercontent.com",
                "client_secret": "secret123",
                "project_id": "my-project"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "secret123");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn parse_web_format() {
        let json = r#"{
            "web": {
                "client_id": "web.apps.googleusercontent.com",
                "client_secret": "secret456"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web.apps.googleusercontent.com");
    }

    #[test]
    fn parse_flat_format() {
        let json = r#"{"client_id": "flat.apps.googleusercontent.com", "client_secret": "s"}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat.apps.googleusercontent.com");
    }

    #[test]
    fn reject_empty_credentials() {
        let err = OAuthCredentials::from_json("{}").unwrap_err();
        assert_eq!(err.code(), crate::GcalErrorCode::ConfigurationError);
    }

    #[test]
    fn validate_checks_client_id_shape() {
        let creds = OAuthCredentials::new("not-a-google-id", "secret");
        assert!(creds.validate().is_err());

        let creds = OAuthCredentials::new("ok.apps.googleusercontent.com", "");
        assert!(creds.validate().is_err());
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new(OAuthCredentials::new(
            "test.apps.googleusercontent.com",
            "secret",
        ));
        assert_eq!(config.scopes, vec![GoogleConfig::DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.loopback.port_range, (8080, 8090));
        assert!(config.token_path.ends_with("calferry/google-tokens.json"));
        assert!(config.validate().is_ok());
    }
}
