//! Command implementations.

pub mod auth;
pub mod calendars;
pub mod import;

use calferry_google::{GoogleCalendarClient, GoogleConfig, OAuthCredentials};

use crate::config::Settings;
use crate::error::CliResult;

/// Builds the Google configuration from resolved settings.
pub(crate) fn google_config(settings: &Settings) -> CliResult<GoogleConfig> {
    let credentials = OAuthCredentials::from_file(&settings.credentials_path)?;
    let mut config = GoogleConfig::new(credentials);
    if let Some(path) = &settings.token_path {
        config.token_path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Returns a client holding a fresh access token, running the browser
/// consent flow if this machine has never authenticated.
pub(crate) async fn authenticated_client(settings: &Settings) -> CliResult<GoogleCalendarClient> {
    let config = google_config(settings)?;
    let token = config.ensure_access_token(true).await?;
    Ok(GoogleCalendarClient::new(token, config.timeout))
}
