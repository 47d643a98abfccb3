//! The `auth` subcommand.

use tracing::info;

use crate::config::Settings;
use crate::error::CliResult;

/// Runs the browser OAuth flow and caches the tokens.
pub async fn run(settings: &Settings, force: bool) -> CliResult<()> {
    let config = super::google_config(settings)?;

    if force {
        info!("discarding cached tokens");
        config.clear_tokens()?;
    }

    config.ensure_access_token(true).await?;
    println!(
        "Authenticated. Tokens cached at {}.",
        config.token_path.display()
    );
    Ok(())
}
