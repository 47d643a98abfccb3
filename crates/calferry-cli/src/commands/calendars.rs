//! The `--list-calendars` mode.

use crate::config::Settings;
use crate::error::CliResult;

/// Prints the calendars visible to the authenticated account.
pub async fn run(settings: &Settings) -> CliResult<()> {
    let client = super::authenticated_client(settings).await?;
    let calendars = client.calendar_list().await?;

    if calendars.is_empty() {
        println!("No calendars visible to this account.");
        return Ok(());
    }

    for calendar in calendars {
        let marker = if calendar.primary { "  (primary)" } else { "" };
        println!("{}  {}{}", calendar.id, calendar.summary, marker);
    }
    Ok(())
}
