//! Import run configuration.

use calferry_core::DateWindow;
use chrono::NaiveDate;

/// Options controlling one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Simulate the run without committing anything.
    pub dry_run: bool,

    /// The calendar to import into.
    pub target_calendar: String,

    /// Whether attendees are carried over at all.
    pub include_attendees: bool,

    /// Whether events already present on the target are skipped.
    pub skip_duplicates: bool,

    /// First admitted start date (inclusive).
    pub start_date: Option<NaiveDate>,

    /// First rejected start date (exclusive).
    pub end_date: Option<NaiveDate>,

    /// Stop after this many events reach a terminal state.
    pub limit: Option<usize>,

    /// An address to append as an accepted attendee on every event.
    pub add_self: Option<String>,

    /// How many commits form one batch for pacing purposes.
    pub batch_size: usize,

    /// Skip events with more than this many attendees (after filtering).
    pub max_attendees: Option<usize>,
}

impl ImportOptions {
    /// The default batch size.
    pub const DEFAULT_BATCH_SIZE: usize = 50;

    /// Returns the date-range admission window.
    pub fn date_window(&self) -> DateWindow {
        // end_date is exclusive, matching the half-open window.
        DateWindow::new(self.start_date, self.end_date)
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            target_calendar: "primary".to_string(),
            include_attendees: true,
            skip_duplicates: true,
            start_date: None,
            end_date: None,
            limit: None,
            add_self: None,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            max_attendees: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ImportOptions::default();
        assert!(!options.dry_run);
        assert_eq!(options.target_calendar, "primary");
        assert!(options.include_attendees);
        assert!(options.skip_duplicates);
        assert_eq!(options.batch_size, 50);
        assert!(options.limit.is_none());
        assert!(options.max_attendees.is_none());
        assert!(options.date_window().is_unbounded());
    }

    #[test]
    fn window_from_bounds() {
        let options = ImportOptions {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            ..Default::default()
        };
        let window = options.date_window();
        assert!(window.admits(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(!window.admits(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
    }
}
