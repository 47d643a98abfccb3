//! Legacy timezone name resolution.
//!
//! Outlook ICS exports label times with Windows timezone names (for example
//! `"Eastern Standard Time"`); the target calendar service only understands
//! IANA identifiers. [`TimezoneMap`] translates between the two vocabularies
//! with a static table and a case-sensitive exact match.
//!
//! Unknown names fail with [`TimezoneUnresolved`] instead of guessing; the
//! normalizer owns the fallback policy and surfaces every fallback in the
//! run summary.

use std::collections::HashMap;
use std::str::FromStr;

use chrono_tz::Tz;
use thiserror::Error;

/// A legacy timezone name the table does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved legacy timezone name {name:?}")]
pub struct TimezoneUnresolved {
    /// The name as it appeared in the source.
    pub name: String,
}

/// Windows/Outlook timezone names and their IANA equivalents.
const LEGACY_ZONES: &[(&str, &str)] = &[
    ("Eastern Standard Time", "America/New_York"),
    ("Eastern Daylight Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Central Daylight Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("Mountain Daylight Time", "America/Denver"),
    ("US Mountain Standard Time", "America/Phoenix"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("Pacific Daylight Time", "America/Los_Angeles"),
    ("Alaska Standard Time", "America/Anchorage"),
    ("Hawaiian Standard Time", "Pacific/Honolulu"),
    ("Atlantic Standard Time", "America/Halifax"),
    ("Newfoundland Standard Time", "America/St_Johns"),
    ("Canada Central Standard Time", "America/Regina"),
    ("Central America Standard Time", "America/Guatemala"),
    ("SA Pacific Standard Time", "America/Bogota"),
    ("Venezuela Standard Time", "America/Caracas"),
    ("Pacific SA Standard Time", "America/Santiago"),
    ("Argentina Standard Time", "America/Argentina/Buenos_Aires"),
    ("E. South America Standard Time", "America/Sao_Paulo"),
    ("GMT Standard Time", "Europe/London"),
    ("Greenwich Standard Time", "Atlantic/Reykjavik"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central European Standard Time", "Europe/Budapest"),
    ("E. Europe Standard Time", "Europe/Bucharest"),
    ("FLE Standard Time", "Europe/Kiev"),
    ("Russian Standard Time", "Europe/Moscow"),
    ("Turkey Standard Time", "Europe/Istanbul"),
    ("Morocco Standard Time", "Africa/Casablanca"),
    ("Egypt Standard Time", "Africa/Cairo"),
    ("South Africa Standard Time", "Africa/Johannesburg"),
    ("W. Central Africa Standard Time", "Africa/Lagos"),
    ("E. Africa Standard Time", "Africa/Nairobi"),
    ("Mauritius Standard Time", "Indian/Mauritius"),
    ("Azores Standard Time", "Atlantic/Azores"),
    ("Cape Verde Standard Time", "Atlantic/Cape_Verde"),
    ("Arab Standard Time", "Asia/Riyadh"),
    ("Arabian Standard Time", "Asia/Dubai"),
    ("Israel Standard Time", "Asia/Jerusalem"),
    ("Georgian Standard Time", "Asia/Tbilisi"),
    ("Caucasus Standard Time", "Asia/Yerevan"),
    ("Iran Standard Time", "Asia/Tehran"),
    ("Afghanistan Standard Time", "Asia/Kabul"),
    ("Pakistan Standard Time", "Asia/Karachi"),
    ("West Asia Standard Time", "Asia/Tashkent"),
    ("India Standard Time", "Asia/Kolkata"),
    ("Sri Lanka Standard Time", "Asia/Colombo"),
    ("Nepal Standard Time", "Asia/Kathmandu"),
    ("Central Asia Standard Time", "Asia/Almaty"),
    ("Bangladesh Standard Time", "Asia/Dhaka"),
    ("Myanmar Standard Time", "Asia/Yangon"),
    ("SE Asia Standard Time", "Asia/Bangkok"),
    ("North Asia Standard Time", "Asia/Krasnoyarsk"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Singapore Standard Time", "Asia/Singapore"),
    ("Taipei Standard Time", "Asia/Taipei"),
    ("Ulaanbaatar Standard Time", "Asia/Ulaanbaatar"),
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("Korea Standard Time", "Asia/Seoul"),
    ("W. Australia Standard Time", "Australia/Perth"),
    ("Cen. Australia Standard Time", "Australia/Adelaide"),
    ("AUS Central Standard Time", "Australia/Darwin"),
    ("E. Australia Standard Time", "Australia/Brisbane"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("Tasmania Standard Time", "Australia/Hobart"),
    ("West Pacific Standard Time", "Pacific/Port_Moresby"),
    ("New Zealand Standard Time", "Pacific/Auckland"),
    ("Fiji Standard Time", "Pacific/Fiji"),
    ("Tonga Standard Time", "Pacific/Tongatapu"),
    ("Samoa Standard Time", "Pacific/Apia"),
    ("UTC", "UTC"),
    ("Coordinated Universal Time", "UTC"),
];

/// Immutable translation table from legacy timezone names to IANA
/// identifiers.
///
/// A name that is already a valid IANA zone resolves to itself; otherwise
/// the table is consulted with a case-sensitive exact match. The table is
/// built once and injected wherever resolution is needed.
#[derive(Debug, Clone)]
pub struct TimezoneMap {
    entries: HashMap<String, String>,
}

impl Default for TimezoneMap {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TimezoneMap {
    /// Builds the map from the built-in legacy-name table.
    pub fn with_defaults() -> Self {
        Self::from_pairs(LEGACY_ZONES.iter().map(|&(k, v)| (k, v)))
    }

    /// Builds a map from arbitrary name pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Number of legacy names the map covers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `name` is either a valid IANA zone or a known legacy
    /// name.
    pub fn can_resolve(&self, name: &str) -> bool {
        Tz::from_str(name).is_ok() || self.entries.contains_key(name)
    }

    /// Resolves a timezone name to an IANA identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TimezoneUnresolved`] when the name is neither a valid IANA
    /// zone nor present in the legacy table. No fuzzy matching is attempted.
    pub fn resolve(&self, name: &str) -> Result<String, TimezoneUnresolved> {
        if Tz::from_str(name).is_ok() {
            return Ok(name.to_string());
        }
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| TimezoneUnresolved {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_at_least_forty_legacy_names() {
        let map = TimezoneMap::with_defaults();
        assert!(map.len() >= 40, "table has only {} entries", map.len());
    }

    #[test]
    fn resolves_documented_names() {
        let map = TimezoneMap::with_defaults();
        assert_eq!(
            map.resolve("Eastern Standard Time").unwrap(),
            "America/New_York"
        );
        assert_eq!(
            map.resolve("Pacific Standard Time").unwrap(),
            "America/Los_Angeles"
        );
        assert_eq!(map.resolve("GMT Standard Time").unwrap(), "Europe/London");
        assert_eq!(map.resolve("Tokyo Standard Time").unwrap(), "Asia/Tokyo");
        assert_eq!(map.resolve("India Standard Time").unwrap(), "Asia/Kolkata");
        assert_eq!(
            map.resolve("AUS Eastern Standard Time").unwrap(),
            "Australia/Sydney"
        );
        assert_eq!(map.resolve("Coordinated Universal Time").unwrap(), "UTC");
    }

    #[test]
    fn every_mapped_zone_is_a_valid_iana_identifier() {
        for (legacy, iana) in LEGACY_ZONES {
            assert!(
                Tz::from_str(iana).is_ok(),
                "{legacy} maps to invalid zone {iana}"
            );
        }
    }

    #[test]
    fn iana_names_pass_through() {
        let map = TimezoneMap::with_defaults();
        assert_eq!(map.resolve("America/New_York").unwrap(), "America/New_York");
        assert_eq!(map.resolve("Europe/Vilnius").unwrap(), "Europe/Vilnius");
        assert_eq!(map.resolve("UTC").unwrap(), "UTC");
    }

    #[test]
    fn unknown_name_is_an_error_not_a_guess() {
        let map = TimezoneMap::with_defaults();
        let err = map.resolve("Totally Made Up Time").unwrap_err();
        assert_eq!(err.name, "Totally Made Up Time");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let map = TimezoneMap::with_defaults();
        assert!(map.resolve("eastern standard time").is_err());
        assert!(map.resolve("EASTERN STANDARD TIME").is_err());
    }

    #[test]
    fn no_partial_matching() {
        let map = TimezoneMap::with_defaults();
        assert!(map.resolve("Eastern").is_err());
        assert!(map.resolve("Eastern Standard Time (US)").is_err());
    }

    #[test]
    fn custom_pairs() {
        let map = TimezoneMap::from_pairs([("House Time", "Europe/Amsterdam")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve("House Time").unwrap(), "Europe/Amsterdam");
        assert!(map.resolve("Eastern Standard Time").is_err());
        assert!(map.can_resolve("House Time"));
        assert!(!map.can_resolve("Eastern Standard Time"));
    }
}
