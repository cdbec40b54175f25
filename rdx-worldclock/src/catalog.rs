//! The fixed table of popular cities offered by the picker.

use crate::images::{Continent, CONTINENT_ORDER};

/// A city the picker can add with one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityOption {
    pub name: &'static str,
    pub tz: &'static str,
    pub continent: Continent,
}

const fn city(name: &'static str, tz: &'static str, continent: Continent) -> CityOption {
    CityOption {
        name,
        tz,
        continent,
    }
}

use Continent::{Africa, Asia, Europe, NorthAmerica, Oceania, SouthAmerica};

pub const POPULAR: &[CityOption] = &[
    city("Stockholm", "Europe/Stockholm", Europe),
    city("London", "Europe/London", Europe),
    city("Paris", "Europe/Paris", Europe),
    city("Berlin", "Europe/Berlin", Europe),
    city("Madrid", "Europe/Madrid", Europe),
    city("Rome", "Europe/Rome", Europe),
    city("Amsterdam", "Europe/Amsterdam", Europe),
    city("Brussels", "Europe/Brussels", Europe),
    city("Zurich", "Europe/Zurich", Europe),
    city("Vienna", "Europe/Vienna", Europe),
    city("Prague", "Europe/Prague", Europe),
    city("Warsaw", "Europe/Warsaw", Europe),
    city("Athens", "Europe/Athens", Europe),
    city("Helsinki", "Europe/Helsinki", Europe),
    city("Copenhagen", "Europe/Copenhagen", Europe),
    city("Oslo", "Europe/Oslo", Europe),
    city("Lisbon", "Europe/Lisbon", Europe),
    city("Reykjavik", "Atlantic/Reykjavik", Europe),
    city("Istanbul", "Europe/Istanbul", Europe),
    city("New York", "America/New_York", NorthAmerica),
    city("Chicago", "America/Chicago", NorthAmerica),
    city("Denver", "America/Denver", NorthAmerica),
    city("Los Angeles", "America/Los_Angeles", NorthAmerica),
    city("Toronto", "America/Toronto", NorthAmerica),
    city("Vancouver", "America/Vancouver", NorthAmerica),
    city("Mexico City", "America/Mexico_City", NorthAmerica),
    city("Honolulu", "Pacific/Honolulu", NorthAmerica),
    city("São Paulo", "America/Sao_Paulo", SouthAmerica),
    city("Buenos Aires", "America/Argentina/Buenos_Aires", SouthAmerica),
    city("Santiago", "America/Santiago", SouthAmerica),
    city("Lima", "America/Lima", SouthAmerica),
    city("Bogotá", "America/Bogota", SouthAmerica),
    city("Tokyo", "Asia/Tokyo", Asia),
    city("Seoul", "Asia/Seoul", Asia),
    city("Shanghai", "Asia/Shanghai", Asia),
    city("Beijing", "Asia/Shanghai", Asia),
    city("Hong Kong", "Asia/Hong_Kong", Asia),
    city("Taipei", "Asia/Taipei", Asia),
    city("Singapore", "Asia/Singapore", Asia),
    city("Bangkok", "Asia/Bangkok", Asia),
    city("Jakarta", "Asia/Jakarta", Asia),
    city("Kuala Lumpur", "Asia/Kuala_Lumpur", Asia),
    city("Manila", "Asia/Manila", Asia),
    city("Delhi", "Asia/Kolkata", Asia),
    city("Karachi", "Asia/Karachi", Asia),
    city("Dubai", "Asia/Dubai", Asia),
    city("Doha", "Asia/Qatar", Asia),
    city("Riyadh", "Asia/Riyadh", Asia),
    city("Tel Aviv", "Asia/Jerusalem", Asia),
    city("Cairo", "Africa/Cairo", Africa),
    city("Nairobi", "Africa/Nairobi", Africa),
    city("Johannesburg", "Africa/Johannesburg", Africa),
    city("Lagos", "Africa/Lagos", Africa),
    city("Casablanca", "Africa/Casablanca", Africa),
    city("Addis Ababa", "Africa/Addis_Ababa", Africa),
    city("Sydney", "Australia/Sydney", Oceania),
    city("Melbourne", "Australia/Melbourne", Oceania),
    city("Brisbane", "Australia/Brisbane", Oceania),
    city("Perth", "Australia/Perth", Oceania),
    city("Auckland", "Pacific/Auckland", Oceania),
    city("Wellington", "Pacific/Auckland", Oceania),
];

/// Catalog entries whose name contains `query`, case-insensitively.
///
/// An empty (or all-whitespace) query matches everything.
pub fn search(query: &str) -> Vec<&'static CityOption> {
    let needle = query.trim().to_lowercase();
    POPULAR
        .iter()
        .filter(|option| needle.is_empty() || option.name.to_lowercase().contains(&needle))
        .collect()
}

/// Search results split into continent sections, in display order.
///
/// Sections without a match are left out.
pub fn grouped(query: &str) -> Vec<(Continent, Vec<&'static CityOption>)> {
    let matches = search(query);
    CONTINENT_ORDER
        .iter()
        .map(|&continent| {
            let members: Vec<_> = matches
                .iter()
                .copied()
                .filter(|option| option.continent == continent)
                .collect();
            (continent, members)
        })
        .filter(|(_, members)| !members.is_empty())
        .collect()
}

/// Exact, case-insensitive lookup by city name.
pub fn find(name: &str) -> Option<&'static CityOption> {
    let name = name.trim().to_lowercase();
    POPULAR
        .iter()
        .find(|option| option.name.to_lowercase() == name)
}
