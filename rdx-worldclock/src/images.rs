//! Background image sets for cities.
//!
//! Images are plain URL strings. A city stores them as one delimited list, so
//! the persisted document stays a flat JSON string field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::form_urlencoded;

const PICSUM_BASE: &str = "https://picsum.photos/seed";
const IMAGE_SIZE: &str = "1600/900";

/// The continent a catalog city belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Continent {
    Europe,
    NorthAmerica,
    SouthAmerica,
    Asia,
    Africa,
    Oceania,
    Antarctica,
}

/// Section order used when grouping the catalog. Antarctica has no cities.
pub const CONTINENT_ORDER: [Continent; 6] = [
    Continent::Europe,
    Continent::NorthAmerica,
    Continent::SouthAmerica,
    Continent::Asia,
    Continent::Africa,
    Continent::Oceania,
];

impl Continent {
    /// Lowercase key used for image seeds and command-line input.
    pub fn slug(self) -> &'static str {
        match self {
            Continent::Europe => "europe",
            Continent::NorthAmerica => "northamerica",
            Continent::SouthAmerica => "southamerica",
            Continent::Asia => "asia",
            Continent::Africa => "africa",
            Continent::Oceania => "oceania",
            Continent::Antarctica => "antarctica",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::SouthAmerica => "South America",
            Continent::Asia => "Asia",
            Continent::Africa => "Africa",
            Continent::Oceania => "Oceania",
            Continent::Antarctica => "Antarctica",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown continent '{0}'")]
pub struct UnknownContinent(pub String);

impl FromStr for Continent {
    type Err = UnknownContinent;

    /// Accepts slugs and labels in any case, ignoring spaces, dashes and underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        CONTINENT_ORDER
            .iter()
            .chain(std::iter::once(&Continent::Antarctica))
            .copied()
            .find(|c| c.slug() == wanted)
            .ok_or_else(|| UnknownContinent(s.to_string()))
    }
}

/// Percent-encodes one URL component, spaces as `%20`.
fn encode_component(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn picsum_url(seed: &str) -> String {
    format!("{}/{}/{}", PICSUM_BASE, encode_component(seed), IMAGE_SIZE)
}

/// Four nature-themed picsum URLs for `continent`, joined with `", "`.
///
/// The set is a pure function of the continent, so every city added for the
/// same continent shares it.
pub fn image_set_for_continent(continent: Continent) -> String {
    let key = continent.slug();
    [
        format!("{key}-nature-1"),
        format!("{key}-mountains-2"),
        format!("{key}-forest-3"),
        format!("{key}-water-4"),
    ]
    .iter()
    .map(|seed| picsum_url(seed))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Splits a stored image list on commas, pipes and newlines.
pub fn split_image_list(raw: &str) -> Vec<&str> {
    raw.split(|c| matches!(c, ',' | '|' | '\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Deterministic stand-in used when a city has no usable image.
pub fn placeholder_image(name: &str, id: &str) -> String {
    picsum_url(&format!("{name}-{id}"))
}
