//! The persisted application state: tracked cities plus display settings.
//!
//! Every mutation builds a whole new [`AppState`] from the previous one; nothing
//! here patches a value in place. The on-disk form is a versioned JSON document,
//! upgraded through [`migrate`] when read.

use crate::common::CityId;
use crate::images::{placeholder_image, split_image_list};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Version stamped into every document this crate writes.
pub const CURRENT_SCHEMA_VERSION: u64 = 2;

/// A city whose local time is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: CityId,
    pub name: String,
    /// IANA zone identifier. Stored as given; validated when a city is added.
    pub tz: String,
    /// Comma, pipe or newline separated image URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl City {
    /// Creates a city with a freshly generated id.
    pub fn new(name: impl Into<String>, tz: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            id: CityId::generate(),
            name: name.into(),
            tz: tz.into(),
            image_url,
        }
    }

    /// The individual image URLs, in stored order.
    pub fn images(&self) -> Vec<&str> {
        self.image_url
            .as_deref()
            .map(split_image_list)
            .unwrap_or_default()
    }

    /// The first stored image, or a deterministic placeholder.
    pub fn hero_image(&self) -> String {
        self.images()
            .first()
            .map(|url| (*url).to_string())
            .unwrap_or_else(|| placeholder_image(&self.name, self.id.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockStyle {
    #[default]
    Digital,
    Analog,
}

impl ClockStyle {
    pub fn toggled(self) -> Self {
        match self {
            ClockStyle::Digital => ClockStyle::Analog,
            ClockStyle::Analog => ClockStyle::Digital,
        }
    }
}

/// Global display settings shared by every clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSettings {
    pub style: ClockStyle,
    pub show_seconds: bool,
    pub use24h: bool,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            style: ClockStyle::Digital,
            show_seconds: true,
            use24h: true,
        }
    }
}

impl ClockSettings {
    pub fn toggled_style(self) -> Self {
        Self {
            style: self.style.toggled(),
            ..self
        }
    }

    pub fn toggled_24h(self) -> Self {
        Self {
            use24h: !self.use24h,
            ..self
        }
    }

    pub fn toggled_seconds(self) -> Self {
        Self {
            show_seconds: !self.show_seconds,
            ..self
        }
    }
}

/// The single unit of persistence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppState {
    /// Display order is insertion order.
    pub cities: Vec<City>,
    pub settings: ClockSettings,
}

impl AppState {
    /// A copy with `city` appended.
    pub fn with_city(&self, city: City) -> Self {
        let mut cities = self.cities.clone();
        cities.push(city);
        Self {
            cities,
            settings: self.settings,
        }
    }

    /// A copy without the city identified by `id`. Unknown ids leave the list as is.
    pub fn without_city(&self, id: &CityId) -> Self {
        Self {
            cities: self
                .cities
                .iter()
                .filter(|c| &c.id != id)
                .cloned()
                .collect(),
            settings: self.settings,
        }
    }

    pub fn with_settings(&self, settings: ClockSettings) -> Self {
        Self {
            cities: self.cities.clone(),
            settings,
        }
    }

    pub fn find_city(&self, id: &CityId) -> Option<&City> {
        self.cities.iter().find(|c| &c.id == id)
    }
}

fn seed_images(seeds: [&str; 3]) -> Option<String> {
    Some(
        seeds
            .iter()
            .map(|seed| format!("https://picsum.photos/seed/{seed}/1600/900"))
            .collect::<Vec<_>>()
            .join(",\n"),
    )
}

/// The built-in starting document: Stockholm, New York and Tokyo.
///
/// Ids are freshly generated on every call. Hold on to one value if it must
/// compare equal later.
pub fn default_state() -> AppState {
    AppState {
        cities: vec![
            City::new(
                "Stockholm",
                "Europe/Stockholm",
                seed_images(["stockholm-forest", "stockholm-lake", "stockholm-nature"]),
            ),
            City::new(
                "New York",
                "America/New_York",
                seed_images(["catskills", "hudson-valley", "finger-lakes"]),
            ),
            City::new(
                "Tokyo",
                "Asia/Tokyo",
                seed_images(["japan-forest", "japan-river", "cherry-blossoms"]),
            ),
        ],
        settings: ClockSettings::default(),
    }
}

/// Reasons a stored document is refused.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document root is not a JSON object")]
    NotAnObject,
    #[error("document version {found} is newer than supported version {supported}")]
    TooNew { found: u64, supported: u64 },
    #[error("document version field is not a number")]
    BadVersion,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u64,
    #[serde(flatten)]
    state: &'a AppState,
}

/// Serializes `state` as the current document version.
pub fn encode_document(state: &AppState) -> Result<String, SchemaError> {
    Ok(serde_json::to_string(&DocumentRef {
        version: CURRENT_SCHEMA_VERSION,
        state,
    })?)
}

/// Parses a stored document of any known version.
pub fn decode_document(raw: &str) -> Result<AppState, SchemaError> {
    let value: Value = serde_json::from_str(raw)?;
    let value = migrate(value)?;
    Ok(serde_json::from_value(value)?)
}

type Migration = fn(&mut serde_json::Map<String, Value>);

/// v1 documents predate the version tag; the shape is otherwise unchanged.
fn v1_to_v2(_doc: &mut serde_json::Map<String, Value>) {}

/// Upgrades from version `n` to `n + 1`, indexed by `n - 1`.
const MIGRATIONS: &[Migration] = &[v1_to_v2];

/// Brings a raw document up to [`CURRENT_SCHEMA_VERSION`].
///
/// A missing `version` field means version 1.
pub fn migrate(mut value: Value) -> Result<Value, SchemaError> {
    let doc = value.as_object_mut().ok_or(SchemaError::NotAnObject)?;
    let mut version = match doc.get("version") {
        None => 1,
        Some(v) => v.as_u64().ok_or(SchemaError::BadVersion)?,
    };
    if version == 0 {
        return Err(SchemaError::BadVersion);
    }
    if version > CURRENT_SCHEMA_VERSION {
        return Err(SchemaError::TooNew {
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    while version < CURRENT_SCHEMA_VERSION {
        MIGRATIONS[(version - 1) as usize](doc);
        version += 1;
    }
    doc.insert("version".to_string(), Value::from(version));
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> AppState {
        AppState {
            cities: vec![
                City {
                    id: CityId::from("a"),
                    name: "Oslo".into(),
                    tz: "Europe/Oslo".into(),
                    image_url: None,
                },
                City {
                    id: CityId::from("b"),
                    name: "Lima".into(),
                    tz: "America/Lima".into(),
                    image_url: Some("https://x.example/1, https://x.example/2".into()),
                },
            ],
            settings: ClockSettings {
                style: ClockStyle::Analog,
                show_seconds: false,
                use24h: true,
            },
        }
    }

    #[test]
    fn default_document_has_three_seed_cities() {
        let state = default_state();
        let names: Vec<_> = state.cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Stockholm", "New York", "Tokyo"]);
        assert_eq!(state.settings, ClockSettings::default());
        assert!(state.cities.iter().all(|c| c.images().len() == 3));
    }

    #[test]
    fn document_uses_camel_case_and_version_tag() {
        let raw = encode_document(&sample()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], json!(CURRENT_SCHEMA_VERSION));
        assert_eq!(value["settings"]["showSeconds"], json!(false));
        assert_eq!(value["settings"]["use24h"], json!(true));
        assert_eq!(value["settings"]["style"], json!("analog"));
        assert_eq!(
            value["cities"][1]["imageUrl"],
            json!("https://x.example/1, https://x.example/2")
        );
        assert!(value["cities"][0].get("imageUrl").is_none());
    }

    #[test]
    fn document_round_trips() {
        let state = sample();
        let raw = encode_document(&state).unwrap();
        assert_eq!(decode_document(&raw).unwrap(), state);
    }

    #[test]
    fn legacy_unversioned_document_is_upgraded() {
        let raw = r#"{
            "cities": [{"id": "x1", "name": "Tokyo", "tz": "Asia/Tokyo"}],
            "settings": {"style": "digital", "showSeconds": true, "use24h": false}
        }"#;
        let state = decode_document(raw).unwrap();
        assert_eq!(state.cities[0].id, CityId::from("x1"));
        assert!(!state.settings.use24h);
    }

    #[test]
    fn rejects_unusable_documents() {
        assert!(matches!(decode_document("not json"), Err(SchemaError::Json(_))));
        assert!(matches!(decode_document("[1, 2]"), Err(SchemaError::NotAnObject)));
        assert!(matches!(
            decode_document(r#"{"version": 99, "cities": [], "settings": {}}"#),
            Err(SchemaError::TooNew { found: 99, .. })
        ));
        assert!(matches!(
            decode_document(r#"{"version": "two"}"#),
            Err(SchemaError::BadVersion)
        ));
        // Well-formed JSON with a missing field no longer slips through.
        assert!(matches!(
            decode_document(r#"{"cities": []}"#),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn copy_on_write_helpers_leave_the_original_alone() {
        let state = sample();
        let added = state.with_city(City::new("Cairo", "Africa/Cairo", None));
        let removed = state.without_city(&CityId::from("a"));
        let toggled = state.with_settings(state.settings.toggled_style());

        assert_eq!(state, sample());
        assert_eq!(added.cities.len(), 3);
        assert_eq!(added.cities[2].name, "Cairo");
        assert_eq!(removed.cities.len(), 1);
        assert_eq!(removed.cities[0].name, "Lima");
        assert_eq!(toggled.settings.style, ClockStyle::Digital);
        assert_eq!(state.without_city(&CityId::from("missing")), state);
    }

    #[test]
    fn settings_toggles_flip_one_field() {
        let s = ClockSettings::default();
        assert!(!s.toggled_seconds().show_seconds);
        assert!(!s.toggled_24h().use24h);
        assert_eq!(s.toggled_style().toggled_style(), s);
        assert_eq!(s.toggled_24h().style, s.style);
    }

    #[test]
    fn find_city_reports_absence() {
        let state = sample();
        assert_eq!(state.find_city(&CityId::from("b")).map(|c| c.name.as_str()), Some("Lima"));
        assert!(state.find_city(&CityId::from("zzz")).is_none());
    }

    #[test]
    fn hero_image_prefers_stored_list() {
        let state = sample();
        assert_eq!(state.cities[1].hero_image(), "https://x.example/1");
        assert_eq!(
            state.cities[0].hero_image(),
            "https://picsum.photos/seed/Oslo-a/1600/900"
        );
    }
}
