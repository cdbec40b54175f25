//! The application state store.
//!
//! A [`StateStore`] owns the one [`AppState`] document and mirrors it to a
//! [`KeyValueStorage`] under a single key. It is handed explicitly to whoever
//! needs it; there is no ambient global document.
//!
//! Storage trouble never reaches the caller. Reads fall back to the default
//! document and failed writes are logged and dropped, leaving the in-memory
//! value authoritative for the rest of the session.

use crate::catalog::CityOption;
use crate::clock::{resolve_zone, ClockError};
use crate::common::CityId;
use crate::images::{image_set_for_continent, Continent};
use crate::model::{decode_document, encode_document, AppState, City, ClockSettings};
use crate::storage::KeyValueStorage;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The storage key used when none is configured.
pub const DEFAULT_STATE_KEY: &str = "wc-state";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),

    #[error(transparent)]
    UnknownZone(#[from] ClockError),
}

/// Reads the document stored under `key`, or returns `default`.
///
/// Absent documents, storage failures and documents that fail to parse or
/// migrate all resolve to `default`.
pub fn load_state(storage: &dyn KeyValueStorage, key: &str, default: AppState) -> AppState {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No stored document; using default state.");
            return default;
        }
        Err(e) => {
            warn!(key, error = %e, "Could not read stored document; using default state.");
            return default;
        }
    };
    match decode_document(&raw) {
        Ok(state) => state,
        Err(e) => {
            warn!(key, error = %e, "Stored document rejected; using default state.");
            default
        }
    }
}

/// Writes `state` under `key`. Failures are logged and swallowed.
pub fn save_state(storage: &dyn KeyValueStorage, key: &str, state: &AppState) {
    let raw = match encode_document(state) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "Could not serialize state; not persisted.");
            return;
        }
    };
    if let Err(e) = storage.set(key, &raw) {
        warn!(key, error = %e, "Could not persist state; keeping in-memory value.");
    }
}

/// A city entered by hand or picked from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCity {
    pub name: String,
    pub tz: String,
    pub continent: Continent,
}

impl From<&CityOption> for NewCity {
    fn from(option: &CityOption) -> Self {
        Self {
            name: option.name.to_string(),
            tz: option.tz.to_string(),
            continent: option.continent,
        }
    }
}

/// Holds the application state and keeps storage in step with it.
pub struct StateStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    default: AppState,
    current: AppState,
}

impl StateStore {
    /// Loads the document under `key`, falling back to `default`.
    ///
    /// Nothing is written until the first mutation.
    pub fn open(
        storage: Arc<dyn KeyValueStorage>,
        key: impl Into<String>,
        default: AppState,
    ) -> Self {
        let key = key.into();
        let current = load_state(storage.as_ref(), &key, default.clone());
        info!(key = %key, cities = current.cities.len(), "State store opened.");
        Self {
            storage,
            key,
            default,
            current,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.current
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The document `reset` reinstates.
    pub fn default_state(&self) -> &AppState {
        &self.default
    }

    /// Re-reads what storage currently holds, without touching the in-memory value.
    pub fn load(&self) -> AppState {
        load_state(self.storage.as_ref(), &self.key, self.default.clone())
    }

    /// Swaps in a complete new document and persists it.
    ///
    /// Every user action goes through here.
    pub fn replace(&mut self, new_state: AppState) {
        debug!(
            cities = new_state.cities.len(),
            settings = ?new_state.settings,
            "Replacing application state."
        );
        self.current = new_state;
        save_state(self.storage.as_ref(), &self.key, &self.current);
    }

    /// Discards the stored document and reinstates the default one.
    pub fn reset(&mut self) {
        if let Err(e) = self.storage.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Could not remove stored document.");
        }
        info!(key = %self.key, "Resetting to default state.");
        self.replace(self.default.clone());
    }

    /// Adds a city after checking its name and zone.
    ///
    /// The city gets a fresh id and the image set of its continent.
    pub fn add_city(&mut self, city: NewCity) -> Result<CityId, StoreError> {
        let name = city.name.trim();
        if name.is_empty() {
            return Err(StoreError::MissingField("name"));
        }
        let tz = city.tz.trim();
        if tz.is_empty() {
            return Err(StoreError::MissingField("time zone"));
        }
        resolve_zone(tz)?;

        let new_city = City::new(name, tz, Some(image_set_for_continent(city.continent)));
        let id = new_city.id.clone();
        self.replace(self.current.with_city(new_city));
        Ok(id)
    }

    pub fn add_from_catalog(&mut self, option: &CityOption) -> Result<CityId, StoreError> {
        self.add_city(NewCity::from(option))
    }

    /// Returns `false` when no city had that id.
    pub fn remove_city(&mut self, id: &CityId) -> bool {
        if self.current.find_city(id).is_none() {
            return false;
        }
        self.replace(self.current.without_city(id));
        true
    }

    pub fn find_city(&self, id: &CityId) -> Option<&City> {
        self.current.find_city(id)
    }

    pub fn toggle_style(&mut self) -> ClockSettings {
        self.update_settings(ClockSettings::toggled_style)
    }

    pub fn toggle_24h(&mut self) -> ClockSettings {
        self.update_settings(ClockSettings::toggled_24h)
    }

    pub fn toggle_seconds(&mut self) -> ClockSettings {
        self.update_settings(ClockSettings::toggled_seconds)
    }

    fn update_settings(&mut self, f: impl FnOnce(ClockSettings) -> ClockSettings) -> ClockSettings {
        let settings = f(self.current.settings);
        self.replace(self.current.with_settings(settings));
        settings
    }
}
