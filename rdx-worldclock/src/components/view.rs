//! Views turn the application state into frames, one per tick.
//!
//! A view never touches the store. It is handed the current document and the
//! tick instant and describes what a screen would show: digital text or
//! analog hand angles for each city.

use crate::clock::{resolve_zone, HandAngles, TimeParts};
use crate::common::{CityId, ViewId};
use crate::model::{AppState, City, ClockSettings, ClockStyle};
use crate::time::TickEvent;
use chrono::{DateTime, Utc};
use std::fmt;

/// What an attached view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    /// Every tracked city, in list order.
    Overview,
    /// A single city, with its background image.
    Detail(CityId),
}

/// How one clock face looks at one instant.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockDisplay {
    Digital(String),
    Analog {
        angles: HandAngles,
        /// The second hand is drawn only when seconds are shown.
        show_seconds: bool,
    },
    /// The city's zone could not be resolved. Rendering carries on for the others.
    Unavailable { reason: String },
}

impl fmt::Display for ClockDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockDisplay::Digital(text) => f.write_str(text),
            ClockDisplay::Analog {
                angles,
                show_seconds,
            } => {
                write!(f, "hour {:.1}° minute {:.1}°", angles.hour, angles.minute)?;
                if *show_seconds {
                    write!(f, " second {:.0}°", angles.second)?;
                }
                Ok(())
            }
            ClockDisplay::Unavailable { reason } => write!(f, "unavailable ({reason})"),
        }
    }
}

/// One city's clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockReading {
    pub city_id: CityId,
    pub name: String,
    pub display: ClockDisplay,
}

impl ClockReading {
    /// Reads `city`'s clock at `instant` under `settings`.
    pub fn for_city(city: &City, settings: &ClockSettings, instant: DateTime<Utc>) -> Self {
        let display = match resolve_zone(&city.tz) {
            Err(e) => ClockDisplay::Unavailable {
                reason: e.to_string(),
            },
            Ok(tz) => {
                let parts = TimeParts::in_zone(instant, tz);
                match settings.style {
                    ClockStyle::Digital => {
                        ClockDisplay::Digital(parts.format(settings.use24h, settings.show_seconds))
                    }
                    ClockStyle::Analog => ClockDisplay::Analog {
                        angles: HandAngles::from_parts(parts),
                        show_seconds: settings.show_seconds,
                    },
                }
            }
        };
        Self {
            city_id: city.id.clone(),
            name: city.name.clone(),
            display,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameContent {
    Overview(Vec<ClockReading>),
    Detail {
        reading: ClockReading,
        hero_image: String,
    },
    /// The detail view's city is gone. Consumers should offer a way back.
    CityNotFound(CityId),
}

/// Everything one view shows for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockFrame {
    pub view: ViewId,
    pub tick_count: u64,
    pub timestamp: DateTime<Utc>,
    pub content: FrameContent,
}

/// An attached consumer of frames.
#[derive(Debug, Clone)]
pub struct ClockView {
    kind: ViewKind,
}

impl ClockView {
    pub(crate) fn new(kind: ViewKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &ViewKind {
        &self.kind
    }

    /// Renders this view against `state` at the tick's instant.
    pub(crate) fn render(&self, id: ViewId, state: &AppState, tick: &TickEvent) -> ClockFrame {
        let instant = tick.timestamp;
        let content = match &self.kind {
            ViewKind::Overview => FrameContent::Overview(
                state
                    .cities
                    .iter()
                    .map(|city| ClockReading::for_city(city, &state.settings, instant))
                    .collect(),
            ),
            ViewKind::Detail(city_id) => match state.find_city(city_id) {
                Some(city) => FrameContent::Detail {
                    reading: ClockReading::for_city(city, &state.settings, instant),
                    hero_image: city.hero_image(),
                },
                None => FrameContent::CityNotFound(city_id.clone()),
            },
        };
        ClockFrame {
            view: id,
            tick_count: tick.tick_count,
            timestamp: instant,
            content,
        }
    }
}
