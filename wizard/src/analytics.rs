//! Analytics client.
//!
//! Tracking-pixel state is an explicit injected instance owned by the
//! application root and passed down through the environment; there is no
//! process-wide global. The client keeps the set of initialized pixel ids
//! and the currently active one behind interior mutability.

use crate::state::UnitOption;
use crate::validation::strip_accents;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Payload attached to reservation analytics events.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReservationEvent {
    /// Locator code.
    pub reservation_code: String,
    /// Guest name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone, digits only.
    pub phone: String,
    /// Unit label or slug.
    pub unit: String,
    /// Area name.
    pub area: String,
    /// Reservation status at event time.
    pub status: String,
    /// Acquisition source tag.
    pub source: String,
}

/// Normalize a unit key (slug or display name) for pixel-map lookup:
/// accents stripped, lowercased, punctuation dropped, hyphens kept.
#[must_use]
pub fn normalize_unit_key(input: &str) -> String {
    let lowered = strip_accents(input.trim());
    let mut out = String::with_capacity(lowered.len());
    let mut last_space = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            if !last_space && !out.is_empty() {
                out.push(' ');
            }
            last_space = true;
        } else if c.is_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
            last_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Analytics sink injected into the wizard environment.
pub trait AnalyticsClient: Send + Sync {
    /// Perform one-time bootstrap. Idempotent.
    fn ensure_ready(&self);

    /// Activate the pixel mapped to `key` (a unit slug, name, or id).
    ///
    /// Returns `true` when a pixel was found and activated.
    fn set_active_unit(&self, key: &str) -> bool;

    /// Emit an event on the active pixel.
    fn track(&self, event: &str, payload: &ReservationEvent);

    /// Activate a pixel for a unit option, trying slug, name, then id.
    fn set_active_unit_from(&self, unit: &UnitOption) {
        let candidates = [
            unit.slug.as_deref(),
            Some(unit.name.as_str()),
            Some(unit.id.as_str()),
        ];
        for candidate in candidates.into_iter().flatten() {
            if self.set_active_unit(candidate) {
                return;
            }
        }
        tracing::debug!(unit = %unit.id, "no pixel match for unit");
    }
}

#[derive(Debug, Default)]
struct PixelState {
    ready: bool,
    loaded: HashSet<String>,
    active: Option<String>,
}

/// Pixel-backed analytics client.
///
/// Holds a unit-key → pixel-id table (keys are normalized at construction)
/// and tracks which pixel ids have been initialized so each is bootstrapped
/// once.
#[derive(Debug, Clone)]
pub struct PixelAnalytics {
    pixel_map: Arc<HashMap<String, String>>,
    state: Arc<Mutex<PixelState>>,
}

impl PixelAnalytics {
    /// Build a client from `(unit key, pixel id)` pairs.
    #[must_use]
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let pixel_map = pairs
            .into_iter()
            .map(|(k, v)| (normalize_unit_key(k.as_ref()), v.into()))
            .collect();
        Self {
            pixel_map: Arc::new(pixel_map),
            state: Arc::new(Mutex::new(PixelState::default())),
        }
    }

    /// The currently active pixel id, if any.
    #[must_use]
    pub fn active_pixel(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.active.clone())
    }
}

impl AnalyticsClient for PixelAnalytics {
    fn ensure_ready(&self) {
        if let Ok(mut state) = self.state.lock() {
            if !state.ready {
                state.ready = true;
                tracing::debug!("analytics bootstrap complete");
            }
        }
    }

    fn set_active_unit(&self, key: &str) -> bool {
        let Some(pixel_id) = self.pixel_map.get(&normalize_unit_key(key)) else {
            return false;
        };
        if let Ok(mut state) = self.state.lock() {
            if state.loaded.insert(pixel_id.clone()) {
                tracing::debug!(pixel = %pixel_id, "pixel initialized");
            }
            state.active = Some(pixel_id.clone());
        }
        true
    }

    fn track(&self, event: &str, payload: &ReservationEvent) {
        let active = self.active_pixel();
        tracing::info!(
            event,
            pixel = active.as_deref().unwrap_or("-"),
            unit = %payload.unit,
            unit_slug = %normalize_unit_key(&payload.unit),
            area = %payload.area,
            code = %payload.reservation_code,
            status = %payload.status,
            source = %payload.source,
            "analytics event"
        );
    }
}
