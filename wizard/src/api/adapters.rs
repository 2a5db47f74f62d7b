//! Response-shape adapters.
//!
//! The backend has drifted through several schema vintages, so every entity
//! arrives with optional field-name variants. Each adapter applies a fixed
//! precedence order and produces the canonical type, isolating that drift
//! from the domain model.
//!
//! Precedence tables:
//!
//! - unit id: `id` → `_id` → `slug` → `name`
//! - unit name: `name` → `title` → `slug`
//! - area id: `id` → `_id`
//! - area name: `name` → `title`
//! - description: `description` → `desc` → `area.description`
//! - icon: `iconEmoji` → `icon_emoji` → `area.iconEmoji` → `area.icon_emoji`
//! - photo: `photoUrlAbsolute` → `photoPath` → `photoUrl` → `photo` →
//!   `imageUrl` → `image` → `coverUrl` → `photo_url` → the same chain under
//!   `area.*`
//! - remaining seats: `available` → `remaining`

use crate::state::{AreaAvailability, AreaMeta, ReservationRecord, ReservationStatus, UnitOption};
use serde::Deserialize;
use url::Url;

// ═══════════════════════════════════════════════════════════════════════
// Photo references
// ═══════════════════════════════════════════════════════════════════════

/// A photo reference as the backend sends it: a plain string, an object
/// wrapping a `url`, or junk.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PhotoRef {
    /// Plain string reference.
    Text(String),
    /// Object wrapping the reference.
    Object {
        /// The wrapped URL.
        url: Option<String>,
    },
    /// Anything else; treated as absent.
    Other(serde_json::Value),
}

fn sanitize_photo(raw: &PhotoRef) -> Option<String> {
    let value = match raw {
        PhotoRef::Text(s) => s.clone(),
        PhotoRef::Object { url } => url.clone().unwrap_or_default(),
        PhotoRef::Other(_) => return None,
    };
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "null"
        || trimmed == "undefined"
        || trimmed == "[object Object]"
    {
        return None;
    }
    Some(trimmed.to_string())
}

/// Resolve a photo reference into an absolute URL.
///
/// Absolute, protocol-relative, and `data:` references pass through;
/// relative paths are prefixed with the configured asset base.
#[must_use]
pub fn resolve_photo(raw: Option<&PhotoRef>, asset_base: Option<&Url>) -> Option<String> {
    let sanitized = sanitize_photo(raw?)?;
    let normalized = sanitized.replace('\\', "/");
    let s = normalized.trim();

    if let Some(rest) = s.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    let lowered = s.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") || lowered.starts_with("data:") {
        return Some(s.to_string());
    }

    let path = s.trim_start_matches('/');
    match asset_base {
        Some(base) => {
            let base_str = base.as_str().trim_end_matches('/');
            Some(format!("{base_str}/{path}"))
        },
        None => Some(format!("/{path}")),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Units
// ═══════════════════════════════════════════════════════════════════════

/// A unit option as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUnit {
    id: Option<String>,
    #[serde(rename = "_id")]
    id_fallback: Option<String>,
    slug: Option<String>,
    name: Option<String>,
    title: Option<String>,
}

impl RawUnit {
    /// Apply the unit precedence table. Entries with no usable id are
    /// dropped.
    #[must_use]
    pub fn normalize(self) -> Option<UnitOption> {
        let id = [&self.id, &self.id_fallback, &self.slug, &self.name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())?
            .to_string();
        let name = [&self.name, &self.title, &self.slug]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        Some(UnitOption {
            id: id.into(),
            name,
            slug: self.slug.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Normalize a raw unit list.
#[must_use]
pub fn normalize_units(raw: Vec<RawUnit>) -> Vec<UnitOption> {
    raw.into_iter().filter_map(RawUnit::normalize).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Areas
// ═══════════════════════════════════════════════════════════════════════

/// Descriptive fields some vintages nest under an `area` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAreaNested {
    description: Option<String>,
    #[serde(rename = "iconEmoji")]
    icon_emoji: Option<String>,
    #[serde(rename = "icon_emoji")]
    icon_emoji_snake: Option<String>,
    #[serde(rename = "photoUrl")]
    photo_url: Option<PhotoRef>,
    photo: Option<PhotoRef>,
    #[serde(rename = "imageUrl")]
    image_url: Option<PhotoRef>,
    image: Option<PhotoRef>,
    #[serde(rename = "coverUrl")]
    cover_url: Option<PhotoRef>,
}

/// An area as either the metadata or the availability endpoint sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawArea {
    id: Option<String>,
    #[serde(rename = "_id")]
    id_fallback: Option<String>,
    name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    desc: Option<String>,
    #[serde(rename = "iconEmoji")]
    icon_emoji: Option<String>,
    #[serde(rename = "icon_emoji")]
    icon_emoji_snake: Option<String>,
    #[serde(rename = "photoUrlAbsolute")]
    photo_url_absolute: Option<PhotoRef>,
    #[serde(rename = "photoPath")]
    photo_path: Option<PhotoRef>,
    #[serde(rename = "photoUrl")]
    photo_url: Option<PhotoRef>,
    photo: Option<PhotoRef>,
    #[serde(rename = "imageUrl")]
    image_url: Option<PhotoRef>,
    image: Option<PhotoRef>,
    #[serde(rename = "coverUrl")]
    cover_url: Option<PhotoRef>,
    #[serde(rename = "photo_url")]
    photo_url_snake: Option<PhotoRef>,
    area: Option<Box<RawAreaNested>>,
    capacity: Option<u32>,
    available: Option<u32>,
    remaining: Option<u32>,
    #[serde(rename = "isAvailable")]
    is_available: Option<bool>,
}

impl RawArea {
    fn canonical_id(&self) -> Option<String> {
        [&self.id, &self.id_fallback]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(ToString::to_string)
    }

    fn canonical_name(&self) -> String {
        [&self.name, &self.title]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    }

    fn canonical_description(&self) -> String {
        let nested = self.area.as_ref().and_then(|a| a.description.as_ref());
        [self.description.as_ref(), self.desc.as_ref(), nested]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    }

    fn canonical_icon(&self) -> Option<String> {
        let nested = self.area.as_ref();
        [
            self.icon_emoji.as_ref(),
            self.icon_emoji_snake.as_ref(),
            nested.and_then(|a| a.icon_emoji.as_ref()),
            nested.and_then(|a| a.icon_emoji_snake.as_ref()),
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(ToString::to_string)
    }

    fn canonical_photo(&self, asset_base: Option<&Url>) -> Option<String> {
        let nested = self.area.as_ref();
        let refs = [
            self.photo_url_absolute.as_ref(),
            self.photo_path.as_ref(),
            self.photo_url.as_ref(),
            self.photo.as_ref(),
            self.image_url.as_ref(),
            self.image.as_ref(),
            self.cover_url.as_ref(),
            self.photo_url_snake.as_ref(),
            nested.and_then(|a| a.photo_url.as_ref()),
            nested.and_then(|a| a.photo.as_ref()),
            nested.and_then(|a| a.image_url.as_ref()),
            nested.and_then(|a| a.image.as_ref()),
            nested.and_then(|a| a.cover_url.as_ref()),
        ];
        refs.into_iter()
            .flatten()
            .find_map(|r| resolve_photo(Some(r), asset_base))
    }

    /// Normalize into date-independent metadata.
    #[must_use]
    pub fn normalize_meta(self, asset_base: Option<&Url>) -> Option<AreaMeta> {
        let id = self.canonical_id()?;
        Some(AreaMeta {
            id: id.into(),
            name: self.canonical_name(),
            description: self.canonical_description(),
            photo_url: self.canonical_photo(asset_base),
            icon_emoji: self.canonical_icon(),
        })
    }

    /// Normalize into a tuple-scoped availability record.
    ///
    /// `is_available` defaults to "any seats left" when the server does not
    /// compute it.
    #[must_use]
    pub fn normalize_availability(self, asset_base: Option<&Url>) -> Option<AreaAvailability> {
        let id = self.canonical_id()?;
        let remaining = self.available.or(self.remaining);
        let is_available = self
            .is_available
            .unwrap_or_else(|| remaining.unwrap_or(0) > 0);
        Some(AreaAvailability {
            id: id.into(),
            name: self.canonical_name(),
            description: self.canonical_description(),
            photo_url: self.canonical_photo(asset_base),
            icon_emoji: self.canonical_icon(),
            capacity: self.capacity,
            remaining,
            is_available: Some(is_available),
        })
    }
}

/// Normalize a raw area list into metadata records.
#[must_use]
pub fn normalize_meta_list(raw: Vec<RawArea>, asset_base: Option<&Url>) -> Vec<AreaMeta> {
    raw.into_iter()
        .filter_map(|a| a.normalize_meta(asset_base))
        .collect()
}

/// Normalize a raw area list into availability records.
#[must_use]
pub fn normalize_availability_list(
    raw: Vec<RawArea>,
    asset_base: Option<&Url>,
) -> Vec<AreaAvailability> {
    raw.into_iter()
        .filter_map(|a| a.normalize_availability(asset_base))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Reservations
// ═══════════════════════════════════════════════════════════════════════

/// A reservation as the active/lookup endpoints send it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReservation {
    id: String,
    #[serde(rename = "reservationCode")]
    reservation_code: Option<String>,
    #[serde(rename = "unitId")]
    unit_id: Option<String>,
    unit: Option<String>,
    #[serde(rename = "areaId")]
    area_id: Option<String>,
    #[serde(rename = "areaName")]
    area_name: Option<String>,
    area: Option<String>,
    #[serde(rename = "reservationDate")]
    reservation_date: String,
    people: Option<u32>,
    kids: Option<u32>,
    #[serde(rename = "fullName")]
    full_name: Option<String>,
    cpf: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    status: Option<String>,
    #[serde(rename = "reservationType")]
    reservation_type: Option<String>,
    utm_campaign: Option<String>,
}

impl RawReservation {
    /// Normalize into the canonical record.
    ///
    /// Unit and area labels prefer the modern fields (`unit`/`unitId`,
    /// `areaName`/`area`), then fall back to the legacy `utm_campaign`
    /// `"unit:area"` encoding. An unknown status string is normalized to
    /// awaiting-check-in with a warning rather than trusted.
    #[must_use]
    pub fn normalize(self) -> Option<ReservationRecord> {
        let reservation_at = chrono::DateTime::parse_from_rfc3339(&self.reservation_date)
            .ok()?
            .with_timezone(&chrono::Utc);

        let legacy = self
            .utm_campaign
            .as_deref()
            .and_then(|c| c.split_once(':'))
            .map(|(u, a)| (u.to_string(), a.to_string()));

        let unit_label = self
            .unit
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| legacy.as_ref().map(|(u, _)| u.clone()))
            .unwrap_or_default();
        let area_name = self
            .area_name
            .clone()
            .or(self.area.clone())
            .filter(|s| !s.trim().is_empty())
            .or_else(|| legacy.as_ref().map(|(_, a)| a.clone()))
            .unwrap_or_default();

        let status = match self.status.as_deref() {
            Some(raw) => ReservationStatus::parse(raw).unwrap_or_else(|| {
                tracing::warn!(status = raw, "unknown reservation status from server");
                ReservationStatus::AwaitingCheckin
            }),
            None => ReservationStatus::AwaitingCheckin,
        };

        Some(ReservationRecord {
            id: self.id.into(),
            code: self.reservation_code.unwrap_or_default(),
            unit_id: self
                .unit_id
                .or_else(|| legacy.as_ref().map(|(u, _)| u.clone()))
                .map(Into::into),
            unit_label,
            area_id: self.area_id.map(Into::into),
            area_name,
            reservation_at,
            people: self.people.unwrap_or(0),
            kids: self.kids.unwrap_or(0),
            full_name: self.full_name,
            cpf: self.cpf,
            email: self.email,
            phone: self.phone,
            status,
            reservation_type: self
                .reservation_type
                .as_deref()
                .and_then(crate::state::ReservationType::parse),
        })
    }
}
