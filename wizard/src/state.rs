//! Reservation wizard state types.
//!
//! All types are `Clone` to support the functional architecture pattern.
//! The wizard state machine exclusively owns the draft and the current
//! availability set; the confirmed [`ReservationRecord`] is a read-only
//! projection of what the server returned.

use crate::constants::{CONCIERGE_CEILING, MIN_PEOPLE};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Identifier of a physical restaurant location.
///
/// The backend emits these as opaque strings (ids, slugs, or legacy names
/// depending on endpoint vintage); the adapter layer picks one per its
/// precedence table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub String);

/// Identifier of a seating section within a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaId(pub String);

/// Identifier of a server-confirmed reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// View the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(UnitId);
string_id!(AreaId);
string_id!(ReservationId);

// ═══════════════════════════════════════════════════════════════════════
// Closed enumerations
// ═══════════════════════════════════════════════════════════════════════

/// Kind of reservation being made.
///
/// Modeled as a closed enumeration with an exhaustive wire mapping; unknown
/// server strings are normalized through [`ReservationType::parse`] rather
/// than trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationType {
    /// Birthday celebration.
    Birthday,
    /// Private booking for the guest and their party.
    Personal,
    /// Graduations, reunions, farewells.
    GroupCelebration,
    /// Corporate events.
    Company,
}

impl ReservationType {
    /// Wire representation sent to and received from the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Birthday => "BIRTHDAY",
            Self::Personal => "PERSONAL",
            Self::GroupCelebration => "GROUP_CELEBRATION",
            Self::Company => "COMPANY",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Birthday => "Birthday",
            Self::Personal => "Personal",
            Self::GroupCelebration => "Group celebration",
            Self::Company => "Company",
        }
    }

    /// Parse a server-provided string, tolerating the synonyms older
    /// backend versions emit. Returns `None` for anything unrecognized.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = crate::validation::strip_accents(raw.trim()).to_uppercase();
        match normalized.as_str() {
            "BIRTHDAY" | "NIVER" | "ANIVERSARIO" => Some(Self::Birthday),
            "PERSONAL" | "PRIVATE" | "PARTICULAR" | "PESSOAL" | "PRIVADO" => Some(Self::Personal),
            "GROUP_CELEBRATION" | "CELEBRATION" | "CONFRATERNIZACAO" | "CONFRATERNIZACAO/GRUPO" => {
                Some(Self::GroupCelebration)
            },
            "COMPANY" | "CORPORATE" | "EMPRESA" | "CORPORATIVO" => Some(Self::Company),
            _ => None,
        }
    }

    /// Resolve the client-chosen type against the server's stored value.
    ///
    /// A client-chosen `Birthday` is sticky: it wins over whatever the
    /// server stored. Any other client choice defers to the server value
    /// when one is present.
    #[must_use]
    pub fn reconcile(self, server: Option<Self>) -> Self {
        if self == Self::Birthday {
            Self::Birthday
        } else {
            server.unwrap_or(self)
        }
    }
}

impl Default for ReservationType {
    fn default() -> Self {
        Self::Personal
    }
}

/// Check-in status of a confirmed reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Created, QR not scanned yet.
    AwaitingCheckin,
    /// Guest has checked in; terminal.
    CheckedIn,
}

impl ReservationStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingCheckin => "AWAITING_CHECKIN",
            Self::CheckedIn => "CHECKED_IN",
        }
    }

    /// Parse a server-provided status string; unknown strings are `None`
    /// and callers decide (resumption discards, the watcher keeps waiting).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "AWAITING_CHECKIN" => Some(Self::AwaitingCheckin),
            "CHECKED_IN" => Some(Self::CheckedIn),
            _ => None,
        }
    }
}

/// One of the six fixed reservation start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    /// 12:00
    Noon,
    /// 12:30
    HalfPastNoon,
    /// 13:00
    OnePm,
    /// 18:00
    SixPm,
    /// 18:30
    HalfPastSixPm,
    /// 19:00
    SevenPm,
}

impl Slot {
    /// All slots, in chronological order.
    pub const ALL: [Self; 6] = [
        Self::Noon,
        Self::HalfPastNoon,
        Self::OnePm,
        Self::SixPm,
        Self::HalfPastSixPm,
        Self::SevenPm,
    ];

    /// `HH:MM` representation used on the wire and in the UI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noon => "12:00",
            Self::HalfPastNoon => "12:30",
            Self::OnePm => "13:00",
            Self::SixPm => "18:00",
            Self::HalfPastSixPm => "18:30",
            Self::SevenPm => "19:00",
        }
    }

    /// Parse an `HH:MM` string against the fixed slot set.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.as_str() == raw.trim())
    }

    /// Hour component.
    #[must_use]
    pub const fn hour(self) -> u32 {
        match self {
            Self::Noon | Self::HalfPastNoon => 12,
            Self::OnePm => 13,
            Self::SixPm | Self::HalfPastSixPm => 18,
            Self::SevenPm => 19,
        }
    }

    /// Minute component.
    #[must_use]
    pub const fn minute(self) -> u32 {
        match self {
            Self::HalfPastNoon | Self::HalfPastSixPm => 30,
            _ => 0,
        }
    }
}

/// Wizard step, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WizardStep {
    /// Step 0: choose the reservation type.
    TypeSelection,
    /// Step 1: unit, party size, date, and time.
    UnitDateTimePeople,
    /// Step 2: pick a seating area.
    AreaSelection,
    /// Step 3: identity and contact details.
    IdentityForm,
    /// Step 4: confirmed; boarding pass visible.
    Confirmed,
}

impl WizardStep {
    /// Numeric index (0-4) for progress displays.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::TypeSelection => 0,
            Self::UnitDateTimePeople => 1,
            Self::AreaSelection => 2,
            Self::IdentityForm => 3,
            Self::Confirmed => 4,
        }
    }

    /// The step one back, saturating at the first.
    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::TypeSelection | Self::UnitDateTimePeople => Self::TypeSelection,
            Self::AreaSelection => Self::UnitDateTimePeople,
            Self::IdentityForm => Self::AreaSelection,
            Self::Confirmed => Self::Confirmed,
        }
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::TypeSelection
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Option lists
// ═══════════════════════════════════════════════════════════════════════

/// A selectable restaurant location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOption {
    /// Opaque unit identifier.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// URL slug, when the backend provides one.
    pub slug: Option<String>,
}

/// Descriptive metadata for a seating area, independent of date and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaMeta {
    /// Opaque area identifier.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Marketing description; empty when the backend has none.
    pub description: String,
    /// Resolved photo URL.
    pub photo_url: Option<String>,
    /// Decorative emoji.
    pub icon_emoji: Option<String>,
}

/// A seating area scoped to a (unit, date, time) availability query.
///
/// Produced fresh on every tuple change and replaced wholesale, never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaAvailability {
    /// Opaque area identifier.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Marketing description.
    pub description: String,
    /// Resolved photo URL.
    pub photo_url: Option<String>,
    /// Decorative emoji.
    pub icon_emoji: Option<String>,
    /// Total seats, when the endpoint reports it.
    pub capacity: Option<u32>,
    /// Seats still open for the queried tuple. `None` in the metadata-only
    /// projection shown before a date/time is chosen.
    pub remaining: Option<u32>,
    /// Server-computed availability flag.
    pub is_available: Option<bool>,
}

impl AreaAvailability {
    /// Seats left for gating purposes: remaining, falling back to capacity.
    #[must_use]
    pub fn seats_left(&self) -> u32 {
        self.remaining.or(self.capacity).unwrap_or(0)
    }

    /// Whether this area can seat a party of `people`.
    ///
    /// An area that cannot stays selectable for display but never advances
    /// the wizard.
    #[must_use]
    pub fn fits(&self, people: u32) -> bool {
        self.seats_left() >= people
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Draft and confirmed record
// ═══════════════════════════════════════════════════════════════════════

/// The in-memory, client-owned reservation being assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    /// Chosen reservation type.
    pub reservation_type: ReservationType,
    /// Chosen unit, referencing the currently fetched unit list.
    pub unit_id: Option<UnitId>,
    /// Chosen area, referencing the current availability set.
    pub area_id: Option<AreaId>,
    /// Chosen calendar date.
    pub date: Option<NaiveDate>,
    /// Chosen start time.
    pub slot: Option<Slot>,
    /// Adults in the party.
    pub adults: u32,
    /// Children in the party.
    pub children: u32,
    /// Guest's full name.
    pub full_name: String,
    /// CPF, digits only.
    pub cpf: String,
    /// Contact email.
    pub email: String,
    /// Contact phone, digits only.
    pub phone: String,
    /// Guest's birth date.
    pub birth_date: Option<NaiveDate>,
}

impl ReservationDraft {
    /// Total party size; never below one.
    #[must_use]
    pub fn people(&self) -> u32 {
        (self.adults + self.children).max(1)
    }
}

impl Default for ReservationDraft {
    fn default() -> Self {
        Self {
            reservation_type: ReservationType::default(),
            unit_id: None,
            area_id: None,
            date: None,
            slot: None,
            adults: MIN_PEOPLE,
            children: 0,
            full_name: String::new(),
            cpf: String::new(),
            email: String::new(),
            phone: String::new(),
            birth_date: None,
        }
    }
}

/// A server-confirmed reservation, held read-only by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// Server id.
    pub id: ReservationId,
    /// Human-readable locator code.
    pub code: String,
    /// Unit id, when the endpoint reports it.
    pub unit_id: Option<UnitId>,
    /// Unit display label.
    pub unit_label: String,
    /// Area id, when the endpoint reports it.
    pub area_id: Option<AreaId>,
    /// Area display name.
    pub area_name: String,
    /// Reservation instant.
    pub reservation_at: DateTime<Utc>,
    /// Total party size.
    pub people: u32,
    /// Children in the party.
    pub kids: u32,
    /// Guest name, when the endpoint reports it.
    pub full_name: Option<String>,
    /// CPF digits, when the endpoint reports it.
    pub cpf: Option<String>,
    /// Contact email, when the endpoint reports it.
    pub email: Option<String>,
    /// Contact phone, when the endpoint reports it.
    pub phone: Option<String>,
    /// Check-in status.
    pub status: ReservationStatus,
    /// Stored reservation type, when the endpoint reports one the client
    /// understands.
    pub reservation_type: Option<ReservationType>,
}

// ═══════════════════════════════════════════════════════════════════════
// Wizard state
// ═══════════════════════════════════════════════════════════════════════

/// The tuple an availability response belongs to.
///
/// Responses are only applied when the tuple (tracked via the generation
/// counter) is still the active one; anything else is dropped silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityKey {
    /// Queried unit.
    pub unit_id: UnitId,
    /// Queried date.
    pub date: NaiveDate,
    /// Queried slot.
    pub slot: Slot,
}

/// Status-watcher state for the confirmed reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatcherState {
    /// Not watching (no confirmed reservation yet).
    #[default]
    Idle,
    /// Polling; last answer was still awaiting check-in.
    Awaiting,
    /// Polling; last attempt failed, retrying.
    Reconnecting,
    /// Check-in observed; polling stopped for good.
    CheckedIn,
}

/// Root wizard state.
///
/// Owned by the reducer for the lifetime of one wizard session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WizardState {
    /// Current step.
    pub step: WizardStep,
    /// The draft being assembled.
    pub draft: ReservationDraft,

    /// Fetched unit options.
    pub units: Vec<UnitOption>,
    /// Unit list fetch in flight.
    pub units_loading: bool,
    /// Unit list fetch error.
    pub units_error: Option<String>,

    /// Date/time-independent area metadata for the chosen unit.
    pub area_meta: Vec<AreaMeta>,
    /// Current availability set (or metadata-only projection).
    pub areas: Vec<AreaAvailability>,
    /// Availability fetch in flight.
    pub areas_loading: bool,
    /// Availability fetch error.
    pub areas_error: Option<String>,
    /// Generation stamp of the most recent availability request; responses
    /// carrying an older stamp are discarded.
    pub availability_generation: u64,

    /// Slot validation error.
    pub time_error: Option<String>,
    /// Date validation error.
    pub date_error: Option<String>,
    /// Past date-time validation error.
    pub past_error: Option<String>,
    /// Missing birth date marker.
    pub birth_date_error: Option<String>,
    /// Blocking flow error (submit failures, defensive re-validation).
    pub error: Option<String>,

    /// Submit in flight; the confirm control is disabled while set.
    pub sending: bool,
    /// Concierge interstitial visible (party above the self-service cap).
    pub concierge_prompt: bool,

    /// The confirmed reservation, once created, reconciled, or resumed.
    pub active_reservation: Option<ReservationRecord>,
    /// Check-in watcher state.
    pub watcher: WatcherState,
}

impl WizardState {
    /// Inline party-size error, shown while below the minimum.
    #[must_use]
    pub fn people_error(&self) -> Option<String> {
        (self.draft.people() < MIN_PEOPLE).then(crate::constants::messages::min_people)
    }

    /// Whether the party exceeds the self-service ceiling.
    #[must_use]
    pub fn needs_concierge(&self) -> bool {
        self.draft.people() > CONCIERGE_CEILING
    }

    /// The currently chosen area, if it is part of the active set.
    #[must_use]
    pub fn chosen_area(&self) -> Option<&AreaAvailability> {
        let chosen = self.draft.area_id.as_ref()?;
        self.areas.iter().find(|area| &area.id == chosen)
    }

    /// Step 1 → 2 gating: unit, date, and slot chosen, party at least the
    /// minimum, and no active date/time/past errors.
    #[must_use]
    pub fn can_continue_schedule(&self) -> bool {
        self.draft.unit_id.is_some()
            && self.draft.date.is_some()
            && self.draft.slot.is_some()
            && self.draft.people() >= MIN_PEOPLE
            && self.time_error.is_none()
            && self.date_error.is_none()
            && self.past_error.is_none()
    }

    /// Step 2 → 3 gating: an area is chosen and it seats the party.
    #[must_use]
    pub fn can_continue_area(&self) -> bool {
        self.chosen_area()
            .is_some_and(|area| area.fits(self.draft.people()))
    }

    /// Step 3 → submit gating: name, CPF, contact, and birth date present.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.draft.full_name.trim().len() >= 3
            && crate::validation::only_digits(&self.draft.cpf).len() == 11
            && crate::validation::is_valid_email(&self.draft.email)
            && crate::validation::is_valid_phone(&self.draft.phone)
            && self.draft.birth_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_roundtrip_and_order() {
        for slot in Slot::ALL {
            assert_eq!(Slot::parse(slot.as_str()), Some(slot));
        }
        assert!(Slot::Noon < Slot::SevenPm);
        assert_eq!(Slot::parse("19:30"), None);
    }

    #[test]
    fn reservation_type_parses_server_synonyms() {
        assert_eq!(ReservationType::parse("BIRTHDAY"), Some(ReservationType::Birthday));
        assert_eq!(ReservationType::parse("corporate"), Some(ReservationType::Company));
        assert_eq!(
            ReservationType::parse(" Confraternização "),
            Some(ReservationType::GroupCelebration)
        );
        assert_eq!(ReservationType::parse("MYSTERY"), None);
    }

    #[test]
    fn birthday_choice_is_sticky_on_reconcile() {
        assert_eq!(
            ReservationType::Birthday.reconcile(Some(ReservationType::Company)),
            ReservationType::Birthday
        );
        assert_eq!(
            ReservationType::Personal.reconcile(Some(ReservationType::Company)),
            ReservationType::Company
        );
        assert_eq!(
            ReservationType::Personal.reconcile(None),
            ReservationType::Personal
        );
    }

    #[test]
    fn people_clamps_to_one() {
        let draft = ReservationDraft {
            adults: 0,
            children: 0,
            ..ReservationDraft::default()
        };
        assert_eq!(draft.people(), 1);
    }

    #[test]
    fn seats_left_falls_back_to_capacity() {
        let area = AreaAvailability {
            id: AreaId::from("a1"),
            name: "Hall".into(),
            description: String::new(),
            photo_url: None,
            icon_emoji: None,
            capacity: Some(30),
            remaining: None,
            is_available: None,
        };
        assert_eq!(area.seats_left(), 30);
        assert!(area.fits(30));
        assert!(!area.fits(31));
    }

    #[test]
    fn step_previous_saturates() {
        assert_eq!(WizardStep::TypeSelection.previous(), WizardStep::TypeSelection);
        assert_eq!(WizardStep::IdentityForm.previous(), WizardStep::AreaSelection);
        // Confirmed has no back edge.
        assert_eq!(WizardStep::Confirmed.previous(), WizardStep::Confirmed);
    }
}
