//! Wizard actions.
//!
//! This enum is the only way into the wizard state machine. It unifies
//! **commands** (user intent: selections, navigation, submit) and
//! **events** (results of completed effects: responses, stored snapshots,
//! poll answers). Event variants carry the identity of the request that
//! produced them - the availability tuple generation, the reservation id -
//! so the reducer can discard anything stale instead of trusting arrival
//! order.

use crate::error::Result;
use crate::state::{
    AreaAvailability, AreaId, AreaMeta, AvailabilityKey, ReservationId, ReservationRecord,
    ReservationStatus, ReservationType, UnitId, UnitOption,
};
use chrono::NaiveDate;

/// All inputs to the wizard reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    // ═══════════════════════════════════════════════════════════════════
    // Boot & resumption
    // ═══════════════════════════════════════════════════════════════════
    /// App start: bootstrap analytics, fetch units, check the resumption
    /// snapshot.
    Boot,

    /// Unit list response.
    UnitsLoaded {
        /// Normalized unit options, or the fetch error.
        result: Result<Vec<UnitOption>>,
    },

    /// Resumption check finished.
    ResumptionChecked {
        /// The still-active reservation to resume to, when one exists.
        record: Option<ReservationRecord>,
        /// Reservation type captured in the device snapshot.
        cached_type: Option<ReservationType>,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Step navigation
    // ═══════════════════════════════════════════════════════════════════
    /// Choose the reservation type on step 0.
    SelectType {
        /// The chosen type.
        reservation_type: ReservationType,
    },

    /// Leave step 0.
    ContinueFromType,

    /// Leave step 1; may surface an error or the concierge interstitial
    /// instead of advancing.
    ContinueFromSchedule,

    /// Leave step 2.
    ContinueFromArea,

    /// Go one step back.
    Back,

    /// Close the concierge interstitial.
    DismissConcierge,

    // ═══════════════════════════════════════════════════════════════════
    // Schedule selection (step 1-2)
    // ═══════════════════════════════════════════════════════════════════
    /// Choose a unit. Clears the chosen time and refetches area data.
    SelectUnit {
        /// The chosen unit.
        unit_id: UnitId,
    },

    /// Set the adult count.
    SetAdults {
        /// New adult count.
        count: u32,
    },

    /// Set the child count.
    SetChildren {
        /// New child count.
        count: u32,
    },

    /// Choose (or clear) the reservation date. Clears the chosen time.
    SelectDate {
        /// The chosen date.
        date: Option<NaiveDate>,
    },

    /// Choose a time by its `HH:MM` string; anything outside the fixed
    /// slot set raises the slot error.
    SelectTime {
        /// Raw time input.
        time: String,
    },

    /// Area metadata response for a unit.
    AreaMetaLoaded {
        /// Unit the metadata belongs to.
        unit_id: UnitId,
        /// Normalized metadata, or the fetch error.
        result: Result<Vec<AreaMeta>>,
    },

    /// Availability response for a (unit, date, time) tuple.
    AvailabilityLoaded {
        /// The tuple the query was issued for.
        key: AvailabilityKey,
        /// Generation stamp at dispatch time; stale stamps are dropped.
        generation: u64,
        /// Normalized availability, or the fetch error.
        result: Result<Vec<AreaAvailability>>,
    },

    /// Choose a seating area.
    SelectArea {
        /// The chosen area.
        area_id: AreaId,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Identity form (step 3)
    // ═══════════════════════════════════════════════════════════════════
    /// Set the guest's full name.
    SetFullName {
        /// Raw input.
        value: String,
    },

    /// Set the CPF; only digits are kept, capped at eleven.
    SetCpf {
        /// Raw (possibly masked) input.
        value: String,
    },

    /// Set the contact email.
    SetEmail {
        /// Raw input.
        value: String,
    },

    /// Set the contact phone; only digits are kept, capped at eleven.
    SetPhone {
        /// Raw (possibly masked) input.
        value: String,
    },

    /// Set (or clear) the guest's birth date.
    SetBirthDate {
        /// The chosen date.
        date: Option<NaiveDate>,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Submit protocol
    // ═══════════════════════════════════════════════════════════════════
    /// Confirm the reservation. Re-validates every step defensively
    /// before any network traffic.
    Submit,

    /// The creation endpoint accepted the reservation.
    CreationSucceeded {
        /// New reservation id.
        id: ReservationId,
        /// Locator code.
        code: String,
        /// Status string reported at creation.
        status: Option<String>,
    },

    /// The creation endpoint answered 409: an active reservation exists.
    ConflictDetected {
        /// Id of the existing reservation, when the server names it.
        reservation_id: Option<ReservationId>,
    },

    /// Authoritative record fetch after a successful creation.
    RecordFetched {
        /// Created reservation id.
        id: ReservationId,
        /// Locator code from the creation response.
        code: String,
        /// The fetched record; on error, locally known values stand in.
        result: Result<ReservationRecord>,
    },

    /// Reconciliation fetch of the conflicting active reservation.
    ReconciliationFetched {
        /// The active record, or the failure that keeps the user on step 3.
        result: Result<ReservationRecord>,
    },

    /// Submission failed for a non-conflict reason.
    SubmitFailed {
        /// Message to surface.
        message: String,
    },

    /// The resumption snapshot was written.
    ResumptionSaved,

    // ═══════════════════════════════════════════════════════════════════
    // Status watcher
    // ═══════════════════════════════════════════════════════════════════
    /// Poll the check-in status now.
    StatusTick,

    /// Status poll answer.
    StatusReported {
        /// Reservation the poll was issued for.
        id: ReservationId,
        /// The reported status, or the transient failure.
        result: Result<ReservationStatus>,
    },
}
