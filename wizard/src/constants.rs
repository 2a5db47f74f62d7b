//! Reservation wizard constants.
//!
//! Fixed business rules (party-size bounds, the booking window, polling
//! cadence) and the user-facing message strings the reducers surface.

use std::time::Duration;

/// Smallest party size the self-service flow accepts.
pub const MIN_PEOPLE: u32 = 8;

/// Largest party size the self-service flow accepts.
///
/// Anything above this opens the concierge interstitial instead of
/// advancing the wizard.
pub const CONCIERGE_CEILING: u32 = 40;

/// Opening time of the booking window (inclusive).
pub const OPEN_TIME: (u32, u32) = (12, 0);

/// Closing time of the booking window (inclusive).
pub const CLOSE_TIME: (u32, u32) = (21, 30);

/// Minutes of grace after the reservation time before it lapses.
pub const TOLERANCE_MINUTES: i64 = 15;

/// Minutes during which additional named guests may still be admitted.
pub const GUEST_WINDOW_MINUTES: i64 = 45;

/// Interval between check-in status polls.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default timeout applied to every outbound API request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// File name of the single on-device resumption record.
pub const RESUMPTION_FILE: &str = "last-reservation.json";

/// Length of a reservation lookup code.
pub const LOOKUP_CODE_LEN: usize = 6;

/// The `source` tag stamped on every creation payload and analytics event.
pub const SOURCE_TAG: &str = "site";

/// User-facing message strings.
///
/// Reducers surface these verbatim; hosts render them inline next to the
/// offending field or as a blocking alert.
pub mod messages {
    use super::{CLOSE_TIME, MIN_PEOPLE, OPEN_TIME};

    /// Inline party-size hint shown while below the minimum.
    #[must_use]
    pub fn min_people() -> String {
        format!("Minimum of {MIN_PEOPLE} people")
    }

    /// Blocking party-size error raised on continue/submit.
    #[must_use]
    pub fn min_people_to_reserve() -> String {
        format!("Minimum of {MIN_PEOPLE} people to reserve.")
    }

    /// Lead-time rule: bookings need one day of notice.
    pub const ONE_DAY_AHEAD: &str = "Reservations must be made 1 day in advance.";

    /// Date picker error for dates before tomorrow.
    pub const DATE_FROM_TOMORROW: &str = "Select a date from tomorrow onwards";

    /// Defensive submit-time error for dates before today.
    pub const DATE_FROM_TODAY: &str = "Invalid date. Select a date from today onwards.";

    /// Missing date or time at submit.
    pub const SELECT_DATE_AND_TIME: &str = "Select a date and time.";

    /// Slot not in the fixed list.
    pub const INVALID_SLOT: &str = "Choose a valid time from the list";

    /// Combined date-time already behind the clock.
    pub const TIME_IN_PAST: &str = "That time has already passed. Choose a future time.";

    /// The booking window, rendered with its literal bounds.
    #[must_use]
    pub fn time_window() -> String {
        format!(
            "Times available between {:02}:{:02} and {:02}:{:02}",
            OPEN_TIME.0, OPEN_TIME.1, CLOSE_TIME.0, CLOSE_TIME.1
        )
    }

    /// Submit-time wrapper around the window message.
    #[must_use]
    pub fn time_outside_window() -> String {
        format!("Time unavailable. {}.", time_window())
    }

    /// Email/phone failed structural validation.
    pub const INVALID_CONTACT: &str = "Enter a valid email and phone.";

    /// Unit or area missing at submit.
    pub const SELECT_UNIT_AND_AREA: &str = "Select the unit and area.";

    /// Inline marker for the missing birth date.
    pub const BIRTH_DATE_REQUIRED: &str = "Required";

    /// Conflict whose active reservation could not be recovered.
    pub const ACTIVE_RESERVATION_EXISTS: &str =
        "You already have an active reservation. Complete check-in to book again.";

    /// Fallback for unexpected server failures on submit.
    pub const SUBMIT_FALLBACK: &str =
        "We could not complete your reservation right now. Please try again.";

    /// Unit list fetch failed.
    pub const UNITS_FAILED: &str = "Failed to load units.";

    /// Availability fetch failed.
    pub const AVAILABILITY_FAILED: &str = "Failed to load availability.";

    /// Lookup code failed the shape check.
    pub const LOOKUP_INVALID_CODE: &str =
        "Enter a valid code (6 characters A-Z/0-9, e.g. JT5WK6).";

    /// Lookup found nothing at any endpoint.
    pub const LOOKUP_NOT_FOUND: &str = "Reservation not found.";

    /// Lookup failed for a non-404 reason.
    pub const LOOKUP_FAILED: &str = "Failed to look up the reservation.";

    /// Outbound request hit the client-side timeout.
    pub const REQUEST_TIMED_OUT: &str = "Request timed out.";
}

/// Analytics event names.
pub mod events {
    /// Fired once per successful (or reconciled) submission.
    pub const RESERVATION_MADE: &str = "reservation_made";

    /// Fired when the status watcher observes the check-in.
    pub const RESERVATION_CHECKIN: &str = "reservation_checkin";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_message_renders_literal_bounds() {
        assert_eq!(
            messages::time_window(),
            "Times available between 12:00 and 21:30"
        );
    }

    #[test]
    fn people_messages_embed_the_minimum() {
        assert_eq!(messages::min_people(), "Minimum of 8 people");
        assert_eq!(
            messages::min_people_to_reserve(),
            "Minimum of 8 people to reserve."
        );
    }
}
