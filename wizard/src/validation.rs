//! Pure validation utilities.
//!
//! Every function here returns a boolean or a derived value; none touches
//! the network, reads a clock directly, or panics. The reducers aggregate
//! the results into per-step blocking/non-blocking error state.

use crate::constants::{CLOSE_TIME, OPEN_TIME};
use crate::state::Slot;
use chrono::{DateTime, NaiveDate, Utc};

/// Strip diacritics from Latin text and lowercase it.
///
/// Used wherever labels are compared or keyed (acronym derivation, unit
/// pixel lookup, reservation-type synonyms). Covers the Latin-1 accent
/// range the backend actually emits.
#[must_use]
pub fn strip_accents(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Keep only ASCII digits.
#[must_use]
pub fn only_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize a reservation lookup code: strip everything outside `A-Z0-9`
/// and uppercase the rest.
///
/// Idempotent, and used for both user-typed codes and URL-supplied ones.
#[must_use]
pub fn normalize_lookup_code(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Progressive CPF input mask, capped at 11 digits: `000.000.000-00`.
///
/// Purely cosmetic; validity always operates on the digit extraction.
#[must_use]
pub fn mask_cpf(input: &str) -> String {
    let digits = only_digits(input);
    let d = &digits[..digits.len().min(11)];

    let mut out = String::with_capacity(14);
    for (i, c) in d.chars().enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {},
        }
        out.push(c);
    }
    out
}

/// Progressive phone input mask: `(00) 0000-0000` up to ten digits,
/// `(00) 00000-0000` at eleven.
#[must_use]
pub fn mask_phone(input: &str) -> String {
    let digits = only_digits(input);
    let d = &digits[..digits.len().min(11)];

    if d.len() <= 2 {
        return d.to_string();
    }
    let (area, rest) = d.split_at(2);
    let split = if d.len() <= 10 { 4 } else { 5 };
    if rest.len() <= split {
        format!("({area}) {rest}")
    } else {
        let (prefix, suffix) = rest.split_at(split);
        format!("({area}) {prefix}-{suffix}")
    }
}

/// Structural email check: one `@` between non-space segments, with a dot
/// somewhere in the domain.
#[must_use]
pub fn is_valid_email(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Structural phone check: exactly 10 or 11 digits.
#[must_use]
pub fn is_valid_phone(input: &str) -> bool {
    matches!(only_digits(input).len(), 10 | 11)
}

/// Membership test against the fixed slot set.
#[must_use]
pub fn is_valid_slot(time: &str) -> bool {
    Slot::parse(time).is_some()
}

/// True when an `HH:MM` string falls outside the booking window
/// (before 12:00 or after 21:30, bounds inclusive at the literal minute).
///
/// Malformed input is not "outside"; it fails slot validation instead.
#[must_use]
pub fn is_time_outside_window(time: &str) -> bool {
    let Some((h, m)) = time.split_once(':') else {
        return false;
    };
    let (Ok(hh), Ok(mm)) = (h.parse::<u32>(), m.parse::<u32>()) else {
        return false;
    };
    hh < OPEN_TIME.0
        || (hh == OPEN_TIME.0 && mm < OPEN_TIME.1)
        || hh > CLOSE_TIME.0
        || (hh == CLOSE_TIME.0 && mm > CLOSE_TIME.1)
}

/// Combine a date and slot into the reservation instant.
#[must_use]
pub fn reservation_instant(date: NaiveDate, slot: Slot) -> DateTime<Utc> {
    date.and_hms_opt(slot.hour(), slot.minute(), 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
        .and_utc()
}

/// True when the combined date-time is strictly before `now`.
#[must_use]
pub fn is_past_selection(date: NaiveDate, slot: Slot, now: DateTime<Utc>) -> bool {
    reservation_instant(date, slot) < now
}

/// True when the date is the same calendar day as `now`.
#[must_use]
pub fn is_same_day_as_today(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date == now.date_naive()
}

/// True when the date violates the one-day lead time (anything before
/// tomorrow).
#[must_use]
pub fn is_before_tomorrow(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date < now.date_naive() + chrono::Days::new(1)
}
