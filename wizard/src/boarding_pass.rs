//! Boarding-pass projection.
//!
//! A pure view of a confirmed reservation: acronym codes for the unit and
//! area, a privacy-masked CPF, three live countdowns (reservation time,
//! +15 min tolerance, +45 min guest window), and the share text. Hosts
//! re-render this once a second while mounted; nothing here ticks on its
//! own.

use crate::constants::{GUEST_WINDOW_MINUTES, TOLERANCE_MINUTES};
use crate::resumption::LocalResumptionRecord;
use crate::state::{ReservationRecord, ReservationType};
use crate::validation::{only_digits, strip_accents};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Derive the unit code shown in the large "airport" type.
///
/// Deterministic: normalize the label, then take word initials (up to
/// four), padding from the last word when fewer than three letters come
/// out. Single-word labels take their first four letters.
#[must_use]
pub fn unit_code(label: &str) -> String {
    let normalized = strip_accents(label);
    let words: Vec<&str> = normalized.split_whitespace().collect();

    match words.len() {
        0 => "—".to_string(),
        1 => words[0].chars().take(4).collect::<String>().to_uppercase(),
        _ => {
            let mut code: String = words
                .iter()
                .take(4)
                .filter_map(|w| w.chars().next())
                .collect();
            if code.len() < 3 {
                if let Some(last) = words.last() {
                    code.extend(last.chars().skip(1).take(3 - code.len()));
                }
            }
            code.to_uppercase()
        },
    }
}

/// Three-letter area acronym, airport-style.
#[must_use]
pub fn area_acronym(name: &str) -> String {
    let normalized = strip_accents(name).replace(['—', '-'], " ");
    let words: Vec<&str> = normalized.split_whitespace().collect();

    match words.len() {
        0 => "—".to_string(),
        1 => words[0].chars().take(3).collect::<String>().to_uppercase(),
        _ => words
            .iter()
            .take(3)
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Partial-redaction CPF display: `000.***.***-00`, or an em dash when the
/// value does not hold eleven digits.
#[must_use]
pub fn mask_cpf_display(cpf: Option<&str>) -> String {
    let digits = only_digits(cpf.unwrap_or_default());
    if digits.len() < 11 {
        return "—".to_string();
    }
    format!("{}.***.***-{}", &digits[..3], &digits[9..11])
}

/// Format a remaining duration as `{days? "Nd "}{HH}h {MM}m {SS}s`,
/// clamped to zero at or past the target.
#[must_use]
pub fn format_countdown(ms: i64) -> String {
    let total_sec = ms.max(0) / 1000;
    let days = total_sec / 86_400;
    let hours = (total_sec % 86_400) / 3_600;
    let minutes = (total_sec % 3_600) / 60;
    let seconds = total_sec % 60;

    let base = format!("{hours:02}h {minutes:02}m {seconds:02}s");
    if days > 0 {
        format!("{days}d {base}")
    } else {
        base
    }
}

/// Badge text for a deadline: `ok` while time remains, `zero` after.
#[must_use]
pub const fn status_label<'a>(remaining_ms: i64, ok: &'a str, zero: &'a str) -> &'a str {
    if remaining_ms > 0 { ok } else { zero }
}

/// The three deadlines derived from the reservation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdowns {
    /// Milliseconds until the reservation itself.
    pub to_reservation: i64,
    /// Milliseconds until the 15-minute tolerance closes.
    pub to_tolerance: i64,
    /// Milliseconds until the 45-minute guest window closes.
    pub to_guest_window: i64,
}

impl Countdowns {
    /// Whether the grace period is still open.
    #[must_use]
    pub const fn tolerance_open(&self) -> bool {
        self.to_tolerance > 0
    }

    /// Whether named guests may still be admitted.
    #[must_use]
    pub const fn guest_window_open(&self) -> bool {
        self.to_guest_window > 0
    }
}

/// Everything the confirmation view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardingPass {
    /// Server id.
    pub id: String,
    /// Locator code.
    pub code: String,
    /// QR image URL (un-busted; see [`BoardingPass::qr_src`]).
    pub qr_url: String,
    /// Unit display label.
    pub unit_label: String,
    /// Area display name.
    pub area_name: String,
    /// Formatted date, `DD/MM/YYYY`.
    pub date_str: String,
    /// Formatted time, `HH:MM`.
    pub time_str: String,
    /// Total party size.
    pub people: u32,
    /// Children in the party.
    pub kids: u32,
    /// Guest name.
    pub full_name: Option<String>,
    /// CPF digits.
    pub cpf: Option<String>,
    /// Email the confirmation was sent to.
    pub email_hint: Option<String>,
    /// Reservation type, when known.
    pub reservation_type: Option<ReservationType>,
}

impl BoardingPass {
    /// Project a server-confirmed record.
    #[must_use]
    pub fn from_record(record: &ReservationRecord, qr_url: String) -> Self {
        Self {
            id: record.id.as_str().to_string(),
            code: record.code.clone(),
            qr_url,
            unit_label: record.unit_label.clone(),
            area_name: record.area_name.clone(),
            date_str: record.reservation_at.format("%d/%m/%Y").to_string(),
            time_str: record.reservation_at.format("%H:%M").to_string(),
            people: record.people,
            kids: record.kids,
            full_name: record.full_name.clone(),
            cpf: record.cpf.clone(),
            email_hint: record.email.clone(),
            reservation_type: record.reservation_type,
        }
    }

    /// Project a locally cached snapshot.
    #[must_use]
    pub fn from_resumption(record: &LocalResumptionRecord) -> Self {
        Self {
            id: record.id.clone(),
            code: record.code.clone(),
            qr_url: record.qr_url.clone(),
            unit_label: record.unit_label.clone(),
            area_name: record.area_name.clone(),
            date_str: record.date_str.clone(),
            time_str: record.time_str.clone(),
            people: record.people,
            kids: record.kids,
            full_name: record.full_name.clone(),
            cpf: record.cpf.clone(),
            email_hint: record.email_hint.clone(),
            reservation_type: record.reservation_type,
        }
    }

    /// Acronym code for the unit.
    #[must_use]
    pub fn unit_acronym(&self) -> String {
        unit_code(&self.unit_label)
    }

    /// Acronym code for the area.
    #[must_use]
    pub fn area_acronym(&self) -> String {
        area_acronym(&self.area_name)
    }

    /// CPF with the fixed partial redaction.
    #[must_use]
    pub fn cpf_display(&self) -> String {
        mask_cpf_display(self.cpf.as_deref())
    }

    /// Human label for the reservation type.
    #[must_use]
    pub fn type_label(&self) -> Option<&'static str> {
        self.reservation_type.map(ReservationType::label)
    }

    /// The reservation instant parsed back out of the formatted fields.
    #[must_use]
    pub fn reservation_at(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(&self.date_str, "%d/%m/%Y").ok()?;
        let time = NaiveTime::parse_from_str(&self.time_str, "%H:%M").ok()?;
        Some(date.and_time(time).and_utc())
    }

    /// The three countdowns at `now`, or `None` when the formatted fields
    /// do not parse.
    #[must_use]
    pub fn countdowns(&self, now: DateTime<Utc>) -> Option<Countdowns> {
        let at = self.reservation_at()?;
        let to_reservation = (at - now).num_milliseconds();
        let to_tolerance =
            (at + chrono::Duration::minutes(TOLERANCE_MINUTES) - now).num_milliseconds();
        let to_guest_window =
            (at + chrono::Duration::minutes(GUEST_WINDOW_MINUTES) - now).num_milliseconds();
        Some(Countdowns {
            to_reservation,
            to_tolerance,
            to_guest_window,
        })
    }

    /// Top-bar text: the countdown while the reservation is ahead, the
    /// "now" variant afterwards.
    #[must_use]
    pub fn headline(&self, now: DateTime<Utc>) -> String {
        match self.countdowns(now) {
            Some(c) if c.to_reservation > 0 => {
                format!(
                    "{} until your reservation",
                    format_countdown(c.to_reservation)
                )
            },
            _ => format!("Your reservation is now ({})", self.time_str),
        }
    }

    /// QR image source, cache-busted per render.
    #[must_use]
    pub fn qr_src(&self, now: DateTime<Utc>) -> String {
        let sep = if self.qr_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}t={}", self.qr_url, now.timestamp_millis())
    }

    /// Share text for messaging apps.
    #[must_use]
    pub fn share_message(&self) -> String {
        let mut lines = vec![
            "My reservation is confirmed! 🎉".to_string(),
            String::new(),
            format!("• Unit: {}", self.unit_label),
            format!("• Area: {}", self.area_name),
            format!("• Date: {}", self.date_str),
            format!("• Time: {}", self.time_str),
        ];
        let people = if self.kids > 0 {
            format!("• People: {} (Children: {})", self.people, self.kids)
        } else {
            format!("• People: {}", self.people)
        };
        lines.push(people);
        if let Some(label) = self.type_label() {
            lines.push(format!("• Type: {label}"));
        }
        lines.push(String::new());
        lines.push("See you there!".to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_format_matches_fixture_values() {
        assert_eq!(format_countdown(90_061_000), "1d 01h 01m 01s");
        assert_eq!(format_countdown(59_000), "00h 00m 59s");
        assert_eq!(format_countdown(-5_000), "00h 00m 00s");
        assert_eq!(format_countdown(0), "00h 00m 00s");
    }

    #[test]
    fn acronyms_are_deterministic() {
        assert_eq!(unit_code("Mané Mercado Águas Claras"), "MMAC");
        assert_eq!(unit_code("Harbor Hall"), "HHA");
        assert_eq!(unit_code("Harbor"), "HARB");
        assert_eq!(unit_code(""), "—");

        assert_eq!(area_acronym("Salão"), "SAL");
        assert_eq!(area_acronym("Varanda — Lado Norte"), "VLN");
        assert_eq!(area_acronym("Main Hall"), "MH");
        assert_eq!(area_acronym(""), "—");
    }

    #[test]
    fn cpf_display_redacts_the_middle() {
        assert_eq!(mask_cpf_display(Some("123.456.789-01")), "123.***.***-01");
        assert_eq!(mask_cpf_display(Some("12345")), "—");
        assert_eq!(mask_cpf_display(None), "—");
    }

    fn pass() -> BoardingPass {
        BoardingPass {
            id: "r1".into(),
            code: "JT5WK6".into(),
            qr_url: "https://api.example.com/v1/reservations/r1/qrcode".into(),
            unit_label: "Harbor Hall".into(),
            area_name: "Terrace".into(),
            date_str: "10/07/2025".into(),
            time_str: "18:00".into(),
            people: 10,
            kids: 2,
            full_name: Some("Ana Souza".into()),
            cpf: Some("12345678901".into()),
            email_hint: Some("ana@example.com".into()),
            reservation_type: Some(ReservationType::Birthday),
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn countdowns_derive_all_three_deadlines() {
        let now = DateTime::parse_from_rfc3339("2025-07-10T17:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let c = pass().countdowns(now).unwrap();
        assert_eq!(c.to_reservation, 3_600_000);
        assert_eq!(c.to_tolerance, 3_600_000 + 15 * 60_000);
        assert_eq!(c.to_guest_window, 3_600_000 + 45 * 60_000);
        assert!(c.tolerance_open());
        assert_eq!(pass().headline(now), "01h 00m 00s until your reservation");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn past_reservation_switches_headline_and_labels() {
        let now = DateTime::parse_from_rfc3339("2025-07-10T18:20:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let p = pass();
        let c = p.countdowns(now).unwrap();
        assert!(!c.tolerance_open());
        assert!(c.guest_window_open());
        assert_eq!(p.headline(now), "Your reservation is now (18:00)");
        assert_eq!(status_label(c.to_tolerance, "valid", "closed"), "closed");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn qr_src_is_cache_busted() {
        let now = DateTime::parse_from_rfc3339("2025-07-10T18:20:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let src = pass().qr_src(now);
        assert!(src.starts_with("https://api.example.com/v1/reservations/r1/qrcode?t="));
    }

    #[test]
    fn share_message_lists_the_essentials() {
        let text = pass().share_message();
        assert!(text.contains("• Unit: Harbor Hall"));
        assert!(text.contains("• People: 10 (Children: 2)"));
        assert!(text.contains("• Type: Birthday"));
    }
}
