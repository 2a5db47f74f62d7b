//! Reservation lookup flow.
//!
//! The standalone "find my reservation" page: a code is normalized and
//! shape-checked locally, then resolved through the endpoint fallback
//! chain, and the result is projected straight into a boarding pass.
//! A `code` (or `c`) query parameter prefills the search field but never
//! auto-submits.

use crate::api::ReservationApi;
use crate::boarding_pass::BoardingPass;
use crate::constants::{LOOKUP_CODE_LEN, messages};
use crate::error::{Result, WizardError};
use crate::validation::normalize_lookup_code;
use url::Url;

/// Whether a normalized code has the exact lookup shape
/// (six characters, `A-Z`/`0-9`).
#[must_use]
pub fn is_valid_lookup_code(code: &str) -> bool {
    code.len() == LOOKUP_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Extract a prefill code from the lookup page URL (`code` or `c`).
///
/// Returns the normalized code; the caller only fills the input with it,
/// the user still presses search.
#[must_use]
pub fn code_from_query(url: &Url) -> Option<String> {
    let raw = url
        .query_pairs()
        .find(|(k, _)| k == "code" || k == "c")
        .map(|(_, v)| v.to_string())?;
    let normalized = normalize_lookup_code(&raw);
    (!normalized.is_empty()).then_some(normalized)
}

/// Resolve a user-entered code into a boarding pass.
///
/// The shape check happens before any network traffic; a malformed code is
/// a [`WizardError::Validation`] with the fixed message.
///
/// # Errors
///
/// - [`WizardError::Validation`] when the code fails the shape check
/// - [`WizardError::NotFound`] when every lookup endpoint 404s
/// - any transport/server error from the first endpoint that answered
pub async fn lookup_boarding_pass<A: ReservationApi>(
    api: &A,
    raw_code: &str,
) -> Result<BoardingPass> {
    let code = normalize_lookup_code(raw_code);
    if !is_valid_lookup_code(&code) {
        return Err(WizardError::Validation(
            messages::LOOKUP_INVALID_CODE.to_string(),
        ));
    }

    let record = api.lookup(&code).await?;
    let qr_url = api.qr_url(&record.id);

    let mut pass = BoardingPass::from_record(&record, qr_url);
    if pass.code.is_empty() {
        // Older endpoints omit the code field; the user-entered one is it.
        pass.code = code;
    }
    Ok(pass)
}
