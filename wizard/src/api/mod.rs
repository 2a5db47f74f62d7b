//! Reservation API provider.
//!
//! The backend REST service is an external collaborator; the wizard only
//! consumes its documented request/response contracts. This module defines
//! the provider trait the reducers depend on, the creation payload, and the
//! normalized response types. The HTTP implementation lives in
//! [`http`]; response-shape normalization lives in [`adapters`].

pub mod adapters;
pub mod http;

pub use http::{ApiConfig, HttpReservationApi};

use crate::error::Result;
use crate::state::{
    AreaAvailability, AreaMeta, ReservationId, ReservationRecord, ReservationStatus, Slot, UnitId,
    UnitOption,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Body POSTed to the reservation-creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateReservationRequest {
    /// Guest's full name.
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// CPF, digits only.
    pub cpf: String,
    /// Total party size.
    pub people: u32,
    /// Children in the party.
    pub kids: u32,
    /// Reservation instant, ISO 8601.
    #[serde(rename = "reservationDate")]
    pub reservation_date: String,
    /// Guest's birth date at start of day, ISO 8601.
    #[serde(rename = "birthdayDate")]
    pub birthday_date: Option<String>,
    /// Contact email, lowercased.
    pub email: String,
    /// Contact phone, digits only.
    pub phone: String,
    /// Chosen unit.
    #[serde(rename = "unitId")]
    pub unit_id: String,
    /// Chosen area.
    #[serde(rename = "areaId")]
    pub area_id: String,
    /// Campaign source; defaults to the site tag.
    pub utm_source: String,
    /// Campaign medium.
    pub utm_medium: Option<String>,
    /// Campaign name; defaults to `unit:area` when the page carried none.
    pub utm_campaign: Option<String>,
    /// Campaign content.
    pub utm_content: Option<String>,
    /// Campaign term.
    pub utm_term: Option<String>,
    /// Converting page URL.
    pub url: Option<String>,
    /// Document referrer.
    #[serde(rename = "ref")]
    pub referrer: Option<String>,
    /// Fixed acquisition tag.
    pub source: String,
    /// Reservation type wire string.
    #[serde(rename = "reservationType")]
    pub reservation_type: String,
}

/// Successful creation response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedReservation {
    /// Server id of the new reservation.
    pub id: ReservationId,
    /// Human-readable locator code.
    #[serde(rename = "reservationCode")]
    pub code: String,
    /// Status as reported at creation time.
    pub status: Option<String>,
}

/// The reservation backend, as the wizard sees it.
///
/// Every method maps 1:1 onto a documented endpoint. Implementations
/// normalize the backend's heterogeneous field naming into the canonical
/// types before returning; callers never see raw payload shapes.
pub trait ReservationApi: Send + Sync {
    /// `GET /v1/units/public/options/list`
    fn list_units(&self) -> impl Future<Output = Result<Vec<UnitOption>>> + Send;

    /// `GET /v1/areas/public/by-unit/{unitId}`, falling back to an
    /// availability probe at `probe_date` 18:00 when the metadata endpoint
    /// returns nothing, so area cards have descriptions and photos before
    /// the user picks a date.
    fn area_meta(
        &self,
        unit_id: &UnitId,
        probe_date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<AreaMeta>>> + Send;

    /// `GET /v1/reservations/public/availability?unitId&date&time` - the
    /// authoritative, tuple-scoped availability query.
    fn availability(
        &self,
        unit_id: &UnitId,
        date: NaiveDate,
        slot: Slot,
    ) -> impl Future<Output = Result<Vec<AreaAvailability>>> + Send;

    /// `POST /v1/reservations/public`
    ///
    /// A 409 with code `ALREADY_HAS_ACTIVE_RESERVATION` surfaces as
    /// [`crate::WizardError::Conflict`] carrying the active reservation id.
    fn create(
        &self,
        request: CreateReservationRequest,
    ) -> impl Future<Output = Result<CreatedReservation>> + Send;

    /// `GET /v1/reservations/public/active?id=`
    fn active(
        &self,
        id: &ReservationId,
    ) -> impl Future<Output = Result<ReservationRecord>> + Send;

    /// `GET /v1/reservations/{id}/status`
    fn status(
        &self,
        id: &ReservationId,
    ) -> impl Future<Output = Result<ReservationStatus>> + Send;

    /// Look a reservation up by code, trying
    /// `/v1/reservations/public/lookup?code=`, then
    /// `/v1/reservations/lookup?code=`, then `/v1/reservations/code/{code}`,
    /// stopping at the first non-404.
    fn lookup(&self, code: &str) -> impl Future<Output = Result<ReservationRecord>> + Send;

    /// URL of the check-in QR image for a reservation.
    fn qr_url(&self, id: &ReservationId) -> String;
}
