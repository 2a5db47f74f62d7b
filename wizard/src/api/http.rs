//! HTTP implementation of the reservation API.
//!
//! Thin reqwest wrapper: every request carries the configured timeout, every
//! non-2xx response is folded into the [`WizardError`] taxonomy at this
//! boundary, and every payload goes through the adapters before it reaches
//! the domain.

use super::adapters::{
    RawArea, RawReservation, RawUnit, normalize_availability_list, normalize_meta_list,
    normalize_units,
};
use super::{CreateReservationRequest, CreatedReservation, ReservationApi};
use crate::constants::REQUEST_TIMEOUT;
use crate::error::{Result, WizardError};
use crate::state::{
    AreaAvailability, AreaMeta, ReservationId, ReservationRecord, ReservationStatus, Slot, UnitId,
    UnitOption,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Error code the backend uses to signal an existing active reservation.
const CONFLICT_CODE: &str = "ALREADY_HAS_ACTIVE_RESERVATION";

/// Slot used for the metadata fallback probe.
const META_PROBE_SLOT: Slot = Slot::SixPm;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the reservation backend.
    pub base_url: Url,
    /// Base URL relative photo references resolve against.
    pub asset_base: Option<Url>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    /// Configuration with the default 20-second timeout and no asset base.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            asset_base: None,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Set the asset base for relative photo references.
    #[must_use]
    pub fn with_asset_base(mut self, asset_base: Url) -> Self {
        self.asset_base = Some(asset_base);
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reservation API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReservationApi {
    client: reqwest::Client,
    config: Arc<ApiConfig>,
}

/// Error envelope shapes the backend emits on failures.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorField>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Body {
        code: Option<String>,
        message: Option<String>,
        #[serde(rename = "reservationId")]
        reservation_id: Option<String>,
    },
    Text(String),
}

impl ErrorEnvelope {
    fn code(&self) -> Option<&str> {
        match &self.error {
            Some(ErrorField::Body { code, .. }) => code.as_deref(),
            _ => None,
        }
    }

    fn reservation_id(&self) -> Option<String> {
        match &self.error {
            Some(ErrorField::Body { reservation_id, .. }) => reservation_id.clone(),
            _ => None,
        }
    }

    fn message(&self) -> Option<String> {
        match &self.error {
            Some(ErrorField::Body {
                message: Some(m), ..
            }) if !m.is_empty() => Some(m.clone()),
            _ => match (&self.message, &self.error) {
                (Some(m), _) if !m.is_empty() => Some(m.clone()),
                (_, Some(ErrorField::Text(t))) if !t.is_empty() => Some(t.clone()),
                _ => None,
            },
        }
    }
}

fn transport(err: &reqwest::Error) -> WizardError {
    if err.is_timeout() {
        WizardError::Timeout
    } else {
        WizardError::Transport(err.to_string())
    }
}

impl HttpReservationApi {
    /// Build a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WizardError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| WizardError::Transport("base URL cannot be a base".to_string()))?;
            parts.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(WizardError::NotFound);
        }
        if !status.is_success() {
            let envelope = response.json::<ErrorEnvelope>().await.unwrap_or_default();
            if status == reqwest::StatusCode::CONFLICT && envelope.code() == Some(CONFLICT_CODE) {
                return Err(WizardError::Conflict {
                    reservation_id: envelope.reservation_id(),
                });
            }
            return Err(WizardError::Server {
                status: status.as_u16(),
                message: envelope.message().unwrap_or_default(),
            });
        }

        response.json::<T>().await.map_err(|e| transport(&e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        Self::decode(response).await
    }

    async fn raw_availability(
        &self,
        unit_id: &UnitId,
        date: NaiveDate,
        slot: Slot,
    ) -> Result<Vec<RawArea>> {
        let mut url = self.endpoint(&["v1", "reservations", "public", "availability"])?;
        url.query_pairs_mut()
            .append_pair("unitId", unit_id.as_str())
            .append_pair("date", &date.format("%Y-%m-%d").to_string())
            .append_pair("time", slot.as_str());
        self.get_json(url).await
    }
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    status: Option<String>,
}

impl ReservationApi for HttpReservationApi {
    async fn list_units(&self) -> Result<Vec<UnitOption>> {
        let url = self.endpoint(&["v1", "units", "public", "options", "list"])?;
        let raw: Vec<RawUnit> = self.get_json(url).await?;
        Ok(normalize_units(raw))
    }

    async fn area_meta(&self, unit_id: &UnitId, probe_date: NaiveDate) -> Result<Vec<AreaMeta>> {
        let url = self.endpoint(&["v1", "areas", "public", "by-unit", unit_id.as_str()])?;
        let raw: Vec<RawArea> = self.get_json(url).await.unwrap_or_default();

        // Secondary probe: the metadata endpoint is empty for some units,
        // but the availability endpoint still carries descriptions/photos.
        let raw = if raw.is_empty() {
            self.raw_availability(unit_id, probe_date, META_PROBE_SLOT)
                .await
                .unwrap_or_default()
        } else {
            raw
        };

        Ok(normalize_meta_list(raw, self.config.asset_base.as_ref()))
    }

    async fn availability(
        &self,
        unit_id: &UnitId,
        date: NaiveDate,
        slot: Slot,
    ) -> Result<Vec<AreaAvailability>> {
        let raw = self.raw_availability(unit_id, date, slot).await?;
        Ok(normalize_availability_list(
            raw,
            self.config.asset_base.as_ref(),
        ))
    }

    async fn create(&self, request: CreateReservationRequest) -> Result<CreatedReservation> {
        let url = self.endpoint(&["v1", "reservations", "public"])?;
        tracing::debug!(%url, "POST reservation");
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        Self::decode(response).await
    }

    async fn active(&self, id: &ReservationId) -> Result<ReservationRecord> {
        let mut url = self.endpoint(&["v1", "reservations", "public", "active"])?;
        url.query_pairs_mut().append_pair("id", id.as_str());
        let raw: RawReservation = self.get_json(url).await?;
        raw.normalize()
            .ok_or_else(|| WizardError::Transport("malformed reservation payload".to_string()))
    }

    async fn status(&self, id: &ReservationId) -> Result<ReservationStatus> {
        let url = self.endpoint(&["v1", "reservations", id.as_str(), "status"])?;
        let raw: RawStatus = self.get_json(url).await?;
        Ok(raw
            .status
            .as_deref()
            .and_then(ReservationStatus::parse)
            .unwrap_or(ReservationStatus::AwaitingCheckin))
    }

    async fn lookup(&self, code: &str) -> Result<ReservationRecord> {
        let mut attempts: Vec<Url> = Vec::with_capacity(3);
        for segments in [
            &["v1", "reservations", "public", "lookup"][..],
            &["v1", "reservations", "lookup"][..],
        ] {
            let mut url = self.endpoint(segments)?;
            url.query_pairs_mut().append_pair("code", code);
            attempts.push(url);
        }
        attempts.push(self.endpoint(&["v1", "reservations", "code", code])?);

        let total = attempts.len();
        for (i, url) in attempts.into_iter().enumerate() {
            match self.get_json::<RawReservation>(url).await {
                Ok(raw) => {
                    return raw.normalize().ok_or_else(|| {
                        WizardError::Transport("malformed reservation payload".to_string())
                    });
                },
                Err(WizardError::NotFound) if i + 1 < total => {},
                Err(err) => return Err(err),
            }
        }
        Err(WizardError::NotFound)
    }

    fn qr_url(&self, id: &ReservationId) -> String {
        self.endpoint(&["v1", "reservations", id.as_str(), "qrcode"])
            .map_or_else(
                |_| format!("{}/v1/reservations/{}/qrcode", self.config.base_url, id),
                Into::into,
            )
    }
}
