//! Mock providers for testing.
//!
//! In-memory implementations of every environment trait: a scriptable
//! reservation API (with per-tuple responses, failure injection, and
//! artificial latency for race tests), a memory-backed resumption store,
//! and a recording analytics client. All state sits behind `Arc<Mutex>`
//! so clones observe the same script.

#![allow(clippy::expect_used)] // test-support code; a poisoned mock is a failed test

use crate::analytics::{AnalyticsClient, ReservationEvent};
use crate::api::{CreateReservationRequest, CreatedReservation, ReservationApi};
use crate::attribution::StaticAttribution;
use crate::environment::WizardEnvironment;
use crate::error::{Result, WizardError};
use crate::resumption::{LocalResumptionRecord, ResumptionStore};
use crate::state::{
    AreaAvailability, AreaMeta, ReservationId, ReservationRecord, ReservationStatus, Slot, UnitId,
    UnitOption,
};
use chrono::{Days, NaiveDate};
use reserva_testing::mocks::{FixedClock, test_clock, test_clock_date};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A plausible confirmed record two days out at 18:00.
#[must_use]
pub fn sample_record(id: &str, code: &str) -> ReservationRecord {
    ReservationRecord {
        id: ReservationId::from(id),
        code: code.to_string(),
        unit_id: Some(UnitId::from("u1")),
        unit_label: "Harbor Hall".into(),
        area_id: Some(crate::state::AreaId::from("a1")),
        area_name: "Terrace".into(),
        reservation_at: crate::validation::reservation_instant(
            test_clock_date() + Days::new(2),
            Slot::SixPm,
        ),
        people: 10,
        kids: 0,
        full_name: Some("Ana Souza".into()),
        cpf: Some("12345678901".into()),
        email: Some("ana@example.com".into()),
        phone: Some("61999998888".into()),
        status: ReservationStatus::AwaitingCheckin,
        reservation_type: None,
    }
}

type AvailabilityKeyTuple = (String, NaiveDate, Slot);

#[derive(Default)]
struct ApiScript {
    units: Option<Result<Vec<UnitOption>>>,
    area_meta: Option<Result<Vec<AreaMeta>>>,
    availability: HashMap<AvailabilityKeyTuple, Result<Vec<AreaAvailability>>>,
    availability_default: Option<Result<Vec<AreaAvailability>>>,
    availability_delays: HashMap<AvailabilityKeyTuple, Duration>,
    create: VecDeque<Result<CreatedReservation>>,
    active: HashMap<String, Result<ReservationRecord>>,
    statuses: VecDeque<Result<ReservationStatus>>,
    lookup: HashMap<String, Result<ReservationRecord>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Per-endpoint call counters.
pub struct ApiCalls {
    /// `list_units` calls.
    pub units: usize,
    /// `area_meta` calls.
    pub area_meta: usize,
    /// `availability` calls.
    pub availability: usize,
    /// `create` calls.
    pub create: usize,
    /// `active` calls.
    pub active: usize,
    /// `status` calls.
    pub status: usize,
    /// `lookup` calls.
    pub lookup: usize,
}

/// Scriptable in-memory reservation API.
#[derive(Clone, Default)]
pub struct MockReservationApi {
    script: Arc<Mutex<ApiScript>>,
    calls: Arc<Mutex<ApiCalls>>,
}

impl MockReservationApi {
    /// A mock whose every list endpoint answers empty success.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, ApiScript> {
        self.script.lock().expect("mock script lock")
    }

    /// Counters for every endpoint.
    #[must_use]
    pub fn calls(&self) -> ApiCalls {
        *self.calls.lock().expect("mock call-count lock")
    }

    /// Script the unit list response.
    pub fn script_units(&self, result: Result<Vec<UnitOption>>) {
        self.script().units = Some(result);
    }

    /// Script the area metadata response.
    pub fn script_area_meta(&self, result: Result<Vec<AreaMeta>>) {
        self.script().area_meta = Some(result);
    }

    /// Script the availability response for one (unit, date, slot) tuple.
    pub fn script_availability(
        &self,
        unit: &str,
        date: NaiveDate,
        slot: Slot,
        result: Result<Vec<AreaAvailability>>,
    ) {
        self.script()
            .availability
            .insert((unit.to_string(), date, slot), result);
    }

    /// Script the availability response for any unscripted tuple.
    pub fn script_availability_default(&self, result: Result<Vec<AreaAvailability>>) {
        self.script().availability_default = Some(result);
    }

    /// Delay the availability response for one tuple (for race tests).
    pub fn delay_availability(&self, unit: &str, date: NaiveDate, slot: Slot, delay: Duration) {
        self.script()
            .availability_delays
            .insert((unit.to_string(), date, slot), delay);
    }

    /// Queue a creation response; they are consumed in order.
    pub fn script_create(&self, result: Result<CreatedReservation>) {
        self.script().create.push_back(result);
    }

    /// Script the active-reservation response for an id.
    pub fn script_active(&self, id: &str, result: Result<ReservationRecord>) {
        self.script().active.insert(id.to_string(), result);
    }

    /// Queue a status response; the last one repeats once drained.
    pub fn script_status(&self, result: Result<ReservationStatus>) {
        self.script().statuses.push_back(result);
    }

    /// Script the lookup response for a code.
    pub fn script_lookup(&self, code: &str, result: Result<ReservationRecord>) {
        self.script().lookup.insert(code.to_string(), result);
    }
}

impl ReservationApi for MockReservationApi {
    async fn list_units(&self) -> Result<Vec<UnitOption>> {
        self.calls.lock().expect("mock call-count lock").units += 1;
        self.script().units.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn area_meta(&self, _unit_id: &UnitId, _probe_date: NaiveDate) -> Result<Vec<AreaMeta>> {
        self.calls.lock().expect("mock call-count lock").area_meta += 1;
        self.script()
            .area_meta
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn availability(
        &self,
        unit_id: &UnitId,
        date: NaiveDate,
        slot: Slot,
    ) -> Result<Vec<AreaAvailability>> {
        self.calls.lock().expect("mock call-count lock").availability += 1;
        let key = (unit_id.as_str().to_string(), date, slot);

        let (delay, result) = {
            let script = self.script();
            let delay = script.availability_delays.get(&key).copied();
            let result = script
                .availability
                .get(&key)
                .cloned()
                .or_else(|| script.availability_default.clone())
                .unwrap_or_else(|| Ok(Vec::new()));
            (delay, result)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn create(&self, _request: CreateReservationRequest) -> Result<CreatedReservation> {
        self.calls.lock().expect("mock call-count lock").create += 1;
        self.script().create.pop_front().unwrap_or_else(|| {
            Err(WizardError::Server {
                status: 500,
                message: "no scripted creation response".into(),
            })
        })
    }

    async fn active(&self, id: &ReservationId) -> Result<ReservationRecord> {
        self.calls.lock().expect("mock call-count lock").active += 1;
        self.script()
            .active
            .get(id.as_str())
            .cloned()
            .unwrap_or(Err(WizardError::NotFound))
    }

    async fn status(&self, _id: &ReservationId) -> Result<ReservationStatus> {
        self.calls.lock().expect("mock call-count lock").status += 1;
        let mut script = self.script();
        if script.statuses.len() > 1 {
            script
                .statuses
                .pop_front()
                .unwrap_or(Ok(ReservationStatus::AwaitingCheckin))
        } else {
            script
                .statuses
                .front()
                .cloned()
                .unwrap_or(Ok(ReservationStatus::AwaitingCheckin))
        }
    }

    async fn lookup(&self, code: &str) -> Result<ReservationRecord> {
        self.calls.lock().expect("mock call-count lock").lookup += 1;
        self.script()
            .lookup
            .get(code)
            .cloned()
            .unwrap_or(Err(WizardError::NotFound))
    }

    fn qr_url(&self, id: &ReservationId) -> String {
        format!("https://api.test/v1/reservations/{id}/qrcode")
    }
}

/// Memory-backed resumption store.
#[derive(Clone, Default)]
pub struct MemoryResumptionStore {
    record: Arc<Mutex<Option<LocalResumptionRecord>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryResumptionStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a snapshot.
    #[must_use]
    pub fn with_record(record: LocalResumptionRecord) -> Self {
        let store = Self::default();
        *store.record.lock().expect("mock store lock") = Some(record);
        store
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<LocalResumptionRecord> {
        self.record.lock().expect("mock store lock").clone()
    }

    /// How many times `save` ran.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock().expect("mock store lock")
    }
}

impl ResumptionStore for MemoryResumptionStore {
    async fn save(&self, record: &LocalResumptionRecord) -> Result<()> {
        *self.record.lock().expect("mock store lock") = Some(record.clone());
        *self.saves.lock().expect("mock store lock") += 1;
        Ok(())
    }

    async fn load(&self) -> Result<Option<LocalResumptionRecord>> {
        Ok(self.record.lock().expect("mock store lock").clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.record.lock().expect("mock store lock") = None;
        Ok(())
    }
}

/// Analytics client that records everything it is told.
#[derive(Clone, Default)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<(String, ReservationEvent)>>>,
    active_units: Arc<Mutex<Vec<String>>>,
    ready: Arc<Mutex<bool>>,
}

impl RecordingAnalytics {
    /// A fresh recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(event, payload)` tracked so far.
    #[must_use]
    pub fn events(&self) -> Vec<(String, ReservationEvent)> {
        self.events.lock().expect("mock analytics lock").clone()
    }

    /// Every unit key activated so far.
    #[must_use]
    pub fn active_units(&self) -> Vec<String> {
        self.active_units.lock().expect("mock analytics lock").clone()
    }

    /// Whether `ensure_ready` ran.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.lock().expect("mock analytics lock")
    }
}

impl AnalyticsClient for RecordingAnalytics {
    fn ensure_ready(&self) {
        *self.ready.lock().expect("mock analytics lock") = true;
    }

    fn set_active_unit(&self, key: &str) -> bool {
        self.active_units
            .lock()
            .expect("mock analytics lock")
            .push(key.to_string());
        true
    }

    fn track(&self, event: &str, payload: &ReservationEvent) {
        self.events
            .lock()
            .expect("mock analytics lock")
            .push((event.to_string(), payload.clone()));
    }
}

/// The standard test environment: empty-success API, empty store,
/// recording analytics, default attribution, fixed clock.
#[must_use]
pub fn test_environment() -> WizardEnvironment<
    MockReservationApi,
    MemoryResumptionStore,
    RecordingAnalytics,
    StaticAttribution,
    FixedClock,
> {
    WizardEnvironment::new(
        MockReservationApi::new(),
        MemoryResumptionStore::new(),
        RecordingAnalytics::new(),
        StaticAttribution::default(),
        test_clock(),
    )
}

/// A test environment around pre-built providers.
#[must_use]
pub fn environment_with(
    api: MockReservationApi,
    store: MemoryResumptionStore,
) -> WizardEnvironment<
    MockReservationApi,
    MemoryResumptionStore,
    RecordingAnalytics,
    StaticAttribution,
    FixedClock,
> {
    WizardEnvironment::new(
        api,
        store,
        RecordingAnalytics::new(),
        StaticAttribution::default(),
        test_clock(),
    )
}
