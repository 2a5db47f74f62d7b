//! End-to-end wizard flows driven through a real store.
//!
//! These tests wire the wizard reducer into `reserva-runtime` with mock
//! providers and exercise the full action → reducer → effect → action
//! loop: the happy path, the defensive no-network rejections, both sides
//! of 409 reconciliation, boot-time resumption, and the stale-availability
//! race.

#![allow(clippy::unwrap_used, clippy::expect_used)] // test code

use chrono::Days;
use reserva_runtime::Store;
use reserva_testing::mocks::{FixedClock, test_clock, test_clock_date};
use reserva_wizard::api::CreatedReservation;
use reserva_wizard::attribution::StaticAttribution;
use reserva_wizard::constants::messages;
use reserva_wizard::mocks::{
    MemoryResumptionStore, MockReservationApi, RecordingAnalytics, sample_record,
};
use reserva_wizard::state::WatcherState;
use reserva_wizard::{
    AreaAvailability, AreaId, LocalResumptionRecord, ReservationId, ReservationStatus,
    ReservationType, Slot, UnitId, UnitOption, WizardAction, WizardEnvironment, WizardReducer,
    WizardState, WizardStep,
};
use std::time::Duration;

type TestEnv = WizardEnvironment<
    MockReservationApi,
    MemoryResumptionStore,
    RecordingAnalytics,
    StaticAttribution,
    FixedClock,
>;
type TestReducer = WizardReducer<
    MockReservationApi,
    MemoryResumptionStore,
    RecordingAnalytics,
    StaticAttribution,
    FixedClock,
>;
type WizardStore = Store<WizardState, WizardAction, TestEnv, TestReducer>;

const WAIT: Duration = Duration::from_secs(5);

struct Fixture {
    api: MockReservationApi,
    store_backend: MemoryResumptionStore,
    analytics: RecordingAnalytics,
    store: WizardStore,
}

fn fixture() -> Fixture {
    fixture_with_backend(MemoryResumptionStore::new())
}

fn fixture_with_backend(store_backend: MemoryResumptionStore) -> Fixture {
    let api = MockReservationApi::new();
    let analytics = RecordingAnalytics::new();
    let env = WizardEnvironment::new(
        api.clone(),
        store_backend.clone(),
        analytics.clone(),
        StaticAttribution::default(),
        test_clock(),
    );
    let store = Store::new(WizardState::default(), WizardReducer::new(), env);
    Fixture {
        api,
        store_backend,
        analytics,
        store,
    }
}

fn area(id: &str, remaining: u32) -> AreaAvailability {
    AreaAvailability {
        id: AreaId::from(id),
        name: id.to_uppercase(),
        description: String::new(),
        photo_url: None,
        icon_emoji: None,
        capacity: Some(60),
        remaining: Some(remaining),
        is_available: Some(remaining > 0),
    }
}

fn reservation_date() -> chrono::NaiveDate {
    test_clock_date() + Days::new(2)
}

/// Drive the wizard from step 0 to a filled identity form on step 3.
async fn drive_to_identity(f: &Fixture) {
    f.api.script_units(Ok(vec![UnitOption {
        id: UnitId::from("u1"),
        name: "Harbor Hall".into(),
        slug: None,
    }]));
    f.api.script_availability(
        "u1",
        reservation_date(),
        Slot::SixPm,
        Ok(vec![area("terrace", 24)]),
    );

    let store = &f.store;
    store.send(WizardAction::Boot).await.unwrap();
    store.wait_for_idle(WAIT).await.unwrap();

    store
        .send(WizardAction::SelectType {
            reservation_type: ReservationType::Birthday,
        })
        .await
        .unwrap();
    store.send(WizardAction::ContinueFromType).await.unwrap();
    store
        .send(WizardAction::SelectUnit {
            unit_id: UnitId::from("u1"),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SetAdults { count: 10 })
        .await
        .unwrap();
    store
        .send(WizardAction::SelectDate {
            date: Some(reservation_date()),
        })
        .await
        .unwrap();

    // Selecting the time issues the availability query; wait for it.
    store
        .send_and_wait_for(
            WizardAction::SelectTime {
                time: "18:00".into(),
            },
            |a| matches!(a, WizardAction::AvailabilityLoaded { .. }),
            WAIT,
        )
        .await
        .unwrap();

    store.send(WizardAction::ContinueFromSchedule).await.unwrap();
    store
        .send(WizardAction::SelectArea {
            area_id: AreaId::from("terrace"),
        })
        .await
        .unwrap();
    store.send(WizardAction::ContinueFromArea).await.unwrap();

    store
        .send(WizardAction::SetFullName {
            value: "Ana Souza".into(),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SetCpf {
            value: "123.456.789-01".into(),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SetEmail {
            value: "Ana@Example.com".into(),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SetPhone {
            value: "(61) 99999-8888".into(),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SetBirthDate {
            date: Some(test_clock_date() - Days::new(9000)),
        })
        .await
        .unwrap();

    assert_eq!(store.state(|s| s.step).await, WizardStep::IdentityForm);
    assert!(store.state(WizardState::can_submit).await);
}

#[tokio::test]
async fn happy_path_reaches_boarding_pass_and_checkin() {
    let f = fixture();
    drive_to_identity(&f).await;

    f.api.script_create(Ok(CreatedReservation {
        id: ReservationId::from("r-new"),
        code: "JT5WK6".into(),
        status: Some("AWAITING_CHECKIN".into()),
    }));
    let mut server_record = sample_record("r-new", "JT5WK6");
    server_record.reservation_type = Some(ReservationType::Birthday);
    f.api.script_active("r-new", Ok(server_record));
    f.api.script_status(Ok(ReservationStatus::CheckedIn));

    f.store.send(WizardAction::Submit).await.unwrap();
    f.store.wait_for_idle(WAIT).await.unwrap();

    let (step, code, watcher) = f
        .store
        .state(|s| {
            (
                s.step,
                s.active_reservation.as_ref().map(|r| r.code.clone()),
                s.watcher,
            )
        })
        .await;
    assert_eq!(step, WizardStep::Confirmed);
    assert_eq!(code.as_deref(), Some("JT5WK6"));
    assert_eq!(watcher, WatcherState::CheckedIn);

    // The snapshot was persisted for resumption.
    let snapshot = f.store_backend.snapshot().unwrap();
    assert_eq!(snapshot.id, "r-new");
    assert_eq!(snapshot.code, "JT5WK6");
    assert_eq!(snapshot.reservation_type, Some(ReservationType::Birthday));

    // Analytics saw the submission and the check-in.
    let events: Vec<String> = f.analytics.events().into_iter().map(|(e, _)| e).collect();
    assert!(events.contains(&"reservation_made".to_string()));
    assert!(events.contains(&"reservation_checkin".to_string()));
}

#[tokio::test]
async fn same_day_submit_never_touches_the_network() {
    let f = fixture();
    drive_to_identity(&f).await;

    // Rewind the date to today; the availability fetch for it is irrelevant.
    f.api.script_availability(
        "u1",
        test_clock_date(),
        Slot::SixPm,
        Ok(vec![area("terrace", 24)]),
    );
    f.store
        .send(WizardAction::SelectDate {
            date: Some(test_clock_date()),
        })
        .await
        .unwrap();
    f.store
        .send_and_wait_for(
            WizardAction::SelectTime {
                time: "18:00".into(),
            },
            |a| matches!(a, WizardAction::AvailabilityLoaded { .. }),
            WAIT,
        )
        .await
        .unwrap();

    let creates_before = f.api.calls().create;
    f.store.send(WizardAction::Submit).await.unwrap();
    f.store.wait_for_idle(WAIT).await.unwrap();

    assert_eq!(f.api.calls().create, creates_before);
    let (step, error) = f.store.state(|s| (s.step, s.error.clone())).await;
    assert_eq!(step, WizardStep::UnitDateTimePeople);
    assert_eq!(error.as_deref(), Some(messages::ONE_DAY_AHEAD));
}

#[tokio::test]
async fn conflict_with_recoverable_reservation_reconciles_to_confirmed() {
    let f = fixture();
    drive_to_identity(&f).await;

    f.api.script_create(Err(reserva_wizard::WizardError::Conflict {
        reservation_id: Some("srv-9".into()),
    }));
    f.api
        .script_active("srv-9", Ok(sample_record("srv-9", "ZZTOP1")));
    f.api.script_status(Ok(ReservationStatus::CheckedIn));

    f.store.send(WizardAction::Submit).await.unwrap();
    f.store.wait_for_idle(WAIT).await.unwrap();

    let (step, id, code) = f
        .store
        .state(|s| {
            (
                s.step,
                s.active_reservation.as_ref().map(|r| r.id.as_str().to_string()),
                s.active_reservation.as_ref().map(|r| r.code.clone()),
            )
        })
        .await;
    assert_eq!(step, WizardStep::Confirmed);
    assert_eq!(id.as_deref(), Some("srv-9"), "server id, not a local one");
    assert_eq!(code.as_deref(), Some("ZZTOP1"));

    // The cache points at the reconciled reservation.
    assert_eq!(f.store_backend.snapshot().unwrap().id, "srv-9");
}

#[tokio::test]
async fn conflict_without_recoverable_reservation_blocks_on_step_three() {
    let f = fixture();
    drive_to_identity(&f).await;

    f.api.script_create(Err(reserva_wizard::WizardError::Conflict {
        reservation_id: Some("gone-1".into()),
    }));
    // No script for "gone-1": the reconciliation fetch 404s.

    f.store.send(WizardAction::Submit).await.unwrap();
    f.store.wait_for_idle(WAIT).await.unwrap();

    let (step, error, sending) = f
        .store
        .state(|s| (s.step, s.error.clone(), s.sending))
        .await;
    assert_eq!(step, WizardStep::IdentityForm);
    assert_eq!(error.as_deref(), Some(messages::ACTIVE_RESERVATION_EXISTS));
    assert!(!sending);
}

#[tokio::test]
async fn resumption_restores_an_awaiting_reservation() {
    let snapshot = LocalResumptionRecord {
        id: "r1".into(),
        code: "JT5WK6".into(),
        qr_url: "https://api.test/v1/reservations/r1/qrcode".into(),
        unit_label: "Harbor Hall".into(),
        area_name: "Terrace".into(),
        date_str: "03/06/2025".into(),
        time_str: "18:00".into(),
        people: 10,
        kids: 0,
        full_name: Some("Ana Souza".into()),
        cpf: None,
        email_hint: None,
        reservation_type: Some(ReservationType::Birthday),
    };
    let f = fixture_with_backend(MemoryResumptionStore::with_record(snapshot));

    f.api.script_active("r1", Ok(sample_record("r1", "JT5WK6")));
    f.api.script_status(Ok(ReservationStatus::CheckedIn));

    f.store.send(WizardAction::Boot).await.unwrap();
    f.store.wait_for_idle(WAIT).await.unwrap();

    let (step, reservation_type) = f
        .store
        .state(|s| (s.step, s.draft.reservation_type))
        .await;
    assert_eq!(step, WizardStep::Confirmed);
    // The cached birthday choice stays sticky through resumption.
    assert_eq!(reservation_type, ReservationType::Birthday);
}

#[tokio::test]
async fn resumption_discards_a_checked_in_reservation() {
    let snapshot = LocalResumptionRecord {
        id: "r1".into(),
        code: "JT5WK6".into(),
        qr_url: String::new(),
        unit_label: String::new(),
        area_name: String::new(),
        date_str: "03/06/2025".into(),
        time_str: "18:00".into(),
        people: 10,
        kids: 0,
        full_name: None,
        cpf: None,
        email_hint: None,
        reservation_type: None,
    };
    let f = fixture_with_backend(MemoryResumptionStore::with_record(snapshot));

    let mut record = sample_record("r1", "JT5WK6");
    record.status = ReservationStatus::CheckedIn;
    f.api.script_active("r1", Ok(record));

    f.store.send(WizardAction::Boot).await.unwrap();
    f.store.wait_for_idle(WAIT).await.unwrap();

    assert_eq!(f.store.state(|s| s.step).await, WizardStep::TypeSelection);
    assert_eq!(f.store_backend.snapshot(), None, "stale snapshot discarded");
}

#[tokio::test]
async fn slow_response_for_an_abandoned_tuple_is_discarded() {
    let f = fixture();
    f.api.script_units(Ok(vec![UnitOption {
        id: UnitId::from("u1"),
        name: "Harbor Hall".into(),
        slug: None,
    }]));

    // The first tuple answers slowly with its own area list...
    f.api.script_availability(
        "u1",
        reservation_date(),
        Slot::SixPm,
        Ok(vec![area("stale", 30)]),
    );
    f.api
        .delay_availability("u1", reservation_date(), Slot::SixPm, Duration::from_millis(150));
    // ...the tuple the user switched to answers immediately.
    f.api.script_availability(
        "u1",
        reservation_date(),
        Slot::SevenPm,
        Ok(vec![area("fresh", 30)]),
    );

    let store = &f.store;
    store
        .send(WizardAction::SelectUnit {
            unit_id: UnitId::from("u1"),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SelectDate {
            date: Some(reservation_date()),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SelectTime {
            time: "18:00".into(),
        })
        .await
        .unwrap();
    store
        .send(WizardAction::SelectTime {
            time: "19:00".into(),
        })
        .await
        .unwrap();

    // Both responses (including the delayed stale one) settle here.
    f.store.wait_for_idle(WAIT).await.unwrap();

    let areas: Vec<String> = f
        .store
        .state(|s| s.areas.iter().map(|a| a.id.as_str().to_string()).collect())
        .await;
    assert_eq!(
        areas,
        vec!["fresh".to_string()],
        "the list must belong to the tuple selected last"
    );
}
