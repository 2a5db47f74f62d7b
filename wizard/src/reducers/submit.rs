//! Submit reducer: identity form, the submit/reconcile protocol, and
//! boot-time resumption.
//!
//! The submit path re-validates every step defensively before any network
//! traffic; the first violation routes the user back to the offending
//! step. A 409 conflict is a reconciliation trigger, not an error: when
//! the existing active reservation can be fetched it is treated exactly
//! like a fresh success.

use crate::actions::WizardAction;
use crate::analytics::{AnalyticsClient, ReservationEvent};
use crate::api::{CreateReservationRequest, ReservationApi};
use crate::attribution::AttributionReader;
use crate::constants::{MIN_PEOPLE, SOURCE_TAG, events, messages};
use crate::environment::WizardEnvironment;
use crate::error::WizardError;
use crate::resumption::{LocalResumptionRecord, ResumptionStore};
use crate::state::{
    ReservationId, ReservationRecord, ReservationStatus, WizardState, WizardStep,
};
use crate::validation;
use chrono::SecondsFormat;
use reserva_core::environment::Clock;
use reserva_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

use super::{area_label, enter_confirmed, unit_label};

/// Reducer for step 3 and the wizard lifecycle (boot, submit, reconcile).
#[derive(Debug, Clone)]
pub struct SubmitReducer<A, S, N, R, C> {
    _phantom: std::marker::PhantomData<(A, S, N, R, C)>,
}

impl<A, S, N, R, C> SubmitReducer<A, S, N, R, C> {
    /// Create the submit reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<A, S, N, R, C> Default for SubmitReducer<A, S, N, R, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Abort the submit: clear the in-flight flag, surface the message, and
/// route back to the offending step.
fn reject(state: &mut WizardState, step: WizardStep, message: &str) {
    state.sending = false;
    state.error = Some(message.to_string());
    state.step = step;
}

impl<A, S, N, R, C> SubmitReducer<A, S, N, R, C>
where
    A: ReservationApi + Clone + Send + Sync + 'static,
    S: ResumptionStore + Clone + Send + Sync + 'static,
    N: AnalyticsClient + Clone + Send + Sync + 'static,
    R: AttributionReader + Clone + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    fn boot(
        state: &mut WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        env.analytics.ensure_ready();
        state.units_loading = true;
        state.units_error = None;

        let api = env.api.clone();
        let units = Effect::future(async move {
            Some(WizardAction::UnitsLoaded {
                result: api.list_units().await,
            })
        });

        let api = env.api.clone();
        let store = env.resumption.clone();
        let resumption = Effect::future(async move {
            let saved = match store.load().await {
                Ok(Some(saved)) => saved,
                Ok(None) => {
                    return Some(WizardAction::ResumptionChecked {
                        record: None,
                        cached_type: None,
                    });
                },
                Err(err) => {
                    tracing::warn!(%err, "resumption load failed");
                    return Some(WizardAction::ResumptionChecked {
                        record: None,
                        cached_type: None,
                    });
                },
            };

            let cached_type = saved.reservation_type;
            let id = ReservationId::from(saved.id.clone());
            match api.active(&id).await {
                Ok(record) if record.status == ReservationStatus::AwaitingCheckin => {
                    Some(WizardAction::ResumptionChecked {
                        record: Some(record),
                        cached_type,
                    })
                },
                Ok(_) => {
                    // Checked in (or otherwise done): the snapshot no longer
                    // points at an active reservation.
                    let _ = store.clear().await;
                    Some(WizardAction::ResumptionChecked {
                        record: None,
                        cached_type,
                    })
                },
                Err(err) if err.is_transient() => {
                    // Keep the snapshot; the next boot retries.
                    tracing::debug!(%err, "resumption check failed, keeping snapshot");
                    Some(WizardAction::ResumptionChecked {
                        record: None,
                        cached_type,
                    })
                },
                Err(_) => {
                    let _ = store.clear().await;
                    Some(WizardAction::ResumptionChecked {
                        record: None,
                        cached_type,
                    })
                },
            }
        });

        smallvec![units, resumption]
    }

    /// Persist the confirmed reservation for later resumption.
    fn save_snapshot_effect(
        state: &WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
    ) -> Effect<WizardAction> {
        let Some(record) = state.active_reservation.as_ref() else {
            return Effect::None;
        };
        let snapshot = LocalResumptionRecord::from_record(
            record,
            env.api.qr_url(&record.id),
            state.draft.reservation_type,
        );
        let store = env.resumption.clone();
        Effect::future(async move {
            if let Err(err) = store.save(&snapshot).await {
                tracing::warn!(%err, "failed to persist resumption snapshot");
            }
            Some(WizardAction::ResumptionSaved)
        })
    }

    /// Defensive re-validation of every invariant, in flow order. Returns
    /// `false` when the submit was rejected.
    fn validate_for_submit(
        state: &mut WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
    ) -> bool {
        let now = env.clock.now();

        if state.draft.people() < MIN_PEOPLE {
            reject(
                state,
                WizardStep::UnitDateTimePeople,
                &messages::min_people_to_reserve(),
            );
            return false;
        }

        let (Some(date), Some(slot)) = (state.draft.date, state.draft.slot) else {
            reject(
                state,
                WizardStep::UnitDateTimePeople,
                messages::SELECT_DATE_AND_TIME,
            );
            return false;
        };

        if validation::is_same_day_as_today(date, now) {
            reject(state, WizardStep::UnitDateTimePeople, messages::ONE_DAY_AHEAD);
            return false;
        }
        if date < now.date_naive() {
            reject(state, WizardStep::UnitDateTimePeople, messages::DATE_FROM_TODAY);
            return false;
        }
        if validation::is_past_selection(date, slot, now) {
            reject(state, WizardStep::UnitDateTimePeople, messages::TIME_IN_PAST);
            return false;
        }
        if validation::is_time_outside_window(slot.as_str()) {
            reject(
                state,
                WizardStep::UnitDateTimePeople,
                &messages::time_outside_window(),
            );
            return false;
        }

        if !validation::is_valid_email(&state.draft.email)
            || !validation::is_valid_phone(&state.draft.phone)
        {
            state.sending = false;
            state.error = Some(messages::INVALID_CONTACT.to_string());
            return false;
        }

        if state.draft.area_id.is_none() || state.draft.unit_id.is_none() {
            reject(state, WizardStep::AreaSelection, messages::SELECT_UNIT_AND_AREA);
            return false;
        }

        if state.draft.birth_date.is_none() {
            state.sending = false;
            state.error = None;
            state.birth_date_error = Some(messages::BIRTH_DATE_REQUIRED.to_string());
            state.step = WizardStep::IdentityForm;
            return false;
        }

        true
    }

    fn submit(
        state: &mut WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        if state.sending {
            return smallvec![];
        }
        state.sending = true;
        state.error = None;

        if !Self::validate_for_submit(state, env) {
            return smallvec![];
        }

        // Checked non-empty by validate_for_submit.
        let (Some(date), Some(slot)) = (state.draft.date, state.draft.slot) else {
            return smallvec![];
        };
        let (Some(unit_id), Some(area_id)) =
            (state.draft.unit_id.clone(), state.draft.area_id.clone())
        else {
            return smallvec![];
        };

        let attribution = env.attribution.read();
        let default_campaign = format!("{unit_id}:{area_id}");

        let request = CreateReservationRequest {
            full_name: state.draft.full_name.clone(),
            cpf: validation::only_digits(&state.draft.cpf),
            people: state.draft.people(),
            kids: state.draft.children,
            reservation_date: validation::reservation_instant(date, slot)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            birthday_date: state.draft.birth_date.map(|b| {
                b.and_time(chrono::NaiveTime::MIN)
                    .and_utc()
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
            }),
            email: state.draft.email.trim().to_lowercase(),
            phone: validation::only_digits(&state.draft.phone),
            unit_id: unit_id.as_str().to_string(),
            area_id: area_id.as_str().to_string(),
            utm_source: attribution.utm_source,
            utm_medium: attribution.utm_medium,
            utm_campaign: attribution.utm_campaign.or(Some(default_campaign)),
            utm_content: attribution.utm_content,
            utm_term: attribution.utm_term,
            url: attribution.url,
            referrer: attribution.referrer,
            source: SOURCE_TAG.to_string(),
            reservation_type: state.draft.reservation_type.as_str().to_string(),
        };

        let api = env.api.clone();
        smallvec![Effect::future(async move {
            let action = match api.create(request).await {
                Ok(created) => WizardAction::CreationSucceeded {
                    id: created.id,
                    code: created.code,
                    status: created.status,
                },
                Err(WizardError::Conflict { reservation_id }) => WizardAction::ConflictDetected {
                    reservation_id: reservation_id.map(ReservationId::from),
                },
                Err(err) => WizardAction::SubmitFailed {
                    message: err.user_message(messages::SUBMIT_FALLBACK),
                },
            };
            Some(action)
        })]
    }

    fn creation_succeeded(
        state: &WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
        id: ReservationId,
        code: String,
        status: Option<String>,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        env.analytics.track(
            events::RESERVATION_MADE,
            &ReservationEvent {
                reservation_code: code.clone(),
                full_name: state.draft.full_name.clone(),
                email: state.draft.email.clone(),
                phone: validation::only_digits(&state.draft.phone),
                unit: unit_label(state),
                area: area_label(state),
                status: status
                    .unwrap_or_else(|| ReservationStatus::AwaitingCheckin.as_str().to_string()),
                source: SOURCE_TAG.to_string(),
            },
        );

        // Fetch the authoritative record for display; local values stand in
        // when that fetch fails.
        let api = env.api.clone();
        smallvec![Effect::future(async move {
            let result = api.active(&id).await;
            Some(WizardAction::RecordFetched { id, code, result })
        })]
    }

    /// Assemble a record from what the client already knows, for when the
    /// post-creation fetch fails.
    fn local_record(
        state: &WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
        id: ReservationId,
        code: String,
    ) -> ReservationRecord {
        let reservation_at = match (state.draft.date, state.draft.slot) {
            (Some(date), Some(slot)) => validation::reservation_instant(date, slot),
            _ => env.clock.now(),
        };
        ReservationRecord {
            id,
            code,
            unit_id: state.draft.unit_id.clone(),
            unit_label: unit_label(state),
            area_id: state.draft.area_id.clone(),
            area_name: area_label(state),
            reservation_at,
            people: state.draft.people(),
            kids: state.draft.children,
            full_name: Some(state.draft.full_name.clone()),
            cpf: Some(validation::only_digits(&state.draft.cpf)),
            email: Some(state.draft.email.trim().to_lowercase()),
            phone: Some(validation::only_digits(&state.draft.phone)),
            status: ReservationStatus::AwaitingCheckin,
            reservation_type: Some(state.draft.reservation_type),
        }
    }
}

impl<A, S, N, R, C> Reducer for SubmitReducer<A, S, N, R, C>
where
    A: ReservationApi + Clone + Send + Sync + 'static,
    S: ResumptionStore + Clone + Send + Sync + 'static,
    N: AnalyticsClient + Clone + Send + Sync + 'static,
    R: AttributionReader + Clone + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    type State = WizardState;
    type Action = WizardAction;
    type Environment = WizardEnvironment<A, S, N, R, C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            WizardAction::Boot => Self::boot(state, env),

            WizardAction::ResumptionChecked {
                record,
                cached_type,
            } => {
                if let Some(cached) = cached_type {
                    state.draft.reservation_type = cached;
                }
                match record {
                    Some(record) => enter_confirmed(state, record, env),
                    None => smallvec![],
                }
            },

            WizardAction::SetFullName { value } => {
                state.draft.full_name = value;
                smallvec![]
            },

            WizardAction::SetCpf { value } => {
                let digits = validation::only_digits(&value);
                state.draft.cpf = digits[..digits.len().min(11)].to_string();
                smallvec![]
            },

            WizardAction::SetEmail { value } => {
                state.draft.email = value;
                smallvec![]
            },

            WizardAction::SetPhone { value } => {
                let digits = validation::only_digits(&value);
                state.draft.phone = digits[..digits.len().min(11)].to_string();
                smallvec![]
            },

            WizardAction::SetBirthDate { date } => {
                state.draft.birth_date = date;
                if date.is_some() {
                    state.birth_date_error = None;
                }
                smallvec![]
            },

            WizardAction::Submit => Self::submit(state, env),

            WizardAction::CreationSucceeded { id, code, status } => {
                Self::creation_succeeded(state, env, id, code, status)
            },

            WizardAction::RecordFetched { id, code, result } => {
                let record = match result {
                    Ok(record) => record,
                    Err(err) => {
                        tracing::debug!(%err, "post-creation fetch failed, using local values");
                        Self::local_record(state, env, id, code)
                    },
                };
                let mut effects = enter_confirmed(state, record, env);
                effects.push(Self::save_snapshot_effect(state, env));
                effects
            },

            WizardAction::ConflictDetected { reservation_id } => match reservation_id {
                Some(id) => {
                    let api = env.api.clone();
                    smallvec![Effect::future(async move {
                        Some(WizardAction::ReconciliationFetched {
                            result: api.active(&id).await,
                        })
                    })]
                },
                None => {
                    state.sending = false;
                    state.error = Some(messages::ACTIVE_RESERVATION_EXISTS.to_string());
                    smallvec![]
                },
            },

            WizardAction::ReconciliationFetched { result } => match result {
                Ok(record) => {
                    let mut effects = enter_confirmed(state, record, env);
                    effects.push(Self::save_snapshot_effect(state, env));
                    effects
                },
                Err(err) => {
                    tracing::warn!(%err, "active reservation could not be reconciled");
                    state.sending = false;
                    state.error = Some(messages::ACTIVE_RESERVATION_EXISTS.to_string());
                    smallvec![]
                },
            },

            WizardAction::SubmitFailed { message } => {
                state.sending = false;
                state.error = Some(message);
                smallvec![]
            },

            WizardAction::ResumptionSaved => smallvec![],

            _ => smallvec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{
        MemoryResumptionStore, MockReservationApi, RecordingAnalytics, test_environment,
    };
    use crate::state::{AreaId, ReservationType, UnitId};
    use chrono::Days;
    use reserva_testing::ReducerTest;
    use reserva_testing::mocks::test_clock_date;

    type TestReducer = SubmitReducer<
        MockReservationApi,
        MemoryResumptionStore,
        RecordingAnalytics,
        crate::attribution::StaticAttribution,
        reserva_testing::mocks::FixedClock,
    >;

    /// A state parked on step 3 with a fully valid draft.
    fn submit_ready() -> WizardState {
        let mut state = WizardState {
            step: WizardStep::IdentityForm,
            ..WizardState::default()
        };
        state.draft.unit_id = Some(UnitId::from("u1"));
        state.draft.area_id = Some(AreaId::from("a1"));
        state.draft.date = Some(test_clock_date() + Days::new(2));
        state.draft.slot = Some(crate::state::Slot::SixPm);
        state.draft.adults = 10;
        state.draft.full_name = "Ana Souza".into();
        state.draft.cpf = "12345678901".into();
        state.draft.email = "Ana@Example.com".into();
        state.draft.phone = "61999998888".into();
        state.draft.birth_date = Some(test_clock_date() - Days::new(9000));
        state
    }

    #[test]
    fn submit_with_same_day_date_rejects_without_network() {
        let mut state = submit_ready();
        state.draft.date = Some(test_clock_date());

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::Submit)
            .then_state(|s| {
                assert_eq!(s.error.as_deref(), Some(messages::ONE_DAY_AHEAD));
                assert_eq!(s.step, WizardStep::UnitDateTimePeople);
                assert!(!s.sending);
            })
            .then_effects(reserva_testing::assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn submit_with_short_party_routes_back_to_schedule() {
        let mut state = submit_ready();
        state.draft.adults = 7;
        state.draft.children = 0;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::Submit)
            .then_state(|s| {
                assert_eq!(s.error, Some(messages::min_people_to_reserve()));
                assert_eq!(s.step, WizardStep::UnitDateTimePeople);
            })
            .then_effects(reserva_testing::assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn submit_without_birth_date_marks_field_and_stays() {
        let mut state = submit_ready();
        state.draft.birth_date = None;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::Submit)
            .then_state(|s| {
                assert_eq!(s.error, None);
                assert_eq!(
                    s.birth_date_error.as_deref(),
                    Some(messages::BIRTH_DATE_REQUIRED)
                );
                assert_eq!(s.step, WizardStep::IdentityForm);
            })
            .then_effects(reserva_testing::assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn valid_submit_marks_sending_and_issues_creation() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(submit_ready())
            .when_action(WizardAction::Submit)
            .then_state(|s| {
                assert!(s.sending);
                assert_eq!(s.error, None);
            })
            .then_effects(|effects| {
                reserva_testing::assertions::assert_effects_count(effects, 1);
                reserva_testing::assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_submit_while_sending_is_ignored() {
        let mut state = submit_ready();
        state.sending = true;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::Submit)
            .then_effects(reserva_testing::assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn conflict_without_id_is_a_blocking_error() {
        let mut state = submit_ready();
        state.sending = true;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::ConflictDetected {
                reservation_id: None,
            })
            .then_state(|s| {
                assert!(!s.sending);
                assert_eq!(
                    s.error.as_deref(),
                    Some(messages::ACTIVE_RESERVATION_EXISTS)
                );
                assert_eq!(s.step, WizardStep::IdentityForm);
            })
            .then_effects(reserva_testing::assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn failed_reconciliation_keeps_step_three() {
        let mut state = submit_ready();
        state.sending = true;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::ReconciliationFetched {
                result: Err(WizardError::NotFound),
            })
            .then_state(|s| {
                assert_eq!(s.step, WizardStep::IdentityForm);
                assert_eq!(
                    s.error.as_deref(),
                    Some(messages::ACTIVE_RESERVATION_EXISTS)
                );
                assert_eq!(s.active_reservation, None);
            })
            .run();
    }

    #[test]
    fn successful_reconciliation_reaches_confirmed_with_server_identity() {
        let mut state = submit_ready();
        state.sending = true;
        let record = crate::mocks::sample_record("srv-9", "ZZTOP1");

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::ReconciliationFetched {
                result: Ok(record),
            })
            .then_state(|s| {
                assert_eq!(s.step, WizardStep::Confirmed);
                let active = s.active_reservation.as_ref();
                assert_eq!(
                    active.map(|r| r.id.as_str()),
                    Some("srv-9"),
                    "server identity wins over anything local"
                );
                assert_eq!(active.map(|r| r.code.as_str()), Some("ZZTOP1"));
                assert!(!s.sending);
            })
            .run();
    }

    #[test]
    fn birthday_choice_survives_reconciliation() {
        let mut state = submit_ready();
        state.sending = true;
        state.draft.reservation_type = ReservationType::Birthday;
        let mut record = crate::mocks::sample_record("srv-9", "ZZTOP1");
        record.reservation_type = Some(ReservationType::Company);

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::ReconciliationFetched {
                result: Ok(record),
            })
            .then_state(|s| {
                assert_eq!(s.draft.reservation_type, ReservationType::Birthday);
                assert_eq!(
                    s.active_reservation.as_ref().and_then(|r| r.reservation_type),
                    Some(ReservationType::Birthday)
                );
            })
            .run();
    }

    #[test]
    fn non_birthday_choice_defers_to_server_type() {
        let mut state = submit_ready();
        state.sending = true;
        state.draft.reservation_type = ReservationType::Personal;
        let mut record = crate::mocks::sample_record("srv-9", "ZZTOP1");
        record.reservation_type = Some(ReservationType::Company);

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::ReconciliationFetched {
                result: Ok(record),
            })
            .then_state(|s| {
                assert_eq!(s.draft.reservation_type, ReservationType::Company);
            })
            .run();
    }

    #[test]
    fn record_fetch_failure_falls_back_to_local_values() {
        let mut state = submit_ready();
        state.sending = true;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::RecordFetched {
                id: ReservationId::from("r-new"),
                code: "AB12CD".into(),
                result: Err(WizardError::Timeout),
            })
            .then_state(|s| {
                assert_eq!(s.step, WizardStep::Confirmed);
                let active = s.active_reservation.as_ref();
                assert_eq!(active.map(|r| r.id.as_str()), Some("r-new"));
                assert_eq!(active.map(|r| r.code.as_str()), Some("AB12CD"));
                assert_eq!(active.map(|r| r.people), Some(10));
                assert_eq!(
                    active.and_then(|r| r.email.as_deref()),
                    Some("ana@example.com"),
                    "email is normalized in the local fallback"
                );
            })
            .run();
    }

    #[test]
    fn cpf_and_phone_inputs_keep_digits_only() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(WizardState::default())
            .when_action(WizardAction::SetCpf {
                value: "123.456.789-01234".into(),
            })
            .when_action(WizardAction::SetPhone {
                value: "(61) 99999-8888".into(),
            })
            .then_state(|s| {
                assert_eq!(s.draft.cpf, "12345678901");
                assert_eq!(s.draft.phone, "61999998888");
            })
            .run();
    }
}
