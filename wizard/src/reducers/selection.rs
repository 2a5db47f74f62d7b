//! Selection reducer: steps 0-2.
//!
//! Owns the type/unit/party/date/time/area selections and the
//! availability machinery. Every change to the (unit, date, time) tuple
//! bumps a generation counter and re-issues the availability query;
//! responses carry the generation they were issued under and anything
//! stale is dropped on arrival - last tuple wins, not last response.

use crate::actions::WizardAction;
use crate::analytics::AnalyticsClient;
use crate::api::ReservationApi;
use crate::attribution::AttributionReader;
use crate::constants::messages;
use crate::environment::WizardEnvironment;
use crate::resumption::ResumptionStore;
use crate::state::{
    AreaAvailability, AreaMeta, AvailabilityKey, Slot, UnitId, WizardState, WizardStep,
};
use crate::validation;
use chrono::Days;
use reserva_core::environment::Clock;
use reserva_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Reducer for the selection half of the wizard (steps 0-2).
#[derive(Debug, Clone)]
pub struct SelectionReducer<A, S, N, R, C> {
    _phantom: std::marker::PhantomData<(A, S, N, R, C)>,
}

impl<A, S, N, R, C> SelectionReducer<A, S, N, R, C> {
    /// Create the selection reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<A, S, N, R, C> Default for SelectionReducer<A, S, N, R, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// The metadata-only projection shown while date or time is missing:
/// area cards with descriptions and photos, but no numeric availability.
fn meta_projection(meta: &[AreaMeta]) -> Vec<AreaAvailability> {
    meta.iter()
        .map(|m| AreaAvailability {
            id: m.id.clone(),
            name: m.name.clone(),
            description: m.description.clone(),
            photo_url: m.photo_url.clone(),
            icon_emoji: m.icon_emoji.clone(),
            capacity: None,
            remaining: None,
            is_available: None,
        })
        .collect()
}

/// Fill descriptive gaps in an availability set from cached metadata.
///
/// The availability endpoint may omit descriptions, photos, and icons;
/// the metadata fetched per unit supplies them, matched by id.
fn enrich_from_meta(areas: &mut [AreaAvailability], meta: &[AreaMeta]) {
    for area in areas {
        let Some(m) = meta.iter().find(|m| m.id == area.id) else {
            continue;
        };
        if area.name.is_empty() {
            area.name.clone_from(&m.name);
        }
        if area.description.is_empty() {
            area.description.clone_from(&m.description);
        }
        if area.photo_url.is_none() {
            area.photo_url.clone_from(&m.photo_url);
        }
        if area.icon_emoji.is_none() {
            area.icon_emoji.clone_from(&m.icon_emoji);
        }
    }
}

/// Re-validate the chosen area against the current availability set:
/// keep it while it still seats the party, otherwise move to the first
/// area that does, otherwise clear the choice.
fn reconcile_area_choice(state: &mut WizardState) {
    let need = state.draft.people();
    let still_fits = state.chosen_area().is_some_and(|a| a.fits(need));
    if !still_fits {
        state.draft.area_id = state
            .areas
            .iter()
            .find(|a| a.fits(need))
            .map(|a| a.id.clone());
    }
}

/// Keep the chosen area only if it is still part of the (metadata-only)
/// set; membership is all that can be checked without numbers.
fn retain_area_membership(state: &mut WizardState) {
    let known = state
        .chosen_area()
        .is_some();
    if !known {
        state.draft.area_id = None;
    }
}

impl<A, S, N, R, C> SelectionReducer<A, S, N, R, C>
where
    A: ReservationApi + Clone + Send + Sync + 'static,
    S: ResumptionStore + Clone + Send + Sync + 'static,
    N: AnalyticsClient + Clone + Send + Sync + 'static,
    R: AttributionReader + Clone + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    /// Fetch date/time-independent area metadata for a unit.
    fn area_meta_effect(
        env: &WizardEnvironment<A, S, N, R, C>,
        unit_id: UnitId,
    ) -> Effect<WizardAction> {
        let api = env.api.clone();
        let probe_date = env.clock.now().date_naive() + Days::new(1);
        Effect::future(async move {
            let result = api.area_meta(&unit_id, probe_date).await;
            Some(WizardAction::AreaMetaLoaded { unit_id, result })
        })
    }

    /// React to a (unit, date, time) tuple change.
    ///
    /// With the full tuple present, bump the generation and query; with a
    /// partial tuple, fall back to the metadata projection synchronously.
    fn refresh_areas(
        state: &mut WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        let Some(unit_id) = state.draft.unit_id.clone() else {
            state.areas = Vec::new();
            state.draft.area_id = None;
            state.areas_loading = false;
            state.areas_error = None;
            return smallvec![];
        };

        match (state.draft.date, state.draft.slot) {
            (Some(date), Some(slot)) => {
                state.availability_generation += 1;
                let generation = state.availability_generation;
                state.areas_loading = true;
                state.areas_error = None;

                let key = AvailabilityKey {
                    unit_id: unit_id.clone(),
                    date,
                    slot,
                };
                let api = env.api.clone();
                smallvec![Effect::future(async move {
                    let result = api.availability(&key.unit_id, key.date, key.slot).await;
                    Some(WizardAction::AvailabilityLoaded {
                        key,
                        generation,
                        result,
                    })
                })]
            },
            _ => {
                state.areas = meta_projection(&state.area_meta);
                state.areas_loading = false;
                state.areas_error = None;
                retain_area_membership(state);
                smallvec![]
            },
        }
    }

    fn select_unit(
        state: &mut WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
        unit_id: UnitId,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        state.draft.unit_id = Some(unit_id.clone());
        // Unit change invalidates the chosen time and the cached metadata.
        state.draft.slot = None;
        state.time_error = None;
        state.past_error = None;
        state.area_meta = Vec::new();

        match state.units.iter().find(|u| u.id == unit_id) {
            Some(unit) => env.analytics.set_active_unit_from(unit),
            None => {
                env.analytics.set_active_unit(unit_id.as_str());
            },
        }

        let mut effects = Self::refresh_areas(state, env);
        effects.push(Self::area_meta_effect(env, unit_id));
        effects
    }

    fn select_date(
        state: &mut WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
        date: Option<chrono::NaiveDate>,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        state.draft.date = date;
        // Date change invalidates the chosen time.
        state.draft.slot = None;
        state.time_error = None;
        state.past_error = None;

        state.date_error = date.and_then(|d| {
            let now = env.clock.now();
            if validation::is_same_day_as_today(d, now) {
                Some(messages::ONE_DAY_AHEAD.to_string())
            } else if validation::is_before_tomorrow(d, now) {
                Some(messages::DATE_FROM_TOMORROW.to_string())
            } else {
                None
            }
        });

        Self::refresh_areas(state, env)
    }

    fn select_time(
        state: &mut WizardState,
        env: &WizardEnvironment<A, S, N, R, C>,
        time: &str,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        if time.is_empty() {
            state.draft.slot = None;
            state.time_error = None;
            state.past_error = None;
            return Self::refresh_areas(state, env);
        }

        match Slot::parse(time) {
            Some(slot) => {
                state.draft.slot = Some(slot);
                state.time_error = None;
                state.past_error = state.draft.date.and_then(|date| {
                    validation::is_past_selection(date, slot, env.clock.now())
                        .then(|| messages::TIME_IN_PAST.to_string())
                });
            },
            None => {
                state.draft.slot = None;
                state.time_error = Some(messages::INVALID_SLOT.to_string());
                state.past_error = None;
            },
        }

        Self::refresh_areas(state, env)
    }

    fn availability_loaded(
        state: &mut WizardState,
        key: &AvailabilityKey,
        generation: u64,
        result: crate::error::Result<Vec<AreaAvailability>>,
    ) -> SmallVec<[Effect<WizardAction>; 4]> {
        if generation != state.availability_generation {
            tracing::debug!(
                generation,
                current = state.availability_generation,
                unit = %key.unit_id,
                "dropping stale availability response"
            );
            return smallvec![];
        }

        state.areas_loading = false;
        match result {
            Ok(mut areas) => {
                enrich_from_meta(&mut areas, &state.area_meta);
                state.areas = areas;
                state.areas_error = None;
                reconcile_area_choice(state);
            },
            Err(err) => {
                state.areas_error = Some(err.user_message(messages::AVAILABILITY_FAILED));
                state.areas = Vec::new();
                state.draft.area_id = None;
            },
        }
        smallvec![]
    }

    fn continue_from_schedule(state: &mut WizardState, env: &WizardEnvironment<A, S, N, R, C>) {
        state.error = None;

        if state.draft.people() < crate::constants::MIN_PEOPLE {
            state.error = Some(messages::min_people_to_reserve());
            return;
        }
        if let Some(date) = state.draft.date {
            if validation::is_same_day_as_today(date, env.clock.now()) {
                state.error = Some(messages::ONE_DAY_AHEAD.to_string());
                return;
            }
        }
        if state.needs_concierge() {
            state.concierge_prompt = true;
            return;
        }
        if state.can_continue_schedule() {
            state.step = WizardStep::AreaSelection;
        }
    }
}

impl<A, S, N, R, C> Reducer for SelectionReducer<A, S, N, R, C>
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
            WizardAction::SelectType { reservation_type } => {
                state.draft.reservation_type = reservation_type;
                smallvec![]
            },

            WizardAction::ContinueFromType => {
                if state.step == WizardStep::TypeSelection {
                    state.step = WizardStep::UnitDateTimePeople;
                }
                smallvec![]
            },

            WizardAction::ContinueFromSchedule => {
                if state.step == WizardStep::UnitDateTimePeople {
                    Self::continue_from_schedule(state, env);
                }
                smallvec![]
            },

            WizardAction::ContinueFromArea => {
                if state.step == WizardStep::AreaSelection && state.can_continue_area() {
                    state.step = WizardStep::IdentityForm;
                }
                smallvec![]
            },

            WizardAction::Back => {
                if !state.sending {
                    state.step = state.step.previous();
                    state.error = None;
                }
                smallvec![]
            },

            WizardAction::DismissConcierge => {
                state.concierge_prompt = false;
                smallvec![]
            },

            WizardAction::UnitsLoaded { result } => {
                state.units_loading = false;
                match result {
                    Ok(units) => {
                        state.units = units;
                        state.units_error = None;
                    },
                    Err(err) => {
                        state.units_error = Some(err.user_message(messages::UNITS_FAILED));
                        state.units = Vec::new();
                        state.draft.unit_id = None;
                    },
                }
                smallvec![]
            },

            WizardAction::SelectUnit { unit_id } => Self::select_unit(state, env, unit_id),

            WizardAction::SetAdults { count } => {
                state.draft.adults = count;
                if state.draft.date.is_some() && state.draft.slot.is_some() {
                    reconcile_area_choice(state);
                }
                smallvec![]
            },

            WizardAction::SetChildren { count } => {
                state.draft.children = count;
                if state.draft.date.is_some() && state.draft.slot.is_some() {
                    reconcile_area_choice(state);
                }
                smallvec![]
            },

            WizardAction::SelectDate { date } => Self::select_date(state, env, date),

            WizardAction::SelectTime { time } => Self::select_time(state, env, &time),

            WizardAction::AreaMetaLoaded { unit_id, result } => {
                if state.draft.unit_id.as_ref() != Some(&unit_id) {
                    tracing::debug!(unit = %unit_id, "dropping stale area metadata");
                    return smallvec![];
                }
                match result {
                    Ok(meta) => {
                        state.area_meta = meta;
                        if state.draft.date.is_none() || state.draft.slot.is_none() {
                            state.areas = meta_projection(&state.area_meta);
                            retain_area_membership(state);
                        } else {
                            let meta = std::mem::take(&mut state.area_meta);
                            enrich_from_meta(&mut state.areas, &meta);
                            state.area_meta = meta;
                        }
                    },
                    Err(err) => {
                        tracing::warn!(%err, unit = %unit_id, "area metadata fetch failed");
                        state.area_meta = Vec::new();
                    },
                }
                smallvec![]
            },

            WizardAction::AvailabilityLoaded {
                key,
                generation,
                result,
            } => Self::availability_loaded(state, &key, generation, result),

            WizardAction::SelectArea { area_id } => {
                let need = state.draft.people();
                let selectable = state
                    .areas
                    .iter()
                    .find(|a| a.id == area_id)
                    .is_some_and(|a| a.fits(need));
                if selectable {
                    state.draft.area_id = Some(area_id);
                }
                smallvec![]
            },

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
    use crate::state::{AreaId, ReservationType, UnitOption};
    use reserva_testing::ReducerTest;

    type TestReducer = SelectionReducer<
        MockReservationApi,
        MemoryResumptionStore,
        RecordingAnalytics,
        crate::attribution::StaticAttribution,
        reserva_testing::mocks::FixedClock,
    >;

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

    /// A state parked on step 1 with everything chosen and valid.
    fn schedule_ready() -> WizardState {
        let mut state = WizardState {
            step: WizardStep::UnitDateTimePeople,
            ..WizardState::default()
        };
        state.units = vec![UnitOption {
            id: UnitId::from("u1"),
            name: "Harbor Hall".into(),
            slug: None,
        }];
        state.draft.unit_id = Some(UnitId::from("u1"));
        state.draft.date = Some(
            reserva_testing::mocks::test_clock_date() + Days::new(2),
        );
        state.draft.slot = Some(Slot::SixPm);
        state
    }

    #[test]
    fn step1_gating_requires_minimum_people() {
        let mut state = schedule_ready();
        state.draft.adults = 7;
        state.draft.children = 0;
        assert!(!state.can_continue_schedule());

        state.draft.adults = 8;
        assert!(state.can_continue_schedule());
    }

    #[test]
    fn step2_gating_requires_capacity_for_the_party() {
        let mut state = schedule_ready();
        state.draft.adults = 8;
        state.areas = vec![area("salon", 5)];
        state.draft.area_id = Some(AreaId::from("salon"));
        assert!(!state.can_continue_area());

        state.areas = vec![area("salon", 8)];
        assert!(state.can_continue_area());
    }

    #[test]
    fn continue_blocks_oversized_party_with_concierge() {
        let mut state = schedule_ready();
        state.draft.adults = 41;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::ContinueFromSchedule)
            .then_state(|s| {
                assert!(s.concierge_prompt);
                assert_eq!(s.step, WizardStep::UnitDateTimePeople);
                assert_eq!(s.error, None);
            })
            .run();
    }

    #[test]
    fn continue_advances_when_everything_holds() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(schedule_ready())
            .when_action(WizardAction::ContinueFromSchedule)
            .then_state(|s| assert_eq!(s.step, WizardStep::AreaSelection))
            .run();
    }

    #[test]
    fn unit_change_clears_time_and_issues_fetches() {
        let mut state = schedule_ready();
        state.draft.slot = Some(Slot::SixPm);

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::SelectUnit {
                unit_id: UnitId::from("u2"),
            })
            .then_state(|s| {
                assert_eq!(s.draft.unit_id, Some(UnitId::from("u2")));
                assert_eq!(s.draft.slot, None);
                // date + missing slot → metadata projection, no spinner
                assert!(!s.areas_loading);
            })
            .then_effects(|effects| {
                // one metadata fetch; no availability fetch without a slot
                reserva_testing::assertions::assert_effects_count(effects, 1);
                reserva_testing::assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn full_tuple_bumps_generation_and_fetches() {
        let mut state = schedule_ready();
        state.draft.slot = None;
        let before = state.availability_generation;

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::SelectTime {
                time: "18:00".into(),
            })
            .then_state(move |s| {
                assert_eq!(s.availability_generation, before + 1);
                assert!(s.areas_loading);
            })
            .then_effects(reserva_testing::assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn invalid_time_sets_slot_error() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(schedule_ready())
            .when_action(WizardAction::SelectTime {
                time: "19:45".into(),
            })
            .then_state(|s| {
                assert_eq!(s.draft.slot, None);
                assert_eq!(s.time_error.as_deref(), Some(messages::INVALID_SLOT));
                assert!(!s.can_continue_schedule());
            })
            .run();
    }

    #[test]
    fn same_day_date_raises_lead_time_error() {
        let mut state = schedule_ready();
        state.draft.slot = None;
        let today = reserva_testing::mocks::test_clock_date();

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::SelectDate { date: Some(today) })
            .then_state(|s| {
                assert_eq!(s.date_error.as_deref(), Some(messages::ONE_DAY_AHEAD));
                assert!(!s.can_continue_schedule());
            })
            .run();
    }

    #[test]
    fn stale_availability_response_is_dropped() {
        let mut state = schedule_ready();
        state.availability_generation = 7;
        state.areas = vec![area("current", 20)];
        state.draft.area_id = Some(AreaId::from("current"));

        let stale_key = AvailabilityKey {
            unit_id: UnitId::from("u0"),
            date: reserva_testing::mocks::test_clock_date() + Days::new(1),
            slot: Slot::Noon,
        };

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::AvailabilityLoaded {
                key: stale_key,
                generation: 6,
                result: Ok(vec![area("stale", 3)]),
            })
            .then_state(|s| {
                assert_eq!(s.areas.len(), 1);
                assert_eq!(s.areas[0].id, AreaId::from("current"));
                assert_eq!(s.draft.area_id, Some(AreaId::from("current")));
            })
            .run();
    }

    #[test]
    fn current_generation_response_applies_and_reconciles_choice() {
        let mut state = schedule_ready();
        state.availability_generation = 3;
        state.draft.adults = 10;
        state.draft.area_id = Some(AreaId::from("small"));

        let key = AvailabilityKey {
            unit_id: UnitId::from("u1"),
            date: reserva_testing::mocks::test_clock_date() + Days::new(2),
            slot: Slot::SixPm,
        };

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::AvailabilityLoaded {
                key,
                generation: 3,
                result: Ok(vec![area("small", 4), area("big", 24)]),
            })
            .then_state(|s| {
                // the undersized choice moved to the first fitting area
                assert_eq!(s.draft.area_id, Some(AreaId::from("big")));
                assert!(!s.areas_loading);
            })
            .run();
    }

    #[test]
    fn selecting_a_full_area_is_ignored() {
        let mut state = schedule_ready();
        state.draft.adults = 10;
        state.areas = vec![area("small", 4), area("big", 24)];

        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(state)
            .when_action(WizardAction::SelectArea {
                area_id: AreaId::from("small"),
            })
            .then_state(|s| assert_eq!(s.draft.area_id, None))
            .run();
    }

    #[test]
    fn reservation_type_selection_is_recorded() {
        ReducerTest::new(TestReducer::new())
            .with_env(test_environment())
            .given_state(WizardState::default())
            .when_action(WizardAction::SelectType {
                reservation_type: ReservationType::Birthday,
            })
            .then_state(|s| {
                assert_eq!(s.draft.reservation_type, ReservationType::Birthday);
            })
            .run();
    }
}
