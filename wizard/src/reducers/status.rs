//! Status reducer: the post-confirmation check-in poll loop.
//!
//! Polls the status endpoint every five seconds starting immediately when
//! the wizard reaches the confirmed step. Only an observed check-in is
//! terminal; transient failures flip the watcher to a reconnecting state
//! and the loop keeps going.

use crate::actions::WizardAction;
use crate::analytics::{AnalyticsClient, ReservationEvent};
use crate::api::ReservationApi;
use crate::attribution::AttributionReader;
use crate::constants::{SOURCE_TAG, STATUS_POLL_INTERVAL, events};
use crate::environment::WizardEnvironment;
use crate::resumption::ResumptionStore;
use crate::state::{ReservationId, ReservationStatus, WatcherState, WizardState, WizardStep};
use reserva_core::environment::Clock;
use reserva_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Reducer for the check-in status watcher.
#[derive(Debug, Clone)]
pub struct StatusReducer<A, S, N, R, C> {
    _phantom: std::marker::PhantomData<(A, S, N, R, C)>,
}

impl<A, S, N, R, C> StatusReducer<A, S, N, R, C> {
    /// Create the status reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<A, S, N, R, C> Default for StatusReducer<A, S, N, R, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// One status poll for a reservation.
pub(crate) fn poll_effect<A>(api: A, id: ReservationId) -> Effect<WizardAction>
where
    A: ReservationApi + 'static,
{
    Effect::future(async move {
        let result = api.status(&id).await;
        Some(WizardAction::StatusReported { id, result })
    })
}

/// The next poll, five seconds out.
fn next_tick() -> Effect<WizardAction> {
    Effect::Delay {
        duration: STATUS_POLL_INTERVAL,
        action: Box::new(WizardAction::StatusTick),
    }
}

impl<A, S, N, R, C> Reducer for StatusReducer<A, S, N, R, C>
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
            WizardAction::StatusTick => {
                let watching = matches!(
                    state.watcher,
                    WatcherState::Awaiting | WatcherState::Reconnecting
                );
                if !watching || state.step != WizardStep::Confirmed {
                    return smallvec![];
                }
                match state.active_reservation.as_ref() {
                    Some(record) => {
                        smallvec![poll_effect(env.api.clone(), record.id.clone())]
                    },
                    None => smallvec![],
                }
            },

            WizardAction::StatusReported { id, result } => {
                // A poll for a reservation that is no longer the active one
                // (overwritten by a fresh booking) must not touch state.
                let current = state
                    .active_reservation
                    .as_ref()
                    .is_some_and(|record| record.id == id);
                if !current || state.watcher == WatcherState::CheckedIn {
                    return smallvec![];
                }

                match result {
                    Ok(ReservationStatus::CheckedIn) => {
                        state.watcher = WatcherState::CheckedIn;
                        if let Some(record) = state.active_reservation.as_mut() {
                            record.status = ReservationStatus::CheckedIn;
                            env.analytics.track(
                                events::RESERVATION_CHECKIN,
                                &ReservationEvent {
                                    reservation_code: record.code.clone(),
                                    full_name: record.full_name.clone().unwrap_or_default(),
                                    email: record.email.clone().unwrap_or_default(),
                                    phone: record.phone.clone().unwrap_or_default(),
                                    unit: record.unit_label.clone(),
                                    area: record.area_name.clone(),
                                    status: ReservationStatus::CheckedIn.as_str().to_string(),
                                    source: SOURCE_TAG.to_string(),
                                },
                            );
                        }
                        smallvec![]
                    },
                    Ok(ReservationStatus::AwaitingCheckin) => {
                        state.watcher = WatcherState::Awaiting;
                        smallvec![next_tick()]
                    },
                    Err(err) => {
                        // Network trouble is never terminal here.
                        tracing::debug!(%err, "status poll failed, reconnecting");
                        state.watcher = WatcherState::Reconnecting;
                        smallvec![next_tick()]
                    },
                }
            },

            _ => smallvec![],
        }
    }
}
