//! Wizard reducers.
//!
//! Pure functions `(State, Action, Environment) → (State, Effects)`,
//! split by concern and routed by [`WizardReducer`]:
//!
//! - [`SelectionReducer`] - steps 0-2: type, unit, party, date, time,
//!   area, and the availability refetch machinery
//! - [`SubmitReducer`] - step 3, the submit/reconcile protocol, and
//!   boot-time resumption
//! - [`StatusReducer`] - the post-confirmation check-in poll loop

pub mod selection;
pub mod status;
pub mod submit;

pub use selection::SelectionReducer;
pub use status::StatusReducer;
pub use submit::SubmitReducer;

use crate::actions::WizardAction;
use crate::analytics::AnalyticsClient;
use crate::api::ReservationApi;
use crate::attribution::AttributionReader;
use crate::environment::WizardEnvironment;
use crate::resumption::ResumptionStore;
use crate::state::{ReservationRecord, WatcherState, WizardState, WizardStep};
use reserva_core::environment::Clock;
use reserva_core::{SmallVec, effect::Effect, reducer::Reducer};

/// Unit display label for the current draft selection.
pub(crate) fn unit_label(state: &WizardState) -> String {
    let Some(unit_id) = state.draft.unit_id.as_ref() else {
        return String::new();
    };
    state
        .units
        .iter()
        .find(|u| &u.id == unit_id)
        .map_or_else(
            || unit_id.as_str().to_string(),
            |u| {
                if u.name.is_empty() {
                    u.slug.clone().unwrap_or_else(|| u.id.as_str().to_string())
                } else {
                    u.name.clone()
                }
            },
        )
}

/// Area display label for the current draft selection.
pub(crate) fn area_label(state: &WizardState) -> String {
    state
        .chosen_area()
        .map(|a| a.name.clone())
        .unwrap_or_default()
}

/// Transition into the confirmed step with a server record.
///
/// Shared by the fresh-success, conflict-reconciliation, and boot-time
/// resumption paths: reconciles the reservation type (client-chosen
/// birthday stays sticky), stores the record, moves to step 4, and starts
/// the check-in watcher with an immediate poll.
pub(crate) fn enter_confirmed<A, S, N, R, C>(
    state: &mut WizardState,
    mut record: ReservationRecord,
    env: &WizardEnvironment<A, S, N, R, C>,
) -> SmallVec<[Effect<WizardAction>; 4]>
where
    A: ReservationApi + Clone + Send + Sync + 'static,
    S: ResumptionStore + Clone + Send + Sync + 'static,
    N: AnalyticsClient + Clone + Send + Sync + 'static,
    R: AttributionReader + Clone + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    state.draft.reservation_type = state
        .draft
        .reservation_type
        .reconcile(record.reservation_type);
    record.reservation_type = Some(state.draft.reservation_type);

    let id = record.id.clone();
    state.active_reservation = Some(record);
    state.step = WizardStep::Confirmed;
    state.sending = false;
    state.error = None;
    state.concierge_prompt = false;
    state.watcher = WatcherState::Awaiting;

    reserva_core::smallvec![status::poll_effect(env.api.clone(), id)]
}

/// Unified wizard reducer.
///
/// Routes each action to the sub-reducer owning its slice of the flow.
#[derive(Clone)]
pub struct WizardReducer<A, S, N, R, C> {
    selection: SelectionReducer<A, S, N, R, C>,
    submit: SubmitReducer<A, S, N, R, C>,
    status: StatusReducer<A, S, N, R, C>,
}

impl<A, S, N, R, C> WizardReducer<A, S, N, R, C> {
    /// Create the unified reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            selection: SelectionReducer::new(),
            submit: SubmitReducer::new(),
            status: StatusReducer::new(),
        }
    }
}

impl<A, S, N, R, C> Default for WizardReducer<A, S, N, R, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, S, N, R, C> Reducer for WizardReducer<A, S, N, R, C>
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
            // Steps 0-2 and option lists
            WizardAction::SelectType { .. }
            | WizardAction::ContinueFromType
            | WizardAction::ContinueFromSchedule
            | WizardAction::ContinueFromArea
            | WizardAction::Back
            | WizardAction::DismissConcierge
            | WizardAction::SelectUnit { .. }
            | WizardAction::SetAdults { .. }
            | WizardAction::SetChildren { .. }
            | WizardAction::SelectDate { .. }
            | WizardAction::SelectTime { .. }
            | WizardAction::AreaMetaLoaded { .. }
            | WizardAction::AvailabilityLoaded { .. }
            | WizardAction::SelectArea { .. }
            | WizardAction::UnitsLoaded { .. } => self.selection.reduce(state, action, env),

            // Identity, submit protocol, boot/resumption
            WizardAction::Boot
            | WizardAction::ResumptionChecked { .. }
            | WizardAction::SetFullName { .. }
            | WizardAction::SetCpf { .. }
            | WizardAction::SetEmail { .. }
            | WizardAction::SetPhone { .. }
            | WizardAction::SetBirthDate { .. }
            | WizardAction::Submit
            | WizardAction::CreationSucceeded { .. }
            | WizardAction::ConflictDetected { .. }
            | WizardAction::RecordFetched { .. }
            | WizardAction::ReconciliationFetched { .. }
            | WizardAction::SubmitFailed { .. }
            | WizardAction::ResumptionSaved => self.submit.reduce(state, action, env),

            // Check-in watcher
            WizardAction::StatusTick | WizardAction::StatusReported { .. } => {
                self.status.reduce(state, action, env)
            },
        }
    }
}
