//! Wizard environment.
//!
//! All external collaborators the reducers need, injected as traits:
//! the reservation backend, the device-local resumption store, the
//! analytics client, the attribution reader, and the clock. Production
//! wiring and test wiring differ only in the concrete types plugged in
//! here.

use crate::analytics::AnalyticsClient;
use crate::api::ReservationApi;
use crate::attribution::AttributionReader;
use crate::resumption::ResumptionStore;
use reserva_core::environment::Clock;

/// Dependencies injected into the wizard reducers.
///
/// # Type Parameters
///
/// - `A`: reservation API
/// - `S`: resumption store
/// - `N`: analytics client
/// - `R`: attribution reader
/// - `C`: clock
#[derive(Clone)]
pub struct WizardEnvironment<A, S, N, R, C>
where
    A: ReservationApi + Clone,
    S: ResumptionStore + Clone,
    N: AnalyticsClient + Clone,
    R: AttributionReader + Clone,
    C: Clock + Clone,
{
    /// Reservation backend.
    pub api: A,

    /// Device-local resumption store.
    pub resumption: S,

    /// Analytics client (explicit instance, never a global).
    pub analytics: N,

    /// Attribution reader, consulted once per submission.
    pub attribution: R,

    /// Clock; reducers never read system time directly.
    pub clock: C,
}

impl<A, S, N, R, C> WizardEnvironment<A, S, N, R, C>
where
    A: ReservationApi + Clone,
    S: ResumptionStore + Clone,
    N: AnalyticsClient + Clone,
    R: AttributionReader + Clone,
    C: Clock + Clone,
{
    /// Create a new wizard environment.
    #[must_use]
    pub const fn new(api: A, resumption: S, analytics: N, attribution: R, clock: C) -> Self {
        Self {
            api,
            resumption,
            analytics,
            attribution,
            clock,
        }
    }
}
