//! # Reserva Wizard
//!
//! The reservation flow engine: a five-step wizard state machine over a
//! REST reservation backend, with availability querying, defensive
//! validation, conflict reconciliation, device-local resumption, a
//! boarding-pass projection, and a check-in status watcher.
//!
//! ## Architecture
//!
//! The wizard is implemented as reducers and effects:
//!
//! ```text
//! Action → Reducer → (State, Effects) → Effect Execution → More Actions
//! ```
//!
//! State transitions are pure and synchronous; every network call, storage
//! access, and timer is an [`reserva_core::effect::Effect`] executed by the
//! `reserva-runtime` store. External collaborators (API, resumption store,
//! analytics, attribution, clock) are injected through
//! [`WizardEnvironment`].
//!
//! ## Example: driving the wizard
//!
//! ```rust,ignore
//! use reserva_runtime::Store;
//! use reserva_wizard::*;
//!
//! let store = Store::new(
//!     WizardState::default(),
//!     WizardReducer::new(),
//!     production_environment(),
//! );
//!
//! store.send(WizardAction::Boot).await?;
//! store.send(WizardAction::SelectUnit { unit_id }).await?;
//! // ... selections, identity, then:
//! store.send(WizardAction::Submit).await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod analytics;
pub mod api;
pub mod attribution;
pub mod boarding_pass;
pub mod constants;
pub mod environment;
pub mod error;
pub mod lookup;
pub mod reducers;
pub mod resumption;
pub mod state;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::WizardAction;
pub use analytics::{AnalyticsClient, PixelAnalytics, ReservationEvent};
pub use api::{ApiConfig, HttpReservationApi, ReservationApi};
pub use attribution::{AttributionReader, PageAttribution, StaticAttribution};
pub use boarding_pass::BoardingPass;
pub use environment::WizardEnvironment;
pub use error::{Result, WizardError};
pub use reducers::WizardReducer;
pub use resumption::{FileResumptionStore, LocalResumptionRecord, ResumptionStore};
pub use state::{
    AreaAvailability, AreaId, AreaMeta, ReservationDraft, ReservationId, ReservationRecord,
    ReservationStatus, ReservationType, Slot, UnitId, UnitOption, WizardState, WizardStep,
};
