//! # Reserva Testing
//!
//! Testing utilities and helpers for the Reserva architecture.
//!
//! This crate provides:
//! - Mock implementations of core Environment traits (`FixedClock`)
//! - The fluent [`ReducerTest`] harness for Given-When-Then reducer tests
//! - Assertion helpers for effect vectors
//!
//! ## Example
//!
//! ```ignore
//! use reserva_testing::{ReducerTest, mocks::test_clock};
//!
//! ReducerTest::new(WizardReducer::new())
//!     .with_env(test_environment())
//!     .given_state(WizardState::default())
//!     .when_action(WizardAction::SelectUnit { unit_id })
//!     .then_state(|s| assert_eq!(s.draft.unit_id.as_deref(), Some("u1")))
//!     .run();
//! ```

pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use reserva_core::environment::Clock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use reserva_testing::mocks::FixedClock;
    /// use reserva_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now()); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Create a clock parked at the given RFC 3339 instant
        ///
        /// # Panics
        ///
        /// Panics if the timestamp does not parse; intended for test literals.
        #[must_use]
        #[allow(clippy::expect_used)]
        pub fn at(rfc3339: &str) -> Self {
            Self::new(
                DateTime::parse_from_rfc3339(rfc3339)
                    .expect("test timestamp should parse")
                    .with_timezone(&Utc),
            )
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-06-01 10:00:00 UTC)
    ///
    /// A mid-morning weekday instant, comfortably before the first
    /// reservation slot of the day.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at("2025-06-01T10:00:00Z")
    }

    /// The calendar date of [`test_clock`], for deriving "today",
    /// "tomorrow", and lead-time fixtures.
    #[must_use]
    pub fn test_clock_date() -> chrono::NaiveDate {
        test_clock().now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{FixedClock, test_clock};
    use reserva_core::environment::Clock;

    #[test]
    fn fixed_clock_is_deterministic() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn fixed_clock_parses_literals() {
        let clock = FixedClock::at("2025-12-24T18:30:00Z");
        assert_eq!(clock.now().to_rfc3339(), "2025-12-24T18:30:00+00:00");
    }
}
