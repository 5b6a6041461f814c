//! # HackOps Testing
//!
//! Testing utilities and helpers for HackOps.
//!
//! This crate provides:
//! - Mock implementations of Environment traits ([`FixedClock`], [`RecordingNotifier`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use hackops_testing::{test_clock, RecordingNotifier, ReducerTest};
//!
//! ReducerTest::new(BaggageReducer::new())
//!     .with_env(BaggageEnvironment::new(Arc::new(test_clock()), Arc::new(RecordingNotifier::new())))
//!     .given_state(state)
//!     .when_action(BaggageAction::CheckOut { bag_id, custodian_out })
//!     .then_state(|state| assert!(state.last_error.is_none()))
//!     .run();
//! ```

pub mod reducer_test;

use chrono::{DateTime, Utc};
use hackops_core::environment::Clock;

/// Test doubles for the environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use hackops_core::notify::{Notifier, NotifyError, NotifyFuture};
    use std::sync::{Arc, Mutex, PoisonError};

    /// A clock that never moves.
    ///
    /// # Example
    ///
    /// ```
    /// use hackops_testing::mocks::FixedClock;
    /// use hackops_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Clock stopped at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock stopped at 2025-01-01T00:00:00Z.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }

    /// A message captured by [`RecordingNotifier`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentNotification {
        /// Identity the message was addressed to
        pub recipient: String,
        /// Message body
        pub message: String,
    }

    /// Notifier that records every message instead of delivering it.
    ///
    /// Clones share the same buffer, so a test can hand one clone to the
    /// environment and inspect the other.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<SentNotification>>>,
        fail_with: Option<NotifyError>,
    }

    impl RecordingNotifier {
        /// Create a notifier that accepts every message
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a notifier that records messages but reports `error` for each
        #[must_use]
        pub fn failing(error: NotifyError) -> Self {
            Self {
                sent: Arc::default(),
                fail_with: Some(error),
            }
        }

        /// Messages recorded so far, in delivery order
        #[must_use]
        pub fn sent(&self) -> Vec<SentNotification> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of messages recorded so far
        #[must_use]
        pub fn len(&self) -> usize {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Whether nothing has been recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, recipient: &str, message: String) -> NotifyFuture<'_> {
            let recipient = recipient.to_string();
            Box::pin(async move {
                self.sent
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(SentNotification { recipient, message });
                match &self.fail_with {
                    Some(error) => Err(error.clone()),
                    None => Ok(()),
                }
            })
        }
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, RecordingNotifier, SentNotification};
pub use reducer_test::{assertions, ReducerTest};
