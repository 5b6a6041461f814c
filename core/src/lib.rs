//! # HackOps Core
//!
//! Core traits and types shared by every HackOps crate.
//!
//! Business rules live in reducers: pure functions that take the current state,
//! an action and an environment of injected dependencies, mutate the state and
//! return descriptions of side effects. The application shell decides when and
//! where those effects run.
//!
//! ## Building blocks
//!
//! - **State**: what a feature knows right now (e.g. baggage occupancy)
//! - **Action**: every input a reducer accepts, commands and the events they lead to
//! - **Reducer**: `reduce(&mut state, action, &env) -> effects`, no I/O
//! - **Effect**: a value describing work for the shell, never work itself
//! - **Environment**: dependencies behind traits ([`environment::Clock`], [`notify::Notifier`])
//!
//! ## Example
//!
//! ```ignore
//! use hackops_core::*;
//!
//! impl Reducer for BaggageReducer {
//!     type State = BaggageState;
//!     type Action = BaggageAction;
//!     type Environment = BaggageEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut BaggageState,
//!         action: BaggageAction,
//!         env: &BaggageEnvironment,
//!     ) -> SmallVec<[Effect<BaggageAction>; 4]> {
//!         match action {
//!             BaggageAction::CheckOut { bag_id, custodian_out } => { /* ... */ },
//!             _ => {},
//!         }
//!         SmallVec::new()
//!     }
//! }
//! ```

pub mod notify;

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// The [`Reducer`](reducer::Reducer) trait.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Decides how an action changes state and which effects follow.
    ///
    /// Implementations must not perform I/O; anything that talks to the
    /// outside world is returned as an [`Effect`].
    pub trait Reducer {
        /// State owned by this reducer
        type State;

        /// Inputs accepted by this reducer
        type Action;

        /// Dependencies handed to every call
        type Environment;

        /// Apply `action` to `state` and return the effects to run.
        ///
        /// Validation failures are recorded on the state rather than
        /// returned, so the caller always gets a (possibly empty) effect
        /// list. Four effects are kept inline before spilling to the heap.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Side effects as values.
///
/// Reducer tests inspect these without running anything; the application
/// shell executes them.
pub mod effect {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;

    /// Work requested by a reducer.
    ///
    /// A `Future` effect may resolve to an `Action` that the shell feeds back
    /// into the reducer.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Children run concurrently
        Parallel(Vec<Effect<Action>>),

        /// Children run one after the other, in order
        Sequential(Vec<Effect<Action>>),

        /// An async task, optionally producing a follow-up action
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action: fmt::Debug> fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let (name, children) = match self {
                Self::None => return f.write_str("Effect::None"),
                Self::Future(_) => return f.write_str("Effect::Future(<future>)"),
                Self::Parallel(children) => ("Effect::Parallel", children),
                Self::Sequential(children) => ("Effect::Sequential", children),
            };
            f.debug_tuple(name).field(children).finish()
        }
    }

    impl<Action> Effect<Action> {
        /// Run `effects` concurrently.
        #[must_use]
        pub const fn merge(effects: Vec<Self>) -> Self {
            Self::Parallel(effects)
        }

        /// Run `effects` in order.
        #[must_use]
        pub const fn chain(effects: Vec<Self>) -> Self {
            Self::Sequential(effects)
        }

        /// Wrap an async computation that may feed an action back
        #[must_use]
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(future))
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Self::None => true,
                Self::Parallel(effects) | Self::Sequential(effects) => {
                    effects.iter().all(Self::is_none)
                },
                Self::Future(_) => false,
            }
        }
    }
}

/// Dependencies injected into reducers.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time.
    ///
    /// Reducers stamp records through this trait so tests can pin the time
    /// (see `hackops_testing::FixedClock`).
    pub trait Clock: Send + Sync {
        /// Current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
