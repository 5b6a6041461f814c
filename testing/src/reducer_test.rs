//! Given-When-Then harness for reducers.
//!
//! A reducer test seeds a state, feeds exactly one action through the reducer
//! with a test environment, and then checks the resulting state and the
//! effects the reducer asked for. Nothing is executed.

use hackops_core::{effect::Effect, reducer::Reducer};

/// Check run against the final state
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Check run against the effects of the last action
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Builder for one reducer scenario.
///
/// # Example
///
/// ```ignore
/// use hackops_testing::ReducerTest;
///
/// ReducerTest::new(BaggageReducer::new())
///     .with_env(test_environment())
///     .given_state(state_with_active_bag(bag_id))
///     .when_action(BaggageAction::CheckOut { bag_id, custodian_out })
///     .then_state(|state| {
///         assert_eq!(state.bag(bag_id).map(|b| b.status), Some(BagStatus::Removed));
///     })
///     .then_effects(|effects| assert!(effects.is_empty()))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Start a scenario for `reducer`.
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Environment passed to every `reduce` call.
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Given: the starting state.
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// When: queue an action.
    ///
    /// Actions run in the order they were added. Effect assertions see the
    /// effects of the last action only.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Then: check the final state.
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Then: check the effects.
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Reduce the queued actions, then run the checks.
    ///
    /// # Panics
    ///
    /// When the state, environment or actions are missing, or when a check
    /// fails.
    #[allow(clippy::expect_used)]
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("given_state() was not called");

        assert!(
            !self.actions.is_empty(),
            "when_action() was not called"
        );

        let env = self
            .environment
            .expect("with_env() was not called");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        self.state_assertions.into_iter().for_each(|check| check(&state));
        self.effect_assertions.into_iter().for_each(|check| check(&effects));
    }
}

/// Effect checks for [`ReducerTest::then_effects`].
pub mod assertions {
    use hackops_core::effect::Effect;

    /// Nothing to execute: no effects, or a lone `Effect::None`.
    ///
    /// # Panics
    ///
    /// Otherwise.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "expected no effects, got {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Exactly `expected` effects.
    ///
    /// # Panics
    ///
    /// On a different count.
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "expected {expected} effects, got {}",
            effects.len()
        );
    }

    /// At least one `Effect::Future`.
    ///
    /// # Panics
    ///
    /// When there is none.
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "expected a Future effect"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hackops_core::effect::Effect;
    use hackops_core::reducer::Reducer;
    use smallvec::{smallvec, SmallVec};

    /// A coat rack with a fixed number of hooks.
    #[derive(Clone, Debug)]
    struct RackState {
        hooks: u32,
        used: u32,
        rejected: u32,
    }

    #[derive(Clone, Debug)]
    enum RackAction {
        Hang,
        Take,
        Announce,
    }

    struct RackReducer;

    struct RackEnv;

    impl Reducer for RackReducer {
        type State = RackState;
        type Action = RackAction;
        type Environment = RackEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                RackAction::Hang if state.used < state.hooks => {
                    state.used += 1;
                    SmallVec::new()
                },
                RackAction::Hang => {
                    state.rejected += 1;
                    SmallVec::new()
                },
                RackAction::Take => {
                    state.used = state.used.saturating_sub(1);
                    smallvec![Effect::None]
                },
                RackAction::Announce => smallvec![Effect::future(async { None })],
            }
        }
    }

    #[test]
    fn hanging_on_a_free_hook_uses_it() {
        ReducerTest::new(RackReducer)
            .with_env(RackEnv)
            .given_state(RackState { hooks: 2, used: 0, rejected: 0 })
            .when_action(RackAction::Hang)
            .then_state(|state| {
                assert_eq!(state.used, 1);
                assert_eq!(state.rejected, 0);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn actions_run_in_order() {
        ReducerTest::new(RackReducer)
            .with_env(RackEnv)
            .given_state(RackState { hooks: 1, used: 0, rejected: 0 })
            .when_action(RackAction::Hang)
            .when_action(RackAction::Hang)
            .when_action(RackAction::Take)
            .then_state(|state| {
                assert_eq!(state.used, 0);
                assert_eq!(state.rejected, 1);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn future_effects_are_reported() {
        ReducerTest::new(RackReducer)
            .with_env(RackEnv)
            .given_state(RackState { hooks: 1, used: 0, rejected: 0 })
            .when_action(RackAction::Announce)
            .then_effects(|effects| {
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn no_effects_accepts_empty_and_single_none() {
        assertions::assert_no_effects::<RackAction>(&[Effect::None]);
        assertions::assert_no_effects::<RackAction>(&[]);
    }
}
