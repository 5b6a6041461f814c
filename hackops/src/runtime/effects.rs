//! Effect execution.
//!
//! Reducers return [`Effect`] descriptions; the [`EffectRunner`] runs them on
//! the tokio runtime after the service has committed the state change. Effects
//! are fire-and-forget: the caller never waits for them and a failing effect
//! only logs.
//!
//! - `Future`: spawned as its own task
//! - `Parallel`: every child executed independently
//! - `Sequential`: one task running the children in order, each to completion
//!
//! Actions fed back by a completed future are logged and dropped; the baggage
//! flow has no effect that produces one.
//!
//! The runner counts in-flight tasks so shutdown can [`drain`](EffectRunner::drain)
//! them before the process exits.

use futures::future::join_all;
use hackops_core::effect::Effect;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when the task ends, panics included.
struct PendingGuard(Arc<Pending>);

impl PendingGuard {
    fn acquire(pending: &Arc<Pending>) -> Self {
        pending.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(pending))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Spawns reducer effects and tracks the ones still running.
///
/// Clones share the same in-flight count.
#[derive(Debug, Clone, Default)]
pub struct EffectRunner {
    pending: Arc<Pending>,
}

impl EffectRunner {
    /// Creates a new runner with nothing in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute every effect in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<A>(&self, effects: impl IntoIterator<Item = Effect<A>>)
    where
        A: Debug + Send + 'static,
    {
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute<A>(&self, effect: Effect<A>)
    where
        A: Debug + Send + 'static,
    {
        match effect {
            Effect::None => {},
            Effect::Future(fut) => {
                metrics::counter!("hackops_effects_executed_total", "type" => "future").increment(1);
                let guard = PendingGuard::acquire(&self.pending);
                tokio::spawn(async move {
                    let _guard = guard;
                    feedback(fut.await);
                });
            },
            Effect::Parallel(effects) => {
                for effect in effects {
                    self.execute(effect);
                }
            },
            Effect::Sequential(effects) => {
                metrics::counter!("hackops_effects_executed_total", "type" => "sequential")
                    .increment(1);
                let guard = PendingGuard::acquire(&self.pending);
                tokio::spawn(async move {
                    let _guard = guard;
                    for effect in effects {
                        run_inline(effect).await;
                    }
                });
            },
        }
    }

    /// Number of effect tasks still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Wait until every spawned effect has finished, at most `timeout`.
    ///
    /// Returns `false` if effects were still running when the time ran out.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let idle = self.pending.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                idle.await;
            }
        };

        if tokio::time::timeout(timeout, wait).await.is_ok() {
            true
        } else {
            tracing::warn!(in_flight = self.in_flight(), "Effects still running at shutdown");
            false
        }
    }
}

/// Run an effect to completion on the current task.
fn run_inline<A>(effect: Effect<A>) -> Pin<Box<dyn Future<Output = ()> + Send>>
where
    A: Debug + Send + 'static,
{
    Box::pin(async move {
        match effect {
            Effect::None => {},
            Effect::Future(fut) => feedback(fut.await),
            Effect::Parallel(effects) => {
                join_all(effects.into_iter().map(run_inline)).await;
            },
            Effect::Sequential(effects) => {
                for effect in effects {
                    run_inline(effect).await;
                }
            },
        }
    })
}

fn feedback<A: Debug>(action: Option<A>) {
    if let Some(action) = action {
        tracing::debug!(?action, "Effect produced an action with no consumer");
    }
}
