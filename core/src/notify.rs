//! Notification sender abstraction.
//!
//! The [`Notifier`] trait is the boundary to whatever delivers messages to
//! people (Slack, email, a log line in development). Delivery is best-effort:
//! callers run notifications after the state change they describe has been
//! committed and never roll that change back when delivery fails.
//!
//! ```text
//! ┌─────────────┐
//! │   Command   │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────────┐
//! │    Reducer      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ 1. Persist      │◄─── Source of truth
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ 2. Notify       │◄─── Fire-and-forget
//! └─────────────────┘
//! ```
//!
//! # Implementations
//!
//! - `RecordingNotifier` (in `hackops-testing`) - captures messages for assertions
//! - `LogNotifier` / `SlackNotifier` (in `hackops`) - development and production senders
//!
//! # Example
//!
//! ```rust,ignore
//! use hackops_core::notify::Notifier;
//!
//! async fn example(notifier: &dyn Notifier) {
//!     if let Err(error) = notifier.notify("owner-id", "Your bag is ready".to_string()).await {
//!         tracing::warn!(%error, "notification dropped");
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur while delivering a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The recipient could not be resolved by the transport
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    /// Network or transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service rejected the message
    #[error("Rejected with status {status}: {reason}")]
    Rejected {
        /// Status code reported by the remote service
        status: u16,
        /// Body or reason returned by the remote service
        reason: String,
    },
}

/// Future returned by [`Notifier::notify`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Best-effort message delivery to an identity.
///
/// The recipient is an opaque identity reference; the core never inspects it.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so that it can be injected as `Arc<dyn Notifier>` and captured by effects.
pub trait Notifier: Send + Sync {
    /// Deliver `message` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the transport fails. Callers log and drop it.
    fn notify(&self, recipient: &str, message: String) -> NotifyFuture<'_>;
}
