//! Error types used by the eventvisor runtime and subscribers.
//!
//! This module defines two main error enums:
//!
//! - [`EventError`] - errors raised by the dispatch runtime itself (lifecycle).
//! - [`SubscriberError`] - errors raised by individual subscriber deliveries.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! None of them is fatal: delivery failures are logged and isolated, and a
//! drain timeout on stop is reported after the runtime has already switched
//! back to direct delivery.

use std::any::Any;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the dispatch runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EventError {
    /// `start()` was called outside of a tokio runtime.
    #[error("no tokio runtime available to host the worker pool")]
    NoRuntime,

    /// `start()` was called while asynchronous dispatch is already active.
    #[error("asynchronous dispatch already started")]
    AlreadyStarted,

    /// `stop()` was called while the executor was in direct mode.
    #[error("asynchronous dispatch not started")]
    NotStarted,

    /// Pool drain on stop exceeded its grace period; remaining work keeps running.
    #[error("drain timeout {grace:?} exceeded; {pending} task(s) still running")]
    DrainExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Pooled deliveries plus coordination rounds still outstanding when the
        /// grace period ran out.
        pending: usize,
    },
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::EventError;
    /// use std::time::Duration;
    ///
    /// let err = EventError::DrainExceeded { grace: Duration::from_secs(5), pending: 2 };
    /// assert_eq!(err.as_label(), "event_drain_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::NoRuntime => "event_no_runtime",
            EventError::AlreadyStarted => "event_already_started",
            EventError::NotStarted => "event_not_started",
            EventError::DrainExceeded { .. } => "event_drain_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EventError::DrainExceeded { grace, pending } => {
                format!("drain exceeded after {grace:?}; pending tasks={pending}")
            }
            other => other.to_string(),
        }
    }
}

/// # Errors produced by a subscriber delivery.
///
/// Returned by [`Subscribe::on_event`](crate::Subscribe::on_event), or
/// synthesized by the runtime when a subscriber panics.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    /// Subscriber reported a failure for this event.
    #[error("delivery failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Subscriber panicked while handling the event.
    #[error("subscriber panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl SubscriberError {
    /// Builds a [`SubscriberError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use eventvisor::SubscriberError;
    ///
    /// let err = SubscriberError::fail("index offline");
    /// assert_eq!(err.as_label(), "subscriber_failed");
    /// assert_eq!(err.to_string(), "delivery failed: index offline");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        SubscriberError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriberError::Fail { .. } => "subscriber_failed",
            SubscriberError::Panicked { .. } => "subscriber_panicked",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(EventError::NoRuntime.as_label(), "event_no_runtime");
        assert_eq!(EventError::AlreadyStarted.as_label(), "event_already_started");
        assert_eq!(EventError::NotStarted.as_label(), "event_not_started");
        assert_eq!(
            SubscriberError::Panicked { info: "x".into() }.as_label(),
            "subscriber_panicked"
        );
    }

    #[test]
    fn drain_message_carries_details() {
        let err = EventError::DrainExceeded {
            grace: Duration::from_millis(250),
            pending: 3,
        };
        assert_eq!(err.as_message(), "drain exceeded after 250ms; pending tasks=3");
        assert_eq!(
            err.to_string(),
            "drain timeout 250ms exceeded; 3 task(s) still running"
        );
    }

    #[test]
    fn panic_payloads_render() {
        let s: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(s.as_ref()), "static str");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
