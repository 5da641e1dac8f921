//! Retry-with-backoff for effect-yielding coroutines.
//!
//! [`decorate`] wraps a [`CoroutineFactory`](crate::coroutine::CoroutineFactory)
//! so that each invocation behaves exactly like the undecorated one, except
//! that a yielded effect matching the stop condition abandons the current
//! attempt, yields a backoff delay, and starts over with a fresh coroutine.
//!
//! - **Pure Core**: [`Backoff`] and the stop condition are data and
//!   predicates; nothing here sleeps or performs I/O
//! - **Transparent**: on success, and on the final attempt, the caller sees
//!   precisely the effects and outcome of the wrapped coroutine
//! - **Bounded**: the last attempt runs with interception disabled, so the
//!   retry loop always terminates with the real outcome
//!
//! # Quick Start
//!
//! ```rust
//! use eddy::coroutine::{Co, CoroutineFactory, Gen};
//! use eddy::effect::{Action, Effect};
//! use eddy::retry::{decorate, RetryOptions};
//! use eddy::testing::Recorder;
//! use serde_json::{json, Value};
//! use std::time::Duration;
//!
//! // A coroutine reporting failure through an emitted action
//! let fetch = |action: &Action| {
//!     let id = action.payload()["id"].clone();
//!     Gen::new(move |co: Co<Effect, Value, String>| async move {
//!         match co.suspend(Effect::call("fetch_user", id)).await {
//!             Ok(user) => co.suspend(Effect::put(Action::new("USER_SUCCESS").with_payload(user))).await?,
//!             Err(e) => co.suspend(Effect::put(Action::new("USER_FAILURE").with_payload(json!(e)))).await?,
//!         };
//!         Ok(())
//!     })
//! };
//!
//! let retrying = decorate(fetch, RetryOptions::<Effect>::default()).unwrap();
//!
//! // The API fails every time
//! let mut recorder = Recorder::new(|effect: &Effect| match effect {
//!     Effect::Call { .. } => Err("503".to_string()),
//!     _ => Ok(Value::Null),
//! });
//! let recording = recorder.run(retrying.spawn(&Action::new("USER_REQUEST").with_payload(json!({ "id": 1 }))));
//!
//! assert_eq!(
//!     recording.delays(),
//!     vec![Duration::from_millis(400), Duration::from_millis(800), Duration::from_millis(1600)]
//! );
//! assert_eq!(recording.calls("fetch_user"), 4);
//! // Only the final attempt's failure is dispatched
//! assert_eq!(recording.action_types(), vec!["USER_FAILURE"]);
//! ```
//!
//! # Per-call overrides
//!
//! Arguments implementing [`RetryArgs`] can carry their own retry bound,
//! conventionally `meta.retries` on the last argument. The override applies
//! to that invocation only.
//!
//! # Error Types
//!
//! - [`ConfigError`]: Returned by [`decorate`] for malformed options
//!
//! Exhausting the retries is not an error of its own: the final attempt's
//! outcome, success or failure, is what the caller gets.

mod decorator;
mod error;
mod machine;
mod policy;

pub use decorator::{
    decorate, Retry, RetryArgs, RetryOptions, StopCondition, DEFAULT_MAX_ATTEMPTS,
};
pub use error::ConfigError;
pub use machine::Retrying;
pub use policy::{exponential_growth, linear_growth, Backoff, BackoffStrategy};

#[cfg(test)]
mod tests;
