//! # Eddy
//!
//! > *"An eddy turns the current back on itself"*
//!
//! Retry-with-backoff for effect-yielding coroutines.
//!
//! ## Philosophy
//!
//! **Eddy** keeps the retry loop on the **pure** side of the
//! pure core / imperative shell line:
//! - Coroutines never sleep or perform I/O; they *yield* effect descriptors
//! - The retry decorator only reorders and inserts descriptors: it abandons
//!   an attempt on a failure effect, yields a *delay* effect, and starts over
//! - The host runtime (see [`runtime`]) is the only place anything happens
//!
//! The whole retry schedule can therefore be asserted synchronously with
//! [`testing::Recorder`], without a clock.
//!
//! ## Quick Example
//!
//! ```rust
//! use eddy::prelude::*;
//! use serde_json::{json, Value};
//! use std::time::Duration;
//!
//! // A saga reporting failure through a `*_FAILURE` action
//! let save = |_: &()| {
//!     Gen::new(|co: Co<Effect, Value, String>| async move {
//!         match co.suspend(Effect::call("save", json!({}))).await {
//!             Ok(_) => co.suspend(Effect::put(Action::new("SAVE_SUCCESS"))).await?,
//!             Err(_) => co.suspend(Effect::put(Action::new("SAVE_FAILURE"))).await?,
//!         };
//!         Ok(())
//!     })
//! };
//!
//! let save = decorate(save, RetryOptions::<Effect>::default().with_max_attempts(2)).unwrap();
//!
//! // The first call fails, the second succeeds
//! let mut calls = 0;
//! let mut recorder = Recorder::new(move |effect: &Effect| match effect {
//!     Effect::Call { .. } => {
//!         calls += 1;
//!         if calls == 1 { Err("busy".to_string()) } else { Ok(Value::Null) }
//!     }
//!     _ => Ok(Value::Null),
//! });
//!
//! let recording = recorder.run(save.spawn(&()));
//! assert_eq!(recording.delays(), vec![Duration::from_millis(400)]);
//! assert_eq!(recording.action_types(), vec!["SAVE_SUCCESS"]);
//! ```
//!
//! ## Modules
//!
//! - [`coroutine`]: the suspend/resume protocol, `async` adapters, delegation
//! - [`effect`]: the effect vocabulary and the [`HostEffect`] seam
//! - [`predicate`]: stop conditions and their combinators
//! - [`retry`]: backoff policies and the decorator itself
//! - [`runtime`]: a tokio driver (feature `async`)
//! - [`testing`]: a synchronous recording driver and assertion macros

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod coroutine;
pub mod effect;
pub mod predicate;
pub mod retry;
#[cfg(feature = "async")]
pub mod runtime;
pub mod testing;

// Re-exports
pub use coroutine::{Co, Coroutine, CoroutineFactory, Gen, Step};
pub use effect::{Action, Effect, HostEffect};
pub use predicate::{Predicate, PredicateExt};
pub use retry::{decorate, Backoff, ConfigError, Retry, RetryOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coroutine::{named, Co, Coroutine, CoroutineFactory, Gen, Step};
    pub use crate::effect::{Action, Effect, HostEffect};
    pub use crate::predicate::{action_type_matches, Predicate, PredicateExt};
    pub use crate::retry::{decorate, Backoff, RetryArgs, RetryOptions, StopCondition};
    #[cfg(feature = "async")]
    pub use crate::runtime::{drive, EffectHandler, Runtime};
    pub use crate::testing::{Recorder, Recording};
}
