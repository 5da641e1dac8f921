//! Testing utilities for coroutines and decorated factories.
//!
//! [`Recorder`] is a synchronous driver: it answers every yielded effect with
//! a scripted response, never sleeps, and records the full effect sequence
//! so tests can assert on what a coroutine asked the runtime to do.
//!
//! # Examples
//!
//! ## Recording effects
//!
//! ```rust
//! use eddy::coroutine::{Co, Gen};
//! use eddy::effect::{Action, Effect};
//! use eddy::testing::Recorder;
//! use serde_json::{json, Value};
//!
//! let saga = Gen::new(|co: Co<Effect, Value, String>| async move {
//!     let user = co.suspend(Effect::call("fetch_user", json!(7))).await?;
//!     co.suspend(Effect::put(Action::new("USER_LOADED").with_payload(user))).await?;
//!     Ok(())
//! });
//!
//! let mut recorder = Recorder::new(|effect: &Effect| match effect {
//!     Effect::Call { .. } => Ok(json!({ "name": "Ada" })),
//!     _ => Ok(Value::Null),
//! });
//! let recording = recorder.run(saga);
//!
//! assert_eq!(recording.calls("fetch_user"), 1);
//! assert_eq!(recording.action_types(), vec!["USER_LOADED"]);
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use eddy::testing::Recording;
//! use eddy::{assert_completed, assert_failed};
//!
//! let ok: Recording<(), _, String> = Recording::new(vec![], Ok(42));
//! assert_completed!(ok, 42);
//!
//! let failed: Recording<(), i32, _> = Recording::new(vec![], Err("boom".to_string()));
//! assert_failed!(failed, "boom".to_string());
//! ```

use std::fmt;
use std::time::Duration;

use crate::coroutine::{Coroutine, Step};
use crate::effect::{Action, Effect};

/// Default upper bound on effects per run, guarding against runaway loops.
pub const DEFAULT_STEP_LIMIT: usize = 10_000;

type Responder<Y, I, E> = Box<dyn FnMut(&Y) -> Result<I, E>>;

/// A synchronous, scripted driver for coroutines.
pub struct Recorder<Y, I, E> {
    responder: Responder<Y, I, E>,
    step_limit: usize,
}

impl<Y, I, E> Recorder<Y, I, E> {
    /// Answer every effect with `responder`.
    ///
    /// `Ok` resumes the coroutine with a value, `Err` throws into it.
    pub fn new<R>(responder: R) -> Self
    where
        R: FnMut(&Y) -> Result<I, E> + 'static,
    {
        Self {
            responder: Box::new(responder),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Change the maximum number of effects a run may yield.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Drive `coroutine` to completion, recording every yielded effect.
    ///
    /// # Panics
    ///
    /// Panics if the coroutine yields more effects than the step limit.
    pub fn run<C>(&mut self, mut coroutine: C) -> Recording<Y, C::Output, E>
    where
        C: Coroutine<Effect = Y, Input = I, Error = E>,
    {
        let mut effects = Vec::new();
        let mut step = coroutine.start();

        loop {
            match step {
                Err(error) => return Recording::new(effects, Err(error)),
                Ok(Step::Complete(value)) => return Recording::new(effects, Ok(value)),
                Ok(Step::Yield(effect)) => {
                    assert!(
                        effects.len() < self.step_limit,
                        "coroutine exceeded the step limit of {}",
                        self.step_limit
                    );
                    let response = (self.responder)(&effect);
                    effects.push(effect);
                    step = coroutine.resume(response);
                }
            }
        }
    }
}

impl<Y, I, E> fmt::Debug for Recorder<Y, I, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("step_limit", &self.step_limit)
            .finish_non_exhaustive()
    }
}

/// Everything a coroutine yielded during one run, plus how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording<Y, T, E> {
    /// Yielded effects, in order.
    pub effects: Vec<Y>,
    /// Final value or escaped error.
    pub outcome: Result<T, E>,
}

impl<Y, T, E> Recording<Y, T, E> {
    /// Assemble a recording.
    pub fn new(effects: Vec<Y>, outcome: Result<T, E>) -> Self {
        Self { effects, outcome }
    }

    /// Returns true if the coroutine completed.
    pub fn is_completed(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl<T, E> Recording<Effect, T, E> {
    /// Durations of every delay effect, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Delay(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    /// Every dispatched action, in order.
    pub fn actions(&self) -> Vec<&Action> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Put(action) => Some(action),
                _ => None,
            })
            .collect()
    }

    /// Types of every dispatched action, in order.
    pub fn action_types(&self) -> Vec<&str> {
        self.actions().into_iter().map(Action::kind).collect()
    }

    /// How many times `handler` was invoked.
    pub fn calls(&self, handler: &str) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Call { handler: h, .. } if h == handler))
            .count()
    }
}

/// Assert that a recording completed, optionally with a specific value.
///
/// This macro will panic if the coroutine ended with an error.
#[macro_export]
macro_rules! assert_completed {
    ($recording:expr) => {
        match &$recording.outcome {
            Ok(_) => {}
            Err(e) => panic!("Expected completion, got error: {:?}", e),
        }
    };
    ($recording:expr, $expected:expr) => {
        match &$recording.outcome {
            Ok(value) => assert_eq!(value, &$expected),
            Err(e) => panic!("Expected completion, got error: {:?}", e),
        }
    };
}

/// Assert that a recording ended with an error, optionally a specific one.
///
/// This macro will panic if the coroutine completed.
#[macro_export]
macro_rules! assert_failed {
    ($recording:expr) => {
        match &$recording.outcome {
            Err(_) => {}
            Ok(v) => panic!("Expected error, got completion: {:?}", v),
        }
    };
    ($recording:expr, $expected:expr) => {
        match &$recording.outcome {
            Err(error) => assert_eq!(error, &$expected),
            Ok(v) => panic!("Expected error, got completion: {:?}", v),
        }
    };
}
