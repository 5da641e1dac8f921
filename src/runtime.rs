//! Async driver for effect-yielding coroutines.
//!
//! [`drive`] runs any [`Coroutine`] to completion against an
//! [`EffectHandler`], awaiting each effect before resuming. [`Runtime`] is a
//! ready-made handler for the [`Effect`] vocabulary: delays sleep on the
//! tokio timer, dispatched actions are collected, and calls go to a
//! user-supplied function.
//!
//! # Example
//!
//! ```rust
//! use eddy::coroutine::{Co, CoroutineFactory, Gen};
//! use eddy::effect::{Action, Effect};
//! use eddy::retry::{decorate, RetryOptions};
//! use eddy::runtime::Runtime;
//! use futures::FutureExt;
//! use serde_json::{json, Value};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let load = |_: &()| {
//!     Gen::new(|co: Co<Effect, Value, String>| async move {
//!         match co.suspend(Effect::call("load", json!(null))).await {
//!             Ok(v) => co.suspend(Effect::put(Action::new("LOAD_SUCCESS").with_payload(v))).await?,
//!             Err(_) => co.suspend(Effect::put(Action::new("LOAD_FAILURE"))).await?,
//!         };
//!         Ok(())
//!     })
//! };
//! let retrying = decorate(load, RetryOptions::<Effect>::default()).unwrap();
//!
//! let mut failures = 1;
//! let mut runtime = Runtime::new(move |_handler: &str, _args: Value| {
//!     let outcome = if failures > 0 {
//!         failures -= 1;
//!         Err("timeout".to_string())
//!     } else {
//!         Ok(json!("data"))
//!     };
//!     async move { outcome }.boxed_local()
//! });
//!
//! runtime.run(retrying.spawn(&())).await.unwrap();
//! assert_eq!(runtime.dispatched()[0].kind(), "LOAD_SUCCESS");
//! # }
//! ```

use std::fmt;
use std::future::Future;

use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::coroutine::{Coroutine, Step};
use crate::effect::{Action, Effect};

/// Performs effects on behalf of a driven coroutine.
pub trait EffectHandler<Y> {
    /// Value the coroutine is resumed with on success.
    type Input;
    /// Error thrown into the coroutine on failure.
    type Error;

    /// Carry out `effect`.
    fn perform(&mut self, effect: Y) -> impl Future<Output = Result<Self::Input, Self::Error>>;
}

/// Run `coroutine` to completion, performing every effect with `handler`.
///
/// A failed effect is thrown back into the coroutine, which may recover.
/// The coroutine's own terminal error is returned as-is.
pub async fn drive<C, H>(coroutine: C, handler: &mut H) -> Result<C::Output, C::Error>
where
    C: Coroutine,
    H: EffectHandler<C::Effect, Input = C::Input, Error = C::Error>,
{
    let run = run_to_completion(coroutine, handler);
    #[cfg(feature = "tracing")]
    let run = tracing::Instrument::instrument(run, tracing::debug_span!("drive"));
    run.await
}

async fn run_to_completion<C, H>(mut coroutine: C, handler: &mut H) -> Result<C::Output, C::Error>
where
    C: Coroutine,
    H: EffectHandler<C::Effect, Input = C::Input, Error = C::Error>,
{
    let mut step = coroutine.start();
    #[cfg(feature = "tracing")]
    let mut steps = 0usize;

    loop {
        match step? {
            Step::Complete(output) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(steps, "coroutine completed");
                return Ok(output);
            }
            Step::Yield(effect) => {
                #[cfg(feature = "tracing")]
                {
                    steps += 1;
                }
                let outcome = handler.perform(effect).await;
                step = coroutine.resume(outcome);
            }
        }
    }
}

type CallHandler<E> = Box<dyn FnMut(&str, Value) -> LocalBoxFuture<'static, Result<Value, E>>>;

/// An [`EffectHandler`] for [`Effect`].
///
/// - `Call` invokes the call handler given to [`Runtime::new`]
/// - `Put` records the action, see [`Runtime::dispatched`]
/// - `Delay` sleeps with [`tokio::time::sleep`]
pub struct Runtime<E> {
    call: CallHandler<E>,
    dispatched: Vec<Action>,
}

impl<E> Runtime<E> {
    /// Create a runtime that answers `Call` effects with `call`.
    pub fn new<F>(call: F) -> Self
    where
        F: FnMut(&str, Value) -> LocalBoxFuture<'static, Result<Value, E>> + 'static,
    {
        Self {
            call: Box::new(call),
            dispatched: Vec::new(),
        }
    }

    /// Actions dispatched so far, in order.
    pub fn dispatched(&self) -> &[Action] {
        &self.dispatched
    }

    /// Take the dispatched actions, leaving the log empty.
    pub fn take_dispatched(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.dispatched)
    }

    /// Drive `coroutine` to completion on this runtime.
    pub async fn run<C>(&mut self, coroutine: C) -> Result<C::Output, E>
    where
        C: Coroutine<Effect = Effect, Input = Value, Error = E>,
    {
        drive(coroutine, self).await
    }
}

impl<E> EffectHandler<Effect> for Runtime<E> {
    type Input = Value;
    type Error = E;

    async fn perform(&mut self, effect: Effect) -> Result<Value, E> {
        match effect {
            Effect::Call { handler, args } => {
                #[cfg(feature = "tracing")]
                tracing::trace!(handler = %handler, "call");
                (self.call)(&handler, args).await
            }
            Effect::Put(action) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(action = action.kind(), "put");
                self.dispatched.push(action);
                Ok(Value::Null)
            }
            Effect::Delay(duration) => {
                tokio::time::sleep(duration).await;
                Ok(Value::Null)
            }
        }
    }
}

impl<E> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("dispatched", &self.dispatched)
            .finish_non_exhaustive()
    }
}
