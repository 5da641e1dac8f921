//! Suspend/resume computations that talk to their host through effects.
//!
//! A [`Coroutine`] never performs side effects itself. It yields an effect
//! descriptor, the driver acts on it, and the coroutine is resumed with the
//! outcome: either a value or an error thrown back into it.
//!
//! ```text
//!   driver                      coroutine
//!     | ---- start() -----------> |
//!     | <--- Yield(effect) ------ |
//!     |  (performs the effect)    |
//!     | ---- resume(Ok(v)) -----> |
//!     | <--- Complete(output) --- |
//! ```
//!
//! # Writing coroutines
//!
//! Hand-written state machines implement [`Coroutine`] directly. For
//! anything longer than a couple of steps, [`Gen`] turns an `async` block
//! into a coroutine where every [`Co::suspend`] is a yield point:
//!
//! ```rust
//! use eddy::coroutine::{Co, Coroutine, Gen, Step};
//!
//! let mut co = Gen::new(|co: Co<&'static str, i32, String>| async move {
//!     let a = co.suspend("first").await?;
//!     let b = co.suspend("second").await?;
//!     Ok(a + b)
//! });
//!
//! assert_eq!(co.start(), Ok(Step::Yield("first")));
//! assert_eq!(co.resume(Ok(1)), Ok(Step::Yield("second")));
//! assert_eq!(co.resume(Ok(2)), Ok(Step::Complete(3)));
//! ```
//!
//! # Delegation
//!
//! [`Delegate`] wraps one coroutine and relays its protocol unchanged,
//! except that effects matching a stop condition are swallowed and reported
//! as [`Relay::Aborted`]. This is the building block of the retry decorator
//! in [`crate::retry`].

mod delegate;
mod factory;
mod gen;

pub use delegate::{Delegate, Relay, RetrySignal};
pub use factory::{named, CoroutineFactory, Named};
pub use gen::{Co, Gen, Suspend};

/// One step of a coroutine: either a yielded effect or its final value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<Y, T> {
    /// The coroutine is suspended on this effect.
    Yield(Y),
    /// The coroutine finished with this value.
    Complete(T),
}

impl<Y, T> Step<Y, T> {
    /// Returns true if this step is a completion.
    pub fn is_complete(&self) -> bool {
        matches!(self, Step::Complete(_))
    }

    /// The yielded effect, if the coroutine is suspended.
    pub fn effect(&self) -> Option<&Y> {
        match self {
            Step::Yield(effect) => Some(effect),
            Step::Complete(_) => None,
        }
    }
}

/// A resumable computation driven one step at a time.
///
/// The driver calls [`start`](Coroutine::start) exactly once, then
/// [`resume`](Coroutine::resume) once per yielded effect, passing `Ok` with
/// the effect's result or `Err` to throw into the coroutine. A coroutine may
/// handle a thrown error and keep going, or let it escape by returning `Err`.
///
/// Any `Err` returned from `start` or `resume` is terminal, as is
/// [`Step::Complete`]. Resuming a finished coroutine is a protocol violation;
/// implementations are allowed to panic.
///
/// Dropping a suspended coroutine cancels it. Cleanup belongs in `Drop`.
pub trait Coroutine {
    /// Effect descriptors yielded to the driver.
    type Effect;
    /// Values the driver resumes the coroutine with.
    type Input;
    /// Final value on completion.
    type Output;
    /// Errors thrown into and out of the coroutine.
    type Error;

    /// Run until the first suspension point or completion.
    fn start(&mut self) -> Result<Step<Self::Effect, Self::Output>, Self::Error>;

    /// Resume after the last yielded effect with its outcome.
    fn resume(
        &mut self,
        outcome: Result<Self::Input, Self::Error>,
    ) -> Result<Step<Self::Effect, Self::Output>, Self::Error>;
}

impl<C: Coroutine + ?Sized> Coroutine for Box<C> {
    type Effect = C::Effect;
    type Input = C::Input;
    type Output = C::Output;
    type Error = C::Error;

    fn start(&mut self) -> Result<Step<Self::Effect, Self::Output>, Self::Error> {
        (**self).start()
    }

    fn resume(
        &mut self,
        outcome: Result<Self::Input, Self::Error>,
    ) -> Result<Step<Self::Effect, Self::Output>, Self::Error> {
        (**self).resume(outcome)
    }
}
