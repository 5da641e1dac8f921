//! Transparent delegation with early abort.

use std::fmt;

use super::{Coroutine, Step};
use crate::predicate::Predicate;

/// Marker produced when a yielded effect satisfies the stop condition.
///
/// Carries the intercepted effect so the retry loop can report what caused
/// the restart. It is never surfaced from a decorated coroutine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySignal<Y> {
    effect: Y,
}

impl<Y> RetrySignal<Y> {
    /// Create a signal for the intercepted effect.
    pub fn new(effect: Y) -> Self {
        Self { effect }
    }

    /// The effect that triggered the abort.
    pub fn effect(&self) -> &Y {
        &self.effect
    }

    /// Extract the intercepted effect.
    pub fn into_effect(self) -> Y {
        self.effect
    }
}

impl<Y: fmt::Debug> fmt::Display for RetrySignal<Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stop condition matched yielded effect {:?}", self.effect)
    }
}

/// What a [`Delegate`] hands back to its caller after each step.
///
/// Application failures are not a variant: they travel as the `Err` side of
/// the surrounding `Result`, so an abort can never be confused with one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relay<Y, T> {
    /// Effect to pass on to the driver; resume the delegate with its outcome.
    Forward(Y),
    /// The coroutine completed with this value.
    Completed(T),
    /// The stop condition matched. The coroutine was left suspended and
    /// must not be resumed again.
    Aborted(RetrySignal<Y>),
}

/// Drives one coroutine on behalf of a caller, intercepting stop effects.
///
/// Every yielded effect is checked against the stop predicate exactly once,
/// before it is forwarded. A match turns into [`Relay::Aborted`] and the
/// effect is never forwarded; everything else, including errors raised by
/// the coroutine, passes through untouched.
///
/// # Example
///
/// ```rust
/// use eddy::coroutine::{Co, Delegate, Gen, Relay};
///
/// let inner = Gen::new(|co: Co<&'static str, (), String>| async move {
///     co.suspend("fetch").await?;
///     co.suspend("FETCH_FAILURE").await?;
///     Ok(())
/// });
///
/// let mut delegate = Delegate::new(inner, |e: &&str| e.ends_with("_FAILURE"));
///
/// assert_eq!(delegate.start(), Ok(Relay::Forward("fetch")));
/// match delegate.resume(Ok(())) {
///     Ok(Relay::Aborted(signal)) => assert_eq!(*signal.effect(), "FETCH_FAILURE"),
///     other => panic!("expected abort, got {:?}", other),
/// }
/// ```
pub struct Delegate<C, P> {
    inner: C,
    stop: P,
}

impl<C, P> Delegate<C, P>
where
    C: Coroutine,
    P: Predicate<C::Effect>,
{
    /// Wrap `inner`, aborting on the first effect matching `stop`.
    pub fn new(inner: C, stop: P) -> Self {
        Self { inner, stop }
    }

    /// Request the first step of the wrapped coroutine.
    pub fn start(&mut self) -> Result<Relay<C::Effect, C::Output>, C::Error> {
        let step = self.inner.start()?;
        Ok(self.inspect(step))
    }

    /// Feed the caller's response to the last forwarded effect back in.
    pub fn resume(
        &mut self,
        outcome: Result<C::Input, C::Error>,
    ) -> Result<Relay<C::Effect, C::Output>, C::Error> {
        let step = self.inner.resume(outcome)?;
        Ok(self.inspect(step))
    }

    /// Give back the wrapped coroutine.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn inspect(&self, step: Step<C::Effect, C::Output>) -> Relay<C::Effect, C::Output> {
        match step {
            Step::Complete(value) => Relay::Completed(value),
            Step::Yield(effect) if self.stop.check(&effect) => {
                Relay::Aborted(RetrySignal::new(effect))
            }
            Step::Yield(effect) => Relay::Forward(effect),
        }
    }
}

impl<C: fmt::Debug, P> fmt::Debug for Delegate<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
