//! The attempt/backoff state machine behind a decorated coroutine.

use std::fmt;
use std::sync::Arc;

use super::Backoff;
use crate::coroutine::{Coroutine, CoroutineFactory, Delegate, Relay, RetrySignal, Step};
use crate::effect::{retry_notice, HostEffect};
use crate::predicate::{Condition, Never, Predicate};

/// Immutable configuration shared by every invocation of a decorated factory.
pub(crate) struct Settings<Y> {
    pub(crate) backoff: Backoff,
    pub(crate) condition: Condition<Y>,
    pub(crate) max_attempts: u32,
    pub(crate) debug: bool,
}

/// Stop predicate for one attempt: the configured condition while retries
/// remain, [`Never`] on the last attempt.
enum Gate<Y> {
    Armed(Condition<Y>),
    Disarmed(Never),
}

impl<Y> Predicate<Y> for Gate<Y> {
    #[inline]
    fn check(&self, effect: &Y) -> bool {
        match self {
            Gate::Armed(condition) => condition.check(effect),
            Gate::Disarmed(never) => never.check(effect),
        }
    }
}

type EffectOf<F, A> = <<F as CoroutineFactory<A>>::Coroutine as Coroutine>::Effect;
type InputOf<F, A> = <<F as CoroutineFactory<A>>::Coroutine as Coroutine>::Input;
type OutputOf<F, A> = <<F as CoroutineFactory<A>>::Coroutine as Coroutine>::Output;
type ErrorOf<F, A> = <<F as CoroutineFactory<A>>::Coroutine as Coroutine>::Error;
type StepOf<F, A> = Step<EffectOf<F, A>, OutputOf<F, A>>;

enum Phase<C: Coroutine> {
    /// Spawned, not started.
    Ready,
    /// An attempt is suspended on a forwarded effect.
    Running(Delegate<C, Gate<C::Effect>>),
    /// Suspended on the backoff delay effect.
    Backoff(RetrySignal<C::Effect>),
    /// Suspended on the debug instrumentation effect.
    Notify,
    /// Completed or failed.
    Done,
}

impl<C: Coroutine> Phase<C> {
    fn label(&self) -> &'static str {
        match self {
            Phase::Ready => "ready",
            Phase::Running(_) => "running",
            Phase::Backoff(_) => "backoff",
            Phase::Notify => "notify",
            Phase::Done => "done",
        }
    }
}

/// A decorated coroutine: one invocation of a [`Retry`](super::Retry).
///
/// Relays the active attempt's effects and resumption values unchanged.
/// When the attempt yields a stop effect, the attempt is dropped, a delay
/// effect is yielded, and once the driver resumes it a fresh attempt is
/// spawned from the original arguments. Attempts run with indices
/// `0..=max`; the last one cannot be intercepted.
///
/// Dropping a `Retrying` drops the active attempt, running its cleanup.
///
/// # Panics
///
/// `start` panics if called twice, and `resume` panics if called before
/// `start` or after completion.
pub struct Retrying<F, A>
where
    F: CoroutineFactory<A>,
{
    factory: Arc<F>,
    settings: Arc<Settings<EffectOf<F, A>>>,
    args: A,
    max: u32,
    attempt: u32,
    phase: Phase<F::Coroutine>,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<F, A> Retrying<F, A>
where
    F: CoroutineFactory<A>,
    EffectOf<F, A>: HostEffect,
{
    pub(crate) fn new(
        factory: Arc<F>,
        settings: Arc<Settings<EffectOf<F, A>>>,
        args: A,
        max: u32,
    ) -> Self {
        Self {
            factory,
            settings,
            args,
            max,
            attempt: 0,
            phase: Phase::Ready,
            #[cfg(feature = "tracing")]
            span: tracing::Span::none(),
        }
    }

    #[cfg(feature = "tracing")]
    pub(crate) fn instrument(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Index of the current attempt (0-based).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Retry bound for this invocation.
    pub fn max_attempts(&self) -> u32 {
        self.max
    }

    fn begin_attempt(&mut self) -> Result<StepOf<F, A>, ErrorOf<F, A>> {
        let gate = if self.attempt < self.max {
            Gate::Armed(self.settings.condition.clone())
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt = self.attempt, "final attempt, stop condition disabled");
            Gate::Disarmed(Never)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(attempt = self.attempt, max = self.max, "starting attempt");

        let mut delegate = Delegate::new(self.factory.spawn(&self.args), gate);
        let relay = delegate.start();
        self.settle(delegate, relay)
    }

    fn settle(
        &mut self,
        delegate: Delegate<F::Coroutine, Gate<EffectOf<F, A>>>,
        relay: Result<Relay<EffectOf<F, A>, OutputOf<F, A>>, ErrorOf<F, A>>,
    ) -> Result<StepOf<F, A>, ErrorOf<F, A>> {
        match relay {
            Ok(Relay::Forward(effect)) => {
                self.phase = Phase::Running(delegate);
                Ok(Step::Yield(effect))
            }
            Ok(Relay::Completed(value)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt = self.attempt, "attempt completed");
                self.phase = Phase::Done;
                Ok(Step::Complete(value))
            }
            Ok(Relay::Aborted(signal)) => {
                // The intercepted attempt is abandoned, not resumed.
                drop(delegate);
                let delay = self.settings.backoff.delay(self.attempt);
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    attempt = self.attempt,
                    delay_ms = delay.as_millis() as u64,
                    action = signal.effect().emitted_action().map(|a| a.kind()),
                    "stop condition matched, backing off"
                );
                self.phase = Phase::Backoff(signal);
                Ok(Step::Yield(<EffectOf<F, A> as HostEffect>::delay(delay)))
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt = self.attempt, "attempt failed, not retrying");
                self.phase = Phase::Done;
                Err(error)
            }
        }
    }

    fn after_backoff(
        &mut self,
        signal: RetrySignal<EffectOf<F, A>>,
    ) -> Result<StepOf<F, A>, ErrorOf<F, A>> {
        self.attempt += 1;

        if self.settings.debug {
            let original = signal.effect().emitted_action().map(|a| a.kind());
            let notice = retry_notice(original, self.attempt);
            self.phase = Phase::Notify;
            return Ok(Step::Yield(<EffectOf<F, A> as HostEffect>::emit(notice)));
        }

        self.begin_attempt()
    }
}

impl<F, A> Coroutine for Retrying<F, A>
where
    F: CoroutineFactory<A>,
    EffectOf<F, A>: HostEffect,
{
    type Effect = EffectOf<F, A>;
    type Input = InputOf<F, A>;
    type Output = OutputOf<F, A>;
    type Error = ErrorOf<F, A>;

    fn start(&mut self) -> Result<StepOf<F, A>, ErrorOf<F, A>> {
        #[cfg(feature = "tracing")]
        let _span = self.span.clone().entered();

        assert!(
            matches!(self.phase, Phase::Ready),
            "retrying coroutine started twice"
        );
        self.begin_attempt()
    }

    fn resume(
        &mut self,
        outcome: Result<InputOf<F, A>, ErrorOf<F, A>>,
    ) -> Result<StepOf<F, A>, ErrorOf<F, A>> {
        #[cfg(feature = "tracing")]
        let _span = self.span.clone().entered();

        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Running(mut delegate) => {
                let relay = delegate.resume(outcome);
                self.settle(delegate, relay)
            }
            Phase::Backoff(signal) => {
                // An error thrown into the wait cancels the whole invocation.
                outcome?;
                self.after_backoff(signal)
            }
            Phase::Notify => {
                outcome?;
                self.begin_attempt()
            }
            phase @ (Phase::Ready | Phase::Done) => {
                panic!("retrying coroutine resumed while {}", phase.label())
            }
        }
    }
}

impl<F, A> fmt::Debug for Retrying<F, A>
where
    F: CoroutineFactory<A>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("attempt", &self.attempt)
            .field("max", &self.max)
            .field("phase", &self.phase.label())
            .finish_non_exhaustive()
    }
}
