//! The retry decorator: options, call-site overrides and the decorated factory.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::machine::{Retrying, Settings};
use super::{Backoff, ConfigError};
use crate::coroutine::{Coroutine, CoroutineFactory};
use crate::effect::{Action, HostEffect};
use crate::predicate::{action_type_matches, Condition, Predicate, DEFAULT_FAILURE_PATTERN};

/// Retry bound used when neither the options nor the call override it.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Which yielded effects abort the current attempt.
#[derive(Clone)]
pub enum StopCondition<Y> {
    /// Emit effects whose action type matches this regex. Compiled by
    /// [`decorate`], which rejects invalid patterns.
    Pattern(String),
    /// Any predicate over effects.
    Predicate(Condition<Y>),
}

impl<Y> fmt::Debug for StopCondition<Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Configuration for [`decorate`].
///
/// | option | default |
/// |---|---|
/// | backoff | [`Backoff::default`] (400ms, doubling) |
/// | condition | action type matches `_FAILURE$` |
/// | max attempts | 3 |
/// | debug | off |
///
/// # Examples
///
/// ```rust
/// use eddy::effect::Effect;
/// use eddy::retry::{Backoff, RetryOptions};
/// use std::time::Duration;
///
/// let options = RetryOptions::<Effect>::default()
///     .with_backoff(Backoff::linear(Duration::from_millis(400)))
///     .with_max_attempts(4)
///     .with_debug(true);
///
/// assert_eq!(options.max_attempts(), 4);
/// assert!(options.debug());
/// ```
#[derive(Debug, Clone)]
pub struct RetryOptions<Y> {
    backoff: Backoff,
    condition: StopCondition<Y>,
    max_attempts: u32,
    debug: bool,
}

impl<Y> Default for RetryOptions<Y> {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            condition: StopCondition::Pattern(DEFAULT_FAILURE_PATTERN.to_string()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            debug: false,
        }
    }
}

impl<Y> RetryOptions<Y> {
    /// Options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backoff policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Stop on emitted actions whose type matches `pattern`.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.condition = StopCondition::Pattern(pattern.into());
        self
    }

    /// Stop on effects satisfying `predicate`.
    pub fn with_condition<P>(mut self, predicate: P) -> Self
    where
        P: Predicate<Y> + 'static,
    {
        self.condition = StopCondition::Predicate(Condition::new(predicate));
        self
    }

    /// Set the default number of retries after the first attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Emit an instrumentation action after every backoff wait.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Get the backoff policy.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Get the stop condition.
    pub fn condition(&self) -> &StopCondition<Y> {
        &self.condition
    }

    /// Get the default retry bound.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether debug instrumentation is on.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Check the options without decorating anything.
    ///
    /// [`decorate`] performs the same check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backoff.validate()?;
        match &self.condition {
            StopCondition::Pattern(pattern) => action_type_matches(pattern)
                .map(drop)
                .map_err(|source| ConfigError::invalid_pattern(pattern, source)),
            StopCondition::Predicate(_) => Ok(()),
        }
    }
}

/// Call arguments that may carry a per-call retry bound.
///
/// The convention is a numeric `retries` field in the metadata of the last
/// positional argument. Tuples defer to their last element and slices to
/// their last item. Types without metadata implement the trait with the
/// default method.
///
/// Whole-number floats such as `2.0` count as numeric. Fractional or
/// non-numeric values are ignored. A negative override is clamped to zero:
/// one attempt, no interception.
///
/// ```rust
/// use eddy::effect::Action;
/// use eddy::retry::RetryArgs;
/// use serde_json::json;
///
/// let action = Action::new("LOAD").with_meta(json!({ "retries": 5 }));
/// assert_eq!(action.retries_override(), Some(5));
/// assert_eq!(("tenant-1", action).retries_override(), Some(5));
/// assert_eq!(().retries_override(), None);
/// ```
pub trait RetryArgs {
    /// The raw override, if the arguments carry one.
    fn retries_override(&self) -> Option<i64> {
        None
    }
}

impl RetryArgs for () {}

/// Integer value of a JSON `retries` field. Float casts saturate.
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| n as i64)
    })
}

impl RetryArgs for Action {
    fn retries_override(&self) -> Option<i64> {
        self.meta().get("retries").and_then(whole_number)
    }
}

impl RetryArgs for Value {
    fn retries_override(&self) -> Option<i64> {
        self.pointer("/meta/retries").and_then(whole_number)
    }
}

impl<T: RetryArgs> RetryArgs for Vec<T> {
    fn retries_override(&self) -> Option<i64> {
        self.last().and_then(RetryArgs::retries_override)
    }
}

impl<T: RetryArgs> RetryArgs for Box<T> {
    fn retries_override(&self) -> Option<i64> {
        (**self).retries_override()
    }
}

impl<A: RetryArgs> RetryArgs for (A,) {
    fn retries_override(&self) -> Option<i64> {
        self.0.retries_override()
    }
}

impl<A, B: RetryArgs> RetryArgs for (A, B) {
    fn retries_override(&self) -> Option<i64> {
        self.1.retries_override()
    }
}

impl<A, B, C: RetryArgs> RetryArgs for (A, B, C) {
    fn retries_override(&self) -> Option<i64> {
        self.2.retries_override()
    }
}

impl<A, B, C, D: RetryArgs> RetryArgs for (A, B, C, D) {
    fn retries_override(&self) -> Option<i64> {
        self.3.retries_override()
    }
}

/// Wrap `factory` so every invocation retries with backoff.
///
/// The returned [`Retry`] is itself a [`CoroutineFactory`] with the same
/// call signature. Each invocation runs the wrapped coroutine; whenever it
/// yields an effect matching the stop condition, that attempt is dropped,
/// a delay effect is yielded, and a fresh coroutine is spawned from the same
/// arguments. The last attempt runs with interception disabled, so its real
/// outcome is what the caller sees.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPattern`] if the stop condition pattern
/// does not compile, and [`ConfigError::InvalidBackoff`] if the backoff
/// policy fails [`Backoff::validate`].
///
/// # Example
///
/// ```rust
/// use eddy::coroutine::{Co, Coroutine, CoroutineFactory, Gen, Step};
/// use eddy::effect::{Action, Effect};
/// use eddy::retry::{decorate, RetryOptions};
/// use std::time::Duration;
///
/// let load = |_: &()| {
///     Gen::new(|co: Co<Effect, (), String>| async move {
///         co.suspend(Effect::put(Action::new("LOAD_FAILURE"))).await?;
///         Ok("gave up")
///     })
/// };
///
/// let retrying = decorate(load, RetryOptions::<Effect>::default().with_max_attempts(1)).unwrap();
/// let mut co = retrying.spawn(&());
///
/// // The failure is intercepted and turned into a backoff wait
/// assert_eq!(co.start(), Ok(Step::Yield(Effect::delay(Duration::from_millis(400)))));
/// // The final attempt is not intercepted
/// assert_eq!(
///     co.resume(Ok(())),
///     Ok(Step::Yield(Effect::put(Action::new("LOAD_FAILURE"))))
/// );
/// assert_eq!(co.resume(Ok(())), Ok(Step::Complete("gave up")));
/// ```
pub fn decorate<F, Y>(factory: F, options: RetryOptions<Y>) -> Result<Retry<F, Y>, ConfigError>
where
    Y: HostEffect + 'static,
{
    let RetryOptions {
        backoff,
        condition,
        max_attempts,
        debug,
    } = options;

    backoff.validate()?;
    let condition = match condition {
        StopCondition::Pattern(pattern) => {
            let matcher = action_type_matches(&pattern)
                .map_err(|source| ConfigError::invalid_pattern(&pattern, source))?;
            Condition::new(matcher)
        }
        StopCondition::Predicate(condition) => condition,
    };

    Ok(Retry {
        factory: Arc::new(factory),
        settings: Arc::new(Settings {
            backoff,
            condition,
            max_attempts,
            debug,
        }),
    })
}

/// A decorated coroutine factory. Created by [`decorate`].
///
/// Holds only immutable, shared configuration: cloning is cheap and
/// invocations never affect each other.
pub struct Retry<F, Y> {
    factory: Arc<F>,
    settings: Arc<Settings<Y>>,
}

impl<F, Y> Retry<F, Y> {
    /// The configured default retry bound.
    pub fn max_attempts(&self) -> u32 {
        self.settings.max_attempts
    }

    /// The wrapped factory.
    pub fn inner(&self) -> &F {
        &self.factory
    }

    /// Retry bound for one call: the override carried by `args`, if any,
    /// else the configured default.
    pub fn resolve_max_attempts<A: RetryArgs>(&self, args: &A) -> u32 {
        match args.retries_override() {
            None => self.settings.max_attempts,
            Some(n) if n < 0 => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    requested = n,
                    "negative retry override clamped to zero"
                );
                0
            }
            Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
        }
    }
}

impl<F, Y> Clone for Retry<F, Y> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<F, Y> fmt::Debug for Retry<F, Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("max_attempts", &self.settings.max_attempts)
            .field("backoff", &self.settings.backoff)
            .field("debug", &self.settings.debug)
            .finish_non_exhaustive()
    }
}

impl<A, F, Y> CoroutineFactory<A> for Retry<F, Y>
where
    A: RetryArgs + Clone,
    F: CoroutineFactory<A>,
    F::Coroutine: Coroutine<Effect = Y>,
    Y: HostEffect,
{
    type Coroutine = Retrying<F, A>;

    fn spawn(&self, args: &A) -> Self::Coroutine {
        let max = self.resolve_max_attempts(args);
        let coroutine = Retrying::new(
            Arc::clone(&self.factory),
            Arc::clone(&self.settings),
            args.clone(),
            max,
        );
        #[cfg(feature = "tracing")]
        let coroutine = coroutine.instrument(tracing::debug_span!(
            "retry",
            name = %CoroutineFactory::<A>::name(self),
            max
        ));
        coroutine
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("retry({})", self.factory.name()))
    }
}
