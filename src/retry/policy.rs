//! Backoff policies: attempt index to wait duration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::ConfigError;

/// Exponential growth in milliseconds: `200 * 2^(attempt + 1)`.
///
/// Produces 400, 800, 1600, 3200, ... and saturates instead of overflowing.
///
/// ```rust
/// use eddy::retry::exponential_growth;
///
/// assert_eq!(exponential_growth(0), 400);
/// assert_eq!(exponential_growth(3), 3200);
/// ```
pub fn exponential_growth(attempt: u32) -> u64 {
    200u64.saturating_mul(2u64.saturating_pow(attempt.saturating_add(1)))
}

/// Linear growth in milliseconds: `400 * (attempt + 1)`.
///
/// Produces 400, 800, 1200, 1600, ...
///
/// ```rust
/// use eddy::retry::linear_growth;
///
/// assert_eq!(linear_growth(0), 400);
/// assert_eq!(linear_growth(3), 1600);
/// ```
pub fn linear_growth(attempt: u32) -> u64 {
    400u64.saturating_mul(u64::from(attempt) + 1)
}

type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// How long to wait before the next attempt.
///
/// Policies are pure data: they compute delays but never wait. The retry
/// state machine turns each delay into a yielded delay effect, and the host
/// runtime does the waiting.
///
/// # Examples
///
/// ```rust
/// use eddy::retry::Backoff;
/// use std::time::Duration;
///
/// // The default: 400ms, 800ms, 1600ms, ...
/// let backoff = Backoff::default();
/// assert_eq!(backoff.delay(2), Duration::from_millis(1600));
///
/// // Linear growth capped at one second
/// let backoff = Backoff::linear(Duration::from_millis(400))
///     .with_max_delay(Duration::from_secs(1));
/// assert_eq!(backoff.delay(1), Duration::from_millis(800));
/// assert_eq!(backoff.delay(5), Duration::from_secs(1));
/// ```
#[derive(Clone, PartialEq)]
pub struct Backoff {
    strategy: BackoffStrategy,
    max_delay: Option<Duration>,
}

/// The growth curve of a [`Backoff`].
#[derive(Clone)]
pub enum BackoffStrategy {
    /// Fixed delay between attempts.
    Constant(Duration),
    /// Delay increases linearly: base * (attempt + 1).
    Linear {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay doubles: base * 2^attempt.
    Exponential {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay follows Fibonacci sequence: fib(attempt + 1) * base.
    Fibonacci {
        /// Base delay duration.
        base: Duration,
    },
    /// Caller supplied function. Must be pure.
    Custom(DelayFn),
}

impl PartialEq for BackoffStrategy {
    fn eq(&self, other: &Self) -> bool {
        use BackoffStrategy::*;
        match (self, other) {
            (Constant(a), Constant(b)) => a == b,
            (Linear { base: a }, Linear { base: b }) => a == b,
            (Exponential { base: a }, Exponential { base: b }) => a == b,
            (Fibonacci { base: a }, Fibonacci { base: b }) => a == b,
            (Custom(a), Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(d) => f.debug_tuple("Constant").field(d).finish(),
            Self::Linear { base } => f.debug_struct("Linear").field("base", base).finish(),
            Self::Exponential { base } => {
                f.debug_struct("Exponential").field("base", base).finish()
            }
            Self::Fibonacci { base } => f.debug_struct("Fibonacci").field("base", base).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("strategy", &self.strategy)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl Default for Backoff {
    /// Exponential growth from 400ms, matching [`exponential_growth`].
    fn default() -> Self {
        Self::exponential(Duration::from_millis(400))
    }
}

impl Backoff {
    fn with_strategy(strategy: BackoffStrategy) -> Self {
        Self {
            strategy,
            max_delay: None,
        }
    }

    /// Same delay before every retry.
    pub fn constant(delay: Duration) -> Self {
        Self::with_strategy(BackoffStrategy::Constant(delay))
    }

    /// Delay = base * (attempt + 1).
    ///
    /// With a 400ms base this is [`linear_growth`].
    pub fn linear(base: Duration) -> Self {
        Self::with_strategy(BackoffStrategy::Linear { base })
    }

    /// Delay = base * 2^attempt, saturating at [`Duration::MAX`].
    ///
    /// With a 400ms base this is [`exponential_growth`] for as long as that
    /// fits in `u64` milliseconds (attempts 0 through 55).
    pub fn exponential(base: Duration) -> Self {
        Self::with_strategy(BackoffStrategy::Exponential { base })
    }

    /// Delay = base * fib(attempt + 1): 1, 1, 2, 3, 5, ... times base.
    pub fn fibonacci(base: Duration) -> Self {
        Self::with_strategy(BackoffStrategy::Fibonacci { base })
    }

    /// Use an arbitrary function of the attempt index.
    ///
    /// ```rust
    /// use eddy::retry::Backoff;
    /// use std::time::Duration;
    ///
    /// let backoff = Backoff::from_fn(|attempt| Duration::from_millis(10 + u64::from(attempt)));
    /// assert_eq!(backoff.delay(5), Duration::from_millis(15));
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self::with_strategy(BackoffStrategy::Custom(Arc::new(f)))
    }

    /// Use a function returning whole milliseconds, such as
    /// [`exponential_growth`] or [`linear_growth`].
    pub fn from_millis_fn<F>(f: F) -> Self
    where
        F: Fn(u32) -> u64 + Send + Sync + 'static,
    {
        Self::from_fn(move |attempt| Duration::from_millis(f(attempt)))
    }

    /// Cap every delay at `max`.
    pub fn with_max_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Get the backoff strategy.
    pub fn strategy(&self) -> &BackoffStrategy {
        &self.strategy
    }

    /// Check that the policy can produce a usable schedule.
    ///
    /// A zero `max_delay` is rejected: it silently flattens every strategy
    /// to no wait at all. Ask for that with `Backoff::constant(Duration::ZERO)`.
    ///
    /// ```rust
    /// use eddy::retry::Backoff;
    /// use std::time::Duration;
    ///
    /// assert!(Backoff::default().validate().is_ok());
    /// assert!(Backoff::default().with_max_delay(Duration::ZERO).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_delay == Some(Duration::ZERO) {
            Err(ConfigError::InvalidBackoff {
                reason: "max_delay must be positive",
            })
        } else {
            Ok(())
        }
    }

    /// The wait before the retry that follows attempt `attempt` (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_delay = match &self.strategy {
            BackoffStrategy::Constant(d) => *d,
            BackoffStrategy::Linear { base } => {
                base.saturating_mul(attempt.saturating_add(1))
            }
            BackoffStrategy::Exponential { base } => doubled(*base, attempt),
            BackoffStrategy::Fibonacci { base } => {
                base.saturating_mul(fibonacci(attempt.saturating_add(1)))
            }
            BackoffStrategy::Custom(f) => f(attempt),
        };

        match self.max_delay {
            Some(max) => base_delay.min(max),
            None => base_delay,
        }
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// `base * 2^times` computed in nanoseconds.
fn doubled(base: Duration, times: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let nanos = 2u128
        .checked_pow(times)
        .and_then(|factor| base.as_nanos().checked_mul(factor));
    let Some(nanos) = nanos else {
        return Duration::MAX;
    };
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}

/// Calculate the nth Fibonacci number.
fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        if b == u32::MAX {
            break;
        }
        let temp = a.saturating_add(b);
        a = b;
        b = temp;
    }
    b
}
