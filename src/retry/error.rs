//! Error types for retry configuration.

/// Error returned by [`decorate`](super::decorate) for malformed options.
///
/// Configuration problems are reported once, when the factory is decorated,
/// and never at call time.
///
/// # Examples
///
/// ```rust
/// use eddy::effect::Effect;
/// use eddy::retry::{decorate, ConfigError, RetryOptions};
/// # use eddy::coroutine::{Co, Gen};
/// # let factory = |_: &()| Gen::new(|_co: Co<Effect, (), String>| async move { Ok(()) });
///
/// let options = RetryOptions::<Effect>::default().with_pattern("(_FAILURE");
///
/// match decorate(factory, options) {
///     Err(ConfigError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "(_FAILURE"),
///     _ => panic!("expected an invalid pattern"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The stop condition pattern is not a valid regular expression.
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why the regex engine rejected it.
        source: regex::Error,
    },
    /// The backoff policy cannot produce a usable schedule.
    InvalidBackoff {
        /// What is wrong with the policy.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPattern { pattern, .. } => {
                write!(f, "invalid stop condition pattern {:?}", pattern)
            }
            Self::InvalidBackoff { reason } => write!(f, "invalid backoff: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
            Self::InvalidBackoff { .. } => None,
        }
    }
}
