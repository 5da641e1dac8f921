//! Stop conditions over yielded effects.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::Predicate;
use crate::effect::HostEffect;

/// Pattern used by the default stop condition.
pub const DEFAULT_FAILURE_PATTERN: &str = "_FAILURE$";

/// A predicate that never matches.
///
/// Installed on the final attempt so the real outcome always surfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Never;

impl<T: ?Sized> Predicate<T> for Never {
    #[inline]
    fn check(&self, _value: &T) -> bool {
        false
    }
}

/// Matches effects that emit an action whose type matches a regex.
///
/// Every other effect shape is a non-match, whatever its content.
///
/// # Example
///
/// ```rust
/// use eddy::effect::{Action, Effect};
/// use eddy::predicate::{action_type_matches, Predicate};
/// use serde_json::json;
///
/// let stop = action_type_matches("_FAILURE$").unwrap();
/// assert!(stop.check(&Effect::put(Action::new("USER_FETCH_FAILURE"))));
/// assert!(!stop.check(&Effect::put(Action::new("USER_FETCH_SUCCESS"))));
/// assert!(!stop.check(&Effect::call("USER_FETCH_FAILURE", json!(null))));
/// ```
#[derive(Clone)]
pub struct ActionTypeMatches {
    regex: Regex,
}

impl ActionTypeMatches {
    /// Wrap an already compiled regex.
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }

    /// The source pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Compile `pattern` into an [`ActionTypeMatches`] condition.
pub fn action_type_matches(pattern: &str) -> Result<ActionTypeMatches, regex::Error> {
    Regex::new(pattern).map(ActionTypeMatches::new)
}

impl<Y: HostEffect> Predicate<Y> for ActionTypeMatches {
    fn check(&self, effect: &Y) -> bool {
        effect
            .emitted_action()
            .is_some_and(|action| self.regex.is_match(action.kind()))
    }
}

impl fmt::Debug for ActionTypeMatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionTypeMatches")
            .field(&self.regex.as_str())
            .finish()
    }
}

/// A type-erased, shareable stop condition.
///
/// Cloning is cheap; every attempt of every invocation of a decorated
/// factory shares the same condition.
pub struct Condition<Y> {
    inner: Arc<dyn Predicate<Y>>,
}

impl<Y> Condition<Y> {
    /// Erase `predicate` behind a shared pointer.
    pub fn new<P>(predicate: P) -> Self
    where
        P: Predicate<Y> + 'static,
    {
        Self {
            inner: Arc::new(predicate),
        }
    }
}

impl<Y> Clone for Condition<Y> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Y> Predicate<Y> for Condition<Y> {
    #[inline]
    fn check(&self, value: &Y) -> bool {
        self.inner.check(value)
    }
}

impl<Y> fmt::Debug for Condition<Y> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").finish_non_exhaustive()
    }
}
