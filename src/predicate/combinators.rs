//! The predicate trait and its boolean combinators.
//!
//! Stop conditions are plain predicates over yielded effects. Anything that
//! implements [`Predicate`] can decide whether an attempt is abandoned, and
//! the combinators here let small conditions compose into larger ones.

/// A yes/no question about a value, typically a yielded effect.
///
/// Closures `Fn(&T) -> bool` qualify. Predicates are shared across
/// invocations of a decorated factory, hence `Send + Sync`.
///
/// # Example
///
/// ```rust
/// use eddy::effect::{Action, Effect, HostEffect};
/// use eddy::predicate::*;
///
/// let is_put = |e: &Effect| e.emitted_action().is_some();
/// let is_auth = |e: &Effect| matches!(e.emitted_action(), Some(a) if a.kind().starts_with("AUTH"));
///
/// let stop = is_put.and(is_auth.not());
/// assert!(stop.check(&Effect::put(Action::new("LOAD_FAILURE"))));
/// assert!(!stop.check(&Effect::put(Action::new("AUTH_FAILURE"))));
/// ```
pub trait Predicate<T: ?Sized>: Send + Sync {
    /// Returns true if `value` matches.
    fn check(&self, value: &T) -> bool;
}

impl<T: ?Sized, F> Predicate<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    #[inline]
    fn check(&self, value: &T) -> bool {
        self(value)
    }
}

/// Method-style composition for every [`Predicate`].
pub trait PredicateExt<T: ?Sized>: Predicate<T> + Sized {
    /// Matches when both `self` and `other` match.
    fn and<P: Predicate<T>>(self, other: P) -> And<Self, P> {
        And(self, other)
    }

    /// Matches when `self` or `other` matches.
    fn or<P: Predicate<T>>(self, other: P) -> Or<Self, P> {
        Or(self, other)
    }

    /// Matches exactly when `self` does not.
    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: ?Sized, P: Predicate<T>> PredicateExt<T> for P {}

/// Conjunction, built by [`PredicateExt::and`]. Short-circuits.
#[derive(Clone, Copy, Debug)]
pub struct And<L, R>(pub L, pub R);

impl<T: ?Sized, L: Predicate<T>, R: Predicate<T>> Predicate<T> for And<L, R> {
    #[inline]
    fn check(&self, value: &T) -> bool {
        let And(left, right) = self;
        left.check(value) && right.check(value)
    }
}

/// Disjunction, built by [`PredicateExt::or`]. Short-circuits.
#[derive(Clone, Copy, Debug)]
pub struct Or<L, R>(pub L, pub R);

impl<T: ?Sized, L: Predicate<T>, R: Predicate<T>> Predicate<T> for Or<L, R> {
    #[inline]
    fn check(&self, value: &T) -> bool {
        let Or(left, right) = self;
        left.check(value) || right.check(value)
    }
}

/// Negation, built by [`PredicateExt::not`].
#[derive(Clone, Copy, Debug)]
pub struct Not<P>(pub P);

impl<T: ?Sized, P: Predicate<T>> Predicate<T> for Not<P> {
    #[inline]
    fn check(&self, value: &T) -> bool {
        !self.0.check(value)
    }
}

/// Matches when every member matches. Built by [`all_of`].
///
/// Members share one type; chain [`PredicateExt::and`] for mixed ones.
#[derive(Clone, Copy, Debug)]
pub struct AllOf<P, const N: usize>(pub [P; N]);

impl<T: ?Sized, P: Predicate<T>, const N: usize> Predicate<T> for AllOf<P, N> {
    fn check(&self, value: &T) -> bool {
        self.0.iter().all(|member| member.check(value))
    }
}

/// Conjunction over an array of same-typed predicates.
pub fn all_of<P, const N: usize>(members: [P; N]) -> AllOf<P, N> {
    AllOf(members)
}

/// Matches when any member matches. Built by [`any_of`].
///
/// # Example
///
/// ```rust
/// use eddy::effect::{Action, Effect};
/// use eddy::predicate::*;
///
/// let stop = any_of([
///     action_type_matches("_FAILURE$").unwrap(),
///     action_type_matches("^TIMEOUT").unwrap(),
/// ]);
/// assert!(stop.check(&Effect::put(Action::new("TIMEOUT_REACHED"))));
/// assert!(!stop.check(&Effect::put(Action::new("LOAD_SUCCESS"))));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct AnyOf<P, const N: usize>(pub [P; N]);

impl<T: ?Sized, P: Predicate<T>, const N: usize> Predicate<T> for AnyOf<P, N> {
    fn check(&self, value: &T) -> bool {
        self.0.iter().any(|member| member.check(value))
    }
}

/// Disjunction over an array of same-typed predicates.
pub fn any_of<P, const N: usize>(members: [P; N]) -> AnyOf<P, N> {
    AnyOf(members)
}
