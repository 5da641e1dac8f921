//! Factories that create a fresh coroutine per invocation.

use std::borrow::Cow;
use std::fmt;

use super::Coroutine;

/// Something that can be invoked with arguments to start a new coroutine.
///
/// Retrying means "start over from scratch", so decorators hold on to the
/// factory and the call arguments rather than to a coroutine instance.
/// Every closure `Fn(&A) -> C` is a factory.
///
/// # Example
///
/// ```rust
/// use eddy::coroutine::{Co, CoroutineFactory, Coroutine, Gen, Step};
///
/// let greet = |name: &String| {
///     let name = name.clone();
///     Gen::new(move |co: Co<String, (), String>| async move {
///         co.suspend(format!("hello {}", name)).await?;
///         Ok(())
///     })
/// };
///
/// let mut co = greet.spawn(&"ada".to_string());
/// assert_eq!(co.start(), Ok(Step::Yield("hello ada".to_string())));
/// ```
pub trait CoroutineFactory<A> {
    /// The coroutine produced per invocation.
    type Coroutine: Coroutine;

    /// Start a new coroutine for `args`.
    fn spawn(&self, args: &A) -> Self::Coroutine;

    /// Diagnostic name, used only for tracing.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

impl<A, F, C> CoroutineFactory<A> for F
where
    F: Fn(&A) -> C,
    C: Coroutine,
{
    type Coroutine = C;

    fn spawn(&self, args: &A) -> C {
        self(args)
    }
}

/// A factory with an explicit diagnostic name.
///
/// Created by [`named`].
#[derive(Clone)]
pub struct Named<F> {
    name: Cow<'static, str>,
    factory: F,
}

/// Attach a readable name to a factory for tracing output.
///
/// ```rust
/// use eddy::coroutine::{named, Co, CoroutineFactory, Gen};
///
/// let fetch = named("fetch_user", |_: &()| {
///     Gen::new(|_co: Co<(), (), String>| async move { Ok(()) })
/// });
/// assert_eq!(CoroutineFactory::<()>::name(&fetch), "fetch_user");
/// ```
pub fn named<F>(name: impl Into<Cow<'static, str>>, factory: F) -> Named<F> {
    Named {
        name: name.into(),
        factory,
    }
}

impl<A, F> CoroutineFactory<A> for Named<F>
where
    F: CoroutineFactory<A>,
{
    type Coroutine = F::Coroutine;

    fn spawn(&self, args: &A) -> Self::Coroutine {
        self.factory.spawn(args)
    }

    fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }
}

impl<F> fmt::Debug for Named<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Named").field("name", &self.name).finish()
    }
}
