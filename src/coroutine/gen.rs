//! Coroutines written as `async` blocks.
//!
//! The body runs as an ordinary future polled with a no-op waker. Yielding
//! is a handshake through a shared slot: [`Co::suspend`] parks the effect in
//! the slot and returns `Pending`; the driver takes it out, and later puts
//! the resumption outcome back before polling again.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::task::noop_waker;

use super::{Coroutine, Step};

enum Slot<Y, I, E> {
    Empty,
    Yielded(Y),
    Resumed(Result<I, E>),
}

impl<Y, I, E> Slot<Y, I, E> {
    fn take(&mut self) -> Self {
        std::mem::replace(self, Slot::Empty)
    }
}

/// Handle given to a [`Gen`] body for suspending on effects.
pub struct Co<Y, I, E> {
    slot: Rc<RefCell<Slot<Y, I, E>>>,
}

impl<Y, I, E> Co<Y, I, E> {
    /// Yield `effect` to the driver and wait for its outcome.
    ///
    /// Resolves to `Ok` with the value the driver resumed with, or `Err` with
    /// the error it threw. Use `?` to let thrown errors escape the body.
    pub fn suspend(&self, effect: Y) -> Suspend<'_, Y, I, E> {
        Suspend {
            co: self,
            effect: Some(effect),
        }
    }
}

impl<Y, I, E> fmt::Debug for Co<Y, I, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Co").finish_non_exhaustive()
    }
}

/// Future returned by [`Co::suspend`].
#[must_use = "an effect is only yielded when the suspension is awaited"]
pub struct Suspend<'a, Y, I, E> {
    co: &'a Co<Y, I, E>,
    effect: Option<Y>,
}

// Never pin-projected.
impl<Y, I, E> Unpin for Suspend<'_, Y, I, E> {}

impl<Y, I, E> Future for Suspend<'_, Y, I, E> {
    type Output = Result<I, E>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut slot = this.co.slot.borrow_mut();

        if let Some(effect) = this.effect.take() {
            *slot = Slot::Yielded(effect);
            return Poll::Pending;
        }

        match slot.take() {
            Slot::Resumed(outcome) => Poll::Ready(outcome),
            other => {
                *slot = other;
                Poll::Pending
            }
        }
    }
}

impl<Y, I, E> fmt::Debug for Suspend<'_, Y, I, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspend")
            .field("pending_effect", &self.effect.is_some())
            .finish()
    }
}

type Body<T, E> = Pin<Box<dyn Future<Output = Result<T, E>>>>;

/// A [`Coroutine`] whose body is an `async` block.
///
/// The body receives a [`Co`] handle and may only await
/// [`Co::suspend`] futures (directly or through plain `async fn` helpers).
/// Awaiting anything that depends on a real waker, like a timer or a socket,
/// is not supported; yield an effect for it instead.
///
/// # Panics
///
/// `start` and `resume` panic when called after the body has finished, or
/// when the body is pending without having yielded an effect.
///
/// # Example
///
/// ```rust
/// use eddy::coroutine::{Co, Coroutine, Gen, Step};
///
/// let mut co = Gen::new(|co: Co<&'static str, (), String>| async move {
///     match co.suspend("risky").await {
///         Ok(()) => Ok("clean"),
///         Err(_) => Ok("recovered"),
///     }
/// });
///
/// assert_eq!(co.start(), Ok(Step::Yield("risky")));
/// assert_eq!(co.resume(Err("nope".to_string())), Ok(Step::Complete("recovered")));
/// ```
pub struct Gen<Y, I, T, E> {
    slot: Rc<RefCell<Slot<Y, I, E>>>,
    body: Option<Body<T, E>>,
}

impl<Y, I, T, E> Gen<Y, I, T, E>
where
    Y: 'static,
    I: 'static,
    E: 'static,
{
    /// Build a coroutine from a body producer.
    ///
    /// The producer is called immediately, but nothing in the body runs until
    /// [`Coroutine::start`].
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(Co<Y, I, E>) -> Fut,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        let slot = Rc::new(RefCell::new(Slot::Empty));
        let co = Co { slot: slot.clone() };
        Self {
            slot,
            body: Some(Box::pin(producer(co))),
        }
    }
}

impl<Y, I, T, E> Gen<Y, I, T, E> {
    /// Returns true once the body has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.body.is_none()
    }

    fn advance(&mut self) -> Result<Step<Y, T>, E> {
        let body = self
            .body
            .as_mut()
            .expect("coroutine resumed after it finished");

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        match body.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                self.body = None;
                result.map(Step::Complete)
            }
            Poll::Pending => match self.slot.borrow_mut().take() {
                Slot::Yielded(effect) => Ok(Step::Yield(effect)),
                _ => panic!("coroutine body is pending without a yielded effect"),
            },
        }
    }
}

impl<Y, I, T, E> Coroutine for Gen<Y, I, T, E> {
    type Effect = Y;
    type Input = I;
    type Output = T;
    type Error = E;

    fn start(&mut self) -> Result<Step<Y, T>, E> {
        self.advance()
    }

    fn resume(&mut self, outcome: Result<I, E>) -> Result<Step<Y, T>, E> {
        *self.slot.borrow_mut() = Slot::Resumed(outcome);
        self.advance()
    }
}

impl<Y, I, T, E> fmt::Debug for Gen<Y, I, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gen")
            .field("finished", &self.is_finished())
            .finish()
    }
}
