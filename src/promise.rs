//! The settle-once promise core.
//!
//! A [`Promise`] starts out pending, settles exactly once to a fulfillment
//! value or a rejection reason, and dispatches every attached continuation
//! through its scheduler on a later turn. Settling with another promise
//! ([`Resolution::Chain`] / [`Rejection::Chain`]) adopts that promise's
//! eventual outcome instead of finalizing immediately, so chains of promises
//! flatten to a single final outcome.

use core::fmt;
use core::future::{Future, IntoFuture};
use core::mem;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};
use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::scheduler::{SchedulerHandle, Task};

pub(crate) type FulfillJob<T> = Box<dyn FnOnce(T)>;
pub(crate) type RejectJob<E> = Box<dyn FnOnce(E)>;

/// A value accepted on the fulfillment path.
///
/// Anything convertible into a plain value fulfills directly; settling with
/// another [`Promise`] adopts its outcome once it settles.
#[derive(Debug)]
pub enum Resolution<T, E> {
    /// Fulfill with this value.
    Value(T),
    /// Adopt the outcome of this promise.
    Chain(Promise<T, E>),
}

impl<T, E> From<T> for Resolution<T, E> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Chain(promise)
    }
}

/// A value accepted on the rejection path.
///
/// Rejecting with another [`Promise`] adopts that promise's outcome — the
/// same flattening as the fulfillment path, so the adopted promise may end
/// up fulfilling the target. The variant makes this unusual rule explicit at
/// the call site.
#[derive(Debug)]
pub enum Rejection<T, E> {
    /// Reject with this reason.
    Error(E),
    /// Adopt the outcome of this promise.
    Chain(Promise<T, E>),
}

impl<T, E> From<E> for Rejection<T, E> {
    fn from(error: E) -> Self {
        Rejection::Error(error)
    }
}

impl<T, E> From<Promise<T, E>> for Rejection<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Rejection::Chain(promise)
    }
}

/// The outcome a continuation handler produces for its derived promise.
///
/// Returning [`Step::Fail`] is the handler's failure channel: it rejects the
/// derived promise without unwinding, the way a thrown exception inside a
/// handler becomes a rejection in other promise systems. Plain values and
/// promises convert via `From`, so most handlers just return a value.
#[derive(Debug)]
pub enum Step<T, E> {
    /// Fulfill the derived promise with this value.
    Value(T),
    /// Reject the derived promise with this reason.
    Fail(E),
    /// Resolve the derived promise against this promise's outcome.
    Chain(Promise<T, E>),
}

impl<T, E> From<T> for Step<T, E> {
    fn from(value: T) -> Self {
        Step::Value(value)
    }
}

impl<T, E> From<Promise<T, E>> for Step<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Step::Chain(promise)
    }
}

enum State<T, E> {
    Pending {
        on_fulfilled: SmallVec<[FulfillJob<T>; 2]>,
        on_rejected: SmallVec<[RejectJob<E>; 2]>,
    },
    Fulfilled(T),
    Rejected(E),
}

struct Inner<T, E> {
    state: State<T, E>,
    scheduler: SchedulerHandle,
}

/// A container for a value that is not yet known.
///
/// A promise settles at most once, to either a fulfillment value `T` or a
/// rejection reason `E`, and never changes afterwards. Observers attach
/// continuations with [`then`][Promise::then], [`catch`][Promise::catch],
/// [`then_catch`][Promise::then_catch], and [`finally`][Promise::finally];
/// continuations always run on a later scheduler turn, never inside the call
/// that attached them or the call that settled the promise.
///
/// Cloning a promise clones the handle, not the state: all clones observe the
/// same settlement. Every continuation receives its own copy of the settled
/// payload, hence the `Clone` bounds on `T` and `E`.
pub struct Promise<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.inner.borrow().state {
            State::Pending { .. } => "Pending",
            State::Fulfilled(_) => "Fulfilled",
            State::Rejected(_) => "Rejected",
        };
        f.debug_tuple("Promise").field(&state).finish()
    }
}

/// The settlement capability for one [`Promise`].
///
/// Handed to the executor by [`Promise::new`] and returned alongside the
/// promise by [`Promise::pending`]. Both methods are no-ops once the promise
/// has settled: the first settlement wins.
pub struct Settle<T, E> {
    target: Promise<T, E>,
}

impl<T, E> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Settle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Settle").field(&self.target).finish()
    }
}

impl<T, E> Settle<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Fulfills the promise, or adopts a chained promise's outcome.
    pub fn fulfill(&self, value: impl Into<Resolution<T, E>>) {
        self.target.resolve(value.into());
    }

    /// Rejects the promise, or adopts a chained promise's outcome.
    pub fn reject(&self, error: impl Into<Rejection<T, E>>) {
        self.target.apply_rejection(error.into());
    }

    fn complete(&self, step: Step<T, E>) {
        match step {
            Step::Value(value) => self.target.resolve(Resolution::Value(value)),
            Step::Fail(error) => self.target.apply_rejection(Rejection::Error(error)),
            Step::Chain(promise) => self.target.resolve(Resolution::Chain(promise)),
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Creates a promise and synchronously invokes `executor` with its
    /// settlement capability.
    ///
    /// The executor runs on the constructing call stack; a panic inside it
    /// propagates to the caller rather than rejecting the promise.
    pub fn new(scheduler: SchedulerHandle, executor: impl FnOnce(Settle<T, E>)) -> Self {
        let (promise, settle) = Self::pending(scheduler);
        executor(settle);
        promise
    }

    /// Creates a pending promise and its settlement capability.
    pub fn pending(scheduler: SchedulerHandle) -> (Self, Settle<T, E>) {
        let promise = Promise {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending {
                    on_fulfilled: SmallVec::new(),
                    on_rejected: SmallVec::new(),
                },
                scheduler,
            })),
        };
        let settle = Settle {
            target: promise.clone(),
        };
        (promise, settle)
    }

    /// Creates a promise pre-settled on the fulfillment path.
    ///
    /// A chained promise input still flattens, so the result may stay
    /// pending until the chain settles.
    pub fn resolved(scheduler: SchedulerHandle, value: impl Into<Resolution<T, E>>) -> Self {
        let (promise, settle) = Self::pending(scheduler);
        settle.fulfill(value);
        promise
    }

    /// Creates a promise pre-settled on the rejection path.
    pub fn rejected(scheduler: SchedulerHandle, error: impl Into<Rejection<T, E>>) -> Self {
        let (promise, settle) = Self::pending(scheduler);
        settle.reject(error);
        promise
    }

    /// Returns a copy of the settled outcome, or `None` while pending.
    pub fn peek(&self) -> Option<Result<T, E>> {
        match &self.inner.borrow().state {
            State::Pending { .. } => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(error) => Some(Err(error.clone())),
        }
    }

    /// Whether the promise has not yet settled.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, State::Pending { .. })
    }

    pub(crate) fn scheduler(&self) -> SchedulerHandle {
        Rc::clone(&self.inner.borrow().scheduler)
    }

    /// Attaches a fulfillment handler; rejections pass through unchanged.
    ///
    /// The handler's return value drives the derived promise: a plain value
    /// fulfills it, a [`Promise`] is adopted, and [`Step::Fail`] rejects it.
    pub fn then<U, R>(&self, on_fulfilled: impl FnOnce(T) -> R + 'static) -> Promise<U, E>
    where
        U: Clone + 'static,
        R: Into<Step<U, E>>,
    {
        self.derive(
            Box::new(move |value| on_fulfilled(value).into()),
            Box::new(Step::Fail),
        )
    }

    /// Attaches a rejection handler; fulfillments pass through unchanged.
    pub fn catch<R>(&self, on_rejected: impl FnOnce(E) -> R + 'static) -> Promise<T, E>
    where
        R: Into<Step<T, E>>,
    {
        self.derive(
            Box::new(Step::Value),
            Box::new(move |error| on_rejected(error).into()),
        )
    }

    /// Attaches both a fulfillment and a rejection handler.
    pub fn then_catch<U, R1, R2>(
        &self,
        on_fulfilled: impl FnOnce(T) -> R1 + 'static,
        on_rejected: impl FnOnce(E) -> R2 + 'static,
    ) -> Promise<U, E>
    where
        U: Clone + 'static,
        R1: Into<Step<U, E>>,
        R2: Into<Step<U, E>>,
    {
        self.derive(
            Box::new(move |value| on_fulfilled(value).into()),
            Box::new(move |error| on_rejected(error).into()),
        )
    }

    /// Runs `on_settled`, with no arguments, once the promise settles either
    /// way.
    ///
    /// On pass-through the original value or reason is preserved untouched.
    /// If `on_settled` returns [`Step::Fail`] or a chain that rejects, that
    /// failure overrides the original outcome; a chain that fulfills only
    /// delays pass-through until it settles.
    pub fn finally<R>(&self, on_settled: impl FnOnce() -> R + 'static) -> Promise<T, E>
    where
        R: Into<Step<(), E>>,
    {
        // Only one of the two queued records ever fires, so the FnOnce
        // cleanup travels in a shared slot and is taken by whichever runs.
        let cleanup = Rc::new(RefCell::new(Some(on_settled)));
        let fulfilled_cleanup = Rc::clone(&cleanup);
        let rejected_cleanup = cleanup;
        self.derive(
            Box::new(move |value: T| {
                let Some(on_settled) = fulfilled_cleanup.borrow_mut().take() else {
                    return Step::Value(value);
                };
                match on_settled().into() {
                    Step::Value(()) => Step::Value(value),
                    Step::Fail(error) => Step::Fail(error),
                    Step::Chain(chain) => Step::Chain(chain.then(move |()| value)),
                }
            }),
            Box::new(move |error: E| {
                let Some(on_settled) = rejected_cleanup.borrow_mut().take() else {
                    return Step::Fail(error);
                };
                match on_settled().into() {
                    Step::Value(()) => Step::Fail(error),
                    Step::Fail(override_error) => Step::Fail(override_error),
                    Step::Chain(chain) => {
                        Step::Chain(chain.then(move |()| Step::<T, E>::Fail(error)))
                    }
                }
            }),
        )
    }

    /// Converts into a [`std::future::Future`] yielding `Result<T, E>`.
    pub fn into_future(self) -> PromiseFuture<T, E> {
        PromiseFuture {
            promise: self,
            waker: Rc::new(RefCell::new(None)),
            registered: false,
        }
    }

    /// The continuation primitive: registers a record pair.
    ///
    /// While pending both records queue together; on a settled promise the
    /// matching record is dispatched through the scheduler right away, with a
    /// copy of the payload. Records never run inside this call.
    pub(crate) fn subscribe(&self, on_fulfilled: FulfillJob<T>, on_rejected: RejectJob<E>) {
        let mut inner = self.inner.borrow_mut();
        let immediate: Option<Task> = match &mut inner.state {
            State::Pending {
                on_fulfilled: fulfill_queue,
                on_rejected: reject_queue,
            } => {
                fulfill_queue.push(on_fulfilled);
                reject_queue.push(on_rejected);
                None
            }
            State::Fulfilled(value) => {
                let value = value.clone();
                Some(Box::new(move || on_fulfilled(value)))
            }
            State::Rejected(error) => {
                let error = error.clone();
                Some(Box::new(move || on_rejected(error)))
            }
        };
        let scheduler = Rc::clone(&inner.scheduler);
        drop(inner);
        if let Some(task) = immediate {
            scheduler.schedule(task);
        }
    }

    fn derive<U>(
        &self,
        on_fulfilled: Box<dyn FnOnce(T) -> Step<U, E>>,
        on_rejected: Box<dyn FnOnce(E) -> Step<U, E>>,
    ) -> Promise<U, E>
    where
        U: Clone + 'static,
    {
        let (derived, settle) = Promise::pending(self.scheduler());
        let fulfill_settle = settle.clone();
        let reject_settle = settle;
        self.subscribe(
            Box::new(move |value| fulfill_settle.complete(on_fulfilled(value))),
            Box::new(move |error| reject_settle.complete(on_rejected(error))),
        );
        derived
    }

    fn resolve(&self, resolution: Resolution<T, E>) {
        if !self.is_pending() {
            return;
        }
        match resolution {
            Resolution::Value(value) => self.finish_fulfilled(value),
            Resolution::Chain(source) => self.adopt(source),
        }
    }

    fn apply_rejection(&self, rejection: Rejection<T, E>) {
        if !self.is_pending() {
            return;
        }
        match rejection {
            Rejection::Error(error) => self.finish_rejected(error),
            Rejection::Chain(source) => self.adopt(source),
        }
    }

    /// Subscribes to `source` and adopts whichever outcome it produces.
    ///
    /// The target stays pending meanwhile; finalization re-checks the state,
    /// so if the target settled by other means first the adoption is a no-op.
    fn adopt(&self, source: Promise<T, E>) {
        let fulfill_target = self.clone();
        let reject_target = self.clone();
        source.subscribe(
            Box::new(move |value| fulfill_target.finish_fulfilled(value)),
            Box::new(move |error| reject_target.finish_rejected(error)),
        );
    }

    fn finish_fulfilled(&self, value: T) {
        let mut inner = self.inner.borrow_mut();
        let jobs = match &mut inner.state {
            State::Pending { on_fulfilled, .. } => mem::take(on_fulfilled),
            _ => return,
        };
        // Replacing the state drops the rejection queue along with it.
        inner.state = State::Fulfilled(value.clone());
        let scheduler = Rc::clone(&inner.scheduler);
        drop(inner);
        for job in jobs {
            let value = value.clone();
            scheduler.schedule(Box::new(move || job(value)));
        }
    }

    fn finish_rejected(&self, error: E) {
        let mut inner = self.inner.borrow_mut();
        let jobs = match &mut inner.state {
            State::Pending { on_rejected, .. } => mem::take(on_rejected),
            _ => return,
        };
        inner.state = State::Rejected(error.clone());
        let scheduler = Rc::clone(&inner.scheduler);
        drop(inner);
        for job in jobs {
            let error = error.clone();
            scheduler.schedule(Box::new(move || job(error)));
        }
    }
}

impl<T, E> IntoFuture for Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = PromiseFuture<T, E>;

    fn into_future(self) -> PromiseFuture<T, E> {
        Promise::into_future(self)
    }
}

/// Polls a [`Promise`] as a [`std::future::Future`].
///
/// This `struct` is created by the [`into_future`][Promise::into_future]
/// method on [`Promise`]. While the promise is pending the current waker is
/// parked in a shared slot and woken by a one-shot subscription on
/// settlement.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct PromiseFuture<T, E> {
    promise: Promise<T, E>,
    waker: Rc<RefCell<Option<Waker>>>,
    registered: bool,
}

impl<T, E> fmt::Debug for PromiseFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseFuture")
            .field("promise", &self.promise)
            .field("registered", &self.registered)
            .finish()
    }
}

impl<T, E> Future for PromiseFuture<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.promise.peek() {
            return Poll::Ready(outcome);
        }
        *this.waker.borrow_mut() = Some(cx.waker().clone());
        if !this.registered {
            this.registered = true;
            let fulfill_slot = Rc::clone(&this.waker);
            let reject_slot = Rc::clone(&this.waker);
            this.promise.subscribe(
                Box::new(move |_| {
                    if let Some(waker) = fulfill_slot.borrow_mut().take() {
                        waker.wake();
                    }
                }),
                Box::new(move |_| {
                    if let Some(waker) = reject_slot.borrow_mut().take() {
                        waker.wake();
                    }
                }),
            );
        }
        Poll::Pending
    }
}
