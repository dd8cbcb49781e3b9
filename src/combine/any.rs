use core::fmt;
use core::ops::{Deref, DerefMut};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::rc::Rc;

use crate::promise::Promise;
use crate::scheduler::SchedulerHandle;

/// A collection of rejection reasons, in input order.
///
/// Produced by [`Promise::any`] when every input rejects.
#[derive(Clone, PartialEq, Eq)]
pub struct AggregateError<E> {
    inner: Vec<E>,
}

impl<E> AggregateError<E> {
    pub(crate) fn new(inner: Vec<E>) -> Self {
        Self { inner }
    }
}

impl<E: fmt::Display> fmt::Debug for AggregateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}:")?;

        for (i, err) in self.inner.iter().enumerate() {
            writeln!(f, "- Error {}: {err}", i + 1)?;
        }

        Ok(())
    }
}

impl<E: fmt::Display> fmt::Display for AggregateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred", self.inner.len())
    }
}

impl<E> Deref for AggregateError<E> {
    type Target = Vec<E>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<E> DerefMut for AggregateError<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<E: Error> Error for AggregateError<E> {}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Waits for the first input to fulfill.
    ///
    /// Fulfills with the first fulfillment observed. Rejects only once every
    /// input has rejected, with an [`AggregateError`] holding all reasons in
    /// input order. An empty input rejects immediately with an empty
    /// aggregate.
    pub fn any(
        scheduler: SchedulerHandle,
        inputs: Vec<Promise<T, E>>,
    ) -> Promise<T, AggregateError<E>> {
        Promise::new(scheduler, move |settle| {
            if inputs.is_empty() {
                settle.reject(AggregateError::new(Vec::new()));
                return;
            }
            let slots = Rc::new(RefCell::new(vec![None::<E>; inputs.len()]));
            // Completion is decided by counting distinct rejections, never by
            // inspecting the slots: they fill out of order.
            let rejected = Rc::new(Cell::new(0usize));
            let total = inputs.len();
            for (index, input) in inputs.iter().enumerate() {
                let slots = Rc::clone(&slots);
                let rejected = Rc::clone(&rejected);
                let fulfill_settle = settle.clone();
                let reject_settle = settle.clone();
                input.subscribe(
                    Box::new(move |value| fulfill_settle.fulfill(value)),
                    Box::new(move |error| {
                        slots.borrow_mut()[index] = Some(error);
                        rejected.set(rejected.get() + 1);
                        if rejected.get() == total {
                            let errors: Vec<E> = slots.borrow_mut().drain(..).flatten().collect();
                            reject_settle.reject(AggregateError::new(errors));
                        }
                    }),
                );
            }
        })
    }
}
