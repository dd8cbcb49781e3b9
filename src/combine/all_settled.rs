use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::promise::Promise;
use crate::scheduler::SchedulerHandle;

/// The recorded settlement of a single input promise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The input fulfilled with this value.
    Fulfilled(T),
    /// The input rejected with this reason.
    Rejected(E),
}

impl<T, E> Outcome<T, E> {
    /// Whether this outcome is a fulfillment.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Outcome::Fulfilled(_))
    }

    /// Whether this outcome is a rejection.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Waits for every input to settle, either way.
    ///
    /// Fulfills with one [`Outcome`] per input, in input order, once the
    /// last input has settled. Never rejects, which the `Infallible` error
    /// type encodes. An empty input fulfills immediately with an empty
    /// vector.
    pub fn all_settled(
        scheduler: SchedulerHandle,
        inputs: Vec<Promise<T, E>>,
    ) -> Promise<Vec<Outcome<T, E>>, Infallible> {
        Promise::new(scheduler, move |settle| {
            if inputs.is_empty() {
                settle.fulfill(Vec::new());
                return;
            }
            let slots = Rc::new(RefCell::new(vec![None::<Outcome<T, E>>; inputs.len()]));
            let pending = Rc::new(Cell::new(inputs.len()));
            for (index, input) in inputs.iter().enumerate() {
                let record = {
                    let slots = Rc::clone(&slots);
                    let pending = Rc::clone(&pending);
                    let settle = settle.clone();
                    move |outcome: Outcome<T, E>| {
                        slots.borrow_mut()[index] = Some(outcome);
                        pending.set(pending.get() - 1);
                        if pending.get() == 0 {
                            let outcomes: Vec<Outcome<T, E>> =
                                slots.borrow_mut().drain(..).flatten().collect();
                            settle.fulfill(outcomes);
                        }
                    }
                };
                let fulfill_record = record.clone();
                input.subscribe(
                    Box::new(move |value| fulfill_record(Outcome::Fulfilled(value))),
                    Box::new(move |error| record(Outcome::Rejected(error))),
                );
            }
        })
    }
}
