use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::promise::Promise;
use crate::scheduler::SchedulerHandle;

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Waits for every input to fulfill.
    ///
    /// Fulfills with the results in input order, regardless of completion
    /// order, once the last input fulfills. Rejects with the first rejection
    /// observed from any input; the other inputs keep running but their
    /// settlements are ignored. An empty input fulfills immediately with an
    /// empty vector.
    pub fn all(scheduler: SchedulerHandle, inputs: Vec<Promise<T, E>>) -> Promise<Vec<T>, E> {
        Promise::new(scheduler, move |settle| {
            if inputs.is_empty() {
                settle.fulfill(Vec::new());
                return;
            }
            // Pre-sized slots written by index keep input order independent
            // of completion order.
            let slots = Rc::new(RefCell::new(vec![None::<T>; inputs.len()]));
            let pending = Rc::new(Cell::new(inputs.len()));
            for (index, input) in inputs.iter().enumerate() {
                let slots = Rc::clone(&slots);
                let pending = Rc::clone(&pending);
                let fulfill_settle = settle.clone();
                let reject_settle = settle.clone();
                input.subscribe(
                    Box::new(move |value| {
                        slots.borrow_mut()[index] = Some(value);
                        pending.set(pending.get() - 1);
                        if pending.get() == 0 {
                            let values: Vec<T> = slots.borrow_mut().drain(..).flatten().collect();
                            fulfill_settle.fulfill(values);
                        }
                    }),
                    Box::new(move |error| reject_settle.reject(error)),
                );
            }
        })
    }
}
