use crate::promise::Promise;
use crate::scheduler::SchedulerHandle;

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Settles with whichever input settles first, success or failure.
    ///
    /// Later settlements from the other inputs are ignored by the
    /// settle-once guard. An empty input stays pending forever.
    pub fn race(scheduler: SchedulerHandle, inputs: Vec<Promise<T, E>>) -> Promise<T, E> {
        Promise::new(scheduler, move |settle| {
            for input in &inputs {
                let fulfill_settle = settle.clone();
                let reject_settle = settle.clone();
                input.subscribe(
                    Box::new(move |value| fulfill_settle.fulfill(value)),
                    Box::new(move |error| reject_settle.reject(error)),
                );
            }
        })
    }
}
