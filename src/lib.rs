//! A settle-once promise primitive with fan-in concurrency combinators.
//!
//! A [`Promise`] is a container for a value that is not yet known: it settles
//! exactly once, to a fulfillment value or a rejection reason, and lets
//! observers attach continuations that run once the outcome is known.
//! Continuations are always dispatched through an injected [`Schedule`]
//! capability on a later turn — never on the stack that attached them or the
//! stack that settled the promise — so long chains cannot recurse unboundedly
//! and attachment order alone decides ordering within one settlement.
//!
//! "Async" here means deferred-to-a-later-turn on one thread, not parallel
//! execution: the whole crate is single-threaded and cooperative.
//!
//! # Operations
//!
//! Promises compose through continuations and fan-in combinators:
//!
//! - [`Promise::then`]: map the fulfillment value, chaining promises.
//! - [`Promise::catch`]: handle the rejection reason.
//! - [`Promise::finally`]: run cleanup on either outcome.
//! - [`Promise::all`]: wait for all inputs, fail on the first rejection.
//! - [`Promise::race`]: adopt the first settlement either way.
//! - [`Promise::any`]: first fulfillment, or every reason aggregated.
//! - [`Promise::all_settled`]: wait for all inputs, never failing.
//!
//! # Examples
//!
//! ```
//! use promises::{LocalScheduler, Promise};
//!
//! let scheduler = LocalScheduler::new();
//!
//! let greeting: Promise<&str, &str> =
//!     Promise::new(scheduler.handle(), |settle| settle.fulfill("hello"));
//! let loud = greeting.then(|value: &str| format!("{value}!"));
//!
//! // Nothing has run yet: continuations wait for a scheduler turn.
//! assert!(loud.is_pending());
//! scheduler.run();
//! assert_eq!(loud.peek(), Some(Ok(String::from("hello!"))));
//! ```
//!
//! Fan-in over independently-completing promises preserves input order:
//!
//! ```
//! use promises::{LocalScheduler, Promise};
//!
//! let scheduler = LocalScheduler::new();
//! let (slow, settle_slow) = Promise::<&str, &str>::pending(scheduler.handle());
//! let (fast, settle_fast) = Promise::<&str, &str>::pending(scheduler.handle());
//! scheduler.schedule_after(2000, Box::new(move || settle_slow.fulfill("res1")));
//! scheduler.schedule_after(1000, Box::new(move || settle_fast.fulfill("res2")));
//!
//! let combined = Promise::all(scheduler.handle(), vec![slow, fast]);
//! scheduler.run();
//! assert_eq!(combined.peek(), Some(Ok(vec!["res1", "res2"])));
//! ```

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod combine;
mod promise;
mod scheduler;

pub use combine::{AggregateError, Outcome};
pub use promise::{Promise, PromiseFuture, Rejection, Resolution, Settle, Step};
pub use scheduler::{LocalScheduler, Schedule, SchedulerHandle, Task};

/// The promises prelude.
pub mod prelude {
    pub use super::Schedule as _;

    pub use super::{LocalScheduler, Outcome, Promise, Step};
}
