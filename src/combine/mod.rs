//! Fan-in combinators over collections of promises.
//!
//! All combinators take the scheduler explicitly and observe their inputs
//! through continuations; none of them cancels an input, so an input ignored
//! after the combined promise settles still runs to completion on its own.
//!
//! | Name                     | Fulfills with            | Settles when |
//! | ---                      | ---                      | --- |
//! | [`Promise::all`]         | `Vec<T>` in input order  | all fulfill, or first rejection |
//! | [`Promise::race`]        | `T`                      | first settlement either way |
//! | [`Promise::any`]         | `T`                      | first fulfillment, or all rejections |
//! | [`Promise::all_settled`] | `Vec<Outcome<T, E>>`     | all settle; never rejects |

mod all;
mod all_settled;
mod any;
mod race;

pub use all_settled::Outcome;
pub use any::AggregateError;
