//! # Work abstractions.
//!
//! - [`Work`] - trait for the opaque unit of work an admitted task performs
//! - [`Sleep`] - default simulated work (elapses the duration)
//! - [`WorkFn`] - closure-backed implementation
//! - [`WorkRef`] - shared reference (`Arc<dyn Work>`)

mod work;
mod work_fn;

pub(crate) use work::perform;
pub use work::{Sleep, Work, WorkRef};
pub use work_fn::WorkFn;
