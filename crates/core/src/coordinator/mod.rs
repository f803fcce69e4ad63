//! Run coordination across categories.
//!
//! The [`RunCoordinator`] keeps one run slot per [`Category`](crate::job::Category).
//! Starting a second run in a busy slot is rejected; slots never share
//! mutable state, so runs in different categories proceed concurrently.

mod error;
mod runs;

pub use error::CoordinatorError;
pub use runs::RunCoordinator;
