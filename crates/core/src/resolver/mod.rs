//! Output path resolution.
//!
//! For every job the [`PathResolver`] picks the output directory from the
//! job's [`OutputPolicy`](crate::job::OutputPolicy), renders the output stem
//! from an optional [`RenamePattern`], appends the target extension, and
//! walks `_1`, `_2`, ... suffixes until the name is free both on disk and in
//! the run's [`PathAllocationSet`].

mod ledger;
mod path;
mod pattern;

pub use ledger::PathAllocationSet;
pub use path::{PathResolver, ResolveError};
pub use pattern::{NameContext, PatternError, RenamePattern, FALLBACK_PATTERN};
