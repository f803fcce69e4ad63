//! Progress reporting for batch runs.
//!
//! A run never touches UI state. It pushes [`ProgressEvent`]s into a
//! [`ProgressReporter`] and the consumer decides how to render them.

mod reporter;
mod types;

pub use reporter::{
    report_isolated, ChannelReporter, NullReporter, ProgressReporter, TracingReporter,
};
pub use types::ProgressEvent;
