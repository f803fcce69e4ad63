//! Conversion actions.
//!
//! A [`ConversionAction`] performs one job. The runner only depends on the
//! trait; [`select_action`] maps a [`Category`](crate::job::Category) to one of
//! the built-in variants of [`ActionKind`]:
//!
//! - images are transformed in process with the `image` crate,
//! - audio and video go through an ffmpeg subprocess with progress parsing,
//! - documents go through a headless office suite,
//! - batch renames are plain copies or moves.
//!
//! External processes are interruptible: cancelling the run's token asks the
//! process to terminate and kills it once the grace period lapses.

mod config;
mod copy;
mod error;
mod ffmpeg;
mod imaging;
mod office;
mod process;
mod registry;
mod traits;
mod types;

pub use config::{ActionsConfig, FfmpegConfig, ImageConfig, OfficeConfig};
pub use copy::CopyAction;
pub use error::ActionError;
pub use ffmpeg::FfmpegAction;
pub use imaging::ImageAction;
pub use office::OfficeAction;
pub use registry::{select_action, ActionKind};
pub use traits::{ActionContext, ConversionAction};
pub use types::{ActionOutput, MediaKind};
