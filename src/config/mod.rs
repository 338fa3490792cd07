//! Run-time configuration.

pub mod options;
pub use options::{NaulinOptions, OptionValue, Options};
