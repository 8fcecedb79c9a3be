//! Rule-triggered logging over the shared store.
//!
//! A [`Log`] projects tagged shares into one flat tab-separated output
//! stream according to its [`Rule`]; a [`Logger`] owns an ordered set of
//! logs and multiplexes the lifecycle signals START, RUN, and STOP to
//! them.

mod builder;
mod error;
mod log;
mod logger;
mod rule;

pub use builder::LogBuilder;
pub use error::{BuildError, LogError};
pub use log::{Log, Loggee};
pub use logger::{Logger, LoggerStatus};
pub use rule::Rule;
