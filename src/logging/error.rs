//! Logging errors.

use thiserror::Error;

/// Failures raised while preparing, firing, or sequencing logs.
///
/// Shape problems in the data itself are not errors: a missing projected
/// field renders as an empty column and a non-bag deck entry is skipped.
/// What does fail is sink I/O, firing an unopened log, misconfigured
/// deck projections, and lifecycle signals delivered to a closed logger.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("log '{log}' fired without an open sink")]
    NotOpen { log: String },

    #[error("loggee '{tag}' in log '{log}' has not been resolved")]
    Unresolved { log: String, tag: String },

    #[error("deck projection '{tag}' in log '{log}' requires an explicit field list")]
    FieldsRequired { log: String, tag: String },

    #[error("'{signal}' signaled while logger '{logger}' is closed")]
    Closed {
        logger: String,
        signal: &'static str,
    },
}

/// Errors raised while assembling a log through the builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Log name not specified. Call .name(name) before .build()")]
    MissingName,

    #[error("Log rule not specified. Call .rule(rule) before .build()")]
    MissingRule,
}
