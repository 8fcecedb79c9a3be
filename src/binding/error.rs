//! Resolution errors.

use thiserror::Error;

/// A deferred name reference could not be found in its registry.
///
/// Fatal to the resolve pass: graph construction must abort with the
/// offending name and the owning need's name attached, never skip it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("need '{need}' references unknown tasker '{name}'")]
    UnknownTasker { need: String, name: String },

    #[error("need '{need}' references unknown frame '{name}'")]
    UnknownFrame { need: String, name: String },
}
