//! Two-phase name-to-reference binding.
//!
//! Cross-references in a graph description are authored as plain names
//! and bound to live objects by a one-time resolve pass against explicit
//! registries. Cloning reverses the transform: live references revert to
//! names (consulting the [`Clones`] rename map) so the clone can be
//! re-resolved on its own.

mod error;
mod link;
mod registry;

pub use error::ResolveError;
pub use link::{Link, Named};
pub use registry::{Clones, Registry};
