//! Collaborator traits the engine consumes.

mod embedder;
mod storage;
mod temporal;

pub use embedder::*;
pub use storage::*;
pub use temporal::*;
