//! Port definitions (hexagonal architecture)
//!
//! Traits that adapter crates implement:
//! - [`Destination`] - remote object store operations
//! - [`StillWritingProbe`] - external "file is still being written" signal
//! - [`ProgressListener`] - best-effort upload progress events

pub mod destination;
pub mod progress;
pub mod still_writing;

pub use destination::Destination;
pub use progress::{NullProgressListener, ProgressListener};
pub use still_writing::StillWritingProbe;
