//! vrs-core: shared types, errors, configuration and storage for vrstream.
//!
//! This crate is the foundational dependency of the server crate. It owns
//! the on-disk layout (ingest, output and streaming directories), the ingest
//! writer, processing modes and the job request model.

pub mod config;
pub mod error;
pub mod ingest;
pub mod job;
pub mod media;
pub mod storage;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use job::{JobState, ProcessingJob};
pub use media::Mode;
