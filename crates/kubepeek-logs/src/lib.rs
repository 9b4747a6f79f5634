//! Container log retrieval for kubepeek
//!
//! This crate opens pod log streams and materializes them into complete
//! text snapshots.

mod streamer;

pub use streamer::{LogStreamer, log_params};

// Re-export types used in our public API
pub use kubepeek_types::LogRequest;
