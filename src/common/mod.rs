//! Shared plumbing: error types and channels

pub mod channels;
pub mod errors;
