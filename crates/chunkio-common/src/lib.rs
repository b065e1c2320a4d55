//! Chunkio Common - Shared types and utilities
//!
//! This crate provides the leaves shared by the chunk coder pipeline:
//! the segmented buffer list all stage I/O flows through, the by-name
//! digest registry, the compression adapter, and the common error type.

pub mod bufs;
pub mod compress;
pub mod digest;
pub mod error;

pub use bufs::BufList;
pub use compress::CompressType;
pub use digest::DigestKind;
pub use error::{Error, Result};
