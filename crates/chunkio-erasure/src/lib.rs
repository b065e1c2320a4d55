//! Chunkio Erasure Coding - GF(256) parity backends
//!
//! This crate provides the erasure coding strategies behind the chunk
//! coder's `parity_type` configuration:
//!
//! - **isa-c1**: systematic code from a Cauchy matrix
//! - **isa-rs**: systematic code from a Vandermonde (Reed-Solomon)
//!   matrix
//! - **cm256**: a Cauchy MDS codec with its own (index, block) API
//!
//! All three run over the same GF(2^8) arithmetic in [`gf256`]. Encode
//! produces `parity_frags` parity blocks from `data_frags` data blocks;
//! decode recovers missing data blocks from any `data_frags` available
//! blocks.
//!
//! # One-time init
//!
//! The block multiply hot loop runs off a 64 KiB product table built
//! once per process. [`init`] forces the build; it is idempotent and
//! every codec entry point performs it implicitly, so explicit calls
//! are only an up-front optimization.

pub mod cm256;
pub mod codec;
pub mod gf256;
pub mod matrix;

pub use cm256::{Cm256Codec, CmBlock};
pub use codec::{ErasureError, ParityCodec, ParityType};
pub use matrix::{MatrixCodec, MatrixKind};

/// Hard limit on data fragments per chunk
pub const MAX_DATA_FRAGS: usize = 32;

/// Hard limit on parity fragments per chunk
pub const MAX_PARITY_FRAGS: usize = 32;

/// Process-wide one-time initialization of the GF(256) product table.
///
/// Idempotent; see the crate docs.
pub fn init() {
    gf256::init();
}
