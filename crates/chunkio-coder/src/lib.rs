//! Chunkio Coder - the per-chunk transformation pipeline
//!
//! For each object-storage chunk the coder produces a set of
//! fixed-size fragments that can be spread across independent failure
//! domains, and reconstructs the chunk back from any sufficient subset
//! of them.
//!
//! Encoding runs whole-chunk digest, compression, zero padding,
//! encryption, erasure coding (data + parity + reserved LRC slots) and
//! per-fragment digests, in that order; decoding inverts the pipeline
//! and tolerates as many lost fragments as the parity configuration
//! allows.
//!
//! # Usage
//!
//! ```
//! use bytes::Bytes;
//! use chunkio_coder::{ChunkCoder, CoderConfig, Direction};
//!
//! let mut job = ChunkCoder::new(CoderConfig {
//!     direction: Direction::Encode,
//!     size: 1024,
//!     digest_type: "sha256".into(),
//!     frag_digest_type: String::new(),
//!     compress_type: String::new(),
//!     cipher_type: String::new(),
//!     parity_type: "isa-c1".into(),
//!     data_frags: 4,
//!     parity_frags: 2,
//!     lrc_group: 0,
//!     lrc_frags: 0,
//! });
//! job.push_data(Bytes::from(vec![0u8; 1024]));
//! job.run();
//! assert!(!job.has_errors());
//! assert_eq!(job.frags().len(), 6);
//! ```
//!
//! # Concurrency
//!
//! A job is single-threaded and CPU-bound; running many jobs in
//! parallel is the caller's concern. The only process-wide shared
//! state is the one-time GF(256) table initialization ([`init`]),
//! which is idempotent.

pub mod cipher;
pub mod coder;
pub mod config;
pub mod frag;

mod decode;
mod encode;

pub use chunkio_common::{BufList, Error, Result};
pub use coder::{ChunkCoder, init};
pub use config::{CoderConfig, Direction};
pub use frag::{Frag, FragRole};
