//! By-name digest registry
//!
//! Digests are selected by algorithm name in the coder configuration
//! and computed over a buffer list segment by segment. Comparison is
//! constant-time.

use crate::bufs::BufList;
use bytes::Bytes;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// A digest algorithm resolvable by name
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestKind {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestKind {
    /// Canonical algorithm name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Digest output length in bytes
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Compute the digest over a buffer list, feeding each segment
    /// sequentially into the hash context.
    #[must_use]
    pub fn compute(self, bufs: &BufList) -> Bytes {
        fn hash<D: Digest>(bufs: &BufList) -> Bytes {
            let mut ctx = D::new();
            for seg in bufs {
                ctx.update(seg);
            }
            Bytes::copy_from_slice(ctx.finalize().as_slice())
        }

        match self {
            Self::Sha1 => hash::<Sha1>(bufs),
            Self::Sha224 => hash::<Sha224>(bufs),
            Self::Sha256 => hash::<Sha256>(bufs),
            Self::Sha384 => hash::<Sha384>(bufs),
            Self::Sha512 => hash::<Sha512>(bufs),
        }
    }

    /// Recompute the digest of `bufs` and compare against `expected`
    /// in constant time.
    #[must_use]
    pub fn matches(self, bufs: &BufList, expected: &[u8]) -> bool {
        let computed = self.compute(bufs);
        computed.len() == expected.len()
            && bool::from(computed.as_ref().ct_eq(expected))
    }
}

impl FromStr for DigestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha224" | "sha-224" => Ok(Self::Sha224),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha384" | "sha-384" => Ok(Self::Sha384),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(format!("unknown digest type: {s}")),
        }
    }
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
