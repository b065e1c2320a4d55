//! Fragments
//!
//! A fragment is one output unit of the coder: data, parity, or a
//! reserved LRC slot. The role carries the index within its class;
//! exactly one role holds by construction. The wire representation of
//! a fragment is just its block bytes; the role and digest travel
//! out-of-band and must be restored faithfully before decode.

use bytes::Bytes;
use chunkio_common::BufList;
use serde::{Deserialize, Serialize};

/// The role a fragment plays within its chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragRole {
    /// Systematic fragment holding the i-th slice of the chunk
    Data(usize),
    /// Redundancy fragment
    Parity(usize),
    /// Reserved local-reconstruction slot (never decoded)
    Lrc(usize),
}

impl FragRole {
    /// The index within the role's class
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Data(i) | Self::Parity(i) | Self::Lrc(i) => i,
        }
    }

    /// Whether this is a data fragment
    #[must_use]
    pub const fn is_data(self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Whether this is a parity fragment
    #[must_use]
    pub const fn is_parity(self) -> bool {
        matches!(self, Self::Parity(_))
    }
}

/// One coder fragment
#[derive(Clone, Debug)]
pub struct Frag {
    /// Role and in-class index
    pub role: FragRole,
    /// The fragment payload; contiguous length equals the job's
    /// `frag_size` after encode
    pub block: BufList,
    /// Per-fragment digest, present when the job configured one
    pub digest: Option<Bytes>,
}

impl Frag {
    /// Create an empty fragment with the given role
    #[must_use]
    pub const fn new(role: FragRole) -> Self {
        Self {
            role,
            block: BufList::new(),
            digest: None,
        }
    }

    /// Create a fragment carrying a block, as a decode input does
    #[must_use]
    pub fn with_block(role: FragRole, block: BufList) -> Self {
        Self {
            role,
            block,
            digest: None,
        }
    }

    /// Attach a recorded digest (decode input)
    #[must_use]
    pub fn with_digest(mut self, digest: Bytes) -> Self {
        self.digest = Some(digest);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accessors() {
        assert!(FragRole::Data(0).is_data());
        assert!(!FragRole::Data(0).is_parity());
        assert!(FragRole::Parity(3).is_parity());
        assert_eq!(FragRole::Lrc(2).index(), 2);
    }

    #[test]
    fn test_frag_construction() {
        let frag = Frag::new(FragRole::Data(1));
        assert!(frag.block.is_empty());
        assert!(frag.digest.is_none());

        let block = BufList::from(vec![1u8, 2, 3]);
        let frag = Frag::with_block(FragRole::Parity(0), block)
            .with_digest(Bytes::from_static(b"dg"));
        assert_eq!(frag.block.len(), 3);
        assert!(frag.digest.is_some());
    }
}
