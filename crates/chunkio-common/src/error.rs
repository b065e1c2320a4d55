//! Error types for the chunk coder
//!
//! A coder job collects errors into an ordered list rather than
//! returning on the first failure; once the list is non-empty the
//! remaining stages are skipped. Every kind the pipeline can report
//! lives here so the list stays uniform across crates.

use thiserror::Error;

/// Common result type for chunk coder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the chunk coder
#[derive(Debug, Clone, Error)]
pub enum Error {
    // Configuration errors
    #[error("invalid coder config: {0}")]
    InvalidConfig(String),

    #[error("cannot code zero size chunk")]
    ZeroSizeChunk,

    #[error("unsupported {kind} type {name}")]
    UnsupportedAlgorithm { kind: &'static str, name: String },

    #[error("unsupported cipher type {0}")]
    UnsupportedCipher(String),

    #[error("unsupported cipher type {name} with block size {block_size}")]
    UnsupportedCipherBlockSize { name: String, block_size: usize },

    #[error("unsupported compress type {0}")]
    UnsupportedCompressor(String),

    // Size errors
    #[error("chunk size mismatch {size} data length {data_len}")]
    SizeMismatch { size: usize, data_len: usize },

    #[error("mismatch frag size {frag_size} expected {expected}")]
    FragSizeMismatch { frag_size: usize, expected: usize },

    // Compression errors
    #[error("compress failed: {0}")]
    CompressFailed(String),

    #[error("decompress failed: {0}")]
    DecompressFailed(String),

    // Cipher errors
    #[error("cipher encrypt init failed {0}")]
    CipherInitFailed(String),

    #[error("cipher update failed {0}")]
    CipherUpdateFailed(String),

    #[error("cipher final failed {0}")]
    CipherFinalFailed(String),

    #[error("cipher get tag failed {0}")]
    CipherGetTagFailed(String),

    #[error("cipher set tag failed {0}")]
    CipherSetTagFailed(String),

    // Fragment availability errors
    #[error("missing data frags: got {got}, need {need}")]
    MissingDataFrags { got: usize, need: usize },

    #[error("missing data frags and no parity")]
    MissingDataFragsNoParity,

    #[error(
        "missing data frags and not enough parity: \
         data_frags {data_avail}/{data_frags} parity_frags {parity_avail}/{parity_frags}"
    )]
    NotEnoughParity {
        data_avail: usize,
        data_frags: usize,
        parity_avail: usize,
        parity_frags: usize,
    },

    // Erasure errors
    #[error(
        "erasure code above hardcoded limits: \
         data_frags {data_frags} max {max_data} parity_frags {parity_frags} max {max_parity}"
    )]
    ErasureLimits {
        data_frags: usize,
        max_data: usize,
        parity_frags: usize,
        max_parity: usize,
    },

    #[error("erasure encode failed: {0}")]
    ErasureEncodeFailed(String),

    #[error(
        "erasure decode invert failed: \
         data_frags {data_avail}/{data_frags} parity_frags {parity_avail}/{parity_frags}"
    )]
    ErasureDecodeInvert {
        data_avail: usize,
        data_frags: usize,
        parity_avail: usize,
        parity_frags: usize,
    },

    #[error("erasure decode failed: {0}")]
    ErasureDecodeFailed(String),

    #[error("erasure decode bad type {0}")]
    ErasureBadType(String),

    // Integrity errors
    #[error("chunk digest mismatch {0}")]
    ChunkDigestMismatch(String),

    // Internal invariants; unreachable given validated inputs, but kept
    // as structured errors so release builds never terminate on them
    #[error("data frags exceeded")]
    DataFragsExceeded,

    #[error("data frags incomplete")]
    DataFragsIncomplete,

    #[error("block len exceeded")]
    BlockLenExceeded,

    #[error("block len incomplete {got} != {expected}")]
    BlockLenIncomplete { got: usize, expected: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal invariant error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure can be recovered at the system level by
    /// retrying with alternate fragments. Digest mismatches and missing
    /// fragments are recoverable; algorithm and configuration errors
    /// are not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingDataFrags { .. }
                | Self::MissingDataFragsNoParity
                | Self::NotEnoughParity { .. }
                | Self::ErasureDecodeInvert { .. }
                | Self::ErasureDecodeFailed(_)
                | Self::ChunkDigestMismatch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(
            Error::MissingDataFrags { got: 2, need: 4 }.is_recoverable()
        );
        assert!(Error::ChunkDigestMismatch("sha256".into()).is_recoverable());
        assert!(!Error::UnsupportedCompressor("lz9".into()).is_recoverable());
        assert!(!Error::ZeroSizeChunk.is_recoverable());
    }

    #[test]
    fn test_display_text() {
        let err = Error::SizeMismatch {
            size: 1024,
            data_len: 1000,
        };
        assert_eq!(err.to_string(), "chunk size mismatch 1024 data length 1000");

        let err = Error::UnsupportedAlgorithm {
            kind: "digest",
            name: "md6".into(),
        };
        assert_eq!(err.to_string(), "unsupported digest type md6");
    }
}
