//! Coder job configuration
//!
//! The configuration is immutable per job and carries the stage
//! selection by name: empty strings disable the digest, cipher,
//! compression and parity stages. Fragment geometry is validated
//! against the hardcoded limits when the job runs.

use chunkio_common::{Error, Result};
use chunkio_erasure::{MAX_DATA_FRAGS, MAX_PARITY_FRAGS};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which way the pipeline runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "enc")]
    Encode,
    #[serde(rename = "dec")]
    Decode,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "enc" => Ok(Self::Encode),
            "dec" => Ok(Self::Decode),
            _ => Err(format!("unknown coder direction: {s}")),
        }
    }
}

const fn div_up(n: usize, align: usize) -> usize {
    (n + align - 1) / align
}

const fn align_up(n: usize, align: usize) -> usize {
    div_up(n, align) * align
}

/// Immutable per-job configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoderConfig {
    /// Pipeline direction
    pub direction: Direction,
    /// Original chunk length in bytes
    pub size: usize,
    /// Whole-chunk digest algorithm name; empty disables
    #[serde(default)]
    pub digest_type: String,
    /// Per-fragment digest algorithm name; empty disables
    #[serde(default)]
    pub frag_digest_type: String,
    /// Compressor name (`snappy` | `zlib`); empty disables
    #[serde(default)]
    pub compress_type: String,
    /// Cipher algorithm name; empty disables. Must resolve to a
    /// stream cipher (block size 1).
    #[serde(default)]
    pub cipher_type: String,
    /// Parity strategy name (`isa-c1` | `isa-rs` | `cm256`); empty
    /// disables
    #[serde(default)]
    pub parity_type: String,
    /// Number of systematic data fragments (k)
    pub data_frags: usize,
    /// Number of parity fragments
    #[serde(default)]
    pub parity_frags: usize,
    /// LRC group width; 0 disables the LRC reservation
    #[serde(default)]
    pub lrc_group: usize,
    /// LRC fragments reserved per group
    #[serde(default)]
    pub lrc_frags: usize,
}

impl CoderConfig {
    /// Number of LRC groups covering the data+parity fragments
    #[must_use]
    pub const fn lrc_groups(&self) -> usize {
        if self.lrc_group == 0 {
            0
        } else {
            (self.data_frags + self.parity_frags) / self.lrc_group
        }
    }

    /// Total LRC fragment slots reserved (encode-side only)
    #[must_use]
    pub const fn lrc_total_frags(&self) -> usize {
        self.lrc_groups() * self.lrc_frags
    }

    /// Total fragment slots: data + parity + reserved LRC
    #[must_use]
    pub const fn total_frags(&self) -> usize {
        self.data_frags + self.parity_frags + self.lrc_total_frags()
    }

    /// Smallest multiple of `data_frags` not below `len`
    #[must_use]
    pub const fn padded_size(&self, len: usize) -> usize {
        align_up(len, self.data_frags)
    }

    /// Validate the invariants every job must satisfy before any stage
    /// runs: a non-zero chunk size and fragment counts within the
    /// hardcoded limits.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::ZeroSizeChunk);
        }
        if self.data_frags == 0 {
            return Err(Error::InvalidConfig("data_frags must be >= 1".into()));
        }
        if self.data_frags > MAX_DATA_FRAGS || self.parity_frags > MAX_PARITY_FRAGS {
            return Err(Error::ErasureLimits {
                data_frags: self.data_frags,
                max_data: MAX_DATA_FRAGS,
                parity_frags: self.parity_frags,
                max_parity: MAX_PARITY_FRAGS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(data_frags: usize, parity_frags: usize) -> CoderConfig {
        CoderConfig {
            direction: Direction::Encode,
            size: 1024,
            digest_type: String::new(),
            frag_digest_type: String::new(),
            compress_type: String::new(),
            cipher_type: String::new(),
            parity_type: String::new(),
            data_frags,
            parity_frags,
            lrc_group: 0,
            lrc_frags: 0,
        }
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("enc".parse::<Direction>().unwrap(), Direction::Encode);
        assert_eq!("dec".parse::<Direction>().unwrap(), Direction::Decode);
        assert!("encode".parse::<Direction>().is_err());
    }

    #[test]
    fn test_padded_size() {
        let cfg = config(4, 2);
        assert_eq!(cfg.padded_size(5), 8);
        assert_eq!(cfg.padded_size(8), 8);
        assert_eq!(cfg.padded_size(1), 4);
        assert_eq!(cfg.padded_size(1024), 1024);
    }

    #[test]
    fn test_lrc_reservation() {
        let mut cfg = config(4, 2);
        assert_eq!(cfg.lrc_groups(), 0);
        assert_eq!(cfg.total_frags(), 6);

        cfg.lrc_group = 3;
        cfg.lrc_frags = 1;
        assert_eq!(cfg.lrc_groups(), 2);
        assert_eq!(cfg.lrc_total_frags(), 2);
        assert_eq!(cfg.total_frags(), 8);
    }

    #[test]
    fn test_validate_limits() {
        assert!(config(4, 2).validate().is_ok());
        assert!(config(32, 32).validate().is_ok());

        let mut zero = config(4, 2);
        zero.size = 0;
        assert!(matches!(zero.validate(), Err(Error::ZeroSizeChunk)));

        assert!(matches!(
            config(0, 2).validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            config(33, 2).validate(),
            Err(Error::ErasureLimits { .. })
        ));
        assert!(matches!(
            config(4, 33).validate(),
            Err(Error::ErasureLimits { .. })
        ));
    }

}
