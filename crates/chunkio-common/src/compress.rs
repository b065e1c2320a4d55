//! Compression adapter
//!
//! Transforms a buffer list in place via a named compressor. The
//! recognized set is closed: `snappy` (raw format) and `zlib`. The
//! adapter trusts the compressor's output size; skipping compression
//! for incompressible input is the caller's policy, not ours.

use crate::bufs::BufList;
use crate::error::{Error, Result};
use flate2::Compression;
use flate2::write::{ZlibDecoder, ZlibEncoder};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

/// A compression algorithm recognized by the coder configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressType {
    Snappy,
    Zlib,
}

impl CompressType {
    /// Canonical algorithm name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Zlib => "zlib",
        }
    }
}

impl FromStr for CompressType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "snappy" => Ok(Self::Snappy),
            "zlib" => Ok(Self::Zlib),
            _ => Err(format!("unknown compress type: {s}")),
        }
    }
}

impl std::fmt::Display for CompressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Replace the list's contents with their compressed form
pub fn compress(ty: CompressType, data: &mut BufList) -> Result<()> {
    let out = match ty {
        CompressType::Snappy => {
            let merged = data.merge();
            snap::raw::Encoder::new()
                .compress_vec(&merged)
                .map_err(|e| Error::CompressFailed(e.to_string()))?
        }
        CompressType::Zlib => {
            let mut enc = ZlibEncoder::new(
                Vec::with_capacity(data.len() / 2),
                Compression::default(),
            );
            for seg in data.iter() {
                enc.write_all(seg)
                    .map_err(|e| Error::CompressFailed(e.to_string()))?;
            }
            enc.finish()
                .map_err(|e| Error::CompressFailed(e.to_string()))?
        }
    };
    *data = BufList::from(out);
    Ok(())
}

/// Replace the list's contents with their decompressed form.
///
/// `size_hint` is the expected decompressed length; it seeds the output
/// capacity but is not enforced here (the pipeline checks the final
/// length against the chunk size).
pub fn decompress(ty: CompressType, data: &mut BufList, size_hint: usize) -> Result<()> {
    let out = match ty {
        CompressType::Snappy => {
            let merged = data.merge();
            snap::raw::Decoder::new()
                .decompress_vec(&merged)
                .map_err(|e| Error::DecompressFailed(e.to_string()))?
        }
        CompressType::Zlib => {
            let mut dec = ZlibDecoder::new(Vec::with_capacity(size_hint));
            for seg in data.iter() {
                dec.write_all(seg)
                    .map_err(|e| Error::DecompressFailed(e.to_string()))?;
            }
            dec.finish()
                .map_err(|e| Error::DecompressFailed(e.to_string()))?
        }
    };
    *data = BufList::from(out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng, rngs::StdRng};

    fn roundtrip(ty: CompressType, input: &[u8]) {
        let mut data = BufList::from(input.to_vec());
        compress(ty, &mut data).unwrap();
        let compressed_len = data.len();
        decompress(ty, &mut data, input.len()).unwrap();
        assert_eq!(data.to_vec(), input, "{ty} roundtrip (compressed to {compressed_len})");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("snappy".parse::<CompressType>().unwrap(), CompressType::Snappy);
        assert_eq!("zlib".parse::<CompressType>().unwrap(), CompressType::Zlib);
        assert!("gzip".parse::<CompressType>().is_err());
    }

    #[test]
    fn test_roundtrip_compressible() {
        let input = vec![0u8; 65536];
        for ty in [CompressType::Snappy, CompressType::Zlib] {
            let mut data = BufList::from(input.clone());
            compress(ty, &mut data).unwrap();
            assert!(data.len() < input.len() / 10, "{ty} should shrink zeros");
            decompress(ty, &mut data, input.len()).unwrap();
            assert_eq!(data.to_vec(), input);
        }
    }

    #[test]
    fn test_roundtrip_incompressible() {
        // random data may expand; the adapter trusts the compressor
        let mut rng = StdRng::seed_from_u64(7);
        let mut input = vec![0u8; 4096];
        rng.fill_bytes(&mut input);
        roundtrip(CompressType::Snappy, &input);
        roundtrip(CompressType::Zlib, &input);
    }

    #[test]
    fn test_segmented_input() {
        let mut data = BufList::new();
        data.push(bytes::Bytes::from(vec![b'a'; 1000]));
        data.push(bytes::Bytes::from(vec![b'b'; 1000]));
        data.push(bytes::Bytes::from(vec![b'c'; 1000]));
        let original = data.to_vec();

        compress(CompressType::Zlib, &mut data).unwrap();
        decompress(CompressType::Zlib, &mut data, original.len()).unwrap();
        assert_eq!(data.to_vec(), original);
    }

    #[test]
    fn test_decompress_garbage_fails() {
        for ty in [CompressType::Snappy, CompressType::Zlib] {
            let mut data = BufList::from(vec![0xffu8; 64]);
            assert!(decompress(ty, &mut data, 64).is_err(), "{ty}");
        }
    }
}
