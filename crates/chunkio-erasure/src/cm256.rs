//! Cauchy MDS block codec with an (index, block) API
//!
//! This is the `cm256` strategy: unlike the matrix codecs it does not
//! work over a positional map of all fragments. Encode takes the k
//! original blocks and writes every recovery block concatenated into
//! one backing buffer; decode takes exactly k blocks, each tagged with
//! the index it was produced as (original `i` or recovery `k + r`),
//! and rewrites them in place so that block slot `i` ends up holding
//! original block `i`.
//!
//! Recovery rows are Cauchy rows indexed from 255 downward, keeping
//! the code MDS while staying a distinct family from the `isa-c1`
//! generator.

use crate::codec::ErasureError;
use crate::gf256;
use crate::{MAX_DATA_FRAGS, MAX_PARITY_FRAGS};

/// One block handed to [`Cm256Codec::decode`]
#[derive(Clone, Debug)]
pub struct CmBlock {
    /// Index this block was produced as: original `i < k`, or
    /// recovery `k + r`
    pub index: usize,
    /// The block contents; rewritten in place by decode
    pub data: Vec<u8>,
}

/// The cm256-style codec parameters
#[derive(Clone, Copy, Debug)]
pub struct Cm256Codec {
    original_count: usize,
    recovery_count: usize,
}

impl Cm256Codec {
    /// Create a codec for `original_count` data blocks and
    /// `recovery_count` recovery blocks.
    pub fn new(original_count: usize, recovery_count: usize) -> Result<Self, ErasureError> {
        if original_count == 0 {
            return Err(ErasureError::InvalidConfig(
                "original_count must be > 0".into(),
            ));
        }
        if original_count > MAX_DATA_FRAGS || recovery_count > MAX_PARITY_FRAGS {
            return Err(ErasureError::InvalidConfig(format!(
                "block counts above limits: {original_count}+{recovery_count}"
            )));
        }
        Ok(Self {
            original_count,
            recovery_count,
        })
    }

    /// Number of original blocks (k)
    #[must_use]
    pub const fn original_count(&self) -> usize {
        self.original_count
    }

    /// Number of recovery blocks
    #[must_use]
    pub const fn recovery_count(&self) -> usize {
        self.recovery_count
    }

    /// Cauchy coefficient for recovery block `r` over original `j`
    fn coeff(r: usize, j: usize) -> u8 {
        gf256::inv((255 - r as u8) ^ (j as u8))
    }

    /// Encode all recovery blocks, concatenated into `recovery_out`
    /// (`recovery_count * block_bytes` long).
    pub fn encode(
        &self,
        originals: &[&[u8]],
        recovery_out: &mut [u8],
    ) -> Result<(), ErasureError> {
        gf256::init();
        let k = self.original_count;
        if originals.len() != k {
            return Err(ErasureError::EncodingFailed(format!(
                "expected {k} original blocks, got {}",
                originals.len()
            )));
        }
        let block_bytes = originals.first().map_or(0, |b| b.len());
        for block in originals {
            if block.len() != block_bytes {
                return Err(ErasureError::BlockSizeMismatch {
                    expected: block_bytes,
                    actual: block.len(),
                });
            }
        }
        if recovery_out.len() != self.recovery_count * block_bytes {
            return Err(ErasureError::EncodingFailed(format!(
                "recovery buffer is {} bytes, expected {}",
                recovery_out.len(),
                self.recovery_count * block_bytes
            )));
        }

        for (r, out) in recovery_out.chunks_mut(block_bytes.max(1)).enumerate() {
            out.fill(0);
            for (j, original) in originals.iter().enumerate() {
                gf256::mul_acc_slice(out, original, Self::coeff(r, j));
            }
        }
        Ok(())
    }

    /// Decode in place from exactly k index-tagged blocks.
    ///
    /// Blocks carrying an original index must already sit at their own
    /// slot (`blocks[i].index == i`); recovery blocks fill the holes in
    /// any order. On success every slot `i` holds original block `i`
    /// and its index is rewritten to `i`.
    pub fn decode(&self, blocks: &mut [CmBlock]) -> Result<(), ErasureError> {
        gf256::init();
        let k = self.original_count;
        let m = self.recovery_count;
        if blocks.len() != k {
            return Err(ErasureError::DecodingFailed(format!(
                "expected {k} blocks, got {}",
                blocks.len()
            )));
        }
        let block_bytes = blocks.first().map_or(0, |b| b.data.len());
        let mut seen = [false; MAX_DATA_FRAGS + MAX_PARITY_FRAGS];
        for (slot, block) in blocks.iter().enumerate() {
            if block.data.len() != block_bytes {
                return Err(ErasureError::BlockSizeMismatch {
                    expected: block_bytes,
                    actual: block.data.len(),
                });
            }
            if block.index >= k + m {
                return Err(ErasureError::DecodingFailed(format!(
                    "block index {} out of range",
                    block.index
                )));
            }
            if seen[block.index] {
                return Err(ErasureError::DecodingFailed(format!(
                    "duplicate block index {}",
                    block.index
                )));
            }
            seen[block.index] = true;
            if block.index < k && block.index != slot {
                return Err(ErasureError::DecodingFailed(format!(
                    "original block {} out of place at slot {slot}",
                    block.index
                )));
            }
        }

        // fast path: every slot already holds its original
        if blocks.iter().enumerate().all(|(i, b)| b.index == i) {
            return Ok(());
        }

        // rows of the generator corresponding to the supplied blocks
        let mut matrix = vec![0u8; k * k];
        for (slot, block) in blocks.iter().enumerate() {
            let row = &mut matrix[slot * k..(slot + 1) * k];
            if block.index < k {
                row[block.index] = 1;
            } else {
                for (j, c) in row.iter_mut().enumerate() {
                    *c = Self::coeff(block.index - k, j);
                }
            }
        }
        let inverse =
            gf256::invert_matrix(&matrix, k).ok_or(ErasureError::SingularMatrix)?;

        // originals[i] = inverse row i x supplied blocks; only the
        // slots holding recovery blocks need rebuilding
        let mut rebuilt: Vec<(usize, Vec<u8>)> = Vec::new();
        for slot in 0..k {
            if blocks[slot].index == slot {
                continue;
            }
            let mut out = vec![0u8; block_bytes];
            for (j, block) in blocks.iter().enumerate() {
                gf256::mul_acc_slice(&mut out, &block.data, inverse[slot * k + j]);
            }
            rebuilt.push((slot, out));
        }
        for (slot, data) in rebuilt {
            blocks[slot].data = data;
            blocks[slot].index = slot;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng, rngs::StdRng};

    fn random_blocks(k: usize, block_bytes: usize, seed: u64) -> Vec<Vec<u8>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..k)
            .map(|_| {
                let mut b = vec![0u8; block_bytes];
                rng.fill_bytes(&mut b);
                b
            })
            .collect()
    }

    #[test]
    fn test_encode_decode_with_recovery_blocks() {
        let (k, m, block_bytes) = (4, 3, 128);
        let codec = Cm256Codec::new(k, m).unwrap();
        let originals = random_blocks(k, block_bytes, 21);
        let refs: Vec<&[u8]> = originals.iter().map(Vec::as_slice).collect();
        let mut recovery = vec![0u8; m * block_bytes];
        codec.encode(&refs, &mut recovery).unwrap();

        // drop originals 1 and 3, substitute recovery 0 and 2
        let recovery_block =
            |r: usize| recovery[r * block_bytes..(r + 1) * block_bytes].to_vec();
        let mut blocks = vec![
            CmBlock { index: 0, data: originals[0].clone() },
            CmBlock { index: k, data: recovery_block(0) },
            CmBlock { index: 2, data: originals[2].clone() },
            CmBlock { index: k + 2, data: recovery_block(2) },
        ];
        codec.decode(&mut blocks).unwrap();
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.index, i);
            assert_eq!(block.data, originals[i], "slot {i}");
        }
    }

    #[test]
    fn test_decode_noop_when_all_originals_present() {
        let (k, m, block_bytes) = (3, 2, 64);
        let codec = Cm256Codec::new(k, m).unwrap();
        let originals = random_blocks(k, block_bytes, 22);
        let mut blocks: Vec<CmBlock> = originals
            .iter()
            .enumerate()
            .map(|(i, d)| CmBlock { index: i, data: d.clone() })
            .collect();
        codec.decode(&mut blocks).unwrap();
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.data, originals[i]);
        }
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let codec = Cm256Codec::new(3, 2).unwrap();
        // wrong count
        let mut short = vec![CmBlock { index: 0, data: vec![0; 8] }];
        assert!(codec.decode(&mut short).is_err());

        // duplicate index
        let mut dup = vec![
            CmBlock { index: 0, data: vec![0; 8] },
            CmBlock { index: 0, data: vec![0; 8] },
            CmBlock { index: 2, data: vec![0; 8] },
        ];
        assert!(codec.decode(&mut dup).is_err());

        // out of range index
        let mut range = vec![
            CmBlock { index: 0, data: vec![0; 8] },
            CmBlock { index: 1, data: vec![0; 8] },
            CmBlock { index: 9, data: vec![0; 8] },
        ];
        assert!(codec.decode(&mut range).is_err());
    }

    #[test]
    fn test_all_recovery_subsets_roundtrip() {
        let (k, m, block_bytes) = (5, 3, 96);
        let codec = Cm256Codec::new(k, m).unwrap();
        let originals = random_blocks(k, block_bytes, 23);
        let refs: Vec<&[u8]> = originals.iter().map(Vec::as_slice).collect();
        let mut recovery = vec![0u8; m * block_bytes];
        codec.encode(&refs, &mut recovery).unwrap();

        // drop every pair of originals, fill with the first recoveries
        for d0 in 0..k {
            for d1 in d0 + 1..k {
                let mut next_recovery = 0;
                let mut blocks: Vec<CmBlock> = (0..k)
                    .map(|i| {
                        if i == d0 || i == d1 {
                            let r = next_recovery;
                            next_recovery += 1;
                            CmBlock {
                                index: k + r,
                                data: recovery[r * block_bytes..(r + 1) * block_bytes]
                                    .to_vec(),
                            }
                        } else {
                            CmBlock { index: i, data: originals[i].clone() }
                        }
                    })
                    .collect();
                codec.decode(&mut blocks).unwrap();
                for (i, block) in blocks.iter().enumerate() {
                    assert_eq!(block.data, originals[i], "drop ({d0},{d1}) slot {i}");
                }
            }
        }
    }
}
