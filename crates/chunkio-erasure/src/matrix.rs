//! Systematic matrix codecs
//!
//! The two ISA-L-style strategies share this implementation: an
//! `m x k` generator matrix whose top `k` rows are the identity
//! (systematic code) and whose bottom `m - k` rows are the parity
//! coefficients. The strategies differ only in how those bottom rows
//! are constructed:
//!
//! - `Cauchy1`: `a[i][j] = inv(i ^ j)`, a Cauchy matrix, so every
//!   square submatrix is invertible and any k surviving fragments
//!   reconstruct.
//! - `ReedSolomon`: Vandermonde-derived rows `a[i][j] = g^j` with
//!   `g = 2^(i-k)`.

use crate::codec::ErasureError;
use crate::gf256;
use crate::{MAX_DATA_FRAGS, MAX_PARITY_FRAGS};

/// Generator matrix construction for [`MatrixCodec`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixKind {
    /// Systematic code from a Cauchy matrix
    Cauchy1,
    /// Systematic code from a Vandermonde (Reed-Solomon) matrix
    ReedSolomon,
}

impl MatrixKind {
    /// Generate the `m x k` row-major generator matrix: identity on
    /// top, parity coefficient rows below.
    #[must_use]
    pub fn generate(self, m: usize, k: usize) -> Vec<u8> {
        let mut a = vec![0u8; m * k];
        for i in 0..k {
            a[i * k + i] = 1;
        }
        match self {
            Self::Cauchy1 => {
                for i in k..m {
                    for j in 0..k {
                        // i >= k > j, so i ^ j is never zero
                        a[i * k + j] = gf256::inv((i as u8) ^ (j as u8));
                    }
                }
            }
            Self::ReedSolomon => {
                let mut r#gen = 1u8;
                for i in k..m {
                    let mut p = 1u8;
                    for j in 0..k {
                        a[i * k + j] = p;
                        p = gf256::mul(p, r#gen);
                    }
                    r#gen = gf256::mul(r#gen, 2);
                }
            }
        }
        a
    }
}

/// A systematic GF(256) erasure codec over a fixed generator matrix
#[derive(Clone, Debug)]
pub struct MatrixCodec {
    kind: MatrixKind,
    data_frags: usize,
    parity_frags: usize,
    /// `(data_frags + parity_frags) x data_frags`, row-major
    matrix: Vec<u8>,
}

impl MatrixCodec {
    /// Create a codec for `data_frags + parity_frags` total fragments
    pub fn new(
        kind: MatrixKind,
        data_frags: usize,
        parity_frags: usize,
    ) -> Result<Self, ErasureError> {
        if data_frags == 0 {
            return Err(ErasureError::InvalidConfig("data_frags must be > 0".into()));
        }
        if data_frags > MAX_DATA_FRAGS || parity_frags > MAX_PARITY_FRAGS {
            return Err(ErasureError::InvalidConfig(format!(
                "fragment counts above limits: {data_frags}+{parity_frags}"
            )));
        }
        let m = data_frags + parity_frags;
        let matrix = kind.generate(m, data_frags);
        Ok(Self {
            kind,
            data_frags,
            parity_frags,
            matrix,
        })
    }

    /// The matrix construction in use
    #[must_use]
    pub const fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Number of data fragments (k)
    #[must_use]
    pub const fn data_frags(&self) -> usize {
        self.data_frags
    }

    /// Number of parity fragments (m - k)
    #[must_use]
    pub const fn parity_frags(&self) -> usize {
        self.parity_frags
    }

    /// Generator row at a global fragment position
    fn row(&self, position: usize) -> &[u8] {
        let k = self.data_frags;
        &self.matrix[position * k..(position + 1) * k]
    }

    /// Fill the pre-allocated parity blocks from `data` using the
    /// bottom parity rows of the generator.
    pub fn encode(
        &self,
        data: &[&[u8]],
        parity: &mut [&mut [u8]],
    ) -> Result<(), ErasureError> {
        let k = self.data_frags;
        if data.len() != k || parity.len() != self.parity_frags {
            return Err(ErasureError::EncodingFailed(format!(
                "expected {}+{} blocks, got {}+{}",
                k,
                self.parity_frags,
                data.len(),
                parity.len()
            )));
        }
        let frag_size = data.first().map_or(0, |b| b.len());
        for block in data.iter().map(|b| b.len()).chain(parity.iter().map(|b| b.len())) {
            if block != frag_size {
                return Err(ErasureError::BlockSizeMismatch {
                    expected: frag_size,
                    actual: block,
                });
            }
        }
        gf256::init();
        gf256::matrix_mul_blocks(&self.matrix[k * k..], k, data, parity);
        Ok(())
    }

    /// Reconstruct missing data fragments from any k survivors.
    ///
    /// `available` holds the first k surviving fragment blocks in
    /// ascending global position order and `positions` their global
    /// positions; `missing_data` holds the positions (< k) of the data
    /// fragments to rebuild. Returns the rebuilt blocks in
    /// `missing_data` order.
    pub fn recover(
        &self,
        available: &[&[u8]],
        positions: &[usize],
        missing_data: &[usize],
    ) -> Result<Vec<Vec<u8>>, ErasureError> {
        let k = self.data_frags;
        if available.len() != k || positions.len() != k {
            return Err(ErasureError::DecodingFailed(format!(
                "need exactly {k} surviving blocks, got {}",
                available.len()
            )));
        }
        let frag_size = available[0].len();
        for block in available {
            if block.len() != frag_size {
                return Err(ErasureError::BlockSizeMismatch {
                    expected: frag_size,
                    actual: block.len(),
                });
            }
        }

        // submatrix of the generator rows that survived
        let mut b = vec![0u8; k * k];
        for (i, &pos) in positions.iter().enumerate() {
            b[i * k..(i + 1) * k].copy_from_slice(self.row(pos));
        }
        let inverse = gf256::invert_matrix(&b, k).ok_or(ErasureError::SingularMatrix)?;

        // decode coefficients: the inverse rows of the missing data positions
        let mut rows = Vec::with_capacity(missing_data.len() * k);
        for &pos in missing_data {
            debug_assert!(pos < k);
            rows.extend_from_slice(&inverse[pos * k..(pos + 1) * k]);
        }

        gf256::init();
        let mut out: Vec<Vec<u8>> = vec![vec![0u8; frag_size]; missing_data.len()];
        let mut out_refs: Vec<&mut [u8]> = out.iter_mut().map(Vec::as_mut_slice).collect();
        gf256::matrix_mul_blocks(&rows, k, available, &mut out_refs);
        Ok(out)
    }
}
