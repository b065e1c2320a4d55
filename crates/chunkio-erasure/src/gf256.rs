//! GF(2^8) arithmetic
//!
//! Field arithmetic over the polynomial `x^8 + x^4 + x^3 + x^2 + 1`
//! (0x11d), the field used by all three parity codecs. Log/exp tables
//! are built at compile time; the full 256x256 product table used by
//! the block multiply-accumulate hot loop is built once per process
//! behind [`init`], which is idempotent and safe to race.

use std::sync::OnceLock;

const POLY: u16 = 0x11d;

/// Exp table doubled to 512 entries so `exp[log a + log b]` never
/// needs a modular reduction.
const fn build_exp_log() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= POLY;
        }
        i += 1;
    }
    let mut j = 255;
    while j < 512 {
        exp[j] = exp[j - 255];
        j += 1;
    }
    (exp, log)
}

const TABLES: ([u8; 512], [u8; 256]) = build_exp_log();
const EXP: [u8; 512] = TABLES.0;
const LOG: [u8; 256] = TABLES.1;

static MUL_TABLE: OnceLock<Vec<[u8; 256]>> = OnceLock::new();

/// Force the one-time build of the product table.
///
/// Idempotent and thread-safe; every entry point that uses the table
/// goes through it, so calling this up front is an optimization, not a
/// requirement.
pub fn init() {
    mul_table();
}

fn mul_table() -> &'static [[u8; 256]] {
    MUL_TABLE.get_or_init(|| {
        let mut table = vec![[0u8; 256]; 256];
        for (c, row) in table.iter_mut().enumerate() {
            for (x, out) in row.iter_mut().enumerate() {
                *out = mul(c as u8, x as u8);
            }
        }
        table
    })
}

/// Field addition (and subtraction)
#[inline]
#[must_use]
pub const fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field multiplication
#[inline]
#[must_use]
pub const fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        0
    } else {
        EXP[LOG[a as usize] as usize + LOG[b as usize] as usize]
    }
}

/// Multiplicative inverse; `inv(0)` is undefined and returns 0
#[inline]
#[must_use]
pub const fn inv(a: u8) -> u8 {
    if a == 0 {
        0
    } else {
        EXP[255 - LOG[a as usize] as usize]
    }
}

/// `dst[i] ^= c * src[i]` over the overlapping length
pub fn mul_acc_slice(dst: &mut [u8], src: &[u8], c: u8) {
    if c == 0 {
        return;
    }
    let row = &mul_table()[c as usize];
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= row[*s as usize];
    }
}

/// Multiply a block matrix: for each coefficient row r (k entries),
/// `outputs[r] = sum_j rows[r*k + j] * inputs[j]`. Outputs are zeroed
/// first; all slices must share one length.
pub fn matrix_mul_blocks(rows: &[u8], k: usize, inputs: &[&[u8]], outputs: &mut [&mut [u8]]) {
    debug_assert_eq!(inputs.len(), k);
    debug_assert_eq!(rows.len(), k * outputs.len());
    for (r, out) in outputs.iter_mut().enumerate() {
        out.fill(0);
        for (j, input) in inputs.iter().enumerate() {
            mul_acc_slice(out, input, rows[r * k + j]);
        }
    }
}

/// Invert an `n x n` row-major matrix by Gauss-Jordan elimination.
///
/// Returns `None` when the matrix is singular.
#[must_use]
pub fn invert_matrix(a: &[u8], n: usize) -> Option<Vec<u8>> {
    debug_assert_eq!(a.len(), n * n);
    let mut m = a.to_vec();
    let mut out = vec![0u8; n * n];
    for i in 0..n {
        out[i * n + i] = 1;
    }

    for col in 0..n {
        // pivot search in this column
        let pivot = (col..n).find(|&r| m[r * n + col] != 0)?;
        if pivot != col {
            for j in 0..n {
                m.swap(pivot * n + j, col * n + j);
                out.swap(pivot * n + j, col * n + j);
            }
        }

        // normalize the pivot row
        let d = inv(m[col * n + col]);
        if d != 1 {
            for j in 0..n {
                m[col * n + j] = mul(m[col * n + j], d);
                out[col * n + j] = mul(out[col * n + j], d);
            }
        }

        // eliminate the column everywhere else
        for r in 0..n {
            if r == col {
                continue;
            }
            let f = m[r * n + col];
            if f == 0 {
                continue;
            }
            for j in 0..n {
                m[r * n + j] ^= mul(f, m[col * n + j]);
                out[r * n + j] ^= mul(f, out[col * n + j]);
            }
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn test_exp_log_consistency() {
        for a in 1..=255u8 {
            assert_eq!(EXP[LOG[a as usize] as usize], a);
        }
    }

    #[test]
    fn test_mul_identities() {
        for a in 0..=255u8 {
            assert_eq!(mul(a, 1), a);
            assert_eq!(mul(1, a), a);
            assert_eq!(mul(a, 0), 0);
        }
        // commutativity spot checks
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let a: u8 = rng.r#gen();
            let b: u8 = rng.r#gen();
            let c: u8 = rng.r#gen();
            assert_eq!(mul(a, b), mul(b, a));
            assert_eq!(mul(a, mul(b, c)), mul(mul(a, b), c));
            assert_eq!(mul(a, add(b, c)), add(mul(a, b), mul(a, c)));
        }
    }

    #[test]
    fn test_inverse() {
        for a in 1..=255u8 {
            assert_eq!(mul(a, inv(a)), 1, "a = {a}");
        }
    }

    #[test]
    fn test_mul_acc_slice_matches_scalar() {
        init();
        let mut rng = StdRng::seed_from_u64(2);
        let src: Vec<u8> = (0..64).map(|_| rng.r#gen()).collect();
        let mut dst: Vec<u8> = (0..64).map(|_| rng.r#gen()).collect();
        let expect: Vec<u8> = dst
            .iter()
            .zip(&src)
            .map(|(&d, &s)| d ^ mul(0xa7, s))
            .collect();
        mul_acc_slice(&mut dst, &src, 0xa7);
        assert_eq!(dst, expect);
    }

    #[test]
    fn test_invert_matrix_roundtrip() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 8;
        // random matrices are overwhelmingly invertible; retry until one is
        loop {
            let m: Vec<u8> = (0..n * n).map(|_| rng.r#gen()).collect();
            let Some(inv_m) = invert_matrix(&m, n) else {
                continue;
            };
            // m * inv_m must be the identity
            for i in 0..n {
                for j in 0..n {
                    let mut acc = 0u8;
                    for l in 0..n {
                        acc ^= mul(m[i * n + l], inv_m[l * n + j]);
                    }
                    assert_eq!(acc, u8::from(i == j), "({i},{j})");
                }
            }
            break;
        }
    }

    #[test]
    fn test_invert_singular_matrix() {
        // two identical rows
        let m = vec![
            1, 2, 3, //
            1, 2, 3, //
            4, 5, 6,
        ];
        assert!(invert_matrix(&m, 3).is_none());

        let zero = vec![0u8; 16];
        assert!(invert_matrix(&zero, 4).is_none());
    }
}
