//! Cipher adapter
//!
//! The coder only accepts byte-stream-compatible symmetric ciphers
//! (block size 1); block-mode names resolve but are rejected by the
//! pipeline. The IV is always zeros because the key is unique per
//! chunk; any future key reuse across chunks would require a real
//! per-chunk IV, so that discipline must not be relaxed here.
//!
//! GCM runs as its CTR keystream (J0 = zero nonce || 1, payload counter
//! starting at 2). The auth tag is not captured nor verified by
//! default: the whole-chunk digest is already authoritative for
//! integrity. [`USE_GCM_AUTH_TAG`] is the single toggle governing
//! both capture and verification.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use bytes::Bytes;
use chunkio_common::{Error, Result};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::{Ctr32BE, Ctr128BE};
use rand::RngCore;

/// Capture and verify the GCM auth tag. Disabled: the chunk digest
/// covers data integrity and skipping the tag saves a pass.
pub const USE_GCM_AUTH_TAG: bool = false;

/// GCM auth tag length in bytes
pub const GCM_TAG_LEN: usize = 16;

type Aes128Ctr = Ctr128BE<Aes128>;
type Aes192Ctr = Ctr128BE<Aes192>;
type Aes256Ctr = Ctr128BE<Aes256>;
type Aes128GcmStream = Ctr32BE<Aes128>;
type Aes256GcmStream = Ctr32BE<Aes256>;

/// Operating mode of a resolved cipher
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipherMode {
    Ctr,
    Gcm,
    Cbc,
}

/// A cipher resolved by name from the registry
#[derive(Clone, Copy, Debug)]
pub struct CipherSpec {
    pub name: &'static str,
    pub key_len: usize,
    pub iv_len: usize,
    pub block_size: usize,
    pub mode: CipherMode,
}

/// Resolve a cipher name. Returns `None` for unknown names; the
/// pipeline separately rejects resolvable ciphers whose block size is
/// not 1.
#[must_use]
pub fn resolve(name: &str) -> Option<CipherSpec> {
    let spec = match name {
        "aes-128-ctr" => CipherSpec {
            name: "aes-128-ctr",
            key_len: 16,
            iv_len: 16,
            block_size: 1,
            mode: CipherMode::Ctr,
        },
        "aes-192-ctr" => CipherSpec {
            name: "aes-192-ctr",
            key_len: 24,
            iv_len: 16,
            block_size: 1,
            mode: CipherMode::Ctr,
        },
        "aes-256-ctr" => CipherSpec {
            name: "aes-256-ctr",
            key_len: 32,
            iv_len: 16,
            block_size: 1,
            mode: CipherMode::Ctr,
        },
        "aes-128-gcm" => CipherSpec {
            name: "aes-128-gcm",
            key_len: 16,
            iv_len: 12,
            block_size: 1,
            mode: CipherMode::Gcm,
        },
        "aes-256-gcm" => CipherSpec {
            name: "aes-256-gcm",
            key_len: 32,
            iv_len: 12,
            block_size: 1,
            mode: CipherMode::Gcm,
        },
        // block modes resolve so the block-size check can reject them
        "aes-128-cbc" => CipherSpec {
            name: "aes-128-cbc",
            key_len: 16,
            iv_len: 16,
            block_size: 16,
            mode: CipherMode::Cbc,
        },
        "aes-256-cbc" => CipherSpec {
            name: "aes-256-cbc",
            key_len: 32,
            iv_len: 16,
            block_size: 16,
            mode: CipherMode::Cbc,
        },
        _ => return None,
    };
    Some(spec)
}

/// Generate a random per-chunk key of the cipher's key length
#[must_use]
pub fn generate_key(spec: &CipherSpec) -> Bytes {
    let mut key = vec![0u8; spec.key_len];
    rand::thread_rng().fill_bytes(&mut key);
    Bytes::from(key)
}

enum Inner {
    Aes128Ctr(Box<Aes128Ctr>),
    Aes192Ctr(Box<Aes192Ctr>),
    Aes256Ctr(Box<Aes256Ctr>),
    Aes128Gcm(Box<Aes128GcmStream>),
    Aes256Gcm(Box<Aes256GcmStream>),
}

/// Streaming cipher state. Encrypt and decrypt are the same keystream
/// XOR; the state advances across calls, so feeding the chunk in
/// arbitrary splits produces the same bytes as one pass.
pub struct StreamState {
    name: &'static str,
    inner: Inner,
}

impl StreamState {
    /// Initialize the keystream for a resolved cipher and key.
    ///
    /// The IV is zeros; GCM starts its 32-bit counter at 2, matching
    /// the AEAD construction for a 96-bit nonce.
    pub fn new(spec: &CipherSpec, key: &[u8]) -> Result<Self> {
        if key.len() != spec.key_len {
            return Err(Error::CipherInitFailed(spec.name.into()));
        }
        let ctr_iv = [0u8; 16];
        let mut gcm_iv = [0u8; 16];
        gcm_iv[15] = 2;

        let inner = match (spec.name, spec.mode) {
            ("aes-128-ctr", CipherMode::Ctr) => Inner::Aes128Ctr(Box::new(
                Aes128Ctr::new_from_slices(key, &ctr_iv)
                    .map_err(|_| Error::CipherInitFailed(spec.name.into()))?,
            )),
            ("aes-192-ctr", CipherMode::Ctr) => Inner::Aes192Ctr(Box::new(
                Aes192Ctr::new_from_slices(key, &ctr_iv)
                    .map_err(|_| Error::CipherInitFailed(spec.name.into()))?,
            )),
            ("aes-256-ctr", CipherMode::Ctr) => Inner::Aes256Ctr(Box::new(
                Aes256Ctr::new_from_slices(key, &ctr_iv)
                    .map_err(|_| Error::CipherInitFailed(spec.name.into()))?,
            )),
            ("aes-128-gcm", CipherMode::Gcm) => Inner::Aes128Gcm(Box::new(
                Aes128GcmStream::new_from_slices(key, &gcm_iv)
                    .map_err(|_| Error::CipherInitFailed(spec.name.into()))?,
            )),
            ("aes-256-gcm", CipherMode::Gcm) => Inner::Aes256Gcm(Box::new(
                Aes256GcmStream::new_from_slices(key, &gcm_iv)
                    .map_err(|_| Error::CipherInitFailed(spec.name.into()))?,
            )),
            _ => return Err(Error::CipherInitFailed(spec.name.into())),
        };
        Ok(Self {
            name: spec.name,
            inner,
        })
    }

    /// Apply the keystream: `dst = src XOR keystream`. Lengths must
    /// match.
    pub fn apply(&mut self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        let res = match &mut self.inner {
            Inner::Aes128Ctr(c) => c.apply_keystream_b2b(src, dst),
            Inner::Aes192Ctr(c) => c.apply_keystream_b2b(src, dst),
            Inner::Aes256Ctr(c) => c.apply_keystream_b2b(src, dst),
            Inner::Aes128Gcm(c) => c.apply_keystream_b2b(src, dst),
            Inner::Aes256Gcm(c) => c.apply_keystream_b2b(src, dst),
        };
        res.map_err(|_| Error::CipherUpdateFailed(self.name.into()))
    }
}

/// Compute the GCM auth tag for the whole plaintext in one AEAD pass.
/// Only used when [`USE_GCM_AUTH_TAG`] is enabled.
pub fn compute_gcm_tag(spec: &CipherSpec, key: &[u8], plaintext: &[u8]) -> Result<Bytes> {
    let nonce = Nonce::from_slice(&[0u8; 12]);
    let sealed = match spec.name {
        "aes-128-gcm" => Aes128Gcm::new_from_slice(key)
            .map_err(|_| Error::CipherGetTagFailed(spec.name.into()))?
            .encrypt(nonce, plaintext),
        "aes-256-gcm" => Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::CipherGetTagFailed(spec.name.into()))?
            .encrypt(nonce, plaintext),
        _ => return Err(Error::CipherGetTagFailed(spec.name.into())),
    }
    .map_err(|_| Error::CipherGetTagFailed(spec.name.into()))?;
    let tag_start = sealed.len() - GCM_TAG_LEN;
    Ok(Bytes::copy_from_slice(&sealed[tag_start..]))
}

/// Verify a captured GCM auth tag against the reassembled ciphertext.
/// Only used when [`USE_GCM_AUTH_TAG`] is enabled and a tag was
/// supplied.
pub fn verify_gcm_tag(
    spec: &CipherSpec,
    key: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<()> {
    if tag.len() != GCM_TAG_LEN {
        return Err(Error::CipherSetTagFailed(spec.name.into()));
    }
    let nonce = Nonce::from_slice(&[0u8; 12]);
    let mut sealed = Vec::with_capacity(ciphertext.len() + GCM_TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);
    let opened = match spec.name {
        "aes-128-gcm" => Aes128Gcm::new_from_slice(key)
            .map_err(|_| Error::CipherSetTagFailed(spec.name.into()))?
            .decrypt(nonce, sealed.as_slice()),
        "aes-256-gcm" => Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::CipherSetTagFailed(spec.name.into()))?
            .decrypt(nonce, sealed.as_slice()),
        _ => return Err(Error::CipherSetTagFailed(spec.name.into())),
    };
    opened
        .map(|_| ())
        .map_err(|_| Error::CipherFinalFailed(spec.name.into()))
}
