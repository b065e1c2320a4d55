//! The coder job
//!
//! A single-shot transformer: populate a job with a configuration and
//! input material, call [`run`](ChunkCoder::run), read back output
//! material or the error list. The job is consumed by the call in the
//! sense that a finished job is not reusable; dropping it releases
//! every owned allocation, and shared slices release with their last
//! holder.
//!
//! Errors accumulate in an ordered list. Once the list is non-empty
//! every remaining stage is skipped, but cleanup still happens on
//! drop. Nothing is retried internally.

use crate::cipher::{self, CipherSpec};
use crate::config::{CoderConfig, Direction};
use crate::frag::Frag;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chunkio_common::{BufList, DigestKind, Error, Result};

/// Process-wide one-time initialization.
///
/// Must complete before the first cm256 encode/decode; it is
/// idempotent and every codec entry point performs it implicitly, so
/// calling it up front only moves the table build off the first job.
pub fn init() {
    chunkio_erasure::init();
}

/// A per-chunk coder job
pub struct ChunkCoder {
    pub(crate) config: CoderConfig,
    pub(crate) data: BufList,
    pub(crate) frags: Vec<Frag>,
    pub(crate) digest: Bytes,
    pub(crate) cipher_key: Bytes,
    pub(crate) cipher_auth_tag: Bytes,
    pub(crate) compress_size: usize,
    pub(crate) frag_size: usize,
    errors: Vec<Error>,
}

impl ChunkCoder {
    /// Create a job for the given configuration
    #[must_use]
    pub fn new(config: CoderConfig) -> Self {
        Self {
            config,
            data: BufList::new(),
            frags: Vec::new(),
            digest: Bytes::new(),
            cipher_key: Bytes::new(),
            cipher_auth_tag: Bytes::new(),
            compress_size: 0,
            frag_size: 0,
            errors: Vec::new(),
        }
    }

    /// The job configuration
    #[must_use]
    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    // ---- binding-surface inputs ----

    /// Append an input data buffer (encode)
    pub fn push_data(&mut self, buf: Bytes) {
        self.data.push(buf);
    }

    /// Replace the input data (encode)
    pub fn set_data(&mut self, data: BufList) {
        self.data = data;
    }

    /// Supply the input fragments (decode)
    pub fn set_frags(&mut self, frags: Vec<Frag>) {
        self.frags = frags;
    }

    /// Supply a pre-existing chunk digest (decode, or encode carrying
    /// a recorded digest forward)
    pub fn set_digest(&mut self, digest: Bytes) {
        self.digest = digest;
    }

    /// Supply the cipher key (decode, or caller-chosen key on encode)
    pub fn set_cipher_key(&mut self, key: Bytes) {
        self.cipher_key = key;
    }

    /// Supply a captured cipher auth tag (decode)
    pub fn set_cipher_auth_tag(&mut self, tag: Bytes) {
        self.cipher_auth_tag = tag;
    }

    /// Supply the recorded compressed size (decode)
    pub fn set_compress_size(&mut self, size: usize) {
        self.compress_size = size;
    }

    /// Supply the fragment size recorded at encode (decode)
    pub fn set_frag_size(&mut self, size: usize) {
        self.frag_size = size;
    }

    // ---- outputs ----

    /// Fragment size after encode
    #[must_use]
    pub fn frag_size(&self) -> usize {
        self.frag_size
    }

    /// Compressed size after encode; 0 when compression was not
    /// configured
    #[must_use]
    pub fn compress_size(&self) -> usize {
        self.compress_size
    }

    /// Whole-chunk digest (empty when not configured)
    #[must_use]
    pub fn digest(&self) -> &Bytes {
        &self.digest
    }

    /// Whole-chunk digest, base64 (the form the host binding ships)
    #[must_use]
    pub fn digest_b64(&self) -> String {
        BASE64.encode(&self.digest)
    }

    /// Cipher key (empty when no cipher configured)
    #[must_use]
    pub fn cipher_key(&self) -> &Bytes {
        &self.cipher_key
    }

    /// Cipher key, base64
    #[must_use]
    pub fn cipher_key_b64(&self) -> String {
        BASE64.encode(&self.cipher_key)
    }

    /// Captured cipher auth tag (empty unless tag capture is enabled)
    #[must_use]
    pub fn cipher_auth_tag(&self) -> &Bytes {
        &self.cipher_auth_tag
    }

    /// Captured cipher auth tag, base64
    #[must_use]
    pub fn cipher_auth_tag_b64(&self) -> String {
        BASE64.encode(&self.cipher_auth_tag)
    }

    /// The fragment array (populated by encode)
    #[must_use]
    pub fn frags(&self) -> &[Frag] {
        &self.frags
    }

    /// Take the fragment array out of the job
    #[must_use]
    pub fn take_frags(&mut self) -> Vec<Frag> {
        std::mem::take(&mut self.frags)
    }

    /// The chunk data (populated by decode)
    #[must_use]
    pub fn data(&self) -> &BufList {
        &self.data
    }

    /// Take the chunk data out of the job
    #[must_use]
    pub fn take_data(&mut self) -> BufList {
        self.data.take()
    }

    // ---- errors ----

    pub(crate) fn add_error(&mut self, err: Error) {
        self.errors.push(err);
    }

    /// Whether any stage has failed
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The ordered error list
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// The ordered error list as human-readable strings (the binding
    /// surface representation)
    #[must_use]
    pub fn error_strings(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    // ---- execution ----

    /// Run the pipeline in the configured direction. All effects are
    /// on the job: outputs populated on success, the error list on
    /// failure.
    pub fn run(&mut self) {
        if self.has_errors() {
            return;
        }
        if let Err(e) = self.config.validate() {
            self.add_error(e);
            return;
        }
        match self.config.direction {
            Direction::Encode => self.encode(),
            Direction::Decode => self.decode(),
        }
    }
}

/// Resolve an optional digest name; `kind` labels the error ("digest"
/// or "frag digest").
pub(crate) fn resolve_digest(name: &str, kind: &'static str) -> Result<Option<DigestKind>> {
    if name.is_empty() {
        return Ok(None);
    }
    name.parse().map(Some).map_err(|_| Error::UnsupportedAlgorithm {
        kind,
        name: name.to_string(),
    })
}

/// Resolve an optional cipher name, rejecting non-stream ciphers.
pub(crate) fn resolve_cipher(name: &str) -> Result<Option<CipherSpec>> {
    if name.is_empty() {
        return Ok(None);
    }
    let spec = cipher::resolve(name).ok_or_else(|| Error::UnsupportedCipher(name.to_string()))?;
    if spec.block_size != 1 {
        return Err(Error::UnsupportedCipherBlockSize {
            name: name.to_string(),
            block_size: spec.block_size,
        });
    }
    Ok(Some(spec))
}
