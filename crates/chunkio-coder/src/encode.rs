//! Encode pipeline
//!
//! Stage order: digest the input, compress, zero-pad to a multiple of
//! `data_frags`, split into data fragment blocks (encrypting on the
//! way when a cipher is configured), generate the parity blocks, then
//! digest each fragment.
//!
//! Data fragments are zero-copy shared slices of the input when no
//! cipher is configured, and freshly allocated blocks written by the
//! keystream when one is. Parity fragments all slice one backing
//! allocation of `parity_frags * frag_size` bytes.

use crate::cipher::{self, CipherMode, CipherSpec, StreamState};
use crate::coder::{ChunkCoder, resolve_cipher, resolve_digest};
use crate::frag::{Frag, FragRole};
use bytes::BytesMut;
use chunkio_common::{CompressType, Error, compress};
use chunkio_erasure::{ParityCodec, ParityType};

impl ChunkCoder {
    pub(crate) fn encode(&mut self) {
        let cfg = self.config.clone();

        let digest_kind = match resolve_digest(&cfg.digest_type, "digest") {
            Ok(kind) => kind,
            Err(e) => return self.add_error(e),
        };
        let frag_digest_kind = match resolve_digest(&cfg.frag_digest_type, "frag digest") {
            Ok(kind) => kind,
            Err(e) => return self.add_error(e),
        };
        let cipher_spec = match resolve_cipher(&cfg.cipher_type) {
            Ok(spec) => spec,
            Err(e) => return self.add_error(e),
        };

        if self.data.len() != cfg.size {
            return self.add_error(Error::SizeMismatch {
                size: cfg.size,
                data_len: self.data.len(),
            });
        }

        if let Some(kind) = digest_kind {
            self.digest = kind.compute(&self.data);
        }

        if !cfg.compress_type.is_empty() {
            let Ok(ty) = cfg.compress_type.parse::<CompressType>() else {
                return self.add_error(Error::UnsupportedCompressor(cfg.compress_type.clone()));
            };
            if let Err(e) = compress::compress(ty, &mut self.data) {
                return self.add_error(e);
            }
            self.compress_size = self.data.len();
        }

        // align up with zero padding so the data splits evenly
        let padded_size = cfg.padded_size(self.data.len());
        if padded_size > self.data.len() {
            self.data.push_zeros(padded_size - self.data.len());
        }

        self.frag_size = self.data.len() / cfg.data_frags;
        self.frags = (0..cfg.total_frags())
            .map(|i| {
                let role = if i < cfg.data_frags {
                    FragRole::Data(i)
                } else if i < cfg.data_frags + cfg.parity_frags {
                    FragRole::Parity(i - cfg.data_frags)
                } else {
                    FragRole::Lrc(i - cfg.data_frags - cfg.parity_frags)
                };
                Frag::new(role)
            })
            .collect();

        match cipher_spec {
            Some(spec) => self.encrypt_frags(&spec),
            None => self.split_frags(),
        }
        if self.has_errors() {
            return;
        }

        if !cfg.parity_type.is_empty() {
            self.encode_parity();
        }
        if self.has_errors() {
            return;
        }

        if let Some(kind) = frag_digest_kind {
            for frag in &mut self.frags {
                frag.digest = Some(kind.compute(&frag.block));
            }
        }
    }

    /// Split the padded data into data fragment blocks as shared
    /// slices; nothing is copied.
    fn split_frags(&mut self) {
        let data_frags = self.config.data_frags;
        let frag_size = self.frag_size;
        let data = self.data.take();

        let mut fi = 0usize;
        for seg in &data {
            let mut pos = 0usize;
            while pos < seg.len() {
                if fi >= data_frags {
                    return self.add_error(Error::DataFragsExceeded);
                }
                let filled = self.frags[fi].block.len();
                if filled > frag_size {
                    return self.add_error(Error::BlockLenExceeded);
                }
                if filled == frag_size {
                    fi += 1;
                    continue; // recheck against the next fragment
                }
                let len = (frag_size - filled).min(seg.len() - pos);
                self.frags[fi].block.push(seg.slice(pos..pos + len));
                pos += len;
            }
        }

        if fi + 1 != data_frags {
            return self.add_error(Error::DataFragsIncomplete);
        }
        let last = self.frags[fi].block.len();
        if last != frag_size {
            self.add_error(Error::BlockLenIncomplete {
                got: last,
                expected: frag_size,
            });
        }
    }

    /// Encrypt the padded data into freshly allocated per-fragment
    /// blocks, advancing one keystream across the fragments in order.
    fn encrypt_frags(&mut self, spec: &CipherSpec) {
        if self.cipher_key.is_empty() {
            // random key per chunk; the zero IV is safe only because of
            // this uniqueness
            self.cipher_key = cipher::generate_key(spec);
        } else if self.cipher_key.len() != spec.key_len {
            return self.add_error(Error::CipherInitFailed(spec.name.to_string()));
        }
        let mut stream = match StreamState::new(spec, &self.cipher_key) {
            Ok(s) => s,
            Err(e) => return self.add_error(e),
        };

        let data_frags = self.config.data_frags;
        let frag_size = self.frag_size;
        let data = self.data.take();
        let mut blocks: Vec<BytesMut> =
            (0..data_frags).map(|_| BytesMut::zeroed(frag_size)).collect();

        let mut fi = 0usize;
        let mut frag_pos = 0usize;
        let mut failure = None;
        'chunk: for seg in &data {
            let mut pos = 0usize;
            while pos < seg.len() {
                if fi >= data_frags {
                    failure = Some(Error::DataFragsExceeded);
                    break 'chunk;
                }
                if frag_pos > frag_size {
                    failure = Some(Error::BlockLenExceeded);
                    break 'chunk;
                }
                if frag_pos == frag_size {
                    frag_pos = 0;
                    fi += 1;
                    continue; // recheck against the next fragment
                }
                let len = (frag_size - frag_pos).min(seg.len() - pos);
                if let Err(e) =
                    stream.apply(&seg[pos..pos + len], &mut blocks[fi][frag_pos..frag_pos + len])
                {
                    failure = Some(e);
                    break 'chunk;
                }
                pos += len;
                frag_pos += len;
            }
        }
        if let Some(e) = failure {
            return self.add_error(e);
        }
        if fi + 1 != data_frags {
            return self.add_error(Error::DataFragsIncomplete);
        }
        if frag_pos != frag_size {
            return self.add_error(Error::BlockLenIncomplete {
                got: frag_pos,
                expected: frag_size,
            });
        }

        for (frag, block) in self.frags.iter_mut().zip(blocks) {
            frag.block.push(block.freeze());
        }

        if cipher::USE_GCM_AUTH_TAG && spec.mode == CipherMode::Gcm {
            match cipher::compute_gcm_tag(spec, &self.cipher_key, &data.to_vec()) {
                Ok(tag) => self.cipher_auth_tag = tag,
                Err(e) => self.add_error(e),
            }
        }
    }

    /// Generate the parity fragments. All parity blocks slice a single
    /// backing allocation; readers must not observe them before this
    /// stage completes.
    fn encode_parity(&mut self) {
        let data_frags = self.config.data_frags;
        let parity_frags = self.config.parity_frags;

        // an unrecognized parity type produces no parity on encode;
        // decode reports it only if reconstruction is ever needed
        let Ok(ty) = self.config.parity_type.parse::<ParityType>() else {
            return;
        };
        if parity_frags == 0 {
            return;
        }

        let codec = match ParityCodec::new(ty, data_frags, parity_frags) {
            Ok(c) => c,
            Err(e) => return self.add_error(Error::ErasureEncodeFailed(e.to_string())),
        };

        let frag_size = self.frag_size;
        let merged: Vec<bytes::Bytes> = self.frags[..data_frags]
            .iter_mut()
            .map(|f| f.block.merge())
            .collect();
        let data_refs: Vec<&[u8]> = merged.iter().map(AsRef::as_ref).collect();

        let mut parity_buf = BytesMut::zeroed(parity_frags * frag_size);
        if let Err(e) = codec.encode(&data_refs, &mut parity_buf) {
            return self.add_error(Error::ErasureEncodeFailed(format!(
                "{e} frags_count {} frag_size {frag_size} data_frags {data_frags} parity_frags {parity_frags}",
                self.frags.len(),
            )));
        }

        let parity = parity_buf.freeze();
        for i in 0..parity_frags {
            self.frags[data_frags + i]
                .block
                .push(parity.slice(i * frag_size..(i + 1) * frag_size));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoderConfig, Direction};
    use bytes::Bytes;

    fn encode_job(size: usize, data_frags: usize) -> ChunkCoder {
        ChunkCoder::new(CoderConfig {
            direction: Direction::Encode,
            size,
            digest_type: String::new(),
            frag_digest_type: String::new(),
            compress_type: String::new(),
            cipher_type: String::new(),
            parity_type: String::new(),
            data_frags,
            parity_frags: 0,
            lrc_group: 0,
            lrc_frags: 0,
        })
    }

    #[test]
    fn test_split_is_zero_copy() {
        let mut job = encode_job(12, 3);
        let input = Bytes::from_static(b"abcdefghijkl");
        job.push_data(input.clone());
        job.run();
        assert!(!job.has_errors());

        // each data fragment block is a single shared slice of the input
        for (i, frag) in job.frags().iter().enumerate() {
            assert_eq!(frag.block.count(), 1);
            assert_eq!(frag.block.get(0).unwrap().as_ref(), &input[i * 4..(i + 1) * 4]);
        }
    }

    #[test]
    fn test_split_across_segment_boundaries() {
        let mut job = encode_job(10, 2);
        job.push_data(Bytes::from_static(b"abc"));
        job.push_data(Bytes::from_static(b"defg"));
        job.push_data(Bytes::from_static(b"hij"));
        job.run();
        assert!(!job.has_errors());
        assert_eq!(job.frag_size(), 5);
        assert_eq!(job.frags()[0].block.to_vec(), b"abcde".to_vec());
        assert_eq!(job.frags()[1].block.to_vec(), b"fghij".to_vec());
    }

    #[test]
    fn test_padding_is_zeros() {
        let mut job = encode_job(5, 4);
        job.push_data(Bytes::from_static(b"abcde"));
        job.run();
        assert!(!job.has_errors());
        assert_eq!(job.frag_size(), 2);
        assert_eq!(job.frags()[2].block.to_vec(), vec![b'e', 0]);
        assert_eq!(job.frags()[3].block.to_vec(), vec![0, 0]);
    }

    #[test]
    fn test_parity_blocks_share_one_backing() {
        let mut job = encode_job(1024, 4);
        job.config.parity_frags = 3;
        job.config.parity_type = "isa-c1".into();
        job.push_data(Bytes::from(vec![7u8; 1024]));
        job.run();
        assert!(!job.has_errors());

        for i in 0..3 {
            let block = &job.frags()[4 + i].block;
            assert_eq!(block.count(), 1);
            assert_eq!(block.len(), 256);
        }
    }

    #[test]
    fn test_unknown_parity_type_produces_no_parity() {
        let mut job = encode_job(1024, 4);
        job.config.parity_frags = 2;
        job.config.parity_type = "xor9".into();
        job.push_data(Bytes::from(vec![1u8; 1024]));
        job.run();
        assert!(!job.has_errors());
        assert!(job.frags()[4].block.is_empty());
        assert!(job.frags()[5].block.is_empty());
    }

    #[test]
    fn test_encrypted_frags_differ_from_plain() {
        let data = Bytes::from(vec![0u8; 512]);

        let mut plain = encode_job(512, 2);
        plain.push_data(data.clone());
        plain.run();
        assert!(!plain.has_errors());

        let mut enc = encode_job(512, 2);
        enc.config.cipher_type = "aes-128-ctr".into();
        enc.push_data(data);
        enc.run();
        assert!(!enc.has_errors());
        assert_eq!(enc.cipher_key().len(), 16);
        assert!(enc.cipher_auth_tag().is_empty());
        assert_ne!(
            plain.frags()[0].block.to_vec(),
            enc.frags()[0].block.to_vec()
        );
    }
}
