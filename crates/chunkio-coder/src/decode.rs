//! Decode pipeline
//!
//! Stage order: validate the supplied fragments into a positional map,
//! reconstruct missing data fragments through the parity strategy,
//! concatenate (decrypting on the way when a cipher is configured),
//! truncate the padding, decompress, and verify the chunk digest.
//!
//! Fragment validation is non-destructive: a fragment with the wrong
//! size, a stale digest, a duplicate index or an unknown role is
//! skipped (with a warning), never an error by itself. Errors arise
//! only when the surviving set cannot reconstruct the chunk.

use crate::cipher::{self, CipherMode, CipherSpec, StreamState};
use crate::coder::{ChunkCoder, resolve_cipher, resolve_digest};
use crate::frag::FragRole;
use bytes::{Bytes, BytesMut};
use chunkio_common::{BufList, CompressType, DigestKind, Error, compress};
use chunkio_erasure::{Cm256Codec, CmBlock, MatrixCodec, ParityCodec, ParityType};
use chunkio_erasure::ErasureError;
use tracing::warn;

/// Positional map: global fragment position → index into the job's
/// fragment array.
type FragsMap = Vec<Option<usize>>;

/// Availability counters carried into the erasure error reports
#[derive(Clone, Copy)]
struct Avail {
    data: usize,
    parity: usize,
}

impl ChunkCoder {
    pub(crate) fn decode(&mut self) {
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

        if self.frags.len() < cfg.data_frags {
            return self.add_error(Error::MissingDataFrags {
                got: self.frags.len(),
                need: cfg.data_frags,
            });
        }

        let decrypted_size = if self.compress_size > 0 {
            self.compress_size
        } else {
            cfg.size
        };
        let padded_size = cfg.padded_size(decrypted_size);
        let expected_frag_size = padded_size / cfg.data_frags;
        if self.frag_size != expected_frag_size {
            return self.add_error(Error::FragSizeMismatch {
                frag_size: self.frag_size,
                expected: expected_frag_size,
            });
        }

        let Some(data_slots) = self.derasure(frag_digest_kind) else {
            return;
        };

        match cipher_spec {
            Some(spec) => self.decrypt_data(&spec, &data_slots, padded_size),
            None => self.concat_data(&data_slots),
        }
        if self.has_errors() {
            return;
        }

        if self.data.len() < decrypted_size || self.data.len() > padded_size {
            return self.add_error(Error::SizeMismatch {
                size: decrypted_size,
                data_len: self.data.len(),
            });
        }
        self.data.truncate(decrypted_size);

        if !cfg.compress_type.is_empty() {
            let Ok(ty) = cfg.compress_type.parse::<CompressType>() else {
                return self.add_error(Error::UnsupportedCompressor(cfg.compress_type.clone()));
            };
            if let Err(e) = compress::decompress(ty, &mut self.data, cfg.size) {
                return self.add_error(e);
            }
        }

        // the chunk must come back at exactly the size it was encoded at
        if self.data.len() != cfg.size {
            return self.add_error(Error::SizeMismatch {
                size: cfg.size,
                data_len: self.data.len(),
            });
        }

        if let Some(kind) = digest_kind {
            if !kind.matches(&self.data, &self.digest) {
                self.add_error(Error::ChunkDigestMismatch(cfg.digest_type.clone()));
            }
        }
    }

    /// Build the positional map from the supplied fragments and, when
    /// data fragments are missing, reconstruct them through the
    /// configured parity strategy. Returns the fragment-array indices
    /// of the k data positions, or `None` after recording an error.
    fn derasure(&mut self, frag_digest_kind: Option<DigestKind>) -> Option<Vec<usize>> {
        let k = self.config.data_frags;
        let parity_frags = self.config.parity_frags;
        let m = k + parity_frags;
        let total_frags = self.config.total_frags();
        let lrc_total = total_frags - m;

        let mut map: FragsMap = vec![None; total_frags];
        let mut avail = Avail { data: 0, parity: 0 };

        for i in 0..self.frags.len() {
            let index = match self.frags[i].role {
                FragRole::Data(d) if d < k => d,
                FragRole::Parity(p) if p < parity_frags => k + p,
                FragRole::Lrc(l) if l < lrc_total => continue, // lrc not yet applicable
                _ => continue,                                 // invalid index
            };
            let block_len = self.frags[i].block.len();
            if block_len != self.frag_size {
                if block_len != 0 {
                    warn!(
                        frag = i,
                        index,
                        block_len,
                        frag_size = self.frag_size,
                        "frag size mismatch"
                    );
                }
                continue;
            }
            if map[index].is_some() {
                continue; // duplicate frag
            }
            if let Some(kind) = frag_digest_kind {
                let matched = match &self.frags[i].digest {
                    Some(digest) => kind.matches(&self.frags[i].block, digest),
                    None => false,
                };
                if !matched {
                    warn!(frag = i, index, "frag digest mismatch");
                    continue;
                }
            }
            map[index] = Some(i);
            if index < k {
                avail.data += 1;
            } else {
                avail.parity += 1;
            }
        }

        if avail.data < k {
            if parity_frags == 0 {
                self.add_error(Error::MissingDataFragsNoParity);
                return None;
            }
            if avail.data + avail.parity < k {
                self.add_error(Error::NotEnoughParity {
                    data_avail: avail.data,
                    data_frags: k,
                    parity_avail: avail.parity,
                    parity_frags,
                });
                return None;
            }
            let Ok(ty) = self.config.parity_type.parse::<ParityType>() else {
                self.add_error(Error::ErasureBadType(self.config.parity_type.clone()));
                return None;
            };
            let codec = match ParityCodec::new(ty, k, parity_frags) {
                Ok(c) => c,
                Err(e) => {
                    self.add_error(Error::ErasureDecodeFailed(e.to_string()));
                    return None;
                }
            };
            match codec {
                ParityCodec::Matrix(mc) => self.derasure_matrix(&mc, &mut map, avail)?,
                ParityCodec::Cm256(cc) => self.derasure_cm(&cc, &mut map, avail)?,
            }
        }

        let mut slots = Vec::with_capacity(k);
        for slot in map.iter().take(k) {
            match slot {
                Some(fi) => slots.push(*fi),
                None => {
                    self.add_error(Error::internal("data slot unfilled after erasure"));
                    return None;
                }
            }
        }
        Some(slots)
    }

    /// Matrix-codec reconstruction: invert the surviving-row submatrix
    /// and rebuild the missing data fragments, then rewrite the map so
    /// each rebuilt block takes over a spent parity fragment's slot.
    fn derasure_matrix(
        &mut self,
        codec: &MatrixCodec,
        map: &mut FragsMap,
        avail: Avail,
    ) -> Option<()> {
        let k = self.config.data_frags;
        let m = k + self.config.parity_frags;

        // first k available positions in ascending order; the holes
        // below k are the data fragments to rebuild
        let mut positions = Vec::with_capacity(k);
        let mut missing_data = Vec::new();
        let mut blocks: Vec<Bytes> = Vec::with_capacity(k);
        let mut r = 0usize;
        for _ in 0..k {
            while r < m && map[r].is_none() {
                if r < k {
                    missing_data.push(r);
                }
                r += 1;
            }
            if r >= m {
                self.add_error(Error::internal("available fragments exhausted"));
                return None;
            }
            let fi = map[r].expect("position checked above");
            blocks.push(self.frags[fi].block.merge());
            positions.push(r);
            r += 1;
        }

        let block_refs: Vec<&[u8]> = blocks.iter().map(AsRef::as_ref).collect();
        let rebuilt = match codec.recover(&block_refs, &positions, &missing_data) {
            Ok(out) => out,
            Err(ErasureError::SingularMatrix) => {
                self.add_error(Error::ErasureDecodeInvert {
                    data_avail: avail.data,
                    data_frags: k,
                    parity_avail: avail.parity,
                    parity_frags: self.config.parity_frags,
                });
                return None;
            }
            Err(e) => {
                self.add_error(Error::ErasureDecodeFailed(e.to_string()));
                return None;
            }
        };

        // each rebuilt block is attached to a surviving parity
        // fragment, reassigned to the recovered data index
        let mut r = k;
        for (buf, &data_pos) in rebuilt.into_iter().zip(&missing_data) {
            while r < m && map[r].is_none() {
                r += 1;
            }
            if r >= m {
                self.add_error(Error::internal("parity fragments exhausted"));
                return None;
            }
            let fi = map[r].take().expect("position checked above");
            self.frags[fi].role = FragRole::Data(data_pos);
            self.frags[fi].block = BufList::from(Bytes::from(buf));
            self.frags[fi].digest = None;
            map[data_pos] = Some(fi);
            r += 1;
        }
        Some(())
    }

    /// cm256 reconstruction: compact parity fragments into the data
    /// holes, hand the index-tagged blocks to the codec, and write the
    /// in-place-recovered blocks back.
    fn derasure_cm(&mut self, codec: &Cm256Codec, map: &mut FragsMap, avail: Avail) -> Option<()> {
        let k = self.config.data_frags;
        let parity_frags = self.config.parity_frags;
        let m = k + parity_frags;

        // pull the next available parity (ascending) into each hole
        let mut next_parity = k;
        for i in 0..k {
            while map[i].is_none() {
                if next_parity >= m {
                    self.add_error(Error::internal("parity fragments exhausted"));
                    return None;
                }
                map[i] = map[next_parity].take();
                next_parity += 1;
            }
        }

        let mut blocks = Vec::with_capacity(k);
        for slot in map.iter().take(k) {
            let fi = slot.expect("compaction filled all data slots");
            let index = match self.frags[fi].role {
                FragRole::Data(d) => d,
                FragRole::Parity(p) => k + p,
                FragRole::Lrc(_) => {
                    self.add_error(Error::internal("lrc fragment in decode map"));
                    return None;
                }
            };
            blocks.push(CmBlock {
                index,
                data: self.frags[fi].block.merge().to_vec(),
            });
        }

        if let Err(e) = codec.decode(&mut blocks) {
            self.add_error(Error::ErasureDecodeFailed(format!(
                "{e} data_frags {}/{k} parity_frags {}/{parity_frags}",
                avail.data, avail.parity,
            )));
            return None;
        }

        // the codec leaves slot i holding data fragment i
        for (i, block) in blocks.into_iter().enumerate() {
            let fi = map[i].expect("compaction filled all data slots");
            if !matches!(self.frags[fi].role, FragRole::Data(d) if d == i) {
                self.frags[fi].role = FragRole::Data(i);
                self.frags[fi].block = BufList::from(block.data);
                self.frags[fi].digest = None;
            }
        }
        Some(())
    }

    /// Zero-copy concatenation of the reconstructed data fragments
    fn concat_data(&mut self, data_slots: &[usize]) {
        for &fi in data_slots {
            for seg in self.frags[fi].block.iter() {
                self.data.push(seg.clone());
            }
        }
    }

    /// Decrypt the reconstructed data fragments into one contiguous
    /// output buffer, feeding the keystream in global index order.
    fn decrypt_data(&mut self, spec: &CipherSpec, data_slots: &[usize], padded_size: usize) {
        let mut stream = match StreamState::new(spec, &self.cipher_key) {
            Ok(s) => s,
            Err(e) => return self.add_error(e),
        };

        let mut out = BytesMut::zeroed(padded_size);
        let mut pos = 0usize;
        let mut failure = None;
        'frags: for &fi in data_slots {
            for seg in self.frags[fi].block.iter() {
                if pos + seg.len() > padded_size {
                    failure = Some(Error::BlockLenExceeded);
                    break 'frags;
                }
                if let Err(e) = stream.apply(seg, &mut out[pos..pos + seg.len()]) {
                    failure = Some(e);
                    break 'frags;
                }
                pos += seg.len();
            }
        }
        if let Some(e) = failure {
            return self.add_error(e);
        }
        if pos != padded_size {
            return self.add_error(Error::BlockLenIncomplete {
                got: pos,
                expected: padded_size,
            });
        }

        if cipher::USE_GCM_AUTH_TAG && spec.mode == CipherMode::Gcm {
            if self.cipher_auth_tag.is_empty() {
                // no tag captured; final-block auth failure is tolerated
            } else {
                let mut ciphertext = Vec::with_capacity(padded_size);
                for &fi in data_slots {
                    for seg in self.frags[fi].block.iter() {
                        ciphertext.extend_from_slice(seg);
                    }
                }
                if let Err(e) = cipher::verify_gcm_tag(
                    spec,
                    &self.cipher_key,
                    &ciphertext,
                    &self.cipher_auth_tag,
                ) {
                    return self.add_error(e);
                }
            }
        }

        self.data.push(out.freeze());
    }
}
