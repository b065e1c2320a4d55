//! Segmented buffer list
//!
//! All stage I/O in the coder flows through `BufList`: an ordered
//! sequence of byte segments that supports appending owned or shared
//! segments, zero-padding, truncation, and materialization of a
//! contiguous view. Segments are `Bytes`, so a slice pushed out of
//! another buffer is zero-copy and the backing allocation lives until
//! the last holder drops it. Owners never form cycles; the segment
//! graph is a forest rooted at the original allocations.

use bytes::{BufMut, Bytes, BytesMut};

/// An ordered list of byte segments with a cached total length.
///
/// All operations are O(segments); none copy data except [`merge`]
/// on a multi-segment list and [`to_vec`].
///
/// [`merge`]: BufList::merge
/// [`to_vec`]: BufList::to_vec
#[derive(Clone, Debug, Default)]
pub struct BufList {
    segs: Vec<Bytes>,
    len: usize,
}

impl BufList {
    /// Create an empty buffer list
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segs: Vec::new(),
            len: 0,
        }
    }

    /// Append a segment. `Bytes` is refcounted, so this covers both
    /// owned buffers and shared slices into other buffers.
    pub fn push(&mut self, seg: Bytes) {
        if seg.is_empty() {
            return;
        }
        self.len += seg.len();
        self.segs.push(seg);
    }

    /// Append a zero-filled run of `count` bytes
    pub fn push_zeros(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let mut zeros = BytesMut::with_capacity(count);
        zeros.put_bytes(0, count);
        self.push(zeros.freeze());
    }

    /// Get the segment at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Bytes> {
        self.segs.get(index)
    }

    /// Number of segments
    #[must_use]
    pub fn count(&self) -> usize {
        self.segs.len()
    }

    /// Total length in bytes across all segments
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no bytes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over the segments in order
    pub fn iter(&self) -> std::slice::Iter<'_, Bytes> {
        self.segs.iter()
    }

    /// Truncate the total length to `len` bytes, dropping and slicing
    /// trailing segments as needed. No-op if `len >= self.len()`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let mut remaining = len;
        let mut keep = 0;
        for seg in &mut self.segs {
            if remaining == 0 {
                break;
            }
            if seg.len() > remaining {
                *seg = seg.slice(..remaining);
            }
            remaining -= seg.len();
            keep += 1;
        }
        self.segs.truncate(keep);
        self.len = len;
    }

    /// Remove all segments
    pub fn clear(&mut self) {
        self.segs.clear();
        self.len = 0;
    }

    /// Take the contents, leaving this list empty
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Materialize a contiguous view of the whole list.
    ///
    /// A single-segment list returns a zero-copy handle to its segment.
    /// A multi-segment list is collapsed into one owned segment (the
    /// list itself is rewritten to hold it), so repeated merges are
    /// cheap. The returned handle keeps the backing alive independently
    /// of this list.
    pub fn merge(&mut self) -> Bytes {
        match self.segs.len() {
            0 => Bytes::new(),
            1 => self.segs[0].clone(),
            _ => {
                let mut merged = BytesMut::with_capacity(self.len);
                for seg in &self.segs {
                    merged.extend_from_slice(seg);
                }
                let merged = merged.freeze();
                self.segs.clear();
                self.segs.push(merged.clone());
                merged
            }
        }
    }

    /// Copy the contents out into a fresh `Vec`
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for seg in &self.segs {
            out.extend_from_slice(seg);
        }
        out
    }
}

impl From<Bytes> for BufList {
    fn from(seg: Bytes) -> Self {
        let mut list = Self::new();
        list.push(seg);
        list
    }
}

impl From<Vec<u8>> for BufList {
    fn from(buf: Vec<u8>) -> Self {
        Self::from(Bytes::from(buf))
    }
}

impl<'a> IntoIterator for &'a BufList {
    type Item = &'a Bytes;
    type IntoIter = std::slice::Iter<'a, Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_len() {
        let mut bufs = BufList::new();
        assert!(bufs.is_empty());

        bufs.push(Bytes::from_static(b"hello"));
        bufs.push(Bytes::from_static(b", world"));
        assert_eq!(bufs.len(), 12);
        assert_eq!(bufs.count(), 2);

        // empty segments are dropped
        bufs.push(Bytes::new());
        assert_eq!(bufs.count(), 2);
    }

    #[test]
    fn test_push_zeros() {
        let mut bufs = BufList::new();
        bufs.push(Bytes::from_static(b"ab"));
        bufs.push_zeros(3);
        assert_eq!(bufs.len(), 5);
        assert_eq!(bufs.to_vec(), vec![b'a', b'b', 0, 0, 0]);
    }

    #[test]
    fn test_truncate_across_segments() {
        let mut bufs = BufList::new();
        bufs.push(Bytes::from_static(b"abcd"));
        bufs.push(Bytes::from_static(b"efgh"));
        bufs.push(Bytes::from_static(b"ijkl"));

        bufs.truncate(6);
        assert_eq!(bufs.len(), 6);
        assert_eq!(bufs.count(), 2);
        assert_eq!(bufs.to_vec(), b"abcdef".to_vec());

        // truncating to a larger length is a no-op
        bufs.truncate(100);
        assert_eq!(bufs.len(), 6);

        bufs.truncate(0);
        assert!(bufs.is_empty());
        assert_eq!(bufs.count(), 0);
    }

    #[test]
    fn test_merge_single_segment_is_zero_copy() {
        let seg = Bytes::from_static(b"solo");
        let mut bufs = BufList::from(seg.clone());
        let merged = bufs.merge();
        assert_eq!(merged, seg);
        assert_eq!(bufs.count(), 1);
    }

    #[test]
    fn test_merge_collapses_segments() {
        let mut bufs = BufList::new();
        bufs.push(Bytes::from_static(b"abc"));
        bufs.push(Bytes::from_static(b"def"));
        bufs.push(Bytes::from_static(b"ghi"));

        let merged = bufs.merge();
        assert_eq!(merged.as_ref(), b"abcdefghi");
        assert_eq!(bufs.count(), 1);
        assert_eq!(bufs.len(), 9);

        // a second merge returns the collapsed segment
        let again = bufs.merge();
        assert_eq!(again, merged);
    }

    #[test]
    fn test_shared_slices() {
        let owner = Bytes::from(vec![1u8, 2, 3, 4, 5, 6]);
        let mut bufs = BufList::new();
        bufs.push(owner.slice(0..3));
        bufs.push(owner.slice(3..6));
        drop(owner); // refcount keeps the allocation alive
        assert_eq!(bufs.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_take() {
        let mut bufs = BufList::from(Bytes::from_static(b"data"));
        let taken = bufs.take();
        assert!(bufs.is_empty());
        assert_eq!(taken.len(), 4);
    }
}
