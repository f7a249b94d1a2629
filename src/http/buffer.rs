//! Staging buffer for bytes read off a connection.
//!
//! The parser needs a whole syntactic unit (a line, or the rest of a body)
//! before it can make progress, but the network hands bytes over in whatever
//! sizes it likes. `ByteStage` holds the bytes between reads.
//!
//! There is no upper bound on growth: a peer that never sends CRLF will keep
//! doubling the storage.

/// Default initial capacity used by [`ByteStage::new`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// A growable buffer with a count of valid bytes at its front.
#[derive(Debug)]
pub struct ByteStage {
    buf: Vec<u8>,
    len: usize,
}

impl ByteStage {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a stage with `capacity` bytes of storage (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            len: 0,
        }
    }

    /// Doubles the storage if every byte is in use, keeping the contents.
    pub fn ensure_capacity(&mut self) {
        if self.len == self.buf.len() {
            let doubled = self.buf.len() * 2;
            self.buf.resize(doubled, 0);
        }
    }

    /// The unused tail of the storage, for the next read to fill.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Marks `n` bytes of the spare tail as valid after a read.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(self.len + n <= self.buf.len());
        self.len += n;
    }

    /// The valid bytes.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Drops the first `consumed` valid bytes and shifts the rest to offset 0.
    pub fn consume(&mut self, consumed: usize) {
        let consumed = consumed.min(self.len);
        self.buf.copy_within(consumed..self.len, 0);
        self.len -= consumed;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl Default for ByteStage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(stage: &mut ByteStage, data: &[u8]) {
        stage.spare_mut()[..data.len()].copy_from_slice(data);
        stage.commit(data.len());
    }

    #[test]
    fn grows_by_doubling_only_when_full() {
        let mut stage = ByteStage::with_capacity(4);
        fill(&mut stage, b"ab");
        stage.ensure_capacity();
        assert_eq!(stage.capacity(), 4);

        fill(&mut stage, b"cd");
        stage.ensure_capacity();
        assert_eq!(stage.capacity(), 8);
        assert_eq!(stage.filled(), b"abcd");
    }

    #[test]
    fn consume_shifts_leftover_to_front() {
        let mut stage = ByteStage::with_capacity(8);
        fill(&mut stage, b"GET\r\nxy");
        stage.consume(5);

        assert_eq!(stage.filled(), b"xy");
        assert_eq!(stage.spare_mut().len(), 6);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut stage = ByteStage::with_capacity(0);
        assert_eq!(stage.capacity(), 1);
        fill(&mut stage, b"x");
        stage.ensure_capacity();
        assert_eq!(stage.capacity(), 2);
    }
}
