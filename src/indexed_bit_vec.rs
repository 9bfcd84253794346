
/// A bit vector with a per-word rank index on top of it.
/// For a vector of length N, the index takes up O(N) bits; rank queries are a single lookup plus a popcount.
pub struct IndexedBitVec {
    bitvec: Vec<u64>,
    index: Vec<u64>
}

impl IndexedBitVec {
    /// Returns an empty IndexedBitVec that can hold `size` bits. Bits must be set and then `build_index` called
    /// before any rank queries are made.
    /// # Arguments
    /// * `size` - the number of bits in the bit-vector
    /// # Examples
    /// ```rust
    /// use fmwalk::indexed_bit_vec::IndexedBitVec;
    /// let ibv = IndexedBitVec::with_capacity(128);
    /// assert_eq!(ibv.num_words(), 3);
    /// ```
    #[inline]
    pub fn with_capacity(size: usize) -> Self {
        //one extra word so that rank(size) never reads out of bounds
        let num_words: usize = size / 64 + 1;
        Self {
            bitvec: vec![0; num_words],
            index: vec![0; num_words]
        }
    }

    /// The number of 64-bit words backing the vector
    #[inline]
    pub fn num_words(&self) -> usize {
        self.bitvec.len()
    }

    /// Sets a contiguous run of bits `[start, end)`, this is how BWT runs are loaded.
    pub fn set_range(&mut self, start: usize, end: usize) {
        for pos in start..end {
            self.set_bit(pos);
        }
    }

    /// Sets a single bit.
    #[inline]
    pub fn set_bit(&mut self, pos: usize) {
        self.bitvec[pos >> 6] |= 0x1 << (pos & 0x3F);
    }

    /// Returns the value of a single bit.
    #[inline]
    pub fn get_bit(&self, pos: usize) -> bool {
        ((self.bitvec[pos >> 6] >> (pos & 0x3F)) & 0x1) != 0
    }

    /// Builds the rank index. `initial_rank` is added to every rank, which lets the FM-index fold the
    /// symbol offset (the `C` array) directly into the rank query.
    /// # Examples
    /// ```rust
    /// use fmwalk::indexed_bit_vec::IndexedBitVec;
    /// let mut ibv = IndexedBitVec::with_capacity(128);
    /// ibv.set_bit(64);
    /// ibv.build_index(10);
    /// assert_eq!(ibv.rank(64), 10);
    /// assert_eq!(ibv.rank(65), 11);
    /// ```
    pub fn build_index(&mut self, initial_rank: u64) {
        let mut current_rank = initial_rank;
        for (word, rank) in self.bitvec.iter().zip(self.index.iter_mut()) {
            *rank = current_rank;
            current_rank += word.count_ones() as u64;
        }
    }

    /// Rank-1 query, the number of set bits strictly before `pos` (plus the initial rank).
    #[inline]
    pub fn rank(&self, pos: usize) -> u64 {
        let word_index = pos >> 6;
        let offset = pos & 0x3F;
        let mask: u64 = if offset == 0 { 0 } else { u64::MAX >> (64 - offset) };
        self.index[word_index] + (self.bitvec[word_index] & mask).count_ones() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_split_vec() -> IndexedBitVec {
        //128 "1"s, then 128 "0"s, then 1 "1"
        let mut ibv = IndexedBitVec::with_capacity(257);
        ibv.set_range(0, 128);
        ibv.set_bit(256);
        ibv
    }

    #[test]
    fn test_allocation() {
        assert_eq!(IndexedBitVec::with_capacity(63).num_words(), 1);
        assert_eq!(IndexedBitVec::with_capacity(64).num_words(), 2);
        assert_eq!(IndexedBitVec::with_capacity(65).num_words(), 2);
        assert_eq!(IndexedBitVec::with_capacity(128).num_words(), 3);
    }

    #[test]
    fn test_set_bit() {
        let ibv = get_split_vec();
        for i in 0..128 {
            assert!(ibv.get_bit(i));
        }
        for i in 128..256 {
            assert!(!ibv.get_bit(i));
        }
        assert!(ibv.get_bit(256));
    }

    #[test]
    fn test_rank() {
        let mut ibv = get_split_vec();
        ibv.build_index(0);
        for i in 0..=128 {
            assert_eq!(ibv.rank(i), i as u64);
        }
        for i in 129..=256 {
            assert_eq!(ibv.rank(i), 128);
        }
        assert_eq!(ibv.rank(257), 129);
    }

    #[test]
    fn test_offset_rank() {
        let mut ibv = IndexedBitVec::with_capacity(64);
        ibv.set_range(0, 64);
        ibv.build_index(100);
        assert_eq!(ibv.rank(0), 100);
        assert_eq!(ibv.rank(63), 163);
        assert_eq!(ibv.rank(64), 164);
    }
}
