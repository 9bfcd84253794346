extern crate log;

use log::info;
use std::io::{self, Cursor};

use crate::bwt_builder::create_bwt_from_strings;
use crate::bwt_converter::{convert_to_vec, load_bwt_numpy, LETTER_BITS, MASK, NUM_POWER, VC_LEN};
use crate::indexed_bit_vec::IndexedBitVec;
use crate::string_util::{reverse_complement_i, COMPLEMENT_INT, EXTENSION_SYMBOLS};

// 8 gives a solid speed boost for ~25MB of cache, every +1 is ~6x the memory
pub const DEFAULT_CACHE_K: usize = 8;

/// The read-only queries the correction engine needs from a k-mer index. Implementations must be safe to
/// query from many worker threads at once.
pub trait KmerIndex: Send + Sync {
    /// Occurrences of `kmer` in the index, counting both strands.
    fn frequency(&self, kmer: &[u8]) -> u64;

    /// For each symbol `c` in `[A, C, G, T]`, the frequency (both strands) of `kmer + c`.
    fn extend(&self, kmer: &[u8]) -> [u64; 4];
}

/// A half-open range `[l, h)` of rows in the BWT.
#[derive(Clone,Copy,Default,Debug,Eq,PartialEq)]
pub struct BWTRange {
    /// the lower bound, inclusive
    pub l: u64,
    /// the upper bound, exclusive
    pub h: u64
}

impl BWTRange {
    #[inline]
    pub fn count(&self) -> u64 {
        self.h - self.l
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.h == self.l
    }
}

/// BWT + FM-index built on one indexed bit vector per symbol. Faster than a sampled FM-index at the cost of
/// roughly `2*C*N` bits for `N` characters over an alphabet of size `C`.
pub struct FmIndex {
    occurrences: Vec<IndexedBitVec>,
    total_counts: [u64; VC_LEN],
    start_index: [u64; VC_LEN],
    total_size: u64,
    cache_k: usize,
    kmer_cache: Vec<BWTRange>
}

/// Expands the run-length encoded bytes into `(symbol, run_length)` pairs.
fn decode_runs(bwt: &[u8]) -> io::Result<Vec<(u8, u64)>> {
    let mut runs: Vec<(u8, u64)> = Vec::new();
    let mut prev_symbol: u8 = 255;
    let mut power: u64 = 1;
    for value in bwt {
        let symbol = value & MASK;
        if symbol as usize >= VC_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid symbol {} in run-length encoded BWT", symbol)
            ));
        }
        let count = (value >> LETTER_BITS) as u64;
        if symbol == prev_symbol {
            //same symbol again means the next 5 bits of the same run
            power *= NUM_POWER;
            if let Some(last) = runs.last_mut() {
                last.1 += count * power;
            }
        } else {
            power = 1;
            runs.push((symbol, count));
            prev_symbol = symbol;
        }
    }
    Ok(runs)
}

#[inline]
fn is_indexed_symbol(symbol: u8) -> bool {
    symbol != 0 && (symbol as usize) < VC_LEN
}

impl FmIndex {
    /// Builds the index from a run-length encoded BWT (see `bwt_converter::convert_to_vec`).
    /// # Arguments
    /// * `bwt` - the run-length encoded BWT
    /// * `cache_k` - length of the precomputed k-mer range cache, 0 disables it
    /// # Examples
    /// ```rust
    /// use std::io::Cursor;
    /// use fmwalk::bwt_converter::convert_to_vec;
    /// use fmwalk::fm_index::FmIndex;
    /// //strings "ACGT" and "CCGG"
    /// let vec = convert_to_vec(Cursor::new("TG$$CAGCCG")).unwrap();
    /// let index = FmIndex::from_rle(&vec, 2).unwrap();
    /// assert_eq!(index.total_count(0), 2);
    /// ```
    pub fn from_rle(bwt: &[u8], cache_k: usize) -> io::Result<Self> {
        info!("Loading BWT from vector of length {}", bwt.len());
        let runs = decode_runs(bwt)?;

        let mut total_counts: [u64; VC_LEN] = [0; VC_LEN];
        for &(symbol, count) in runs.iter() {
            total_counts[symbol as usize] += count;
        }
        let mut start_index: [u64; VC_LEN] = [0; VC_LEN];
        let mut offset: u64 = 0;
        for (start, total) in start_index.iter_mut().zip(total_counts.iter()) {
            *start = offset;
            offset += total;
        }
        let total_size: u64 = offset;
        info!("Loaded BWT with symbol counts: {:?}", total_counts);

        //the sentinel is never ranked, so it only gets a placeholder vector
        let mut occurrences: Vec<IndexedBitVec> = (0..VC_LEN)
            .map(|symbol| {
                if symbol == 0 {
                    IndexedBitVec::with_capacity(0)
                } else {
                    IndexedBitVec::with_capacity(total_size as usize)
                }
            })
            .collect();
        let mut position: usize = 0;
        for &(symbol, count) in runs.iter() {
            let end = position + count as usize;
            if symbol != 0 {
                occurrences[symbol as usize].set_range(position, end);
            }
            position = end;
        }
        for (symbol, occ) in occurrences.iter_mut().enumerate().skip(1) {
            occ.build_index(start_index[symbol]);
        }

        let mut index = FmIndex {
            occurrences,
            total_counts,
            start_index,
            total_size,
            cache_k,
            kmer_cache: Vec::new()
        };
        index.populate_cache();
        info!("Finished BWT initialization.");
        Ok(index)
    }

    /// Loads a run-length encoded BWT stored in the numpy `.npy` format.
    /// # Arguments
    /// * `filename` - the `.npy` file
    /// * `cache_k` - length of the precomputed k-mer range cache
    pub fn load_numpy_file(filename: &str, cache_k: usize) -> io::Result<Self> {
        let bwt: Vec<u8> = load_bwt_numpy(filename)?;
        Self::from_rle(&bwt, cache_k)
    }

    /// Builds a small index directly from strings, see `bwt_builder::create_bwt_from_strings`.
    /// # Examples
    /// ```rust
    /// use fmwalk::fm_index::{FmIndex, KmerIndex};
    /// use fmwalk::string_util::convert_stoi;
    /// let index = FmIndex::from_strings(&["ACGT", "CCGG"], 2).unwrap();
    /// assert_eq!(index.count_kmer(&convert_stoi("CG")), 2);
    /// //ACGT is its own reverse complement
    /// assert_eq!(index.frequency(&convert_stoi("ACGT")), 2);
    /// ```
    pub fn from_strings(data: &[&str], cache_k: usize) -> io::Result<Self> {
        let bwt: String = create_bwt_from_strings(data);
        let rle: Vec<u8> = convert_to_vec(Cursor::new(bwt))?;
        Self::from_rle(&rle, cache_k)
    }

    /// Total number of occurrences of a symbol in integer form.
    #[inline]
    pub fn total_count(&self, symbol: u8) -> u64 {
        self.total_counts[symbol as usize]
    }

    #[inline]
    fn full_range(&self) -> BWTRange {
        BWTRange {
            l: 0,
            h: self.total_size
        }
    }

    /// Prepends `symbol` to the k-mer represented by `range`.
    #[inline]
    fn constrain_range(&self, symbol: u8, range: &BWTRange) -> BWTRange {
        let occ = &self.occurrences[symbol as usize];
        BWTRange {
            l: occ.rank(range.l as usize),
            h: occ.rank(range.h as usize)
        }
    }

    /// Backward search of `prefix` in front of an existing range.
    #[inline]
    fn prepend_all(&self, prefix: &[u8], mut range: BWTRange) -> BWTRange {
        for &c in prefix.iter().rev() {
            if range.is_empty() {
                break;
            }
            range = self.constrain_range(c, &range);
        }
        range
    }

    #[inline]
    fn cache_key<'a>(symbols: impl Iterator<Item = &'a u8>) -> usize {
        symbols.fold(0, |key, &c| key * VC_LEN + c as usize)
    }

    /// Range lookup for a k-mer made only of indexed symbols, using the cache for its last `cache_k` symbols.
    #[inline]
    fn kmer_range(&self, kmer: &[u8]) -> BWTRange {
        if self.cache_k > 0 && kmer.len() >= self.cache_k {
            let split = kmer.len() - self.cache_k;
            let cached = self.kmer_cache[Self::cache_key(kmer[split..].iter())];
            self.prepend_all(&kmer[..split], cached)
        } else {
            self.prepend_all(kmer, self.full_range())
        }
    }

    /// Precomputes the range of every k-mer of length `cache_k` over `ACGNT`.
    fn populate_cache(&mut self) {
        if self.cache_k == 0 {
            return;
        }
        info!("Building {:?}-mer cache...", self.cache_k);
        self.kmer_cache = vec![Default::default(); VC_LEN.pow(self.cache_k as u32)];
        let mut current_key: Vec<u8> = vec![1; self.cache_k];
        loop {
            let range = self.prepend_all(&current_key, self.full_range());
            self.kmer_cache[Self::cache_key(current_key.iter())] = range;

            //odometer increment over symbols 1..=5
            let mut digit = self.cache_k;
            loop {
                if digit == 0 {
                    return;
                }
                digit -= 1;
                if current_key[digit] < 5 {
                    current_key[digit] += 1;
                    break;
                }
                current_key[digit] = 1;
            }
        }
    }

    /// Occurrences of `kmer` on the forward strand only.
    /// # Arguments
    /// * `kmer` - the integer-encoded k-mer
    pub fn count_kmer(&self, kmer: &[u8]) -> u64 {
        if kmer.is_empty() || !kmer.iter().all(|&c| is_indexed_symbol(c)) {
            return 0;
        }
        self.kmer_range(kmer).count()
    }

    /// For each `c` in `[A, C, G, T]`, the forward-strand count of `kmer + c`.
    fn postfix_counts(&self, kmer: &[u8]) -> [u64; 4] {
        let mut counts: [u64; 4] = [0; 4];
        for (count, &symbol) in counts.iter_mut().zip(EXTENSION_SYMBOLS.iter()) {
            let extended_len = kmer.len() + 1;
            let range = if self.cache_k > 0 && extended_len >= self.cache_k {
                let split = extended_len - self.cache_k;
                let key = Self::cache_key(kmer[split..].iter().chain(std::iter::once(&symbol)));
                self.prepend_all(&kmer[..split], self.kmer_cache[key])
            } else {
                self.prepend_all(kmer, self.constrain_range(symbol, &self.full_range()))
            };
            *count = range.count();
        }
        counts
    }
}

impl KmerIndex for FmIndex {
    /// # Examples
    /// ```rust
    /// use fmwalk::fm_index::{FmIndex, KmerIndex};
    /// use fmwalk::string_util::convert_stoi;
    /// let index = FmIndex::from_strings(&["AACCGG"], 0).unwrap();
    /// assert_eq!(index.frequency(&convert_stoi("AAC")), 1);
    /// //"CCG" occurs once forward and once as the reverse complement of "CGG"
    /// assert_eq!(index.frequency(&convert_stoi("CCG")), 2);
    /// assert_eq!(index.frequency(&convert_stoi("AANC")), 0);
    /// ```
    fn frequency(&self, kmer: &[u8]) -> u64 {
        if kmer.is_empty() || !kmer.iter().all(|&c| is_indexed_symbol(c)) {
            return 0;
        }
        self.kmer_range(kmer).count() + self.kmer_range(&reverse_complement_i(kmer)).count()
    }

    fn extend(&self, kmer: &[u8]) -> [u64; 4] {
        if !kmer.iter().all(|&c| is_indexed_symbol(c)) {
            return [0; 4];
        }
        let mut counts: [u64; 4] = self.postfix_counts(kmer);

        //revcomp(kmer + c) == comp(c) + revcomp(kmer), so one range serves all four symbols
        let rev_range = self.kmer_range(&reverse_complement_i(kmer));
        if !rev_range.is_empty() {
            for (count, &symbol) in counts.iter_mut().zip(EXTENSION_SYMBOLS.iter()) {
                *count += self.constrain_range(COMPLEMENT_INT[symbol as usize], &rev_range).count();
            }
        }
        counts
    }
}
