extern crate log;

use log::debug;

use crate::fm_index::KmerIndex;
use crate::parameters::CorrectionParameters;
use crate::string_util::has_ambiguity;

/// A solid stretch of a read, used as an anchor for walks.
#[derive(Clone,Debug,Eq,PartialEq)]
pub struct Seed {
    /// offset of the seed in the read
    pub start: usize,
    /// the seed sequence in integer form
    pub seq: Vec<u8>
}

impl Seed {
    pub fn new(start: usize, seq: &[u8]) -> Self {
        Seed {
            start,
            seq: seq.to_vec()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// one past the last read offset covered by this seed
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.seq.len()
    }
}

/// The seeds found for one read.
#[derive(Clone,Debug,Default)]
pub struct SeedSearch {
    /// the seeds, ordered by start and non-overlapping
    pub seeds: Vec<Seed>,
    /// true if the shorter k-mer search contributed any seeds
    pub rekmerized: bool
}

#[inline]
fn is_solid(index: &dyn KmerIndex, window: &[u8], threshold: u64) -> bool {
    !has_ambiguity(window) && index.frequency(window) >= threshold
}

/// Scans `read[lo..hi]` with windows of length `k`, merging runs of solid windows into seeds.
fn scan_range(index: &dyn KmerIndex, read: &[u8], lo: usize, hi: usize, k: usize, threshold: u64) -> Vec<Seed> {
    let mut seeds: Vec<Seed> = vec![];
    if k == 0 {
        return seeds;
    }
    let mut pos: usize = lo;
    while pos + k <= hi {
        if is_solid(index, &read[pos..pos+k], threshold) {
            let run_start: usize = pos;
            while pos + 1 + k <= hi && is_solid(index, &read[pos+1..pos+1+k], threshold) {
                pos += 1;
            }
            let seed_end: usize = pos + k;
            seeds.push(Seed::new(run_start, &read[run_start..seed_end]));
            pos = seed_end;
        } else {
            pos += 1;
        }
    }
    seeds
}

/// Finds seeds of shorter k-mer lengths inside `read[lo..hi]`. Lengths are tried in the order given by
/// `CorrectionParameters::dynamic_kmer_lengths`; the first length producing any seed wins.
/// # Arguments
/// * `index` - the k-mer index
/// * `read` - the full read in integer form
/// * `lo` - start of the sub-range, inclusive
/// * `hi` - end of the sub-range, exclusive
/// * `params` - the correction parameters
pub fn find_dynamic_seeds(index: &dyn KmerIndex, read: &[u8], lo: usize, hi: usize, params: &CorrectionParameters) -> Vec<Seed> {
    for k in params.dynamic_kmer_lengths() {
        if hi < lo + k {
            continue;
        }
        let seeds = scan_range(index, read, lo, hi, k, params.seed_kmer_threshold);
        if !seeds.is_empty() {
            return seeds;
        }
    }
    vec![]
}

/// Finds the solid seeds of a read. A window of `kmer_length` is solid when it is free of ambiguity codes and
/// its frequency reaches `seed_kmer_threshold`; consecutive solid windows collapse into a single seed.
/// If fewer than `target_seed_count` seeds are found, each unseeded gap is searched again with shorter k-mers.
/// # Arguments
/// * `index` - the k-mer index
/// * `read` - the read in integer form
/// * `params` - the correction parameters
/// # Examples
/// ```rust
/// use fmwalk::fm_index::FmIndex;
/// use fmwalk::parameters::CorrectionParameters;
/// use fmwalk::seed_finder::find_seeds;
/// use fmwalk::string_util::convert_stoi;
/// let index = FmIndex::from_strings(&["AAACCGTCAGG"; 3], 2).unwrap();
/// let params = CorrectionParameters {
///     kmer_length: 5,
///     min_kmer_length: 5,
///     seed_kmer_threshold: 3,
///     ..Default::default()
/// };
/// let search = find_seeds(&index, &convert_stoi("AAACCTTTTTTTTTT"), &params);
/// assert_eq!(search.seeds.len(), 1);
/// assert_eq!(search.seeds[0].start, 0);
/// assert_eq!(search.seeds[0].len(), 5);
/// ```
pub fn find_seeds(index: &dyn KmerIndex, read: &[u8], params: &CorrectionParameters) -> SeedSearch {
    let seeds: Vec<Seed> = scan_range(index, read, 0, read.len(), params.kmer_length, params.seed_kmer_threshold);
    if seeds.len() >= params.target_seed_count || !params.dynamic_search_enabled() {
        return SeedSearch {
            seeds,
            rekmerized: false
        };
    }

    //fill every unseeded gap, head and tail included
    let mut merged: Vec<Seed> = Vec::with_capacity(seeds.len());
    let mut rekmerized: bool = false;
    let mut gap_start: usize = 0;
    for seed in seeds.into_iter() {
        let extra = find_dynamic_seeds(index, read, gap_start, seed.start, params);
        rekmerized |= !extra.is_empty();
        merged.extend(extra);
        gap_start = seed.end();
        merged.push(seed);
    }
    let extra = find_dynamic_seeds(index, read, gap_start, read.len(), params);
    rekmerized |= !extra.is_empty();
    merged.extend(extra);

    if rekmerized {
        debug!("Dynamic k-mer search raised seed count to {}", merged.len());
    }
    SeedSearch {
        seeds: merged,
        rekmerized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm_index::FmIndex;
    use crate::string_util::convert_stoi;

    fn fixed_params(k: usize) -> CorrectionParameters {
        CorrectionParameters {
            kmer_length: k,
            min_kmer_length: k,
            seed_kmer_threshold: 3,
            target_seed_count: 2,
            ..Default::default()
        }
    }

    fn assert_seeds_valid(index: &FmIndex, read: &[u8], seeds: &[Seed], threshold: u64) {
        for seed in seeds.iter() {
            assert_eq!(&read[seed.start..seed.end()], &seed.seq[..]);
            assert!(index.frequency(&seed.seq) >= threshold);
        }
        for pair in seeds.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert!(pair[0].end() <= pair[1].start);
        }
    }

    #[test]
    fn test_two_seeds() {
        let index = FmIndex::from_strings(&["AAACCGTCAGGGTTTA"; 3], 2).unwrap();
        let params = fixed_params(7);
        let read = convert_stoi("AAACCGTTTTTTGGGTTTA");
        let search = find_seeds(&index, &read, &params);
        assert!(!search.rekmerized);
        assert_eq!(search.seeds, vec![
            Seed::new(0, &convert_stoi("AAACCGT")),
            Seed::new(12, &convert_stoi("GGGTTTA"))
        ]);
        assert_seeds_valid(&index, &read, &search.seeds, params.seed_kmer_threshold);
    }

    #[test]
    fn test_run_merging() {
        let index = FmIndex::from_strings(&["AAACCGTCAGGGTTTA"; 3], 2).unwrap();
        let params = fixed_params(7);

        //the whole read is solid, so it is one seed
        let read = convert_stoi("AAACCGTCAGGGTTTA");
        let search = find_seeds(&index, &read, &params);
        assert_eq!(search.seeds.len(), 1);
        assert_eq!(search.seeds[0].start, 0);
        assert_eq!(search.seeds[0].len(), read.len());
    }

    #[test]
    fn test_threshold_and_ambiguity() {
        let index = FmIndex::from_strings(&["AAACCGTCAGGGTTTA"; 2], 2).unwrap();
        let params = fixed_params(7);
        let read = convert_stoi("AAACCGTCAGGGTTTA");
        //only 2 copies, below the threshold of 3
        assert!(find_seeds(&index, &read, &params).seeds.is_empty());

        let index = FmIndex::from_strings(&["AAACCGTCAGGGTTTA"; 3], 2).unwrap();
        let read = convert_stoi("AAACCGTNAGGGTTTA");
        let search = find_seeds(&index, &read, &params);
        assert_eq!(search.seeds, vec![
            Seed::new(0, &convert_stoi("AAACCGT")),
            Seed::new(8, &convert_stoi("AGGGTTTA"))
        ]);
    }

    #[test]
    fn test_no_seeds() {
        let index = FmIndex::from_strings(&["GGGGGGGGGGGG"; 3], 2).unwrap();
        let mut params = fixed_params(7);
        params.min_kmer_length = 4;
        let read = convert_stoi("ATATATATATATATAT");
        let search = find_seeds(&index, &read, &params);
        assert!(search.seeds.is_empty());
        assert!(!search.rekmerized);

        //shorter than a k-mer
        assert!(find_seeds(&index, &convert_stoi("GGG"), &params).seeds.is_empty());
    }

    #[test]
    fn test_dynamic_seeds() {
        //"GATTACA" shares only 5-mers with the read
        let index = FmIndex::from_strings(&["AAACCGTCAGG", "CATTACAGG"], 0).unwrap();
        let mut params = fixed_params(7);
        params.seed_kmer_threshold = 1;
        params.min_kmer_length = 5;
        params.num_kmer_rounds = 2;
        params.target_seed_count = 3;
        let read = convert_stoi("AAACCGTCAGGTTTTTTTTGATTACAT");

        let search = find_seeds(&index, &read, &params);
        assert!(search.rekmerized);
        assert_eq!(search.seeds[0], Seed::new(0, &convert_stoi("AAACCGTCAGG")));
        let dynamic = &search.seeds[1];
        assert_eq!(dynamic.seq, convert_stoi("ATTACA"));
        assert_eq!(dynamic.start, 20);
        assert_seeds_valid(&index, &read, &search.seeds, 1);

        //enough seeds already, no dynamic search
        params.target_seed_count = 1;
        let search = find_seeds(&index, &read, &params);
        assert!(!search.rekmerized);
        assert_eq!(search.seeds.len(), 1);
    }

    #[test]
    fn test_dynamic_direction() {
        let index = FmIndex::from_strings(&["CATTACAGG"], 0).unwrap();
        let mut params = fixed_params(8);
        params.seed_kmer_threshold = 1;
        params.min_kmer_length = 4;
        params.num_kmer_rounds = 4;
        let read = convert_stoi("TTTTGATTACATTTT");

        //longest first finds the 6-mer ATTACA
        let seeds = find_dynamic_seeds(&index, &read, 0, read.len(), &params);
        assert_eq!(seeds, vec![Seed::new(5, &convert_stoi("ATTACA"))]);

        //shortest first stops at 4-mers, which still merge into the same run
        params.search_downward = false;
        let seeds = find_dynamic_seeds(&index, &read, 0, read.len(), &params);
        assert!(!seeds.is_empty());
        assert_seeds_valid(&index, &read, &seeds, 1);
        assert!(seeds.iter().any(|s| s.start == 5));
    }
}
