extern crate log;

use log::{debug, info};
use serde_json::json;
use std::borrow::Cow;
use std::ops::AddAssign;
use std::sync::Arc;

use crate::fm_index::KmerIndex;
use crate::high_error::{resolve_gap, Resolution};
use crate::parameters::{CorrectionAlgorithm, CorrectionParameters};
use crate::seed_finder::{find_seeds, Seed, SeedSearch};
use crate::string_util;
use crate::walk::{walk_between_seeds, WalkOutcome};

/// A long read to correct
#[derive(Clone,Debug)]
pub struct LongRead {
    /// the index of the read in the submission order
    pub read_index: u64,
    /// the read label
    pub label: String,
    /// the original read sequence
    pub seq: String
}

/// Counters describing what happened to one read, or summed over many reads.
#[derive(Clone,Copy,Debug,Default,Eq,PartialEq)]
pub struct CorrectionStats {
    /// total bases in the reads
    pub total_reads_len: u64,
    /// bases appended by successful walks
    pub corrected_len: u64,
    /// seeds found
    pub total_seed_num: u64,
    /// walks attempted, one per adjacent seed pair
    pub total_walk_num: u64,
    /// gaps bridged through the index
    pub corrected_num: u64,
    /// gaps kept as the original bytes
    pub high_error_num: u64,
    /// walks that ran out of branches or length
    pub exceed_depth_num: u64,
    /// walks that created too many branches
    pub exceed_leave_num: u64,
    /// summed distance between adjacent seeds
    pub seed_dis: u64
}

impl CorrectionStats {
    /// Field-wise sum of two sets of counters.
    /// # Examples
    /// ```rust
    /// use fmwalk::correction::CorrectionStats;
    /// let a = CorrectionStats { corrected_num: 2, seed_dis: 10, ..Default::default() };
    /// let b = CorrectionStats { corrected_num: 1, high_error_num: 1, ..Default::default() };
    /// let total = a.combine(&b);
    /// assert_eq!(total.corrected_num, 3);
    /// assert_eq!(total.high_error_num, 1);
    /// assert_eq!(total.seed_dis, 10);
    /// ```
    pub fn combine(&self, other: &CorrectionStats) -> CorrectionStats {
        CorrectionStats {
            total_reads_len: self.total_reads_len + other.total_reads_len,
            corrected_len: self.corrected_len + other.corrected_len,
            total_seed_num: self.total_seed_num + other.total_seed_num,
            total_walk_num: self.total_walk_num + other.total_walk_num,
            corrected_num: self.corrected_num + other.corrected_num,
            high_error_num: self.high_error_num + other.high_error_num,
            exceed_depth_num: self.exceed_depth_num + other.exceed_depth_num,
            exceed_leave_num: self.exceed_leave_num + other.exceed_leave_num,
            seed_dis: self.seed_dis + other.seed_dis
        }
    }

    /// The counters as a JSON object, used for the end-of-run report.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "total_reads_len": self.total_reads_len,
            "corrected_len": self.corrected_len,
            "total_seed_num": self.total_seed_num,
            "total_walk_num": self.total_walk_num,
            "corrected_num": self.corrected_num,
            "high_error_num": self.high_error_num,
            "exceed_depth_num": self.exceed_depth_num,
            "exceed_leave_num": self.exceed_leave_num,
            "seed_dis": self.seed_dis
        })
    }
}

impl AddAssign for CorrectionStats {
    fn add_assign(&mut self, other: Self) {
        *self = self.combine(&other);
    }
}

/// Contains the results of a correction
#[derive(Clone,Debug)]
pub struct CorrectionResult {
    /// the index of the read in the submission order
    pub read_index: u64,
    /// the read label
    pub label: String,
    /// the original read sequence
    pub original_seq: String,
    /// the corrected read sequence
    pub corrected_seq: String,
    /// true if the read had at least two seeds and went through the walk stage
    pub merged: bool,
    /// true if seeds from shorter k-mers were used
    pub rekmerized: bool,
    /// the stretches of the read from a seed to a seed, split wherever a gap had to be kept as the original text
    pub fragments: Vec<String>,
    /// the counters for this read
    pub stats: CorrectionStats
}

/// Two mates corrected as one work item
#[derive(Clone,Debug)]
pub struct ReadPair {
    /// the index of the pair in the submission order
    pub read_index: u64,
    pub first: LongRead,
    pub second: LongRead
}

/// Contains the results of correcting both mates of a `ReadPair`
#[derive(Clone,Debug)]
pub struct PairCorrectionResult {
    /// the index of the pair in the submission order
    pub read_index: u64,
    pub first: CorrectionResult,
    pub second: CorrectionResult
}

impl PairCorrectionResult {
    /// The counters of both mates
    pub fn stats(&self) -> CorrectionStats {
        self.first.stats.combine(&self.second.stats)
    }
}

/// The per-algorithm behavior of the corrector. Both algorithms share the seed, walk, and resolve steps; they
/// differ in how the index counts are interpreted.
pub trait CorrectionStrategy: Send + Sync {
    /// The algorithm this strategy implements
    fn algorithm(&self) -> CorrectionAlgorithm;

    /// The index the strategy queries
    fn index(&self) -> &dyn KmerIndex;

    /// The parameters as this strategy applies them
    fn effective_parameters<'a>(&self, params: &'a CorrectionParameters) -> Cow<'a, CorrectionParameters> {
        Cow::Borrowed(params)
    }

    fn find_seeds(&self, read: &[u8], params: &CorrectionParameters) -> SeedSearch {
        find_seeds(self.index(), read, params)
    }

    fn walk(&self, first: &Seed, second: &Seed, target_len: usize, params: &CorrectionParameters) -> WalkOutcome {
        walk_between_seeds(self.index(), first, second, target_len, params)
    }

    fn resolve(&self, original: &[u8], first: &Seed, second: &Seed, params: &CorrectionParameters) -> Resolution {
        resolve_gap(self.index(), original, first, second, params)
    }
}

/// Correction against an index built from the long reads themselves. The read being corrected is part of that
/// index, so its own copy of every k-mer is discounted by raising both thresholds by one.
pub struct SelfCorrection<I: KmerIndex> {
    index: Arc<I>
}

impl<I: KmerIndex> SelfCorrection<I> {
    pub fn new(index: Arc<I>) -> Self {
        SelfCorrection { index }
    }
}

impl<I: KmerIndex> CorrectionStrategy for SelfCorrection<I> {
    fn algorithm(&self) -> CorrectionAlgorithm {
        CorrectionAlgorithm::SelfCorrection
    }

    fn index(&self) -> &dyn KmerIndex {
        &*self.index
    }

    fn effective_parameters<'a>(&self, params: &'a CorrectionParameters) -> Cow<'a, CorrectionParameters> {
        let mut discounted: CorrectionParameters = params.clone();
        discounted.seed_kmer_threshold += 1;
        discounted.walk_kmer_threshold += 1;
        Cow::Owned(discounted)
    }
}

/// Correction against an index built from accurate short reads.
pub struct HybridCorrection<I: KmerIndex> {
    index: Arc<I>
}

impl<I: KmerIndex> HybridCorrection<I> {
    pub fn new(index: Arc<I>) -> Self {
        HybridCorrection { index }
    }
}

impl<I: KmerIndex> CorrectionStrategy for HybridCorrection<I> {
    fn algorithm(&self) -> CorrectionAlgorithm {
        CorrectionAlgorithm::Hybrid
    }

    fn index(&self) -> &dyn KmerIndex {
        &*self.index
    }
}

/// Returns the strategy for an already validated algorithm choice.
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use fmwalk::correction::build_strategy;
/// use fmwalk::fm_index::FmIndex;
/// use fmwalk::parameters::CorrectionAlgorithm;
/// let index = Arc::new(FmIndex::from_strings(&["ACGT"], 0).unwrap());
/// let strategy = build_strategy(CorrectionAlgorithm::SelfCorrection, index);
/// assert_eq!(strategy.algorithm(), CorrectionAlgorithm::SelfCorrection);
/// ```
pub fn build_strategy<I: KmerIndex + 'static>(algorithm: CorrectionAlgorithm, index: Arc<I>) -> Arc<dyn CorrectionStrategy> {
    match algorithm {
        CorrectionAlgorithm::SelfCorrection => Arc::new(SelfCorrection::new(index)),
        CorrectionAlgorithm::Hybrid => Arc::new(HybridCorrection::new(index))
    }
}

/// Appends the bases a merged walk adds after the first seed. The walked bases are emitted in upper case; the second
/// seed is copied from the original text when the walk ends on it.
fn append_bridge(out: &mut Vec<u8>, merged: &[u8], first: &Seed, second: &Seed, original: &[u8]) {
    if merged.len() >= first.len() + second.len() {
        out.extend_from_slice(string_util::convert_itos(&merged[first.len()..merged.len() - second.len()]).as_bytes());
        out.extend_from_slice(&original[second.start..second.end()]);
    } else {
        out.extend_from_slice(string_util::convert_itos(&merged[first.len().min(merged.len())..]).as_bytes());
    }
}

/// Corrects a single long read. Seeds are located first; each adjacent pair of seeds is then bridged by a walk
/// through the index, falling back to the high-error resolver when the walk fails. Only the walked bases are
/// rewritten; the head, the tail, the seeds, and any spliced gap are copied from the original text.
/// # Arguments
/// * `arc_strategy` - the shared correction strategy, which owns the index
/// * `long_read` - the read to correct
/// * `arc_params` - the shared parameters to use for performing the correction
pub fn correction_job(arc_strategy: Arc<dyn CorrectionStrategy>, long_read: LongRead, arc_params: Arc<CorrectionParameters>) -> CorrectionResult {
    let strategy: &dyn CorrectionStrategy = &*arc_strategy;
    let params: Cow<CorrectionParameters> = strategy.effective_parameters(&*arc_params);
    let params: &CorrectionParameters = &params;

    let original: &[u8] = long_read.seq.as_bytes();
    let seq_i: Vec<u8> = string_util::convert_stoi(&long_read.seq);
    let search: SeedSearch = strategy.find_seeds(&seq_i, params);
    let mut stats = CorrectionStats {
        total_reads_len: seq_i.len() as u64,
        ..Default::default()
    };

    let seeds: &[Seed] = &search.seeds;
    if seeds.len() < 2 {
        if params.verbose {
            info!("Job #{}: {} seed(s), read left as is", long_read.read_index, seeds.len());
        }
        return CorrectionResult {
            read_index: long_read.read_index,
            label: long_read.label,
            corrected_seq: long_read.seq.clone(),
            original_seq: long_read.seq,
            merged: false,
            rekmerized: search.rekmerized,
            fragments: vec![],
            stats
        };
    }
    stats.total_seed_num = seeds.len() as u64;

    //head, then the first seed
    let mut corrected: Vec<u8> = Vec::with_capacity(original.len());
    corrected.extend_from_slice(&original[..seeds[0].end()]);
    let mut fragments: Vec<Vec<u8>> = vec![];
    let mut fragment: Vec<u8> = original[seeds[0].start..seeds[0].end()].to_vec();

    for pair in seeds.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        stats.seed_dis += second.start.saturating_sub(first.end()) as u64;
        stats.total_walk_num += 1;

        let target_len: usize = second.end() - first.start;
        let outcome = strategy.walk(first, second, target_len, params);
        let merged: Option<Vec<u8>> = match outcome {
            WalkOutcome::Merged(merged) => Some(merged),
            failed => {
                match failed {
                    WalkOutcome::ExceedsLeafBound => stats.exceed_leave_num += 1,
                    WalkOutcome::ExceedsDepthBound => stats.exceed_depth_num += 1,
                    //HighError and NoSeedPair have no counter, only the resolver's outcome below is counted
                    _ => {}
                };
                debug!("Job #{}: walk from {} to {} failed with {:?}", long_read.read_index, first.end(), second.start, failed);
                match strategy.resolve(original, first, second, params) {
                    Resolution::Bridged(merged) => Some(merged),
                    Resolution::Spliced(spliced) => {
                        stats.high_error_num += 1;
                        corrected.extend_from_slice(&spliced);
                        fragments.push(std::mem::replace(&mut fragment, original[second.start..second.end()].to_vec()));
                        None
                    }
                }
            }
        };

        if let Some(merged) = merged {
            let mut bridge: Vec<u8> = Vec::with_capacity(merged.len().saturating_sub(first.len()));
            append_bridge(&mut bridge, &merged, first, second, original);
            stats.corrected_num += 1;
            stats.corrected_len += bridge.len() as u64;
            corrected.extend_from_slice(&bridge);
            fragment.extend_from_slice(&bridge);
        }
    }
    fragments.push(fragment);

    //tail after the last seed
    if let Some(last) = seeds.last() {
        corrected.extend_from_slice(&original[last.end()..]);
    }

    if params.verbose {
        info!(
            "Job #{}: {} seeds, {} walks, {} corrected, {} high error",
            long_read.read_index, stats.total_seed_num, stats.total_walk_num, stats.corrected_num, stats.high_error_num
        );
    }

    CorrectionResult {
        read_index: long_read.read_index,
        label: long_read.label,
        original_seq: long_read.seq,
        corrected_seq: String::from_utf8_lossy(&corrected).into_owned(),
        merged: true,
        rekmerized: search.rekmerized,
        fragments: fragments.iter().map(|f| String::from_utf8_lossy(f).into_owned()).collect(),
        stats
    }
}

/// Corrects both mates of a pair against the same strategy. Each mate goes through `correction_job` on its own;
/// the pair is kept together when it is written.
/// # Arguments
/// * `arc_strategy` - the shared correction strategy, which owns the index
/// * `read_pair` - the mates to correct
/// * `arc_params` - the shared parameters to use for performing the correction
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use fmwalk::correction::{build_strategy, correction_pair_job, LongRead, ReadPair};
/// use fmwalk::fm_index::FmIndex;
/// use fmwalk::parameters::{CorrectionAlgorithm, CorrectionParameters};
/// let index = Arc::new(FmIndex::from_strings(&["ACGTACGT"], 0).unwrap());
/// let strategy = build_strategy(CorrectionAlgorithm::Hybrid, index);
/// let read_pair = ReadPair {
///     read_index: 0,
///     first: LongRead { read_index: 0, label: "r/1".to_string(), seq: "ACGT".to_string() },
///     second: LongRead { read_index: 0, label: "r/2".to_string(), seq: "TTGA".to_string() }
/// };
/// let result = correction_pair_job(strategy, read_pair, Arc::new(CorrectionParameters::default()));
/// assert_eq!(result.first.corrected_seq, "ACGT");
/// assert_eq!(result.second.corrected_seq, "TTGA");
/// assert_eq!(result.stats().total_reads_len, 8);
/// ```
pub fn correction_pair_job(arc_strategy: Arc<dyn CorrectionStrategy>, read_pair: ReadPair, arc_params: Arc<CorrectionParameters>) -> PairCorrectionResult {
    let ReadPair { read_index, mut first, mut second } = read_pair;
    first.read_index = read_index;
    second.read_index = read_index;
    PairCorrectionResult {
        read_index,
        first: correction_job(arc_strategy.clone(), first, arc_params.clone()),
        second: correction_job(arc_strategy, second, arc_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm_index::FmIndex;

    fn small_params() -> CorrectionParameters {
        CorrectionParameters {
            algorithm: CorrectionAlgorithm::Hybrid,
            kmer_length: 7,
            min_kmer_length: 7,
            min_overlap: 3,
            max_overlap: 7,
            walk_kmer_threshold: 3,
            seed_kmer_threshold: 3,
            target_seed_count: 2,
            ..Default::default()
        }
    }

    fn run_job(strings: &[&str], algorithm: CorrectionAlgorithm, seq: &str, params: CorrectionParameters) -> CorrectionResult {
        let index = Arc::new(FmIndex::from_strings(strings, 2).unwrap());
        let strategy = build_strategy(algorithm, index);
        let read = LongRead {
            read_index: 0,
            label: "read".to_string(),
            seq: seq.to_string()
        };
        correction_job(strategy, read, Arc::new(params))
    }

    #[test]
    fn test_bridge_seed_pair() {
        let result = run_job(&["AAACCGTCAGGGTTTA"; 3], CorrectionAlgorithm::Hybrid, "AAACCGTTTTTTGGGTTTA", small_params());
        assert_eq!(result.corrected_seq, "AAACCGTCAGGGTTTA");
        assert_eq!(result.corrected_seq.len(), 16);
        assert!(result.merged);
        assert!(!result.rekmerized);
        assert_eq!(result.stats, CorrectionStats {
            total_reads_len: 19,
            corrected_len: 9,
            total_seed_num: 2,
            total_walk_num: 1,
            corrected_num: 1,
            seed_dis: 5,
            ..Default::default()
        });
    }

    #[test]
    fn test_dead_end_splice() {
        let result = run_job(&["AAACCGT", "GGGTTTA", "AAACCGT", "GGGTTTA", "AAACCGT", "GGGTTTA"],
            CorrectionAlgorithm::Hybrid, "AAACCGTTTTTTGGGTTTA", small_params());
        assert_eq!(result.corrected_seq, result.original_seq);
        assert_eq!(result.stats.exceed_depth_num, 1);
        assert_eq!(result.stats.high_error_num, 1);
        assert_eq!(result.stats.corrected_num, 0);
        assert_eq!(result.stats.total_walk_num, 1);
        assert_eq!(result.fragments, vec!["AAACCGT".to_string(), "GGGTTTA".to_string()]);
    }

    #[test]
    fn test_spliced_gap_keeps_original_text() {
        let result = run_job(&["AAACCGT", "GGGTTTA", "AAACCGT", "GGGTTTA", "AAACCGT", "GGGTTTA"],
            CorrectionAlgorithm::Hybrid, "AAACCGTtRtttGGGTTTA", small_params());
        assert_eq!(result.corrected_seq, "AAACCGTtRtttGGGTTTA");
        assert_eq!(result.stats.high_error_num, 1);
        assert_eq!(result.stats.exceed_depth_num, 1);
        assert_eq!(result.stats.corrected_num, 0);
    }

    #[test]
    fn test_case_and_ambiguity_outside_bridge() {
        //only the walked bases are rewritten
        let result = run_job(&["AAACCGTCAGGGTTTA"; 3], CorrectionAlgorithm::Hybrid, "rcAAACCGTTTTTTGGGTTTAyg", small_params());
        assert_eq!(result.corrected_seq, "rcAAACCGTCAGGGTTTAyg");
        assert_eq!(result.stats.corrected_num, 1);
        assert_eq!(result.stats.corrected_len, 9);
        assert_eq!(result.fragments, vec!["AAACCGTCAGGGTTTA".to_string()]);
    }

    #[test]
    fn test_pair_job() {
        let index = Arc::new(FmIndex::from_strings(&["AAACCGTCAGGGTTTA"; 3], 2).unwrap());
        let strategy = build_strategy(CorrectionAlgorithm::Hybrid, index);
        let read_pair = ReadPair {
            read_index: 4,
            first: LongRead { read_index: 0, label: "pair/1".to_string(), seq: "AAACCGTTTTTTGGGTTTA".to_string() },
            second: LongRead { read_index: 0, label: "pair/2".to_string(), seq: "ATATATATATAT".to_string() }
        };
        let result = correction_pair_job(strategy, read_pair, Arc::new(small_params()));
        assert_eq!(result.read_index, 4);
        assert_eq!(result.first.read_index, 4);
        assert_eq!(result.second.read_index, 4);
        assert_eq!(result.first.corrected_seq, "AAACCGTCAGGGTTTA");
        assert_eq!(result.second.corrected_seq, "ATATATATATAT");
        assert!(result.second.fragments.is_empty());
        assert_eq!(result.stats().corrected_num, 1);
        assert_eq!(result.stats().total_reads_len, 31);
    }

    #[test]
    fn test_passthrough_head_and_tail() {
        let result = run_job(&["AAACCGTCAGGGTTTA"; 3], CorrectionAlgorithm::Hybrid, "CCAAACCGTTTTTTGGGTTTACC", small_params());
        assert_eq!(result.corrected_seq, "CCAAACCGTCAGGGTTTACC");
        assert_eq!(result.stats.corrected_num, 1);
    }

    #[test]
    fn test_zero_seeds() {
        let result = run_job(&["GGGGGGGGGGGG"; 3], CorrectionAlgorithm::Hybrid, "ATATATATATATATAT", small_params());
        assert_eq!(result.corrected_seq, "ATATATATATATATAT");
        assert!(!result.merged);
        assert_eq!(result.stats, CorrectionStats {
            total_reads_len: 16,
            ..Default::default()
        });
    }

    #[test]
    fn test_single_seed_unchanged() {
        //lowercase and ambiguity codes are kept exactly when nothing is corrected
        let result = run_job(&["AAACCGTCAGGGTTTA"; 3], CorrectionAlgorithm::Hybrid, "AAACCGTrtttttt", small_params());
        assert_eq!(result.corrected_seq, "AAACCGTrtttttt");
        assert_eq!(result.stats.corrected_num, 0);
        assert_eq!(result.stats.total_seed_num, 0);
    }

    #[test]
    fn test_self_fixed_point() {
        //an already clean read is one long seed
        let result = run_job(&["AAACCGTCAGGGTTTA"; 4], CorrectionAlgorithm::SelfCorrection, "AAACCGTCAGGGTTTA", small_params());
        assert_eq!(result.corrected_seq, "AAACCGTCAGGGTTTA");
        assert_eq!(result.stats.exceed_depth_num + result.stats.exceed_leave_num + result.stats.high_error_num, 0);
    }

    #[test]
    fn test_self_discount() {
        //3 copies are solid for hybrid but only 2 others for self
        let hybrid = run_job(&["AAACCGTCAGGGTTTA"; 3], CorrectionAlgorithm::Hybrid, "AAACCGTTTTTTGGGTTTA", small_params());
        assert_eq!(hybrid.stats.corrected_num, 1);
        let own = run_job(&["AAACCGTCAGGGTTTA"; 3], CorrectionAlgorithm::SelfCorrection, "AAACCGTTTTTTGGGTTTA", small_params());
        assert_eq!(own.stats.total_seed_num, 0);
        assert_eq!(own.corrected_seq, "AAACCGTTTTTTGGGTTTA");

        let own = run_job(&["AAACCGTCAGGGTTTA"; 4], CorrectionAlgorithm::SelfCorrection, "AAACCGTTTTTTGGGTTTA", small_params());
        assert_eq!(own.corrected_seq, "AAACCGTCAGGGTTTA");
    }

    #[test]
    fn test_stats_combine() {
        let r1 = CorrectionStats { total_reads_len: 10, corrected_num: 1, seed_dis: 4, ..Default::default() };
        let r2 = CorrectionStats { total_reads_len: 20, high_error_num: 2, exceed_depth_num: 1, ..Default::default() };
        let r3 = CorrectionStats { total_reads_len: 5, exceed_leave_num: 3, total_walk_num: 6, ..Default::default() };

        let left = r1.combine(&r2).combine(&r3);
        let right = r1.combine(&r2.combine(&r3));
        assert_eq!(left, right);
        assert_eq!(r3.combine(&r1).combine(&r2), left);
        assert_eq!(r1.combine(&CorrectionStats::default()), r1);

        let mut total = CorrectionStats::default();
        for stats in [r2, r3, r1].iter() {
            total += *stats;
        }
        assert_eq!(total, left);
        assert_eq!(total.total_reads_len, 35);
    }

    #[test]
    fn test_stats_json() {
        let stats = CorrectionStats { corrected_num: 7, seed_dis: 12, ..Default::default() };
        let value = stats.to_json();
        assert_eq!(value["corrected_num"], 7);
        assert_eq!(value["seed_dis"], 12);
        assert_eq!(value["high_error_num"], 0);
    }
}
