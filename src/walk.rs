extern crate log;

use log::debug;

use crate::fm_index::KmerIndex;
use crate::parameters::CorrectionParameters;
use crate::seed_finder::Seed;
use crate::string_util::EXTENSION_SYMBOLS;

/// The result of trying to bridge two seeds through the index.
#[derive(Clone,Debug,Eq,PartialEq)]
pub enum WalkOutcome {
    /// the bridged sequence, starting with the first seed and ending with the second
    Merged(Vec<u8>),
    /// the search created more branches than `max_leaves`
    ExceedsLeafBound,
    /// every branch died or outgrew the length window
    ExceedsDepthBound,
    /// the gap is too long to attempt a walk
    HighError,
    /// the two seeds cannot anchor a walk
    NoSeedPair
}

/// Returns the extension symbols that reach `threshold`, best first.
fn ranked_extensions(index: &dyn KmerIndex, suffix: &[u8], threshold: u64) -> Vec<u8> {
    let counts: [u64; 4] = index.extend(suffix);
    let mut candidates: Vec<(u64, u8)> = counts.iter()
        .zip(EXTENSION_SYMBOLS.iter())
        .filter(|&(&count, _)| count >= threshold)
        .map(|(&count, &symbol)| (count, symbol))
        .collect();
    //highest count first, ties go to the lexicographically smaller symbol
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    candidates.into_iter().map(|(_, symbol)| symbol).collect()
}

/// Walks through the index from `first` towards `second`, looking for a path whose merged length is within
/// `max_overlap - min_overlap` of `target_len`. The search is depth-first: each step extends the current
/// branch with its best solid symbol and queues the rest so the next best is tried next.
/// # Arguments
/// * `index` - the k-mer index
/// * `first` - the upstream seed, where the walk starts
/// * `second` - the downstream seed, where the walk must arrive
/// * `target_len` - the expected length of the merged sequence, both seeds included
/// * `params` - the correction parameters
/// # Examples
/// ```rust
/// use fmwalk::fm_index::FmIndex;
/// use fmwalk::parameters::CorrectionParameters;
/// use fmwalk::seed_finder::Seed;
/// use fmwalk::string_util::{convert_itos, convert_stoi};
/// use fmwalk::walk::{walk_between_seeds, WalkOutcome};
/// let index = FmIndex::from_strings(&["AAACCGTCAGGGTTTA"; 3], 2).unwrap();
/// let params = CorrectionParameters {
///     kmer_length: 7,
///     min_kmer_length: 7,
///     min_overlap: 3,
///     max_overlap: 7,
///     ..Default::default()
/// };
/// let first = Seed::new(0, &convert_stoi("AAACCGT"));
/// let second = Seed::new(12, &convert_stoi("GGGTTTA"));
/// match walk_between_seeds(&index, &first, &second, 19, &params) {
///     WalkOutcome::Merged(seq) => assert_eq!(convert_itos(&seq), "AAACCGTCAGGGTTTA"),
///     other => panic!("unexpected outcome {:?}", other)
/// }
/// ```
pub fn walk_between_seeds(index: &dyn KmerIndex, first: &Seed, second: &Seed, target_len: usize, params: &CorrectionParameters) -> WalkOutcome {
    if first.len() < params.min_overlap || second.len() < params.min_overlap || second.start < first.end() {
        return WalkOutcome::NoSeedPair;
    }
    let w: usize = params.kmer_length.min(first.len()).min(second.len());
    if w < 2 {
        return WalkOutcome::NoSeedPair;
    }

    let tolerance: usize = params.length_tolerance();
    let min_len: usize = target_len.saturating_sub(tolerance);
    let max_len: usize = target_len + tolerance;
    if max_len > params.max_walk_length {
        return WalkOutcome::HighError;
    }

    let anchor_len: usize = first.len();
    let destination: &[u8] = &second.seq[..w];
    let tail: &[u8] = &second.seq[w..];
    let threshold: u64 = params.walk_kmer_threshold.max(1);

    let mut branches: Vec<Vec<u8>> = vec![first.seq.clone()];
    let mut leaves: usize = 1;
    while let Some(mut path) = branches.pop() {
        loop {
            let merged_len: usize = path.len() + tail.len();
            if path.len() > anchor_len && path.ends_with(destination) && merged_len >= min_len && merged_len <= max_len {
                debug!("Walk merged at length {} after {} branches", merged_len, leaves);
                path.extend_from_slice(tail);
                return WalkOutcome::Merged(path);
            }
            if merged_len >= max_len {
                break;
            }

            let candidates: Vec<u8> = ranked_extensions(index, &path[path.len()-(w-1)..], threshold);
            let (best, others) = match candidates.split_first() {
                Some(split) => split,
                None => break
            };

            //lowest ranked goes on the stack first so the runner-up is popped next
            for &symbol in others.iter().rev() {
                leaves += 1;
                if leaves > params.max_leaves {
                    debug!("Walk exceeded {} leaves", params.max_leaves);
                    return WalkOutcome::ExceedsLeafBound;
                }
                let mut branch: Vec<u8> = path.clone();
                branch.push(symbol);
                branches.push(branch);
            }
            path.push(*best);
        }
    }
    WalkOutcome::ExceedsDepthBound
}
