extern crate log;

use log::debug;

use crate::fm_index::KmerIndex;
use crate::parameters::CorrectionParameters;
use crate::seed_finder::Seed;
use crate::walk::{walk_between_seeds, WalkOutcome};

/// How a gap was closed after the primary walk failed.
#[derive(Clone,Debug,Eq,PartialEq)]
pub enum Resolution {
    /// a fallback walk succeeded; holds the merged sequence from the start of the first seed, in integer form
    Bridged(Vec<u8>),
    /// nothing bridged; holds the original read text of the gap followed by the second seed
    Spliced(Vec<u8>)
}

/// Closes a gap that the primary walk could not. Each fallback distance is tried as an alternate gap length, in
/// order; the first walk that merges wins. When all of them fail the original read text is kept, so lowercase
/// bases and ambiguity codes in the gap survive.
/// # Arguments
/// * `index` - the k-mer index
/// * `original` - the full read as it was read from the input
/// * `first` - the upstream seed
/// * `second` - the downstream seed
/// * `params` - the correction parameters
/// # Examples
/// ```rust
/// use fmwalk::fm_index::FmIndex;
/// use fmwalk::high_error::{resolve_gap, Resolution};
/// use fmwalk::parameters::CorrectionParameters;
/// use fmwalk::seed_finder::Seed;
/// use fmwalk::string_util::convert_stoi;
/// let index = FmIndex::from_strings(&["AAACCGT", "GGGTTTA"], 2).unwrap();
/// let original = "AAACCGTtttttGGGTTTA";
/// let read = convert_stoi(original);
/// let first = Seed::new(0, &read[..7]);
/// let second = Seed::new(12, &read[12..]);
/// let resolution = resolve_gap(&index, original.as_bytes(), &first, &second, &CorrectionParameters::default());
/// assert_eq!(resolution, Resolution::Spliced(b"tttttGGGTTTA".to_vec()));
/// ```
pub fn resolve_gap(index: &dyn KmerIndex, original: &[u8], first: &Seed, second: &Seed, params: &CorrectionParameters) -> Resolution {
    for &distance in params.fallback_walk_distances.iter() {
        let target_len: usize = first.len() + distance + second.len();
        if let WalkOutcome::Merged(seq) = walk_between_seeds(index, first, second, target_len, params) {
            debug!("Fallback distance {} bridged a gap of {}", distance, second.start.saturating_sub(first.end()));
            return Resolution::Bridged(seq);
        }
    }

    let gap_start: usize = first.end().min(original.len());
    let splice_end: usize = second.end().max(gap_start).min(original.len());
    Resolution::Spliced(original[gap_start..splice_end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm_index::FmIndex;
    use crate::string_util::{convert_itos, convert_stoi};

    fn gap_params(fallback: Vec<usize>) -> CorrectionParameters {
        CorrectionParameters {
            kmer_length: 7,
            min_kmer_length: 7,
            min_overlap: 3,
            max_overlap: 7,
            walk_kmer_threshold: 1,
            fallback_walk_distances: fallback,
            ..Default::default()
        }
    }

    #[test]
    fn test_fallback_bridges() {
        //the read gap is 5 but the index path has a gap of 12
        let index = FmIndex::from_strings(&["AAACCGTCAGTCCAGTACGGGTTTA"; 2], 2).unwrap();
        let read = convert_stoi("AAACCGTTTTTTGGGTTTA");
        let first = Seed::new(0, &read[..7]);
        let second = Seed::new(12, &read[12..]);

        //the primary target of 19 is out of reach
        let params = gap_params(vec![3, 11]);
        assert_eq!(walk_between_seeds(&index, &first, &second, 19, &params), WalkOutcome::ExceedsDepthBound);

        //distance 3 fails, 11 is within the tolerance of the true gap
        match resolve_gap(&index, b"AAACCGTTTTTTGGGTTTA", &first, &second, &params) {
            Resolution::Bridged(seq) => {
                assert_eq!(convert_itos(&seq), "AAACCGTCAGTCCAGTACGGGTTTA");
            },
            other => panic!("unexpected resolution {:?}", other)
        }
    }

    #[test]
    fn test_splice_raw_gap() {
        let index = FmIndex::from_strings(&["AAACCGT", "GGGTTTA"], 2).unwrap();
        let original = "AAACCGTTTTTTGGGTTTA";
        let read = convert_stoi(original);
        let first = Seed::new(0, &read[..7]);
        let second = Seed::new(12, &read[12..]);
        let resolution = resolve_gap(&index, original.as_bytes(), &first, &second, &gap_params(vec![100, 200, 400]));
        assert_eq!(resolution, Resolution::Spliced(b"TTTTTGGGTTTA".to_vec()));

        //an empty fallback list goes straight to the splice
        let resolution = resolve_gap(&index, original.as_bytes(), &first, &second, &gap_params(vec![]));
        assert_eq!(resolution, Resolution::Spliced(b"TTTTTGGGTTTA".to_vec()));
    }

    #[test]
    fn test_splice_keeps_case_and_ambiguity() {
        let index = FmIndex::from_strings(&["AAACCGT", "GGGTTTA"], 2).unwrap();
        let original = "AAACCGTtRtttGGGTTTA";
        let read = convert_stoi(original);
        assert_eq!(convert_itos(&read[7..12]), "TNTTT");
        let first = Seed::new(0, &read[..7]);
        let second = Seed::new(12, &read[12..]);
        let resolution = resolve_gap(&index, original.as_bytes(), &first, &second, &gap_params(vec![3]));
        assert_eq!(resolution, Resolution::Spliced(b"tRtttGGGTTTA".to_vec()));
    }
}
