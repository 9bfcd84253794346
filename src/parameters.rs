use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Problems with the run configuration. These are all detected once, before any read is processed.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported correction algorithm '{0}', expected 'self' or 'hybrid'")]
    UnknownAlgorithm(String),

    #[error("Minimum k-mer length {min} is larger than the k-mer length {kmer}")]
    KmerLengthOrder { min: usize, kmer: usize },

    #[error("Minimum k-mer length must be at least 2, got {0}")]
    KmerTooShort(usize),

    #[error("Minimum overlap {min} is larger than the maximum overlap {max}")]
    OverlapOrder { min: usize, max: usize },

    #[error("Minimum overlap must be at least 1")]
    ZeroOverlap,

    #[error("Maximum leaves must be at least 1")]
    ZeroLeaves
}

/// Which k-mer spectrum the index was built from.
#[derive(Clone,Copy,Debug,Eq,PartialEq)]
pub enum CorrectionAlgorithm {
    /// the index holds the long reads' own k-mers
    SelfCorrection,
    /// the index holds k-mers from accurate short reads
    Hybrid
}

impl FromStr for CorrectionAlgorithm {
    type Err = ConfigError;

    /// # Examples
    /// ```rust
    /// use fmwalk::parameters::{ConfigError, CorrectionAlgorithm};
    /// assert_eq!("hybrid".parse::<CorrectionAlgorithm>(), Ok(CorrectionAlgorithm::Hybrid));
    /// assert_eq!("Self".parse::<CorrectionAlgorithm>(), Ok(CorrectionAlgorithm::SelfCorrection));
    /// assert_eq!("pbdagcon".parse::<CorrectionAlgorithm>(), Err(ConfigError::UnknownAlgorithm("pbdagcon".to_string())));
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "self" => Ok(CorrectionAlgorithm::SelfCorrection),
            "hybrid" => Ok(CorrectionAlgorithm::Hybrid),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string()))
        }
    }
}

impl fmt::Display for CorrectionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CorrectionAlgorithm::SelfCorrection => write!(f, "self"),
            CorrectionAlgorithm::Hybrid => write!(f, "hybrid")
        }
    }
}

/// stores options for running the correction algorithms
#[derive(Clone,Debug)]
pub struct CorrectionParameters {
    /// Which spectrum the index represents
    pub algorithm: CorrectionAlgorithm,
    /// The maximum number of shorter k-mer lengths tried by the dynamic seed search
    pub num_kmer_rounds: usize,
    /// The nominal k-mer length used for seeds and walks
    pub kmer_length: usize,
    /// The shortest k-mer the dynamic seed search may fall back to
    pub min_kmer_length: usize,
    /// The maximum number of branches a single walk may create
    pub max_leaves: usize,
    /// Seeds shorter than this cannot anchor a walk
    pub min_overlap: usize,
    /// With `min_overlap`, sets how far a bridge may deviate from the target length (`max - min`)
    pub max_overlap: usize,
    /// The minimum count for a walk extension to be considered solid
    pub walk_kmer_threshold: u64,
    /// The minimum count for a k-mer to be used as a seed
    pub seed_kmer_threshold: u64,
    /// If true, the dynamic search tries the longest shorter k-mer first, otherwise the shortest first
    pub search_downward: bool,
    /// Reads with fewer seeds than this get the dynamic seed search
    pub target_seed_count: usize,
    /// Alternate gap distances retried when a walk fails, in order
    pub fallback_walk_distances: Vec<usize>,
    /// Walks whose target length exceeds this are not attempted
    pub max_walk_length: usize,
    /// Will log per-read details if verbose is set to `true`
    pub verbose: bool
}

impl Default for CorrectionParameters {
    fn default() -> Self {
        CorrectionParameters {
            algorithm: CorrectionAlgorithm::Hybrid,
            num_kmer_rounds: 4,
            kmer_length: 19,
            min_kmer_length: 15,
            max_leaves: 32,
            min_overlap: 11,
            max_overlap: 61,
            walk_kmer_threshold: 3,
            seed_kmer_threshold: 5,
            search_downward: true,
            target_seed_count: 10,
            fallback_walk_distances: vec![100, 200, 400],
            max_walk_length: 10000,
            verbose: false
        }
    }
}

impl CorrectionParameters {
    /// Checks the parameter invariants; call once before processing any read.
    /// # Examples
    /// ```rust
    /// use fmwalk::parameters::{ConfigError, CorrectionParameters};
    /// let mut params = CorrectionParameters::default();
    /// assert!(params.validate().is_ok());
    /// params.min_kmer_length = params.kmer_length + 1;
    /// assert!(params.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_kmer_length > self.kmer_length {
            return Err(ConfigError::KmerLengthOrder {
                min: self.min_kmer_length,
                kmer: self.kmer_length
            });
        }
        if self.min_kmer_length < 2 {
            return Err(ConfigError::KmerTooShort(self.min_kmer_length));
        }
        if self.min_overlap > self.max_overlap {
            return Err(ConfigError::OverlapOrder {
                min: self.min_overlap,
                max: self.max_overlap
            });
        }
        if self.min_overlap == 0 {
            return Err(ConfigError::ZeroOverlap);
        }
        if self.max_leaves == 0 {
            return Err(ConfigError::ZeroLeaves);
        }
        Ok(())
    }

    /// How far (in bases) a bridge may be shorter or longer than its target length.
    #[inline]
    pub fn length_tolerance(&self) -> usize {
        self.max_overlap - self.min_overlap
    }

    /// True when there is room below the nominal k-mer length to search for shorter seeds.
    #[inline]
    pub fn dynamic_search_enabled(&self) -> bool {
        self.min_kmer_length < self.kmer_length && self.num_kmer_rounds > 0
    }

    /// The shorter k-mer lengths the dynamic seed search tries, in order.
    /// # Examples
    /// ```rust
    /// use fmwalk::parameters::CorrectionParameters;
    /// let mut params = CorrectionParameters::default();
    /// params.kmer_length = 19;
    /// params.min_kmer_length = 13;
    /// params.num_kmer_rounds = 3;
    /// assert_eq!(params.dynamic_kmer_lengths(), vec![18, 17, 16]);
    /// params.search_downward = false;
    /// assert_eq!(params.dynamic_kmer_lengths(), vec![13, 14, 15]);
    /// ```
    pub fn dynamic_kmer_lengths(&self) -> Vec<usize> {
        if !self.dynamic_search_enabled() {
            return vec![];
        }
        let lengths = self.min_kmer_length..self.kmer_length;
        if self.search_downward {
            lengths.rev().take(self.num_kmer_rounds).collect()
        } else {
            lengths.take(self.num_kmer_rounds).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("SELF".parse::<CorrectionAlgorithm>(), Ok(CorrectionAlgorithm::SelfCorrection));
        assert_eq!("hybrid".parse::<CorrectionAlgorithm>(), Ok(CorrectionAlgorithm::Hybrid));
        let err = "".parse::<CorrectionAlgorithm>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownAlgorithm(String::new()));
        assert_eq!(CorrectionAlgorithm::SelfCorrection.to_string(), "self");
    }

    #[test]
    fn test_validate() {
        let params = CorrectionParameters::default();
        assert_eq!(params.validate(), Ok(()));

        let mut bad = params.clone();
        bad.min_kmer_length = 1;
        assert_eq!(bad.validate(), Err(ConfigError::KmerTooShort(1)));

        let mut bad = params.clone();
        bad.min_overlap = 70;
        assert_eq!(bad.validate(), Err(ConfigError::OverlapOrder { min: 70, max: 61 }));

        let mut bad = params.clone();
        bad.min_overlap = 0;
        assert_eq!(bad.validate(), Err(ConfigError::ZeroOverlap));

        let mut bad = params;
        bad.max_leaves = 0;
        assert_eq!(bad.validate(), Err(ConfigError::ZeroLeaves));
    }

    #[test]
    fn test_dynamic_lengths_clamped() {
        let mut params = CorrectionParameters {
            kmer_length: 9,
            min_kmer_length: 7,
            num_kmer_rounds: 10,
            ..Default::default()
        };
        assert_eq!(params.dynamic_kmer_lengths(), vec![8, 7]);

        //no room below the nominal length
        params.min_kmer_length = 9;
        assert!(!params.dynamic_search_enabled());
        assert!(params.dynamic_kmer_lengths().is_empty());
    }
}
