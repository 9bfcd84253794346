
use bio::io::fasta;
use std::collections::HashMap;
use std::io;

use crate::correction::{CorrectionResult, CorrectionStats, PairCorrectionResult};

/// Wraps two `bio::io::fasta::Writer`s and forces results to be written in read index order.
/// Results that are not ready to be written are stored until the results before them arrive.
/// Reads with at least one bridged gap go to the corrected sink; all others are written, unmodified, to the
/// discard sink. The mates of a pair share one read index and stay together: if either mate was corrected, both
/// go to the corrected sink.
/// # Examples
/// ```rust
/// use fmwalk::correction::{CorrectionResult, CorrectionStats};
/// use fmwalk::result_writer::OrderedResultWriter;
///
/// let mut corrected: Vec<u8> = Vec::new();
/// let mut discarded: Vec<u8> = Vec::new();
/// {
///     let mut writer = OrderedResultWriter::new(&mut corrected, &mut discarded);
///     let result_b = CorrectionResult {
///         read_index: 1,
///         label: "b".to_string(),
///         original_seq: "ACGTTTACGT".to_string(),
///         corrected_seq: "ACGTACGT".to_string(),
///         merged: true,
///         rekmerized: false,
///         fragments: vec!["ACGTACGT".to_string()],
///         stats: CorrectionStats { corrected_num: 1, ..Default::default() }
///     };
///     let result_a = CorrectionResult {
///         read_index: 0,
///         label: "a".to_string(),
///         original_seq: "GCTA".to_string(),
///         corrected_seq: "GCTA".to_string(),
///         merged: false,
///         rekmerized: false,
///         fragments: vec![],
///         stats: CorrectionStats::default()
///     };
///     writer.write_result(result_b).unwrap();
///     writer.write_result(result_a).unwrap();
///     let totals = writer.finish().unwrap();
///     assert_eq!(totals.corrected_num, 1);
/// }
/// assert_eq!(String::from_utf8(corrected).unwrap(), ">b\nACGTACGT\n");
/// assert_eq!(String::from_utf8(discarded).unwrap(), ">a\nGCTA\n");
/// ```
pub struct OrderedResultWriter<C: io::Write, D: io::Write> {
    /// reads with at least one corrected gap
    corrected_writer: fasta::Writer<C>,
    /// reads that could not be corrected
    discard_writer: fasta::Writer<D>,
    /// contains results we aren't ready to write yet, one or two reads per index
    map_store: HashMap<u64, Vec<CorrectionResult>>,
    /// write each corrected fragment as its own record instead of the whole read
    split_fragments: bool,
    /// the index for the next read to write
    current_index: u64,
    /// the summed counters of every written result
    totals: CorrectionStats,
    reads_corrected: u64,
    reads_discarded: u64
}

impl<C: io::Write, D: io::Write> OrderedResultWriter<C, D> {
    /// Creates an `OrderedResultWriter` wrapping two buffers.
    /// # Arguments
    /// * `corrected` - where corrected reads are written
    /// * `discarded` - where uncorrected reads are written
    pub fn new(corrected: C, discarded: D) -> Self {
        OrderedResultWriter {
            corrected_writer: fasta::Writer::new(corrected),
            discard_writer: fasta::Writer::new(discarded),
            map_store: HashMap::<u64, Vec<CorrectionResult>>::new(),
            split_fragments: false,
            current_index: 0,
            totals: CorrectionStats::default(),
            reads_corrected: 0,
            reads_discarded: 0
        }
    }

    /// Writes corrected reads as one record per fragment, labeled `<label>_<n>`.
    pub fn split_fragments(mut self, split: bool) -> Self {
        self.split_fragments = split;
        self
    }

    /// Writes a result to the right sink or buffers it if earlier results are still missing.
    /// # Arguments
    /// * `result` - a correction result with its read index
    pub fn write_result(&mut self, result: CorrectionResult) -> io::Result<()> {
        let read_index: u64 = result.read_index;
        self.store(read_index, vec![result])
    }

    /// Writes both mates of a pair under the pair's read index.
    /// # Arguments
    /// * `pair_result` - the corrected mates with their shared read index
    pub fn write_pair_result(&mut self, pair_result: PairCorrectionResult) -> io::Result<()> {
        self.store(pair_result.read_index, vec![pair_result.first, pair_result.second])
    }

    fn store(&mut self, read_index: u64, item: Vec<CorrectionResult>) -> io::Result<()> {
        if read_index < self.current_index {
            return Err(io::Error::new(io::ErrorKind::Other, "Read index is smaller than next expected index"));
        }
        if self.map_store.contains_key(&read_index) {
            return Err(io::Error::new(io::ErrorKind::Other, "Read index was already present in the map_store"));
        }
        self.map_store.insert(read_index, item);
        self.drain_map_store()
    }

    fn drain_map_store(&mut self) -> io::Result<()> {
        while let Some(item) = self.map_store.remove(&self.current_index) {
            let keep: bool = item.iter().any(|result| result.stats.corrected_num > 0);
            for result in item {
                if keep {
                    self.write_corrected(&result)?;
                    self.reads_corrected += 1;
                } else {
                    let record = fasta::Record::with_attrs(&result.label, None, result.original_seq.as_bytes());
                    self.discard_writer.write_record(&record)?;
                    self.reads_discarded += 1;
                }
                self.totals += result.stats;
            }
            self.current_index += 1;
        }
        Ok(())
    }

    fn write_corrected(&mut self, result: &CorrectionResult) -> io::Result<()> {
        if self.split_fragments && !result.fragments.is_empty() {
            for (i, fragment) in result.fragments.iter().enumerate() {
                let label: String = format!("{}_{}", result.label, i);
                let record = fasta::Record::with_attrs(&label, None, fragment.as_bytes());
                self.corrected_writer.write_record(&record)?;
            }
            Ok(())
        } else {
            let record = fasta::Record::with_attrs(&result.label, None, result.corrected_seq.as_bytes());
            self.corrected_writer.write_record(&record)
        }
    }

    /// The counters of every result written so far.
    pub fn totals(&self) -> CorrectionStats {
        self.totals
    }

    /// Number of reads written to the corrected sink
    pub fn reads_corrected(&self) -> u64 {
        self.reads_corrected
    }

    /// Number of reads written to the discard sink
    pub fn reads_discarded(&self) -> u64 {
        self.reads_discarded
    }

    /// Number of results waiting on an earlier read index
    pub fn pending(&self) -> usize {
        self.map_store.len()
    }

    /// Flushes both sinks, call before trying to read anything.
    pub fn flush(&mut self) -> io::Result<()> {
        self.drain_map_store()?;
        self.corrected_writer.flush()?;
        self.discard_writer.flush()
    }

    /// Drains everything, flushes both sinks, and returns the run totals. Fails if some read index never arrived.
    pub fn finish(mut self) -> io::Result<CorrectionStats> {
        self.flush()?;
        if !self.map_store.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} results are still waiting on read index {}", self.map_store.len(), self.current_index)
            ));
        }
        Ok(self.totals)
    }
}
