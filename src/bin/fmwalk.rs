
extern crate clap;
extern crate env_logger;
extern crate exitcode;
extern crate log;
extern crate needletail;

use clap::{Arg, App, value_t, values_t};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{info, error};
use needletail::parse_fastx_file;
use std::fs::File;
use std::io::{self, BufWriter};
use std::sync::{Arc, mpsc};
use threadpool::ThreadPool;

use fmwalk::correction::{
    build_strategy, correction_job, correction_pair_job, CorrectionResult, CorrectionStrategy, LongRead,
    PairCorrectionResult, ReadPair
};
use fmwalk::fm_index::FmIndex;
use fmwalk::parameters::{CorrectionAlgorithm, CorrectionParameters};
use fmwalk::result_writer::OrderedResultWriter;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Opens an output file, gzip compressing it when the name ends in `.gz`.
fn open_output(filename: &str) -> io::Result<Box<dyn io::Write>> {
    let file = BufWriter::new(File::create(filename)?);
    if filename.ends_with(".gz") {
        Ok(Box::new(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(Box::new(file))
    }
}

/// One unit of work for the pool, a single read or two interleaved mates
enum WorkItem {
    Single(LongRead),
    Pair(ReadPair)
}

enum JobResult {
    Single(CorrectionResult),
    Pair(PairCorrectionResult)
}

fn receive_result<C: io::Write, D: io::Write>(rx: &mpsc::Receiver<JobResult>, writer: &mut OrderedResultWriter<C, D>, verbose_mode: bool) {
    let rx_value: JobResult = match rx.recv() {
        Ok(v) => v,
        Err(e) => {
            error!("Correction worker channel closed early: {:?}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let write_status = match rx_value {
        JobResult::Single(result) => {
            if verbose_mode {
                info!("Job #{:?}: {} seeds, {}/{} gaps corrected", result.read_index, result.stats.total_seed_num, result.stats.corrected_num, result.stats.total_walk_num);
            }
            writer.write_result(result)
        },
        JobResult::Pair(pair_result) => {
            if verbose_mode {
                let stats = pair_result.stats();
                info!("Job #{:?}: pair with {} seeds, {}/{} gaps corrected", pair_result.read_index, stats.total_seed_num, stats.corrected_num, stats.total_walk_num);
            }
            writer.write_pair_result(pair_result)
        }
    };
    if let Err(e) = write_status {
        error!("Failed while writing read correction: {:?}", e);
        std::process::exit(exitcode::IOERR);
    }
}

fn main() {
    //initialize logging for our benefit later
    env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

    //non-cli parameters
    const JOB_SLOTS: u64 = 10000;
    const UPDATE_INTERVAL: u64 = 10000;

    //this is the CLI block, params that get populated appear before
    let defaults: CorrectionParameters = CorrectionParameters::default();
    let mut threads: usize = 1;
    let mut begin_id: u64 = 0;
    let mut end_id: u64 = 0xFFFFFFFFFFFFFFFF;
    let mut cache_size: usize = 8;

    let matches = App::new("FMWalk")
        .version(VERSION.unwrap_or("?"))
        .about("FM-index walk long read corrector - bridges solid seeds through a k-mer index")
        .arg(Arg::with_name("verbose_mode")
            .short("v")
            .long("verbose")
            .help("enable verbose output"))
        .arg(Arg::with_name("algorithm")
            .short("a")
            .long("algorithm")
            .takes_value(true)
            .possible_values(&["self", "hybrid"])
            .help("index source: the long reads themselves or accurate short reads (default: hybrid)"))
        .arg(Arg::with_name("kmer_length")
            .short("k")
            .long("kmer")
            .takes_value(true)
            .help("k-mer length for seeds and walks (default: 19)"))
        .arg(Arg::with_name("min_kmer_length")
            .short("K")
            .long("min_kmer")
            .takes_value(true)
            .help("smallest k-mer length for the dynamic seed search (default: 15)"))
        .arg(Arg::with_name("num_kmer_rounds")
            .short("r")
            .long("rounds")
            .takes_value(true)
            .help("number of shorter k-mer lengths to try when seeds are sparse (default: 4)"))
        .arg(Arg::with_name("max_leaves")
            .short("L")
            .long("max_leaves")
            .takes_value(true)
            .help("maximum branches per walk (default: 32)"))
        .arg(Arg::with_name("min_overlap")
            .long("min_overlap")
            .takes_value(true)
            .help("minimum seed length to anchor a walk (default: 11)"))
        .arg(Arg::with_name("max_overlap")
            .long("max_overlap")
            .takes_value(true)
            .help("with --min_overlap, sets the walk length tolerance (default: 61)"))
        .arg(Arg::with_name("walk_threshold")
            .short("w")
            .long("walk_threshold")
            .takes_value(true)
            .help("minimum k-mer count to extend a walk (default: 3)"))
        .arg(Arg::with_name("seed_threshold")
            .short("s")
            .long("seed_threshold")
            .takes_value(true)
            .help("minimum k-mer count for a seed (default: 5)"))
        .arg(Arg::with_name("upward")
            .long("upward")
            .help("try the shortest k-mer first in the dynamic seed search"))
        .arg(Arg::with_name("target_seeds")
            .long("target_seeds")
            .takes_value(true)
            .help("reads with fewer seeds get the dynamic seed search (default: 10)"))
        .arg(Arg::with_name("fallback")
            .short("f")
            .long("fallback")
            .multiple(true)
            .takes_value(true)
            .help("gap distances retried when a walk fails, can be specified multiple times (default: \"-f 100 200 400\")"))
        .arg(Arg::with_name("max_walk")
            .long("max_walk")
            .takes_value(true)
            .help("longest bridge that will be attempted (default: 10000)"))
        .arg(Arg::with_name("threads")
            .short("t")
            .long("threads")
            .takes_value(true)
            .help("number of correction threads (default: 1)"))
        .arg(Arg::with_name("begin_id")
            .short("b")
            .long("begin_index")
            .takes_value(true)
            .help("index of read to start with (default: 0)"))
        .arg(Arg::with_name("end_id")
            .short("e")
            .long("end_index")
            .takes_value(true)
            .help("index of read to end with (default: end of file)"))
        .arg(Arg::with_name("cache_size")
            .short("C")
            .long("cache_size")
            .takes_value(true)
            .help("the length of k-mer to precompute in cache (default: 8)"))
        .arg(Arg::with_name("interleaved")
            .short("p")
            .long("interleaved")
            .help("consecutive records are mates of a pair, kept together in the output"))
        .arg(Arg::with_name("split_fragments")
            .long("split_fragments")
            .help("write each corrected stretch of a read as its own record"))
        .arg(Arg::with_name("stats_fn")
            .long("stats")
            .takes_value(true)
            .help("write the run statistics as JSON to this file"))
        .arg(Arg::with_name("COMP_MSBWT.NPY")
            .help("The compressed BWT file holding the index reads")
            .required(true)
            .index(1))
        .arg(Arg::with_name("LONG_READS.FA")
            .help("The FASTX file with uncorrected reads")
            .required(true)
            .index(2))
        .arg(Arg::with_name("CORRECTED_READS.FA")
            .help("The FASTA file to write corrected reads to")
            .required(true)
            .index(3))
        .arg(Arg::with_name("DISCARDED_READS.FA")
            .help("The FASTA file to write uncorrected reads to")
            .required(true)
            .index(4))
        .get_matches();

    //pull out required values
    let bwt_fn: String = matches.value_of("COMP_MSBWT.NPY").unwrap_or_default().to_string();
    let long_read_fn: String = matches.value_of("LONG_READS.FA").unwrap_or_default().to_string();
    let corrected_read_fn: String = matches.value_of("CORRECTED_READS.FA").unwrap_or_default().to_string();
    let discarded_read_fn: String = matches.value_of("DISCARDED_READS.FA").unwrap_or_default().to_string();

    //now check options
    let verbose_mode: bool = matches.is_present("verbose_mode");
    let interleaved: bool = matches.is_present("interleaved");
    let split_fragments: bool = matches.is_present("split_fragments");
    threads = value_t!(matches.value_of("threads"), usize).unwrap_or(threads);
    begin_id = value_t!(matches.value_of("begin_id"), u64).unwrap_or(begin_id);
    end_id = value_t!(matches.value_of("end_id"), u64).unwrap_or(end_id);
    cache_size = value_t!(matches.value_of("cache_size"), usize).unwrap_or(cache_size);
    let stats_fn: Option<String> = matches.value_of("stats_fn").map(|s| s.to_string());

    let algorithm: CorrectionAlgorithm = match matches.value_of("algorithm").unwrap_or("hybrid").parse() {
        Ok(a) => a,
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::CONFIG);
        }
    };
    let my_params: CorrectionParameters = CorrectionParameters {
        algorithm,
        num_kmer_rounds: value_t!(matches.value_of("num_kmer_rounds"), usize).unwrap_or(defaults.num_kmer_rounds),
        kmer_length: value_t!(matches.value_of("kmer_length"), usize).unwrap_or(defaults.kmer_length),
        min_kmer_length: value_t!(matches.value_of("min_kmer_length"), usize).unwrap_or(defaults.min_kmer_length),
        max_leaves: value_t!(matches.value_of("max_leaves"), usize).unwrap_or(defaults.max_leaves),
        min_overlap: value_t!(matches.value_of("min_overlap"), usize).unwrap_or(defaults.min_overlap),
        max_overlap: value_t!(matches.value_of("max_overlap"), usize).unwrap_or(defaults.max_overlap),
        walk_kmer_threshold: value_t!(matches.value_of("walk_threshold"), u64).unwrap_or(defaults.walk_kmer_threshold),
        seed_kmer_threshold: value_t!(matches.value_of("seed_threshold"), u64).unwrap_or(defaults.seed_kmer_threshold),
        search_downward: !matches.is_present("upward"),
        target_seed_count: value_t!(matches.value_of("target_seeds"), usize).unwrap_or(defaults.target_seed_count),
        fallback_walk_distances: values_t!(matches.values_of("fallback"), usize).unwrap_or_else(|_| defaults.fallback_walk_distances.clone()),
        max_walk_length: value_t!(matches.value_of("max_walk"), usize).unwrap_or(defaults.max_walk_length),
        verbose: verbose_mode
    };

    info!("Input parameters (required):");
    info!("\tBWT: \"{}\"", bwt_fn);
    if let Err(e) = File::open(&bwt_fn) {
        error!("Failed to open BWT file: {:?}", e);
        std::process::exit(exitcode::NOINPUT);
    }
    info!("\tInput reads: \"{}\"", long_read_fn);
    if let Err(e) = File::open(&long_read_fn) {
        error!("Failed to open input reads file: {:?}", e);
        std::process::exit(exitcode::NOINPUT);
    }

    info!("Execution Parameters:");
    info!("\tverbose: {}", verbose_mode);
    info!("\tthreads: {}", threads);
    info!("\tcache size: {}", cache_size);
    info!("\tinterleaved pairs: {}", interleaved);
    info!("Correction Parameters:");
    info!("\t{} to correct: [{}, {})", if interleaved { "pairs" } else { "reads" }, begin_id, end_id);
    if begin_id > end_id {
        error!("--begin_index set to value larger than --end_index");
        std::process::exit(exitcode::DATAERR);
    }
    info!("\talgorithm: {}", my_params.algorithm);
    info!("\tk-mer length: {} (min {}, {} rounds, {})", my_params.kmer_length, my_params.min_kmer_length, my_params.num_kmer_rounds,
        if my_params.search_downward { "downward" } else { "upward" });
    info!("\tseed threshold: {}, target seeds: {}", my_params.seed_kmer_threshold, my_params.target_seed_count);
    info!("\twalk threshold: {}, max leaves: {}", my_params.walk_kmer_threshold, my_params.max_leaves);
    info!("\toverlap: [{}, {}], max walk: {}", my_params.min_overlap, my_params.max_overlap, my_params.max_walk_length);
    info!("\tfallback distances: {:?}", my_params.fallback_walk_distances);
    if let Err(e) = my_params.validate() {
        error!("Invalid correction parameters: {}", e);
        std::process::exit(exitcode::CONFIG);
    }
    let arc_params: Arc<CorrectionParameters> = Arc::new(my_params);

    info!("Output files:");
    info!("\tcorrected reads: \"{}\"", corrected_read_fn);
    info!("\tdiscarded reads: \"{}\"", discarded_read_fn);
    info!("\tsplit fragments: {}", split_fragments);
    let corrected_file = match open_output(&corrected_read_fn) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create output corrected reads file: {:?}", e);
            std::process::exit(exitcode::CANTCREAT);
        }
    };
    let discarded_file = match open_output(&discarded_read_fn) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create output discarded reads file: {:?}", e);
            std::process::exit(exitcode::CANTCREAT);
        }
    };
    let mut result_writer = OrderedResultWriter::new(corrected_file, discarded_file).split_fragments(split_fragments);

    //first load the BWT into memory
    let index: FmIndex = match FmIndex::load_numpy_file(&bwt_fn, cache_size) {
        Ok(index) => index,
        Err(e) => {
            error!("Failed to load BWT file: {:?}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    let arc_strategy: Arc<dyn CorrectionStrategy> = build_strategy(arc_params.algorithm, Arc::new(index));

    //we need to set up the multiprocessing components now
    let pool = ThreadPool::new(threads);
    let (tx, rx) = mpsc::channel();

    let mut read_index: u64 = 0;
    let mut jobs_queued: u64 = 0;
    let mut pending_mate: Option<LongRead> = None;
    let mut results_received: u64 = 0;

    info!("Starting read correction processes...");
    match parse_fastx_file(&long_read_fn) {
        Ok(mut fastx_reader) => {
            while let Some(raw_record) = fastx_reader.next() {
                let record = match raw_record {
                    Ok(record) => { record },
                    Err(e) => {
                        error!("Invalid record while parsing long read file: {:?}", e);
                        std::process::exit(exitcode::IOERR);
                    }
                };
                let long_read: LongRead = LongRead {
                    read_index: jobs_queued,
                    label: String::from_utf8_lossy(record.id()).to_string(),
                    seq: String::from_utf8_lossy(&record.seq()).to_string()
                };
                let work_item: WorkItem = if interleaved {
                    match pending_mate.take() {
                        Some(first) => WorkItem::Pair(ReadPair { read_index: jobs_queued, first, second: long_read }),
                        None => {
                            pending_mate = Some(long_read);
                            continue;
                        }
                    }
                } else {
                    WorkItem::Single(long_read)
                };

                if read_index >= begin_id && read_index < end_id {
                    //if we've filled our queue, then we should wait until we get some results back
                    if jobs_queued - results_received >= JOB_SLOTS {
                        receive_result(&rx, &mut result_writer, verbose_mode);
                        results_received += 1;
                        if results_received % UPDATE_INTERVAL == 0 {
                            info!("Processed {} reads...", results_received);
                        }
                    }

                    //clone the transmit channel and submit the pool job
                    let tx = tx.clone();
                    let arc_strategy = arc_strategy.clone();
                    let arc_params = arc_params.clone();
                    pool.execute(move|| {
                        let job_result: JobResult = match work_item {
                            WorkItem::Single(read_data) => JobResult::Single(correction_job(arc_strategy, read_data, arc_params)),
                            WorkItem::Pair(pair_data) => JobResult::Pair(correction_pair_job(arc_strategy, pair_data, arc_params))
                        };
                        tx.send(job_result).expect("channel will be there waiting for the pool");
                    });
                    jobs_queued += 1;
                }
                read_index += 1;
            }
        },
        Err(e) => {
            error!("Failed to open long read file: {:?}", e);
            std::process::exit(exitcode::IOERR);
        }
    }
    if let Some(mate) = pending_mate {
        error!("Interleaved input has an odd number of records, \"{}\" has no mate", mate.label);
        std::process::exit(exitcode::DATAERR);
    }

    while results_received < jobs_queued {
        receive_result(&rx, &mut result_writer, verbose_mode);
        results_received += 1;
        if results_received % UPDATE_INTERVAL == 0 {
            info!("Processed {} reads...", results_received);
        }
    }
    info!("Finished processing {} total {} in range [{}, {})", results_received, if interleaved { "pairs" } else { "reads" }, begin_id, end_id);
    info!("\tcorrected reads: {}", result_writer.reads_corrected());
    info!("\tdiscarded reads: {}", result_writer.reads_discarded());

    let totals = match result_writer.finish() {
        Ok(totals) => totals,
        Err(e) => {
            error!("Failed to finish writing reads: {:?}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    info!("Run statistics:");
    info!("\ttotal read length: {}", totals.total_reads_len);
    info!("\tseeds: {}, walks: {}, seed distance: {}", totals.total_seed_num, totals.total_walk_num, totals.seed_dis);
    info!("\tcorrected gaps: {} ({} bases)", totals.corrected_num, totals.corrected_len);
    info!("\thigh error gaps: {}", totals.high_error_num);
    info!("\texceeded depth: {}, exceeded leaves: {}", totals.exceed_depth_num, totals.exceed_leave_num);

    if let Some(stats_fn) = stats_fn {
        let stats_result = File::create(&stats_fn)
            .and_then(|f| serde_json::to_writer_pretty(f, &totals.to_json()).map_err(io::Error::from));
        if let Err(e) = stats_result {
            error!("Failed to write statistics file: {:?}", e);
            std::process::exit(exitcode::CANTCREAT);
        }
        info!("Statistics written to \"{}\"", stats_fn);
    }
}
