
extern crate clap;
extern crate env_logger;
extern crate exitcode;

use clap::{Arg, App, value_t};
use log::{info, error};
use std::fs::File;
use std::io::{self, BufReader};

use fmwalk::bwt_converter::{convert_to_vec, save_bwt_numpy};

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn main() {
    //initialize logging for our benefit later
    env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut in_fn: String = "stdin".to_string();
    let bwt_fn: String;

    let matches = App::new("FMWalk BWT Converter")
        .version(VERSION.unwrap_or("?"))
        .about("Run-length encodes a plain text BWT into the numpy format loaded by fmwalk")
        .arg(Arg::with_name("in_fn")
            .short("i")
            .long("input")
            .takes_value(true)
            .help("The plain BWT, characters $ACGNT (default: stdin)"))
        .arg(Arg::with_name("COMP_MSBWT.NPY")
            .help("The location to store the compressed BWT")
            .required(true)
            .index(1))
        .get_matches();

    bwt_fn = matches.value_of("COMP_MSBWT.NPY").unwrap_or_default().to_string();
    in_fn = value_t!(matches.value_of("in_fn"), String).unwrap_or(in_fn);

    info!("Input parameters (required):");
    info!("\tInput BWT: \"{}\"", in_fn);
    let input_reader: Box<dyn io::Read> = if in_fn == "stdin" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        match File::open(&in_fn) {
            Ok(fp) => Box::new(BufReader::new(fp)),
            Err(e) => {
                error!("Failed to open BWT file: {:?}", e);
                std::process::exit(exitcode::NOINPUT);
            }
        }
    };

    info!("\tOutput BWT: \"{}\"", bwt_fn);
    let comp_bwt: Vec<u8> = match convert_to_vec(input_reader) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to convert BWT: {:?}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    if let Err(e) = save_bwt_numpy(&comp_bwt, &bwt_fn) {
        error!("Failed to write output BWT file: {:?}", e);
        std::process::exit(exitcode::CANTCREAT);
    }

    info!("RLE-BWT conversion complete.");
}
