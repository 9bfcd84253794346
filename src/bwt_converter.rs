extern crate log;

use log::info;
use std::fs;
use std::io::{self, Read, Write};

pub const VC_LEN: usize = 6;      //$ A C G N T
pub const LETTER_BITS: usize = 3; //bits used for the symbol
pub const NUMBER_BITS: usize = 5; //8-LETTER_BITS
pub const NUM_POWER: u64 = 32;    //2**NUMBER_BITS
pub const MASK: u8 = 0x07;        //255 >> NUMBER_BITS
pub const COUNT_MASK: u64 = 0x1F;

const NUMPY_MAGIC: &[u8] = b"\x93NUMPY";
const NUMPY_PREAMBLE_LEN: usize = 10;

/// Run-length encodes a single symbol run into `out`. Each byte holds the symbol in the low 3 bits and 5 bits
/// of the count; runs longer than 31 spill into following bytes of the same symbol, least significant first.
#[inline]
fn push_run(out: &mut Vec<u8>, symbol: u8, mut count: u64) {
    while count > 0 {
        out.push(symbol | (((count & COUNT_MASK) as u8) << LETTER_BITS));
        count >>= NUMBER_BITS;
    }
}

/// Converts a plain text BWT (characters `$ACGNT`, newlines ignored) into the run-length encoded byte format
/// used by `FmIndex`.
/// # Arguments
/// * `bwt` - any reader over the plain BWT characters
/// # Examples
/// ```rust
/// use std::io::Cursor;
/// use fmwalk::bwt_converter::convert_to_vec;
/// let vec = convert_to_vec(Cursor::new("AAC\nC$")).unwrap();
/// assert_eq!(vec, vec![(2 << 3) + 1, (2 << 3) + 2, (1 << 3) + 0]);
/// ```
pub fn convert_to_vec(bwt: impl Read) -> io::Result<Vec<u8>> {
    let mut translate: [u8; 256] = [255; 256];
    for (x, c) in b"$ACGNT".iter().enumerate() {
        translate[*c as usize] = x as u8;
    }

    let mut ret = Vec::<u8>::new();
    let mut curr: u8 = 0;
    let mut count: u64 = 0;
    let mut sym_count: [u64; VC_LEN] = [0; VC_LEN];
    for byte in bwt.bytes() {
        let ch = byte?;
        if ch == b'\n' {
            continue;
        }
        let symbol = translate[ch as usize];
        if symbol == 255 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unexpected symbol in BWT input: {:?}", ch as char)
            ));
        }
        if symbol == curr {
            count += 1;
        } else {
            sym_count[curr as usize] += count;
            push_run(&mut ret, curr, count);
            curr = symbol;
            count = 1;
        }
    }

    //last run
    sym_count[curr as usize] += count;
    push_run(&mut ret, curr, count);
    info!("Converted BWT with symbol counts: {:?}", sym_count);
    Ok(ret)
}

/// Writes a run-length encoded BWT into a numpy `.npy` container (1-D `uint8` array).
/// # Arguments
/// * `rle_bwt` - the run-length encoded BWT
/// * `filename` - the destination file
pub fn save_bwt_numpy(rle_bwt: &[u8], filename: &str) -> io::Result<()> {
    let mut header: String = format!(
        "{{'descr': '|u1', 'fortran_order': False, 'shape': ({},), }}",
        rle_bwt.len()
    );
    //pad so the data starts on a 16-byte boundary, header ends in a newline
    let unpadded: usize = NUMPY_PREAMBLE_LEN + header.len() + 1;
    let padding: usize = (16 - unpadded % 16) % 16;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut file = io::BufWriter::new(fs::File::create(filename)?);
    file.write_all(NUMPY_MAGIC)?;
    file.write_all(&[1, 0])?;
    file.write_all(&(header.len() as u16).to_le_bytes())?;
    file.write_all(header.as_bytes())?;
    file.write_all(rle_bwt)?;
    file.flush()
}

/// Reads the body of a numpy `.npy` file holding a run-length encoded BWT.
/// # Arguments
/// * `filename` - the `.npy` file to load
pub fn load_bwt_numpy(filename: &str) -> io::Result<Vec<u8>> {
    let mut file = fs::File::open(filename)?;
    let mut preamble: [u8; NUMPY_PREAMBLE_LEN] = [0; NUMPY_PREAMBLE_LEN];
    file.read_exact(&mut preamble)?;
    if &preamble[..NUMPY_MAGIC.len()] != NUMPY_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{:?} is not a numpy file", filename)
        ));
    }

    //version 1.0 uses a 2-byte header length, 2.0+ uses 4 bytes
    let header_len: usize = if preamble[6] == 1 {
        preamble[8] as usize + 256 * preamble[9] as usize
    } else {
        let mut extra: [u8; 2] = [0; 2];
        file.read_exact(&mut extra)?;
        u32::from_le_bytes([preamble[8], preamble[9], extra[0], extra[1]]) as usize
    };
    let mut header: Vec<u8> = vec![0; header_len];
    file.read_exact(&mut header)?;

    let mut body: Vec<u8> = Vec::new();
    file.read_to_end(&mut body)?;
    info!("Loaded BWT file {:?} with {} compressed values", filename, body.len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_convert_to_vec() {
        let vec = convert_to_vec(Cursor::new("ACGNT$")).unwrap();
        assert_eq!(vec, vec![8+1, 8+2, 8+3, 8+4, 8+5, 8+0]);
    }

    #[test]
    fn test_newline() {
        //newlines at start, end, mid-run and between chars
        let vec = convert_to_vec(Cursor::new("\n$$\n$$\nAAA\n")).unwrap();
        assert_eq!(vec, vec![(4 << 3) + 0, (3 << 3) + 1]);
    }

    #[test]
    fn test_compression() {
        let vec = convert_to_vec(Cursor::new("A".repeat(32+32*32*3))).unwrap();
        assert_eq!(vec, vec![1, 9, 1 + (3 << 3)]);

        let vec = convert_to_vec(Cursor::new("A".repeat(31) + &"C".repeat(31))).unwrap();
        assert_eq!(vec, vec![249, 250]);
    }

    #[test]
    fn test_bad_symbol() {
        let result = convert_to_vec(Cursor::new("ACXT"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_numpy_round_trip() {
        let file: NamedTempFile = Builder::new().prefix("temp_bwt_").suffix(".npy").tempfile().unwrap();
        let filename: String = file.path().to_str().unwrap().to_string();
        let rle: Vec<u8> = convert_to_vec(Cursor::new("TG$$CAGCCG")).unwrap();
        save_bwt_numpy(&rle, &filename).unwrap();

        //data must start on a 16-byte boundary
        let raw = fs::read(&filename).unwrap();
        assert_eq!((raw.len() - rle.len()) % 16, 0);
        assert_eq!(load_bwt_numpy(&filename).unwrap(), rle);
    }

    #[test]
    fn test_not_numpy() {
        let mut file: NamedTempFile = Builder::new().suffix(".npy").tempfile().unwrap();
        writeln!(file, "this is not a numpy file").unwrap();
        let filename: String = file.path().to_str().unwrap().to_string();
        assert_eq!(load_bwt_numpy(&filename).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }
}
