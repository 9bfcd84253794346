/// ASCII to integer encoding, anything unexpected becomes `N`
const STRING_TO_INT: [u8; 256] = build_stoi();

/// integer to ASCII encoding
const INT_TO_STRING: [u8; 6] = [
    b'$', b'A', b'C',
    b'G', b'N', b'T'
];

/// complement in the integer space; `$` and `N` map to themselves
pub const COMPLEMENT_INT: [u8; 6] = [0, 5, 3, 2, 4, 1]; //$ACGNT -> $TGCNA

/// the ambiguity symbol in integer form
pub const AMBIGUOUS_INT: u8 = 4;

/// the symbols a walk may extend with, in lexicographic order (A, C, G, T)
pub const EXTENSION_SYMBOLS: [u8; 4] = [1, 2, 3, 5];

const fn build_stoi() -> [u8; 256] {
    let mut ret: [u8; 256] = [AMBIGUOUS_INT; 256];

    ret['$' as usize] = 0;
    ret['A' as usize] = 1;
    ret['C' as usize] = 2;
    ret['G' as usize] = 3;
    ret['T' as usize] = 5;

    ret['a' as usize] = 1;
    ret['c' as usize] = 2;
    ret['g' as usize] = 3;
    ret['t' as usize] = 5;

    ret
}

/// Converts a nucleotide string into integer form. IUPAC ambiguity codes (and anything else
/// that is not `ACGT$`) collapse to `N`.
/// # Arguments
/// * `seq` - the sequence to convert
/// # Examples
/// ```rust
/// use fmwalk::string_util::convert_stoi;
/// assert_eq!(convert_stoi("ACGTN$"), vec![1, 2, 3, 5, 4, 0]);
/// assert_eq!(convert_stoi("acRy"), vec![1, 2, 4, 4]);
/// ```
#[inline]
pub fn convert_stoi(seq: &str) -> Vec<u8> {
    seq.bytes()
        .map(|c| STRING_TO_INT[c as usize])
        .collect()
}

/// Converts an integer sequence back to its string form.
/// # Arguments
/// * `iseq` - the integer sequence to convert
/// # Examples
/// ```rust
/// use fmwalk::string_util::convert_itos;
/// assert_eq!(convert_itos(&[0, 1, 2, 3, 4, 5]), "$ACGNT");
/// ```
#[inline]
pub fn convert_itos(iseq: &[u8]) -> String {
    iseq.iter()
        .map(|&v| INT_TO_STRING[v as usize] as char)
        .collect()
}

/// Reverse complements an integer sequence.
/// # Examples
/// ```rust
/// use fmwalk::string_util::reverse_complement_i;
/// assert_eq!(reverse_complement_i(&[0, 1, 2, 3, 4, 5]), vec![1, 4, 2, 3, 5, 0]); //"ANCGT$"
/// ```
#[inline]
pub fn reverse_complement_i(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&c| COMPLEMENT_INT[c as usize])
        .collect()
}

/// Returns true if the integer sequence contains an `N` or a sentinel, i.e. something that can
/// never be part of a solid k-mer.
#[inline]
pub fn has_ambiguity(seq: &[u8]) -> bool {
    seq.iter().any(|&c| c == AMBIGUOUS_INT || c == 0)
}
