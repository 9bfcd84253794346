
use crate::string_util::{convert_itos, convert_stoi};

/// Builds a multi-string BWT for a small collection of strings entirely in memory.
/// Each string is terminated by `$` and the suffixes of the concatenation are sorted with the alphabet order
/// `$ < A < C < G < N < T`, which matches the symbol order the FM-index expects.
/// This is quadratic in the worst case and meant for tests and benchmarks; production BWTs should be built with
/// a dedicated tool (e.g. `ropebwt2`) and converted with `bwt_converter`.
/// # Arguments
/// * `data` - the strings to index
/// # Examples
/// ```rust
/// use fmwalk::bwt_builder::create_bwt_from_strings;
/// let bwt = create_bwt_from_strings(&["ACGT", "CCGG"]);
/// assert_eq!(bwt.len(), 10);
/// assert_eq!(bwt.matches('$').count(), 2);
/// ```
pub fn create_bwt_from_strings(data: &[&str]) -> String {
    let mut text: Vec<u8> = Vec::new();
    for s in data {
        text.extend(convert_stoi(s));
        text.push(0);
    }

    let text_len = text.len();
    let mut suffixes: Vec<usize> = (0..text_len).collect();
    suffixes.sort_unstable_by(|&a, &b| text[a..].cmp(&text[b..]));

    let bwt: Vec<u8> = suffixes.iter()
        .map(|&pos| text[(pos + text_len - 1) % text_len])
        .collect();
    convert_itos(&bwt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_string() {
        //suffixes of "ACGT$": $, ACGT$, CGT$, GT$, T$
        assert_eq!(create_bwt_from_strings(&["ACGT"]), "T$ACG");
    }

    #[test]
    fn test_symbol_totals() {
        let bwt = create_bwt_from_strings(&["ACGT", "CCGG", "N"]);
        assert_eq!(bwt.len(), 13);
        assert_eq!(bwt.matches('$').count(), 3);
        assert_eq!(bwt.matches('C').count(), 3);
        assert_eq!(bwt.matches('G').count(), 3);
        assert_eq!(bwt.matches('N').count(), 1);
    }
}
