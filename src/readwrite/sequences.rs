use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};

use crate::core::network::HostId;
use crate::encoding::{EncodedSequence, TranslationTable};
use crate::errors::{ContagionError, Result};

/// Initial pathogen sequences of every inoculated host.
pub type Inoculum = BTreeMap<HostId, Vec<EncodedSequence>>;

/// Reads host-tagged sequences and encodes them with `table`.
///
/// ```text
/// # comment
/// % U:0 P:1
/// >h:0
/// UUPUUPUPUUPPUUPUUPUPPPUU
/// ```
///
/// A header line starts with `>` and contains the tag `h:<id>` of the host that receives the
/// sequence. Sequence lines up to the next header are concatenated. Lines starting with `%`
/// add `symbol:code` pairs to a copy of `table` that is used for all following lines; characters
/// without a code are dropped.
pub fn read_sequences(reader: &mut dyn BufRead, table: &TranslationTable) -> Result<Inoculum> {
    let mut table = table.clone();
    let mut inoculum = Inoculum::new();
    let mut current_host: Option<HostId> = None;
    let mut current_sequence = EncodedSequence::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;

        if line.starts_with('#') {
            continue;
        } else if let Some(pairs) = line.strip_prefix('%') {
            update_table(&mut table, pairs, line_no)?;
        } else if line.starts_with('>') {
            if let Some(host) = current_host {
                commit(&mut inoculum, host, &mut current_sequence);
            }
            current_host = Some(parse_host_tag(&line, line_no)?);
        } else {
            let before = current_sequence.len();
            current_sequence.extend(table.encode(&line));
            if current_host.is_none() && current_sequence.len() > before {
                return Err(ContagionError::parse(
                    line_no,
                    "sequence data before the first host header",
                ));
            }
        }
    }
    if let Some(host) = current_host {
        commit(&mut inoculum, host, &mut current_sequence);
    }

    log::info!(
        "Loaded {} sequences for {} hosts",
        inoculum.values().map(Vec::len).sum::<usize>(),
        inoculum.len()
    );
    Ok(inoculum)
}

pub fn read_sequences_from_file(path: &str, table: &TranslationTable) -> Result<Inoculum> {
    let file = fs::File::open(path)
        .map_err(|err| ContagionError::IoError(format!("Failed to read from {path}: {err}")))?;
    let mut reader = BufReader::new(file);
    read_sequences(&mut reader, table)
}

fn commit(inoculum: &mut Inoculum, host: HostId, sequence: &mut EncodedSequence) {
    if sequence.is_empty() {
        return;
    }
    inoculum
        .entry(host)
        .or_default()
        .push(std::mem::take(sequence));
}

fn update_table(table: &mut TranslationTable, pairs: &str, line_no: usize) -> Result<()> {
    // tighten `U : 0` into `U:0` before splitting into pairs
    let pairs = pairs.split(':').map(str::trim).collect::<Vec<_>>().join(":");
    for pair in pairs.split_whitespace() {
        let Some((symbol, code)) = pair.split_once(':') else {
            log::debug!("Ignoring token '{pair}' in translation line {line_no}");
            continue;
        };
        let code = code.parse().map_err(|_| {
            ContagionError::parse(line_no, format!("invalid translation code '{code}'"))
        })?;
        let mut chars = symbol.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => table.insert(symbol, code),
            _ => log::warn!(
                "Ignoring translation of '{symbol}' in line {line_no}, symbols must be single characters"
            ),
        }
    }
    Ok(())
}

/// Find the host id of the first `h:<digits>` tag in a header line. The `h` must start a word,
/// so `length:30` is not a tag.
fn parse_host_tag(line: &str, line_no: usize) -> Result<HostId> {
    let digits = line
        .match_indices('h')
        .filter(|(idx, _)| {
            line[..*idx]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric() && c != '_')
        })
        .filter_map(|(idx, _)| line[idx + 1..].trim_start().strip_prefix(':'))
        .map(|rest| {
            let rest = rest.trim_start();
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            &rest[..end]
        })
        .find(|digits| !digits.is_empty())
        .ok_or_else(|| ContagionError::parse(line_no, "missing host tag 'h:<id>' in header"))?;
    digits
        .parse()
        .map_err(|_| ContagionError::parse(line_no, format!("invalid host id '{digits}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SEQUENCES: &str = "\
# two hosts
% U:0 P:1
>h:0
UUPUUPUPUUPPUUPUUPUPPPUU
>sample h:1
UUUU
PPPP
>h:0
PU
";

    fn read(text: &str, table: &TranslationTable) -> Result<Inoculum> {
        read_sequences(&mut text.as_bytes(), table)
    }

    #[test]
    fn single_host() {
        let table = TranslationTable::from_pairs([('U', 0), ('P', 1)]);
        let inoculum = read(">h:0\nUUPUUPUPUUPPUUPUUPUPPPUU", &table).unwrap();
        assert_eq!(inoculum.len(), 1);
        let sequences = &inoculum[&0];
        assert_eq!(sequences.len(), 1);
        let expected: EncodedSequence = "UUPUUPUPUUPPUUPUUPUPPPUU"
            .chars()
            .map(|c| if c == 'U' { 0 } else { 1 })
            .collect();
        assert_eq!(sequences[0].len(), 24);
        assert_eq!(sequences[0], expected);
    }

    #[test]
    fn records_are_committed_per_host() {
        let inoculum = read(SEQUENCES, &TranslationTable::new()).unwrap();
        assert_eq!(inoculum[&0].len(), 2);
        assert_eq!(inoculum[&0][1], vec![1, 0]);
        assert_eq!(inoculum[&1], vec![vec![0, 0, 0, 0, 1, 1, 1, 1]]);
    }

    #[test]
    fn translation_applies_to_later_lines() {
        let table = TranslationTable::from_pairs([('A', 0)]);
        let text = ">h:3\nAC\n% C : 1 G:2\nACG\n";
        let inoculum = read(text, &table).unwrap();
        assert_eq!(inoculum[&3], vec![vec![0, 0, 1, 2]]);
        // the caller's table is left alone
        assert_eq!(table.translate('C'), None);
    }

    #[test]
    fn unknown_characters_are_dropped() {
        let table = TranslationTable::from_pairs([('U', 0), ('P', 1)]);
        let inoculum = read(">h:0\nU-P*U x\n", &table).unwrap();
        assert_eq!(inoculum[&0], vec![vec![0, 1, 0]]);
    }

    #[test]
    fn empty_records_are_skipped() {
        let table = TranslationTable::from_pairs([('U', 0)]);
        let inoculum = read(">h:0\n>h:1\nU\n", &table).unwrap();
        assert!(!inoculum.contains_key(&0));
        assert_eq!(inoculum[&1], vec![vec![0]]);
    }

    #[test]
    fn invalid_translation_code() {
        let error = read("# codes\n% U:x\n", &TranslationTable::new()).unwrap_err();
        assert_eq!(error.line(), Some(2));
        let error = read("% U:300\n", &TranslationTable::new()).unwrap_err();
        assert_eq!(error.line(), Some(1));
    }

    #[test]
    fn invalid_host_id() {
        let table = TranslationTable::from_pairs([('U', 0)]);
        assert_eq!(read(">h:0\nU\n>h:-2\n", &table).unwrap_err().line(), Some(3));
        assert_eq!(read(">host 1\nU\n", &table).unwrap_err().line(), Some(1));
    }

    #[test]
    fn host_tag_needs_digits() {
        let table = TranslationTable::from_pairs([('U', 0)]);
        let inoculum = read(">length:30 h:0\nUU\n", &table).unwrap();
        assert_eq!(inoculum.keys().copied().collect::<Vec<_>>(), vec![0]);

        let inoculum = read(">path:/x h : 2;depth:5\nU\n", &table).unwrap();
        assert_eq!(inoculum[&2], vec![vec![0]]);

        let error = read(">h:99999999999999999999999\nU\n", &table).unwrap_err();
        assert_eq!(error.line(), Some(1));
    }

    #[test]
    fn sequence_before_header() {
        let table = TranslationTable::from_pairs([('U', 0)]);
        assert_eq!(read("UU\n>h:0\n", &table).unwrap_err().line(), Some(1));
    }

    #[test]
    #[serial]
    fn read_file() {
        let path = std::env::temp_dir().join("contagion_test_sequences.txt");
        std::fs::write(&path, SEQUENCES).unwrap();
        let inoculum =
            read_sequences_from_file(path.to_str().unwrap(), &TranslationTable::new()).unwrap();
        assert_eq!(inoculum.len(), 2);
        std::fs::remove_file(&path).unwrap();
    }
}
