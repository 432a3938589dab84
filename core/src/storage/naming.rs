//! Sequential log file names: `0000-log.csv` .. `9999-log.csv`

use core::fmt::Write as _;

use hal_abstractions::DirEntry;
use heapless::String;

/// Fixed part of every log file name
pub const LOG_SUFFIX: &str = "-log.csv";

/// Highest sequence number that fits the 4 digit prefix
pub const MAX_SEQUENCE: u16 = 9999;

const DIGITS: usize = 4;
const NAME_LEN: usize = DIGITS + LOG_SUFFIX.len();

/// Name of one log file
pub type LogFileName = String<NAME_LEN>;

/// Build the file name for a sequence number
pub fn file_name(sequence: u16) -> Option<LogFileName> {
    if sequence > MAX_SEQUENCE {
        return None;
    }
    let mut name = LogFileName::new();
    write!(name, "{:04}{}", sequence, LOG_SUFFIX).ok()?;
    Some(name)
}

/// Sequence number of a log file name
///
/// The suffix is matched without regard to ASCII case, FAT volumes report
/// short names in upper case.
pub fn parse_sequence(name: &str) -> Option<u16> {
    if name.len() != NAME_LEN || !name.is_char_boundary(DIGITS) {
        return None;
    }
    let (digits, suffix) = name.split_at(DIGITS);
    if !suffix.eq_ignore_ascii_case(LOG_SUFFIX) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Tracks the highest log file sequence seen while walking a directory
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceScan {
    highest: Option<u16>,
}

impl SequenceScan {
    pub fn observe(&mut self, entry: &DirEntry) {
        if entry.is_dir {
            return;
        }
        if let Some(seq) = parse_sequence(&entry.name) {
            self.highest = Some(self.highest.map_or(seq, |h| h.max(seq)));
        }
    }

    pub fn highest(&self) -> Option<u16> {
        self.highest
    }

    /// Sequence for the next file, `None` once 9999 is taken
    pub fn next_sequence(&self) -> Option<u16> {
        match self.highest {
            None => Some(0),
            Some(MAX_SEQUENCE) => None,
            Some(h) => Some(h + 1),
        }
    }
}
