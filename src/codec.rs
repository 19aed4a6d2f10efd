//! Share value encoding
//!
//! A share record's value is the list of its export option strings packed
//! into one blob: entries are separated by a single NUL byte, with no NUL
//! after the last entry. An empty list is a zero-length value.
//!
//! ```text
//!   entries:  ["rw", "async", "-maproot=root"]
//!   blob:     r w \0 a s y n c \0 - m a p r o o t = r o o t
//! ```

/// Separator between option entries in a stored value
pub const DELIMITER: u8 = b'\0';

/// Decoded option list of one share, in stored order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareOptions {
    entries: Vec<Vec<u8>>,
}

impl ShareOptions {
    /// Create an empty option list
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored value blob
    pub fn decode(blob: &[u8]) -> Self {
        if blob.is_empty() {
            return Self::default();
        }

        // A single trailing separator does not start another entry
        let body = blob.strip_suffix(&[DELIMITER]).unwrap_or(blob);

        Self {
            entries: body
                .split(|b| *b == DELIMITER)
                .map(<[u8]>::to_vec)
                .collect(),
        }
    }

    /// Encode into the packed stored form
    pub fn encode(&self) -> Vec<u8> {
        self.entries.join(&DELIMITER)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check for an entry equal to `candidate` byte for byte
    pub fn contains(&self, candidate: &[u8]) -> bool {
        self.entries.iter().any(|e| e.as_slice() == candidate)
    }

    /// Iterate entries in stored order
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.entries.iter().map(Vec::as_slice)
    }

    /// Consume into the raw entry list
    pub fn into_entries(self) -> Vec<Vec<u8>> {
        self.entries
    }

    /// Append an entry; callers check for duplicates and separators
    pub(crate) fn push(&mut self, entry: Vec<u8>) {
        debug_assert!(!entry.contains(&DELIMITER));
        self.entries.push(entry);
    }
}

impl<'a> IntoIterator for &'a ShareOptions {
    type Item = &'a Vec<u8>;
    type IntoIter = std::slice::Iter<'a, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Decode a stored value blob into its option entries
pub fn decode(blob: &[u8]) -> ShareOptions {
    ShareOptions::decode(blob)
}

/// Encode option entries into a stored value blob
pub fn encode(options: &ShareOptions) -> Vec<u8> {
    options.encode()
}

/// Find the byte offset of the entry that exactly matches `candidate`
///
/// A shared prefix is not a match: the entry must have the same length.
pub fn find_entry(blob: &[u8], candidate: &[u8]) -> Option<usize> {
    if blob.is_empty() {
        return None;
    }

    let body = blob.strip_suffix(&[DELIMITER]).unwrap_or(blob);
    let mut offset = 0;

    for entry in body.split(|b| *b == DELIMITER) {
        if entry == candidate {
            return Some(offset);
        }
        offset += entry.len() + 1;
    }

    None
}
