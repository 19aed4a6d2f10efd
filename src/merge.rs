//! Option merging
//!
//! Folds candidate option strings into a share's option list. Candidates are
//! trimmed, empties are dropped, and anything already present (including a
//! candidate accepted earlier in the same call) is skipped rather than
//! stored twice. Accepted candidates are appended in the order given.

use crate::codec::{ShareOptions, DELIMITER};

/// What a merge left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Trimmed candidates that were already present
    pub skipped: Vec<Vec<u8>>,

    /// Candidates containing a separator byte, which cannot be stored
    pub rejected: Vec<Vec<u8>>,

    /// Number of entries appended
    pub added: usize,
}

impl MergeReport {
    /// True if the merge appended nothing
    pub fn is_noop(&self) -> bool {
        self.added == 0
    }
}

impl ShareOptions {
    /// Merge candidate option strings into this list
    pub fn merge<I, T>(&mut self, candidates: I) -> MergeReport
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut report = MergeReport::default();

        for candidate in candidates {
            let option = trim_space(candidate.as_ref());

            if option.is_empty() {
                continue;
            }

            if option.contains(&DELIMITER) {
                report.rejected.push(option.to_vec());
                continue;
            }

            if self.contains(option) {
                report.skipped.push(option.to_vec());
                continue;
            }

            self.push(option.to_vec());
            report.added += 1;
        }

        report
    }
}

/// Merge candidates into an encoded value, returning the new encoded value
pub fn merge<I, T>(existing: &[u8], candidates: I) -> (Vec<u8>, MergeReport)
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut options = ShareOptions::decode(existing);
    let report = options.merge(candidates);
    (options.encode(), report)
}

/// Build an option list from candidates alone, with no prior state
pub fn normalize<I, T>(candidates: I) -> (ShareOptions, MergeReport)
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut options = ShareOptions::new();
    let report = options.merge(candidates);
    (options, report)
}

/// Strip leading and trailing C-locale whitespace, vertical tab included
fn trim_space(bytes: &[u8]) -> &[u8] {
    let is_space = |b: &u8| b.is_ascii_whitespace() || *b == 0x0B;
    let start = bytes.iter().position(|b| !is_space(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_space(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;

    #[test]
    fn test_merge_into_empty() {
        let (blob, report) = merge(b"", ["rw"]);
        assert_eq!(blob, b"rw");
        assert_eq!(report.added, 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_merge_skips_existing() {
        let (blob, report) = merge(b"rw", ["rw", "async"]);
        assert_eq!(blob, b"rw\0async");
        assert_eq!(report.skipped, vec![b"rw".to_vec()]);
        assert_eq!(report.added, 1);
    }

    #[test]
    fn test_merge_skips_duplicates_within_call() {
        let (blob, report) = merge(b"", ["ro", "sync", "ro"]);
        assert_eq!(blob, b"ro\0sync");
        assert_eq!(report.skipped, vec![b"ro".to_vec()]);
    }

    #[test]
    fn test_merge_trims_and_drops_empty() {
        let (blob, report) = merge(b"rw", ["  async\t", "", "   ", "\n rw \n"]);
        assert_eq!(blob, b"rw\0async");
        assert_eq!(report.skipped, vec![b"rw".to_vec()]);
        assert_eq!(report.added, 1);
    }

    #[test]
    fn test_merge_trims_vertical_tab() {
        let (blob, report) = merge(b"rw", ["\x0bsync\x0b", "\x0b\x0c", "\x0brw"]);
        assert_eq!(blob, b"rw\0sync");
        assert_eq!(report.skipped, vec![b"rw".to_vec()]);
        assert_eq!(trim_space(b"\x0b"), b"");
        assert_eq!(trim_space(b" a b\r\n"), b"a b");
    }

    #[test]
    fn test_merge_preserves_existing_order() {
        let (blob, _) = merge(b"b\0a\0c", ["d", "a", "e"]);
        let entries = decode(&blob).into_entries();
        assert_eq!(entries[..3], [b"b".to_vec(), b"a".to_vec(), b"c".to_vec()]);
        assert_eq!(entries[3..], [b"d".to_vec(), b"e".to_vec()]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let candidates = ["rw", " -network 10.0.0.0/8 ", "rw", "sec=sys"];
        let (once, _) = merge(b"ro", candidates);
        let (twice, report) = merge(&once, candidates);
        assert_eq!(once, twice);
        assert!(report.is_noop());
        assert_eq!(report.skipped.len(), candidates.len());
    }

    #[test]
    fn test_merge_partial_match_is_not_duplicate() {
        let (blob, report) = merge(b"rw", ["r", "rw2"]);
        assert_eq!(blob, b"rw\0r\0rw2");
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_merge_rejects_embedded_delimiter() {
        let (blob, report) = merge(b"rw", [&b"a\0b"[..]]);
        assert_eq!(blob, b"rw");
        assert_eq!(report.rejected, vec![b"a\0b".to_vec()]);
        assert!(report.is_noop());
    }

    #[test]
    fn test_normalize_ignores_prior_state() {
        let (options, report) = normalize([" ro ", "ro", "async"]);
        assert_eq!(options.encode(), b"ro\0async");
        assert_eq!(report.skipped, vec![b"ro".to_vec()]);

        let (options, _) = normalize(Vec::<&str>::new());
        assert!(options.is_empty());
    }
}
