//! Binary search over the sorted capture index.
//!
//! The physical line array is a leading run of `!`-prefixed metadata
//! lines followed by capture lines sorted by `key SP timestamp` as plain
//! strings. Lexicographic order on the zero-padded 14-digit timestamp
//! equals chronological order, which is what makes the composite
//! comparison valid. An unsorted index produces silent false negatives;
//! the functions here assume the precondition and do not check it.

use crate::record::CaptureRecord;

/// Physical extent of the index sections: `(metadata_lines, capture_lines)`.
///
/// The capture section ends at the first blank line; anything after a
/// blank line (e.g. a trailing newline artifact) is ignored.
pub fn sections(lines: &[&str]) -> (usize, usize) {
    let meta = lines.iter().take_while(|l| l.starts_with('!')).count();
    let data = lines[meta..]
        .iter()
        .take_while(|l| !l.trim().is_empty())
        .count();
    (meta, data)
}

/// Composite search key of one physical line.
///
/// `only_uri` restricts the key to the canonical-key field; otherwise it
/// spans `key SP timestamp`. Lines with fewer fields compare as their
/// whole text, so a malformed line at a probe point degrades to a
/// byte-wise comparison instead of failing.
fn search_key<'a>(line: &'a str, only_uri: bool) -> &'a str {
    let mut spaces = line.match_indices(' ');
    let Some((first, _)) = spaces.next() else {
        return line;
    };
    if only_uri {
        return &line[..first];
    }
    match spaces.next() {
        Some((second, _)) => &line[..second],
        None => line,
    }
}

/// Leftmost-bound binary search for `needle` over the capture section.
///
/// Returns the physical line index of the leftmost match, or `None`.
/// With `only_uri` the needle is a canonical key alone and the leftmost
/// of several captures for that key is found; otherwise the needle is
/// `key SP timestamp` and matches are unique in a well-formed index.
pub fn find_exact(lines: &[&str], needle: &str, only_uri: bool) -> Option<usize> {
    let (meta, data) = sections(lines);

    let mut lo = 0usize;
    let mut hi = data;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if search_key(lines[meta + mid], only_uri) < needle {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    if lo < data && search_key(lines[meta + lo], only_uri) == needle {
        Some(meta + lo)
    } else {
        None
    }
}

/// All captures whose canonical key equals `key`, in encounter order:
/// the binary-search anchor first, then matches scanned backward from
/// it, then matches scanned forward. Callers needing chronological
/// order must sort.
///
/// Matching lines that fail to parse are skipped; the skip count is
/// returned alongside the records so callers can surface it.
pub fn collect_for_key(lines: &[&str], key: &str) -> (Vec<CaptureRecord>, u64) {
    let Some(anchor) = find_exact(lines, key, true) else {
        return (Vec::new(), 0);
    };
    let (meta, data) = sections(lines);
    let end = meta + data;

    let mut records = Vec::new();
    let mut skipped = 0u64;
    let mut push = |idx: usize| match CaptureRecord::parse(lines[idx], idx + 1) {
        Ok(rec) => records.push(rec),
        Err(err) => {
            skipped += 1;
            tracing::warn!(line = idx + 1, %err, "skipping malformed index line");
        }
    };

    push(anchor);
    for idx in (meta..anchor).rev() {
        if search_key(lines[idx], true) != key {
            break;
        }
        push(idx);
    }
    for idx in anchor + 1..end {
        if search_key(lines[idx], true) != key {
            break;
        }
        push(idx);
    }

    (records, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn meta_json(n: u32) -> String {
        format!(r#"{{"locator":"/store/h{n}/p{n}","mime_type":"text/html","status_code":"200"}}"#)
    }

    fn fixture() -> Vec<String> {
        vec![
            "!context [\"http://tools.ietf.org/html/rfc7089\"]".to_string(),
            "!meta {\"generator\": \"recap\"}".to_string(),
            format!("com,alpha)/ 20190101000000 {}", meta_json(1)),
            format!("com,beta)/ 20200101000000 {}", meta_json(2)),
            format!("com,beta)/ 20200601000000 {}", meta_json(3)),
            format!("com,beta)/ 20210101000000 {}", meta_json(4)),
            format!("org,gamma)/page 20200301000000 {}", meta_json(5)),
        ]
    }

    fn as_refs(lines: &[String]) -> Vec<&str> {
        lines.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_sections_counts_meta_offset() {
        let lines = fixture();
        let (meta, data) = sections(&as_refs(&lines));
        assert_eq!(meta, 2);
        assert_eq!(data, 5);
    }

    #[test]
    fn test_sections_stops_at_blank_line() {
        let mut lines = fixture();
        lines.push(String::new());
        lines.push("garbage after terminator".to_string());
        let (_, data) = sections(&as_refs(&lines));
        assert_eq!(data, 5);
    }

    #[test]
    fn test_find_exact_composite_key() {
        let lines = fixture();
        let idx = find_exact(&as_refs(&lines), "com,beta)/ 20200601000000", false);
        assert_eq!(idx, Some(4));
    }

    #[test]
    fn test_find_exact_absent_key() {
        let lines = fixture();
        assert_eq!(find_exact(&as_refs(&lines), "com,beta)/ 20220101000000", false), None);
        assert_eq!(find_exact(&as_refs(&lines), "net,nothere)/", true), None);
    }

    #[test]
    fn test_find_exact_only_uri_is_leftmost() {
        let lines = fixture();
        let idx = find_exact(&as_refs(&lines), "com,beta)/", true);
        assert_eq!(idx, Some(3));
    }

    #[test]
    fn test_collect_for_key_encounter_order() {
        let lines = fixture();
        let (records, skipped) = collect_for_key(&as_refs(&lines), "com,beta)/");
        assert_eq!(skipped, 0);
        let ts: Vec<_> = records.iter().map(|r| r.timestamp.as_str()).collect();
        // Anchor (leftmost) first, nothing before it, then forward scan.
        assert_eq!(ts, vec!["20200101000000", "20200601000000", "20210101000000"]);
    }

    #[test]
    fn test_collect_for_key_skips_malformed_match() {
        let mut lines = fixture();
        lines.insert(4, "com,beta)/ 20200401000000 {broken json".to_string());
        let (records, skipped) = collect_for_key(&as_refs(&lines), "com,beta)/");
        assert_eq!(skipped, 1);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_collect_for_key_absent() {
        let lines = fixture();
        let (records, skipped) = collect_for_key(&as_refs(&lines), "zz,absent)/");
        assert!(records.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_empty_index() {
        let lines: Vec<&str> = Vec::new();
        assert_eq!(find_exact(&lines, "com,beta)/", true), None);
    }

    #[test]
    fn test_meta_only_index() {
        let lines = vec!["!meta {}"];
        assert_eq!(find_exact(&lines, "com,beta)/", true), None);
    }

    /// Oracle: linear scan over the same section the binary search sees.
    fn linear_find(lines: &[&str], needle: &str, only_uri: bool) -> Option<usize> {
        let (meta, data) = sections(lines);
        (meta..meta + data).find(|&i| search_key(lines[i], only_uri) == needle)
    }

    proptest! {
        #[test]
        fn prop_binary_search_matches_linear_scan(
            keys in proptest::collection::btree_set("[a-d],[a-d]\\)/", 1..8),
            stamps in proptest::collection::btree_set(20000101000000u64..20300101000000, 1..6),
            probe_key in "[a-e],[a-e]\\)/",
            probe_ts in 20000101000000u64..20300101000000,
        ) {
            // Cartesian key x timestamp grid is sorted by construction:
            // both sets iterate ascending and the timestamp is fixed-width.
            let mut lines = vec!["!meta {}".to_string()];
            for key in &keys {
                for ts in &stamps {
                    lines.push(format!(r#"{key} {ts:014} {{"locator":"h/p"}}"#));
                }
            }
            let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();

            let composite = format!("{probe_key} {probe_ts:014}");
            prop_assert_eq!(
                find_exact(&refs, &composite, false),
                linear_find(&refs, &composite, false)
            );
            prop_assert_eq!(
                find_exact(&refs, &probe_key, true),
                linear_find(&refs, &probe_key, true)
            );
        }
    }
}
