//! Canonical sortable keys (SURT style) for captured URIs.
//!
//! `canonicalize` is deterministic; `decanonicalize` is a best-effort
//! inverse used only for display and redirect construction.

/// Converts a URI into its sortable canonical form.
///
/// The authority is lowercased, stripped of its scheme, and reversed on
/// `.` boundaries with `,` separators, followed by `)` and the path and
/// query with their case preserved. A port survives as a `:port` suffix
/// on the reversed host.
///
/// ```
/// use recap_index::canonicalize;
/// assert_eq!(canonicalize("http://www.Example.com/A?b=c"), "com,example,www)/A?b=c");
/// assert_eq!(canonicalize("example.com"), "com,example)/");
/// ```
pub fn canonicalize(uri: &str) -> String {
    let trimmed = uri.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);

    let (authority, path_and_query) = match without_scheme.find('/') {
        Some(pos) => (&without_scheme[..pos], &without_scheme[pos..]),
        None => (without_scheme, "/"),
    };
    let authority = authority.to_ascii_lowercase();

    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => (h, Some(p)),
        _ => (authority.as_str(), None),
    };

    let mut key = host.split('.').rev().collect::<Vec<_>>().join(",");
    if let Some(p) = port {
        key.push(':');
        key.push_str(p);
    }
    key.push(')');
    key.push_str(path_and_query);
    key
}

/// Best-effort inverse of [`canonicalize`].
///
/// Returns the URI without a scheme; keys that do not look canonical are
/// returned unchanged.
pub fn decanonicalize(key: &str) -> String {
    let Some((reversed_host, path)) = key.split_once(')') else {
        return key.to_string();
    };

    let (host_part, port) = match reversed_host.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => (h, Some(p)),
        _ => (reversed_host, None),
    };

    let mut uri = host_part.split(',').rev().collect::<Vec<_>>().join(".");
    if let Some(p) = port {
        uri.push(':');
        uri.push_str(p);
    }
    uri.push_str(path);
    uri
}
