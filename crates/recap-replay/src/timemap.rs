//! RFC 7089 TimeMap generation: link format, CDXJ format, and the
//! abbreviated single-line `Link` header carried on Memento responses.
//!
//! Input records must already be in chronological order; the builders
//! tag relations, they do not sort.

use serde::Serialize;

use recap_index::{decanonicalize, CaptureRecord};

use crate::datetime::digits14_to_rfc1123;
use crate::error::ReplayResult;

/// URIs a TimeMap is generated against.
#[derive(Debug, Clone)]
pub struct TimeMapLinks {
    /// URI-T of the TimeMap being generated (the `self` relation).
    pub self_uri: String,
    /// URI of the TimeGate for this URI-R.
    pub timegate_uri: String,
    /// Optional reverse-proxy target. When set, the scheme/host/port of
    /// every generated URI is replaced by the proxy's, path and query
    /// preserved.
    pub proxy: Option<String>,
}

/// One memento line with its accumulated relation tags.
struct MementoEntry {
    uri_m: String,
    rfc1123: String,
    tags: Vec<&'static str>,
}

impl MementoEntry {
    fn rel(&self) -> String {
        let mut rel = self.tags.join(" ");
        if rel.is_empty() {
            rel.push_str("memento");
        } else {
            rel.push_str(" memento");
        }
        rel
    }

    fn render(&self) -> String {
        format!(
            "<{}>; rel=\"{}\"; datetime=\"{}\"",
            self.uri_m,
            self.rel(),
            self.rfc1123
        )
    }
}

fn first_last_tags(idx: usize, count: usize) -> Vec<&'static str> {
    if count == 1 {
        vec!["first", "last"]
    } else if idx == 0 {
        vec!["first"]
    } else if idx == count - 1 {
        vec!["last"]
    } else {
        Vec::new()
    }
}

/// `scheme://authority/` of a URI, the prefix memento links hang off.
fn authority_prefix(uri: &str) -> String {
    let (scheme, rest) = uri.split_once("://").unwrap_or(("http", uri));
    let authority = rest.split('/').next().unwrap_or(rest);
    format!("{scheme}://{authority}/")
}

fn apply_proxy(uri: &str, proxy: Option<&str>) -> String {
    let Some(proxy) = proxy else {
        return uri.to_string();
    };
    let (scheme, rest) = uri.split_once("://").unwrap_or(("http", uri));
    let path = match rest.find('/') {
        Some(pos) => &rest[pos..],
        None => "",
    };
    match proxy.split_once("://") {
        Some((proxy_scheme, proxy_rest)) => {
            format!("{proxy_scheme}://{}{path}", proxy_rest.trim_end_matches('/'))
        }
        None => format!("{scheme}://{}{path}", proxy.trim_end_matches('/')),
    }
}

fn memento_entries(
    records: &[CaptureRecord],
    host_prefix: &str,
) -> ReplayResult<Vec<MementoEntry>> {
    records
        .iter()
        .enumerate()
        .map(|(idx, rec)| {
            Ok(MementoEntry {
                uri_m: format!(
                    "{host_prefix}memento/{}/{}",
                    rec.timestamp,
                    decanonicalize(&rec.canonical_key)
                ),
                rfc1123: digits14_to_rfc1123(&rec.timestamp)?,
                tags: first_last_tags(idx, records.len()),
            })
        })
        .collect()
}

fn preamble(
    canonical_key: &str,
    self_uri: &str,
    cdxj_uri: &str,
    timegate_uri: &str,
    self_rel: &str,
) -> Vec<String> {
    let original_uri = format!("http://{}", decanonicalize(canonical_key));
    vec![
        format!("<{original_uri}>; rel=\"original\""),
        format!("<{self_uri}>; rel=\"{self_rel}\"; type=\"application/link-format\""),
        format!("<{cdxj_uri}>; rel=\"timemap\"; type=\"application/cdxj+ors\""),
        format!("<{timegate_uri}>; rel=\"timegate\""),
    ]
}

/// Renders the full link-format TimeMap (`application/link-format`).
pub fn link_timemap(
    records: &[CaptureRecord],
    canonical_key: &str,
    links: &TimeMapLinks,
) -> ReplayResult<String> {
    let proxy = links.proxy.as_deref();
    let self_uri = apply_proxy(&links.self_uri, proxy);
    let timegate_uri = apply_proxy(&links.timegate_uri, proxy);
    let cdxj_uri = self_uri.replace("/timemap/link/", "/timemap/cdxj/");
    let host_prefix = authority_prefix(&self_uri);

    let mut elements = preamble(canonical_key, &self_uri, &cdxj_uri, &timegate_uri, "self timemap");
    for entry in memento_entries(records, &host_prefix)? {
        elements.push(entry.render());
    }
    Ok(elements.join(",\n") + "\n")
}

#[derive(Serialize)]
struct CdxjEntry<'a> {
    uri: &'a str,
    rel: &'a str,
    datetime: &'a str,
}

#[derive(Serialize)]
struct CdxjTimeMapUris<'a> {
    link_format: &'a str,
    cdxj_format: &'a str,
}

/// Renders the index-format TimeMap (`application/cdxj+ors`).
pub fn cdxj_timemap(
    records: &[CaptureRecord],
    canonical_key: &str,
    links: &TimeMapLinks,
) -> ReplayResult<String> {
    let proxy = links.proxy.as_deref();
    let self_uri = apply_proxy(&links.self_uri, proxy);
    let timegate_uri = apply_proxy(&links.timegate_uri, proxy);
    let link_uri = self_uri.replace("/timemap/cdxj/", "/timemap/link/");
    let original_uri = format!("http://{}", decanonicalize(canonical_key));

    // Memento URIs hang off everything before the `timemap/` segment.
    let host_prefix = match self_uri.find("timemap/") {
        Some(pos) => self_uri[..pos].to_string(),
        None => authority_prefix(&self_uri),
    };

    let mut out = String::new();
    out.push_str("!context [\"http://tools.ietf.org/html/rfc7089\"]\n");
    out.push_str(&format!("!id {{\"uri\": \"{self_uri}\"}}\n"));
    out.push_str("!keys [\"memento_datetime_YYYYMMDDhhmmss\"]\n");
    out.push_str(&format!("!meta {{\"original_uri\": \"{original_uri}\"}}\n"));
    out.push_str(&format!("!meta {{\"timegate_uri\": \"{timegate_uri}\"}}\n"));
    let uris = serde_json::to_string(&CdxjTimeMapUris {
        link_format: &link_uri,
        cdxj_format: &self_uri,
    })
    .expect("string-only struct serializes");
    out.push_str(&format!("!meta {{\"timemap_uri\": {uris}}}\n"));

    for (idx, rec) in records.iter().enumerate() {
        let uri_m = format!(
            "{host_prefix}memento/{}/{}",
            rec.timestamp,
            decanonicalize(&rec.canonical_key)
        );
        let rfc = digits14_to_rfc1123(&rec.timestamp)?;
        let mut rel = first_last_tags(idx, records.len()).join(" ");
        if rel.is_empty() {
            rel.push_str("memento");
        } else {
            rel.push_str(" memento");
        }
        let json = serde_json::to_string(&CdxjEntry {
            uri: &uri_m,
            rel: &rel,
            datetime: &rfc,
        })
        .expect("string-only struct serializes");
        out.push_str(&format!("{} {json}\n", rec.timestamp));
    }
    Ok(out)
}

/// Renders the abbreviated TimeMap carried as a single `Link:` header
/// line on Memento responses.
///
/// Relative to the full link TimeMap: the self relation is downgraded
/// to plain `timemap`, the entries physically adjacent to the pivot are
/// tagged `prev`/`next` (boundary pivots only get the side that
/// exists), and only first/last/prev/next/pivot mementos survive. An
/// entry serving several roles appears once with merged tags.
pub fn abbreviated_link_header(
    records: &[CaptureRecord],
    canonical_key: &str,
    pivot: &str,
    links: &TimeMapLinks,
) -> ReplayResult<String> {
    let proxy = links.proxy.as_deref();
    let self_uri = apply_proxy(&links.self_uri, proxy);
    let timegate_uri = apply_proxy(&links.timegate_uri, proxy);
    let cdxj_uri = self_uri.replace("/timemap/link/", "/timemap/cdxj/");
    let host_prefix = authority_prefix(&self_uri);

    let mut elements = preamble(canonical_key, &self_uri, &cdxj_uri, &timegate_uri, "timemap");

    let mut entries = memento_entries(records, &host_prefix)?;
    if entries.len() <= 1 {
        for entry in &entries {
            elements.push(entry.render());
        }
        return Ok(elements.join(", "));
    }

    let pivot_idx = records.iter().position(|r| r.timestamp == pivot);
    if let Some(p) = pivot_idx {
        if p > 0 {
            entries[p - 1].tags.push("prev");
        }
        if p + 1 < entries.len() {
            entries[p + 1].tags.push("next");
        }
    }

    for (idx, entry) in entries.iter().enumerate() {
        if entry.tags.is_empty() && pivot_idx != Some(idx) {
            continue;
        }
        elements.push(entry.render());
    }
    Ok(elements.join(", "))
}
