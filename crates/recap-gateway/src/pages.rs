//! HTML pages for discovery and failure states.
//!
//! Deliberately small: the full web UI is a separate concern. These
//! pages exist so negotiation outcomes (no captures, store down) give a
//! person something actionable.

use recap_index::{decanonicalize, CaptureRecord, IndexStats};
use recap_replay::datetime::digits14_to_rfc1123;

/// Search form posting into the discovery route.
fn search_form(urir: &str) -> String {
    format!(
        "<form method=\"get\" action=\"/memento/*/\" style=\"margin-top: 1.0em;\">\
         <input type=\"text\" value=\"{urir}\" id=\"url\" name=\"url\" \
         aria-label=\"Enter a URI\" />\
         <input type=\"submit\" value=\"Search URL in the archive\"/>\
         </form>"
    )
}

/// Unordered list of capture links for one URI-R.
fn capture_list(captures: &[CaptureRecord]) -> String {
    let mut html = format!(
        "<p>{} capture(s) available:</p><ul>",
        captures.len()
    );
    for record in captures {
        let uri = decanonicalize(&record.canonical_key);
        let when = digits14_to_rfc1123(&record.timestamp)
            .unwrap_or_else(|_| record.timestamp.clone());
        html.push_str(&format!(
            "<li><a href=\"/memento/{ts}/{uri}\">{uri} at {when}</a></li>",
            ts = record.timestamp,
        ));
    }
    html.push_str("</ul>");
    html
}

/// Landing page with whole-archive counters.
pub fn landing(stats: &IndexStats, index_path: &str) -> String {
    format!(
        "<h1>RECAP replay</h1>\
         <p>{mementos} memento(s) of {uris} unique URI(s) indexed from <code>{index_path}</code>.</p>\
         {form}",
        mementos = stats.memento_count,
        uris = stats.unique_uris,
        form = search_form("")
    )
}

/// Capture listing for the datetime-less discovery route. Empty capture
/// sets get the search form.
pub fn discovery(urir: &str, captures: &[CaptureRecord]) -> String {
    if captures.is_empty() {
        return no_captures(urir);
    }
    capture_list(captures)
}

/// 404 body when a URI-R has no captures and no datetime was involved.
pub fn no_captures(urir: &str) -> String {
    format!(
        "<h1>ERROR 404</h1>No capture(s) found for {urir}.{}",
        search_form(urir)
    )
}

/// 404 body when resolution at a datetime found nothing.
pub fn no_capture_at(urir: &str, datetime: &str) -> String {
    format!("<h1>ERROR 404</h1>No capture found for {urir} at {datetime}.")
}

/// 404 body for direct replay: capture list (possibly empty) plus both
/// TimeMap links. With no captures the TimeMap links target an empty
/// URI-R.
pub fn not_in_archive(urir: &str, datetime: Option<&str>, captures: &[CaptureRecord]) -> String {
    let mut html = match datetime {
        Some(dt) => no_capture_at(urir, dt),
        None => format!("<h1>ERROR 404</h1>No capture found for {urir}."),
    };
    let mut display_uri = String::new();
    if !captures.is_empty() {
        html.push_str(&capture_list(captures));
        display_uri = decanonicalize(&captures[captures.len() - 1].canonical_key);
    }
    html.push_str(&format!(
        "<p>TimeMaps: <a href=\"/timemap/link/{display_uri}\">Link</a> \
         <a href=\"/timemap/cdxj/{display_uri}\">CDXJ</a> </p>"
    ));
    html
}

/// 503 body when the content-store daemon is unreachable.
pub fn store_unavailable(store_api: &str) -> String {
    format!(
        "Content store daemon not reachable at {store_api}. \
         Start it on the command line, then reload this page."
    )
}
