//! Memento HTTP routes: TimeGate, TimeMap, Memento retrieval, and
//! direct-URI replay.
//!
//! Negotiation outcomes are response shapes, not errors: a non-exact
//! datetime is a 302 to the canonical Memento, an unknown URI-R is a
//! discovery page. Real failures map through [`GatewayError`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{OriginalUri, Path, Query, RawQuery, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use recap_index::{canonicalize, decanonicalize, validate_timestamp_query, CaptureRecord, IndexStats};
use recap_replay::datetime::{now_digits14, rfc1123_to_digits14};
use recap_replay::reconstruct::ReconstructedResponse;
use recap_replay::timemap::{abbreviated_link_header, cdxj_timemap, link_timemap};
use recap_replay::TimeMapLinks;
use recap_store::BlobStore;

use crate::error::GatewayError;
use crate::pages;
use crate::state::AppState;

/// Builds the replay router over shared state.
pub fn router<B: BlobStore + 'static>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/", get(landing::<B>))
        .route("/timegate/*urir", get(timegate::<B>))
        .route("/timemap/:format/*urir", get(timemap::<B>))
        .route("/memento/:datetime", get(memento_search::<B>))
        .route("/memento/:datetime/", get(memento_search::<B>))
        .route("/memento/:datetime/*urir", get(memento::<B>))
        .fallback(get(direct::<B>))
        .layer(middleware::map_response(set_server_header))
        .with_state(state)
}

async fn set_server_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::SERVER,
        HeaderValue::from_static(concat!("RECAP replay/", env!("CARGO_PKG_VERSION"))),
    );
    response
}

/// Re-attaches the query string axum splits off the wildcard segment.
fn full_urir(urir: &str, query: Option<String>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{urir}?{q}"),
        _ => urir.to_string(),
    }
}

fn captures_chronological<B: BlobStore>(
    state: &AppState<B>,
    urir: &str,
) -> Result<(String, Vec<CaptureRecord>), GatewayError> {
    let normalized = state.resolver.normalize_urir(urir);
    let key = canonicalize(normalized);
    let mut records = state.index.captures_for_uri(&key)?;
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok((key, records))
}

fn timemap_links<B: BlobStore>(state: &AppState<B>, urir: &str, format: &str) -> TimeMapLinks {
    let host = state.config.public_host();
    TimeMapLinks {
        self_uri: format!("http://{host}/timemap/{format}/{urir}"),
        timegate_uri: format!("http://{host}/timegate/{urir}"),
        proxy: state.config.proxy.clone(),
    }
}

/// Abbreviated TimeMap for a `Link:` response header. `pivot` may be a
/// timestamp no memento carries (or empty); only first/last survive
/// then.
fn abbreviated_link<B: BlobStore>(
    state: &AppState<B>,
    urir: &str,
    pivot: &str,
) -> Result<String, GatewayError> {
    let (key, records) = captures_chronological(state, urir)?;
    let links = timemap_links(state, urir, "link");
    Ok(abbreviated_link_header(&records, &key, pivot, &links)?)
}

fn redirect(status: StatusCode, location: String, link: Option<String>) -> Response {
    let mut response = (status, ()).into_response();
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(_) => {
            return GatewayError::BadRequest {
                reason: "redirect target is not a valid header value".to_string(),
            }
            .into_response()
        }
    }
    if let Some(link) = link {
        if let Ok(value) = HeaderValue::from_str(&link) {
            response.headers_mut().insert(header::LINK, value);
        }
    }
    response
}

async fn landing<B: BlobStore>(State(state): State<Arc<AppState<B>>>) -> Response {
    // A missing or empty index still gets a landing page.
    let stats = state.index.stats().unwrap_or(IndexStats {
        memento_count: 0,
        unique_uris: 0,
    });
    Html(pages::landing(&stats, &state.config.index_path)).into_response()
}

async fn timegate<B: BlobStore>(
    State(state): State<Arc<AppState<B>>>,
    Path(urir): Path<String>,
    RawQuery(query): RawQuery,
    headers: axum::http::HeaderMap,
) -> Response {
    let urir = full_urir(&urir, query);

    let target = match headers.get("accept-datetime") {
        Some(value) => {
            let Ok(text) = value.to_str() else {
                return (StatusCode::BAD_REQUEST, "Malformed Accept-Datetime header").into_response();
            };
            match rfc1123_to_digits14(text) {
                Ok(stamp) => stamp,
                Err(_) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        "Malformed Accept-Datetime header; expected RFC 1123",
                    )
                        .into_response()
                }
            }
        }
        None => now_digits14(),
    };

    let resolution = match state.resolver.resolve(&state.index, &urir, Some(&target)) {
        Ok(resolution) => resolution,
        Err(err) => return GatewayError::from(err).into_response(),
    };
    let Some(resolution) = resolution else {
        return (
            StatusCode::NOT_FOUND,
            Html(pages::no_capture_at(&urir, &target)),
        )
            .into_response();
    };

    let link = match abbreviated_link(&state, &urir, &resolution.record.timestamp) {
        Ok(link) => link,
        Err(err) => return err.into_response(),
    };
    let location = format!("/memento/{}/{urir}", resolution.record.timestamp);
    let mut response = redirect(StatusCode::FOUND, location, Some(link));
    response
        .headers_mut()
        .insert(header::VARY, HeaderValue::from_static("Accept-Datetime"));
    response
}

async fn timemap<B: BlobStore>(
    State(state): State<Arc<AppState<B>>>,
    Path((format, urir)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Response {
    if format != "link" && format != "cdxj" {
        return StatusCode::NOT_FOUND.into_response();
    }
    let urir = full_urir(&urir, query);

    let (key, records) = match captures_chronological(&state, &urir) {
        Ok(found) => found,
        Err(err) => return err.into_response(),
    };
    let links = timemap_links(&state, &urir, &format);

    let rendered = if format == "link" {
        link_timemap(&records, &key, &links).map(|tm| (tm, "application/link-format"))
    } else {
        cdxj_timemap(&records, &key, &links).map(|tm| (tm, "application/cdxj+ors"))
    };
    match rendered {
        Ok((body, content_type)) => {
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(err) => GatewayError::from(err).into_response(),
    }
}

/// `/memento/*/` search-form target: `?url=` redirects into the
/// discovery route.
async fn memento_search<B: BlobStore>(
    State(_state): State<Arc<AppState<B>>>,
    Path(datetime): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if datetime != "*" {
        return GatewayError::BadRequest {
            reason: "missing archived URI".to_string(),
        }
        .into_response();
    }
    let Some(url) = params.get("url") else {
        return GatewayError::BadRequest {
            reason: "missing url parameter".to_string(),
        }
        .into_response();
    };
    redirect(
        StatusCode::MOVED_PERMANENTLY,
        format!("/memento/*/{url}"),
        None,
    )
}

async fn memento<B: BlobStore>(
    State(state): State<Arc<AppState<B>>>,
    Path((datetime, urir)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    OriginalUri(original_uri): OriginalUri,
) -> Response {
    let urir = full_urir(&urir, query);

    if datetime == "*" {
        let (_, records) = match captures_chronological(&state, &urir) {
            Ok(found) => found,
            Err(err) => return err.into_response(),
        };
        if records.len() == 1 {
            let location = format!(
                "/memento/{}/{}",
                records[0].timestamp,
                decanonicalize(&records[0].canonical_key)
            );
            return redirect(StatusCode::FOUND, location, None);
        }
        return Html(pages::discovery(&urir, &records)).into_response();
    }

    if let Err(err) = validate_timestamp_query(&datetime) {
        return GatewayError::from(err).into_response();
    }

    let resolution = match state.resolver.resolve(&state.index, &urir, Some(&datetime)) {
        Ok(resolution) => resolution,
        Err(err) => return GatewayError::from(err).into_response(),
    };
    let Some(resolution) = resolution else {
        return (
            StatusCode::NOT_FOUND,
            Html(pages::no_capture_at(&urir, &datetime)),
        )
            .into_response();
    };

    let link = match abbreviated_link(&state, &urir, &resolution.record.timestamp) {
        Ok(link) => link,
        Err(err) => return err.into_response(),
    };

    if resolution.record.timestamp != datetime {
        let location = format!("/memento/{}/{urir}", resolution.record.timestamp);
        return redirect(StatusCode::FOUND, location, Some(link));
    }

    // Serve by exact key; the index is re-read per search call.
    let key = canonicalize(state.resolver.normalize_urir(&urir));
    let record = match state.index.lookup_exact(&key, Some(&datetime)) {
        Ok(Some(record)) => record,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Html(pages::no_capture_at(&urir, &datetime)),
            )
                .into_response()
        }
        Err(err) => return GatewayError::from(err).into_response(),
    };

    let request_url = format!("http://{}{original_uri}", state.config.public_host());
    replay(&state, &record, &request_url, Some(link)).await
}

/// Direct replay: any path not claimed by another route is treated as
/// an archived URI with no pivot datetime.
async fn direct<B: BlobStore>(
    State(state): State<Arc<AppState<B>>>,
    OriginalUri(original_uri): OriginalUri,
) -> Response {
    let path = original_uri.path().trim_start_matches('/');
    let urir = full_urir(path, original_uri.query().map(str::to_string));

    if !state.store.is_alive().await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(pages::store_unavailable(&state.config.store_api)),
        )
            .into_response();
    }

    let (_, records) = match captures_chronological(&state, &urir) {
        Ok(found) => found,
        Err(err) => return err.into_response(),
    };

    match records.len() {
        0 => {
            let link = abbreviated_link(&state, &urir, "").unwrap_or_default();
            let mut response = (
                StatusCode::NOT_FOUND,
                Html(pages::not_in_archive(&urir, None, &records)),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&link) {
                response.headers_mut().insert(header::LINK, value);
            }
            response
        }
        1 => {
            let location = format!(
                "/memento/{}/{}",
                records[0].timestamp,
                decanonicalize(&records[0].canonical_key)
            );
            redirect(StatusCode::FOUND, location, None)
        }
        _ => {
            // No pivot: the earliest capture is the resolution.
            let request_url = format!("http://{}{original_uri}", state.config.public_host());
            replay(&state, &records[0], &request_url, None).await
        }
    }
}

async fn replay<B: BlobStore>(
    state: &AppState<B>,
    record: &CaptureRecord,
    request_url: &str,
    link: Option<String>,
) -> Response {
    let reconstructed = match state.reconstructor.reconstruct(record, request_url).await {
        Ok(reconstructed) => reconstructed,
        Err(err) => return GatewayError::from(err).into_response(),
    };
    render(reconstructed, link)
}

fn render(reconstructed: ReconstructedResponse, link: Option<String>) -> Response {
    let status =
        StatusCode::from_u16(reconstructed.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(reconstructed.body));
    *response.status_mut() = status;

    for (name, value) in &reconstructed.headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!(header = %name, "archived header name not emittable, dropping");
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            tracing::warn!(header = %name, "archived header value not emittable, dropping");
            continue;
        };
        response.headers_mut().append(name, value);
    }
    if let Some(link) = link {
        if let Ok(value) = HeaderValue::from_str(&link) {
            response.headers_mut().insert(header::LINK, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use recap_store::MemoryBlobStore;
    use std::io::Write;
    use tower::ServiceExt;

    use crate::config::ReplayConfig;

    const META: &str = r#"{"locator":"/store/QmH/QmP","mime_type":"text/html","status_code":"200"}"#;
    const SOLO_META: &str =
        r#"{"locator":"/store/QmH2/QmP2","mime_type":"text/plain","status_code":"200"}"#;

    struct Fixture {
        router: Router,
        _index: tempfile::NamedTempFile,
    }

    fn fixture() -> Fixture {
        fixture_with_store(MemoryBlobStore::new())
    }

    fn fixture_with_store(store: MemoryBlobStore) -> Fixture {
        let mut index = tempfile::NamedTempFile::new().unwrap();
        writeln!(index, "!context [\"http://tools.ietf.org/html/rfc7089\"]").unwrap();
        writeln!(index, "com,example)/ 20200101000000 {META}").unwrap();
        writeln!(index, "com,example)/ 20210101000000 {META}").unwrap();
        writeln!(index, "org,solo)/ 20190501000000 {SOLO_META}").unwrap();
        index.flush().unwrap();

        store.insert(
            "QmH",
            &b"HTTP/1.1 200 OK\nServer: Apache\nContent-Type: text/html\n"[..],
        );
        store.insert("QmP", &b"<html><body>archived</body></html>"[..]);
        store.insert("QmH2", &b"HTTP/1.1 200 OK\nContent-Type: text/plain\n"[..]);
        store.insert("QmP2", &b"solo"[..]);

        let config = ReplayConfig {
            index_path: index.path().to_string_lossy().into_owned(),
            ..ReplayConfig::default()
        };
        let state = AppState::new(config, store);
        Fixture {
            router: router(Arc::new(state)),
            _index: index,
        }
    }

    async fn send(fixture: &Fixture, request: Request<Body>) -> Response {
        fixture.router.clone().oneshot(request).await.unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_timegate_redirects_with_vary_and_link() {
        let fx = fixture();
        let req = Request::builder()
            .uri("/timegate/http://example.com/")
            .header("Accept-Datetime", "Wed, 01 Jan 2020 00:00:00 GMT")
            .body(Body::empty())
            .unwrap();
        let resp = send(&fx, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/memento/20200101000000/http://example.com/"
        );
        assert_eq!(resp.headers().get(header::VARY).unwrap(), "Accept-Datetime");
        let link = resp.headers().get(header::LINK).unwrap().to_str().unwrap();
        assert!(link.contains("rel=\"timegate\""));
        assert!(link.contains("rel=\"first memento\""));
    }

    #[tokio::test]
    async fn test_timegate_defaults_to_now_and_picks_latest() {
        let fx = fixture();
        let resp = send(&fx, get_req("/timegate/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/memento/20210101000000/http://example.com/"
        );
    }

    #[tokio::test]
    async fn test_timegate_malformed_accept_datetime_is_400() {
        let fx = fixture();
        let req = Request::builder()
            .uri("/timegate/http://example.com/")
            .header("Accept-Datetime", "not a datetime")
            .body(Body::empty())
            .unwrap();
        let resp = send(&fx, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_timegate_unknown_uri_is_404() {
        let fx = fixture();
        let resp = send(&fx, get_req("/timegate/http://absent.example/")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_timemap_link_format() {
        let fx = fixture();
        let resp = send(&fx, get_req("/timemap/link/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/link-format"
        );
        let body = body_string(resp).await;
        assert!(body.contains("rel=\"first memento\""));
        assert!(body.contains("rel=\"last memento\""));
        assert!(body.contains("/memento/20200101000000/example.com/"));
    }

    #[tokio::test]
    async fn test_timemap_cdxj_format() {
        let fx = fixture();
        let resp = send(&fx, get_req("/timemap/cdxj/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/cdxj+ors"
        );
        let body = body_string(resp).await;
        assert!(body.starts_with("!context"));
        assert!(body.contains("20200101000000 {\"uri\""));
    }

    #[tokio::test]
    async fn test_timemap_unknown_format_is_404() {
        let fx = fixture();
        let resp = send(&fx, get_req("/timemap/xml/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_memento_exact_replays() {
        let fx = fixture();
        let resp = send(&fx, get_req("/memento/20200101000000/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Memento-Datetime").unwrap(),
            "Wed, 01 Jan 2020 00:00:00 GMT"
        );
        assert_eq!(
            resp.headers().get("X-Archive-Orig-Server").unwrap(),
            "Apache"
        );
        let link = resp.headers().get(header::LINK).unwrap().to_str().unwrap();
        assert!(link.contains("rel=\"first memento\""));
        let body = body_string(resp).await;
        assert!(body.contains("archived"));
        assert!(body.contains("recapReplayInit"));
    }

    #[tokio::test]
    async fn test_memento_inexact_redirects_to_canonical() {
        let fx = fixture();
        let resp = send(&fx, get_req("/memento/20200601/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with("/memento/20"));
        assert!(location.ends_with("/http://example.com/"));
    }

    #[tokio::test]
    async fn test_memento_malformed_timestamp_is_400() {
        let fx = fixture();
        let resp = send(&fx, get_req("/memento/20x0/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = send(&fx, get_req("/memento/202001010000001/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_memento_discovery_lists_captures() {
        let fx = fixture();
        let resp = send(&fx, get_req("/memento/*/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_string(resp).await;
        assert!(body.contains("2 capture(s) available"));
        assert!(body.contains("/memento/20210101000000/example.com/"));
    }

    #[tokio::test]
    async fn test_memento_discovery_single_capture_redirects() {
        let fx = fixture();
        let resp = send(&fx, get_req("/memento/*/http://solo.org/")).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/memento/20190501000000/solo.org/"
        );
    }

    #[tokio::test]
    async fn test_memento_search_form_redirect() {
        let fx = fixture();
        let resp = send(&fx, get_req("/memento/*/?url=http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/memento/*/http://example.com/"
        );
    }

    #[tokio::test]
    async fn test_direct_uri_absent_is_404_discovery() {
        let fx = fixture();
        let resp = send(&fx, get_req("/http://absent.example/")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let link = resp.headers().get(header::LINK).unwrap().to_str().unwrap();
        assert!(link.contains("rel=\"timegate\""));
        assert!(!link.contains("rel=\"first"));
        let body = body_string(resp).await;
        assert!(!body.contains("capture(s) available"));
        assert!(body.contains("href=\"/timemap/link/\""));
        assert!(body.contains("href=\"/timemap/cdxj/\""));
    }

    #[tokio::test]
    async fn test_direct_uri_single_capture_redirects() {
        let fx = fixture();
        let resp = send(&fx, get_req("/http://solo.org/")).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/memento/20190501000000/solo.org/"
        );
    }

    #[tokio::test]
    async fn test_direct_uri_multiple_captures_replays_earliest() {
        let fx = fixture();
        let resp = send(&fx, get_req("/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Memento-Datetime").unwrap(),
            "Wed, 01 Jan 2020 00:00:00 GMT"
        );
    }

    #[tokio::test]
    async fn test_direct_uri_store_offline_is_503() {
        let store = MemoryBlobStore::new();
        store.set_offline(true);
        let fx = fixture_with_store(store);
        let resp = send(&fx, get_req("/http://example.com/")).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_server_header_on_every_response() {
        let fx = fixture();
        let resp = send(&fx, get_req("/")).await;
        let server = resp.headers().get(header::SERVER).unwrap().to_str().unwrap();
        assert!(server.starts_with("RECAP replay/"));
    }

    #[tokio::test]
    async fn test_landing_page_reports_stats() {
        let fx = fixture();
        let resp = send(&fx, get_req("/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_string(resp).await;
        assert!(body.contains("3 memento(s)"));
        assert!(body.contains("2 unique URI(s)"));
    }
}
