//! Rebuilds a replayable HTTP response from a capture's blob pair.
//!
//! A capture is stored as two content-addressed blobs: the archived
//! header text and the raw payload. Reconstruction fetches both,
//! decrypts when the index says so, strips transfer framing, remaps
//! archived headers out of the live header namespace, keeps redirects
//! inside the replay, and marks HTML for client-side rewriting.

use std::sync::Arc;
use std::time::Duration;

use aes::{Aes128, Aes256};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

use recap_index::CaptureRecord;
use recap_store::{BlobStore, StoreError};

use crate::datetime::digits14_to_rfc1123;
use crate::error::{ReplayError, ReplayResult};

type Aes128Ctr = Ctr128BE<Aes128>;
type Aes256Ctr = Ctr128BE<Aes256>;

/// Archived header names passed through unprefixed; everything else is
/// renamed under [`ARCHIVE_HEADER_PREFIX`] so the archived transport
/// headers cannot collide with the serving layer's own.
const PASSTHROUGH_HEADERS: [&str; 3] = ["content-type", "content-encoding", "location"];

/// Prefix under which all other archived headers are preserved.
pub const ARCHIVE_HEADER_PREFIX: &str = "X-Archive-Orig-";

/// Marker header set when no archived header blob was available and the
/// response headers were synthesized.
pub const GENERATED_BY_HEADER: &str = "X-Headers-Generated-By";

/// Script include injected before `</html>` to hook client-side replay
/// rewriting.
const REPLAY_SCRIPT_SNIPPET: &[u8] =
    b"<script src=\"/static/replay.js\"></script><script>recapReplayInit()</script>";

/// An HTTP response rebuilt from archived blobs. Built fresh per
/// request and discarded once sent; never cached here.
#[derive(Debug, Clone)]
pub struct ReconstructedResponse {
    /// Archived HTTP status.
    pub status: u16,
    /// Response headers in emission order. Names keep their archived
    /// case unless remapped.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl ReconstructedResponse {
    /// First header value whose name matches `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Turns capture records into replayable responses.
pub struct Reconstructor<B: BlobStore> {
    store: Arc<B>,
    fetch_timeout: Duration,
}

impl<B: BlobStore> Reconstructor<B> {
    /// Creates a reconstructor over a shared store client. `fetch_timeout`
    /// bounds each blob fetch.
    pub fn new(store: Arc<B>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
        }
    }

    /// Rebuilds the response for `record`. `request_url` is the URL of
    /// the request being served, used to keep archived redirects inside
    /// the replay.
    pub async fn reconstruct(
        &self,
        record: &CaptureRecord,
        request_url: &str,
    ) -> ReplayResult<ReconstructedResponse> {
        let (header_ref, payload_ref) = record.meta.locator_refs()?;

        let mut payload = self
            .store
            .get(payload_ref, self.fetch_timeout)
            .await
            .map_err(ReplayError::from_store)?
            .to_vec();

        let mut header_blob = match self.store.get(header_ref, self.fetch_timeout).await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!(
                    header_ref,
                    "archived header blob missing, synthesizing response headers"
                );
                None
            }
            Err(err) => return Err(ReplayError::from_store(err)),
        };

        if record.meta.is_encrypted() {
            let key = record.meta.encryption_key.as_deref().ok_or_else(|| {
                ReplayError::Decryption {
                    reason: "record is encrypted but carries no key".to_string(),
                }
            })?;
            let nonce = record.meta.encryption_nonce.as_deref().ok_or_else(|| {
                ReplayError::Decryption {
                    reason: "record is encrypted but carries no nonce".to_string(),
                }
            })?;
            // One keystream spans header then payload; the indexer
            // encrypts the pair the same way, so the payload's counter
            // offset depends on the header ciphertext length.
            let mut cipher = CaptureCipher::new(key, nonce)?;
            header_blob = match header_blob {
                Some(blob) => Some(cipher.decrypt(&blob)?),
                None => None,
            };
            payload = cipher.decrypt(&payload)?;
        }

        let archived = header_blob
            .as_deref()
            .map(parse_archived_headers)
            .unwrap_or_default();

        let chunked = archived.iter().any(|(name, value)| {
            name.eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
        });
        if chunked {
            match dechunk(&payload) {
                Some(flat) => payload = flat,
                // Header said chunked but the bytes disagree; replay
                // the payload as archived.
                None => tracing::debug!("payload does not parse as chunked, keeping raw bytes"),
            }
        }

        let mut headers: Vec<(String, String)> = archived
            .into_iter()
            .map(|(name, value)| {
                if PASSTHROUGH_HEADERS
                    .iter()
                    .any(|p| name.eq_ignore_ascii_case(p))
                {
                    (name, value)
                } else {
                    (format!("{ARCHIVE_HEADER_PREFIX}{name}"), value)
                }
            })
            .collect();

        if record.meta.status_code.starts_with('3') {
            rewrite_redirect_location(&mut headers, request_url);
        }

        if record
            .meta
            .mime_type
            .to_ascii_lowercase()
            .contains("text/html")
        {
            payload = inject_replay_script(payload);
        }

        headers.push((
            "Memento-Datetime".to_string(),
            digits14_to_rfc1123(&record.timestamp)?,
        ));
        if header_blob.is_none() {
            headers.push((GENERATED_BY_HEADER.to_string(), "RECAP Replay".to_string()));
        }

        let status = record.meta.status_code.parse().unwrap_or(200);
        Ok(ReconstructedResponse {
            status,
            headers,
            body: payload,
        })
    }
}

/// PKCS#7-pads key material to the AES block size. The padded length
/// selects the key size: 16 bytes is AES-128, 32 is AES-256.
fn pad_key(material: &[u8]) -> Vec<u8> {
    let pad = 16 - (material.len() % 16);
    let mut out = material.to_vec();
    out.extend(std::iter::repeat(pad as u8).take(pad));
    out
}

enum CtrCipher {
    Aes128(Aes128Ctr),
    Aes256(Aes256Ctr),
}

/// Stateful AES-CTR decryption for one capture's blob pair.
///
/// The stored nonce occupies the leading bytes of the counter block;
/// the counter suffix starts at zero, big endian. The keystream
/// position carries over between [`CaptureCipher::decrypt`] calls, so
/// blobs must be decrypted in the order they were encrypted: header,
/// then payload.
struct CaptureCipher {
    cipher: CtrCipher,
}

impl CaptureCipher {
    fn new(key_material: &str, nonce_b64: &str) -> ReplayResult<Self> {
        let nonce = BASE64
            .decode(nonce_b64)
            .map_err(|e| ReplayError::Decryption {
                reason: format!("nonce is not valid base64: {e}"),
            })?;
        if nonce.len() > 16 {
            return Err(ReplayError::Decryption {
                reason: format!("nonce too long: {} bytes", nonce.len()),
            });
        }
        let mut iv = [0u8; 16];
        iv[..nonce.len()].copy_from_slice(&nonce);

        let key = pad_key(key_material.as_bytes());
        let cipher = match key.len() {
            16 => CtrCipher::Aes128(Aes128Ctr::new_from_slices(&key, &iv).map_err(|e| {
                ReplayError::Decryption {
                    reason: e.to_string(),
                }
            })?),
            32 => CtrCipher::Aes256(Aes256Ctr::new_from_slices(&key, &iv).map_err(|e| {
                ReplayError::Decryption {
                    reason: e.to_string(),
                }
            })?),
            n => {
                return Err(ReplayError::Decryption {
                    reason: format!("padded key length {n} is not an AES key size"),
                })
            }
        };
        Ok(Self { cipher })
    }

    /// Decrypts one base64-encoded blob, advancing the keystream past
    /// its ciphertext.
    fn decrypt(&mut self, blob: &[u8]) -> ReplayResult<Vec<u8>> {
        let compact: Vec<u8> = blob
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let mut data = BASE64
            .decode(&compact)
            .map_err(|e| ReplayError::Decryption {
                reason: format!("ciphertext is not valid base64: {e}"),
            })?;
        match &mut self.cipher {
            CtrCipher::Aes128(cipher) => cipher.apply_keystream(&mut data),
            CtrCipher::Aes256(cipher) => cipher.apply_keystream(&mut data),
        }
        Ok(data)
    }
}

/// Parses archived header text. The first line is the status line
/// (already carried in the index metadata) and is discarded; remaining
/// lines split once on the first colon with the value trimmed.
fn parse_archived_headers(raw: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(raw);
    let mut lines = text.split('\n');
    lines.next();

    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((name, value)) => headers.push((name.trim().to_string(), value.trim().to_string())),
            None => tracing::debug!(line, "archived header line has no colon, skipping"),
        }
    }
    headers
}

/// Reassembles a chunked transfer encoding body: hex size line, that
/// many content bytes, a line terminator, until a zero-size chunk.
/// Chunk extensions after `;` are ignored. Returns `None` when the
/// bytes do not parse as chunks; callers keep the raw payload then.
pub fn dechunk(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0usize;

    loop {
        let nl = data[pos..].iter().position(|&b| b == b'\n')? + pos;
        let size_line = std::str::from_utf8(&data[pos..nl]).ok()?;
        let size_field = size_line.split(';').next()?.trim();
        if size_field.is_empty() {
            return None;
        }
        let size = usize::from_str_radix(size_field, 16).ok()?;
        pos = nl + 1;

        if size == 0 {
            return Some(out);
        }
        if pos + size > data.len() {
            return None;
        }
        out.extend_from_slice(&data[pos..pos + size]);
        pos += size;

        // Chunk content is followed by its own line terminator.
        if data.get(pos) == Some(&b'\r') {
            pos += 1;
        }
        if data.get(pos) != Some(&b'\n') {
            return None;
        }
        pos += 1;
    }
}

/// Rewrites an absolute http(s) `Location` so the redirect target stays
/// inside the replay: the current request URL up to and including its
/// `/{14 digits}/` segment becomes the prefix.
fn rewrite_redirect_location(headers: &mut [(String, String)], request_url: &str) {
    let Some(prefix_end) = memento_prefix_end(request_url) else {
        return;
    };
    for (name, value) in headers.iter_mut() {
        if name.eq_ignore_ascii_case("location") && is_http_uri(value) {
            *value = format!("{}{}", &request_url[..prefix_end], value);
            return;
        }
    }
}

/// Byte offset just past the first `/{14 digits}/` segment of `url`.
fn memento_prefix_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'/' {
            continue;
        }
        let end = i + 15;
        if end < bytes.len()
            && bytes[end] == b'/'
            && bytes[i + 1..end].iter().all(|b| b.is_ascii_digit())
        {
            return Some(end + 1);
        }
    }
    None
}

fn is_http_uri(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Inserts the replay script include before the final `</html>`.
/// Non-HTML bodies never reach this; HTML without a closing tag is
/// returned unchanged.
fn inject_replay_script(body: Vec<u8>) -> Vec<u8> {
    const CLOSE_TAG: &[u8] = b"</html>";
    let Some(at) = body
        .windows(CLOSE_TAG.len())
        .rposition(|w| w == CLOSE_TAG)
    else {
        return body;
    };
    let mut out = Vec::with_capacity(body.len() + REPLAY_SCRIPT_SNIPPET.len());
    out.extend_from_slice(&body[..at]);
    out.extend_from_slice(REPLAY_SCRIPT_SNIPPET);
    out.extend_from_slice(&body[at..]);
    out
}
