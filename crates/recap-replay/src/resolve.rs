//! Best-capture selection for a URI-R and target datetime.

use recap_index::{canonicalize, record::validate_timestamp_query, CaptureRecord, IndexStore};

use crate::error::ReplayResult;

/// A resolved capture: the selected record and whether its timestamp
/// exactly matches the requested one. A non-exact match obliges the
/// TimeGate/Memento routes to redirect to the canonical timestamp
/// rather than serve directly.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The selected capture.
    pub record: CaptureRecord,
    /// True when the record's timestamp equals the requested one.
    pub exact: bool,
}

/// Picks the best capture for a URI-R, optionally at a target datetime.
#[derive(Debug, Clone, Default)]
pub struct MementoResolver {
    local_hosts: Vec<String>,
}

impl MementoResolver {
    /// Creates a resolver. `local_hosts` are the replay server's own
    /// `host:port` spellings; a request URI that embeds one of them is
    /// stripped down to the archived URI before canonicalization.
    pub fn new(local_hosts: Vec<String>) -> Self {
        Self { local_hosts }
    }

    /// Drops a self-referential prefix from `urir`, if present.
    ///
    /// `http://localhost:2016/http://example.com/x` and
    /// `localhost:2016/http://example.com/x` both normalize to
    /// `http://example.com/x`.
    pub fn normalize_urir<'a>(&self, urir: &'a str) -> &'a str {
        let without_scheme = urir
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(urir);
        for host in &self.local_hosts {
            if let Some(rest) = without_scheme.strip_prefix(host.as_str()) {
                if let Some(tail) = rest.strip_prefix('/') {
                    return tail;
                }
            }
        }
        urir
    }

    /// Resolves `urir` against the index.
    ///
    /// With a target datetime (1-14 digit prefix), the capture
    /// minimizing the absolute integer timestamp distance wins; an
    /// exact-distance tie goes to the earlier timestamp. Without a
    /// target, the earliest capture is returned and counts as exact
    /// (nothing was requested to diverge from).
    ///
    /// `Ok(None)` means the archive holds no capture for this URI-R.
    pub fn resolve(
        &self,
        index: &IndexStore,
        urir: &str,
        target: Option<&str>,
    ) -> ReplayResult<Option<Resolution>> {
        let urir = self.normalize_urir(urir);
        let key = canonicalize(urir);

        let mut records = index.captures_for_uri(&key)?;
        if records.is_empty() {
            tracing::debug!(%key, "no captures for URI-R");
            return Ok(None);
        }
        // The store returns anchor-first encounter order; selection and
        // TimeMap generation both want chronological order.
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let Some(target) = target else {
            let record = records.into_iter().next().expect("non-empty");
            return Ok(Some(Resolution {
                record,
                exact: true,
            }));
        };

        validate_timestamp_query(target)?;
        let target_value: i64 = target.parse().expect("validated digits");

        let mut best: Option<(i64, CaptureRecord)> = None;
        for record in records {
            let diff = (record.timestamp_value() - target_value).abs();
            // Strict less-than keeps the earlier record on equal
            // distance (records iterate in chronological order).
            if best.as_ref().map_or(true, |(d, _)| diff < *d) {
                best = Some((diff, record));
            }
        }
        let (_, record) = best.expect("non-empty");

        let exact = record.timestamp == target;
        Ok(Some(Resolution { record, exact }))
    }
}
