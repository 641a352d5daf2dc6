//! 14-digit Memento timestamps and their RFC 1123 header form.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ReplayError, ReplayResult};

const DIGITS14: &str = "%Y%m%d%H%M%S";
const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats a full 14-digit UTC stamp as an RFC 1123 string,
/// e.g. `20200101120000` → `Wed, 01 Jan 2020 12:00:00 GMT`.
pub fn digits14_to_rfc1123(stamp: &str) -> ReplayResult<String> {
    let parsed = NaiveDateTime::parse_from_str(stamp, DIGITS14).map_err(|_| {
        ReplayError::BadDatetime {
            value: stamp.to_string(),
        }
    })?;
    Ok(parsed.and_utc().format(RFC1123).to_string())
}

/// Parses an RFC 1123 (RFC 2822 zone rules) datetime into a 14-digit
/// UTC stamp.
pub fn rfc1123_to_digits14(value: &str) -> ReplayResult<String> {
    let parsed = DateTime::parse_from_rfc2822(value).map_err(|_| ReplayError::BadDatetime {
        value: value.to_string(),
    })?;
    Ok(parsed.with_timezone(&Utc).format(DIGITS14).to_string())
}

/// The current UTC instant as a 14-digit stamp. TimeGate default when no
/// `Accept-Datetime` is sent.
pub fn now_digits14() -> String {
    Utc::now().format(DIGITS14).to_string()
}
