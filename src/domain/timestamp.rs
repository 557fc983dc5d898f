use serde::Serializer;
use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Wire rendering for instants. Fixed width, so string order matches time order.
const WIRE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

const DATE_ONLY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Source of "now" for timestamps that cannot be parsed.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Accepts RFC 3339 and ISO-8601 date-times, a space in place of `T`, offsetless date-times
/// (read as UTC) and bare dates (midnight UTC).
pub fn parse_iso_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    let mut normalized = match raw.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };
    if normalized.as_bytes().get(10) == Some(&b' ') {
        normalized.replace_range(10..11, "T");
    }

    if let Ok(parsed) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Some(parsed);
    }
    if let Ok(parsed) = OffsetDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        return Some(parsed);
    }
    // No offset at all: read as UTC.
    if let Ok(parsed) = PrimitiveDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        return Some(parsed.assume_utc());
    }
    Date::parse(&normalized, DATE_ONLY_FORMAT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Normalizes a record's `timestamp` field.
///
/// Anything that is not a parseable ISO-8601 string (absent, wrong type, malformed) falls back to
/// `clock.now()`. Downstream code cannot tell the two apart.
pub fn normalize_timestamp(value: Option<&Value>, clock: &dyn Clock) -> OffsetDateTime {
    value
        .and_then(Value::as_str)
        .and_then(parse_iso_timestamp)
        .unwrap_or_else(|| clock.now())
}

/// Index timestamps are epoch milliseconds. Zero or absent means "no timestamp".
pub fn epoch_millis_to_instant(value: Option<&Value>) -> Option<OffsetDateTime> {
    let value = value?;
    let nanos: i128 = if let Some(ms) = value.as_i64() {
        i128::from(ms) * 1_000_000
    } else {
        let ms = value.as_f64()?;
        if !ms.is_finite() {
            return None;
        }
        (ms * 1_000_000.0) as i128
    };
    if nanos == 0 {
        return None;
    }
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

pub fn format_instant(instant: OffsetDateTime) -> String {
    instant
        .to_offset(UtcOffset::UTC)
        .format(WIRE_FORMAT)
        .unwrap_or_else(|_| "1970-01-01T00:00:00.000Z".to_string())
}

pub(crate) fn serialize_instant<S: Serializer>(
    instant: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_instant(*instant))
}

pub(crate) fn serialize_optional_instant<S: Serializer>(
    instant: &Option<OffsetDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match instant {
        Some(instant) => serializer.serialize_str(&format_instant(*instant)),
        None => serializer.serialize_none(),
    }
}
