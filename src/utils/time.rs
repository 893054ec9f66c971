//! RFC 3339 timestamps for `#[serde(with = "crate::utils::time")]` fields.
//!
//! Timestamps are written in UTC with whatever sub-second precision the value
//! carries; any valid RFC 3339 offset is accepted on input.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime, normalized to UTC, as an RFC 3339 string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .to_offset(time::UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::datetime;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "crate::utils::time")]
        at: OffsetDateTime,
    }

    #[test]
    fn writes_utc() {
        let stamped = Stamped {
            at: datetime!(2024-05-01 12:30:00 +02:00),
        };
        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(json, r#"{"at":"2024-05-01T10:30:00Z"}"#);
    }

    #[test]
    fn reads_any_offset() {
        let stamped: Stamped = serde_json::from_str(r#"{"at":"2024-05-01T12:30:00+02:00"}"#).unwrap();
        assert_eq!(stamped.at, datetime!(2024-05-01 10:30:00 UTC));
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).is_err());
    }
}
