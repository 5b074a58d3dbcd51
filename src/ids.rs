//! Request correlation identifiers.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// ULID identifying one dispatch cycle.
///
/// ULIDs sort by creation time, so ids in a log file read in request order.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse an inbound id when it is a valid ULID, otherwise mint a new one.
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|raw| raw.trim().parse::<RequestId>().ok())
            .unwrap_or_default()
    }

    /// Milliseconds since the Unix epoch encoded in the id.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

impl From<RequestId> for Value {
    fn from(id: RequestId) -> Self {
        Value::String(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header_is_reused() {
        let inbound = RequestId::new();
        let parsed = RequestId::from_header_or_new(Some(&inbound.to_string()));
        assert_eq!(parsed, inbound);
    }

    #[test]
    fn test_invalid_header_mints_new_id() {
        let id = RequestId::from_header_or_new(Some("not-a-ulid"));
        assert_eq!(id.to_string().len(), 26);
        assert!(RequestId::from_header_or_new(None).timestamp_ms() > 0);
    }

    #[test]
    fn test_into_json_value() {
        let id = RequestId::new();
        assert_eq!(Value::from(id), Value::String(id.to_string()));
    }
}
