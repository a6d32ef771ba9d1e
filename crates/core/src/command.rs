//! Control messages sent by the hosting application.
//!
//! Messages arrive as JSON objects of the form `{"type": "SKIP_WAITING"}`.
//! Parsing is strict: the `type` tag must name one of the known kinds exactly.

use serde::{Deserialize, Serialize};

use crate::Error;

/// A validated control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlCommand {
    /// Leave the waiting state immediately.
    SkipWaiting,
    /// Delete every cache store regardless of name or version.
    ClearCache,
}

impl ControlCommand {
    /// Validate a JSON control message.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Error> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| Error::UnknownCommand("message has no string `type` field".into()))?;

        match kind {
            "SKIP_WAITING" => Ok(ControlCommand::SkipWaiting),
            "CLEAR_CACHE" => Ok(ControlCommand::ClearCache),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }

    /// Parse and validate a raw JSON control message.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| Error::InvalidInput(format!("control message: {e}")))?;
        Self::from_value(&value)
    }

    pub fn kind(self) -> &'static str {
        match self {
            ControlCommand::SkipWaiting => "SKIP_WAITING",
            ControlCommand::ClearCache => "CLEAR_CACHE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!(ControlCommand::parse(r#"{"type":"SKIP_WAITING"}"#).unwrap(), ControlCommand::SkipWaiting);
        assert_eq!(ControlCommand::parse(r#"{"type":"CLEAR_CACHE"}"#).unwrap(), ControlCommand::ClearCache);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let cmd = ControlCommand::parse(r#"{"type":"CLEAR_CACHE","reason":"reset"}"#).unwrap();
        assert_eq!(cmd, ControlCommand::ClearCache);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = ControlCommand::parse(r#"{"type":"CLEAR_CACHE_NOW"}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(kind) if kind == "CLEAR_CACHE_NOW"));
    }

    #[test]
    fn test_kind_is_case_sensitive() {
        assert!(ControlCommand::parse(r#"{"type":"skip_waiting"}"#).is_err());
    }

    #[test]
    fn test_missing_type_rejected() {
        assert!(matches!(ControlCommand::parse(r#"{"kind":"SKIP_WAITING"}"#), Err(Error::UnknownCommand(_))));
        assert!(matches!(ControlCommand::parse(r#"{"type":42}"#), Err(Error::UnknownCommand(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(ControlCommand::parse("{"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_serialize_matches_wire_format() {
        let json = serde_json::to_string(&ControlCommand::SkipWaiting).unwrap();
        assert_eq!(json, r#"{"type":"SKIP_WAITING"}"#);
        assert_eq!(ControlCommand::ClearCache.kind(), "CLEAR_CACHE");
    }
}
