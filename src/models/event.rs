//! Live match event records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of match event. The set is open: unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Wicket,
    Boundary,
    OverComplete,
    InningsBreak,
    MatchStart,
    MatchEnd,
    Other(String),
}

impl EventType {
    /// Canonical wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Wicket => "wicket",
            EventType::Boundary => "boundary",
            EventType::OverComplete => "over-complete",
            EventType::InningsBreak => "innings-break",
            EventType::MatchStart => "match-start",
            EventType::MatchEnd => "match-end",
            EventType::Other(tag) => tag,
        }
    }

    /// Human-readable label; unrecognized tags share a default label.
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Wicket => "Wicket",
            EventType::Boundary => "Boundary",
            EventType::OverComplete => "Over complete",
            EventType::InningsBreak => "Innings break",
            EventType::MatchStart => "Match started",
            EventType::MatchEnd => "Match ended",
            EventType::Other(_) => "Update",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "wicket" => EventType::Wicket,
            "boundary" => EventType::Boundary,
            "over-complete" => EventType::OverComplete,
            "innings-break" => EventType::InningsBreak,
            "match-start" => EventType::MatchStart,
            "match-end" => EventType::MatchEnd,
            _ => EventType::Other(raw),
        }
    }
}

impl From<&str> for EventType {
    fn from(raw: &str) -> Self {
        EventType::from(raw.to_string())
    }
}

impl From<EventType> for String {
    fn from(kind: EventType) -> Self {
        match kind {
            EventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stream message as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEventPayload {
    pub id: Option<i64>,
    pub match_id: String,
    pub message: String,
    pub event_type: EventType,
    pub over_label: Option<String>,
    pub innings_label: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl LiveEventPayload {
    /// Parse a JSON payload. Missing required fields are an error.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Fill in defaults: `position` stands in for a missing id and `now`
    /// for a missing timestamp.
    pub fn normalize(self, position: u64, now: DateTime<Utc>) -> LiveEvent {
        LiveEvent {
            id: self
                .id
                .unwrap_or_else(|| i64::try_from(position).unwrap_or(i64::MAX)),
            match_id: self.match_id,
            message: self.message,
            event_type: self.event_type,
            over_label: self.over_label,
            innings_label: self.innings_label,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

/// A normalized event held in a channel's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEvent {
    pub id: i64,
    pub match_id: String,
    pub message: String,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub innings_label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LiveEvent {
    /// Format the event for display using a template.
    ///
    /// Supported placeholders:
    /// - `{id}`, `{match_id}`, `{type}`, `{label}`, `{message}`
    /// - `{over}`, `{innings}` (empty when absent), `{time}` (UTC, `HH:MM:SS`)
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{id}", &self.id.to_string())
            .replace("{match_id}", &self.match_id)
            .replace("{type}", self.event_type.as_str())
            .replace("{label}", self.event_type.label())
            .replace("{message}", &self.message)
            .replace("{over}", self.over_label.as_deref().unwrap_or(""))
            .replace("{innings}", self.innings_label.as_deref().unwrap_or(""))
            .replace("{time}", &self.created_at.format("%H:%M:%S").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_full_payload() {
        let raw = r#"{
            "id": 42,
            "matchId": "M1",
            "message": "Bowled him!",
            "eventType": "wicket",
            "overLabel": "14.3",
            "inningsLabel": "1st innings",
            "createdAt": "2026-03-14T10:15:00+05:30"
        }"#;

        let event = LiveEventPayload::parse(raw).unwrap().normalize(7, fixed_now());
        assert_eq!(event.id, 42);
        assert_eq!(event.match_id, "M1");
        assert_eq!(event.event_type, EventType::Wicket);
        assert_eq!(event.over_label.as_deref(), Some("14.3"));
        assert_eq!(
            event.created_at,
            Utc.with_ymd_and_hms(2026, 3, 14, 4, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let raw = r#"{"matchId":"M1","message":"Drinks","eventType":"drinks-break"}"#;

        let event = LiveEventPayload::parse(raw).unwrap().normalize(3, fixed_now());
        assert_eq!(event.id, 3);
        assert_eq!(event.created_at, fixed_now());
        assert_eq!(event.over_label, None);
        assert_eq!(event.event_type, EventType::Other("drinks-break".into()));
    }

    #[test]
    fn test_fallback_id_saturates() {
        let raw = r#"{"matchId":"M1","message":"Drinks","eventType":"drinks-break"}"#;

        let event = LiveEventPayload::parse(raw).unwrap().normalize(u64::MAX, fixed_now());
        assert_eq!(event.id, i64::MAX);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(LiveEventPayload::parse(r#"{"matchId":"M1","message":"x"}"#).is_err());
        assert!(LiveEventPayload::parse("not json").is_err());
        assert!(LiveEventPayload::parse(r#"{"matchId":"M1","message":"x","eventType":"four","id":"a"}"#).is_err());
    }

    #[test]
    fn test_event_type_spellings() {
        assert_eq!(EventType::from("OVER_COMPLETE"), EventType::OverComplete);
        assert_eq!(EventType::from("innings-break"), EventType::InningsBreak);
        assert_eq!(EventType::from("Match_End"), EventType::MatchEnd);
        assert!(!EventType::from("six").is_known());
        assert_eq!(EventType::from("six").label(), "Update");
        assert_eq!(EventType::from("six").as_str(), "six");
    }

    #[test]
    fn test_event_type_serializes_canonical_tag() {
        let json = serde_json::to_string(&EventType::from("over_complete")).unwrap();
        assert_eq!(json, "\"over-complete\"");
    }

    #[test]
    fn test_format() {
        let event = LiveEvent {
            id: 1,
            match_id: "M1".into(),
            message: "Four through covers".into(),
            event_type: EventType::Boundary,
            over_label: Some("3.2".into()),
            innings_label: None,
            created_at: fixed_now(),
        };

        assert_eq!(
            event.format("[{time}] {label} {over} {message}{innings}"),
            "[09:30:00] Boundary 3.2 Four through covers"
        );
    }
}
