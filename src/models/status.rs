//! Connection health snapshot.

use serde::{Deserialize, Serialize};

/// Health of a live feed as seen by its consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub reconnecting: bool,
    /// Cleared on every successful (re)connection
    pub error: Option<String>,
    /// Automatic attempts since the last success or manual reset
    pub retry_count: u32,
}

impl ConnectionStatus {
    /// Short description for logs and the CLI.
    pub fn summary(&self) -> String {
        match (self.connected, self.reconnecting, &self.error) {
            (true, _, _) => "connected".to_string(),
            (false, true, _) => format!("reconnecting (attempt {})", self.retry_count),
            (false, false, Some(error)) => format!("disconnected: {error}"),
            (false, false, None) => "connecting".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let status = ConnectionStatus::default();
        assert!(!status.connected);
        assert!(!status.reconnecting);
        assert_eq!(status.error, None);
        assert_eq!(status.retry_count, 0);
    }

    #[test]
    fn test_summary() {
        let status = ConnectionStatus {
            reconnecting: true,
            retry_count: 2,
            ..ConnectionStatus::default()
        };
        assert_eq!(status.summary(), "reconnecting (attempt 2)");

        let status = ConnectionStatus {
            error: Some("gone".into()),
            ..ConnectionStatus::default()
        };
        assert_eq!(status.summary(), "disconnected: gone");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ConnectionStatus::default()).unwrap();
        assert_eq!(json["retryCount"], 0);
        assert!(json["error"].is_null());
    }
}
