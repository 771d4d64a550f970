//! GRBL response classification
//!
//! The transport only needs to know whether a line retires a buffered
//! command, reports a fault, or is informational. Matching is by substring so
//! decorated replies such as `"ok"` with trailing noise still count.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One line received from the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerResponse {
    /// Command accepted
    Ok,
    /// Command rejected; still retires one buffered line
    Error(String),
    /// Controller entered an alarm state
    Alarm(String),
    /// Status report, e.g. `<Idle|MPos:...>`
    Status {
        /// Machine state name (`Idle`, `Run`, `Home`, ...)
        state: String,
        /// The full report line
        raw: String,
    },
    /// Welcome banner, feedback message or blank line
    Message(String),
}

impl ControllerResponse {
    /// Classify a raw line
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.contains("ALARM") {
            return Self::Alarm(line.to_string());
        }
        if let Some(body) = line.strip_prefix('<') {
            let state = body
                .split(|c| c == '|' || c == '>' || c == ',' || c == ':')
                .next()
                .unwrap_or_default()
                .to_string();
            return Self::Status {
                state,
                raw: line.to_string(),
            };
        }
        if line.contains("error") {
            return Self::Error(line.to_string());
        }
        if line.contains("ok") {
            return Self::Ok;
        }
        Self::Message(line.to_string())
    }

    /// True for replies that retire the oldest buffered line
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ok | Self::Error(_))
    }

    /// True for an `Idle` status report
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Status { state, .. } if state == "Idle")
    }
}

impl fmt::Display for ControllerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error(line) | Self::Alarm(line) | Self::Message(line) => write!(f, "{}", line),
            Self::Status { raw, .. } => write!(f, "{}", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_and_error() {
        assert_eq!(ControllerResponse::parse("ok\r"), ControllerResponse::Ok);
        assert_eq!(
            ControllerResponse::parse("error:20"),
            ControllerResponse::Error("error:20".to_string())
        );
        assert!(ControllerResponse::parse("error:20").is_ack());
    }

    #[test]
    fn test_parse_alarm_wins() {
        let response = ControllerResponse::parse("ALARM:1");
        assert_eq!(response, ControllerResponse::Alarm("ALARM:1".to_string()));
        assert!(!response.is_ack());
    }

    #[test]
    fn test_parse_status() {
        let idle = ControllerResponse::parse("<Idle|MPos:0.000,0.000,0.000|FS:0,0>");
        assert!(idle.is_idle());
        let run = ControllerResponse::parse("<Run,MPos:1.0,2.0,3.0>");
        assert!(matches!(run, ControllerResponse::Status { ref state, .. } if state == "Run"));
        assert!(!run.is_idle());
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(
            ControllerResponse::parse("Grbl 1.1h ['$' for help]"),
            ControllerResponse::Message("Grbl 1.1h ['$' for help]".to_string())
        );
        assert!(!ControllerResponse::parse("").is_ack());
    }
}
