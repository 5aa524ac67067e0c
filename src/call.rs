//! Aggregated calls produced by reconstruction

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::leg::Disposition;

/// Direction of a call relative to the PBX.
///
/// Serialized with the report vocabulary: `entrant`, `sortant`, `interne`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDirection {
    #[serde(rename = "entrant")]
    Inbound,
    #[serde(rename = "sortant")]
    Outbound,
    #[serde(rename = "interne")]
    Internal,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "entrant",
            CallDirection::Outbound => "sortant",
            CallDirection::Internal => "interne",
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical call rebuilt from its correlation group. Never mutated once
/// built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Call {
    pub start_time: NaiveDateTime,
    pub correlation_id: String,
    pub source: String,
    pub destination: String,
    /// Billable seconds
    pub duration: u64,
    pub status: Disposition,
    pub direction: CallDirection,
    pub is_internal: bool,
    pub is_click_to_call: bool,
    pub transfer_from: Option<String>,
    pub transfer_to: Option<String>,
    pub forward_from: Option<String>,
    pub forward_to: Option<String>,
    /// Hops joined with ` --> `
    pub path: String,
    pub caller_name: Option<String>,
    pub did: Option<String>,
    pub account_code: Option<String>,
    pub user_field: Option<String>,
}

impl Call {
    pub fn is_answered(&self) -> bool {
        self.status
            .is_answered()
    }

    /// Start time plus billable duration.
    pub fn end_time(&self) -> NaiveDateTime {
        let seconds = self
            .duration
            .min(u64::from(u32::MAX)) as i64;
        self.start_time
            .checked_add_signed(Duration::seconds(seconds))
            .unwrap_or(self.start_time)
    }

    pub fn is_forwarded(&self) -> bool {
        self.forward_to
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn direction_wire_names() {
        assert_eq!(
            serde_json::to_string(&CallDirection::Inbound).unwrap(),
            "\"entrant\""
        );
        assert_eq!(CallDirection::Outbound.to_string(), "sortant");
        assert_eq!(
            serde_json::from_str::<CallDirection>("\"interne\"").unwrap(),
            CallDirection::Internal
        );
    }

    #[test]
    fn end_time_adds_duration() {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(23, 59, 30)
            .unwrap();
        let call = Call {
            start_time: start,
            correlation_id: "1714550000.0".into(),
            source: "101".into(),
            destination: "102".into(),
            duration: 45,
            status: Disposition::Answered,
            direction: CallDirection::Internal,
            is_internal: true,
            is_click_to_call: false,
            transfer_from: None,
            transfer_to: None,
            forward_from: None,
            forward_to: None,
            path: "101 --> 102 (ANSWERED)".into(),
            caller_name: None,
            did: None,
            account_code: None,
            user_field: None,
        };
        assert_eq!(
            call.end_time(),
            NaiveDate::from_ymd_opt(2025, 5, 2)
                .unwrap()
                .and_hms_opt(0, 0, 15)
                .unwrap()
        );
        assert!(call.is_answered());
        assert!(!call.is_forwarded());
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["status"], "ANSWERED");
        assert_eq!(json["direction"], "interne");
    }
}
