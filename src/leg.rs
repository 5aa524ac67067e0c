//! Raw CDR leg records and their typed fields

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::channel::{decode_endpoint, is_local_forward};
use crate::constants::*;
use crate::error::{CdrError, CdrResult};

/// Final state of one leg, as written by the PBX in the `disposition` column.
///
/// Unknown vendor values are kept verbatim in [`Disposition::Other`] and never
/// take part in the status priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Disposition {
    Answered,
    Busy,
    Congestion,
    NoAnswer,
    Failed,
    Other(String),
}

impl Disposition {
    pub fn as_str(&self) -> &str {
        match self {
            Disposition::Answered => "ANSWERED",
            Disposition::Busy => "BUSY",
            Disposition::Congestion => "CONGESTION",
            Disposition::NoAnswer => "NO ANSWER",
            Disposition::Failed => "FAILED",
            Disposition::Other(raw) => raw,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Disposition::Answered)
    }
}

impl Default for Disposition {
    fn default() -> Self {
        Disposition::Other(String::new())
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ANSWERED" => Disposition::Answered,
            "BUSY" => Disposition::Busy,
            "CONGESTION" => Disposition::Congestion,
            "NO ANSWER" => Disposition::NoAnswer,
            "FAILED" => Disposition::Failed,
            _ => Disposition::Other(s.to_string()),
        })
    }
}

impl From<String> for Disposition {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(disposition) => disposition,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Disposition {
    fn from(s: &str) -> Self {
        Disposition::from(s.to_string())
    }
}

impl From<Disposition> for String {
    fn from(d: Disposition) -> Self {
        match d {
            Disposition::Other(raw) => raw,
            known => known
                .as_str()
                .to_string(),
        }
    }
}

/// Dialplan context a leg was routed through (`dcontext` column).
///
/// Contexts the engine does not know are standard routing and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum DialContext {
    FromInternal,
    FromTrunk,
    ExtGroup,
    ExtLocal,
    FollowmeCheck,
    Other(String),
}

impl DialContext {
    pub fn as_str(&self) -> &str {
        match self {
            DialContext::FromInternal => CONTEXT_FROM_INTERNAL,
            DialContext::FromTrunk => CONTEXT_FROM_TRUNK,
            DialContext::ExtGroup => CONTEXT_EXT_GROUP,
            DialContext::ExtLocal => CONTEXT_EXT_LOCAL,
            DialContext::FollowmeCheck => CONTEXT_FOLLOWME_CHECK,
            DialContext::Other(raw) => raw,
        }
    }

    /// Click-to-call dial macro (`macro-dial`, `macro-dial-one`, ...).
    pub fn is_macro_dial(&self) -> bool {
        self.as_str()
            .contains(CONTEXT_MACRO_DIAL)
    }
}

impl Default for DialContext {
    fn default() -> Self {
        DialContext::Other(String::new())
    }
}

impl fmt::Display for DialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DialContext {
    fn from(s: String) -> Self {
        match s.as_str() {
            CONTEXT_FROM_INTERNAL => DialContext::FromInternal,
            CONTEXT_FROM_TRUNK => DialContext::FromTrunk,
            CONTEXT_EXT_GROUP => DialContext::ExtGroup,
            CONTEXT_EXT_LOCAL => DialContext::ExtLocal,
            CONTEXT_FOLLOWME_CHECK => DialContext::FollowmeCheck,
            _ => DialContext::Other(s),
        }
    }
}

impl From<&str> for DialContext {
    fn from(s: &str) -> Self {
        DialContext::from(s.to_string())
    }
}

/// One raw channel hop of a call, as stored in the CDR table.
///
/// Field names on the wire follow the CDR columns (`linkedid`, `dstchannel`,
/// `cnam`, ...). Null or missing text becomes empty, null or missing numbers
/// become zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LegRecord {
    #[serde(rename = "calldate", deserialize_with = "deserialize_calldate")]
    pub timestamp: NaiveDateTime,
    /// Shared by every leg of one logical call
    #[serde(rename = "linkedid", default, deserialize_with = "null_as_default")]
    pub correlation_id: String,
    #[serde(rename = "uniqueid", default, deserialize_with = "null_as_default")]
    pub leg_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub src: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dst: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(rename = "dstchannel", default, deserialize_with = "null_as_default")]
    pub dst_channel: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disposition: Disposition,
    #[serde(rename = "cnum", default, deserialize_with = "null_as_default")]
    pub caller_number: String,
    #[serde(rename = "cnam", default)]
    pub caller_name: Option<String>,
    /// Orders legs inside a correlation group
    #[serde(default, deserialize_with = "null_as_default")]
    pub sequence: u64,
    #[serde(alias = "dcontext", default, deserialize_with = "null_as_default")]
    pub context: DialContext,
    #[serde(rename = "lastapp", default, deserialize_with = "null_as_default")]
    pub last_app: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub billsec: u64,
    #[serde(default)]
    pub did: Option<String>,
    #[serde(rename = "accountcode", default)]
    pub account_code: Option<String>,
    #[serde(rename = "userfield", default)]
    pub user_field: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub clid: Option<String>,
}

impl LegRecord {
    /// Source endpoint: decoded from the origin channel, else the `src` column.
    pub fn resolved_source(&self) -> &str {
        decode_endpoint(&self.channel).unwrap_or(&self.src)
    }

    /// Destination endpoint: decoded from the destination channel, else `dst`.
    pub fn resolved_destination(&self) -> &str {
        decode_endpoint(&self.dst_channel).unwrap_or(&self.dst)
    }

    /// Destination as seen by path and duration accounting.
    ///
    /// A forwarding bridge (`Local/0...`) as destination channel names the
    /// virtual forward target, so the dialed `dst` is used instead.
    pub fn effective_destination(&self) -> &str {
        if is_local_forward(&self.dst_channel) {
            &self.dst
        } else {
            self.resolved_destination()
        }
    }

    /// Either resolved endpoint equals `number`.
    pub(crate) fn touches(&self, number: &str) -> bool {
        self.resolved_source() == number || self.resolved_destination() == number
    }

    /// Parse a JSON array of CDR rows.
    pub fn from_json_array(input: &str) -> CdrResult<Vec<LegRecord>> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse one CDR row per line, skipping blank lines.
    pub fn from_json_lines(input: &str) -> CdrResult<Vec<LegRecord>> {
        input
            .lines()
            .filter(|line| {
                !line
                    .trim()
                    .is_empty()
            })
            .map(|line| serde_json::from_str(line).map_err(CdrError::from))
            .collect()
    }
}

/// Parse a call date in any of the layouts found in CDR exports.
///
/// Date-only values resolve to midnight.
pub fn parse_calldate(value: &str) -> CdrResult<NaiveDateTime> {
    let value = value.trim();
    for format in CALLDATE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight);
            }
        }
    }
    Err(CdrError::invalid_timestamp(value))
}

fn deserialize_calldate<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calldate(&raw).map_err(serde::de::Error::custom)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
