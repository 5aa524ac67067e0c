//! Click-to-call calls.
//!
//! The PBX first rings the internal user with a caller name asking them to
//! answer, then dials the real destination from a `macro-dial` leg. Such calls
//! bypass the generic trail and duration rules.

use crate::classify::{forward_legs, is_click_to_call};
use crate::constants::PATH_SEPARATOR;
use crate::leg::LegRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickToCall {
    pub source: String,
    pub destination: String,
    /// Dial leg plus every forwarding leg
    pub duration: u64,
    /// Destinations of forwarding legs, in leg order
    pub forward_numbers: Vec<String>,
}

impl ClickToCall {
    /// Recognize a click-to-call among time-ordered legs.
    pub fn detect(legs: &[LegRecord]) -> Option<Self> {
        if !is_click_to_call(legs) {
            return None;
        }
        let first = legs.first()?;
        let dial = legs
            .iter()
            .find(|leg| {
                leg.context
                    .is_macro_dial()
            })
            .unwrap_or(first);

        // Caller-id shaped first source: use the dial leg's configured source.
        let first_source = first.resolved_source();
        let source = if first_source.starts_with('0') || first_source.starts_with('+') {
            dial.src
                .clone()
        } else {
            first_source.to_string()
        };

        let forwards = forward_legs(legs);
        let duration = dial.billsec
            + forwards
                .iter()
                .map(|leg| leg.billsec)
                .sum::<u64>();
        let forward_numbers = forwards
            .iter()
            .map(|leg| {
                leg.dst
                    .clone()
            })
            .collect();

        Some(Self {
            source,
            destination: first
                .dst
                .clone(),
            duration,
            forward_numbers,
        })
    }

    /// `source --> forwards... --> destination`
    pub fn path(&self) -> String {
        std::iter::once(self.source.as_str())
            .chain(
                self.forward_numbers
                    .iter()
                    .map(String::as_str),
            )
            .chain(std::iter::once(self.destination.as_str()))
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }

    /// Last forward number, the endpoint the call was forwarded from.
    pub fn forward_from(&self) -> Option<&str> {
        self.forward_numbers
            .last()
            .map(String::as_str)
    }

    /// Both endpoints known; otherwise the call goes through the generic rules.
    pub fn is_complete(&self) -> bool {
        !self
            .source
            .is_empty()
            && !self
                .destination
                .is_empty()
    }
}
