//! Leg-set predicates: forwards, ring groups, click-to-call bridges

use crate::channel::{is_local, is_local_forward};
use crate::constants::CLICK_TO_CALL_MARKER;
use crate::leg::{DialContext, LegRecord};

/// Forwarding bridge leg: an internal `Local/0...` origin channel.
pub fn is_forward_leg(leg: &LegRecord) -> bool {
    is_local_forward(&leg.channel) && leg.context == DialContext::FromInternal
}

/// Ring-group broadcast leg: the group hunting its members over Local channels.
pub fn is_group_broadcast_leg(leg: &LegRecord) -> bool {
    leg.context == DialContext::ExtGroup && is_local(&leg.dst_channel)
}

/// Leg carrying the click-to-call caller-name marker.
pub fn has_click_to_call_marker(leg: &LegRecord) -> bool {
    leg.caller_name
        .as_deref()
        .map_or(false, |name| name.contains(CLICK_TO_CALL_MARKER))
}

pub fn is_forward(legs: &[LegRecord]) -> bool {
    legs.iter()
        .any(is_forward_leg)
}

/// Forwarding legs in input order, empty when the call was not forwarded.
pub fn forward_legs(legs: &[LegRecord]) -> Vec<&LegRecord> {
    legs.iter()
        .filter(|leg| is_forward_leg(leg))
        .collect()
}

pub fn is_group_call(legs: &[LegRecord]) -> bool {
    legs.iter()
        .any(is_group_broadcast_leg)
}

pub fn is_click_to_call(legs: &[LegRecord]) -> bool {
    legs.iter()
        .any(has_click_to_call_marker)
}

/// Leg-set predicates evaluated once per correlation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallShape {
    pub forwarded: bool,
    pub group: bool,
    pub click_to_call: bool,
}

impl CallShape {
    pub fn of(legs: &[LegRecord]) -> Self {
        Self {
            forwarded: is_forward(legs),
            group: is_group_call(legs),
            click_to_call: is_click_to_call(legs),
        }
    }
}
