//! Billable duration of a reconstructed call.
//!
//! Exactly one [`DurationPolicy`] applies to a call. It is chosen from the
//! call's [`CallShape`] and from whether the batch runs against a single
//! reference number; each policy then sums `billsec` over its own subset of
//! legs.

use tracing::debug;

use crate::classify::{is_forward_leg, is_group_broadcast_leg, CallShape};
use crate::leg::LegRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPolicy<'a> {
    /// Single reference number, call both forwarded and hunted by a group:
    /// every leg counts.
    ReferenceForwardedGroup,
    /// Single reference number: legs touching that number.
    Reference(&'a str),
    /// Forwarding bridge legs only.
    Forwarded,
    /// Everything except the ring-group broadcast legs.
    Group,
    /// Every leg.
    AllLegs,
}

impl<'a> DurationPolicy<'a> {
    /// Pick the policy for a call, first applicable wins.
    pub fn select(shape: &CallShape, single_reference: Option<&'a str>) -> Self {
        match single_reference {
            Some(_) if shape.forwarded && shape.group => DurationPolicy::ReferenceForwardedGroup,
            Some(reference) => DurationPolicy::Reference(reference),
            None if shape.forwarded => DurationPolicy::Forwarded,
            None if shape.group => DurationPolicy::Group,
            None => DurationPolicy::AllLegs,
        }
    }

    /// `true` if this policy counts `leg`.
    pub fn counts(&self, leg: &LegRecord) -> bool {
        match self {
            DurationPolicy::ReferenceForwardedGroup | DurationPolicy::AllLegs => true,
            DurationPolicy::Reference(reference) => {
                leg.resolved_source() == *reference || leg.effective_destination() == *reference
            }
            DurationPolicy::Forwarded => is_forward_leg(leg),
            DurationPolicy::Group => !is_group_broadcast_leg(leg),
        }
    }

    pub fn billable_seconds(&self, legs: &[LegRecord]) -> u64 {
        legs.iter()
            .filter(|leg| self.counts(leg))
            .map(|leg| leg.billsec)
            .fold(0, u64::saturating_add)
    }
}

/// Billable seconds of a call; `0` for an empty leg list.
pub fn resolve_duration(
    legs: &[LegRecord],
    shape: &CallShape,
    single_reference: Option<&str>,
) -> u64 {
    if legs.is_empty() {
        return 0;
    }
    let policy = DurationPolicy::select(shape, single_reference);
    let seconds = policy.billable_seconds(legs);
    debug!("Duration policy {:?} -> {}s", policy, seconds);
    seconds
}
