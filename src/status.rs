//! Final disposition of a reconstructed call

use crate::classify::CallShape;
use crate::leg::{Disposition, LegRecord};

/// Rank in the general-mode priority, strongest first.
///
/// `FAILED` and unknown values never win; `FAILED` is the fallback instead.
fn priority_rank(disposition: &Disposition) -> Option<u8> {
    match disposition {
        Disposition::Answered => Some(0),
        Disposition::Busy => Some(1),
        Disposition::Congestion => Some(2),
        Disposition::NoAnswer => Some(3),
        Disposition::Failed | Disposition::Other(_) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy<'a> {
    /// Single reference number, forwarded call: answered anywhere or not.
    ReferenceForwarded,
    /// Single reference number: first answered leg touching it wins, else
    /// the last touching leg's disposition.
    Reference(&'a str),
    /// Fixed priority over the whole leg set, order independent.
    Priority,
}

impl<'a> StatusPolicy<'a> {
    pub fn select(shape: &CallShape, single_reference: Option<&'a str>) -> Self {
        match single_reference {
            Some(_) if shape.forwarded => StatusPolicy::ReferenceForwarded,
            Some(reference) => StatusPolicy::Reference(reference),
            None => StatusPolicy::Priority,
        }
    }

    pub fn resolve(&self, legs: &[LegRecord]) -> Disposition {
        match self {
            StatusPolicy::ReferenceForwarded => {
                if legs
                    .iter()
                    .any(|leg| {
                        leg.disposition
                            .is_answered()
                    })
                {
                    Disposition::Answered
                } else {
                    Disposition::NoAnswer
                }
            }
            StatusPolicy::Reference(reference) => {
                let mut status = Disposition::NoAnswer;
                for leg in legs
                    .iter()
                    .filter(|leg| leg.touches(reference))
                {
                    status = leg
                        .disposition
                        .clone();
                    if status.is_answered() {
                        break;
                    }
                }
                status
            }
            StatusPolicy::Priority => legs
                .iter()
                .filter_map(|leg| priority_rank(&leg.disposition).map(|rank| (rank, leg)))
                .min_by_key(|(rank, _)| *rank)
                .map(|(_, leg)| {
                    leg.disposition
                        .clone()
                })
                .unwrap_or(Disposition::Failed),
        }
    }
}

pub fn resolve_status(
    legs: &[LegRecord],
    shape: &CallShape,
    single_reference: Option<&str>,
) -> Disposition {
    StatusPolicy::select(shape, single_reference).resolve(legs)
}
