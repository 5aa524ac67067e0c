//! Reconstruction of the endpoint trail a call followed.
//!
//! The trail is built by folding time-ordered legs into a [`PathState`]. Each
//! leg proposes its destination as the next hop; duplicates of the previous
//! hop, of any earlier hop, and of the node a forward already stands for are
//! dropped. Forwarding bridges and `ext-local` transfers also record their
//! endpoints along the way.

use std::collections::HashSet;

use tracing::trace;

use crate::channel::is_local;
use crate::classify::is_forward_leg;
use crate::constants::{ANSWERED_SUFFIX, PATH_SEPARATOR};
use crate::leg::{DialContext, LegRecord};

/// Endpoint trail of one call plus the transfer/forward endpoints found on it.
///
/// `forward_from` is never assigned by the trail itself: a forward is only
/// visible from the forwarding leg's side, which names the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallPath {
    pub hops: Vec<String>,
    pub transfer_from: Option<String>,
    pub transfer_to: Option<String>,
    pub forward_from: Option<String>,
    pub forward_to: Option<String>,
}

impl CallPath {
    /// Hops joined with ` --> `.
    pub fn render(&self) -> String {
        self.hops
            .join(PATH_SEPARATOR)
    }
}

/// Fold accumulator. Owned and moved through [`PathState::step`], so no state
/// outlives a single reconstruction.
#[derive(Debug, Default)]
pub struct PathState {
    hops: Vec<String>,
    seen: HashSet<String>,
    virtual_forward: Option<String>,
    transfer_from: Option<String>,
    transfer_to: Option<String>,
    forward_to: Option<String>,
}

/// Hop text without the answered marker.
fn hop_key(hop: &str) -> &str {
    hop.strip_suffix(ANSWERED_SUFFIX)
        .unwrap_or(hop)
}

impl PathState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for the next leg in time order.
    pub fn step(mut self, leg: &LegRecord) -> Self {
        let source = leg.resolved_source();
        let destination = leg.effective_destination();

        if !source.is_empty() && !destination.is_empty() {
            if self
                .hops
                .is_empty()
            {
                self.emit(source.to_string());
                if !leg
                    .dst
                    .is_empty()
                    && leg.dst != destination
                    && self.accepts(&leg.dst, &leg.dst)
                {
                    self.emit(leg.dst.clone());
                }
            }

            let hop = if leg
                .disposition
                .is_answered()
                && !is_local(&leg.dst_channel)
            {
                format!("{}{}", destination, ANSWERED_SUFFIX)
            } else {
                destination.to_string()
            };
            if self.accepts(destination, &hop) {
                self.emit(hop);
            }
        }

        if is_forward_leg(leg) {
            if leg
                .disposition
                .is_answered()
            {
                self.forward_to = Some(destination.to_string());
            }
            self.virtual_forward = Some(destination.to_string());
        }

        if leg.context == DialContext::ExtLocal && leg.dst != destination {
            if self
                .transfer_to
                .is_none()
                && !destination.is_empty()
            {
                self.transfer_to = Some(destination.to_string());
            }
            if self
                .transfer_from
                .is_none()
                && !source.is_empty()
            {
                self.transfer_from = Some(source.to_string());
            }
        }

        self
    }

    fn accepts(&self, key: &str, hop: &str) -> bool {
        let repeats_last = self
            .hops
            .last()
            .map_or(false, |last| hop_key(last) == key);
        let is_virtual = self
            .virtual_forward
            .as_deref()
            == Some(key);
        let emitted = self
            .seen
            .contains(hop);
        !repeats_last && !emitted && !is_virtual
    }

    fn emit(&mut self, hop: String) {
        trace!("Path hop: {}", hop);
        self.seen
            .insert(hop.clone());
        self.hops
            .push(hop);
    }

    pub fn finish(self) -> CallPath {
        CallPath {
            hops: self.hops,
            transfer_from: self.transfer_from,
            transfer_to: self.transfer_to,
            forward_from: None,
            forward_to: self.forward_to,
        }
    }
}

/// Reconstruct the trail of time-ordered legs.
pub fn reconstruct(legs: &[LegRecord]) -> CallPath {
    legs.iter()
        .fold(PathState::new(), PathState::step)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leg::Disposition;

    fn leg(src: &str, dst: &str, disposition: Disposition) -> LegRecord {
        LegRecord {
            src: src.into(),
            dst: dst.into(),
            disposition,
            ..Default::default()
        }
    }

    #[test]
    fn inbound_answered() {
        let legs = vec![LegRecord {
            channel: "PJSIP/trunk-orange-00000001".into(),
            dst_channel: "PJSIP/101-00000002".into(),
            ..leg("0033199998888", "101", Disposition::Answered)
        }];
        let path = reconstruct(&legs);
        assert_eq!(path.render(), "0033199998888 --> 101 (ANSWERED)");
        assert!(path
            .transfer_to
            .is_none());
        assert!(path
            .forward_to
            .is_none());
    }

    #[test]
    fn consecutive_duplicate_ignores_answered_suffix() {
        let legs = vec![
            leg("100", "101", Disposition::Answered),
            leg("100", "101", Disposition::NoAnswer),
        ];
        assert_eq!(reconstruct(&legs).render(), "100 --> 101 (ANSWERED)");
    }

    #[test]
    fn earlier_hop_is_not_repeated() {
        let legs = vec![
            leg("100", "101", Disposition::NoAnswer),
            leg("100", "102", Disposition::NoAnswer),
            leg("100", "101", Disposition::NoAnswer),
        ];
        assert_eq!(reconstruct(&legs).render(), "100 --> 101 --> 102");
    }

    #[test]
    fn answered_suffix_skipped_on_local_bridge() {
        let legs = vec![LegRecord {
            dst_channel: "Local/101@from-internal-00000001;1".into(),
            ..leg("100", "101", Disposition::Answered)
        }];
        assert_eq!(reconstruct(&legs).render(), "100 --> 101");
    }

    #[test]
    fn raw_destination_is_seeded_when_channel_differs() {
        let legs = vec![LegRecord {
            dst_channel: "PJSIP/102-00000002".into(),
            ..leg("0601020304", "600", Disposition::Answered)
        }];
        assert_eq!(
            reconstruct(&legs).render(),
            "0601020304 --> 600 --> 102 (ANSWERED)"
        );
    }

    #[test]
    fn raw_destination_equal_to_source_is_not_repeated() {
        let legs = vec![LegRecord {
            dst_channel: "PJSIP/102-00000001".into(),
            ..leg("101", "101", Disposition::Answered)
        }];
        let path = reconstruct(&legs);
        assert_eq!(path.render(), "101 --> 102 (ANSWERED)");
        assert!(path
            .hops
            .windows(2)
            .all(|pair| hop_key(&pair[0]) != hop_key(&pair[1])));
    }

    #[test]
    fn forward_records_target_and_suppresses_it() {
        let forward = |dst: &str, disposition| LegRecord {
            channel: "Local/0101@from-internal-00000001;2".into(),
            context: DialContext::FromInternal,
            ..leg("101", dst, disposition)
        };
        let legs = vec![
            forward("102", Disposition::NoAnswer),
            forward("103", Disposition::Answered),
            leg("0101", "102", Disposition::NoAnswer),
        ];
        let path = reconstruct(&legs);
        assert_eq!(path.forward_to.as_deref(), Some("103"));
        assert_eq!(path.forward_from, None);
        assert_eq!(path.render(), "0101 --> 102 --> 103 (ANSWERED)");
    }

    #[test]
    fn virtual_forward_blocks_its_node() {
        let legs = vec![
            LegRecord {
                channel: "Local/0601020304@from-internal-00000001;2".into(),
                context: DialContext::FromInternal,
                ..leg("101", "0601020304", Disposition::NoAnswer)
            },
            leg("200", "300", Disposition::NoAnswer),
            leg("300", "0601020304", Disposition::Answered),
        ];
        let path = reconstruct(&legs);
        assert_eq!(path.render(), "0601020304 --> 300");
        assert_eq!(path.forward_to, None);
    }

    #[test]
    fn ext_local_transfer() {
        let legs = vec![
            leg("0601020304", "101", Disposition::Answered),
            LegRecord {
                channel: "PJSIP/101-00000003".into(),
                dst_channel: "PJSIP/102-00000004".into(),
                context: DialContext::ExtLocal,
                ..leg("0601020304", "*2102", Disposition::Answered)
            },
        ];
        let path = reconstruct(&legs);
        assert_eq!(path.transfer_from.as_deref(), Some("101"));
        assert_eq!(path.transfer_to.as_deref(), Some("102"));
        assert_eq!(
            path.render(),
            "0601020304 --> 101 (ANSWERED) --> 102 (ANSWERED)"
        );
    }

    #[test]
    fn first_transfer_is_kept() {
        let transfer = |dst_channel: &str| LegRecord {
            dst_channel: dst_channel.into(),
            context: DialContext::ExtLocal,
            ..leg("101", "600", Disposition::NoAnswer)
        };
        let legs = vec![
            transfer("PJSIP/102-00000001"),
            transfer("PJSIP/103-00000002"),
        ];
        let path = reconstruct(&legs);
        assert_eq!(path.transfer_to.as_deref(), Some("102"));
        assert_eq!(path.transfer_from.as_deref(), Some("101"));
    }

    #[test]
    fn legs_without_endpoints_do_not_seed() {
        let legs = vec![
            leg("", "101", Disposition::NoAnswer),
            leg("100", "101", Disposition::NoAnswer),
        ];
        assert_eq!(reconstruct(&legs).render(), "100 --> 101");
        assert!(reconstruct(&[])
            .hops
            .is_empty());
    }
}
