//! Turning one correlation group into at most one [`Call`].
//!
//! ```text
//! Empty ──────────────────────────────► Rejected(EmptyGroup)
//! sort by sequence
//!   ├─ click-to-call, both ends known ─► Built
//!   ├─ first leg lacks src or dst ─────► Rejected(MissingSource | MissingDestination)
//!   └─ standard ───────────────────────► Built
//! ```

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::call::{Call, CallDirection};
use crate::channel::is_trunk;
use crate::classify::CallShape;
use crate::click_to_call::ClickToCall;
use crate::duration::resolve_duration;
use crate::leg::LegRecord;
use crate::path::reconstruct;
use crate::status::resolve_status;

/// Batch-scoped lookup tables, read-only while calls are being built.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    internal: HashSet<String>,
    reference_numbers: Vec<String>,
}

impl AnalysisContext {
    pub fn new<I, R>(internal: I, reference_numbers: R) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            internal: internal
                .into_iter()
                .map(Into::into)
                .collect(),
            reference_numbers: reference_numbers
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }

    pub fn is_internal(&self, endpoint: &str) -> bool {
        self.internal
            .contains(endpoint)
    }

    pub fn is_reference(&self, endpoint: &str) -> bool {
        self.reference_numbers
            .iter()
            .any(|n| n == endpoint)
    }

    pub fn reference_numbers(&self) -> &[String] {
        &self.reference_numbers
    }

    /// The reference number when exactly one is configured. Duration and
    /// status then follow that number instead of the general rules.
    pub fn single_reference(&self) -> Option<&str> {
        match self
            .reference_numbers
            .as_slice()
        {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

/// Why a correlation group produced no call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    EmptyGroup,
    MissingSource,
    MissingDestination,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyGroup => write!(f, "no legs"),
            RejectReason::MissingSource => write!(f, "first leg has no source"),
            RejectReason::MissingDestination => write!(f, "first leg has no destination"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built(Call),
    Rejected(RejectReason),
}

impl BuildOutcome {
    pub fn into_call(self) -> Option<Call> {
        match self {
            BuildOutcome::Built(call) => Some(call),
            BuildOutcome::Rejected(_) => None,
        }
    }
}

pub struct CallBuilder<'a> {
    context: &'a AnalysisContext,
}

impl<'a> CallBuilder<'a> {
    pub fn new(context: &'a AnalysisContext) -> Self {
        Self { context }
    }

    /// Build the call of one correlation group. Legs may arrive in any order;
    /// they are stable-sorted by sequence number first.
    pub fn build(&self, mut legs: Vec<LegRecord>) -> BuildOutcome {
        legs.sort_by_key(|leg| leg.sequence);
        self.build_sorted(&legs)
    }

    /// Same as [`CallBuilder::build`] for legs already in sequence order.
    pub fn build_sorted(&self, legs: &[LegRecord]) -> BuildOutcome {
        let Some(first) = legs.first() else {
            return BuildOutcome::Rejected(RejectReason::EmptyGroup);
        };
        let shape = CallShape::of(legs);

        if shape.click_to_call {
            if let Some(ctc) = ClickToCall::detect(legs).filter(ClickToCall::is_complete) {
                return BuildOutcome::Built(self.click_to_call(legs, first, &shape, ctc));
            }
        }

        if first
            .src
            .is_empty()
        {
            debug!("Rejecting {}: no source", first.correlation_id);
            return BuildOutcome::Rejected(RejectReason::MissingSource);
        }
        if first
            .dst
            .is_empty()
        {
            debug!("Rejecting {}: no destination", first.correlation_id);
            return BuildOutcome::Rejected(RejectReason::MissingDestination);
        }

        BuildOutcome::Built(self.standard(legs, first, &shape))
    }

    fn click_to_call(
        &self,
        legs: &[LegRecord],
        first: &LegRecord,
        shape: &CallShape,
        ctc: ClickToCall,
    ) -> Call {
        let single_reference = self
            .context
            .single_reference();
        let is_internal = self
            .context
            .is_internal(&ctc.source)
            && self
                .context
                .is_internal(&ctc.destination);
        let path = ctc.path();
        let forward_from = ctc
            .forward_from()
            .map(str::to_string);

        Call {
            start_time: first.timestamp,
            correlation_id: first
                .correlation_id
                .clone(),
            duration: ctc.duration,
            status: resolve_status(legs, shape, single_reference),
            direction: self.direction(legs, first, is_internal),
            is_internal,
            is_click_to_call: true,
            transfer_from: None,
            transfer_to: None,
            forward_from,
            forward_to: None,
            path,
            caller_name: first
                .caller_name
                .clone(),
            did: first
                .did
                .clone(),
            account_code: first
                .account_code
                .clone(),
            user_field: first
                .user_field
                .clone(),
            source: ctc.source,
            destination: ctc.destination,
        }
    }

    fn standard(&self, legs: &[LegRecord], first: &LegRecord, shape: &CallShape) -> Call {
        let single_reference = self
            .context
            .single_reference();
        let is_internal = self
            .context
            .is_internal(&first.src)
            && self
                .context
                .is_internal(&first.dst);
        let path = reconstruct(legs);
        let path_text = path.render();

        Call {
            start_time: first.timestamp,
            correlation_id: first
                .correlation_id
                .clone(),
            source: first
                .src
                .clone(),
            destination: first
                .dst
                .clone(),
            duration: resolve_duration(legs, shape, single_reference),
            status: resolve_status(legs, shape, single_reference),
            direction: self.direction(legs, first, is_internal),
            is_internal,
            is_click_to_call: false,
            transfer_from: path.transfer_from,
            transfer_to: path.transfer_to,
            forward_from: path.forward_from,
            forward_to: path.forward_to,
            path: path_text,
            caller_name: first
                .caller_name
                .clone(),
            did: first
                .did
                .clone(),
            account_code: first
                .account_code
                .clone(),
            user_field: first
                .user_field
                .clone(),
        }
    }

    /// Internal calls are oriented by the reference numbers; others by which
    /// side carries a trunk channel.
    fn direction(&self, legs: &[LegRecord], first: &LegRecord, is_internal: bool) -> CallDirection {
        if is_internal {
            if self
                .context
                .is_reference(&first.src)
            {
                return CallDirection::Outbound;
            }
            if self
                .context
                .is_reference(&first.dst)
            {
                return CallDirection::Inbound;
            }
            return CallDirection::Internal;
        }

        if legs
            .iter()
            .any(|leg| is_trunk(&leg.channel))
        {
            CallDirection::Inbound
        } else if legs
            .iter()
            .any(|leg| is_trunk(&leg.dst_channel))
        {
            CallDirection::Outbound
        } else {
            CallDirection::Internal
        }
    }
}
