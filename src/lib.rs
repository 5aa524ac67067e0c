//! Call reconstruction from Asterisk-style CDR legs
//!
//! A PBX writes one CDR row per channel hop. A single phone call, once it has
//! rung a group, been forwarded to a mobile or been transferred, leaves
//! several such legs behind, all sharing a correlation id (`linkedid`). This
//! crate folds each correlation group back into one logical [`Call`]: who
//! called whom, for how long, with which outcome, and along which path.
//!
//! # Architecture
//!
//! - [`LegQuery`] / [`LegSource`]: select the raw legs (date window, numbers)
//! - [`BatchDriver`]: group legs by correlation id and build them in parallel
//! - [`CallBuilder`]: per-group state machine (click-to-call or standard)
//! - [`CallStatistics`]: report figures over the built calls
//!
//! Batch-scoped lookups (internal endpoints, reference numbers) live in an
//! [`AnalysisContext`] passed explicitly to the builder.
//!
//! # Example
//!
//! ```rust
//! use cdr_callflow::{AnalysisContext, BatchDriver, BatchOptions, CallDirection, LegRecord};
//!
//! let rows = r#"[{
//!     "calldate": "2025-05-01 08:30:00",
//!     "linkedid": "1714550000.0",
//!     "src": "0033199998888",
//!     "dst": "101",
//!     "channel": "PJSIP/trunk-orange-00000001",
//!     "dstchannel": "PJSIP/101-00000002",
//!     "disposition": "ANSWERED",
//!     "billsec": 42,
//!     "sequence": 1,
//!     "dcontext": "from-trunk",
//!     "lastapp": "Dial"
//! }]"#;
//!
//! let legs = LegRecord::from_json_array(rows)?;
//! let context = AnalysisContext::new(["101"], Vec::<String>::new());
//! let report = BatchDriver::new(&context, BatchOptions::default()).run(legs)?;
//!
//! let call = &report.calls[0];
//! assert_eq!(call.path, "0033199998888 --> 101 (ANSWERED)");
//! assert_eq!(call.direction, CallDirection::Inbound);
//! assert_eq!(call.duration, 42);
//! # Ok::<(), cdr_callflow::CdrError>(())
//! ```

pub mod batch;
pub mod builder;
pub mod call;
pub mod channel;
pub mod classify;
pub mod click_to_call;
pub mod directory;
pub mod duration;
pub mod error;
pub mod leg;
pub mod path;
pub mod query;
pub mod stats;
pub mod status;

pub(crate) mod constants;

pub use batch::{group_by_correlation, BatchDriver, BatchOptions, BatchReport, CancelHandle};
pub use builder::{AnalysisContext, BuildOutcome, CallBuilder, RejectReason};
pub use call::{Call, CallDirection};
pub use channel::decode_endpoint;
pub use classify::CallShape;
pub use click_to_call::ClickToCall;
pub use directory::Directory;
pub use duration::{resolve_duration, DurationPolicy};
pub use error::{CdrError, CdrResult};
pub use leg::{parse_calldate, DialContext, Disposition, LegRecord};
pub use path::{reconstruct, CallPath, PathState};
pub use query::{number_variants, JsonFileLegSource, LegQuery, LegSource, MemoryLegSource};
pub use stats::{format_duration, Breakdown, Breakdowns, CallStatistics};
pub use status::{resolve_status, StatusPolicy};
