//! Dialplan names, channel markers and formatting constants

/// Dialplan context of internal originations (and of forwarding bridges)
pub const CONTEXT_FROM_INTERNAL: &str = "from-internal";

/// Dialplan context of ring-group hunts
pub const CONTEXT_EXT_GROUP: &str = "ext-group";

/// Dialplan context of local extension delivery (internal transfers land here)
pub const CONTEXT_EXT_LOCAL: &str = "ext-local";

/// Dialplan context of follow-me checks
pub const CONTEXT_FOLLOWME_CHECK: &str = "followme-check";

/// Dialplan context of calls arriving from a trunk
pub const CONTEXT_FROM_TRUNK: &str = "from-trunk";

/// Dialplan context fragment marking the canonical click-to-call dial leg
pub const CONTEXT_MACRO_DIAL: &str = "macro-dial";

/// Same-box bridge channel prefix
pub const CHANNEL_LOCAL: &str = "Local/";

/// Forwarding bridge marker: a Local channel dialing an external `0...` number
pub const CHANNEL_LOCAL_FORWARD: &str = "Local/0";

/// Fragment present in channel names of carrier lines
pub const CHANNEL_TRUNK: &str = "trunk";

/// Technology prefixes whose channel names embed the endpoint digits
pub const CHANNEL_TECHNOLOGIES: &[&str] = &["PJSIP", "SIP", "IAX2"];

/// Ring-group pickup prefix stripped from decoded endpoints
pub const RING_GROUP_PREFIX: char = '9';

/// Caller-name phrase set by the PBX on click-to-call bridges ("press to dial")
pub const CLICK_TO_CALL_MARKER: &str = "Répondre pour appeler le";

/// Separator between hops of a reconstructed path
pub const PATH_SEPARATOR: &str = " --> ";

/// Suffix appended to the hop that answered
pub const ANSWERED_SUFFIX: &str = " (ANSWERED)";

/// Last application of legs that actually bridged somewhere
pub const LASTAPP_DIAL: &str = "Dial";

/// Accepted call date layouts, tried in order
pub const CALLDATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Accepted date-only layouts (midnight is assumed)
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// National trunk prefix used when normalizing reference numbers
pub const NATIONAL_PREFIX: &str = "0";

/// International prefix of the home country
pub const COUNTRY_PREFIX: &str = "+33";
