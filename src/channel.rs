//! Endpoint extraction from vendor channel names.
//!
//! Asterisk names every channel `TECH/<resource>-<sequence>`, e.g.
//! `PJSIP/101-0000002a`, and same-box bridges `Local/<exten>@<context>-<id>;<n>`.
//! The endpoint identifier is the `<resource>` / `<exten>` part. A single
//! leading `9` is a ring-group pickup prefix and never part of the endpoint.

use crate::constants::{
    CHANNEL_LOCAL, CHANNEL_LOCAL_FORWARD, CHANNEL_TECHNOLOGIES, CHANNEL_TRUNK, RING_GROUP_PREFIX,
};

/// Extract the endpoint identifier embedded in a channel name.
///
/// Patterns are tried in order, first match wins:
/// 1. `PJSIP/<digits>-`, `SIP/<digits>-`, `IAX2/<digits>-`
/// 2. `Local/<id>@`
///
/// Returns `None` when nothing matches, or when the match is only the
/// ring-group prefix. Callers fall back to the leg's raw field.
pub fn decode_endpoint(channel: &str) -> Option<&str> {
    if channel.is_empty() {
        return None;
    }

    let captured = CHANNEL_TECHNOLOGIES
        .iter()
        .find_map(|tech| match_technology(channel, tech))
        .or_else(|| match_local(channel))?;

    let endpoint = captured
        .strip_prefix(RING_GROUP_PREFIX)
        .unwrap_or(captured);
    if endpoint.is_empty() {
        None
    } else {
        Some(endpoint)
    }
}

/// `<tech>/(\d+)-` anywhere in the channel name.
fn match_technology<'a>(channel: &'a str, tech: &str) -> Option<&'a str> {
    let prefix = format!("{}/", tech);
    channel
        .match_indices(prefix.as_str())
        .find_map(|(pos, _)| {
            let rest = &channel[pos + prefix.len()..];
            let digits = rest
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            if digits > 0 && rest[digits..].starts_with('-') {
                Some(&rest[..digits])
            } else {
                None
            }
        })
}

/// `Local/([^@]+)@` anywhere in the channel name.
fn match_local(channel: &str) -> Option<&str> {
    channel
        .match_indices(CHANNEL_LOCAL)
        .find_map(|(pos, _)| {
            let rest = &channel[pos + CHANNEL_LOCAL.len()..];
            match rest.find('@') {
                Some(at) if at > 0 => Some(&rest[..at]),
                _ => None,
            }
        })
}

/// Same-box bridge channel (`Local/...`).
pub fn is_local(channel: &str) -> bool {
    channel.contains(CHANNEL_LOCAL)
}

/// Forwarding bridge channel (`Local/0...`): the PBX dialing an external
/// number on behalf of an extension.
pub fn is_local_forward(channel: &str) -> bool {
    channel.contains(CHANNEL_LOCAL_FORWARD)
}

/// Carrier line channel.
pub fn is_trunk(channel: &str) -> bool {
    channel.contains(CHANNEL_TRUNK)
}
