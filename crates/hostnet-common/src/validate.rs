//! Input grammars for tokens interpolated into external commands.
//!
//! Argv invocations already keep arguments away from a shell, but the same
//! checks run on every externally supplied token regardless of how the
//! command is executed. A value that fails a grammar never reaches the
//! executor.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HostnetError, HostnetResult};

/// Highest assignable 802.1Q VLAN ID.
pub const MAX_VLAN_ID: u16 = 4094;

/// Names: bridges, ports, namespaces, chains, targets, VXLAN keys, remote IPs.
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._:-]+$").expect("Invalid regex pattern"));

/// VLAN tags, rule numbers, insert positions.
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("Invalid regex pattern"));

/// Addresses and prefixes in CIDR notation.
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._:/-]+$").expect("Invalid regex pattern"));

/// Returns true if `input` is a non-empty string over `[A-Za-z0-9._:-]`.
pub fn is_identifier(input: &str) -> bool {
    IDENTIFIER_RE.is_match(input)
}

/// Returns true if `input` is a non-empty string of ASCII digits.
pub fn is_numeric(input: &str) -> bool {
    NUMERIC_RE.is_match(input)
}

/// Returns true if `input` is an address or prefix that cannot be mistaken
/// for a command-line flag.
pub fn is_address(input: &str) -> bool {
    ADDRESS_RE.is_match(input) && !input.starts_with('-')
}

/// Checks `value` against the identifier grammar.
pub fn identifier<'a>(field: &str, value: &'a str) -> HostnetResult<&'a str> {
    if value.is_empty() {
        return Err(HostnetError::validation(field, "value is required"));
    }
    if !is_identifier(value) {
        return Err(HostnetError::validation(
            field,
            format!("'{}' contains characters outside [A-Za-z0-9._:-]", value),
        ));
    }
    Ok(value)
}

/// Checks `value` against the digits-only grammar.
pub fn numeric<'a>(field: &str, value: &'a str) -> HostnetResult<&'a str> {
    if !is_numeric(value) {
        return Err(HostnetError::validation(
            field,
            format!("'{}' must be a non-empty string of digits", value),
        ));
    }
    Ok(value)
}

/// Checks `value` against the address grammar.
pub fn address<'a>(field: &str, value: &'a str) -> HostnetResult<&'a str> {
    if !is_address(value) {
        return Err(HostnetError::validation(
            field,
            format!("'{}' is not a valid address or prefix", value),
        ));
    }
    Ok(value)
}

/// Parses a VLAN tag: digits only, at most [`MAX_VLAN_ID`].
pub fn vlan_tag(value: &str) -> HostnetResult<u16> {
    numeric("vlan", value)?;
    match value.parse::<u16>() {
        Ok(tag) if tag <= MAX_VLAN_ID => Ok(tag),
        _ => Err(HostnetError::validation(
            "vlan",
            format!("'{}' is outside 0-{}", value, MAX_VLAN_ID),
        )),
    }
}
