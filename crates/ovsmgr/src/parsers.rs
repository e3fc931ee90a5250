//! Parsers for `ovs-vsctl` and `ovs-ofctl` output
//!
//! Every function here is total: unrecognised input degrades to an empty or
//! default value instead of an error.

use once_cell::sync::Lazy;
use regex::Regex;

use hostnet_common::validate::MAX_VLAN_ID;

use crate::types::{FlowEntry, VlanTag, VxlanOptions};

/// Separator between the match part and the actions of a flow
pub const ACTIONS_SEPARATOR: &str = " actions=";

/// Rendered when a flow has no match fields
pub const MATCH_ANY: &str = "Any";

/// Rendered when a flow has no priority field
pub const PRIORITY_UNKNOWN: &str = "?";

/// Flow fields that are statistics rather than match criteria
const FLOW_STAT_FIELDS: [&str; 6] = [
    "cookie",
    "duration",
    "table",
    "n_packets",
    "n_bytes",
    "priority",
];

/// Summary header lines printed before the flows
const FLOW_HEADERS: [&str; 2] = ["NXST_FLOW", "OFPST_FLOW"];

static PRIORITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"priority=(\d+)").expect("Invalid regex pattern"));

static OPTIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"options\s*:?\s*\{([^}]*)\}").expect("Invalid regex pattern"));

/// Parse one-name-per-line output (`list-br`, `list-ports`), dropping blanks
pub fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `ovs-vsctl get Port <port> tag`
///
/// `[]` or empty means no tag; anything that is not an ID in 0-4094 also
/// degrades to [`VlanTag::Default`].
pub fn parse_vlan_tag(output: &str) -> VlanTag {
    let tag = output.trim();
    if tag.is_empty() || tag == "[]" {
        return VlanTag::Default;
    }
    match tag.parse::<u16>() {
        Ok(id) if id <= MAX_VLAN_ID => VlanTag::Id(id),
        _ => VlanTag::Default,
    }
}

/// Returns true if `ovs-vsctl get Interface <port> type` names a VXLAN port
pub fn is_vxlan_type(output: &str) -> bool {
    output.trim().trim_matches('"') == "vxlan"
}

/// Parse the `options : {key=value, ...}` line of an interface record
///
/// Values lose surrounding quotes; pairs without `=` or without a key are
/// skipped. A missing or malformed fragment yields empty options.
pub fn parse_vxlan_options(output: &str) -> VxlanOptions {
    let mut options = VxlanOptions::new();

    let Some(caps) = OPTIONS_RE.captures(output) else {
        return options;
    };

    for pair in caps[1].split(',') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        options.insert(key, value.trim().trim_matches('"'));
    }

    options
}

/// Parse one `dump-flows` line; `None` if it has no actions separator
pub fn parse_flow_line(line: &str) -> Option<FlowEntry> {
    let (meta, actions) = line.trim().split_once(ACTIONS_SEPARATOR)?;

    let priority = PRIORITY_RE
        .captures(meta)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| PRIORITY_UNKNOWN.to_string());

    let match_fields: Vec<&str> = meta
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .filter(|field| {
            let name = field.split('=').next().unwrap_or(field);
            !FLOW_STAT_FIELDS.contains(&name)
        })
        .collect();

    let match_fields = if match_fields.is_empty() {
        MATCH_ANY.to_string()
    } else {
        match_fields.join(", ")
    };

    Some(FlowEntry {
        priority,
        match_fields,
        actions: actions.trim().to_string(),
    })
}

/// Parse `ovs-ofctl dump-flows <bridge>`
pub fn parse_flows(output: &str) -> Vec<FlowEntry> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| {
            let line = line.trim_start();
            !FLOW_HEADERS.iter().any(|header| line.starts_with(header))
        })
        .filter_map(parse_flow_line)
        .collect()
}
