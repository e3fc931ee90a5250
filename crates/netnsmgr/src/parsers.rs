//! Parsers for `ip` and `iptables` output
//!
//! All parsers are total; unrecognized lines are dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{FirewallRule, HOST_NAMESPACE};

/// Minimum whitespace-separated fields in a firewall rule row
const RULE_FIELDS: usize = 10;

/// Loopback interface, never reported
const LOOPBACK: &str = "lo";

static INTERFACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+):\s+([^:]+):").expect("Invalid regex pattern"));

/// Route noise, removed in this order
static ROUTE_NOISE_RES: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"\s+proto\s+\w+").expect("Invalid regex pattern"),
        Regex::new(r"\s+kernel").expect("Invalid regex pattern"),
        Regex::new(r"\s+link").expect("Invalid regex pattern"),
        Regex::new(r"\s+scope\s+\w+").expect("Invalid regex pattern"),
    ]
});

/// Parse `ip netns list`: first token of each line
///
/// A namespace literally named `default` is dropped, since that name
/// addresses the host namespace.
pub fn parse_namespace_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|name| {
            if *name == HOST_NAMESPACE {
                tracing::warn!("Ignoring namespace named '{}'", HOST_NAMESPACE);
                return false;
            }
            true
        })
        .map(str::to_string)
        .collect()
}

/// Parse `ip link`: names of non-loopback interfaces
///
/// Only header lines count (they carry `mtu`); `link/...` detail lines are
/// skipped.
pub fn parse_interfaces(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains("mtu") && !line.contains("link"))
        .filter_map(|line| INTERFACE_RE.captures(line))
        .map(|caps| caps[2].trim().to_string())
        .filter(|name| name != LOOPBACK)
        .collect()
}

/// Strip protocol, kernel, link and scope noise from one route line
pub fn normalize_route(line: &str) -> String {
    let mut route = line.to_string();
    for re in ROUTE_NOISE_RES.iter() {
        route = re.replace_all(&route, "").into_owned();
    }
    route.trim().to_string()
}

/// Parse `ip route show` into normalized, opaque route strings
pub fn parse_routes(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(normalize_route)
        .collect()
}

/// Parse one table of `iptables -vnL --line-numbers`
///
/// `Chain <name> ...` lines open a block; rows are attributed to the most
/// recent block. Rows with fewer than ten fields, and rows before the first
/// block, are dropped.
pub fn parse_firewall_rules(output: &str) -> Vec<FirewallRule> {
    let mut rules = Vec::new();
    let mut chain: Option<&str> = None;

    for line in output.lines() {
        if line.starts_with("Chain") {
            chain = line.split_whitespace().nth(1);
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("num") {
            continue;
        }

        let Some(chain) = chain else {
            continue;
        };

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < RULE_FIELDS {
            continue;
        }

        rules.push(FirewallRule {
            chain: chain.to_string(),
            num: fields[0].to_string(),
            pkts: fields[1].to_string(),
            bytes: fields[2].to_string(),
            target: fields[3].to_string(),
            prot: fields[4].to_string(),
            opt: fields[5].to_string(),
            in_iface: fields[6].to_string(),
            out_iface: fields[7].to_string(),
            source: fields[8].to_string(),
            destination: fields[9].to_string(),
            options: fields[RULE_FIELDS..].join(" "),
        });
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostnet_test::{iptables_fixtures, ip_fixtures};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_namespace_list() {
        assert_eq!(
            parse_namespace_list(ip_fixtures::NETNS_LIST),
            vec!["blue", "red", "green"]
        );
        assert!(parse_namespace_list("").is_empty());
        assert_eq!(parse_namespace_list("default\nblue\n"), vec!["blue"]);
    }

    #[test]
    fn test_parse_interfaces() {
        assert_eq!(
            parse_interfaces(ip_fixtures::LINK_HOST),
            vec!["eth0", "eth1", "ovs-system"]
        );
        assert_eq!(parse_interfaces(ip_fixtures::LINK_BLUE), vec!["tap-web"]);
        assert!(parse_interfaces("garbage\n").is_empty());
    }

    #[test]
    fn test_parse_interfaces_veth_peer_suffix() {
        let output = "7: veth-blue@if6: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc noqueue state UP mode DEFAULT group default qlen 1000";
        assert_eq!(parse_interfaces(output), vec!["veth-blue@if6"]);
    }

    #[test]
    fn test_parse_routes() {
        assert_eq!(
            parse_routes(ip_fixtures::ROUTE_HOST),
            vec![
                "default via 192.168.1.1 dev eth0 metric 100",
                "10.0.0.0/8 dev br-int 10.0.0.1",
                "192.168.1.0/24 dev eth0 192.168.1.20 metric 100",
            ]
        );
        assert!(parse_routes("\n  \n").is_empty());
    }

    #[test]
    fn test_normalize_route_order() {
        // `link` goes first, so `scope` then takes the following word with it
        assert_eq!(
            normalize_route("10.20.0.0/24 dev tap-web proto kernel scope link src 10.20.0.5"),
            "10.20.0.0/24 dev tap-web 10.20.0.5"
        );
        assert_eq!(
            normalize_route("10.1.0.0/16 via 10.20.0.1 dev tap-web scope global"),
            "10.1.0.0/16 via 10.20.0.1 dev tap-web"
        );
    }

    #[test]
    fn test_parse_firewall_rules_attributes_chains() {
        let rules = parse_firewall_rules(iptables_fixtures::FILTER);
        assert_eq!(rules.len(), 3);

        assert_eq!(rules[0].chain, "INPUT");
        assert_eq!(rules[0].num, "1");
        assert_eq!(rules[0].target, "ACCEPT");
        assert_eq!(rules[0].in_iface, "lo");
        assert_eq!(rules[0].options, "");

        assert_eq!(rules[1].chain, "INPUT");
        assert_eq!(rules[1].source, "10.9.0.0/16");
        assert_eq!(rules[1].options, "tcp dpt:22");

        assert_eq!(rules[2].chain, "FORWARD");
        assert_eq!(rules[2].num, "1");
        assert_eq!(rules[2].options, "ctstate RELATED,ESTABLISHED");

        assert!(rules.iter().all(|r| r.num != "num"));
    }

    #[test]
    fn test_parse_firewall_rules_nat() {
        let rules = parse_firewall_rules(iptables_fixtures::NAT);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].chain, "POSTROUTING");
        assert_eq!(rules[0].target, "MASQUERADE");
        assert_eq!(rules[0].out_iface, "eth0");
    }

    #[test]
    fn test_parse_firewall_rules_degrades() {
        // rows before any chain and short rows are dropped
        let output = "1 0 0 ACCEPT all -- * * 0.0.0.0/0 0.0.0.0/0\nChain INPUT (policy ACCEPT)\n1 0 0 ACCEPT\n";
        assert!(parse_firewall_rules(output).is_empty());
        assert!(parse_firewall_rules("").is_empty());
    }
}
