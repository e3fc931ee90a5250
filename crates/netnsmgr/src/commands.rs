//! Command builders for namespace, route and firewall operations
//!
//! Commands addressed at a named namespace are wrapped in
//! `ip netns exec <name>`; host commands run directly.

use hostnet_common::config::ToolsConfig;
use hostnet_common::shell::Invocation;

use crate::types::{FirewallTable, Namespace, ValidatedFirewallRule, ValidatedRoute};

/// Build a command that runs `program args..` inside `namespace`
pub fn in_namespace(
    tools: &ToolsConfig,
    namespace: &Namespace,
    program: &str,
    args: Vec<String>,
) -> Invocation {
    match namespace {
        Namespace::Host => Invocation::argv(program, args),
        Namespace::Named(name) => {
            let mut wrapped = vec![
                "netns".to_string(),
                "exec".to_string(),
                name.clone(),
                program.to_string(),
            ];
            wrapped.extend(args);
            Invocation::argv(&tools.ip, wrapped)
        }
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

/// Build list namespaces command
pub fn build_list_namespaces_cmd(tools: &ToolsConfig) -> Invocation {
    Invocation::argv(&tools.ip, ["netns", "list"])
}

/// Build link listing command
pub fn build_list_links_cmd(tools: &ToolsConfig, namespace: &Namespace) -> Invocation {
    in_namespace(tools, namespace, &tools.ip, strings(&["link"]))
}

/// Build route listing command
pub fn build_list_routes_cmd(tools: &ToolsConfig, namespace: &Namespace) -> Invocation {
    in_namespace(tools, namespace, &tools.ip, strings(&["route", "show"]))
}

/// Build add route command
///
/// `ip route add <destination> [via <gateway>] [dev <device>]`
pub fn build_add_route_cmd(
    tools: &ToolsConfig,
    namespace: &Namespace,
    route: &ValidatedRoute<'_>,
) -> Invocation {
    let mut args = strings(&["route", "add", route.destination]);
    if let Some(gateway) = route.gateway {
        args.extend(strings(&["via", gateway]));
    }
    if let Some(device) = route.device {
        args.extend(strings(&["dev", device]));
    }
    in_namespace(tools, namespace, &tools.ip, args)
}

/// Build OVS bridge membership lookup
///
/// Runs in the host namespace, where the OVS database lives.
pub fn build_port_to_bridge_cmd(tools: &ToolsConfig, interface: &str) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["port-to-br", interface])
}

/// Build firewall listing command
pub fn build_list_rules_cmd(
    tools: &ToolsConfig,
    namespace: &Namespace,
    table: FirewallTable,
) -> Invocation {
    in_namespace(
        tools,
        namespace,
        &tools.iptables,
        strings(&["-t", table.as_str(), "-vnL", "--line-numbers"]),
    )
}

/// Build insert firewall rule command
///
/// `iptables -t <table> -I <chain> <priority> [-p ..] [-s ..] [-d ..] -j <target>`
pub fn build_insert_rule_cmd(
    tools: &ToolsConfig,
    namespace: &Namespace,
    rule: &ValidatedFirewallRule<'_>,
) -> Invocation {
    let mut args = strings(&["-t", rule.table.as_str(), "-I", rule.chain, rule.priority]);
    if let Some(protocol) = rule.protocol {
        args.extend(strings(&["-p", protocol]));
    }
    if let Some(source) = rule.source {
        args.extend(strings(&["-s", source]));
    }
    if let Some(destination) = rule.destination {
        args.extend(strings(&["-d", destination]));
    }
    args.extend(strings(&["-j", rule.target]));
    in_namespace(tools, namespace, &tools.iptables, args)
}

/// Build delete firewall rule command
pub fn build_delete_rule_cmd(
    tools: &ToolsConfig,
    namespace: &Namespace,
    table: FirewallTable,
    chain: &str,
    num: &str,
) -> Invocation {
    in_namespace(
        tools,
        namespace,
        &tools.iptables,
        strings(&["-t", table.as_str(), "-D", chain, num]),
    )
}
