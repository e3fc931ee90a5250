//! Command builders for OVS operations
//!
//! Builders take already-validated values and never touch a shell, except
//! [`build_vxlan_options_cmd`], which filters an interface record.

use hostnet_common::config::ToolsConfig;
use hostnet_common::shell::{shellquote, Invocation};

use crate::types::{AddPortKind, ValidatedPort};

/// Build list bridges command
pub fn build_list_bridges_cmd(tools: &ToolsConfig) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["list-br"])
}

/// Build create bridge command
pub fn build_add_bridge_cmd(tools: &ToolsConfig, bridge: &str) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["add-br", bridge])
}

/// Build delete bridge command
pub fn build_del_bridge_cmd(tools: &ToolsConfig, bridge: &str) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["del-br", bridge])
}

/// Build list ports command
pub fn build_list_ports_cmd(tools: &ToolsConfig, bridge: &str) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["list-ports", bridge])
}

/// Build add port command
///
/// `ovs-vsctl add-port <br> <port> [tag=<vlan>]`, followed for VXLAN ports
/// by `-- set interface <port> type=vxlan [options:remote_ip=..] [options:key=..]`.
pub fn build_add_port_cmd(tools: &ToolsConfig, port: &ValidatedPort<'_>) -> Invocation {
    let mut args = vec![
        "add-port".to_string(),
        port.bridge.to_string(),
        port.port.to_string(),
    ];

    if let Some(vlan) = port.vlan {
        args.push(format!("tag={}", vlan));
    }

    if port.kind == AddPortKind::Vxlan {
        args.extend([
            "--".to_string(),
            "set".to_string(),
            "interface".to_string(),
            port.port.to_string(),
            "type=vxlan".to_string(),
        ]);
        if let Some(remote_ip) = port.remote_ip {
            args.push(format!("options:remote_ip={}", remote_ip));
        }
        if let Some(key) = port.key {
            args.push(format!("options:key={}", key));
        }
    }

    Invocation::argv(&tools.ovs_vsctl, args)
}

/// Build delete port command
pub fn build_del_port_cmd(tools: &ToolsConfig, bridge: &str, port: &str) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["del-port", bridge, port])
}

/// Build port tag lookup command
pub fn build_get_port_tag_cmd(tools: &ToolsConfig, port: &str) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["get", "Port", port, "tag"])
}

/// Build interface type lookup command
pub fn build_get_interface_type_cmd(tools: &ToolsConfig, port: &str) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["get", "Interface", port, "type"])
}

/// Build VXLAN options lookup command
///
/// Pipes the interface record through a filter; the port name is quoted.
pub fn build_vxlan_options_cmd(tools: &ToolsConfig, port: &str) -> Invocation {
    Invocation::shell(format!(
        "{} list Interface {} | {} options",
        tools.ovs_vsctl,
        shellquote(port),
        tools.grep
    ))
}

/// Build dump flows command
pub fn build_dump_flows_cmd(tools: &ToolsConfig, bridge: &str) -> Invocation {
    Invocation::argv(&tools.ovs_ofctl, ["dump-flows", bridge])
}

/// Build OVS summary command
pub fn build_show_cmd(tools: &ToolsConfig) -> Invocation {
    Invocation::argv(&tools.ovs_vsctl, ["show"])
}

/// Build OVS installation probe
pub fn build_which_vsctl_cmd(tools: &ToolsConfig) -> Invocation {
    Invocation::argv(&tools.which, [tools.ovs_vsctl.as_str()])
}
