//! `hostnetctl` command line

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use hostnet_common::config::DEFAULT_CONFIG_PATH;
use hostnet_common::{HostnetConfig, HostnetError};
use hostnet_netnsmgr::{AddFirewallRuleRequest, AddRouteRequest, DeleteFirewallRuleRequest};
use hostnet_ovsmgr::{AddPortKind, AddPortRequest};

use crate::Facade;

/// Inspect and change OVS, namespaces, routes and iptables rules
#[derive(Parser, Debug)]
#[command(name = "hostnetctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, env = "HOSTNET_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open vSwitch bridges, ports and flows
    #[command(subcommand)]
    Bridges(BridgeCommand),

    /// OVS installation and daemon status
    Status,

    /// Raw `ovs-vsctl show`
    Summary,

    /// Network namespaces
    #[command(subcommand)]
    Netns(NetnsCommand),

    /// iptables rules
    #[command(subcommand)]
    Firewall(FirewallCommand),

    /// Routing tables
    #[command(subcommand)]
    Routes(RouteCommand),
}

#[derive(Subcommand, Debug)]
pub enum BridgeCommand {
    /// List bridges
    List,
    /// Create a bridge
    Create { name: String },
    /// Delete a bridge
    Delete { name: String },
    /// Ports of a bridge with VLAN tags and VXLAN options
    Show { name: String },
    /// Port names of a bridge
    Ports { bridge: String },
    /// OpenFlow rules of a bridge
    Flows {
        bridge: String,
        /// Print the unparsed dump
        #[arg(long)]
        raw: bool,
    },
    /// Attach a port
    AddPort(AddPortArgs),
    /// Detach a port
    DelPort { bridge: String, port: String },
}

#[derive(Args, Debug)]
pub struct AddPortArgs {
    pub bridge: String,
    pub port: String,
    /// normal or vxlan
    #[arg(long = "type", default_value = "normal")]
    pub kind: String,
    /// Access VLAN tag
    #[arg(long)]
    pub vlan: Option<String>,
    /// VXLAN remote endpoint
    #[arg(long)]
    pub remote_ip: Option<String>,
    /// VXLAN key
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum NetnsCommand {
    /// List named namespaces
    List,
    /// Interfaces, OVS membership and routes of a namespace (`default` for the host)
    Show { namespace: String },
}

#[derive(Subcommand, Debug)]
pub enum FirewallCommand {
    /// List rules; both tables unless --table is given
    List {
        namespace: String,
        #[arg(long)]
        table: Option<String>,
    },
    /// Insert a rule
    Add {
        namespace: String,
        #[arg(long)]
        chain: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        table: Option<String>,
        #[arg(long)]
        protocol: Option<String>,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        destination: Option<String>,
        /// Insert position
        #[arg(long)]
        priority: Option<String>,
    },
    /// Delete a rule by number
    Delete {
        namespace: String,
        #[arg(long)]
        chain: String,
        #[arg(long)]
        num: String,
        #[arg(long)]
        table: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RouteCommand {
    /// List routes
    List { namespace: String },
    /// Add a route
    Add {
        namespace: String,
        destination: String,
        #[arg(long)]
        via: Option<String>,
        #[arg(long)]
        dev: Option<String>,
    },
}

/// Load the configuration named on the command line
pub fn load_config(path: &Path) -> Result<HostnetConfig> {
    HostnetConfig::load_or_default(path).with_context(|| format!("loading {}", path.display()))
}

/// JSON body printed for a failed command
///
/// `kind` comes from the underlying [`HostnetError`], or `internal` when
/// the failure did not originate in hostnet.
pub fn error_body(err: &anyhow::Error) -> Value {
    let kind = err
        .downcast_ref::<HostnetError>()
        .map(HostnetError::kind)
        .unwrap_or("internal");
    json!({ "error": format!("{:#}", err), "kind": kind })
}

/// Run one command and return its JSON result
pub async fn dispatch(facade: &Facade, command: Command) -> Result<Value> {
    let value = match command {
        Command::Bridges(cmd) => bridges(facade, cmd).await?,
        Command::Status => serde_json::to_value(facade.system_status().await)?,
        Command::Summary => json!({ "summary": facade.ovs_summary().await? }),
        Command::Netns(NetnsCommand::List) => {
            json!({ "namespaces": facade.list_namespaces().await? })
        }
        Command::Netns(NetnsCommand::Show { namespace }) => {
            serde_json::to_value(facade.namespace_detail(&namespace).await?)?
        }
        Command::Firewall(cmd) => firewall(facade, cmd).await?,
        Command::Routes(RouteCommand::List { namespace }) => {
            json!({ "routes": facade.list_routes(&namespace).await? })
        }
        Command::Routes(RouteCommand::Add {
            namespace,
            destination,
            via,
            dev,
        }) => {
            let request = AddRouteRequest {
                destination,
                gateway: via,
                device: dev,
            };
            serde_json::to_value(facade.add_route(&namespace, &request).await?)?
        }
    };
    Ok(value)
}

async fn bridges(facade: &Facade, cmd: BridgeCommand) -> Result<Value> {
    let value = match cmd {
        BridgeCommand::List => json!({ "bridges": facade.list_bridges().await? }),
        BridgeCommand::Create { name } => serde_json::to_value(facade.create_bridge(&name).await?)?,
        BridgeCommand::Delete { name } => serde_json::to_value(facade.delete_bridge(&name).await?)?,
        BridgeCommand::Show { name } => serde_json::to_value(facade.bridge_detail(&name).await?)?,
        BridgeCommand::Ports { bridge } => json!({ "ports": facade.list_ports(&bridge).await? }),
        BridgeCommand::Flows { bridge, raw: true } => {
            json!({ "flows": facade.dump_flows(&bridge).await? })
        }
        BridgeCommand::Flows { bridge, raw: false } => {
            json!({ "flows": facade.flow_entries(&bridge).await? })
        }
        BridgeCommand::AddPort(args) => {
            let request = AddPortRequest {
                bridge: args.bridge,
                port: args.port,
                kind: args.kind.parse::<AddPortKind>()?,
                vlan: args.vlan,
                remote_ip: args.remote_ip,
                key: args.key,
            };
            serde_json::to_value(facade.add_port(&request).await?)?
        }
        BridgeCommand::DelPort { bridge, port } => {
            serde_json::to_value(facade.delete_port(&bridge, &port).await?)?
        }
    };
    Ok(value)
}

async fn firewall(facade: &Facade, cmd: FirewallCommand) -> Result<Value> {
    let value = match cmd {
        FirewallCommand::List {
            namespace,
            table: Some(table),
        } => {
            let rules = facade.list_firewall_rules(&namespace, &table).await?;
            json!({ "table": table, "rules": rules })
        }
        FirewallCommand::List {
            namespace,
            table: None,
        } => serde_json::to_value(facade.firewall_rule_set(&namespace).await?)?,
        FirewallCommand::Add {
            namespace,
            chain,
            target,
            table,
            protocol,
            source,
            destination,
            priority,
        } => {
            let request = AddFirewallRuleRequest {
                table,
                chain,
                protocol,
                source,
                destination,
                target,
                priority,
            };
            serde_json::to_value(facade.add_firewall_rule(&namespace, &request).await?)?
        }
        FirewallCommand::Delete {
            namespace,
            chain,
            num,
            table,
        } => {
            let request = DeleteFirewallRuleRequest { table, chain, num };
            serde_json::to_value(facade.delete_firewall_rule(&namespace, &request).await?)?
        }
    };
    Ok(value)
}
