//! Namespace, interface, route and firewall types

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use hostnet_common::{validate, HostnetError, HostnetResult};

/// Name callers use for the host's root namespace
pub const HOST_NAMESPACE: &str = "default";

/// A network namespace: the host's root stack or a named one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Root namespace; commands run directly
    Host,
    /// Named namespace; commands run under `ip netns exec <name>`
    Named(String),
}

impl Namespace {
    /// Parse a caller-supplied name; `default` is the host namespace
    pub fn parse(name: &str) -> HostnetResult<Self> {
        if name == HOST_NAMESPACE {
            return Ok(Namespace::Host);
        }
        let name = validate::identifier("namespace", name)?;
        Ok(Namespace::Named(name.to_string()))
    }

    /// Name as callers spell it
    pub fn as_str(&self) -> &str {
        match self {
            Namespace::Host => HOST_NAMESPACE,
            Namespace::Named(name) => name,
        }
    }
}

impl FromStr for Namespace {
    type Err = HostnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::parse(s)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Diagnostic for an interface that no bridge claims
pub const NOT_AN_OVS_PORT: &str = "Not an OVS port";

/// Diagnostic for an interface whose bridge lookup could not run
pub const OVS_LOOKUP_ERROR: &str = "Error checking OVS";

/// A namespace interface joined with its OVS bridge membership
///
/// `ovs_bridge` is `None` exactly when `belongs_to` is a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceInfo {
    pub interface: String,
    pub ovs_bridge: Option<String>,
    pub belongs_to: String,
}

impl InterfaceInfo {
    pub fn on_bridge(interface: impl Into<String>, bridge: impl Into<String>) -> Self {
        let interface = interface.into();
        let bridge = bridge.into();
        Self {
            belongs_to: format!("{} belongs to {}", interface, bridge),
            interface,
            ovs_bridge: Some(bridge),
        }
    }

    pub fn not_ovs(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ovs_bridge: None,
            belongs_to: NOT_AN_OVS_PORT.to_string(),
        }
    }

    pub fn lookup_error(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ovs_bridge: None,
            belongs_to: OVS_LOOKUP_ERROR.to_string(),
        }
    }
}

/// Composite view of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceDetail {
    pub namespace: Namespace,
    pub interfaces: Vec<InterfaceInfo>,
    /// Normalized route lines, kept opaque
    pub routes: Vec<String>,
    /// Number of interfaces
    pub count: usize,
}

/// iptables table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallTable {
    #[default]
    Filter,
    Nat,
}

impl FirewallTable {
    /// Tables queried for a full rule set
    pub const ALL: [FirewallTable; 2] = [FirewallTable::Filter, FirewallTable::Nat];

    pub fn as_str(&self) -> &'static str {
        match self {
            FirewallTable::Filter => "filter",
            FirewallTable::Nat => "nat",
        }
    }
}

impl FromStr for FirewallTable {
    type Err = HostnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter" => Ok(FirewallTable::Filter),
            "nat" => Ok(FirewallTable::Nat),
            other => Err(HostnetError::validation(
                "table",
                format!("'{}' is not one of filter, nat", other),
            )),
        }
    }
}

impl fmt::Display for FirewallTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `iptables -vnL --line-numbers`
///
/// `num` is the 1-based position within `chain` at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallRule {
    pub chain: String,
    pub num: String,
    pub pkts: String,
    pub bytes: String,
    pub target: String,
    pub prot: String,
    pub opt: String,
    #[serde(rename = "in")]
    pub in_iface: String,
    #[serde(rename = "out")]
    pub out_iface: String,
    pub source: String,
    pub destination: String,
    /// Trailing match extensions, space separated
    pub options: String,
}

/// Rules of every table in a namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirewallRuleSet {
    pub filter: Vec<FirewallRule>,
    pub nat: Vec<FirewallRule>,
}

impl FirewallRuleSet {
    pub fn table(&self, table: FirewallTable) -> &[FirewallRule] {
        match table {
            FirewallTable::Filter => &self.filter,
            FirewallTable::Nat => &self.nat,
        }
    }

    pub fn table_mut(&mut self, table: FirewallTable) -> &mut Vec<FirewallRule> {
        match table {
            FirewallTable::Filter => &mut self.filter,
            FirewallTable::Nat => &mut self.nat,
        }
    }
}

/// Insert position used when a rule request names none
pub const DEFAULT_RULE_PRIORITY: &str = "1";

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn table_or_default(value: &Option<String>) -> HostnetResult<FirewallTable> {
    present(value)
        .map(FirewallTable::from_str)
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Request to insert a firewall rule
///
/// Optional fields treat an empty string as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFirewallRuleRequest {
    #[serde(default)]
    pub table: Option<String>,
    pub chain: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    pub target: String,
    /// Insert position within the chain
    #[serde(default)]
    pub priority: Option<String>,
}

/// [`AddFirewallRuleRequest`] after every field passed its grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFirewallRule<'a> {
    pub table: FirewallTable,
    pub chain: &'a str,
    pub protocol: Option<&'a str>,
    pub source: Option<&'a str>,
    pub destination: Option<&'a str>,
    pub target: &'a str,
    pub priority: &'a str,
}

impl AddFirewallRuleRequest {
    /// Create a request for `-j target` in `chain` of the filter table
    pub fn new(chain: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> HostnetResult<ValidatedFirewallRule<'_>> {
        let table = table_or_default(&self.table)?;
        let chain = validate::identifier("chain", &self.chain)?;
        let target = validate::identifier("target", &self.target)?;
        let protocol = present(&self.protocol)
            .map(|v| validate::identifier("protocol", v))
            .transpose()?;
        let source = present(&self.source)
            .map(|v| validate::address("source", v))
            .transpose()?;
        let destination = present(&self.destination)
            .map(|v| validate::address("destination", v))
            .transpose()?;
        let priority = match present(&self.priority) {
            Some(v) => validate::numeric("priority", v)?,
            None => DEFAULT_RULE_PRIORITY,
        };

        Ok(ValidatedFirewallRule {
            table,
            chain,
            protocol,
            source,
            destination,
            target,
            priority,
        })
    }
}

/// Request to delete rule `num` of `chain`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFirewallRuleRequest {
    #[serde(default)]
    pub table: Option<String>,
    pub chain: String,
    pub num: String,
}

impl DeleteFirewallRuleRequest {
    pub fn new(chain: impl Into<String>, num: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            num: num.into(),
            ..Default::default()
        }
    }

    /// Returns `(table, chain, num)` once every field passed its grammar
    pub fn validate(&self) -> HostnetResult<(FirewallTable, &str, &str)> {
        let table = table_or_default(&self.table)?;
        let chain = validate::identifier("chain", &self.chain)?;
        let num = validate::numeric("num", &self.num)?;
        Ok((table, chain, num))
    }
}

/// Request to add a route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRouteRequest {
    /// Prefix or `default`
    pub destination: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// [`AddRouteRequest`] after every field passed its grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRoute<'a> {
    pub destination: &'a str,
    pub gateway: Option<&'a str>,
    pub device: Option<&'a str>,
}

impl AddRouteRequest {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Default::default()
        }
    }

    /// Route via a next hop (builder pattern)
    pub fn via(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Some(gateway.into());
        self
    }

    /// Route out of a device (builder pattern)
    pub fn dev(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn validate(&self) -> HostnetResult<ValidatedRoute<'_>> {
        let destination = validate::address("destination", &self.destination)?;
        let gateway = present(&self.gateway)
            .map(|v| validate::address("gateway", v))
            .transpose()?;
        let device = present(&self.device)
            .map(|v| validate::identifier("device", v))
            .transpose()?;
        Ok(ValidatedRoute {
            destination,
            gateway,
            device,
        })
    }
}
