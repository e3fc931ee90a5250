//! Type definitions for ovsmgr
//!
//! Every type here is a transient view rebuilt from tool output on each call.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;

use hostnet_common::{validate, HostnetError, HostnetResult};

/// VLAN tag of a bridge port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VlanTag {
    /// No access tag configured (`[]` in OVSDB)
    #[default]
    Default,
    /// Access VLAN 0-4094
    Id(u16),
}

impl VlanTag {
    /// Returns true if no tag is configured
    pub fn is_default(&self) -> bool {
        matches!(self, VlanTag::Default)
    }
}

impl Serialize for VlanTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VlanTag::Default => serializer.serialize_str("default"),
            VlanTag::Id(id) => serializer.serialize_u16(*id),
        }
    }
}

/// Derived role of a bridge port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortKind {
    #[serde(rename = "vxlan")]
    Vxlan,
    #[serde(rename = "access")]
    Access,
    #[serde(rename = "trunk/normal")]
    TrunkNormal,
}

impl PortKind {
    /// VXLAN membership wins, then an access tag, otherwise trunk/normal.
    pub fn derive(tag: VlanTag, is_vxlan: bool) -> Self {
        if is_vxlan {
            PortKind::Vxlan
        } else if !tag.is_default() {
            PortKind::Access
        } else {
            PortKind::TrunkNormal
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            PortKind::Vxlan => "vxlan",
            PortKind::Access => "access",
            PortKind::TrunkNormal => "trunk/normal",
        }
    }
}

/// Interface options of a VXLAN port (`options:` column).
///
/// Unknown keys are preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VxlanOptions(BTreeMap<String, String>);

impl VxlanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Remote tunnel endpoint
    pub fn remote_ip(&self) -> Option<&str> {
        self.get("remote_ip")
    }

    /// Virtual network identifier
    pub fn key(&self) -> Option<&str> {
        self.get("key")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A bridge-attached interface joined with its tag and VXLAN options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    pub name: String,
    pub vlan: VlanTag,
    #[serde(rename = "type")]
    pub kind: PortKind,
    /// Present exactly when `kind` is [`PortKind::Vxlan`]
    pub vxlan: Option<VxlanOptions>,
}

impl Port {
    /// Join a port name with its lookups, deriving the kind
    pub fn new(name: impl Into<String>, vlan: VlanTag, vxlan: Option<VxlanOptions>) -> Self {
        Self {
            name: name.into(),
            vlan,
            kind: PortKind::derive(vlan, vxlan.is_some()),
            vxlan,
        }
    }
}

/// Composite view of one bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDetail {
    pub bridge: String,
    pub ports: Vec<Port>,
}

/// One OpenFlow rule from `ovs-ofctl dump-flows`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowEntry {
    /// Numeric priority, or `?` when absent
    pub priority: String,
    /// Match fields joined with `, `, or `Any`
    #[serde(rename = "match")]
    pub match_fields: String,
    /// Raw action list
    pub actions: String,
}

/// Kind of port to add
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddPortKind {
    #[default]
    Normal,
    Vxlan,
}

impl FromStr for AddPortKind {
    type Err = HostnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(AddPortKind::Normal),
            "vxlan" => Ok(AddPortKind::Vxlan),
            other => Err(HostnetError::validation(
                "type",
                format!("'{}' is not one of normal, vxlan", other),
            )),
        }
    }
}

/// Request to attach a port to a bridge.
///
/// Optional fields treat an empty string as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPortRequest {
    pub bridge: String,
    pub port: String,
    #[serde(default, rename = "type")]
    pub kind: AddPortKind,
    #[serde(default)]
    pub vlan: Option<String>,
    #[serde(default)]
    pub remote_ip: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// [`AddPortRequest`] after every field passed its grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPort<'a> {
    pub bridge: &'a str,
    pub port: &'a str,
    pub kind: AddPortKind,
    pub vlan: Option<u16>,
    pub remote_ip: Option<&'a str>,
    pub key: Option<&'a str>,
}

impl AddPortRequest {
    /// Create a normal port request
    pub fn new(bridge: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            port: port.into(),
            ..Default::default()
        }
    }

    /// Set the access VLAN (builder pattern)
    pub fn with_vlan(mut self, vlan: impl Into<String>) -> Self {
        self.vlan = Some(vlan.into());
        self
    }

    /// Make this a VXLAN port (builder pattern)
    pub fn with_vxlan(mut self, remote_ip: Option<String>, key: Option<String>) -> Self {
        self.kind = AddPortKind::Vxlan;
        self.remote_ip = remote_ip;
        self.key = key;
        self
    }

    /// Check every field before any command is built
    pub fn validate(&self) -> HostnetResult<ValidatedPort<'_>> {
        let bridge = validate::identifier("bridge", &self.bridge)?;
        let port = validate::identifier("port", &self.port)?;
        let vlan = present(&self.vlan).map(validate::vlan_tag).transpose()?;
        let remote_ip = present(&self.remote_ip)
            .map(|v| validate::identifier("remote_ip", v))
            .transpose()?;
        let key = present(&self.key)
            .map(|v| validate::identifier("key", v))
            .transpose()?;

        Ok(ValidatedPort {
            bridge,
            port,
            kind: self.kind,
            vlan,
            remote_ip,
            key,
        })
    }
}

/// Outcome of the two-step OVS probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    NotInstalled,
    InstalledNotRunning,
    Operational,
}

impl SystemStatus {
    pub fn installed(&self) -> bool {
        !matches!(self, SystemStatus::NotInstalled)
    }

    pub fn running(&self) -> bool {
        matches!(self, SystemStatus::Operational)
    }

    pub fn message(&self) -> &'static str {
        match self {
            SystemStatus::NotInstalled => "Open vSwitch is not installed",
            SystemStatus::InstalledNotRunning => {
                "OVS is installed but not running or permission denied"
            }
            SystemStatus::Operational => "OVS is operational",
        }
    }

    /// Health descriptor handed to callers
    pub fn descriptor(&self) -> StatusDescriptor {
        StatusDescriptor {
            state: *self,
            installed: self.installed(),
            running: self.running(),
            message: self.message().to_string(),
        }
    }
}

/// Tri-state health descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDescriptor {
    pub state: SystemStatus,
    pub installed: bool,
    pub running: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_kind_derivation() {
        assert_eq!(PortKind::derive(VlanTag::Default, true), PortKind::Vxlan);
        assert_eq!(PortKind::derive(VlanTag::Id(10), true), PortKind::Vxlan);
        assert_eq!(PortKind::derive(VlanTag::Id(10), false), PortKind::Access);
        assert_eq!(PortKind::derive(VlanTag::Id(0), false), PortKind::Access);
        assert_eq!(
            PortKind::derive(VlanTag::Default, false),
            PortKind::TrunkNormal
        );
    }

    #[test]
    fn test_port_serialization() {
        let mut options = VxlanOptions::new();
        options.insert("remote_ip", "10.0.0.2");
        options.insert("key", "100");

        let vx = Port::new("vxlan0", VlanTag::Default, Some(options));
        assert_eq!(
            serde_json::to_value(&vx).unwrap(),
            json!({
                "name": "vxlan0",
                "vlan": "default",
                "type": "vxlan",
                "vxlan": {"key": "100", "remote_ip": "10.0.0.2"}
            })
        );

        let access = Port::new("eth1", VlanTag::Id(42), None);
        assert_eq!(
            serde_json::to_value(&access).unwrap(),
            json!({"name": "eth1", "vlan": 42, "type": "access", "vxlan": null})
        );
    }

    #[test]
    fn test_vxlan_options_accessors() {
        let mut options = VxlanOptions::new();
        assert!(options.is_empty());
        options.insert("remote_ip", "192.168.50.2");
        options.insert("dst_port", "4790");
        assert_eq!(options.remote_ip(), Some("192.168.50.2"));
        assert_eq!(options.key(), None);
        assert_eq!(options.get("dst_port"), Some("4790"));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_add_port_kind_from_str() {
        assert_eq!("normal".parse::<AddPortKind>().unwrap(), AddPortKind::Normal);
        assert_eq!("vxlan".parse::<AddPortKind>().unwrap(), AddPortKind::Vxlan);
        assert!("gre".parse::<AddPortKind>().unwrap_err().is_validation());
    }

    #[test]
    fn test_add_port_request_validate() {
        let req = AddPortRequest::new("br0", "eth1").with_vlan("100");
        let v = req.validate().unwrap();
        assert_eq!(v.vlan, Some(100));
        assert_eq!(v.kind, AddPortKind::Normal);

        let req = AddPortRequest::new("br0", "vx0")
            .with_vxlan(Some("10.0.0.2".to_string()), Some(String::new()));
        let v = req.validate().unwrap();
        assert_eq!(v.remote_ip, Some("10.0.0.2"));
        assert_eq!(v.key, None);
    }

    #[test]
    fn test_add_port_request_rejects() {
        assert!(AddPortRequest::new("", "eth1").validate().is_err());
        assert!(AddPortRequest::new("br0", "").validate().is_err());
        assert!(AddPortRequest::new("br0", "eth1;reboot").validate().is_err());
        assert!(AddPortRequest::new("br0", "eth1")
            .with_vlan("10a")
            .validate()
            .is_err());
        assert!(AddPortRequest::new("br0", "vx0")
            .with_vxlan(Some("10.0.0.2 ; id".to_string()), None)
            .validate()
            .is_err());
        assert!(AddPortRequest::new("br0", "vx0")
            .with_vxlan(None, Some("$(id)".to_string()))
            .validate()
            .is_err());
    }

    #[test]
    fn test_add_port_request_deserialize() {
        let req: AddPortRequest = serde_json::from_value(json!({
            "bridge": "br0",
            "port": "vx0",
            "type": "vxlan",
            "remoteIp": "10.0.0.2",
            "key": "5001"
        }))
        .unwrap();
        assert_eq!(req.kind, AddPortKind::Vxlan);
        assert_eq!(req.remote_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(req.vlan, None);
    }

    #[test]
    fn test_system_status_descriptor() {
        let d = SystemStatus::NotInstalled.descriptor();
        assert!(!d.installed && !d.running);
        let d = SystemStatus::InstalledNotRunning.descriptor();
        assert!(d.installed && !d.running);
        let d = SystemStatus::Operational.descriptor();
        assert!(d.installed && d.running);
        assert_eq!(
            serde_json::to_value(&d).unwrap()["state"],
            json!("operational")
        );
    }
}
