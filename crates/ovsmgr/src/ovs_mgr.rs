//! OvsMgr - bridge, port and flow operations over `ovs-vsctl` / `ovs-ofctl`

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use hostnet_common::{validate, CommandRunner, HostnetConfig, HostnetResult};

use crate::commands::{
    build_add_bridge_cmd, build_add_port_cmd, build_del_bridge_cmd, build_del_port_cmd,
    build_dump_flows_cmd, build_get_interface_type_cmd, build_get_port_tag_cmd,
    build_list_bridges_cmd, build_list_ports_cmd, build_show_cmd, build_vxlan_options_cmd,
    build_which_vsctl_cmd,
};
use crate::parsers::{
    is_vxlan_type, parse_flows, parse_name_list, parse_vlan_tag, parse_vxlan_options,
};
use crate::types::{
    AddPortRequest, BridgeDetail, FlowEntry, Port, SystemStatus, VlanTag, VxlanOptions,
};

/// OvsMgr issues OVS commands through a [`CommandRunner`]
///
/// Holds no state of its own; every call reflects the live switch.
#[derive(Clone)]
pub struct OvsMgr {
    runner: Arc<dyn CommandRunner>,
    config: Arc<HostnetConfig>,
}

impl OvsMgr {
    /// Creates a new OvsMgr
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<HostnetConfig>) -> Self {
        Self { runner, config }
    }

    /// List bridge names
    #[instrument(skip(self))]
    pub async fn list_bridges(&self) -> HostnetResult<Vec<String>> {
        let output = self
            .runner
            .run(&build_list_bridges_cmd(&self.config.tools))
            .await?;
        Ok(parse_name_list(&output))
    }

    /// Create a bridge
    #[instrument(skip(self))]
    pub async fn create_bridge(&self, name: &str) -> HostnetResult<()> {
        let name = validate::identifier("name", name)?;
        self.runner
            .run(&build_add_bridge_cmd(&self.config.tools, name))
            .await?;
        info!("Created bridge {}", name);
        Ok(())
    }

    /// Delete a bridge
    #[instrument(skip(self))]
    pub async fn delete_bridge(&self, name: &str) -> HostnetResult<()> {
        let name = validate::identifier("name", name)?;
        self.runner
            .run(&build_del_bridge_cmd(&self.config.tools, name))
            .await?;
        info!("Deleted bridge {}", name);
        Ok(())
    }

    /// List the port names attached to a bridge
    #[instrument(skip(self))]
    pub async fn list_ports(&self, bridge: &str) -> HostnetResult<Vec<String>> {
        let bridge = validate::identifier("bridge", bridge)?;
        let output = self
            .runner
            .run(&build_list_ports_cmd(&self.config.tools, bridge))
            .await?;
        Ok(parse_name_list(&output))
    }

    /// Attach a port, optionally tagged or as a VXLAN tunnel
    #[instrument(skip(self, request), fields(bridge = %request.bridge, port = %request.port))]
    pub async fn add_port(&self, request: &AddPortRequest) -> HostnetResult<()> {
        let port = request.validate()?;
        self.runner
            .run(&build_add_port_cmd(&self.config.tools, &port))
            .await?;
        info!("Added port {} to bridge {} ({:?})", port.port, port.bridge, port.kind);
        Ok(())
    }

    /// Detach a port
    #[instrument(skip(self))]
    pub async fn delete_port(&self, bridge: &str, port: &str) -> HostnetResult<()> {
        let bridge = validate::identifier("bridge", bridge)?;
        let port = validate::identifier("port", port)?;
        self.runner
            .run(&build_del_port_cmd(&self.config.tools, bridge, port))
            .await?;
        info!("Deleted port {} from bridge {}", port, bridge);
        Ok(())
    }

    /// Raw `ovs-ofctl dump-flows` text
    #[instrument(skip(self))]
    pub async fn dump_flows(&self, bridge: &str) -> HostnetResult<String> {
        let bridge = validate::identifier("bridge", bridge)?;
        self.runner
            .run(&build_dump_flows_cmd(&self.config.tools, bridge))
            .await
    }

    /// Flows of a bridge parsed into entries
    pub async fn flow_entries(&self, bridge: &str) -> HostnetResult<Vec<FlowEntry>> {
        let raw = self.dump_flows(bridge).await?;
        Ok(parse_flows(&raw))
    }

    /// Raw `ovs-vsctl show` text
    #[instrument(skip(self))]
    pub async fn summary(&self) -> HostnetResult<String> {
        self.runner.run(&build_show_cmd(&self.config.tools)).await
    }

    /// Probe whether OVS is installed and its daemon answers
    ///
    /// Never fails: every command error maps to a status.
    #[instrument(skip(self))]
    pub async fn system_status(&self) -> SystemStatus {
        let tools = &self.config.tools;

        if let Err(e) = self.runner.run(&build_which_vsctl_cmd(tools)).await {
            debug!("ovs-vsctl not found: {}", e);
            return SystemStatus::NotInstalled;
        }

        if let Err(e) = self.runner.run(&build_show_cmd(tools)).await {
            warn!("OVS installed but not answering: {}", e);
            return SystemStatus::InstalledNotRunning;
        }

        SystemStatus::Operational
    }

    /// Composite view of a bridge: every port with its tag and VXLAN options
    ///
    /// Only the port listing may fail the call. Per-port lookups run
    /// concurrently and degrade individually: a failed tag lookup reads as
    /// untagged, a failed type lookup as not-VXLAN, and a failed options
    /// lookup as empty options.
    #[instrument(skip(self))]
    pub async fn bridge_detail(&self, bridge: &str) -> HostnetResult<BridgeDetail> {
        let ports = self.list_ports(bridge).await?;

        let tag_lookups = join_all(ports.iter().map(|port| self.port_tag(port)));
        let vxlan_lookups = join_all(ports.iter().map(|port| self.vxlan_options(port)));
        let (tags, vxlans) = tokio::join!(tag_lookups, vxlan_lookups);

        let tags: HashMap<String, VlanTag> = tags.into_iter().collect();
        let vxlans: HashMap<String, Option<VxlanOptions>> = vxlans.into_iter().collect();

        let ports = ports
            .into_iter()
            .map(|name| {
                let vlan = tags.get(&name).copied().unwrap_or_default();
                let vxlan = vxlans.get(&name).cloned().flatten();
                Port::new(name, vlan, vxlan)
            })
            .collect();

        Ok(BridgeDetail {
            bridge: bridge.to_string(),
            ports,
        })
    }

    async fn port_tag(&self, port: &str) -> (String, VlanTag) {
        let tag = match self
            .runner
            .run(&build_get_port_tag_cmd(&self.config.tools, port))
            .await
        {
            Ok(output) => parse_vlan_tag(&output),
            Err(e) => {
                warn!("Tag lookup failed for port {}: {}", port, e);
                VlanTag::Default
            }
        };
        (port.to_string(), tag)
    }

    /// `None` when the port is not a VXLAN interface
    async fn vxlan_options(&self, port: &str) -> (String, Option<VxlanOptions>) {
        let tools = &self.config.tools;

        let is_vxlan = match self
            .runner
            .run(&build_get_interface_type_cmd(tools, port))
            .await
        {
            Ok(output) => is_vxlan_type(&output),
            Err(e) => {
                debug!("Type lookup failed for port {}: {}", port, e);
                false
            }
        };
        if !is_vxlan {
            return (port.to_string(), None);
        }

        if !validate::is_identifier(port) {
            warn!("Skipping options lookup for unusual port name {:?}", port);
            return (port.to_string(), Some(VxlanOptions::new()));
        }

        let options = match self
            .runner
            .run(&build_vxlan_options_cmd(tools, port))
            .await
        {
            Ok(output) => parse_vxlan_options(&output),
            Err(e) => {
                warn!("Options lookup failed for VXLAN port {}: {}", port, e);
                VxlanOptions::new()
            }
        };
        (port.to_string(), Some(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortKind;
    use hostnet_test::{ovs_fixtures, ScriptedRunner};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const VXLAN_OPTIONS_CMD: &str = "ovs-vsctl list Interface \"vxlan0\" | grep options";

    fn setup(runner: ScriptedRunner) -> (OvsMgr, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let mgr = OvsMgr::new(runner.clone(), Arc::new(HostnetConfig::default()));
        (mgr, runner)
    }

    fn scripted_bridge() -> ScriptedRunner {
        ScriptedRunner::new()
            .on("ovs-vsctl list-ports br-int", ovs_fixtures::LIST_PORTS)
            .on("ovs-vsctl get Port eth1 tag", "100")
            .on("ovs-vsctl get Port vxlan0 tag", ovs_fixtures::TAG_NONE)
            .on("ovs-vsctl get Port tap-web tag", ovs_fixtures::TAG_NONE)
            .on("ovs-vsctl get Interface eth1 type", ovs_fixtures::TYPE_SYSTEM)
            .on("ovs-vsctl get Interface vxlan0 type", ovs_fixtures::TYPE_VXLAN)
            .on("ovs-vsctl get Interface tap-web type", "internal")
    }

    #[tokio::test]
    async fn test_list_bridges() {
        let (mgr, _) = setup(ScriptedRunner::new().on("ovs-vsctl list-br", ovs_fixtures::LIST_BR));
        assert_eq!(mgr.list_bridges().await.unwrap(), vec!["br-ex", "br-int"]);
    }

    #[tokio::test]
    async fn test_list_bridges_empty() {
        let (mgr, _) = setup(ScriptedRunner::new().on("ovs-vsctl list-br", ""));
        assert!(mgr.list_bridges().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_delete_bridge() {
        let (mgr, runner) = setup(
            ScriptedRunner::new()
                .on("ovs-vsctl add-br br-test", "")
                .on("ovs-vsctl del-br br-test", ""),
        );

        mgr.create_bridge("br-test").await.unwrap();
        mgr.delete_bridge("br-test").await.unwrap();

        let verifier = runner.verifier();
        verifier
            .assert_command_order("ovs-vsctl add-br br-test", "ovs-vsctl del-br br-test")
            .unwrap();
        verifier.assert_command_count(2).unwrap();
    }

    #[tokio::test]
    async fn test_create_bridge_rejects_injection() {
        let (mgr, runner) = setup(ScriptedRunner::new());

        let err = mgr.create_bridge("br0; rm -rf /").await.unwrap_err();
        assert!(err.is_validation());
        assert!(mgr.delete_bridge("").await.unwrap_err().is_validation());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_bridge_reports_tool_output() {
        let (mgr, _) = setup(ScriptedRunner::new().fail(
            "ovs-vsctl add-br br-int",
            "ovs-vsctl: cannot create a bridge named br-int because a bridge named br-int already exists",
        ));

        let err = mgr.create_bridge("br-int").await.unwrap_err();
        assert!(err.is_exec());
        assert_eq!(
            err.to_string(),
            "ovs-vsctl: cannot create a bridge named br-int because a bridge named br-int already exists"
        );
    }

    #[tokio::test]
    async fn test_add_port_vxlan() {
        let cmd = "ovs-vsctl add-port br-int vx1 -- set interface vx1 type=vxlan options:remote_ip=10.0.0.2 options:key=5001";
        let (mgr, runner) = setup(ScriptedRunner::new().on(cmd, ""));

        let request = AddPortRequest::new("br-int", "vx1")
            .with_vxlan(Some("10.0.0.2".to_string()), Some("5001".to_string()));
        mgr.add_port(&request).await.unwrap();

        runner.verifier().assert_command_executed(cmd).unwrap();
    }

    #[tokio::test]
    async fn test_add_port_rejects_bad_vlan_before_running() {
        let (mgr, runner) = setup(ScriptedRunner::new());

        for vlan in ["4095", "ten", "-1"] {
            let request = AddPortRequest::new("br-int", "eth1").with_vlan(vlan);
            assert!(mgr.add_port(&request).await.unwrap_err().is_validation());
        }
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_port() {
        let (mgr, runner) = setup(ScriptedRunner::new().on("ovs-vsctl del-port br-int eth1", ""));
        mgr.delete_port("br-int", "eth1").await.unwrap();
        runner
            .verifier()
            .assert_command_executed("ovs-vsctl del-port br-int eth1")
            .unwrap();
    }

    #[tokio::test]
    async fn test_flow_entries() {
        let (mgr, _) = setup(
            ScriptedRunner::new().on("ovs-ofctl dump-flows br-int", ovs_fixtures::DUMP_FLOWS),
        );

        let flows = mgr.flow_entries("br-int").await.unwrap();
        assert_eq!(flows.len(), 3);
        assert_eq!(flows[0].actions, "output:2");
    }

    #[tokio::test]
    async fn test_dump_flows_propagates_failure() {
        let (mgr, _) = setup(ScriptedRunner::new().fail(
            "ovs-ofctl dump-flows br-nope",
            "ovs-ofctl: br-nope is not a bridge or a socket",
        ));
        let err = mgr.dump_flows("br-nope").await.unwrap_err();
        assert!(err.is_exec());
        assert_eq!(err.to_string(), "ovs-ofctl: br-nope is not a bridge or a socket");
    }

    #[tokio::test]
    async fn test_system_status() {
        let (mgr, _) = setup(
            ScriptedRunner::new()
                .on("which ovs-vsctl", "/usr/bin/ovs-vsctl")
                .on("ovs-vsctl show", ovs_fixtures::SHOW),
        );
        assert_eq!(mgr.system_status().await, SystemStatus::Operational);

        let (mgr, _) = setup(
            ScriptedRunner::new()
                .on("which ovs-vsctl", "/usr/bin/ovs-vsctl")
                .fail(
                    "ovs-vsctl show",
                    "database connection failed (No such file or directory)",
                ),
        );
        assert_eq!(mgr.system_status().await, SystemStatus::InstalledNotRunning);

        let (mgr, runner) = setup(ScriptedRunner::new().fail("which ovs-vsctl", ""));
        assert_eq!(mgr.system_status().await, SystemStatus::NotInstalled);
        runner
            .verifier()
            .assert_command_not_executed("ovs-vsctl show")
            .unwrap();
    }

    #[tokio::test]
    async fn test_bridge_detail() {
        let (mgr, _) = setup(scripted_bridge().on(VXLAN_OPTIONS_CMD, ovs_fixtures::VXLAN_OPTIONS));

        let detail = mgr.bridge_detail("br-int").await.unwrap();
        assert_eq!(detail.bridge, "br-int");

        let names: Vec<&str> = detail.ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["eth1", "vxlan0", "tap-web"]);

        assert_eq!(detail.ports[0].vlan, VlanTag::Id(100));
        assert_eq!(detail.ports[0].kind, PortKind::Access);
        assert_eq!(detail.ports[0].vxlan, None);

        let vxlan = &detail.ports[1];
        assert_eq!(vxlan.kind, PortKind::Vxlan);
        let options = vxlan.vxlan.as_ref().unwrap();
        assert_eq!(options.remote_ip(), Some("192.168.50.2"));
        assert_eq!(options.key(), Some("5001"));

        assert_eq!(detail.ports[2].kind, PortKind::TrunkNormal);
        assert_eq!(detail.ports[2].vlan, VlanTag::Default);
    }

    #[tokio::test]
    async fn test_bridge_detail_options_failure_degrades() {
        let (mgr, _) = setup(scripted_bridge().fail(VXLAN_OPTIONS_CMD, ""));

        let detail = mgr.bridge_detail("br-int").await.unwrap();
        let vxlan = &detail.ports[1];
        assert_eq!(vxlan.kind, PortKind::Vxlan);
        assert_eq!(vxlan.vxlan, Some(VxlanOptions::new()));
        // the other ports are unaffected
        assert_eq!(detail.ports[0].vlan, VlanTag::Id(100));
    }

    #[tokio::test]
    async fn test_bridge_detail_tag_failure_degrades() {
        let runner = ScriptedRunner::new()
            .on("ovs-vsctl list-ports br-int", "eth1")
            .fail("ovs-vsctl get Port eth1 tag", "no row \"eth1\" in table Port")
            .fail_spawn("ovs-vsctl get Interface eth1 type");
        let (mgr, _) = setup(runner);

        let detail = mgr.bridge_detail("br-int").await.unwrap();
        assert_eq!(detail.ports, vec![Port::new("eth1", VlanTag::Default, None)]);
    }

    #[tokio::test]
    async fn test_bridge_detail_list_failure_propagates() {
        let (mgr, _) = setup(
            ScriptedRunner::new()
                .fail("ovs-vsctl list-ports br-nope", "ovs-vsctl: no bridge named br-nope"),
        );

        let err = mgr.bridge_detail("br-nope").await.unwrap_err();
        assert_eq!(err.to_string(), "ovs-vsctl: no bridge named br-nope");
    }

    #[tokio::test]
    async fn test_bridge_detail_empty_bridge() {
        let (mgr, runner) = setup(ScriptedRunner::new().on("ovs-vsctl list-ports br-ex", ""));

        let detail = mgr.bridge_detail("br-ex").await.unwrap();
        assert!(detail.ports.is_empty());
        runner.verifier().assert_command_count(1).unwrap();
    }

    #[tokio::test]
    async fn test_bridge_detail_lookups_run_concurrently() {
        let delay = Duration::from_millis(200);
        let runner = ScriptedRunner::new()
            .on("ovs-vsctl list-ports br-int", "p1\np2\np3")
            .on_delayed("ovs-vsctl get Port p1 tag", "1", delay)
            .on_delayed("ovs-vsctl get Port p2 tag", "2", delay)
            .on_delayed("ovs-vsctl get Port p3 tag", "3", delay)
            .on_delayed("ovs-vsctl get Interface p1 type", "\"\"", delay)
            .on_delayed("ovs-vsctl get Interface p2 type", "\"\"", delay)
            .on_delayed("ovs-vsctl get Interface p3 type", "\"\"", delay);
        let (mgr, _) = setup(runner);

        let started = tokio::time::Instant::now();
        let detail = mgr.bridge_detail("br-int").await.unwrap();
        let elapsed = started.elapsed();

        let tags: Vec<VlanTag> = detail.ports.iter().map(|p| p.vlan).collect();
        assert_eq!(tags, vec![VlanTag::Id(1), VlanTag::Id(2), VlanTag::Id(3)]);
        assert!(elapsed < delay * 3, "lookups ran sequentially: {:?}", elapsed);
    }
}
