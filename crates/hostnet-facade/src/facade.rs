//! Facade - every hostnet operation behind one handle

use serde::Serialize;
use std::sync::Arc;

use hostnet_common::{CommandRunner, HostnetConfig, HostnetResult, ShellRunner};
use hostnet_netnsmgr::{
    AddFirewallRuleRequest, AddRouteRequest, DeleteFirewallRuleRequest, FirewallMgr, FirewallRule,
    FirewallRuleSet, FirewallTable, Namespace, NamespaceDetail, NetnsMgr,
};
use hostnet_ovsmgr::{AddPortRequest, BridgeDetail, FlowEntry, OvsMgr, StatusDescriptor};

/// Success marker returned by mutating operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    const OK: Ack = Ack { success: true };
}

/// The operation surface consumed by outer layers (HTTP, CLI)
///
/// Accepts caller-supplied strings, parses them into typed values, and
/// delegates to the domain managers. Holds no state besides configuration.
#[derive(Clone)]
pub struct Facade {
    config: Arc<HostnetConfig>,
    ovs: OvsMgr,
    netns: NetnsMgr,
    firewall: FirewallMgr,
}

impl Facade {
    /// Facade running real commands
    pub fn new(config: Arc<HostnetConfig>) -> Self {
        let runner = Arc::new(ShellRunner::new(config.tools.shell.clone()));
        Self::with_runner(runner, config)
    }

    /// Facade running commands through `runner`
    pub fn with_runner(runner: Arc<dyn CommandRunner>, config: Arc<HostnetConfig>) -> Self {
        Self {
            ovs: OvsMgr::new(runner.clone(), config.clone()),
            netns: NetnsMgr::new(runner.clone(), config.clone()),
            firewall: FirewallMgr::new(runner, config.clone()),
            config,
        }
    }

    /// Checks an `Authorization` header against the configured secret
    pub fn authorize(&self, header: Option<&str>) -> bool {
        self.config.bearer_matches(header)
    }

    // Open vSwitch

    pub async fn list_bridges(&self) -> HostnetResult<Vec<String>> {
        self.ovs.list_bridges().await
    }

    pub async fn create_bridge(&self, name: &str) -> HostnetResult<Ack> {
        self.ovs.create_bridge(name).await?;
        Ok(Ack::OK)
    }

    pub async fn delete_bridge(&self, name: &str) -> HostnetResult<Ack> {
        self.ovs.delete_bridge(name).await?;
        Ok(Ack::OK)
    }

    pub async fn bridge_detail(&self, name: &str) -> HostnetResult<BridgeDetail> {
        self.ovs.bridge_detail(name).await
    }

    pub async fn list_ports(&self, bridge: &str) -> HostnetResult<Vec<String>> {
        self.ovs.list_ports(bridge).await
    }

    pub async fn add_port(&self, request: &AddPortRequest) -> HostnetResult<Ack> {
        self.ovs.add_port(request).await?;
        Ok(Ack::OK)
    }

    pub async fn delete_port(&self, bridge: &str, port: &str) -> HostnetResult<Ack> {
        self.ovs.delete_port(bridge, port).await?;
        Ok(Ack::OK)
    }

    /// Raw flow dump
    pub async fn dump_flows(&self, bridge: &str) -> HostnetResult<String> {
        self.ovs.dump_flows(bridge).await
    }

    /// Flow dump parsed into entries
    pub async fn flow_entries(&self, bridge: &str) -> HostnetResult<Vec<FlowEntry>> {
        self.ovs.flow_entries(bridge).await
    }

    /// Tri-state OVS health; never fails
    pub async fn system_status(&self) -> StatusDescriptor {
        self.ovs.system_status().await.descriptor()
    }

    /// Raw `ovs-vsctl show`
    pub async fn ovs_summary(&self) -> HostnetResult<String> {
        self.ovs.summary().await
    }

    // Namespaces and routes

    pub async fn list_namespaces(&self) -> HostnetResult<Vec<String>> {
        self.netns.list_namespaces().await
    }

    /// `namespace` is a namespace name or `default` for the host
    pub async fn namespace_detail(&self, namespace: &str) -> HostnetResult<NamespaceDetail> {
        let namespace = Namespace::parse(namespace)?;
        self.netns.namespace_detail(&namespace).await
    }

    pub async fn list_routes(&self, namespace: &str) -> HostnetResult<Vec<String>> {
        let namespace = Namespace::parse(namespace)?;
        self.netns.list_routes(&namespace).await
    }

    pub async fn add_route(
        &self,
        namespace: &str,
        request: &AddRouteRequest,
    ) -> HostnetResult<Ack> {
        let namespace = Namespace::parse(namespace)?;
        self.netns.add_route(&namespace, request).await?;
        Ok(Ack::OK)
    }

    // Firewall

    pub async fn list_firewall_rules(
        &self,
        namespace: &str,
        table: &str,
    ) -> HostnetResult<Vec<FirewallRule>> {
        let namespace = Namespace::parse(namespace)?;
        let table: FirewallTable = table.parse()?;
        self.firewall.list_firewall_rules(&namespace, table).await
    }

    /// Rules of both tables; a table that cannot be listed reads as empty
    pub async fn firewall_rule_set(&self, namespace: &str) -> HostnetResult<FirewallRuleSet> {
        let namespace = Namespace::parse(namespace)?;
        Ok(self.firewall.firewall_rule_set(&namespace).await)
    }

    pub async fn add_firewall_rule(
        &self,
        namespace: &str,
        request: &AddFirewallRuleRequest,
    ) -> HostnetResult<Ack> {
        let namespace = Namespace::parse(namespace)?;
        self.firewall.add_firewall_rule(&namespace, request).await?;
        Ok(Ack::OK)
    }

    pub async fn delete_firewall_rule(
        &self,
        namespace: &str,
        request: &DeleteFirewallRuleRequest,
    ) -> HostnetResult<Ack> {
        let namespace = Namespace::parse(namespace)?;
        self.firewall.delete_firewall_rule(&namespace, request).await?;
        Ok(Ack::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostnet_test::ScriptedRunner;

    fn facade(runner: ScriptedRunner) -> (Facade, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let facade = Facade::with_runner(runner.clone(), Arc::new(HostnetConfig::default()));
        (facade, runner)
    }

    #[test]
    fn test_ack_json() {
        assert_eq!(
            serde_json::to_string(&Ack::OK).unwrap(),
            r#"{"success":true}"#
        );
    }

    #[test]
    fn test_authorize() {
        let (facade, _) = facade(ScriptedRunner::new());
        assert!(facade.authorize(Some("Bearer admin")));
        assert!(!facade.authorize(Some("Bearer nope")));
        assert!(!facade.authorize(Some("admin")));
        assert!(!facade.authorize(None));
    }

    #[tokio::test]
    async fn test_bad_namespace_rejected_before_running() {
        let (facade, runner) = facade(ScriptedRunner::new());

        assert!(facade.list_routes("blue;id").await.unwrap_err().is_validation());
        assert!(facade
            .list_firewall_rules("default", "mangle")
            .await
            .unwrap_err()
            .is_validation());
        assert!(facade.firewall_rule_set("").await.unwrap_err().is_validation());
        assert!(runner.calls().is_empty());
    }
}
