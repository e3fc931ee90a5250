//! FirewallMgr - iptables rules per namespace

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use hostnet_common::{CommandRunner, HostnetConfig, HostnetResult};

use crate::commands::{build_delete_rule_cmd, build_insert_rule_cmd, build_list_rules_cmd};
use crate::parsers::parse_firewall_rules;
use crate::types::{
    AddFirewallRuleRequest, DeleteFirewallRuleRequest, FirewallRule, FirewallRuleSet,
    FirewallTable, Namespace,
};

/// FirewallMgr lists and edits iptables chains through a [`CommandRunner`]
#[derive(Clone)]
pub struct FirewallMgr {
    runner: Arc<dyn CommandRunner>,
    config: Arc<HostnetConfig>,
}

impl FirewallMgr {
    /// Creates a new FirewallMgr
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<HostnetConfig>) -> Self {
        Self { runner, config }
    }

    /// Rules of one table
    #[instrument(skip(self, namespace), fields(namespace = %namespace))]
    pub async fn list_firewall_rules(
        &self,
        namespace: &Namespace,
        table: FirewallTable,
    ) -> HostnetResult<Vec<FirewallRule>> {
        let output = self
            .runner
            .run(&build_list_rules_cmd(&self.config.tools, namespace, table))
            .await?;
        Ok(parse_firewall_rules(&output))
    }

    /// Rules of every table; a table that cannot be listed reads as empty
    #[instrument(skip(self, namespace), fields(namespace = %namespace))]
    pub async fn firewall_rule_set(&self, namespace: &Namespace) -> FirewallRuleSet {
        let listings = join_all(
            FirewallTable::ALL.into_iter().map(|table| async move {
                (table, self.list_firewall_rules(namespace, table).await)
            }),
        )
        .await;

        let mut rule_set = FirewallRuleSet::default();
        for (table, result) in listings {
            match result {
                Ok(rules) => *rule_set.table_mut(table) = rules,
                Err(e) => warn!("Failed to list {} table in {}: {}", table, namespace, e),
            }
        }
        rule_set
    }

    /// Insert a rule at its priority position
    #[instrument(
        skip(self, namespace, request),
        fields(namespace = %namespace, chain = %request.chain)
    )]
    pub async fn add_firewall_rule(
        &self,
        namespace: &Namespace,
        request: &AddFirewallRuleRequest,
    ) -> HostnetResult<()> {
        let rule = request.validate()?;
        self.runner
            .run(&build_insert_rule_cmd(&self.config.tools, namespace, &rule))
            .await?;
        info!(
            "Inserted {} rule at {}/{} position {} in {}",
            rule.target, rule.table, rule.chain, rule.priority, namespace
        );
        Ok(())
    }

    /// Delete rule `num` of a chain
    #[instrument(
        skip(self, namespace, request),
        fields(namespace = %namespace, chain = %request.chain)
    )]
    pub async fn delete_firewall_rule(
        &self,
        namespace: &Namespace,
        request: &DeleteFirewallRuleRequest,
    ) -> HostnetResult<()> {
        let (table, chain, num) = request.validate()?;
        self.runner
            .run(&build_delete_rule_cmd(&self.config.tools, namespace, table, chain, num))
            .await?;
        info!("Deleted rule {}/{} #{} in {}", table, chain, num, namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostnet_test::{iptables_fixtures, ScriptedRunner};
    use pretty_assertions::assert_eq;

    fn setup(runner: ScriptedRunner) -> (FirewallMgr, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        let mgr = FirewallMgr::new(runner.clone(), Arc::new(HostnetConfig::default()));
        (mgr, runner)
    }

    #[tokio::test]
    async fn test_list_firewall_rules() {
        let (mgr, _) = setup(ScriptedRunner::new().on(
            "ip netns exec blue iptables -t filter -vnL --line-numbers",
            iptables_fixtures::FILTER,
        ));

        let rules = mgr
            .list_firewall_rules(&Namespace::Named("blue".to_string()), FirewallTable::Filter)
            .await
            .unwrap();
        assert_eq!(rules.len(), 3);
    }

    #[tokio::test]
    async fn test_list_firewall_rules_propagates_failure() {
        let (mgr, _) = setup(ScriptedRunner::new().fail(
            "iptables -t nat -vnL --line-numbers",
            "iptables v1.8.7 (nf_tables): Permission denied (you must be root)",
        ));

        let err = mgr
            .list_firewall_rules(&Namespace::Host, FirewallTable::Nat)
            .await
            .unwrap_err();
        assert!(err.is_exec());
        assert!(err.to_string().contains("Permission denied"));
    }

    #[tokio::test]
    async fn test_rule_set_both_tables() {
        let (mgr, _) = setup(ScriptedRunner::new()
            .on("iptables -t filter -vnL --line-numbers", iptables_fixtures::FILTER)
            .on("iptables -t nat -vnL --line-numbers", iptables_fixtures::NAT));

        let rule_set = mgr.firewall_rule_set(&Namespace::Host).await;
        assert_eq!(rule_set.filter.len(), 3);
        assert_eq!(rule_set.nat.len(), 1);
        assert_eq!(rule_set.table(FirewallTable::Nat)[0].chain, "POSTROUTING");
    }

    #[tokio::test]
    async fn test_rule_set_degrades_per_table() {
        let (mgr, _) = setup(ScriptedRunner::new()
            .on("iptables -t filter -vnL --line-numbers", iptables_fixtures::FILTER)
            .fail("iptables -t nat -vnL --line-numbers", "can't initialize iptables table `nat'"));

        let rule_set = mgr.firewall_rule_set(&Namespace::Host).await;
        assert_eq!(rule_set.filter.len(), 3);
        assert!(rule_set.nat.is_empty());
    }

    #[tokio::test]
    async fn test_add_firewall_rule() {
        let cmd = "iptables -t filter -I INPUT 1 -p tcp -d 10.0.0.5 -j ACCEPT";
        let (mgr, runner) = setup(ScriptedRunner::new().on(cmd, ""));

        let mut request = AddFirewallRuleRequest::new("INPUT", "ACCEPT");
        request.protocol = Some("tcp".to_string());
        request.destination = Some("10.0.0.5".to_string());
        mgr.add_firewall_rule(&Namespace::Host, &request).await.unwrap();

        runner.verifier().assert_command_executed(cmd).unwrap();
    }

    #[tokio::test]
    async fn test_add_firewall_rule_rejects_target() {
        let (mgr, runner) = setup(ScriptedRunner::new());

        let request = AddFirewallRuleRequest::new("INPUT", "ACCEPT && reboot");
        let err = mgr
            .add_firewall_rule(&Namespace::Host, &request)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_firewall_rule() {
        let cmd = "ip netns exec red iptables -t nat -D POSTROUTING 1";
        let (mgr, runner) = setup(ScriptedRunner::new().on(cmd, ""));

        let mut request = DeleteFirewallRuleRequest::new("POSTROUTING", "1");
        request.table = Some("nat".to_string());
        mgr.delete_firewall_rule(&Namespace::Named("red".to_string()), &request)
            .await
            .unwrap();

        runner.verifier().assert_command_executed(cmd).unwrap();
    }

    #[tokio::test]
    async fn test_delete_firewall_rule_reports_tool_output() {
        let (mgr, _) = setup(ScriptedRunner::new().fail(
            "iptables -t filter -D INPUT 9",
            "iptables: Index of deletion too big.",
        ));

        let request = DeleteFirewallRuleRequest::new("INPUT", "9");
        let err = mgr
            .delete_firewall_rule(&Namespace::Host, &request)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "iptables: Index of deletion too big.");
    }
}
