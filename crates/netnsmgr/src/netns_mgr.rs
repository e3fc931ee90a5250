//! NetnsMgr - namespace listing, namespace detail and routes

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use hostnet_common::{CommandRunner, HostnetConfig, HostnetError, HostnetResult};

use crate::commands::{
    build_add_route_cmd, build_list_links_cmd, build_list_namespaces_cmd, build_list_routes_cmd,
    build_port_to_bridge_cmd,
};
use crate::parsers::{parse_interfaces, parse_namespace_list, parse_routes};
use crate::types::{AddRouteRequest, InterfaceInfo, Namespace, NamespaceDetail};

/// NetnsMgr inspects network namespaces through a [`CommandRunner`]
#[derive(Clone)]
pub struct NetnsMgr {
    runner: Arc<dyn CommandRunner>,
    config: Arc<HostnetConfig>,
}

impl NetnsMgr {
    /// Creates a new NetnsMgr
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<HostnetConfig>) -> Self {
        Self { runner, config }
    }

    /// List named namespaces; the host namespace is never included
    #[instrument(skip(self))]
    pub async fn list_namespaces(&self) -> HostnetResult<Vec<String>> {
        let output = self
            .runner
            .run(&build_list_namespaces_cmd(&self.config.tools))
            .await?;
        Ok(parse_namespace_list(&output))
    }

    /// Fail with NotFound unless `namespace` exists
    ///
    /// The host namespace always exists and costs no lookup.
    pub async fn ensure_exists(&self, namespace: &Namespace) -> HostnetResult<()> {
        let Namespace::Named(name) = namespace else {
            return Ok(());
        };

        let namespaces = self.list_namespaces().await?;
        if namespaces.iter().any(|ns| ns == name) {
            Ok(())
        } else {
            debug!("Namespace {} not in {:?}", name, namespaces);
            Err(HostnetError::namespace_not_found(name.as_str()))
        }
    }

    /// Interfaces with their OVS bridge membership, plus routes
    ///
    /// Existence is checked before any link or route query. Interface and
    /// route listings run concurrently and must both succeed; the per-interface
    /// bridge lookups then run concurrently and degrade individually.
    #[instrument(skip(self, namespace), fields(namespace = %namespace))]
    pub async fn namespace_detail(&self, namespace: &Namespace) -> HostnetResult<NamespaceDetail> {
        self.ensure_exists(namespace).await?;

        let tools = &self.config.tools;
        let link_cmd = build_list_links_cmd(tools, namespace);
        let route_cmd = build_list_routes_cmd(tools, namespace);
        let (links, routes) =
            tokio::try_join!(self.runner.run(&link_cmd), self.runner.run(&route_cmd))?;

        let names = parse_interfaces(&links);
        let interfaces = join_all(names.iter().map(|name| self.bridge_membership(name))).await;

        Ok(NamespaceDetail {
            namespace: namespace.clone(),
            count: interfaces.len(),
            interfaces,
            routes: parse_routes(&routes),
        })
    }

    async fn bridge_membership(&self, interface: &str) -> InterfaceInfo {
        let cmd = build_port_to_bridge_cmd(&self.config.tools, interface);
        match self.runner.run(&cmd).await {
            Ok(bridge) if !bridge.trim().is_empty() => {
                InterfaceInfo::on_bridge(interface, bridge.trim())
            }
            Ok(_) => InterfaceInfo::not_ovs(interface),
            Err(HostnetError::CommandFailed { .. }) => InterfaceInfo::not_ovs(interface),
            Err(e) => {
                warn!("Bridge lookup for {} failed: {}", interface, e);
                InterfaceInfo::lookup_error(interface)
            }
        }
    }

    /// Normalized routes of a namespace
    #[instrument(skip(self, namespace), fields(namespace = %namespace))]
    pub async fn list_routes(&self, namespace: &Namespace) -> HostnetResult<Vec<String>> {
        let output = self
            .runner
            .run(&build_list_routes_cmd(&self.config.tools, namespace))
            .await?;
        Ok(parse_routes(&output))
    }

    /// Add a route inside a namespace
    #[instrument(
        skip(self, namespace, request),
        fields(namespace = %namespace, destination = %request.destination)
    )]
    pub async fn add_route(
        &self,
        namespace: &Namespace,
        request: &AddRouteRequest,
    ) -> HostnetResult<()> {
        let route = request.validate()?;
        self.runner
            .run(&build_add_route_cmd(&self.config.tools, namespace, &route))
            .await?;
        info!("Added route {} in namespace {}", route.destination, namespace);
        Ok(())
    }
}
