//! Static Integration Resolver Adapter
//!
//! Maps organizations to gateway adapters registered up front.
//! Useful for single-tenant deployments, testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OrganizationId};
use crate::ports::{GatewayAdapter, IntegrationResolver};

/// Fixed organization → adapter registry
#[derive(Default)]
pub struct StaticIntegrationResolver {
    adapters: RwLock<HashMap<OrganizationId, Arc<dyn GatewayAdapter>>>,
}

impl StaticIntegrationResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` for `organization_id` while building
    pub fn with_adapter(
        mut self,
        organization_id: OrganizationId,
        adapter: Arc<dyn GatewayAdapter>,
    ) -> Self {
        self.adapters.get_mut().insert(organization_id, adapter);
        self
    }

    /// Register or replace the adapter for an organization
    pub async fn register(&self, organization_id: OrganizationId, adapter: Arc<dyn GatewayAdapter>) {
        self.adapters.write().await.insert(organization_id, adapter);
    }

    /// Remove an organization's integration
    pub async fn unregister(&self, organization_id: &OrganizationId) -> bool {
        self.adapters.write().await.remove(organization_id).is_some()
    }
}

#[async_trait]
impl IntegrationResolver for StaticIntegrationResolver {
    async fn resolve(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<Arc<dyn GatewayAdapter>>, DomainError> {
        Ok(self.adapters.read().await.get(organization_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockGatewayAdapter;

    fn org(id: &str) -> OrganizationId {
        OrganizationId::new(id).unwrap()
    }

    #[tokio::test]
    async fn resolves_registered_adapter() {
        let resolver =
            StaticIntegrationResolver::new().with_adapter(org("org_a"), Arc::new(MockGatewayAdapter::new()));

        let adapter = resolver.resolve(&org("org_a")).await.unwrap();
        assert_eq!(adapter.map(|a| a.provider().to_string()), Some("mock".to_string()));
    }

    #[tokio::test]
    async fn unknown_organization_has_no_integration() {
        let resolver = StaticIntegrationResolver::new();
        assert!(resolver.resolve(&org("org_a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_and_unregister() {
        let resolver = StaticIntegrationResolver::new();
        resolver
            .register(org("org_a"), Arc::new(MockGatewayAdapter::new()))
            .await;
        assert!(resolver.resolve(&org("org_a")).await.unwrap().is_some());

        assert!(resolver.unregister(&org("org_a")).await);
        assert!(resolver.resolve(&org("org_a")).await.unwrap().is_none());
    }
}
