//! Integration resolver port.
//!
//! Looks up the billing gateway adapter configured for an organization.

use std::sync::Arc;

use async_trait::async_trait;

use super::GatewayAdapter;
use crate::domain::foundation::{DomainError, OrganizationId};

/// Resolves an organization's configured billing integration.
#[async_trait]
pub trait IntegrationResolver: Send + Sync {
    /// Returns the organization's gateway adapter.
    ///
    /// Returns `None` if the organization has no billing integration.
    async fn resolve(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<Arc<dyn GatewayAdapter>>, DomainError>;
}
