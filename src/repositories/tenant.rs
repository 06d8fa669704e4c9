//! # Tenant Repository
//!
//! Lookups and subscription plan transitions for tenants.

use crate::error::RepositoryError;
use crate::models::{SubscriptionPlan, Tenant};
use crate::store::Store;

/// Repository for Tenant records
pub struct TenantRepository<'a> {
    store: &'a Store,
}

impl<'a> TenantRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Get tenant by ID
    pub async fn get_by_id(&self, tenant_id: i64) -> Option<Tenant> {
        self.store
            .read(|data| data.tenants.iter().find(|t| t.id == tenant_id).cloned())
            .await
    }

    /// Get tenant by slug
    pub async fn get_by_slug(&self, slug: &str) -> Option<Tenant> {
        self.store
            .read(|data| data.tenants.iter().find(|t| t.slug == slug).cloned())
            .await
    }

    /// List all tenants
    pub async fn list(&self) -> Vec<Tenant> {
        self.store.read(|data| data.tenants.clone()).await
    }

    /// Set the subscription plan of the tenant identified by `slug`.
    ///
    /// Setting the plan a tenant already has succeeds without change.
    pub async fn set_plan_by_slug(
        &self,
        slug: &str,
        plan: SubscriptionPlan,
    ) -> Result<Tenant, RepositoryError> {
        self.store
            .mutate(|data| {
                let tenant = data
                    .tenants
                    .iter_mut()
                    .find(|t| t.slug == slug)
                    .ok_or_else(|| RepositoryError::not_found("Tenant not found"))?;
                tenant.subscription_plan = plan;
                Ok(tenant.clone())
            })
            .await
    }

    /// Set the subscription plan of the tenant identified by `tenant_id`.
    pub async fn set_plan(
        &self,
        tenant_id: i64,
        plan: SubscriptionPlan,
    ) -> Result<Tenant, RepositoryError> {
        self.store
            .mutate(|data| {
                let tenant = data
                    .tenants
                    .iter_mut()
                    .find(|t| t.id == tenant_id)
                    .ok_or_else(|| RepositoryError::not_found("Tenant not found"))?;
                tenant.subscription_plan = plan;
                Ok(tenant.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_by_slug_and_id() {
        let store = Store::in_memory().unwrap();
        let repo = TenantRepository::new(&store);

        let acme = repo.get_by_slug("acme").await.unwrap();
        assert_eq!(acme.name, "Acme Corp");
        assert_eq!(repo.get_by_id(acme.id).await, Some(acme));
        assert!(repo.get_by_slug("initech").await.is_none());
        assert_eq!(repo.list().await.len(), 2);
    }

    #[tokio::test]
    async fn plan_transitions_are_idempotent() {
        let store = Store::in_memory().unwrap();
        let repo = TenantRepository::new(&store);

        let first = repo
            .set_plan_by_slug("acme", SubscriptionPlan::Pro)
            .await
            .unwrap();
        let second = repo
            .set_plan_by_slug("acme", SubscriptionPlan::Pro)
            .await
            .unwrap();
        assert_eq!(first.subscription_plan, SubscriptionPlan::Pro);
        assert_eq!(second, first);

        let reset = repo.set_plan(first.id, SubscriptionPlan::Free).await.unwrap();
        assert_eq!(reset.subscription_plan, SubscriptionPlan::Free);

        let globex = repo.get_by_slug("globex").await.unwrap();
        assert_eq!(globex.subscription_plan, SubscriptionPlan::Free);
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let store = Store::in_memory().unwrap();
        let repo = TenantRepository::new(&store);

        let result = repo.set_plan_by_slug("initech", SubscriptionPlan::Pro).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }
}
