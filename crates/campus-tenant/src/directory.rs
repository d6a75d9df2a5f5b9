//! Tenant Directory
//!
//! Authoritative mapping from external identifiers (subdomain, custom
//! domain) to tenants, and the single mutation path for tenant status,
//! plan, and configuration. Lookups observe the latest committed write:
//! the primary map and both unique indexes are updated under one write
//! lock.

use crate::model::{PlanTier, ResourceQuotas, Tenant, TenantConfigPatch, TenantStatus};
use campus_common::{TenantError, TenantId, TenantResult};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

/// Attributes for tenant registration
#[derive(Debug, Clone)]
pub struct NewTenant {
    /// Institution display name
    pub name: String,
    /// Requested subdomain
    pub subdomain: String,
    /// Initial plan
    pub plan: PlanTier,
}

#[derive(Default)]
struct DirectoryState {
    tenants: HashMap<TenantId, Tenant>,
    by_subdomain: HashMap<String, TenantId>,
    by_domain: HashMap<String, TenantId>,
}

/// Tenant directory
pub struct TenantDirectory {
    state: RwLock<DirectoryState>,
}

impl TenantDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DirectoryState::default()),
        }
    }

    /// Register a new tenant. Fails with `DuplicateIdentifier` if the
    /// subdomain is already claimed.
    pub fn create(&self, attrs: NewTenant) -> TenantResult<Tenant> {
        let subdomain = attrs.subdomain.to_ascii_lowercase();
        let mut state = self.state.write();

        if state.by_subdomain.contains_key(&subdomain) {
            return Err(TenantError::DuplicateIdentifier(subdomain));
        }

        let tenant = Tenant::new(&attrs.name, &subdomain, attrs.plan);
        state.by_subdomain.insert(subdomain, tenant.id);
        state.tenants.insert(tenant.id, tenant.clone());

        info!(tenant = %tenant.id, subdomain = %tenant.subdomain, "tenant created");
        Ok(tenant)
    }

    /// Look up by subdomain.
    pub fn lookup_by_subdomain(&self, subdomain: &str) -> Option<Tenant> {
        let state = self.state.read();
        let id = state.by_subdomain.get(&subdomain.to_ascii_lowercase())?;
        state.tenants.get(id).cloned()
    }

    /// Look up by registered custom domain (exact host match).
    pub fn lookup_by_custom_domain(&self, domain: &str) -> Option<Tenant> {
        let state = self.state.read();
        let id = state.by_domain.get(&domain.to_ascii_lowercase())?;
        state.tenants.get(id).cloned()
    }

    /// Look up by internal identifier.
    pub fn lookup(&self, id: &TenantId) -> Option<Tenant> {
        self.state.read().tenants.get(id).cloned()
    }

    /// Transition the tenant's lifecycle status. Called by the billing
    /// collaborator; `Inactive` is terminal but not enforced here, since
    /// billing may reinstate a tenant after a payment dispute resolves.
    pub fn update_status(&self, id: &TenantId, status: TenantStatus) -> TenantResult<Tenant> {
        let mut state = self.state.write();
        let tenant = state.tenants.get_mut(id).ok_or(TenantError::TenantNotFound)?;

        let previous = tenant.status;
        tenant.status = status;
        tenant.updated_at = Utc::now();
        let updated = tenant.clone();
        drop(state);

        info!(tenant = %id, from = ?previous, to = ?status, "tenant status changed");
        Ok(updated)
    }

    /// Change the plan tier and re-derive quotas. Billing is the sole
    /// caller; the new limits apply on the next quota check.
    pub fn update_plan(&self, id: &TenantId, plan: PlanTier) -> TenantResult<Tenant> {
        let mut state = self.state.write();
        let tenant = state.tenants.get_mut(id).ok_or(TenantError::TenantNotFound)?;

        tenant.plan = plan;
        tenant.quotas = ResourceQuotas::for_tier(plan);
        tenant.updated_at = Utc::now();
        let updated = tenant.clone();
        drop(state);

        info!(tenant = %id, plan = ?plan, "tenant plan changed");
        Ok(updated)
    }

    /// Merge a partial configuration update: supplied keys overwrite,
    /// unspecified keys are preserved.
    pub fn update_config(&self, id: &TenantId, patch: TenantConfigPatch) -> TenantResult<Tenant> {
        let mut state = self.state.write();
        let tenant = state.tenants.get_mut(id).ok_or(TenantError::TenantNotFound)?;

        tenant.config.apply(patch);
        tenant.updated_at = Utc::now();
        Ok(tenant.clone())
    }

    /// Attach or move a branded custom domain. Any previously registered
    /// domain for this tenant is released.
    pub fn assign_custom_domain(&self, id: &TenantId, domain: &str) -> TenantResult<Tenant> {
        let domain = domain.to_ascii_lowercase();
        let mut state = self.state.write();

        match state.by_domain.get(&domain) {
            Some(owner) if owner != id => {
                return Err(TenantError::DuplicateIdentifier(domain));
            }
            _ => {}
        }

        let tenant = state.tenants.get_mut(id).ok_or(TenantError::TenantNotFound)?;
        let previous = tenant.custom_domain.replace(domain.clone());
        tenant.updated_at = Utc::now();
        let updated = tenant.clone();

        if let Some(previous) = previous {
            state.by_domain.remove(&previous);
        }
        state.by_domain.insert(domain.clone(), *id);
        drop(state);

        info!(tenant = %id, domain = %domain, "custom domain assigned");
        Ok(updated)
    }

    /// Number of registered tenants.
    pub fn count(&self) -> usize {
        self.state.read().tenants.len()
    }
}

impl Default for TenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_tenant(subdomain: &str) -> NewTenant {
        NewTenant {
            name: format!("{subdomain} school"),
            subdomain: subdomain.into(),
            plan: PlanTier::Basic,
        }
    }

    #[test]
    fn test_create_and_lookup_round_trip() {
        let directory = TenantDirectory::new();
        let created = directory.create(new_tenant("acme")).unwrap();

        let found = directory.lookup_by_subdomain("acme").unwrap();
        assert_eq!(found.id, created.id);

        // Case-insensitive
        assert!(directory.lookup_by_subdomain("ACME").is_some());
    }

    #[test]
    fn test_duplicate_subdomain_rejected() {
        let directory = TenantDirectory::new();
        directory.create(new_tenant("acme")).unwrap();

        let err = directory.create(new_tenant("ACME")).unwrap_err();
        assert!(matches!(err, TenantError::DuplicateIdentifier(_)));
        assert_eq!(directory.count(), 1);
    }

    #[test]
    fn test_custom_domain_uniqueness() {
        let directory = TenantDirectory::new();
        let a = directory.create(new_tenant("alpha")).unwrap();
        let b = directory.create(new_tenant("beta")).unwrap();

        directory.assign_custom_domain(&a.id, "portal.alpha.edu").unwrap();
        let err = directory
            .assign_custom_domain(&b.id, "portal.alpha.edu")
            .unwrap_err();
        assert!(matches!(err, TenantError::DuplicateIdentifier(_)));

        let found = directory.lookup_by_custom_domain("portal.alpha.edu").unwrap();
        assert_eq!(found.id, a.id);
    }

    #[test]
    fn test_custom_domain_reassignment_releases_old() {
        let directory = TenantDirectory::new();
        let a = directory.create(new_tenant("alpha")).unwrap();

        directory.assign_custom_domain(&a.id, "old.alpha.edu").unwrap();
        directory.assign_custom_domain(&a.id, "new.alpha.edu").unwrap();

        assert!(directory.lookup_by_custom_domain("old.alpha.edu").is_none());
        assert!(directory.lookup_by_custom_domain("new.alpha.edu").is_some());
    }

    #[test]
    fn test_status_update_visible_immediately() {
        let directory = TenantDirectory::new();
        let tenant = directory.create(new_tenant("acme")).unwrap();

        directory
            .update_status(&tenant.id, TenantStatus::Inactive)
            .unwrap();
        let found = directory.lookup_by_subdomain("acme").unwrap();
        assert_eq!(found.status, TenantStatus::Inactive);
    }

    #[test]
    fn test_plan_change_rederives_quotas() {
        let directory = TenantDirectory::new();
        let tenant = directory.create(new_tenant("acme")).unwrap();
        let before = tenant.quotas.api_calls_per_day;

        let updated = directory.update_plan(&tenant.id, PlanTier::Premium).unwrap();
        assert!(updated.quotas.api_calls_per_day > before);
    }

    #[test]
    fn test_config_merge() {
        let directory = TenantDirectory::new();
        let tenant = directory.create(new_tenant("acme")).unwrap();

        let mut first = TenantConfigPatch::default();
        first.settings.insert("locale".into(), json!("en-GB"));
        first.settings.insert("logo_url".into(), json!("https://a/l.png"));
        directory.update_config(&tenant.id, first).unwrap();

        let mut second = TenantConfigPatch::default();
        second.settings.insert("locale".into(), json!("tr-TR"));
        let updated = directory.update_config(&tenant.id, second).unwrap();

        assert_eq!(updated.config.settings["locale"], json!("tr-TR"));
        assert_eq!(updated.config.settings["logo_url"], json!("https://a/l.png"));
    }

    #[test]
    fn test_unknown_tenant() {
        let directory = TenantDirectory::new();
        let err = directory
            .update_status(&TenantId::new(), TenantStatus::Active)
            .unwrap_err();
        assert!(matches!(err, TenantError::TenantNotFound));
    }
}
