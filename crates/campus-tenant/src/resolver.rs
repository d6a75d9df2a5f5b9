//! Tenant Resolver
//!
//! Inspects the signals of one inbound request in fixed precedence order
//! and produces a [`TenantContext`] or rejects. Resolution never mutates
//! tenant state; the HTTP layer delivering the signals is an external
//! collaborator.

use crate::context::TenantContext;
use crate::directory::TenantDirectory;
use crate::model::Tenant;
use campus_common::{TenantError, TenantId, TenantResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Platform base domain; `<subdomain>.<base_domain>` identifies a tenant
    pub base_domain: String,
    /// Subdomains that never resolve to a tenant
    pub reserved_subdomains: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_domain: "opencampus.io".to_string(),
            reserved_subdomains: vec!["app".into(), "www".into(), "api".into()],
        }
    }
}

/// Whether the route works without a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Signup, health, marketing pages
    Public,
    /// Everything else
    TenantRequired,
}

/// Claims from an already-verified authentication token.
///
/// Verification itself is the token service's duty; the resolver trusts
/// whatever it is handed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedClaims {
    /// Authenticated principal
    pub subject: String,
    /// Tenant the token was issued for, when present
    pub tenant_id: Option<TenantId>,
}

/// Signals extracted from one inbound request
#[derive(Debug, Clone)]
pub struct RequestSignals {
    /// Host header, if present
    pub host: Option<String>,
    /// Explicit tenant-id header (trusted service-to-service calls)
    pub tenant_header: Option<String>,
    /// Verified token claims, if the request was authenticated
    pub claims: Option<VerifiedClaims>,
    /// Route classification
    pub route: RouteClass,
}

impl RequestSignals {
    /// Signals for a tenant-required route with only a host header.
    pub fn for_host(host: &str) -> Self {
        Self {
            host: Some(host.to_string()),
            tenant_header: None,
            claims: None,
            route: RouteClass::TenantRequired,
        }
    }
}

/// Tenant resolver
pub struct TenantResolver {
    directory: Arc<TenantDirectory>,
    config: ResolverConfig,
}

impl TenantResolver {
    /// Create a resolver over the given directory.
    pub fn new(directory: Arc<TenantDirectory>, config: ResolverConfig) -> Self {
        Self { directory, config }
    }

    /// Resolve one request's signals to a tenant context.
    ///
    /// Returns `Ok(None)` only for public routes with no resolvable
    /// tenant; there is no default-tenant fallback.
    pub fn resolve(&self, signals: &RequestSignals) -> TenantResult<Option<TenantContext>> {
        let tenant = match self.match_signals(signals) {
            Some(tenant) => tenant,
            None => {
                return match signals.route {
                    RouteClass::Public => Ok(None),
                    RouteClass::TenantRequired => {
                        debug!(host = ?signals.host, "no resolvable tenant signal");
                        Err(TenantError::TenantNotIdentified)
                    }
                };
            }
        };

        if !tenant.status.allows_access() {
            debug!(tenant = %tenant.id, "resolved tenant is inactive");
            return Err(TenantError::TenantInactive(tenant.id));
        }

        debug!(tenant = %tenant.id, limited = tenant.status.is_limited(), "tenant resolved");
        Ok(Some(TenantContext::for_tenant(&tenant)))
    }

    /// First match wins: platform subdomain, custom domain, explicit
    /// header, token claim.
    fn match_signals(&self, signals: &RequestSignals) -> Option<Tenant> {
        if let Some(host) = signals.host.as_deref() {
            let host = normalize_host(host);

            if let Some(subdomain) = self.subdomain_of(&host) {
                if let Some(tenant) = self.directory.lookup_by_subdomain(subdomain) {
                    return Some(tenant);
                }
            }

            if let Some(tenant) = self.directory.lookup_by_custom_domain(&host) {
                return Some(tenant);
            }
        }

        if let Some(raw) = signals.tenant_header.as_deref() {
            if let Ok(id) = raw.parse::<TenantId>() {
                if let Some(tenant) = self.directory.lookup(&id) {
                    return Some(tenant);
                }
            }
        }

        if let Some(id) = signals.claims.as_ref().and_then(|c| c.tenant_id) {
            if let Some(tenant) = self.directory.lookup(&id) {
                return Some(tenant);
            }
        }

        None
    }

    /// Extract the tenant subdomain from a host under the platform base
    /// domain. Reserved names and nested labels yield `None`.
    fn subdomain_of<'a>(&self, host: &'a str) -> Option<&'a str> {
        let prefix = host
            .strip_suffix(self.config.base_domain.as_str())?
            .strip_suffix('.')?;
        if prefix.is_empty() || prefix.contains('.') {
            return None;
        }
        if self.config.reserved_subdomains.iter().any(|r| r == prefix) {
            return None;
        }
        Some(prefix)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.rsplit_once(':').map_or(host, |(h, _)| h);
    host.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::NewTenant;
    use crate::model::{PlanTier, TenantStatus};

    fn setup() -> (Arc<TenantDirectory>, TenantResolver, Tenant) {
        let directory = Arc::new(TenantDirectory::new());
        let tenant = directory
            .create(NewTenant {
                name: "Acme Academy".into(),
                subdomain: "acme".into(),
                plan: PlanTier::Basic,
            })
            .unwrap();
        let resolver = TenantResolver::new(directory.clone(), ResolverConfig::default());
        (directory, resolver, tenant)
    }

    #[test]
    fn test_resolve_by_subdomain() {
        let (_, resolver, tenant) = setup();
        let ctx = resolver
            .resolve(&RequestSignals::for_host("acme.opencampus.io"))
            .unwrap()
            .unwrap();
        assert_eq!(ctx.tenant_id, tenant.id);
    }

    #[test]
    fn test_host_normalization() {
        let (_, resolver, tenant) = setup();
        let ctx = resolver
            .resolve(&RequestSignals::for_host("ACME.opencampus.io:8443"))
            .unwrap()
            .unwrap();
        assert_eq!(ctx.tenant_id, tenant.id);
    }

    #[test]
    fn test_reserved_subdomains_excluded() {
        let (_, resolver, _) = setup();
        for host in ["app.opencampus.io", "www.opencampus.io", "api.opencampus.io"] {
            let err = resolver.resolve(&RequestSignals::for_host(host)).unwrap_err();
            assert!(matches!(err, TenantError::TenantNotIdentified));
        }
    }

    #[test]
    fn test_resolve_by_custom_domain() {
        let (directory, resolver, tenant) = setup();
        directory
            .assign_custom_domain(&tenant.id, "portal.acme.edu")
            .unwrap();

        let ctx = resolver
            .resolve(&RequestSignals::for_host("portal.acme.edu"))
            .unwrap()
            .unwrap();
        assert_eq!(ctx.tenant_id, tenant.id);
    }

    #[test]
    fn test_resolve_by_header() {
        let (_, resolver, tenant) = setup();
        let signals = RequestSignals {
            host: Some("api.opencampus.io".into()),
            tenant_header: Some(tenant.id.to_string()),
            claims: None,
            route: RouteClass::TenantRequired,
        };
        let ctx = resolver.resolve(&signals).unwrap().unwrap();
        assert_eq!(ctx.tenant_id, tenant.id);
    }

    #[test]
    fn test_resolve_by_claims() {
        let (_, resolver, tenant) = setup();
        let signals = RequestSignals {
            host: None,
            tenant_header: None,
            claims: Some(VerifiedClaims {
                subject: "svc:billing".into(),
                tenant_id: Some(tenant.id),
            }),
            route: RouteClass::TenantRequired,
        };
        let ctx = resolver.resolve(&signals).unwrap().unwrap();
        assert_eq!(ctx.tenant_id, tenant.id);
    }

    #[test]
    fn test_subdomain_wins_over_header() {
        let (directory, resolver, tenant) = setup();
        let other = directory
            .create(NewTenant {
                name: "Beta College".into(),
                subdomain: "beta".into(),
                plan: PlanTier::Basic,
            })
            .unwrap();

        let signals = RequestSignals {
            host: Some("acme.opencampus.io".into()),
            tenant_header: Some(other.id.to_string()),
            claims: None,
            route: RouteClass::TenantRequired,
        };
        let ctx = resolver.resolve(&signals).unwrap().unwrap();
        assert_eq!(ctx.tenant_id, tenant.id);
    }

    #[test]
    fn test_public_route_without_tenant() {
        let (_, resolver, _) = setup();
        let signals = RequestSignals {
            host: Some("www.opencampus.io".into()),
            tenant_header: None,
            claims: None,
            route: RouteClass::Public,
        };
        assert!(resolver.resolve(&signals).unwrap().is_none());
    }

    #[test]
    fn test_no_signal_no_default_tenant() {
        let (_, resolver, _) = setup();
        let signals = RequestSignals {
            host: None,
            tenant_header: None,
            claims: None,
            route: RouteClass::TenantRequired,
        };
        assert!(matches!(
            resolver.resolve(&signals).unwrap_err(),
            TenantError::TenantNotIdentified
        ));
    }

    #[test]
    fn test_inactive_tenant_rejected() {
        let (directory, resolver, tenant) = setup();
        directory
            .update_status(&tenant.id, TenantStatus::Inactive)
            .unwrap();

        let err = resolver
            .resolve(&RequestSignals::for_host("acme.opencampus.io"))
            .unwrap_err();
        assert!(matches!(err, TenantError::TenantInactive(id) if id == tenant.id));
    }

    #[test]
    fn test_limited_tenant_marks_context() {
        let (directory, resolver, tenant) = setup();
        directory
            .update_status(&tenant.id, TenantStatus::Limited)
            .unwrap();

        let ctx = resolver
            .resolve(&RequestSignals::for_host("acme.opencampus.io"))
            .unwrap()
            .unwrap();
        assert!(ctx.limited);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let (_, resolver, _) = setup();
        let signals = RequestSignals::for_host("acme.opencampus.io");
        let first = resolver.resolve(&signals).unwrap().unwrap();
        let second = resolver.resolve(&signals).unwrap().unwrap();
        assert_eq!(first.tenant_id, second.tenant_id);
        assert_eq!(first.status, second.status);
    }

    #[test]
    fn test_nested_subdomain_not_a_tenant() {
        let (_, resolver, _) = setup();
        let err = resolver
            .resolve(&RequestSignals::for_host("deep.acme.opencampus.io"))
            .unwrap_err();
        assert!(matches!(err, TenantError::TenantNotIdentified));
    }
}
