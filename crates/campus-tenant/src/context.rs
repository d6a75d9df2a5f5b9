//! Request-Scoped Tenant Context
//!
//! The carrier binds the resolved tenant to one logical unit of work (a
//! request), not to a thread: the value follows the task across `.await`
//! suspension points and is invisible to every other task. There is no
//! global fallback; outside a scope, tenant-dependent operations fail
//! with `NoTenantContext`.

use crate::model::{Tenant, TenantConfig, TenantStatus};
use campus_common::{TenantError, TenantId, TenantResult};
use std::future::Future;
use tracing::error;

/// Snapshot of the resolved tenant, valid for one request
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Resolved tenant
    pub tenant_id: TenantId,
    /// Status at resolution time
    pub status: TenantStatus,
    /// Configuration at resolution time
    pub config: TenantConfig,
    /// Stricter quota limits apply downstream
    pub limited: bool,
}

impl TenantContext {
    /// Snapshot a directory tenant into a request context.
    pub fn for_tenant(tenant: &Tenant) -> Self {
        Self {
            tenant_id: tenant.id,
            status: tenant.status,
            config: tenant.config.clone(),
            limited: tenant.status.is_limited(),
        }
    }
}

tokio::task_local! {
    static CURRENT_TENANT: TenantContext;
}

/// Scope handle for running work under a tenant context
pub struct TenantScope;

impl TenantScope {
    /// Run `fut` with `ctx` as the ambient tenant context. Any nested call
    /// to [`TenantScope::current`] observes exactly `ctx`, including after
    /// the future suspends and resumes on another worker thread.
    pub async fn run_with<F>(ctx: TenantContext, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(ctx, fut).await
    }

    /// Synchronous variant of [`TenantScope::run_with`].
    pub fn run_with_sync<F, R>(ctx: TenantContext, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT_TENANT.sync_scope(ctx, f)
    }

    /// The ambient context, if any.
    pub fn current() -> Option<TenantContext> {
        CURRENT_TENANT.try_with(Clone::clone).ok()
    }

    /// The ambient tenant id, if any.
    pub fn current_id() -> Option<TenantId> {
        CURRENT_TENANT.try_with(|ctx| ctx.tenant_id).ok()
    }

    /// The ambient context, or `NoTenantContext`. A miss here is a
    /// programming error, never a client condition.
    pub fn require() -> TenantResult<TenantContext> {
        Self::current().ok_or_else(|| {
            error!("tenant-scoped operation attempted outside any tenant context");
            TenantError::NoTenantContext
        })
    }
}
