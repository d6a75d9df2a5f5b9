//! Data Access Guard
//!
//! Enforces tenant isolation at the point of storage access, independent
//! of whether application code remembered to filter. The resolver
//! establishes intent; every storage call through the guard re-validates
//! it, so a missing filter in any one handler cannot leak data.
//!
//! Writes stamp the ambient tenant onto the record, or fail fatally on a
//! mismatch. Reads are filtered to the ambient tenant; a record owned by
//! another tenant is indistinguishable from an absent one. A caller may
//! supply its own tenant filter only if it names the same tenant.
//!
//! For backends with native row-level policies, [`PolicyBinding`] binds
//! the session tenant from the same context carrier for the duration of
//! the unit of work and clears it on release. The guard's own filtering
//! stays on either way; the layers are additive.

use crate::context::TenantScope;
use async_trait::async_trait;
use campus_common::{RecordId, TenantError, TenantId, TenantResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::error;

/// A record partitioned by tenant.
///
/// The tenant id is set once at creation and never mutated thereafter;
/// `set_tenant_id` is only called by the guard on first write.
pub trait TenantOwned {
    /// The owning tenant, if already stamped
    fn tenant_id(&self) -> Option<TenantId>;
    /// Stamp the owning tenant
    fn set_tenant_id(&mut self, tenant_id: TenantId);
}

/// Caller-side query filter
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFilter {
    /// Explicit tenant filter; `None` means "inject the ambient tenant"
    pub tenant_id: Option<TenantId>,
}

impl QueryFilter {
    /// No explicit filter; the guard injects the ambient tenant.
    pub fn any() -> Self {
        Self::default()
    }

    /// Explicit tenant filter. Must match the ambient tenant or the
    /// query fails with `CrossTenantRead`.
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
        }
    }
}

/// Backend-agnostic storage surface the guard wraps.
///
/// Implementations do not enforce tenancy policy themselves; they take
/// the tenant the guard already validated. The ownership check in
/// `replace` and `remove` must be atomic with the mutation, so a record
/// deleted concurrently cannot be resurrected by an in-flight update.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stored record type
    type Record: TenantOwned + Clone + Send + Sync;

    /// Store a new record.
    async fn put(&self, id: RecordId, record: Self::Record);
    /// Fetch a record by id, unfiltered.
    async fn fetch(&self, id: &RecordId) -> Option<Self::Record>;
    /// All records of one tenant.
    async fn scan(&self, tenant_id: &TenantId) -> Vec<Self::Record>;
    /// Replace a record iff it exists and `tenant_id` owns it.
    async fn replace(&self, id: &RecordId, record: Self::Record, tenant_id: &TenantId) -> bool;
    /// Remove a record iff it exists and `tenant_id` owns it.
    async fn remove(&self, id: &RecordId, tenant_id: &TenantId) -> Option<Self::Record>;
}

/// In-memory record store
pub struct MemoryStore<R> {
    records: DashMap<RecordId, R>,
}

impl<R> MemoryStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Number of records across all tenants.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R> RecordStore for MemoryStore<R>
where
    R: TenantOwned + Clone + Send + Sync,
{
    type Record = R;

    async fn put(&self, id: RecordId, record: R) {
        self.records.insert(id, record);
    }

    async fn fetch(&self, id: &RecordId) -> Option<R> {
        self.records.get(id).map(|r| r.value().clone())
    }

    async fn scan(&self, tenant_id: &TenantId) -> Vec<R> {
        self.records
            .iter()
            .filter(|r| r.value().tenant_id() == Some(*tenant_id))
            .map(|r| r.value().clone())
            .collect()
    }

    async fn replace(&self, id: &RecordId, record: R, tenant_id: &TenantId) -> bool {
        // Entry holds the shard lock across the ownership check and the
        // write, so the pair is atomic with respect to `remove`.
        if let Entry::Occupied(mut slot) = self.records.entry(*id) {
            if slot.get().tenant_id() == Some(*tenant_id) {
                slot.insert(record);
                return true;
            }
        }
        false
    }

    async fn remove(&self, id: &RecordId, tenant_id: &TenantId) -> Option<R> {
        self.records
            .remove_if(id, |_, r| r.tenant_id() == Some(*tenant_id))
            .map(|(_, r)| r)
    }
}

/// The guard itself: a store wrapper that stamps writes and filters reads
/// by the ambient tenant context.
pub struct TenantGuard<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> TenantGuard<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Insert a record under the ambient tenant.
    ///
    /// An unset tenant id is stamped from the context; a mismatching one
    /// is a bug and fails with `CrossTenantWrite` without persisting.
    pub async fn insert(&self, mut record: S::Record) -> TenantResult<RecordId> {
        let ctx = TenantScope::require()?;
        self.stamp(&mut record, ctx.tenant_id)?;

        let id = RecordId::new();
        self.store.put(id, record).await;
        Ok(id)
    }

    /// Fetch a record visible to the ambient tenant.
    pub async fn get(&self, id: &RecordId) -> TenantResult<Option<S::Record>> {
        let ctx = TenantScope::require()?;
        Ok(self
            .store
            .fetch(id)
            .await
            .filter(|r| r.tenant_id() == Some(ctx.tenant_id)))
    }

    /// Query records. The tenant equality filter is always applied: an
    /// absent caller filter is injected, a matching one is a no-op, a
    /// mismatching one fails with `CrossTenantRead`.
    pub async fn query(&self, filter: QueryFilter) -> TenantResult<Vec<S::Record>> {
        let ctx = TenantScope::require()?;
        if let Some(requested) = filter.tenant_id {
            if requested != ctx.tenant_id {
                error!(
                    expected = %ctx.tenant_id,
                    found = %requested,
                    "cross-tenant read filter rejected"
                );
                return Err(TenantError::CrossTenantRead {
                    expected: ctx.tenant_id,
                    found: requested,
                });
            }
        }
        Ok(self.store.scan(&ctx.tenant_id).await)
    }

    /// Replace a record the ambient tenant owns. A record owned by
    /// another tenant is treated as absent. The store checks ownership
    /// atomically with the write; a concurrently deleted record stays
    /// deleted.
    pub async fn update(&self, id: &RecordId, mut record: S::Record) -> TenantResult<()> {
        let ctx = TenantScope::require()?;
        self.stamp(&mut record, ctx.tenant_id)?;

        if self.store.replace(id, record, &ctx.tenant_id).await {
            Ok(())
        } else {
            Err(TenantError::RecordNotFound)
        }
    }

    /// Delete a record the ambient tenant owns.
    pub async fn delete(&self, id: &RecordId) -> TenantResult<()> {
        let ctx = TenantScope::require()?;
        match self.store.remove(id, &ctx.tenant_id).await {
            Some(_) => Ok(()),
            None => Err(TenantError::RecordNotFound),
        }
    }

    /// Access the wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn stamp(&self, record: &mut S::Record, tenant_id: TenantId) -> TenantResult<()> {
        match record.tenant_id() {
            None => {
                record.set_tenant_id(tenant_id);
                Ok(())
            }
            Some(stamped) if stamped == tenant_id => Ok(()),
            Some(stamped) => {
                error!(
                    expected = %tenant_id,
                    found = %stamped,
                    "cross-tenant write rejected"
                );
                Err(TenantError::CrossTenantWrite {
                    expected: tenant_id,
                    found: stamped,
                })
            }
        }
    }
}

/// Session-bound tenant value for backends with native row-level
/// policies (e.g. a per-transaction `SET` on a relational connection).
pub trait PolicySession {
    /// Bind the session to a tenant.
    fn bind(&self, tenant_id: TenantId);
    /// Clear the binding.
    fn clear(&self);
    /// Currently bound tenant, if any.
    fn bound(&self) -> Option<TenantId>;
}

/// RAII binding of a policy session to the ambient tenant for one unit
/// of work. The binding is set from the same context carrier the guard
/// uses and cleared on drop, so the storage-level policy and the
/// application-level filter can never disagree.
pub struct PolicyBinding<'a, S: PolicySession> {
    session: &'a S,
}

impl<'a, S: PolicySession> PolicyBinding<'a, S> {
    /// Bind `session` to the ambient tenant.
    pub fn acquire(session: &'a S) -> TenantResult<Self> {
        let ctx = TenantScope::require()?;
        session.bind(ctx.tenant_id);
        Ok(Self { session })
    }
}

impl<S: PolicySession> Drop for PolicyBinding<'_, S> {
    fn drop(&mut self) {
        self.session.clear();
    }
}

/// Process-local policy session, usable as a test double or for embedded
/// single-node deployments.
#[derive(Default)]
pub struct LocalPolicySession {
    bound: parking_lot::Mutex<Option<TenantId>>,
}

impl LocalPolicySession {
    /// Create an unbound session.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicySession for LocalPolicySession {
    fn bind(&self, tenant_id: TenantId) {
        *self.bound.lock() = Some(tenant_id);
    }

    fn clear(&self) {
        *self.bound.lock() = None;
    }

    fn bound(&self) -> Option<TenantId> {
        *self.bound.lock()
    }
}
