//! Resource Accounting
//!
//! Tracks per-tenant consumption against plan-derived quotas and rejects
//! operations that would exceed them. The check-then-increment is one
//! atomic step per (tenant, resource, window) key: the counter entry is
//! held under its shard lock for the whole decision, so concurrent
//! callers can never jointly pass the limit.
//!
//! Limits are read from the Tenant Directory at check time, so a plan
//! change applies on the very next check. If a unit of work is cancelled
//! after incrementing, the counter is not rolled back: accounting favors
//! over-counting over quota evasion.

use crate::directory::TenantDirectory;
use crate::model::ResourceQuotas;
use campus_common::{TenantError, TenantId, TenantResult};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Share of the plan limit a `Limited` tenant keeps
const LIMITED_DIVISOR: u64 = 10;

/// Accounted resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Accounted API calls, per UTC day
    ApiCalls,
    /// Stored bytes; cumulative, decremented on delete
    StorageBytes,
    /// Staff and student seats; cumulative
    Seats,
}

impl ResourceKind {
    /// Stable name, used in errors and exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiCalls => "api_calls",
            Self::StorageBytes => "storage_bytes",
            Self::Seats => "seats",
        }
    }

    fn limit(&self, quotas: &ResourceQuotas) -> u64 {
        match self {
            Self::ApiCalls => quotas.api_calls_per_day,
            Self::StorageBytes => quotas.storage_bytes,
            Self::Seats => quotas.max_seats,
        }
    }

    fn window_at(&self, now: DateTime<Utc>) -> Window {
        match self {
            Self::ApiCalls => Window::Day(now.date_naive()),
            Self::StorageBytes | Self::Seats => Window::Lifetime,
        }
    }

    fn is_cumulative(&self) -> bool {
        matches!(self, Self::StorageBytes | Self::Seats)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accounting window of a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    /// One UTC calendar day; expires at day end
    Day(NaiveDate),
    /// No expiry; persists until decremented
    Lifetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CounterKey {
    tenant_id: TenantId,
    kind: ResourceKind,
    window: Window,
}

/// Outcome of a successful quota check
#[derive(Debug, Clone, Copy)]
pub struct UsageGrant {
    /// Resource that was charged
    pub kind: ResourceKind,
    /// Limit in effect at check time
    pub limit: u64,
    /// Counter value after the increment
    pub current: u64,
}

/// One live counter, as exported for metering
#[derive(Debug, Clone, Copy)]
pub struct CounterEntry {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Resource kind
    pub kind: ResourceKind,
    /// Window start for windowed counters, `None` for cumulative ones
    pub window_start: Option<NaiveDate>,
    /// Counter value
    pub value: u64,
}

/// Per-tenant usage counters and quota enforcement
pub struct ResourceAccounting {
    directory: Arc<TenantDirectory>,
    counters: DashMap<CounterKey, u64>,
}

impl ResourceAccounting {
    /// Create an accounting layer over the given directory.
    pub fn new(directory: Arc<TenantDirectory>) -> Self {
        Self {
            directory,
            counters: DashMap::new(),
        }
    }

    /// Atomically check the quota and charge `amount` against it.
    ///
    /// On `QuotaExceeded` the counter is untouched; the attempted
    /// operation is not counted.
    pub fn check_and_increment(
        &self,
        tenant_id: &TenantId,
        kind: ResourceKind,
        amount: u64,
    ) -> TenantResult<UsageGrant> {
        self.check_and_increment_at(tenant_id, kind, amount, Utc::now())
    }

    /// Clock-injected variant of [`Self::check_and_increment`].
    pub fn check_and_increment_at(
        &self,
        tenant_id: &TenantId,
        kind: ResourceKind,
        amount: u64,
        now: DateTime<Utc>,
    ) -> TenantResult<UsageGrant> {
        let tenant = self
            .directory
            .lookup(tenant_id)
            .ok_or(TenantError::TenantNotFound)?;

        let mut limit = kind.limit(&tenant.quotas);
        if tenant.status.is_limited() {
            limit = (limit / LIMITED_DIVISOR).max(1);
        }

        let key = CounterKey {
            tenant_id: *tenant_id,
            kind,
            window: kind.window_at(now),
        };

        // The entry guard holds the shard lock: check and increment are
        // one step for this key.
        let mut entry = self.counters.entry(key).or_insert(0);
        let current = *entry;
        if current.saturating_add(amount) > limit {
            drop(entry);
            debug!(tenant = %tenant_id, kind = %kind, limit, current, "quota exceeded");
            return Err(TenantError::QuotaExceeded {
                kind: kind.as_str().to_string(),
                limit,
                current,
            });
        }
        *entry += amount;
        let charged = *entry;
        drop(entry);

        Ok(UsageGrant {
            kind,
            limit,
            current: charged,
        })
    }

    /// Return previously charged usage for a cumulative resource (e.g.
    /// storage freed by a delete). Windowed counters are never rolled
    /// back.
    pub fn release(&self, tenant_id: &TenantId, kind: ResourceKind, amount: u64) {
        if !kind.is_cumulative() {
            return;
        }
        let key = CounterKey {
            tenant_id: *tenant_id,
            kind,
            window: Window::Lifetime,
        };
        if let Some(mut entry) = self.counters.get_mut(&key) {
            *entry = entry.saturating_sub(amount);
        }
    }

    /// Current counter value for the active window.
    pub fn usage(&self, tenant_id: &TenantId, kind: ResourceKind) -> u64 {
        self.usage_at(tenant_id, kind, Utc::now())
    }

    /// Clock-injected variant of [`Self::usage`].
    pub fn usage_at(&self, tenant_id: &TenantId, kind: ResourceKind, now: DateTime<Utc>) -> u64 {
        let key = CounterKey {
            tenant_id: *tenant_id,
            kind,
            window: kind.window_at(now),
        };
        self.counters.get(&key).map(|e| *e).unwrap_or(0)
    }

    /// Drop counters whose window has ended. Expired windowed counters
    /// are already unreachable through [`Self::usage`]; this reclaims
    /// their memory.
    pub fn purge_expired(&self, now: DateTime<Utc>) {
        let today = now.date_naive();
        self.counters.retain(|key, _| match key.window {
            Window::Lifetime => true,
            Window::Day(day) => day >= today,
        });
    }

    /// Snapshot of every live counter, for the metering export.
    pub fn snapshot_entries(&self) -> Vec<CounterEntry> {
        self.counters
            .iter()
            .map(|entry| {
                let key = entry.key();
                CounterEntry {
                    tenant_id: key.tenant_id,
                    kind: key.kind,
                    window_start: match key.window {
                        Window::Day(day) => Some(day),
                        Window::Lifetime => None,
                    },
                    value: *entry.value(),
                }
            })
            .collect()
    }
}
