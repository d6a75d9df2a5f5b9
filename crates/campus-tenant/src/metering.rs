//! Usage Metering Export
//!
//! Read-only snapshots of the live usage counters, in the shape the
//! billing collaborator consumes. No billing logic lives here.

use crate::accounting::{ResourceAccounting, ResourceKind};
use campus_common::TenantId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One exported counter value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Resource kind
    pub kind: ResourceKind,
    /// Counter value at snapshot time
    pub value: u64,
    /// Window start for windowed counters, `None` for cumulative ones
    pub window_start: Option<NaiveDate>,
    /// Snapshot timestamp
    pub taken_at: DateTime<Utc>,
}

/// Point-in-time export of all live counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Snapshot timestamp
    pub taken_at: DateTime<Utc>,
    /// Exported counters
    pub records: Vec<UsageRecord>,
}

impl UsageSnapshot {
    /// Capture every live counter.
    pub fn capture(accounting: &ResourceAccounting) -> Self {
        Self::capture_at(accounting, Utc::now())
    }

    /// Clock-injected variant of [`Self::capture`].
    pub fn capture_at(accounting: &ResourceAccounting, taken_at: DateTime<Utc>) -> Self {
        let records = accounting
            .snapshot_entries()
            .into_iter()
            .map(|entry| UsageRecord {
                tenant_id: entry.tenant_id,
                kind: entry.kind,
                value: entry.value,
                window_start: entry.window_start,
                taken_at,
            })
            .collect();
        Self { taken_at, records }
    }

    /// Records belonging to one tenant.
    pub fn for_tenant(&self, tenant_id: &TenantId) -> Vec<&UsageRecord> {
        self.records
            .iter()
            .filter(|r| r.tenant_id == *tenant_id)
            .collect()
    }

    /// Summed value for one tenant and kind across windows.
    pub fn total(&self, tenant_id: &TenantId, kind: ResourceKind) -> u64 {
        self.records
            .iter()
            .filter(|r| r.tenant_id == *tenant_id && r.kind == kind)
            .map(|r| r.value)
            .sum()
    }
}
