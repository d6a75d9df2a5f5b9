//! Multi-Tenant Isolation Core
//!
//! Tenant resolution, request-scoped context, guarded data access, and
//! quota accounting for the OpenCampus education platform.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                   MULTI-TENANT ISOLATION CORE                    │
//! │                                                                  │
//! │   inbound request                                                │
//! │        │                                                         │
//! │  ┌─────▼──────────┐    ┌──────────────────┐                      │
//! │  │ TENANT RESOLVER│───▶│ TENANT DIRECTORY │ subdomain / domain / │
//! │  └─────┬──────────┘    └──────────────────┘ id, status, config   │
//! │        │ TenantContext                                           │
//! │  ┌─────▼──────────┐                                              │
//! │  │ TENANT SCOPE   │  task-local, follows the request across      │
//! │  └─────┬──────────┘  every suspension point                      │
//! │        │                                                         │
//! │  ┌─────▼──────────┐    ┌──────────────────────┐                  │
//! │  │ TENANT GUARD   │    │ RESOURCE ACCOUNTING  │                  │
//! │  │ stamp writes   │    │ atomic check + incr  │                  │
//! │  │ filter reads   │    │ per (tenant, window) │                  │
//! │  └────────────────┘    └──────────────────────┘                  │
//! │   every storage call re-validates the tenant | no default tenant │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod accounting;
pub mod context;
pub mod directory;
pub mod guard;
pub mod metering;
pub mod model;
pub mod resolver;

pub use accounting::{ResourceAccounting, ResourceKind, UsageGrant};
pub use context::{TenantContext, TenantScope};
pub use directory::{NewTenant, TenantDirectory};
pub use guard::{MemoryStore, PolicyBinding, PolicySession, QueryFilter, TenantGuard, TenantOwned};
pub use model::{PlanTier, ResourceQuotas, Tenant, TenantStatus};
pub use resolver::{RequestSignals, ResolverConfig, RouteClass, TenantResolver};

pub use campus_common::{ClientClass, TenantError, TenantId, TenantResult};
