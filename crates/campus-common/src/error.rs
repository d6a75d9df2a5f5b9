//! Error types for OpenCampus

use crate::ids::TenantId;
use thiserror::Error;

/// OpenCampus error type.
///
/// Identification and quota errors are ordinary control-flow outcomes; the
/// isolation violations (`CrossTenantWrite`, `CrossTenantRead`,
/// `NoTenantContext`) indicate a bug and abort the unit of work.
#[derive(Error, Debug)]
pub enum TenantError {
    /// No resolvable tenant signal on a route that requires one
    #[error("no tenant identified for request")]
    TenantNotIdentified,

    /// Tenant resolved but its subscription is not usable
    #[error("tenant is inactive: {0}")]
    TenantInactive(TenantId),

    /// Tenant-scoped operation attempted outside any resolved context
    #[error("no tenant context in scope")]
    NoTenantContext,

    /// Write named a tenant other than the current context's
    #[error("cross-tenant write: context {expected}, record {found}")]
    CrossTenantWrite {
        /// Tenant of the current context
        expected: TenantId,
        /// Tenant stamped on the offending record
        found: TenantId,
    },

    /// Read filter named a tenant other than the current context's
    #[error("cross-tenant read: context {expected}, filter {found}")]
    CrossTenantRead {
        /// Tenant of the current context
        expected: TenantId,
        /// Tenant named by the caller's filter
        found: TenantId,
    },

    /// Per-tenant resource quota exhausted
    #[error("quota exceeded for {kind}: limit {limit}, current {current}")]
    QuotaExceeded {
        /// Resource kind that ran out
        kind: String,
        /// Plan-derived limit at check time
        limit: u64,
        /// Counter value at check time (excess attempt not counted)
        current: u64,
    },

    /// Tenant creation collided with an existing subdomain or custom domain
    #[error("identifier already claimed: {0}")]
    DuplicateIdentifier(String),

    /// No tenant with the given identifier
    #[error("tenant not found")]
    TenantNotFound,

    /// No visible record with the given identifier
    #[error("record not found")]
    RecordNotFound,

    /// Extension values rejected by the tenant's custom-field schema
    #[error("invalid extension field: {0}")]
    InvalidExtension(String),
}

/// Client-visible outcome class for an error.
///
/// The HTTP layer is an external collaborator; this classification is the
/// only thing the core dictates about surfacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientClass {
    /// Resource does not exist (also used for inactive tenants, to avoid
    /// existence disclosure)
    NotFound,
    /// Request could not be attributed to a tenant
    Unauthorized,
    /// Retryable after the quota window resets or the plan changes
    TooManyRequests,
    /// Identifier collision, remediable by the caller
    Conflict,
    /// Malformed input
    BadRequest,
    /// Invariant violation; never surfaced as recoverable
    Internal,
}

impl TenantError {
    /// Classify this error for the client-facing layer.
    #[must_use]
    pub fn client_class(&self) -> ClientClass {
        match self {
            Self::TenantNotIdentified => ClientClass::Unauthorized,
            Self::TenantInactive(_) | Self::TenantNotFound | Self::RecordNotFound => {
                ClientClass::NotFound
            }
            Self::QuotaExceeded { .. } => ClientClass::TooManyRequests,
            Self::DuplicateIdentifier(_) => ClientClass::Conflict,
            Self::InvalidExtension(_) => ClientClass::BadRequest,
            Self::NoTenantContext
            | Self::CrossTenantWrite { .. }
            | Self::CrossTenantRead { .. } => ClientClass::Internal,
        }
    }

    /// True for the isolation violations that must abort the unit of work.
    #[must_use]
    pub fn is_isolation_violation(&self) -> bool {
        matches!(
            self,
            Self::NoTenantContext | Self::CrossTenantWrite { .. } | Self::CrossTenantRead { .. }
        )
    }
}

/// Result type for OpenCampus
pub type TenantResult<T> = Result<T, TenantError>;
