//! OpenCampus Common - shared types for the multi-tenant education platform
//!
//! This crate provides the primitives every other crate depends on:
//! - Tenant and record identifiers
//! - Error taxonomy and result alias
//!
//! Nothing here performs I/O; the crate is the leaf of the dependency graph.

#![warn(missing_docs)]

pub mod error;
pub mod ids;

pub use error::{ClientClass, TenantError, TenantResult};
pub use ids::{RecordId, TenantId};
