//! Tenant Data Model

use campus_common::{TenantError, TenantId, TenantResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Tenant definition - one institution on the shared platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant ID (immutable)
    pub id: TenantId,
    /// Display name of the institution
    pub name: String,
    /// Subdomain on the platform base domain, unique across all tenants
    pub subdomain: String,
    /// Optional branded domain, unique across all tenants
    pub custom_domain: Option<String>,
    /// Lifecycle status
    pub status: TenantStatus,
    /// Subscription plan
    pub plan: PlanTier,
    /// Resource quotas derived from the plan
    pub quotas: ResourceQuotas,
    /// Per-tenant configuration
    pub config: TenantConfig,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a new tenant on the given plan, starting in trial.
    pub fn new(name: &str, subdomain: &str, plan: PlanTier) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name: name.to_string(),
            subdomain: subdomain.to_ascii_lowercase(),
            custom_domain: None,
            status: TenantStatus::Trial,
            plan,
            quotas: ResourceQuotas::for_tier(plan),
            config: TenantConfig::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if feature is enabled for this plan
    pub fn has_feature(&self, feature: &str) -> bool {
        self.plan.features().contains(&feature)
    }
}

/// Tenant lifecycle status.
///
/// Tenants are never hard-deleted; `Inactive` is the terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    /// Evaluating, full plan quotas
    Trial,
    /// Paying, full plan quotas
    Active,
    /// Past-due or flagged, stricter quotas apply
    Limited,
    /// Cancelled; resolution refuses access
    Inactive,
}

impl TenantStatus {
    /// True if requests for this tenant may proceed at all
    pub fn allows_access(&self) -> bool {
        !matches!(self, Self::Inactive)
    }

    /// True if downstream quota logic must apply stricter limits
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited)
    }
}

/// Subscription plan tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Basic,
    Premium,
    Enterprise,
}

impl PlanTier {
    /// Get features for tier
    pub fn features(&self) -> Vec<&'static str> {
        match self {
            Self::Basic => vec!["student_records", "course_catalog", "attendance"],
            Self::Premium => vec![
                "student_records",
                "course_catalog",
                "attendance",
                "online_payments",
                "sms_notifications",
                "report_exports",
            ],
            Self::Enterprise => vec![
                "student_records",
                "course_catalog",
                "attendance",
                "online_payments",
                "sms_notifications",
                "report_exports",
                "custom_domain",
                "api_access",
                "sso",
                "dedicated_support",
            ],
        }
    }
}

/// Plan-derived resource quotas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceQuotas {
    /// Accounted API calls per UTC day
    pub api_calls_per_day: u64,
    /// Stored bytes (documents, uploads)
    pub storage_bytes: u64,
    /// Staff and student seats
    pub max_seats: u64,
}

impl ResourceQuotas {
    /// Get quotas for tier
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Basic => Self {
                api_calls_per_day: 10_000,
                storage_bytes: 5 * 1024 * 1024 * 1024, // 5 GB
                max_seats: 500,
            },
            PlanTier::Premium => Self {
                api_calls_per_day: 100_000,
                storage_bytes: 100 * 1024 * 1024 * 1024, // 100 GB
                max_seats: 5_000,
            },
            PlanTier::Enterprise => Self {
                api_calls_per_day: 1_000_000,
                storage_bytes: 1024 * 1024 * 1024 * 1024, // 1 TB
                max_seats: 100_000,
            },
        }
    }
}

/// Per-tenant configuration: a free-form settings blob plus the typed
/// schema that entity extension fields are validated against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Branding, feature flags, arbitrary settings
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Custom-field schema: entity extension maps must conform to this
    #[serde(default)]
    pub custom_fields: HashMap<String, FieldType>,
}

impl TenantConfig {
    /// Apply a partial update. Settings keys in the patch overwrite,
    /// unspecified keys are preserved; the custom-field schema is replaced
    /// only when the patch carries one.
    pub fn apply(&mut self, patch: TenantConfigPatch) {
        for (key, value) in patch.settings {
            self.settings.insert(key, value);
        }
        if let Some(schema) = patch.custom_fields {
            self.custom_fields = schema;
        }
    }

    /// Validate an entity's extension map against the custom-field schema.
    pub fn validate_extensions(&self, values: &HashMap<String, Value>) -> TenantResult<()> {
        for (name, value) in values {
            let field_type = self
                .custom_fields
                .get(name)
                .ok_or_else(|| TenantError::InvalidExtension(format!("unknown field `{name}`")))?;
            if !field_type.accepts(value) {
                return Err(TenantError::InvalidExtension(format!(
                    "field `{name}` expects {field_type:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Partial configuration update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantConfigPatch {
    /// Settings keys to overwrite
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Replacement custom-field schema, if any
    #[serde(default)]
    pub custom_fields: Option<HashMap<String, FieldType>>,
}

/// Type of a custom extension field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    /// ISO date, `YYYY-MM-DD`
    Date,
}

impl FieldType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Date => value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tenant_creation() {
        let tenant = Tenant::new("Acme Academy", "Acme", PlanTier::Enterprise);

        assert_eq!(tenant.name, "Acme Academy");
        assert_eq!(tenant.subdomain, "acme");
        assert_eq!(tenant.status, TenantStatus::Trial);
        assert!(tenant.has_feature("sso"));
        assert!(tenant.has_feature("online_payments"));
    }

    #[test]
    fn test_tier_quotas() {
        let basic = ResourceQuotas::for_tier(PlanTier::Basic);
        let enterprise = ResourceQuotas::for_tier(PlanTier::Enterprise);

        assert!(enterprise.api_calls_per_day > basic.api_calls_per_day);
        assert!(enterprise.max_seats > basic.max_seats);
    }

    #[test]
    fn test_status_access() {
        assert!(TenantStatus::Trial.allows_access());
        assert!(TenantStatus::Limited.allows_access());
        assert!(TenantStatus::Limited.is_limited());
        assert!(!TenantStatus::Inactive.allows_access());
    }

    #[test]
    fn test_config_merge_preserves_unspecified_keys() {
        let mut config = TenantConfig::default();
        config.settings.insert("logo_url".into(), json!("https://a/logo.png"));
        config.settings.insert("locale".into(), json!("en-GB"));

        let mut patch = TenantConfigPatch::default();
        patch.settings.insert("locale".into(), json!("tr-TR"));
        config.apply(patch);

        assert_eq!(config.settings["locale"], json!("tr-TR"));
        assert_eq!(config.settings["logo_url"], json!("https://a/logo.png"));
    }

    #[test]
    fn test_extension_validation() {
        let mut config = TenantConfig::default();
        config.custom_fields.insert("guardian_phone".into(), FieldType::Text);
        config.custom_fields.insert("enrollment_date".into(), FieldType::Date);

        let mut values = HashMap::new();
        values.insert("guardian_phone".into(), json!("+90 555 000 0000"));
        values.insert("enrollment_date".into(), json!("2026-09-01"));
        assert!(config.validate_extensions(&values).is_ok());

        values.insert("enrollment_date".into(), json!("next week"));
        assert!(matches!(
            config.validate_extensions(&values),
            Err(TenantError::InvalidExtension(_))
        ));

        let mut unknown = HashMap::new();
        unknown.insert("shoe_size".into(), json!(42));
        assert!(config.validate_extensions(&unknown).is_err());
    }
}
