//! Property tests for configuration merge semantics.

use campus_tenant::model::{TenantConfig, TenantConfigPatch};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,12}".prop_map(Value::from),
    ]
}

fn settings_strategy() -> impl Strategy<Value = HashMap<String, Value>> {
    proptest::collection::hash_map("[a-z_]{1,8}", value_strategy(), 0..8)
}

fn to_map(settings: HashMap<String, Value>) -> Map<String, Value> {
    settings.into_iter().collect()
}

proptest! {
    /// Patch keys overwrite; every key absent from the patch keeps its
    /// previous value; nothing else appears.
    #[test]
    fn merge_is_shallow_and_lossless(
        base in settings_strategy(),
        patch in settings_strategy(),
    ) {
        let mut config = TenantConfig::default();
        config.settings = to_map(base.clone());

        let update = TenantConfigPatch {
            settings: to_map(patch.clone()),
            custom_fields: None,
        };
        config.apply(update);

        for (key, value) in &patch {
            prop_assert_eq!(config.settings.get(key), Some(value));
        }
        for (key, value) in &base {
            if !patch.contains_key(key) {
                prop_assert_eq!(config.settings.get(key), Some(value));
            }
        }
        for key in config.settings.keys() {
            prop_assert!(base.contains_key(key) || patch.contains_key(key));
        }
    }

    /// Applying the same patch twice is the same as applying it once.
    #[test]
    fn merge_is_idempotent(
        base in settings_strategy(),
        patch in settings_strategy(),
    ) {
        let mut once = TenantConfig::default();
        once.settings = to_map(base.clone());
        once.apply(TenantConfigPatch { settings: to_map(patch.clone()), custom_fields: None });

        let mut twice = TenantConfig::default();
        twice.settings = to_map(base);
        twice.apply(TenantConfigPatch { settings: to_map(patch.clone()), custom_fields: None });
        twice.apply(TenantConfigPatch { settings: to_map(patch), custom_fields: None });

        prop_assert_eq!(once.settings, twice.settings);
    }
}
