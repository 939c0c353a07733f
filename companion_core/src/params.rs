//! Live parameter registry (§4.9).
//!
//! The schema (`&'static [ParamSpec]`) is fixed at startup. Values live in
//! an [`ArcSwap`] snapshot so the control loop's per-tick reads never take a
//! lock; the single writer is the API task handling `PUT /params`, which
//! validates a whole batch against the schema before swapping in a new
//! snapshot atomically.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use companion_common::param::{validate_batch, BatchError, ParamError, ParamSpec, ParamValue};
use serde::Deserialize;
use thiserror::Error;

/// Error loading the parameter schema from disk at startup.
#[derive(Debug, Error)]
pub enum ParamsLoadError {
    #[error("failed to read parameter schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse parameter schema: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct ParamSchemaFile {
    #[serde(rename = "param")]
    params: Vec<ParamSpec>,
}

/// Load the `&'static [ParamSpec]` schema a [`ParamRegistry`] is built
/// from, out of the TOML file named by `CoreConfig::params_path`.
///
/// The schema is fixed for the life of the process — `Box::leak` turns the
/// file's freshly-parsed, owned data into the `'static` borrows
/// `ParamRegistry` and every `ParamSpec::key` field expect, the same way a
/// `&'static [ParamSpec]` literal would already be `'static` at compile
/// time. Called once, at startup, by `companion_supervisor`.
pub fn load_schema(path: &Path) -> Result<&'static [ParamSpec], ParamsLoadError> {
    let content = std::fs::read_to_string(path)?;
    let leaked_content: &'static str = Box::leak(content.into_boxed_str());
    let file: ParamSchemaFile = toml::from_str(leaked_content)?;
    Ok(Box::leak(file.params.into_boxed_slice()))
}

/// A fully-resolved set of current parameter values, one entry per spec key.
#[derive(Debug, Clone, Default)]
pub struct ParamSnapshot {
    values: BTreeMap<String, ParamValue>,
}

impl ParamSnapshot {
    fn from_defaults(specs: &[ParamSpec]) -> Self {
        let values = specs
            .iter()
            .map(|spec| (spec.key.to_string(), spec.default.clone()))
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A reflex-bound parameter that changed value in the most recent update,
/// queued for the control loop to forward as a `SET_CONFIG` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflexConfigUpdate {
    pub param_id: u8,
    pub value: u32,
}

/// The schema plus its live value snapshot.
pub struct ParamRegistry {
    specs: &'static [ParamSpec],
    snapshot: ArcSwap<ParamSnapshot>,
}

impl ParamRegistry {
    /// Build a registry at its schema's defaults.
    pub fn new(specs: &'static [ParamSpec]) -> Self {
        let snapshot = ParamSnapshot::from_defaults(specs);
        Self {
            specs,
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Lock-free read of the current snapshot. Cheap to call every tick.
    pub fn load(&self) -> Arc<ParamSnapshot> {
        self.snapshot.load_full()
    }

    pub fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    /// Apply a batch update atomically: either every key validates against
    /// the schema and the whole batch is applied, or none are.
    ///
    /// Returns the reflex-bound keys whose value actually changed, in spec
    /// order, for the caller to forward as `SET_CONFIG` commands.
    pub fn update(
        &self,
        batch: &BTreeMap<String, ParamValue>,
    ) -> Result<Vec<ReflexConfigUpdate>, BatchError> {
        validate_batch(self.specs, batch)?;

        let current = self.snapshot.load();
        let mut next = (**current).clone();
        let mut changed = Vec::new();

        for (key, value) in batch {
            if current.get(key) != Some(value) {
                if let Some(spec) = self.specs.iter().find(|s| s.key == key) {
                    if let Some(binding) = spec.reflex_binding {
                        if let Some(wire_value) = encode_for_wire(value) {
                            changed.push(ReflexConfigUpdate {
                                param_id: binding.param_id,
                                value: wire_value,
                            });
                        }
                    }
                }
            }
            next.values.insert(key.clone(), value.clone());
        }

        self.snapshot.store(Arc::new(next));
        Ok(changed)
    }

    /// Reject a batch containing a non-hot-reloadable key outside startup.
    /// Called by the API task before [`Self::update`] for live (post-boot)
    /// requests; a config-file-driven initial load bypasses this check.
    pub fn check_hot_reloadable(
        &self,
        batch: &BTreeMap<String, ParamValue>,
    ) -> Result<(), BatchError> {
        let mut errors = BTreeMap::new();
        for key in batch.keys() {
            if let Some(spec) = self.specs.iter().find(|s| s.key == key) {
                if !spec.hot_reload {
                    errors.insert(key.clone(), ParamError::NotHotReloadable);
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BatchError { errors })
        }
    }
}

fn encode_for_wire(value: &ParamValue) -> Option<u32> {
    match value {
        ParamValue::Bool(b) => Some(*b as u32),
        ParamValue::I32(v) => Some(*v as u32),
        ParamValue::F32(v) => Some(v.to_bits()),
        ParamValue::Enum(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_schema_parses_a_params_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[param]]
            key = "reflex.max_v_mm_s"
            min = 0
            max = 600
            default = 300
            hot_reload = true

            [param.param_type]
            type = "i32"

            [param.reflex_binding]
            param_id = 1
            "#
        )
        .unwrap();
        let specs = load_schema(file.path()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].key, "reflex.max_v_mm_s");
        assert_eq!(specs[0].default, ParamValue::I32(300));
    }

    #[test]
    fn load_schema_missing_file_is_an_error() {
        let result = load_schema(Path::new("/nonexistent/params.toml"));
        assert!(matches!(result, Err(ParamsLoadError::Io(_))));
    }

    use companion_common::param::{ParamType, ReflexBinding};

    static SPECS: &[ParamSpec] = &[
        ParamSpec {
            key: "reflex.max_v_mm_s",
            param_type: ParamType::I32,
            default: ParamValue::I32(300),
            min: Some(ParamValue::I32(0)),
            max: Some(ParamValue::I32(600)),
            hot_reload: true,
            reflex_binding: Some(ReflexBinding { param_id: 1 }),
        },
        ParamSpec {
            key: "safety.stop_mm",
            param_type: ParamType::I32,
            default: ParamValue::I32(250),
            min: Some(ParamValue::I32(0)),
            max: None,
            hot_reload: false,
            reflex_binding: None,
        },
    ];

    #[test]
    fn loads_defaults_on_construction() {
        let registry = ParamRegistry::new(SPECS);
        let snapshot = registry.load();
        assert_eq!(snapshot.get("reflex.max_v_mm_s"), Some(&ParamValue::I32(300)));
    }

    #[test]
    fn valid_update_changes_snapshot_and_emits_reflex_binding() {
        let registry = ParamRegistry::new(SPECS);
        let mut batch = BTreeMap::new();
        batch.insert("reflex.max_v_mm_s".to_string(), ParamValue::I32(400));
        let changed = registry.update(&batch).unwrap();
        assert_eq!(changed, vec![ReflexConfigUpdate { param_id: 1, value: 400 }]);
        assert_eq!(
            registry.load().get("reflex.max_v_mm_s"),
            Some(&ParamValue::I32(400))
        );
    }

    #[test]
    fn invalid_batch_leaves_snapshot_untouched() {
        let registry = ParamRegistry::new(SPECS);
        let mut batch = BTreeMap::new();
        batch.insert("reflex.max_v_mm_s".to_string(), ParamValue::I32(9999));
        assert!(registry.update(&batch).is_err());
        assert_eq!(
            registry.load().get("reflex.max_v_mm_s"),
            Some(&ParamValue::I32(300))
        );
    }

    #[test]
    fn unchanged_value_does_not_emit_reflex_update() {
        let registry = ParamRegistry::new(SPECS);
        let mut batch = BTreeMap::new();
        batch.insert("reflex.max_v_mm_s".to_string(), ParamValue::I32(300));
        let changed = registry.update(&batch).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn non_hot_reloadable_key_rejected_for_live_updates() {
        let registry = ParamRegistry::new(SPECS);
        let mut batch = BTreeMap::new();
        batch.insert("safety.stop_mm".to_string(), ParamValue::I32(200));
        assert!(registry.check_hot_reloadable(&batch).is_err());
    }
}
