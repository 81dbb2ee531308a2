//! Static plugin registry
//!
//! A manifest names stages by `(origin, entry)`. The registry maps each
//! pair to a factory and resolves the whole manifest once, at setup, into a
//! `ModifierPipeline`. An entry nothing is registered for is a fatal
//! configuration error; there is no silent no-op.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::pipeline::modifier::ModifierPipeline;
use crate::pipeline::stage::ProbabilityStage;
use crate::pipeline::stages;

/// Origin under which the crate's own stages are registered
pub const BUILTIN_ORIGIN: &str = "builtin";

/// One manifest record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Display name, used in logs
    pub name: String,
    /// Where the entry point lives (module / library id)
    pub origin: String,
    /// Entry point within the origin
    pub entry: String,
    /// Stage-specific parameters
    #[serde(default)]
    pub params: toml::Table,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>, origin: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            entry: entry.into(),
            params: toml::Table::new(),
        }
    }

    pub fn with_params(mut self, params: toml::Table) -> Self {
        self.params = params;
        self
    }

    /// Deserialize `params` into a stage's parameter struct
    pub fn params_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        toml::Value::Table(self.params.clone())
            .try_into()
            .map_err(|e: toml::de::Error| {
                SimError::InvalidConfig(format!("plugin '{}': {}", self.name, e.message()))
            })
    }
}

/// Builds a stage from its manifest record and the run configuration
pub type StageFactory = fn(&PluginSpec, &SimulationConfig) -> Result<Box<dyn ProbabilityStage>>;

/// `(origin, entry)` → factory
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: BTreeMap<(String, String), StageFactory>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries()).finish()
    }
}

impl PluginRegistry {
    /// An empty registry (no built-ins)
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the crate's built-in stages
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(BUILTIN_ORIGIN, stages::IDENTITY, stages::identity::build);
        registry.register(BUILTIN_ORIGIN, stages::VALUE_BOOST, stages::value_boost::build);
        registry.register(BUILTIN_ORIGIN, stages::STATE_NUDGE, stages::state_nudge::build);
        registry
    }

    /// Register (or replace) a factory
    pub fn register(&mut self, origin: &str, entry: &str, factory: StageFactory) {
        self.factories
            .insert((origin.to_string(), entry.to_string()), factory);
    }

    pub fn contains(&self, origin: &str, entry: &str) -> bool {
        self.factories
            .contains_key(&(origin.to_string(), entry.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.factories.keys().map(|(o, e)| (o.as_str(), e.as_str()))
    }

    /// Resolve one manifest record
    pub fn resolve(&self, spec: &PluginSpec, config: &SimulationConfig) -> Result<Box<dyn ProbabilityStage>> {
        let factory = self
            .factories
            .get(&(spec.origin.clone(), spec.entry.clone()))
            .ok_or_else(|| SimError::UnresolvedPlugin {
                name: spec.name.clone(),
                origin: spec.origin.clone(),
                entry: spec.entry.clone(),
            })?;
        factory(spec, config)
    }

    /// Resolve a whole manifest, in order, into a pipeline
    pub fn build_pipeline(&self, specs: &[PluginSpec], config: &SimulationConfig) -> Result<ModifierPipeline> {
        let mut pipeline = ModifierPipeline::new();
        for spec in specs {
            pipeline.push(self.resolve(spec, config)?);
        }
        info!(stages = ?pipeline.stage_names(), "pipeline resolved");
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.contains(BUILTIN_ORIGIN, stages::VALUE_BOOST));
        assert!(registry.contains(BUILTIN_ORIGIN, stages::STATE_NUDGE));
        assert!(registry.contains(BUILTIN_ORIGIN, stages::IDENTITY));
        assert_eq!(registry.entries().count(), 3);
    }

    #[test]
    fn test_manifest_order_is_kept() {
        let registry = PluginRegistry::with_builtins();
        let specs = vec![
            PluginSpec::new("first", BUILTIN_ORIGIN, stages::IDENTITY),
            PluginSpec::new("second", BUILTIN_ORIGIN, stages::VALUE_BOOST),
        ];
        let pipeline = registry
            .build_pipeline(&specs, &SimulationConfig::default())
            .unwrap();
        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);
    }

    #[test]
    fn test_unknown_entry_is_fatal() {
        let registry = PluginRegistry::with_builtins();
        let specs = vec![PluginSpec::new("mystery", "plugins.elements_of_value", "evaluate")];
        let err = registry
            .build_pipeline(&specs, &SimulationConfig::default())
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, SimError::UnresolvedPlugin { ref name, .. } if name == "mystery"));
    }

    #[test]
    fn test_custom_registration() {
        fn build(spec: &PluginSpec, _config: &SimulationConfig) -> Result<Box<dyn ProbabilityStage>> {
            stages::identity::build(spec, _config)
        }

        let mut registry = PluginRegistry::new();
        assert!(!registry.contains("acme", "noop"));
        registry.register("acme", "noop", build);
        let stage = registry
            .resolve(&PluginSpec::new("n", "acme", "noop"), &SimulationConfig::default())
            .unwrap();
        assert_eq!(stage.name(), "n");
    }

    #[test]
    fn test_bad_params_rejected() {
        let registry = PluginRegistry::with_builtins();
        let mut params = toml::Table::new();
        params.insert("adjustment".into(), toml::Value::String("lots".into()));
        let spec = PluginSpec::new("nudge", BUILTIN_ORIGIN, stages::STATE_NUDGE).with_params(params);
        assert!(registry.resolve(&spec, &SimulationConfig::default()).is_err());
    }
}
