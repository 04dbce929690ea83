//! Name → constructor table for layers.
//!
//! Nothing registers itself. The host builds a registry during setup,
//! usually with [`LayerRegistry::with_builtin_layers`], and may add its own
//! layer types before creating layers from definitions.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::LayerConfig;
use crate::error::{LayerError, LayerResult};
use crate::layers::{reshape_volume, Layer};
use crate::tensor::Element;

/// Builds a layer from its definition.
pub type LayerCreator<T> = fn(LayerConfig) -> LayerResult<Box<dyn Layer<T>>>;

pub struct LayerRegistry<T: Element> {
    creators: BTreeMap<String, LayerCreator<T>>,
}

impl<T: Element> Default for LayerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> LayerRegistry<T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            creators: BTreeMap::new(),
        }
    }

    /// A registry holding every layer type this crate provides.
    pub fn with_builtin_layers() -> Self {
        let mut registry = Self::new();
        // fresh table, the name is free
        let _ = registry.register(reshape_volume::LAYER_TYPE, reshape_volume::create::<T>);
        registry
    }

    /// Register `creator` under `layer_type`. A name can be registered once.
    pub fn register(&mut self, layer_type: &str, creator: LayerCreator<T>) -> LayerResult<()> {
        if self.creators.contains_key(layer_type) {
            return Err(LayerError::DuplicateLayerType(layer_type.to_owned()));
        }
        debug!(layer_type, "registered layer type");
        self.creators.insert(layer_type.to_owned(), creator);
        Ok(())
    }

    pub fn contains(&self, layer_type: &str) -> bool {
        self.creators.contains_key(layer_type)
    }

    /// Registered type names in sorted order.
    pub fn layer_types(&self) -> Vec<&str> {
        self.creators.keys().map(String::as_str).collect()
    }

    /// Create the layer `config` names and validate its blob wiring, if any.
    pub fn create(&self, config: &LayerConfig) -> LayerResult<Box<dyn Layer<T>>> {
        let creator = self
            .creators
            .get(&config.layer_type)
            .ok_or_else(|| LayerError::UnknownLayerType(config.layer_type.clone()))?;

        let layer = creator(config.clone())?;
        if !config.bottom.is_empty() || !config.top.is_empty() {
            let bottom: Vec<&str> = config.bottom.iter().map(String::as_str).collect();
            let top: Vec<&str> = config.top.iter().map(String::as_str).collect();
            layer.setup(&bottom, &top)?;
        }
        debug!(name = %config.name, layer_type = %config.layer_type, device = %config.device, "created layer");
        Ok(layer)
    }
}
