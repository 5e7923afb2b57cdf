//! Component registry
//!
//! Maps component type names to decoders. The scene graph and the physics
//! bridge both decode payloads through one shared registry; type names
//! without a decoder stay in the store untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::component::{
    Component, ComponentCapabilities, ComponentDecoder, DecodeError, DecodedComponent, TypedDecoder,
};
use super::components;

/// Registry of component decoders keyed by type name
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    decoders: HashMap<&'static str, Arc<dyn ComponentDecoder>>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in component registered
    pub fn with_builtin_components() -> Self {
        let mut registry = Self::new();
        components::register_builtin(&mut registry);
        registry
    }

    /// Register a decoder under each of its type names
    pub fn register(&mut self, decoder: impl ComponentDecoder + 'static) {
        let decoder: Arc<dyn ComponentDecoder> = Arc::new(decoder);
        for &kind in decoder.kinds() {
            if self.decoders.insert(kind, Arc::clone(&decoder)).is_some() {
                log::debug!("Replacing decoder for component type '{kind}'");
            }
        }
    }

    /// Register a compiled-in component type
    pub fn register_component<T: Component>(&mut self) {
        self.register(TypedDecoder::<T>::new());
    }

    /// Decode a payload stored under `kind`
    pub fn decode(&self, kind: &str, payload: &Value) -> Result<DecodedComponent, DecodeError> {
        self.decoders
            .get(kind)
            .ok_or_else(|| DecodeError::UnknownKind(kind.to_string()))?
            .decode(kind, payload)
    }

    /// Decode a payload stored under `T::KIND` straight into `T`
    pub fn decode_as<T: Component>(&self, payload: &Value) -> Result<T, DecodeError> {
        self.decode_kind_as(T::KIND, payload)
    }

    /// Decode a payload stored under an arbitrary type name into `T`
    pub fn decode_kind_as<T: Component>(&self, kind: &str, payload: &Value) -> Result<T, DecodeError> {
        self.decode(kind, payload)?.downcast::<T>()
    }

    /// Capability flags for a type name, if a decoder is registered
    pub fn capabilities(&self, kind: &str) -> Option<ComponentCapabilities> {
        self.decoders.get(kind).map(|decoder| decoder.capabilities())
    }

    /// Whether a decoder is registered for `kind`
    pub fn has_decoder(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Registered type names in sorted order
    pub fn registered_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.decoders.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Number of registered type names
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether no decoders are registered
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("kinds", &self.registered_kinds())
            .finish()
    }
}
