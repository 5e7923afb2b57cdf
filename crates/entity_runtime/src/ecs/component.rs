//! Component typing
//!
//! Components live in the scene store as opaque JSON payloads keyed by a
//! type name. This module defines how a payload is turned into a typed
//! value: the [`Component`] trait for compiled-in types, the object-safe
//! [`ComponentDecoder`] the registry stores per type name, and the
//! capability flags collaborators use to decide whether they care.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

bitflags::bitflags! {
    /// Capability metadata for a component type
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ComponentCapabilities: u32 {
        /// Changes to this component change what gets drawn
        const AFFECTS_RENDERING = 1 << 0;
        /// The physics bridge reads this component
        const REQUIRES_PHYSICS = 1 << 1;
        /// This component carries the entity's local transform
        const AFFECTS_TRANSFORM = 1 << 2;
        /// The payload shape is considered stable for tooling
        const STABLE = 1 << 3;
    }
}

impl ComponentCapabilities {
    /// Whether the component affects rendering
    pub const fn affects_rendering(self) -> bool {
        self.contains(Self::AFFECTS_RENDERING)
    }

    /// Whether the component is consumed by the physics bridge
    pub const fn requires_physics(self) -> bool {
        self.contains(Self::REQUIRES_PHYSICS)
    }

    /// Whether the component carries transform data
    pub const fn affects_transform(self) -> bool {
        self.contains(Self::AFFECTS_TRANSFORM)
    }

    /// Whether the payload shape is stable
    pub const fn is_stable(self) -> bool {
        self.contains(Self::STABLE)
    }
}

/// A compiled-in component type decodable from its payload
pub trait Component: DeserializeOwned + Send + Sync + 'static {
    /// Type name under which the payload is stored
    const KIND: &'static str;

    /// Additional type names accepted for the same payload shape
    const ALIASES: &'static [&'static str] = &[];

    /// Capability flags for this type
    fn capabilities() -> ComponentCapabilities;
}

/// Component decoding errors
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// No decoder is registered for the type name
    #[error("no decoder registered for component type '{0}'")]
    UnknownKind(String),

    /// The payload does not match the declared type's shape
    #[error("invalid '{kind}' payload: {source}")]
    InvalidPayload {
        /// Component type name
        kind: String,
        /// Underlying deserialization error
        source: serde_json::Error,
    },

    /// The decoded value is not of the requested Rust type
    #[error("component '{kind}' does not decode to {expected}")]
    TypeMismatch {
        /// Component type name
        kind: String,
        /// Requested Rust type
        expected: &'static str,
    },
}

/// A decoded, type-erased component value
pub struct DecodedComponent {
    kind: String,
    value: Box<dyn Any + Send + Sync>,
}

impl DecodedComponent {
    /// Wrap a typed value
    pub fn new<T: Any + Send + Sync>(kind: impl Into<String>, value: T) -> Self {
        Self {
            kind: kind.into(),
            value: Box::new(value),
        }
    }

    /// Type name the value was decoded from
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the value is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow the value as a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the value as a `T`
    pub fn downcast<T: Any>(self) -> Result<T, DecodeError> {
        let kind = self.kind;
        self.value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| DecodeError::TypeMismatch {
                kind,
                expected: std::any::type_name::<T>(),
            })
    }
}

impl fmt::Debug for DecodedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedComponent").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Encode a typed component back into its payload form
pub fn to_payload<T: Serialize>(component: &T) -> Value {
    serde_json::to_value(component).unwrap_or_else(|err| {
        log::error!("Failed to encode component payload: {err}");
        Value::Null
    })
}

/// Decode function for one or more component type names
pub trait ComponentDecoder: Send + Sync {
    /// Type names this decoder handles
    fn kinds(&self) -> &[&'static str];

    /// Capability flags shared by all handled type names
    fn capabilities(&self) -> ComponentCapabilities;

    /// Decode a payload stored under `kind`
    fn decode(&self, kind: &str, payload: &Value) -> Result<DecodedComponent, DecodeError>;
}

/// Serde-backed decoder for a compiled-in [`Component`]
pub struct TypedDecoder<T> {
    kinds: Vec<&'static str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> TypedDecoder<T> {
    /// Create a decoder for `T::KIND` and its aliases
    pub fn new() -> Self {
        let mut kinds = vec![T::KIND];
        kinds.extend_from_slice(T::ALIASES);
        Self {
            kinds,
            _marker: PhantomData,
        }
    }
}

impl<T: Component> Default for TypedDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentDecoder for TypedDecoder<T> {
    fn kinds(&self) -> &[&'static str] {
        &self.kinds
    }

    fn capabilities(&self) -> ComponentCapabilities {
        T::capabilities()
    }

    fn decode(&self, kind: &str, payload: &Value) -> Result<DecodedComponent, DecodeError> {
        let value = T::deserialize(payload).map_err(|source| DecodeError::InvalidPayload {
            kind: kind.to_string(),
            source,
        })?;
        Ok(DecodedComponent::new(kind, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_accessors() {
        let caps = ComponentCapabilities::AFFECTS_RENDERING | ComponentCapabilities::STABLE;
        assert!(caps.affects_rendering());
        assert!(caps.is_stable());
        assert!(!caps.requires_physics());
        assert!(!caps.affects_transform());
    }

    #[test]
    fn test_downcast_to_wrong_type_is_mismatch() {
        let decoded = DecodedComponent::new("Health", 42_u32);
        assert!(decoded.is::<u32>());
        assert_eq!(decoded.downcast_ref::<u32>(), Some(&42));

        let err = decoded.downcast::<String>().unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { ref kind, .. } if kind == "Health"));
    }
}
