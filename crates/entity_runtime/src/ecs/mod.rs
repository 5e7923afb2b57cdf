//! Entity identity, components and deferred commands
//!
//! Everything here is independent of the live scene: ids, typed component
//! decoding and the command queue that callers use to request changes.

pub mod builder;
pub mod commands;
pub mod component;
pub mod components;
pub mod entity;
pub mod registry;

pub use builder::EntityBuilder;
pub use commands::{CommandSender, EntityCommand, EntityCommandBuffer};
pub use component::{Component, ComponentCapabilities, ComponentDecoder, DecodeError, DecodedComponent, TypedDecoder};
pub use entity::EntityId;
pub use registry::ComponentRegistry;
