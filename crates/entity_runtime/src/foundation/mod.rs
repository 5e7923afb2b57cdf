//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the runtime:
//! - Math types and the authored-rotation conversion
//! - Logging utilities

pub mod logging;
pub mod math;
