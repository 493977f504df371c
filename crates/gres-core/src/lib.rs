//! gres-core: Core types for generic resource device accounting
//!
//! This crate provides the fundamental types used by gres plugins:
//! - Device records and the ordered inventory
//! - The device identifier grammar
//! - Allocation bitmaps
//! - Job/step environment state
//! - Configuration types
//! - Error handling

pub mod bitmap;
pub mod config;
pub mod device;
pub mod env;
pub mod error;
pub mod identifier;

pub use bitmap::*;
pub use config::*;
pub use device::*;
pub use env::*;
pub use error::*;
pub use identifier::{Identifier, MAX_RANGE};
