//! gres-opencl: OpenCL generic resource plugin
//!
//! This crate exposes OpenCL devices configured on a node to jobs and steps:
//! - Device inventory built once from configuration entries
//! - Projection of allocation bitmaps onto `OPENCL_VISIBLE_DEVICES`
//! - Inventory handoff to the step launcher process

pub mod context;
pub mod plugin;
pub mod projector;
pub mod traits;
pub mod transport;

pub use context::{GresContext, JobContext, StepContext};
pub use plugin::OpenClPlugin;
pub use projector::{project, Projection, ProjectionMode, VISIBLE_DEVICES_VAR};
pub use traits::GresPlugin;
