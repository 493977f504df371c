//! Generic resource plugin trait definitions

use gres_core::{
    AllocationBitmap, EnvSession, EnvironmentState, GresConfEntry, GresError, GresResult,
    Inventory,
};
use std::io::{Read, Write};

use crate::context::{JobContext, StepContext};

/// Summary of an inventory build
#[derive(Debug, Default)]
pub struct LoadReport {
    /// The inventory existed already and nothing was processed
    pub already_loaded: bool,
    /// Devices added by this call
    pub devices_added: usize,
    /// Entries that belong to other resource kinds or are incomplete
    pub entries_skipped: usize,
    /// Entries whose identifier could not be parsed
    pub errors: Vec<GresError>,
}

/// Job data that can be queried from a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobDataType {
    /// Number of allocated devices
    Count,
    /// Allocation bitmap
    Bitmap,
}

/// Step data that can be queried from a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDataType {
    /// Number of allocated devices
    Count,
    /// Allocation bitmap
    Bitmap,
}

/// Value returned by an info query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GresInfo {
    Count(u64),
    Bitmap(AllocationBitmap),
}

/// Plugin interface shared by all generic resource kinds
pub trait GresPlugin {
    /// Human-readable plugin name
    fn plugin_name(&self) -> &'static str;

    /// Plugin type, `gres/<name>`
    fn plugin_type(&self) -> &'static str;

    /// Resource name matched against configuration entries
    fn gres_name(&self) -> &'static str;

    /// Build the device inventory from configuration entries
    fn node_config_load(&mut self, entries: &[GresConfEntry]) -> GresResult<LoadReport>;

    /// Export the devices allocated to a job on one node
    fn job_set_env(&self, env: &mut EnvironmentState, job: &JobContext, node_index: usize);

    /// Export the devices allocated to a step
    fn step_set_env(
        &self,
        env: &mut EnvironmentState,
        step: &StepContext,
        session: &mut EnvSession,
    );

    /// Re-export the devices of a step restricted to the usable subset
    fn step_reset_env(
        &self,
        env: &mut EnvironmentState,
        step: &StepContext,
        usable: Option<&AllocationBitmap>,
        session: &mut EnvSession,
    );

    /// Send the inventory to a step launcher
    fn send_stepd(&self, writer: &mut dyn Write) -> GresResult<()>;

    /// Replace the inventory with one sent by the parent process
    fn recv_stepd(&mut self, reader: &mut dyn Read) -> GresResult<()>;

    /// Query job allocation data
    fn job_info(
        &self,
        job: &JobContext,
        node_index: usize,
        data_type: JobDataType,
    ) -> GresResult<GresInfo>;

    /// Query step allocation data
    fn step_info(
        &self,
        step: &StepContext,
        node_index: usize,
        data_type: StepDataType,
    ) -> GresResult<GresInfo>;

    /// The device inventory, if one was built or received
    fn get_devices(&self) -> Option<&Inventory>;
}
