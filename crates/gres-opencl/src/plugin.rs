//! OpenCL generic resource plugin
//!
//! Owns the device inventory of the process. The inventory is built at most
//! once, either from configuration or by receiving it from the parent.

use gres_core::{
    AllocationBitmap, DeviceRecord, EnvSession, EnvironmentState, GresConfEntry, GresError,
    GresResult, Identifier, Inventory,
};
use std::io::{Read, Write};
use tracing::{debug, error, info};

use crate::context::{GresContext, JobContext, StepContext};
use crate::projector::{self, ProjectionMode};
use crate::traits::{GresInfo, GresPlugin, JobDataType, LoadReport, StepDataType};
use crate::transport;

/// Human-readable plugin name
pub const PLUGIN_NAME: &str = "Gres OpenCL plugin";
/// Plugin type string
pub const PLUGIN_TYPE: &str = "gres/opencl";
/// Resource name matched against configuration entries
pub const GRES_NAME: &str = "opencl";
/// Plugin version
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The OpenCL plugin and its device inventory
#[derive(Debug, Default)]
pub struct OpenClPlugin {
    inventory: Option<Inventory>,
    /// Next device number; survives `fini` so numbers are never reused
    next_device_number: u32,
}

impl OpenClPlugin {
    /// Load the plugin
    pub fn init() -> Self {
        debug!("{} loaded", PLUGIN_NAME);
        Self::default()
    }

    /// Unload the plugin, releasing the inventory
    pub fn fini(&mut self) {
        debug!("unloading {}", PLUGIN_NAME);
        self.inventory = None;
    }

    fn set_env(
        &self,
        env: &mut EnvironmentState,
        ctx: GresContext<'_>,
        node_index: usize,
        mode: ProjectionMode<'_>,
        session: &mut EnvSession,
    ) {
        let result = projector::project(
            self.inventory.as_ref(),
            env,
            ctx,
            node_index,
            mode,
            *session,
        );

        match result {
            Ok(projection) => projection.apply(env, session),
            Err(GresError::NoAllocationData(reason)) => {
                debug!(
                    reason = %reason,
                    "unable to set env vars, no device files configured"
                );
            }
            Err(e) => {
                error!(
                    error = %e,
                    job = ctx.is_job(),
                    "failed to set {} env vars",
                    GRES_NAME
                );
            }
        }
    }
}

impl GresPlugin for OpenClPlugin {
    fn plugin_name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn plugin_type(&self) -> &'static str {
        PLUGIN_TYPE
    }

    fn gres_name(&self) -> &'static str {
        GRES_NAME
    }

    fn node_config_load(&mut self, entries: &[GresConfEntry]) -> GresResult<LoadReport> {
        let mut report = LoadReport::default();

        if self.inventory.is_some() {
            report.already_loaded = true;
            return Ok(report);
        }

        for entry in entries {
            let (Some(file), Some(identifier)) = (&entry.file, &entry.identifier) else {
                report.entries_skipped += 1;
                continue;
            };
            if entry.name != GRES_NAME || !entry.has_file() {
                report.entries_skipped += 1;
                continue;
            }

            let parsed = match Identifier::parse(identifier) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!(error = %e, "skipping gres.conf entry");
                    report.errors.push(e);
                    continue;
                }
            };

            for major in parsed.majors() {
                let record = DeviceRecord {
                    path: file.clone(),
                    major,
                    device_number: self.next_device_number,
                };
                self.next_device_number += 1;

                let device = self
                    .inventory
                    .get_or_insert_with(Inventory::new)
                    .push_record(record);
                info!(
                    device_number = device.device_number,
                    path = %device.path,
                    major = %device.major,
                    "{} device",
                    GRES_NAME
                );
                report.devices_added += 1;
            }
        }

        Ok(report)
    }

    fn job_set_env(&self, env: &mut EnvironmentState, job: &JobContext, node_index: usize) {
        let mut session = EnvSession::new();
        self.set_env(
            env,
            GresContext::Job(job),
            node_index,
            ProjectionMode::Set,
            &mut session,
        );
    }

    fn step_set_env(
        &self,
        env: &mut EnvironmentState,
        step: &StepContext,
        session: &mut EnvSession,
    ) {
        self.set_env(env, GresContext::Step(step), 0, ProjectionMode::Set, session);
    }

    fn step_reset_env(
        &self,
        env: &mut EnvironmentState,
        step: &StepContext,
        usable: Option<&AllocationBitmap>,
        session: &mut EnvSession,
    ) {
        self.set_env(
            env,
            GresContext::Step(step),
            0,
            ProjectionMode::Reset { usable },
            session,
        );
    }

    fn send_stepd(&self, writer: &mut dyn Write) -> GresResult<()> {
        transport::send(writer, self.inventory.as_ref())
    }

    fn recv_stepd(&mut self, reader: &mut dyn Read) -> GresResult<()> {
        self.inventory = transport::receive(reader)?;
        if let Some(inventory) = &self.inventory {
            self.next_device_number = self
                .next_device_number
                .max(inventory.next_device_number());
        }
        Ok(())
    }

    fn job_info(
        &self,
        _job: &JobContext,
        _node_index: usize,
        data_type: JobDataType,
    ) -> GresResult<GresInfo> {
        Err(GresError::UnsupportedQuery(format!(
            "{} job_info({:?})",
            PLUGIN_TYPE, data_type
        )))
    }

    fn step_info(
        &self,
        _step: &StepContext,
        _node_index: usize,
        data_type: StepDataType,
    ) -> GresResult<GresInfo> {
        Err(GresError::UnsupportedQuery(format!(
            "{} step_info({:?})",
            PLUGIN_TYPE, data_type
        )))
    }

    fn get_devices(&self) -> Option<&Inventory> {
        self.inventory.as_ref()
    }
}
