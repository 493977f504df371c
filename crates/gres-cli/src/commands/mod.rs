//! CLI commands implementation

use anyhow::{Context, Result};
use gres_core::{AllocationBitmap, EnvSession, EnvironmentState, GresConfig};
use gres_opencl::plugin::{PLUGIN_NAME, PLUGIN_VERSION};
use gres_opencl::{GresPlugin, OpenClPlugin, StepContext, VISIBLE_DEVICES_VAR};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Arguments of the `env` command
#[derive(Debug, Clone, Default)]
pub struct EnvRequest {
    pub alloc: String,
    pub usable: Option<String>,
    pub reset: bool,
    pub seen: Option<String>,
}

/// Load and parse the configuration file
pub fn load_config(path: &Path) -> Result<GresConfig> {
    GresConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

/// Build a plugin with its inventory loaded from `config`
fn load_plugin(config: &GresConfig) -> Result<OpenClPlugin> {
    let mut plugin = OpenClPlugin::init();
    let report = plugin.node_config_load(&config.gres)?;
    for error in &report.errors {
        eprintln!("warning: {}", error);
    }
    Ok(plugin)
}

/// List configured devices
pub fn devices(config: &GresConfig, out: &mut impl Write) -> Result<()> {
    let plugin = load_plugin(config)?;
    writeln!(out, "{} {}", PLUGIN_NAME, PLUGIN_VERSION)?;

    match plugin.get_devices() {
        Some(inventory) => {
            writeln!(out, "Devices: {}", inventory.len())?;
            writeln!(out)?;
            for device in inventory {
                writeln!(
                    out,
                    "[{}] {} ({})",
                    device.device_number, device.major, device.path
                )?;
            }
        }
        None => writeln!(out, "No {} devices configured", plugin.gres_name())?,
    }

    Ok(())
}

/// Show the environment value for a single-node step
pub fn env(config: &GresConfig, request: &EnvRequest, out: &mut impl Write) -> Result<()> {
    let plugin = load_plugin(config)?;
    let count = plugin.get_devices().map(|inv| inv.len()).unwrap_or(0);

    let alloc = AllocationBitmap::parse_list(count, &request.alloc)
        .with_context(|| format!("invalid --alloc '{}'", request.alloc))?;
    let usable = request
        .usable
        .as_deref()
        .map(|list| {
            AllocationBitmap::parse_list(count, list)
                .with_context(|| format!("invalid --usable '{}'", list))
        })
        .transpose()?;

    let mut environment = EnvironmentState::new();
    let mut session = EnvSession::new();
    if let Some(seen) = &request.seen {
        environment.overwrite(VISIBLE_DEVICES_VAR, seen.as_str());
        session.set_seen(true);
    }

    let step = StepContext::single_node(alloc);
    if request.reset {
        plugin.step_reset_env(&mut environment, &step, usable.as_ref(), &mut session);
    } else {
        plugin.step_set_env(&mut environment, &step, &mut session);
    }

    match environment.get(VISIBLE_DEVICES_VAR) {
        Some(value) => writeln!(out, "{}={}", VISIBLE_DEVICES_VAR, value)?,
        None => writeln!(out, "{} is not set", VISIBLE_DEVICES_VAR)?,
    }

    Ok(())
}

/// Write the inventory to a file
pub fn send(config: &GresConfig, output: &Path, out: &mut impl Write) -> Result<()> {
    let plugin = load_plugin(config)?;
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    plugin.send_stepd(&mut writer)?;

    let count = plugin.get_devices().map(|inv| inv.len()).unwrap_or(0);
    writeln!(out, "Sent {} devices to {}", count, output.display())?;
    Ok(())
}

/// Read an inventory from a file
pub fn recv(input: &Path, out: &mut impl Write) -> Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut reader = BufReader::new(file);

    let mut plugin = OpenClPlugin::init();
    plugin.recv_stepd(&mut reader)?;

    match plugin.get_devices() {
        Some(inventory) => {
            writeln!(out, "Received {} devices", inventory.len())?;
            for device in inventory {
                writeln!(out, "[{}] {}", device.device_number, device)?;
            }
        }
        None => writeln!(out, "Received 0 devices")?,
    }

    Ok(())
}
