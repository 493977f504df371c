//! Projection of an allocation bitmap onto `OPENCL_VISIBLE_DEVICES`
//!
//! The value is a list of `path:major` tokens joined with `::`, in inventory
//! order. Device-selection libraries in user jobs parse this format, so it
//! must not change.

use gres_core::{
    AllocationBitmap, DeviceRecord, EnvSession, EnvironmentState, GresError, GresResult,
    Inventory,
};

use crate::context::GresContext;

/// Environment variable written by the plugin
pub const VISIBLE_DEVICES_VAR: &str = "OPENCL_VISIBLE_DEVICES";

/// Separator between devices in the variable value
pub const DEVICE_SEPARATOR: &str = "::";

/// How the allocation is projected
#[derive(Debug, Clone, Copy)]
pub enum ProjectionMode<'a> {
    /// Export every allocated device
    Set,
    /// Export allocated devices that are also usable, falling back to the
    /// first allocated device when none are
    Reset {
        usable: Option<&'a AllocationBitmap>,
    },
}

/// Outcome of a projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// New value for the variable, `None` to leave the environment alone
    pub value: Option<String>,
    /// Session flag to carry into the next call
    pub already_seen: bool,
}

impl Projection {
    fn unchanged(already_seen: bool) -> Self {
        Self {
            value: None,
            already_seen,
        }
    }

    /// Write the value into `env`, if there is one
    pub fn apply(&self, env: &mut EnvironmentState, session: &mut EnvSession) {
        if let Some(value) = &self.value {
            env.overwrite(VISIBLE_DEVICES_VAR, value.as_str());
        }
        session.set_seen(self.already_seen);
    }
}

/// Compute the device variable for a job or step.
///
/// `env` is only read: when the session has already written the variable the
/// new devices are appended to its current value.
pub fn project(
    inventory: Option<&Inventory>,
    env: &EnvironmentState,
    ctx: GresContext<'_>,
    node_index: usize,
    mode: ProjectionMode<'_>,
    session: EnvSession,
) -> GresResult<Projection> {
    let already_seen = session.already_seen();

    let Some(inventory) = inventory else {
        return Ok(Projection::unchanged(already_seen));
    };

    let usable = match mode {
        ProjectionMode::Set => None,
        ProjectionMode::Reset { usable: None } => {
            return Ok(Projection::unchanged(already_seen))
        }
        ProjectionMode::Reset {
            usable: Some(usable),
        } => Some(usable),
    };

    let bit_alloc = ctx.allocation(node_index)?;
    check_len(bit_alloc, inventory)?;
    if let Some(usable) = usable {
        check_len(usable, inventory)?;
    }

    let mut device_list = if already_seen {
        env.get(VISIBLE_DEVICES_VAR).unwrap_or_default().to_string()
    } else {
        String::new()
    };

    let mut first_device: Option<&DeviceRecord> = None;
    for (i, device) in inventory.iter().enumerate() {
        if !bit_alloc.test(i) {
            continue;
        }
        if let Some(usable) = usable {
            first_device.get_or_insert(device);
            if !usable.test(i) {
                continue;
            }
        }
        append_device(&mut device_list, device);
    }

    if usable.is_some() && device_list.is_empty() {
        if let Some(device) = first_device {
            append_device(&mut device_list, device);
        }
    }

    if device_list.is_empty() {
        Ok(Projection::unchanged(already_seen))
    } else {
        Ok(Projection {
            value: Some(device_list),
            already_seen: true,
        })
    }
}

fn check_len(bitmap: &AllocationBitmap, inventory: &Inventory) -> GresResult<()> {
    if bitmap.len() != inventory.len() {
        return Err(GresError::InventoryMismatch {
            bitmap_len: bitmap.len(),
            device_count: inventory.len(),
        });
    }
    Ok(())
}

fn append_device(device_list: &mut String, device: &DeviceRecord) {
    if !device_list.is_empty() {
        device_list.push_str(DEVICE_SEPARATOR);
    }
    device_list.push_str(&device.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{JobContext, StepContext};

    fn inventory(majors: &[&str]) -> Inventory {
        let mut inventory = Inventory::new();
        for major in majors {
            inventory.push("/dev/a", major.to_string());
        }
        inventory
    }

    fn bitmap(len: usize, set: &[usize]) -> AllocationBitmap {
        AllocationBitmap::from_indices(len, set.iter().copied()).unwrap()
    }

    fn step_projection(
        inventory: &Inventory,
        env: &EnvironmentState,
        alloc: AllocationBitmap,
        mode: ProjectionMode<'_>,
        session: EnvSession,
    ) -> GresResult<Projection> {
        let step = StepContext::single_node(alloc);
        project(
            Some(inventory),
            env,
            GresContext::Step(&step),
            0,
            mode,
            session,
        )
    }

    #[test]
    fn test_single_device() {
        let inv = inventory(&["X0", "X1"]);
        let env = EnvironmentState::new();
        let result = step_projection(
            &inv,
            &env,
            bitmap(2, &[1]),
            ProjectionMode::Set,
            EnvSession::new(),
        )
        .unwrap();

        assert_eq!(result.value.as_deref(), Some("/dev/a:X1"));
        assert!(result.already_seen);
    }

    #[test]
    fn test_inventory_order() {
        let inv = inventory(&["X0", "X1", "X2"]);
        let env = EnvironmentState::new();
        let result = step_projection(
            &inv,
            &env,
            bitmap(3, &[2, 0]),
            ProjectionMode::Set,
            EnvSession::new(),
        )
        .unwrap();

        assert_eq!(result.value.as_deref(), Some("/dev/a:X0::/dev/a:X2"));
    }

    #[test]
    fn test_no_inventory() {
        let env = EnvironmentState::new();
        let step = StepContext::single_node(bitmap(1, &[0]));
        let result = project(
            None,
            &env,
            GresContext::Step(&step),
            0,
            ProjectionMode::Set,
            EnvSession::new(),
        )
        .unwrap();
        assert_eq!(result, Projection::unchanged(false));
    }

    #[test]
    fn test_nothing_allocated_leaves_flag() {
        let inv = inventory(&["X0"]);
        let env = EnvironmentState::new();
        let result = step_projection(
            &inv,
            &env,
            bitmap(1, &[]),
            ProjectionMode::Set,
            EnvSession::with_seen(true),
        )
        .unwrap();
        assert_eq!(result, Projection::unchanged(true));
    }

    #[test]
    fn test_merge_with_seen_value() {
        let inv = inventory(&["X0", "X1", "X2"]);
        let mut env = EnvironmentState::new();
        let mut session = EnvSession::new();

        let first = step_projection(&inv, &env, bitmap(3, &[0]), ProjectionMode::Set, session)
            .unwrap();
        first.apply(&mut env, &mut session);
        let second = step_projection(&inv, &env, bitmap(3, &[2]), ProjectionMode::Set, session)
            .unwrap();
        second.apply(&mut env, &mut session);

        assert_eq!(env.get(VISIBLE_DEVICES_VAR), Some("/dev/a:X0::/dev/a:X2"));
        assert!(session.already_seen());
    }

    #[test]
    fn test_unseen_ignores_prior_value() {
        let inv = inventory(&["X0"]);
        let mut env = EnvironmentState::new();
        env.overwrite(VISIBLE_DEVICES_VAR, "stale");

        let result = step_projection(
            &inv,
            &env,
            bitmap(1, &[0]),
            ProjectionMode::Set,
            EnvSession::new(),
        )
        .unwrap();
        assert_eq!(result.value.as_deref(), Some("/dev/a:X0"));
    }

    #[test]
    fn test_reset_filters_usable() {
        let inv = inventory(&["X0", "X1", "X2"]);
        let env = EnvironmentState::new();
        let usable = bitmap(3, &[1, 2]);
        let result = step_projection(
            &inv,
            &env,
            bitmap(3, &[0, 1]),
            ProjectionMode::Reset {
                usable: Some(&usable),
            },
            EnvSession::new(),
        )
        .unwrap();
        assert_eq!(result.value.as_deref(), Some("/dev/a:X1"));
    }

    #[test]
    fn test_reset_falls_back_to_first_allocated() {
        let inv = inventory(&["X0", "X1"]);
        let env = EnvironmentState::new();
        let usable = bitmap(2, &[]);
        let result = step_projection(
            &inv,
            &env,
            bitmap(2, &[0, 1]),
            ProjectionMode::Reset {
                usable: Some(&usable),
            },
            EnvSession::new(),
        )
        .unwrap();
        assert_eq!(result.value.as_deref(), Some("/dev/a:X0"));
        assert!(result.already_seen);
    }

    #[test]
    fn test_reset_fallback_skipped_when_seen_value_exists() {
        let inv = inventory(&["X0", "X1"]);
        let mut env = EnvironmentState::new();
        env.overwrite(VISIBLE_DEVICES_VAR, "/dev/b:Y0");
        let usable = bitmap(2, &[]);
        let result = step_projection(
            &inv,
            &env,
            bitmap(2, &[1]),
            ProjectionMode::Reset {
                usable: Some(&usable),
            },
            EnvSession::with_seen(true),
        )
        .unwrap();
        assert_eq!(result.value.as_deref(), Some("/dev/b:Y0"));
    }

    #[test]
    fn test_reset_without_usable_is_noop() {
        let inv = inventory(&["X0"]);
        let env = EnvironmentState::new();
        let result = step_projection(
            &inv,
            &env,
            bitmap(1, &[0]),
            ProjectionMode::Reset { usable: None },
            EnvSession::new(),
        )
        .unwrap();
        assert_eq!(result.value, None);
    }

    #[test]
    fn test_length_mismatch() {
        let inv = inventory(&["X0", "X1"]);
        let env = EnvironmentState::new();
        let err = step_projection(
            &inv,
            &env,
            bitmap(3, &[0]),
            ProjectionMode::Set,
            EnvSession::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GresError::InventoryMismatch {
                bitmap_len: 3,
                device_count: 2
            }
        ));
    }

    #[test]
    fn test_usable_length_mismatch() {
        let inv = inventory(&["X0", "X1"]);
        let env = EnvironmentState::new();
        let usable = bitmap(1, &[0]);
        let err = step_projection(
            &inv,
            &env,
            bitmap(2, &[0]),
            ProjectionMode::Reset {
                usable: Some(&usable),
            },
            EnvSession::new(),
        )
        .unwrap_err();
        assert!(matches!(err, GresError::InventoryMismatch { .. }));
    }

    #[test]
    fn test_job_uses_node_index() {
        let inv = inventory(&["X0", "X1"]);
        let env = EnvironmentState::new();
        let job = JobContext::new(vec![Some(bitmap(2, &[0])), Some(bitmap(2, &[1]))]);
        let result = project(
            Some(&inv),
            &env,
            GresContext::Job(&job),
            1,
            ProjectionMode::Set,
            EnvSession::new(),
        )
        .unwrap();
        assert_eq!(result.value.as_deref(), Some("/dev/a:X1"));

        let err = project(
            Some(&inv),
            &env,
            GresContext::Job(&job),
            2,
            ProjectionMode::Set,
            EnvSession::new(),
        )
        .unwrap_err();
        assert!(matches!(err, GresError::NoAllocationData(_)));
    }
}
