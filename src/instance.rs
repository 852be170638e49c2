use tracing::{info, warn};

use crate::cloud::{AttachedVolume, InstanceDirectory};
use crate::error::{Error, Result};

/// Device paths under which the root volume may be attached
pub const ROOT_DEVICE_PATHS: [&str; 2] = ["/dev/sda1", "/dev/xvda"];

/// The running instance and its root volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedInstance {
    pub instance_id: String,
    pub volume_id: String,
    pub volume_size_gib: u64,
}

/// Find the running instance tagged `name` and its root volume
pub fn locate(directory: &dyn InstanceDirectory, name: &str) -> Result<LocatedInstance> {
    let instances = directory.find_running_instances(name)?;
    let instance_id = match instances.as_slice() {
        [] => return Err(Error::InstanceNotFound(name.to_string())),
        [only] => only.clone(),
        [first, ..] => {
            warn!(
                count = instances.len(),
                "Several running instances are tagged Name={}, using {}", name, first
            );
            first.clone()
        }
    };
    info!("Instance ID: {}", instance_id);

    let volumes = directory.attached_volumes(&instance_id)?;
    let primary = select_primary_volume(&instance_id, &volumes)
        .ok_or_else(|| Error::PrimaryVolumeNotFound(instance_id.clone()))?;
    info!("Primary volume ID: {}", primary.volume_id);
    info!("Primary volume current size: {} GiB", primary.size_gib);

    Ok(LocatedInstance {
        volume_id: primary.volume_id.clone(),
        volume_size_gib: primary.size_gib,
        instance_id,
    })
}

/// The volume attached to `instance_id` under one of [`ROOT_DEVICE_PATHS`]
pub fn select_primary_volume<'v>(
    instance_id: &str,
    volumes: &'v [AttachedVolume],
) -> Option<&'v AttachedVolume> {
    volumes.iter().find(|volume| {
        volume.attachments.iter().any(|a| {
            a.instance_id == instance_id && ROOT_DEVICE_PATHS.contains(&a.device.as_str())
        })
    })
}
