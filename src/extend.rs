use tracing::{info, warn};

use crate::error::Result;
use crate::remote::RemoteCommandChannel;
use crate::topology::{FilesystemTopology, FilesystemType};

/// `growpart` invocation for the root partition
pub fn growpart_command(topology: &FilesystemTopology) -> Result<String> {
    Ok(format!(
        "growpart /dev/{} {}",
        topology.device_name(),
        topology.partition_index()?
    ))
}

/// Filesystem grow invocation matching the filesystem type
pub fn filesystem_grow_command(topology: &FilesystemTopology) -> String {
    match topology.filesystem_type() {
        FilesystemType::Xfs => "xfs_growfs -d /".to_string(),
        FilesystemType::Ext4 => format!("resize2fs /dev/{}", topology.partition_name()),
    }
}

/// Both in-guest commands, in the order they must run
pub fn extend_commands(topology: &FilesystemTopology) -> Result<[String; 2]> {
    Ok([growpart_command(topology)?, filesystem_grow_command(topology)])
}

/// Grows the root partition and filesystem after the volume has grown
pub struct FilesystemExtender<'a> {
    channel: &'a RemoteCommandChannel<'a>,
}

impl<'a> FilesystemExtender<'a> {
    pub fn new(channel: &'a RemoteCommandChannel<'a>) -> Self {
        Self { channel }
    }

    /// Run growpart, then the filesystem grow; stops at the first failure
    ///
    /// Returns the commands that were run.
    pub fn extend(&self, host_id: &str, topology: &FilesystemTopology) -> Result<Vec<String>> {
        info!("Resizing filesystem...");
        let mut executed = Vec::with_capacity(2);
        for command in extend_commands(topology)? {
            let output = self.channel.execute(host_id, &command)?;
            for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
                info!("  {}", line);
            }
            for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
                warn!("  {}", line);
            }
            executed.push(command);
        }
        info!("Filesystem resized successfully");
        Ok(executed)
    }
}
