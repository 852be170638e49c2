use std::fmt;

use tracing::info;

use crate::error::{Error, Result};
use crate::remote::RemoteCommandChannel;

/// Lists the parent device, partition and filesystem type of the root mount
pub const DISCOVERY_COMMAND: &str =
    "lsblk -o MOUNTPOINT,PKNAME,NAME,FSTYPE -rn | awk '$1 == \"/\" {print $2, $3, $4}'";

/// Supported block device naming schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    /// `nvme0n1` with partitions `nvme0n1p1`
    Nvme,
    /// `xvda` with partitions `xvda1`
    Xvda,
}

impl DeviceFamily {
    pub fn detect(device_name: &str) -> Option<Self> {
        if device_name.starts_with("nvme") {
            Some(Self::Nvme)
        } else if device_name.starts_with("xvda") {
            Some(Self::Xvda)
        } else {
            None
        }
    }

    /// Text between the device name and the partition number
    fn partition_separator(self) -> &'static str {
        match self {
            Self::Nvme => "p",
            Self::Xvda => "",
        }
    }
}

/// Supported root filesystems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemType {
    Xfs,
    Ext4,
}

impl FilesystemType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "xfs" => Some(Self::Xfs),
            "ext4" => Some(Self::Ext4),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xfs => "xfs",
            Self::Ext4 => "ext4",
        }
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated layout of the root filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemTopology {
    device_name: String,
    partition_name: String,
    filesystem_type: FilesystemType,
    family: DeviceFamily,
}

impl FilesystemTopology {
    /// Validate the three discovery fields
    pub fn new(device_name: &str, partition_name: &str, filesystem_type: &str) -> Result<Self> {
        let family = DeviceFamily::detect(device_name)
            .ok_or_else(|| Error::UnsupportedDevice(device_name.to_string()))?;
        let filesystem_type = FilesystemType::parse(filesystem_type)
            .ok_or_else(|| Error::UnsupportedFilesystem(filesystem_type.to_string()))?;

        let topology = Self {
            device_name: device_name.to_string(),
            partition_name: partition_name.to_string(),
            filesystem_type,
            family,
        };
        // Reject layouts growpart could not address before anything is resized
        topology.partition_index()?;
        Ok(topology)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn partition_name(&self) -> &str {
        &self.partition_name
    }

    pub fn filesystem_type(&self) -> FilesystemType {
        self.filesystem_type
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// Partition number as growpart expects it, e.g. `1` for `nvme0n1p1`
    pub fn partition_index(&self) -> Result<&str> {
        let prefix = format!("{}{}", self.device_name, self.family.partition_separator());
        match self.partition_name.strip_prefix(prefix.as_str()) {
            Some(index) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
                Ok(index)
            }
            _ => Err(Error::MalformedDiscovery(format!(
                "partition '{}' does not belong to device '{}'",
                self.partition_name, self.device_name
            ))),
        }
    }
}

impl fmt::Display for FilesystemTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on /dev/{} (device /dev/{})",
            self.filesystem_type, self.partition_name, self.device_name
        )
    }
}

/// Parse discovery output: exactly `<device> <partition> <fstype>`
pub fn parse_discovery_output(output: &str) -> Result<FilesystemTopology> {
    let tokens: Vec<&str> = output.split_whitespace().collect();
    match tokens.as_slice() {
        [device, partition, fs_type] => FilesystemTopology::new(device, partition, fs_type),
        _ => Err(Error::MalformedDiscovery(output.trim().to_string())),
    }
}

/// Discovers the root filesystem layout of a host
pub struct FilesystemTopologyProbe<'a> {
    channel: &'a RemoteCommandChannel<'a>,
}

impl<'a> FilesystemTopologyProbe<'a> {
    pub fn new(channel: &'a RemoteCommandChannel<'a>) -> Self {
        Self { channel }
    }

    pub fn probe(&self, host_id: &str) -> Result<FilesystemTopology> {
        info!("Obtaining filesystem info...");
        let output = self.channel.execute(host_id, DISCOVERY_COMMAND)?;
        let topology = parse_discovery_output(&output.stdout)?;
        info!("Obtained: {}", topology);
        Ok(topology)
    }
}
