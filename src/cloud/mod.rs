//! Provider seams: remote shell execution, block storage and instance lookup.

pub mod aws_cli;

pub use aws_cli::AwsCli;

use std::fmt;

use serde::Deserialize;

use crate::error::Result;

/// Lifecycle status of a remote command invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InvocationStatus {
    Pending,
    InProgress,
    Delayed,
    Success,
    Cancelled,
    TimedOut,
    Failed,
    Cancelling,
    #[serde(other)]
    Unknown,
}

impl InvocationStatus {
    /// Whether the invocation has stopped changing
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Cancelled | Self::TimedOut | Self::Failed
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut | Self::Failed)
    }
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Delayed => "Delayed",
            Self::Success => "Success",
            Self::Cancelled => "Cancelled",
            Self::TimedOut => "TimedOut",
            Self::Failed => "Failed",
            Self::Cancelling => "Cancelling",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Snapshot of a remote command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub status: InvocationStatus,
    pub stdout: String,
    pub stderr: String,
    pub status_detail: String,
}

impl Invocation {
    /// An invocation the provider does not know about yet
    pub fn pending() -> Self {
        Self {
            status: InvocationStatus::Pending,
            stdout: String::new(),
            stderr: String::new(),
            status_detail: "Pending".to_string(),
        }
    }
}

/// State of a block volume modification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationState {
    Modifying,
    Optimizing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ModificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Modifying => "modifying",
            Self::Optimizing => "optimizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Latest modification reported for a volume
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeModification {
    /// `None` when the provider no longer reports a state
    pub state: Option<ModificationState>,
    pub status_message: Option<String>,
}

/// A volume attached to an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedVolume {
    pub volume_id: String,
    pub size_gib: u64,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub instance_id: String,
    pub device: String,
}

/// Asynchronous shell execution on a managed host
pub trait RemoteExecutor {
    /// Submit `script` to `host_id`, returning the invocation id
    fn send_command(&self, host_id: &str, script: &str) -> Result<String>;

    /// Current state of a previously submitted invocation
    fn get_invocation(&self, invocation_id: &str, host_id: &str) -> Result<Invocation>;
}

/// Block storage volume resizing
pub trait BlockStorage {
    /// Request that `volume_id` be grown to `size_gib`
    fn modify_volume(&self, volume_id: &str, size_gib: u64) -> Result<()>;

    /// Most recent modification of `volume_id`
    fn describe_modification(&self, volume_id: &str) -> Result<VolumeModification>;
}

/// Lookup of running instances and their volumes
pub trait InstanceDirectory {
    /// Ids of running instances whose Name tag equals `name`
    fn find_running_instances(&self, name: &str) -> Result<Vec<String>>;

    /// Volumes attached to `instance_id`
    fn attached_volumes(&self, instance_id: &str) -> Result<Vec<AttachedVolume>>;
}
