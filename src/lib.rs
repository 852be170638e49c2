pub mod cloud;
pub mod config;
pub mod error;
pub mod extend;
pub mod instance;
pub mod logging;
pub mod orchestrator;
pub mod poll;
pub mod remote;
pub mod topology;
pub mod volume;

pub use cloud::{AwsCli, BlockStorage, InstanceDirectory, RemoteExecutor};
pub use config::{Config, Credentials, PollSettings};
pub use error::{Error, Result};
pub use extend::FilesystemExtender;
pub use instance::{locate, LocatedInstance};
pub use orchestrator::{
    ResizeFailure, ResizeOrchestrator, ResizeOutcome, ResizePlan, ResizeReport, ResizeTarget,
    Stage,
};
pub use remote::{CommandOutput, RemoteCommandChannel};
pub use topology::{FilesystemTopology, FilesystemTopologyProbe, FilesystemType};
pub use volume::{VolumeGrower, VolumeResizeRequest};
