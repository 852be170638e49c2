use std::fmt;

use thiserror::Error;
use tracing::{error, info};

use crate::cloud::{BlockStorage, RemoteExecutor};
use crate::config::Config;
use crate::error::Error;
use crate::extend::{extend_commands, FilesystemExtender};
use crate::remote::RemoteCommandChannel;
use crate::topology::{FilesystemTopology, FilesystemTopologyProbe};
use crate::volume::{VolumeGrower, VolumeResizeRequest};

/// Stages of a resize, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovery,
    VolumeResize,
    FilesystemExtend,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discovery => "discovery",
            Self::VolumeResize => "volume-resize",
            Self::FilesystemExtend => "filesystem-extend",
        })
    }
}

/// A fatal error together with the stage it stopped
#[derive(Debug, Error)]
#[error("{stage} failed")]
pub struct ResizeFailure {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl ResizeFailure {
    fn at(stage: Stage) -> impl FnOnce(Error) -> Self {
        move |error| Self { stage, error }
    }
}

/// Instance and root volume to operate on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeTarget {
    pub instance_id: String,
    pub volume_id: String,
    pub current_size_gib: u64,
    pub add_size_gib: u64,
}

/// Result of a completed resize
#[derive(Debug, Clone)]
pub struct ResizeReport {
    pub instance_id: String,
    pub volume_id: String,
    pub topology: FilesystemTopology,
    pub old_size_gib: u64,
    pub new_size_gib: u64,
    /// In-guest commands that ran
    pub commands: Vec<String>,
}

/// What a resize would do, computed without changing anything
#[derive(Debug, Clone)]
pub struct ResizePlan {
    pub instance_id: String,
    pub volume_id: String,
    pub topology: FilesystemTopology,
    pub old_size_gib: u64,
    pub new_size_gib: u64,
    pub commands: Vec<String>,
}

pub type ResizeOutcome = std::result::Result<ResizeReport, ResizeFailure>;

/// Sequences discovery, volume growth and filesystem extension
///
/// Nothing is rolled back: if extension fails the volume stays enlarged
/// and the in-guest commands have to be rerun by hand.
pub struct ResizeOrchestrator<'a> {
    channel: RemoteCommandChannel<'a>,
    grower: VolumeGrower<'a>,
}

impl<'a> ResizeOrchestrator<'a> {
    pub fn new(
        config: &Config,
        executor: &'a dyn RemoteExecutor,
        storage: &'a dyn BlockStorage,
    ) -> Self {
        Self {
            channel: RemoteCommandChannel::new(executor, config.command_polling),
            grower: VolumeGrower::new(storage, config.volume_polling),
        }
    }

    fn discover(&self, target: &ResizeTarget) -> Result<FilesystemTopology, ResizeFailure> {
        FilesystemTopologyProbe::new(&self.channel)
            .probe(&target.instance_id)
            .map_err(ResizeFailure::at(Stage::Discovery))
    }

    /// Run every stage; each one starts only after the previous succeeded
    pub fn run(&self, target: &ResizeTarget) -> ResizeOutcome {
        let outcome = self.run_stages(target);
        if let Err(failure) = &outcome {
            error!(stage = %failure.stage, "{}", failure.error);
        }
        outcome
    }

    fn run_stages(&self, target: &ResizeTarget) -> ResizeOutcome {
        let topology = self.discover(target)?;

        let request = VolumeResizeRequest::new(
            target.volume_id.clone(),
            target.current_size_gib,
            target.add_size_gib,
        );
        let new_size_gib = self
            .grower
            .grow(&request)
            .map_err(ResizeFailure::at(Stage::VolumeResize))?;

        let commands = FilesystemExtender::new(&self.channel)
            .extend(&target.instance_id, &topology)
            .map_err(ResizeFailure::at(Stage::FilesystemExtend))?;

        info!(
            instance = %target.instance_id,
            volume = %target.volume_id,
            new_size_gib,
            "resize complete"
        );
        Ok(ResizeReport {
            instance_id: target.instance_id.clone(),
            volume_id: target.volume_id.clone(),
            topology,
            old_size_gib: target.current_size_gib,
            new_size_gib,
            commands,
        })
    }

    /// Discovery only; reports the target size and the commands that would run
    pub fn plan(&self, target: &ResizeTarget) -> Result<ResizePlan, ResizeFailure> {
        let topology = self.discover(target)?;
        let new_size_gib = VolumeResizeRequest::new(
            target.volume_id.clone(),
            target.current_size_gib,
            target.add_size_gib,
        )
        .target_size_gib()
        .map_err(ResizeFailure::at(Stage::VolumeResize))?;
        let commands = extend_commands(&topology)
            .map_err(ResizeFailure::at(Stage::FilesystemExtend))?
            .to_vec();

        Ok(ResizePlan {
            instance_id: target.instance_id.clone(),
            volume_id: target.volume_id.clone(),
            topology,
            old_size_gib: target.current_size_gib,
            new_size_gib,
            commands,
        })
    }
}

impl fmt::Display for ResizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resize complete!")?;
        writeln!(f)?;
        writeln!(f, "  Instance: {}", self.instance_id)?;
        writeln!(f, "  Volume: {}", self.volume_id)?;
        writeln!(f, "  Root filesystem: {}", self.topology)?;
        writeln!(f, "  Old size: {} GiB", self.old_size_gib)?;
        writeln!(f, "  New size: {} GiB", self.new_size_gib)?;
        writeln!(f)?;
        writeln!(f, "Commands executed:")?;
        for command in &self.commands {
            writeln!(f, "  - {}", command)?;
        }
        Ok(())
    }
}

impl fmt::Display for ResizePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DRY RUN MODE - No changes will be made")?;
        writeln!(f)?;
        writeln!(f, "  Instance: {}", self.instance_id)?;
        writeln!(f, "  Volume: {}", self.volume_id)?;
        writeln!(f, "  Root filesystem: {}", self.topology)?;
        writeln!(
            f,
            "  Size: {} GiB -> {} GiB",
            self.old_size_gib, self.new_size_gib
        )?;
        writeln!(f)?;
        writeln!(f, "Commands that would run:")?;
        for command in &self.commands {
            writeln!(f, "  - {}", command)?;
        }
        Ok(())
    }
}
