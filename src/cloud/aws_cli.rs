//! Backend that drives EC2 and SSM through the `aws` command-line tool.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

use crate::cloud::{
    AttachedVolume, Attachment, BlockStorage, InstanceDirectory, Invocation, InvocationStatus,
    ModificationState, RemoteExecutor, VolumeModification,
};
use crate::config::{Config, Credentials};
use crate::error::{Error, Result};

/// SSM document used to run shell scripts on Linux hosts
const RUN_SHELL_SCRIPT: &str = "AWS-RunShellScript";

/// Thin wrapper around the `aws` binary
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: PathBuf,
    region: Option<String>,
    credentials: Option<Credentials>,
}

impl AwsCli {
    pub fn new(config: &Config) -> Self {
        Self {
            program: PathBuf::from("aws"),
            region: config.region.clone(),
            credentials: config.credentials.clone(),
        }
    }

    /// Use a different executable instead of `aws` from `PATH`
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(region) = &self.region {
            cmd.args(["--region", region]);
        }
        cmd.args(["--output", "json"]);

        if let Some(creds) = &self.credentials {
            cmd.env("AWS_ACCESS_KEY_ID", &creds.access_key_id)
                .env("AWS_SECRET_ACCESS_KEY", &creds.secret_access_key)
                .env_remove("AWS_SESSION_TOKEN");
        }
        cmd
    }

    /// Run one CLI operation and return its raw standard output
    fn run(&self, operation: &str, args: &[&str]) -> Result<Vec<u8>> {
        debug!(operation, "calling aws");
        let output = self.command(args).output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::AwsCliNotFound(self.program.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        if output.status.success() {
            trace!(operation, stdout = %String::from_utf8_lossy(&output.stdout));
            Ok(output.stdout)
        } else {
            Err(classify_failure(operation, &output))
        }
    }

    fn call<T: DeserializeOwned>(&self, operation: &str, args: &[&str]) -> Result<T> {
        let stdout = self.run(operation, args)?;
        Ok(serde_json::from_slice(&stdout)?)
    }
}

/// Map a failed CLI run onto the error kinds the caller can act on
fn classify_failure(operation: &str, output: &Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("must specify a region") {
        Error::NoRegion
    } else if stderr.contains("Unable to locate credentials") {
        Error::NoCredentials
    } else {
        Error::Aws {
            operation: operation.to_string(),
            message: stderr.trim().to_string(),
        }
    }
}

fn is_provider_error(error: &Error, code: &str) -> bool {
    matches!(error, Error::Aws { message, .. } if message.contains(code))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendCommandResponse {
    command: SentCommand,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SentCommand {
    command_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommandInvocationResponse {
    status: InvocationStatus,
    #[serde(default)]
    status_details: String,
    #[serde(default)]
    standard_output_content: String,
    #[serde(default)]
    standard_error_content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumesModificationsResponse {
    #[serde(default)]
    volumes_modifications: Vec<ModificationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModificationEntry {
    modification_state: Option<ModificationState>,
    status_message: Option<String>,
    start_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstancesResponse {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<InstanceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceEntry {
    instance_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumesResponse {
    #[serde(default)]
    volumes: Vec<VolumeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeEntry {
    volume_id: String,
    size: u64,
    #[serde(default)]
    attachments: Vec<AttachmentEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttachmentEntry {
    instance_id: String,
    device: String,
}

impl RemoteExecutor for AwsCli {
    fn send_command(&self, host_id: &str, script: &str) -> Result<String> {
        let parameters = json!({ "commands": [script] }).to_string();
        let response: SendCommandResponse = self.call(
            "ssm send-command",
            &[
                "ssm",
                "send-command",
                "--instance-ids",
                host_id,
                "--document-name",
                RUN_SHELL_SCRIPT,
                "--parameters",
                &parameters,
            ],
        )?;
        Ok(response.command.command_id)
    }

    fn get_invocation(&self, invocation_id: &str, host_id: &str) -> Result<Invocation> {
        let result: Result<CommandInvocationResponse> = self.call(
            "ssm get-command-invocation",
            &[
                "ssm",
                "get-command-invocation",
                "--command-id",
                invocation_id,
                "--instance-id",
                host_id,
            ],
        );

        match result {
            Ok(response) => Ok(Invocation {
                status: response.status,
                stdout: response.standard_output_content,
                stderr: response.standard_error_content,
                status_detail: response.status_details,
            }),
            // SSM needs a moment before a fresh invocation becomes visible
            Err(e) if is_provider_error(&e, "InvocationDoesNotExist") => Ok(Invocation::pending()),
            Err(e) => Err(e),
        }
    }
}

impl BlockStorage for AwsCli {
    fn modify_volume(&self, volume_id: &str, size_gib: u64) -> Result<()> {
        let size = size_gib.to_string();
        self.run(
            "ec2 modify-volume",
            &["ec2", "modify-volume", "--volume-id", volume_id, "--size", &size],
        )?;
        Ok(())
    }

    fn describe_modification(&self, volume_id: &str) -> Result<VolumeModification> {
        let result: Result<VolumesModificationsResponse> = self.call(
            "ec2 describe-volumes-modifications",
            &[
                "ec2",
                "describe-volumes-modifications",
                "--volume-ids",
                volume_id,
            ],
        );

        let response = match result {
            Ok(response) => response,
            Err(e) if is_provider_error(&e, "InvalidVolumeModification.NotFound") => {
                return Ok(VolumeModification::default())
            }
            Err(e) => return Err(e),
        };

        let latest = response
            .volumes_modifications
            .into_iter()
            .max_by(|a, b| a.start_time.cmp(&b.start_time));

        Ok(latest
            .map(|entry| VolumeModification {
                state: entry.modification_state,
                status_message: entry.status_message,
            })
            .unwrap_or_default())
    }
}

impl InstanceDirectory for AwsCli {
    fn find_running_instances(&self, name: &str) -> Result<Vec<String>> {
        let filters = json!([
            { "Name": "tag:Name", "Values": [name] },
            { "Name": "instance-state-name", "Values": ["running"] },
        ])
        .to_string();
        let response: InstancesResponse = self.call(
            "ec2 describe-instances",
            &["ec2", "describe-instances", "--filters", &filters],
        )?;

        Ok(response
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(|i| i.instance_id)
            .collect())
    }

    fn attached_volumes(&self, instance_id: &str) -> Result<Vec<AttachedVolume>> {
        let filters = json!([
            { "Name": "attachment.instance-id", "Values": [instance_id] },
        ])
        .to_string();
        let response: VolumesResponse = self.call(
            "ec2 describe-volumes",
            &["ec2", "describe-volumes", "--filters", &filters],
        )?;

        Ok(response
            .volumes
            .into_iter()
            .map(|v| AttachedVolume {
                volume_id: v.volume_id,
                size_gib: v.size,
                attachments: v
                    .attachments
                    .into_iter()
                    .map(|a| Attachment {
                        instance_id: a.instance_id,
                        device: a.device,
                    })
                    .collect(),
            })
            .collect())
    }
}
