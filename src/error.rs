use std::time::Duration;
use thiserror::Error;

/// All errors that can occur while growing a root volume
#[derive(Debug, Error)]
pub enum Error {
    #[error("No AWS region configured. Use -r/--region or set AWS_DEFAULT_REGION")]
    NoRegion,

    #[error("No AWS credentials found. Use -c/--credentials or configure a profile")]
    NoCredentials,

    #[error("The 'aws' command-line tool was not found at '{0}'")]
    AwsCliNotFound(String),

    #[error("AWS call '{operation}' failed: {message}")]
    Aws { operation: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response from AWS: {0}")]
    Json(#[from] serde_json::Error),

    #[error("There are no running instances tagged Name={0}")]
    InstanceNotFound(String),

    #[error("Instance {0} has no volume attached as /dev/sda1 or /dev/xvda")]
    PrimaryVolumeNotFound(String),

    #[error("Malformed filesystem discovery output: {0:?}")]
    MalformedDiscovery(String),

    #[error("Unsupported device and partition naming: '{0}' (expected nvme* or xvda*)")]
    UnsupportedDevice(String),

    #[error("Unsupported filesystem type: '{0}' (expected xfs or ext4)")]
    UnsupportedFilesystem(String),

    #[error(
        "Remote command '{}' ended with status {}: {}{}",
        .command,
        .status,
        .detail,
        output_suffix(.stdout, .stderr)
    )]
    CommandFailed {
        command: String,
        status: String,
        detail: String,
        stdout: String,
        stderr: String,
    },

    #[error("Modification of volume {volume_id} failed: {message}")]
    VolumeModificationFailed { volume_id: String, message: String },

    #[error("Timed out after {waited:?} waiting for {operation} (last status: {last_status})")]
    Timeout {
        operation: String,
        waited: Duration,
        last_status: String,
    },

    #[error("Invalid size: {0}")]
    InvalidSize(String),
}

/// Captured streams of a failed command, one per line, empty ones skipped
fn output_suffix(stdout: &str, stderr: &str) -> String {
    [stdout.trim(), stderr.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| format!("\n{}", s))
        .collect()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failure_shows_both_streams() {
        let error = Error::CommandFailed {
            command: "growpart /dev/xvda 1".to_string(),
            status: "Failed".to_string(),
            detail: "Failed".to_string(),
            stdout: "NOCHANGE: partition 1 could only be grown by 0\n".to_string(),
            stderr: "failed [exit 1]\n".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Remote command 'growpart /dev/xvda 1' ended with status Failed: Failed\n\
             NOCHANGE: partition 1 could only be grown by 0\nfailed [exit 1]"
        );
    }

    #[test]
    fn test_command_failure_without_output() {
        let error = Error::CommandFailed {
            command: "true".to_string(),
            status: "Cancelled".to_string(),
            detail: "Cancelled".to_string(),
            stdout: String::new(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Remote command 'true' ended with status Cancelled: Cancelled"
        );
    }
}
