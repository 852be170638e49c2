use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use rootexpander::logging::init_logging;
use rootexpander::{locate, AwsCli, Config, Credentials, ResizeOrchestrator, ResizeTarget};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (git:", env!("GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "rootexpander")]
#[command(
    version,
    long_version = LONG_VERSION,
    about = "Grow the root volume and filesystem of a running EC2 instance",
    long_about = None
)]
struct Cli {
    /// Value of the instance's Name tag
    name: String,

    /// GiB to add to the root volume
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    size: u64,

    /// AWS region
    #[arg(short, long)]
    region: Option<String>,

    /// Access key ID and secret access key used to connect to AWS
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["KEY_ID", "SECRET"],
        action = clap::ArgAction::Set
    )]
    credentials: Option<Vec<String>>,

    /// Dry run - discover the layout and show what would be done
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for each in-guest command
    #[arg(long, value_name = "SECS", default_value_t = 900)]
    command_timeout: u64,

    /// Seconds to wait for the volume modification to complete
    #[arg(long, value_name = "SECS", default_value_t = 6 * 60 * 60)]
    volume_timeout: u64,
}

/// Key pair from `-c KEY_ID SECRET`; anything but exactly two values is rejected
fn credentials_from(values: Option<&[String]>) -> Result<Option<Credentials>> {
    match values {
        None => Ok(None),
        Some([key_id, secret]) => Ok(Some(Credentials::new(key_id.clone(), secret.clone()))),
        Some(other) => anyhow::bail!(
            "--credentials takes exactly KEY_ID and SECRET, got {} values",
            other.len()
        ),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let credentials = credentials_from(cli.credentials.as_deref())?;
    let config = Config::new()
        .region(cli.region)
        .credentials(credentials)
        .command_timeout(Duration::from_secs(cli.command_timeout))
        .volume_timeout(Duration::from_secs(cli.volume_timeout));

    let aws = AwsCli::new(&config);
    let located = locate(&aws, &cli.name)
        .with_context(|| format!("Failed to find the instance tagged Name={}", cli.name))?;

    let target = ResizeTarget {
        instance_id: located.instance_id,
        volume_id: located.volume_id,
        current_size_gib: located.volume_size_gib,
        add_size_gib: cli.size,
    };
    let orchestrator = ResizeOrchestrator::new(&config, &aws, &aws);

    if cli.dry_run {
        let plan = orchestrator
            .plan(&target)
            .with_context(|| format!("Failed to plan resize of {}", target.instance_id))?;
        println!();
        print!("{}", plan);
        return Ok(());
    }

    let report = orchestrator
        .run(&target)
        .with_context(|| format!("Failed to resize root filesystem of {}", target.instance_id))?;

    println!();
    print!("{}", report);
    println!();
    println!("The root filesystem has been resized successfully.");

    Ok(())
}
