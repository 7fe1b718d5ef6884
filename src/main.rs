//! RDS Datadog Discovery - generate Datadog MySQL check config for RDS.
//!
//! Usage:
//!   rds-datadog-discovery [OPTIONS] > /etc/datadog-agent/conf.d/mysql.d/conf.yaml
//!
//! Options:
//!   --passwords <FILE>        INI file where passwords are stored
//!   --no-ec2-metadata         Don't detect region and VPC via EC2 metadata
//!   --ec2-interface <IFACE>   Interface used to detect the VPC
//!   --region <REGION>         Region when not using EC2 metadata
//!   --vpc-id <VPC>            VPC when not using EC2 metadata
//!   -c, --config <FILE>       Path to YAML settings file
//!   --skip-unknown-engines    Skip instances with unsupported engines
//!   -v, --verbose             Enable verbose logging
//!   --json-logs               Output logs in JSON format

use clap::Parser;
use rds_datadog_discovery::{
    config::{Config, LogFormat},
    credentials::IniCredentials,
    discovery::aws::AwsRdsSource,
    discovery::location::{Ec2MetadataLocation, LocationResolver, StaticLocation},
    pipeline::Pipeline,
    AppError,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// RDS Datadog Discovery - Datadog MySQL config from the RDS inventory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// INI file where passwords are stored
    #[arg(long, value_name = "FILE", env = "RDS_DISCOVERY_PASSWORDS")]
    passwords: Option<PathBuf>,

    /// Disable EC2 metadata for detecting region and VPC (useful for dev)
    #[arg(long)]
    no_ec2_metadata: bool,

    /// Interface for detecting the VPC (primary interface by default)
    #[arg(long, value_name = "IFACE")]
    ec2_interface: Option<String>,

    /// Region (when not using EC2 metadata)
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// VPC ID for RDS discovery (when not using EC2 metadata)
    #[arg(long, value_name = "VPC")]
    vpc_id: Option<String>,

    /// Path to YAML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip instances with an unsupported engine instead of aborting
    #[arg(long)]
    skip_unknown_engines: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    setup_logging(&args, &config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "RDS discovery failed");
            ExitCode::from(e.exit_code())
        }
    }
}

fn load_config(args: &Args) -> Result<Config, AppError> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(ref path) = args.passwords {
        config.credentials.path = path.clone();
    }
    if args.no_ec2_metadata {
        config.location.ec2_metadata = false;
    }
    if let Some(ref interface) = args.ec2_interface {
        config.location.interface = Some(interface.clone());
    }
    if let Some(ref region) = args.region {
        config.location.region = region.clone();
    }
    if let Some(ref vpc_id) = args.vpc_id {
        config.location.vpc_id = vpc_id.clone();
    }
    if args.skip_unknown_engines {
        config.discovery.skip_unknown_engines = true;
    }

    config.validate()?;
    Ok(config)
}

fn setup_logging(args: &Args, config: &Config) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.logging.level.into()
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [
        format!("rds_datadog_discovery={}", level),
        "aws_config=warn".to_string(),
        "aws_smithy_runtime=warn".to_string(),
        "reqwest=warn".to_string(),
    ] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    let use_json = args.json_logs || config.logging.format == LogFormat::Json;

    // stdout carries the generated config
    if use_json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting RDS Datadog discovery"
    );

    let credentials = IniCredentials::from_file(&config.credentials.path)?;
    info!(
        path = %config.credentials.path.display(),
        sections = credentials.sections().len(),
        "Loaded credentials"
    );

    let resolver: Box<dyn LocationResolver> = if config.location.ec2_metadata {
        Box::new(Ec2MetadataLocation::new(
            &config.location.metadata_url,
            config.location.metadata_timeout(),
            config.location.interface.clone(),
        )?)
    } else {
        Box::new(StaticLocation::new(
            config.location.region.clone(),
            config.location.vpc_id.clone(),
        ))
    };
    let location = resolver.resolve().await?;
    info!(region = %location.region, vpc_id = %location.vpc_id, "Resolved network location");

    let source = AwsRdsSource::from_env(&location.region).await?;

    let pipeline = Pipeline::new(Arc::new(source), Arc::new(credentials), location.vpc_id)
        .skip_unknown_engines(config.discovery.skip_unknown_engines);
    let document = pipeline.run_once().await?;

    let yaml = document.to_yaml()?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(yaml.as_bytes())?;
    stdout.flush()?;

    Ok(())
}
