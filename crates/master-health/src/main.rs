//! OpenShift master health CLI.
//!
//! Connects to a cluster, runs every control plane probe and prints one
//! report. Exit code 0 means nothing is Unhealthy or Error, 1 means at least
//! one probe is, 2 means the run never got as far as a report.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use master_health::render::exit_code;
use master_health::{
    HealthChecker, HealthConfig, HttpEndpointCheck, KubeCluster, OutputFormat, Renderer,
};

/// Exit code for failures before a report exists.
const RUN_FAILURE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Read-only health report for an OpenShift control plane.
#[derive(Parser)]
#[command(
    name = "master-health",
    version,
    about = "OpenShift control plane health report",
    long_about = "Checks master nodes, etcd, the API server, cluster operators,\n\
                  control plane pods and certificates, and prints one report.\n\n\
                  Nothing is ever written to the cluster."
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Log line format (logs go to stderr).
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// YAML configuration file; flags override its values.
    #[arg(short, long, env = "MASTER_HEALTH_CONFIG")]
    config: Option<PathBuf>,

    /// Kubeconfig file (defaults to KUBECONFIG, ~/.kube/config or in-cluster).
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use.
    #[arg(long)]
    context: Option<String>,

    /// API server health URL (defaults to <cluster url>/healthz).
    #[arg(long, env = "MASTER_HEALTH_API_URL")]
    api_url: Option<String>,

    /// Accept self-signed API server certificates.
    #[arg(long)]
    insecure_skip_tls_verify: bool,

    /// Items per list request (1-100).
    #[arg(long)]
    page_size: Option<u32>,

    /// Attempts per request before giving up.
    #[arg(long)]
    retry_attempts: Option<u32>,

    /// Delay between attempts, in milliseconds.
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Time budget for the whole run, in seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Probes to run at once.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Report format.
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn health_config(&self) -> Result<HealthConfig> {
        let mut config = match &self.config {
            Some(path) => HealthConfig::from_file(path)?,
            None => HealthConfig::default(),
        };

        if let Some(kubeconfig) = &self.kubeconfig {
            config.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        if let Some(url) = &self.api_url {
            config.api_health_url = Some(url.clone());
        }
        if self.insecure_skip_tls_verify {
            config.insecure_skip_tls_verify = true;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(attempts) = self.retry_attempts {
            config.retry_attempts = attempts;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.retry_delay_ms = delay;
        }
        if let Some(deadline) = self.deadline_secs {
            config.deadline_secs = deadline;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,master_health=debug")
        } else {
            EnvFilter::new("warn,master_health=info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: &Cli) -> Result<u8> {
    let config = cli.health_config()?;

    let cluster = KubeCluster::connect(&config).await?;
    cluster.verify().await?;

    let health_url = config
        .api_health_url
        .clone()
        .unwrap_or_else(|| cluster.health_url());
    let endpoint = HttpEndpointCheck::new(
        health_url,
        config.endpoint_timeout(),
        config.insecure_skip_tls_verify,
    )?;
    info!(url = %endpoint.url(), "Using API health endpoint");

    let checker = HealthChecker::new(
        Arc::new(cluster),
        Arc::new(endpoint),
        config.check_options(),
    );
    let report = checker.run(chrono::Utc::now()).await;

    let mut renderer = Renderer::new(io::stdout().lock(), !cli.no_color);
    renderer
        .render(&report, cli.output)
        .context("Failed to write report")?;

    Ok(exit_code(&report))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(RUN_FAILURE)
        }
    }
}
