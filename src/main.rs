/// Version injected at compile time via CLOUDSWEEP_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("CLOUDSWEEP_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

use anyhow::{anyhow, Context};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use cloudsweep::aws::{AwsProvider, AwsSchemaCatalog};
use cloudsweep::azure::client::{validate_subscription_id, DEFAULT_ENDPOINT, LOCATION_ENV, SUBSCRIPTION_ENV};
use cloudsweep::azure::{ArmCredentials, ArmProviderCatalog, AzureProvider};
use cloudsweep::catalog::{GcpRegistryCatalog, SchemaCache, TypeCatalog};
use cloudsweep::config::{Config, Resolved, WORKERS_ENV};
use cloudsweep::discovery::{discover, EngineConfig, RunMode, SideEffect};
use cloudsweep::emit::{run_bulk_import, write_inventory, CommandImporter, OutputFormat, StreamRegistrar};
use cloudsweep::error::DiscoveryError;
use cloudsweep::gcp::auth::validate_project_id;
use cloudsweep::gcp::http::format_gcp_error;
use cloudsweep::gcp::{GcpCredentials, GcpProvider};
use cloudsweep::kubernetes::{KubeDiscoveryCatalog, KubeProvider};
use cloudsweep::provider::Provider;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Discover every resource in a cloud account
#[derive(Parser, Debug)]
#[command(name = "cloudsweep", version = VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cloud: Cloud,

    /// Number of shard workers (default depends on the provider)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Catalog key or type token to skip (repeatable)
    #[arg(short = 'x', long = "exclude", global = true)]
    exclude: Vec<String>,

    /// What to do with each discovered resource
    #[arg(short, long, value_enum, default_value = "export", global = true)]
    mode: RunMode,

    /// Inventory file path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Inventory format (guessed from the file extension when omitted)
    #[arg(long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Run one bulk import of the written inventory
    #[arg(long, global = true)]
    bulk_import: bool,

    /// Do not list resource groups first or link resources to them
    #[arg(long, global = true)]
    no_parent_linking: bool,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Store the resolved project, subscription, region or context in the config file
    #[arg(long, global = true)]
    save_config: bool,
}

#[derive(Subcommand, Debug)]
enum Cloud {
    /// Google Cloud
    Gcp(GcpArgs),
    /// Microsoft Azure
    Azure(AzureArgs),
    /// Amazon Web Services, through the Cloud Control API
    Aws(AwsArgs),
    /// The cluster of the current kubeconfig context
    Kubernetes(KubernetesArgs),
}

#[derive(ClapArgs, Debug)]
struct GcpArgs {
    /// GCP project to use
    #[arg(short, long)]
    project: Option<String>,

    /// Send every API request to this base URL
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct AzureArgs {
    /// Subscription ID
    #[arg(short, long)]
    subscription: Option<String>,

    /// Only list resources in this location (`*` for all)
    #[arg(short, long)]
    location: Option<String>,

    /// Package schema used to validate tokens and resolve namespace aliases
    #[arg(long)]
    schema_url: Option<String>,

    /// Management endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct AwsArgs {
    /// AWS region (defaults to the AWS config chain)
    #[arg(short, long)]
    region: Option<String>,

    /// aws-native package schema listing the resource types
    #[arg(long)]
    schema_url: Option<String>,

    /// Cloud Control endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct KubernetesArgs {
    /// kubeconfig context to use
    #[arg(long)]
    context: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let Some(log_path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("cloudsweep {} started", VERSION);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_fatal() => {
            tracing::error!("{}", err);
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::warn!("{}", err);
            eprintln!("Warning: {err}");
            ExitCode::SUCCESS
        }
    }
}

fn fatal(err: anyhow::Error) -> DiscoveryError {
    DiscoveryError::FatalSetup(err)
}

/// Build the provider and its catalog for the chosen cloud
async fn connect(
    cloud: &Cloud,
    config: &Config,
) -> anyhow::Result<(Arc<dyn Provider>, Box<dyn TypeCatalog>, Resolved)> {
    match cloud {
        Cloud::Gcp(gcp) => {
            let project = config
                .effective_project(gcp.project.as_deref())
                .context("No GCP project configured. Use --project or 'gcloud config set project'")?;
            if !validate_project_id(&project) {
                anyhow::bail!("Invalid GCP project ID: {}", project);
            }

            let credentials = GcpCredentials::from_env().await?;
            // Fail before any worker starts if the credentials cannot mint a token
            credentials
                .get_token()
                .await
                .map_err(|e| anyhow!(format_gcp_error(&e)))?;

            let mut provider = GcpProvider::new(credentials, &project);
            if let Some(endpoint) = &gcp.endpoint {
                provider = provider.with_endpoint(endpoint);
            }
            tracing::info!("Discovering GCP project {}", project);

            Ok((Arc::new(provider), Box::new(GcpRegistryCatalog), Resolved::Gcp { project }))
        }
        Cloud::Azure(azure) => {
            let credentials = ArmCredentials::from_env()?;
            credentials.get_token().await?;

            let env_subscription = std::env::var(SUBSCRIPTION_ENV).ok();
            let subscription = config
                .effective_subscription(azure.subscription.as_deref(), env_subscription.as_deref())
                .with_context(|| format!("No subscription configured. Use --subscription or {}", SUBSCRIPTION_ENV))?;
            if !validate_subscription_id(&subscription) {
                anyhow::bail!("Invalid subscription ID: {}", subscription);
            }

            let env_location = std::env::var(LOCATION_ENV).ok();
            let location = config.effective_location(azure.location.as_deref(), env_location.as_deref());
            let endpoint = azure.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);

            let mut provider = AzureProvider::new(credentials, &subscription, endpoint).with_location(&location);
            if let Some(url) = config.effective_schema_url(azure.schema_url.as_deref()) {
                let schema = SchemaCache::new(&url)?.get().await?;
                provider = provider.with_schema(schema);
            }
            tracing::info!("Discovering Azure subscription {} in {}", subscription, location);

            let catalog = ArmProviderCatalog::new(provider.client()?);
            let resolved = Resolved::Azure { subscription, location };
            Ok((Arc::new(provider), Box::new(catalog), resolved))
        }
        Cloud::Aws(aws) => {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = config.effective_aws_region(aws.region.as_deref()) {
                loader = loader.region(aws_config::Region::new(region));
            }
            if let Some(endpoint) = &aws.endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            let shared = loader.load().await;
            let region = shared
                .region()
                .map(|r| r.to_string())
                .context("No AWS region configured. Use --region or AWS_REGION")?;

            let schema_url = config.effective_aws_schema_url(aws.schema_url.as_deref());
            let schema = SchemaCache::new(&schema_url)?.get().await?;
            let provider = AwsProvider::from_shared_config(&shared, &schema);
            tracing::info!("Discovering AWS resources in {}", region);

            Ok((
                Arc::new(provider),
                Box::new(AwsSchemaCatalog::new(schema)),
                Resolved::Aws { region },
            ))
        }
        Cloud::Kubernetes(kubernetes) => {
            let context = config.effective_kube_context(kubernetes.context.as_deref());
            let kube_config = match &context {
                Some(name) => {
                    let options = kube::config::KubeConfigOptions {
                        context: Some(name.clone()),
                        ..Default::default()
                    };
                    kube::Config::from_kubeconfig(&options)
                        .await
                        .with_context(|| format!("Failed to load kubeconfig context {}", name))?
                }
                None => kube::Config::infer()
                    .await
                    .context("Failed to load kubeconfig")?,
            };
            tracing::info!("Discovering Kubernetes cluster {}", kube_config.cluster_url);

            let provider = KubeProvider::new(kube_config);
            let catalog = KubeDiscoveryCatalog::new(provider.client()?);
            Ok((Arc::new(provider), Box::new(catalog), Resolved::Kubernetes { context }))
        }
    }
}

async fn run(args: Args) -> Result<(), DiscoveryError> {
    // Bulk import reads the exported file; incremental import already imported everything
    if args.bulk_import && args.mode != RunMode::Export {
        return Err(fatal(anyhow!(
            "--bulk-import requires --mode export"
        )));
    }

    let mut config = Config::load();
    let (provider, catalog, resolved) = connect(&args.cloud, &config).await.map_err(fatal)?;

    if args.save_config {
        config.remember(resolved);
        let path = config
            .save()
            .context("Failed to save configuration")
            .map_err(fatal)?;
        tracing::info!("Saved configuration to {:?}", path);
    }

    let descriptors = catalog
        .descriptors()
        .await
        .context("Failed to read the type catalog")
        .map_err(fatal)?;

    let env_workers = std::env::var(WORKERS_ENV).ok();
    let workers = config
        .effective_workers(args.workers, env_workers.as_deref(), provider.default_workers())
        .map_err(fatal)?;

    let mut engine = EngineConfig::new(workers)
        .with_exclusions(config.effective_exclusions(&args.exclude));
    if args.no_parent_linking {
        engine = engine.without_parent_linking();
    }

    let program = config.effective_import_program();
    let side_effect = match args.mode {
        RunMode::Export => SideEffect::None,
        RunMode::LiveRegister => SideEffect::Register(Box::new(StreamRegistrar::stdout())),
        RunMode::IncrementalImport => SideEffect::Import(Box::new(CommandImporter::new(&program))),
    };

    let outcome = discover(provider, descriptors, &engine, side_effect).await?;

    let output = config.effective_output(args.output.as_deref());
    if args.mode != RunMode::LiveRegister {
        let format = args.format.unwrap_or_else(|| OutputFormat::for_path(&output));
        write_inventory(&output, &outcome.inventory, format).map_err(fatal)?;
        tracing::info!("Wrote inventory to {:?}", output);
    }

    let stats = outcome.stats;
    eprintln!("Total resources: {}", outcome.inventory.len());
    eprintln!(
        "Types listed: {}, excluded: {}, unmappable: {}, failed: {}; worker faults: {}; duplicates: {}; side-effect failures: {}",
        stats.types_listed,
        stats.types_excluded,
        stats.types_unmappable,
        stats.types_failed,
        stats.worker_faults,
        stats.duplicates_skipped + outcome.duplicates_collapsed,
        outcome.side_effect_failures,
    );

    if args.bulk_import {
        run_bulk_import(&program, &output)
            .await
            .map_err(|source| DiscoveryError::SideEffectFailure {
                action: "bulk import",
                identity: output.display().to_string(),
                source,
            })?;
    }

    Ok(())
}
