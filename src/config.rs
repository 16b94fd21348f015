//! Configuration Management
//!
//! Persistent settings live in `<config_dir>/cloudsweep/config.json`. Every
//! value can be overridden; precedence is CLI flag, then environment, then
//! this file, then the provider default.

use crate::emit::file::DEFAULT_OUTPUT;
use crate::emit::import::DEFAULT_IMPORT_PROGRAM;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured worker count
pub const WORKERS_ENV: &str = "CLOUDSWEEP_WORKERS";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GcpConfig {
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AzureConfig {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub schema_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub schema_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct KubernetesConfig {
    /// kubeconfig context; the current context when unset
    #[serde(default)]
    pub context: Option<String>,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub workers: Option<usize>,
    /// Catalog keys or canonical tokens never listed
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub import_program: Option<String>,
    #[serde(default)]
    pub gcp: GcpConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudsweep").join("config.json"))
    }

    /// Load configuration from disk
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config file {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Cannot read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().context("No configuration directory on this system")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Worker count (CLI > `CLOUDSWEEP_WORKERS` > config > provider default)
    pub fn effective_workers(
        &self,
        cli: Option<usize>,
        env: Option<&str>,
        provider_default: usize,
    ) -> Result<NonZeroUsize> {
        let from_env = match env.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => Some(
                value
                    .parse::<usize>()
                    .with_context(|| format!("{} must be a number, got '{}'", WORKERS_ENV, value))?,
            ),
            None => None,
        };

        let workers = cli.or(from_env).or(self.workers).unwrap_or(provider_default);
        NonZeroUsize::new(workers).context("worker count must be at least 1")
    }

    /// Configured exclusions together with the ones given on the command line
    pub fn effective_exclusions(&self, cli: &[String]) -> HashSet<String> {
        self.exclusions
            .iter()
            .chain(cli.iter())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn effective_output(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn effective_import_program(&self) -> String {
        self.import_program
            .clone()
            .unwrap_or_else(|| DEFAULT_IMPORT_PROGRAM.to_string())
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.gcp.project.clone())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Subscription (CLI > `ARM_SUBSCRIPTION_ID` > config)
    pub fn effective_subscription(&self, cli: Option<&str>, env: Option<&str>) -> Option<String> {
        cli.or(env)
            .map(str::to_string)
            .or_else(|| self.azure.subscription_id.clone())
            .filter(|s| !s.trim().is_empty())
    }

    /// Location filter (CLI > `ARM_LOCATION` > config > `westus2`)
    pub fn effective_location(&self, cli: Option<&str>, env: Option<&str>) -> String {
        cli.or(env)
            .map(str::to_string)
            .or_else(|| self.azure.location.clone())
            .unwrap_or_else(|| crate::azure::provider::DEFAULT_LOCATION.to_string())
    }

    pub fn effective_schema_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.azure.schema_url.clone())
    }

    /// Region (CLI > config); `None` leaves it to the AWS config chain
    pub fn effective_aws_region(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.aws.region.clone())
            .filter(|r| !r.trim().is_empty())
    }

    /// aws-native schema (CLI > config > published schema)
    pub fn effective_aws_schema_url(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.aws.schema_url.clone())
            .unwrap_or_else(|| crate::aws::catalog::SCHEMA_URL.to_string())
    }

    pub fn effective_kube_context(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.kubernetes.context.clone())
    }

    /// Record the settings a run resolved, for `--save-config`
    pub fn remember(&mut self, resolved: Resolved) {
        match resolved {
            Resolved::Gcp { project } => self.gcp.project = Some(project),
            Resolved::Azure {
                subscription,
                location,
            } => {
                self.azure.subscription_id = Some(subscription);
                self.azure.location = Some(location);
            }
            Resolved::Aws { region } => self.aws.region = Some(region),
            Resolved::Kubernetes { context } => {
                if context.is_some() {
                    self.kubernetes.context = context;
                }
            }
        }
    }
}

/// Provider settings resolved at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Gcp { project: String },
    Azure { subscription: String, location: String },
    Aws { region: String },
    Kubernetes { context: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("cloudsweep-config-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        assert_eq!(Config::load_from(&temp_path()), Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path();
        let config = Config {
            workers: Some(6),
            exclusions: vec!["compute-instances".to_string()],
            gcp: GcpConfig {
                project: Some("saved-project".to_string()),
            },
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_invalid_file_yields_defaults() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_worker_precedence() {
        let config = Config {
            workers: Some(5),
            ..Default::default()
        };
        assert_eq!(config.effective_workers(Some(2), Some("7"), 3).unwrap().get(), 2);
        assert_eq!(config.effective_workers(None, Some("7"), 3).unwrap().get(), 7);
        assert_eq!(config.effective_workers(None, None, 3).unwrap().get(), 5);
        assert_eq!(Config::default().effective_workers(None, Some(" "), 3).unwrap().get(), 3);
    }

    #[test]
    fn test_invalid_worker_counts() {
        let config = Config::default();
        assert!(config.effective_workers(Some(0), None, 3).is_err());
        assert!(config.effective_workers(None, Some("many"), 3).is_err());
    }

    #[test]
    fn test_exclusions_are_merged() {
        let config = Config {
            exclusions: vec!["a".to_string(), " ".to_string()],
            ..Default::default()
        };
        let merged = config.effective_exclusions(&["b".to_string(), "a".to_string()]);
        assert_eq!(merged.len(), 2);
        assert!(merged.contains("a") && merged.contains("b"));
    }

    #[test]
    fn test_azure_precedence() {
        let config = Config {
            azure: AzureConfig {
                subscription_id: Some("from-config".to_string()),
                location: Some("eastus".to_string()),
                schema_url: None,
            },
            ..Default::default()
        };
        assert_eq!(
            config.effective_subscription(None, Some("from-env")).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            config.effective_subscription(None, None).as_deref(),
            Some("from-config")
        );
        assert_eq!(config.effective_location(None, None), "eastus");
        assert_eq!(config.effective_location(Some("*"), Some("x")), "*");
        assert_eq!(Config::default().effective_location(None, None), "westus2");
    }

    #[test]
    fn test_remembered_settings_survive_reload() {
        let path = temp_path();
        let mut config = Config {
            workers: Some(4),
            ..Default::default()
        };
        config.remember(Resolved::Azure {
            subscription: "00000000-0000-0000-0000-000000000001".to_string(),
            location: "eastus".to_string(),
        });
        config.remember(Resolved::Aws {
            region: "eu-west-1".to_string(),
        });
        config.remember(Resolved::Kubernetes { context: None });
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.effective_location(None, None), "eastus");
        assert_eq!(loaded.effective_aws_region(None).as_deref(), Some("eu-west-1"));
        assert_eq!(loaded.effective_kube_context(None), None);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_aws_and_kubernetes_precedence() {
        let config = Config {
            aws: AwsConfig {
                region: Some("us-west-2".to_string()),
                schema_url: None,
            },
            kubernetes: KubernetesConfig {
                context: Some("staging".to_string()),
            },
            ..Default::default()
        };
        assert_eq!(config.effective_aws_region(Some("us-east-1")).as_deref(), Some("us-east-1"));
        assert_eq!(config.effective_aws_region(None).as_deref(), Some("us-west-2"));
        assert!(config.effective_aws_schema_url(None).ends_with("pulumi-resource-aws-native/schema.json"));
        assert_eq!(config.effective_aws_schema_url(Some("http://x/s.json")), "http://x/s.json");
        assert_eq!(config.effective_kube_context(None).as_deref(), Some("staging"));
        assert_eq!(config.effective_kube_context(Some("prod")).as_deref(), Some("prod"));
    }

    #[test]
    fn test_output_and_program_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_output(None), PathBuf::from("import.json"));
        assert_eq!(
            config.effective_output(Some(Path::new("out.yaml"))),
            PathBuf::from("out.yaml")
        );
        assert_eq!(config.effective_import_program(), "pulumi");
    }
}
