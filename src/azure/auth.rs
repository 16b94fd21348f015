//! Azure Authentication
//!
//! A pre-issued token from `ARM_ACCESS_TOKEN` wins. Otherwise the default
//! credential chain is used: environment service principal, workload
//! identity (OIDC federation), managed identity and the Azure CLI.

use anyhow::{Context, Result};
use azure_core::auth::TokenCredential;
use azure_identity::{DefaultAzureCredential, TokenCredentialOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Scope for Azure Resource Manager
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

pub const ACCESS_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

/// Refresh this long before the assumed expiry
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Management tokens live at least an hour; assume less
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
enum TokenSource {
    Credential(Arc<dyn TokenCredential>),
    Static(String),
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Bearer token source for ARM requests
///
/// Clones share one token cache.
#[derive(Clone)]
pub struct ArmCredentials {
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl ArmCredentials {
    /// Use a fixed access token (no refresh)
    pub fn from_token(token: &str) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Wrap any token credential
    pub fn from_credential(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            source: TokenSource::Credential(credential),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// The default Azure credential chain
    pub fn default_chain() -> Result<Self> {
        let credential = DefaultAzureCredential::create(TokenCredentialOptions::default())
            .context("Failed to initialize Azure authentication. Run 'az login' or set ARM_ACCESS_TOKEN")?;
        Ok(Self::from_credential(Arc::new(credential)))
    }

    /// Prefer `ARM_ACCESS_TOKEN`, fall back to the default chain
    pub fn from_env() -> Result<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::info!("Using access token from {}", ACCESS_TOKEN_ENV);
                Ok(Self::from_token(token.trim()))
            }
            _ => Self::default_chain(),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self.source, TokenSource::Static(_))
    }

    pub async fn get_token(&self) -> Result<String> {
        let credential = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Credential(credential) => credential,
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached ARM token expired, fetching new token");
            }
        }

        let access = credential
            .get_token(&[MANAGEMENT_SCOPE])
            .await
            .context("Failed to get Azure access token")?;
        let token = access.token.secret().to_string();

        let mut cache = self.token_cache.write().await;
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
        });

        Ok(token)
    }
}
