//! Docker Engine API client

use super::traits::*;
use crate::config::{expand_home, BackendConfig, TlsConfig};
use crate::error::BackendError;
use async_trait::async_trait;
use fleet_types::{ContainerId, ContainerRef, Selector};
use reqwest::{Certificate, Client, Identity, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Client for a Docker daemon or Swarm manager
#[derive(Debug, Clone)]
pub struct DockerBackend {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateContainerBody<'a> {
    image: &'a str,
    labels: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateContainerResponse {
    id: ContainerId,
    #[serde(default)]
    warnings: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    message: String,
}

impl DockerBackend {
    /// Build a client from configuration, loading TLS material if enabled
    pub fn from_config(config: &BackendConfig, tls: &TlsConfig) -> BackendResult<Self> {
        let base_url = resolve_base_url(&config.url, config.tls)?;

        let mut builder = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.request_timeout_secs));

        if config.tls {
            builder = apply_tls(builder, tls)?;
        }

        let client = builder
            .build()
            .map_err(|e| BackendError::Tls(format!("failed to build client: {}", e)))?;

        tracing::info!(url = %base_url, tls = config.tls, "Docker backend configured");

        Ok(Self { client, base_url })
    }

    /// Plain-HTTP client against an explicit base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Map a configured daemon address to an HTTP base URL
///
/// `tcp://` becomes `https://` when TLS material is configured and `http://`
/// otherwise. Unix sockets are not supported.
pub fn resolve_base_url(url: &str, tls: bool) -> BackendResult<String> {
    let url = url.trim().trim_end_matches('/');

    let resolved = if let Some(rest) = url.strip_prefix("tcp://") {
        let scheme = if tls { "https" } else { "http" };
        format!("{}://{}", scheme, rest)
    } else if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        return Err(BackendError::InvalidAddress(format!(
            "unsupported scheme in {:?} (expected tcp://, http:// or https://)",
            url
        )));
    };

    if resolved.split("://").nth(1).map_or(true, str::is_empty) {
        return Err(BackendError::InvalidAddress(format!("missing host in {:?}", url)));
    }

    Ok(resolved)
}

fn apply_tls(
    builder: reqwest::ClientBuilder,
    tls: &TlsConfig,
) -> BackendResult<reqwest::ClientBuilder> {
    let cert = read_pem(&tls.cert)?;
    let key = read_pem(&tls.key)?;
    let identity = Identity::from_pem(&[cert, key].concat()).map_err(|e| {
        BackendError::Tls(format!("invalid client certificate or key: {}", e))
    })?;

    let ca = read_pem(&tls.ca_cert)?;
    let roots = Certificate::from_pem_bundle(&ca)
        .map_err(|e| BackendError::Tls(format!("invalid CA bundle: {}", e)))?;
    if roots.is_empty() {
        return Err(BackendError::Tls(format!(
            "no certificates found in {}",
            tls.ca_cert.display()
        )));
    }

    let mut builder = builder.identity(identity).tls_built_in_root_certs(false);
    for cert in roots {
        builder = builder.add_root_certificate(cert);
    }

    if tls.insecure_skip_verify {
        tracing::warn!("Backend certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder)
}

fn read_pem(path: &Path) -> BackendResult<Vec<u8>> {
    let path = expand_home(path);
    std::fs::read(&path).map_err(|e| BackendError::Tls(format!("{}: {}", path.display(), e)))
}

/// Turn a non-success response into a backend error
async fn check(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<EngineErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);

    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn list_containers(&self, selector: &Selector) -> BackendResult<Vec<ContainerRef>> {
        let filters = selector.filter();
        let response = self
            .client
            .get(self.url("/containers/json"))
            .query(&[("all", "false"), ("filters", filters.as_str())])
            .send()
            .await?;

        let containers = check(response).await?.json::<Vec<ContainerRef>>().await?;
        Ok(containers)
    }

    async fn create_container(
        &self,
        image: &str,
        labels: &BTreeMap<String, String>,
    ) -> BackendResult<ContainerId> {
        let response = self
            .client
            .post(self.url("/containers/create"))
            .json(&CreateContainerBody { image, labels })
            .send()
            .await?;

        let created = check(response)
            .await?
            .json::<CreateContainerResponse>()
            .await?;

        for warning in created.warnings.unwrap_or_default() {
            tracing::warn!(container_id = %created.id, warning = %warning, "Docker warning on create");
        }

        Ok(created.id)
    }

    async fn start_container(&self, id: &ContainerId) -> BackendResult<()> {
        let response = self
            .client
            .post(self.url(&format!("/containers/{}/start", id)))
            .send()
            .await?;

        // 304: already started
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(());
        }

        check(response).await?;
        Ok(())
    }

    async fn remove_container(
        &self,
        id: &ContainerId,
        options: RemoveOptions,
    ) -> BackendResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/containers/{}", id)))
            .query(&[
                ("force", options.force.to_string()),
                ("v", options.remove_volumes.to_string()),
            ])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}
