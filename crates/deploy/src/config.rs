//! Deployment configuration.
//!
//! The configuration is layered: built-in defaults, then an optional TOML file, then
//! whatever the caller passes explicitly (command line and environment).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "hopsworks";

/// Remote directory used when none is configured.
pub const DEFAULT_REMOTE_PATH: &str = "/tmp/hopsfs-benchmark";

/// kubectl binary used when none is configured.
pub const DEFAULT_KUBECTL: &str = "kubectl";

/// A partial configuration layer.
///
/// Every field is optional so that layers can be merged: a field left unset does not
/// override the value coming from a lower layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ConfigLayer {
    /// Merge an optional TOML file below `self` and resolve the result.
    ///
    /// Values set on `self` win over values from the file.
    pub fn load(self, file: Option<&Path>) -> Result<DeployConfig> {
        self.merge(file)?.resolve()
    }

    /// Merge an optional TOML file below `self`, without defaults or validation.
    pub fn merge(self, file: Option<&Path>) -> Result<ConfigLayer> {
        let mut figment = Figment::new();

        if let Some(path) = file {
            if !path.is_file() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let merged: ConfigLayer = figment
            .merge(Serialized::defaults(self))
            .extract()
            .context("Failed to parse configuration")?;

        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Configuration file loaded");
        }

        Ok(merged)
    }

    /// Whether a non-blank pod name is set.
    pub fn has_pod(&self) -> bool {
        self.pod.as_deref().is_some_and(|pod| !pod.trim().is_empty())
    }

    /// Apply built-in defaults and validate.
    pub fn resolve(self) -> Result<DeployConfig> {
        let namespace = self
            .namespace
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if namespace.trim().is_empty() {
            anyhow::bail!("Namespace must not be empty");
        }

        let pod_name = self
            .pod
            .filter(|pod| !pod.trim().is_empty())
            .context("Pod name is required (use --pod)")?;

        let remote_path = normalize_remote_path(
            self.remote_path
                .as_deref()
                .unwrap_or(DEFAULT_REMOTE_PATH),
        )?;

        Ok(DeployConfig {
            namespace,
            pod_name,
            container_name: self.container.filter(|c| !c.trim().is_empty()),
            remote_path,
            local_path: self.local_path.unwrap_or_else(|| PathBuf::from(".")),
            kubectl: self.kubectl.unwrap_or_else(|| DEFAULT_KUBECTL.to_string()),
            kube_context: self.context.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Resolved configuration for a single deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Namespace the pod lives in.
    pub namespace: String,
    /// Target pod.
    pub pod_name: String,
    /// Target container. `None` lets kubectl pick the pod's default container.
    pub container_name: Option<String>,
    /// Absolute path of the directory to create inside the container.
    pub remote_path: String,
    /// Local directory holding the benchmark files.
    pub local_path: PathBuf,
    /// kubectl binary to invoke.
    pub kubectl: String,
    /// kubeconfig context, if not the current one.
    pub kube_context: Option<String>,
}

impl DeployConfig {
    /// Parent directory of the remote path, where the staged directory is copied first.
    pub fn remote_parent(&self) -> &str {
        match self.remote_path.rsplit_once('/') {
            Some(("", _)) | None => "/",
            Some((parent, _)) => parent,
        }
    }
}

/// Join a remote directory and an entry name with a single `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

fn normalize_remote_path(path: &str) -> Result<String> {
    let trimmed = path.trim();
    if !trimmed.starts_with('/') {
        anyhow::bail!("Remote path must be absolute: {}", path);
    }

    let normalized = trimmed.trim_end_matches('/');
    if normalized.is_empty() {
        anyhow::bail!("Remote path must not be the filesystem root");
    }

    Ok(normalized.to_string())
}
