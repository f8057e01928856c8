use std::future::Future;

use anyhow::{Context, Result};

use crate::{
    CommandRunner, DeployConfig, DeployReport, Kubectl, RUNNER_SCRIPT, StagedBundle, join_remote,
    preflight,
};

/// Copies the benchmark files into a pod.
///
/// Steps run strictly in order and each one is gated on the previous:
/// preflight checks, local staging, removal of the old remote directory, copy,
/// rename into place, `chmod +x` on the runner and a final listing.
pub struct Deployer<R> {
    config: DeployConfig,
    kubectl: Kubectl<R>,
}

impl<R: CommandRunner> Deployer<R> {
    pub fn new(config: DeployConfig, runner: R) -> Self {
        let kubectl = Kubectl::from_config(runner, &config);
        Self { config, kubectl }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn kubectl(&self) -> &Kubectl<R> {
        &self.kubectl
    }

    /// Deploy, giving up as soon as `interrupt` completes.
    ///
    /// An interrupted deployment is dropped mid-flight: the running kubectl child is
    /// killed and the local staging directory is removed. The remote side is left as is.
    pub async fn deploy_until(&self, interrupt: impl Future<Output = ()>) -> Result<DeployReport> {
        tokio::select! {
            result = self.deploy() => result,
            _ = interrupt => {
                tracing::warn!("Interrupted, aborting deployment");
                anyhow::bail!("Deployment interrupted")
            }
        }
    }

    pub async fn deploy(&self) -> Result<DeployReport> {
        tracing::info!(
            namespace = %self.config.namespace,
            pod = %self.config.pod_name,
            container = ?self.config.container_name,
            remote_path = %self.config.remote_path,
            local_path = %self.config.local_path.display(),
            "Starting deployment..."
        );

        let preflight::Preflight {
            target,
            ambiguous_containers,
        } = preflight::check(&self.kubectl, &self.config).await?;

        // Dropped on every return path below, which removes the local staging directory.
        let bundle = StagedBundle::stage(&self.config.local_path)?;

        let remote_path = self.config.remote_path.as_str();
        let transferred = join_remote(self.config.remote_parent(), &bundle.dir_name()?);

        tracing::info!(remote_path, "Removing existing remote directory...");
        match self.kubectl.exec(&target, &["rm", "-rf", remote_path]).await {
            Ok(output) if output.success => {}
            // Treated as "did not exist".
            Ok(output) => {
                tracing::debug!(reason = %output.failure_reason(), "Remote removal failed, ignoring");
            }
            Err(e) => {
                tracing::debug!(error = ?e, "Remote removal failed, ignoring");
            }
        }

        tracing::info!(to = %transferred, "Copying files to pod...");
        self.kubectl
            .copy_to(&target, bundle.path(), &transferred)
            .await
            .context("Failed to copy files to pod")?;

        tracing::info!(from = %transferred, to = remote_path, "Moving into place...");
        self.kubectl
            .exec_checked(&target, &["mv", transferred.as_str(), remote_path])
            .await
            .context("Failed to move the copied directory into place")?;

        let runner_path = join_remote(remote_path, RUNNER_SCRIPT);
        self.kubectl
            .exec_checked(&target, &["chmod", "+x", runner_path.as_str()])
            .await
            .context(format!("Failed to make {} executable", RUNNER_SCRIPT))?;

        let listing = self
            .kubectl
            .exec_checked(&target, &["ls", "-la", remote_path])
            .await
            .context("Failed to list the deployed directory")?
            .stdout;

        tracing::info!("Remote directory contents:");
        for line in listing.lines() {
            tracing::info!("  {}", line);
        }

        Ok(DeployReport {
            kubectl: self.config.kubectl.clone(),
            kube_context: self.config.kube_context.clone(),
            namespace: self.config.namespace.clone(),
            target,
            ambiguous_containers,
            remote_path: remote_path.to_string(),
            files: bundle.files().to_vec(),
            listing,
        })
    }
}
