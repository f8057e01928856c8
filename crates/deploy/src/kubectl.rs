//! kubectl client wrapper.

use std::{io, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{CommandOutput, CommandRunner, DeployConfig};

/// Output of `kubectl get pods -o json`.
#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

/// Output of `kubectl get pod <name> -o json`.
#[derive(Debug, Deserialize)]
struct Pod {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: PodSpec,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<ContainerSpec>,
}

#[derive(Debug, Deserialize)]
struct ContainerSpec {
    name: String,
}

/// kubectl bound to a namespace (and optionally a kubeconfig context).
pub struct Kubectl<R> {
    runner: R,
    binary: String,
    namespace: String,
    context: Option<String>,
}

impl<R: CommandRunner> Kubectl<R> {
    pub fn new(runner: R, binary: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            namespace: namespace.into(),
            context: None,
        }
    }

    /// Build a client from a resolved configuration.
    pub fn from_config(runner: R, config: &DeployConfig) -> Self {
        Self::new(runner, &config.kubectl, &config.namespace)
            .with_context(config.kube_context.clone())
    }

    /// Use a specific kubeconfig context.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Check that the kubectl binary can be spawned.
    pub async fn check_available(&self) -> Result<()> {
        match self.raw(["version", "--client"]).await {
            Ok(output) => {
                tracing::debug!(
                    binary = %self.binary,
                    version = %output.stdout.trim(),
                    "kubectl is available"
                );
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => anyhow::bail!(
                "'{}' was not found on PATH. Install kubectl and configure access to the cluster, then re-run",
                self.binary
            ),
            Err(e) => Err(e).context(format!("Failed to run '{}'", self.binary)),
        }
    }

    /// Names of all pods in the namespace.
    pub async fn list_pods(&self) -> Result<Vec<String>> {
        let output = self
            .checked(["get", "pods", "-n", self.namespace.as_str(), "-o", "json"])
            .await
            .context(format!("Failed to list pods in namespace '{}'", self.namespace))?;

        let pods: PodList =
            serde_json::from_str(&output.stdout).context("Failed to parse pod list")?;

        Ok(pods.items.into_iter().map(|pod| pod.metadata.name).collect())
    }

    /// Container names of a pod, in declaration order.
    ///
    /// Returns `None` if kubectl cannot find the pod.
    pub async fn pod_containers(&self, pod: &str) -> Result<Option<Vec<String>>> {
        let output = self
            .raw(["get", "pod", pod, "-n", self.namespace.as_str(), "-o", "json"])
            .await
            .context(format!("Failed to run '{}'", self.binary))?;

        if !output.success {
            tracing::debug!(
                pod,
                namespace = %self.namespace,
                reason = %output.failure_reason(),
                "Pod lookup failed"
            );
            return Ok(None);
        }

        let parsed: Pod = serde_json::from_str(&output.stdout)
            .context(format!("Failed to parse pod '{}'", pod))?;

        tracing::trace!(pod = %parsed.metadata.name, "Pod found");

        Ok(Some(
            parsed.spec.containers.into_iter().map(|c| c.name).collect(),
        ))
    }

    /// Run a command inside a container.
    ///
    /// The returned output may be unsuccessful; callers decide whether that is fatal.
    pub async fn exec(&self, target: &PodTarget, command: &[&str]) -> Result<CommandOutput> {
        let mut args = vec![
            "exec".to_string(),
            "-n".to_string(),
            self.namespace.clone(),
            target.pod.clone(),
        ];
        if let Some(container) = &target.container {
            args.push("-c".to_string());
            args.push(container.clone());
        }
        args.push("--".to_string());
        args.extend(command.iter().map(|s| s.to_string()));

        self.run(args)
            .await
            .context(format!("Failed to run '{}'", self.binary))
    }

    /// Run a command inside a container, failing if it does not succeed.
    pub async fn exec_checked(&self, target: &PodTarget, command: &[&str]) -> Result<CommandOutput> {
        let output = self.exec(target, command).await?;
        if !output.success {
            anyhow::bail!(
                "'{}' failed in pod '{}': {}",
                command.join(" "),
                target.pod,
                output.failure_reason()
            );
        }
        Ok(output)
    }

    /// Copy a local directory to `remote` inside the container.
    ///
    /// File ownership and permissions are not preserved.
    pub async fn copy_to(&self, target: &PodTarget, local: &Path, remote: &str) -> Result<()> {
        let mut args = vec!["cp".to_string(), "--no-preserve=true".to_string()];
        if let Some(container) = &target.container {
            args.push("-c".to_string());
            args.push(container.clone());
        }
        args.push(local.display().to_string());
        args.push(format!("{}/{}:{}", self.namespace, target.pod, remote));

        let output = self
            .run(args)
            .await
            .context(format!("Failed to run '{}'", self.binary))?;

        if !output.success {
            anyhow::bail!(
                "Failed to copy {} to {}:{}: {}",
                local.display(),
                target.pod,
                remote,
                output.failure_reason()
            );
        }

        Ok(())
    }

    async fn checked<const N: usize>(&self, args: [&str; N]) -> Result<CommandOutput> {
        let output = self.raw(args).await?;
        if !output.success {
            anyhow::bail!("{} {}: {}", self.binary, args.join(" "), output.failure_reason());
        }
        Ok(output)
    }

    async fn raw<const N: usize>(&self, args: [&str; N]) -> io::Result<CommandOutput> {
        self.run(args.iter().map(|s| s.to_string()).collect()).await
    }

    async fn run(&self, args: Vec<String>) -> io::Result<CommandOutput> {
        let args: Vec<String> = match &self.context {
            Some(context) => ["--context".to_string(), context.clone()]
                .into_iter()
                .chain(args)
                .collect(),
            None => args,
        };
        self.runner.run(&self.binary, &args).await
    }
}

/// A pod and, optionally, one of its containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTarget {
    pub pod: String,
    pub container: Option<String>,
}

impl PodTarget {
    pub fn new(pod: impl Into<String>, container: Option<String>) -> Self {
        Self {
            pod: pod.into(),
            container,
        }
    }
}
