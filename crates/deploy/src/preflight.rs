//! Checks that must pass before anything is staged or copied.

use anyhow::Result;

use crate::{CommandRunner, DeployConfig, Kubectl, PodTarget};

/// Result of a successful preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    /// Where to deploy.
    pub target: PodTarget,
    /// Set when no container was requested but the pod has several. Holds all of
    /// them in declaration order; kubectl picks its default container.
    pub ambiguous_containers: Option<Vec<String>>,
}

/// Verify kubectl, the pod and the container, and return the target to deploy to.
///
/// When no container is requested and the pod has several, kubectl's default
/// container is used after a warning.
pub async fn check<R: CommandRunner>(
    kubectl: &Kubectl<R>,
    config: &DeployConfig,
) -> Result<Preflight> {
    kubectl.check_available().await?;

    let namespace = kubectl.namespace();
    let pod = &config.pod_name;

    tracing::info!(pod = %pod, namespace, "Checking pod...");

    let Some(containers) = kubectl.pod_containers(pod).await? else {
        let pods = match kubectl.list_pods().await {
            Ok(pods) => pods,
            Err(e) => {
                tracing::warn!(error = ?e, "Could not list pods");
                Vec::new()
            }
        };

        tracing::error!("Pod '{}' not found in namespace '{}'", pod, namespace);
        log_listing(&format!("Pods in namespace '{}':", namespace), &pods);

        anyhow::bail!(
            "Pod '{}' not found in namespace '{}' (available pods: {})",
            pod,
            namespace,
            display_list(&pods)
        );
    };

    let mut ambiguous_containers = None;
    match &config.container_name {
        Some(container) if !containers.contains(container) => {
            tracing::error!("Container '{}' not found in pod '{}'", container, pod);
            log_listing(&format!("Containers in pod '{}':", pod), &containers);

            anyhow::bail!(
                "Container '{}' not found in pod '{}' (available containers: {})",
                container,
                pod,
                display_list(&containers)
            );
        }
        Some(container) => {
            tracing::info!(pod = %pod, container = %container, "Target container found");
        }
        None if containers.len() > 1 => {
            tracing::warn!(
                "Pod '{}' has {} containers and none was specified, using kubectl's default container (usually '{}')",
                pod,
                containers.len(),
                containers[0]
            );
            log_listing(&format!("Containers in pod '{}':", pod), &containers);
            ambiguous_containers = Some(containers);
        }
        None => {
            tracing::info!(pod = %pod, "Target pod found");
        }
    }

    Ok(Preflight {
        target: PodTarget::new(pod, config.container_name.clone()),
        ambiguous_containers,
    })
}

fn log_listing(header: &str, items: &[String]) {
    tracing::info!("{}", header);
    if items.is_empty() {
        tracing::info!("  (none)");
    }
    for item in items {
        tracing::info!("  - {}", item);
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
