//! Deployment summary.

use comfy_table::Table;

use crate::{PodTarget, RUNNER_SCRIPT, StagedFile, join_remote};

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub kubectl: String,
    pub kube_context: Option<String>,
    pub namespace: String,
    pub target: PodTarget,
    /// All containers of the pod when none was requested and kubectl chose one.
    pub ambiguous_containers: Option<Vec<String>>,
    pub remote_path: String,
    pub files: Vec<StagedFile>,
    /// Remote `ls -la` output of the deployed directory.
    pub listing: String,
}

impl DeployReport {
    /// Path of the benchmark runner inside the container.
    pub fn runner_path(&self) -> String {
        join_remote(&self.remote_path, RUNNER_SCRIPT)
    }

    /// Command that opens the runner's help inside the pod.
    pub fn follow_up_command(&self) -> String {
        self.runner_command("--help")
    }

    /// `kubectl exec -it` invocation of the runner with the given arguments.
    pub fn runner_command(&self, runner_args: &str) -> String {
        let mut parts = vec![self.kubectl.clone()];
        if let Some(context) = &self.kube_context {
            parts.push(format!("--context {}", context));
        }
        parts.push(format!("exec -it -n {} {}", self.namespace, self.target.pod));
        if let Some(container) = &self.target.container {
            parts.push(format!("-c {}", container));
        }
        parts.push(format!("-- python3 {} {}", self.runner_path(), runner_args));
        parts.join(" ")
    }

    /// Table of the deployed files.
    pub fn files_table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["File", "Size (bytes)", "Remote path"]);
        for file in &self.files {
            table.add_row(vec![
                file.name.clone(),
                file.size.to_string(),
                join_remote(&self.remote_path, &file.name),
            ]);
        }
        table
    }

    /// Print the summary.
    pub fn log(&self) {
        tracing::info!("✓ Deployment complete!");
        tracing::info!("");
        tracing::info!("Namespace: {}", self.namespace);
        tracing::info!("Pod:       {}", self.target.pod);
        match (&self.target.container, &self.ambiguous_containers) {
            (Some(container), _) => tracing::info!("Container: {}", container),
            (None, Some(containers)) => tracing::info!(
                "Container: kubectl default (pod has: {})",
                containers.join(", ")
            ),
            (None, None) => {}
        }
        tracing::info!("Location:  {}", self.remote_path);
        for line in self.files_table().to_string().lines() {
            tracing::info!("{}", line);
        }
        tracing::info!("");
        tracing::info!("To run the benchmark:");
        tracing::info!("  {}", self.follow_up_command());
        tracing::info!("For example, to run every test group:");
        tracing::info!("  {}", self.runner_command("--all"));
    }
}
