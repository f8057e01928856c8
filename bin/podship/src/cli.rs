use std::{ffi::OsString, path::PathBuf};

use clap::Parser;
use podship_deploy::{ConfigLayer, DEFAULT_NAMESPACE, DEFAULT_REMOTE_PATH};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "podship")]
#[command(
    author,
    version,
    about = "Deploy the HopsFS benchmark files into a running Kubernetes pod",
    after_help = after_help()
)]
pub struct Cli {
    /// Name of the target pod.
    #[arg(
        short,
        long,
        value_name = "POD_NAME",
        env = "PODSHIP_POD",
        required_unless_present = "config"
    )]
    pub pod: Option<String>,

    /// Target container in the pod.
    ///
    /// If not provided, kubectl uses the pod's default container (usually the first declared).
    #[arg(short, long, value_name = "NAME", env = "PODSHIP_CONTAINER")]
    pub container: Option<String>,

    /// Kubernetes namespace of the pod.
    #[arg(short, long, value_name = "NS", env = "PODSHIP_NAMESPACE")]
    pub namespace: Option<String>,

    /// Directory to deploy to inside the container. Replaced if it exists.
    #[arg(short, long, value_name = "PATH", env = "PODSHIP_REMOTE_PATH")]
    pub remote_path: Option<String>,

    /// Local directory holding the benchmark files.
    ///
    /// Defaults to the current directory.
    #[arg(short, long, value_name = "DIR", env = "PODSHIP_LOCAL_PATH")]
    pub local_path: Option<PathBuf>,

    /// kubectl binary to use.
    #[arg(long, value_name = "BIN", env = "PODSHIP_KUBECTL")]
    pub kubectl: Option<String>,

    /// kubeconfig context to use instead of the current one.
    #[arg(long, value_name = "NAME", env = "PODSHIP_CONTEXT")]
    pub context: Option<String>,

    /// Path to a TOML file providing defaults for the options above.
    #[arg(long, alias = "conf", value_name = "FILE", env = "PODSHIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// The verbosity level.
    #[arg(short, long, env = "PODSHIP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,
}

impl Cli {
    /// Explicitly provided settings, layered over the config file.
    pub fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            namespace: self.namespace.clone(),
            pod: self.pod.clone(),
            container: self.container.clone(),
            remote_path: self.remote_path.clone(),
            local_path: self.local_path.clone(),
            kubectl: self.kubectl.clone(),
            context: self.context.clone(),
        }
    }
}

/// Whether `-h`/`--help` appears before any `--` terminator.
///
/// Help wins over every other flag, including invalid ones.
pub fn wants_help(args: &[OsString]) -> bool {
    args.iter()
        .skip(1)
        .take_while(|arg| *arg != "--")
        .any(|arg| arg == "-h" || arg == "--help")
}

// Defaults are applied after the config file is merged, so they are shown here
// rather than as clap default values.
fn after_help() -> String {
    format!(
        "Defaults:\n  --namespace    {}\n  --remote-path  {}\n\nExample:\n  podship --pod jupyter-0 --namespace {}",
        DEFAULT_NAMESPACE, DEFAULT_REMOTE_PATH, DEFAULT_NAMESPACE
    )
}
