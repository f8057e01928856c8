//! podship-deploy - Copies a benchmark harness into a running Kubernetes pod.
//!
//! The crate drives `kubectl` as a subprocess: it checks that the target pod and
//! container exist, stages an allowlist of local files in a temporary directory,
//! replaces the remote directory with the staged one and marks the benchmark
//! runner executable.

mod config;
pub use config::{
    ConfigLayer, DEFAULT_KUBECTL, DEFAULT_NAMESPACE, DEFAULT_REMOTE_PATH, DeployConfig,
    join_remote,
};

mod deployer;
pub use deployer::Deployer;

mod kubectl;
pub use kubectl::{Kubectl, PodTarget};

pub mod preflight;

mod report;
pub use report::DeployReport;

mod runner;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};

mod stage;
pub use stage::{BENCHMARK_FILES, BenchmarkFile, RUNNER_SCRIPT, StagedBundle, StagedFile};
