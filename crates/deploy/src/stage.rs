//! Local staging of the benchmark files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempdir::TempDir;

/// Prefix of the staging directory name.
const STAGING_PREFIX: &str = "podship";

/// The benchmark entry point, made executable after deployment.
pub const RUNNER_SCRIPT: &str = "run_benchmark.py";

/// A file the stager knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkFile {
    pub name: &'static str,
    /// Missing required files abort staging; missing optional files are skipped.
    pub required: bool,
}

/// Files copied to the pod. Nothing outside this list is ever staged.
pub const BENCHMARK_FILES: &[BenchmarkFile] = &[
    BenchmarkFile {
        name: "experiment.py",
        required: true,
    },
    BenchmarkFile {
        name: RUNNER_SCRIPT,
        required: true,
    },
    BenchmarkFile {
        name: "requirements.txt",
        required: false,
    },
    BenchmarkFile {
        name: "README.md",
        required: false,
    },
];

/// A staged file and its size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub size: u64,
}

/// Temporary directory holding exactly the files to transfer.
///
/// The directory is removed when the bundle is dropped.
#[derive(Debug)]
pub struct StagedBundle {
    dir: TempDir,
    files: Vec<StagedFile>,
}

impl StagedBundle {
    /// Copy the allowlisted files from `local_path` into a fresh temporary directory.
    pub fn stage(local_path: &Path) -> Result<Self> {
        Self::stage_in(local_path, &std::env::temp_dir())
    }

    /// Like [`StagedBundle::stage`], creating the temporary directory under `tmp_root`.
    pub fn stage_in(local_path: &Path, tmp_root: &Path) -> Result<Self> {
        if !local_path.is_dir() {
            anyhow::bail!("Local directory not found: {}", local_path.display());
        }

        let dir = TempDir::new_in(tmp_root, STAGING_PREFIX)
            .context("Failed to create staging directory")?;
        tracing::debug!(path = %dir.path().display(), "Created staging directory");

        let mut files = Vec::new();
        for file in BENCHMARK_FILES {
            let source = local_path.join(file.name);

            if !source.is_file() {
                if file.required {
                    anyhow::bail!("Required file not found: {}", source.display());
                }
                tracing::debug!(file = file.name, "Optional file not present, skipping");
                continue;
            }

            let size = std::fs::copy(&source, dir.path().join(file.name))
                .context(format!("Failed to stage {}", source.display()))?;

            files.push(StagedFile {
                name: file.name.to_string(),
                size,
            });
        }

        let bundle = Self { dir, files };
        bundle.log_contents()?;

        Ok(bundle)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Generated name of the staging directory.
    pub fn dir_name(&self) -> Result<String> {
        self.dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("Staging directory has no name")
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    /// Owned copy of the staging directory path, for checks after the bundle is gone.
    pub fn path_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn log_contents(&self) -> Result<()> {
        tracing::info!(path = %self.path().display(), "Staged files:");

        let mut entries = std::fs::read_dir(self.path())
            .context("Failed to read staging directory")?
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read staging directory")?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let size = entry.metadata().map(|m| m.len()).unwrap_or_default();
            tracing::info!("  {:<20} {:>10} bytes", entry.file_name().to_string_lossy(), size);
        }

        Ok(())
    }
}
