//! A scripted kubectl that runs against an in-memory list of pods and a local
//! directory standing in for the container filesystem.

#![allow(dead_code)]

use std::{
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use podship_deploy::{CommandOutput, CommandRunner, ConfigLayer, DeployConfig};
use serde_json::json;
use tempdir::TempDir;

pub const NAMESPACE: &str = "test";

/// How the fake cluster misbehaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub kubectl_missing: bool,
    pub fail_rm: bool,
    pub fail_cp: bool,
    pub hang_cp: bool,
}

pub struct FakeCluster {
    pods: Vec<(String, Vec<String>)>,
    root: TempDir,
    faults: Faults,
    calls: Mutex<Vec<Vec<String>>>,
    copied_from: Mutex<Vec<PathBuf>>,
}

impl FakeCluster {
    pub fn new(pods: &[(&str, &[&str])]) -> Self {
        Self {
            pods: pods
                .iter()
                .map(|(pod, containers)| {
                    (
                        pod.to_string(),
                        containers.iter().map(|c| c.to_string()).collect(),
                    )
                })
                .collect(),
            root: TempDir::new("podship-fake-pod").unwrap(),
            faults: Faults::default(),
            calls: Mutex::default(),
            copied_from: Mutex::default(),
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    /// Local location of an absolute path inside the fake container.
    pub fn remote(&self, path: &str) -> PathBuf {
        self.root.path().join(path.trim_start_matches('/'))
    }

    /// Sorted entry names of a remote directory.
    pub fn remote_entries(&self, path: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.remote(path))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose kubectl subcommand is `verb`.
    pub fn calls_to(&self, verb: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|call| call.get(1).map(String::as_str) == Some(verb))
            .collect()
    }

    /// Local directories passed to `kubectl cp`.
    pub fn copied_from(&self) -> Vec<PathBuf> {
        self.copied_from.lock().unwrap().clone()
    }

    fn containers(&self, pod: &str) -> Option<&[String]> {
        self.pods
            .iter()
            .find(|(name, _)| name == pod)
            .map(|(_, containers)| containers.as_slice())
    }

    fn get(&self, args: &[String]) -> CommandOutput {
        match args {
            [_, what, ..] if what == "pods" => {
                let items: Vec<_> = self
                    .pods
                    .iter()
                    .map(|(name, _)| json!({ "metadata": { "name": name } }))
                    .collect();
                CommandOutput::ok(json!({ "items": items }).to_string())
            }
            [_, what, pod, ..] if what == "pod" => match self.containers(pod) {
                Some(containers) => {
                    let containers: Vec<_> =
                        containers.iter().map(|c| json!({ "name": c })).collect();
                    CommandOutput::ok(
                        json!({
                            "metadata": { "name": pod, "namespace": NAMESPACE },
                            "spec": { "containers": containers }
                        })
                        .to_string(),
                    )
                }
                None => CommandOutput::failed(
                    1,
                    format!("Error from server (NotFound): pods \"{}\" not found", pod),
                ),
            },
            _ => CommandOutput::failed(1, "unsupported get"),
        }
    }

    fn exec(&self, args: &[String]) -> CommandOutput {
        let split = args.iter().position(|a| a == "--").unwrap();
        let (flags, command) = (&args[..split], &args[split + 1..]);

        let pod = &flags[3];
        let Some(containers) = self.containers(pod) else {
            return CommandOutput::failed(1, "pod not found");
        };
        if let Some(i) = flags.iter().position(|a| a == "-c")
            && !containers.contains(&flags[i + 1])
        {
            return CommandOutput::failed(1, "container not found");
        }

        let command: Vec<&str> = command.iter().map(String::as_str).collect();
        match command.as_slice() {
            ["rm", "-rf", path] => {
                if self.faults.fail_rm {
                    return CommandOutput::failed(1, "rm: permission denied");
                }
                let _ = std::fs::remove_dir_all(self.remote(path));
                CommandOutput::ok("")
            }
            ["mv", from, to] => match std::fs::rename(self.remote(from), self.remote(to)) {
                Ok(()) => CommandOutput::ok(""),
                Err(e) => CommandOutput::failed(1, format!("mv: {}", e)),
            },
            ["chmod", "+x", path] => {
                let path = self.remote(path);
                if !path.is_file() {
                    return CommandOutput::failed(1, "chmod: no such file");
                }
                make_executable(&path);
                CommandOutput::ok("")
            }
            ["ls", "-la", path] => match std::fs::read_dir(self.remote(path)) {
                Ok(_) => CommandOutput::ok(self.remote_entries(path).join("\n")),
                Err(e) => CommandOutput::failed(2, format!("ls: {}", e)),
            },
            _ => CommandOutput::failed(127, "command not found"),
        }
    }

    fn copy(&self, args: &[String]) -> CommandOutput {
        let [.., local, dest] = args else {
            return CommandOutput::failed(1, "bad cp arguments");
        };
        let local = PathBuf::from(local);
        self.copied_from.lock().unwrap().push(local.clone());

        if self.faults.fail_cp {
            return CommandOutput::failed(1, "error: unable to upgrade connection");
        }

        let (_, remote) = dest.split_once(':').unwrap();
        let target = self.remote(remote);
        std::fs::create_dir_all(&target).unwrap();
        for entry in std::fs::read_dir(&local).unwrap() {
            let entry = entry.unwrap();
            std::fs::copy(entry.path(), target.join(entry.file_name())).unwrap();
        }
        CommandOutput::ok("")
    }
}

impl CommandRunner for FakeCluster {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        let args = match args {
            [flag, _, rest @ ..] if flag == "--context" => rest,
            _ => args,
        };

        match args.first().map(String::as_str) {
            Some("version") if self.faults.kubectl_missing => {
                Err(io::Error::from(io::ErrorKind::NotFound))
            }
            Some("version") => Ok(CommandOutput::ok("Client Version: v1.30.0")),
            Some("get") => Ok(self.get(args)),
            Some("exec") => Ok(self.exec(args)),
            Some("cp") if self.faults.hang_cp => {
                if let [.., local, _] = args {
                    self.copied_from.lock().unwrap().push(PathBuf::from(local));
                }
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some("cp") => Ok(self.copy(args)),
            _ => Ok(CommandOutput::failed(1, "unknown command")),
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).unwrap().permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> bool {
    true
}

/// A local benchmark checkout containing the given files.
pub fn local_checkout(files: &[&str]) -> TempDir {
    let dir = TempDir::new("podship-checkout").unwrap();
    for name in files {
        std::fs::write(dir.path().join(name), format!("# {}\n", name)).unwrap();
    }
    dir
}

pub fn config(pod: &str, container: Option<&str>, local: &Path) -> DeployConfig {
    ConfigLayer {
        namespace: Some(NAMESPACE.to_string()),
        pod: Some(pod.to_string()),
        container: container.map(String::from),
        local_path: Some(local.to_path_buf()),
        ..Default::default()
    }
    .resolve()
    .unwrap()
}
